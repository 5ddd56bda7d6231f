use colored::Colorize;

use crate::driver::{CallReport, ScenarioReport};
use calltower_common::{Diagnostic, DiagnosticCategory};

pub struct Reporter {
    color: bool,
}

impl Reporter {
    pub fn new(color: bool) -> Self {
        Reporter { color }
    }

    pub fn render(&self, report: &ScenarioReport) -> String {
        let mut out = String::new();
        for (index, call) in report.calls.iter().enumerate() {
            if index > 0 {
                out.push('\n');
            }
            out.push_str(&self.format_call(call));
        }
        if !report.move_conflicts.is_empty() {
            out.push_str("\n\n");
            out.push_str(&self.heading("move conflicts"));
            for diagnostic in &report.move_conflicts {
                out.push('\n');
                out.push_str(&self.format_diagnostic(diagnostic));
            }
        }
        out.push('\n');
        out
    }

    pub fn format_call(&self, call: &CallReport) -> String {
        let mut output = format!("{} - {}", self.heading(&call.label), self.format_outcome(call.outcome));
        if let Some(resolved) = &call.resolved {
            output.push_str(&format!(": {} => {}", resolved.signature, resolved.result_type));
            if !resolved.type_arguments.is_empty() {
                let arguments: Vec<String> = resolved
                    .type_arguments
                    .iter()
                    .map(|arg| format!("{} = {}", arg.parameter, arg.ty))
                    .collect();
                output.push_str(&self.dim(&format!(" [{}]", arguments.join(", "))));
            }
        }
        for candidate in &call.candidates {
            output.push('\n');
            output.push_str(&self.dim(&format!(
                "  candidate {} ({:?})",
                candidate.signature, candidate.applicability
            )));
        }
        for diagnostic in &call.diagnostics {
            output.push('\n');
            output.push_str(&self.format_diagnostic(diagnostic));
        }
        output
    }

    pub fn format_diagnostic(&self, diagnostic: &Diagnostic) -> String {
        let mut output = format!(
            "  {}..{} - {}",
            diagnostic.span.start,
            diagnostic.span.end,
            self.format_category(diagnostic.category)
        );
        let code = self.format_code(diagnostic.code);
        if !code.is_empty() {
            output.push(' ');
            output.push_str(&code);
        }
        output.push_str(": ");
        output.push_str(&diagnostic.message_text);
        for related in &diagnostic.related_information {
            output.push('\n');
            output.push_str(&self.dim("    Related"));
            output.push_str(": ");
            output.push_str(&related.message_text);
        }
        output
    }

    fn heading(&self, text: &str) -> String {
        if self.color {
            text.bold().to_string()
        } else {
            text.to_string()
        }
    }

    fn dim(&self, text: &str) -> String {
        if self.color {
            text.dimmed().to_string()
        } else {
            text.to_string()
        }
    }

    fn format_outcome(&self, outcome: &str) -> String {
        if !self.color {
            return outcome.to_string();
        }
        match outcome {
            "resolved" => outcome.green().to_string(),
            "cancelled" => outcome.yellow().to_string(),
            _ => outcome.red().bold().to_string(),
        }
    }

    fn format_category(&self, category: DiagnosticCategory) -> String {
        let label = match category {
            DiagnosticCategory::Error => "error",
            DiagnosticCategory::Warning => "warning",
            DiagnosticCategory::Suggestion => "suggestion",
            DiagnosticCategory::Message => "message",
        };

        if !self.color {
            return label.to_string();
        }

        match category {
            DiagnosticCategory::Error => label.red().bold().to_string(),
            DiagnosticCategory::Warning => label.yellow().bold().to_string(),
            DiagnosticCategory::Suggestion => label.blue().bold().to_string(),
            DiagnosticCategory::Message => label.cyan().bold().to_string(),
        }
    }

    fn format_code(&self, code: u32) -> String {
        if code == 0 {
            return String::new();
        }

        let label = format!("CT{code}");
        if self.color {
            label.bright_blue().to_string()
        } else {
            label
        }
    }
}
