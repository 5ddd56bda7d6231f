use calltower_resolve::ResolutionOptions;
use clap::{Parser, ValueEnum};
use std::path::PathBuf;

/// CLI arguments for the calltower binary.
#[derive(Parser, Debug)]
#[command(
    name = "calltower",
    version,
    about = "Resolve the calls of a scenario file and report the chosen overloads"
)]
pub struct CliArgs {
    /// Scenario file (JSON).
    pub scenario: PathBuf,

    /// Report format written to stdout.
    #[arg(long, value_enum, ignore_case = true, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,

    /// Colorize text output. Defaults to on when stdout is a terminal.
    #[arg(long)]
    pub pretty: Option<bool>,

    /// Fall back to dynamic candidates when nothing else resolves.
    #[arg(long = "allowDynamic", alias = "allow-dynamic")]
    pub allow_dynamic: bool,

    /// Also report diagnostics that only explain ranking.
    #[arg(long = "reportInternal", alias = "report-internal")]
    pub report_internal: bool,

    /// Resolve calls one at a time instead of on the thread pool.
    #[arg(long)]
    pub sequential: bool,

    /// Maximum depth of nested lambda re-analysis.
    #[arg(long = "maxLambdaDepth", alias = "max-lambda-depth")]
    pub max_lambda_depth: Option<u32>,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

impl CliArgs {
    /// Command-line flags override the scenario's own options.
    pub fn apply_to(&self, options: &mut ResolutionOptions) {
        if self.allow_dynamic {
            options.allow_dynamic = true;
        }
        if self.report_internal {
            options.report_internal_diagnostics = true;
        }
        if self.sequential {
            options.parallel = false;
        }
        if let Some(depth) = self.max_lambda_depth {
            options.max_lambda_nesting_depth = depth;
        }
    }
}
