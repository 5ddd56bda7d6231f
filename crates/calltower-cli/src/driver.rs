//! Runs a scenario: lowers each call, resolves the batch and collects reports.

use crate::scenario::{
    ArgSpec, CallExprSpec, CallFormSpec, CallSpec, ExprSpec, LambdaSpec, MoveCheckSpec, Program,
    Scenario, StatementSpec, parse_scenario,
};
use anyhow::{Context, Result, anyhow, bail};
use calltower_common::{CancellationToken, Diagnostic, Span};
use calltower_resolve::expression::ExprKind;
use calltower_resolve::{
    BinaryOp, CallArgument, CallExpr, CallForm, CallRequest, CallResolver, CandidateApplicability,
    DeclarationLevel, Expr, ImplicitScopeTower, LambdaExpr, LambdaParam, MoveConflictChecker,
    ReceiverValue, Reference, ResolutionOptions, ResolutionOutcome, Statement, render_signature,
};
use calltower_solver::TypeDatabase;
use serde::Serialize;
use std::path::Path;
use tracing::{debug, info};

// =============================================================================
// Reports
// =============================================================================

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScenarioReport {
    pub calls: Vec<CallReport>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub move_conflicts: Vec<Diagnostic>,
}

impl ScenarioReport {
    pub fn has_errors(&self) -> bool {
        self.move_conflicts.iter().any(Diagnostic::is_error)
            || self
                .calls
                .iter()
                .any(|c| c.outcome != "resolved" || c.diagnostics.iter().any(Diagnostic::is_error))
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CallReport {
    pub label: String,
    pub outcome: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resolved: Option<ResolvedReport>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub candidates: Vec<CandidateReport>,
    pub diagnostics: Vec<Diagnostic>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolvedReport {
    pub signature: String,
    pub result_type: String,
    pub applicability: CandidateApplicability,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub type_arguments: Vec<TypeArgumentReport>,
}

#[derive(Debug, Serialize)]
pub struct TypeArgumentReport {
    pub parameter: String,
    #[serde(rename = "type")]
    pub ty: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CandidateReport {
    pub signature: String,
    pub applicability: CandidateApplicability,
}

// =============================================================================
// Entry points
// =============================================================================

pub fn run_file(path: &Path, configure: impl FnOnce(&mut ResolutionOptions)) -> Result<ScenarioReport> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    let mut scenario = parse_scenario(&text).with_context(|| path.display().to_string())?;
    configure(&mut scenario.options);
    run_scenario(&scenario)
}

pub fn run_scenario(scenario: &Scenario) -> Result<ScenarioReport> {
    let program = Program::build(scenario)?;
    let mut lowering = Lowering {
        program: &program,
        next_offset: 0,
    };

    let mut towers = Vec::with_capacity(scenario.calls.len());
    let mut calls = Vec::with_capacity(scenario.calls.len());
    let mut expected = Vec::with_capacity(scenario.calls.len());
    for (index, spec) in scenario.calls.iter().enumerate() {
        let context = || format!("call #{} ({})", index + 1, spec.call.name);
        towers.push(build_tower(&program, spec).with_context(context)?);
        calls.push(lowering.call(&spec.call).with_context(context)?);
        expected.push(
            spec.expected
                .as_deref()
                .map(|ty| program.resolve_type(ty, &[]))
                .transpose()
                .with_context(context)?,
        );
    }

    let requests: Vec<CallRequest<'_, '_>> = towers
        .iter()
        .zip(&calls)
        .zip(&expected)
        .map(|((tower, call), expected_type)| CallRequest {
            tower,
            call,
            expected_type: *expected_type,
        })
        .collect();

    let resolver = CallResolver::new(scenario.options.clone());
    let results = resolver.resolve_all(&requests);
    info!(calls = results.len(), "scenario resolved");

    let mut reports = Vec::with_capacity(results.len());
    for ((index, spec), result) in scenario.calls.iter().enumerate().zip(results) {
        let (outcome, trace) = result.map_err(|violation| {
            anyhow!("call #{} ({}): {violation}", index + 1, spec.call.name)
        })?;
        let label = spec
            .label
            .clone()
            .unwrap_or_else(|| format!("#{} {}", index + 1, spec.call.name));
        reports.push(call_report(
            &program,
            label,
            &outcome,
            trace.diagnostics().cloned().collect(),
        ));
    }

    let move_conflicts = match &scenario.move_check {
        Some(check) => run_move_check(&program, check, &mut lowering)?,
        None => Vec::new(),
    };
    Ok(ScenarioReport {
        calls: reports,
        move_conflicts,
    })
}

fn call_report(
    program: &Program,
    label: String,
    outcome: &ResolutionOutcome,
    diagnostics: Vec<Diagnostic>,
) -> CallReport {
    let db: &dyn TypeDatabase = &program.types;
    let resolved = outcome.resolved().map(|call| ResolvedReport {
        signature: render_signature(db, call.declaration()),
        result_type: program.describe_type(call.result_type),
        applicability: call.applicability,
        type_arguments: call
            .type_arguments
            .iter()
            .map(|(param, ty)| TypeArgumentReport {
                parameter: program.describe_type(*param),
                ty: program.describe_type(*ty),
            })
            .collect(),
    });
    let candidates = match outcome {
        ResolutionOutcome::Resolved(_) => Vec::new(),
        _ => outcome
            .candidates()
            .iter()
            .map(|candidate| CandidateReport {
                signature: render_signature(db, candidate.declaration()),
                applicability: candidate.applicability(),
            })
            .collect(),
    };
    debug!(%label, outcome = outcome.label(), "call reported");
    CallReport {
        label,
        outcome: outcome.label(),
        resolved,
        candidates,
        diagnostics,
    }
}

fn run_move_check(
    program: &Program,
    check: &MoveCheckSpec,
    lowering: &mut Lowering<'_>,
) -> Result<Vec<Diagnostic>> {
    let mut moved = Vec::new();
    for label in &check.declarations {
        moved.extend(program.declarations(label)?.iter().map(|decl| decl.id));
    }
    let references = check
        .references
        .iter()
        .map(|reference| {
            Ok(Reference {
                site: program.container(&reference.site)?,
                target: program.single(&reference.target)?.id,
                span: lowering.span(),
            })
        })
        .collect::<Result<Vec<_>>>()?;
    let target = program.container(&check.target)?;
    let checker = MoveConflictChecker::new(&program.types, &program.tree, &program.store, moved, target);
    let conflicts = checker.check_all(&references);
    debug!(conflicts = conflicts.len(), "move check finished");
    Ok(conflicts)
}

/// Levels marked `local` come first, then the implicit receivers' members,
/// then the remaining levels.
fn build_tower<'p>(program: &'p Program, spec: &CallSpec) -> Result<ImplicitScopeTower<'p>> {
    let location = match &spec.location {
        Some(name) => program.container(name)?,
        None => program.root,
    };
    let mut tower = ImplicitScopeTower::new(&program.types, &program.tree, location)
        .with_member_index(&program.members);
    if spec.debugger {
        tower = tower.debugger_context();
    }
    if spec.cancelled {
        let token = CancellationToken::new();
        token.cancel();
        tower = tower.with_cancellation(token);
    }

    let mut outer = Vec::new();
    match &spec.levels {
        Some(levels) => {
            for level in levels {
                let mut declarations = Vec::new();
                for label in &level.declarations {
                    declarations.extend(program.declarations(label)?.iter().cloned());
                }
                if level.local {
                    tower.push_level(DeclarationLevel::local(declarations));
                } else {
                    outer.push(DeclarationLevel::importing(declarations));
                }
            }
        }
        None => outer.push(DeclarationLevel::importing(program.top_level().to_vec())),
    }
    for receiver in &spec.implicit_receivers {
        let ty = program.resolve_type(receiver, &[])?;
        tower.push_implicit_receiver(ReceiverValue::new(ty));
    }
    for level in outer {
        tower.push_level(level);
    }
    Ok(tower)
}

// =============================================================================
// Lowering
// =============================================================================

/// Turns scenario expressions into resolver expressions with distinct spans.
struct Lowering<'p> {
    program: &'p Program,
    next_offset: u32,
}

impl Lowering<'_> {
    fn span(&mut self) -> Span {
        let start = self.next_offset;
        self.next_offset += 1;
        Span::new(start, start + 1)
    }

    fn atom(&self, text: &str) -> calltower_common::Atom {
        self.program.types.intern_string(text)
    }

    fn call(&mut self, spec: &CallExprSpec) -> Result<CallExpr> {
        let span = self.span();
        let receiver = spec.receiver.as_deref().map(|r| self.expr(r)).transpose()?;
        let mut args = Vec::with_capacity(spec.args.len() + 1);
        for arg in &spec.args {
            args.push(match arg {
                ArgSpec::Named { name, value } => CallArgument::named(self.atom(name), self.expr(value)?),
                ArgSpec::Positional(value) => CallArgument::positional(self.expr(value)?),
            });
        }
        if let Some(lambda) = &spec.lambda {
            args.push(CallArgument::trailing_lambda(self.lambda(lambda)?));
        }
        let type_args = spec
            .type_args
            .iter()
            .map(|ty| self.program.resolve_type(ty, &[]))
            .collect::<Result<Vec<_>>>()?;

        let mut call = CallExpr::new(self.atom(&spec.name), args, span)
            .with_type_args(type_args)
            .with_form(call_form(spec.form));
        if let Some(receiver) = receiver {
            call = call.with_receiver(receiver);
        }
        call.safe_call = spec.safe;
        Ok(call)
    }

    fn lambda(&mut self, spec: &LambdaSpec) -> Result<LambdaExpr> {
        let span = self.span();
        let params = spec
            .params
            .iter()
            .map(|param| {
                Ok(LambdaParam {
                    name: self.atom(&param.name),
                    ty: param
                        .ty
                        .as_deref()
                        .map(|ty| self.program.resolve_type(ty, &[]))
                        .transpose()?,
                })
            })
            .collect::<Result<Vec<_>>>()?;
        let mut body = Vec::with_capacity(spec.body.len());
        for statement in &spec.body {
            body.push(match statement {
                StatementSpec::Local { val, ty, init } => Statement::Local {
                    name: self.atom(val),
                    ty: ty
                        .as_deref()
                        .map(|ty| self.program.resolve_type(ty, &[]))
                        .transpose()?,
                    initializer: self.expr(init)?,
                    span: self.span(),
                },
                StatementSpec::Expression(expr) => Statement::Expression(self.expr(expr)?),
            });
        }
        Ok(LambdaExpr::new(params, body, span))
    }

    fn expr(&mut self, spec: &ExprSpec) -> Result<Expr> {
        let kind = match spec {
            ExprSpec::Int(value) => ExprKind::IntLiteral(*value),
            ExprSpec::Long(value) => ExprKind::LongLiteral(*value),
            ExprSpec::Double(value) => ExprKind::DoubleLiteral(*value),
            ExprSpec::Bool(value) => ExprKind::BooleanLiteral(*value),
            ExprSpec::String(value) => ExprKind::StringLiteral(value.clone()),
            ExprSpec::Char(value) => ExprKind::CharLiteral(*value),
            ExprSpec::Null => ExprKind::NullLiteral,
            ExprSpec::This => ExprKind::This,
            ExprSpec::Name(name) => ExprKind::Name(self.atom(name)),
            ExprSpec::Member {
                receiver,
                name,
                safe,
            } => ExprKind::Member {
                receiver: Box::new(self.expr(receiver)?),
                name: self.atom(name),
                safe: *safe,
            },
            ExprSpec::Call(call) => return Ok(Expr::call(self.call(call)?)),
            ExprSpec::Binary { op, lhs, rhs } => {
                let op = binary_op(op)?;
                return Ok(Expr::binary(op, self.expr(lhs)?, self.expr(rhs)?));
            }
            ExprSpec::Lambda(lambda) => return Ok(Expr::lambda(self.lambda(lambda)?)),
            ExprSpec::Paren(inner) => {
                let span = self.span();
                return Ok(Expr::parenthesized(self.expr(inner)?, span));
            }
            ExprSpec::Typed(ty) => ExprKind::Typed(self.program.resolve_type(ty, &[])?),
        };
        Ok(Expr::new(kind, self.span()))
    }
}

fn call_form(form: CallFormSpec) -> CallForm {
    match form {
        CallFormSpec::Regular => CallForm::Regular,
        CallFormSpec::Infix => CallForm::Infix,
        CallFormSpec::Operator => CallForm::Operator,
        CallFormSpec::Invoke => CallForm::Invoke,
        CallFormSpec::UnaryPlusAsPlus => CallForm::UnaryPlusAsPlus,
    }
}

fn binary_op(op: &str) -> Result<BinaryOp> {
    Ok(match op {
        "+" => BinaryOp::Add,
        "-" => BinaryOp::Sub,
        "*" => BinaryOp::Mul,
        "/" => BinaryOp::Div,
        "%" => BinaryOp::Rem,
        "<" => BinaryOp::Lt,
        ">" => BinaryOp::Gt,
        "<=" => BinaryOp::Le,
        ">=" => BinaryOp::Ge,
        "==" => BinaryOp::Eq,
        "!=" => BinaryOp::NotEq,
        other => bail!("unknown operator '{other}'"),
    })
}

#[cfg(test)]
#[path = "../tests/driver_tests.rs"]
mod driver_tests;
