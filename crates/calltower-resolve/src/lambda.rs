//! Lambda re-analysis.
//!
//! A lambda argument is typed only after the enclosing call's constraint
//! system has fixed what it can about the lambda's parameters. The body is
//! then analyzed through the general expression analyzer with the lambda's
//! parameters as the innermost locals, and the final statement (one level of
//! parentheses stripped) is handed back as a *synthetic argument*: an extra
//! value the caller constrains against the expected return type. That is how
//! a generic function's type parameters get determined by what the lambda
//! returns.
//!
//! Everything the body records goes into the trace the caller passes, which
//! for call resolution is the candidate's own fork.

use crate::candidate::ReceiverValue;
use crate::declarations::{Declaration, DeclarationKind};
use crate::error::AnalysisAbort;
use crate::expression::{AnalysisScope, LambdaExpr, Statement};
use crate::resolver::CallResolver;
use crate::tower::DeclarationLevel;
use crate::trace::BindingTrace;
use calltower_common::Span;
use calltower_solver::{ContractViolation, TypeId};
use std::sync::Arc;
use tracing::{debug, trace};

/// What the call expects of a lambda argument, as far as it is known.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExpectedLambdaType {
    pub receiver: Option<TypeId>,
    /// Parameter types; the error type where inference could not fix one.
    pub params: Vec<TypeId>,
    /// `None` while the return type is still an open variable.
    pub return_type: Option<TypeId>,
}

/// The implicit return value of a lambda, typed in the lambda's context.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct SyntheticArgument {
    pub ty: TypeId,
    pub span: Span,
    /// Index of the lambda among the call's arguments.
    pub lambda_argument: usize,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LambdaAnalysis {
    /// Empty when the body has no trailing expression.
    pub synthetic_arguments: Vec<SyntheticArgument>,
    pub parameter_types: Vec<TypeId>,
    /// Type of the trailing expression, `Unit` without one.
    pub return_type: TypeId,
}

pub trait LambdaAnalyzer: Send + Sync {
    /// Re-analyze `lambda` against `expected` and return the synthetic
    /// arguments that relate its body to the enclosing call.
    fn analyze_and_get_related_calls(
        &self,
        resolver: &CallResolver<'_>,
        scope: &AnalysisScope<'_, '_>,
        lambda: &LambdaExpr,
        argument: usize,
        expected: &ExpectedLambdaType,
        trace: &mut BindingTrace,
    ) -> Result<LambdaAnalysis, AnalysisAbort>;
}

#[derive(Debug, Default)]
pub struct BodyReanalyzer;

impl BodyReanalyzer {
    fn local(
        resolver: &CallResolver<'_>,
        scope: &AnalysisScope<'_, '_>,
        name: calltower_common::Atom,
        ty: TypeId,
    ) -> Arc<Declaration> {
        let mut decl = Declaration::new(name, DeclarationKind::Variable, scope.tower.location());
        decl.id = resolver.next_local_id();
        decl.return_type = ty;
        Arc::new(decl)
    }
}

impl LambdaAnalyzer for BodyReanalyzer {
    fn analyze_and_get_related_calls(
        &self,
        resolver: &CallResolver<'_>,
        scope: &AnalysisScope<'_, '_>,
        lambda: &LambdaExpr,
        argument: usize,
        expected: &ExpectedLambdaType,
        trace: &mut BindingTrace,
    ) -> Result<LambdaAnalysis, AnalysisAbort> {
        let depth = scope.lambda_depth + 1;
        let limit = resolver.options().max_lambda_nesting_depth;
        if depth > limit {
            return Err(ContractViolation::NestingTooDeep { depth, limit }.into());
        }
        let db = scope.tower.db();

        // A single expected parameter with none written is `it`.
        let mut parameter_types = Vec::with_capacity(expected.params.len());
        let mut parameters = Vec::new();
        if lambda.params.is_empty() && expected.params.len() == 1 {
            let ty = expected.params[0];
            parameter_types.push(ty);
            parameters.push(Self::local(resolver, scope, db.intern_string("it"), ty));
        } else {
            for (index, param) in lambda.params.iter().enumerate() {
                let ty = param
                    .ty
                    .or_else(|| expected.params.get(index).copied())
                    .unwrap_or(TypeId::ERROR);
                parameter_types.push(ty);
                parameters.push(Self::local(resolver, scope, param.name, ty));
            }
        }
        debug!(
            argument,
            depth,
            params = parameter_types.len(),
            "re-analyzing lambda body"
        );

        let mut tower = match expected.receiver {
            Some(receiver) => scope.tower.with_innermost_receiver(ReceiverValue::new(receiver)),
            None => scope.tower.clone(),
        };
        if !parameters.is_empty() {
            tower = tower.with_innermost_level(Arc::new(DeclarationLevel::local(parameters)));
        }

        let mut synthetic_arguments = Vec::new();
        let mut return_type = TypeId::UNIT;
        let last = lambda.body.len().checked_sub(1);
        for (index, statement) in lambda.body.iter().enumerate() {
            let body_scope = AnalysisScope {
                tower: &tower,
                expected_type: None,
                dependency: scope.dependency,
                lambda_depth: depth,
            };
            match statement {
                Statement::Local {
                    name,
                    ty,
                    initializer,
                    ..
                } => {
                    let init_scope = body_scope.independent().expecting(*ty);
                    let init_ty = resolver.analyzer().analyze(resolver, &init_scope, initializer, trace)?;
                    let local = Self::local(resolver, &body_scope, *name, ty.unwrap_or(init_ty));
                    tower = tower.with_innermost_level(Arc::new(DeclarationLevel::local(vec![local])));
                }
                Statement::Expression(expr) if Some(index) == last => {
                    let value = expr.strip_parentheses();
                    let value_scope = body_scope.dependent().expecting(expected.return_type);
                    let ty = resolver.analyzer().analyze(resolver, &value_scope, value, trace)?;
                    trace!(argument, ty = ty.0, "lambda return value");
                    return_type = ty;
                    synthetic_arguments.push(SyntheticArgument {
                        ty,
                        span: value.span,
                        lambda_argument: argument,
                    });
                }
                Statement::Expression(expr) => {
                    resolver
                        .analyzer()
                        .analyze(resolver, &body_scope.independent(), expr, trace)?;
                }
            }
        }

        let lambda_type = db.function(expected.receiver, parameter_types.clone(), return_type);
        trace.record_type(lambda.span, lambda_type);
        Ok(LambdaAnalysis {
            synthetic_arguments,
            parameter_types,
            return_type,
        })
    }
}

#[cfg(test)]
#[path = "../tests/lambda_tests.rs"]
mod lambda_tests;
