//! Call resolution.
//!
//! One call goes through
//! `gathering -> shape check -> constraint solving -> ranking` and ends as
//! [`ResolutionOutcome::Resolved`], [`ResolutionOutcome::Ambiguous`],
//! [`ResolutionOutcome::Inapplicable`] or, when the session's token fires,
//! [`ResolutionOutcome::Cancelled`].
//!
//! Every candidate that survives the shape check gets its own constraint
//! system and its own trace fork; lambda arguments are re-analyzed inside
//! that fork once their parameter types are fixed. Only the chosen
//! candidate's fork reaches the caller's trace.

use crate::applicability::{CandidateApplicability, RenderContext, ResolutionDiagnostic};
use crate::arguments::{ArgumentMapping, map_arguments};
use crate::candidate::{Candidate, ReceiverValue};
use crate::declarations::{DeclId, Declaration, DeclarationKind, Modifiers, ValueParameter};
use crate::error::AnalysisAbort;
use crate::expression::{
    AnalysisScope, CallExpr, CallForm, ContextDependency, ExpressionAnalyzer, LambdaExpr,
    SimpleExpressionAnalyzer,
};
use crate::lambda::{BodyReanalyzer, ExpectedLambdaType, LambdaAnalyzer, SyntheticArgument};
use crate::options::ResolutionOptions;
use crate::sequence::CandidateSequence;
use crate::specificity::{SpecificityKey, most_specific};
use crate::tower::{ImplicitScopeTower, LookupKind};
use crate::trace::{BindingTrace, RecordedCall};
use calltower_common::diagnostics::diagnostic_codes;
use calltower_common::{Atom, Cancelled, Diagnostic, Span};
use calltower_solver::{
    ConstraintError, ConstraintOrigin, ConstraintStorage, ConstraintSystemBuilder,
    ContractViolation, TypeDatabase, TypeFormatter, TypeId, TypeSubstitution, VariableOrigin,
    collect_variables, instantiate_type, is_subtype_of,
};
use rayon::prelude::*;
use rustc_hash::FxHashSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use tracing::{debug, trace};

static DEFAULT_ANALYZER: SimpleExpressionAnalyzer = SimpleExpressionAnalyzer;
static DEFAULT_LAMBDA_ANALYZER: BodyReanalyzer = BodyReanalyzer;

// =============================================================================
// Results
// =============================================================================

/// The unique winner of a call.
#[derive(Clone, Debug)]
pub struct ResolvedCall {
    pub candidate: Candidate,
    /// Receiver bound to the declaration's extension receiver, if any.
    pub extension_receiver: Option<ReceiverValue>,
    /// Inferred type per declared type parameter, in declaration order.
    pub type_arguments: Vec<(TypeId, TypeId)>,
    pub synthetic_arguments: Vec<SyntheticArgument>,
    pub result_type: TypeId,
    pub applicability: CandidateApplicability,
}

impl ResolvedCall {
    pub fn declaration(&self) -> &Arc<Declaration> {
        self.candidate.declaration()
    }

    pub fn type_argument(&self, param: TypeId) -> Option<TypeId> {
        self.type_arguments
            .iter()
            .find(|(p, _)| *p == param)
            .map(|(_, ty)| *ty)
    }
}

#[derive(Clone, Debug)]
pub enum ResolutionOutcome {
    Resolved(Box<ResolvedCall>),
    /// The tied candidates, ordered by declaration id.
    Ambiguous(Vec<Candidate>),
    /// Every candidate found, none applicable. Empty when lookup found nothing.
    Inapplicable(Vec<Candidate>),
    Cancelled,
}

impl ResolutionOutcome {
    pub fn resolved(&self) -> Option<&ResolvedCall> {
        match self {
            ResolutionOutcome::Resolved(call) => Some(call),
            _ => None,
        }
    }

    pub fn is_resolved(&self) -> bool {
        self.resolved().is_some()
    }

    pub fn candidates(&self) -> &[Candidate] {
        match self {
            ResolutionOutcome::Resolved(call) => std::slice::from_ref(&call.candidate),
            ResolutionOutcome::Ambiguous(candidates)
            | ResolutionOutcome::Inapplicable(candidates) => candidates,
            ResolutionOutcome::Cancelled => &[],
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            ResolutionOutcome::Resolved(_) => "resolved",
            ResolutionOutcome::Ambiguous(_) => "ambiguous",
            ResolutionOutcome::Inapplicable(_) => "inapplicable",
            ResolutionOutcome::Cancelled => "cancelled",
        }
    }
}

/// One call of a batch.
pub struct CallRequest<'t, 'a> {
    pub tower: &'t ImplicitScopeTower<'a>,
    pub call: &'t CallExpr,
    pub expected_type: Option<TypeId>,
}

/// `foo(x: Int): String`, `String.len(): Int`, `size: Int`.
pub fn render_signature(db: &dyn TypeDatabase, decl: &Declaration) -> String {
    let formatter = TypeFormatter::new(db);
    let receiver = decl
        .extension_receiver
        .map(|ty| format!("{}.", formatter.format(ty)))
        .unwrap_or_default();
    let name = db.resolve_atom(decl.name);
    let ret = formatter.format(decl.return_type);
    if !decl.is_callable() {
        return format!("{receiver}{name}: {ret}");
    }
    let params: Vec<String> = decl
        .value_params
        .iter()
        .map(|p| {
            format!(
                "{}{}: {}",
                if p.is_vararg { "vararg " } else { "" },
                db.resolve_atom(p.name),
                formatter.format(p.ty)
            )
        })
        .collect();
    format!("{receiver}{name}({}): {ret}", params.join(", "))
}

// =============================================================================
// Per-candidate state
// =============================================================================

struct Solved {
    type_arguments: Vec<(TypeId, TypeId)>,
    synthetic_arguments: Vec<SyntheticArgument>,
    result_type: TypeId,
    /// Substituted parameter type per call argument.
    parameter_types: Vec<TypeId>,
}

struct Attempt {
    candidate: Candidate,
    extension_receiver: Option<ReceiverValue>,
    mapping: ArgumentMapping,
    solved: Option<Solved>,
    trace: BindingTrace,
}

impl Attempt {
    fn specificity_key(&self) -> SpecificityKey {
        let decl = self.candidate.declaration();
        let smart_casts = self
            .candidate
            .diagnostics()
            .iter()
            .filter(|d| matches!(d, ResolutionDiagnostic::UsedSmartCastForDispatchReceiver { .. }))
            .count();
        SpecificityKey {
            declaration: decl.id,
            parameter_types: self
                .solved
                .as_ref()
                .map(|s| s.parameter_types.clone())
                .unwrap_or_default(),
            origin: decl.origin,
            conversions: smart_casts + self.mapping.defaults_used,
            is_generic: decl.is_generic(),
        }
    }
}

/// A lambda argument waiting for its parameter types.
struct PostponedLambda<'e> {
    argument: usize,
    lambda: &'e LambdaExpr,
    expected: TypeId,
}

// =============================================================================
// CallResolver
// =============================================================================

/// Resolves calls against scope towers.
///
/// The resolver itself is stateless apart from the local-id counter; it can
/// be shared by concurrent sessions.
pub struct CallResolver<'a> {
    options: ResolutionOptions,
    analyzer: &'a dyn ExpressionAnalyzer,
    lambda_analyzer: &'a dyn LambdaAnalyzer,
    next_local: AtomicU32,
}

impl CallResolver<'static> {
    /// A resolver using the built-in analyzers.
    pub fn new(options: ResolutionOptions) -> Self {
        CallResolver::with_analyzers(options, &DEFAULT_ANALYZER, &DEFAULT_LAMBDA_ANALYZER)
    }
}

impl<'a> CallResolver<'a> {
    pub fn with_analyzers(
        options: ResolutionOptions,
        analyzer: &'a dyn ExpressionAnalyzer,
        lambda_analyzer: &'a dyn LambdaAnalyzer,
    ) -> Self {
        CallResolver {
            options,
            analyzer,
            lambda_analyzer,
            next_local: AtomicU32::new(0),
        }
    }

    pub fn options(&self) -> &ResolutionOptions {
        &self.options
    }

    pub fn analyzer(&self) -> &'a dyn ExpressionAnalyzer {
        self.analyzer
    }

    /// Fresh id for a session-local declaration.
    pub(crate) fn next_local_id(&self) -> DeclId {
        let offset = self.next_local.fetch_add(1, Ordering::Relaxed) % DeclId::LOCAL_BASE;
        DeclId(DeclId::LOCAL_BASE + offset)
    }

    /// Resolve one call in a fresh session.
    ///
    /// Only contract violations are errors; every resolution problem is part
    /// of the outcome and the returned trace. A cancelled session returns an
    /// empty trace.
    pub fn resolve(
        &self,
        tower: &ImplicitScopeTower<'_>,
        call: &CallExpr,
        expected_type: Option<TypeId>,
    ) -> Result<(ResolutionOutcome, BindingTrace), ContractViolation> {
        let mut trace = BindingTrace::new();
        let scope = AnalysisScope::new(tower).expecting(expected_type);
        match self.resolve_with_trace(&scope, call, &mut trace) {
            Ok(outcome) => Ok((outcome, trace)),
            Err(AnalysisAbort::Cancelled) => {
                debug!(name = call.name.0, "call resolution cancelled");
                Ok((ResolutionOutcome::Cancelled, BindingTrace::new()))
            }
            Err(AnalysisAbort::Contract(violation)) => Err(violation),
        }
    }

    /// Resolve independent calls, each in its own session. Results are in
    /// input order.
    pub fn resolve_all(
        &self,
        requests: &[CallRequest<'_, '_>],
    ) -> Vec<Result<(ResolutionOutcome, BindingTrace), ContractViolation>> {
        let _span = tracing::debug_span!("resolve_all", calls = requests.len()).entered();
        if self.options.parallel {
            requests
                .par_iter()
                .map(|request| self.resolve(request.tower, request.call, request.expected_type))
                .collect()
        } else {
            requests
                .iter()
                .map(|request| self.resolve(request.tower, request.call, request.expected_type))
                .collect()
        }
    }

    /// Resolve a call nested in an expression being analyzed and return its
    /// type (the error type unless it resolved).
    pub fn resolve_call_in_scope(
        &self,
        scope: &AnalysisScope<'_, '_>,
        call: &CallExpr,
        trace: &mut BindingTrace,
    ) -> Result<TypeId, AnalysisAbort> {
        let outcome = self.resolve_with_trace(scope, call, trace)?;
        Ok(outcome
            .resolved()
            .map(|resolved| resolved.result_type)
            .unwrap_or(TypeId::ERROR))
    }

    #[tracing::instrument(level = "debug", skip_all, fields(name = call.name.0))]
    fn resolve_with_trace(
        &self,
        scope: &AnalysisScope<'_, '_>,
        call: &CallExpr,
        trace: &mut BindingTrace,
    ) -> Result<ResolutionOutcome, AnalysisAbort> {
        let receiver = match &call.receiver {
            Some(expr) => {
                let receiver_scope = scope.independent().expecting(None);
                let ty = self.analyzer.analyze(self, &receiver_scope, expr, trace)?;
                Some(ReceiverValue::new(ty))
            }
            None => None,
        };

        let gathered = self.gather(scope, call, receiver.as_ref())?;
        debug!(candidates = gathered.len(), "gathered candidates");

        let mut attempts = Vec::with_capacity(gathered.len());
        for (mut candidate, extension_receiver) in gathered {
            scope.tower.cancellation().check()?;
            let mapping = self.check_shape(&mut candidate, call);
            let mut fork = trace.fork();
            let solved = if candidate.applicability().is_applicable() {
                Some(self.solve(
                    scope,
                    call,
                    &mut candidate,
                    &mapping,
                    extension_receiver.as_ref(),
                    receiver.as_ref(),
                    &mut fork,
                )?)
            } else {
                None
            };
            trace!(
                declaration = candidate.declaration().id.0,
                applicability = ?candidate.applicability(),
                "candidate checked"
            );
            attempts.push(Attempt {
                candidate,
                extension_receiver,
                mapping,
                solved,
                trace: fork,
            });
        }
        Ok(self.conclude(scope, call, attempts, trace))
    }

    // -------------------------------------------------------------------------
    // Gathering
    // -------------------------------------------------------------------------

    fn gather(
        &self,
        scope: &AnalysisScope<'_, '_>,
        call: &CallExpr,
        receiver: Option<&ReceiverValue>,
    ) -> Result<Vec<(Candidate, Option<ReceiverValue>)>, Cancelled> {
        let tower = scope.tower;
        let db = tower.db();
        let mut gathered = Vec::new();
        let kinds: &[LookupKind] = if call.form == CallForm::Regular {
            &[LookupKind::Function, LookupKind::Variable]
        } else {
            &[LookupKind::Function]
        };

        for &kind in kinds {
            let mut found = Vec::new();
            match receiver {
                Some(receiver) => {
                    drain(
                        tower.member_candidates(kind, call.name, receiver, call.safe_call),
                        None,
                        &mut found,
                    )?;
                    drain(
                        tower.candidates(kind, call.name, Some(receiver.clone())),
                        Some(receiver.clone()),
                        &mut found,
                    )?;
                }
                None => {
                    drain(tower.candidates(kind, call.name, None), None, &mut found)?;
                    for implicit in tower.implicit_receivers() {
                        drain(
                            tower.candidates(kind, call.name, Some(implicit.clone())),
                            Some(implicit.clone()),
                            &mut found,
                        )?;
                    }
                }
            }
            if kind == LookupKind::Function && self.options.allow_dynamic {
                drain(
                    tower.dynamic_candidates(kind, call.name, receiver.cloned()),
                    None,
                    &mut found,
                )?;
            }
            if kind == LookupKind::Variable {
                found = found
                    .into_iter()
                    .filter_map(|(candidate, ext)| {
                        invoke_candidate(db, &candidate).map(|invoke| (invoke, ext))
                    })
                    .collect();
            }
            gathered.extend(found);
        }
        Ok(gathered)
    }

    // -------------------------------------------------------------------------
    // Shape check
    // -------------------------------------------------------------------------

    fn check_shape(&self, candidate: &mut Candidate, call: &CallExpr) -> ArgumentMapping {
        let decl = Arc::clone(candidate.declaration());
        let mapping = map_arguments(&decl.value_params, &call.args);
        for diagnostic in &mapping.diagnostics {
            candidate.add_diagnostic(diagnostic.clone());
        }
        if !call.type_args.is_empty() && call.type_args.len() != decl.type_params.len() {
            candidate.add_diagnostic(ResolutionDiagnostic::WrongNumberOfTypeArguments {
                expected: decl.type_params.len(),
            });
        }
        match call.form {
            CallForm::Infix if !decl.modifiers.contains(Modifiers::INFIX) => {
                candidate.add_diagnostic(ResolutionDiagnostic::InfixCallNoInfixModifier);
            }
            CallForm::Operator | CallForm::Invoke
                if !decl.modifiers.contains(Modifiers::OPERATOR) =>
            {
                candidate
                    .add_diagnostic(ResolutionDiagnostic::InvokeConventionCallNoOperatorModifier);
            }
            CallForm::UnaryPlusAsPlus => {
                candidate.add_diagnostic(ResolutionDiagnostic::DeprecatedUnaryPlusAsPlus);
            }
            _ => {}
        }
        mapping
    }

    // -------------------------------------------------------------------------
    // Constraint solving
    // -------------------------------------------------------------------------

    fn solve(
        &self,
        scope: &AnalysisScope<'_, '_>,
        call: &CallExpr,
        candidate: &mut Candidate,
        mapping: &ArgumentMapping,
        extension_receiver: Option<&ReceiverValue>,
        explicit_receiver: Option<&ReceiverValue>,
        trace: &mut BindingTrace,
    ) -> Result<Solved, AnalysisAbort> {
        let db = scope.tower.db();
        let decl = Arc::clone(candidate.declaration());
        let mut builder = ConstraintSystemBuilder::new(db)
            .with_max_iterations(self.options.max_constraint_iterations);

        let mut subst = TypeSubstitution::new();
        for param in &decl.type_params {
            let var = builder.new_type_variable(VariableOrigin::TypeParameter { param: *param });
            subst.insert(*param, builder.variable_type(var));
        }
        for (index, param) in decl.type_params.iter().enumerate() {
            let var_ty = instantiate_type(db, *param, &subst);
            let bound = db.upper_bound(*param);
            if bound != TypeId::NULLABLE_ANY {
                builder.add_subtype_constraint(
                    var_ty,
                    instantiate_type(db, bound, &subst),
                    ConstraintOrigin::DeclaredUpperBound { param: *param },
                );
            }
            if let Some(arg) = call.type_args.get(index) {
                builder.add_equality_constraint(
                    var_ty,
                    *arg,
                    ConstraintOrigin::ExplicitTypeArgument { index },
                );
            }
        }

        if let (Some(expected), Some(receiver)) = (decl.extension_receiver, extension_receiver) {
            let actual = if call.safe_call { db.not_null(receiver.ty) } else { receiver.ty };
            builder.add_subtype_constraint(
                actual,
                instantiate_type(db, expected, &subst),
                ConstraintOrigin::Receiver,
            );
        }

        // Plain arguments first; lambdas wait until their inputs are known.
        let mut postponed = Vec::new();
        for mapped in &mapping.mapped {
            let arg = &call.args[mapped.argument];
            let expected = instantiate_type(db, decl.value_params[mapped.parameter].ty, &subst);
            if let Some(lambda) = arg.value.strip_parentheses().as_lambda() {
                postponed.push(PostponedLambda {
                    argument: mapped.argument,
                    lambda,
                    expected,
                });
                continue;
            }
            let hint = (!builder.mentions_own_variables(expected)).then_some(expected);
            let arg_scope = scope.dependent().expecting(hint);
            let actual = self.analyzer.analyze(self, &arg_scope, &arg.value, trace)?;
            builder.add_subtype_constraint(
                actual,
                expected,
                ConstraintOrigin::Argument {
                    index: mapped.argument,
                },
            );
        }

        let mut synthetic_arguments = Vec::new();
        for postponed in postponed {
            synthetic_arguments.extend(self.solve_lambda(scope, &mut builder, &postponed, trace)?);
        }

        let return_type = instantiate_type(db, decl.return_type, &subst);
        if let Some(expected) = scope.expected_type
            && scope.dependency == ContextDependency::Independent
            && builder.mentions_own_variables(return_type)
        {
            builder.add_subtype_constraint(return_type, expected, ConstraintOrigin::ExpectedType);
        }

        let storage = builder.freeze();
        for error in storage.errors() {
            candidate.add_diagnostic(constraint_diagnostic(db, &storage, error));
        }

        let type_arguments = decl
            .type_params
            .iter()
            .map(|param| (*param, storage.substitute(db, instantiate_type(db, *param, &subst))))
            .collect();
        let mut result_type = storage.substitute(db, return_type);
        if call.safe_call && explicit_receiver.is_some_and(|r| db.is_nullable(r.ty)) {
            result_type = db.nullable(result_type);
        }
        let parameter_types = (0..call.args.len())
            .filter_map(|argument| mapping.parameter_of(argument))
            .map(|parameter| {
                storage.substitute(
                    db,
                    instantiate_type(db, decl.value_params[parameter].ty, &subst),
                )
            })
            .collect();
        Ok(Solved {
            type_arguments,
            synthetic_arguments,
            result_type,
            parameter_types,
        })
    }

    /// Fix what the lambda's parameters depend on, re-analyze its body and
    /// constrain the expected return type by what the body returns.
    fn solve_lambda(
        &self,
        scope: &AnalysisScope<'_, '_>,
        builder: &mut ConstraintSystemBuilder<'_>,
        postponed: &PostponedLambda<'_>,
        trace: &mut BindingTrace,
    ) -> Result<Vec<SyntheticArgument>, AnalysisAbort> {
        let db = scope.tower.db();
        let argument = postponed.argument;
        let lambda_scope = scope.dependent().expecting(None);

        let Some(shape) = db.function_shape(db.not_null(postponed.expected)) else {
            // Lambda passed where a non-function type is expected.
            let ty = self.analyze_lambda_value(&lambda_scope, postponed.lambda, trace)?;
            builder.add_subtype_constraint(ty, postponed.expected, ConstraintOrigin::Argument {
                index: argument,
            });
            return Ok(Vec::new());
        };

        for (index, param) in postponed.lambda.params.iter().enumerate() {
            if let (Some(declared), Some(expected)) = (param.ty, shape.params.get(index)) {
                builder.add_subtype_constraint(
                    *expected,
                    declared,
                    ConstraintOrigin::LambdaParameter { argument, index },
                );
            }
        }
        let params = shape
            .params
            .iter()
            .enumerate()
            .map(|(index, ty)| {
                fix_variables(builder, *ty, ConstraintOrigin::LambdaParameter { argument, index })
            })
            .collect();
        let receiver = shape
            .receiver
            .map(|ty| fix_variables(builder, ty, ConstraintOrigin::LambdaParameter { argument, index: 0 }));
        let expected_return = shape.return_type;
        let expected = ExpectedLambdaType {
            receiver,
            params,
            return_type: (!builder.mentions_own_variables(expected_return)).then_some(expected_return),
        };

        let analysis = self.lambda_analyzer.analyze_and_get_related_calls(
            self,
            &lambda_scope,
            postponed.lambda,
            argument,
            &expected,
            trace,
        )?;

        // A Unit-returning lambda may end in any expression.
        if expected_return != TypeId::UNIT {
            let origin = ConstraintOrigin::LambdaReturn { argument };
            if analysis.synthetic_arguments.is_empty() {
                builder.add_subtype_constraint(TypeId::UNIT, expected_return, origin);
            }
            for synthetic in &analysis.synthetic_arguments {
                builder.add_subtype_constraint(synthetic.ty, expected_return, origin);
            }
        }
        Ok(analysis.synthetic_arguments)
    }

    /// Type a lambda that is not a call argument (or is passed where no
    /// function type is expected).
    pub fn analyze_lambda_value(
        &self,
        scope: &AnalysisScope<'_, '_>,
        lambda: &LambdaExpr,
        trace: &mut BindingTrace,
    ) -> Result<TypeId, AnalysisAbort> {
        let db = scope.tower.db();
        let shape = scope
            .expected_type
            .and_then(|ty| db.function_shape(db.not_null(ty)));
        let expected = match &shape {
            Some(shape) => ExpectedLambdaType {
                receiver: shape.receiver,
                params: shape.params.clone(),
                return_type: Some(shape.return_type),
            },
            None => ExpectedLambdaType {
                receiver: None,
                params: lambda
                    .params
                    .iter()
                    .map(|p| p.ty.unwrap_or(TypeId::ERROR))
                    .collect(),
                return_type: None,
            },
        };
        let body_scope = scope.independent().expecting(None);
        let analysis = self.lambda_analyzer.analyze_and_get_related_calls(
            self, &body_scope, lambda, 0, &expected, trace,
        )?;
        let return_type = match expected.return_type {
            Some(TypeId::UNIT) => TypeId::UNIT,
            _ => analysis.return_type,
        };
        Ok(db.function(expected.receiver, analysis.parameter_types, return_type))
    }

    // -------------------------------------------------------------------------
    // Variables
    // -------------------------------------------------------------------------

    /// Resolve a value reference; `receiver` is the explicit receiver and
    /// whether it is accessed with `?.`.
    pub fn resolve_variable(
        &self,
        scope: &AnalysisScope<'_, '_>,
        receiver: Option<(ReceiverValue, bool)>,
        name: Atom,
        span: Span,
        trace: &mut BindingTrace,
    ) -> Result<TypeId, AnalysisAbort> {
        let tower = scope.tower;
        let db = tower.db();
        let mut found = Vec::new();
        match &receiver {
            Some((receiver, safe_call)) => {
                drain(
                    tower.member_candidates(LookupKind::Variable, name, receiver, *safe_call),
                    None,
                    &mut found,
                )?;
                drain(
                    tower.candidates(LookupKind::Variable, name, Some(receiver.clone())),
                    Some(receiver.clone()),
                    &mut found,
                )?;
            }
            None => {
                drain(tower.candidates(LookupKind::Variable, name, None), None, &mut found)?;
                for implicit in tower.implicit_receivers() {
                    drain(
                        tower.candidates(LookupKind::Variable, name, Some(implicit.clone())),
                        Some(implicit.clone()),
                        &mut found,
                    )?;
                }
                drain(tower.candidates(LookupKind::Object, name, None), None, &mut found)?;
            }
        }
        if self.options.allow_dynamic {
            drain(
                tower.dynamic_candidates(
                    LookupKind::Variable,
                    name,
                    receiver.as_ref().map(|(r, _)| r.clone()),
                ),
                None,
                &mut found,
            )?;
        }

        for (candidate, extension_receiver) in &mut found {
            if let (Some(expected), Some(receiver)) =
                (candidate.declaration().extension_receiver, extension_receiver.as_ref())
                && !is_subtype_of(db, receiver.ty, expected)
            {
                candidate.add_diagnostic(ResolutionDiagnostic::ReceiverTypeMismatch {
                    actual: receiver.ty,
                    expected,
                });
            }
        }

        // Lexical order decides among equally good variables.
        let Some(best) = found.iter().map(|(c, _)| c.applicability()).min() else {
            trace.report(Diagnostic::from_code(
                span,
                diagnostic_codes::UNRESOLVED_REFERENCE,
                &[&db.resolve_atom(name)],
            ));
            return Ok(TypeId::ERROR);
        };
        let Some((chosen, _)) = found.iter().find(|(c, _)| c.applicability() == best) else {
            return Ok(TypeId::ERROR);
        };
        self.report_candidate(scope, chosen, span, &[], !best.is_applicable(), trace);
        let decl = chosen.declaration();
        trace.record_call(
            span,
            RecordedCall {
                declaration: decl.id,
                result_type: decl.return_type,
            },
        );
        Ok(if best.is_applicable() { decl.return_type } else { TypeId::ERROR })
    }

    // -------------------------------------------------------------------------
    // Ranking
    // -------------------------------------------------------------------------

    fn conclude(
        &self,
        scope: &AnalysisScope<'_, '_>,
        call: &CallExpr,
        mut attempts: Vec<Attempt>,
        trace: &mut BindingTrace,
    ) -> ResolutionOutcome {
        let db = scope.tower.db();
        let argument_spans = call.argument_spans();

        let Some(best) = attempts.iter().map(|a| a.candidate.applicability()).min() else {
            trace.report(Diagnostic::from_code(
                call.span,
                diagnostic_codes::UNRESOLVED_REFERENCE,
                &[&db.resolve_atom(call.name)],
            ));
            trace.record_type(call.span, TypeId::ERROR);
            return ResolutionOutcome::Inapplicable(Vec::new());
        };
        // A declaration reachable through several implicit receivers is one
        // candidate: gathering runs innermost receiver first, so the first
        // attempt of each declaration is the one bound to the innermost.
        let mut seen = FxHashSet::default();
        let tied: Vec<usize> = (0..attempts.len())
            .filter(|&i| attempts[i].candidate.applicability() == best)
            .filter(|&i| seen.insert(attempts[i].candidate.declaration().id))
            .collect();

        if !best.is_applicable() {
            debug!(?best, candidates = attempts.len(), "no applicable candidate");
            if let [only] = tied[..] {
                let fork = std::mem::take(&mut attempts[only].trace);
                trace.commit(fork);
                self.report_candidate(
                    scope,
                    &attempts[only].candidate,
                    call.span,
                    &argument_spans,
                    true,
                    trace,
                );
            } else {
                let listed: Vec<String> = tied
                    .iter()
                    .map(|&i| render_signature(db, attempts[i].candidate.declaration()))
                    .collect();
                trace.report(Diagnostic::from_code(
                    call.span,
                    diagnostic_codes::NONE_APPLICABLE,
                    &[&listed.join(", ")],
                ));
            }
            trace.record_type(call.span, TypeId::ERROR);
            return ResolutionOutcome::Inapplicable(
                attempts.into_iter().map(|a| a.candidate).collect(),
            );
        }

        let keys: Vec<SpecificityKey> = tied.iter().map(|&i| attempts[i].specificity_key()).collect();
        match most_specific(db, &keys) {
            Ok(winner) => {
                let attempt = attempts.swap_remove(tied[winner]);
                trace.commit(attempt.trace);
                self.report_candidate(
                    scope,
                    &attempt.candidate,
                    call.span,
                    &argument_spans,
                    false,
                    trace,
                );
                let solved = attempt.solved.unwrap_or(Solved {
                    type_arguments: Vec::new(),
                    synthetic_arguments: Vec::new(),
                    result_type: TypeId::ERROR,
                    parameter_types: Vec::new(),
                });
                let decl = attempt.candidate.declaration();
                debug!(
                    declaration = decl.id.0,
                    result = solved.result_type.0,
                    "call resolved"
                );
                trace.record_call(
                    call.span,
                    RecordedCall {
                        declaration: decl.id,
                        result_type: solved.result_type,
                    },
                );
                trace.record_type(call.span, solved.result_type);
                ResolutionOutcome::Resolved(Box::new(ResolvedCall {
                    candidate: attempt.candidate,
                    extension_receiver: attempt.extension_receiver,
                    type_arguments: solved.type_arguments,
                    synthetic_arguments: solved.synthetic_arguments,
                    result_type: solved.result_type,
                    applicability: best,
                }))
            }
            Err(ambiguous) => {
                let candidates: Vec<Candidate> = ambiguous
                    .iter()
                    .map(|&i| attempts[tied[i]].candidate.clone())
                    .collect();
                debug!(tied = candidates.len(), "call is ambiguous");
                let listed: Vec<String> = candidates
                    .iter()
                    .map(|c| render_signature(db, c.declaration()))
                    .collect();
                trace.report(Diagnostic::from_code(
                    call.span,
                    diagnostic_codes::OVERLOAD_RESOLUTION_AMBIGUITY,
                    &[&listed.join(", ")],
                ));
                trace.record_type(call.span, TypeId::ERROR);
                ResolutionOutcome::Ambiguous(candidates)
            }
        }
    }

    /// Surface the reportable diagnostics of the candidate a call settled on.
    fn report_candidate(
        &self,
        scope: &AnalysisScope<'_, '_>,
        candidate: &Candidate,
        call_span: Span,
        argument_spans: &[Span],
        call_failed: bool,
        trace: &mut BindingTrace,
    ) {
        let tier = candidate.applicability();
        let ctx = RenderContext {
            db: scope.tower.db(),
            tree: scope.tower.tree(),
            declaration: candidate.declaration(),
            call_span,
            argument_spans,
        };
        for diagnostic in candidate.diagnostics() {
            if diagnostic.should_report(tier, call_failed, self.options.report_internal_diagnostics)
            {
                trace.report(diagnostic.to_diagnostic(&ctx));
            }
        }
    }
}

fn drain(
    sequence: CandidateSequence<'_>,
    extension_receiver: Option<ReceiverValue>,
    into: &mut Vec<(Candidate, Option<ReceiverValue>)>,
) -> Result<(), Cancelled> {
    for candidate in sequence {
        into.push((candidate?, extension_receiver.clone()));
    }
    Ok(())
}

/// A function-typed variable called with `f(...)`, as a call to its `invoke`.
fn invoke_candidate(db: &dyn TypeDatabase, variable: &Candidate) -> Option<Candidate> {
    let decl = variable.declaration();
    let shape = db.function_shape(decl.return_type)?;
    let mut invoke = (**decl).clone();
    invoke.kind = DeclarationKind::Function;
    invoke.value_params = shape
        .receiver
        .into_iter()
        .chain(shape.params.iter().copied())
        .enumerate()
        .map(|(index, ty)| ValueParameter::new(db.intern_string(&format!("p{}", index + 1)), ty))
        .collect();
    invoke.return_type = shape.return_type;
    invoke.modifiers |= Modifiers::OPERATOR;
    Some(variable.copy(Arc::new(invoke)))
}

/// Replace the builder's variables in `ty` by their current solutions,
/// pinning each fixed variable with an equality constraint. What cannot be
/// fixed yet becomes the error type.
fn fix_variables(
    builder: &mut ConstraintSystemBuilder<'_>,
    ty: TypeId,
    origin: ConstraintOrigin,
) -> TypeId {
    if !builder.mentions_own_variables(ty) {
        return ty;
    }
    let db = builder.db();
    let mut fixed = TypeSubstitution::new();
    for var in collect_variables(db, ty) {
        let var_ty = db.variable(var);
        if !builder.mentions_own_variables(var_ty) {
            continue;
        }
        if let Some(solution) = builder.current_solution(var) {
            builder.add_equality_constraint(var_ty, solution, origin);
            fixed.insert(var_ty, solution);
        }
    }
    let ty = instantiate_type(db, ty, &fixed);
    if builder.mentions_own_variables(ty) {
        TypeId::ERROR
    } else {
        ty
    }
}

fn constraint_diagnostic(
    db: &dyn TypeDatabase,
    storage: &ConstraintStorage,
    error: &ConstraintError,
) -> ResolutionDiagnostic {
    let shown = |ty: TypeId| storage.substitute(db, ty);
    let param_of = |variable| {
        storage
            .variables()
            .iter()
            .find(|info| info.var == variable)
            .and_then(|info| match info.origin {
                VariableOrigin::TypeParameter { param } => Some(param),
                _ => None,
            })
    };
    match error {
        ConstraintError::Unsatisfiable {
            lower,
            upper,
            origin: ConstraintOrigin::Argument { index },
        } => ResolutionDiagnostic::ArgumentTypeMismatch {
            argument: *index,
            actual: shown(*lower),
            expected: shown(*upper),
        },
        ConstraintError::Unsatisfiable {
            lower,
            upper,
            origin: ConstraintOrigin::Receiver,
        } => ResolutionDiagnostic::ReceiverTypeMismatch {
            actual: shown(*lower),
            expected: shown(*upper),
        },
        ConstraintError::Unsatisfiable {
            lower,
            upper,
            origin,
        } => ResolutionDiagnostic::ConstraintUnsatisfiable {
            lower: shown(*lower),
            upper: shown(*upper),
            origin: *origin,
        },
        ConstraintError::NotEnoughInformation { variable }
        | ConstraintError::NoCommonSubtype { variable, .. } => {
            ResolutionDiagnostic::TypeInferenceFailed {
                param: param_of(*variable),
            }
        }
        ConstraintError::DecompositionTooDeep { origin } => {
            ResolutionDiagnostic::ConstraintUnsatisfiable {
                lower: TypeId::ERROR,
                upper: TypeId::ERROR,
                origin: *origin,
            }
        }
    }
}

#[cfg(test)]
#[path = "../tests/resolver_tests.rs"]
mod resolver_tests;
