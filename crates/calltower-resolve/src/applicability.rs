//! Resolution diagnostics and applicability tiers.
//!
//! Every fact recorded on a candidate is a [`ResolutionDiagnostic`] variant
//! with a fixed [`CandidateApplicability`] tier. A candidate's overall tier is
//! the worst tier among its diagnostics, or [`CandidateApplicability::Resolved`]
//! when it has none.

use crate::declarations::{ContainerId, Declaration, Visibility};
use crate::visibility::ContainerTree;
use calltower_common::Atom;
use calltower_common::diagnostics::{Diagnostic, diagnostic_codes};
use calltower_common::span::Span;
use calltower_solver::{ClassId, ConstraintOrigin, TypeDatabase, TypeFormatter, TypeId};
use serde::{Deserialize, Serialize};

/// Severity tiers, best first.
#[derive(
    Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub enum CandidateApplicability {
    Resolved,
    ResolvedSynthesized,
    ResolvedLowPriority,
    ConventionError,
    MayThrowRuntimeError,
    RuntimeError,
    ImpossibleToGenerate,
    Inapplicable,
    Hidden,
}

impl CandidateApplicability {
    /// Resolved without any error.
    pub fn is_success(self) -> bool {
        self <= CandidateApplicability::ResolvedLowPriority
    }

    /// Still usable as the resolution of a call, possibly with reported errors.
    pub fn is_applicable(self) -> bool {
        self < CandidateApplicability::Inapplicable
    }
}

/// A fact about a candidate that affects its ranking.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ResolutionDiagnostic {
    VisibilityError {
        visibility: Visibility,
        container: ContainerId,
    },
    NestedClassViaInstanceReference {
        class: ClassId,
    },
    InnerClassViaStaticReference {
        class: ClassId,
    },
    UnsupportedInnerClassCall {
        message: String,
    },
    UsedSmartCastForDispatchReceiver {
        smart_cast_type: TypeId,
    },
    ErrorDescriptor,
    LowPriorityDescriptor,
    DynamicDescriptor,
    SynthesizedDescriptor,
    UnstableSmartCast {
        smart_cast_type: TypeId,
    },
    /// Member call on a nullable receiver without a safe call.
    UnsafeCall {
        receiver: TypeId,
    },
    ExtensionWithStaticTypeWithDynamicReceiver,
    HiddenDescriptor,
    InvokeConventionCallNoOperatorModifier,
    InfixCallNoInfixModifier,
    DeprecatedUnaryPlusAsPlus,
    TooManyArguments {
        argument: usize,
    },
    NoValueForParameter {
        parameter: Atom,
    },
    NamedParameterNotFound {
        argument: usize,
        name: Atom,
    },
    ArgumentPassedTwice {
        argument: usize,
        parameter: Atom,
    },
    MixingNamedAndPositionalArguments {
        argument: usize,
    },
    WrongNumberOfTypeArguments {
        expected: usize,
    },
    ArgumentTypeMismatch {
        argument: usize,
        actual: TypeId,
        expected: TypeId,
    },
    ReceiverTypeMismatch {
        actual: TypeId,
        expected: TypeId,
    },
    ConstraintUnsatisfiable {
        lower: TypeId,
        upper: TypeId,
        origin: ConstraintOrigin,
    },
    TypeInferenceFailed {
        /// The type parameter the failed variable stands for, if any.
        param: Option<TypeId>,
    },
}

impl ResolutionDiagnostic {
    pub fn applicability(&self) -> CandidateApplicability {
        use CandidateApplicability as A;
        use ResolutionDiagnostic as D;
        match self {
            D::VisibilityError { .. } => A::RuntimeError,
            D::NestedClassViaInstanceReference { .. }
            | D::InnerClassViaStaticReference { .. }
            | D::UnsupportedInnerClassCall { .. } => A::ImpossibleToGenerate,
            D::UsedSmartCastForDispatchReceiver { .. } | D::ErrorDescriptor => A::Resolved,
            D::LowPriorityDescriptor | D::DynamicDescriptor => A::ResolvedLowPriority,
            D::SynthesizedDescriptor => A::ResolvedSynthesized,
            D::UnstableSmartCast { .. } | D::UnsafeCall { .. } => A::MayThrowRuntimeError,
            D::ExtensionWithStaticTypeWithDynamicReceiver | D::HiddenDescriptor => A::Hidden,
            D::InvokeConventionCallNoOperatorModifier
            | D::InfixCallNoInfixModifier
            | D::DeprecatedUnaryPlusAsPlus => A::ConventionError,
            D::TooManyArguments { .. }
            | D::NoValueForParameter { .. }
            | D::NamedParameterNotFound { .. }
            | D::ArgumentPassedTwice { .. }
            | D::MixingNamedAndPositionalArguments { .. }
            | D::WrongNumberOfTypeArguments { .. }
            | D::ArgumentTypeMismatch { .. }
            | D::ReceiverTypeMismatch { .. }
            | D::ConstraintUnsatisfiable { .. }
            | D::TypeInferenceFailed { .. } => A::Inapplicable,
        }
    }

    /// Internal markers only steer ranking; everything else is user-facing.
    pub fn is_internal(&self) -> bool {
        matches!(
            self,
            ResolutionDiagnostic::UsedSmartCastForDispatchReceiver { .. }
                | ResolutionDiagnostic::ErrorDescriptor
                | ResolutionDiagnostic::LowPriorityDescriptor
                | ResolutionDiagnostic::DynamicDescriptor
                | ResolutionDiagnostic::SynthesizedDescriptor
                | ResolutionDiagnostic::ExtensionWithStaticTypeWithDynamicReceiver
                | ResolutionDiagnostic::HiddenDescriptor
        )
    }

    /// Whether to surface this diagnostic for a candidate of tier `tier`.
    ///
    /// Internal markers are surfaced when they decided a failed call or when
    /// `report_internal` is set.
    pub fn should_report(
        &self,
        tier: CandidateApplicability,
        call_failed: bool,
        report_internal: bool,
    ) -> bool {
        !self.is_internal()
            || report_internal
            || (call_failed && self.applicability() == tier)
    }

    /// Argument the diagnostic points at, if any.
    pub fn argument(&self) -> Option<usize> {
        match self {
            ResolutionDiagnostic::TooManyArguments { argument }
            | ResolutionDiagnostic::NamedParameterNotFound { argument, .. }
            | ResolutionDiagnostic::ArgumentPassedTwice { argument, .. }
            | ResolutionDiagnostic::MixingNamedAndPositionalArguments { argument }
            | ResolutionDiagnostic::ArgumentTypeMismatch { argument, .. } => Some(*argument),
            ResolutionDiagnostic::ConstraintUnsatisfiable {
                origin:
                    ConstraintOrigin::Argument { index }
                    | ConstraintOrigin::LambdaReturn { argument: index }
                    | ConstraintOrigin::LambdaParameter { argument: index, .. },
                ..
            } => Some(*index),
            _ => None,
        }
    }

    /// Render for the diagnostics sink.
    pub fn to_diagnostic(&self, ctx: &RenderContext<'_>) -> Diagnostic {
        use ResolutionDiagnostic as D;
        use diagnostic_codes as codes;
        let span = self
            .argument()
            .and_then(|index| ctx.argument_spans.get(index).copied())
            .unwrap_or(ctx.call_span);
        let formatter = TypeFormatter::new(ctx.db);
        let name = ctx.db.resolve_atom(ctx.declaration.name);
        let class_name = |class: &ClassId| {
            ctx.db
                .class_info(*class)
                .map(|info| ctx.db.resolve_atom(info.name))
                .unwrap_or_else(|| format!("<class#{}>", class.0))
        };
        match self {
            D::VisibilityError {
                visibility,
                container,
            } => {
                let container_name = ctx
                    .tree
                    .get(*container)
                    .map(|info| ctx.db.resolve_atom(info.name))
                    .unwrap_or_default();
                Diagnostic::from_code(
                    span,
                    codes::INVISIBLE_MEMBER,
                    &[&name, visibility.keyword(), &container_name],
                )
            }
            D::NestedClassViaInstanceReference { class } => Diagnostic::from_code(
                span,
                codes::NESTED_CLASS_VIA_INSTANCE_REFERENCE,
                &[&class_name(class)],
            ),
            D::InnerClassViaStaticReference { class } => Diagnostic::from_code(
                span,
                codes::INNER_CLASS_VIA_STATIC_REFERENCE,
                &[&class_name(class)],
            ),
            D::UnsupportedInnerClassCall { message } => {
                Diagnostic::from_code(span, codes::UNSUPPORTED_INNER_CLASS_CALL, &[message])
            }
            D::UsedSmartCastForDispatchReceiver { smart_cast_type } => Diagnostic::from_code(
                span,
                codes::SMART_CAST_USED,
                &[&formatter.format(*smart_cast_type)],
            ),
            D::ErrorDescriptor => Diagnostic::from_code(span, codes::ERROR_DECLARATION, &[&name]),
            D::LowPriorityDescriptor => {
                Diagnostic::from_code(span, codes::LOW_PRIORITY_DECLARATION, &[&name])
            }
            D::DynamicDescriptor => {
                Diagnostic::from_code(span, codes::DYNAMIC_DECLARATION, &[&name])
            }
            D::SynthesizedDescriptor => {
                Diagnostic::from_code(span, codes::SYNTHESIZED_DECLARATION, &[&name])
            }
            D::UnstableSmartCast { smart_cast_type } => Diagnostic::from_code(
                span,
                codes::SMART_CAST_IMPOSSIBLE,
                &[&formatter.format(*smart_cast_type)],
            ),
            D::UnsafeCall { receiver } => Diagnostic::from_code(
                span,
                codes::UNSAFE_CALL,
                &[&formatter.format(*receiver)],
            ),
            D::ExtensionWithStaticTypeWithDynamicReceiver | D::HiddenDescriptor => {
                Diagnostic::from_code(span, codes::HIDDEN_DECLARATION, &[&name])
            }
            D::InvokeConventionCallNoOperatorModifier => {
                Diagnostic::from_code(span, codes::OPERATOR_MODIFIER_REQUIRED, &[&name])
            }
            D::InfixCallNoInfixModifier => {
                Diagnostic::from_code(span, codes::INFIX_MODIFIER_REQUIRED, &[&name])
            }
            D::DeprecatedUnaryPlusAsPlus => {
                Diagnostic::from_code(span, codes::DEPRECATED_UNARY_PLUS_AS_PLUS, &[&name])
            }
            D::TooManyArguments { .. } => {
                Diagnostic::from_code(span, codes::TOO_MANY_ARGUMENTS, &[&name])
            }
            D::NoValueForParameter { parameter } => Diagnostic::from_code(
                span,
                codes::NO_VALUE_FOR_PARAMETER,
                &[&ctx.db.resolve_atom(*parameter)],
            ),
            D::NamedParameterNotFound { name: arg_name, .. } => Diagnostic::from_code(
                span,
                codes::NAMED_PARAMETER_NOT_FOUND,
                &[&ctx.db.resolve_atom(*arg_name)],
            ),
            D::ArgumentPassedTwice { parameter, .. } => Diagnostic::from_code(
                span,
                codes::ARGUMENT_PASSED_TWICE,
                &[&ctx.db.resolve_atom(*parameter)],
            ),
            D::MixingNamedAndPositionalArguments { .. } => {
                Diagnostic::from_code(span, codes::MIXING_NAMED_AND_POSITIONED_ARGUMENTS, &[])
            }
            D::WrongNumberOfTypeArguments { expected } => Diagnostic::from_code(
                span,
                codes::WRONG_NUMBER_OF_TYPE_ARGUMENTS,
                &[&expected.to_string(), &name],
            ),
            D::ArgumentTypeMismatch {
                actual, expected, ..
            } => Diagnostic::from_code(
                span,
                codes::TYPE_MISMATCH,
                &[&formatter.format(*actual), &formatter.format(*expected)],
            ),
            D::ReceiverTypeMismatch { actual, expected } => Diagnostic::from_code(
                span,
                codes::RECEIVER_TYPE_MISMATCH,
                &[&formatter.format(*actual), &formatter.format(*expected)],
            ),
            D::ConstraintUnsatisfiable {
                lower,
                upper,
                origin,
            } => Diagnostic::from_code(
                span,
                codes::CONSTRAINT_UNSATISFIABLE,
                &[
                    &formatter.format(*lower),
                    &formatter.format(*upper),
                    &describe_origin(*origin),
                ],
            ),
            D::TypeInferenceFailed { param } => {
                let shown = param
                    .map(|p| formatter.format(p))
                    .unwrap_or_else(|| "?".to_string());
                Diagnostic::from_code(span, codes::TYPE_INFERENCE_FAILED, &[&shown])
            }
        }
    }
}

fn describe_origin(origin: ConstraintOrigin) -> String {
    match origin {
        ConstraintOrigin::Argument { index } => format!("argument #{}", index + 1),
        ConstraintOrigin::Receiver => "receiver".to_string(),
        ConstraintOrigin::ExplicitTypeArgument { index } => {
            format!("type argument #{}", index + 1)
        }
        ConstraintOrigin::DeclaredUpperBound { .. } => "declared upper bound".to_string(),
        ConstraintOrigin::ExpectedType => "expected type".to_string(),
        ConstraintOrigin::LambdaReturn { argument } => {
            format!("return value of lambda argument #{}", argument + 1)
        }
        ConstraintOrigin::LambdaParameter { argument, index } => format!(
            "parameter #{} of lambda argument #{}",
            index + 1,
            argument + 1
        ),
    }
}

/// What rendering a candidate diagnostic needs to know about the call.
pub struct RenderContext<'r> {
    pub db: &'r dyn TypeDatabase,
    pub tree: &'r ContainerTree,
    pub declaration: &'r Declaration,
    pub call_span: Span,
    pub argument_spans: &'r [Span],
}

/// The diagnostics of one candidate and the tier they add up to.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ResolutionCandidateStatus {
    pub diagnostics: Vec<ResolutionDiagnostic>,
}

impl ResolutionCandidateStatus {
    pub fn new(diagnostics: Vec<ResolutionDiagnostic>) -> Self {
        ResolutionCandidateStatus { diagnostics }
    }

    pub fn resulting_applicability(&self) -> CandidateApplicability {
        rank(&self.diagnostics)
    }
}

/// Worst tier among `diagnostics`, or `Resolved` for none.
pub fn rank(diagnostics: &[ResolutionDiagnostic]) -> CandidateApplicability {
    diagnostics
        .iter()
        .map(ResolutionDiagnostic::applicability)
        .max()
        .unwrap_or(CandidateApplicability::Resolved)
}

#[cfg(test)]
#[path = "../tests/applicability_tests.rs"]
mod applicability_tests;
