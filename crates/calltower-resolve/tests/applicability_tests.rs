use super::*;
use crate::declarations::{DeclarationKind, DeclarationStore};
use calltower_solver::TypeInterner;

#[test]
fn test_tiers_are_ordered_best_first() {
    use CandidateApplicability as A;
    let order = [
        A::Resolved,
        A::ResolvedSynthesized,
        A::ResolvedLowPriority,
        A::ConventionError,
        A::MayThrowRuntimeError,
        A::RuntimeError,
        A::ImpossibleToGenerate,
        A::Inapplicable,
        A::Hidden,
    ];
    for pair in order.windows(2) {
        assert!(pair[0] < pair[1], "{:?} should rank before {:?}", pair[0], pair[1]);
    }
    assert!(A::ResolvedLowPriority.is_success());
    assert!(!A::ConventionError.is_success());
    assert!(A::ImpossibleToGenerate.is_applicable());
    assert!(!A::Inapplicable.is_applicable());
}

#[test]
fn test_empty_status_is_resolved() {
    let status = ResolutionCandidateStatus::default();
    assert_eq!(
        status.resulting_applicability(),
        CandidateApplicability::Resolved
    );
}

#[test]
fn test_status_takes_worst_tier() {
    let status = ResolutionCandidateStatus::new(vec![
        ResolutionDiagnostic::SynthesizedDescriptor,
        ResolutionDiagnostic::VisibilityError {
            visibility: Visibility::Private,
            container: ContainerId(0),
        },
        ResolutionDiagnostic::LowPriorityDescriptor,
    ]);
    assert_eq!(
        status.resulting_applicability(),
        CandidateApplicability::RuntimeError
    );
}

#[test]
fn test_catalogue_tiers() {
    use CandidateApplicability as A;
    use ResolutionDiagnostic as D;
    let cases = [
        (D::ErrorDescriptor, A::Resolved),
        (
            D::UsedSmartCastForDispatchReceiver {
                smart_cast_type: TypeId::STRING,
            },
            A::Resolved,
        ),
        (D::DynamicDescriptor, A::ResolvedLowPriority),
        (
            D::UnstableSmartCast {
                smart_cast_type: TypeId::STRING,
            },
            A::MayThrowRuntimeError,
        ),
        (
            D::UnsafeCall {
                receiver: TypeId::NULLABLE_ANY,
            },
            A::MayThrowRuntimeError,
        ),
        (
            D::UnsupportedInnerClassCall {
                message: "no".to_string(),
            },
            A::ImpossibleToGenerate,
        ),
        (D::ExtensionWithStaticTypeWithDynamicReceiver, A::Hidden),
        (D::DeprecatedUnaryPlusAsPlus, A::ConventionError),
        (D::InfixCallNoInfixModifier, A::ConventionError),
        (D::WrongNumberOfTypeArguments { expected: 1 }, A::Inapplicable),
        (D::TypeInferenceFailed { param: None }, A::Inapplicable),
    ];
    for (diagnostic, tier) in cases {
        assert_eq!(diagnostic.applicability(), tier, "{diagnostic:?}");
    }
}

#[test]
fn test_internal_markers_reported_only_when_deciding() {
    use CandidateApplicability as A;
    let hidden = ResolutionDiagnostic::HiddenDescriptor;
    assert!(hidden.is_internal());
    assert!(!hidden.should_report(A::Hidden, false, false));
    assert!(hidden.should_report(A::Hidden, true, false));
    assert!(hidden.should_report(A::Hidden, false, true));

    let low = ResolutionDiagnostic::LowPriorityDescriptor;
    assert!(!low.should_report(A::Inapplicable, true, false));

    let visibility = ResolutionDiagnostic::VisibilityError {
        visibility: Visibility::Private,
        container: ContainerId(0),
    };
    assert!(!visibility.is_internal());
    assert!(visibility.should_report(A::RuntimeError, false, false));
}

#[test]
fn test_render_points_argument_diagnostics_at_the_argument() {
    let interner = TypeInterner::new();
    let mut tree = ContainerTree::new();
    let module = tree.add_module(interner.intern_string("app"));
    let pkg = tree.add_package(interner.intern_string("app"), module);
    let store = DeclarationStore::new();
    let decl = store.add(Declaration::new(
        interner.intern_string("foo"),
        DeclarationKind::Function,
        pkg,
    ));
    let argument_spans = [Span::new(4, 5), Span::new(7, 12)];
    let ctx = RenderContext {
        db: &interner,
        tree: &tree,
        declaration: &decl,
        call_span: Span::new(0, 13),
        argument_spans: &argument_spans,
    };

    let mismatch = ResolutionDiagnostic::ArgumentTypeMismatch {
        argument: 1,
        actual: TypeId::STRING,
        expected: TypeId::INT,
    }
    .to_diagnostic(&ctx);
    assert_eq!(mismatch.span, Span::new(7, 12));
    assert_eq!(mismatch.code, diagnostic_codes::TYPE_MISMATCH);
    assert_eq!(
        mismatch.message_text,
        "Type mismatch: inferred type is String but Int was expected."
    );

    let invisible = ResolutionDiagnostic::VisibilityError {
        visibility: Visibility::Private,
        container: pkg,
    }
    .to_diagnostic(&ctx);
    assert_eq!(invisible.span, Span::new(0, 13));
    assert_eq!(
        invisible.message_text,
        "Cannot access 'foo': it is private in 'app'."
    );
}
