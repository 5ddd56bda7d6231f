use super::*;
use crate::declarations::{ContainerId, DeclarationStore};
use crate::expression::{CallArgument, Expr};
use crate::tower::{DeclarationLevel, MemberIndex};
use crate::visibility::ContainerTree;
use calltower_solver::{ClassKind, TypeInterner};

struct Setup {
    interner: TypeInterner,
    tree: ContainerTree,
    store: DeclarationStore,
    pkg: ContainerId,
}

fn setup() -> Setup {
    let interner = TypeInterner::new();
    let mut tree = ContainerTree::new();
    let module = tree.add_module(interner.intern_string("app"));
    let pkg = tree.add_package(interner.intern_string("app"), module);
    Setup {
        interner,
        tree,
        store: DeclarationStore::new(),
        pkg,
    }
}

impl Setup {
    fn atom(&self, s: &str) -> Atom {
        self.interner.intern_string(s)
    }

    fn function(&self, name: &str, params: &[(&str, TypeId)], ret: TypeId) -> Arc<Declaration> {
        self.declare(name, DeclarationKind::Function, |d| {
            d.value_params = params
                .iter()
                .map(|(n, ty)| ValueParameter::new(self.atom(n), *ty))
                .collect();
            d.return_type = ret;
        })
    }

    fn declare(&self, name: &str, kind: DeclarationKind, f: impl FnOnce(&mut Declaration)) -> Arc<Declaration> {
        let mut decl = Declaration::new(self.atom(name), kind, self.pkg);
        f(&mut decl);
        self.store.add(decl)
    }

    fn tower(&self, declarations: Vec<Arc<Declaration>>) -> ImplicitScopeTower<'_> {
        let mut tower = ImplicitScopeTower::new(&self.interner, &self.tree, self.pkg);
        tower.push_level(DeclarationLevel::importing(declarations));
        tower
    }

    fn call(&self, name: &str, args: Vec<Expr>) -> CallExpr {
        CallExpr::new(
            self.atom(name),
            args.into_iter().map(CallArgument::positional).collect(),
            Span::new(0, 20),
        )
    }
}

fn sequential() -> CallResolver<'static> {
    CallResolver::new(ResolutionOptions {
        parallel: false,
        ..ResolutionOptions::default()
    })
}

#[test]
fn test_single_matching_function_resolves() {
    let s = setup();
    let foo = s.function("foo", &[("x", TypeId::INT)], TypeId::STRING);
    let tower = s.tower(vec![Arc::clone(&foo)]);
    let call = s.call("foo", vec![Expr::int(1, Span::new(4, 5))]);

    let (outcome, trace) = sequential().resolve(&tower, &call, None).unwrap();
    let resolved = outcome.resolved().unwrap();
    assert_eq!(resolved.declaration().id, foo.id);
    assert_eq!(resolved.result_type, TypeId::STRING);
    assert_eq!(resolved.applicability, CandidateApplicability::Resolved);
    assert_eq!(trace.call_at(call.span).map(|c| c.declaration), Some(foo.id));
    assert_eq!(trace.type_of(call.span), Some(TypeId::STRING));
    assert!(!trace.has_errors());
}

#[test]
fn test_narrower_overload_wins() {
    let s = setup();
    let general = s.function("foo", &[("x", TypeId::ANY)], TypeId::UNIT);
    let narrow = s.function("foo", &[("x", TypeId::INT)], TypeId::UNIT);
    let tower = s.tower(vec![general, Arc::clone(&narrow)]);
    let call = s.call("foo", vec![Expr::int(1, Span::new(4, 5))]);

    let (outcome, _) = sequential().resolve(&tower, &call, None).unwrap();
    assert_eq!(outcome.resolved().map(|r| r.declaration().id), Some(narrow.id));
}

#[test]
fn test_argument_mismatch_is_reported_for_the_only_candidate() {
    let s = setup();
    let foo = s.function("foo", &[("x", TypeId::INT)], TypeId::UNIT);
    let tower = s.tower(vec![foo]);
    let call = s.call("foo", vec![Expr::string("a", Span::new(4, 7))]);

    let (outcome, trace) = sequential().resolve(&tower, &call, None).unwrap();
    let ResolutionOutcome::Inapplicable(candidates) = &outcome else {
        panic!("expected inapplicable, got {}", outcome.label());
    };
    assert_eq!(candidates.len(), 1);
    assert!(candidates[0].diagnostics().iter().any(|d| matches!(
        d,
        ResolutionDiagnostic::ArgumentTypeMismatch {
            argument: 0,
            actual: TypeId::STRING,
            expected: TypeId::INT,
        }
    )));
    assert!(trace.has_errors());
    assert_eq!(trace.type_of(call.span), Some(TypeId::ERROR));
}

#[test]
fn test_generic_parameter_is_inferred_from_the_argument() {
    let s = setup();
    let t = s.interner.type_parameter("T");
    let id = s.declare("id", DeclarationKind::Function, |d| {
        d.type_params = vec![t];
        d.value_params = vec![ValueParameter::new(s.atom("x"), t)];
        d.return_type = t;
    });
    let tower = s.tower(vec![id]);
    let call = s.call("id", vec![Expr::int(1, Span::new(3, 4))]);

    let (outcome, _) = sequential().resolve(&tower, &call, None).unwrap();
    let resolved = outcome.resolved().unwrap();
    assert_eq!(resolved.type_argument(t), Some(TypeId::INT));
    assert_eq!(resolved.result_type, TypeId::INT);
}

#[test]
fn test_wrong_type_argument_count_makes_candidate_inapplicable() {
    let s = setup();
    let t = s.interner.type_parameter("T");
    let id = s.declare("id", DeclarationKind::Function, |d| {
        d.type_params = vec![t];
        d.value_params = vec![ValueParameter::new(s.atom("x"), t)];
        d.return_type = t;
    });
    let tower = s.tower(vec![id]);
    let call = s
        .call("id", vec![Expr::int(1, Span::new(3, 4))])
        .with_type_args(vec![TypeId::INT, TypeId::STRING]);

    let (outcome, _) = sequential().resolve(&tower, &call, None).unwrap();
    assert!(outcome.candidates()[0]
        .diagnostics()
        .contains(&ResolutionDiagnostic::WrongNumberOfTypeArguments { expected: 1 }));
    assert!(!outcome.is_resolved());
}

#[test]
fn test_infix_call_prefers_the_infix_declaration() {
    let s = setup();
    let plain = s.function("to", &[("x", TypeId::INT)], TypeId::UNIT);
    let infix = s.declare("to", DeclarationKind::Function, |d| {
        d.value_params = vec![ValueParameter::new(s.atom("x"), TypeId::ANY)];
        d.modifiers = Modifiers::INFIX;
    });
    let tower = s.tower(vec![plain, Arc::clone(&infix)]);
    let call = s
        .call("to", vec![Expr::int(1, Span::new(5, 6))])
        .with_form(CallForm::Infix);

    let (outcome, _) = sequential().resolve(&tower, &call, None).unwrap();
    assert_eq!(outcome.resolved().map(|r| r.declaration().id), Some(infix.id));
}

#[test]
fn test_function_typed_variable_is_invoked() {
    let s = setup();
    let f = s.declare("f", DeclarationKind::Variable, |d| {
        d.return_type = s.interner.function(None, vec![TypeId::INT], TypeId::STRING);
    });
    let tower = s.tower(vec![Arc::clone(&f)]);
    let call = s.call("f", vec![Expr::int(1, Span::new(2, 3))]);

    let (outcome, _) = sequential().resolve(&tower, &call, None).unwrap();
    let resolved = outcome.resolved().unwrap();
    assert_eq!(resolved.declaration().id, f.id);
    assert_eq!(resolved.declaration().kind, DeclarationKind::Function);
    assert!(resolved.declaration().modifiers.contains(Modifiers::OPERATOR));
    assert_eq!(resolved.result_type, TypeId::STRING);
}

#[test]
fn test_safe_call_on_nullable_receiver_gives_nullable_result() {
    let s = setup();
    let len = s.declare("len", DeclarationKind::Function, |d| {
        d.extension_receiver = Some(TypeId::STRING);
        d.return_type = TypeId::INT;
    });
    let tower = s.tower(vec![Arc::clone(&len)]);
    let nullable_string = s.interner.nullable(TypeId::STRING);
    let mut call = s
        .call("len", Vec::new())
        .with_receiver(Expr::typed(nullable_string, Span::new(0, 1)));
    call.safe_call = true;

    let (outcome, _) = sequential().resolve(&tower, &call, None).unwrap();
    let resolved = outcome.resolved().unwrap();
    assert_eq!(resolved.declaration().id, len.id);
    assert_eq!(resolved.extension_receiver.as_ref().map(|r| r.ty), Some(nullable_string));
    assert_eq!(resolved.result_type, s.interner.nullable(TypeId::INT));
}

#[test]
fn test_unknown_name_is_unresolved() {
    let s = setup();
    let tower = s.tower(Vec::new());
    let call = s.call("missing", Vec::new());

    let (outcome, trace) = sequential().resolve(&tower, &call, None).unwrap();
    assert!(matches!(&outcome, ResolutionOutcome::Inapplicable(c) if c.is_empty()));
    let diagnostics = trace.diagnostics_at(call.span);
    assert_eq!(diagnostics.len(), 1);
    assert!(diagnostics[0].message_text.contains("missing"));
}

#[test]
fn test_dynamic_fallback_only_when_enabled() {
    let s = setup();
    let tower = s.tower(Vec::new());
    let call = s.call("anything", vec![Expr::int(1, Span::new(9, 10))]);

    let dynamic = CallResolver::new(ResolutionOptions {
        allow_dynamic: true,
        parallel: false,
        ..ResolutionOptions::default()
    });
    let (outcome, _) = dynamic.resolve(&tower, &call, None).unwrap();
    let resolved = outcome.resolved().unwrap();
    assert_eq!(resolved.declaration().id, DeclId::DYNAMIC);
    assert_eq!(resolved.applicability, CandidateApplicability::ResolvedLowPriority);
    assert_eq!(resolved.result_type, TypeId::DYNAMIC);

    let (outcome, _) = sequential().resolve(&tower, &call, None).unwrap();
    assert!(!outcome.is_resolved());
}

#[test]
fn test_extension_through_two_implicit_receivers_binds_the_innermost() {
    let s = setup();
    let foo = s.declare("foo", DeclarationKind::Function, |d| {
        d.extension_receiver = Some(TypeId::ANY);
        d.return_type = TypeId::INT;
    });
    let mut tower = s.tower(vec![Arc::clone(&foo)]);
    tower.push_implicit_receiver(ReceiverValue::new(TypeId::STRING));
    tower.push_implicit_receiver(ReceiverValue::new(TypeId::INT));
    let call = s.call("foo", Vec::new());

    let (outcome, trace) = sequential().resolve(&tower, &call, None).unwrap();
    let resolved = outcome.resolved().unwrap();
    assert_eq!(resolved.declaration().id, foo.id);
    assert_eq!(resolved.extension_receiver.as_ref().map(|r| r.ty), Some(TypeId::STRING));
    assert_eq!(resolved.result_type, TypeId::INT);
    assert!(!trace.has_errors());
}

#[test]
fn test_member_through_two_implicit_receivers_dispatches_on_the_innermost() {
    let s = setup();
    let base = s.interner.declare_class("Base", ClassKind::Class, &[]);
    let base_type = s.interner.class_type(base, vec![]);
    let mut subtypes = Vec::new();
    for name in ["Left", "Right"] {
        let class = s.interner.declare_class(name, ClassKind::Class, &[]);
        s.interner.set_supertypes(class, vec![base_type]);
        subtypes.push(s.interner.class_type(class, vec![]));
    }
    let bar = s.declare("bar", DeclarationKind::Function, |d| {
        d.dispatch_receiver = Some(base_type);
        d.return_type = TypeId::INT;
    });
    let index = MemberIndex::new();
    index.add(base, Arc::clone(&bar));

    let mut tower = ImplicitScopeTower::new(&s.interner, &s.tree, s.pkg).with_member_index(&index);
    tower.push_implicit_receiver(ReceiverValue::new(subtypes[0]));
    tower.push_implicit_receiver(ReceiverValue::new(subtypes[1]));
    let call = s.call("bar", Vec::new());

    let (outcome, trace) = sequential().resolve(&tower, &call, None).unwrap();
    let resolved = outcome.resolved().unwrap();
    assert_eq!(resolved.declaration().id, bar.id);
    assert_eq!(
        resolved.candidate.dispatch_receiver().map(|r| r.ty),
        Some(subtypes[0])
    );
    assert!(!trace.has_errors());

    // The same class twice is still a single candidate.
    let mut same = ImplicitScopeTower::new(&s.interner, &s.tree, s.pkg).with_member_index(&index);
    same.push_implicit_receiver(ReceiverValue::new(base_type));
    same.push_implicit_receiver(ReceiverValue::new(base_type));
    let (outcome, _) = sequential().resolve(&same, &call, None).unwrap();
    assert_eq!(outcome.label(), "resolved");
}

#[test]
fn test_render_signature() {
    let s = setup();
    let foo = s.declare("foo", DeclarationKind::Function, |d| {
        d.extension_receiver = Some(TypeId::STRING);
        d.value_params = vec![ValueParameter::new(s.atom("x"), TypeId::INT)];
        d.return_type = TypeId::BOOLEAN;
    });
    let size = s.declare("size", DeclarationKind::Variable, |d| d.return_type = TypeId::INT);
    assert_eq!(render_signature(&s.interner, &foo), "String.foo(x: Int): Boolean");
    assert_eq!(render_signature(&s.interner, &size), "size: Int");
}
