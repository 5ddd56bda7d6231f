use super::*;
use crate::declarations::{DeclarationStore, ModuleId, Visibility};
use calltower_solver::{ClassKind, TypeInterner, Variance};

struct Fixture {
    interner: TypeInterner,
    tree: ContainerTree,
    store: DeclarationStore,
    module: ModuleId,
    pkg: ContainerId,
}

fn fixture() -> Fixture {
    let interner = TypeInterner::new();
    let mut tree = ContainerTree::new();
    let module = tree.add_module(interner.intern_string("app"));
    let pkg = tree.add_package(interner.intern_string("app"), module);
    Fixture {
        interner,
        tree,
        store: DeclarationStore::new(),
        module,
        pkg,
    }
}

impl Fixture {
    fn ctx(&self) -> LookupContext<'_> {
        LookupContext {
            db: &self.interner,
            tree: &self.tree,
            location: self.pkg,
            is_debugger_context: false,
        }
    }

    fn atom(&self, s: &str) -> Atom {
        self.interner.intern_string(s)
    }

    fn declare(&self, name: &str, kind: DeclarationKind, f: impl FnOnce(&mut Declaration)) -> Arc<Declaration> {
        let mut decl = Declaration::new(self.atom(name), kind, self.pkg);
        f(&mut decl);
        self.store.add(decl)
    }
}

fn ids(candidates: &[Candidate]) -> Vec<DeclId> {
    candidates.iter().map(|c| c.declaration().id).collect()
}

#[test]
fn test_local_level_shadows_outer_levels() {
    let f = fixture();
    let local = f.declare("x", DeclarationKind::Variable, |d| d.return_type = TypeId::INT);
    let outer = f.declare("x", DeclarationKind::Variable, |d| d.return_type = TypeId::STRING);

    let mut tower = ImplicitScopeTower::new(&f.interner, &f.tree, f.pkg);
    tower.push_level(DeclarationLevel::local(vec![Arc::clone(&local)]));
    tower.push_level(DeclarationLevel::importing(vec![outer]));

    let found = tower
        .candidates(LookupKind::Variable, f.atom("x"), None)
        .collect_all()
        .unwrap();
    assert_eq!(ids(&found), vec![local.id]);
}

#[test]
fn test_local_level_without_match_does_not_shadow() {
    let f = fixture();
    let local = f.declare("y", DeclarationKind::Variable, |_| {});
    let outer = f.declare("x", DeclarationKind::Variable, |_| {});

    let mut tower = ImplicitScopeTower::new(&f.interner, &f.tree, f.pkg);
    tower.push_level(DeclarationLevel::local(vec![local]));
    tower.push_level(DeclarationLevel::importing(vec![Arc::clone(&outer)]));

    let found = tower
        .candidates(LookupKind::Variable, f.atom("x"), None)
        .collect_all()
        .unwrap();
    assert_eq!(ids(&found), vec![outer.id]);
}

#[test]
fn test_importing_levels_yield_in_priority_order() {
    let f = fixture();
    let inner = f.declare("foo", DeclarationKind::Function, |_| {});
    let outer = f.declare("foo", DeclarationKind::Function, |_| {});
    let ctor = f.declare("foo", DeclarationKind::Constructor, |_| {});

    let mut tower = ImplicitScopeTower::new(&f.interner, &f.tree, f.pkg);
    tower.push_level(DeclarationLevel::importing(vec![Arc::clone(&inner)]));
    tower.push_level(DeclarationLevel::importing(vec![
        Arc::clone(&outer),
        Arc::clone(&ctor),
    ]));

    let found = tower
        .candidates(LookupKind::Function, f.atom("foo"), None)
        .collect_all()
        .unwrap();
    assert_eq!(ids(&found), vec![inner.id, outer.id, ctor.id]);
}

#[test]
fn test_extensions_need_an_extension_receiver() {
    let f = fixture();
    let plain = f.declare("len", DeclarationKind::Function, |_| {});
    let extension = f.declare("len", DeclarationKind::Function, |d| {
        d.extension_receiver = Some(TypeId::STRING);
    });
    let level = DeclarationLevel::importing(vec![Arc::clone(&plain), Arc::clone(&extension)]);

    let without = level.functions(&f.ctx(), f.atom("len"), None);
    assert_eq!(ids(&without.candidates), vec![plain.id]);

    let receiver = ReceiverValue::new(TypeId::STRING);
    let with = level.functions(&f.ctx(), f.atom("len"), Some(&receiver));
    assert_eq!(ids(&with.candidates), vec![extension.id]);
}

#[test]
fn test_modifier_markers_become_diagnostics() {
    let f = fixture();
    let hidden = f.declare("h", DeclarationKind::Function, |d| d.modifiers = Modifiers::HIDDEN);
    let low = f.declare("l", DeclarationKind::Function, |d| {
        d.modifiers = Modifiers::LOW_PRIORITY;
    });
    let level = DeclarationLevel::importing(vec![hidden, low]);

    let h = level.functions(&f.ctx(), f.atom("h"), None);
    assert_eq!(
        h.candidates[0].diagnostics(),
        &[ResolutionDiagnostic::HiddenDescriptor]
    );
    let l = level.functions(&f.ctx(), f.atom("l"), None);
    assert_eq!(
        l.candidates[0].applicability(),
        crate::applicability::CandidateApplicability::ResolvedLowPriority
    );
}

#[test]
fn test_invisible_declaration_is_kept_with_visibility_error() {
    let mut f = fixture();
    let other = f.tree.add_package(f.atom("other"), f.module);
    let private = {
        let mut decl = Declaration::new(f.atom("secret"), DeclarationKind::Function, other);
        decl.visibility = Visibility::Private;
        f.store.add(decl)
    };
    let level = DeclarationLevel::importing(vec![private]);

    let found = level.functions(&f.ctx(), f.atom("secret"), None);
    assert_eq!(found.candidates.len(), 1);
    assert_eq!(
        found.candidates[0].diagnostics(),
        &[ResolutionDiagnostic::VisibilityError {
            visibility: Visibility::Private,
            container: other,
        }]
    );
}

#[test]
fn test_generic_member_is_specialized_for_receiver() {
    let f = fixture();
    let box_class = f
        .interner
        .declare_class("Box", ClassKind::Class, &[("T", Variance::Invariant)]);
    let box_self = f.interner.class_self_type(box_class);
    let param_t = f.interner.class_info(box_class).unwrap().type_params[0].param;
    let get = f.declare("get", DeclarationKind::Function, |d| {
        d.dispatch_receiver = Some(box_self);
        d.return_type = param_t;
    });
    let index = MemberIndex::new();
    index.add(box_class, Arc::clone(&get));

    let box_int = f.interner.class_type(box_class, vec![TypeId::INT]);
    let receiver = ReceiverValue::new(box_int);
    let level = MemberScopeLevel::new(receiver.clone(), index.members_of(&f.interner, &receiver));
    let found = level.functions(&f.ctx(), f.atom("get"), None);

    assert_eq!(found.candidates.len(), 1);
    let candidate = &found.candidates[0];
    assert_eq!(candidate.declaration().id, get.id);
    assert_eq!(candidate.declaration().return_type, TypeId::INT);
    assert_eq!(candidate.declaration().origin, DeclarationOrigin::Declared);
    assert_eq!(get.return_type, param_t);
}

#[test]
fn test_member_reached_through_supertype_is_inherited() {
    let f = fixture();
    let box_class = f
        .interner
        .declare_class("Box", ClassKind::Class, &[("T", Variance::Invariant)]);
    let int_box = f.interner.declare_class("IntBox", ClassKind::Class, &[]);
    f.interner.set_supertypes(
        int_box,
        vec![f.interner.class_type(box_class, vec![TypeId::INT])],
    );
    let param_t = f.interner.class_info(box_class).unwrap().type_params[0].param;
    let get = f.declare("get", DeclarationKind::Function, |d| {
        d.dispatch_receiver = Some(f.interner.class_self_type(box_class));
        d.return_type = param_t;
    });
    let index = MemberIndex::new();
    index.add(box_class, get);

    let receiver = ReceiverValue::new(f.interner.class_type(int_box, vec![]));
    let level = MemberScopeLevel::new(receiver.clone(), index.members_of(&f.interner, &receiver));
    let found = level.functions(&f.ctx(), f.atom("get"), None);

    let decl = found.candidates[0].declaration();
    assert_eq!(decl.return_type, TypeId::INT);
    assert_eq!(decl.origin, DeclarationOrigin::Inherited);
}

#[test]
fn test_nullable_receiver_needs_safe_call_or_smart_cast() {
    let f = fixture();
    let text = f.interner.declare_class("Text", ClassKind::Class, &[]);
    let text_type = f.interner.class_type(text, vec![]);
    let length = f.declare("length", DeclarationKind::Function, |d| {
        d.dispatch_receiver = Some(text_type);
        d.return_type = TypeId::INT;
    });
    let members = vec![length];
    let nullable = f.interner.nullable(text_type);

    let plain = MemberScopeLevel::new(ReceiverValue::new(nullable), members.clone());
    let found = plain.functions(&f.ctx(), f.atom("length"), None);
    assert_eq!(
        found.candidates[0].diagnostics(),
        &[ResolutionDiagnostic::UnsafeCall { receiver: nullable }]
    );

    let safe = MemberScopeLevel::new(ReceiverValue::new(nullable), members.clone()).safe_call();
    let found = safe.functions(&f.ctx(), f.atom("length"), None);
    assert!(found.candidates[0].diagnostics().is_empty());

    let narrowed = ReceiverValue::new(nullable).with_smart_cast(text_type, true);
    let cast = MemberScopeLevel::new(narrowed, members);
    let found = cast.functions(&f.ctx(), f.atom("length"), None);
    assert_eq!(
        found.candidates[0].diagnostics(),
        &[ResolutionDiagnostic::UsedSmartCastForDispatchReceiver {
            smart_cast_type: text_type
        }]
    );
}

#[test]
fn test_unstable_smart_cast_is_flagged() {
    let f = fixture();
    let text = f.interner.declare_class("Text", ClassKind::Class, &[]);
    let text_type = f.interner.class_type(text, vec![]);
    let length = f.declare("length", DeclarationKind::Function, |d| {
        d.dispatch_receiver = Some(text_type);
    });

    let receiver = ReceiverValue::new(TypeId::ANY).with_smart_cast(text_type, false);
    let level = MemberScopeLevel::new(receiver, vec![length]);
    let found = level.functions(&f.ctx(), f.atom("length"), None);

    assert_eq!(
        found.candidates[0].applicability(),
        crate::applicability::CandidateApplicability::MayThrowRuntimeError
    );
}

#[test]
fn test_synthetic_property_from_getter() {
    let f = fixture();
    let list = f.interner.declare_class("JavaList", ClassKind::Class, &[]);
    let list_type = f.interner.class_type(list, vec![]);
    let getter = f.declare("getSize", DeclarationKind::Function, |d| {
        d.dispatch_receiver = Some(list_type);
        d.return_type = TypeId::INT;
    });
    let level = SyntheticScopeLevel::new(ReceiverValue::new(list_type), vec![Arc::clone(&getter)]);

    let found = level.variables(&f.ctx(), f.atom("size"), None);
    assert_eq!(found.candidates.len(), 1);
    let candidate = &found.candidates[0];
    assert_eq!(candidate.declaration().kind, DeclarationKind::Variable);
    assert_eq!(candidate.declaration().return_type, TypeId::INT);
    assert_eq!(candidate.declaration().id, getter.id);
    assert_eq!(
        candidate.diagnostics(),
        &[ResolutionDiagnostic::SynthesizedDescriptor]
    );
    assert!(level.variables(&f.ctx(), f.atom("count"), None).candidates.is_empty());
}

#[test]
fn test_dynamic_level_answers_every_name() {
    let f = fixture();
    let found = DynamicScopeLevel.functions(&f.ctx(), f.atom("anything"), None);
    assert_eq!(found.candidates.len(), 1);
    let decl = found.candidates[0].declaration();
    assert_eq!(decl.id, DeclId::DYNAMIC);
    assert_eq!(decl.return_type, TypeId::DYNAMIC);
    assert!(decl.value_params[0].is_vararg);
    assert_eq!(
        found.candidates[0].diagnostics(),
        &[ResolutionDiagnostic::DynamicDescriptor]
    );
    assert!(DynamicScopeLevel.objects(&f.ctx(), f.atom("anything"), None).candidates.is_empty());
}

#[test]
fn test_nested_constructor_through_instance() {
    let f = fixture();
    let outer = f.interner.declare_class("Outer", ClassKind::Class, &[]);
    let nested = f.interner.declare_class("Nested", ClassKind::Class, &[]);
    f.interner.set_outer(nested, outer, false);
    let outer_type = f.interner.class_type(outer, vec![]);
    let ctor = f.declare("Nested", DeclarationKind::Constructor, |d| {
        d.dispatch_receiver = Some(outer_type);
        d.return_type = f.interner.class_type(nested, vec![]);
    });

    let level = MemberScopeLevel::new(ReceiverValue::new(outer_type), vec![ctor]);
    let found = level.functions(&f.ctx(), f.atom("Nested"), None);
    assert_eq!(
        found.candidates[0].diagnostics(),
        &[ResolutionDiagnostic::NestedClassViaInstanceReference { class: nested }]
    );
}

#[test]
fn test_inner_constructor_without_instance() {
    let f = fixture();
    let outer = f.interner.declare_class("Outer", ClassKind::Class, &[]);
    let inner = f.interner.declare_class("Inner", ClassKind::Class, &[]);
    f.interner.set_outer(inner, outer, true);
    let ctor = f.declare("Inner", DeclarationKind::Constructor, |d| {
        d.return_type = f.interner.class_type(inner, vec![]);
    });

    let level = DeclarationLevel::importing(vec![ctor]);
    let found = level.functions(&f.ctx(), f.atom("Inner"), None);
    assert_eq!(
        found.candidates[0].diagnostics(),
        &[ResolutionDiagnostic::InnerClassViaStaticReference { class: inner }]
    );
    assert_eq!(
        found.candidates[0].applicability(),
        crate::applicability::CandidateApplicability::ImpossibleToGenerate
    );
}

#[test]
fn test_implicit_receiver_members_come_after_locals() {
    let f = fixture();
    let widget = f.interner.declare_class("Widget", ClassKind::Class, &[]);
    let widget_type = f.interner.class_type(widget, vec![]);
    let member = f.declare("draw", DeclarationKind::Function, |d| {
        d.dispatch_receiver = Some(widget_type);
    });
    let top_level = f.declare("draw", DeclarationKind::Function, |_| {});
    let index = MemberIndex::new();
    index.add(widget, Arc::clone(&member));

    let mut tower = ImplicitScopeTower::new(&f.interner, &f.tree, f.pkg).with_member_index(&index);
    tower.push_implicit_receiver(ReceiverValue::new(widget_type));
    tower.push_level(DeclarationLevel::importing(vec![Arc::clone(&top_level)]));

    let found = tower
        .candidates(LookupKind::Function, f.atom("draw"), None)
        .collect_all()
        .unwrap();
    assert_eq!(ids(&found), vec![member.id, top_level.id]);
    assert_eq!(tower.implicit_receivers().len(), 1);
    assert_eq!(tower.levels().len(), 3);
}
