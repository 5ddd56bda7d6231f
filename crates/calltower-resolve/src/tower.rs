//! The scope tower.
//!
//! A tower is the ordered list of lookup levels visible at one call site,
//! innermost (highest priority) first. Every level is asked for candidates;
//! shadowing is settled later by applicability and specificity. The only
//! exception is an *exclusive* level, which ends the search for a name once
//! it finds something (strict shadowing by locals).
//!
//! Levels are immutable snapshots shared between concurrent sessions.

use crate::applicability::ResolutionDiagnostic;
use crate::candidate::{Candidate, ReceiverValue};
use crate::declarations::{
    ContainerId, DeclId, Declaration, DeclarationKind, DeclarationOrigin, DeclarationView,
    Modifiers, ValueParameter,
};
use crate::sequence::CandidateSequence;
use crate::visibility::{ContainerTree, is_visible};
use calltower_common::limits::{CANDIDATE_INLINE_CAPACITY, TOWER_LEVEL_CAPACITY};
use calltower_common::{Atom, CancellationToken};
use calltower_solver::{
    ClassId, ClassInfo, TypeDatabase, TypeId, TypeSubstitution, as_class_type, instantiate_type,
    is_subtype_of, supertype_as, supertype_closure,
};
use dashmap::DashMap;
use rustc_hash::FxHashSet;
use smallvec::SmallVec;
use std::sync::Arc;

/// Which declarations a lookup is after.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum LookupKind {
    Variable,
    Object,
    Function,
}

impl LookupKind {
    fn accepts(self, kind: DeclarationKind) -> bool {
        match self {
            LookupKind::Variable => kind == DeclarationKind::Variable,
            LookupKind::Object => kind == DeclarationKind::Object,
            LookupKind::Function => {
                matches!(kind, DeclarationKind::Function | DeclarationKind::Constructor)
            }
        }
    }
}

/// Result of asking one level for a name.
#[derive(Clone, Debug, Default)]
pub struct LevelLookup {
    pub candidates: SmallVec<[Candidate; CANDIDATE_INLINE_CAPACITY]>,
    /// Stop the search for this name after this level.
    pub exclusive: bool,
}

impl LevelLookup {
    pub fn empty() -> Self {
        Self::default()
    }
}

/// What a level needs to know about the lookup site.
#[derive(Copy, Clone)]
pub struct LookupContext<'a> {
    pub db: &'a dyn TypeDatabase,
    pub tree: &'a ContainerTree,
    pub location: ContainerId,
    pub is_debugger_context: bool,
}

/// One lookup stratum.
pub trait ScopeTowerLevel: Send + Sync {
    fn variables(
        &self,
        ctx: &LookupContext<'_>,
        name: Atom,
        extension_receiver: Option<&ReceiverValue>,
    ) -> LevelLookup;

    fn objects(
        &self,
        ctx: &LookupContext<'_>,
        name: Atom,
        extension_receiver: Option<&ReceiverValue>,
    ) -> LevelLookup;

    fn functions(
        &self,
        ctx: &LookupContext<'_>,
        name: Atom,
        extension_receiver: Option<&ReceiverValue>,
    ) -> LevelLookup;

    fn lookup(
        &self,
        ctx: &LookupContext<'_>,
        kind: LookupKind,
        name: Atom,
        extension_receiver: Option<&ReceiverValue>,
    ) -> LevelLookup {
        match kind {
            LookupKind::Variable => self.variables(ctx, name, extension_receiver),
            LookupKind::Object => self.objects(ctx, name, extension_receiver),
            LookupKind::Function => self.functions(ctx, name, extension_receiver),
        }
    }

    /// Short name for logs.
    fn description(&self) -> &'static str;
}

// =============================================================================
// Candidate construction shared by all levels
// =============================================================================

/// Wrap `decl`, attaching the diagnostics every level agrees on.
fn create_candidate(
    ctx: &LookupContext<'_>,
    decl: &Arc<Declaration>,
    dispatch_receiver: Option<ReceiverValue>,
    extension_receiver: Option<&ReceiverValue>,
) -> Candidate {
    let mut candidate = Candidate::new(Arc::clone(decl), dispatch_receiver);
    if decl.modifiers.contains(Modifiers::HIDDEN) {
        candidate.add_diagnostic(ResolutionDiagnostic::HiddenDescriptor);
    }
    if decl.modifiers.contains(Modifiers::STATIC_EXTENSION)
        && extension_receiver.is_some_and(|r| r.ty == TypeId::DYNAMIC)
    {
        candidate.add_diagnostic(ResolutionDiagnostic::ExtensionWithStaticTypeWithDynamicReceiver);
    }
    let view = DeclarationView::of(decl);
    if !is_visible(
        ctx.db,
        ctx.tree,
        &view,
        ctx.location,
        ctx.is_debugger_context,
    ) {
        candidate.add_diagnostic(ResolutionDiagnostic::VisibilityError {
            visibility: view.visibility(),
            container: view.container(),
        });
    }
    if decl.modifiers.contains(Modifiers::ERROR) {
        candidate.add_diagnostic(ResolutionDiagnostic::ErrorDescriptor);
    }
    if decl.modifiers.contains(Modifiers::LOW_PRIORITY) {
        candidate.add_diagnostic(ResolutionDiagnostic::LowPriorityDescriptor);
    }
    if decl.modifiers.contains(Modifiers::SYNTHESIZED) {
        candidate.add_diagnostic(ResolutionDiagnostic::SynthesizedDescriptor);
    }
    candidate
}

fn matches(
    decl: &Declaration,
    kind: LookupKind,
    name: Atom,
    extension_receiver: Option<&ReceiverValue>,
) -> bool {
    decl.name == name
        && kind.accepts(decl.kind)
        && decl.extension_receiver.is_some() == extension_receiver.is_some()
}

/// Class constructed by a constructor declaration.
fn constructed_class(db: &dyn TypeDatabase, decl: &Declaration) -> Option<Arc<ClassInfo>> {
    if decl.kind != DeclarationKind::Constructor {
        return None;
    }
    let class = as_class_type(db, decl.return_type)?;
    db.class_info(class.class)
}

fn class_of(db: &dyn TypeDatabase, ty: TypeId) -> Option<ClassId> {
    as_class_type(db, db.not_null(ty)).map(|class| class.class)
}

// =============================================================================
// Declaration levels (locals, file scope, imports)
// =============================================================================

/// A level over a fixed list of declarations.
pub struct DeclarationLevel {
    declarations: Vec<Arc<Declaration>>,
    exclusive: bool,
}

impl DeclarationLevel {
    /// Block locals and lambda parameters: a match ends the search.
    pub fn local(declarations: Vec<Arc<Declaration>>) -> Self {
        DeclarationLevel {
            declarations,
            exclusive: true,
        }
    }

    /// File-level and imported declarations, including extensions.
    pub fn importing(declarations: Vec<Arc<Declaration>>) -> Self {
        DeclarationLevel {
            declarations,
            exclusive: false,
        }
    }

    fn collect(
        &self,
        ctx: &LookupContext<'_>,
        kind: LookupKind,
        name: Atom,
        extension_receiver: Option<&ReceiverValue>,
    ) -> LevelLookup {
        let mut candidates = SmallVec::new();
        for decl in &self.declarations {
            if !matches(decl, kind, name, extension_receiver) {
                continue;
            }
            let mut candidate = create_candidate(ctx, decl, None, extension_receiver);
            if let Some(info) = constructed_class(ctx.db, decl)
                && info.is_inner
            {
                candidate.add_diagnostic(ResolutionDiagnostic::InnerClassViaStaticReference {
                    class: info.id,
                });
            }
            candidates.push(candidate);
        }
        let exclusive = self.exclusive && !candidates.is_empty();
        LevelLookup {
            candidates,
            exclusive,
        }
    }
}

impl ScopeTowerLevel for DeclarationLevel {
    fn variables(
        &self,
        ctx: &LookupContext<'_>,
        name: Atom,
        extension_receiver: Option<&ReceiverValue>,
    ) -> LevelLookup {
        self.collect(ctx, LookupKind::Variable, name, extension_receiver)
    }

    fn objects(
        &self,
        ctx: &LookupContext<'_>,
        name: Atom,
        extension_receiver: Option<&ReceiverValue>,
    ) -> LevelLookup {
        self.collect(ctx, LookupKind::Object, name, extension_receiver)
    }

    fn functions(
        &self,
        ctx: &LookupContext<'_>,
        name: Atom,
        extension_receiver: Option<&ReceiverValue>,
    ) -> LevelLookup {
        self.collect(ctx, LookupKind::Function, name, extension_receiver)
    }

    fn description(&self) -> &'static str {
        if self.exclusive { "local" } else { "importing" }
    }
}

// =============================================================================
// Member levels
// =============================================================================

/// How a member is reached from a receiver.
struct MemberAccess {
    /// The member's owner type as seen from the receiver (`List<Int>` for a
    /// member of `List<E>` reached from `ArrayList<Int>`).
    owner_view: TypeId,
    smart_cast: Option<TypeId>,
    unsafe_receiver: Option<TypeId>,
}

fn member_access(
    db: &dyn TypeDatabase,
    receiver: &ReceiverValue,
    member: &Declaration,
    safe_call: bool,
) -> Option<MemberAccess> {
    let provides = |ty: TypeId| -> Option<TypeId> {
        let ty = db.not_null(ty);
        match member.dispatch_receiver {
            None => Some(ty),
            Some(owner) => match as_class_type(db, owner) {
                Some(class) => supertype_as(db, ty, class.class),
                None => is_subtype_of(db, ty, owner).then_some(owner),
            },
        }
    };

    if let Some(owner_view) = provides(receiver.ty) {
        if !db.is_nullable(receiver.ty) || safe_call {
            return Some(MemberAccess {
                owner_view,
                smart_cast: None,
                unsafe_receiver: None,
            });
        }
        // A non-null smart cast makes the call on a nullable receiver safe.
        for narrowed in &receiver.possible_types {
            if db.is_nullable(*narrowed) {
                continue;
            }
            if let Some(owner_view) = provides(*narrowed) {
                return Some(MemberAccess {
                    owner_view,
                    smart_cast: Some(*narrowed),
                    unsafe_receiver: None,
                });
            }
        }
        return Some(MemberAccess {
            owner_view,
            smart_cast: None,
            unsafe_receiver: Some(receiver.ty),
        });
    }

    receiver.possible_types.iter().find_map(|narrowed| {
        provides(*narrowed).map(|owner_view| MemberAccess {
            owner_view,
            smart_cast: Some(*narrowed),
            unsafe_receiver: (db.is_nullable(*narrowed) && !safe_call).then_some(*narrowed),
        })
    })
}

/// Rewrite a member of a generic class in terms of the receiver's type
/// arguments, marking it inherited when reached through a supertype.
fn specialize_member(
    db: &dyn TypeDatabase,
    member: &Declaration,
    owner_view: TypeId,
    inherited: bool,
) -> Option<Declaration> {
    let owner = member.dispatch_receiver?;
    let subst = match (as_class_type(db, owner), as_class_type(db, owner_view)) {
        (Some(declared), Some(seen)) if declared.class == seen.class && owner != owner_view => {
            TypeSubstitution::from_args(&declared.args, &seen.args)
        }
        _ => TypeSubstitution::new(),
    };
    let mark_inherited = inherited && member.origin == DeclarationOrigin::Declared;
    if subst.is_empty() && !mark_inherited {
        return None;
    }
    let mut specialized = member.clone();
    if !subst.is_empty() {
        specialized.value_params = member
            .value_params
            .iter()
            .map(|p| ValueParameter {
                ty: instantiate_type(db, p.ty, &subst),
                ..p.clone()
            })
            .collect();
        specialized.return_type = instantiate_type(db, member.return_type, &subst);
        specialized.extension_receiver = member
            .extension_receiver
            .map(|ty| instantiate_type(db, ty, &subst));
        specialized.dispatch_receiver = Some(owner_view);
    }
    if mark_inherited {
        specialized.origin = DeclarationOrigin::Inherited;
    }
    Some(specialized)
}

/// Build the candidate for a member reached through `receiver`.
fn member_candidate(
    ctx: &LookupContext<'_>,
    receiver: &ReceiverValue,
    member: &Arc<Declaration>,
    access: &MemberAccess,
    extension_receiver: Option<&ReceiverValue>,
) -> Candidate {
    let mut candidate = create_candidate(ctx, member, Some(receiver.clone()), extension_receiver);
    let reached_from = access
        .smart_cast
        .and_then(|ty| class_of(ctx.db, ty))
        .or_else(|| class_of(ctx.db, receiver.ty));
    let inherited = match (reached_from, class_of(ctx.db, access.owner_view)) {
        (Some(from), Some(owner)) => from != owner,
        _ => false,
    };
    if let Some(specialized) = specialize_member(ctx.db, member, access.owner_view, inherited) {
        candidate = candidate.copy(Arc::new(specialized));
    }
    if let Some(smart_cast_type) = access.smart_cast {
        candidate.add_diagnostic(ResolutionDiagnostic::UsedSmartCastForDispatchReceiver {
            smart_cast_type,
        });
        if !receiver.stable {
            candidate.add_diagnostic(ResolutionDiagnostic::UnstableSmartCast { smart_cast_type });
        }
    }
    if let Some(receiver_type) = access.unsafe_receiver {
        candidate.add_diagnostic(ResolutionDiagnostic::UnsafeCall {
            receiver: receiver_type,
        });
    }
    candidate
}

/// Members of an explicit or implicit receiver.
pub struct MemberScopeLevel {
    receiver: ReceiverValue,
    members: Vec<Arc<Declaration>>,
    safe_call: bool,
}

impl MemberScopeLevel {
    pub fn new(receiver: ReceiverValue, members: Vec<Arc<Declaration>>) -> Self {
        MemberScopeLevel {
            receiver,
            members,
            safe_call: false,
        }
    }

    /// The receiver is accessed with `?.`.
    #[must_use]
    pub fn safe_call(mut self) -> Self {
        self.safe_call = true;
        self
    }

    fn collect(
        &self,
        ctx: &LookupContext<'_>,
        kind: LookupKind,
        name: Atom,
        extension_receiver: Option<&ReceiverValue>,
    ) -> LevelLookup {
        let mut candidates = SmallVec::new();
        for member in &self.members {
            if !matches(member, kind, name, extension_receiver) {
                continue;
            }
            let Some(access) = member_access(ctx.db, &self.receiver, member, self.safe_call)
            else {
                continue;
            };
            let mut candidate =
                member_candidate(ctx, &self.receiver, member, &access, extension_receiver);
            self.check_nested_access(ctx, member, &mut candidate);
            candidates.push(candidate);
        }
        LevelLookup {
            candidates,
            exclusive: false,
        }
    }

    /// Nested classifiers reached through an instance.
    fn check_nested_access(
        &self,
        ctx: &LookupContext<'_>,
        member: &Declaration,
        candidate: &mut Candidate,
    ) {
        match member.kind {
            DeclarationKind::Object => {
                if let Some(class) = class_of(ctx.db, member.return_type) {
                    candidate.add_diagnostic(
                        ResolutionDiagnostic::NestedClassViaInstanceReference { class },
                    );
                }
            }
            DeclarationKind::Constructor => {
                let Some(info) = constructed_class(ctx.db, member) else {
                    return;
                };
                if !info.is_inner {
                    candidate.add_diagnostic(
                        ResolutionDiagnostic::NestedClassViaInstanceReference { class: info.id },
                    );
                    return;
                }
                let receiver_class = class_of(ctx.db, self.receiver.ty);
                if info.outer.is_some() && receiver_class != info.outer {
                    let receiver_name = receiver_class
                        .and_then(|class| ctx.db.class_info(class))
                        .map(|outer| ctx.db.resolve_atom(outer.name))
                        .unwrap_or_default();
                    candidate.add_diagnostic(ResolutionDiagnostic::UnsupportedInnerClassCall {
                        message: format!(
                            "Constructor of inner class '{}' cannot be called on a receiver of subclass '{}'.",
                            ctx.db.resolve_atom(info.name),
                            receiver_name
                        ),
                    });
                }
            }
            _ => {}
        }
    }
}

impl ScopeTowerLevel for MemberScopeLevel {
    fn variables(
        &self,
        ctx: &LookupContext<'_>,
        name: Atom,
        extension_receiver: Option<&ReceiverValue>,
    ) -> LevelLookup {
        self.collect(ctx, LookupKind::Variable, name, extension_receiver)
    }

    fn objects(
        &self,
        ctx: &LookupContext<'_>,
        name: Atom,
        extension_receiver: Option<&ReceiverValue>,
    ) -> LevelLookup {
        self.collect(ctx, LookupKind::Object, name, extension_receiver)
    }

    fn functions(
        &self,
        ctx: &LookupContext<'_>,
        name: Atom,
        extension_receiver: Option<&ReceiverValue>,
    ) -> LevelLookup {
        self.collect(ctx, LookupKind::Function, name, extension_receiver)
    }

    fn description(&self) -> &'static str {
        "member"
    }
}

/// Properties synthesized from `getX()` members of a receiver.
pub struct SyntheticScopeLevel {
    receiver: ReceiverValue,
    members: Vec<Arc<Declaration>>,
    safe_call: bool,
}

impl SyntheticScopeLevel {
    pub fn new(receiver: ReceiverValue, members: Vec<Arc<Declaration>>) -> Self {
        SyntheticScopeLevel {
            receiver,
            members,
            safe_call: false,
        }
    }

    #[must_use]
    pub fn safe_call(mut self) -> Self {
        self.safe_call = true;
        self
    }
}

/// `size` -> `getSize`.
fn getter_name(property: &str) -> Option<String> {
    let mut chars = property.chars();
    let first = chars.next()?;
    Some(format!("get{}{}", first.to_uppercase(), chars.as_str()))
}

impl ScopeTowerLevel for SyntheticScopeLevel {
    fn variables(
        &self,
        ctx: &LookupContext<'_>,
        name: Atom,
        extension_receiver: Option<&ReceiverValue>,
    ) -> LevelLookup {
        if extension_receiver.is_some() {
            return LevelLookup::empty();
        }
        let Some(getter) = getter_name(&ctx.db.resolve_atom(name)) else {
            return LevelLookup::empty();
        };
        let getter = ctx.db.intern_string(&getter);
        let mut candidates = SmallVec::new();
        for member in &self.members {
            let is_getter = member.name == getter
                && member.kind == DeclarationKind::Function
                && member.value_params.is_empty()
                && member.type_params.is_empty()
                && member.extension_receiver.is_none();
            if !is_getter {
                continue;
            }
            let Some(access) = member_access(ctx.db, &self.receiver, member, self.safe_call)
            else {
                continue;
            };
            let mut accessor = Declaration::clone(member);
            accessor.name = name;
            accessor.kind = DeclarationKind::Variable;
            accessor.modifiers |= Modifiers::SYNTHESIZED;
            let accessor = Arc::new(accessor);
            candidates.push(member_candidate(ctx, &self.receiver, &accessor, &access, None));
        }
        LevelLookup {
            candidates,
            exclusive: false,
        }
    }

    fn objects(&self, _: &LookupContext<'_>, _: Atom, _: Option<&ReceiverValue>) -> LevelLookup {
        LevelLookup::empty()
    }

    fn functions(&self, _: &LookupContext<'_>, _: Atom, _: Option<&ReceiverValue>) -> LevelLookup {
        LevelLookup::empty()
    }

    fn description(&self) -> &'static str {
        "synthetic"
    }
}

/// Untyped fallback: every name resolves, at low priority.
#[derive(Debug, Default)]
pub struct DynamicScopeLevel;

impl DynamicScopeLevel {
    fn dynamic_declaration(
        ctx: &LookupContext<'_>,
        name: Atom,
        kind: DeclarationKind,
    ) -> Arc<Declaration> {
        let mut decl = Declaration::new(name, kind, ctx.location);
        decl.id = DeclId::DYNAMIC;
        decl.return_type = TypeId::DYNAMIC;
        if kind == DeclarationKind::Function {
            decl.value_params =
                vec![ValueParameter::new(ctx.db.intern_string("args"), TypeId::DYNAMIC).vararg()];
        }
        Arc::new(decl)
    }

    fn single(candidate: Candidate) -> LevelLookup {
        let mut candidates = SmallVec::new();
        candidates.push(candidate.with_diagnostic(ResolutionDiagnostic::DynamicDescriptor));
        LevelLookup {
            candidates,
            exclusive: false,
        }
    }
}

impl ScopeTowerLevel for DynamicScopeLevel {
    fn variables(
        &self,
        ctx: &LookupContext<'_>,
        name: Atom,
        extension_receiver: Option<&ReceiverValue>,
    ) -> LevelLookup {
        let decl = Self::dynamic_declaration(ctx, name, DeclarationKind::Variable);
        Self::single(Candidate::new(decl, extension_receiver.cloned()))
    }

    fn objects(&self, _: &LookupContext<'_>, _: Atom, _: Option<&ReceiverValue>) -> LevelLookup {
        LevelLookup::empty()
    }

    fn functions(
        &self,
        ctx: &LookupContext<'_>,
        name: Atom,
        extension_receiver: Option<&ReceiverValue>,
    ) -> LevelLookup {
        let decl = Self::dynamic_declaration(ctx, name, DeclarationKind::Function);
        Self::single(Candidate::new(decl, extension_receiver.cloned()))
    }

    fn description(&self) -> &'static str {
        "dynamic"
    }
}

// =============================================================================
// Member index
// =============================================================================

/// Declared members per class, shared read-only across sessions.
#[derive(Default)]
pub struct MemberIndex {
    members: DashMap<ClassId, Vec<Arc<Declaration>>>,
}

impl MemberIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&self, class: ClassId, member: Arc<Declaration>) {
        self.members.entry(class).or_default().push(member);
    }

    pub fn declared(&self, class: ClassId) -> Vec<Arc<Declaration>> {
        self.members
            .get(&class)
            .map(|entry| entry.value().clone())
            .unwrap_or_default()
    }

    /// Members reachable from any type of `receiver`, nearest class first.
    pub fn members_of(
        &self,
        db: &dyn TypeDatabase,
        receiver: &ReceiverValue,
    ) -> Vec<Arc<Declaration>> {
        let mut seen = FxHashSet::default();
        let mut result = Vec::new();
        for ty in receiver.all_types() {
            for sup in supertype_closure(db, db.not_null(ty)) {
                let Some(class) = as_class_type(db, sup) else {
                    continue;
                };
                for member in self.declared(class.class) {
                    if seen.insert(member.id) {
                        result.push(member);
                    }
                }
            }
        }
        result
    }
}

// =============================================================================
// ImplicitScopeTower
// =============================================================================

/// Everything name lookup sees at one call site.
#[derive(Clone)]
pub struct ImplicitScopeTower<'a> {
    db: &'a dyn TypeDatabase,
    tree: &'a ContainerTree,
    members: Option<&'a MemberIndex>,
    levels: Vec<Arc<dyn ScopeTowerLevel>>,
    /// Innermost first.
    implicit_receivers: Vec<ReceiverValue>,
    location: ContainerId,
    is_debugger_context: bool,
    cancellation: CancellationToken,
}

impl<'a> ImplicitScopeTower<'a> {
    pub fn new(db: &'a dyn TypeDatabase, tree: &'a ContainerTree, location: ContainerId) -> Self {
        ImplicitScopeTower {
            db,
            tree,
            members: None,
            levels: Vec::with_capacity(TOWER_LEVEL_CAPACITY),
            implicit_receivers: Vec::new(),
            location,
            is_debugger_context: false,
            cancellation: CancellationToken::never(),
        }
    }

    #[must_use]
    pub fn with_member_index(mut self, members: &'a MemberIndex) -> Self {
        self.members = Some(members);
        self
    }

    #[must_use]
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = token;
        self
    }

    /// Private and protected members are visible from a debugger evaluation.
    #[must_use]
    pub fn debugger_context(mut self) -> Self {
        self.is_debugger_context = true;
        self
    }

    /// Append a level below all existing ones.
    pub fn push_level(&mut self, level: impl ScopeTowerLevel + 'static) {
        self.levels.push(Arc::new(level));
    }

    /// Append the member levels of an implicit receiver below all existing
    /// levels; the receiver becomes the outermost one so far.
    pub fn push_implicit_receiver(&mut self, receiver: ReceiverValue) {
        let levels = self.receiver_levels(&receiver, false);
        self.levels.extend(levels);
        self.implicit_receivers.push(receiver);
    }

    /// A tower for a nested body whose innermost level is `level`.
    pub fn with_innermost_level(&self, level: Arc<dyn ScopeTowerLevel>) -> Self {
        let mut nested = self.clone();
        nested.levels.insert(0, level);
        nested
    }

    /// A tower for a lambda with receiver: `receiver` becomes the innermost
    /// implicit receiver and its members the innermost levels.
    pub fn with_innermost_receiver(&self, receiver: ReceiverValue) -> Self {
        let mut nested = self.clone();
        let levels = self.receiver_levels(&receiver, false);
        nested.levels.splice(0..0, levels);
        nested.implicit_receivers.insert(0, receiver);
        nested
    }

    /// Member and synthetic levels for `receiver`.
    pub fn receiver_levels(
        &self,
        receiver: &ReceiverValue,
        safe_call: bool,
    ) -> Vec<Arc<dyn ScopeTowerLevel>> {
        let Some(index) = self.members else {
            return Vec::new();
        };
        let members = index.members_of(self.db, receiver);
        let mut member_level = MemberScopeLevel::new(receiver.clone(), members.clone());
        let mut synthetic_level = SyntheticScopeLevel::new(receiver.clone(), members);
        if safe_call {
            member_level = member_level.safe_call();
            synthetic_level = synthetic_level.safe_call();
        }
        vec![Arc::new(member_level), Arc::new(synthetic_level)]
    }

    pub fn db(&self) -> &'a dyn TypeDatabase {
        self.db
    }

    pub fn tree(&self) -> &'a ContainerTree {
        self.tree
    }

    pub fn levels(&self) -> &[Arc<dyn ScopeTowerLevel>] {
        &self.levels
    }

    pub fn implicit_receivers(&self) -> &[ReceiverValue] {
        &self.implicit_receivers
    }

    pub fn location(&self) -> ContainerId {
        self.location
    }

    pub fn is_debugger_context(&self) -> bool {
        self.is_debugger_context
    }

    pub fn cancellation(&self) -> &CancellationToken {
        &self.cancellation
    }

    pub fn lookup_context(&self) -> LookupContext<'a> {
        LookupContext {
            db: self.db,
            tree: self.tree,
            location: self.location,
            is_debugger_context: self.is_debugger_context,
        }
    }

    /// Lazily gather candidates for `name` across all levels.
    pub fn candidates(
        &self,
        kind: LookupKind,
        name: Atom,
        extension_receiver: Option<ReceiverValue>,
    ) -> CandidateSequence<'a> {
        CandidateSequence::new(
            self.lookup_context(),
            self.levels.clone(),
            kind,
            name,
            extension_receiver,
            self.cancellation.clone(),
        )
    }

    /// Lazily gather members of an explicit receiver.
    pub fn member_candidates(
        &self,
        kind: LookupKind,
        name: Atom,
        receiver: &ReceiverValue,
        safe_call: bool,
    ) -> CandidateSequence<'a> {
        CandidateSequence::new(
            self.lookup_context(),
            self.receiver_levels(receiver, safe_call),
            kind,
            name,
            None,
            self.cancellation.clone(),
        )
    }

    /// The dynamic fallback alone.
    pub fn dynamic_candidates(
        &self,
        kind: LookupKind,
        name: Atom,
        receiver: Option<ReceiverValue>,
    ) -> CandidateSequence<'a> {
        CandidateSequence::new(
            self.lookup_context(),
            vec![Arc::new(DynamicScopeLevel)],
            kind,
            name,
            receiver,
            self.cancellation.clone(),
        )
    }
}

#[cfg(test)]
#[path = "../tests/tower_tests.rs"]
mod tower_tests;
