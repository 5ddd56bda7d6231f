//! Containers, visibility rules and move-safety checking.
//!
//! A declaration's visibility is judged from the container of the use site.
//! [`VisibilityPredictor`] answers the same question for a declaration that
//! has not moved yet, and [`MoveConflictChecker`] turns the predictions into
//! "X uses Y which will be inaccessible after move" conflicts.

use crate::declarations::{ContainerId, DeclId, Declaration, DeclarationKind, DeclarationStore};
use crate::declarations::{DeclarationView, ModuleId, Visibility};
use calltower_common::Atom;
use calltower_common::diagnostics::{Diagnostic, diagnostic_codes};
use calltower_common::span::Span;
use calltower_solver::{ClassId, TypeDatabase, is_subclass};
use rustc_hash::{FxHashMap, FxHashSet};
use std::sync::Arc;
use tracing::debug;

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum ContainerKind {
    Package,
    Class(ClassId),
    /// Body of a function or property accessor.
    Function,
}

#[derive(Clone, Debug)]
pub struct ContainerInfo {
    pub name: Atom,
    pub kind: ContainerKind,
    pub parent: Option<ContainerId>,
    pub module: ModuleId,
    /// Declaration whose body this container is.
    pub owner: Option<DeclId>,
}

#[derive(Clone, Debug)]
struct ModuleInfo {
    name: Atom,
    dependencies: FxHashSet<ModuleId>,
}

/// The container nesting of a program, built before resolution and shared
/// read-only afterwards.
#[derive(Clone, Debug, Default)]
pub struct ContainerTree {
    containers: Vec<ContainerInfo>,
    modules: Vec<ModuleInfo>,
}

impl ContainerTree {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_module(&mut self, name: Atom) -> ModuleId {
        let id = ModuleId(self.modules.len() as u32);
        self.modules.push(ModuleInfo {
            name,
            dependencies: FxHashSet::default(),
        });
        id
    }

    /// `from` can see the declarations of `to`.
    pub fn add_module_dependency(&mut self, from: ModuleId, to: ModuleId) {
        if let Some(module) = self.modules.get_mut(from.0 as usize) {
            module.dependencies.insert(to);
        }
    }

    pub fn module_name(&self, module: ModuleId) -> Option<Atom> {
        self.modules.get(module.0 as usize).map(|m| m.name)
    }

    /// Whether code in `from` can reference declarations of `to`.
    pub fn module_sees(&self, from: ModuleId, to: ModuleId) -> bool {
        from == to
            || self
                .modules
                .get(from.0 as usize)
                .is_some_and(|m| m.dependencies.contains(&to))
    }

    pub fn add_package(&mut self, name: Atom, module: ModuleId) -> ContainerId {
        self.push(ContainerInfo {
            name,
            kind: ContainerKind::Package,
            parent: None,
            module,
            owner: None,
        })
    }

    pub fn add_class(&mut self, name: Atom, class: ClassId, parent: ContainerId) -> ContainerId {
        let module = self.module_of(parent);
        self.push(ContainerInfo {
            name,
            kind: ContainerKind::Class(class),
            parent: Some(parent),
            module,
            owner: None,
        })
    }

    pub fn add_function(&mut self, name: Atom, parent: ContainerId) -> ContainerId {
        let module = self.module_of(parent);
        self.push(ContainerInfo {
            name,
            kind: ContainerKind::Function,
            parent: Some(parent),
            module,
            owner: None,
        })
    }

    /// Record that `container` is the body of `decl`.
    pub fn set_owner(&mut self, container: ContainerId, decl: DeclId) {
        if let Some(info) = self.containers.get_mut(container.0 as usize) {
            info.owner = Some(decl);
        }
    }

    fn push(&mut self, info: ContainerInfo) -> ContainerId {
        let id = ContainerId(self.containers.len() as u32);
        self.containers.push(info);
        id
    }

    pub fn get(&self, id: ContainerId) -> Option<&ContainerInfo> {
        self.containers.get(id.0 as usize)
    }

    pub fn module_of(&self, id: ContainerId) -> ModuleId {
        self.get(id).map(|c| c.module).unwrap_or(ModuleId(0))
    }

    pub fn is_package(&self, id: ContainerId) -> bool {
        matches!(self.get(id).map(|c| c.kind), Some(ContainerKind::Package))
    }

    /// `id` itself, then its parents up to the root.
    pub fn ancestors(&self, id: ContainerId) -> impl Iterator<Item = ContainerId> + '_ {
        std::iter::successors(Some(id), move |c| self.get(*c).and_then(|info| info.parent))
            .take_while(move |c| self.get(*c).is_some())
    }

    /// Whether `inner` is `outer` or nested inside it.
    pub fn is_inside(&self, inner: ContainerId, outer: ContainerId) -> bool {
        self.ancestors(inner).any(|c| c == outer)
    }

    pub fn class_of(&self, id: ContainerId) -> Option<ClassId> {
        match self.get(id)?.kind {
            ContainerKind::Class(class) => Some(class),
            _ => None,
        }
    }

    /// Human-readable name, e.g. `class 'Box'`.
    pub fn describe(&self, db: &dyn TypeDatabase, id: ContainerId) -> String {
        let Some(info) = self.get(id) else {
            return format!("<container#{}>", id.0);
        };
        let kind = match info.kind {
            ContainerKind::Package => "package",
            ContainerKind::Class(_) => "class",
            ContainerKind::Function => "function",
        };
        format!("{kind} '{}'", db.resolve_atom(info.name))
    }
}

/// Human-readable name of a declaration, e.g. `function 'foo'`.
pub fn describe_declaration(db: &dyn TypeDatabase, decl: &Declaration) -> String {
    let kind = match decl.kind {
        DeclarationKind::Function => "function",
        DeclarationKind::Variable => "property",
        DeclarationKind::Object => "object",
        DeclarationKind::Constructor => "constructor",
    };
    format!("{kind} '{}'", db.resolve_atom(decl.name))
}

fn capitalize(text: &str) -> String {
    let mut chars = text.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Whether the declaration seen through `view` is accessible from code in `from`.
///
/// In a debugger context private and protected members are accessible.
pub fn is_visible(
    db: &dyn TypeDatabase,
    tree: &ContainerTree,
    view: &DeclarationView,
    from: ContainerId,
    debugger: bool,
) -> bool {
    let owner = view.container();
    match view.visibility() {
        Visibility::Public => true,
        Visibility::Internal => tree.module_of(owner) == tree.module_of(from),
        Visibility::Private => debugger || tree.is_inside(from, owner),
        Visibility::Protected => {
            if debugger || tree.is_inside(from, owner) {
                return true;
            }
            let Some(declaring) = tree.class_of(owner) else {
                return true;
            };
            tree.ancestors(from)
                .filter_map(|c| tree.class_of(c))
                .any(|class| is_subclass(db, class, declaring))
        }
    }
}

/// Predicts how a declaration would look after moving to another container.
pub struct VisibilityPredictor<'a> {
    tree: &'a ContainerTree,
}

impl<'a> VisibilityPredictor<'a> {
    pub fn new(tree: &'a ContainerTree) -> Self {
        VisibilityPredictor { tree }
    }

    /// Protected members moved to package level become public.
    pub fn predict(&self, decl: &Arc<Declaration>, new_container: ContainerId) -> DeclarationView {
        let visibility =
            if decl.visibility == Visibility::Protected && self.tree.is_package(new_container) {
                Visibility::Public
            } else {
                decl.visibility
            };
        DeclarationView::with_overrides(decl, new_container, visibility)
    }
}

/// One reference from code in `site` to the declaration `target`.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Reference {
    pub site: ContainerId,
    pub target: DeclId,
    pub span: Span,
}

/// Finds references that a planned move would break.
pub struct MoveConflictChecker<'a> {
    db: &'a dyn TypeDatabase,
    tree: &'a ContainerTree,
    store: &'a DeclarationStore,
    moved: FxHashSet<DeclId>,
    target: ContainerId,
}

impl<'a> MoveConflictChecker<'a> {
    pub fn new(
        db: &'a dyn TypeDatabase,
        tree: &'a ContainerTree,
        store: &'a DeclarationStore,
        moved: impl IntoIterator<Item = DeclId>,
        target: ContainerId,
    ) -> Self {
        MoveConflictChecker {
            db,
            tree,
            store,
            moved: moved.into_iter().collect(),
            target,
        }
    }

    /// The moved declaration enclosing `site`, if any.
    fn moved_owner(&self, site: ContainerId) -> Option<DeclId> {
        self.tree
            .ancestors(site)
            .filter_map(|c| self.tree.get(c).and_then(|info| info.owner))
            .find(|owner| self.moved.contains(owner))
    }

    fn declaration_is_moved(&self, decl: &Declaration) -> bool {
        self.moved.contains(&decl.id) || self.moved_owner(decl.container).is_some()
    }

    fn describe_decl(&self, id: DeclId) -> String {
        match self.store.get(id) {
            Some(decl) => describe_declaration(self.db, &decl),
            None => format!("<declaration#{}>", id.0),
        }
    }

    fn describe_site(&self, site: ContainerId) -> String {
        match self.tree.get(site).and_then(|info| info.owner) {
            Some(owner) => self.describe_decl(owner),
            None => self.tree.describe(self.db, site),
        }
    }

    /// Uses of moved declarations from code that stays behind.
    pub fn check_visibility_in_usages(&self, references: &[Reference]) -> Vec<Diagnostic> {
        let predictor = VisibilityPredictor::new(self.tree);
        let mut seen: FxHashMap<DeclId, FxHashSet<ContainerId>> = FxHashMap::default();
        let mut conflicts = Vec::new();
        for reference in references {
            if !self.moved.contains(&reference.target) || self.moved_owner(reference.site).is_some()
            {
                continue;
            }
            if !seen.entry(reference.target).or_default().insert(reference.site) {
                continue;
            }
            let Some(decl) = self.store.get(reference.target) else {
                continue;
            };
            let predicted = predictor.predict(&decl, self.target);
            if !is_visible(self.db, self.tree, &predicted, reference.site, false) {
                let user = capitalize(&self.describe_site(reference.site));
                let used = describe_declaration(self.db, &decl);
                conflicts.push(Diagnostic::from_code(
                    reference.span,
                    diagnostic_codes::MOVE_MAKES_INACCESSIBLE,
                    &[&user, &used],
                ));
            }
        }
        conflicts
    }

    /// References made from moved code to declarations that stay behind.
    pub fn check_visibility_in_declarations(&self, references: &[Reference]) -> Vec<Diagnostic> {
        let mut conflicts = Vec::new();
        for reference in references {
            let Some(owner) = self.moved_owner(reference.site) else {
                continue;
            };
            let Some(target) = self.store.get(reference.target) else {
                continue;
            };
            if self.declaration_is_moved(&target) {
                continue;
            }
            let view = DeclarationView::of(&target);
            if !is_visible(self.db, self.tree, &view, self.target, false) {
                let user = capitalize(&self.describe_decl(owner));
                let used = describe_declaration(self.db, &target);
                conflicts.push(Diagnostic::from_code(
                    reference.span,
                    diagnostic_codes::MOVE_MAKES_INACCESSIBLE,
                    &[&user, &used],
                ));
            }
        }
        conflicts
    }

    /// References from moved code into modules the destination cannot see.
    pub fn check_module_conflicts_in_declarations(
        &self,
        references: &[Reference],
    ) -> Vec<Diagnostic> {
        let target_module = self.tree.module_of(self.target);
        let module_name = self
            .tree
            .module_name(target_module)
            .map(|atom| self.db.resolve_atom(atom))
            .unwrap_or_default();
        let mut conflicts = Vec::new();
        for reference in references {
            if self.moved_owner(reference.site).is_none() {
                continue;
            }
            let Some(target) = self.store.get(reference.target) else {
                continue;
            };
            if self.declaration_is_moved(&target) {
                continue;
            }
            let declared_in = self.tree.module_of(target.container);
            if self.tree.module_sees(target_module, declared_in) {
                continue;
            }
            let used = capitalize(&describe_declaration(self.db, &target));
            let user = self.describe_site(reference.site);
            conflicts.push(Diagnostic::from_code(
                reference.span,
                diagnostic_codes::MOVE_LEAVES_MODULE,
                &[&used, &user, &module_name],
            ));
        }
        conflicts
    }

    /// Uses of internal members of moved declarations from other modules.
    pub fn check_internal_member_usages(&self, references: &[Reference]) -> Vec<Diagnostic> {
        let target_module = self.tree.module_of(self.target);
        let mut conflicts = Vec::new();
        for reference in references {
            if self.moved.contains(&reference.target) || self.moved_owner(reference.site).is_some()
            {
                continue;
            }
            let Some(member) = self.store.get(reference.target) else {
                continue;
            };
            if member.visibility != Visibility::Internal || !self.declaration_is_moved(&member) {
                continue;
            }
            if self.tree.module_of(reference.site) == target_module {
                continue;
            }
            let user = capitalize(&self.describe_site(reference.site));
            let used = describe_declaration(self.db, &member);
            conflicts.push(Diagnostic::from_code(
                reference.span,
                diagnostic_codes::MOVE_MAKES_INTERNAL_INACCESSIBLE,
                &[&user, &used],
            ));
        }
        conflicts
    }

    pub fn check_all(&self, references: &[Reference]) -> Vec<Diagnostic> {
        let mut conflicts = self.check_module_conflicts_in_declarations(references);
        conflicts.extend(self.check_visibility_in_usages(references));
        conflicts.extend(self.check_visibility_in_declarations(references));
        conflicts.extend(self.check_internal_member_usages(references));
        debug!(
            moved = self.moved.len(),
            conflicts = conflicts.len(),
            "move conflict check"
        );
        conflicts
    }
}

#[cfg(test)]
#[path = "../tests/visibility_tests.rs"]
mod visibility_tests;
