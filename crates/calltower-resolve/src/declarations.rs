//! Declarations as seen by call resolution.
//!
//! Declarations are owned by the program's symbol table and outlive every
//! resolution session. The resolver only ever holds `Arc<Declaration>`
//! handles; specialization (e.g. after a receiver smart cast) builds a new
//! declaration instead of touching the shared one.

use calltower_common::Atom;
use calltower_solver::{TypeDatabase, TypeId};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};

/// Identity of a declaration in the symbol table.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct DeclId(pub u32);

impl DeclId {
    /// Ids from here up belong to session-local declarations (lambda
    /// parameters, block locals) that never enter a store.
    pub const LOCAL_BASE: u32 = 1 << 31;
    /// Shared id of members synthesized for dynamic receivers.
    pub const DYNAMIC: DeclId = DeclId(u32::MAX);

    pub fn is_local(self) -> bool {
        self.0 >= Self::LOCAL_BASE
    }
}

/// Identity of a declaration container (package, class or function body).
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ContainerId(pub u32);

/// Identity of a compilation module.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ModuleId(pub u32);

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DeclarationKind {
    Function,
    Variable,
    Object,
    Constructor,
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Visibility {
    #[default]
    Public,
    /// Visible inside the declaring module.
    Internal,
    /// Visible inside the declaring class and its subclasses.
    Protected,
    /// Visible inside the declaring container.
    Private,
}

impl Visibility {
    pub fn keyword(self) -> &'static str {
        match self {
            Visibility::Public => "public",
            Visibility::Internal => "internal",
            Visibility::Protected => "protected",
            Visibility::Private => "private",
        }
    }
}

/// Whether a member is declared in its class or inherited from a supertype.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DeclarationOrigin {
    #[default]
    Declared,
    Inherited,
}

bitflags::bitflags! {
    /// Declaration modifiers relevant to resolution.
    #[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
    pub struct Modifiers: u16 {
        const INFIX = 1 << 0;
        const OPERATOR = 1 << 1;
        /// Excluded from resolution (deprecated-hidden).
        const HIDDEN = 1 << 2;
        /// Resolved only when nothing better exists.
        const LOW_PRIORITY = 1 << 3;
        /// Placeholder produced for erroneous source.
        const ERROR = 1 << 4;
        /// Auto-generated by the compiler.
        const SYNTHESIZED = 1 << 5;
        /// Extension declared on a static type but looked up on a dynamic receiver.
        const STATIC_EXTENSION = 1 << 6;
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ValueParameter {
    pub name: Atom,
    pub ty: TypeId,
    pub has_default: bool,
    /// Collects any number of positional arguments of type `ty`.
    pub is_vararg: bool,
}

impl ValueParameter {
    pub fn new(name: Atom, ty: TypeId) -> Self {
        ValueParameter {
            name,
            ty,
            has_default: false,
            is_vararg: false,
        }
    }

    #[must_use]
    pub fn with_default(mut self) -> Self {
        self.has_default = true;
        self
    }

    #[must_use]
    pub fn vararg(mut self) -> Self {
        self.is_vararg = true;
        self
    }
}

/// A callable or value declaration.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Declaration {
    pub id: DeclId,
    pub name: Atom,
    pub kind: DeclarationKind,
    /// Type parameter types (`TypeData::TypeParameter`) of a generic declaration.
    pub type_params: Vec<TypeId>,
    pub extension_receiver: Option<TypeId>,
    /// Type of the dispatch receiver for members; `None` for top-level declarations.
    pub dispatch_receiver: Option<TypeId>,
    pub value_params: Vec<ValueParameter>,
    /// Return type for functions, value type for variables and objects.
    pub return_type: TypeId,
    pub visibility: Visibility,
    pub modifiers: Modifiers,
    pub container: ContainerId,
    pub origin: DeclarationOrigin,
}

impl Declaration {
    pub fn new(name: Atom, kind: DeclarationKind, container: ContainerId) -> Self {
        Declaration {
            id: DeclId(u32::MAX),
            name,
            kind,
            type_params: Vec::new(),
            extension_receiver: None,
            dispatch_receiver: None,
            value_params: Vec::new(),
            return_type: TypeId::UNIT,
            visibility: Visibility::Public,
            modifiers: Modifiers::empty(),
            container,
            origin: DeclarationOrigin::Declared,
        }
    }

    pub fn is_generic(&self) -> bool {
        !self.type_params.is_empty()
    }

    pub fn is_callable(&self) -> bool {
        matches!(
            self.kind,
            DeclarationKind::Function | DeclarationKind::Constructor
        )
    }

    /// Function type of the declaration as a value (`R.(P...) -> T`).
    pub fn function_type(&self, db: &dyn TypeDatabase) -> TypeId {
        db.function(
            self.extension_receiver,
            self.value_params.iter().map(|p| p.ty).collect(),
            self.return_type,
        )
    }
}

/// Shared, read-only declaration table.
///
/// Declarations are registered before resolution starts; sessions running on
/// different threads read them concurrently.
pub struct DeclarationStore {
    declarations: DashMap<DeclId, Arc<Declaration>>,
    next_id: AtomicU32,
}

impl DeclarationStore {
    pub fn new() -> Self {
        DeclarationStore {
            declarations: DashMap::new(),
            next_id: AtomicU32::new(0),
        }
    }

    /// Assign an id to `decl` and store it.
    pub fn add(&self, mut decl: Declaration) -> Arc<Declaration> {
        let id = DeclId(self.next_id.fetch_add(1, Ordering::Relaxed));
        decl.id = id;
        let decl = Arc::new(decl);
        self.declarations.insert(id, Arc::clone(&decl));
        decl
    }

    pub fn get(&self, id: DeclId) -> Option<Arc<Declaration>> {
        self.declarations.get(&id).map(|entry| Arc::clone(entry.value()))
    }

    pub fn len(&self) -> usize {
        self.declarations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.declarations.is_empty()
    }
}

impl Default for DeclarationStore {
    fn default() -> Self {
        Self::new()
    }
}

/// A declaration seen with an overridden container and visibility.
///
/// Used to ask "would this still be visible if it lived elsewhere" without
/// building a modified copy of the declaration.
#[derive(Clone, Debug)]
pub struct DeclarationView {
    original: Arc<Declaration>,
    container: ContainerId,
    visibility: Visibility,
}

impl DeclarationView {
    /// The declaration as declared.
    pub fn of(original: &Arc<Declaration>) -> Self {
        DeclarationView {
            container: original.container,
            visibility: original.visibility,
            original: Arc::clone(original),
        }
    }

    pub fn with_overrides(
        original: &Arc<Declaration>,
        container: ContainerId,
        visibility: Visibility,
    ) -> Self {
        DeclarationView {
            original: Arc::clone(original),
            container,
            visibility,
        }
    }

    pub fn original(&self) -> &Arc<Declaration> {
        &self.original
    }

    pub fn id(&self) -> DeclId {
        self.original.id
    }

    pub fn name(&self) -> Atom {
        self.original.name
    }

    pub fn kind(&self) -> DeclarationKind {
        self.original.kind
    }

    pub fn container(&self) -> ContainerId {
        self.container
    }

    pub fn visibility(&self) -> Visibility {
        self.visibility
    }

    /// A standalone declaration carrying the overrides, for what-if resolution.
    pub fn to_declaration(&self) -> Declaration {
        Declaration {
            container: self.container,
            visibility: self.visibility,
            ..Declaration::clone(&self.original)
        }
    }
}

#[cfg(test)]
#[path = "../tests/declarations_tests.rs"]
mod declarations_tests;
