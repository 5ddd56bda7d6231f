//! Type interning for structural deduplication.
//!
//! This module implements the interning engine that converts `TypeData`
//! structures into lightweight `TypeId` handles, and owns the nominal class
//! table and the declared bounds of type parameters.
//!
//! Benefits:
//! - O(1) type equality (just compare TypeId values)
//! - Memory efficient (each unique structure stored once)
//! - Shareable: every table is safe for concurrent readers and writers, so
//!   parallel resolution sessions can intern fresh variables and instantiated
//!   signatures against the same snapshot

use crate::db::TypeDatabase;
use crate::types::{
    ClassId, ClassInfo, ClassKind, ClassTypeParam, IntrinsicKind, TypeData, TypeId, TypeParamId,
    TypeParamInfo, TypeVariable, Variance,
};
use calltower_common::{Atom, NameInterner};
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, PoisonError, RwLock};
use tracing::trace;

/// Type interning table, class table and type-parameter bounds.
pub struct TypeInterner {
    map: DashMap<TypeData, TypeId>,
    types: RwLock<Vec<Arc<TypeData>>>,
    classes: RwLock<Vec<Arc<ClassInfo>>>,
    upper_bounds: DashMap<TypeParamId, TypeId>,
    next_type_param: AtomicU32,
    next_variable: AtomicU32,
    /// String interner for class, parameter and declaration names.
    pub string_interner: NameInterner,
}

impl TypeInterner {
    /// Create a new type interner with pre-registered intrinsics.
    pub fn new() -> Self {
        let interner = TypeInterner {
            map: DashMap::default(),
            types: RwLock::new(Vec::with_capacity(256)),
            classes: RwLock::new(Vec::new()),
            upper_bounds: DashMap::default(),
            next_type_param: AtomicU32::new(0),
            next_variable: AtomicU32::new(0),
            string_interner: NameInterner::with_common_names(),
        };
        for kind in IntrinsicKind::ALL {
            let id = interner.intern(TypeData::Intrinsic(kind));
            debug_assert_eq!(id.0, kind as u32);
        }
        interner
    }

    /// Number of interned types (including intrinsics).
    pub fn len(&self) -> usize {
        self.types
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    // -------------------------------------------------------------------------
    // Type parameters
    // -------------------------------------------------------------------------

    /// Create a fresh type parameter type named `name`.
    ///
    /// Each call yields a distinct parameter, even for equal names; the bound
    /// is attached separately so it may mention the parameter itself.
    pub fn type_parameter(&self, name: &str) -> TypeId {
        let id = TypeParamId(self.next_type_param.fetch_add(1, Ordering::Relaxed));
        let name = self.intern_string(name);
        self.intern(TypeData::TypeParameter(TypeParamInfo { id, name }))
    }

    /// Attach a declared upper bound to a type parameter type.
    pub fn set_upper_bound(&self, param: TypeId, bound: TypeId) {
        if let Some(TypeData::TypeParameter(info)) = self.lookup(param).as_deref() {
            self.upper_bounds.insert(info.id, bound);
        }
    }

    // -------------------------------------------------------------------------
    // Class table
    // -------------------------------------------------------------------------

    /// Register a class; the returned id is written into the stored info.
    pub fn register_class(&self, mut info: ClassInfo) -> ClassId {
        let mut classes = self.classes.write().unwrap_or_else(PoisonError::into_inner);
        let id = ClassId(classes.len() as u32);
        info.id = id;
        trace!(class = id.0, name = info.name.0, "register class");
        classes.push(Arc::new(info));
        id
    }

    /// Convenience for the common case of a class whose type parameters are
    /// created here, named `params` with the given variances.
    pub fn declare_class(
        &self,
        name: &str,
        kind: ClassKind,
        params: &[(&str, Variance)],
    ) -> ClassId {
        let type_params = params
            .iter()
            .map(|(param_name, variance)| ClassTypeParam {
                param: self.type_parameter(param_name),
                variance: *variance,
            })
            .collect();
        let mut info = ClassInfo::new(self.intern_string(name), kind);
        info.type_params = type_params;
        self.register_class(info)
    }

    /// Replace the direct supertypes of a class.
    ///
    /// Split from registration so supertypes may refer to the class itself
    /// (`class Node : Comparable<Node>`).
    pub fn set_supertypes(&self, class: ClassId, supertypes: Vec<TypeId>) {
        self.update_class(class, |info| info.supertypes = supertypes);
    }

    /// Mark `class` as nested in `outer`; inner classes capture an outer instance.
    pub fn set_outer(&self, class: ClassId, outer: ClassId, is_inner: bool) {
        self.update_class(class, |info| {
            info.outer = Some(outer);
            info.is_inner = is_inner;
        });
    }

    fn update_class(&self, class: ClassId, f: impl FnOnce(&mut ClassInfo)) {
        let mut classes = self.classes.write().unwrap_or_else(PoisonError::into_inner);
        if let Some(slot) = classes.get_mut(class.0 as usize) {
            let mut info = ClassInfo::clone(slot);
            f(&mut info);
            *slot = Arc::new(info);
        }
    }

    /// The class type with the class's own parameters as arguments (`List<T>`).
    pub fn class_self_type(&self, class: ClassId) -> TypeId {
        let args = self
            .class_info(class)
            .map(|info| info.type_params.iter().map(|p| p.param).collect())
            .unwrap_or_default();
        self.class_type(class, args)
    }

    pub fn find_class(&self, name: &str) -> Option<ClassId> {
        let atom = self.intern_string(name);
        self.classes
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .find(|info| info.name == atom)
            .map(|info| info.id)
    }
}

impl Default for TypeInterner {
    fn default() -> Self {
        Self::new()
    }
}

impl TypeDatabase for TypeInterner {
    fn intern(&self, data: TypeData) -> TypeId {
        if let Some(id) = self.map.get(&data) {
            return *id;
        }
        match self.map.entry(data) {
            Entry::Occupied(entry) => *entry.get(),
            Entry::Vacant(entry) => {
                let mut types = self.types.write().unwrap_or_else(PoisonError::into_inner);
                let id = TypeId(types.len() as u32);
                types.push(Arc::new(entry.key().clone()));
                entry.insert(id);
                id
            }
        }
    }

    fn lookup(&self, id: TypeId) -> Option<Arc<TypeData>> {
        self.types
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(id.0 as usize)
            .cloned()
    }

    fn intern_string(&self, s: &str) -> Atom {
        self.string_interner.intern(s)
    }

    fn resolve_atom(&self, atom: Atom) -> String {
        self.string_interner.resolve(atom).to_string()
    }

    fn class_info(&self, id: ClassId) -> Option<Arc<ClassInfo>> {
        self.classes
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(id.0 as usize)
            .cloned()
    }

    fn upper_bound(&self, param: TypeId) -> TypeId {
        match self.lookup(param).as_deref() {
            Some(TypeData::TypeParameter(info)) => self
                .upper_bounds
                .get(&info.id)
                .map(|bound| *bound)
                .unwrap_or(TypeId::NULLABLE_ANY),
            _ => TypeId::NULLABLE_ANY,
        }
    }

    fn fresh_variable(&self) -> TypeVariable {
        TypeVariable(self.next_variable.fetch_add(1, Ordering::Relaxed))
    }
}

#[cfg(test)]
#[path = "../tests/intern_tests.rs"]
mod intern_tests;
