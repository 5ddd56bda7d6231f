//! Generic type instantiation and substitution.
//!
//! A substitution maps type parameter types (declaration side) or type
//! variable types (inference side) to replacement types. Instantiation walks
//! a type structurally and rebuilds it through the interner, so unchanged
//! subtrees keep their `TypeId`.

use crate::db::TypeDatabase;
use crate::types::{ClassType, FunctionShape, TypeData, TypeId, TypeVariable};
use rustc_hash::FxHashMap;
use smallvec::SmallVec;

/// Mapping from type parameter or type variable types to replacements.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TypeSubstitution {
    map: FxHashMap<TypeId, TypeId>,
}

impl TypeSubstitution {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pair declared parameters with arguments positionally.
    ///
    /// Extra entries on either side are ignored.
    pub fn from_args(params: &[TypeId], args: &[TypeId]) -> Self {
        let map = params.iter().copied().zip(args.iter().copied()).collect();
        TypeSubstitution { map }
    }

    pub fn insert(&mut self, from: TypeId, to: TypeId) {
        self.map.insert(from, to);
    }

    pub fn get(&self, ty: TypeId) -> Option<TypeId> {
        self.map.get(&ty).copied()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (TypeId, TypeId)> + '_ {
        self.map.iter().map(|(k, v)| (*k, *v))
    }
}

/// Apply `subst` to `ty`.
pub fn instantiate_type(db: &dyn TypeDatabase, ty: TypeId, subst: &TypeSubstitution) -> TypeId {
    if subst.is_empty() || ty.is_intrinsic() {
        return ty;
    }
    if let Some(replacement) = subst.get(ty) {
        return replacement;
    }
    let Some(data) = db.lookup(ty) else {
        return ty;
    };
    match data.as_ref() {
        TypeData::Intrinsic(_) | TypeData::TypeParameter(_) | TypeData::Variable(_) => ty,
        TypeData::Nullable(inner) => {
            let inner = instantiate_type(db, *inner, subst);
            db.nullable(inner)
        }
        TypeData::Class(class) => {
            let args = class
                .args
                .iter()
                .map(|arg| instantiate_type(db, *arg, subst))
                .collect();
            db.intern(TypeData::Class(ClassType {
                class: class.class,
                args,
            }))
        }
        TypeData::Function(shape) => {
            let receiver = shape.receiver.map(|r| instantiate_type(db, r, subst));
            let params = shape
                .params
                .iter()
                .map(|p| instantiate_type(db, *p, subst))
                .collect();
            let return_type = instantiate_type(db, shape.return_type, subst);
            db.intern(TypeData::Function(FunctionShape {
                receiver,
                params,
                return_type,
            }))
        }
    }
}

/// Whether `ty` mentions any type variable.
pub fn contains_variables(db: &dyn TypeDatabase, ty: TypeId) -> bool {
    let mut found = false;
    visit_variables(db, ty, &mut |_| found = true);
    found
}

/// Type variables mentioned in `ty`, in first-occurrence order.
pub fn collect_variables(db: &dyn TypeDatabase, ty: TypeId) -> SmallVec<[TypeVariable; 4]> {
    let mut vars = SmallVec::new();
    visit_variables(db, ty, &mut |var| {
        if !vars.contains(&var) {
            vars.push(var);
        }
    });
    vars
}

fn visit_variables(db: &dyn TypeDatabase, ty: TypeId, f: &mut dyn FnMut(TypeVariable)) {
    if ty.is_intrinsic() {
        return;
    }
    let Some(data) = db.lookup(ty) else {
        return;
    };
    match data.as_ref() {
        TypeData::Variable(var) => f(*var),
        TypeData::Intrinsic(_) | TypeData::TypeParameter(_) => {}
        TypeData::Nullable(inner) => visit_variables(db, *inner, f),
        TypeData::Class(class) => {
            for arg in &class.args {
                visit_variables(db, *arg, f);
            }
        }
        TypeData::Function(shape) => {
            if let Some(receiver) = shape.receiver {
                visit_variables(db, receiver, f);
            }
            for param in &shape.params {
                visit_variables(db, *param, f);
            }
            visit_variables(db, shape.return_type, f);
        }
    }
}

#[cfg(test)]
#[path = "../tests/instantiate_tests.rs"]
mod instantiate_tests;
