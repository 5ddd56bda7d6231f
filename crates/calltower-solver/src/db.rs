//! Type database trait.
//!
//! Solver algorithms are written against `&dyn TypeDatabase` rather than the
//! concrete interner, so the resolver can hand them any read-mostly snapshot
//! of the program's types. Implementations must be safe to share between
//! concurrent resolution sessions.

use crate::types::{
    ClassId, ClassInfo, ClassType, FunctionShape, IntrinsicKind, TypeData, TypeId, TypeVariable,
};
use calltower_common::Atom;
use std::sync::Arc;

pub trait TypeDatabase: Send + Sync {
    fn intern(&self, data: TypeData) -> TypeId;
    fn lookup(&self, id: TypeId) -> Option<Arc<TypeData>>;

    fn intern_string(&self, s: &str) -> Atom;
    fn resolve_atom(&self, atom: Atom) -> String;

    fn class_info(&self, id: ClassId) -> Option<Arc<ClassInfo>>;
    /// Declared upper bound of a type parameter type (`Any?` when undeclared).
    fn upper_bound(&self, param: TypeId) -> TypeId;

    /// Allocate a type variable that is unique across all constraint systems.
    fn fresh_variable(&self) -> TypeVariable;

    // -------------------------------------------------------------------------
    // Factory helpers
    // -------------------------------------------------------------------------

    fn class_type(&self, class: ClassId, args: Vec<TypeId>) -> TypeId {
        self.intern(TypeData::Class(ClassType { class, args }))
    }

    fn function(&self, receiver: Option<TypeId>, params: Vec<TypeId>, return_type: TypeId) -> TypeId {
        self.intern(TypeData::Function(FunctionShape {
            receiver,
            params,
            return_type,
        }))
    }

    fn variable(&self, var: TypeVariable) -> TypeId {
        self.intern(TypeData::Variable(var))
    }

    /// `T?`, collapsing already-nullable types.
    fn nullable(&self, ty: TypeId) -> TypeId {
        match ty {
            TypeId::NOTHING | TypeId::NULL => return TypeId::NULL,
            TypeId::ANY | TypeId::NULLABLE_ANY => return TypeId::NULLABLE_ANY,
            TypeId::ERROR | TypeId::DYNAMIC => return ty,
            _ => {}
        }
        match self.lookup(ty).as_deref() {
            Some(TypeData::Nullable(_)) => ty,
            _ => self.intern(TypeData::Nullable(ty)),
        }
    }

    /// `T!!`: strip one level of nullability.
    fn not_null(&self, ty: TypeId) -> TypeId {
        match ty {
            TypeId::NULL => TypeId::NOTHING,
            TypeId::NULLABLE_ANY => TypeId::ANY,
            _ => match self.lookup(ty).as_deref() {
                Some(TypeData::Nullable(inner)) => *inner,
                _ => ty,
            },
        }
    }

    fn is_nullable(&self, ty: TypeId) -> bool {
        match ty {
            TypeId::NULL | TypeId::NULLABLE_ANY => true,
            _ => matches!(self.lookup(ty).as_deref(), Some(TypeData::Nullable(_))),
        }
    }

    fn intrinsic(&self, kind: IntrinsicKind) -> TypeId {
        self.intern(TypeData::Intrinsic(kind))
    }

    fn function_shape(&self, ty: TypeId) -> Option<FunctionShape> {
        match self.lookup(ty).as_deref() {
            Some(TypeData::Function(shape)) => Some(shape.clone()),
            _ => None,
        }
    }

    fn as_variable(&self, ty: TypeId) -> Option<TypeVariable> {
        if ty.is_intrinsic() {
            return None;
        }
        match self.lookup(ty).as_deref() {
            Some(TypeData::Variable(var)) => Some(*var),
            _ => None,
        }
    }
}
