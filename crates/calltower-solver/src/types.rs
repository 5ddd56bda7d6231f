//! Structural type representation.
//!
//! Types are interned: every distinct `TypeData` structure is stored once in
//! the [`TypeInterner`](crate::TypeInterner) and referred to by a `TypeId`
//! handle, so type equality is an integer comparison.

use calltower_common::Atom;
use serde::{Deserialize, Serialize};

/// Handle to an interned type.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TypeId(pub u32);

impl TypeId {
    /// Recovery type for erroneous code; compatible with everything.
    pub const ERROR: TypeId = TypeId(0);
    /// Bottom type.
    pub const NOTHING: TypeId = TypeId(1);
    /// Type of the `null` literal (`Nothing?`).
    pub const NULL: TypeId = TypeId(2);
    /// Non-null top type.
    pub const ANY: TypeId = TypeId(3);
    /// Top type (`Any?`).
    pub const NULLABLE_ANY: TypeId = TypeId(4);
    pub const UNIT: TypeId = TypeId(5);
    pub const BOOLEAN: TypeId = TypeId(6);
    pub const INT: TypeId = TypeId(7);
    pub const LONG: TypeId = TypeId(8);
    pub const DOUBLE: TypeId = TypeId(9);
    pub const CHAR: TypeId = TypeId(10);
    pub const STRING: TypeId = TypeId(11);
    /// Untyped fallback; every member access on it succeeds.
    pub const DYNAMIC: TypeId = TypeId(12);

    /// Number of pre-registered intrinsic types.
    pub const INTRINSIC_COUNT: u32 = 13;

    #[inline]
    pub fn is_intrinsic(self) -> bool {
        self.0 < Self::INTRINSIC_COUNT
    }

    /// Error and dynamic types are compatible with everything.
    #[inline]
    pub fn is_any_compatible(self) -> bool {
        self == Self::ERROR || self == Self::DYNAMIC
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum IntrinsicKind {
    Error,
    Nothing,
    Null,
    Any,
    NullableAny,
    Unit,
    Boolean,
    Int,
    Long,
    Double,
    Char,
    String,
    Dynamic,
}

impl IntrinsicKind {
    /// Intrinsics in `TypeId` order.
    pub const ALL: [IntrinsicKind; TypeId::INTRINSIC_COUNT as usize] = [
        IntrinsicKind::Error,
        IntrinsicKind::Nothing,
        IntrinsicKind::Null,
        IntrinsicKind::Any,
        IntrinsicKind::NullableAny,
        IntrinsicKind::Unit,
        IntrinsicKind::Boolean,
        IntrinsicKind::Int,
        IntrinsicKind::Long,
        IntrinsicKind::Double,
        IntrinsicKind::Char,
        IntrinsicKind::String,
        IntrinsicKind::Dynamic,
    ];

    pub fn name(self) -> &'static str {
        match self {
            IntrinsicKind::Error => "<error>",
            IntrinsicKind::Nothing => "Nothing",
            IntrinsicKind::Null => "Nothing?",
            IntrinsicKind::Any => "Any",
            IntrinsicKind::NullableAny => "Any?",
            IntrinsicKind::Unit => "Unit",
            IntrinsicKind::Boolean => "Boolean",
            IntrinsicKind::Int => "Int",
            IntrinsicKind::Long => "Long",
            IntrinsicKind::Double => "Double",
            IntrinsicKind::Char => "Char",
            IntrinsicKind::String => "String",
            IntrinsicKind::Dynamic => "dynamic",
        }
    }

    /// Look up an intrinsic by its source name.
    pub fn from_name(name: &str) -> Option<IntrinsicKind> {
        Self::ALL.iter().copied().find(|k| k.name() == name)
    }
}

/// Nominal class identity.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ClassId(pub u32);

/// Identity of a declared type parameter.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TypeParamId(pub u32);

/// A type variable allocated by a constraint system.
///
/// Variable ids are allocated from the interner, so variables of nested
/// constraint systems (calls inside lambda bodies) never collide.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TypeVariable(pub u32);

/// Declaration-site variance of a class type parameter.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Variance {
    #[default]
    Invariant,
    /// `out T`
    Covariant,
    /// `in T`
    Contravariant,
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ClassType {
    pub class: ClassId,
    pub args: Vec<TypeId>,
}

/// A function type `R.(P1, ..., Pn) -> T`.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct FunctionShape {
    pub receiver: Option<TypeId>,
    pub params: Vec<TypeId>,
    pub return_type: TypeId,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct TypeParamInfo {
    pub id: TypeParamId,
    pub name: Atom,
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum TypeData {
    Intrinsic(IntrinsicKind),
    Class(ClassType),
    Nullable(TypeId),
    Function(FunctionShape),
    TypeParameter(TypeParamInfo),
    Variable(TypeVariable),
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ClassKind {
    #[default]
    Class,
    Interface,
    Object,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct ClassTypeParam {
    /// The `TypeData::TypeParameter` type standing for this parameter.
    pub param: TypeId,
    pub variance: Variance,
}

/// Nominal class metadata stored in the class table.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ClassInfo {
    pub id: ClassId,
    pub name: Atom,
    pub kind: ClassKind,
    pub type_params: Vec<ClassTypeParam>,
    /// Direct supertypes, expressed over `type_params`.
    pub supertypes: Vec<TypeId>,
    /// Enclosing class for nested and inner classes.
    pub outer: Option<ClassId>,
    /// Inner classes capture an instance of `outer`.
    pub is_inner: bool,
}

impl ClassInfo {
    pub fn new(name: Atom, kind: ClassKind) -> Self {
        ClassInfo {
            id: ClassId(u32::MAX),
            name,
            kind,
            type_params: Vec::new(),
            supertypes: Vec::new(),
            outer: None,
            is_inner: false,
        }
    }
}
