//! Structural type solver for call resolution.
//!
//! This crate owns everything the resolver needs to reason about types:
//!
//! - **Interning**: `TypeData` structures are stored once and compared as
//!   `TypeId` handles
//! - **Ena**: union-find over type variables unified by equality constraints
//! - **Constraint systems**: a mutable builder per candidate, frozen once into
//!   an immutable `ConstraintStorage`
//!
//! Key properties:
//! - O(1) type equality via interning
//! - Order-independent solving: the substitution is a fixpoint over the
//!   constraint set
//! - Shared tables are `Send + Sync`; per-attempt state is owned
mod class_hierarchy;
pub mod contract;
mod db;
mod format;
mod infer;
mod infer_resolve;
mod instantiate;
mod intern;
mod lattice;
pub mod recursion;
mod storage;
mod subtype;
pub mod types;

pub use class_hierarchy::{as_class_type, is_subclass, supertype_as, supertype_closure};
pub use contract::ContractViolation;
pub use db::TypeDatabase;
pub use format::TypeFormatter;
pub use infer::{
    Bound, ConstraintError, ConstraintOrigin, ConstraintSystem, ConstraintSystemBuilder,
    VariableInfo, VariableOrigin,
};
pub use instantiate::{TypeSubstitution, collect_variables, contains_variables, instantiate_type};
pub use intern::TypeInterner;
pub use lattice::{common_subtype, common_supertype};
pub use storage::{ConstraintStorage, VariableBounds};
pub use subtype::{SubtypeChecker, SubtypeResult, is_subtype_of};
pub use types::{
    ClassId, ClassInfo, ClassKind, ClassTypeParam, FunctionShape, IntrinsicKind, TypeData, TypeId,
    TypeParamId, TypeVariable, Variance,
};
