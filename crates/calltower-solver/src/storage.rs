//! Frozen constraint storage.

use crate::db::TypeDatabase;
use crate::infer::{Bound, ConstraintError, VariableInfo};
use crate::instantiate::{TypeSubstitution, instantiate_type};
use crate::types::{TypeId, TypeVariable};
use indexmap::IndexMap;

/// Lower and upper bounds of one variable after propagation, sorted by type.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct VariableBounds {
    pub lower: Vec<Bound>,
    pub upper: Vec<Bound>,
}

/// Read-only result of solving one constraint system.
///
/// Produced exactly once by `freeze()`; exposes no mutating operations.
#[derive(Clone, Debug)]
pub struct ConstraintStorage {
    pub(crate) variables: Vec<VariableInfo>,
    pub(crate) bounds: IndexMap<TypeVariable, VariableBounds>,
    pub(crate) solutions: IndexMap<TypeVariable, TypeId>,
    pub(crate) substitution: TypeSubstitution,
    /// Maps every unsolved variable to the error type.
    pub(crate) unresolved: TypeSubstitution,
    pub(crate) errors: Vec<ConstraintError>,
}

impl ConstraintStorage {
    /// No inference failure was recorded.
    pub fn is_successful(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn errors(&self) -> &[ConstraintError] {
        &self.errors
    }

    pub fn variables(&self) -> &[VariableInfo] {
        &self.variables
    }

    pub fn bounds(&self, var: TypeVariable) -> Option<&VariableBounds> {
        self.bounds.get(&var)
    }

    /// Inferred type of `var`, if it was solved.
    pub fn solution(&self, var: TypeVariable) -> Option<TypeId> {
        self.solutions.get(&var).copied()
    }

    /// Solved variables in registration order.
    pub fn solutions(&self) -> impl Iterator<Item = (TypeVariable, TypeId)> + '_ {
        self.solutions.iter().map(|(var, ty)| (*var, *ty))
    }

    /// Substitution over solved variable types only.
    pub fn substitution(&self) -> &TypeSubstitution {
        &self.substitution
    }

    /// Apply the solution to `ty`; unsolved variables become the error type.
    pub fn substitute(&self, db: &dyn TypeDatabase, ty: TypeId) -> TypeId {
        let solved = instantiate_type(db, ty, &self.substitution);
        instantiate_type(db, solved, &self.unresolved)
    }
}
