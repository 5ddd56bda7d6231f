//! Constraint-based type inference for generic calls.
//!
//! Each candidate of a call owns one constraint system. While arguments are
//! matched against parameters the resolver feeds it subtype and equality
//! constraints; `freeze()` then solves all type variables at once and hands
//! back an immutable [`ConstraintStorage`].
//!
//! ## Lifecycle
//!
//! - [`ConstraintSystemBuilder`] is the mutable phase. Its `freeze(self)`
//!   consumes it, so a frozen builder cannot be touched again.
//! - [`ConstraintSystem`] wraps the builder behind a lifecycle flag for
//!   callers that hold the system in a longer-lived slot. It rejects mutation
//!   after freeze and a second freeze with a [`ContractViolation`].
//!
//! ## Failure is data
//!
//! A constraint that cannot hold never aborts: it is recorded as a
//! [`ConstraintError`] so the candidate can still be ranked against the
//! others.
//!
//! Type variables that are equal are tracked with `ena` union-find; bounds
//! are decomposed structurally down to bare variables as they arrive.

use crate::class_hierarchy::{as_class_type, supertype_as};
use crate::contract::ContractViolation;
use crate::db::TypeDatabase;
use crate::instantiate::collect_variables;
use crate::lattice::{common_subtype, common_supertype};
use crate::recursion::{DepthCounter, RecursionProfile};
use crate::storage::ConstraintStorage;
use crate::subtype::is_subtype_of;
use crate::types::{TypeData, TypeId, TypeVariable, Variance};
use calltower_common::limits::MAX_CONSTRAINT_ITERATIONS;
use ena::unify::{InPlaceUnificationTable, UnifyKey};
use rustc_hash::FxHashMap;
use tracing::trace;

// =============================================================================
// Keys, origins and bounds
// =============================================================================

/// Dense union-find key of a variable inside one constraint system.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub(crate) struct VarKey(pub(crate) u32);

impl UnifyKey for VarKey {
    type Value = ();

    fn index(&self) -> u32 {
        self.0
    }

    fn from_index(i: u32) -> Self {
        VarKey(i)
    }

    fn tag() -> &'static str {
        "VarKey"
    }
}

/// Where a constraint came from; used only for diagnostics.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum ConstraintOrigin {
    /// Value argument matched against its parameter.
    Argument { index: usize },
    Receiver,
    ExplicitTypeArgument { index: usize },
    /// The declared upper bound of a type parameter.
    DeclaredUpperBound { param: TypeId },
    /// The type expected of the whole call.
    ExpectedType,
    /// Implicit return value of a lambda argument.
    LambdaReturn { argument: usize },
    LambdaParameter { argument: usize, index: usize },
}

/// Why a type variable exists.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum VariableOrigin {
    /// Stands for a type parameter of the candidate declaration.
    TypeParameter { param: TypeId },
    /// Return type of a lambda whose expected return type is not yet known.
    LambdaReturn { argument: usize },
    Synthetic,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct VariableInfo {
    pub var: TypeVariable,
    pub origin: VariableOrigin,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Bound {
    pub ty: TypeId,
    pub origin: ConstraintOrigin,
}

/// A recorded inference failure.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ConstraintError {
    /// `lower <: upper` cannot hold.
    Unsatisfiable {
        lower: TypeId,
        upper: TypeId,
        origin: ConstraintOrigin,
    },
    /// The variable has no informative bound.
    NotEnoughInformation { variable: TypeVariable },
    /// The upper bounds of the variable have no common subtype.
    NoCommonSubtype {
        variable: TypeVariable,
        upper_bounds: Vec<TypeId>,
    },
    DecompositionTooDeep { origin: ConstraintOrigin },
}

/// A constraint mentioning variables, kept for verification after solving.
#[derive(Copy, Clone, Debug)]
pub(crate) struct RecordedConstraint {
    pub(crate) lower: TypeId,
    pub(crate) upper: TypeId,
    pub(crate) origin: ConstraintOrigin,
    /// Decomposition already recorded an error for this constraint.
    pub(crate) reported: bool,
}

// =============================================================================
// ConstraintSystemBuilder
// =============================================================================

pub struct ConstraintSystemBuilder<'a> {
    pub(crate) db: &'a dyn TypeDatabase,
    pub(crate) table: InPlaceUnificationTable<VarKey>,
    pub(crate) variables: Vec<VariableInfo>,
    pub(crate) keys: FxHashMap<TypeVariable, VarKey>,
    pub(crate) lower: Vec<Vec<Bound>>,
    pub(crate) upper: Vec<Vec<Bound>>,
    pub(crate) constraints: Vec<RecordedConstraint>,
    pub(crate) errors: Vec<ConstraintError>,
    pub(crate) max_iterations: u32,
    depth: DepthCounter,
}

impl<'a> ConstraintSystemBuilder<'a> {
    pub fn new(db: &'a dyn TypeDatabase) -> Self {
        ConstraintSystemBuilder {
            db,
            table: InPlaceUnificationTable::new(),
            variables: Vec::new(),
            keys: FxHashMap::default(),
            lower: Vec::new(),
            upper: Vec::new(),
            constraints: Vec::new(),
            errors: Vec::new(),
            max_iterations: MAX_CONSTRAINT_ITERATIONS,
            depth: DepthCounter::with_profile(RecursionProfile::ConstraintDecomposition),
        }
    }

    /// Budget for the solving fixpoint.
    pub fn with_max_iterations(mut self, max_iterations: u32) -> Self {
        self.max_iterations = max_iterations.max(1);
        self
    }

    pub fn db(&self) -> &'a dyn TypeDatabase {
        self.db
    }

    /// Register a fresh type variable.
    pub fn new_type_variable(&mut self, origin: VariableOrigin) -> TypeVariable {
        let var = self.db.fresh_variable();
        let key = self.table.new_key(());
        debug_assert_eq!(key.0 as usize, self.variables.len());
        self.variables.push(VariableInfo { var, origin });
        self.keys.insert(var, key);
        self.lower.push(Vec::new());
        self.upper.push(Vec::new());
        trace!(var = var.0, ?origin, "new type variable");
        var
    }

    /// The type standing for `var`.
    pub fn variable_type(&self, var: TypeVariable) -> TypeId {
        self.db.variable(var)
    }

    pub fn variables(&self) -> &[VariableInfo] {
        &self.variables
    }

    pub fn errors(&self) -> &[ConstraintError] {
        &self.errors
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    /// Whether `ty` mentions a variable registered in this system.
    pub fn mentions_own_variables(&self, ty: TypeId) -> bool {
        collect_variables(self.db, ty)
            .iter()
            .any(|var| self.keys.contains_key(var))
    }

    /// Add `lower <: upper`. Failure is recorded, never raised.
    pub fn add_subtype_constraint(
        &mut self,
        lower: TypeId,
        upper: TypeId,
        origin: ConstraintOrigin,
    ) {
        trace!(lower = lower.0, upper = upper.0, ?origin, "add subtype constraint");
        if !self.mentions_own_variables(lower) && !self.mentions_own_variables(upper) {
            if !is_subtype_of(self.db, lower, upper) {
                self.errors.push(ConstraintError::Unsatisfiable {
                    lower,
                    upper,
                    origin,
                });
            }
            return;
        }
        let ok = self.decompose(lower, upper, origin);
        self.constraints.push(RecordedConstraint {
            lower,
            upper,
            origin,
            reported: !ok,
        });
    }

    /// Add `a == b`. Two variables are merged into one equivalence class.
    pub fn add_equality_constraint(&mut self, a: TypeId, b: TypeId, origin: ConstraintOrigin) {
        if let (Some(ka), Some(kb)) = (self.own_key(a), self.own_key(b)) {
            trace!(a = a.0, b = b.0, "unify type variables");
            self.table.union(ka, kb);
            return;
        }
        self.add_subtype_constraint(a, b, origin);
        self.add_subtype_constraint(b, a, origin);
    }

    /// Best current guess for `var` from the ground bounds gathered so far.
    ///
    /// Used to fix lambda parameter types before the lambda is analyzed. This
    /// is a local view: bounds that only arrive through other variables are
    /// not considered.
    pub fn current_solution(&mut self, var: TypeVariable) -> Option<TypeId> {
        let key = *self.keys.get(&var)?;
        let root = self.table.find(key);
        let mut lowers = Vec::new();
        let mut uppers = Vec::new();
        for index in 0..self.variables.len() {
            if self.table.find(VarKey(index as u32)) != root {
                continue;
            }
            lowers.extend(self.lower[index].iter().map(|b| b.ty));
            uppers.extend(self.upper[index].iter().map(|b| b.ty));
        }
        lowers.retain(|ty| !self.mentions_own_variables(*ty));
        uppers.retain(|ty| *ty != TypeId::NULLABLE_ANY && !self.mentions_own_variables(*ty));
        if !lowers.is_empty() {
            return Some(common_supertype(self.db, &lowers));
        }
        if !uppers.is_empty() {
            return common_subtype(self.db, &uppers);
        }
        None
    }

    /// Solve and seal the system.
    pub fn freeze(self) -> ConstraintStorage {
        crate::infer_resolve::solve(self)
    }

    // -------------------------------------------------------------------------
    // Structural decomposition
    // -------------------------------------------------------------------------

    fn own_key(&self, ty: TypeId) -> Option<VarKey> {
        self.db
            .as_variable(ty)
            .and_then(|var| self.keys.get(&var).copied())
    }

    fn mismatch(&mut self, lower: TypeId, upper: TypeId, origin: ConstraintOrigin) -> bool {
        self.errors.push(ConstraintError::Unsatisfiable {
            lower,
            upper,
            origin,
        });
        false
    }

    /// Reduce `lower <: upper` to bounds on bare variables. Returns `false`
    /// when an error was recorded.
    fn decompose(&mut self, lower: TypeId, upper: TypeId, origin: ConstraintOrigin) -> bool {
        if lower == upper {
            return true;
        }
        if !self.depth.enter() {
            self.errors.push(ConstraintError::DecompositionTooDeep { origin });
            return false;
        }
        let ok = self.decompose_inner(lower, upper, origin);
        self.depth.leave();
        ok
    }

    fn decompose_inner(&mut self, lower: TypeId, upper: TypeId, origin: ConstraintOrigin) -> bool {
        let db = self.db;

        if let Some(key) = self.own_key(lower) {
            self.upper[key.0 as usize].push(Bound { ty: upper, origin });
            if let Some(upper_key) = self.own_key(upper) {
                self.lower[upper_key.0 as usize].push(Bound { ty: lower, origin });
            }
            return true;
        }
        if let Some(key) = self.own_key(upper) {
            self.lower[key.0 as usize].push(Bound { ty: lower, origin });
            return true;
        }

        if lower.is_any_compatible()
            || upper.is_any_compatible()
            || lower == TypeId::NOTHING
            || upper == TypeId::NULLABLE_ANY
        {
            return true;
        }
        if !self.mentions_own_variables(lower) && !self.mentions_own_variables(upper) {
            return is_subtype_of(db, lower, upper) || self.mismatch(lower, upper, origin);
        }

        if db.is_nullable(upper) {
            if lower == TypeId::NULL {
                return true;
            }
            return self.decompose(db.not_null(lower), db.not_null(upper), origin);
        }
        if db.is_nullable(lower) {
            return self.mismatch(lower, upper, origin);
        }

        let lower_data = db.lookup(lower);
        if let Some(TypeData::TypeParameter(_)) = lower_data.as_deref() {
            return self.decompose(db.upper_bound(lower), upper, origin);
        }
        if upper == TypeId::ANY {
            return true;
        }

        let upper_data = db.lookup(upper);
        match (lower_data.as_deref(), upper_data.as_deref()) {
            (Some(TypeData::Class(_)), Some(TypeData::Class(target))) => {
                let viewed =
                    supertype_as(db, lower, target.class).and_then(|ty| as_class_type(db, ty));
                let Some(viewed) = viewed else {
                    return self.mismatch(lower, upper, origin);
                };
                if viewed.args.len() != target.args.len() {
                    return self.mismatch(lower, upper, origin);
                }
                let variances: Vec<Variance> = db
                    .class_info(target.class)
                    .map(|info| info.type_params.iter().map(|p| p.variance).collect())
                    .unwrap_or_default();
                let mut ok = true;
                for (i, (s_arg, t_arg)) in viewed.args.iter().zip(&target.args).enumerate() {
                    ok &= match variances.get(i).copied().unwrap_or_default() {
                        Variance::Covariant => self.decompose(*s_arg, *t_arg, origin),
                        Variance::Contravariant => self.decompose(*t_arg, *s_arg, origin),
                        Variance::Invariant => {
                            let down = self.decompose(*s_arg, *t_arg, origin);
                            let up = self.decompose(*t_arg, *s_arg, origin);
                            down && up
                        }
                    };
                }
                ok
            }
            (Some(TypeData::Function(source)), Some(TypeData::Function(target))) => {
                if source.params.len() != target.params.len()
                    || source.receiver.is_some() != target.receiver.is_some()
                {
                    return self.mismatch(lower, upper, origin);
                }
                let mut ok = true;
                if let (Some(s_recv), Some(t_recv)) = (source.receiver, target.receiver) {
                    ok &= self.decompose(t_recv, s_recv, origin);
                }
                for (s_param, t_param) in source.params.iter().zip(&target.params) {
                    ok &= self.decompose(*t_param, *s_param, origin);
                }
                ok &= self.decompose(source.return_type, target.return_type, origin);
                ok
            }
            _ => self.mismatch(lower, upper, origin),
        }
    }
}

// =============================================================================
// ConstraintSystem (lifecycle wrapper)
// =============================================================================

enum SystemState<'a> {
    Building(Box<ConstraintSystemBuilder<'a>>),
    Frozen,
}

/// A constraint system with an explicit freeze-once lifecycle.
pub struct ConstraintSystem<'a> {
    state: SystemState<'a>,
}

impl<'a> ConstraintSystem<'a> {
    pub fn new(db: &'a dyn TypeDatabase) -> Self {
        Self::from_builder(ConstraintSystemBuilder::new(db))
    }

    pub fn from_builder(builder: ConstraintSystemBuilder<'a>) -> Self {
        ConstraintSystem {
            state: SystemState::Building(Box::new(builder)),
        }
    }

    /// Mutable access for adding variables and constraints.
    pub fn builder(&mut self) -> Result<&mut ConstraintSystemBuilder<'a>, ContractViolation> {
        match &mut self.state {
            SystemState::Building(builder) => Ok(builder.as_mut()),
            SystemState::Frozen => Err(ContractViolation::MutationAfterFreeze),
        }
    }

    pub fn add_subtype_constraint(
        &mut self,
        lower: TypeId,
        upper: TypeId,
        origin: ConstraintOrigin,
    ) -> Result<(), ContractViolation> {
        self.builder()?.add_subtype_constraint(lower, upper, origin);
        Ok(())
    }

    pub fn add_equality_constraint(
        &mut self,
        a: TypeId,
        b: TypeId,
        origin: ConstraintOrigin,
    ) -> Result<(), ContractViolation> {
        self.builder()?.add_equality_constraint(a, b, origin);
        Ok(())
    }

    /// Solve and seal. A second call is rejected.
    pub fn freeze(&mut self) -> Result<ConstraintStorage, ContractViolation> {
        match std::mem::replace(&mut self.state, SystemState::Frozen) {
            SystemState::Building(builder) => Ok((*builder).freeze()),
            SystemState::Frozen => Err(ContractViolation::FrozenTwice),
        }
    }

    pub fn is_frozen(&self) -> bool {
        matches!(self.state, SystemState::Frozen)
    }
}

#[cfg(test)]
#[path = "../tests/infer_tests.rs"]
mod infer_tests;
