//! Solving a frozen constraint system.
//!
//! The solver is a fixpoint over sets, never a left-to-right pass, so the
//! substitution depends only on the set of constraints and not on the order
//! they were added in. Insertion order survives only in diagnostic
//! provenance (which origin is reported for a bound, and error order).
//!
//! Phases:
//! 1. Canonicalize: variables unified by equality collapse into one class,
//!    represented by its smallest variable. Bounds become ordered sets.
//! 2. Propagate: along `A <: B` edges between classes, lower bounds of `A`
//!    flow to `B` and upper bounds of `B` flow to `A`, until closure.
//! 3. Solve in rounds: each round reads a snapshot of the solutions so far
//!    and fixes every class whose bounds are ground. A class takes the join
//!    of its lower bounds, else the meet of its upper bounds.
//! 4. Verify: every recorded constraint is re-checked under the solution.

use crate::db::TypeDatabase;
use crate::infer::{Bound, ConstraintError, ConstraintOrigin, ConstraintSystemBuilder, VarKey};
use crate::instantiate::{TypeSubstitution, collect_variables, instantiate_type};
use crate::lattice::{common_subtype, common_supertype};
use crate::storage::{ConstraintStorage, VariableBounds};
use crate::subtype::is_subtype_of;
use crate::types::{TypeId, TypeVariable};
use indexmap::IndexMap;
use rustc_hash::{FxHashMap, FxHashSet};
use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, trace};

type BoundSet = BTreeMap<TypeId, ConstraintOrigin>;

#[derive(Default)]
struct ClassState {
    members: Vec<TypeVariable>,
    lower: BoundSet,
    upper: BoundSet,
}

enum Readiness {
    Solved(TypeId),
    Failed(ConstraintError),
    Waiting,
}

struct Solver<'a> {
    db: &'a dyn TypeDatabase,
    /// Every variable of the system mapped to its class representative.
    class_of: FxHashMap<TypeVariable, TypeVariable>,
    classes: BTreeMap<TypeVariable, ClassState>,
}

impl<'a> Solver<'a> {
    /// Class of `ty` when it is a bare variable of this system.
    fn bare_class(&self, ty: TypeId) -> Option<TypeVariable> {
        self.db
            .as_variable(ty)
            .and_then(|var| self.class_of.get(&var).copied())
    }

    fn mentions_own(&self, ty: TypeId) -> bool {
        collect_variables(self.db, ty)
            .iter()
            .any(|var| self.class_of.contains_key(var))
    }

    fn insert_bound(set: &mut BoundSet, ty: TypeId, origin: ConstraintOrigin) -> bool {
        if set.contains_key(&ty) {
            return false;
        }
        set.insert(ty, origin);
        true
    }

    /// Make every variable-to-variable edge visible from both ends.
    fn mirror_edges(&mut self) {
        let mut additions: Vec<(TypeVariable, bool, TypeId, ConstraintOrigin)> = Vec::new();
        for (class, state) in &self.classes {
            let class_ty = self.db.variable(*class);
            for (ty, origin) in &state.upper {
                if let Some(other) = self.bare_class(*ty) {
                    additions.push((other, false, class_ty, *origin));
                }
            }
            for (ty, origin) in &state.lower {
                if let Some(other) = self.bare_class(*ty) {
                    additions.push((other, true, class_ty, *origin));
                }
            }
        }
        for (class, is_upper, ty, origin) in additions {
            if let Some(state) = self.classes.get_mut(&class) {
                let set = if is_upper { &mut state.upper } else { &mut state.lower };
                Self::insert_bound(set, ty, origin);
            }
        }
    }

    /// Transitive closure along `A <: B` edges.
    fn propagate(&mut self, max_iterations: u32) {
        for round in 0..max_iterations {
            let mut additions: Vec<(TypeVariable, bool, TypeId, ConstraintOrigin)> = Vec::new();
            for (class, state) in &self.classes {
                for upper_ty in state.upper.keys() {
                    let Some(target) = self.bare_class(*upper_ty) else {
                        continue;
                    };
                    let Some(target_state) = self.classes.get(&target) else {
                        continue;
                    };
                    let target_ty = self.db.variable(target);
                    for (ty, origin) in &state.lower {
                        if *ty != target_ty && !target_state.lower.contains_key(ty) {
                            additions.push((target, false, *ty, *origin));
                        }
                    }
                    let class_ty = self.db.variable(*class);
                    for (ty, origin) in &target_state.upper {
                        if *ty != class_ty && !state.upper.contains_key(ty) {
                            additions.push((*class, true, *ty, *origin));
                        }
                    }
                }
            }
            let mut changed = false;
            for (class, is_upper, ty, origin) in additions {
                if let Some(state) = self.classes.get_mut(&class) {
                    let set = if is_upper { &mut state.upper } else { &mut state.lower };
                    changed |= Self::insert_bound(set, ty, origin);
                }
            }
            if !changed {
                trace!(rounds = round, "bound propagation converged");
                return;
            }
        }
        debug!(max_iterations, "bound propagation hit the iteration budget");
    }

    /// Decide one class against the current snapshot of solutions.
    ///
    /// In relaxed mode bare-variable bounds that are still unsolved no longer
    /// block the class; this breaks waits between classes that only bound
    /// each other.
    fn readiness(
        &self,
        class: TypeVariable,
        state: &ClassState,
        snapshot: &TypeSubstitution,
        relaxed: bool,
    ) -> Readiness {
        let mut ground_lower = Vec::new();
        let mut waiting_bare_lower = false;
        for ty in state.lower.keys() {
            let ty = instantiate_type(self.db, *ty, snapshot);
            if !self.mentions_own(ty) {
                ground_lower.push(ty);
            } else if self.bare_class(ty).is_some() {
                waiting_bare_lower = true;
            } else {
                return Readiness::Waiting;
            }
        }
        if !ground_lower.is_empty() {
            return Readiness::Solved(common_supertype(self.db, &ground_lower));
        }
        if waiting_bare_lower && !relaxed {
            return Readiness::Waiting;
        }

        let mut ground_upper = Vec::new();
        for ty in state.upper.keys() {
            let ty = instantiate_type(self.db, *ty, snapshot);
            if !self.mentions_own(ty) {
                if ty != TypeId::NULLABLE_ANY {
                    ground_upper.push(ty);
                }
            } else if self.bare_class(ty).is_none() || !relaxed {
                return Readiness::Waiting;
            }
        }
        if ground_upper.is_empty() {
            return Readiness::Failed(ConstraintError::NotEnoughInformation { variable: class });
        }
        match common_subtype(self.db, &ground_upper) {
            Some(ty) => Readiness::Solved(ty),
            None => Readiness::Failed(ConstraintError::NoCommonSubtype {
                variable: class,
                upper_bounds: ground_upper,
            }),
        }
    }

    fn snapshot(&self, solved: &BTreeMap<TypeVariable, TypeId>) -> TypeSubstitution {
        let mut subst = TypeSubstitution::new();
        for (class, ty) in solved {
            if let Some(state) = self.classes.get(class) {
                for member in &state.members {
                    subst.insert(self.db.variable(*member), *ty);
                }
            }
        }
        subst
    }
}

/// Solve all variables of `builder` and seal the result.
pub(crate) fn solve(builder: ConstraintSystemBuilder<'_>) -> ConstraintStorage {
    let ConstraintSystemBuilder {
        db,
        mut table,
        variables,
        lower,
        upper,
        constraints,
        mut errors,
        max_iterations,
        ..
    } = builder;

    // Phase 1: canonical classes.
    let roots: Vec<VarKey> = (0..variables.len())
        .map(|index| table.find(VarKey(index as u32)))
        .collect();
    let mut representative: FxHashMap<VarKey, TypeVariable> = FxHashMap::default();
    for (info, root) in variables.iter().zip(&roots) {
        representative
            .entry(*root)
            .and_modify(|rep| *rep = (*rep).min(info.var))
            .or_insert(info.var);
    }
    let class_of: FxHashMap<TypeVariable, TypeVariable> = variables
        .iter()
        .zip(&roots)
        .filter_map(|(info, root)| representative.get(root).map(|rep| (info.var, *rep)))
        .collect();

    let mut canonical = TypeSubstitution::new();
    for (var, rep) in &class_of {
        if var != rep {
            canonical.insert(db.variable(*var), db.variable(*rep));
        }
    }

    let mut solver = Solver {
        db,
        class_of,
        classes: BTreeMap::new(),
    };
    for (index, info) in variables.iter().enumerate() {
        let Some(class) = solver.class_of.get(&info.var).copied() else {
            continue;
        };
        let class_ty = db.variable(class);
        let state = solver.classes.entry(class).or_default();
        state.members.push(info.var);
        for bound in &lower[index] {
            let ty = instantiate_type(db, bound.ty, &canonical);
            if ty != class_ty {
                Solver::insert_bound(&mut state.lower, ty, bound.origin);
            }
        }
        for bound in &upper[index] {
            let ty = instantiate_type(db, bound.ty, &canonical);
            if ty != class_ty {
                Solver::insert_bound(&mut state.upper, ty, bound.origin);
            }
        }
    }

    // Phase 2: propagation.
    solver.mirror_edges();
    solver.propagate(max_iterations);

    // Phase 3: rounds.
    let mut solved: BTreeMap<TypeVariable, TypeId> = BTreeMap::new();
    let mut failed: BTreeSet<TypeVariable> = BTreeSet::new();
    let mut relaxed = false;
    for _ in 0..max_iterations {
        let snapshot = solver.snapshot(&solved);
        let mut decided = Vec::new();
        for (class, state) in &solver.classes {
            if solved.contains_key(class) || failed.contains(class) {
                continue;
            }
            match solver.readiness(*class, state, &snapshot, relaxed) {
                Readiness::Solved(ty) => decided.push((*class, Ok(ty))),
                Readiness::Failed(error) => decided.push((*class, Err(error))),
                Readiness::Waiting => {}
            }
        }
        if decided.is_empty() {
            if relaxed {
                break;
            }
            relaxed = true;
            continue;
        }
        relaxed = false;
        for (class, outcome) in decided {
            match outcome {
                Ok(ty) => {
                    trace!(var = class.0, ty = ty.0, "solved type variable");
                    solved.insert(class, ty);
                }
                Err(error) => {
                    failed.insert(class);
                    errors.push(error);
                }
            }
        }
    }
    for class in solver.classes.keys() {
        if !solved.contains_key(class) && !failed.contains(class) {
            failed.insert(*class);
            errors.push(ConstraintError::NotEnoughInformation { variable: *class });
        }
    }

    // Phase 4: verification.
    let substitution = solver.snapshot(&solved);
    let failed_members: FxHashSet<TypeVariable> = failed
        .iter()
        .filter_map(|class| solver.classes.get(class))
        .flat_map(|state| state.members.iter().copied())
        .collect();
    for constraint in &constraints {
        if constraint.reported {
            continue;
        }
        let mentions_failed = collect_variables(db, constraint.lower)
            .iter()
            .chain(collect_variables(db, constraint.upper).iter())
            .any(|var| failed_members.contains(var));
        if mentions_failed {
            continue;
        }
        let lower = instantiate_type(db, constraint.lower, &substitution);
        let upper = instantiate_type(db, constraint.upper, &substitution);
        if !is_subtype_of(db, lower, upper) {
            errors.push(ConstraintError::Unsatisfiable {
                lower,
                upper,
                origin: constraint.origin,
            });
        }
    }

    let mut unresolved = TypeSubstitution::new();
    for var in &failed_members {
        unresolved.insert(db.variable(*var), TypeId::ERROR);
    }
    let mut solutions = IndexMap::new();
    let mut bounds = IndexMap::new();
    for info in &variables {
        let Some(class) = solver.class_of.get(&info.var) else {
            continue;
        };
        if let Some(ty) = solved.get(class) {
            solutions.insert(info.var, *ty);
        }
        if let Some(state) = solver.classes.get(class) {
            let collect = |set: &BoundSet| -> Vec<Bound> {
                set.iter()
                    .map(|(ty, origin)| Bound {
                        ty: *ty,
                        origin: *origin,
                    })
                    .collect()
            };
            bounds.insert(
                info.var,
                VariableBounds {
                    lower: collect(&state.lower),
                    upper: collect(&state.upper),
                },
            );
        }
    }

    debug!(
        variables = variables.len(),
        solved = solutions.len(),
        errors = errors.len(),
        "constraint system frozen"
    );

    ConstraintStorage {
        variables,
        bounds,
        solutions,
        substitution,
        unresolved,
        errors,
    }
}
