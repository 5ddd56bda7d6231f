//! Subtype checking.
//!
//! Rules are applied in a fixed order:
//!
//! 1. Reflexivity, then the error and dynamic escape hatches.
//! 2. `Nothing` is a subtype of everything; everything is a subtype of `Any?`.
//! 3. Nullability: a nullable target accepts `null` and the non-null view of
//!    a nullable source; a nullable source never fits a non-null target.
//! 4. Type parameters are replaced by their declared upper bound.
//! 5. Classes are compared nominally through [`supertype_as`], then argument
//!    by argument according to declaration-site variance.
//! 6. Function types: receiver and parameters contravariant, return
//!    covariant.
//!
//! Type variables are never subtypes of anything but themselves here; the
//! constraint system decomposes constraints that mention them instead.

use crate::class_hierarchy::{as_class_type, supertype_as};
use crate::db::TypeDatabase;
use crate::recursion::{RecursionGuard, RecursionProfile, RecursionResult};
use crate::types::{FunctionShape, TypeData, TypeId, Variance};
use tracing::trace;

/// Outcome of a single subtype query.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SubtypeResult {
    True,
    False,
    /// The same pair is already being checked further up; assumed to hold.
    CycleDetected,
}

impl SubtypeResult {
    #[inline]
    pub fn is_true(self) -> bool {
        matches!(self, Self::True | Self::CycleDetected)
    }

    #[inline]
    fn from_bool(value: bool) -> Self {
        if value { Self::True } else { Self::False }
    }
}

pub struct SubtypeChecker<'a> {
    db: &'a dyn TypeDatabase,
    guard: RecursionGuard<(TypeId, TypeId)>,
}

impl<'a> SubtypeChecker<'a> {
    pub fn new(db: &'a dyn TypeDatabase) -> Self {
        SubtypeChecker {
            db,
            guard: RecursionGuard::with_profile(RecursionProfile::SubtypeCheck),
        }
    }

    pub fn is_subtype_of(&mut self, source: TypeId, target: TypeId) -> bool {
        self.check_subtype(source, target).is_true()
    }

    /// Mutual subtyping.
    pub fn types_equivalent(&mut self, left: TypeId, right: TypeId) -> bool {
        self.is_subtype_of(left, right) && self.is_subtype_of(right, left)
    }

    pub fn check_subtype(&mut self, source: TypeId, target: TypeId) -> SubtypeResult {
        if source == target {
            return SubtypeResult::True;
        }
        if source.is_any_compatible() || target.is_any_compatible() {
            return SubtypeResult::True;
        }
        if source == TypeId::NOTHING || target == TypeId::NULLABLE_ANY {
            return SubtypeResult::True;
        }

        let key = (source, target);
        match self.guard.enter(key) {
            RecursionResult::Entered => {}
            RecursionResult::Cycle => return SubtypeResult::CycleDetected,
            RecursionResult::DepthExceeded | RecursionResult::IterationExceeded => {
                trace!(source = source.0, target = target.0, "subtype check limit exceeded");
                return SubtypeResult::False;
            }
        }
        let result = self.check_subtype_inner(source, target);
        self.guard.leave(key);
        result
    }

    fn check_subtype_inner(&mut self, source: TypeId, target: TypeId) -> SubtypeResult {
        let db = self.db;

        // Nullable target
        if db.is_nullable(target) {
            if source == TypeId::NULL {
                return SubtypeResult::True;
            }
            let target_inner = db.not_null(target);
            let source_inner = db.not_null(source);
            return self.check_subtype(source_inner, target_inner);
        }
        // Nullable source, non-null target
        if db.is_nullable(source) {
            return SubtypeResult::False;
        }

        let source_data = db.lookup(source);
        if let Some(TypeData::TypeParameter(_)) = source_data.as_deref() {
            let bound = db.upper_bound(source);
            return self.check_subtype(bound, target);
        }

        if target == TypeId::ANY {
            return SubtypeResult::True;
        }

        let target_data = db.lookup(target);
        match (source_data.as_deref(), target_data.as_deref()) {
            (Some(TypeData::Class(_)), Some(TypeData::Class(target_class))) => {
                let Some(viewed) = supertype_as(db, source, target_class.class) else {
                    return SubtypeResult::False;
                };
                let Some(viewed) = as_class_type(db, viewed) else {
                    return SubtypeResult::False;
                };
                let variances: Vec<Variance> = db
                    .class_info(target_class.class)
                    .map(|info| info.type_params.iter().map(|p| p.variance).collect())
                    .unwrap_or_default();
                if viewed.args.len() != target_class.args.len() {
                    return SubtypeResult::False;
                }
                for (i, (s_arg, t_arg)) in viewed.args.iter().zip(&target_class.args).enumerate() {
                    let variance = variances.get(i).copied().unwrap_or_default();
                    if !self.check_argument(*s_arg, *t_arg, variance) {
                        return SubtypeResult::False;
                    }
                }
                SubtypeResult::True
            }
            (Some(TypeData::Function(s_fn)), Some(TypeData::Function(t_fn))) => {
                SubtypeResult::from_bool(self.check_function(s_fn, t_fn))
            }
            _ => SubtypeResult::False,
        }
    }

    fn check_argument(&mut self, source: TypeId, target: TypeId, variance: Variance) -> bool {
        match variance {
            Variance::Covariant => self.is_subtype_of(source, target),
            Variance::Contravariant => self.is_subtype_of(target, source),
            Variance::Invariant => self.types_equivalent(source, target),
        }
    }

    fn check_function(&mut self, source: &FunctionShape, target: &FunctionShape) -> bool {
        if source.params.len() != target.params.len() {
            return false;
        }
        match (source.receiver, target.receiver) {
            (None, None) => {}
            (Some(s_recv), Some(t_recv)) => {
                if !self.is_subtype_of(t_recv, s_recv) {
                    return false;
                }
            }
            _ => return false,
        }
        for (s_param, t_param) in source.params.iter().zip(&target.params) {
            if !self.is_subtype_of(*t_param, *s_param) {
                return false;
            }
        }
        self.is_subtype_of(source.return_type, target.return_type)
    }
}

/// One-shot subtype query.
pub fn is_subtype_of(db: &dyn TypeDatabase, source: TypeId, target: TypeId) -> bool {
    SubtypeChecker::new(db).is_subtype_of(source, target)
}

#[cfg(test)]
#[path = "../tests/subtype_tests.rs"]
mod subtype_tests;
