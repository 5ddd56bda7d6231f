//! Choosing among candidates of the same applicability tier.
//!
//! `beats` is a strict partial order, decided in this sequence:
//!
//! 1. parameter types over the call's arguments: narrower wins, incomparable
//!    means neither wins;
//! 2. with equivalent parameters, declared beats inherited;
//! 3. fewer implicit conversions (smart casts, default values) wins;
//! 4. non-generic beats generic.
//!
//! A winner must beat every other candidate; otherwise the call is ambiguous.

use crate::declarations::{DeclId, DeclarationOrigin};
use calltower_solver::{SubtypeChecker, TypeDatabase, TypeId};

/// What the ordering needs to know about one candidate.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SpecificityKey {
    pub declaration: DeclId,
    /// Parameter type per call argument, after substituting the solution.
    pub parameter_types: Vec<TypeId>,
    pub origin: DeclarationOrigin,
    pub conversions: usize,
    pub is_generic: bool,
}

/// Whether `a` is strictly more specific than `b`.
pub fn beats(db: &dyn TypeDatabase, a: &SpecificityKey, b: &SpecificityKey) -> bool {
    let mut checker = SubtypeChecker::new(db);
    let mut narrower = false;
    for (pa, pb) in a.parameter_types.iter().zip(&b.parameter_types) {
        let a_in_b = checker.is_subtype_of(*pa, *pb);
        let b_in_a = checker.is_subtype_of(*pb, *pa);
        match (a_in_b, b_in_a) {
            (true, false) => narrower = true,
            (true, true) => {}
            _ => return false,
        }
    }
    if narrower {
        return true;
    }
    if a.origin != b.origin {
        return a.origin == DeclarationOrigin::Declared;
    }
    if a.conversions != b.conversions {
        return a.conversions < b.conversions;
    }
    !a.is_generic && b.is_generic
}

/// Index of the most specific candidate, or the indices of the candidates
/// the call is ambiguous between, ordered by declaration id.
pub fn most_specific(db: &dyn TypeDatabase, keys: &[SpecificityKey]) -> Result<usize, Vec<usize>> {
    if keys.len() == 1 {
        return Ok(0);
    }
    let wins = |i: usize, j: usize| beats(db, &keys[i], &keys[j]);
    if let Some(winner) =
        (0..keys.len()).find(|&i| (0..keys.len()).all(|j| i == j || wins(i, j)))
    {
        return Ok(winner);
    }
    let mut tied: Vec<usize> = (0..keys.len())
        .filter(|&i| !(0..keys.len()).any(|j| i != j && wins(j, i)))
        .collect();
    if tied.len() < 2 {
        tied = (0..keys.len()).collect();
    }
    tied.sort_by_key(|&i| (keys[i].declaration, i));
    Err(tied)
}

#[cfg(test)]
#[path = "../tests/specificity_tests.rs"]
mod specificity_tests;
