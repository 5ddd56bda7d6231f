//! Recursion guards for cycle detection, depth limiting and iteration
//! bounding in recursive type computations.
//!
//! Two guards are provided:
//! - [`RecursionGuard`] tracks a visiting set of keys, so `A <: B` asked
//!   again while already being answered is reported as a cycle.
//! - [`DepthCounter`] only limits nesting. Constraint decomposition uses it
//!   because the same pair may legitimately be decomposed more than once.
//!
//! Limits come from named [`RecursionProfile`]s:
//!
//! ```ignore
//! let guard = RecursionGuard::with_profile(RecursionProfile::SubtypeCheck);
//! ```
//!
//! In debug builds, dropping a guard with active entries panics, catching
//! forgotten `leave()` calls.

use calltower_common::limits;
use rustc_hash::FxHashSet;
use std::hash::Hash;

/// Named recursion limit presets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecursionProfile {
    /// Structural subtype checks over function types and class arguments.
    SubtypeCheck,
    /// Decomposing `lower <: upper` into bounds on type variables.
    ConstraintDecomposition,
    /// Walking the supertype graph of a class.
    SupertypeWalk,
}

impl RecursionProfile {
    pub const fn max_depth(self) -> u32 {
        match self {
            Self::SubtypeCheck => limits::MAX_SUBTYPE_DEPTH,
            Self::ConstraintDecomposition => limits::MAX_CONSTRAINT_DECOMPOSITION_DEPTH,
            Self::SupertypeWalk => limits::MAX_SUPERTYPE_WALK_DEPTH,
        }
    }

    pub const fn max_iterations(self) -> u32 {
        limits::MAX_SUBTYPE_CHECKS
    }
}

/// Result of attempting to enter a recursive computation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecursionResult {
    Entered,
    /// This key is already being visited.
    Cycle,
    DepthExceeded,
    IterationExceeded,
}

/// Visiting set plus depth and iteration budgets.
///
/// On [`RecursionResult::Entered`] the caller must call [`leave`](Self::leave)
/// with the same key when done.
pub struct RecursionGuard<K: Hash + Eq + Copy> {
    visiting: FxHashSet<K>,
    depth: u32,
    iterations: u32,
    max_depth: u32,
    max_iterations: u32,
}

impl<K: Hash + Eq + Copy> RecursionGuard<K> {
    pub fn new(max_depth: u32, max_iterations: u32) -> Self {
        Self {
            visiting: FxHashSet::default(),
            depth: 0,
            iterations: 0,
            max_depth,
            max_iterations,
        }
    }

    pub fn with_profile(profile: RecursionProfile) -> Self {
        Self::new(profile.max_depth(), profile.max_iterations())
    }

    pub fn enter(&mut self, key: K) -> RecursionResult {
        self.iterations = self.iterations.saturating_add(1);
        if self.iterations > self.max_iterations {
            return RecursionResult::IterationExceeded;
        }
        if self.depth >= self.max_depth {
            return RecursionResult::DepthExceeded;
        }
        if !self.visiting.insert(key) {
            return RecursionResult::Cycle;
        }
        self.depth += 1;
        RecursionResult::Entered
    }

    pub fn leave(&mut self, key: K) {
        let was_present = self.visiting.remove(&key);
        debug_assert!(
            was_present,
            "RecursionGuard::leave() called with a key that is not in the visiting set"
        );
        self.depth = self.depth.saturating_sub(1);
    }
}

#[cfg(debug_assertions)]
impl<K: Hash + Eq + Copy> Drop for RecursionGuard<K> {
    fn drop(&mut self) {
        if !std::thread::panicking() && !self.visiting.is_empty() {
            panic!(
                "RecursionGuard dropped with {} active entries still in the visiting set",
                self.visiting.len(),
            );
        }
    }
}

/// A depth-only guard.
///
/// `enter()` returning `false` does not increment the depth; do not call
/// `leave()` in that case.
#[derive(Debug)]
pub struct DepthCounter {
    depth: u32,
    max_depth: u32,
}

impl DepthCounter {
    pub fn new(max_depth: u32) -> Self {
        Self {
            depth: 0,
            max_depth,
        }
    }

    pub fn with_profile(profile: RecursionProfile) -> Self {
        Self::new(profile.max_depth())
    }

    #[inline]
    pub fn enter(&mut self) -> bool {
        if self.depth >= self.max_depth {
            return false;
        }
        self.depth += 1;
        true
    }

    #[inline]
    pub fn leave(&mut self) {
        debug_assert!(self.depth > 0, "DepthCounter::leave() called at depth 0");
        self.depth = self.depth.saturating_sub(1);
    }
}

#[cfg(debug_assertions)]
impl Drop for DepthCounter {
    fn drop(&mut self) {
        if !std::thread::panicking() && self.depth > 0 {
            panic!("DepthCounter dropped at depth {}", self.depth);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn profile_limits_come_from_common_limits() {
        assert_eq!(RecursionProfile::SubtypeCheck.max_depth(), 100);
        assert_eq!(RecursionProfile::ConstraintDecomposition.max_depth(), 50);
        assert_eq!(RecursionProfile::SupertypeWalk.max_depth(), 64);
        assert_eq!(RecursionProfile::SubtypeCheck.max_iterations(), 100_000);
    }

    #[test]
    fn guard_detects_cycle() {
        let mut guard = RecursionGuard::<u32>::new(10, 100);
        assert_eq!(guard.enter(1), RecursionResult::Entered);
        assert_eq!(guard.enter(1), RecursionResult::Cycle);
        guard.leave(1);
        assert_eq!(guard.enter(1), RecursionResult::Entered);
        guard.leave(1);
    }

    #[test]
    fn guard_depth_limit() {
        let mut guard = RecursionGuard::<u32>::new(2, 100);
        assert_eq!(guard.enter(1), RecursionResult::Entered);
        assert_eq!(guard.enter(2), RecursionResult::Entered);
        assert_eq!(guard.enter(3), RecursionResult::DepthExceeded);
        guard.leave(2);
        assert_eq!(guard.enter(3), RecursionResult::Entered);
        guard.leave(3);
        guard.leave(1);
    }

    #[test]
    fn guard_iteration_limit() {
        let mut guard = RecursionGuard::<u32>::new(10, 3);
        for key in 0..3 {
            assert_eq!(guard.enter(key), RecursionResult::Entered);
            guard.leave(key);
        }
        assert_eq!(guard.enter(99), RecursionResult::IterationExceeded);
    }

    #[test]
    fn depth_counter_refuses_past_limit() {
        let mut counter = DepthCounter::new(2);
        assert!(counter.enter());
        assert!(counter.enter());
        assert!(!counter.enter());
        counter.leave();
        assert!(counter.enter());
        counter.leave();
        counter.leave();
    }
}
