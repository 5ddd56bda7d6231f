//! Centralized limits and thresholds for call resolution.
//!
//! This module provides shared constants for recursion depths, iteration
//! budgets and capacity hints used throughout the workspace. Centralizing
//! these values keeps guards at call sites free of magic numbers.
//!
//! # Categories
//!
//! - **Recursion Depths**: Limits to prevent stack overflow in recursive algorithms
//! - **Operation Counts**: Limits to prevent runaway fixpoint iteration
//! - **Capacity Hints**: Pre-allocation sizes for hot collections
//!
//! Solver-side recursion guards are configured through
//! `calltower_solver::recursion::RecursionProfile`, which reads its depth
//! values from here.

// =============================================================================
// Recursion Depth Limits
// =============================================================================

/// Maximum nesting of lambda re-analysis.
///
/// Each lambda argument is re-analyzed once per surviving candidate, and the
/// lambda body may itself contain calls with lambda arguments. Past this depth
/// the re-entrant analysis is refused with a contract violation instead of
/// overflowing the stack.
///
/// ```text
/// apply(1) { apply(it) { apply(it) { /* ... 64 levels ... */ } } }
/// ```
pub const MAX_LAMBDA_NESTING_DEPTH: u32 = 64;

/// Maximum depth for structural subtype checks.
///
/// Function types and generic class arguments are compared recursively;
/// a well-formed hierarchy never comes close to this.
pub const MAX_SUBTYPE_DEPTH: u32 = 100;

/// Maximum depth when decomposing a structural constraint into bounds on
/// individual type variables (e.g. `(Int) -> List<R> <: (T) -> S`).
pub const MAX_CONSTRAINT_DECOMPOSITION_DEPTH: u32 = 50;

/// Maximum depth when walking the supertype graph of a class.
pub const MAX_SUPERTYPE_WALK_DEPTH: u32 = 64;

// =============================================================================
// Operation Count Limits
// =============================================================================

/// Maximum rounds of the bound-propagation fixpoint when freezing a
/// constraint system.
///
/// Every round either resolves at least one variable or adds at least one
/// propagated bound, so the fixpoint converges long before this in practice.
pub const MAX_CONSTRAINT_ITERATIONS: u32 = 10_000;

/// Maximum number of subtype checks a single solver pass may perform.
pub const MAX_SUBTYPE_CHECKS: u32 = 100_000;

// =============================================================================
// Capacity Hints
// =============================================================================

/// Typical number of candidates for a single overloaded name.
pub const CANDIDATE_INLINE_CAPACITY: usize = 4;

/// Typical number of tower levels for a call inside a member function.
pub const TOWER_LEVEL_CAPACITY: usize = 8;
