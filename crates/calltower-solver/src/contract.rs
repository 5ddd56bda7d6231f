//! Programming-contract violations.
//!
//! These are caller bugs, not user errors: they are returned as `Err` so the
//! misuse is rejected deterministically, and are never turned into
//! diagnostics.

use std::fmt;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ContractViolation {
    /// A constraint was added after the system was frozen.
    MutationAfterFreeze,
    /// `freeze()` was requested a second time.
    FrozenTwice,
    /// Re-entrant lambda analysis exceeded the nesting budget.
    NestingTooDeep { depth: u32, limit: u32 },
}

impl fmt::Display for ContractViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ContractViolation::MutationAfterFreeze => {
                f.write_str("constraint system mutated after freeze")
            }
            ContractViolation::FrozenTwice => f.write_str("constraint system frozen twice"),
            ContractViolation::NestingTooDeep { depth, limit } => {
                write!(f, "lambda re-analysis nested {depth} deep (limit {limit})")
            }
        }
    }
}

impl std::error::Error for ContractViolation {}
