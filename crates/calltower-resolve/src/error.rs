//! Why an analysis pass stopped early.

use calltower_common::Cancelled;
use calltower_solver::ContractViolation;
use std::fmt;

/// Early exit from expression or lambda analysis.
///
/// Neither variant is a user-facing diagnostic: cancellation abandons the
/// session and a contract violation is a caller bug.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AnalysisAbort {
    Cancelled,
    Contract(ContractViolation),
}

impl From<Cancelled> for AnalysisAbort {
    fn from(_: Cancelled) -> Self {
        AnalysisAbort::Cancelled
    }
}

impl From<ContractViolation> for AnalysisAbort {
    fn from(violation: ContractViolation) -> Self {
        AnalysisAbort::Contract(violation)
    }
}

impl fmt::Display for AnalysisAbort {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AnalysisAbort::Cancelled => f.write_str("analysis cancelled"),
            AnalysisAbort::Contract(violation) => write!(f, "{violation}"),
        }
    }
}

impl std::error::Error for AnalysisAbort {}
