//! Resolution options.

use calltower_common::limits::{MAX_CONSTRAINT_ITERATIONS, MAX_LAMBDA_NESTING_DEPTH};
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ResolutionOptions {
    /// Add the dynamic fallback level to every lookup.
    pub allow_dynamic: bool,
    /// Surface internal markers even when they did not decide the outcome.
    pub report_internal_diagnostics: bool,
    pub max_lambda_nesting_depth: u32,
    pub max_constraint_iterations: u32,
    /// Resolve independent calls of a batch on the rayon pool.
    pub parallel: bool,
}

impl Default for ResolutionOptions {
    fn default() -> Self {
        ResolutionOptions {
            allow_dynamic: false,
            report_internal_diagnostics: false,
            max_lambda_nesting_depth: MAX_LAMBDA_NESTING_DEPTH,
            max_constraint_iterations: MAX_CONSTRAINT_ITERATIONS,
            parallel: true,
        }
    }
}
