//! Scenario driver for the calltower resolver.
//!
//! A scenario file declares classes and declarations, then lists calls to
//! resolve against them. The driver builds the shared tables, resolves every
//! call in one batch and reports the outcome of each.

pub mod args;
pub mod driver;
pub mod reporter;
pub mod scenario;
pub mod tracing_config;
pub mod type_syntax;

pub use driver::{CallReport, ScenarioReport, run_file, run_scenario};
