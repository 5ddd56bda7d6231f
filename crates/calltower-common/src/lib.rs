//! Common types and utilities for the calltower resolution engine.
//!
//! This crate provides foundational types used across all calltower crates:
//! - String interning (`Atom`, `NameInterner`)
//! - Source spans (`Span`)
//! - Resolution limits and thresholds
//! - Structured diagnostics and the message table
//! - Cooperative cancellation (`CancellationToken`, `Cancelled`)

// Name interning for identifier deduplication
pub mod interner;
pub use interner::{Atom, NameInterner};

// Span - Source location tracking (byte offsets)
pub mod span;
pub use span::Span;

// Centralized limits and thresholds
pub mod limits;

// Diagnostics - message table and structured diagnostics
pub mod diagnostics;
pub use diagnostics::{Diagnostic, DiagnosticCategory, DiagnosticMessage, format_message};

// Cooperative cancellation shared between IDE sessions and resolution workers
pub mod cancellation;
pub use cancellation::{CancellationToken, Cancelled};
