//! Binding trace: the per-session record of what analysis decided.
//!
//! Each candidate of a call is analyzed into its own forked trace so a losing
//! candidate leaves nothing behind; only the chosen candidate's fork is
//! committed to the parent.

use crate::declarations::DeclId;
use calltower_common::{Diagnostic, Span};
use calltower_solver::TypeId;
use indexmap::IndexMap;
use rustc_hash::FxHashMap;

/// A call resolution recorded against its call span.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RecordedCall {
    pub declaration: DeclId,
    pub result_type: TypeId,
}

#[derive(Clone, Debug, Default)]
pub struct BindingTrace {
    expression_types: FxHashMap<Span, TypeId>,
    calls: IndexMap<Span, RecordedCall>,
    diagnostics: IndexMap<Span, Vec<Diagnostic>>,
}

impl BindingTrace {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_type(&mut self, span: Span, ty: TypeId) {
        self.expression_types.insert(span, ty);
    }

    pub fn type_of(&self, span: Span) -> Option<TypeId> {
        self.expression_types.get(&span).copied()
    }

    pub fn record_call(&mut self, span: Span, call: RecordedCall) {
        self.calls.insert(span, call);
    }

    pub fn call_at(&self, span: Span) -> Option<&RecordedCall> {
        self.calls.get(&span)
    }

    /// Recorded calls in recording order.
    pub fn calls(&self) -> impl Iterator<Item = (Span, &RecordedCall)> {
        self.calls.iter().map(|(span, call)| (*span, call))
    }

    pub fn report(&mut self, diagnostic: Diagnostic) {
        self.diagnostics
            .entry(diagnostic.span)
            .or_default()
            .push(diagnostic);
    }

    pub fn diagnostics_at(&self, span: Span) -> &[Diagnostic] {
        self.diagnostics.get(&span).map(Vec::as_slice).unwrap_or(&[])
    }

    /// All diagnostics, grouped by span in first-report order.
    pub fn diagnostics(&self) -> impl Iterator<Item = &Diagnostic> {
        self.diagnostics.values().flatten()
    }

    pub fn has_errors(&self) -> bool {
        self.diagnostics().any(Diagnostic::is_error)
    }

    /// An empty child trace for speculative analysis.
    pub fn fork(&self) -> BindingTrace {
        BindingTrace::default()
    }

    /// Adopt everything recorded in `child`.
    pub fn commit(&mut self, child: BindingTrace) {
        self.expression_types.extend(child.expression_types);
        self.calls.extend(child.calls);
        for (span, diagnostics) in child.diagnostics {
            self.diagnostics.entry(span).or_default().extend(diagnostics);
        }
    }
}
