//! Resolution candidates.

use crate::applicability::{CandidateApplicability, ResolutionCandidateStatus, ResolutionDiagnostic};
use crate::applicability::rank;
use crate::declarations::Declaration;
use calltower_solver::TypeId;
use smallvec::SmallVec;
use std::sync::Arc;

/// A receiver expression as seen by lookup: its declared type plus any
/// narrower types known from smart casts.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReceiverValue {
    pub ty: TypeId,
    pub possible_types: SmallVec<[TypeId; 2]>,
    /// Smart casts on an unstable value (e.g. a mutable property) cannot be trusted.
    pub stable: bool,
}

impl ReceiverValue {
    pub fn new(ty: TypeId) -> Self {
        ReceiverValue {
            ty,
            possible_types: SmallVec::new(),
            stable: true,
        }
    }

    #[must_use]
    pub fn with_smart_cast(mut self, narrowed: TypeId, stable: bool) -> Self {
        self.possible_types.push(narrowed);
        self.stable = stable;
        self
    }

    /// Declared type first, then smart-cast types.
    pub fn all_types(&self) -> impl Iterator<Item = TypeId> + '_ {
        std::iter::once(self.ty).chain(self.possible_types.iter().copied())
    }
}

/// One declaration competing to be the resolution of a call.
///
/// Diagnostics accumulate during lookup, shape checking and constraint
/// solving. The declaration itself is never modified.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Candidate {
    declaration: Arc<Declaration>,
    dispatch_receiver: Option<ReceiverValue>,
    diagnostics: Vec<ResolutionDiagnostic>,
}

impl Candidate {
    pub fn new(declaration: Arc<Declaration>, dispatch_receiver: Option<ReceiverValue>) -> Self {
        Candidate {
            declaration,
            dispatch_receiver,
            diagnostics: Vec::new(),
        }
    }

    pub fn declaration(&self) -> &Arc<Declaration> {
        &self.declaration
    }

    pub fn dispatch_receiver(&self) -> Option<&ReceiverValue> {
        self.dispatch_receiver.as_ref()
    }

    pub fn diagnostics(&self) -> &[ResolutionDiagnostic] {
        &self.diagnostics
    }

    pub fn add_diagnostic(&mut self, diagnostic: ResolutionDiagnostic) {
        self.diagnostics.push(diagnostic);
    }

    #[must_use]
    pub fn with_diagnostic(mut self, diagnostic: ResolutionDiagnostic) -> Self {
        self.add_diagnostic(diagnostic);
        self
    }

    pub fn applicability(&self) -> CandidateApplicability {
        rank(&self.diagnostics)
    }

    pub fn status(&self) -> ResolutionCandidateStatus {
        ResolutionCandidateStatus::new(self.diagnostics.clone())
    }

    /// Same receiver and diagnostics, different declaration.
    ///
    /// The diagnostics are copied; later additions to either candidate are
    /// not seen by the other.
    pub fn copy(&self, declaration: Arc<Declaration>) -> Candidate {
        Candidate {
            declaration,
            dispatch_receiver: self.dispatch_receiver.clone(),
            diagnostics: self.diagnostics.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::declarations::{ContainerId, DeclarationKind, DeclarationStore};
    use calltower_common::Atom;

    #[test]
    fn test_copy_does_not_share_diagnostics() {
        let store = DeclarationStore::new();
        let original = store.add(Declaration::new(Atom(1), DeclarationKind::Function, ContainerId(0)));
        let narrowed = store.add(Declaration::new(Atom(1), DeclarationKind::Function, ContainerId(0)));

        let candidate = Candidate::new(original, Some(ReceiverValue::new(TypeId::STRING)))
            .with_diagnostic(ResolutionDiagnostic::SynthesizedDescriptor);
        let mut copy = candidate.copy(Arc::clone(&narrowed));
        copy.add_diagnostic(ResolutionDiagnostic::UnsafeCall {
            receiver: TypeId::STRING,
        });

        assert_eq!(candidate.diagnostics().len(), 1);
        assert_eq!(copy.diagnostics().len(), 2);
        assert_eq!(copy.declaration().id, narrowed.id);
        assert_eq!(copy.dispatch_receiver(), candidate.dispatch_receiver());
        assert_eq!(
            candidate.applicability(),
            CandidateApplicability::ResolvedSynthesized
        );
        assert_eq!(
            copy.applicability(),
            CandidateApplicability::MayThrowRuntimeError
        );
    }

    #[test]
    fn test_receiver_types_declared_first() {
        let receiver = ReceiverValue::new(TypeId::NULLABLE_ANY).with_smart_cast(TypeId::STRING, false);
        let types: Vec<_> = receiver.all_types().collect();
        assert_eq!(types, vec![TypeId::NULLABLE_ANY, TypeId::STRING]);
        assert!(!receiver.stable);
    }
}
