//! Lazy candidate sequence over a scope tower.
//!
//! Levels are queried one at a time, only when the consumer asks for more
//! candidates. Cancellation is checked before each level; once it fires the
//! sequence is failed for good.

use crate::candidate::{Candidate, ReceiverValue};
use crate::tower::{LookupContext, LookupKind, ScopeTowerLevel};
use calltower_common::limits::CANDIDATE_INLINE_CAPACITY;
use calltower_common::{Atom, CancellationToken, Cancelled};
use smallvec::IntoIter;
use std::sync::Arc;
use tracing::trace;

type Buffer = IntoIter<[Candidate; CANDIDATE_INLINE_CAPACITY]>;

enum State {
    NotReady,
    HasBufferedMany(Buffer),
    HasBufferedOne(Candidate),
    Done,
    Failed,
}

pub struct CandidateSequence<'a> {
    ctx: LookupContext<'a>,
    levels: Vec<Arc<dyn ScopeTowerLevel>>,
    kind: LookupKind,
    name: Atom,
    extension_receiver: Option<ReceiverValue>,
    cancellation: CancellationToken,
    next_level: usize,
    /// An exclusive level has answered; no further levels are asked.
    stopped: bool,
    state: State,
    /// `Err` already handed out by the iterator.
    reported_failure: bool,
}

impl<'a> CandidateSequence<'a> {
    pub(crate) fn new(
        ctx: LookupContext<'a>,
        levels: Vec<Arc<dyn ScopeTowerLevel>>,
        kind: LookupKind,
        name: Atom,
        extension_receiver: Option<ReceiverValue>,
        cancellation: CancellationToken,
    ) -> Self {
        CandidateSequence {
            ctx,
            levels,
            kind,
            name,
            extension_receiver,
            cancellation,
            next_level: 0,
            stopped: false,
            state: State::NotReady,
            reported_failure: false,
        }
    }

    /// Next candidate, `Ok(None)` when exhausted.
    ///
    /// After a cancellation every call returns `Err`.
    pub fn advance(&mut self) -> Result<Option<Candidate>, Cancelled> {
        loop {
            match std::mem::replace(&mut self.state, State::NotReady) {
                State::Failed => {
                    self.state = State::Failed;
                    return Err(Cancelled);
                }
                State::Done => {
                    self.state = State::Done;
                    return Ok(None);
                }
                State::HasBufferedOne(candidate) => return Ok(Some(candidate)),
                State::HasBufferedMany(mut buffer) => {
                    if let Some(candidate) = buffer.next() {
                        self.state = State::HasBufferedMany(buffer);
                        return Ok(Some(candidate));
                    }
                }
                State::NotReady => self.compute_next()?,
            }
        }
    }

    /// Query levels until one yields something or the tower runs out.
    fn compute_next(&mut self) -> Result<(), Cancelled> {
        loop {
            if self.stopped || self.next_level >= self.levels.len() {
                self.state = State::Done;
                return Ok(());
            }
            if let Err(cancelled) = self.cancellation.check() {
                self.state = State::Failed;
                return Err(cancelled);
            }
            let level = &self.levels[self.next_level];
            self.next_level += 1;
            let found = level.lookup(
                &self.ctx,
                self.kind,
                self.name,
                self.extension_receiver.as_ref(),
            );
            trace!(
                level = level.description(),
                found = found.candidates.len(),
                exclusive = found.exclusive,
                "tower level"
            );
            self.stopped = found.exclusive;
            let mut candidates = found.candidates;
            match candidates.len() {
                0 => continue,
                1 => {
                    if let Some(candidate) = candidates.pop() {
                        self.state = State::HasBufferedOne(candidate);
                    }
                }
                _ => self.state = State::HasBufferedMany(candidates.into_iter()),
            }
            return Ok(());
        }
    }

    /// Drain the sequence.
    pub fn collect_all(mut self) -> Result<Vec<Candidate>, Cancelled> {
        let mut all = Vec::new();
        while let Some(candidate) = self.advance()? {
            all.push(candidate);
        }
        Ok(all)
    }
}

impl Iterator for CandidateSequence<'_> {
    type Item = Result<Candidate, Cancelled>;

    /// Yields the cancellation error once, then ends.
    fn next(&mut self) -> Option<Self::Item> {
        if self.reported_failure {
            return None;
        }
        match self.advance() {
            Ok(candidate) => candidate.map(Ok),
            Err(cancelled) => {
                self.reported_failure = true;
                Some(Err(cancelled))
            }
        }
    }
}

#[cfg(test)]
#[path = "../tests/sequence_tests.rs"]
mod sequence_tests;
