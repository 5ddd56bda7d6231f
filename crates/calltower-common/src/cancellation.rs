//! Cooperative cancellation.
//!
//! An IDE session hands a `CancellationToken` to the resolver; the resolver
//! polls it between tower-level lookups and between candidate solving passes
//! and unwinds with [`Cancelled`] once it is set. Tokens are cheap clones of
//! one shared flag, so a token can be cancelled from any thread.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Marker returned when a resolution attempt observed a cancellation request.
///
/// This is not a diagnostic: it carries no location and is never reported.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Cancelled;

/// Shared cancellation flag.
#[derive(Clone, Debug, Default)]
pub struct CancellationToken {
    flag: Arc<AtomicBool>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// A token that is never cancelled (batch compilation).
    pub fn never() -> Self {
        Self::default()
    }

    /// Request cancellation. Idempotent.
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::Release);
    }

    #[inline]
    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::Acquire)
    }

    /// Poll point: `Err(Cancelled)` once cancellation was requested.
    #[inline]
    pub fn check(&self) -> Result<(), Cancelled> {
        if self.is_cancelled() {
            Err(Cancelled)
        } else {
            Ok(())
        }
    }
}

#[cfg(test)]
#[path = "../tests/cancellation_tests.rs"]
mod cancellation_tests;
