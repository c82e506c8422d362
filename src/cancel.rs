//! Cancellation tokens.
//!
//! A `CancelToken` is a shared aborted flag plus a reason. It is handed to
//! pollable sources as an external kill switch, and passed into producer
//! callbacks so they can stop their own loop from the inside.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    inner: Arc<CancelInner>,
}

#[derive(Debug, Default)]
struct CancelInner {
    aborted: AtomicBool,
    reason: Mutex<Option<String>>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Flag the token as aborted. The first reason wins; later calls are
    /// no-ops.
    pub fn abort(&self, reason: impl Into<String>) {
        if self.inner.aborted.swap(true, Ordering::AcqRel) {
            return;
        }
        let mut slot = self
            .inner
            .reason
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        *slot = Some(reason.into());
    }

    pub fn is_aborted(&self) -> bool {
        self.inner.aborted.load(Ordering::Acquire)
    }

    pub fn reason(&self) -> Option<String> {
        self.inner
            .reason
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .clone()
    }
}
