// src/operation/slot.rs

//! Single-owner cancellation slot.

use std::sync::Arc;

use arc_swap::ArcSwapOption;
use tokio_util::sync::CancellationToken;

/// Holds at most one live cancellation token, replaced by atomic exchange.
///
/// A token leaves the slot only through the `swap` that removed it, so
/// concurrent `replace` calls never hand out the same token twice.
#[derive(Debug)]
pub(crate) struct CancellationSlot {
    current: ArcSwapOption<CancellationToken>,
}

impl CancellationSlot {
    pub(crate) fn new() -> Self {
        Self {
            current: ArcSwapOption::empty(),
        }
    }

    /// Install `token` (or empty the slot) and hand back the previous token.
    pub(crate) fn replace(&self, token: Option<CancellationToken>) -> Option<CancellationToken> {
        self.current
            .swap(token.map(Arc::new))
            .map(Arc::unwrap_or_clone)
    }

    pub(crate) fn take(&self) -> Option<CancellationToken> {
        self.replace(None)
    }

    pub(crate) fn is_armed(&self) -> bool {
        self.current.load().is_some()
    }
}
