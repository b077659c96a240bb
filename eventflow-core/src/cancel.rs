//! Cooperative cancellation (`spec.md` §5 "Cancellation & timeouts").
//!
//! A run is cancellable between nodes: the scheduler checks this token
//! after each node completes and, if set, releases node state and returns
//! `EventFlowError::Cancelled` without running any further nodes. Per-run
//! and per-node timeouts are advisory and are not modeled here — they
//! cannot interrupt an operator mid-iteration in this synchronous,
//! single-pass-per-node model (`spec.md` §5).

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

#[derive(Clone, Default)]
pub struct CancellationToken(Arc<AtomicBool>);

impl CancellationToken {
    pub fn new() -> Self {
        Self(Arc::new(AtomicBool::new(false)))
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_uncancelled_and_latches_once_set() {
        let token = CancellationToken::new();
        assert!(!token.is_cancelled());
        token.cancel();
        assert!(token.is_cancelled());
    }

    #[test]
    fn clones_share_state() {
        let token = CancellationToken::new();
        let clone = token.clone();
        clone.cancel();
        assert!(token.is_cancelled());
    }
}
