//! Cancellation signal for trigger operations.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Shared cancellation flag accepted by trigger operations.
///
/// The controller checks it only before the state mutation; once the state
/// has moved, persistence and notification always run to completion, so a
/// cancelled operation can never leave a mutated state unpersisted.
#[derive(Clone, Debug, Default)]
pub struct CancelSignal {
    cancelled: Arc<AtomicBool>,
}

impl CancelSignal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cancel_is_shared() {
        let signal = CancelSignal::new();
        let clone = signal.clone();
        assert!(!clone.is_cancelled());

        signal.cancel();
        assert!(clone.is_cancelled());
    }
}
