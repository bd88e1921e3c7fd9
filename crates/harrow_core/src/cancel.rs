//! One-way cancellation shared by a whole run tree.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// A monotonic flag: once cancelled it stays cancelled.
///
/// Clones share the same flag, so handing a clone to each level is the same as passing it by reference.
/// Runners check it between children and never reset it.
#[derive(Debug, Clone, Default)]
pub struct CancellationSignal {
    cancelled: Arc<AtomicBool>,
}

impl CancellationSignal {
    pub fn new() -> Self {
        Self::default()
    }

    /// Trip the signal. Returns `true` if this call performed the transition.
    pub fn cancel(&self) -> bool {
        !self.cancelled.swap(true, Ordering::AcqRel)
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_starts_live() {
        assert!(!CancellationSignal::new().is_cancelled());
    }

    #[test]
    fn test_cancel_is_one_way_and_shared() {
        let signal = CancellationSignal::new();
        let shared = signal.clone();

        assert!(shared.cancel());
        assert!(signal.is_cancelled());
        assert!(!signal.cancel(), "second trip is a no-op");
        assert!(shared.is_cancelled());
    }

    #[test]
    fn test_visible_across_threads() {
        let signal = CancellationSignal::new();
        let remote = signal.clone();
        std::thread::spawn(move || {
            remote.cancel();
        })
        .join()
        .unwrap();
        assert!(signal.is_cancelled());
    }
}
