//! Cooperative cancellation.
//!
//! The pipeline is single-threaded, so cancellation is a flag polled between
//! units of work (sub-tile renders, interactive frames). The flag is atomic
//! only so that a signal handler can raise it.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Determines whether the current batch operation should stop.
///
/// Implemented by [`AbortFlag`] and by any `FnMut() -> bool`, which keeps
/// tests able to abort at a precise point.
pub trait AbortPoll {
    /// Returns true when the caller asked to stop.
    fn abort_requested(&mut self) -> bool;

    /// The request was handled; later polls start fresh.
    fn acknowledge(&mut self) {}
}

impl<F> AbortPoll for F
where
    F: FnMut() -> bool,
{
    fn abort_requested(&mut self) -> bool {
        self()
    }
}

/// Shared abort flag.
#[derive(Debug, Clone, Default)]
pub struct AbortFlag {
    raised: Arc<AtomicBool>,
}

impl AbortFlag {
    /// Create a lowered flag.
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation.
    pub fn raise(&self) {
        self.raised.store(true, Ordering::SeqCst);
    }

    /// Lower the flag again, e.g. after a cancelled render was handled.
    pub fn reset(&self) {
        self.raised.store(false, Ordering::SeqCst);
    }

    /// Whether cancellation was requested.
    pub fn is_raised(&self) -> bool {
        self.raised.load(Ordering::SeqCst)
    }
}

impl AbortPoll for AbortFlag {
    fn abort_requested(&mut self) -> bool {
        self.is_raised()
    }

    fn acknowledge(&mut self) {
        self.reset();
    }
}

/// A poll that never aborts.
#[derive(Debug, Clone, Copy, Default)]
pub struct NeverAbort;

impl AbortPoll for NeverAbort {
    fn abort_requested(&mut self) -> bool {
        false
    }
}
