//! Poll pacing and cooperative cancellation.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

/// Default pause between two status polls.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(5);

const SLEEP_SLICE: Duration = Duration::from_millis(100);

/// Shared cancellation flag checked by the poll loop.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    cancelled: Arc<AtomicBool>,
}

impl CancelToken {
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

/// Decides how the poll loop waits between two polls.
pub trait PollTrigger: Send + Sync {
    /// Wait up to `interval`. Returns `false` if `cancel` fired while waiting.
    fn wait(&self, interval: Duration, cancel: &CancelToken) -> bool;
}

/// Sleeps on the calling thread, waking up regularly to observe cancellation.
#[derive(Debug, Default, Clone, Copy)]
pub struct SleepTrigger;

impl PollTrigger for SleepTrigger {
    fn wait(&self, interval: Duration, cancel: &CancelToken) -> bool {
        let deadline = Instant::now() + interval;
        loop {
            if cancel.is_cancelled() {
                return false;
            }
            let now = Instant::now();
            if now >= deadline {
                return true;
            }
            std::thread::sleep(SLEEP_SLICE.min(deadline - now));
        }
    }
}

/// Never waits. Counts how many times the loop asked to wait.
#[derive(Debug, Default)]
pub struct ImmediateTrigger {
    waits: std::sync::atomic::AtomicUsize,
}

impl ImmediateTrigger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn waits(&self) -> usize {
        self.waits.load(Ordering::SeqCst)
    }
}

impl PollTrigger for ImmediateTrigger {
    fn wait(&self, _interval: Duration, cancel: &CancelToken) -> bool {
        self.waits.fetch_add(1, Ordering::SeqCst);
        !cancel.is_cancelled()
    }
}
