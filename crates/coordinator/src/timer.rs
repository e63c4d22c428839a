//! Grace-period countdown timer
//!
//! A 1 Hz tick task recomputes the remaining time from an absolute
//! deadline on every tick, so the countdown stays correct even when ticks
//! are delayed or the process is suspended; nothing accumulates drift.
//!
//! Cancellation and expiry race against each other: the tick task checks
//! the generation counter under the same lock `cancel` bumps it, so once
//! `cancel` returns, the expiry callback can no longer fire — even if a
//! tick was already scheduled.

use parking_lot::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant};
use tracing::debug;

struct TimerSlot {
    /// Bumped on every start/cancel; a tick task whose generation no
    /// longer matches is dead and must not fire
    generation: u64,
    task: Option<JoinHandle<()>>,
}

/// Cancellable countdown that fires a callback exactly once at expiry
///
/// `start` on a running timer supersedes it. The remaining whole seconds
/// are continuously readable for display.
pub struct ActionTimer {
    remaining: Arc<AtomicU64>,
    slot: Arc<Mutex<TimerSlot>>,
}

impl ActionTimer {
    /// Create an idle timer
    pub fn new() -> Self {
        Self {
            remaining: Arc::new(AtomicU64::new(0)),
            slot: Arc::new(Mutex::new(TimerSlot {
                generation: 0,
                task: None,
            })),
        }
    }

    /// Remaining whole seconds of the running countdown (0 when idle)
    pub fn remaining_secs(&self) -> u64 {
        self.remaining.load(Ordering::SeqCst)
    }

    /// Start (or restart) the countdown
    ///
    /// `on_expire` is invoked exactly once, when the deadline passes; it
    /// never runs after a `cancel` that returned before the deadline.
    /// Must be called from within a Tokio runtime.
    pub fn start<F>(&self, grace: Duration, on_expire: F)
    where
        F: FnOnce() + Send + 'static,
    {
        let mut slot = self.slot.lock();
        slot.generation += 1;
        let generation = slot.generation;
        if let Some(task) = slot.task.take() {
            task.abort();
        }

        let deadline = Instant::now() + grace;
        self.remaining
            .store(whole_seconds(grace), Ordering::SeqCst);

        let remaining = Arc::clone(&self.remaining);
        let slot_handle = Arc::clone(&self.slot);
        let mut on_expire = Some(on_expire);
        slot.task = Some(tokio::spawn(async move {
            let mut ticks = interval_at(Instant::now(), Duration::from_secs(1));
            loop {
                ticks.tick().await;
                let mut slot = slot_handle.lock();
                if slot.generation != generation {
                    return;
                }
                let left = deadline.saturating_duration_since(Instant::now());
                let secs = whole_seconds(left);
                remaining.store(secs, Ordering::SeqCst);
                if secs == 0 {
                    // Disarm before firing so a concurrent cancel sees a
                    // dead timer rather than racing the callback.
                    slot.generation += 1;
                    slot.task = None;
                    drop(slot);
                    debug!(target: "greenroom::undo", "grace period expired");
                    if let Some(callback) = on_expire.take() {
                        callback();
                    }
                    return;
                }
            }
        }));
    }

    /// Stop the countdown; the pending callback will not fire
    pub fn cancel(&self) {
        let mut slot = self.slot.lock();
        slot.generation += 1;
        if let Some(task) = slot.task.take() {
            task.abort();
        }
        self.remaining.store(0, Ordering::SeqCst);
    }
}

impl Default for ActionTimer {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for ActionTimer {
    fn drop(&mut self) {
        self.cancel();
    }
}

/// Round a duration up to whole seconds, so a countdown started at 10 s
/// displays 10 rather than 9
fn whole_seconds(d: Duration) -> u64 {
    d.as_secs() + u64::from(d.subsec_nanos() > 0)
}
