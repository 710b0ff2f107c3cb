//! Periodic re-fetch task with an idempotent cancellation handle.
//!
//! The first tick fires one interval after start (the caller has normally just
//! fetched). Cancelling is safe any number of times, including after the task
//! has already stopped on its own. Dropping the handle cancels the task.

use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::task::{AbortHandle, JoinHandle};
use tokio::time::MissedTickBehavior;

/// What the poll loop should do after a tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollControl {
    Continue,
    Stop,
}

/// Cloneable cancel side of a poll task. Owners that outlive the caller's
/// handle (e.g. a store tearing down) keep one of these.
#[derive(Clone)]
pub struct PollCanceller {
    cancelled: Arc<AtomicBool>,
    abort: AbortHandle,
}

impl PollCanceller {
    pub fn cancel(&self) {
        if !self.cancelled.swap(true, Ordering::SeqCst) {
            tracing::debug!("Polling cancelled");
        }
        self.abort.abort();
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

/// Handle for a running poll task.
pub struct PollHandle {
    canceller: PollCanceller,
    task: JoinHandle<()>,
}

impl PollHandle {
    pub fn cancel(&self) {
        self.canceller.cancel();
    }

    /// Running and not cancelled.
    pub fn is_active(&self) -> bool {
        !self.canceller.is_cancelled() && !self.task.is_finished()
    }

    pub fn canceller(&self) -> PollCanceller {
        self.canceller.clone()
    }
}

impl Drop for PollHandle {
    fn drop(&mut self) {
        self.cancel();
    }
}

/// Spawn `tick` every `interval` until it returns `Stop` or the handle is
/// cancelled. Must be called from within a tokio runtime.
pub fn spawn_polling<F, Fut>(interval: Duration, mut tick: F) -> PollHandle
where
    F: FnMut() -> Fut + Send + 'static,
    Fut: Future<Output = PollControl> + Send + 'static,
{
    let cancelled = Arc::new(AtomicBool::new(false));
    let flag = Arc::clone(&cancelled);

    let task = tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // interval() completes its first tick immediately
        ticker.tick().await;

        loop {
            ticker.tick().await;
            if flag.load(Ordering::SeqCst) {
                break;
            }
            if tick().await == PollControl::Stop {
                tracing::debug!("Polling stopped by tick");
                break;
            }
        }
    });

    PollHandle {
        canceller: PollCanceller {
            cancelled,
            abort: task.abort_handle(),
        },
        task,
    }
}
