//! Deferred callbacks for timed leases

use std::time::Duration;

use tokio::runtime::Handle as RuntimeHandle;
use tokio::task::AbortHandle;

/// Work scheduled to run once after a delay
pub type DeferredTask = Box<dyn FnOnce() + Send + 'static>;

/// "Run this callback after `delay`" capability supplied by the embedding
/// environment.
///
/// Cancellation only has to be best effort: the pool guards every callback
/// with the checkout generation, so a late callback is harmless.
pub trait Scheduler: Send + Sync {
    fn schedule(&self, delay: Duration, task: DeferredTask) -> Box<dyn ScheduledTask>;
}

/// Cancellation handle for a scheduled callback
pub trait ScheduledTask: Send + Sync {
    fn cancel(&self);
}

impl ScheduledTask for AbortHandle {
    fn cancel(&self) {
        self.abort();
    }
}

/// Scheduler backed by a tokio runtime
///
/// # Examples
///
/// ```
/// use esox_resourcepool::TokioScheduler;
///
/// // Outside a runtime there is nothing to schedule on.
/// assert!(TokioScheduler::try_current().is_none());
/// ```
#[derive(Debug, Clone)]
pub struct TokioScheduler {
    runtime: RuntimeHandle,
}

impl TokioScheduler {
    pub fn new(runtime: RuntimeHandle) -> Self {
        Self { runtime }
    }

    /// Scheduler on the runtime of the calling context, if there is one
    pub fn try_current() -> Option<Self> {
        RuntimeHandle::try_current().ok().map(Self::new)
    }
}

impl Scheduler for TokioScheduler {
    fn schedule(&self, delay: Duration, task: DeferredTask) -> Box<dyn ScheduledTask> {
        let join = self.runtime.spawn(async move {
            tokio::time::sleep(delay).await;
            task();
        });
        Box::new(join.abort_handle())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicBool, Ordering};

    #[tokio::test(start_paused = true)]
    async fn callback_runs_after_delay() {
        let scheduler = TokioScheduler::try_current().unwrap();
        let fired = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&fired);

        let _task = scheduler.schedule(
            Duration::from_secs(5),
            Box::new(move || flag.store(true, Ordering::SeqCst)),
        );

        tokio::time::sleep(Duration::from_secs(4)).await;
        assert!(!fired.load(Ordering::SeqCst));

        tokio::time::sleep(Duration::from_secs(2)).await;
        tokio::task::yield_now().await;
        assert!(fired.load(Ordering::SeqCst));
    }

    #[tokio::test(start_paused = true)]
    async fn cancelled_callback_never_runs() {
        let scheduler = TokioScheduler::try_current().unwrap();
        let fired = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&fired);

        let task = scheduler.schedule(
            Duration::from_secs(1),
            Box::new(move || flag.store(true, Ordering::SeqCst)),
        );
        task.cancel();

        tokio::time::sleep(Duration::from_secs(2)).await;
        tokio::task::yield_now().await;
        assert!(!fired.load(Ordering::SeqCst));
    }
}
