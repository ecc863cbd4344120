//! Core resource pool implementation

use crate::config::PoolConfiguration;
use crate::diagnostics::{AcquisitionRecord, DiagnosticsTracker, FailureSink, HookFailure};
use crate::errors::{BoxError, HookError, HookPhase, PoolError, PoolResult, ReleaseError};
use crate::health::{HealthCheckResult, HealthThresholds};
use crate::lease::{Handle, LeaseToken, PoolGuard, Pooled, Reclaim, TimedLease};
use crate::policy::LifecyclePolicy;
use crate::scheduler::{ScheduledTask, Scheduler};
use crate::statistics::{PoolStatisticsSnapshot, StatisticsTracker};

use dashmap::DashMap;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::fmt;
use std::panic::Location;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::time::{Duration, Instant};

static NEXT_POOL_ID: AtomicU64 = AtomicU64::new(1);

/// Lifecycle state of a pool
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum PoolState {
    /// Created but never configured
    Uninitialized,

    /// Serving acquisitions
    Active,

    /// Torn down; terminal
    Disposed,
}

impl fmt::Display for PoolState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PoolState::Uninitialized => f.write_str("uninitialized"),
            PoolState::Active => f.write_str("active"),
            PoolState::Disposed => f.write_str("disposed"),
        }
    }
}

/// Consistent view of a pool's counts, taken under one lock
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolCounts {
    pub state: PoolState,
    pub active: usize,
    pub available: usize,

    /// Live resources as tracked by the pool itself
    pub total: usize,
}

/// Anything the runtime validators can inspect
pub trait PoolObserver {
    fn counts(&self) -> PoolCounts;
}

impl PoolObserver for PoolCounts {
    fn counts(&self) -> PoolCounts {
        *self
    }
}

/// An idle resource and the slot it occupies
struct Idle<T> {
    value: T,
    slot: u64,
    generation: u64,
    idle_since: Instant,
}

impl<T> Idle<T> {
    fn new(value: T, slot: u64, generation: u64) -> Self {
        Self {
            value,
            slot,
            generation,
            idle_since: Instant::now(),
        }
    }
}

/// Collections guarded by the pool lock. Lifecycle hooks never run while
/// this is held.
struct Core<T> {
    state: PoolState,
    config: PoolConfiguration,
    available: Vec<Idle<T>>,

    /// slot -> generation of the current checkout
    active: HashMap<u64, u64>,

    /// Releases that passed the capacity check and are running `on_return`
    reserved: usize,

    /// Live resources; must always equal `active.len() + available.len()`
    live: usize,
    next_slot: u64,
}

impl<T> Core<T> {
    fn ensure_active(&self) -> PoolResult<()> {
        match self.state {
            PoolState::Active => Ok(()),
            PoolState::Uninitialized => Err(PoolError::Uninitialized),
            PoolState::Disposed => Err(PoolError::Disposed),
        }
    }

    /// Free idle room, `None` when unbounded
    fn slack(&self) -> Option<usize> {
        self.config
            .max_capacity
            .map(|max| max.saturating_sub(self.available.len() + self.reserved))
    }

    fn has_slack(&self) -> bool {
        self.slack().is_none_or(|room| room > 0)
    }

    fn allocate_slot(&mut self) -> u64 {
        let slot = self.next_slot;
        self.next_slot += 1;
        slot
    }

    fn is_current(&self, handle: Handle) -> bool {
        self.active.get(&handle.slot()) == Some(&handle.generation())
    }

    fn counts(&self) -> PoolCounts {
        PoolCounts {
            state: self.state,
            active: self.active.len(),
            available: self.available.len(),
            total: self.live,
        }
    }
}

struct PendingReturn {
    generation: u64,
    task: Box<dyn ScheduledTask>,
}

pub(crate) struct PoolInner<T, P> {
    id: u64,
    policy: P,
    core: Mutex<Core<T>>,
    statistics: StatisticsTracker,
    diagnostics: DiagnosticsTracker,
    timers: DashMap<u64, PendingReturn>,
    scheduler: Mutex<Option<Arc<dyn Scheduler>>>,
    failure_sink: Mutex<Option<Arc<dyn FailureSink>>>,
}

impl<T, P> PoolInner<T, P>
where
    T: Send + 'static,
    P: LifecyclePolicy<T> + 'static,
{
    fn cancel_timer(&self, handle: Handle) {
        if let Some((_, pending)) = self
            .timers
            .remove_if(&handle.slot(), |_, pending| pending.generation == handle.generation())
        {
            pending.task.cancel();
            tracing::debug!(pool_id = self.id, %handle, "Timed return cancelled");
        }
    }

    fn destroy(&self, value: T) -> PoolResult<()> {
        self.statistics.record_destroyed(1);
        self.policy
            .on_destroy(value)
            .map_err(|err| self.hook_failed(HookPhase::Destroy, err))
    }

    /// Destroy after another failure; the destroy failure is recorded but the
    /// earlier error is what the caller sees.
    fn destroy_quietly(&self, value: T) {
        let _ = self.destroy(value);
    }

    fn hook_failed(&self, phase: HookPhase, err: BoxError) -> PoolError {
        let err: HookError = Arc::from(err);
        let failure = self.diagnostics.record_failure(phase, Arc::clone(&err));
        tracing::error!(pool_id = self.id, %phase, error = %err, "Lifecycle hook failed");

        let sink = self.failure_sink.lock().clone();
        if let Some(sink) = sink {
            sink.record(self.id, &failure);
        }

        PoolError::hook(phase, err)
    }
}

impl<T, P> Reclaim<T> for PoolInner<T, P>
where
    T: Send + 'static,
    P: LifecyclePolicy<T> + 'static,
{
    fn abandon(&self, handle: Handle, value: Option<T>) {
        let reaped = {
            let mut core = self.core.lock();
            if core.is_current(handle) {
                core.active.remove(&handle.slot());
                core.live -= 1;
                true
            } else {
                false
            }
        };

        self.diagnostics.untrack(handle);
        self.cancel_timer(handle);

        if reaped {
            self.statistics.record_orphaned(1);
            if value.is_some() {
                tracing::warn!(pool_id = self.id, %handle, "Checked-out resource dropped without being released");
            } else {
                tracing::debug!(pool_id = self.id, %handle, "Checked-out resource detached");
            }
        }

        if let Some(value) = value {
            self.destroy_quietly(value);
        }
    }
}

enum ReleasePlan {
    Return,
    Evict,
    Disposed,
}

/// Generic pool of reusable resources.
///
/// Resources are created, reset and destroyed through the pool's
/// [`LifecyclePolicy`]. Idle resources are reused most-recently-returned
/// first. `acquire` never waits: it either reuses, creates, or fails.
///
/// The pool is cheap to clone; clones share the same resources.
///
/// # Examples
///
/// ```
/// use esox_resourcepool::{FnPolicy, Pool, PoolConfiguration};
///
/// let config = PoolConfiguration::with_capacities(2, 5, 0);
/// let pool = Pool::with_configuration(FnPolicy::new(Vec::<u8>::new), config).unwrap();
/// pool.warmup(2).unwrap();
///
/// let buffer = pool.acquire().unwrap();
/// assert_eq!(pool.active_count(), 1);
/// assert_eq!(pool.available_count(), 1);
///
/// assert!(pool.release(buffer).unwrap());
/// assert_eq!(pool.available_count(), 2);
/// ```
pub struct Pool<T, P> {
    inner: Arc<PoolInner<T, P>>,
}

impl<T, P> Clone for Pool<T, P> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T, P> fmt::Debug for Pool<T, P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let counts = self.inner.core.lock().counts();
        f.debug_struct("Pool")
            .field("id", &self.inner.id)
            .field("counts", &counts)
            .finish()
    }
}

impl<T, P> Pool<T, P>
where
    T: Send + 'static,
    P: LifecyclePolicy<T> + 'static,
{
    /// Create an unconfigured pool. Only `configure` is allowed until then.
    pub fn new(policy: P) -> Self {
        let config = PoolConfiguration::default();
        let diagnostics =
            DiagnosticsTracker::new(config.track_leaks, config.capture_origin, config.failure_history);

        Self {
            inner: Arc::new(PoolInner {
                id: NEXT_POOL_ID.fetch_add(1, Ordering::Relaxed),
                policy,
                core: Mutex::new(Core {
                    state: PoolState::Uninitialized,
                    config,
                    available: Vec::new(),
                    active: HashMap::new(),
                    reserved: 0,
                    live: 0,
                    next_slot: 1,
                }),
                statistics: StatisticsTracker::new(),
                diagnostics,
                timers: DashMap::new(),
                scheduler: Mutex::new(None),
                failure_sink: Mutex::new(None),
            }),
        }
    }

    /// Create and configure in one step
    pub fn with_configuration(policy: P, config: PoolConfiguration) -> PoolResult<Self> {
        let pool = Self::new(policy);
        pool.configure(config)?;
        Ok(pool)
    }

    /// Install the scheduler used by [`acquire_timed`](Self::acquire_timed)
    pub fn with_scheduler(self, scheduler: Arc<dyn Scheduler>) -> Self {
        *self.inner.scheduler.lock() = Some(scheduler);
        self
    }

    /// Forward every lifecycle hook failure to `sink`
    pub fn with_failure_sink(self, sink: Arc<dyn FailureSink>) -> Self {
        *self.inner.failure_sink.lock() = Some(sink);
        self
    }

    /// Apply a configuration and activate the pool.
    ///
    /// Reconfiguring an active pool is allowed; idle resources above a
    /// lowered `max_capacity` are destroyed.
    pub fn configure(&self, config: PoolConfiguration) -> PoolResult<()> {
        config.validate()?;
        if !self.inner.policy.validate() {
            return Err(PoolError::InvalidArgument(
                "lifecycle policy failed its own validation".to_string(),
            ));
        }

        {
            let mut core = self.inner.core.lock();
            if core.state == PoolState::Disposed {
                return Err(PoolError::Disposed);
            }
            core.config = config.clone();
            core.state = PoolState::Active;
        }

        self.inner.diagnostics.reconfigure(
            config.track_leaks,
            config.capture_origin,
            config.failure_history,
        );

        tracing::debug!(
            pool_id = self.inner.id,
            initial = config.initial_capacity,
            max = ?config.max_capacity,
            min = config.min_capacity,
            "Pool configured"
        );

        if let Some(max) = config.max_capacity {
            self.shrink(max)?;
        }

        if config.prewarm {
            let missing = config.initial_capacity.saturating_sub(self.total_count());
            self.warmup(missing)?;
        }

        Ok(())
    }

    /// Check out a resource.
    ///
    /// Reuses the most recently returned idle resource (a hit) or creates a
    /// new one (a miss).
    #[track_caller]
    pub fn acquire(&self) -> PoolResult<Pooled<T>> {
        let origin = Location::caller();
        let started = Instant::now();
        let inner = &self.inner;

        let popped = {
            let mut core = inner.core.lock();
            core.ensure_active()?;
            let idle = core.available.pop();
            match idle {
                Some(idle) => {
                    let generation = idle.generation + 1;
                    core.active.insert(idle.slot, generation);
                    let handle = Handle::new(inner.id, idle.slot, generation);
                    Some((idle.value, handle, core.counts()))
                }
                None => None,
            }
        };

        let (value, handle, counts, hit) = match popped {
            Some((mut value, handle, counts)) => {
                if let Err(err) = inner.policy.on_acquire(&mut value) {
                    self.forget_active(handle);
                    let err = self.inner.hook_failed(HookPhase::Acquire, err);
                    self.inner.destroy_quietly(value);
                    return Err(err);
                }
                (value, handle, counts, true)
            }
            None => {
                let value = inner
                    .policy
                    .create()
                    .map_err(|err| self.inner.hook_failed(HookPhase::Create, err))?;
                inner.statistics.record_created(1);

                let mut core = inner.core.lock();
                if let Err(err) = core.ensure_active() {
                    drop(core);
                    self.inner.destroy_quietly(value);
                    return Err(err);
                }
                let slot = core.allocate_slot();
                core.active.insert(slot, 1);
                core.live += 1;
                (value, Handle::new(inner.id, slot, 1), core.counts(), false)
            }
        };

        inner
            .statistics
            .record_acquire(hit, started.elapsed(), counts.active, counts.total);

        let token = Arc::new(LeaseToken::new(handle));
        inner.diagnostics.track(handle, &token, origin);
        let home = Arc::downgrade(&self.inner);
        let home: Weak<dyn Reclaim<T>> = home;
        Ok(Pooled::new(value, token, home))
    }

    /// Check out a resource that is released when the guard drops
    #[track_caller]
    pub fn acquire_guard(&self) -> PoolResult<PoolGuard<T, P>> {
        let pooled = self.acquire()?;
        Ok(PoolGuard::new(self.clone(), pooled))
    }

    /// Check out a resource that returns itself after `duration`.
    ///
    /// Needs a scheduler, see [`with_scheduler`](Self::with_scheduler).
    /// Releasing the lease earlier cancels the callback; a callback that
    /// fires anyway finds the lease empty and does nothing.
    #[track_caller]
    pub fn acquire_timed(&self, duration: Duration) -> PoolResult<TimedLease<T, P>> {
        let scheduler = self
            .inner
            .scheduler
            .lock()
            .clone()
            .ok_or(PoolError::SchedulerUnavailable)?;

        let pooled = self.acquire()?;
        let handle = pooled.handle();
        let cell = Arc::new(Mutex::new(Some(pooled)));

        let weak_pool: Weak<PoolInner<T, P>> = Arc::downgrade(&self.inner);
        let task_cell = Arc::clone(&cell);
        let task = scheduler.schedule(
            duration,
            Box::new(move || {
                if let Some(inner) = weak_pool.upgrade() {
                    Pool { inner }.expire_lease(handle, &task_cell);
                }
            }),
        );

        self.inner.timers.insert(
            handle.slot(),
            PendingReturn {
                generation: handle.generation(),
                task,
            },
        );
        // The callback may already have run on another thread.
        if cell.lock().is_none() {
            self.cancel_timer(handle);
        }

        Ok(TimedLease::new(self.clone(), cell, handle))
    }

    /// Return a checked-out resource.
    ///
    /// Returns `Ok(true)` when the resource went back to the available set
    /// and `Ok(false)` when it was destroyed because the pool is full.
    /// A resource this pool did not hand out is logged and handed back to
    /// its own pool, which destroys it; the call reports `Ok(false)`, or
    /// `PoolError::ForeignObject` in strict mode. Use
    /// [`try_release`](Self::try_release) to keep such a resource instead.
    pub fn release(&self, pooled: Pooled<T>) -> PoolResult<bool> {
        match self.try_release(pooled) {
            Ok(returned) => Ok(returned),
            Err(ReleaseError::Failed(err)) => Err(err),
            Err(ReleaseError::Foreign(pooled)) => {
                drop(pooled);
                if self.inner.core.lock().config.strict_release {
                    Err(PoolError::ForeignObject)
                } else {
                    Ok(false)
                }
            }
        }
    }

    /// Like [`release`](Self::release), but a resource this pool did not
    /// hand out comes back untouched in [`ReleaseError::Foreign`].
    pub fn try_release(&self, pooled: Pooled<T>) -> Result<bool, ReleaseError<T>> {
        let started = Instant::now();
        let inner = &self.inner;
        let handle = pooled.handle();

        if handle.pool_id() != inner.id {
            return Err(self.reject_foreign(pooled));
        }

        let plan = {
            let mut core = inner.core.lock();
            if !core.is_current(handle) {
                drop(core);
                return Err(self.reject_foreign(pooled));
            }

            if core.state == PoolState::Disposed {
                core.active.remove(&handle.slot());
                core.live -= 1;
                ReleasePlan::Disposed
            } else if core.has_slack() {
                core.reserved += 1;
                ReleasePlan::Return
            } else {
                core.active.remove(&handle.slot());
                core.live -= 1;
                ReleasePlan::Evict
            }
        };

        let (mut value, token) = pooled.into_parts();
        inner.diagnostics.untrack(handle);
        self.cancel_timer(handle);
        drop(token);

        match plan {
            ReleasePlan::Disposed => {
                self.inner.destroy_quietly(value);
                Err(PoolError::Disposed.into())
            }
            ReleasePlan::Evict => {
                inner.statistics.record_release(false, true, started.elapsed());
                self.inner.destroy(value)?;
                Ok(false)
            }
            ReleasePlan::Return => {
                if let Err(err) = inner.policy.on_return(&mut value) {
                    {
                        let mut core = inner.core.lock();
                        core.reserved -= 1;
                        core.active.remove(&handle.slot());
                        core.live -= 1;
                    }
                    inner.statistics.record_release(false, false, started.elapsed());
                    let err = self.inner.hook_failed(HookPhase::Return, err);
                    self.inner.destroy_quietly(value);
                    return Err(err.into());
                }

                let mut core = inner.core.lock();
                core.reserved -= 1;
                core.active.remove(&handle.slot());
                if core.state == PoolState::Disposed {
                    core.live -= 1;
                    drop(core);
                    self.inner.destroy_quietly(value);
                    return Err(PoolError::Disposed.into());
                }
                core.available
                    .push(Idle::new(value, handle.slot(), handle.generation()));
                drop(core);

                inner.statistics.record_release(true, false, started.elapsed());
                Ok(true)
            }
        }
    }

    /// Create `count` resources straight into the available set.
    ///
    /// Never grows the available set past `max_capacity`; the request is
    /// clamped with a warning instead. Returns how many were created.
    pub fn warmup(&self, count: usize) -> PoolResult<usize> {
        let inner = &self.inner;
        let room = {
            let core = inner.core.lock();
            core.ensure_active()?;
            core.slack()
        };

        let target = match room {
            Some(room) if room < count => {
                tracing::warn!(
                    pool_id = inner.id,
                    requested = count,
                    room,
                    "Warm-up clamped to max capacity"
                );
                room
            }
            _ => count,
        };

        let mut created = 0;
        for _ in 0..target {
            let value = inner
                .policy
                .create()
                .map_err(|err| self.inner.hook_failed(HookPhase::Create, err))?;
            inner.statistics.record_created(1);

            let mut core = inner.core.lock();
            if let Err(err) = core.ensure_active() {
                drop(core);
                self.inner.destroy_quietly(value);
                return Err(err);
            }
            if !core.has_slack() {
                drop(core);
                self.inner.destroy_quietly(value);
                break;
            }
            let slot = core.allocate_slot();
            core.available.push(Idle::new(value, slot, 0));
            core.live += 1;
            let total = core.live;
            drop(core);

            inner.statistics.observe_total(total);
            created += 1;
        }

        tracing::debug!(pool_id = inner.id, created, "Pool warmed up");
        Ok(created)
    }

    /// Destroy idle resources until at most `target` remain. Never touches
    /// checked-out resources. Returns how many were destroyed.
    pub fn shrink(&self, target: usize) -> PoolResult<usize> {
        let drained: Vec<T> = {
            let mut core = self.inner.core.lock();
            core.ensure_active()?;
            if core.available.len() <= target {
                return Ok(0);
            }
            let drained: Vec<T> = core.available.drain(target..).rev().map(|idle| idle.value).collect();
            core.live -= drained.len();
            drained
        };

        tracing::debug!(pool_id = self.inner.id, destroyed = drained.len(), target, "Pool shrunk");
        self.destroy_all(drained)
    }

    /// Destroy idle resources that sat unused longer than the configured
    /// `idle_timeout`, keeping at least `min_capacity` idle.
    pub fn evict_idle(&self) -> PoolResult<usize> {
        let expired: Vec<T> = {
            let mut core = self.inner.core.lock();
            core.ensure_active()?;
            let Some(timeout) = core.config.idle_timeout else {
                return Ok(0);
            };

            let mut removable = core.available.len().saturating_sub(core.config.min_capacity);
            let mut expired = Vec::new();
            let mut kept = Vec::with_capacity(core.available.len());
            for idle in std::mem::take(&mut core.available) {
                if removable > 0 && idle.idle_since.elapsed() > timeout {
                    removable -= 1;
                    expired.push(idle.value);
                } else {
                    kept.push(idle);
                }
            }
            core.available = kept;
            core.live -= expired.len();
            expired
        };

        if !expired.is_empty() {
            tracing::debug!(pool_id = self.inner.id, evicted = expired.len(), "Evicted idle resources");
        }
        self.destroy_all(expired)
    }

    /// Destroy every idle resource. Checked-out resources stay with their
    /// holders; their count is logged.
    pub fn clear(&self) -> PoolResult<usize> {
        self.inner.core.lock().ensure_active()?;
        self.drain_available()
    }

    /// Clear the pool, cancel pending timed returns and refuse all further
    /// work. Calling it again is a no-op. Resources still checked out are
    /// destroyed when they are released or dropped.
    pub fn dispose(&self) -> PoolResult<()> {
        {
            let mut core = self.inner.core.lock();
            match core.state {
                PoolState::Disposed => return Ok(()),
                PoolState::Uninitialized => return Err(PoolError::Uninitialized),
                PoolState::Active => core.state = PoolState::Disposed,
            }
        }

        let slots: Vec<u64> = self.inner.timers.iter().map(|entry| *entry.key()).collect();
        let mut cancelled = 0;
        for slot in slots {
            if let Some((_, pending)) = self.inner.timers.remove(&slot) {
                pending.task.cancel();
                cancelled += 1;
            }
        }

        let result = self.drain_available();
        tracing::debug!(pool_id = self.inner.id, cancelled, "Pool disposed");
        result.map(|_| ())
    }

    pub fn id(&self) -> u64 {
        self.inner.id
    }

    pub fn state(&self) -> PoolState {
        self.inner.core.lock().state
    }

    pub fn active_count(&self) -> usize {
        self.inner.core.lock().active.len()
    }

    pub fn available_count(&self) -> usize {
        self.inner.core.lock().available.len()
    }

    pub fn total_count(&self) -> usize {
        self.inner.core.lock().live
    }

    /// Current configuration
    pub fn configuration(&self) -> PoolConfiguration {
        self.inner.core.lock().config.clone()
    }

    /// Capture the statistics counters together with the current counts
    pub fn snapshot(&self) -> PoolStatisticsSnapshot {
        let counts = self.counts();
        self.inner.statistics.snapshot(counts.active, counts.available)
    }

    /// Zero every counter and high-water mark
    pub fn reset_statistics(&self) {
        self.inner.statistics.reset();
    }

    /// Checkouts older than `threshold`, oldest first.
    ///
    /// This is a heuristic: a legitimate long checkout looks the same as a
    /// leak.
    pub fn potential_leaks(&self, threshold: Duration) -> Vec<AcquisitionRecord> {
        self.inner.diagnostics.scan(threshold)
    }

    /// The most recent lifecycle hook failures, oldest first
    pub fn exception_history(&self) -> Vec<HookFailure> {
        self.inner.diagnostics.failures()
    }

    /// Run every runtime validator against the current state
    pub fn health_check(&self, thresholds: &HealthThresholds) -> HealthCheckResult {
        HealthCheckResult::evaluate(self, &self.snapshot(), thresholds)
    }

    pub(crate) fn cancel_timer(&self, handle: Handle) {
        self.inner.cancel_timer(handle);
    }

    fn reject_foreign(&self, pooled: Pooled<T>) -> ReleaseError<T> {
        tracing::warn!(
            pool_id = self.inner.id,
            handle = %pooled.handle(),
            "Release of a resource that is not checked out from this pool"
        );
        ReleaseError::Foreign(pooled)
    }

    fn expire_lease(&self, handle: Handle, cell: &Mutex<Option<Pooled<T>>>) {
        self.inner
            .timers
            .remove_if(&handle.slot(), |_, pending| pending.generation == handle.generation());

        let taken = cell.lock().take();
        let Some(pooled) = taken else {
            return;
        };

        match self.release(pooled) {
            Ok(returned) => {
                tracing::debug!(pool_id = self.inner.id, %handle, returned, "Timed lease expired")
            }
            Err(err) => {
                tracing::warn!(pool_id = self.inner.id, %handle, error = %err, "Timed lease auto-return failed")
            }
        }
    }

    fn drain_available(&self) -> PoolResult<usize> {
        let (drained, outstanding) = {
            let mut core = self.inner.core.lock();
            let drained: Vec<T> = core.available.drain(..).map(|idle| idle.value).collect();
            core.live -= drained.len();
            (drained, core.active.len())
        };

        if outstanding > 0 {
            tracing::warn!(
                pool_id = self.inner.id,
                active = outstanding,
                "Clearing pool while resources are still checked out; they stay with their holders"
            );
        }

        self.destroy_all(drained)
    }

    fn forget_active(&self, handle: Handle) {
        let mut core = self.inner.core.lock();
        if core.active.remove(&handle.slot()).is_some() {
            core.live -= 1;
        }
    }

    /// Destroy every value, even when some hooks fail. Reports the first
    /// failure.
    fn destroy_all(&self, values: Vec<T>) -> PoolResult<usize> {
        let count = values.len();
        let mut first_error = None;
        for value in values {
            if let Err(err) = self.inner.destroy(value) {
                first_error.get_or_insert(err);
            }
        }
        match first_error {
            Some(err) => Err(err),
            None => Ok(count),
        }
    }

}

impl<T, P> PoolObserver for Pool<T, P> {
    fn counts(&self) -> PoolCounts {
        self.inner.core.lock().counts()
    }
}
