//! Checked-out resources: handles, owned leases, RAII guards and timed leases

use std::fmt;
use std::ops::{Deref, DerefMut};
use std::sync::{Arc, Weak};

use parking_lot::Mutex;

use crate::errors::PoolResult;
use crate::policy::LifecyclePolicy;
use crate::pool::Pool;

/// Identity of one checkout.
///
/// `slot` names the resource for its whole life in the pool; `generation`
/// grows with every checkout of that slot, so a handle from an earlier
/// checkout never matches the current one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Handle {
    pool: u64,
    slot: u64,
    generation: u64,
}

impl Handle {
    pub(crate) fn new(pool: u64, slot: u64, generation: u64) -> Self {
        Self {
            pool,
            slot,
            generation,
        }
    }

    /// Id of the pool that issued the handle
    pub fn pool_id(&self) -> u64 {
        self.pool
    }

    pub fn slot(&self) -> u64 {
        self.slot
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }
}

impl fmt::Display for Handle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "pool {} slot {} gen {}", self.pool, self.slot, self.generation)
    }
}

/// Owner token of a checkout. The diagnostics tracker only holds a weak
/// reference.
#[derive(Debug)]
pub(crate) struct LeaseToken {
    handle: Handle,
}

impl LeaseToken {
    pub fn new(handle: Handle) -> Self {
        Self { handle }
    }

    pub fn handle(&self) -> Handle {
        self.handle
    }
}

/// Bookkeeping side of a pool, reachable from its checkouts
pub(crate) trait Reclaim<T>: Send + Sync {
    /// A checkout ended without a release. `value` is `None` when the caller
    /// kept the resource.
    fn abandon(&self, handle: Handle, value: Option<T>);
}

/// A checked-out resource.
///
/// Hand it back with [`Pool::release`]. Dropping it without a release hands
/// the resource to the issuing pool's `on_destroy` and counts the checkout as
/// orphaned.
pub struct Pooled<T> {
    value: Option<T>,
    token: Arc<LeaseToken>,
    home: Weak<dyn Reclaim<T>>,
}

impl<T> Pooled<T> {
    pub(crate) fn new(value: T, token: Arc<LeaseToken>, home: Weak<dyn Reclaim<T>>) -> Self {
        Self {
            value: Some(value),
            token,
            home,
        }
    }

    pub fn handle(&self) -> Handle {
        self.token.handle()
    }

    /// Take the resource out of the pool's bookkeeping for good
    pub fn detach(mut self) -> T {
        let value = self.take_value();
        if let Some(home) = self.home.upgrade() {
            home.abandon(self.handle(), None);
        }
        value
    }

    pub(crate) fn into_parts(mut self) -> (T, Arc<LeaseToken>) {
        (self.take_value(), Arc::clone(&self.token))
    }

    fn take_value(&mut self) -> T {
        self.value.take().expect("pooled value taken twice")
    }
}

impl<T> Deref for Pooled<T> {
    type Target = T;

    fn deref(&self) -> &Self::Target {
        self.value.as_ref().expect("pooled value already taken")
    }
}

impl<T> DerefMut for Pooled<T> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.value.as_mut().expect("pooled value already taken")
    }
}

impl<T> Drop for Pooled<T> {
    fn drop(&mut self) {
        let Some(value) = self.value.take() else {
            return;
        };
        match self.home.upgrade() {
            Some(home) => home.abandon(self.handle(), Some(value)),
            None => drop(value),
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for Pooled<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pooled")
            .field("handle", &self.handle())
            .field("value", &self.value)
            .finish()
    }
}

/// A checked-out resource that goes back to its pool when dropped
///
/// # Examples
///
/// ```
/// use esox_resourcepool::{FnPolicy, Pool, PoolConfiguration};
///
/// let pool = Pool::with_configuration(FnPolicy::new(|| 7u32), PoolConfiguration::default()).unwrap();
/// {
///     let value = pool.acquire_guard().unwrap();
///     assert_eq!(*value, 7);
///     assert_eq!(pool.active_count(), 1);
/// }
/// assert_eq!(pool.active_count(), 0);
/// assert_eq!(pool.available_count(), 1);
/// ```
pub struct PoolGuard<T, P>
where
    T: Send + 'static,
    P: LifecyclePolicy<T> + 'static,
{
    pool: Pool<T, P>,
    pooled: Option<Pooled<T>>,
}

impl<T, P> PoolGuard<T, P>
where
    T: Send + 'static,
    P: LifecyclePolicy<T> + 'static,
{
    pub(crate) fn new(pool: Pool<T, P>, pooled: Pooled<T>) -> Self {
        Self {
            pool,
            pooled: Some(pooled),
        }
    }

    pub fn handle(&self) -> Handle {
        self.pooled().handle()
    }

    /// Release now and report the outcome instead of logging it
    pub fn release(mut self) -> PoolResult<bool> {
        match self.pooled.take() {
            Some(pooled) => self.pool.release(pooled),
            None => Ok(false),
        }
    }

    /// Stop returning on drop; the caller becomes responsible for the release
    pub fn into_pooled(mut self) -> Pooled<T> {
        self.pooled.take().expect("guard already released")
    }

    fn pooled(&self) -> &Pooled<T> {
        self.pooled.as_ref().expect("guard already released")
    }
}

impl<T, P> Deref for PoolGuard<T, P>
where
    T: Send + 'static,
    P: LifecyclePolicy<T> + 'static,
{
    type Target = T;

    fn deref(&self) -> &Self::Target {
        self.pooled()
    }
}

impl<T, P> DerefMut for PoolGuard<T, P>
where
    T: Send + 'static,
    P: LifecyclePolicy<T> + 'static,
{
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.pooled.as_mut().expect("guard already released")
    }
}

impl<T, P> Drop for PoolGuard<T, P>
where
    T: Send + 'static,
    P: LifecyclePolicy<T> + 'static,
{
    fn drop(&mut self) {
        if let Some(pooled) = self.pooled.take() {
            let handle = pooled.handle();
            if let Err(err) = self.pool.release(pooled) {
                tracing::warn!(%handle, error = %err, "Guard release failed");
            }
        }
    }
}

/// A checkout that returns itself after a fixed duration.
///
/// The resource lives in a shared cell so the deferred callback can take it
/// back. Whichever side empties the cell first wins; the other becomes a
/// no-op.
pub struct TimedLease<T, P>
where
    T: Send + 'static,
    P: LifecyclePolicy<T> + 'static,
{
    pool: Pool<T, P>,
    cell: Arc<Mutex<Option<Pooled<T>>>>,
    handle: Handle,
}

impl<T, P> TimedLease<T, P>
where
    T: Send + 'static,
    P: LifecyclePolicy<T> + 'static,
{
    pub(crate) fn new(pool: Pool<T, P>, cell: Arc<Mutex<Option<Pooled<T>>>>, handle: Handle) -> Self {
        Self { pool, cell, handle }
    }

    pub fn handle(&self) -> Handle {
        self.handle
    }

    /// Whether the deferred callback already returned the resource
    pub fn is_returned(&self) -> bool {
        self.cell.lock().is_none()
    }

    /// Run `f` against the resource, `None` once it has been returned
    pub fn with<R>(&self, f: impl FnOnce(&mut T) -> R) -> Option<R> {
        self.cell.lock().as_mut().map(|pooled| f(&mut **pooled))
    }

    /// Return early and cancel the pending callback
    pub fn release(self) -> PoolResult<bool> {
        self.pool.cancel_timer(self.handle);
        let taken = self.cell.lock().take();
        match taken {
            Some(pooled) => self.pool.release(pooled),
            None => Ok(false),
        }
    }
}
