use esox_resourcepool::{
    BoxError, FnPolicy, LifecyclePolicy, Pool, PoolConfiguration, PoolError, PoolState,
    ReleaseError,
};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;
use std::time::Duration;

/// Hands out increasing ids and counts destroys
#[derive(Clone, Default)]
struct Sequence {
    next: Arc<AtomicUsize>,
    destroyed: Arc<AtomicUsize>,
}

impl LifecyclePolicy<usize> for Sequence {
    fn create(&self) -> Result<usize, BoxError> {
        Ok(self.next.fetch_add(1, Ordering::SeqCst))
    }

    fn on_destroy(&self, _resource: usize) -> Result<(), BoxError> {
        self.destroyed.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

fn new_pool(config: PoolConfiguration) -> (Pool<usize, Sequence>, Sequence) {
    let policy = Sequence::default();
    let pool = Pool::with_configuration(policy.clone(), config).unwrap();
    (pool, policy)
}

fn assert_totals(pool: &Pool<usize, Sequence>) {
    assert_eq!(pool.total_count(), pool.active_count() + pool.available_count());
    let snap = pool.snapshot();
    assert_eq!(snap.hits + snap.misses, snap.total_gets);
}

#[test]
fn warm_pool_serves_hits_then_creates() {
    let (pool, _) = new_pool(PoolConfiguration::with_capacities(2, 5, 0));
    assert_eq!(pool.warmup(2).unwrap(), 2);
    assert_eq!(pool.available_count(), 2);

    let _a = pool.acquire().unwrap();
    let _b = pool.acquire().unwrap();
    assert_eq!(pool.active_count(), 2);
    assert_eq!(pool.available_count(), 0);

    let _c = pool.acquire().unwrap();
    let snap = pool.snapshot();
    assert_eq!(snap.hits, 2);
    assert_eq!(snap.misses, 1);
    assert_eq!(snap.total_created, 3);
    assert_totals(&pool);
}

#[test]
fn release_over_capacity_destroys() {
    let (pool, policy) = new_pool(PoolConfiguration::with_capacities(0, 1, 0));
    let a = pool.acquire().unwrap();
    let b = pool.acquire().unwrap();
    assert_eq!(pool.active_count(), 2);
    assert_eq!(pool.available_count(), 0);

    assert!(pool.release(a).unwrap());
    assert_eq!(pool.available_count(), 1);

    assert!(!pool.release(b).unwrap());
    assert_eq!(pool.available_count(), 1);
    assert_eq!(policy.destroyed.load(Ordering::SeqCst), 1);

    let snap = pool.snapshot();
    assert_eq!(snap.total_destroyed, 1);
    assert_eq!(snap.capacity_evictions, 1);
    assert_totals(&pool);
}

#[test]
fn foreign_release_is_ignored() {
    let (pool, _) = new_pool(PoolConfiguration::default());
    let (other, other_policy) = new_pool(PoolConfiguration::default());
    pool.warmup(1).unwrap();

    let before = pool.snapshot();
    let stranger = other.acquire().unwrap();
    let back = match pool.try_release(stranger) {
        Err(ReleaseError::Foreign(back)) => back,
        unexpected => panic!("expected the lease back, got {:?}", unexpected),
    };

    let after = pool.snapshot();
    assert_eq!(after.total_returns, before.total_returns);
    assert_eq!(after.total_destroyed, before.total_destroyed);
    assert_eq!(pool.available_count(), 1);
    assert_eq!(pool.active_count(), 0);

    assert_eq!(other.active_count(), 1);
    assert_eq!(other_policy.destroyed.load(Ordering::SeqCst), 0);
    assert!(other.release(back).unwrap());
    assert_eq!(other.available_count(), 1);
    assert_totals(&other);
}

#[test]
fn foreign_release_goes_back_to_its_owner() {
    let (pool, policy) = new_pool(PoolConfiguration::default());
    let (other, other_policy) = new_pool(PoolConfiguration::default());

    let stranger = other.acquire().unwrap();
    assert!(!pool.release(stranger).unwrap());

    assert_eq!(policy.destroyed.load(Ordering::SeqCst), 0);
    assert_eq!(other.active_count(), 0);
    assert_eq!(other_policy.destroyed.load(Ordering::SeqCst), 1);
    assert_eq!(other.snapshot().total_orphaned, 1);
    assert_totals(&other);
}

#[test]
fn dropped_leases_are_reclaimed_without_tracking() {
    let (pool, policy) = new_pool(PoolConfiguration::default().without_leak_tracking());
    for _ in 0..1000 {
        drop(pool.acquire().unwrap());
    }

    assert_eq!(pool.active_count(), 0);
    assert_eq!(pool.total_count(), 0);
    assert_eq!(policy.destroyed.load(Ordering::SeqCst), 1000);
    assert_eq!(pool.snapshot().total_orphaned, 1000);
    assert_totals(&pool);
}

#[test]
fn shrink_to_zero_destroys_every_idle_resource() {
    let (pool, policy) = new_pool(PoolConfiguration::default());
    pool.warmup(5).unwrap();

    assert_eq!(pool.shrink(0).unwrap(), 5);
    assert_eq!(pool.available_count(), 0);
    assert_eq!(policy.destroyed.load(Ordering::SeqCst), 5);
    assert_totals(&pool);
}

#[test]
fn long_checkout_is_reported_until_released() {
    let (pool, _) = new_pool(PoolConfiguration::default());
    let item = pool.acquire().unwrap();
    let handle = item.handle();

    thread::sleep(Duration::from_millis(20));
    let leaks = pool.potential_leaks(Duration::from_millis(10));
    assert_eq!(leaks.len(), 1);
    assert_eq!(leaks[0].handle, handle);

    pool.release(item).unwrap();
    assert!(pool.potential_leaks(Duration::from_millis(10)).is_empty());
}

#[test]
fn round_trip_restores_counts() {
    let (pool, _) = new_pool(PoolConfiguration::default());
    pool.warmup(3).unwrap();
    let (active, available) = (pool.active_count(), pool.available_count());

    let item = pool.acquire().unwrap();
    pool.release(item).unwrap();

    assert_eq!(pool.active_count(), active);
    assert_eq!(pool.available_count(), available);
}

#[test]
fn dispose_is_idempotent() {
    let (pool, policy) = new_pool(PoolConfiguration::default());
    pool.warmup(4).unwrap();

    pool.dispose().unwrap();
    let destroyed = policy.destroyed.load(Ordering::SeqCst);
    let snap = pool.snapshot();

    pool.dispose().unwrap();
    assert_eq!(pool.state(), PoolState::Disposed);
    assert_eq!(policy.destroyed.load(Ordering::SeqCst), destroyed);
    assert_eq!(pool.snapshot().total_destroyed, snap.total_destroyed);
    assert!(matches!(pool.acquire(), Err(PoolError::Disposed)));
}

#[test]
fn unbounded_pool_keeps_every_release() {
    let (pool, policy) = new_pool(PoolConfiguration::default().unbounded());
    let items: Vec<_> = (0..50).map(|_| pool.acquire().unwrap()).collect();
    for item in items {
        assert!(pool.release(item).unwrap());
    }
    assert_eq!(pool.available_count(), 50);
    assert_eq!(policy.destroyed.load(Ordering::SeqCst), 0);
}

#[test]
fn concurrent_use_keeps_invariants() {
    let max = 4;
    let (pool, _) = new_pool(PoolConfiguration::with_capacities(0, max, 0));

    let workers: Vec<_> = (0..8)
        .map(|_| {
            let pool = pool.clone();
            thread::spawn(move || {
                for _ in 0..200 {
                    let a = pool.acquire().unwrap();
                    let b = pool.acquire().unwrap();
                    assert_ne!(*a, *b);
                    pool.release(a).unwrap();
                    pool.release(b).unwrap();
                    assert!(pool.available_count() <= max);
                }
            })
        })
        .collect();

    for worker in workers {
        worker.join().unwrap();
    }

    assert_eq!(pool.active_count(), 0);
    assert!(pool.available_count() <= max);
    assert_totals(&pool);

    let snap = pool.snapshot();
    assert_eq!(snap.total_gets, 8 * 200 * 2);
    assert_eq!(snap.total_created - snap.total_destroyed, pool.total_count() as u64);
}

#[test]
fn closure_policy_resets_on_return() {
    let policy = FnPolicy::new(|| Vec::<u32>::with_capacity(16)).with_reset(|v: &mut Vec<u32>| v.clear());
    let pool = Pool::with_configuration(policy, PoolConfiguration::default()).unwrap();

    let mut buffer = pool.acquire().unwrap();
    buffer.extend([1, 2, 3]);
    pool.release(buffer).unwrap();

    let buffer = pool.acquire().unwrap();
    assert!(buffer.is_empty());
    assert!(buffer.capacity() >= 16);
}
