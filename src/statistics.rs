//! Usage statistics for resource pools

use std::collections::HashMap;
use std::time::{Duration, Instant, SystemTime};

use parking_lot::Mutex;

/// Point-in-time copy of a pool's counters
///
/// # Examples
///
/// ```
/// use esox_resourcepool::{FnPolicy, Pool, PoolConfiguration};
///
/// let pool = Pool::with_configuration(FnPolicy::new(|| 0u64), PoolConfiguration::default()).unwrap();
/// let before = pool.snapshot();
///
/// let item = pool.acquire().unwrap();
/// pool.release(item).unwrap();
///
/// let after = pool.snapshot();
/// assert_eq!(after.total_gets, 1);
/// assert_eq!(after.misses, 1);
/// assert_eq!(after.delta_since(&before).gets, 1);
/// ```
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct PoolStatisticsSnapshot {
    /// Wall-clock capture time
    pub captured_at: SystemTime,

    /// Monotonic capture time, used for intervals between snapshots
    #[cfg_attr(feature = "serde", serde(skip))]
    pub captured_instant: Instant,

    /// Resources built by the policy
    pub total_created: u64,

    /// Resources handed to `on_destroy`
    pub total_destroyed: u64,

    /// Successful acquisitions
    pub total_gets: u64,

    /// Releases that put the resource back into the available set
    pub total_returns: u64,

    /// Acquisitions served from the available set
    pub hits: u64,

    /// Acquisitions that required `create`
    pub misses: u64,

    /// Releases that destroyed the resource because the pool was full
    pub capacity_evictions: u64,

    /// Checkouts that were dropped without being released
    pub total_orphaned: u64,

    /// Highest number of simultaneously active resources
    pub peak_active: usize,

    /// Highest number of live resources (active + available)
    pub peak_total: usize,

    /// Active resources at capture time
    pub active: usize,

    /// Available resources at capture time
    pub available: usize,

    /// Running mean of acquire latency
    pub avg_acquire_time: Duration,

    /// Slowest acquire observed
    pub max_acquire_time: Duration,

    /// Running mean of release latency
    pub avg_release_time: Duration,

    /// Slowest release observed
    pub max_release_time: Duration,
}

impl PoolStatisticsSnapshot {
    /// `hits / (hits + misses)`, 0 before the first acquisition
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total > 0 {
            self.hits as f64 / total as f64
        } else {
            0.0
        }
    }

    /// Active share of all live resources (0.0 to 1.0)
    pub fn utilization(&self) -> f64 {
        let total = self.active + self.available;
        if total > 0 {
            self.active as f64 / total as f64
        } else {
            0.0
        }
    }

    /// Live resources at capture time
    pub fn total(&self) -> usize {
        self.active + self.available
    }

    /// Compare against an earlier snapshot of the same pool
    pub fn delta_since(&self, earlier: &PoolStatisticsSnapshot) -> StatisticsDelta {
        StatisticsDelta {
            interval: self.captured_instant.saturating_duration_since(earlier.captured_instant),
            created: diff(self.total_created, earlier.total_created),
            destroyed: diff(self.total_destroyed, earlier.total_destroyed),
            gets: diff(self.total_gets, earlier.total_gets),
            returns: diff(self.total_returns, earlier.total_returns),
            hits: diff(self.hits, earlier.hits),
            misses: diff(self.misses, earlier.misses),
            active: self.active as i64 - earlier.active as i64,
            available: self.available as i64 - earlier.available as i64,
            hit_rate_change: (self.hit_rate() - earlier.hit_rate()) * 100.0,
            gets_change_pct: percent_change(earlier.total_gets as f64, self.total_gets as f64),
            avg_acquire_change_pct: percent_change(
                earlier.avg_acquire_time.as_secs_f64(),
                self.avg_acquire_time.as_secs_f64(),
            ),
            avg_release_change_pct: percent_change(
                earlier.avg_release_time.as_secs_f64(),
                self.avg_release_time.as_secs_f64(),
            ),
        }
    }

    /// Export counters as a flat map
    pub fn export(&self) -> HashMap<String, String> {
        let mut metrics = HashMap::new();
        metrics.insert("total_created".to_string(), self.total_created.to_string());
        metrics.insert("total_destroyed".to_string(), self.total_destroyed.to_string());
        metrics.insert("total_gets".to_string(), self.total_gets.to_string());
        metrics.insert("total_returns".to_string(), self.total_returns.to_string());
        metrics.insert("hits".to_string(), self.hits.to_string());
        metrics.insert("misses".to_string(), self.misses.to_string());
        metrics.insert("capacity_evictions".to_string(), self.capacity_evictions.to_string());
        metrics.insert("total_orphaned".to_string(), self.total_orphaned.to_string());
        metrics.insert("peak_active".to_string(), self.peak_active.to_string());
        metrics.insert("peak_total".to_string(), self.peak_total.to_string());
        metrics.insert("active".to_string(), self.active.to_string());
        metrics.insert("available".to_string(), self.available.to_string());
        metrics.insert("hit_rate".to_string(), format!("{:.2}", self.hit_rate()));
        metrics.insert("utilization".to_string(), format!("{:.2}", self.utilization()));
        metrics.insert("avg_acquire_us".to_string(), self.avg_acquire_time.as_micros().to_string());
        metrics.insert("avg_release_us".to_string(), self.avg_release_time.as_micros().to_string());
        metrics
    }
}

/// Difference between two snapshots
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct StatisticsDelta {
    pub interval: Duration,
    pub created: i64,
    pub destroyed: i64,
    pub gets: i64,
    pub returns: i64,
    pub hits: i64,
    pub misses: i64,
    pub active: i64,
    pub available: i64,

    /// Hit rate change in percentage points
    pub hit_rate_change: f64,

    /// `None` when the earlier value was zero
    pub gets_change_pct: Option<f64>,
    pub avg_acquire_change_pct: Option<f64>,
    pub avg_release_change_pct: Option<f64>,
}

fn diff(now: u64, before: u64) -> i64 {
    now as i64 - before as i64
}

fn percent_change(before: f64, now: f64) -> Option<f64> {
    if before > 0.0 {
        Some((now - before) / before * 100.0)
    } else {
        None
    }
}

/// Online mean: `avg' = avg + (sample - avg) / n`
#[derive(Debug, Clone, Copy, Default)]
struct RunningMean {
    samples: u64,
    mean_nanos: f64,
    max: Duration,
}

impl RunningMean {
    fn record(&mut self, sample: Duration) {
        self.samples += 1;
        let nanos = sample.as_nanos() as f64;
        self.mean_nanos += (nanos - self.mean_nanos) / self.samples as f64;
        if sample > self.max {
            self.max = sample;
        }
    }

    fn mean(&self) -> Duration {
        Duration::from_nanos(self.mean_nanos.round() as u64)
    }
}

#[derive(Debug, Default)]
struct Counters {
    total_created: u64,
    total_destroyed: u64,
    total_gets: u64,
    total_returns: u64,
    hits: u64,
    misses: u64,
    capacity_evictions: u64,
    total_orphaned: u64,
    peak_active: usize,
    peak_total: usize,
    acquire: RunningMean,
    release: RunningMean,
}

/// Internal statistics tracker. One lock keeps `hits + misses == total_gets`
/// true for every snapshot.
pub(crate) struct StatisticsTracker {
    counters: Mutex<Counters>,
}

impl StatisticsTracker {
    pub fn new() -> Self {
        Self {
            counters: Mutex::new(Counters::default()),
        }
    }

    pub fn record_created(&self, count: u64) {
        self.counters.lock().total_created += count;
    }

    pub fn record_destroyed(&self, count: u64) {
        self.counters.lock().total_destroyed += count;
    }

    pub fn record_orphaned(&self, count: u64) {
        self.counters.lock().total_orphaned += count;
    }

    pub fn record_acquire(&self, hit: bool, elapsed: Duration, active: usize, total: usize) {
        let mut c = self.counters.lock();
        c.total_gets += 1;
        if hit {
            c.hits += 1;
        } else {
            c.misses += 1;
        }
        c.acquire.record(elapsed);
        c.peak_active = c.peak_active.max(active);
        c.peak_total = c.peak_total.max(total);
    }

    /// Destroyed resources are counted separately by `record_destroyed`
    pub fn record_release(&self, returned: bool, evicted: bool, elapsed: Duration) {
        let mut c = self.counters.lock();
        if returned {
            c.total_returns += 1;
        }
        if evicted {
            c.capacity_evictions += 1;
        }
        c.release.record(elapsed);
    }

    pub fn observe_total(&self, total: usize) {
        let mut c = self.counters.lock();
        c.peak_total = c.peak_total.max(total);
    }

    pub fn reset(&self) {
        *self.counters.lock() = Counters::default();
    }

    pub fn snapshot(&self, active: usize, available: usize) -> PoolStatisticsSnapshot {
        let c = self.counters.lock();
        PoolStatisticsSnapshot {
            captured_at: SystemTime::now(),
            captured_instant: Instant::now(),
            total_created: c.total_created,
            total_destroyed: c.total_destroyed,
            total_gets: c.total_gets,
            total_returns: c.total_returns,
            hits: c.hits,
            misses: c.misses,
            capacity_evictions: c.capacity_evictions,
            total_orphaned: c.total_orphaned,
            peak_active: c.peak_active,
            peak_total: c.peak_total,
            active,
            available,
            avg_acquire_time: c.acquire.mean(),
            max_acquire_time: c.acquire.max,
            avg_release_time: c.release.mean(),
            max_release_time: c.release.max,
        }
    }
}

impl Default for StatisticsTracker {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn running_mean_matches_arithmetic_mean() {
        let mut mean = RunningMean::default();
        for ms in [10, 20, 30, 40] {
            mean.record(Duration::from_millis(ms));
        }
        assert_eq!(mean.mean(), Duration::from_millis(25));
        assert_eq!(mean.max, Duration::from_millis(40));
    }

    #[test]
    fn hits_and_misses_add_up() {
        let stats = StatisticsTracker::new();
        stats.record_acquire(false, Duration::from_micros(5), 1, 1);
        stats.record_acquire(true, Duration::from_micros(1), 2, 2);
        stats.record_acquire(true, Duration::from_micros(1), 1, 2);

        let snap = stats.snapshot(1, 1);
        assert_eq!(snap.hits + snap.misses, snap.total_gets);
        assert!((snap.hit_rate() - 2.0 / 3.0).abs() < 1e-9);
        assert_eq!(snap.peak_active, 2);
        assert_eq!(snap.peak_total, 2);
    }

    #[test]
    fn empty_tracker_reports_zeroes() {
        let snap = StatisticsTracker::new().snapshot(0, 0);
        assert_eq!(snap.hit_rate(), 0.0);
        assert_eq!(snap.utilization(), 0.0);
        assert_eq!(snap.avg_acquire_time, Duration::ZERO);
    }

    #[test]
    fn release_outcomes_are_counted_separately() {
        let stats = StatisticsTracker::new();
        stats.record_release(true, false, Duration::from_micros(2));
        stats.record_release(false, true, Duration::from_micros(2));
        stats.record_destroyed(1);

        let snap = stats.snapshot(0, 1);
        assert_eq!(snap.total_returns, 1);
        assert_eq!(snap.total_destroyed, 1);
        assert_eq!(snap.capacity_evictions, 1);
        assert_eq!(snap.avg_release_time, Duration::from_micros(2));
    }

    #[test]
    fn reset_clears_peaks() {
        let stats = StatisticsTracker::new();
        stats.record_acquire(false, Duration::ZERO, 3, 3);
        stats.reset();
        let snap = stats.snapshot(0, 0);
        assert_eq!(snap.peak_active, 0);
        assert_eq!(snap.total_gets, 0);
    }

    #[test]
    fn delta_reports_counts_and_percentages() {
        let stats = StatisticsTracker::new();
        stats.record_acquire(false, Duration::from_micros(10), 1, 1);
        let before = stats.snapshot(1, 0);

        stats.record_acquire(true, Duration::from_micros(10), 1, 1);
        stats.record_acquire(true, Duration::from_micros(10), 1, 1);
        let after = stats.snapshot(1, 0);

        let delta = after.delta_since(&before);
        assert_eq!(delta.gets, 2);
        assert_eq!(delta.hits, 2);
        assert_eq!(delta.misses, 0);
        assert_eq!(delta.gets_change_pct, Some(200.0));
        assert_eq!(delta.avg_acquire_change_pct, Some(0.0));
        assert!((delta.hit_rate_change - 200.0 / 3.0).abs() < 1e-6);
    }

    #[test]
    fn export_contains_core_counters() {
        let snap = StatisticsTracker::new().snapshot(2, 3);
        let exported = snap.export();
        assert_eq!(exported.get("active").map(String::as_str), Some("2"));
        assert_eq!(exported.get("available").map(String::as_str), Some("3"));
        assert_eq!(exported.get("hit_rate").map(String::as_str), Some("0.00"));
    }
}
