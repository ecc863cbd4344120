//! Health monitoring for resource pools

use std::time::Duration;

use crate::pool::PoolObserver;
use crate::statistics::PoolStatisticsSnapshot;
use crate::validation::{
    validate_capacity_usage, validate_memory_leak_risk, validate_performance, validate_pool_state,
    ValidationResult, DEFAULT_CAPACITY_WARNING_THRESHOLD, DEFAULT_LEAK_THRESHOLD,
};

/// Limits used by [`Pool::health_check`](crate::Pool::health_check)
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct HealthThresholds {
    pub capacity_warning: f64,
    pub leak: f64,
    pub max_acquire_time: Duration,
    pub max_release_time: Duration,
}

impl Default for HealthThresholds {
    fn default() -> Self {
        Self {
            capacity_warning: DEFAULT_CAPACITY_WARNING_THRESHOLD,
            leak: DEFAULT_LEAK_THRESHOLD,
            max_acquire_time: Duration::from_millis(10),
            max_release_time: Duration::from_millis(10),
        }
    }
}

/// Health status of a resource pool
///
/// # Examples
///
/// ```
/// use esox_resourcepool::{FnPolicy, HealthThresholds, Pool, PoolConfiguration};
///
/// let pool = Pool::with_configuration(FnPolicy::new(|| 1u8), PoolConfiguration::default()).unwrap();
/// pool.warmup(3).unwrap();
///
/// let health = pool.health_check(&HealthThresholds::default());
/// assert!(health.is_healthy());
/// assert_eq!(health.available_objects, 3);
/// ```
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct HealthCheckResult {
    /// Whether every validator passed
    pub is_healthy: bool,

    /// Number of warnings detected
    pub warning_count: usize,

    /// Active share of live resources (0.0 to 1.0)
    pub utilization: f64,

    pub hit_rate: f64,

    pub available_objects: usize,

    pub active_objects: usize,

    pub total_objects: usize,

    /// Validator failures
    pub errors: Vec<String>,

    /// Advisory messages
    pub warnings: Vec<String>,
}

impl HealthCheckResult {
    /// Run every runtime validator
    pub fn evaluate(
        pool: &impl PoolObserver,
        statistics: &PoolStatisticsSnapshot,
        thresholds: &HealthThresholds,
    ) -> Self {
        let counts = pool.counts();

        let mut combined = ValidationResult::valid();
        combined.merge(validate_pool_state(pool));
        combined.merge(validate_capacity_usage(pool, thresholds.capacity_warning));
        combined.merge(validate_memory_leak_risk(statistics, thresholds.leak));
        combined.merge(validate_performance(
            statistics,
            thresholds.max_acquire_time,
            thresholds.max_release_time,
        ));

        let live = counts.active + counts.available;
        let utilization = if live > 0 {
            counts.active as f64 / live as f64
        } else {
            0.0
        };

        Self {
            is_healthy: combined.is_valid,
            warning_count: combined.warnings.len(),
            utilization,
            hit_rate: statistics.hit_rate(),
            available_objects: counts.available,
            active_objects: counts.active,
            total_objects: counts.total,
            errors: combined.errors,
            warnings: combined.warnings,
        }
    }

    /// Check if the pool is healthy
    pub fn is_healthy(&self) -> bool {
        self.is_healthy
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::policy::FnPolicy;
    use crate::pool::Pool;
    use crate::config::PoolConfiguration;

    #[test]
    fn idle_pool_is_healthy() {
        let pool = Pool::with_configuration(FnPolicy::new(|| 0u32), PoolConfiguration::default()).unwrap();
        pool.warmup(4).unwrap();

        let health = pool.health_check(&HealthThresholds::default());
        assert!(health.is_healthy());
        assert_eq!(health.total_objects, 4);
        assert_eq!(health.utilization, 0.0);
    }

    #[test]
    fn exhausted_pool_is_unhealthy() {
        let pool = Pool::with_configuration(FnPolicy::new(|| 0u32), PoolConfiguration::default()).unwrap();
        let _held = pool.acquire().unwrap();

        let health = pool.health_check(&HealthThresholds::default());
        assert!(!health.is_healthy());
        assert_eq!(health.active_objects, 1);
        assert_eq!(health.utilization, 1.0);
        assert!(health.errors.iter().any(|e| e.contains("no idle resources")));
    }

    #[test]
    fn busy_pool_with_slack_stays_healthy() {
        let pool = Pool::with_configuration(FnPolicy::new(|| 0u32), PoolConfiguration::default()).unwrap();
        let mut held: Vec<_> = (0..5).map(|_| pool.acquire().unwrap()).collect();
        pool.release(held.pop().unwrap()).unwrap();

        let health = pool.health_check(&HealthThresholds::default());
        assert!(health.is_healthy());
        assert!(health.errors.is_empty());
        assert!(health.warnings.iter().any(|w| w.contains("capacity usage")));
    }

    #[test]
    fn disposed_pool_is_unhealthy() {
        let pool = Pool::with_configuration(FnPolicy::new(|| 0u32), PoolConfiguration::default()).unwrap();
        pool.dispose().unwrap();

        let health = pool.health_check(&HealthThresholds::default());
        assert!(!health.is_healthy());
        assert!(health.errors.iter().any(|e| e.contains("disposed")));
    }

    #[test]
    fn unconfigured_pool_reports_warning() {
        let pool = Pool::<u32, FnPolicy<u32>>::new(FnPolicy::new(|| 0u32));
        let health = pool.health_check(&HealthThresholds::default());
        assert!(health.is_healthy());
        assert_eq!(health.warning_count, 1);
    }
}
