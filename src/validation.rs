//! Configuration and runtime validation rules.
//!
//! Every function here is pure: it inspects a configuration, a pool or a
//! statistics snapshot and returns a [`ValidationResult`]. Nothing is ever
//! raised or mutated.

use std::fmt;
use std::time::Duration;

use crate::pool::{PoolObserver, PoolState};
use crate::statistics::PoolStatisticsSnapshot;

/// Default utilization at which capacity usage is flagged
pub const DEFAULT_CAPACITY_WARNING_THRESHOLD: f64 = 0.8;

/// Default utilization at which a leak is suspected
pub const DEFAULT_LEAK_THRESHOLD: f64 = 0.9;

/// Acquisitions needed before usage ratios and hit rates are judged
pub const MIN_MEANINGFUL_GETS: u64 = 100;

/// Hit rate below which a busy pool is considered undersized
pub const MIN_HEALTHY_HIT_RATE: f64 = 0.5;

const SMALL_MAX_CAPACITY: usize = 10;
const LARGE_MAX_CAPACITY: usize = 100_000;

/// Outcome of a validation rule.
///
/// `warnings` are advisory and never make a result invalid.
///
/// # Examples
///
/// ```
/// use esox_resourcepool::validation::validate_capacity_configuration;
///
/// let result = validate_capacity_configuration(4, Some(2), 0);
/// assert!(!result.is_valid);
/// assert_eq!(result.errors.len(), 1);
///
/// let result = validate_capacity_configuration(2, Some(5), 0);
/// assert!(result.is_valid);
/// assert_eq!(result.warnings.len(), 1);
/// ```
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct ValidationResult {
    pub is_valid: bool,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

impl ValidationResult {
    pub fn valid() -> Self {
        Self {
            is_valid: true,
            errors: Vec::new(),
            warnings: Vec::new(),
        }
    }

    pub fn error(&mut self, message: impl Into<String>) {
        self.is_valid = false;
        self.errors.push(message.into());
    }

    pub fn warn(&mut self, message: impl Into<String>) {
        self.warnings.push(message.into());
    }

    /// Fold another result into this one
    pub fn merge(&mut self, other: ValidationResult) {
        self.is_valid &= other.is_valid;
        self.errors.extend(other.errors);
        self.warnings.extend(other.warnings);
    }
}

impl Default for ValidationResult {
    fn default() -> Self {
        Self::valid()
    }
}

impl fmt::Display for ValidationResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_valid {
            write!(f, "valid")?;
        } else {
            write!(f, "invalid ({} error(s))", self.errors.len())?;
        }
        for error in &self.errors {
            write!(f, "\n  error: {}", error)?;
        }
        for warning in &self.warnings {
            write!(f, "\n  warning: {}", warning)?;
        }
        Ok(())
    }
}

fn check_ratio(result: &mut ValidationResult, name: &str, value: f64) -> bool {
    if value > 0.0 && value <= 1.0 {
        true
    } else {
        result.error(format!("{} must be within (0, 1], got {}", name, value));
        false
    }
}

/// Check `min <= initial <= max`. Unusually small or large maxima only warn.
pub fn validate_capacity_configuration(
    initial: usize,
    max: Option<usize>,
    min: usize,
) -> ValidationResult {
    let mut result = ValidationResult::valid();

    if initial < min {
        result.error(format!(
            "initial_capacity ({}) must be at least min_capacity ({})",
            initial, min
        ));
    }

    if let Some(max) = max {
        if max < initial {
            result.error(format!(
                "max_capacity ({}) must be at least initial_capacity ({})",
                max, initial
            ));
        }
        if max < SMALL_MAX_CAPACITY {
            result.warn(format!(
                "max_capacity ({}) is unusually small; releases will often destroy resources",
                max
            ));
        } else if max > LARGE_MAX_CAPACITY {
            result.warn(format!(
                "max_capacity ({}) is unusually large; idle resources may hold a lot of memory",
                max
            ));
        }
    }

    result
}

/// Check the lifecycle state and that the pool's own total matches its
/// collections. A mismatch means internal corruption.
pub fn validate_pool_state(pool: &impl PoolObserver) -> ValidationResult {
    let counts = pool.counts();
    let mut result = ValidationResult::valid();

    match counts.state {
        PoolState::Disposed => result.error("pool has been disposed"),
        PoolState::Uninitialized => result.warn("pool has not been configured yet"),
        PoolState::Active => {}
    }

    if counts.total != counts.active + counts.available {
        result.error(format!(
            "total ({}) does not match active ({}) + available ({})",
            counts.total, counts.active, counts.available
        ));
    }

    result
}

/// Flag pools that are close to running dry. High usage is a warning; no
/// idle resource at all is an error.
pub fn validate_capacity_usage(pool: &impl PoolObserver, warning_threshold: f64) -> ValidationResult {
    let counts = pool.counts();
    let mut result = ValidationResult::valid();
    if !check_ratio(&mut result, "warning threshold", warning_threshold) {
        return result;
    }

    let total = counts.active + counts.available;
    if total == 0 {
        return result;
    }

    let usage = counts.active as f64 / total as f64;
    if usage >= warning_threshold {
        result.warn(format!(
            "capacity usage {:.1}% is at or above {:.1}%",
            usage * 100.0,
            warning_threshold * 100.0
        ));
    }
    if counts.available == 0 && counts.active > 0 {
        result.error("no idle resources left; every resource is checked out");
    }

    result
}

/// Flag usage patterns that suggest missing releases or an undersized pool.
///
/// Ratios are only judged after [`MIN_MEANINGFUL_GETS`] acquisitions.
pub fn validate_memory_leak_risk(
    statistics: &PoolStatisticsSnapshot,
    leak_threshold: f64,
) -> ValidationResult {
    let mut result = ValidationResult::valid();
    if !check_ratio(&mut result, "leak threshold", leak_threshold) {
        return result;
    }

    if statistics.total_orphaned > 0 {
        result.error(format!(
            "{} checkout(s) were dropped without being released",
            statistics.total_orphaned
        ));
    }

    if statistics.total_gets <= MIN_MEANINGFUL_GETS {
        return result;
    }

    let utilization = statistics.utilization();
    if statistics.total() > 0 && utilization >= leak_threshold {
        result.error(format!(
            "{} of {} resources still checked out after {} acquisitions; possible leak",
            statistics.active,
            statistics.total(),
            statistics.total_gets
        ));
    }

    let hit_rate = statistics.hit_rate();
    if hit_rate < MIN_HEALTHY_HIT_RATE {
        result.error(format!(
            "hit rate {:.1}% after {} acquisitions; pool is undersized or thrashing",
            hit_rate * 100.0,
            statistics.total_gets
        ));
    }

    result
}

/// Flag average acquire or release latency above the given limits
pub fn validate_performance(
    statistics: &PoolStatisticsSnapshot,
    max_get_time: Duration,
    max_return_time: Duration,
) -> ValidationResult {
    let mut result = ValidationResult::valid();

    if statistics.avg_acquire_time > max_get_time {
        result.error(format!(
            "average acquire time {:?} exceeds {:?}",
            statistics.avg_acquire_time, max_get_time
        ));
    }
    if statistics.avg_release_time > max_return_time {
        result.error(format!(
            "average release time {:?} exceeds {:?}",
            statistics.avg_release_time, max_return_time
        ));
    }

    result
}
