//! Pool configuration options

use std::time::Duration;

use crate::errors::{PoolError, PoolResult};
use crate::validation::validate_capacity_configuration;

/// Configuration for resource pool behavior
///
/// # Examples
///
/// ```
/// use esox_resourcepool::PoolConfiguration;
/// use std::time::Duration;
///
/// let config = PoolConfiguration::new()
///     .with_initial_capacity(4)
///     .with_max_capacity(64)
///     .with_idle_timeout(Duration::from_secs(300));
///
/// assert_eq!(config.max_capacity, Some(64));
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PoolConfiguration {
    /// Number of resources the pool is expected to hold after warm-up
    pub initial_capacity: usize,

    /// Upper bound on idle resources; `None` means releases never evict
    pub max_capacity: Option<usize>,

    /// Idle resources kept alive by idle eviction
    pub min_capacity: usize,

    /// Warm up to `initial_capacity` as part of `configure()`
    pub prewarm: bool,

    /// Idle resources older than this are destroyed by `evict_idle()`
    pub idle_timeout: Option<Duration>,

    /// Keep an acquisition record per checkout for leak detection
    pub track_leaks: bool,

    /// Record the caller location of each acquisition
    pub capture_origin: bool,

    /// Number of lifecycle hook failures kept in the history (0 disables it)
    pub failure_history: usize,

    /// Fail releases of unknown resources with `PoolError::ForeignObject`
    pub strict_release: bool,
}

impl Default for PoolConfiguration {
    fn default() -> Self {
        Self {
            initial_capacity: 0,
            max_capacity: Some(100),
            min_capacity: 0,
            prewarm: false,
            idle_timeout: None,
            track_leaks: true,
            capture_origin: false,
            failure_history: 16,
            strict_release: false,
        }
    }
}

impl PoolConfiguration {
    /// Create a new configuration with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Shorthand for the three capacity bounds.
    ///
    /// ```
    /// use esox_resourcepool::PoolConfiguration;
    ///
    /// let config = PoolConfiguration::with_capacities(2, 5, 1);
    /// assert_eq!(config.initial_capacity, 2);
    /// assert_eq!(config.max_capacity, Some(5));
    /// assert_eq!(config.min_capacity, 1);
    /// ```
    pub fn with_capacities(initial: usize, max: usize, min: usize) -> Self {
        Self {
            initial_capacity: initial,
            max_capacity: Some(max),
            min_capacity: min,
            ..Self::default()
        }
    }

    /// Set the initial capacity
    pub fn with_initial_capacity(mut self, capacity: usize) -> Self {
        self.initial_capacity = capacity;
        self
    }

    /// Set the maximum number of idle resources
    pub fn with_max_capacity(mut self, capacity: usize) -> Self {
        self.max_capacity = Some(capacity);
        self
    }

    /// Never destroy resources on release
    pub fn unbounded(mut self) -> Self {
        self.max_capacity = None;
        self
    }

    /// Set the minimum capacity
    pub fn with_min_capacity(mut self, capacity: usize) -> Self {
        self.min_capacity = capacity;
        self
    }

    /// Warm up to the initial capacity during configuration
    pub fn with_prewarm(mut self) -> Self {
        self.prewarm = true;
        self
    }

    /// Set idle timeout for available resources
    pub fn with_idle_timeout(mut self, timeout: Duration) -> Self {
        self.idle_timeout = Some(timeout);
        self
    }

    /// Disable acquisition records
    pub fn without_leak_tracking(mut self) -> Self {
        self.track_leaks = false;
        self
    }

    /// Record where each resource was acquired
    pub fn with_origin_capture(mut self) -> Self {
        self.track_leaks = true;
        self.capture_origin = true;
        self
    }

    /// Set how many hook failures are remembered
    pub fn with_failure_history(mut self, len: usize) -> Self {
        self.failure_history = len;
        self
    }

    /// Reject foreign releases with an error instead of returning `false`
    pub fn with_strict_release(mut self) -> Self {
        self.strict_release = true;
        self
    }

    /// Whether releases are capped by `max_capacity`
    pub fn is_bounded(&self) -> bool {
        self.max_capacity.is_some()
    }

    /// Check the capacity bounds. Advisory warnings do not fail validation.
    pub fn validate(&self) -> PoolResult<()> {
        let result = validate_capacity_configuration(
            self.initial_capacity,
            self.max_capacity,
            self.min_capacity,
        );

        if result.is_valid {
            Ok(())
        } else {
            Err(PoolError::InvalidArgument(result.errors.join("; ")))
        }
    }
}
