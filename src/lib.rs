//! # EsoxSolutions.ResourcePool
//!
//! Thread-safe pool of reusable resources with pluggable lifecycle
//! policies, usage statistics, leak diagnostics and validation.
//!
//! ## Features
//!
//! - Bounded or unbounded pools with LIFO reuse of idle resources
//! - Lifecycle policies: create, activate, reset and destroy hooks
//! - Explicit release, RAII guards and timed leases
//! - Hit/miss, latency and peak statistics with snapshot deltas
//! - Leak detection for long-held and dropped checkouts
//! - Pure validation rules and aggregated health checks
//! - Prometheus metrics export
//!
//! ## Quick Start
//!
//! ```rust
//! use esox_resourcepool::{FnPolicy, Pool, PoolConfiguration};
//!
//! let policy = FnPolicy::new(String::new).with_reset(|s: &mut String| s.clear());
//! let pool = Pool::with_configuration(policy, PoolConfiguration::default()).unwrap();
//!
//! let mut line = pool.acquire().unwrap();
//! line.push_str("hello");
//! pool.release(line).unwrap();
//!
//! // The same buffer comes back, already reset
//! let line = pool.acquire().unwrap();
//! assert!(line.is_empty());
//! assert_eq!(pool.snapshot().hits, 1);
//! ```

mod config;
mod diagnostics;
mod errors;
mod health;
mod lease;
mod policy;
mod pool;
pub mod report;
mod scheduler;
mod statistics;
pub mod validation;

pub use config::PoolConfiguration;
pub use diagnostics::{AcquisitionRecord, FailureSink, HookFailure};
pub use errors::{BoxError, HookError, HookPhase, PoolError, PoolResult, ReleaseError};
pub use health::{HealthCheckResult, HealthThresholds};
pub use lease::{Handle, PoolGuard, Pooled, TimedLease};
pub use policy::{FnPolicy, LifecyclePolicy};
pub use pool::{Pool, PoolCounts, PoolObserver, PoolState};
pub use report::{format_failure_history, format_leak_report};
#[cfg(feature = "metrics")]
pub use report::PrometheusExporter;
pub use scheduler::{DeferredTask, ScheduledTask, Scheduler, TokioScheduler};
pub use statistics::{PoolStatisticsSnapshot, StatisticsDelta};
pub use validation::ValidationResult;
