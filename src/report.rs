//! Human-readable reports and metrics export

use std::fmt;
use std::fmt::Write as _;

use crate::diagnostics::{AcquisitionRecord, HookFailure};
use crate::health::HealthCheckResult;
use crate::statistics::{PoolStatisticsSnapshot, StatisticsDelta};

impl fmt::Display for PoolStatisticsSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Pool statistics")?;
        writeln!(
            f,
            "  resources:    {} active / {} available (peak {} active, {} total)",
            self.active, self.available, self.peak_active, self.peak_total
        )?;
        writeln!(
            f,
            "  acquisitions: {} (hits {}, misses {}, hit rate {:.1}%)",
            self.total_gets,
            self.hits,
            self.misses,
            self.hit_rate() * 100.0
        )?;
        writeln!(
            f,
            "  lifecycle:    {} created, {} returned, {} destroyed ({} capacity evictions, {} orphaned)",
            self.total_created,
            self.total_returns,
            self.total_destroyed,
            self.capacity_evictions,
            self.total_orphaned
        )?;
        write!(
            f,
            "  latency:      acquire avg {:?} (max {:?}), release avg {:?} (max {:?})",
            self.avg_acquire_time, self.max_acquire_time, self.avg_release_time, self.max_release_time
        )
    }
}

fn signed(value: i64) -> String {
    if value > 0 {
        format!("+{}", value)
    } else {
        value.to_string()
    }
}

fn percent(change: Option<f64>) -> String {
    match change {
        Some(pct) => format!("{:+.1}%", pct),
        None => "n/a".to_string(),
    }
}

impl fmt::Display for StatisticsDelta {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Statistics change over {:?}", self.interval)?;
        writeln!(
            f,
            "  acquisitions: {} ({}), hits {}, misses {}",
            signed(self.gets),
            percent(self.gets_change_pct),
            signed(self.hits),
            signed(self.misses)
        )?;
        writeln!(
            f,
            "  lifecycle:    {} created, {} returned, {} destroyed",
            signed(self.created),
            signed(self.returns),
            signed(self.destroyed)
        )?;
        writeln!(
            f,
            "  resources:    {} active, {} available, hit rate {:+.1} pp",
            signed(self.active),
            signed(self.available),
            self.hit_rate_change
        )?;
        write!(
            f,
            "  latency:      acquire {}, release {}",
            percent(self.avg_acquire_change_pct),
            percent(self.avg_release_change_pct)
        )
    }
}

impl fmt::Display for HealthCheckResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: {} active / {} available, utilization {:.1}%, hit rate {:.1}%",
            if self.is_healthy { "healthy" } else { "unhealthy" },
            self.active_objects,
            self.available_objects,
            self.utilization * 100.0,
            self.hit_rate * 100.0
        )?;
        for error in &self.errors {
            write!(f, "\n  error: {}", error)?;
        }
        for warning in &self.warnings {
            write!(f, "\n  warning: {}", warning)?;
        }
        Ok(())
    }
}

/// One line per suspected leak, oldest first
///
/// # Examples
///
/// ```
/// use esox_resourcepool::report::format_leak_report;
///
/// assert_eq!(format_leak_report(&[]), "No potential leaks");
/// ```
pub fn format_leak_report(records: &[AcquisitionRecord]) -> String {
    if records.is_empty() {
        return "No potential leaks".to_string();
    }

    let mut out = format!("{} potential leak(s)", records.len());
    for record in records {
        let _ = write!(out, "\n  {} checked out for {:?}", record.handle, record.age());
        if let Some(origin) = &record.origin_trace {
            let _ = write!(out, " at {}", origin);
        }
    }
    out
}

/// One line per recorded lifecycle hook failure
pub fn format_failure_history(failures: &[HookFailure]) -> String {
    if failures.is_empty() {
        return "No lifecycle hook failures".to_string();
    }

    let mut out = format!("{} lifecycle hook failure(s)", failures.len());
    for failure in failures {
        let ago = failure.at.elapsed().unwrap_or_default();
        let _ = write!(out, "\n  {} failed {:?} ago: {}", failure.phase, ago, failure.error);
    }
    out
}

#[cfg(feature = "metrics")]
pub use self::prometheus_export::PrometheusExporter;

#[cfg(feature = "metrics")]
mod prometheus_export {
    use prometheus::{Encoder, Gauge, IntGauge, Opts, Registry, TextEncoder};

    use crate::statistics::PoolStatisticsSnapshot;

    /// Publishes snapshots as Prometheus gauges labelled with the pool name
    ///
    /// # Examples
    ///
    /// ```
    /// use esox_resourcepool::{FnPolicy, Pool, PoolConfiguration};
    /// use esox_resourcepool::report::PrometheusExporter;
    /// use prometheus::Registry;
    ///
    /// let pool = Pool::with_configuration(FnPolicy::new(|| 0u8), PoolConfiguration::default()).unwrap();
    /// let _held = pool.acquire().unwrap();
    ///
    /// let registry = Registry::new();
    /// let exporter = PrometheusExporter::new("buffers").unwrap();
    /// exporter.register(&registry).unwrap();
    /// exporter.update(&pool.snapshot());
    ///
    /// let output = PrometheusExporter::encode(&registry).unwrap();
    /// assert!(output.contains("resourcepool_active{pool=\"buffers\"} 1"));
    /// ```
    pub struct PrometheusExporter {
        active: IntGauge,
        available: IntGauge,
        created: IntGauge,
        destroyed: IntGauge,
        gets: IntGauge,
        returns: IntGauge,
        orphaned: IntGauge,
        hit_rate: Gauge,
        avg_acquire_seconds: Gauge,
        avg_release_seconds: Gauge,
    }

    fn int_gauge(name: &str, help: &str, pool_name: &str) -> prometheus::Result<IntGauge> {
        IntGauge::with_opts(Opts::new(name, help).const_label("pool", pool_name))
    }

    fn gauge(name: &str, help: &str, pool_name: &str) -> prometheus::Result<Gauge> {
        Gauge::with_opts(Opts::new(name, help).const_label("pool", pool_name))
    }

    impl PrometheusExporter {
        pub fn new(pool_name: &str) -> prometheus::Result<Self> {
            Ok(Self {
                active: int_gauge("resourcepool_active", "Checked-out resources", pool_name)?,
                available: int_gauge("resourcepool_available", "Idle resources", pool_name)?,
                created: int_gauge("resourcepool_created", "Resources created", pool_name)?,
                destroyed: int_gauge("resourcepool_destroyed", "Resources destroyed", pool_name)?,
                gets: int_gauge("resourcepool_acquisitions", "Successful acquisitions", pool_name)?,
                returns: int_gauge("resourcepool_returns", "Releases back into the pool", pool_name)?,
                orphaned: int_gauge("resourcepool_orphaned", "Checkouts dropped without release", pool_name)?,
                hit_rate: gauge("resourcepool_hit_rate", "Share of acquisitions served from idle resources", pool_name)?,
                avg_acquire_seconds: gauge("resourcepool_acquire_seconds_avg", "Average acquire latency", pool_name)?,
                avg_release_seconds: gauge("resourcepool_release_seconds_avg", "Average release latency", pool_name)?,
            })
        }

        pub fn register(&self, registry: &Registry) -> prometheus::Result<()> {
            registry.register(Box::new(self.active.clone()))?;
            registry.register(Box::new(self.available.clone()))?;
            registry.register(Box::new(self.created.clone()))?;
            registry.register(Box::new(self.destroyed.clone()))?;
            registry.register(Box::new(self.gets.clone()))?;
            registry.register(Box::new(self.returns.clone()))?;
            registry.register(Box::new(self.orphaned.clone()))?;
            registry.register(Box::new(self.hit_rate.clone()))?;
            registry.register(Box::new(self.avg_acquire_seconds.clone()))?;
            registry.register(Box::new(self.avg_release_seconds.clone()))?;
            Ok(())
        }

        pub fn update(&self, snapshot: &PoolStatisticsSnapshot) {
            self.active.set(snapshot.active as i64);
            self.available.set(snapshot.available as i64);
            self.created.set(snapshot.total_created as i64);
            self.destroyed.set(snapshot.total_destroyed as i64);
            self.gets.set(snapshot.total_gets as i64);
            self.returns.set(snapshot.total_returns as i64);
            self.orphaned.set(snapshot.total_orphaned as i64);
            self.hit_rate.set(snapshot.hit_rate());
            self.avg_acquire_seconds.set(snapshot.avg_acquire_time.as_secs_f64());
            self.avg_release_seconds.set(snapshot.avg_release_time.as_secs_f64());
        }

        /// Render a registry in the Prometheus text exposition format
        pub fn encode(registry: &Registry) -> prometheus::Result<String> {
            let mut buffer = Vec::new();
            TextEncoder::new().encode(&registry.gather(), &mut buffer)?;
            String::from_utf8(buffer).map_err(|err| prometheus::Error::Msg(err.to_string()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PoolConfiguration;
    use crate::health::HealthThresholds;
    use crate::policy::FnPolicy;
    use crate::pool::Pool;
    use std::time::Duration;

    fn busy_pool() -> Pool<u16, FnPolicy<u16>> {
        let pool = Pool::with_configuration(
            FnPolicy::new(|| 5u16),
            PoolConfiguration::default().with_origin_capture(),
        )
        .unwrap();
        pool.warmup(2).unwrap();
        pool
    }

    #[test]
    fn snapshot_report_lists_counters() {
        let pool = busy_pool();
        let item = pool.acquire().unwrap();
        pool.release(item).unwrap();

        let report = pool.snapshot().to_string();
        assert!(report.starts_with("Pool statistics"));
        assert!(report.contains("0 active / 2 available"));
        assert!(report.contains("hit rate 100.0%"));
    }

    #[test]
    fn delta_report_shows_signed_changes() {
        let pool = busy_pool();
        let before = pool.snapshot();
        let _held = pool.acquire().unwrap();
        let report = pool.snapshot().delta_since(&before).to_string();

        assert!(report.contains("acquisitions: +1 (n/a)"));
        assert!(report.contains("+1 active, -1 available"));
    }

    #[test]
    fn leak_report_includes_origin() {
        let pool = busy_pool();
        let _held = pool.acquire().unwrap();
        std::thread::sleep(Duration::from_millis(2));

        let report = format_leak_report(&pool.potential_leaks(Duration::from_millis(1)));
        assert!(report.starts_with("1 potential leak(s)"));
        assert!(report.contains("report.rs"));
    }

    #[test]
    fn failure_report_names_phase() {
        let policy: FnPolicy<u8> = FnPolicy::fallible(|| Err("no device".into()));
        let pool = Pool::with_configuration(policy, PoolConfiguration::default()).unwrap();
        let _ = pool.acquire();

        let report = format_failure_history(&pool.exception_history());
        assert!(report.starts_with("1 lifecycle hook failure(s)"));
        assert!(report.contains("create failed"));
        assert!(report.contains("no device"));
        assert_eq!(format_failure_history(&[]), "No lifecycle hook failures");
    }

    #[test]
    fn health_report_lists_errors() {
        let pool = busy_pool();
        let _a = pool.acquire().unwrap();
        let _b = pool.acquire().unwrap();

        let report = pool.health_check(&HealthThresholds::default()).to_string();
        assert!(report.starts_with("unhealthy: 2 active / 0 available"));
        assert!(report.contains("error: no idle resources left"));
    }
}
