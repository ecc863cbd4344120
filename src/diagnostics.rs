//! Leak detection and lifecycle hook failure history

use std::collections::VecDeque;
use std::panic::Location;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Weak};
use std::time::{Duration, Instant, SystemTime};

use dashmap::DashMap;
use parking_lot::Mutex;

use crate::errors::{HookError, HookPhase};
use crate::lease::{Handle, LeaseToken};

/// Metadata kept for every checked-out resource
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AcquisitionRecord {
    pub handle: Handle,

    /// Monotonic acquisition time, used for ages
    pub acquired_at: Instant,

    /// Wall-clock acquisition time, used for reports
    pub acquired_at_wall: SystemTime,

    /// Caller location of the acquisition, when origin capture is enabled
    pub origin_trace: Option<String>,
}

impl AcquisitionRecord {
    /// How long the resource has been checked out
    pub fn age(&self) -> Duration {
        self.acquired_at.elapsed()
    }
}

/// A lifecycle hook failure
#[derive(Debug, Clone)]
pub struct HookFailure {
    pub phase: HookPhase,
    pub error: HookError,
    pub at: SystemTime,
}

/// Receiver for hook failures, injected into a pool with
/// [`Pool::with_failure_sink`](crate::Pool::with_failure_sink).
pub trait FailureSink: Send + Sync {
    fn record(&self, pool_id: u64, failure: &HookFailure);
}

struct LeaseEntry {
    record: AcquisitionRecord,
    token: Weak<LeaseToken>,
}

/// Internal diagnostics tracker
pub(crate) struct DiagnosticsTracker {
    track_leaks: AtomicBool,
    capture_origin: AtomicBool,
    leases: DashMap<u64, LeaseEntry>,
    failures: Mutex<VecDeque<HookFailure>>,
    history_limit: AtomicUsize,
}

impl DiagnosticsTracker {
    pub fn new(track_leaks: bool, capture_origin: bool, history_limit: usize) -> Self {
        Self {
            track_leaks: AtomicBool::new(track_leaks),
            capture_origin: AtomicBool::new(capture_origin),
            leases: DashMap::new(),
            failures: Mutex::new(VecDeque::with_capacity(history_limit)),
            history_limit: AtomicUsize::new(history_limit),
        }
    }

    /// Apply new settings. Records already kept stay until released.
    pub fn reconfigure(&self, track_leaks: bool, capture_origin: bool, history_limit: usize) {
        self.track_leaks.store(track_leaks, Ordering::Relaxed);
        self.capture_origin.store(capture_origin, Ordering::Relaxed);
        self.history_limit.store(history_limit, Ordering::Relaxed);

        let mut failures = self.failures.lock();
        while failures.len() > history_limit {
            failures.pop_front();
        }
    }

    pub fn track(&self, handle: Handle, token: &Arc<LeaseToken>, origin: &'static Location<'static>) {
        if !self.track_leaks.load(Ordering::Relaxed) {
            return;
        }

        let record = AcquisitionRecord {
            handle,
            acquired_at: Instant::now(),
            acquired_at_wall: SystemTime::now(),
            origin_trace: self
                .capture_origin
                .load(Ordering::Relaxed)
                .then(|| origin.to_string()),
        };

        self.leases.insert(
            handle.slot(),
            LeaseEntry {
                record,
                token: Arc::downgrade(token),
            },
        );
    }

    pub fn untrack(&self, handle: Handle) {
        self.leases
            .remove_if(&handle.slot(), |_, entry| entry.record.handle == handle);
    }

    #[cfg(test)]
    pub fn tracked(&self) -> usize {
        self.leases.len()
    }

    /// Records older than `threshold`, oldest first. Records whose token is
    /// gone are pruned.
    pub fn scan(&self, threshold: Duration) -> Vec<AcquisitionRecord> {
        let mut suspects = Vec::new();

        self.leases.retain(|_, entry| {
            if entry.token.strong_count() == 0 {
                return false;
            }
            if entry.record.age() > threshold {
                suspects.push(entry.record.clone());
            }
            true
        });

        suspects.sort_by_key(|record| record.acquired_at);
        suspects
    }

    pub fn record_failure(&self, phase: HookPhase, error: HookError) -> HookFailure {
        let failure = HookFailure {
            phase,
            error,
            at: SystemTime::now(),
        };

        let limit = self.history_limit.load(Ordering::Relaxed);
        if limit > 0 {
            let mut failures = self.failures.lock();
            while failures.len() >= limit {
                failures.pop_front();
            }
            failures.push_back(failure.clone());
        }

        failure
    }

    pub fn failures(&self) -> Vec<HookFailure> {
        self.failures.lock().iter().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::BoxError;

    fn handle(slot: u64, generation: u64) -> Handle {
        Handle::new(7, slot, generation)
    }

    #[test]
    fn scan_reports_old_records_only() {
        let diag = DiagnosticsTracker::new(true, false, 4);
        let token = Arc::new(LeaseToken::new(handle(1, 1)));
        diag.track(handle(1, 1), &token, Location::caller());

        assert!(diag.scan(Duration::from_secs(60)).is_empty());

        std::thread::sleep(Duration::from_millis(2));
        let suspects = diag.scan(Duration::ZERO);
        assert_eq!(suspects.len(), 1);
        assert_eq!(suspects[0].handle, handle(1, 1));
        assert!(suspects[0].origin_trace.is_none());
    }

    #[test]
    fn dropped_token_record_is_pruned() {
        let diag = DiagnosticsTracker::new(true, false, 4);
        let token = Arc::new(LeaseToken::new(handle(3, 1)));
        diag.track(handle(3, 1), &token, Location::caller());
        drop(token);

        assert!(diag.scan(Duration::ZERO).is_empty());
        assert_eq!(diag.tracked(), 0);
    }

    #[test]
    fn untrack_ignores_stale_generation() {
        let diag = DiagnosticsTracker::new(true, false, 4);
        let token = Arc::new(LeaseToken::new(handle(2, 5)));
        diag.track(handle(2, 5), &token, Location::caller());

        diag.untrack(handle(2, 4));
        assert_eq!(diag.tracked(), 1);
        diag.untrack(handle(2, 5));
        assert_eq!(diag.tracked(), 0);
    }

    #[test]
    fn origin_is_recorded_when_enabled() {
        let diag = DiagnosticsTracker::new(true, true, 0);
        let token = Arc::new(LeaseToken::new(handle(1, 1)));
        diag.track(handle(1, 1), &token, Location::caller());

        std::thread::sleep(Duration::from_millis(2));
        let suspects = diag.scan(Duration::ZERO);
        let origin = suspects[0].origin_trace.clone().unwrap();
        assert!(origin.contains("diagnostics.rs"));
    }

    #[test]
    fn disabled_tracking_keeps_nothing() {
        let diag = DiagnosticsTracker::new(false, false, 0);
        let token = Arc::new(LeaseToken::new(handle(1, 1)));
        diag.track(handle(1, 1), &token, Location::caller());
        assert_eq!(diag.tracked(), 0);
    }

    #[test]
    fn failure_history_is_bounded() {
        let diag = DiagnosticsTracker::new(true, false, 2);
        for msg in ["first", "second", "third"] {
            let err: BoxError = msg.into();
            diag.record_failure(HookPhase::Return, Arc::from(err));
        }

        let history = diag.failures();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].error.to_string(), "second");
        assert_eq!(history[1].error.to_string(), "third");
    }

    #[test]
    fn reconfigure_trims_history() {
        let diag = DiagnosticsTracker::new(true, false, 4);
        for msg in ["a", "b", "c"] {
            let err: BoxError = msg.into();
            diag.record_failure(HookPhase::Destroy, Arc::from(err));
        }

        diag.reconfigure(false, false, 1);
        let history = diag.failures();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].error.to_string(), "c");

        let token = Arc::new(LeaseToken::new(handle(1, 1)));
        diag.track(handle(1, 1), &token, Location::caller());
        assert_eq!(diag.tracked(), 0);
    }

    #[test]
    fn zero_history_records_nothing() {
        let diag = DiagnosticsTracker::new(true, false, 0);
        let err: BoxError = "boom".into();
        let failure = diag.record_failure(HookPhase::Create, Arc::from(err));
        assert_eq!(failure.phase, HookPhase::Create);
        assert!(diag.failures().is_empty());
    }
}
