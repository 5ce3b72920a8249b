// Lock-guarded operational counters
//
// Two independent lock domains: API-request state and post-scan statistics.
// They are never held at the same time, and no I/O happens under either.

use chrono::{DateTime, Local};
use indexmap::IndexMap;
use serde::Serialize;
use std::sync::{Mutex, MutexGuard, PoisonError};

/// State shared by everything that talks to external APIs.
#[derive(Debug, Clone)]
pub struct ApiRequestState {
    /// Seconds callers must wait before the next API request
    pub backoff: f64,
    /// Remaining API quota; `-1` until the first response reports it
    pub quota: i64,
    /// Requests made per site, in first-seen order
    pub calls_per_site: IndexMap<String, u64>,
    /// Consecutive metasmoke failures; reset on the first success
    pub service_failures: u32,
    pub last_ping: DateTime<Local>,
}

impl Default for ApiRequestState {
    fn default() -> Self {
        Self {
            backoff: 0.0,
            quota: -1,
            calls_per_site: IndexMap::new(),
            service_failures: 0,
            last_ping: Local::now(),
        }
    }
}

/// Post-scan statistics snapshot.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct ScanStats {
    pub posts_scanned: u64,
    /// Cumulative scan time in seconds
    pub scan_time: f64,
}

impl ScanStats {
    /// Average seconds per scanned post, or 0 before the first scan.
    pub fn average_scan_time(&self) -> f64 {
        if self.posts_scanned > 0 {
            self.scan_time / self.posts_scanned as f64
        } else {
            0.0
        }
    }
}

/// Counters owned by the status registry.
#[derive(Debug, Default)]
pub struct Counters {
    api_request: Mutex<ApiRequestState>,
    scan_stats: Mutex<ScanStats>,
}

/// A panic while holding a counter lock cannot leave a scalar half-written,
/// so a poisoned lock is still safe to use.
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl Counters {
    pub fn new() -> Self {
        Self::default()
    }

    // Scan statistics

    /// Record one scanned post that took `seconds` to scan.
    ///
    /// `seconds` must not be negative.
    pub fn record_scan(&self, seconds: f64) {
        let mut stats = lock(&self.scan_stats);
        stats.posts_scanned += 1;
        stats.scan_time += seconds;
    }

    pub fn scan_stats(&self) -> ScanStats {
        *lock(&self.scan_stats)
    }

    /// Zero the scan statistics, returning the values they had.
    pub fn reset_scan_stats(&self) -> ScanStats {
        std::mem::take(&mut *lock(&self.scan_stats))
    }

    // API request state

    /// Set the API backoff. The registry never sleeps; callers honor it.
    pub fn set_backoff(&self, seconds: f64) {
        lock(&self.api_request).backoff = seconds;
    }

    pub fn backoff(&self) -> f64 {
        lock(&self.api_request).backoff
    }

    pub fn set_api_quota(&self, quota: i64) {
        lock(&self.api_request).quota = quota;
    }

    pub fn api_quota(&self) -> i64 {
        lock(&self.api_request).quota
    }

    /// Count one API request for `site`, returning the new total for it.
    pub fn record_api_call(&self, site: &str) -> u64 {
        let mut api = lock(&self.api_request);
        let calls = api.calls_per_site.entry(site.to_string()).or_insert(0);
        *calls += 1;
        *calls
    }

    pub fn api_calls(&self, site: &str) -> u64 {
        lock(&self.api_request)
            .calls_per_site
            .get(site)
            .copied()
            .unwrap_or(0)
    }

    /// Extend the current failure streak, returning its new length.
    pub fn record_service_failure(&self) -> u32 {
        let mut api = lock(&self.api_request);
        api.service_failures += 1;
        api.service_failures
    }

    pub fn reset_service_failures(&self) {
        lock(&self.api_request).service_failures = 0;
    }

    pub fn service_failures(&self) -> u32 {
        lock(&self.api_request).service_failures
    }

    /// Note a successful ping to metasmoke.
    pub fn record_ping(&self) {
        lock(&self.api_request).last_ping = Local::now();
    }

    pub fn last_ping(&self) -> DateTime<Local> {
        lock(&self.api_request).last_ping
    }

    /// Copy of the whole API-request group, taken under one lock.
    pub fn api_request_snapshot(&self) -> ApiRequestState {
        lock(&self.api_request).clone()
    }

    /// Log a summary of both counter groups.
    pub fn log_summary(&self) {
        let scan = self.scan_stats();
        let api = self.api_request_snapshot();
        tracing::info!(
            "Scan stats: {} posts in {:.2}s (avg: {:.4}s per post)",
            scan.posts_scanned,
            scan.scan_time,
            scan.average_scan_time()
        );
        tracing::info!(
            "API: quota {}, backoff {}s, {} sites, {} consecutive metasmoke failures",
            api.quota,
            api.backoff,
            api.calls_per_site.len(),
            api.service_failures
        );
    }
}
