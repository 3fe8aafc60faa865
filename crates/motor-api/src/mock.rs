//! Scripted [`TelemetryApi`] for tests.

use crate::client::{Snapshot, TelemetryApi};
use crate::error::{ApiError, ApiResult};
use futures_util::future::BoxFuture;
use motor_core::{DashboardStats, Reading};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

/// Recording mock with scripted results.
///
/// Snapshot and stats responses can be delayed to exercise interleavings
/// with the push stream.
#[derive(Debug, Default)]
pub struct MockTelemetryApi {
    snapshot: Mutex<Option<Vec<Reading>>>,
    snapshot_delay: Mutex<Duration>,
    stats: Mutex<Option<DashboardStats>>,
    stats_delay: Mutex<Duration>,
    snapshot_calls: AtomicU32,
    stats_calls: AtomicU32,
    sample_calls: AtomicU32,
}

impl MockTelemetryApi {
    pub fn new() -> Self {
        Self::default()
    }

    /// Subsequent snapshot fetches return these readings. Unset means the
    /// fetch fails.
    pub fn set_snapshot(&self, readings: Vec<Reading>) {
        *self.snapshot.lock() = Some(readings);
    }

    pub fn set_snapshot_delay(&self, delay: Duration) {
        *self.snapshot_delay.lock() = delay;
    }

    /// Subsequent stats fetches return these stats. Unset means the fetch
    /// fails.
    pub fn set_stats(&self, stats: DashboardStats) {
        *self.stats.lock() = Some(stats);
    }

    pub fn set_stats_delay(&self, delay: Duration) {
        *self.stats_delay.lock() = delay;
    }

    pub fn snapshot_calls(&self) -> u32 {
        self.snapshot_calls.load(Ordering::SeqCst)
    }

    pub fn stats_calls(&self) -> u32 {
        self.stats_calls.load(Ordering::SeqCst)
    }

    pub fn sample_calls(&self) -> u32 {
        self.sample_calls.load(Ordering::SeqCst)
    }
}

impl TelemetryApi for MockTelemetryApi {
    fn fetch_snapshot(&self) -> BoxFuture<'_, ApiResult<Snapshot>> {
        self.snapshot_calls.fetch_add(1, Ordering::SeqCst);
        let delay = *self.snapshot_delay.lock();
        Box::pin(async move {
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
            let snapshot = self.snapshot.lock().clone();
            match snapshot {
                Some(readings) => Ok(Snapshot {
                    readings,
                    rejected: 0,
                }),
                None => Err(ApiError::HttpClient("snapshot unavailable".to_string())),
            }
        })
    }

    fn fetch_aggregate_stats(&self) -> BoxFuture<'_, ApiResult<DashboardStats>> {
        self.stats_calls.fetch_add(1, Ordering::SeqCst);
        let delay = *self.stats_delay.lock();
        Box::pin(async move {
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
            let stats = self.stats.lock().clone();
            stats.ok_or_else(|| ApiError::HttpClient("stats unavailable".to_string()))
        })
    }

    fn request_sample(&self) -> BoxFuture<'_, ApiResult<()>> {
        self.sample_calls.fetch_add(1, Ordering::SeqCst);
        Box::pin(async { Ok(()) })
    }
}
