//! HTTP client for the telemetry backend.
//!
//! Three endpoints, all GET:
//! - snapshot: full list of currently known readings
//! - stats: coarse aggregate statistics
//! - sample: asks the device/simulator to emit one reading (body ignored)

use crate::error::{ApiError, ApiResult};
use futures_util::future::BoxFuture;
use motor_core::{DashboardStats, RawReading, Reading};
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Backend endpoint configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
    /// Base URL, e.g. `http://localhost:3001`.
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_snapshot_path")]
    pub snapshot_path: String,
    #[serde(default = "default_stats_path")]
    pub stats_path: String,
    #[serde(default = "default_sample_path")]
    pub sample_path: String,
    /// Per-request timeout (0 = none; the transport's own limits apply).
    #[serde(default)]
    pub timeout_ms: u64,
}

fn default_base_url() -> String {
    "http://localhost:3001".to_string()
}

fn default_snapshot_path() -> String {
    "/api/readings".to_string()
}

fn default_stats_path() -> String {
    "/api/stats".to_string()
}

fn default_sample_path() -> String {
    "/api/motor".to_string()
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            snapshot_path: default_snapshot_path(),
            stats_path: default_stats_path(),
            sample_path: default_sample_path(),
            timeout_ms: 0,
        }
    }
}

impl ApiConfig {
    pub fn timeout(&self) -> Option<Duration> {
        (self.timeout_ms > 0).then(|| Duration::from_millis(self.timeout_ms))
    }
}

/// Validated snapshot plus the number of rows dropped at the boundary.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Snapshot {
    pub readings: Vec<Reading>,
    pub rejected: usize,
}

impl Snapshot {
    /// Validate raw rows. Accepts a bare array or `{"readings": [...]}`.
    pub fn from_json(body: serde_json::Value) -> ApiResult<Self> {
        let rows = match body {
            serde_json::Value::Array(rows) => rows,
            serde_json::Value::Object(mut map) => match map.remove("readings") {
                Some(serde_json::Value::Array(rows)) => rows,
                _ => {
                    return Err(ApiError::UnexpectedShape(
                        "snapshot object has no readings array".to_string(),
                    ))
                }
            },
            other => {
                return Err(ApiError::UnexpectedShape(format!(
                    "snapshot is not an array: {other}"
                )))
            }
        };

        let mut snapshot = Self::default();
        for (idx, row) in rows.into_iter().enumerate() {
            let validated = serde_json::from_value::<RawReading>(row)
                .map_err(|e| e.to_string())
                .and_then(|raw| Reading::try_from(raw).map_err(|e| e.to_string()));
            match validated {
                Ok(reading) => snapshot.readings.push(reading),
                Err(error) => {
                    warn!(idx, %error, "Dropping snapshot row");
                    snapshot.rejected += 1;
                }
            }
        }
        Ok(snapshot)
    }
}

/// External collaborators consumed by the ingestion core.
pub trait TelemetryApi: Send + Sync + 'static {
    fn fetch_snapshot(&self) -> BoxFuture<'_, ApiResult<Snapshot>>;

    fn fetch_aggregate_stats(&self) -> BoxFuture<'_, ApiResult<DashboardStats>>;

    /// Fire-and-forget trigger; only transport failure is reported.
    fn request_sample(&self) -> BoxFuture<'_, ApiResult<()>>;
}

/// reqwest-backed [`TelemetryApi`].
pub struct ApiClient {
    client: Client,
    config: ApiConfig,
}

impl ApiClient {
    pub fn new(config: ApiConfig) -> ApiResult<Self> {
        let mut builder = Client::builder();
        if let Some(timeout) = config.timeout() {
            builder = builder.timeout(timeout);
        }
        let client = builder
            .build()
            .map_err(|e| ApiError::HttpClient(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self { client, config })
    }

    pub fn config(&self) -> &ApiConfig {
        &self.config
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.config.base_url.trim_end_matches('/'), path)
    }

    async fn get(&self, path: &str) -> ApiResult<reqwest::Response> {
        let url = self.url(path);
        debug!(%url, "GET");

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| ApiError::HttpClient(format!("HTTP request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ApiError::Status {
                status: status.as_u16(),
                body,
            });
        }
        Ok(response)
    }

    async fn get_json<T: serde::de::DeserializeOwned>(&self, path: &str) -> ApiResult<T> {
        self.get(path)
            .await?
            .json()
            .await
            .map_err(|e| ApiError::HttpClient(format!("Failed to parse response: {e}")))
    }
}

impl TelemetryApi for ApiClient {
    fn fetch_snapshot(&self) -> BoxFuture<'_, ApiResult<Snapshot>> {
        Box::pin(async move {
            let body: serde_json::Value = self.get_json(&self.config.snapshot_path).await?;
            let snapshot = Snapshot::from_json(body)?;
            info!(
                readings = snapshot.readings.len(),
                rejected = snapshot.rejected,
                "Snapshot fetched"
            );
            Ok(snapshot)
        })
    }

    fn fetch_aggregate_stats(&self) -> BoxFuture<'_, ApiResult<DashboardStats>> {
        Box::pin(async move { self.get_json(&self.config.stats_path).await })
    }

    fn request_sample(&self) -> BoxFuture<'_, ApiResult<()>> {
        Box::pin(async move {
            self.get(&self.config.sample_path).await?;
            debug!("Sample requested");
            Ok(())
        })
    }
}
