//! Application configuration.

use crate::error::{AppError, AppResult};
use motor_api::ApiConfig;
use motor_dashboard::DashboardConfig;
use motor_ingest::IngestConfig;
use motor_ws::ConnectionConfig;
use serde::Deserialize;
use std::path::Path;

/// Default config path when neither `--config` nor `MOTOR_CONFIG` is set.
pub const DEFAULT_CONFIG_PATH: &str = "config/default.toml";

/// Top-level configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppConfig {
    /// Backend HTTP endpoints.
    #[serde(default)]
    pub api: ApiConfig,
    /// Push channel.
    #[serde(default)]
    pub websocket: WsConfig,
    /// Orchestrator and buffer settings.
    #[serde(default)]
    pub ingest: IngestConfig,
    /// Dashboard server.
    #[serde(default)]
    pub dashboard: DashboardConfig,
}

/// Push channel configuration subset.
#[derive(Debug, Clone, Deserialize)]
pub struct WsConfig {
    /// WebSocket URL of the push channel.
    #[serde(default = "default_ws_url")]
    pub url: String,
    /// Maximum reconnection attempts (0 = infinite).
    #[serde(default)]
    pub max_reconnect_attempts: u32,
    /// Base delay for reconnection backoff (ms).
    #[serde(default = "default_reconnect_base_delay_ms")]
    pub reconnect_base_delay_ms: u64,
    /// Backoff cap (ms).
    #[serde(default = "default_reconnect_max_delay_ms")]
    pub reconnect_max_delay_ms: u64,
}

fn default_ws_url() -> String {
    "ws://localhost:3001".to_string()
}

fn default_reconnect_base_delay_ms() -> u64 {
    1000
}

fn default_reconnect_max_delay_ms() -> u64 {
    30000
}

impl Default for WsConfig {
    fn default() -> Self {
        Self {
            url: default_ws_url(),
            max_reconnect_attempts: 0,
            reconnect_base_delay_ms: default_reconnect_base_delay_ms(),
            reconnect_max_delay_ms: default_reconnect_max_delay_ms(),
        }
    }
}

impl From<WsConfig> for ConnectionConfig {
    fn from(cfg: WsConfig) -> Self {
        Self {
            url: cfg.url,
            max_reconnect_attempts: cfg.max_reconnect_attempts,
            reconnect_base_delay_ms: cfg.reconnect_base_delay_ms,
            reconnect_max_delay_ms: cfg.reconnect_max_delay_ms,
        }
    }
}

impl AppConfig {
    /// Load configuration: explicit path, then `MOTOR_CONFIG`, then the
    /// default path. A missing file yields defaults.
    pub fn load(path: Option<&str>) -> AppResult<Self> {
        let config_path = path
            .map(str::to_string)
            .or_else(|| std::env::var("MOTOR_CONFIG").ok())
            .unwrap_or_else(|| DEFAULT_CONFIG_PATH.to_string());

        if Path::new(&config_path).exists() {
            tracing::info!(path = %config_path, "Loading configuration");
            Self::from_file(&config_path)
        } else {
            tracing::warn!(path = %config_path, "Config file not found, using defaults");
            Ok(Self::default())
        }
    }

    /// Load from a specific file.
    pub fn from_file(path: &str) -> AppResult<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| AppError::Config(format!("Failed to read config: {e}")))?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> AppResult<Self> {
        toml::from_str(content)
            .map_err(|e| AppError::Config(format!("Failed to parse config: {e}")))
    }

    /// Orchestrator config with the push channel section folded in.
    pub fn ingest_config(&self) -> IngestConfig {
        IngestConfig {
            connection: self.websocket.clone().into(),
            ..self.ingest.clone()
        }
    }

    /// Reject settings the components cannot run with.
    pub fn validate(&self) -> AppResult<()> {
        if self.ingest.max_readings == 0 {
            return Err(AppError::Config(
                "ingest.max_readings must be at least 1".to_string(),
            ));
        }
        if self.ingest.max_alerts == Some(0) {
            return Err(AppError::Config(
                "ingest.max_alerts must be at least 1 when set".to_string(),
            ));
        }
        if self.websocket.url.trim().is_empty() {
            return Err(AppError::Config("websocket.url is empty".to_string()));
        }
        if self.api.base_url.trim().is_empty() {
            return Err(AppError::Config("api.base_url is empty".to_string()));
        }
        if self.websocket.reconnect_max_delay_ms < self.websocket.reconnect_base_delay_ms {
            return Err(AppError::Config(format!(
                "websocket.reconnect_max_delay_ms ({}) is below reconnect_base_delay_ms ({})",
                self.websocket.reconnect_max_delay_ms, self.websocket.reconnect_base_delay_ms
            )));
        }
        Ok(())
    }
}
