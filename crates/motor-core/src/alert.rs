//! Server-pushed alerts and locally synthesized advisories.

use crate::error::{CoreError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Alert as delivered on the push channel.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawAlert {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub acknowledged: bool,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

/// Validated server alert. Identity key is `id`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Alert {
    pub id: String,
    pub message: String,
    pub acknowledged: bool,
    pub created_at: DateTime<Utc>,
}

impl Alert {
    pub fn new(id: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            message: message.into(),
            acknowledged: false,
            created_at: Utc::now(),
        }
    }
}

impl TryFrom<RawAlert> for Alert {
    type Error = CoreError;

    fn try_from(raw: RawAlert) -> Result<Self> {
        let id = match raw.id {
            Some(id) if !id.trim().is_empty() => id,
            _ => return Err(CoreError::MissingIdentity { kind: "Alert" }),
        };
        Ok(Self {
            id,
            message: raw.message,
            acknowledged: raw.acknowledged,
            // Missing creation time falls back to receive time.
            created_at: raw.created_at.unwrap_or_else(Utc::now),
        })
    }
}

/// High-temperature advisory raised locally from a push reading.
///
/// Distinct from [`Alert`]: never acknowledged, never sent upstream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Advisory {
    pub id: Uuid,
    pub reading_id: String,
    pub temperature: f64,
    pub message: String,
    pub raised_at: DateTime<Utc>,
}

impl Advisory {
    pub fn high_temperature(reading_id: impl Into<String>, temperature: f64) -> Self {
        Self {
            id: Uuid::new_v4(),
            reading_id: reading_id.into(),
            temperature,
            message: format!("High temperature detected: {temperature:.1}°C"),
            raised_at: Utc::now(),
        }
    }
}
