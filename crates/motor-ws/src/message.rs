//! Push-channel wire messages.

use crate::error::{WsError, WsResult};
use motor_core::{Alert, RawAlert, RawReading, Reading};
use serde::{Deserialize, Serialize};

/// Frame as sent by the server: `{"event": "newReading", "data": {...}}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "camelCase")]
pub enum PushMessage {
    NewReading(RawReading),
    NewAlert(RawAlert),
}

impl PushMessage {
    pub fn parse(text: &str) -> WsResult<Self> {
        serde_json::from_str(text).map_err(|e| WsError::ParseError(e.to_string()))
    }

    /// Validate the payload into a domain event.
    pub fn into_event(self) -> WsResult<PushEvent> {
        Ok(match self {
            Self::NewReading(raw) => PushEvent::Reading(Reading::try_from(raw)?),
            Self::NewAlert(raw) => PushEvent::Alert(Alert::try_from(raw)?),
        })
    }

    pub fn reading(reading: Reading) -> Self {
        Self::NewReading(reading.into())
    }

    pub fn alert(alert: Alert) -> Self {
        Self::NewAlert(RawAlert {
            id: Some(alert.id),
            message: alert.message,
            acknowledged: alert.acknowledged,
            created_at: Some(alert.created_at),
        })
    }

    pub fn to_text(&self) -> WsResult<String> {
        Ok(serde_json::to_string(self)?)
    }
}

/// Event delivered to the owner of a `ConnectionManager`.
#[derive(Debug, Clone, PartialEq)]
pub enum PushEvent {
    Reading(Reading),
    Alert(Alert),
    /// A frame was dropped at the ingestion boundary.
    Rejected { reason: String },
}

/// Parse and validate one text frame.
pub fn decode(text: &str) -> WsResult<PushEvent> {
    PushMessage::parse(text)?.into_event()
}
