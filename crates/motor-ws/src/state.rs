//! Push-channel connection state machine.
//!
//! ```text
//! Disconnected -> Connecting -> Connected
//! Connected -> Reconnecting -> Connected
//! Reconnecting -> Disconnected   (exhaustion)
//! any -> Disconnected            (stop)
//! ```

use crate::backoff::BackoffPolicy;
use crate::error::{WsError, WsResult};
use serde::Serialize;
use std::time::Duration;

/// Connection lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
    Reconnecting,
}

impl ConnectionState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Disconnected => "disconnected",
            Self::Connecting => "connecting",
            Self::Connected => "connected",
            Self::Reconnecting => "reconnecting",
        }
    }
}

/// State plus reconnect attempt count, as observed by the rendering layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionStatus {
    pub state: ConnectionState,
    pub attempt_count: u32,
}

impl Default for ConnectionStatus {
    fn default() -> Self {
        Self {
            state: ConnectionState::Disconnected,
            attempt_count: 0,
        }
    }
}

impl ConnectionStatus {
    /// Transitional states report as not connected.
    pub fn is_connected(&self) -> bool {
        self.state == ConnectionState::Connected
    }
}

/// Connection state machine.
///
/// `attempt_count` is the number of reconnect attempts scheduled since the
/// last successful connection. The delay for a newly scheduled attempt is
/// computed from the count before it is incremented.
#[derive(Debug, Clone)]
pub struct ConnectionStateMachine {
    state: ConnectionState,
    attempt_count: u32,
    policy: BackoffPolicy,
    /// Maximum scheduled reconnect attempts (0 = infinite).
    max_attempts: u32,
}

impl ConnectionStateMachine {
    pub fn new(policy: BackoffPolicy, max_attempts: u32) -> Self {
        Self {
            state: ConnectionState::Disconnected,
            attempt_count: 0,
            policy,
            max_attempts,
        }
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn attempt_count(&self) -> u32 {
        self.attempt_count
    }

    pub fn policy(&self) -> BackoffPolicy {
        self.policy
    }

    pub fn status(&self) -> ConnectionStatus {
        ConnectionStatus {
            state: self.state,
            attempt_count: self.attempt_count,
        }
    }

    /// `Disconnected -> Connecting`.
    pub fn begin_connect(&mut self) -> WsResult<()> {
        self.expect_from(&[ConnectionState::Disconnected], ConnectionState::Connecting)?;
        self.state = ConnectionState::Connecting;
        Ok(())
    }

    /// Handshake or reconnect succeeded. Resets the attempt count.
    pub fn on_connected(&mut self) -> WsResult<()> {
        self.expect_from(
            &[ConnectionState::Connecting, ConnectionState::Reconnecting],
            ConnectionState::Connected,
        )?;
        self.state = ConnectionState::Connected;
        self.attempt_count = 0;
        Ok(())
    }

    /// Initial handshake failed. The caller decides whether to retry.
    pub fn on_connect_failed(&mut self) -> WsResult<()> {
        self.expect_from(&[ConnectionState::Connecting], ConnectionState::Disconnected)?;
        self.state = ConnectionState::Disconnected;
        Ok(())
    }

    /// Transport reported a drop. Returns the delay before the next attempt,
    /// or `None` when attempts are exhausted.
    pub fn on_dropped(&mut self) -> WsResult<Option<Duration>> {
        self.expect_from(&[ConnectionState::Connected], ConnectionState::Reconnecting)?;
        Ok(self.schedule_reconnect())
    }

    /// A reconnect attempt failed. Same contract as [`Self::on_dropped`].
    pub fn on_reconnect_failed(&mut self) -> WsResult<Option<Duration>> {
        self.expect_from(&[ConnectionState::Reconnecting], ConnectionState::Reconnecting)?;
        Ok(self.schedule_reconnect())
    }

    /// Any state -> `Disconnected`. Idempotent. Returns the previous state.
    pub fn stop(&mut self) -> ConnectionState {
        let previous = self.state;
        self.state = ConnectionState::Disconnected;
        self.attempt_count = 0;
        previous
    }

    fn schedule_reconnect(&mut self) -> Option<Duration> {
        if self.max_attempts > 0 && self.attempt_count >= self.max_attempts {
            self.state = ConnectionState::Disconnected;
            return None;
        }
        let delay = self.policy.delay(self.attempt_count);
        self.attempt_count = self.attempt_count.saturating_add(1);
        self.state = ConnectionState::Reconnecting;
        Some(delay)
    }

    fn expect_from(&self, allowed: &[ConnectionState], to: ConnectionState) -> WsResult<()> {
        if allowed.contains(&self.state) {
            Ok(())
        } else {
            Err(WsError::InvalidTransition {
                from: self.state,
                to,
            })
        }
    }
}
