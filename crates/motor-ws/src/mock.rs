//! Scripted connector for tests.
//!
//! Each `connect()` pops the next scripted outcome. An accepted session
//! stays open until its [`MockSessionHandle`] is dropped.

use crate::connector::{PushConnector, PushStream};
use crate::error::{WsError, WsResult};
use crate::message::PushMessage;
use futures_util::future::BoxFuture;
use futures_util::stream::{self, StreamExt};
use motor_core::{Alert, Reading};
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU32, Ordering};
use tokio::sync::mpsc;

/// Scripted result of one `connect()` call.
#[derive(Debug)]
pub enum ConnectOutcome {
    Refuse,
    Accept(mpsc::UnboundedReceiver<String>),
}

/// Sender side of an accepted mock session. Dropping it ends the session.
#[derive(Debug, Clone)]
pub struct MockSessionHandle {
    tx: mpsc::UnboundedSender<String>,
}

impl MockSessionHandle {
    pub fn send_text(&self, text: impl Into<String>) {
        let _ = self.tx.send(text.into());
    }

    pub fn send_reading(&self, reading: &Reading) {
        if let Ok(text) = PushMessage::reading(reading.clone()).to_text() {
            self.send_text(text);
        }
    }

    pub fn send_alert(&self, alert: &Alert) {
        if let Ok(text) = PushMessage::alert(alert.clone()).to_text() {
            self.send_text(text);
        }
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

/// Recording connector with a scripted outcome queue.
///
/// Unscripted attempts are refused.
#[derive(Debug, Default)]
pub struct MockConnector {
    script: Mutex<VecDeque<ConnectOutcome>>,
    attempts: AtomicU32,
}

impl MockConnector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Script a refused handshake.
    pub fn push_refusal(&self) {
        self.script.lock().push_back(ConnectOutcome::Refuse);
    }

    /// Script an accepted handshake and return the session's sender.
    pub fn push_session(&self) -> MockSessionHandle {
        let (tx, rx) = mpsc::unbounded_channel();
        self.script.lock().push_back(ConnectOutcome::Accept(rx));
        MockSessionHandle { tx }
    }

    /// Number of `connect()` calls so far.
    pub fn attempts(&self) -> u32 {
        self.attempts.load(Ordering::SeqCst)
    }
}

impl PushConnector for MockConnector {
    fn connect(&self) -> BoxFuture<'_, WsResult<PushStream>> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        let outcome = self.script.lock().pop_front();

        Box::pin(async move {
            match outcome {
                Some(ConnectOutcome::Accept(rx)) => {
                    let frames = stream::unfold(rx, |mut rx| async move {
                        rx.recv().await.map(|text| (Ok(text), rx))
                    });
                    Ok(frames.boxed())
                }
                Some(ConnectOutcome::Refuse) | None => {
                    Err(WsError::ConnectionFailed("connection refused".to_string()))
                }
            }
        })
    }
}
