//! Caller-facing handle to a running orchestrator.

use crate::error::{IngestError, IngestResult};
use motor_feed::TelemetryView;
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot, watch};

/// Requests serialized through the orchestrator's event loop.
#[derive(Debug)]
pub(crate) enum Command {
    Acknowledge {
        id: String,
    },
    SetCapacity {
        capacity: usize,
        reply: oneshot::Sender<IngestResult<()>>,
    },
    RequestSample,
    Stop {
        reply: oneshot::Sender<()>,
    },
}

/// Cloneable handle: read views, send commands, stop.
#[derive(Debug, Clone)]
pub struct OrchestratorHandle {
    command_tx: mpsc::Sender<Command>,
    view_rx: watch::Receiver<Arc<TelemetryView>>,
}

impl OrchestratorHandle {
    pub(crate) fn new(
        command_tx: mpsc::Sender<Command>,
        view_rx: watch::Receiver<Arc<TelemetryView>>,
    ) -> Self {
        Self {
            command_tx,
            view_rx,
        }
    }

    /// Latest published view.
    pub fn view(&self) -> Arc<TelemetryView> {
        self.view_rx.borrow().clone()
    }

    /// Receiver notified on every published view.
    pub fn subscribe(&self) -> watch::Receiver<Arc<TelemetryView>> {
        self.view_rx.clone()
    }

    /// Acknowledge an alert. Unknown ids are ignored by the registry.
    pub async fn acknowledge_alert(&self, id: impl Into<String>) -> IngestResult<()> {
        self.send(Command::Acknowledge { id: id.into() }).await
    }

    /// Change buffer capacity. Restarts the session: the buffer and alert
    /// registry start empty and a fresh snapshot is fetched.
    pub async fn set_capacity(&self, capacity: usize) -> IngestResult<()> {
        let (reply, rx) = oneshot::channel();
        self.send(Command::SetCapacity { capacity, reply }).await?;
        rx.await.map_err(|_| IngestError::Stopped)?
    }

    /// Ask the backend to emit one reading. Fire-and-forget.
    pub async fn request_sample(&self) -> IngestResult<()> {
        self.send(Command::RequestSample).await
    }

    /// Stop the orchestrator.
    ///
    /// Returns after the push subscription is released and pending timers
    /// are cancelled. Stopping an already stopped orchestrator is a no-op.
    pub async fn stop(&self) -> IngestResult<()> {
        let (reply, rx) = oneshot::channel();
        if self.command_tx.send(Command::Stop { reply }).await.is_err() {
            return Ok(());
        }
        let _ = rx.await;
        Ok(())
    }

    async fn send(&self, command: Command) -> IngestResult<()> {
        self.command_tx
            .send(command)
            .await
            .map_err(|_| IngestError::Stopped)
    }
}
