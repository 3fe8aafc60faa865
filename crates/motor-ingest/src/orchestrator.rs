//! Ingestion orchestrator.
//!
//! One task owns the `MonitorState`. Snapshot results, stats results, push
//! events and caller commands all arrive on channels and are applied one at
//! a time, so no reader ever observes a partial update.
//!
//! Each start/stop cycle is a *session* with its own generation number and
//! cancellation token. Results tagged with a stale generation are dropped.

use crate::config::IngestConfig;
use crate::error::{IngestError, IngestResult};
use crate::handle::{Command, OrchestratorHandle};
use motor_api::{ApiResult, Snapshot, TelemetryApi};
use motor_core::DashboardStats;
use motor_feed::{AdvisoryPolicy, MonitorState, TelemetryView};
use motor_telemetry::Metrics;
use motor_ws::{
    ConnectionManager, ConnectionState, ConnectionStatus, PushConnector, PushEvent, WsError,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Results of background fetches, tagged with the session that issued them.
#[derive(Debug)]
enum Internal {
    Snapshot {
        generation: u64,
        result: ApiResult<Snapshot>,
    },
    Stats {
        generation: u64,
        result: ApiResult<DashboardStats>,
    },
}

/// Receivers the run loop selects on for the current session.
struct SessionFeeds {
    events: mpsc::Receiver<PushEvent>,
    status: watch::Receiver<ConnectionStatus>,
}

/// Resources of one running session.
struct Session {
    token: CancellationToken,
    manager: Arc<ConnectionManager>,
    subscription: JoinHandle<()>,
    snapshot: JoinHandle<()>,
}

pub struct IngestionOrchestrator {
    config: IngestConfig,
    api: Arc<dyn TelemetryApi>,
    connector: Arc<dyn PushConnector>,
    capacity: usize,
    generation: u64,
    state: MonitorState,
    advisory: AdvisoryPolicy,
    session: Option<Session>,
    /// Coalescing: one stats request in flight, `stats_dirty` schedules one
    /// follow-up.
    stats_task: Option<JoinHandle<()>>,
    stats_dirty: bool,
    command_rx: mpsc::Receiver<Command>,
    internal_tx: mpsc::UnboundedSender<Internal>,
    internal_rx: mpsc::UnboundedReceiver<Internal>,
    view_tx: watch::Sender<Arc<TelemetryView>>,
}

impl IngestionOrchestrator {
    pub fn new(
        config: IngestConfig,
        api: Arc<dyn TelemetryApi>,
        connector: Arc<dyn PushConnector>,
    ) -> (Self, OrchestratorHandle) {
        let capacity = config.max_readings;
        let state = MonitorState::new(capacity, config.max_alerts, config.max_advisories);
        let (view_tx, view_rx) = watch::channel(Arc::new(state.view(0)));
        let (command_tx, command_rx) = mpsc::channel(64);
        let (internal_tx, internal_rx) = mpsc::unbounded_channel();

        let orchestrator = Self {
            advisory: AdvisoryPolicy::new(config.advisory_temperature_c),
            config,
            api,
            connector,
            capacity,
            generation: 0,
            state,
            session: None,
            stats_task: None,
            stats_dirty: false,
            command_rx,
            internal_tx,
            internal_rx,
            view_tx,
        };
        (orchestrator, OrchestratorHandle::new(command_tx, view_rx))
    }

    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(self.run())
    }

    /// Run until stopped or until every handle is dropped.
    pub async fn run(mut self) {
        let mut feeds = self.start_session();

        loop {
            tokio::select! {
                command = self.command_rx.recv() => {
                    match command {
                        Some(Command::Stop { reply }) => {
                            self.teardown().await;
                            let _ = reply.send(());
                            break;
                        }
                        Some(Command::SetCapacity { capacity, reply }) => {
                            match self.restart(capacity).await {
                                Ok(next) => {
                                    feeds = next;
                                    let _ = reply.send(Ok(()));
                                }
                                Err(e) => {
                                    let _ = reply.send(Err(e));
                                }
                            }
                        }
                        Some(Command::Acknowledge { id }) => self.acknowledge(&id),
                        Some(Command::RequestSample) => self.request_sample(),
                        None => {
                            info!("All orchestrator handles dropped, stopping");
                            self.teardown().await;
                            break;
                        }
                    }
                }

                Some(internal) = self.internal_rx.recv() => {
                    self.handle_internal(internal);
                }

                Ok(()) = feeds.status.changed() => {
                    let status = *feeds.status.borrow_and_update();
                    self.handle_status(status);
                }

                Some(event) = feeds.events.recv() => {
                    self.handle_push(event);
                }
            }
        }

        info!(generation = self.generation, "Ingestion orchestrator stopped");
    }

    fn start_session(&mut self) -> SessionFeeds {
        self.generation += 1;
        let generation = self.generation;
        self.state = MonitorState::new(
            self.capacity,
            self.config.max_alerts,
            self.config.max_advisories,
        );
        self.stats_dirty = false;

        let token = CancellationToken::new();
        let (event_tx, event_rx) = mpsc::channel(self.config.event_buffer.max(1));
        let manager = Arc::new(ConnectionManager::with_token(
            self.config.connection.clone(),
            Arc::clone(&self.connector),
            event_tx,
            token.clone(),
        ));
        let status = manager.subscribe_status();

        // Snapshot fetch does not block the subscription.
        let api = Arc::clone(&self.api);
        let tx = self.internal_tx.clone();
        let snapshot = tokio::spawn(async move {
            let result = api.fetch_snapshot().await;
            let _ = tx.send(Internal::Snapshot { generation, result });
        });

        let subscription = tokio::spawn(run_subscription(
            Arc::clone(&manager),
            token.clone(),
            self.config.subscribe_delay(),
            self.config.retry_initial_connect,
        ));

        self.session = Some(Session {
            token,
            manager,
            subscription,
            snapshot,
        });
        self.request_stats();

        info!(generation, capacity = self.capacity, "Ingestion session started");
        self.publish();
        SessionFeeds {
            events: event_rx,
            status,
        }
    }

    /// Cancel the session and wait until the push subscription is released.
    async fn teardown(&mut self) {
        let Some(session) = self.session.take() else {
            return;
        };

        session.token.cancel();
        session.manager.stop();
        session.snapshot.abort();
        if let Some(task) = self.stats_task.take() {
            task.abort();
        }
        self.stats_dirty = false;

        if let Err(e) = session.subscription.await {
            warn!(error = %e, "Push subscription task failed during stop");
        }

        Metrics::ws_state_set(ConnectionState::Disconnected.as_str());
        self.state.set_connection(ConnectionStatus::default());
        self.publish();
        info!(generation = self.generation, "Ingestion session stopped");
    }

    /// Full stop/start cycle with a new capacity. The previous buffer is
    /// discarded rather than resized.
    async fn restart(&mut self, capacity: usize) -> IngestResult<SessionFeeds> {
        if capacity == 0 {
            return Err(IngestError::InvalidCapacity(capacity));
        }
        info!(from = self.capacity, to = capacity, "Capacity changed, restarting session");
        Metrics::orchestrator_restart();

        self.teardown().await;
        self.capacity = capacity;
        Ok(self.start_session())
    }

    fn handle_push(&mut self, event: PushEvent) {
        match event {
            PushEvent::Reading(reading) => {
                let advisory = self.advisory.evaluate(&reading);
                let reading_id = reading.id.clone();
                let outcome = self.state.ingest_reading(reading);
                Metrics::reading_ingested(
                    outcome.as_str(),
                    outcome.evicted(),
                    self.state.buffer().len(),
                );
                debug!(
                    %reading_id,
                    outcome = outcome.as_str(),
                    generation = self.generation,
                    "Push reading merged"
                );

                if let Some(advisory) = advisory {
                    warn!(
                        %reading_id,
                        temperature = advisory.temperature,
                        "High temperature advisory"
                    );
                    Metrics::advisory_raised();
                    self.state.record_advisory(advisory);
                }
                self.request_stats();
            }
            PushEvent::Alert(alert) => {
                let alert_id = alert.id.clone();
                let added = self.state.add_alert(alert);
                Metrics::alert_received(added);
                if added {
                    info!(%alert_id, "Alert received");
                } else {
                    debug!(%alert_id, "Duplicate alert ignored");
                }
            }
            PushEvent::Rejected { reason } => {
                debug!(%reason, "Push frame rejected");
                Metrics::reading_rejected("push", 1);
                return;
            }
        }
        self.publish();
    }

    fn handle_status(&mut self, status: ConnectionStatus) {
        Metrics::ws_state_set(status.state.as_str());
        if !self.state.set_connection(status) {
            return;
        }
        if status.state == ConnectionState::Reconnecting {
            Metrics::ws_reconnect();
        }
        self.publish();
    }

    fn handle_internal(&mut self, internal: Internal) {
        match internal {
            Internal::Snapshot { generation, result } => {
                if generation != self.generation {
                    debug!(generation, current = self.generation, "Stale snapshot dropped");
                    return;
                }
                match result {
                    Ok(snapshot) => {
                        Metrics::fetch("snapshot", true);
                        if snapshot.rejected > 0 {
                            Metrics::reading_rejected("snapshot", snapshot.rejected);
                        }
                        let len = self.state.merge_snapshot(snapshot.readings);
                        Metrics::buffer_len(len);
                        info!(generation, len, "Snapshot merged");
                    }
                    Err(e) => {
                        Metrics::fetch("snapshot", false);
                        warn!(error = %e, generation, "Snapshot fetch failed");
                        self.state.snapshot_failed();
                    }
                }
            }
            Internal::Stats { generation, result } => {
                if generation != self.generation {
                    debug!(generation, current = self.generation, "Stale stats dropped");
                    return;
                }
                self.stats_task = None;
                match result {
                    Ok(stats) => {
                        Metrics::fetch("stats", true);
                        self.state.set_stats(stats);
                    }
                    Err(e) => {
                        Metrics::fetch("stats", false);
                        warn!(error = %e, "Aggregate stats fetch failed");
                    }
                }
                if std::mem::take(&mut self.stats_dirty) {
                    self.request_stats();
                }
            }
        }
        self.publish();
    }

    fn acknowledge(&mut self, id: &str) {
        if self.state.acknowledge(id) {
            info!(alert_id = %id, "Alert acknowledged");
            self.publish();
        } else {
            debug!(alert_id = %id, "Acknowledge ignored: unknown or already acknowledged");
        }
    }

    fn request_stats(&mut self) {
        if self.stats_task.is_some() {
            self.stats_dirty = true;
            return;
        }

        let api = Arc::clone(&self.api);
        let tx = self.internal_tx.clone();
        let generation = self.generation;
        self.stats_task = Some(tokio::spawn(async move {
            let result = api.fetch_aggregate_stats().await;
            let _ = tx.send(Internal::Stats { generation, result });
        }));
    }

    fn request_sample(&self) {
        let api = Arc::clone(&self.api);
        tokio::spawn(async move {
            match api.request_sample().await {
                Ok(()) => Metrics::fetch("sample", true),
                Err(e) => {
                    Metrics::fetch("sample", false);
                    warn!(error = %e, "Sample request failed");
                }
            }
        });
    }

    fn publish(&self) {
        self.view_tx
            .send_replace(Arc::new(self.state.view(self.generation)));
    }
}

/// Open the push subscription after `delay`, retrying a failed handshake
/// with the reconnect backoff when `retry` is set, then supervise it until
/// the session is cancelled.
async fn run_subscription(
    manager: Arc<ConnectionManager>,
    token: CancellationToken,
    delay: Duration,
    retry: bool,
) {
    tokio::select! {
        biased;
        () = token.cancelled() => return,
        () = tokio::time::sleep(delay) => {}
    }

    let backoff = manager.config().backoff();
    let mut attempt = 0u32;
    loop {
        match manager.start().await {
            Ok(supervisor) => {
                if let Err(e) = supervisor.await {
                    warn!(error = %e, "Push supervisor task failed");
                }
                return;
            }
            Err(WsError::Shutdown) => return,
            Err(e) if retry => {
                attempt = attempt.saturating_add(1);
                let delay = backoff.delay(attempt);
                warn!(
                    error = %e,
                    attempt,
                    delay_ms = delay.as_millis() as u64,
                    "Initial push connect failed, retrying"
                );
                tokio::select! {
                    biased;
                    () = token.cancelled() => return,
                    () = tokio::time::sleep(delay) => {}
                }
            }
            Err(e) => {
                warn!(error = %e, "Initial push connect failed, not retrying");
                return;
            }
        }
    }
}
