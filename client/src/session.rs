//! Sync session.
//!
//! Ties the pieces together: seeds the store from the authoritative
//! source, drives the live channel through the reconnection controller,
//! reconciles pushes into the [`OptimisticStore`], flushes the
//! [`Outbox`] after each reconnect, and runs fallback polling for state
//! the channel does not push.
//!
//! A single background task owns the channel for the lifetime of a
//! `start`, so connect attempts are strictly sequential and `close`
//! always lands before the next `connect`. Every `start` bumps an epoch
//! counter; async work spawned under an older epoch checks it before
//! touching the store, which is how results from a torn-down session
//! generation get discarded.

use crate::api::{Plan, RemoteSource};
use crate::config::SyncConfig;
use crate::poller::{FallbackPoller, PollTarget};
use crate::reconnect::ReconnectController;
use crate::transport::{Channel, ConnectionState, Transport, TransportEvent};
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use tether_core::{ChatEntry, LocalId, OptimisticStore, Outbox, ReconcileOutcome, SyncMessage};
use tokio::sync::{mpsc, watch, Notify};
use tokio::task::JoinHandle;
use uuid::Uuid;

/// Out-of-band notifications for the consumer. Errors the session
/// absorbs (degraded seed, failed persists, dropped frames) surface
/// here instead of tearing the session down.
#[derive(Debug, Clone)]
pub enum SessionEvent {
    /// The initial authoritative fetch failed; the session continues
    /// with whatever state it already has.
    SeedFailed(String),
    /// Persisting a sent entry failed; the record is marked failed and
    /// can be retried.
    SendFailed { local_id: LocalId, reason: String },
    /// An incoming frame was dropped as malformed.
    MessageDropped(String),
    /// A fallback poll tick delivered a plan snapshot.
    Plans(Vec<Plan>),
    /// The watched plan became the team's current plan.
    PlanActivated(String),
}

/// Frame sent over the live channel.
#[derive(Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
enum OutgoingFrame<'a> {
    ChatUpdated { message: &'a ChatEntry },
}

/// A live sync session over one transport and one authoritative source.
pub struct SyncSession {
    config: SyncConfig,
    id: Uuid,
    transport: Arc<dyn Transport>,
    remote: Arc<dyn RemoteSource>,
    controller: Arc<ReconnectController>,
    store: Arc<Mutex<OptimisticStore>>,
    outbox: Arc<Mutex<Outbox>>,
    outbox_wake: Arc<Notify>,
    epoch: Arc<AtomicU64>,
    shutdown_tx: Option<watch::Sender<bool>>,
    conn_task: Option<JoinHandle<()>>,
    poller: FallbackPoller,
    events_tx: mpsc::UnboundedSender<SessionEvent>,
    events_rx: Option<mpsc::UnboundedReceiver<SessionEvent>>,
}

impl SyncSession {
    /// Build a session over an explicit transport and source.
    pub fn new(
        config: SyncConfig,
        transport: Arc<dyn Transport>,
        remote: Arc<dyn RemoteSource>,
    ) -> Self {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        Self {
            controller: Arc::new(ReconnectController::new(config.reconnect)),
            config,
            id: Uuid::new_v4(),
            transport,
            remote,
            store: Arc::new(Mutex::new(OptimisticStore::new())),
            outbox: Arc::new(Mutex::new(Outbox::new())),
            outbox_wake: Arc::new(Notify::new()),
            epoch: Arc::new(AtomicU64::new(0)),
            shutdown_tx: None,
            conn_task: None,
            poller: FallbackPoller::new(),
            events_tx,
            events_rx: Some(events_rx),
        }
    }

    /// Build the production session: WebSocket transport plus the REST
    /// API client, both derived from `config`.
    pub fn over_websocket(config: SyncConfig) -> crate::error::Result<Self> {
        let transport = Arc::new(crate::transport::WsTransport::new(config.channel_url()?));
        let mut remote = crate::api::ApiClient::new(&config.api_base);
        if let Some(token) = &config.auth_token {
            remote = remote.auth_token(token);
        }
        Ok(Self::new(config, transport, Arc::new(remote)))
    }

    /// Seed the store from the authoritative source, then open the live
    /// channel. Restarting an already running session tears the old
    /// channel down first, so there is never more than one open channel
    /// per session.
    ///
    /// A failed seed does not abort the start: the session comes up
    /// degraded and a [`SessionEvent::SeedFailed`] is emitted.
    pub async fn start(&mut self) {
        self.stop().await;
        let my_epoch = self.epoch.fetch_add(1, Ordering::SeqCst) + 1;
        tracing::info!(session = %self.id, "starting sync session");

        match self.remote.chat_history(&self.config.client_id).await {
            Ok(history) => {
                tracing::debug!(count = history.len(), "seeded from authoritative source");
                self.store.lock().unwrap().seed(history);
            }
            Err(e) => {
                tracing::warn!(error = %e, "seed fetch failed; continuing degraded");
                let _ = self.events_tx.send(SessionEvent::SeedFailed(e.to_string()));
            }
        }

        let (shutdown_tx, shutdown) = watch::channel(false);
        let task = ConnectionTask {
            transport: Arc::clone(&self.transport),
            controller: Arc::clone(&self.controller),
            store: Arc::clone(&self.store),
            outbox: Arc::clone(&self.outbox),
            wake: Arc::clone(&self.outbox_wake),
            events: self.events_tx.clone(),
            epoch: Arc::clone(&self.epoch),
            my_epoch,
            shutdown,
        };
        self.conn_task = Some(tokio::spawn(task.run()));
        self.shutdown_tx = Some(shutdown_tx);
    }

    /// Tear the session down: cancel polling, close the channel, and
    /// invalidate in-flight async work. Idempotent.
    pub async fn stop(&mut self) {
        self.epoch.fetch_add(1, Ordering::SeqCst);
        self.poller.cancel();
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(true);
        }
        if let Some(task) = self.conn_task.take() {
            let _ = task.await;
            tracing::info!(session = %self.id, "sync session stopped");
        }
    }

    /// Re-run the authoritative seed fetch without touching the
    /// channel. Used to recover from a degraded start or to force a
    /// full refresh.
    pub async fn resync(&self) -> crate::error::Result<()> {
        let history = self.remote.chat_history(&self.config.client_id).await?;
        tracing::debug!(count = history.len(), "resynced from authoritative source");
        self.store.lock().unwrap().seed(history);
        Ok(())
    }

    /// Apply an optimistic update and deliver it. The entry is visible
    /// in [`snapshot`](Self::snapshot) immediately; delivery over the
    /// channel happens when it is (or next becomes) open, exactly once.
    pub fn send(&self, entry: ChatEntry) -> LocalId {
        let local_id = self.store.lock().unwrap().apply_optimistic(entry.clone());
        self.outbox
            .lock()
            .unwrap()
            .push(local_id.clone(), entry.clone());
        self.outbox_wake.notify_one();
        self.spawn_persist(local_id.clone(), entry);
        local_id
    }

    /// Convenience over [`send`](Self::send): stamp `content` with the
    /// current wall clock.
    pub fn send_text(&self, sender: impl Into<String>, content: impl Into<String>) -> LocalId {
        self.send(ChatEntry::new(sender, content, now_millis()))
    }

    /// Retry a record that a failed persist left in the failed state.
    pub fn retry(&self, local_id: &str) -> tether_core::Result<LocalId> {
        let entry = {
            let mut store = self.store.lock().unwrap();
            store.mark_pending(local_id)?;
            store
                .get(local_id)
                .map(|r| r.data.clone())
                .ok_or_else(|| tether_core::Error::RecordNotFound(local_id.to_string()))?
        };
        self.outbox
            .lock()
            .unwrap()
            .push(local_id.to_string(), entry.clone());
        self.outbox_wake.notify_one();
        self.spawn_persist(local_id.to_string(), entry);
        Ok(local_id.to_string())
    }

    /// Current merged view, confirmed and pending records in insertion
    /// order.
    pub fn snapshot(&self) -> Vec<tether_core::LocalRecord> {
        self.store.lock().unwrap().snapshot().to_vec()
    }

    /// Number of records still awaiting confirmation.
    pub fn pending_count(&self) -> usize {
        self.store.lock().unwrap().pending_count()
    }

    /// Pending records older than the configured stale window. Stale
    /// records are reported, never rolled back; the authoritative
    /// source decides their fate on the next seed.
    pub fn stale_pending(&self) -> Vec<tether_core::LocalRecord> {
        let window = self.config.stale_window.as_millis() as u64;
        let store = self.store.lock().unwrap();
        let stale: Vec<_> = store
            .stale_pending(now_millis(), window)
            .into_iter()
            .cloned()
            .collect();
        if !stale.is_empty() {
            tracing::warn!(count = stale.len(), "optimistic records unconfirmed past window");
        }
        stale
    }

    /// Watch connection state transitions.
    pub fn state(&self) -> watch::Receiver<ConnectionState> {
        self.controller.subscribe()
    }

    /// Current connection state.
    pub fn connection_state(&self) -> ConnectionState {
        self.controller.state()
    }

    /// Take the event stream. Yields `None` after the first call.
    pub fn take_events(&mut self) -> Option<mpsc::UnboundedReceiver<SessionEvent>> {
        self.events_rx.take()
    }

    /// Poll the team's plans until `plan_id` becomes current. Each
    /// snapshot is delivered as [`SessionEvent::Plans`]; activation
    /// emits [`SessionEvent::PlanActivated`] and stops the poller.
    /// Watching a new plan cancels the previous watch.
    pub fn watch_plan(&mut self, team_id: impl Into<String>, plan_id: impl Into<String>) {
        let team_id = team_id.into();
        let plan_id = plan_id.into();
        tracing::debug!(team = %team_id, plan = %plan_id, "watching plan activation");

        let remote = Arc::clone(&self.remote);
        let stop_id = plan_id.clone();
        let mut target = PollTarget::new(
            self.config.poll_interval,
            move || {
                let remote = Arc::clone(&remote);
                let team_id = team_id.clone();
                async move { remote.plans(&team_id).await }
            },
            move |plans: &Vec<Plan>| plans.iter().any(|p| p.id == stop_id && p.is_current_plan),
        );
        if let Some(max) = self.config.max_poll_attempts {
            target = target.max_attempts(max);
        }

        let events = self.events_tx.clone();
        self.poller.start(target, move |plans| {
            let activated = plans.iter().any(|p| p.id == plan_id && p.is_current_plan);
            let _ = events.send(SessionEvent::Plans(plans.clone()));
            if activated {
                tracing::info!(plan = %plan_id, "plan activation confirmed");
                let _ = events.send(SessionEvent::PlanActivated(plan_id.clone()));
            }
        });
    }

    /// Stop any running plan watch.
    pub fn stop_watching(&mut self) {
        self.poller.cancel();
    }

    /// Whether a fallback poll is running.
    pub fn polling(&self) -> bool {
        self.poller.is_active()
    }

    fn spawn_persist(&self, local_id: LocalId, entry: ChatEntry) {
        let remote = Arc::clone(&self.remote);
        let store = Arc::clone(&self.store);
        let events = self.events_tx.clone();
        let epoch = Arc::clone(&self.epoch);
        let my_epoch = epoch.load(Ordering::SeqCst);
        let client_id = self.config.client_id.clone();
        tokio::spawn(async move {
            let result = remote
                .persist_entries(&client_id, std::slice::from_ref(&entry))
                .await;
            if let Err(e) = result {
                if epoch.load(Ordering::SeqCst) != my_epoch {
                    return;
                }
                tracing::warn!(error = %e, local_id = %local_id, "persist failed");
                if let Err(missing) = store.lock().unwrap().mark_failed(&local_id) {
                    tracing::debug!(error = %missing, "record gone before failure mark");
                }
                let _ = events.send(SessionEvent::SendFailed {
                    local_id,
                    reason: e.to_string(),
                });
            }
        });
    }
}

impl Drop for SyncSession {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(true);
        }
        if let Some(task) = self.conn_task.take() {
            task.abort();
        }
    }
}

/// Current wall clock in milliseconds since the epoch.
pub fn now_millis() -> u64 {
    chrono::Utc::now().timestamp_millis().max(0) as u64
}

enum DriveEnd {
    Shutdown,
    Disconnected,
}

/// The background task that owns the channel. One instance per `start`.
struct ConnectionTask {
    transport: Arc<dyn Transport>,
    controller: Arc<ReconnectController>,
    store: Arc<Mutex<OptimisticStore>>,
    outbox: Arc<Mutex<Outbox>>,
    wake: Arc<Notify>,
    events: mpsc::UnboundedSender<SessionEvent>,
    epoch: Arc<AtomicU64>,
    my_epoch: u64,
    shutdown: watch::Receiver<bool>,
}

impl ConnectionTask {
    async fn run(mut self) {
        loop {
            self.controller.set_state(ConnectionState::Connecting);
            let connected = tokio::select! {
                _ = self.shutdown.changed() => break,
                result = self.transport.connect() => result,
            };
            match connected {
                Ok(channel) => {
                    self.controller.set_state(ConnectionState::Connected);
                    tracing::info!("live channel open");
                    if let DriveEnd::Shutdown = self.drive_channel(channel).await {
                        break;
                    }
                }
                Err(e) => {
                    tracing::warn!(error = %e, "connect attempt failed");
                }
            }

            self.controller.set_state(ConnectionState::Reconnecting);
            let delay = self.controller.next_delay();
            tokio::select! {
                _ = self.shutdown.changed() => break,
                _ = tokio::time::sleep(delay) => {}
            }
        }
        self.controller.set_state(ConnectionState::Disconnected);
    }

    async fn drive_channel(&mut self, mut channel: Box<dyn Channel>) -> DriveEnd {
        // One flush per reconnect, before any events are processed.
        if !self.flush_outbox(channel.as_mut()).await {
            return DriveEnd::Disconnected;
        }
        loop {
            let wake = Arc::clone(&self.wake);
            tokio::select! {
                _ = self.shutdown.changed() => {
                    channel.close().await;
                    return DriveEnd::Shutdown;
                }
                _ = wake.notified() => {
                    if !self.flush_outbox(channel.as_mut()).await {
                        return DriveEnd::Disconnected;
                    }
                }
                event = channel.next_event() => match event {
                    Some(TransportEvent::Message(text)) => self.handle_frame(&text),
                    Some(TransportEvent::Closed { code, reason }) => {
                        tracing::info!(?code, reason = %reason, "channel closed by peer");
                        return DriveEnd::Disconnected;
                    }
                    Some(TransportEvent::Error(e)) => {
                        tracing::warn!(error = %e, "channel error");
                        return DriveEnd::Disconnected;
                    }
                    None => return DriveEnd::Disconnected,
                }
            }
        }
    }

    /// Drain the outbox onto the channel, oldest first. Returns false
    /// if a send failed; the failed item and everything behind it go
    /// back to the front of the queue for the next reconnect.
    async fn flush_outbox(&self, channel: &mut dyn Channel) -> bool {
        let queued = self.outbox.lock().unwrap().drain();
        if queued.is_empty() {
            return true;
        }
        tracing::debug!(count = queued.len(), "flushing queued sends");
        let mut iter = queued.into_iter();
        while let Some(item) = iter.next() {
            let frame = match serde_json::to_string(&OutgoingFrame::ChatUpdated {
                message: &item.entry,
            }) {
                Ok(frame) => frame,
                Err(e) => {
                    tracing::error!(error = %e, local_id = %item.local_id, "unserializable entry dropped");
                    continue;
                }
            };
            if let Err(e) = channel.send(&frame).await {
                tracing::warn!(error = %e, "send failed; requeueing remainder");
                let mut unsent = vec![item];
                unsent.extend(iter);
                self.outbox.lock().unwrap().requeue_front(unsent);
                return false;
            }
        }
        true
    }

    fn handle_frame(&self, text: &str) {
        if self.epoch.load(Ordering::SeqCst) != self.my_epoch {
            tracing::trace!("frame from stale session generation discarded");
            return;
        }
        let message = match SyncMessage::parse(text) {
            Ok(message) => message,
            Err(e) => {
                tracing::warn!(error = %e, "malformed frame dropped");
                let _ = self
                    .events
                    .send(SessionEvent::MessageDropped(e.to_string()));
                return;
            }
        };
        let outcome = self.store.lock().unwrap().reconcile(&message);
        match outcome {
            ReconcileOutcome::Promoted(id) => {
                tracing::debug!(local_id = %id, "optimistic record confirmed")
            }
            ReconcileOutcome::Appended(id) => tracing::debug!(local_id = %id, "record appended"),
            ReconcileOutcome::Duplicate => tracing::trace!("duplicate push ignored"),
            ReconcileOutcome::Skipped => tracing::debug!("non-chat frame skipped"),
            ReconcileOutcome::Dropped => {
                tracing::warn!("unusable payload dropped");
                let _ = self
                    .events
                    .send(SessionEvent::MessageDropped("unusable payload".into()));
            }
        }
    }
}
