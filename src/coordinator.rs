// ABOUTME: Coordination core wiring registry, selector, sync channel, session synchronizer and handoff monitor
// ABOUTME: One instance per device owning the periodic ticks, the inbound listener and reconnect recovery
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! # Coordination Core
//!
//! Each device runs one [`CoordinationCore`]. It owns:
//!
//! - the inbound listener, consuming the transport queue serially
//! - the discovery loop and the reconnect recovery it triggers
//! - per session, a metrics sync tick and a handoff tick
//!
//! Session tasks stop on a per-session shutdown broadcast when the session
//! reaches a terminal state; every task stops on the core shutdown broadcast.
//! Shared state is only mutated from these handlers and the public API.

use std::mem;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::Utc;
use tandem_core::errors::{CoordinationError, CoordinationResult};
use tandem_core::models::{
    Device, DeviceClass, DeviceId, HandoffDecision, MetricSnapshot, SessionState,
    WorkoutCategory, WorkoutSession,
};
use tokio::sync::{broadcast, mpsc, Mutex, RwLock};
use tokio::task::JoinHandle;
use tokio::time::{self, timeout, MissedTickBehavior};
use tokio_stream::Stream;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::config::CoordinatorConfig;
use crate::events::{CoordinationEvent, EventBus, StateChange};
use crate::handoff::{HandoffLinks, HandoffMonitor, PrimaryRole};
use crate::registry::{
    ConnectivityChange, DeviceRegistry, PeerLink, SensorBackedSource, TelemetrySource,
};
use crate::rules::gps_owner;
use crate::selector::MetricSourceSelector;
use crate::sensors::{LocalSignals, SensorSource};
use crate::session::{
    state_message, Reconciled, SessionStateSynchronizer, SessionStore, StateTransition,
};
use crate::sync::{enforce_floor, millis, DeliveryMode, MetricsSyncChannel, SyncRecord};
use crate::transport::{
    Envelope, Inbound, MessageBody, MetricsPayload, SessionSnapshotPayload, StateIntent,
    Transport,
};

const CONNECTIVITY_QUEUE: usize = 16;

/// Everything a core needs from its host
pub struct CoreParts {
    /// This device
    pub local: Device,
    /// The other primary peer
    pub peer: Device,
    /// Channel to the peer
    pub transport: Arc<dyn Transport>,
    /// Queue the transport posts inbound messages onto
    pub inbound: mpsc::Receiver<Inbound>,
    /// This device's sensors
    pub sensors: Arc<dyn SensorSource>,
    /// This device's environment signals
    pub signals: Arc<dyn LocalSignals>,
}

#[derive(Debug, Clone, Copy)]
enum Tick {
    Metrics,
    Handoff,
}

struct CoreInner {
    config: CoordinatorConfig,
    local: DeviceId,
    local_class: DeviceClass,
    peer: DeviceId,
    transport: Arc<dyn Transport>,
    registry: Arc<DeviceRegistry>,
    selector: MetricSourceSelector,
    store: Arc<SessionStore>,
    role: Arc<PrimaryRole>,
    synchronizer: SessionStateSynchronizer,
    monitor: HandoffMonitor,
    events: EventBus,
    /// Sync channel of the live session, kept after teardown for its history
    channel: RwLock<Option<Arc<MetricsSyncChannel>>>,
    session_stop: Mutex<Option<broadcast::Sender<()>>>,
    core_stop: broadcast::Sender<()>,
    shut_down: AtomicBool,
}

/// Per-device coordination and handoff engine
pub struct CoordinationCore {
    inner: Arc<CoreInner>,
    inbound: Mutex<Option<mpsc::Receiver<Inbound>>>,
    tasks: Mutex<Vec<JoinHandle<()>>>,
}

impl CoordinationCore {
    /// Build a core; nothing runs until [`CoordinationCore::start`]
    ///
    /// # Errors
    ///
    /// Returns `CoordinationError::DuplicateDevice` if the local and peer
    /// devices share an id.
    pub fn new(config: CoordinatorConfig, parts: CoreParts) -> CoordinationResult<Self> {
        let CoreParts {
            local,
            peer,
            transport,
            inbound,
            sensors,
            signals,
        } = parts;

        let registry = Arc::new(DeviceRegistry::new());
        registry.register_source(Arc::new(SensorBackedSource::new(
            local.id.clone(),
            local.class,
            local.name.clone(),
            local.capabilities,
            sensors,
        )))?;
        registry.set_connectivity(&local.id, true)?;
        registry.register_source(Arc::new(PeerLink::new(
            peer.id.clone(),
            peer.class,
            peer.name.clone(),
            peer.capabilities,
            Arc::clone(&transport),
        )))?;
        registry.set_connectivity(&peer.id, transport.is_reachable(&peer.id))?;

        let store = Arc::new(SessionStore::new());
        let role = Arc::new(PrimaryRole::new(DeviceClass::PrimaryUnit));
        let events = EventBus::new(config.event_bus_capacity);
        let synchronizer =
            SessionStateSynchronizer::new(local.class, Arc::clone(&store), Arc::clone(&role));
        let monitor = HandoffMonitor::new(
            local.class,
            peer.id.clone(),
            HandoffLinks {
                transport: Arc::clone(&transport),
                signals,
                role: Arc::clone(&role),
                store: Arc::clone(&store),
                events: events.clone(),
            },
            config.handoff(),
        );
        let selector = MetricSourceSelector::new(Arc::clone(&registry), config.max_sample_age);
        let (core_stop, _) = broadcast::channel(1);

        info!(
            device.id = %local.id,
            device.class = %local.class,
            peer.id = %peer.id,
            "Coordination core created"
        );

        Ok(Self {
            inner: Arc::new(CoreInner {
                config,
                local: local.id,
                local_class: local.class,
                peer: peer.id,
                transport,
                registry,
                selector,
                store,
                role,
                synchronizer,
                monitor,
                events,
                channel: RwLock::new(None),
                session_stop: Mutex::new(None),
                core_stop,
                shut_down: AtomicBool::new(false),
            }),
            inbound: Mutex::new(Some(inbound)),
            tasks: Mutex::new(Vec::new()),
        })
    }

    /// Spawn the inbound listener, the discovery loop and the reconnect watcher
    ///
    /// # Errors
    ///
    /// Returns `CoordinationError::ShutDown` after [`CoordinationCore::shutdown`].
    pub async fn start(&self) -> CoordinationResult<()> {
        self.inner.ensure_running()?;
        let Some(inbound) = self.inbound.lock().await.take() else {
            debug!(device.id = %self.inner.local, "Coordination core already started");
            return Ok(());
        };

        let (changes_tx, changes_rx) = mpsc::channel(CONNECTIVITY_QUEUE);
        let mut tasks = self.tasks.lock().await;
        tasks.push(self.inner.spawn_inbound(inbound));
        tasks.push(self.inner.registry.spawn_discovery(
            self.inner.config.discovery_interval,
            self.inner.core_stop.subscribe(),
            changes_tx,
        ));
        tasks.push(self.inner.spawn_connectivity_watch(changes_rx));

        info!(
            device.id = %self.inner.local,
            discovery = ?self.inner.config.discovery_interval,
            "Coordination core started"
        );
        Ok(())
    }

    /// Begin a workout session on this device and announce it to the peer
    ///
    /// # Errors
    ///
    /// Returns `SessionAlreadyActive` while another session is live and
    /// `ShutDown` after shutdown.
    pub async fn start_session(
        &self,
        category: WorkoutCategory,
        is_indoor: bool,
    ) -> CoordinationResult<Arc<WorkoutSession>> {
        let inner = &self.inner;
        inner.ensure_running()?;
        let transition = inner.synchronizer.start(category, is_indoor).await?;
        let session = Arc::clone(&transition.session);

        inner.monitor.adopt_role(gps_owner(category, is_indoor));
        inner.publish_transition(&transition);
        inner.activate(&session).await;
        inner
            .deliver(
                session.id,
                state_message(&session, StateIntent::Transition),
                false,
            )
            .await;
        Ok(session)
    }

    /// Move the live session to `desired`
    ///
    /// When the peer already reported a diverging state the outcome is
    /// reconciled against it and may differ from `desired`. Terminal
    /// outcomes stop the session's periodic tasks and flush a durable state
    /// update to the peer.
    ///
    /// # Errors
    ///
    /// Returns `InvalidTransition` for an illegal step, `NoActiveSession` or
    /// `SessionMismatch` when `session_id` is not live, `ShutDown` after
    /// shutdown.
    pub async fn request_transition(
        &self,
        session_id: Uuid,
        desired: SessionState,
    ) -> CoordinationResult<StateTransition> {
        let inner = &self.inner;
        inner.ensure_running()?;
        let (transition, message) = inner.synchronizer.propose(session_id, desired).await?;
        inner.publish_transition(&transition);

        let terminal = transition.to.is_terminal();
        if terminal {
            inner.deactivate(session_id).await;
        }
        inner.deliver(session_id, message, terminal).await;
        Ok(transition)
    }

    /// The live session
    pub async fn current_session(&self) -> Option<Arc<WorkoutSession>> {
        self.inner.store.current().await
    }

    /// A live or recently finished session
    pub async fn session(&self, session_id: Uuid) -> Option<Arc<WorkoutSession>> {
        self.inner.store.find(session_id).await
    }

    /// Every event published from now on
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<CoordinationEvent> {
        self.inner.events.subscribe()
    }

    /// Merged snapshots of the live session
    #[must_use]
    pub fn snapshot_changes(&self) -> impl Stream<Item = Arc<MetricSnapshot>> + Send + Unpin {
        self.inner.events.snapshot_changes()
    }

    /// Lifecycle changes of the local replica
    #[must_use]
    pub fn state_changes(&self) -> impl Stream<Item = StateChange> + Send + Unpin {
        self.inner.events.state_changes()
    }

    /// Handoff decisions taken by this device, oldest first
    pub async fn handoff_log(&self) -> Vec<HandoffDecision> {
        self.inner.monitor.log().await
    }

    /// Class currently holding the primary role, as seen by this device
    #[must_use]
    pub fn primary_role(&self) -> DeviceClass {
        self.inner.role.current()
    }

    /// Whether the peer is currently considered available
    #[must_use]
    pub fn peer_available(&self) -> bool {
        self.inner
            .registry
            .get(&self.inner.peer)
            .is_some_and(|device| device.is_live())
    }

    /// Device registry of this core
    #[must_use]
    pub fn registry(&self) -> &Arc<DeviceRegistry> {
        &self.inner.registry
    }

    /// Add a third-party wearable; connected right away when in range
    ///
    /// # Errors
    ///
    /// Returns `DuplicateDevice` if the id is taken.
    pub async fn register_wearable(
        &self,
        source: Arc<dyn TelemetrySource>,
    ) -> CoordinationResult<()> {
        let id = source.id().clone();
        self.inner.registry.register_source(Arc::clone(&source))?;
        if source.is_reachable().await {
            match source.connect().await {
                Ok(()) => {
                    self.inner.registry.set_connectivity(&id, true)?;
                }
                Err(e) => {
                    warn!(device.id = %id, error = %e, "Wearable left for discovery to connect");
                }
            }
        }
        Ok(())
    }

    /// Sync history of the live or most recent session
    pub async fn sync_history(&self) -> Vec<SyncRecord> {
        let channel = self.inner.channel.read().await.clone();
        match channel {
            Some(channel) => channel.history().await,
            None => Vec::new(),
        }
    }

    /// Run one metrics sync tick now
    pub async fn tick_metrics(&self) -> Option<SyncRecord> {
        self.inner.tick_metrics().await
    }

    /// Run one handoff evaluation now
    pub async fn evaluate_handoff(&self) -> Option<HandoffDecision> {
        self.inner.evaluate_handoff().await
    }

    /// Recover after the peer came back: reconcile the session, adopt the
    /// peer's role view when companion, and resync metrics
    ///
    /// # Errors
    ///
    /// Returns a peer failure (`Timeout`, `Transport`, `UnexpectedReply`)
    /// when the session snapshot request goes unanswered.
    pub async fn reconnect(&self) -> CoordinationResult<()> {
        self.inner.ensure_running()?;
        self.inner.reconnect().await
    }

    /// Stop every task of this core; idempotent
    pub async fn shutdown(&self) {
        let inner = &self.inner;
        if inner.shut_down.swap(true, Ordering::SeqCst) {
            return;
        }
        if let Some(session) = inner.store.current().await {
            inner.deactivate(session.id).await;
        }
        if inner.core_stop.send(()).is_err() {
            debug!("No core tasks were running");
        }

        let tasks = mem::take(&mut *self.tasks.lock().await);
        for task in tasks {
            if let Err(e) = task.await {
                warn!(error = %e, "Core task ended abnormally");
            }
        }
        info!(device.id = %inner.local, "Coordination core shut down");
    }
}

impl Drop for CoordinationCore {
    fn drop(&mut self) {
        if self.inner.core_stop.send(()).is_err() {
            debug!("Core stop signal had no listeners on drop");
        }
    }
}

impl CoreInner {
    fn ensure_running(&self) -> CoordinationResult<()> {
        if self.shut_down.load(Ordering::SeqCst) {
            Err(CoordinationError::ShutDown)
        } else {
            Ok(())
        }
    }

    fn publish_transition(&self, transition: &StateTransition) {
        if transition.from == transition.to {
            return;
        }
        self.events.publish(CoordinationEvent::StateChanged {
            session_id: transition.session.id,
            from: transition.from,
            to: transition.to,
        });
    }

    /// Create the session's sync channel and spawn its ticks
    async fn activate(self: &Arc<Self>, session: &WorkoutSession) {
        let channel = Arc::new(MetricsSyncChannel::new(
            session.id,
            self.local_class,
            self.peer.clone(),
            Arc::clone(&self.transport),
            self.config.sync_channel(),
        ));
        *self.channel.write().await = Some(channel);

        let (stop, _) = broadcast::channel(1);
        self.spawn_tick(Tick::Metrics, stop.subscribe());
        self.spawn_tick(Tick::Handoff, stop.subscribe());
        if let Some(previous) = self.session_stop.lock().await.replace(stop) {
            if previous.send(()).is_err() {
                debug!("Previous session tasks already stopped");
            }
        }
        info!(
            session.id = %session.id,
            sync_interval = ?self.config.metrics_sync_interval,
            handoff_interval = ?self.config.handoff_interval,
            "Session activities started"
        );
    }

    async fn deactivate(&self, session_id: Uuid) {
        let Some(stop) = self.session_stop.lock().await.take() else {
            return;
        };
        if stop.send(()).is_err() {
            debug!(session.id = %session_id, "Session tasks already stopped");
        }
        info!(session.id = %session_id, "Session activities stopped");
    }

    fn spawn_tick(
        self: &Arc<Self>,
        tick: Tick,
        mut session_stop: broadcast::Receiver<()>,
    ) {
        let inner = Arc::clone(self);
        let mut core_stop = self.core_stop.subscribe();
        let period = match tick {
            Tick::Metrics => self.config.metrics_sync_interval,
            Tick::Handoff => self.config.handoff_interval,
        };

        tokio::spawn(async move {
            let mut ticker = time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            // The first tick completes immediately
            ticker.tick().await;
            loop {
                tokio::select! {
                    _ = ticker.tick() => inner.run_tick(tick).await,
                    _ = session_stop.recv() => {
                        debug!(?tick, "Session tick received shutdown signal");
                        break;
                    }
                    _ = core_stop.recv() => {
                        debug!(?tick, "Session tick stopped with the core");
                        break;
                    }
                }
            }
        });
    }

    async fn run_tick(&self, tick: Tick) {
        match tick {
            Tick::Metrics => {
                self.tick_metrics().await;
            }
            Tick::Handoff => {
                self.evaluate_handoff().await;
            }
        }
    }

    async fn live_channel(&self) -> Option<Arc<MetricsSyncChannel>> {
        let channel = self.channel.read().await.clone()?;
        self.store
            .current_matching(channel.session_id())
            .await
            .map(|_| channel)
    }

    async fn tick_metrics(&self) -> Option<SyncRecord> {
        let channel = self.live_channel().await?;
        let session = self.store.current_matching(channel.session_id()).await?;

        self.registry.refresh_snapshots().await;
        let available = self.registry.available_samples();
        let snapshot = self
            .store
            .update_snapshot(session.id, |held| {
                let merged = self.selector.select_snapshot(
                    session.category,
                    session.is_indoor,
                    &available,
                    held,
                );
                enforce_floor(merged, held)
            })
            .await?;
        self.events
            .publish(CoordinationEvent::SnapshotChanged(Arc::clone(&snapshot)));

        let record = channel.push(&snapshot).await;
        if record.mode != DeliveryMode::Immediate {
            self.mark_peer_unavailable();
        }
        Some(record)
    }

    fn mark_peer_unavailable(&self) {
        if matches!(self.registry.set_connectivity(&self.peer, false), Ok(true)) {
            warn!(peer = %self.peer, "Peer unavailable, metrics continue in durable mode");
            self.events
                .publish(CoordinationEvent::PeerAvailability(false));
        }
    }

    async fn evaluate_handoff(&self) -> Option<HandoffDecision> {
        let session = self.store.current().await?;
        self.monitor.evaluate_once(&session).await
    }

    /// Send `body` now, falling back to durable delivery; `flush` always
    /// leaves a durable copy for the peer
    ///
    /// Durable copies of state messages travel as observations, so the peer
    /// reconciles them through `resolve` when the link comes back.
    async fn deliver(&self, session_id: Uuid, body: MessageBody, flush: bool) {
        let envelope = Envelope::new(self.local_class, Some(session_id), body);
        let kind = envelope.kind();
        let mut delivered = false;

        if self.transport.is_reachable(&self.peer) {
            let bound = self.config.immediate_send_timeout;
            match timeout(
                bound,
                self.transport.send_immediate(&self.peer, envelope.clone()),
            )
            .await
            {
                Ok(Ok(_)) => delivered = true,
                Ok(Err(e)) => {
                    warn!(peer = %self.peer, message.kind = ?kind, error = %e, "Immediate delivery failed");
                }
                Err(_) => {
                    warn!(peer = %self.peer, message.kind = ?kind, timeout = ?bound, "Immediate delivery timed out");
                }
            }
        }

        if flush || !delivered {
            let durable = envelope.for_durable_delivery();
            if let Err(e) = self.transport.send_durable(&self.peer, durable).await {
                warn!(peer = %self.peer, message.kind = ?kind, error = %e, "Durable delivery failed");
            }
        }
    }

    fn spawn_inbound(self: &Arc<Self>, mut inbound: mpsc::Receiver<Inbound>) -> JoinHandle<()> {
        let inner = Arc::clone(self);
        let mut stop = self.core_stop.subscribe();
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    received = inbound.recv() => {
                        let Some(message) = received else {
                            debug!("Inbound queue closed, stopping listener");
                            break;
                        };
                        inner.handle_inbound(message).await;
                    }
                    _ = stop.recv() => {
                        debug!("Inbound listener received shutdown signal");
                        break;
                    }
                }
            }
        })
    }

    /// Process one inbound message; never waits on the peer
    async fn handle_inbound(self: &Arc<Self>, inbound: Inbound) {
        let Inbound { envelope, reply } = inbound;
        debug!(
            message.kind = ?envelope.kind(),
            sender = %envelope.sender,
            inbound.session = ?envelope.session_id,
            "Inbound message"
        );

        let answer = match &envelope.body {
            MessageBody::Metrics(payload) => {
                self.on_metrics(&envelope, payload).await;
                None
            }
            MessageBody::State(payload) => {
                let reconciled = self
                    .synchronizer
                    .apply_remote(envelope.session_id, payload)
                    .await;
                self.apply_reconciled(envelope.session_id, reconciled).await;
                None
            }
            MessageBody::HandoffRequest(request) => Some(MessageBody::HandoffAck(
                self.monitor
                    .accept_request(envelope.session_id, request)
                    .await,
            )),
            MessageBody::CapabilityQuery => {
                Some(MessageBody::CapabilityResponse(self.monitor.local_status()))
            }
            MessageBody::SessionSnapshotRequest => Some(MessageBody::SessionSnapshot(
                self.snapshot_payload(envelope.session_id).await,
            )),
            MessageBody::SessionSnapshot(payload) => {
                self.on_session_snapshot(payload).await;
                None
            }
            MessageBody::HandoffAck(_) | MessageBody::CapabilityResponse(_) => {
                debug!(message.kind = ?envelope.kind(), "Ignored reply outside a request");
                None
            }
        };

        match (answer, reply) {
            (Some(body), Some(slot)) => {
                if slot.send(envelope.reply(self.local_class, body)).is_err() {
                    debug!(message.kind = ?envelope.kind(), "Requester stopped waiting for the reply");
                }
            }
            (Some(_), None) => {
                debug!(message.kind = ?envelope.kind(), "Request arrived without a reply slot");
            }
            (None, _) => {}
        }
    }

    async fn on_metrics(&self, envelope: &Envelope, payload: &MetricsPayload) {
        let Some(channel) = self.live_channel().await else {
            debug!(inbound.session = ?envelope.session_id, "Metrics without a live session");
            return;
        };
        let Some(session) = self.store.current_matching(channel.session_id()).await else {
            return;
        };
        let Some(outcome) = channel
            .ingest(
                envelope.session_id,
                envelope.timestamp_epoch_seconds,
                payload,
                &session.snapshot,
            )
            .await
        else {
            return;
        };

        if let Err(e) = self
            .registry
            .update_snapshot(&self.peer, payload.metrics.to_snapshot(Utc::now()))
        {
            debug!(peer = %self.peer, error = %e, "Peer snapshot not recorded");
        }
        let merged = self
            .store
            .update_snapshot(session.id, |held| enforce_floor(outcome.snapshot, held))
            .await;
        if let Some(snapshot) = merged {
            self.events
                .publish(CoordinationEvent::SnapshotChanged(snapshot));
        }
    }

    async fn snapshot_payload(&self, session_id: Option<Uuid>) -> SessionSnapshotPayload {
        SessionSnapshotPayload {
            session: self.synchronizer.summary(session_id).await,
            primary_role: self.role.current(),
        }
    }

    async fn on_session_snapshot(self: &Arc<Self>, payload: &SessionSnapshotPayload) {
        let peer_session = payload.session.as_ref();
        let reconciled = self.synchronizer.reconcile(peer_session).await;
        self.apply_reconciled(peer_session.map(|summary| summary.id), reconciled)
            .await;
        if self.local_class == DeviceClass::CompanionUnit {
            self.monitor.adopt_role(payload.primary_role);
        }
    }

    /// Publish, start or stop whatever a reconciliation changed, and send its echo
    async fn apply_reconciled(self: &Arc<Self>, session_id: Option<Uuid>, reconciled: Reconciled) {
        let Reconciled {
            change,
            created,
            echo,
        } = reconciled;

        if let Some(transition) = &change {
            self.publish_transition(transition);
            let session = &transition.session;
            if created {
                self.monitor
                    .adopt_role(gps_owner(session.category, session.is_indoor));
                self.activate(session).await;
            } else if transition.to.is_terminal() {
                self.deactivate(session.id).await;
            }
        }

        let Some(body) = echo else {
            return;
        };
        let target = match session_id {
            Some(id) => Some(id),
            None => self.store.current().await.map(|session| session.id),
        };
        let Some(target) = target else {
            return;
        };
        let inner = Arc::clone(self);
        tokio::spawn(async move {
            inner.deliver(target, body, false).await;
        });
    }

    fn spawn_connectivity_watch(
        self: &Arc<Self>,
        mut changes: mpsc::Receiver<ConnectivityChange>,
    ) -> JoinHandle<()> {
        let inner = Arc::clone(self);
        let mut stop = self.core_stop.subscribe();
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    change = changes.recv() => {
                        let Some(change) = change else {
                            break;
                        };
                        inner.on_connectivity(&change).await;
                    }
                    _ = stop.recv() => break,
                }
            }
        })
    }

    async fn on_connectivity(self: &Arc<Self>, change: &ConnectivityChange) {
        if change.device_id != self.peer {
            debug!(
                device.id = %change.device_id,
                connected = change.connected,
                "Wearable connectivity changed"
            );
            return;
        }
        self.events
            .publish(CoordinationEvent::PeerAvailability(change.connected));
        if change.connected {
            if let Err(e) = self.reconnect().await {
                warn!(peer = %self.peer, error = %e, "Reconnect recovery failed");
            }
        }
    }

    async fn reconnect(self: &Arc<Self>) -> CoordinationResult<()> {
        if matches!(self.registry.set_connectivity(&self.peer, true), Ok(true)) {
            self.events
                .publish(CoordinationEvent::PeerAvailability(true));
        }

        let operation = "session snapshot request";
        let session_id = self.store.current().await.map(|session| session.id);
        let request = Envelope::new(
            self.local_class,
            session_id,
            MessageBody::SessionSnapshotRequest,
        );
        let bound = self.config.peer_request_timeout;
        let reply = timeout(bound, self.transport.send_immediate(&self.peer, request))
            .await
            .map_err(|_| CoordinationError::timeout(operation, millis(bound)))??
            .ok_or_else(|| CoordinationError::UnexpectedReply {
                operation,
                received: "no reply".to_owned(),
            })?;
        let payload = match reply.body {
            MessageBody::SessionSnapshot(payload) => payload,
            other => {
                return Err(CoordinationError::UnexpectedReply {
                    operation,
                    received: format!("{:?}", other.kind()),
                })
            }
        };

        self.on_session_snapshot(&payload).await;
        if let Some(channel) = self.live_channel().await {
            let resent = channel.resync().await;
            debug!(session.id = %channel.session_id(), resent, "Metrics resynced");
        }
        info!(
            peer = %self.peer,
            role.holder = %self.role.current(),
            "Reconnected to peer"
        );
        Ok(())
    }
}
