// ABOUTME: Handoff monitor evaluating role transfer on each tick and committing on acknowledgment
// ABOUTME: Queries peer capabilities, applies the cooldown and keeps the bounded decision log
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tandem_core::models::{
    DeviceClass, DeviceId, HandoffDecision, HandoffReason, WorkoutSession,
};
use tokio::sync::Mutex;
use tokio::time::{timeout, Instant};
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::role::PrimaryRole;
use super::rules::{evaluate, HandoffSignals};
use crate::events::{CoordinationEvent, EventBus};
use crate::sensors::LocalSignals;
use crate::session::SessionStore;
use crate::sync::{preserve_continuity, QuantizedMetrics};
use crate::transport::{
    Envelope, HandoffAckPayload, HandoffRequestPayload, MessageBody, PeerStatus, Transport,
};

/// Tunables of the handoff monitor
#[derive(Debug, Clone)]
pub struct HandoffConfig {
    /// Minimum time between two decisions
    pub cooldown: Duration,
    /// Battery fraction under which a side counts as low
    pub battery_threshold: f64,
    /// Bound for capability queries and handoff acknowledgments
    pub request_timeout: Duration,
    /// Decisions kept in the diagnostic log
    pub log_capacity: usize,
}

#[derive(Default)]
struct MonitorState {
    last_decision: Option<Instant>,
    was_backgrounded: bool,
    log: VecDeque<HandoffDecision>,
}

/// Collaborators the monitor talks to
pub struct HandoffLinks {
    /// Peer channel
    pub transport: Arc<dyn Transport>,
    /// Local environment signals
    pub signals: Arc<dyn LocalSignals>,
    /// Shared role holder
    pub role: Arc<PrimaryRole>,
    /// Session replica store
    pub store: Arc<SessionStore>,
    /// Event fan-out
    pub events: EventBus,
}

/// Decides and executes primary-role transfers
pub struct HandoffMonitor {
    local_class: DeviceClass,
    peer: DeviceId,
    links: HandoffLinks,
    config: HandoffConfig,
    state: Mutex<MonitorState>,
}

impl HandoffMonitor {
    /// Monitor for a device of class `local_class` paired with `peer`
    #[must_use]
    pub fn new(
        local_class: DeviceClass,
        peer: DeviceId,
        links: HandoffLinks,
        config: HandoffConfig,
    ) -> Self {
        Self {
            local_class,
            peer,
            links,
            config,
            state: Mutex::new(MonitorState::default()),
        }
    }

    /// Shared role holder
    #[must_use]
    pub const fn role(&self) -> &Arc<PrimaryRole> {
        &self.links.role
    }

    /// Decisions taken so far, oldest first
    pub async fn log(&self) -> Vec<HandoffDecision> {
        self.state.lock().await.log.iter().copied().collect()
    }

    /// This device's signals as reported to a capability query
    #[must_use]
    pub fn local_status(&self) -> PeerStatus {
        let signals = &self.links.signals;
        PeerStatus {
            battery_level: signals.battery_level(),
            has_good_gps: signals.has_good_gps(),
            has_heart_rate: signals.has_heart_rate(),
            is_foreground: signals.is_foreground(),
        }
    }

    /// Run one evaluation for `session`
    ///
    /// Only the primary unit evaluates; the companion answers requests.
    pub async fn evaluate_once(&self, session: &WorkoutSession) -> Option<HandoffDecision> {
        if self.local_class != DeviceClass::PrimaryUnit || session.is_finished() {
            return None;
        }

        let foreground = self.links.signals.is_foreground();
        let was_backgrounded = {
            let mut state = self.state.lock().await;
            if !foreground {
                state.was_backgrounded = true;
            } else if self.links.role.current() == DeviceClass::PrimaryUnit {
                state.was_backgrounded = false;
            }
            if let Some(last) = state.last_decision {
                if last.elapsed() < self.config.cooldown {
                    debug!(
                        session.id = %session.id,
                        since_last = ?last.elapsed(),
                        "Handoff evaluation skipped during cooldown"
                    );
                    return None;
                }
            }
            state.was_backgrounded
        };

        let peer_reachable = self.links.transport.is_reachable(&self.peer);
        let peer = if peer_reachable {
            self.query_capabilities(session.id).await
        } else {
            None
        };

        let signals = HandoffSignals {
            role_holder: self.links.role.current(),
            category: session.category,
            local_battery: self.links.signals.battery_level(),
            local_foreground: foreground,
            was_backgrounded,
            local_good_gps: self.links.signals.has_good_gps(),
            local_heart_rate: self.links.signals.has_heart_rate(),
            peer_reachable,
            peer,
        };
        let (direction, reason) = evaluate(&signals, self.config.battery_threshold)?;
        let decision = HandoffDecision::now(direction, reason);
        self.record(decision).await;

        let committed = if reason == HandoffReason::PeerUnreachable {
            true
        } else {
            self.request_handoff(session, decision).await
        };
        if committed {
            self.commit_role(direction.target());
            if reason == HandoffReason::Foregrounded {
                self.state.lock().await.was_backgrounded = false;
            }
        } else {
            info!(
                session.id = %session.id,
                direction = %direction,
                reason = %reason,
                "Handoff not acknowledged, role unchanged"
            );
        }
        Some(decision)
    }

    /// Answer a peer's handoff request
    pub async fn accept_request(
        &self,
        session_id: Option<Uuid>,
        request: &HandoffRequestPayload,
    ) -> HandoffAckPayload {
        let live = match session_id {
            Some(id) => self.links.store.current_matching(id).await,
            None => None,
        };
        let Some(session) = live else {
            debug!(inbound.session = ?session_id, "Refused handoff for unknown session");
            return HandoffAckPayload {
                accepted: false,
                reason: Some("no matching live session".to_owned()),
            };
        };

        let seeded = self
            .links
            .store
            .update_snapshot(session.id, |held| {
                preserve_continuity(held, &request.snapshot, Utc::now()).snapshot
            })
            .await;
        if let Some(snapshot) = seeded {
            self.links
                .events
                .publish(CoordinationEvent::SnapshotChanged(snapshot));
        }

        info!(
            session.id = %session.id,
            direction = %request.direction,
            reason = %request.reason,
            "Accepted handoff request"
        );
        self.commit_role(request.direction.target());
        HandoffAckPayload {
            accepted: true,
            reason: None,
        }
    }

    /// Adopt the peer's view of the role holder
    pub fn adopt_role(&self, holder: DeviceClass) {
        self.commit_role(holder);
    }

    fn commit_role(&self, target: DeviceClass) {
        if self.links.role.set(target) {
            info!(role.holder = %target, "Primary role moved");
            self.links
                .events
                .publish(CoordinationEvent::RoleChanged(target));
        }
    }

    async fn record(&self, decision: HandoffDecision) {
        {
            let mut state = self.state.lock().await;
            state.last_decision = Some(Instant::now());
            if state.log.len() >= self.config.log_capacity.max(1) {
                state.log.pop_front();
            }
            state.log.push_back(decision);
        }
        info!(
            direction = %decision.direction,
            reason = %decision.reason,
            "Handoff decided"
        );
        self.links
            .events
            .publish(CoordinationEvent::Handoff(decision));
    }

    async fn query_capabilities(&self, session_id: Uuid) -> Option<PeerStatus> {
        let query = Envelope::new(self.local_class, Some(session_id), MessageBody::CapabilityQuery);
        match self.request(query).await {
            Some(MessageBody::CapabilityResponse(status)) => Some(status),
            Some(other) => {
                warn!(received = ?other.kind(), "Unexpected reply to capability query");
                None
            }
            None => {
                warn!(peer = %self.peer, "Capability query unanswered, peer degraded for this tick");
                None
            }
        }
    }

    async fn request_handoff(&self, session: &WorkoutSession, decision: HandoffDecision) -> bool {
        let request = Envelope::new(
            self.local_class,
            Some(session.id),
            MessageBody::HandoffRequest(HandoffRequestPayload {
                direction: decision.direction,
                reason: decision.reason,
                snapshot: QuantizedMetrics::from_snapshot(&session.snapshot),
            }),
        );
        match self.request(request).await {
            Some(MessageBody::HandoffAck(ack)) => {
                if !ack.accepted {
                    info!(reason = ?ack.reason, "Peer refused handoff");
                }
                ack.accepted
            }
            Some(other) => {
                warn!(received = ?other.kind(), "Unexpected reply to handoff request");
                false
            }
            None => false,
        }
    }

    async fn request(&self, envelope: Envelope) -> Option<MessageBody> {
        let kind = envelope.kind();
        let sent = timeout(
            self.config.request_timeout,
            self.links.transport.send_immediate(&self.peer, envelope),
        )
        .await;
        match sent {
            Ok(Ok(reply)) => reply.map(|envelope| envelope.body),
            Ok(Err(e)) => {
                warn!(peer = %self.peer, request = ?kind, error = %e, "Peer request failed");
                None
            }
            Err(_) => {
                warn!(
                    peer = %self.peer,
                    request = ?kind,
                    timeout = ?self.config.request_timeout,
                    "Peer request timed out"
                );
                None
            }
        }
    }
}
