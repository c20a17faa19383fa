// ABOUTME: Replicates the session lifecycle across the two peers
// ABOUTME: Validates local proposals, adopts peer transitions and reconciles divergent replicas
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use std::sync::Arc;

use chrono::Utc;
use tandem_core::errors::{CoordinationError, CoordinationResult};
use tandem_core::models::{DeviceClass, SessionState, WorkoutCategory, WorkoutSession};
use tokio::sync::Mutex;
use tracing::{debug, info};
use uuid::Uuid;

use super::resolve::resolve;
use super::store::SessionStore;
use crate::handoff::PrimaryRole;
use crate::sync::{preserve_continuity, QuantizedMetrics};
use crate::transport::{MessageBody, SessionSummary, StateIntent, StatePayload};

/// A lifecycle step applied to the local replica
#[derive(Debug, Clone, PartialEq)]
pub struct StateTransition {
    /// Replica after the step
    pub session: Arc<WorkoutSession>,
    /// State before the step; `Idle` for a freshly created replica
    pub from: SessionState,
    /// State after the step
    pub to: SessionState,
}

/// Outcome of processing a peer's view of the session
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Reconciled {
    /// Local change, if any
    pub change: Option<StateTransition>,
    /// Whether a local replica was created for a peer-initiated session
    pub created: bool,
    /// Message to send back so the peer converges
    pub echo: Option<MessageBody>,
}

/// Keeps the local replica consistent with the peer's
pub struct SessionStateSynchronizer {
    local_class: DeviceClass,
    store: Arc<SessionStore>,
    role: Arc<PrimaryRole>,
    /// Last state the peer reported, per session
    peer_state: Mutex<Option<(Uuid, SessionState)>>,
}

impl SessionStateSynchronizer {
    /// Synchronizer for a device of class `local_class`
    #[must_use]
    pub fn new(local_class: DeviceClass, store: Arc<SessionStore>, role: Arc<PrimaryRole>) -> Self {
        Self {
            local_class,
            store,
            role,
            peer_state: Mutex::new(None),
        }
    }

    /// Session store backing the local replica
    #[must_use]
    pub const fn store(&self) -> &Arc<SessionStore> {
        &self.store
    }

    /// Begin a new local session in the `Starting` state
    ///
    /// # Errors
    ///
    /// Returns `CoordinationError::SessionAlreadyActive` while a session is live.
    pub async fn start(
        &self,
        category: WorkoutCategory,
        is_indoor: bool,
    ) -> CoordinationResult<StateTransition> {
        if let Some(current) = self.store.current().await {
            return Err(CoordinationError::SessionAlreadyActive {
                session_id: current.id,
            });
        }
        *self.peer_state.lock().await = None;

        let session = self
            .store
            .install(WorkoutSession::start(category, is_indoor))
            .await;
        info!(
            session.id = %session.id,
            session.category = %category,
            session.indoor = is_indoor,
            "Workout session started"
        );
        Ok(StateTransition {
            from: SessionState::Idle,
            to: session.state,
            session,
        })
    }

    /// Apply a locally requested transition
    ///
    /// When the peer already reported a different state for this session the
    /// request is reconciled against it, so the result may differ from
    /// `desired`.
    ///
    /// # Errors
    ///
    /// Returns `InvalidTransition` when `desired` is not a legal successor,
    /// `NoActiveSession` or `SessionMismatch` when `session_id` is not live.
    pub async fn propose(
        &self,
        session_id: Uuid,
        desired: SessionState,
    ) -> CoordinationResult<(StateTransition, MessageBody)> {
        let Some(current) = self.store.current().await else {
            return Err(match self.store.archived(session_id).await {
                Some(finished) => CoordinationError::invalid_transition(finished.state, desired),
                None => CoordinationError::NoActiveSession,
            });
        };
        if current.id != session_id {
            return Err(CoordinationError::SessionMismatch {
                requested: session_id,
                active: current.id,
            });
        }

        let diverged_peer = self
            .peer_state
            .lock()
            .await
            .filter(|(id, state)| *id == session_id && *state != current.state)
            .map(|(_, state)| state);
        let authority = self.role.authority_for(self.local_class);

        let mut rejected = None;
        let updated = self
            .store
            .update(session_id, |session| {
                if !session.state.can_transition_to(desired) {
                    rejected = Some(CoordinationError::invalid_transition(session.state, desired));
                    return None;
                }
                let target =
                    diverged_peer.map_or(desired, |peer| resolve(desired, peer, authority));
                Some(session.with_state(target))
            })
            .await;

        let Some((previous, next)) = updated else {
            return Err(rejected.unwrap_or(CoordinationError::NoActiveSession));
        };

        let intent = if next.state == desired {
            StateIntent::Transition
        } else {
            debug!(
                session.id = %session_id,
                desired = %desired,
                resolved = %next.state,
                "Local transition reconciled against diverged peer"
            );
            StateIntent::Observation
        };
        info!(
            session.id = %session_id,
            from = %previous.state,
            to = %next.state,
            "Session state changed locally"
        );
        let message = state_message(&next, intent);
        Ok((
            StateTransition {
                from: previous.state,
                to: next.state,
                session: next,
            },
            message,
        ))
    }

    /// Process a state message from the peer
    pub async fn apply_remote(
        &self,
        session_id: Option<Uuid>,
        payload: &StatePayload,
    ) -> Reconciled {
        let Some(session_id) = session_id else {
            debug!("Dropped state message without session id");
            return Reconciled::default();
        };
        *self.peer_state.lock().await = Some((session_id, payload.state));

        match self.store.current().await {
            Some(current) if current.id == session_id => {
                self.merge_remote(&current, payload).await
            }
            Some(current) => {
                debug!(
                    session.id = %current.id,
                    inbound.session = %session_id,
                    "Ignored state for another session"
                );
                Reconciled::default()
            }
            None => self.apply_to_absent(session_id, payload).await,
        }
    }

    async fn merge_remote(&self, current: &WorkoutSession, payload: &StatePayload) -> Reconciled {
        let authority = self.role.authority_for(self.local_class);
        let adopt = payload.intent == StateIntent::Transition
            && current.state.can_transition_to(payload.state);
        let target = if adopt {
            payload.state
        } else {
            resolve(current.state, payload.state, authority)
        };

        let change = if target == current.state {
            None
        } else {
            self.store
                .update(current.id, |session| {
                    (session.state == current.state).then(|| session.with_state(target))
                })
                .await
                .map(|(previous, next)| {
                    info!(
                        session.id = %next.id,
                        from = %previous.state,
                        to = %next.state,
                        peer = %payload.state,
                        "Session state changed by peer"
                    );
                    StateTransition {
                        from: previous.state,
                        to: next.state,
                        session: next,
                    }
                })
        };

        let echo = (target != payload.state).then(|| {
            let session = change
                .as_ref()
                .map_or_else(|| current.with_state(target), |c| c.session.as_ref().clone());
            state_message(&session, StateIntent::Observation)
        });

        Reconciled {
            change,
            created: false,
            echo,
        }
    }

    async fn apply_to_absent(&self, session_id: Uuid, payload: &StatePayload) -> Reconciled {
        if let Some(finished) = self.store.archived(session_id).await {
            debug!(
                session.id = %session_id,
                archived = %finished.state,
                peer = %payload.state,
                "State for a finished session"
            );
            let echo = (finished.state != payload.state)
                .then(|| state_message(&finished, StateIntent::Observation));
            return Reconciled {
                change: None,
                created: false,
                echo,
            };
        }
        if payload.state.is_terminal() || payload.state == SessionState::Idle {
            debug!(session.id = %session_id, peer = %payload.state, "No replica to create");
            return Reconciled::default();
        }

        let session = self
            .store
            .install(WorkoutSession::replica(
                session_id,
                payload.category,
                payload.is_indoor,
                payload.started_at,
                payload.state,
            ))
            .await;
        info!(
            session.id = %session_id,
            session.category = %payload.category,
            state = %payload.state,
            "Created replica of peer-initiated session"
        );
        Reconciled {
            change: Some(StateTransition {
                from: SessionState::Idle,
                to: session.state,
                session,
            }),
            created: true,
            echo: None,
        }
    }

    /// Reconcile with the peer's full session view after a reconnect
    pub async fn reconcile(&self, peer: Option<&SessionSummary>) -> Reconciled {
        let Some(summary) = peer else {
            // The peer knows no session; announce ours so it builds a replica
            return match self.store.current().await {
                Some(current) => Reconciled {
                    echo: Some(state_message(&current, StateIntent::Observation)),
                    ..Reconciled::default()
                },
                None => Reconciled::default(),
            };
        };

        let payload = StatePayload {
            state: summary.state,
            intent: StateIntent::Observation,
            category: summary.category,
            is_indoor: summary.is_indoor,
            started_at: summary.started_at,
        };
        let reconciled = self.apply_remote(Some(summary.id), &payload).await;

        let merged = self
            .store
            .update_snapshot(summary.id, |held| {
                preserve_continuity(held, &summary.metrics, Utc::now()).snapshot
            })
            .await;
        if merged.is_some() {
            debug!(session.id = %summary.id, "Merged peer snapshot after reconnect");
        }
        reconciled
    }

    /// This device's view of session `session_id`, or of the live session
    pub async fn summary(&self, session_id: Option<Uuid>) -> Option<SessionSummary> {
        let session = match session_id {
            Some(id) => self.store.find(id).await,
            None => self.store.current().await,
        }?;
        Some(SessionSummary {
            id: session.id,
            category: session.category,
            state: session.state,
            is_indoor: session.is_indoor,
            started_at: session.started_at,
            metrics: QuantizedMetrics::from_snapshot(&session.snapshot),
        })
    }

    /// Last state the peer reported for `session_id`
    pub async fn peer_state(&self, session_id: Uuid) -> Option<SessionState> {
        self.peer_state
            .lock()
            .await
            .filter(|(id, _)| *id == session_id)
            .map(|(_, state)| state)
    }
}

/// State message announcing `session`'s current state
#[must_use]
pub fn state_message(session: &WorkoutSession, intent: StateIntent) -> MessageBody {
    MessageBody::State(StatePayload {
        state: session.state,
        intent,
        category: session.category,
        is_indoor: session.is_indoor,
        started_at: session.started_at,
    })
}
