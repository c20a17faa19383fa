// ABOUTME: Metrics sync channel pushing the merged snapshot to the peer every tick
// ABOUTME: Immediate delivery with same-tick durable fallback, tick cache and inbound ordering
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! # Metrics Sync Channel
//!
//! One channel exists per session. Each call to [`MetricsSyncChannel::push`]
//! is one tick: the snapshot is quantized, cached under the tick number and
//! sent. When immediate delivery fails the same payload goes out durably in
//! the same tick, so every tick ends up in the sync history with the mode
//! that carried it.

/// Circuit breaker over immediate delivery
pub mod breaker;
/// Inbound merge rules
pub mod continuity;
/// Outbound payload shaping
pub mod quantize;

pub use breaker::{BreakerState, DeliveryBreaker, DeliveryBreakerConfig};
pub use continuity::{enforce_floor, preserve_continuity, ContinuityOutcome};
pub use quantize::QuantizedMetrics;

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tandem_core::errors::TransportError;
use tandem_core::models::{DeviceClass, DeviceId, MetricSnapshot};
use tokio::sync::Mutex;
use tokio::time::timeout;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::transport::{Envelope, MessageBody, MetricsPayload, Transport};

/// How a tick's payload left this device
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryMode {
    /// Delivered to a reachable peer
    Immediate,
    /// Stored for the peer's next activation
    Durable,
    /// Neither mode accepted the payload
    Undelivered,
}

/// One entry of the per-session sync history
#[derive(Debug, Clone, PartialEq)]
pub struct SyncRecord {
    /// Tick number
    pub tick: u64,
    /// When the tick ran
    pub at: DateTime<Utc>,
    /// Mode that carried the payload
    pub mode: DeliveryMode,
    /// Whether an immediate attempt failed before the final mode
    pub fell_back: bool,
}

/// The newest locally produced payload
#[derive(Debug, Clone, PartialEq)]
pub struct CachedTick {
    /// Tick number
    pub tick: u64,
    /// When it was cached
    pub cached_at: DateTime<Utc>,
    /// Quantized payload
    pub metrics: QuantizedMetrics,
}

/// Static parameters of a channel
#[derive(Debug, Clone)]
pub struct SyncChannelConfig {
    /// Upper bound for one immediate send
    pub immediate_timeout: Duration,
    /// Records kept in the sync history
    pub history_capacity: usize,
    /// Delivery breaker thresholds
    pub breaker: DeliveryBreakerConfig,
}

#[derive(Default)]
struct ChannelState {
    next_tick: u64,
    cached: Option<CachedTick>,
    last_synced_tick: Option<u64>,
    history: VecDeque<SyncRecord>,
    last_inbound_tick: Option<u64>,
    last_inbound_sent_at: f64,
}

/// Periodic, loss-tolerant snapshot exchange for one session
pub struct MetricsSyncChannel {
    session_id: Uuid,
    local_class: DeviceClass,
    peer: DeviceId,
    transport: Arc<dyn Transport>,
    breaker: DeliveryBreaker,
    config: SyncChannelConfig,
    state: Mutex<ChannelState>,
}

impl MetricsSyncChannel {
    /// Channel for `session_id` towards `peer`
    #[must_use]
    pub fn new(
        session_id: Uuid,
        local_class: DeviceClass,
        peer: DeviceId,
        transport: Arc<dyn Transport>,
        config: SyncChannelConfig,
    ) -> Self {
        let breaker = DeliveryBreaker::new(peer.as_str(), config.breaker);
        Self {
            session_id,
            local_class,
            peer,
            transport,
            breaker,
            config,
            state: Mutex::new(ChannelState::default()),
        }
    }

    /// Session this channel serves
    #[must_use]
    pub const fn session_id(&self) -> Uuid {
        self.session_id
    }

    /// Immediate-delivery breaker
    #[must_use]
    pub const fn breaker(&self) -> &DeliveryBreaker {
        &self.breaker
    }

    /// Run one tick: cache, quantize and deliver `snapshot`
    pub async fn push(&self, snapshot: &MetricSnapshot) -> SyncRecord {
        let metrics = QuantizedMetrics::from_snapshot(snapshot);
        let tick = {
            let mut state = self.state.lock().await;
            let tick = state.next_tick;
            state.next_tick += 1;
            state.cached = Some(CachedTick {
                tick,
                cached_at: Utc::now(),
                metrics: metrics.clone(),
            });
            tick
        };

        let envelope = self.envelope(tick, metrics);
        let mut fell_back = false;

        // Reachability first: a breaker answer claims the half-open probe
        if self.transport.is_reachable(&self.peer) && self.breaker.allows_immediate() {
            match self.send_immediate(envelope.clone()).await {
                Ok(()) => {
                    self.breaker.record_success();
                    self.mark_delivered(tick).await;
                    return self.record(tick, DeliveryMode::Immediate, false).await;
                }
                Err(e) => {
                    self.breaker.record_failure();
                    warn!(
                        session.id = %self.session_id,
                        peer = %self.peer,
                        tick,
                        error = %e,
                        "Immediate metrics delivery failed, falling back to durable"
                    );
                    fell_back = true;
                }
            }
        }

        let mode = match self.transport.send_durable(&self.peer, envelope).await {
            Ok(()) => DeliveryMode::Durable,
            Err(e) => {
                warn!(
                    session.id = %self.session_id,
                    peer = %self.peer,
                    tick,
                    error = %e,
                    "Durable metrics delivery failed"
                );
                DeliveryMode::Undelivered
            }
        };
        self.record(tick, mode, fell_back).await
    }

    /// Re-send the newest cached tick if it never reached the peer directly
    ///
    /// Returns whether a payload was delivered.
    pub async fn resync(&self) -> bool {
        self.breaker.reset();
        let pending = {
            let state = self.state.lock().await;
            match (&state.cached, state.last_synced_tick) {
                (Some(cached), Some(synced)) if synced >= cached.tick => None,
                (Some(cached), _) => Some(cached.clone()),
                (None, _) => None,
            }
        };
        let Some(cached) = pending else {
            debug!(session.id = %self.session_id, "Nothing to resync");
            return false;
        };

        let envelope = self.envelope(cached.tick, cached.metrics);
        match self.send_immediate(envelope).await {
            Ok(()) => self.mark_delivered(cached.tick).await,
            Err(e) => {
                warn!(
                    session.id = %self.session_id,
                    tick = cached.tick,
                    error = %e,
                    "Resync after reconnect failed"
                );
                false
            }
        }
    }

    /// Accept an inbound payload and merge it into `current`
    ///
    /// Returns `None` for payloads from another session or older than the
    /// last one applied.
    pub async fn ingest(
        &self,
        session_id: Option<Uuid>,
        sent_at: f64,
        payload: &MetricsPayload,
        current: &MetricSnapshot,
    ) -> Option<ContinuityOutcome> {
        if session_id != Some(self.session_id) {
            debug!(
                session.id = %self.session_id,
                inbound.session = ?session_id,
                "Dropped metrics for another session"
            );
            return None;
        }

        {
            let mut state = self.state.lock().await;
            let out_of_order = state
                .last_inbound_tick
                .is_some_and(|last| payload.tick <= last)
                || sent_at < state.last_inbound_sent_at;
            if out_of_order {
                debug!(
                    session.id = %self.session_id,
                    tick = payload.tick,
                    last_tick = ?state.last_inbound_tick,
                    "Dropped out-of-order metrics"
                );
                return None;
            }
            state.last_inbound_tick = Some(payload.tick);
            state.last_inbound_sent_at = sent_at;
        }

        let outcome = preserve_continuity(current, &payload.metrics, Utc::now());
        if !outcome.discarded.is_empty() {
            debug!(
                session.id = %self.session_id,
                fields = ?outcome.discarded,
                "Discarded inbound metrics behind the held snapshot"
            );
        }
        Some(outcome)
    }

    /// Every tick recorded so far, oldest first
    pub async fn history(&self) -> Vec<SyncRecord> {
        self.state.lock().await.history.iter().cloned().collect()
    }

    /// Newest cached tick
    pub async fn cached(&self) -> Option<CachedTick> {
        self.state.lock().await.cached.clone()
    }

    /// Newest tick known to have reached the peer directly
    pub async fn last_synced_tick(&self) -> Option<u64> {
        self.state.lock().await.last_synced_tick
    }

    fn envelope(&self, tick: u64, metrics: QuantizedMetrics) -> Envelope {
        Envelope::new(
            self.local_class,
            Some(self.session_id),
            MessageBody::Metrics(MetricsPayload { tick, metrics }),
        )
    }

    async fn send_immediate(&self, envelope: Envelope) -> Result<(), TransportError> {
        let bound = self.config.immediate_timeout;
        match timeout(bound, self.transport.send_immediate(&self.peer, envelope)).await {
            Ok(result) => result.map(|_| ()),
            Err(_) => Err(TransportError::Timeout {
                peer: self.peer.clone(),
                timeout_ms: millis(bound),
            }),
        }
    }

    /// Advance the synced marker; a delivery already superseded is skipped
    async fn mark_delivered(&self, tick: u64) -> bool {
        let mut state = self.state.lock().await;
        if state.last_synced_tick.is_some_and(|synced| synced >= tick) {
            debug!(
                session.id = %self.session_id,
                tick,
                synced = ?state.last_synced_tick,
                "Late delivery superseded by a newer tick"
            );
            return false;
        }
        state.last_synced_tick = Some(tick);
        true
    }

    async fn record(&self, tick: u64, mode: DeliveryMode, fell_back: bool) -> SyncRecord {
        let record = SyncRecord {
            tick,
            at: Utc::now(),
            mode,
            fell_back,
        };
        let mut state = self.state.lock().await;
        if state.history.len() >= self.config.history_capacity.max(1) {
            state.history.pop_front();
        }
        state.history.push_back(record.clone());
        record
    }
}

#[allow(clippy::cast_possible_truncation)]
pub(crate) const fn millis(duration: Duration) -> u64 {
    duration.as_millis() as u64
}
