// ABOUTME: Transport-agnostic wire messages exchanged between the two peers
// ABOUTME: Envelope with type tag, payload, session id, sender class and epoch timestamp
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use tandem_core::models::{
    DeviceClass, HandoffDirection, HandoffReason, SessionState, WorkoutCategory,
};

use crate::sync::quantize::QuantizedMetrics;

/// Discriminant of a message body, used for last-value-wins durable slots
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageKind {
    /// Live metric snapshot
    Metrics,
    /// Lifecycle state
    State,
    /// Request to take over the primary role
    HandoffRequest,
    /// Answer to a handoff request
    HandoffAck,
    /// Request for the peer's environment signals
    CapabilityQuery,
    /// Answer to a capability query
    CapabilityResponse,
    /// Request for the peer's full session view
    SessionSnapshotRequest,
    /// Answer to a session snapshot request
    SessionSnapshot,
}

impl MessageKind {
    /// Order in which pending durable messages are delivered on activation
    pub const DELIVERY_ORDER: [Self; 8] = [
        Self::State,
        Self::SessionSnapshot,
        Self::HandoffRequest,
        Self::HandoffAck,
        Self::CapabilityQuery,
        Self::CapabilityResponse,
        Self::SessionSnapshotRequest,
        Self::Metrics,
    ];
}

/// Whether a state message reports a user action or an observation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum StateIntent {
    /// The sender just performed this transition on purpose
    Transition,
    /// The sender reports the state it currently holds
    Observation,
}

/// Metric snapshot push
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricsPayload {
    /// Sender-local tick number, increasing per session
    pub tick: u64,
    /// Quantized field map
    pub metrics: QuantizedMetrics,
}

/// Lifecycle state push, carrying enough to create a replica
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatePayload {
    /// Sender's state
    pub state: SessionState,
    /// Transition or observation
    pub intent: StateIntent,
    /// Workout category
    pub category: WorkoutCategory,
    /// Indoor flag
    pub is_indoor: bool,
    /// Session start
    pub started_at: DateTime<Utc>,
}

/// Handoff request seeding the new role holder
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HandoffRequestPayload {
    /// Role movement
    pub direction: HandoffDirection,
    /// Triggering rule
    pub reason: HandoffReason,
    /// Sender's merged snapshot
    pub snapshot: QuantizedMetrics,
}

/// Answer to a handoff request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HandoffAckPayload {
    /// Whether the receiver switched roles
    pub accepted: bool,
    /// Why the request was refused
    pub reason: Option<String>,
}

/// Environment signals of a peer, returned for a capability query
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PeerStatus {
    /// Battery charge fraction
    pub battery_level: f64,
    /// Satellite positioning usable
    pub has_good_gps: bool,
    /// Heart rate sensor delivering
    pub has_heart_rate: bool,
    /// App in the foreground
    pub is_foreground: bool,
}

impl PeerStatus {
    /// Whether the peer has any sensor that can carry the workout
    #[must_use]
    pub const fn has_usable_sensors(&self) -> bool {
        self.has_good_gps || self.has_heart_rate
    }
}

/// One side's complete view of the session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSummary {
    /// Session identifier
    pub id: Uuid,
    /// Workout category
    pub category: WorkoutCategory,
    /// Lifecycle state
    pub state: SessionState,
    /// Indoor flag
    pub is_indoor: bool,
    /// Session start
    pub started_at: DateTime<Utc>,
    /// Merged snapshot
    pub metrics: QuantizedMetrics,
}

/// Answer to a session snapshot request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSnapshotPayload {
    /// The session, if the sender knows of one
    pub session: Option<SessionSummary>,
    /// Class the sender believes holds the primary role
    pub primary_role: DeviceClass,
}

/// Message body, serialized as `{"type": ..., "payload": ...}`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "camelCase")]
pub enum MessageBody {
    /// Live metric snapshot
    Metrics(MetricsPayload),
    /// Lifecycle state
    State(StatePayload),
    /// Request to take over the primary role
    HandoffRequest(HandoffRequestPayload),
    /// Answer to a handoff request
    HandoffAck(HandoffAckPayload),
    /// Request for the peer's environment signals
    CapabilityQuery,
    /// Answer to a capability query
    CapabilityResponse(PeerStatus),
    /// Request for the peer's session view
    SessionSnapshotRequest,
    /// Answer to a session snapshot request
    SessionSnapshot(SessionSnapshotPayload),
}

impl MessageBody {
    /// Discriminant of this body
    #[must_use]
    pub const fn kind(&self) -> MessageKind {
        match self {
            Self::Metrics(_) => MessageKind::Metrics,
            Self::State(_) => MessageKind::State,
            Self::HandoffRequest(_) => MessageKind::HandoffRequest,
            Self::HandoffAck(_) => MessageKind::HandoffAck,
            Self::CapabilityQuery => MessageKind::CapabilityQuery,
            Self::CapabilityResponse(_) => MessageKind::CapabilityResponse,
            Self::SessionSnapshotRequest => MessageKind::SessionSnapshotRequest,
            Self::SessionSnapshot(_) => MessageKind::SessionSnapshot,
        }
    }

    /// Whether the sender waits for a reply to this body
    #[must_use]
    pub const fn expects_reply(&self) -> bool {
        matches!(
            self,
            Self::HandoffRequest(_) | Self::CapabilityQuery | Self::SessionSnapshotRequest
        )
    }

    /// Same body with a state transition downgraded to an observation
    ///
    /// The receiver reconciles observations instead of adopting them.
    #[must_use]
    pub fn into_observation(self) -> Self {
        match self {
            Self::State(payload) => Self::State(StatePayload {
                intent: StateIntent::Observation,
                ..payload
            }),
            other => other,
        }
    }
}

/// Wire envelope
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Envelope {
    /// Type tag and payload
    #[serde(flatten)]
    pub body: MessageBody,
    /// Session the message refers to
    pub session_id: Option<Uuid>,
    /// Class of the sending device
    pub sender: DeviceClass,
    /// Correlates a reply with its request
    pub request_id: Option<Uuid>,
    /// Send time in seconds since the Unix epoch
    pub timestamp_epoch_seconds: f64,
}

impl Envelope {
    /// Wrap a body sent now
    #[must_use]
    pub fn new(sender: DeviceClass, session_id: Option<Uuid>, body: MessageBody) -> Self {
        let request_id = body.expects_reply().then(Uuid::new_v4);
        Self {
            body,
            session_id,
            sender,
            request_id,
            timestamp_epoch_seconds: epoch_seconds(Utc::now()),
        }
    }

    /// Build the reply to this envelope
    #[must_use]
    pub fn reply(&self, sender: DeviceClass, body: MessageBody) -> Self {
        Self {
            body,
            session_id: self.session_id,
            sender,
            request_id: self.request_id,
            timestamp_epoch_seconds: epoch_seconds(Utc::now()),
        }
    }

    /// Copy left for later delivery; state transitions become observations
    #[must_use]
    pub fn for_durable_delivery(self) -> Self {
        Self {
            body: self.body.into_observation(),
            ..self
        }
    }

    /// Discriminant of the body
    #[must_use]
    pub const fn kind(&self) -> MessageKind {
        self.body.kind()
    }

    /// Encode as JSON
    ///
    /// # Errors
    ///
    /// Returns an error if a payload cannot be serialized.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    /// Decode from JSON
    ///
    /// # Errors
    ///
    /// Returns an error if the input is not a valid envelope.
    pub fn from_json(input: &str) -> serde_json::Result<Self> {
        serde_json::from_str(input)
    }
}

#[allow(clippy::cast_precision_loss)]
fn epoch_seconds(at: DateTime<Utc>) -> f64 {
    at.timestamp_millis() as f64 / 1000.0
}
