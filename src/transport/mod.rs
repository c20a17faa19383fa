// ABOUTME: Two-mode peer transport interface consumed by the coordination core
// ABOUTME: Immediate delivery with optional reply, durable last-value delivery, inbound queue
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! # Transport
//!
//! The raw bidirectional channel is an external collaborator. The core only
//! needs two send modes and a queue to receive on:
//!
//! - **immediate**: the peer is reachable; the send completes with an optional
//!   reply or an error
//! - **durable**: last-value-wins per message kind, delivered when the peer
//!   next becomes active
//!
//! Inbound messages are posted by the transport onto the core's queue as
//! [`Inbound`] values and consumed serially, which keeps per-peer send order.

/// In-memory linked transport pair
pub mod loopback;
/// Wire envelope and payloads
pub mod message;

pub use loopback::{LoopbackEndpoint, LoopbackTransport};
pub use message::{
    Envelope, HandoffAckPayload, HandoffRequestPayload, MessageBody, MessageKind,
    MetricsPayload, PeerStatus, SessionSnapshotPayload, SessionSummary, StateIntent,
    StatePayload,
};

use async_trait::async_trait;
use tandem_core::errors::TransportError;
use tandem_core::models::DeviceId;
use tokio::sync::{mpsc, oneshot};

/// Peer channel with immediate and durable delivery modes
#[async_trait]
pub trait Transport: Send + Sync {
    /// Deliver now; resolves with the peer's reply for request bodies
    ///
    /// # Errors
    ///
    /// Returns a `TransportError` when the peer is unreachable or the send fails.
    async fn send_immediate(
        &self,
        peer: &DeviceId,
        message: Envelope,
    ) -> Result<Option<Envelope>, TransportError>;

    /// Store for delivery on the peer's next activation, replacing any
    /// pending message of the same kind
    ///
    /// # Errors
    ///
    /// Returns a `TransportError` when the message cannot be queued at all.
    async fn send_durable(&self, peer: &DeviceId, message: Envelope) -> Result<(), TransportError>;

    /// Whether immediate delivery to `peer` is currently possible
    fn is_reachable(&self, peer: &DeviceId) -> bool;
}

/// A message posted onto the core's inbound queue
#[derive(Debug)]
pub struct Inbound {
    /// Received envelope
    pub envelope: Envelope,
    /// Reply slot for request bodies delivered in immediate mode
    pub reply: Option<oneshot::Sender<Envelope>>,
}

impl Inbound {
    /// Inbound message that expects no reply
    #[must_use]
    pub const fn message(envelope: Envelope) -> Self {
        Self {
            envelope,
            reply: None,
        }
    }

    /// Inbound request together with the receiver its reply arrives on
    #[must_use]
    pub fn request(envelope: Envelope) -> (Self, oneshot::Receiver<Envelope>) {
        let (tx, rx) = oneshot::channel();
        (
            Self {
                envelope,
                reply: Some(tx),
            },
            rx,
        )
    }
}

/// Create the queue a transport posts inbound messages onto
#[must_use]
pub fn inbound_channel(capacity: usize) -> (mpsc::Sender<Inbound>, mpsc::Receiver<Inbound>) {
    mpsc::channel(capacity)
}
