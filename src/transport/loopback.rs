// ABOUTME: In-memory transport pair linking two coordination cores in one process
// ABOUTME: Scriptable link state and failure injection for the simulator and tests
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;
use tandem_core::errors::TransportError;
use tandem_core::models::DeviceId;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use super::message::{Envelope, MessageKind};
use super::{inbound_channel, Inbound, Transport};

struct Side {
    id: DeviceId,
    inbound: mpsc::Sender<Inbound>,
    /// Durable messages waiting for this side to become active again
    pending: DashMap<MessageKind, Envelope>,
    fail_immediate: AtomicBool,
    immediate_sends: AtomicU64,
    durable_sends: AtomicU64,
}

struct Link {
    up: AtomicBool,
    sides: [Side; 2],
}

/// One end of an in-memory link
#[derive(Clone)]
pub struct LoopbackTransport {
    link: Arc<Link>,
    index: usize,
}

/// A transport end together with the queue its peer posts onto
pub struct LoopbackEndpoint {
    /// Sending half handed to the coordination core
    pub transport: Arc<LoopbackTransport>,
    /// Inbound queue the coordination core consumes
    pub inbound: mpsc::Receiver<Inbound>,
}

impl LoopbackTransport {
    /// Create two linked ends; the link starts up
    #[must_use]
    pub fn pair(
        first: DeviceId,
        second: DeviceId,
        queue_capacity: usize,
    ) -> (LoopbackEndpoint, LoopbackEndpoint) {
        let (first_tx, first_rx) = inbound_channel(queue_capacity);
        let (second_tx, second_rx) = inbound_channel(queue_capacity);
        let link = Arc::new(Link {
            up: AtomicBool::new(true),
            sides: [Side::new(first, first_tx), Side::new(second, second_tx)],
        });

        let first_end = LoopbackEndpoint {
            transport: Arc::new(Self {
                link: Arc::clone(&link),
                index: 0,
            }),
            inbound: first_rx,
        };
        let second_end = LoopbackEndpoint {
            transport: Arc::new(Self { link, index: 1 }),
            inbound: second_rx,
        };
        (first_end, second_end)
    }

    /// Bring the link up or down
    ///
    /// Going up delivers every pending durable message to both sides.
    pub async fn set_link_up(&self, up: bool) {
        let was_up = self.link.up.swap(up, Ordering::SeqCst);
        debug!(link.up = up, "Loopback link state changed");
        if up && !was_up {
            for side in &self.link.sides {
                side.flush_pending().await;
            }
        }
    }

    /// Whether the link is currently up
    #[must_use]
    pub fn is_link_up(&self) -> bool {
        self.link.up.load(Ordering::SeqCst)
    }

    /// Make this end's immediate sends fail while the link stays up
    pub fn fail_immediate_sends(&self, fail: bool) {
        self.local().fail_immediate.store(fail, Ordering::SeqCst);
    }

    /// Durable message of `kind` still waiting for the peer
    #[must_use]
    pub fn pending_for_peer(&self, kind: MessageKind) -> Option<Envelope> {
        self.remote()
            .pending
            .get(&kind)
            .map(|entry| entry.value().clone())
    }

    /// Immediate sends attempted from this end
    #[must_use]
    pub fn immediate_sends(&self) -> u64 {
        self.local().immediate_sends.load(Ordering::SeqCst)
    }

    /// Durable sends issued from this end
    #[must_use]
    pub fn durable_sends(&self) -> u64 {
        self.local().durable_sends.load(Ordering::SeqCst)
    }

    fn local(&self) -> &Side {
        &self.link.sides[self.index]
    }

    fn remote(&self) -> &Side {
        &self.link.sides[1 - self.index]
    }

    fn check_peer(&self, peer: &DeviceId) -> Result<&Side, TransportError> {
        let remote = self.remote();
        if &remote.id == peer {
            Ok(remote)
        } else {
            Err(TransportError::SendFailed {
                peer: peer.clone(),
                reason: "not linked to this peer".to_owned(),
            })
        }
    }
}

impl Side {
    fn new(id: DeviceId, inbound: mpsc::Sender<Inbound>) -> Self {
        Self {
            id,
            inbound,
            pending: DashMap::new(),
            fail_immediate: AtomicBool::new(false),
            immediate_sends: AtomicU64::new(0),
            durable_sends: AtomicU64::new(0),
        }
    }

    async fn flush_pending(&self) {
        for kind in MessageKind::DELIVERY_ORDER {
            let Some((_, envelope)) = self.pending.remove(&kind) else {
                continue;
            };
            if self.inbound.send(Inbound::message(envelope)).await.is_err() {
                warn!(device.id = %self.id, "Inbound queue closed, dropping durable message");
                return;
            }
        }
    }
}

#[async_trait]
impl Transport for LoopbackTransport {
    async fn send_immediate(
        &self,
        peer: &DeviceId,
        message: Envelope,
    ) -> Result<Option<Envelope>, TransportError> {
        let remote = self.check_peer(peer)?;
        self.local().immediate_sends.fetch_add(1, Ordering::SeqCst);

        if !self.is_link_up() {
            return Err(TransportError::PeerUnreachable {
                peer: peer.clone(),
            });
        }
        if self.local().fail_immediate.load(Ordering::SeqCst) {
            return Err(TransportError::SendFailed {
                peer: peer.clone(),
                reason: "immediate delivery rejected".to_owned(),
            });
        }

        if !message.body.expects_reply() {
            remote
                .inbound
                .send(Inbound::message(message))
                .await
                .map_err(|_| TransportError::Closed)?;
            return Ok(None);
        }

        let (inbound, reply) = Inbound::request(message);
        remote
            .inbound
            .send(inbound)
            .await
            .map_err(|_| TransportError::Closed)?;
        // A handler that drops the reply slot answers with nothing
        Ok(reply.await.ok())
    }

    async fn send_durable(&self, peer: &DeviceId, message: Envelope) -> Result<(), TransportError> {
        let remote = self.check_peer(peer)?;
        self.local().durable_sends.fetch_add(1, Ordering::SeqCst);

        if self.is_link_up() {
            return remote
                .inbound
                .send(Inbound::message(message))
                .await
                .map_err(|_| TransportError::Closed);
        }
        remote.pending.insert(message.kind(), message);
        Ok(())
    }

    fn is_reachable(&self, peer: &DeviceId) -> bool {
        self.is_link_up() && &self.remote().id == peer
    }
}
