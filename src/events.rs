// ABOUTME: Typed event bus for snapshot, lifecycle, handoff and peer availability changes
// ABOUTME: Broadcast channel with filtered streams for presentation-layer subscribers
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use std::sync::Arc;

use tandem_core::models::{DeviceClass, HandoffDecision, MetricSnapshot, SessionState};
use tokio::sync::broadcast;
use tokio_stream::wrappers::errors::BroadcastStreamRecvError;
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::{Stream, StreamExt};
use tracing::{debug, trace};
use uuid::Uuid;

/// Something observers of the coordination core care about
#[derive(Debug, Clone, PartialEq)]
pub enum CoordinationEvent {
    /// The merged snapshot of the live session changed
    SnapshotChanged(Arc<MetricSnapshot>),
    /// The local replica moved to another lifecycle state
    StateChanged {
        /// Session concerned
        session_id: Uuid,
        /// Previous state
        from: SessionState,
        /// New state
        to: SessionState,
    },
    /// A handoff was decided
    Handoff(HandoffDecision),
    /// The primary role moved to another class
    RoleChanged(DeviceClass),
    /// The peer became reachable or unreachable
    PeerAvailability(bool),
}

/// A lifecycle change as delivered by [`EventBus::state_changes`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StateChange {
    /// Session concerned
    pub session_id: Uuid,
    /// Previous state
    pub from: SessionState,
    /// New state
    pub to: SessionState,
}

/// Fan-out of [`CoordinationEvent`]s to any number of subscribers
#[derive(Clone)]
pub struct EventBus {
    sender: broadcast::Sender<CoordinationEvent>,
}

impl EventBus {
    /// Bus buffering up to `capacity` events per lagging subscriber
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    /// Publish to every current subscriber
    pub fn publish(&self, event: CoordinationEvent) {
        if self.sender.send(event).is_err() {
            trace!("No event subscribers");
        }
    }

    /// Receive every event published from now on
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<CoordinationEvent> {
        self.sender.subscribe()
    }

    /// Stream of merged snapshots
    #[must_use]
    pub fn snapshot_changes(&self) -> impl Stream<Item = Arc<MetricSnapshot>> + Send + Unpin {
        BroadcastStream::new(self.subscribe()).filter_map(|event| match event {
            Ok(CoordinationEvent::SnapshotChanged(snapshot)) => Some(snapshot),
            Ok(_) => None,
            Err(e) => {
                log_lag("snapshot", &e);
                None
            }
        })
    }

    /// Stream of lifecycle changes
    #[must_use]
    pub fn state_changes(&self) -> impl Stream<Item = StateChange> + Send + Unpin {
        BroadcastStream::new(self.subscribe()).filter_map(|event| match event {
            Ok(CoordinationEvent::StateChanged {
                session_id,
                from,
                to,
            }) => Some(StateChange {
                session_id,
                from,
                to,
            }),
            Ok(_) => None,
            Err(e) => {
                log_lag("state", &e);
                None
            }
        })
    }
}

fn log_lag(stream: &str, error: &BroadcastStreamRecvError) {
    debug!(stream, error = %error, "Event subscriber lagged, events dropped");
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use tandem_core::models::MetricKind;

    fn snapshot(distance: f64) -> CoordinationEvent {
        CoordinationEvent::SnapshotChanged(Arc::new(
            MetricSnapshot::default().with_value(MetricKind::Distance, distance),
        ))
    }

    #[tokio::test]
    async fn lagging_subscriber_resumes_with_the_newest_events() {
        let bus = EventBus::new(1);
        let mut snapshots = bus.snapshot_changes();
        for distance in [1.0, 2.0, 3.0] {
            bus.publish(snapshot(distance));
        }

        let newest = snapshots.next().await.unwrap();
        assert_eq!(newest.value(MetricKind::Distance), Some(3.0));

        bus.publish(snapshot(4.0));
        let next = snapshots.next().await.unwrap();
        assert_eq!(next.value(MetricKind::Distance), Some(4.0));
    }
}
