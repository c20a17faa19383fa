// ABOUTME: Integration tests for the metrics sync channel
// ABOUTME: Immediate and durable delivery, same-tick fallback, breaker, resync and inbound ordering
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
#![allow(missing_docs)]

mod common;

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tandem::sync::{
    enforce_floor, BreakerState, DeliveryBreakerConfig, DeliveryMode, MetricsSyncChannel,
    QuantizedMetrics, SyncChannelConfig,
};
use tandem::transport::{
    LoopbackEndpoint, LoopbackTransport, MessageBody, MessageKind, MetricsPayload,
};
use tandem_core::models::{DeviceClass, DeviceId, MetricKind, MetricSnapshot};
use uuid::Uuid;

struct Fixture {
    channel: MetricsSyncChannel,
    phone: Arc<LoopbackTransport>,
    watch: LoopbackEndpoint,
    session_id: Uuid,
}

fn fixture() -> Fixture {
    fixture_with(DeliveryBreakerConfig {
        failure_threshold: 3,
        recovery_timeout: Duration::from_secs(60),
        success_threshold: 1,
    })
}

fn fixture_with(breaker: DeliveryBreakerConfig) -> Fixture {
    common::init_test_logging();
    let (phone, watch) =
        LoopbackTransport::pair(DeviceId::from("phone"), DeviceId::from("watch"), 64);
    let session_id = Uuid::new_v4();
    let config = SyncChannelConfig {
        immediate_timeout: Duration::from_millis(500),
        history_capacity: 64,
        breaker,
    };
    let channel = MetricsSyncChannel::new(
        session_id,
        DeviceClass::PrimaryUnit,
        DeviceId::from("watch"),
        phone.transport.clone(),
        config,
    );
    Fixture {
        channel,
        phone: phone.transport,
        watch,
        session_id,
    }
}

fn snapshot(distance: f64) -> MetricSnapshot {
    MetricSnapshot::empty_at(Utc::now())
        .with_value(MetricKind::Distance, distance)
        .with_value(MetricKind::ElapsedTime, distance / 3.0)
}

#[tokio::test]
async fn test_reachable_peer_gets_immediate_delivery() {
    let mut f = fixture();

    let record = f.channel.push(&snapshot(12.346)).await;
    assert_eq!(record.tick, 0);
    assert_eq!(record.mode, DeliveryMode::Immediate);
    assert!(!record.fell_back);
    assert_eq!(f.channel.last_synced_tick().await, Some(0));

    let inbound = f.watch.inbound.try_recv().unwrap();
    assert_eq!(inbound.envelope.session_id, Some(f.session_id));
    assert_eq!(inbound.envelope.sender, DeviceClass::PrimaryUnit);
    let MessageBody::Metrics(payload) = inbound.envelope.body else {
        panic!("expected a metrics payload");
    };
    assert_eq!(payload.tick, 0);
    assert_eq!(payload.metrics.distance, Some(12.35));
    assert!(inbound.reply.is_none());
}

#[tokio::test]
async fn test_failed_immediate_send_falls_back_in_the_same_tick() {
    let mut f = fixture();
    f.phone.fail_immediate_sends(true);

    let record = f.channel.push(&snapshot(50.0)).await;
    assert_eq!(record.tick, 0);
    assert_eq!(record.mode, DeliveryMode::Durable);
    assert!(record.fell_back);
    assert_eq!(f.channel.breaker().failure_count(), 1);
    assert_eq!(f.channel.last_synced_tick().await, None);

    // The link is up, so the durable copy arrives right away
    let inbound = f.watch.inbound.try_recv().unwrap();
    assert_eq!(inbound.envelope.kind(), MessageKind::Metrics);
}

#[tokio::test]
async fn test_unreachable_peer_keeps_only_the_latest_durable_payload() {
    let f = fixture();
    f.phone.set_link_up(false).await;

    let first = f.channel.push(&snapshot(10.0)).await;
    let second = f.channel.push(&snapshot(20.0)).await;
    assert_eq!(first.mode, DeliveryMode::Durable);
    assert!(!first.fell_back);
    assert_eq!(second.tick, 1);
    assert_eq!(f.phone.immediate_sends(), 0);
    assert_eq!(f.phone.durable_sends(), 2);

    let pending = f.phone.pending_for_peer(MessageKind::Metrics).unwrap();
    let MessageBody::Metrics(MetricsPayload { tick, metrics }) = pending.body else {
        panic!("expected a metrics payload");
    };
    assert_eq!(tick, 1);
    assert_eq!(metrics.distance, Some(20.0));
}

#[tokio::test]
async fn test_every_tick_lands_in_history_with_its_mode() {
    let f = fixture();
    f.channel.push(&snapshot(1.0)).await;
    f.phone.set_link_up(false).await;
    f.channel.push(&snapshot(2.0)).await;
    f.phone.set_link_up(true).await;
    f.channel.push(&snapshot(3.0)).await;

    let history = f.channel.history().await;
    let summary: Vec<(u64, DeliveryMode)> =
        history.iter().map(|record| (record.tick, record.mode)).collect();
    assert_eq!(
        summary,
        vec![
            (0, DeliveryMode::Immediate),
            (1, DeliveryMode::Durable),
            (2, DeliveryMode::Immediate),
        ]
    );
    assert_eq!(f.channel.cached().await.unwrap().tick, 2);
}

#[tokio::test]
async fn test_breaker_opens_and_skips_immediate_attempts() {
    let f = fixture();
    f.phone.fail_immediate_sends(true);
    for distance in [1.0, 2.0, 3.0] {
        let record = f.channel.push(&snapshot(distance)).await;
        assert!(record.fell_back);
    }
    assert_eq!(f.channel.breaker().state(), BreakerState::Open);
    assert_eq!(f.phone.immediate_sends(), 3);

    let record = f.channel.push(&snapshot(4.0)).await;
    assert_eq!(record.mode, DeliveryMode::Durable);
    assert!(!record.fell_back);
    assert_eq!(f.phone.immediate_sends(), 3);
}

#[tokio::test]
async fn test_breaker_recovers_after_pushes_while_the_peer_was_away() {
    let f = fixture_with(DeliveryBreakerConfig {
        failure_threshold: 1,
        recovery_timeout: Duration::ZERO,
        success_threshold: 2,
    });
    f.phone.fail_immediate_sends(true);
    assert!(f.channel.push(&snapshot(1.0)).await.fell_back);
    assert_eq!(f.channel.breaker().state(), BreakerState::Open);
    f.phone.fail_immediate_sends(false);

    // Pushes with the peer away never touch the breaker
    f.phone.set_link_up(false).await;
    let away = f.channel.push(&snapshot(2.0)).await;
    assert_eq!(away.mode, DeliveryMode::Durable);
    assert_eq!(f.channel.breaker().state(), BreakerState::Open);

    f.phone.set_link_up(true).await;
    let first = f.channel.push(&snapshot(3.0)).await;
    assert_eq!(first.mode, DeliveryMode::Immediate);
    assert_eq!(f.channel.breaker().state(), BreakerState::HalfOpen);

    let second = f.channel.push(&snapshot(4.0)).await;
    assert_eq!(second.mode, DeliveryMode::Immediate);
    assert_eq!(f.channel.breaker().state(), BreakerState::Closed);
    assert_eq!(f.phone.immediate_sends(), 3);
}

#[tokio::test]
async fn test_resync_resends_the_newest_undelivered_tick() {
    let f = fixture();
    f.phone.set_link_up(false).await;
    f.channel.push(&snapshot(30.0)).await;
    assert_eq!(f.channel.last_synced_tick().await, None);

    f.phone.set_link_up(true).await;
    assert!(f.channel.resync().await);
    assert_eq!(f.channel.last_synced_tick().await, Some(0));
    assert_eq!(f.channel.breaker().state(), BreakerState::Closed);

    assert!(!f.channel.resync().await);
}

#[tokio::test]
async fn test_ingest_drops_foreign_and_out_of_order_payloads() {
    let f = fixture();
    let current = snapshot(100.0);
    let payload = |tick| MetricsPayload {
        tick,
        metrics: QuantizedMetrics {
            distance: Some(110.0),
            ..QuantizedMetrics::default()
        },
    };

    assert!(f
        .channel
        .ingest(Some(Uuid::new_v4()), 10.0, &payload(0), &current)
        .await
        .is_none());
    assert!(f
        .channel
        .ingest(Some(f.session_id), 10.0, &payload(3), &current)
        .await
        .is_some());
    assert!(f
        .channel
        .ingest(Some(f.session_id), 11.0, &payload(2), &current)
        .await
        .is_none());
    assert!(f
        .channel
        .ingest(Some(f.session_id), 9.0, &payload(4), &current)
        .await
        .is_none());
    assert!(f
        .channel
        .ingest(Some(f.session_id), 12.0, &payload(5), &current)
        .await
        .is_some());
}

#[tokio::test]
async fn test_ingest_never_moves_cumulative_fields_backwards() {
    let f = fixture();
    let current = snapshot(100.0).with_value(MetricKind::HeartRate, 140.0);
    let payload = MetricsPayload {
        tick: 0,
        metrics: QuantizedMetrics {
            distance: Some(90.0),
            heart_rate: Some(150),
            ..QuantizedMetrics::default()
        },
    };

    let outcome = f
        .channel
        .ingest(Some(f.session_id), 1.0, &payload, &current)
        .await
        .unwrap();
    assert_eq!(outcome.discarded, vec![MetricKind::Distance]);
    assert_eq!(outcome.snapshot.value(MetricKind::Distance), Some(100.0));
    assert_eq!(outcome.snapshot.value(MetricKind::HeartRate), Some(150.0));
    // Fields the peer did not send keep the held value
    assert_eq!(
        outcome.snapshot.value(MetricKind::ElapsedTime),
        current.value(MetricKind::ElapsedTime)
    );
}

#[test]
fn test_floor_lifts_cumulative_fields_only() {
    let floor = MetricSnapshot::empty_at(Utc::now())
        .with_value(MetricKind::Distance, 80.0)
        .with_value(MetricKind::HeartRate, 160.0);
    let merged = MetricSnapshot::empty_at(Utc::now())
        .with_value(MetricKind::Distance, 50.0)
        .with_value(MetricKind::HeartRate, 120.0);

    let lifted = enforce_floor(merged, &floor);
    assert_eq!(lifted.value(MetricKind::Distance), Some(80.0));
    assert_eq!(lifted.value(MetricKind::HeartRate), Some(120.0));
}
