// ABOUTME: Wire format tests for peer envelopes
// ABOUTME: Checks field names, type tags, request correlation and decoding of peer-produced JSON
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
#![allow(missing_docs)]

use serde_json::{json, Value};
use tandem::session::state_message;
use tandem::sync::QuantizedMetrics;
use tandem::transport::{
    Envelope, HandoffAckPayload, MessageBody, MessageKind, MetricsPayload, PeerStatus,
    StateIntent,
};
use tandem_core::models::{
    DeviceClass, MetricKind, MetricSnapshot, SessionState, WorkoutCategory, WorkoutSession,
};
use uuid::Uuid;

fn encoded(envelope: &Envelope) -> Value {
    serde_json::from_str(&envelope.to_json().unwrap()).unwrap()
}

#[test]
fn test_metrics_envelope_shape() {
    let session_id = Uuid::new_v4();
    let snapshot = MetricSnapshot::default()
        .with_value(MetricKind::Distance, 1_234.5678)
        .with_value(MetricKind::HeartRate, 151.6);
    let envelope = Envelope::new(
        DeviceClass::PrimaryUnit,
        Some(session_id),
        MessageBody::Metrics(MetricsPayload {
            tick: 7,
            metrics: QuantizedMetrics::from_snapshot(&snapshot),
        }),
    );

    let value = encoded(&envelope);
    assert_eq!(value["type"], "metrics");
    assert_eq!(value["sessionId"], session_id.to_string());
    assert_eq!(value["sender"], "primary_unit");
    assert_eq!(value["payload"]["tick"], 7);
    assert_eq!(value["payload"]["metrics"]["distance"], 1_234.57);
    assert_eq!(value["payload"]["metrics"]["heartRate"], 152);
    assert!(value["payload"]["metrics"].get("pace").is_none());
    assert!(value["requestId"].is_null());
    assert!(value["timestampEpochSeconds"].as_f64().unwrap() > 0.0);
}

#[test]
fn test_requests_carry_an_id_that_the_reply_reuses() {
    let query = Envelope::new(DeviceClass::PrimaryUnit, None, MessageBody::CapabilityQuery);
    let request_id = query.request_id.unwrap();
    assert_eq!(encoded(&query)["type"], "capabilityQuery");

    let reply = query.reply(
        DeviceClass::CompanionUnit,
        MessageBody::CapabilityResponse(PeerStatus {
            battery_level: 0.5,
            has_good_gps: false,
            has_heart_rate: true,
            is_foreground: true,
        }),
    );
    assert_eq!(reply.request_id, Some(request_id));
    assert_eq!(reply.sender, DeviceClass::CompanionUnit);

    let value = encoded(&reply);
    assert_eq!(value["type"], "capabilityResponse");
    assert_eq!(value["payload"]["hasHeartRate"], true);
    assert_eq!(value["requestId"], request_id.to_string());
}

#[test]
fn test_decodes_an_envelope_written_by_the_peer() {
    let session_id = Uuid::new_v4();
    let raw = json!({
        "type": "handoffAck",
        "payload": { "accepted": false, "reason": "no matching live session" },
        "sessionId": session_id,
        "sender": "companion_unit",
        "requestId": null,
        "timestampEpochSeconds": 1_700_000_000.25
    })
    .to_string();

    let envelope = Envelope::from_json(&raw).unwrap();
    assert_eq!(envelope.kind(), MessageKind::HandoffAck);
    assert_eq!(envelope.session_id, Some(session_id));
    assert_eq!(
        envelope.body,
        MessageBody::HandoffAck(HandoffAckPayload {
            accepted: false,
            reason: Some("no matching live session".to_owned()),
        })
    );
}

#[test]
fn test_unit_requests_decode_without_payload() {
    let raw = json!({
        "type": "sessionSnapshotRequest",
        "sessionId": null,
        "sender": "primary_unit",
        "requestId": Uuid::new_v4(),
        "timestampEpochSeconds": 1.0
    })
    .to_string();

    let envelope = Envelope::from_json(&raw).unwrap();
    assert_eq!(envelope.body, MessageBody::SessionSnapshotRequest);
    assert!(envelope.body.expects_reply());
}

#[test]
fn test_durable_copy_of_a_transition_is_an_observation() {
    let session = WorkoutSession::start(WorkoutCategory::Running, false)
        .with_state(SessionState::Paused);
    let envelope = Envelope::new(
        DeviceClass::PrimaryUnit,
        Some(session.id),
        state_message(&session, StateIntent::Transition),
    );

    let durable = envelope.clone().for_durable_delivery();
    let MessageBody::State(payload) = &durable.body else {
        panic!("expected a state body");
    };
    assert_eq!(payload.intent, StateIntent::Observation);
    assert_eq!(payload.state, SessionState::Paused);
    assert_eq!(durable.session_id, envelope.session_id);

    let query = Envelope::new(DeviceClass::PrimaryUnit, None, MessageBody::CapabilityQuery);
    assert_eq!(query.clone().for_durable_delivery(), query);
}

#[test]
fn test_unknown_type_is_rejected() {
    let raw = json!({
        "type": "teleport",
        "payload": {},
        "sessionId": null,
        "sender": "primary_unit",
        "requestId": null,
        "timestampEpochSeconds": 1.0
    })
    .to_string();

    assert!(Envelope::from_json(&raw).is_err());
}
