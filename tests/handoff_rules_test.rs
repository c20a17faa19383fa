// ABOUTME: Tests for the pure handoff trigger rules
// ABOUTME: Rule order in both directions, battery threshold handling and the wearable guard
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
#![allow(missing_docs)]

use tandem::handoff::{evaluate, HandoffSignals};
use tandem::transport::PeerStatus;
use tandem_core::models::{DeviceClass, HandoffDirection, HandoffReason, WorkoutCategory};

const THRESHOLD: f64 = 0.2;

fn watch_status(battery_level: f64) -> PeerStatus {
    PeerStatus {
        battery_level,
        has_good_gps: false,
        has_heart_rate: true,
        is_foreground: false,
    }
}

/// Phone holding the role during an outdoor run, everything healthy
fn phone_holding() -> HandoffSignals {
    HandoffSignals {
        role_holder: DeviceClass::PrimaryUnit,
        category: WorkoutCategory::Running,
        local_battery: 0.9,
        local_foreground: true,
        was_backgrounded: false,
        local_good_gps: true,
        local_heart_rate: false,
        peer_reachable: true,
        peer: Some(watch_status(0.8)),
    }
}

/// Watch holding the role after an earlier handoff
fn watch_holding() -> HandoffSignals {
    HandoffSignals {
        role_holder: DeviceClass::CompanionUnit,
        local_foreground: false,
        ..phone_holding()
    }
}

#[test]
fn test_healthy_phone_keeps_the_role() {
    assert_eq!(evaluate(&phone_holding(), THRESHOLD), None);
}

#[test]
fn test_backgrounded_phone_hands_off_when_the_watch_is_reachable() {
    let signals = HandoffSignals {
        local_foreground: false,
        ..phone_holding()
    };
    assert_eq!(
        evaluate(&signals, THRESHOLD),
        Some((HandoffDirection::ToCompanion, HandoffReason::Backgrounded))
    );

    let unreachable = HandoffSignals {
        peer_reachable: false,
        peer: None,
        ..signals
    };
    assert_eq!(evaluate(&unreachable, THRESHOLD), None);
}

#[test]
fn test_low_battery_needs_a_charged_watch() {
    let signals = HandoffSignals {
        local_battery: 0.15,
        ..phone_holding()
    };
    assert_eq!(
        evaluate(&signals, THRESHOLD),
        Some((HandoffDirection::ToCompanion, HandoffReason::BatteryLow))
    );

    let both_low = HandoffSignals {
        peer: Some(watch_status(0.1)),
        ..signals
    };
    assert_eq!(evaluate(&both_low, THRESHOLD), None);

    // Exactly at the threshold is not low
    let at_threshold = HandoffSignals {
        local_battery: THRESHOLD,
        ..phone_holding()
    };
    assert_eq!(evaluate(&at_threshold, THRESHOLD), None);
}

#[test]
fn test_heart_rate_workouts_move_to_the_wrist() {
    let signals = HandoffSignals {
        category: WorkoutCategory::Strength,
        ..phone_holding()
    };
    assert_eq!(
        evaluate(&signals, THRESHOLD),
        Some((HandoffDirection::ToCompanion, HandoffReason::SensorsBetter))
    );

    let phone_has_strap = HandoffSignals {
        local_heart_rate: true,
        ..signals
    };
    assert_eq!(evaluate(&phone_has_strap, THRESHOLD), None);
}

#[test]
fn test_lost_gps_hands_off_to_a_watch_with_sensors() {
    let signals = HandoffSignals {
        local_good_gps: false,
        ..phone_holding()
    };
    assert_eq!(
        evaluate(&signals, THRESHOLD),
        Some((HandoffDirection::ToCompanion, HandoffReason::GpsPoor))
    );

    let bare_watch = HandoffSignals {
        peer: Some(PeerStatus {
            has_heart_rate: false,
            ..watch_status(0.8)
        }),
        ..signals
    };
    assert_eq!(evaluate(&bare_watch, THRESHOLD), None);
}

#[test]
fn test_unanswered_capability_query_blocks_peer_based_rules() {
    let signals = HandoffSignals {
        local_battery: 0.1,
        local_good_gps: false,
        peer: None,
        ..phone_holding()
    };
    assert_eq!(evaluate(&signals, THRESHOLD), None);
}

#[test]
fn test_background_rule_wins_over_battery() {
    let signals = HandoffSignals {
        local_foreground: false,
        local_battery: 0.1,
        ..phone_holding()
    };
    assert_eq!(
        evaluate(&signals, THRESHOLD),
        Some((HandoffDirection::ToCompanion, HandoffReason::Backgrounded))
    );
}

#[test]
fn test_returning_to_the_foreground_reclaims_the_role() {
    let signals = HandoffSignals {
        local_foreground: true,
        was_backgrounded: true,
        ..watch_holding()
    };
    assert_eq!(
        evaluate(&signals, THRESHOLD),
        Some((HandoffDirection::ToPrimaryUnit, HandoffReason::Foregrounded))
    );
}

#[test]
fn test_watch_battery_low_returns_the_role() {
    let signals = HandoffSignals {
        peer: Some(watch_status(0.1)),
        ..watch_holding()
    };
    assert_eq!(
        evaluate(&signals, THRESHOLD),
        Some((HandoffDirection::ToPrimaryUnit, HandoffReason::BatteryLow))
    );
}

#[test]
fn test_gps_reclaim_needs_a_charged_phone() {
    let signals = HandoffSignals {
        local_foreground: true,
        ..watch_holding()
    };
    assert_eq!(
        evaluate(&signals, THRESHOLD),
        Some((HandoffDirection::ToPrimaryUnit, HandoffReason::SensorsBetter))
    );

    let drained = HandoffSignals {
        local_battery: 0.1,
        ..signals
    };
    assert_eq!(evaluate(&drained, THRESHOLD), None);

    let indoor_category = HandoffSignals {
        category: WorkoutCategory::Strength,
        ..signals
    };
    assert_eq!(evaluate(&indoor_category, THRESHOLD), None);
}

#[test]
fn test_unreachable_watch_forces_the_role_back() {
    let signals = HandoffSignals {
        peer_reachable: false,
        peer: None,
        ..watch_holding()
    };
    assert_eq!(
        evaluate(&signals, THRESHOLD),
        Some((HandoffDirection::ToPrimaryUnit, HandoffReason::PeerUnreachable))
    );
}

#[test]
fn test_wearable_never_holds_a_role_to_move() {
    let signals = HandoffSignals {
        role_holder: DeviceClass::ExternalWearable,
        local_foreground: false,
        ..phone_holding()
    };
    assert_eq!(evaluate(&signals, THRESHOLD), None);
}
