// ABOUTME: Pure handoff trigger rules over local and peer environment signals
// ABOUTME: First matching rule wins; direction rules apply only to the current role holder
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use tandem_core::models::{DeviceClass, HandoffDirection, HandoffReason, WorkoutCategory};

use crate::transport::PeerStatus;

/// Everything one handoff evaluation looks at
///
/// "Local" is the primary unit running the evaluation, "peer" the companion.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HandoffSignals {
    /// Class currently holding the primary role
    pub role_holder: DeviceClass,
    /// Workout category of the live session
    pub category: WorkoutCategory,
    /// Local battery fraction
    pub local_battery: f64,
    /// Local app in the foreground
    pub local_foreground: bool,
    /// Local app was in the background at the previous evaluation
    pub was_backgrounded: bool,
    /// Local satellite positioning usable
    pub local_good_gps: bool,
    /// Local heart rate available
    pub local_heart_rate: bool,
    /// Peer reachable over the transport
    pub peer_reachable: bool,
    /// Peer signals; `None` when the capability query went unanswered
    pub peer: Option<PeerStatus>,
}

/// Decide whether the primary role should move
#[must_use]
pub fn evaluate(
    signals: &HandoffSignals,
    battery_threshold: f64,
) -> Option<(HandoffDirection, HandoffReason)> {
    match signals.role_holder {
        DeviceClass::PrimaryUnit => {
            to_companion(signals, battery_threshold).map(|r| (HandoffDirection::ToCompanion, r))
        }
        DeviceClass::CompanionUnit => {
            to_primary(signals, battery_threshold).map(|r| (HandoffDirection::ToPrimaryUnit, r))
        }
        DeviceClass::ExternalWearable => None,
    }
}

fn to_companion(signals: &HandoffSignals, threshold: f64) -> Option<HandoffReason> {
    if !signals.local_foreground && signals.peer_reachable {
        return Some(HandoffReason::Backgrounded);
    }
    let peer = signals.peer?;
    if signals.local_battery < threshold && peer.battery_level >= threshold {
        return Some(HandoffReason::BatteryLow);
    }
    if signals.category.is_heart_rate_centric() && peer.has_heart_rate && !signals.local_heart_rate
    {
        return Some(HandoffReason::SensorsBetter);
    }
    if !signals.local_good_gps && peer.has_usable_sensors() {
        return Some(HandoffReason::GpsPoor);
    }
    None
}

fn to_primary(signals: &HandoffSignals, threshold: f64) -> Option<HandoffReason> {
    if signals.local_foreground && signals.was_backgrounded {
        return Some(HandoffReason::Foregrounded);
    }
    if let Some(peer) = signals.peer {
        if peer.battery_level < threshold && signals.local_battery >= threshold {
            return Some(HandoffReason::BatteryLow);
        }
        // GPS reclaim requires a local battery above the threshold
        if signals.category.is_gps_centric()
            && signals.local_good_gps
            && !peer.has_good_gps
            && signals.local_battery >= threshold
        {
            return Some(HandoffReason::SensorsBetter);
        }
    }
    if !signals.peer_reachable {
        return Some(HandoffReason::PeerUnreachable);
    }
    None
}
