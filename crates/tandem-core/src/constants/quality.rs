// ABOUTME: Static quality heuristics for each device class and metric pair
// ABOUTME: Consumed by the device registry when ranking competing samples
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

/// GPS-capable primary unit: satellite-derived metrics
pub const PRIMARY_UNIT_GPS_METRICS: f64 = 0.95;
/// GPS-capable primary unit: elapsed time (clock authority)
pub const PRIMARY_UNIT_ELAPSED: f64 = 0.90;
/// GPS-capable primary unit: heart rate (usually relayed or absent)
pub const PRIMARY_UNIT_HEART_RATE: f64 = 0.60;
/// GPS-capable primary unit: cadence from pocket accelerometer
pub const PRIMARY_UNIT_CADENCE: f64 = 0.70;
/// GPS-capable primary unit: calories estimated without heart rate
pub const PRIMARY_UNIT_CALORIES: f64 = 0.65;
/// Primary unit without GPS: distance/pace/speed from pocket accelerometer
pub const PRIMARY_UNIT_DEAD_RECKONING: f64 = 0.55;

/// Companion unit: on-body heart rate sensor
pub const COMPANION_HEART_RATE: f64 = 0.95;
/// Companion unit: wrist cadence
pub const COMPANION_CADENCE: f64 = 0.90;
/// Companion unit: heart-rate based calories
pub const COMPANION_CALORIES: f64 = 0.90;
/// Companion unit: elapsed time
pub const COMPANION_ELAPSED: f64 = 0.85;
/// Companion unit: distance/pace/speed with its own GPS
pub const COMPANION_GPS_METRICS: f64 = 0.75;
/// Companion unit: distance/pace/speed from accelerometer only
pub const COMPANION_DEAD_RECKONING: f64 = 0.50;
/// Companion unit: barometric elevation
pub const COMPANION_ELEVATION: f64 = 0.70;

/// External wearable: chest strap or optical heart rate
pub const WEARABLE_HEART_RATE: f64 = 0.85;
/// External wearable: footpod cadence
pub const WEARABLE_CADENCE: f64 = 0.70;
/// External wearable: calories
pub const WEARABLE_CALORIES: f64 = 0.60;
/// External wearable: elapsed time
pub const WEARABLE_ELAPSED: f64 = 0.80;
/// External wearable: distance/pace/speed
pub const WEARABLE_MOTION: f64 = 0.40;
/// External wearable: elevation
pub const WEARABLE_ELEVATION: f64 = 0.30;

/// Subtracted from the score of a class with no live device; keeps any stale
/// score plus a full accuracy bonus below zero.
pub const DISCONNECTED_PENALTY: f64 = 2.0;
