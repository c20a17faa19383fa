// ABOUTME: Coordination rules engine mapping metric and workout context to a device class
// ABOUTME: Single source of truth consulted by both the selector and the handoff monitor
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! # Coordination Rules
//!
//! Pure, total and deterministic: every `(metric, category, indoor)` triple
//! maps to exactly one preferred device class, with no side effects.
//!
//! | metric                               | outdoors       | indoors        |
//! |--------------------------------------|----------------|----------------|
//! | distance, pace, elevation, speed     | primary unit   | companion unit |
//! | elapsed time                         | primary unit   | companion unit |
//! | heart rate, cadence, calories        | companion unit | companion unit |

use tandem_core::models::{DeviceClass, MetricKind, WorkoutCategory};

/// Device class whose data is authoritative for `metric` in this context
///
/// The workout category is part of the signature so that category-specific
/// rules can be added without changing callers; no current rule depends on it.
#[must_use]
pub const fn primary_device_class(
    metric: MetricKind,
    _category: WorkoutCategory,
    is_indoor: bool,
) -> DeviceClass {
    match metric {
        // No satellite signal indoors: the companion's motion sensors take over
        MetricKind::Distance
        | MetricKind::Pace
        | MetricKind::Elevation
        | MetricKind::Speed
        | MetricKind::ElapsedTime => {
            if is_indoor {
                DeviceClass::CompanionUnit
            } else {
                DeviceClass::PrimaryUnit
            }
        }
        MetricKind::HeartRate | MetricKind::Cadence | MetricKind::Calories => {
            DeviceClass::CompanionUnit
        }
    }
}

/// Device class that owns GPS-class metrics for this workout
#[must_use]
pub const fn gps_owner(category: WorkoutCategory, is_indoor: bool) -> DeviceClass {
    primary_device_class(MetricKind::Distance, category, is_indoor)
}
