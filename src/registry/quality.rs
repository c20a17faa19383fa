// ABOUTME: Static quality heuristics per device class and metric
// ABOUTME: Scores are in [0, 1] before the registry applies its liveness penalty
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use tandem_core::constants::quality;
use tandem_core::models::{DeviceCapabilities, DeviceClass, MetricKind};

/// Base quality of `metric` when measured by a device of `class` with `capabilities`
///
/// Returns zero when the device cannot report the metric at all.
#[must_use]
pub fn base_quality(
    class: DeviceClass,
    metric: MetricKind,
    capabilities: DeviceCapabilities,
) -> f64 {
    if !capabilities.supports(metric) {
        return 0.0;
    }
    let has_gps = capabilities.contains(DeviceCapabilities::GPS);

    match class {
        DeviceClass::PrimaryUnit => match metric {
            MetricKind::Distance | MetricKind::Pace | MetricKind::Elevation | MetricKind::Speed => {
                if has_gps {
                    quality::PRIMARY_UNIT_GPS_METRICS
                } else {
                    quality::PRIMARY_UNIT_DEAD_RECKONING
                }
            }
            MetricKind::ElapsedTime => quality::PRIMARY_UNIT_ELAPSED,
            MetricKind::HeartRate => quality::PRIMARY_UNIT_HEART_RATE,
            MetricKind::Cadence => quality::PRIMARY_UNIT_CADENCE,
            MetricKind::Calories => quality::PRIMARY_UNIT_CALORIES,
        },
        DeviceClass::CompanionUnit => match metric {
            MetricKind::HeartRate => quality::COMPANION_HEART_RATE,
            MetricKind::Cadence => quality::COMPANION_CADENCE,
            MetricKind::Calories => quality::COMPANION_CALORIES,
            MetricKind::ElapsedTime => quality::COMPANION_ELAPSED,
            MetricKind::Elevation => quality::COMPANION_ELEVATION,
            MetricKind::Distance | MetricKind::Pace | MetricKind::Speed => {
                if has_gps {
                    quality::COMPANION_GPS_METRICS
                } else {
                    quality::COMPANION_DEAD_RECKONING
                }
            }
        },
        DeviceClass::ExternalWearable => match metric {
            MetricKind::HeartRate => quality::WEARABLE_HEART_RATE,
            MetricKind::Cadence => quality::WEARABLE_CADENCE,
            MetricKind::Calories => quality::WEARABLE_CALORIES,
            MetricKind::ElapsedTime => quality::WEARABLE_ELAPSED,
            MetricKind::Elevation => quality::WEARABLE_ELEVATION,
            MetricKind::Distance | MetricKind::Pace | MetricKind::Speed => {
                quality::WEARABLE_MOTION
            }
        },
    }
}

/// Capabilities assumed for a class that has no registered device to inspect
#[must_use]
pub const fn nominal_capabilities(class: DeviceClass) -> DeviceCapabilities {
    match class {
        DeviceClass::PrimaryUnit => DeviceCapabilities::primary_unit(),
        DeviceClass::CompanionUnit => DeviceCapabilities::companion_unit(),
        DeviceClass::ExternalWearable => DeviceCapabilities::heart_rate_strap(),
    }
}
