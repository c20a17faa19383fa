// ABOUTME: Payload shaping for outbound metric snapshots
// ABOUTME: Rounds distances and times to two decimals and rates to whole numbers
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tandem_core::constants::quantization::DECIMAL_PLACES;
use tandem_core::models::{MetricKind, MetricSnapshot};

/// Quantized field map sent as the `metrics` payload
///
/// Absent fields mean the sender has no reading; receivers keep their own.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuantizedMetrics {
    /// Meters
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub distance: Option<f64>,
    /// Seconds since start
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub elapsed_time: Option<f64>,
    /// Beats per minute
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub heart_rate: Option<u32>,
    /// Seconds per meter
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pace: Option<f64>,
    /// Kilocalories
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub calories: Option<f64>,
    /// Steps or revolutions per minute
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cadence: Option<u32>,
    /// Meters
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub elevation: Option<f64>,
    /// Seconds per meter since start
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub average_pace: Option<f64>,
    /// Meters per second
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_speed: Option<f64>,
}

impl QuantizedMetrics {
    /// Shape a snapshot for the wire
    #[must_use]
    pub fn from_snapshot(snapshot: &MetricSnapshot) -> Self {
        Self {
            distance: snapshot.value(MetricKind::Distance).map(round_decimals),
            elapsed_time: snapshot.value(MetricKind::ElapsedTime).map(round_decimals),
            heart_rate: snapshot.value(MetricKind::HeartRate).map(round_whole),
            pace: snapshot.value(MetricKind::Pace).map(round_decimals),
            calories: snapshot.value(MetricKind::Calories).map(round_decimals),
            cadence: snapshot.value(MetricKind::Cadence).map(round_whole),
            elevation: snapshot.value(MetricKind::Elevation).map(round_decimals),
            average_pace: snapshot
                .average_pace_seconds_per_meter
                .filter(|pace| pace.is_finite() && *pace > 0.0)
                .map(round_decimals),
            current_speed: snapshot.value(MetricKind::Speed).map(round_decimals),
        }
    }

    /// Value carried for one metric
    #[must_use]
    pub fn value(&self, metric: MetricKind) -> Option<f64> {
        match metric {
            MetricKind::Distance => self.distance,
            MetricKind::ElapsedTime => self.elapsed_time,
            MetricKind::HeartRate => self.heart_rate.map(f64::from),
            MetricKind::Pace => self.pace,
            MetricKind::Calories => self.calories,
            MetricKind::Cadence => self.cadence.map(f64::from),
            MetricKind::Elevation => self.elevation,
            MetricKind::Speed => self.current_speed,
        }
    }

    /// Rebuild a snapshot, leaving absent readings empty
    #[must_use]
    pub fn to_snapshot(&self, captured_at: DateTime<Utc>) -> MetricSnapshot {
        let mut snapshot = MetricSnapshot::empty_at(captured_at);
        for metric in MetricKind::ALL {
            if let Some(value) = self.value(metric) {
                snapshot = snapshot.with_value(metric, value);
            }
        }
        snapshot.average_pace_seconds_per_meter = self.average_pace;
        snapshot
    }
}

fn round_decimals(value: f64) -> f64 {
    let factor = 10_f64.powi(DECIMAL_PLACES);
    (value * factor).round() / factor
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn round_whole(value: f64) -> u32 {
    value.round().clamp(0.0, f64::from(u32::MAX)) as u32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rounds_distance_and_rates() {
        let snapshot = MetricSnapshot::empty_at(Utc::now())
            .with_value(MetricKind::Distance, 1234.5678)
            .with_value(MetricKind::HeartRate, 152.6)
            .with_value(MetricKind::Cadence, 171.2);
        let quantized = QuantizedMetrics::from_snapshot(&snapshot);

        assert_eq!(quantized.distance, Some(1234.57));
        assert_eq!(quantized.heart_rate, Some(153));
        assert_eq!(quantized.cadence, Some(171));
        assert_eq!(quantized.elevation, None);
    }

    #[test]
    fn missing_readings_are_not_sent_as_zero() {
        let quantized = QuantizedMetrics::from_snapshot(&MetricSnapshot::empty_at(Utc::now()));
        assert_eq!(quantized.heart_rate, None);
        assert_eq!(quantized.pace, None);
        assert_eq!(quantized.distance, None);

        let started = MetricSnapshot::empty_at(Utc::now()).with_value(MetricKind::Distance, 0.0);
        let quantized = QuantizedMetrics::from_snapshot(&started);
        assert_eq!(quantized.distance, Some(0.0));
        assert_eq!(quantized.elapsed_time, None);
    }
}
