// ABOUTME: Metric kinds, immutable metric snapshots and provenance-tagged samples
// ABOUTME: All quantities are stored in canonical units (m, s, bpm, s/m, kcal)
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::device::{DeviceClass, DeviceId};

/// A single telemetry quantity tracked during a workout
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MetricKind {
    /// Distance covered (meters)
    Distance,
    /// Current pace (seconds per meter)
    Pace,
    /// Current elevation (meters)
    Elevation,
    /// Current speed (meters per second)
    Speed,
    /// Heart rate (beats per minute)
    HeartRate,
    /// Cadence (steps or revolutions per minute)
    Cadence,
    /// Energy expended (kcal)
    Calories,
    /// Time since the session started (seconds)
    ElapsedTime,
}

impl MetricKind {
    /// Every metric kind, in a fixed order
    pub const ALL: [Self; 8] = [
        Self::Distance,
        Self::Pace,
        Self::Elevation,
        Self::Speed,
        Self::HeartRate,
        Self::Cadence,
        Self::Calories,
        Self::ElapsedTime,
    ];

    /// Metrics derived from satellite positioning
    #[must_use]
    pub const fn is_gps_class(self) -> bool {
        matches!(
            self,
            Self::Distance | Self::Pace | Self::Elevation | Self::Speed
        )
    }

    /// Metrics best measured on the body
    #[must_use]
    pub const fn is_biometric(self) -> bool {
        matches!(self, Self::HeartRate | Self::Cadence | Self::Calories)
    }

    /// Cumulative metrics that must never move backwards within a session
    #[must_use]
    pub const fn is_cumulative(self) -> bool {
        matches!(self, Self::Distance | Self::Calories | Self::ElapsedTime)
    }

    /// Stable label used in logs
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Distance => "distance",
            Self::Pace => "pace",
            Self::Elevation => "elevation",
            Self::Speed => "speed",
            Self::HeartRate => "heart_rate",
            Self::Cadence => "cadence",
            Self::Calories => "calories",
            Self::ElapsedTime => "elapsed_time",
        }
    }
}

impl fmt::Display for MetricKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

bitflags::bitflags! {
    /// A set of metric kinds
    #[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
    pub struct MetricSet: u8 {
        /// Distance
        const DISTANCE = 0b0000_0001;
        /// Pace
        const PACE = 0b0000_0010;
        /// Elevation
        const ELEVATION = 0b0000_0100;
        /// Speed
        const SPEED = 0b0000_1000;
        /// Heart rate
        const HEART_RATE = 0b0001_0000;
        /// Cadence
        const CADENCE = 0b0010_0000;
        /// Calories
        const CALORIES = 0b0100_0000;
        /// Elapsed time
        const ELAPSED_TIME = 0b1000_0000;
    }
}

impl MetricSet {
    /// Singleton set for one metric
    #[must_use]
    pub const fn of(metric: MetricKind) -> Self {
        match metric {
            MetricKind::Distance => Self::DISTANCE,
            MetricKind::Pace => Self::PACE,
            MetricKind::Elevation => Self::ELEVATION,
            MetricKind::Speed => Self::SPEED,
            MetricKind::HeartRate => Self::HEART_RATE,
            MetricKind::Cadence => Self::CADENCE,
            MetricKind::Calories => Self::CALORIES,
            MetricKind::ElapsedTime => Self::ELAPSED_TIME,
        }
    }

    /// Whether `metric` is in the set
    #[must_use]
    pub const fn has(self, metric: MetricKind) -> bool {
        self.contains(Self::of(metric))
    }
}

/// Immutable set of metric values at one instant
///
/// A new snapshot replaces the previous one on every update tick; nothing
/// mutates a snapshot once it has been published. Only metrics listed in
/// `reported` carry a reading; the numeric fields of the others are
/// placeholders.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricSnapshot {
    /// Distance covered (meters)
    pub distance_meters: f64,
    /// Time since the session started (seconds)
    pub elapsed_seconds: f64,
    /// Heart rate (bpm); zero means no reading
    pub heart_rate_bpm: f64,
    /// Current pace (seconds per meter); zero means no reading
    pub pace_seconds_per_meter: f64,
    /// Energy expended (kcal)
    pub calories_kcal: f64,
    /// Cadence (steps or revolutions per minute)
    pub cadence_spm: Option<f64>,
    /// Current elevation (meters)
    pub elevation_meters: Option<f64>,
    /// Average pace since start (seconds per meter)
    pub average_pace_seconds_per_meter: Option<f64>,
    /// Current speed (meters per second)
    pub current_speed_mps: Option<f64>,
    /// When the values were captured
    pub captured_at: DateTime<Utc>,
    /// Metrics that carry an actual reading
    #[serde(default)]
    pub reported: MetricSet,
}

impl Default for MetricSnapshot {
    fn default() -> Self {
        Self::empty_at(Utc::now())
    }
}

impl MetricSnapshot {
    /// Snapshot carrying no readings
    #[must_use]
    pub const fn empty_at(captured_at: DateTime<Utc>) -> Self {
        Self {
            distance_meters: 0.0,
            elapsed_seconds: 0.0,
            heart_rate_bpm: 0.0,
            pace_seconds_per_meter: 0.0,
            calories_kcal: 0.0,
            cadence_spm: None,
            elevation_meters: None,
            average_pace_seconds_per_meter: None,
            current_speed_mps: None,
            captured_at,
            reported: MetricSet::empty(),
        }
    }

    /// Value of one metric, `None` when the snapshot carries no reading for it
    #[must_use]
    pub fn value(&self, metric: MetricKind) -> Option<f64> {
        if !self.reported.has(metric) {
            return None;
        }
        let raw = match metric {
            MetricKind::Distance => Some(self.distance_meters),
            MetricKind::ElapsedTime => Some(self.elapsed_seconds),
            MetricKind::Calories => Some(self.calories_kcal),
            MetricKind::HeartRate => positive(self.heart_rate_bpm),
            MetricKind::Pace => positive(self.pace_seconds_per_meter),
            MetricKind::Cadence => self.cadence_spm,
            MetricKind::Elevation => self.elevation_meters,
            MetricKind::Speed => self.current_speed_mps,
        };
        raw.filter(|value| value.is_finite() && (metric == MetricKind::Elevation || *value >= 0.0))
    }

    /// Copy of this snapshot with one metric replaced
    #[must_use]
    pub fn with_value(&self, metric: MetricKind, value: f64) -> Self {
        let mut next = self.clone();
        match metric {
            MetricKind::Distance => next.distance_meters = value,
            MetricKind::ElapsedTime => next.elapsed_seconds = value,
            MetricKind::Calories => next.calories_kcal = value,
            MetricKind::HeartRate => next.heart_rate_bpm = value,
            MetricKind::Pace => next.pace_seconds_per_meter = value,
            MetricKind::Cadence => next.cadence_spm = Some(value),
            MetricKind::Elevation => next.elevation_meters = Some(value),
            MetricKind::Speed => next.current_speed_mps = Some(value),
        }
        next.reported.insert(MetricSet::of(metric));
        next
    }

    /// Copy of this snapshot with the reading for one metric dropped
    #[must_use]
    pub fn without(&self, metric: MetricKind) -> Self {
        let mut next = self.clone();
        match metric {
            MetricKind::Distance => next.distance_meters = 0.0,
            MetricKind::ElapsedTime => next.elapsed_seconds = 0.0,
            MetricKind::Calories => next.calories_kcal = 0.0,
            MetricKind::HeartRate => next.heart_rate_bpm = 0.0,
            MetricKind::Pace => next.pace_seconds_per_meter = 0.0,
            MetricKind::Cadence => next.cadence_spm = None,
            MetricKind::Elevation => next.elevation_meters = None,
            MetricKind::Speed => next.current_speed_mps = None,
        }
        next.reported.remove(MetricSet::of(metric));
        next
    }

    /// Copy keeping only the readings whose metric is in `keep`
    #[must_use]
    pub fn restricted_to(&self, keep: MetricSet) -> Self {
        MetricKind::ALL
            .into_iter()
            .filter(|metric| self.reported.has(*metric) && !keep.has(*metric))
            .fold(self.clone(), |snapshot, metric| snapshot.without(metric))
    }

    /// Copy of this snapshot stamped with a new capture time
    #[must_use]
    pub fn captured(&self, captured_at: DateTime<Utc>) -> Self {
        Self {
            captured_at,
            ..self.clone()
        }
    }
}

fn positive(value: f64) -> Option<f64> {
    (value > 0.0).then_some(value)
}

/// A snapshot tagged with where and when it was measured
///
/// Exists only for the duration of a selection or merge.
#[derive(Debug, Clone, PartialEq)]
pub struct MetricWithProvenance {
    /// Measured values
    pub snapshot: MetricSnapshot,
    /// Class of the originating device
    pub source: DeviceClass,
    /// Originating device, when known
    pub device_id: Option<DeviceId>,
    /// Capture timestamp
    pub captured_at: DateTime<Utc>,
    /// Optional accuracy estimate in `[0, 1]`
    pub accuracy: Option<f64>,
}

impl MetricWithProvenance {
    /// Tag a snapshot with its source class, using the snapshot's capture time
    #[must_use]
    pub fn new(snapshot: MetricSnapshot, source: DeviceClass) -> Self {
        let captured_at = snapshot.captured_at;
        Self {
            snapshot,
            source,
            device_id: None,
            captured_at,
            accuracy: None,
        }
    }

    /// Attach the originating device id
    #[must_use]
    pub fn from_device(mut self, device_id: DeviceId) -> Self {
        self.device_id = Some(device_id);
        self
    }

    /// Attach an accuracy estimate, clamped to `[0, 1]`
    #[must_use]
    pub fn with_accuracy(mut self, accuracy: f64) -> Self {
        self.accuracy = Some(accuracy.clamp(0.0, 1.0));
        self
    }

    /// Value of one metric in this sample
    #[must_use]
    pub fn value(&self, metric: MetricKind) -> Option<f64> {
        self.snapshot.value(metric)
    }
}
