// ABOUTME: Narrow interfaces to on-device sensors and environment signals
// ABOUTME: Includes synthetic implementations used by the simulator and tests
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! # Sensors
//!
//! Sensor acquisition itself lives outside the coordination core. The core
//! only asks for the current reading of a metric ([`SensorSource`]) and for a
//! handful of environment signals ([`LocalSignals`]) when evaluating handoffs.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use tandem_core::models::{MetricKind, MetricSnapshot};

/// Current readings from the sensors of this device
pub trait SensorSource: Send + Sync {
    /// Latest value for `metric` in canonical units, if the sensor has one
    fn current_reading(&self, metric: MetricKind) -> Option<f64>;

    /// Accuracy estimate in `[0, 1]` for the readings, if the sensor knows it
    fn accuracy(&self) -> Option<f64> {
        None
    }
}

/// Environment signals consulted by the handoff monitor
pub trait LocalSignals: Send + Sync {
    /// Battery charge as a fraction in `[0, 1]`
    fn battery_level(&self) -> f64;
    /// Whether the tracking app is in the foreground
    fn is_foreground(&self) -> bool;
    /// Whether satellite positioning is currently usable
    fn has_good_gps(&self) -> bool;
    /// Whether a heart rate sensor is delivering readings
    fn has_heart_rate(&self) -> bool;
}

/// Build a snapshot from whatever the sensors currently report
///
/// Cumulative metrics without a reading are recorded as zero; the merge path
/// never lets them move a session backwards.
#[must_use]
pub fn snapshot_from_sensors(sensors: &dyn SensorSource, now: DateTime<Utc>) -> MetricSnapshot {
    let mut snapshot = MetricKind::ALL
        .into_iter()
        .filter_map(|metric| sensors.current_reading(metric).map(|value| (metric, value)))
        .fold(MetricSnapshot::empty_at(now), |snapshot, (metric, value)| {
            snapshot.with_value(metric, value)
        });

    let distance = snapshot.value(MetricKind::Distance).unwrap_or(0.0);
    let elapsed = snapshot.value(MetricKind::ElapsedTime).unwrap_or(0.0);
    snapshot.average_pace_seconds_per_meter =
        (distance > 0.0 && elapsed > 0.0).then(|| elapsed / distance);
    snapshot
}

/// Scriptable sensor source for the simulator and tests
#[derive(Debug, Default)]
pub struct SyntheticSensors {
    readings: DashMap<MetricKind, f64>,
}

impl SyntheticSensors {
    /// Sensor source with no readings
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the reading for one metric
    pub fn set(&self, metric: MetricKind, value: f64) {
        self.readings.insert(metric, value);
    }

    /// Drop the reading for one metric
    pub fn clear(&self, metric: MetricKind) {
        self.readings.remove(&metric);
    }

    /// Advance a steady-state effort by `seconds` at `speed_mps`
    ///
    /// Updates elapsed time, distance, pace, speed and a rough calorie burn.
    pub fn advance(&self, seconds: f64, speed_mps: f64) {
        let read = |metric| self.readings.get(&metric).map_or(0.0, |value| *value);
        let elapsed = read(MetricKind::ElapsedTime) + seconds;
        let distance = read(MetricKind::Distance) + speed_mps * seconds;
        // ~1 kcal per kg per km for a 70 kg athlete
        let calories = read(MetricKind::Calories) + speed_mps * seconds * 0.07;

        self.set(MetricKind::ElapsedTime, elapsed);
        self.set(MetricKind::Distance, distance);
        self.set(MetricKind::Calories, calories);
        self.set(MetricKind::Speed, speed_mps);
        if speed_mps > 0.0 {
            self.set(MetricKind::Pace, 1.0 / speed_mps);
        }
    }
}

impl SensorSource for SyntheticSensors {
    fn current_reading(&self, metric: MetricKind) -> Option<f64> {
        self.readings.get(&metric).map(|value| *value)
    }
}

/// Scriptable environment signals, safe to flip from any thread
#[derive(Debug)]
pub struct SyntheticSignals {
    battery_bits: AtomicU64,
    foreground: AtomicBool,
    good_gps: AtomicBool,
    heart_rate: AtomicBool,
}

impl SyntheticSignals {
    /// Signals for a device with the given battery level and sensor flags
    #[must_use]
    pub fn new(battery_level: f64, good_gps: bool, heart_rate: bool) -> Self {
        Self {
            battery_bits: AtomicU64::new(battery_level.clamp(0.0, 1.0).to_bits()),
            foreground: AtomicBool::new(true),
            good_gps: AtomicBool::new(good_gps),
            heart_rate: AtomicBool::new(heart_rate),
        }
    }

    /// Change the battery level
    pub fn set_battery_level(&self, level: f64) {
        self.battery_bits
            .store(level.clamp(0.0, 1.0).to_bits(), Ordering::SeqCst);
    }

    /// Move the app to the foreground or background
    pub fn set_foreground(&self, foreground: bool) {
        self.foreground.store(foreground, Ordering::SeqCst);
    }

    /// Change satellite signal quality
    pub fn set_good_gps(&self, good: bool) {
        self.good_gps.store(good, Ordering::SeqCst);
    }

    /// Change heart rate sensor availability
    pub fn set_heart_rate(&self, available: bool) {
        self.heart_rate.store(available, Ordering::SeqCst);
    }
}

impl LocalSignals for SyntheticSignals {
    fn battery_level(&self) -> f64 {
        f64::from_bits(self.battery_bits.load(Ordering::SeqCst))
    }

    fn is_foreground(&self) -> bool {
        self.foreground.load(Ordering::SeqCst)
    }

    fn has_good_gps(&self) -> bool {
        self.good_gps.load(Ordering::SeqCst)
    }

    fn has_heart_rate(&self) -> bool {
        self.heart_rate.load(Ordering::SeqCst)
    }
}
