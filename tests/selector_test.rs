// ABOUTME: Integration tests for the metric source selector
// ABOUTME: Rule preference, quality fallback, heart rate averaging and last-known value retention
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
#![allow(missing_docs)]

mod common;

use std::time::Duration;

use chrono::{TimeDelta, Utc};
use tandem::selector::MetricSourceSelector;
use tandem::sensors::{snapshot_from_sensors, SyntheticSensors};
use tandem_core::models::{
    DeviceClass, MetricKind, MetricSnapshot, MetricWithProvenance, WorkoutCategory,
};

const MAX_AGE: Duration = Duration::from_secs(10);

fn full_selector() -> MetricSourceSelector {
    MetricSourceSelector::new(
        common::live_registry(vec![
            common::phone_device(),
            common::watch_device(),
            common::strap_device("strap"),
        ]),
        MAX_AGE,
    )
}

#[test]
fn test_heart_rate_from_two_sources_is_averaged() {
    let selector = full_selector();
    let now = Utc::now();
    let samples = vec![
        common::sample(DeviceClass::CompanionUnit, MetricKind::HeartRate, 150.0, now),
        common::sample(DeviceClass::ExternalWearable, MetricKind::HeartRate, 156.0, now),
    ];

    let selected = selector
        .select(MetricKind::HeartRate, WorkoutCategory::Running, false, &samples)
        .unwrap();
    assert_eq!(selected.value(MetricKind::HeartRate), Some(153.0));
    assert_eq!(selected.source, DeviceClass::CompanionUnit);
    assert_eq!(selector.merge(MetricKind::HeartRate, &samples), Some(153.0));
}

#[test]
fn test_stale_heart_rate_is_not_averaged() {
    let selector = full_selector();
    let now = Utc::now();
    let stale = now - TimeDelta::seconds(60);
    let samples = vec![
        common::sample(DeviceClass::CompanionUnit, MetricKind::HeartRate, 150.0, now),
        common::sample(DeviceClass::ExternalWearable, MetricKind::HeartRate, 180.0, stale),
    ];

    let selected = selector
        .select(MetricKind::HeartRate, WorkoutCategory::Running, false, &samples)
        .unwrap();
    assert_eq!(selected.value(MetricKind::HeartRate), Some(150.0));
}

#[test]
fn test_outdoor_distance_comes_from_the_gps_unit() {
    let selector = full_selector();
    let now = Utc::now();
    let samples = vec![
        common::sample(DeviceClass::PrimaryUnit, MetricKind::Distance, 1_000.0, now),
        common::sample(DeviceClass::CompanionUnit, MetricKind::Distance, 950.0, now),
    ];

    let outdoor = selector
        .select(MetricKind::Distance, WorkoutCategory::Running, false, &samples)
        .unwrap();
    assert_eq!(outdoor.source, DeviceClass::PrimaryUnit);
    assert_eq!(outdoor.value(MetricKind::Distance), Some(1_000.0));

    let indoor = selector
        .select(MetricKind::Distance, WorkoutCategory::Running, true, &samples)
        .unwrap();
    assert_eq!(indoor.source, DeviceClass::CompanionUnit);
}

#[test]
fn test_nothing_reported_selects_nothing() {
    let selector = full_selector();
    assert!(selector
        .select(MetricKind::Cadence, WorkoutCategory::Cycling, false, &[])
        .is_none());

    // A snapshot without a heart rate reading does not count as a source
    let samples = vec![MetricWithProvenance::new(
        MetricSnapshot::empty_at(Utc::now()),
        DeviceClass::PrimaryUnit,
    )];
    assert!(selector
        .select(MetricKind::HeartRate, WorkoutCategory::Running, false, &samples)
        .is_none());
    assert!(selector.merge(MetricKind::HeartRate, &samples).is_none());
}

#[test]
fn test_missing_preferred_class_falls_back_to_quality() {
    let selector = full_selector();
    let now = Utc::now();

    // No companion reading: the strap (0.85) outranks the phone (0.60)
    let heart_rate = vec![
        common::sample(DeviceClass::PrimaryUnit, MetricKind::HeartRate, 140.0, now),
        common::sample(DeviceClass::ExternalWearable, MetricKind::HeartRate, 150.0, now),
    ];
    let selected = selector
        .select(MetricKind::HeartRate, WorkoutCategory::Running, false, &heart_rate)
        .unwrap();
    assert_eq!(selected.source, DeviceClass::ExternalWearable);
    assert_eq!(selected.value(MetricKind::HeartRate), Some(145.0));

    // The strap has no cadence sensor, so its reading ranks below the phone's
    let cadence = vec![
        common::sample(DeviceClass::PrimaryUnit, MetricKind::Cadence, 170.0, now),
        common::sample(DeviceClass::ExternalWearable, MetricKind::Cadence, 176.0, now)
            .with_accuracy(0.5),
    ];
    let selected = selector
        .select(MetricKind::Cadence, WorkoutCategory::Running, false, &cadence)
        .unwrap();
    assert_eq!(selected.source, DeviceClass::PrimaryUnit);
    assert_eq!(selected.value(MetricKind::Cadence), Some(170.0));
}

#[test]
fn test_preferred_class_without_a_reading_falls_back() {
    let selector = full_selector();
    let now = Utc::now();

    // Indoors the watch is preferred for distance, but it only measures heart rate
    let watch = SyntheticSensors::new();
    watch.set(MetricKind::HeartRate, 148.0);
    let phone = SyntheticSensors::new();
    phone.set(MetricKind::Distance, 500.0);
    let samples = vec![
        MetricWithProvenance::new(snapshot_from_sensors(&watch, now), DeviceClass::CompanionUnit),
        MetricWithProvenance::new(snapshot_from_sensors(&phone, now), DeviceClass::PrimaryUnit),
    ];

    let selected = selector
        .select(MetricKind::Distance, WorkoutCategory::Running, true, &samples)
        .unwrap();
    assert_eq!(selected.source, DeviceClass::PrimaryUnit);
    assert_eq!(selected.value(MetricKind::Distance), Some(500.0));

    let merged = selector.select_snapshot(
        WorkoutCategory::Running,
        true,
        &samples,
        &MetricSnapshot::empty_at(now),
    );
    assert_eq!(merged.value(MetricKind::Distance), Some(500.0));
    assert_eq!(merged.value(MetricKind::HeartRate), Some(148.0));
    assert_eq!(merged.value(MetricKind::Calories), None);
}

#[test]
fn test_disconnected_class_loses_to_a_live_one() {
    // Only the strap is live; the phone's sample comes from a stale record
    let selector = MetricSourceSelector::new(
        common::live_registry(vec![common::strap_device("strap")]),
        MAX_AGE,
    );
    let now = Utc::now();
    let samples = vec![
        common::sample(DeviceClass::PrimaryUnit, MetricKind::Calories, 80.0, now),
        common::sample(DeviceClass::ExternalWearable, MetricKind::Calories, 75.0, now)
            .with_accuracy(0.0),
    ];

    let selected = selector
        .select(MetricKind::Calories, WorkoutCategory::Running, false, &samples)
        .unwrap();
    assert_eq!(selected.source, DeviceClass::ExternalWearable);
}

#[test]
fn test_snapshot_keeps_last_known_values() {
    let selector = full_selector();
    let now = Utc::now();
    let last_known = MetricSnapshot::empty_at(now)
        .with_value(MetricKind::Elevation, 52.0)
        .with_value(MetricKind::Distance, 400.0);
    let samples = vec![
        common::sample(DeviceClass::PrimaryUnit, MetricKind::Distance, 420.0, now),
        common::sample(DeviceClass::CompanionUnit, MetricKind::HeartRate, 144.0, now),
    ];

    let merged = selector.select_snapshot(WorkoutCategory::Running, false, &samples, &last_known);
    assert_eq!(merged.value(MetricKind::Distance), Some(420.0));
    assert_eq!(merged.value(MetricKind::HeartRate), Some(144.0));
    assert_eq!(merged.value(MetricKind::Elevation), Some(52.0));
}
