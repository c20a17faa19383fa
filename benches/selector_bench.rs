// ABOUTME: Criterion benchmarks for metric source selection
// ABOUTME: Measures single-metric selection and full snapshot merges across three device classes
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! Criterion benchmarks for the metric source selector.
//!
//! The merge runs on every metrics sync tick, so it has to stay cheap even
//! with several wearables reporting.

#![allow(
    clippy::missing_docs_in_private_items,
    clippy::unwrap_used,
    missing_docs
)]

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use tandem::registry::DeviceRegistry;
use tandem::selector::MetricSourceSelector;
use tandem_core::models::{
    Device, DeviceCapabilities, DeviceClass, DeviceId, MetricKind, MetricSnapshot,
    MetricWithProvenance, WorkoutCategory,
};

fn registry_with_wearables(wearables: usize) -> Arc<DeviceRegistry> {
    let registry = Arc::new(DeviceRegistry::new());
    let mut devices = vec![
        Device::new(
            "phone",
            DeviceClass::PrimaryUnit,
            "Phone",
            DeviceCapabilities::primary_unit(),
        ),
        Device::new(
            "watch",
            DeviceClass::CompanionUnit,
            "Watch",
            DeviceCapabilities::companion_unit(),
        ),
    ];
    for index in 0..wearables {
        devices.push(Device::new(
            DeviceId::new(format!("strap-{index}")),
            DeviceClass::ExternalWearable,
            "Chest strap",
            DeviceCapabilities::heart_rate_strap(),
        ));
    }
    for device in devices {
        let id = device.id.clone();
        registry.register(device).unwrap();
        registry.set_connectivity(&id, true).unwrap();
    }
    registry
}

fn samples(wearables: usize) -> Vec<MetricWithProvenance> {
    let now = Utc::now();
    let phone = MetricSnapshot::empty_at(now)
        .with_value(MetricKind::Distance, 5_000.0)
        .with_value(MetricKind::ElapsedTime, 1_500.0)
        .with_value(MetricKind::Pace, 0.3)
        .with_value(MetricKind::Elevation, 42.0);
    let watch = MetricSnapshot::empty_at(now)
        .with_value(MetricKind::Distance, 4_950.0)
        .with_value(MetricKind::HeartRate, 148.0)
        .with_value(MetricKind::Cadence, 172.0)
        .with_value(MetricKind::Calories, 310.0);

    let mut all = vec![
        MetricWithProvenance::new(phone, DeviceClass::PrimaryUnit),
        MetricWithProvenance::new(watch, DeviceClass::CompanionUnit),
    ];
    let mut heart_rate = 145.0;
    for _ in 0..wearables {
        heart_rate += 1.0;
        all.push(MetricWithProvenance::new(
            MetricSnapshot::empty_at(now).with_value(MetricKind::HeartRate, heart_rate),
            DeviceClass::ExternalWearable,
        ));
    }
    all
}

fn bench_select(c: &mut Criterion) {
    let mut group = c.benchmark_group("select");
    for wearables in [0_usize, 2, 8] {
        let selector =
            MetricSourceSelector::new(registry_with_wearables(wearables), Duration::from_secs(10));
        let available = samples(wearables);
        group.bench_with_input(
            BenchmarkId::new("heart_rate", wearables),
            &available,
            |b, available| {
                b.iter(|| {
                    selector.select(
                        black_box(MetricKind::HeartRate),
                        WorkoutCategory::Running,
                        false,
                        black_box(available),
                    )
                });
            },
        );
        group.bench_with_input(
            BenchmarkId::new("distance_indoor", wearables),
            &available,
            |b, available| {
                b.iter(|| {
                    selector.select(
                        black_box(MetricKind::Distance),
                        WorkoutCategory::Running,
                        true,
                        black_box(available),
                    )
                });
            },
        );
    }
    group.finish();
}

fn bench_select_snapshot(c: &mut Criterion) {
    let mut group = c.benchmark_group("select_snapshot");
    let last_known = MetricSnapshot::default().with_value(MetricKind::Elevation, 40.0);
    for wearables in [0_usize, 2, 8] {
        let selector =
            MetricSourceSelector::new(registry_with_wearables(wearables), Duration::from_secs(10));
        let available = samples(wearables);
        group.bench_with_input(
            BenchmarkId::from_parameter(wearables),
            &available,
            |b, available| {
                b.iter(|| {
                    selector.select_snapshot(
                        WorkoutCategory::Running,
                        false,
                        black_box(available),
                        &last_known,
                    )
                });
            },
        );
    }
    group.finish();
}

criterion_group!(benches, bench_select, bench_select_snapshot);
criterion_main!(benches);
