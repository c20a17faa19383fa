// ABOUTME: Metric source selector choosing the authoritative sample per metric
// ABOUTME: Rule-preferred class first, quality ranking second, heart rate averaged across sources
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! # Metric Source Selector
//!
//! Called on every sync tick, so it performs no I/O and allocates little.
//! Selection never invents values: when nothing reports a metric the caller
//! keeps its last-known value.

use std::cmp::Ordering;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tandem_core::models::{MetricKind, MetricSnapshot, MetricWithProvenance, WorkoutCategory};

use crate::registry::DeviceRegistry;
use crate::rules::primary_device_class;

/// Picks or merges samples from the currently available sources
#[derive(Clone)]
pub struct MetricSourceSelector {
    registry: Arc<DeviceRegistry>,
    max_sample_age: Duration,
}

impl MetricSourceSelector {
    /// Create a selector ranking sources with `registry` quality scores
    #[must_use]
    pub const fn new(registry: Arc<DeviceRegistry>, max_sample_age: Duration) -> Self {
        Self {
            registry,
            max_sample_age,
        }
    }

    /// Authoritative sample for `metric`, or `None` when no source reports it
    ///
    /// Heart rate is cross-validated: with two or more fresh samples the
    /// result carries their average instead of a single source's value.
    #[must_use]
    pub fn select(
        &self,
        metric: MetricKind,
        category: WorkoutCategory,
        is_indoor: bool,
        available: &[MetricWithProvenance],
    ) -> Option<MetricWithProvenance> {
        let candidates: Vec<&MetricWithProvenance> = available
            .iter()
            .filter(|sample| sample.value(metric).is_some())
            .collect();

        if metric == MetricKind::HeartRate {
            let fresh = self.fresh(&candidates);
            if fresh.len() >= 2 {
                let average = mean(metric, &fresh)?;
                let chosen = self.pick_single(metric, category, is_indoor, &fresh)?;
                let mut merged = chosen.clone();
                merged.snapshot = merged.snapshot.with_value(metric, average);
                return Some(merged);
            }
        }

        self.pick_single(metric, category, is_indoor, &candidates)
            .cloned()
    }

    /// Average value of `metric` over the fresh samples in `sources`
    #[must_use]
    pub fn merge(&self, metric: MetricKind, sources: &[MetricWithProvenance]) -> Option<f64> {
        let candidates: Vec<&MetricWithProvenance> = sources
            .iter()
            .filter(|sample| sample.value(metric).is_some())
            .collect();
        mean(metric, &self.fresh(&candidates))
    }

    /// Full merged snapshot, metric by metric, keeping `last_known` values
    /// for metrics nobody currently reports
    #[must_use]
    pub fn select_snapshot(
        &self,
        category: WorkoutCategory,
        is_indoor: bool,
        available: &[MetricWithProvenance],
        last_known: &MetricSnapshot,
    ) -> MetricSnapshot {
        let mut merged = last_known.captured(Utc::now());
        for metric in MetricKind::ALL {
            let Some(sample) = self.select(metric, category, is_indoor, available) else {
                continue;
            };
            let Some(value) = sample.value(metric) else {
                continue;
            };
            merged = merged.with_value(metric, value);
            if metric == MetricKind::Pace {
                if let Some(average) = sample.snapshot.average_pace_seconds_per_meter {
                    merged.average_pace_seconds_per_meter = Some(average);
                }
            }
        }
        merged
    }

    fn pick_single<'a>(
        &self,
        metric: MetricKind,
        category: WorkoutCategory,
        is_indoor: bool,
        candidates: &[&'a MetricWithProvenance],
    ) -> Option<&'a MetricWithProvenance> {
        let preferred = primary_device_class(metric, category, is_indoor);
        let from_preferred = candidates
            .iter()
            .copied()
            .filter(|sample| sample.source == preferred)
            .max_by_key(|sample| sample.captured_at);
        if from_preferred.is_some() {
            return from_preferred;
        }

        candidates.iter().copied().max_by(|a, b| {
            self.rank(metric, a)
                .partial_cmp(&self.rank(metric, b))
                .unwrap_or(Ordering::Equal)
                .then_with(|| a.captured_at.cmp(&b.captured_at))
        })
    }

    fn rank(&self, metric: MetricKind, sample: &MetricWithProvenance) -> f64 {
        self.registry.quality_score(sample.source, metric) + sample.accuracy.unwrap_or(0.0)
    }

    /// Samples captured within the staleness window of the newest one
    fn fresh<'a>(&self, candidates: &[&'a MetricWithProvenance]) -> Vec<&'a MetricWithProvenance> {
        let Some(newest) = candidates.iter().map(|sample| sample.captured_at).max() else {
            return Vec::new();
        };
        candidates
            .iter()
            .copied()
            .filter(|sample| {
                (newest - sample.captured_at)
                    .to_std()
                    .map_or(true, |age| age <= self.max_sample_age)
            })
            .collect()
    }
}

#[allow(clippy::cast_precision_loss)]
fn mean(metric: MetricKind, samples: &[&MetricWithProvenance]) -> Option<f64> {
    let values: Vec<f64> = samples
        .iter()
        .filter_map(|sample| sample.value(metric))
        .collect();
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}
