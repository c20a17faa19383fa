// ABOUTME: Merge of inbound peer metrics into the held snapshot
// ABOUTME: Cumulative fields never move backwards; instantaneous fields follow the peer
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use chrono::{DateTime, Utc};
use tandem_core::models::{MetricKind, MetricSnapshot};

use super::quantize::QuantizedMetrics;

/// Result of merging one inbound payload
#[derive(Debug, Clone, PartialEq)]
pub struct ContinuityOutcome {
    /// Merged snapshot to publish
    pub snapshot: MetricSnapshot,
    /// Inbound cumulative fields dropped because they were behind
    pub discarded: Vec<MetricKind>,
}

/// Merge `inbound` over `current`
///
/// Elapsed time, distance and calories keep the held value when the inbound
/// one is lower. Fields the peer did not send keep the held value.
#[must_use]
pub fn preserve_continuity(
    current: &MetricSnapshot,
    inbound: &QuantizedMetrics,
    captured_at: DateTime<Utc>,
) -> ContinuityOutcome {
    let mut snapshot = current.captured(captured_at);
    let mut discarded = Vec::new();

    for metric in MetricKind::ALL {
        let Some(incoming) = inbound.value(metric) else {
            continue;
        };
        if metric.is_cumulative() {
            if let Some(held) = current.value(metric) {
                if incoming < held {
                    discarded.push(metric);
                    continue;
                }
            }
        }
        snapshot = snapshot.with_value(metric, incoming);
    }

    if inbound.average_pace.is_some() {
        snapshot.average_pace_seconds_per_meter = inbound.average_pace;
    }

    ContinuityOutcome {
        snapshot,
        discarded,
    }
}

/// Apply the cumulative floor of `floor` to a locally merged snapshot
///
/// Used when the local selection restarts from a source that is behind what
/// the session already published.
#[must_use]
pub fn enforce_floor(merged: MetricSnapshot, floor: &MetricSnapshot) -> MetricSnapshot {
    MetricKind::ALL
        .into_iter()
        .filter(|metric| metric.is_cumulative())
        .fold(merged, |snapshot, metric| {
            match (snapshot.value(metric), floor.value(metric)) {
                (Some(value), Some(minimum)) if value < minimum => {
                    snapshot.with_value(metric, minimum)
                }
                _ => snapshot,
            }
        })
}
