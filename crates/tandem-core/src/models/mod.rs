// ABOUTME: Core data models for devices, metrics, workout sessions and handoffs
// ABOUTME: Value types shared by every component of the coordination engine
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! # Data Models
//!
//! Value types exchanged between the registry, selector, synchronizer and
//! handoff monitor. Snapshots and sessions are treated as immutable once
//! built: components publish a new value instead of mutating a shared one.

/// Devices, device classes and capability flags
pub mod device;
/// Handoff directions, reasons and decisions
pub mod handoff;
/// Metric kinds, snapshots and provenance-tagged samples
pub mod metric;
/// Workout categories, lifecycle states and sessions
pub mod workout;

pub use device::{Device, DeviceCapabilities, DeviceClass, DeviceId};
pub use handoff::{HandoffDecision, HandoffDirection, HandoffReason};
pub use metric::{MetricKind, MetricSet, MetricSnapshot, MetricWithProvenance};
pub use workout::{SessionState, WorkoutCategory, WorkoutSession};
