// ABOUTME: Core types and constants for the Tandem workout coordination engine
// ABOUTME: Foundation crate with error handling, domain models, and default tuning values
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

#![deny(unsafe_code)]

//! # Tandem Core
//!
//! Foundation crate providing the shared vocabulary of the Tandem coordination
//! engine: devices and their capabilities, metric snapshots, workout sessions
//! and their lifecycle, and handoff decisions. The crate has no async runtime
//! dependency so that it changes infrequently and compiles fast.
//!
//! ## Modules
//!
//! - **errors**: `CoordinationError` and `TransportError` with structured context
//! - **constants**: Default intervals, thresholds and quality heuristics
//! - **models**: Device, metric, session and handoff value types

/// Unified error types for the coordination engine
pub mod errors;

/// Default tuning values and environment variable names organized by domain
pub mod constants;

/// Core data models (Device, `MetricSnapshot`, `WorkoutSession`, `HandoffDecision`)
pub mod models;
