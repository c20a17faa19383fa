// ABOUTME: Main library entry point for the Tandem multi-device workout coordination engine
// ABOUTME: Per-metric source selection, lifecycle replication, metrics sync and role handoff
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

// Crate-level attributes:
// - deny(unsafe_code): Zero-tolerance unsafe policy
#![deny(unsafe_code)]

//! # Tandem
//!
//! Coordination core for one workout observed by several devices at once: a
//! GPS-capable primary unit, a wrist-worn companion, and any number of
//! third-party wearables.
//!
//! ## Components
//!
//! - **Registry**: known telemetry sources, connectivity and quality scores
//! - **Rules**: which device class is authoritative for a metric
//! - **Selector**: per-metric choice or merge of the available samples
//! - **Sync**: periodic, loss-tolerant snapshot exchange between the peers
//! - **Session**: lifecycle replication with deterministic conflict resolution
//! - **Handoff**: automatic transfer of the primary tracking role
//!
//! [`coordinator::CoordinationCore`] wires them together; one instance runs
//! per device and talks to its peer through a [`transport::Transport`].
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use tandem::config::CoordinatorConfig;
//! use tandem::coordinator::{CoordinationCore, CoreParts};
//! use tandem::sensors::{SyntheticSensors, SyntheticSignals};
//! use tandem::transport::LoopbackTransport;
//! use tandem_core::models::{Device, DeviceCapabilities, DeviceClass, WorkoutCategory};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let (phone_end, _watch_end) = LoopbackTransport::pair("phone".into(), "watch".into(), 64);
//!     let core = CoordinationCore::new(
//!         CoordinatorConfig::from_env()?,
//!         CoreParts {
//!             local: Device::new("phone", DeviceClass::PrimaryUnit, "Phone", DeviceCapabilities::primary_unit()),
//!             peer: Device::new("watch", DeviceClass::CompanionUnit, "Watch", DeviceCapabilities::companion_unit()),
//!             transport: phone_end.transport,
//!             inbound: phone_end.inbound,
//!             sensors: Arc::new(SyntheticSensors::new()),
//!             signals: Arc::new(SyntheticSignals::new(0.9, true, false)),
//!         },
//!     )?;
//!     core.start().await?;
//!     let session = core.start_session(WorkoutCategory::Running, false).await?;
//!     println!("session {} started", session.id);
//!     core.shutdown().await;
//!     Ok(())
//! }
//! ```

/// Environment-driven configuration
pub mod config;

/// Per-device coordination core
pub mod coordinator;

/// Typed event bus
pub mod events;

/// Primary-role handoff
pub mod handoff;

/// Structured logging setup
pub mod logging;

/// Device registry and telemetry sources
pub mod registry;

/// Coordination rules engine
pub mod rules;

/// Metric source selector
pub mod selector;

/// Sensor and environment interfaces
pub mod sensors;

/// Session lifecycle replication
pub mod session;

/// Metrics sync channel
pub mod sync;

/// Peer transport interface and loopback implementation
pub mod transport;

pub use coordinator::{CoordinationCore, CoreParts};
pub use events::{CoordinationEvent, EventBus, StateChange};
