// ABOUTME: Telemetry source trait with one implementation per device class
// ABOUTME: Local sensor-backed unit, the peer link, and synthetic external wearables
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tandem_core::errors::{CoordinationError, CoordinationResult};
use tandem_core::models::{Device, DeviceCapabilities, DeviceClass, DeviceId, MetricSnapshot};
use tracing::debug;

use crate::sensors::{snapshot_from_sensors, SensorSource, SyntheticSensors};
use crate::transport::Transport;

/// A device the registry can probe, connect and read from
///
/// Implemented per device class and selected dynamically by the registry.
#[async_trait]
pub trait TelemetrySource: Send + Sync {
    /// Stable device identifier
    fn id(&self) -> &DeviceId;

    /// Role of the device in the session
    fn class(&self) -> DeviceClass;

    /// Human-readable name
    fn name(&self) -> &str;

    /// Advertised sensors
    fn capabilities(&self) -> DeviceCapabilities;

    /// Whether the device can currently be reached
    async fn is_reachable(&self) -> bool;

    /// Bring the device online
    ///
    /// # Errors
    ///
    /// Returns `CoordinationError::ConnectFailed` when the device refuses or is gone.
    async fn connect(&self) -> CoordinationResult<()>;

    /// Release the device
    async fn disconnect(&self);

    /// Latest snapshot produced by the device itself; `None` for sources that push
    async fn latest_snapshot(&self) -> Option<MetricSnapshot>;

    /// Registry record describing this source
    fn describe(&self) -> Device {
        Device::new(
            self.id().clone(),
            self.class(),
            self.name(),
            self.capabilities(),
        )
    }
}

/// This device's own sensors
pub struct SensorBackedSource {
    id: DeviceId,
    class: DeviceClass,
    name: String,
    capabilities: DeviceCapabilities,
    sensors: Arc<dyn SensorSource>,
}

impl SensorBackedSource {
    /// Wrap local sensors as a telemetry source
    #[must_use]
    pub fn new(
        id: DeviceId,
        class: DeviceClass,
        name: impl Into<String>,
        capabilities: DeviceCapabilities,
        sensors: Arc<dyn SensorSource>,
    ) -> Self {
        Self {
            id,
            class,
            name: name.into(),
            capabilities,
            sensors,
        }
    }
}

#[async_trait]
impl TelemetrySource for SensorBackedSource {
    fn id(&self) -> &DeviceId {
        &self.id
    }

    fn class(&self) -> DeviceClass {
        self.class
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn capabilities(&self) -> DeviceCapabilities {
        self.capabilities
    }

    async fn is_reachable(&self) -> bool {
        true
    }

    async fn connect(&self) -> CoordinationResult<()> {
        Ok(())
    }

    async fn disconnect(&self) {}

    async fn latest_snapshot(&self) -> Option<MetricSnapshot> {
        Some(snapshot_from_sensors(self.sensors.as_ref(), Utc::now()))
    }
}

/// The other primary peer, reached through the transport
///
/// The peer pushes its snapshots over the metrics sync channel, so this
/// source never produces one on demand.
pub struct PeerLink {
    id: DeviceId,
    class: DeviceClass,
    name: String,
    capabilities: DeviceCapabilities,
    transport: Arc<dyn Transport>,
}

impl PeerLink {
    /// Describe the peer reachable through `transport`
    #[must_use]
    pub fn new(
        id: DeviceId,
        class: DeviceClass,
        name: impl Into<String>,
        capabilities: DeviceCapabilities,
        transport: Arc<dyn Transport>,
    ) -> Self {
        Self {
            id,
            class,
            name: name.into(),
            capabilities,
            transport,
        }
    }
}

#[async_trait]
impl TelemetrySource for PeerLink {
    fn id(&self) -> &DeviceId {
        &self.id
    }

    fn class(&self) -> DeviceClass {
        self.class
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn capabilities(&self) -> DeviceCapabilities {
        self.capabilities
    }

    async fn is_reachable(&self) -> bool {
        self.transport.is_reachable(&self.id)
    }

    async fn connect(&self) -> CoordinationResult<()> {
        if self.transport.is_reachable(&self.id) {
            Ok(())
        } else {
            Err(CoordinationError::ConnectFailed {
                device_id: self.id.clone(),
                reason: "peer not reachable over transport".to_owned(),
            })
        }
    }

    async fn disconnect(&self) {
        debug!(device.id = %self.id, "Peer link released");
    }

    async fn latest_snapshot(&self) -> Option<MetricSnapshot> {
        None
    }
}

/// Scriptable third-party wearable for the simulator and tests
pub struct SyntheticWearable {
    id: DeviceId,
    name: String,
    capabilities: DeviceCapabilities,
    reachable: AtomicBool,
    sensors: SyntheticSensors,
}

impl SyntheticWearable {
    /// Wearable that is in range and has no readings yet
    #[must_use]
    pub fn new(id: DeviceId, name: impl Into<String>, capabilities: DeviceCapabilities) -> Self {
        Self {
            id,
            name: name.into(),
            capabilities,
            reachable: AtomicBool::new(true),
            sensors: SyntheticSensors::new(),
        }
    }

    /// Sensors feeding this wearable's snapshots
    #[must_use]
    pub const fn sensors(&self) -> &SyntheticSensors {
        &self.sensors
    }

    /// Move the wearable in or out of range
    pub fn set_reachable(&self, reachable: bool) {
        self.reachable.store(reachable, Ordering::SeqCst);
    }
}

#[async_trait]
impl TelemetrySource for SyntheticWearable {
    fn id(&self) -> &DeviceId {
        &self.id
    }

    fn class(&self) -> DeviceClass {
        DeviceClass::ExternalWearable
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn capabilities(&self) -> DeviceCapabilities {
        self.capabilities
    }

    async fn is_reachable(&self) -> bool {
        self.reachable.load(Ordering::SeqCst)
    }

    async fn connect(&self) -> CoordinationResult<()> {
        if self.reachable.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(CoordinationError::ConnectFailed {
                device_id: self.id.clone(),
                reason: "out of range".to_owned(),
            })
        }
    }

    async fn disconnect(&self) {}

    async fn latest_snapshot(&self) -> Option<MetricSnapshot> {
        Some(snapshot_from_sensors(&self.sensors, Utc::now()))
    }
}
