// ABOUTME: Device registry tracking telemetry sources, connectivity and snapshots
// ABOUTME: Runs the discovery loop that re-probes reachability and auto-connects devices
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! # Device Registry
//!
//! Owns every known [`Device`]. Entries are `Arc` values swapped under the
//! map's shard lock, so concurrent readers (sync tick, handoff evaluator,
//! inbound handler) always see a whole record and never a half-applied
//! update. No network calls happen here; reachability comes from each
//! device's [`TelemetrySource`].

/// Static quality heuristics
pub mod quality;
/// Telemetry source trait and per-class implementations
pub mod source;

pub use source::{PeerLink, SensorBackedSource, SyntheticWearable, TelemetrySource};

use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use tandem_core::constants::quality::DISCONNECTED_PENALTY;
use tandem_core::errors::{CoordinationError, CoordinationResult};
use tandem_core::models::{
    Device, DeviceClass, DeviceId, MetricKind, MetricSnapshot, MetricWithProvenance,
};
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;
use tokio::time;
use tracing::{debug, info, warn};

use quality::{base_quality, nominal_capabilities};

/// Reachability of a device flipped during discovery
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectivityChange {
    /// Device whose reachability changed
    pub device_id: DeviceId,
    /// Its class
    pub class: DeviceClass,
    /// New connectivity
    pub connected: bool,
}

/// Registry of all telemetry sources known to this device
#[derive(Default)]
pub struct DeviceRegistry {
    devices: DashMap<DeviceId, Arc<Device>>,
    sources: DashMap<DeviceId, Arc<dyn TelemetrySource>>,
}

impl DeviceRegistry {
    /// Create an empty registry
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a device record with no backing source
    ///
    /// # Errors
    ///
    /// Returns `CoordinationError::DuplicateDevice` if the id is taken.
    pub fn register(&self, device: Device) -> CoordinationResult<()> {
        if self.devices.contains_key(&device.id) {
            return Err(CoordinationError::DuplicateDevice {
                device_id: device.id,
            });
        }
        info!(
            device.id = %device.id,
            device.class = %device.class,
            device.name = %device.name,
            "Registered telemetry device"
        );
        self.devices.insert(device.id.clone(), Arc::new(device));
        Ok(())
    }

    /// Register a device together with the source the discovery loop probes
    ///
    /// # Errors
    ///
    /// Returns `CoordinationError::DuplicateDevice` if the id is taken.
    pub fn register_source(&self, source: Arc<dyn TelemetrySource>) -> CoordinationResult<()> {
        let device = source.describe();
        let id = device.id.clone();
        self.register(device)?;
        self.sources.insert(id, source);
        Ok(())
    }

    /// Remove a device and its source entirely
    pub fn unregister(&self, id: &DeviceId) -> Option<Arc<Device>> {
        self.sources.remove(id);
        self.devices.remove(id).map(|(_, device)| device)
    }

    /// Look up one device
    #[must_use]
    pub fn get(&self, id: &DeviceId) -> Option<Arc<Device>> {
        self.devices.get(id).map(|entry| Arc::clone(entry.value()))
    }

    /// Devices that are enabled and currently connected
    #[must_use]
    pub fn connected_devices(&self) -> Vec<Arc<Device>> {
        self.devices
            .iter()
            .filter(|entry| entry.value().is_live())
            .map(|entry| Arc::clone(entry.value()))
            .collect()
    }

    /// Whether at least one live device of `class` exists
    #[must_use]
    pub fn is_class_live(&self, class: DeviceClass) -> bool {
        self.devices
            .iter()
            .any(|entry| entry.value().class == class && entry.value().is_live())
    }

    /// Update connectivity; returns whether the flag actually changed
    ///
    /// # Errors
    ///
    /// Returns `CoordinationError::UnknownDevice` if the id is not registered.
    pub fn set_connectivity(&self, id: &DeviceId, connected: bool) -> CoordinationResult<bool> {
        self.swap(id, |device| {
            (device.connected != connected).then(|| device.with_connectivity(connected))
        })
    }

    /// Store the latest snapshot reported by a device
    ///
    /// # Errors
    ///
    /// Returns `CoordinationError::UnknownDevice` if the id is not registered.
    pub fn update_snapshot(
        &self,
        id: &DeviceId,
        snapshot: MetricSnapshot,
    ) -> CoordinationResult<()> {
        let snapshot = Arc::new(snapshot);
        self.swap(id, |device| Some(device.with_snapshot(Arc::clone(&snapshot))))
            .map(|_| ())
    }

    /// Re-enable a device so discovery may connect it again
    ///
    /// # Errors
    ///
    /// Returns `CoordinationError::UnknownDevice` if the id is not registered.
    pub fn enable(&self, id: &DeviceId) -> CoordinationResult<()> {
        self.swap(id, |device| (!device.enabled).then(|| device.with_enabled(true)))
            .map(|_| ())
    }

    /// Exclude a device from selection and release its source
    ///
    /// # Errors
    ///
    /// Returns `CoordinationError::UnknownDevice` if the id is not registered.
    pub async fn disable(&self, id: &DeviceId) -> CoordinationResult<()> {
        self.swap(id, |device| {
            device
                .enabled
                .then(|| device.with_enabled(false).with_connectivity(false))
        })?;
        let source = self.sources.get(id).map(|entry| Arc::clone(entry.value()));
        if let Some(source) = source {
            source.disconnect().await;
        }
        info!(device.id = %id, "Telemetry device disabled");
        Ok(())
    }

    /// Replace one entry with the value produced by `update`, if any
    fn swap<F>(&self, id: &DeviceId, update: F) -> CoordinationResult<bool>
    where
        F: FnOnce(&Device) -> Option<Device>,
    {
        let mut entry = self
            .devices
            .get_mut(id)
            .ok_or_else(|| CoordinationError::UnknownDevice {
                device_id: id.clone(),
            })?;
        match update(entry.value()) {
            Some(next) => {
                *entry.value_mut() = Arc::new(next);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Quality of `metric` when taken from a device of `class`
    ///
    /// Uses the best live device of that class. A class with no live device
    /// is penalized below every live score, so stale sources never win.
    #[must_use]
    pub fn quality_score(&self, class: DeviceClass, metric: MetricKind) -> f64 {
        let live_best = self
            .devices
            .iter()
            .filter(|entry| entry.value().class == class && entry.value().is_live())
            .map(|entry| base_quality(class, metric, entry.value().capabilities))
            .reduce(f64::max);

        live_best.unwrap_or_else(|| {
            base_quality(class, metric, nominal_capabilities(class)) - DISCONNECTED_PENALTY
        })
    }

    /// Provenance-tagged snapshots from every live device that has one
    ///
    /// Readings for metrics outside a device's capabilities are dropped.
    #[must_use]
    pub fn available_samples(&self) -> Vec<MetricWithProvenance> {
        self.devices
            .iter()
            .filter(|entry| entry.value().is_live())
            .filter_map(|entry| {
                let device = entry.value();
                device.snapshot.as_ref().map(|snapshot| {
                    let supported = snapshot.restricted_to(device.capabilities.metrics());
                    MetricWithProvenance::new(supported, device.class)
                        .from_device(device.id.clone())
                })
            })
            .collect()
    }

    /// Pull fresh snapshots from every live source that produces them
    pub async fn refresh_snapshots(&self) {
        for (id, source) in self.live_sources() {
            if let Some(snapshot) = source.latest_snapshot().await {
                if let Err(e) = self.update_snapshot(&id, snapshot) {
                    debug!(device.id = %id, error = %e, "Dropped snapshot for removed device");
                }
            }
        }
    }

    fn live_sources(&self) -> Vec<(DeviceId, Arc<dyn TelemetrySource>)> {
        self.sources
            .iter()
            .filter(|entry| self.get(entry.key()).is_some_and(|device| device.is_live()))
            .map(|entry| (entry.key().clone(), Arc::clone(entry.value())))
            .collect()
    }

    /// Probe every source once, connecting enabled devices that came into reach
    pub async fn discover_once(&self) -> Vec<ConnectivityChange> {
        let sources: Vec<(DeviceId, Arc<dyn TelemetrySource>)> = self
            .sources
            .iter()
            .map(|entry| (entry.key().clone(), Arc::clone(entry.value())))
            .collect();

        let mut changes = Vec::new();
        for (id, source) in sources {
            let Some(device) = self.get(&id) else {
                continue;
            };
            if !device.enabled {
                continue;
            }

            let reachable = source.is_reachable().await;
            let connected = match (reachable, device.connected) {
                (true, false) => match source.connect().await {
                    Ok(()) => true,
                    Err(e) => {
                        warn!(device.id = %id, error = %e, "Auto-connect failed");
                        false
                    }
                },
                (false, true) => false,
                (_, current) => current,
            };

            if matches!(self.set_connectivity(&id, connected), Ok(true)) {
                info!(device.id = %id, connected, "Device connectivity changed");
                changes.push(ConnectivityChange {
                    device_id: id,
                    class: device.class,
                    connected,
                });
            }
        }
        changes
    }

    /// Spawn the periodic discovery loop
    ///
    /// Connectivity changes are forwarded on `changes`; the loop ends when
    /// `shutdown` fires or the receiving side of `changes` is dropped.
    pub fn spawn_discovery(
        self: &Arc<Self>,
        interval: Duration,
        mut shutdown: broadcast::Receiver<()>,
        changes: mpsc::Sender<ConnectivityChange>,
    ) -> JoinHandle<()> {
        let registry = Arc::clone(self);
        tokio::spawn(async move {
            let mut ticker = time::interval(interval);
            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        for change in registry.discover_once().await {
                            if changes.send(change).await.is_err() {
                                debug!("Discovery listener gone, stopping discovery loop");
                                return;
                            }
                        }
                    }
                    _ = shutdown.recv() => {
                        debug!("Discovery loop received shutdown signal");
                        break;
                    }
                }
            }
        })
    }
}
