// ABOUTME: Telemetry device identity, class and capability flags
// ABOUTME: Devices are owned by the registry and replaced wholesale on every update
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::metric::{MetricKind, MetricSet, MetricSnapshot};

/// Stable identifier of a telemetry device
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DeviceId(String);

impl DeviceId {
    /// Create a device id from any string-like value
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Borrow the id as a string slice
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DeviceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for DeviceId {
    fn from(value: &str) -> Self {
        Self(value.to_owned())
    }
}

/// Role a device plays in the session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeviceClass {
    /// GPS-capable primary unit (typically the phone)
    PrimaryUnit,
    /// Wrist-worn companion with biometric sensors
    CompanionUnit,
    /// Third-party wearable (chest strap, footpod, ...)
    ExternalWearable,
}

impl DeviceClass {
    /// All classes, in a fixed order
    pub const ALL: [Self; 3] = [
        Self::PrimaryUnit,
        Self::CompanionUnit,
        Self::ExternalWearable,
    ];

    /// Stable lowercase label used in logs and on the wire
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::PrimaryUnit => "primary_unit",
            Self::CompanionUnit => "companion_unit",
            Self::ExternalWearable => "external_wearable",
        }
    }

    /// Compact representation for atomic storage
    #[must_use]
    pub const fn to_u8(self) -> u8 {
        match self {
            Self::PrimaryUnit => 0,
            Self::CompanionUnit => 1,
            Self::ExternalWearable => 2,
        }
    }

    /// Inverse of [`Self::to_u8`]; unknown values map to the primary unit
    #[must_use]
    pub const fn from_u8(value: u8) -> Self {
        match value {
            1 => Self::CompanionUnit,
            2 => Self::ExternalWearable,
            _ => Self::PrimaryUnit,
        }
    }

    /// Whether the class is one of the two peers that exchange session state
    #[must_use]
    pub const fn is_peer_class(self) -> bool {
        matches!(self, Self::PrimaryUnit | Self::CompanionUnit)
    }
}

impl fmt::Display for DeviceClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

bitflags::bitflags! {
    /// Sensor capabilities a device advertises
    #[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
    pub struct DeviceCapabilities: u8 {
        /// Satellite positioning
        const GPS = 0b0000_0001;
        /// Heart rate sensor
        const HEART_RATE = 0b0000_0010;
        /// Step or pedal cadence
        const CADENCE = 0b0000_0100;
        /// Barometric or GPS elevation
        const ELEVATION = 0b0000_1000;
        /// Energy expenditure estimate
        const CALORIES = 0b0001_0000;
        /// Distance covered
        const DISTANCE = 0b0010_0000;
        /// Pace and speed
        const PACE = 0b0100_0000;
    }
}

impl DeviceCapabilities {
    /// Typical GPS-capable primary unit
    #[must_use]
    pub const fn primary_unit() -> Self {
        Self::GPS
            .union(Self::DISTANCE)
            .union(Self::PACE)
            .union(Self::ELEVATION)
            .union(Self::CALORIES)
            .union(Self::CADENCE)
    }

    /// Typical wrist-worn companion with its own GPS
    #[must_use]
    pub const fn companion_unit() -> Self {
        Self::all()
    }

    /// Heart-rate-only strap
    #[must_use]
    pub const fn heart_rate_strap() -> Self {
        Self::HEART_RATE.union(Self::CALORIES)
    }

    /// Whether the device can report the given metric at all
    #[must_use]
    pub const fn supports(self, metric: MetricKind) -> bool {
        match metric {
            MetricKind::Distance => self.contains(Self::DISTANCE),
            MetricKind::Pace | MetricKind::Speed => self.contains(Self::PACE),
            MetricKind::Elevation => self.contains(Self::ELEVATION),
            MetricKind::HeartRate => self.contains(Self::HEART_RATE),
            MetricKind::Cadence => self.contains(Self::CADENCE),
            MetricKind::Calories => self.contains(Self::CALORIES),
            MetricKind::ElapsedTime => true,
        }
    }

    /// Every metric the device can report
    #[must_use]
    pub fn metrics(self) -> MetricSet {
        MetricKind::ALL
            .into_iter()
            .filter(|metric| self.supports(*metric))
            .fold(MetricSet::empty(), |set, metric| set | MetricSet::of(metric))
    }
}

/// A registered telemetry source
///
/// The registry never mutates a `Device` in place: every update builds a new
/// value and swaps it in, so readers always observe a consistent record.
#[derive(Debug, Clone, PartialEq)]
pub struct Device {
    /// Stable identifier
    pub id: DeviceId,
    /// Role in the session
    pub class: DeviceClass,
    /// Human-readable name for diagnostics
    pub name: String,
    /// Sensors the device advertises
    pub capabilities: DeviceCapabilities,
    /// Whether the device participates in selection at all
    pub enabled: bool,
    /// Whether the device is currently reachable
    pub connected: bool,
    /// Latest snapshot reported by the device
    pub snapshot: Option<Arc<MetricSnapshot>>,
    /// When the device was last seen reachable
    pub last_seen: Option<DateTime<Utc>>,
}

impl Device {
    /// Create an enabled, not yet connected device
    #[must_use]
    pub fn new(
        id: impl Into<DeviceId>,
        class: DeviceClass,
        name: impl Into<String>,
        capabilities: DeviceCapabilities,
    ) -> Self {
        Self {
            id: id.into(),
            class,
            name: name.into(),
            capabilities,
            enabled: true,
            connected: false,
            snapshot: None,
            last_seen: None,
        }
    }

    /// Whether the device may contribute samples right now
    #[must_use]
    pub const fn is_live(&self) -> bool {
        self.enabled && self.connected
    }

    /// Copy of this device with a different connectivity flag
    #[must_use]
    pub fn with_connectivity(&self, connected: bool) -> Self {
        Self {
            connected,
            last_seen: if connected {
                Some(Utc::now())
            } else {
                self.last_seen
            },
            ..self.clone()
        }
    }

    /// Copy of this device carrying a new snapshot
    #[must_use]
    pub fn with_snapshot(&self, snapshot: Arc<MetricSnapshot>) -> Self {
        Self {
            snapshot: Some(snapshot),
            ..self.clone()
        }
    }

    /// Copy of this device with a different enabled flag
    #[must_use]
    pub fn with_enabled(&self, enabled: bool) -> Self {
        Self {
            enabled,
            ..self.clone()
        }
    }
}

impl From<String> for DeviceId {
    fn from(value: String) -> Self {
        Self(value)
    }
}
