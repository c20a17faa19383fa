// ABOUTME: Handoff decision records for transferring the primary tracking role
// ABOUTME: Decisions are write-once and appended to a diagnostic log
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::device::DeviceClass;

/// Which way the primary role moves
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HandoffDirection {
    /// Primary role moves to the wrist-worn companion
    ToCompanion,
    /// Primary role returns to the GPS-capable primary unit
    ToPrimaryUnit,
}

impl HandoffDirection {
    /// Device class that holds the role once the handoff commits
    #[must_use]
    pub const fn target(self) -> DeviceClass {
        match self {
            Self::ToCompanion => DeviceClass::CompanionUnit,
            Self::ToPrimaryUnit => DeviceClass::PrimaryUnit,
        }
    }

    /// Device class that must hold the role for this direction to apply
    #[must_use]
    pub const fn origin(self) -> DeviceClass {
        match self {
            Self::ToCompanion => DeviceClass::PrimaryUnit,
            Self::ToPrimaryUnit => DeviceClass::CompanionUnit,
        }
    }
}

impl fmt::Display for HandoffDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ToCompanion => f.write_str("to_companion"),
            Self::ToPrimaryUnit => f.write_str("to_primary_unit"),
        }
    }
}

/// Why a handoff was decided
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum HandoffReason {
    /// One side's battery fell under the threshold
    BatteryLow,
    /// The primary unit went to the background
    Backgrounded,
    /// The primary unit came back to the foreground
    Foregrounded,
    /// Satellite signal on the role holder is poor
    GpsPoor,
    /// The other side's sensors fit the workout better
    SensorsBetter,
    /// The role holder stopped answering
    PeerUnreachable,
}

impl fmt::Display for HandoffReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::BatteryLow => "battery-low",
            Self::Backgrounded => "backgrounded",
            Self::Foregrounded => "foregrounded",
            Self::GpsPoor => "gps-poor",
            Self::SensorsBetter => "sensors-better",
            Self::PeerUnreachable => "peer-unreachable",
        };
        f.write_str(label)
    }
}

/// A decided handoff; never mutated after creation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HandoffDecision {
    /// When the decision was taken
    pub decided_at: DateTime<Utc>,
    /// Role movement
    pub direction: HandoffDirection,
    /// Triggering rule
    pub reason: HandoffReason,
}

impl HandoffDecision {
    /// Record a decision taken now
    #[must_use]
    pub fn now(direction: HandoffDirection, reason: HandoffReason) -> Self {
        Self {
            decided_at: Utc::now(),
            direction,
            reason,
        }
    }
}
