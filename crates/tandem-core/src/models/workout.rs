// ABOUTME: Workout categories, the session lifecycle state machine, and session replicas
// ABOUTME: Defines the legal transition graph shared by both peers
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::metric::MetricSnapshot;

/// Workout category, which drives the handoff heuristics
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum WorkoutCategory {
    /// Running
    Running,
    /// Cycling
    Cycling,
    /// Hiking
    Hiking,
    /// Walking
    Walking,
    /// Swimming
    Swimming,
    /// Team and racquet sports
    Sports,
    /// Strength training
    Strength,
    /// Anything else
    #[default]
    Other,
}

impl WorkoutCategory {
    /// Categories tracked primarily through satellite positioning
    #[must_use]
    pub const fn is_gps_centric(self) -> bool {
        matches!(
            self,
            Self::Running | Self::Cycling | Self::Hiking | Self::Walking
        )
    }

    /// Categories tracked primarily through heart rate
    #[must_use]
    pub const fn is_heart_rate_centric(self) -> bool {
        matches!(self, Self::Strength | Self::Swimming)
    }

    /// Parse from a user or configuration string with fallback to `Other`
    #[must_use]
    pub fn from_str_or_default(value: &str) -> Self {
        match value.to_lowercase().as_str() {
            "running" | "run" => Self::Running,
            "cycling" | "ride" | "bike" => Self::Cycling,
            "hiking" | "hike" => Self::Hiking,
            "walking" | "walk" => Self::Walking,
            "swimming" | "swim" => Self::Swimming,
            "sports" | "sport" => Self::Sports,
            "strength" | "strength_training" => Self::Strength,
            _ => Self::Other,
        }
    }

    /// Stable lowercase label
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Running => "running",
            Self::Cycling => "cycling",
            Self::Hiking => "hiking",
            Self::Walking => "walking",
            Self::Swimming => "swimming",
            Self::Sports => "sports",
            Self::Strength => "strength",
            Self::Other => "other",
        }
    }
}

impl fmt::Display for WorkoutCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Workout lifecycle state
///
/// `idle → starting → running ⇄ paused → stopping → {stopped, completed}`.
/// `Stopped` and `Completed` are terminal and have no outgoing edges.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    /// Not started
    Idle,
    /// Countdown or sensor warm-up
    Starting,
    /// Actively recording
    Running,
    /// Recording suspended
    Paused,
    /// End requested, finalizing
    Stopping,
    /// Ended without completion (terminal)
    Stopped,
    /// Ended normally (terminal)
    Completed,
}

impl SessionState {
    /// Every lifecycle state
    pub const ALL: [Self; 7] = [
        Self::Idle,
        Self::Starting,
        Self::Running,
        Self::Paused,
        Self::Stopping,
        Self::Stopped,
        Self::Completed,
    ];

    /// Terminal states admit no further transition
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Stopped | Self::Completed)
    }

    /// States in which the workout is underway
    #[must_use]
    pub const fn is_active(self) -> bool {
        matches!(self, Self::Running | Self::Paused)
    }

    /// How far along the lifecycle the state is; running and paused share a rank
    #[must_use]
    pub const fn progress(self) -> u8 {
        match self {
            Self::Idle => 0,
            Self::Starting => 1,
            Self::Running | Self::Paused => 2,
            Self::Stopping => 3,
            Self::Stopped | Self::Completed => 4,
        }
    }

    /// Whether `next` is an edge of the transition graph from `self`
    #[must_use]
    pub const fn can_transition_to(self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Idle, Self::Starting)
                | (Self::Starting, Self::Running)
                | (Self::Running, Self::Paused)
                | (Self::Paused, Self::Running)
                | (Self::Running | Self::Paused, Self::Stopping)
                | (Self::Stopping, Self::Stopped | Self::Completed)
        )
    }

    /// Stable lowercase label
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Starting => "starting",
            Self::Running => "running",
            Self::Paused => "paused",
            Self::Stopping => "stopping",
            Self::Stopped => "stopped",
            Self::Completed => "completed",
        }
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One replica of the single logical workout session
///
/// Both peers hold a replica. Updates produce a new value that replaces the
/// old one atomically.
#[derive(Debug, Clone, PartialEq)]
pub struct WorkoutSession {
    /// Session identifier shared by both replicas
    pub id: Uuid,
    /// Workout category
    pub category: WorkoutCategory,
    /// Current lifecycle state
    pub state: SessionState,
    /// When tracking was initiated
    pub started_at: DateTime<Utc>,
    /// Whether the workout takes place without satellite signal
    pub is_indoor: bool,
    /// Current merged snapshot
    pub snapshot: Arc<MetricSnapshot>,
}

impl WorkoutSession {
    /// Begin a new session in the `Starting` state
    #[must_use]
    pub fn start(category: WorkoutCategory, is_indoor: bool) -> Self {
        let started_at = Utc::now();
        Self {
            id: Uuid::new_v4(),
            category,
            state: SessionState::Starting,
            started_at,
            is_indoor,
            snapshot: Arc::new(MetricSnapshot::empty_at(started_at)),
        }
    }

    /// Build a local replica of a session initiated by the peer
    #[must_use]
    pub fn replica(
        id: Uuid,
        category: WorkoutCategory,
        is_indoor: bool,
        started_at: DateTime<Utc>,
        state: SessionState,
    ) -> Self {
        Self {
            id,
            category,
            state,
            started_at,
            is_indoor,
            snapshot: Arc::new(MetricSnapshot::empty_at(started_at)),
        }
    }

    /// Copy of this session in another state
    #[must_use]
    pub fn with_state(&self, state: SessionState) -> Self {
        Self {
            state,
            ..self.clone()
        }
    }

    /// Copy of this session carrying a new merged snapshot
    #[must_use]
    pub fn with_snapshot(&self, snapshot: Arc<MetricSnapshot>) -> Self {
        Self {
            snapshot,
            ..self.clone()
        }
    }

    /// Whether the session has ended
    #[must_use]
    pub const fn is_finished(&self) -> bool {
        self.state.is_terminal()
    }
}
