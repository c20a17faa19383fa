// ABOUTME: Unified error types for the Tandem coordination engine
// ABOUTME: Coordination and transport errors with structured context and retry hints
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! # Error Handling
//!
//! Nothing in the coordination engine is fatal to the process. These types
//! exist so that callers can tell a rejected request (bad transition, unknown
//! device) apart from a degraded transport, which the engine recovers from on
//! its own.

/// Transport-level error types
pub mod transport;

pub use transport::TransportError;

use thiserror::Error;
use uuid::Uuid;

use crate::models::{DeviceId, SessionState};

/// Errors surfaced by the coordination core's public operations
#[derive(Debug, Error)]
pub enum CoordinationError {
    /// The requested lifecycle transition is not an edge of the state graph
    #[error("invalid session transition from {from} to {to}")]
    InvalidTransition {
        /// Current state of the local replica
        from: SessionState,
        /// Requested target state
        to: SessionState,
    },

    /// No live session exists on this device
    #[error("no active workout session")]
    NoActiveSession,

    /// A live session exists and a new one cannot be started
    #[error("session {session_id} is still active")]
    SessionAlreadyActive {
        /// Identifier of the live session
        session_id: Uuid,
    },

    /// The caller referenced a session other than the live one
    #[error("session {requested} does not match the active session {active}")]
    SessionMismatch {
        /// Session id supplied by the caller
        requested: Uuid,
        /// Session id held by this device
        active: Uuid,
    },

    /// The device id is not registered
    #[error("device {device_id} is not registered")]
    UnknownDevice {
        /// Identifier that failed the lookup
        device_id: DeviceId,
    },

    /// A device with the same id is already registered
    #[error("device {device_id} is already registered")]
    DuplicateDevice {
        /// Identifier of the existing registration
        device_id: DeviceId,
    },

    /// The device could not be brought online
    #[error("device {device_id} failed to connect: {reason}")]
    ConnectFailed {
        /// Device that failed
        device_id: DeviceId,
        /// Collaborator-provided reason
        reason: String,
    },

    /// The peer did not answer a request in time
    #[error("{operation} timed out after {timeout_ms}ms")]
    Timeout {
        /// Request that timed out
        operation: &'static str,
        /// Configured bound
        timeout_ms: u64,
    },

    /// The peer answered with an unexpected message kind
    #[error("unexpected reply to {operation}: {received}")]
    UnexpectedReply {
        /// Request that was sent
        operation: &'static str,
        /// Kind of message that came back
        received: String,
    },

    /// Transport failure that was not recovered by durable fallback
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// The coordination core has been shut down
    #[error("coordination core is shut down")]
    ShutDown,
}

impl CoordinationError {
    /// Create an invalid transition error
    #[must_use]
    pub const fn invalid_transition(from: SessionState, to: SessionState) -> Self {
        Self::InvalidTransition { from, to }
    }

    /// Create a timeout error
    #[must_use]
    pub const fn timeout(operation: &'static str, timeout_ms: u64) -> Self {
        Self::Timeout {
            operation,
            timeout_ms,
        }
    }

    /// Whether the failure stems from the peer link rather than the request itself
    #[must_use]
    pub const fn is_peer_failure(&self) -> bool {
        matches!(
            self,
            Self::Timeout { .. } | Self::UnexpectedReply { .. } | Self::Transport(_)
        )
    }
}

/// Result type alias for coordination operations
pub type CoordinationResult<T> = Result<T, CoordinationError>;
