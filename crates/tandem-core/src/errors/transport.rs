// ABOUTME: Transport error types for the two-mode peer channel
// ABOUTME: Classifies send failures so callers know when durable fallback applies
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use thiserror::Error;

use crate::models::DeviceId;

/// Failures reported by a transport implementation
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TransportError {
    /// The peer is not reachable for immediate delivery
    #[error("peer {peer} is unreachable")]
    PeerUnreachable {
        /// Target peer
        peer: DeviceId,
    },

    /// The send was attempted and failed
    #[error("send to {peer} failed: {reason}")]
    SendFailed {
        /// Target peer
        peer: DeviceId,
        /// Transport-provided reason
        reason: String,
    },

    /// The immediate send did not complete within its bound
    #[error("send to {peer} timed out after {timeout_ms}ms")]
    Timeout {
        /// Target peer
        peer: DeviceId,
        /// Configured bound
        timeout_ms: u64,
    },

    /// The message could not be encoded for the wire
    #[error("message encoding failed: {0}")]
    Encoding(String),

    /// The local endpoint is closed
    #[error("transport endpoint closed")]
    Closed,
}

impl TransportError {
    /// Whether the same message may succeed through durable delivery
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::PeerUnreachable { .. } | Self::SendFailed { .. } | Self::Timeout { .. }
        )
    }
}

impl From<serde_json::Error> for TransportError {
    fn from(error: serde_json::Error) -> Self {
        Self::Encoding(error.to_string())
    }
}
