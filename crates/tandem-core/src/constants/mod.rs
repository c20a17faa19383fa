// ABOUTME: Constants module with domain-separated organization
// ABOUTME: Default intervals, thresholds, quality heuristics and env variable names
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! Constants module
//!
//! Constants are grouped into logical domains rather than being in a single
//! flat list. Runtime-tunable values have a matching environment variable in
//! [`env_config`] and are read by the coordinator configuration loader.

/// Quality heuristics per device class and metric
pub mod quality;

/// Periodic activity intervals
pub mod intervals {
    /// Metrics sync tick (milliseconds)
    pub const METRICS_SYNC_INTERVAL_MS: u64 = 2_000;
    /// Handoff evaluation tick (milliseconds)
    pub const HANDOFF_INTERVAL_MS: u64 = 5_000;
    /// Device discovery polling interval (milliseconds)
    pub const DISCOVERY_INTERVAL_MS: u64 = 10_000;
    /// Minimum time between two handoff decisions (seconds)
    pub const HANDOFF_COOLDOWN_SECS: u64 = 30;
}

/// Timeouts for requests awaiting a peer reply
pub mod timeouts {
    /// Capability queries, handoff acknowledgments and snapshot requests
    pub const PEER_REQUEST_TIMEOUT_MS: u64 = 3_000;
    /// Upper bound for a single immediate-mode send
    pub const IMMEDIATE_SEND_TIMEOUT_MS: u64 = 1_500;
}

/// Decision thresholds
pub mod thresholds {
    /// Battery fraction under which a device is considered low
    pub const BATTERY_LOW: f64 = 0.20;
    /// Samples older than this relative to the newest one are not averaged
    pub const MAX_SAMPLE_AGE_MS: u64 = 10_000;
    /// Consecutive immediate-send failures before routing straight to durable
    pub const BREAKER_FAILURE_THRESHOLD: u32 = 3;
    /// Time before immediate delivery is probed again after the breaker opens
    pub const BREAKER_RECOVERY_MS: u64 = 15_000;
    /// Successful probes needed to close the breaker again
    pub const BREAKER_SUCCESS_THRESHOLD: u32 = 1;
}

/// Bounded in-memory logs
pub mod capacity {
    /// Handoff decisions kept for diagnostics
    pub const HANDOFF_LOG: usize = 256;
    /// Sync records kept per session
    pub const SYNC_HISTORY: usize = 4_096;
    /// Inbound message queue depth
    pub const INBOUND_QUEUE: usize = 256;
    /// Event bus buffer per subscriber
    pub const EVENT_BUS: usize = 128;
}

/// Payload quantization
pub mod quantization {
    /// Decimal places kept for distances, paces, speeds, elevation, time and energy
    pub const DECIMAL_PLACES: i32 = 2;
}

/// Service identity used in structured logs
pub mod service_names {
    /// Coordination engine service name
    pub const TANDEM_COORDINATOR: &str = "tandem-coordinator";
}

/// Environment variable names read by the configuration loader
pub mod env_config {
    /// Metrics sync tick override
    pub const METRICS_SYNC_INTERVAL_MS: &str = "TANDEM_METRICS_SYNC_INTERVAL_MS";
    /// Handoff tick override
    pub const HANDOFF_INTERVAL_MS: &str = "TANDEM_HANDOFF_INTERVAL_MS";
    /// Handoff cooldown override
    pub const HANDOFF_COOLDOWN_SECS: &str = "TANDEM_HANDOFF_COOLDOWN_SECS";
    /// Discovery interval override
    pub const DISCOVERY_INTERVAL_MS: &str = "TANDEM_DISCOVERY_INTERVAL_MS";
    /// Battery threshold override (fraction 0..1)
    pub const BATTERY_THRESHOLD: &str = "TANDEM_BATTERY_THRESHOLD";
    /// Peer request timeout override
    pub const PEER_REQUEST_TIMEOUT_MS: &str = "TANDEM_PEER_REQUEST_TIMEOUT_MS";
    /// Immediate send timeout override
    pub const IMMEDIATE_SEND_TIMEOUT_MS: &str = "TANDEM_IMMEDIATE_SEND_TIMEOUT_MS";
    /// Sample staleness window override
    pub const MAX_SAMPLE_AGE_MS: &str = "TANDEM_MAX_SAMPLE_AGE_MS";
    /// Handoff log capacity override
    pub const HANDOFF_LOG_CAPACITY: &str = "TANDEM_HANDOFF_LOG_CAPACITY";
    /// Sync history capacity override
    pub const SYNC_HISTORY_CAPACITY: &str = "TANDEM_SYNC_HISTORY_CAPACITY";
    /// Delivery breaker failure threshold override
    pub const BREAKER_FAILURE_THRESHOLD: &str = "TANDEM_BREAKER_FAILURE_THRESHOLD";
    /// Delivery breaker recovery timeout override
    pub const BREAKER_RECOVERY_MS: &str = "TANDEM_BREAKER_RECOVERY_MS";
}
