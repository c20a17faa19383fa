// ABOUTME: Environment-based configuration for the coordination core
// ABOUTME: Tick intervals, timeouts, thresholds and log capacities with validated defaults
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use std::env;
use std::error::Error;
use std::str::FromStr;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use tandem_core::constants::{capacity, env_config, intervals, thresholds, timeouts};
use tracing::info;

use crate::handoff::HandoffConfig;
use crate::sync::{DeliveryBreakerConfig, SyncChannelConfig};

/// Runtime settings of one coordination core
#[derive(Debug, Clone)]
pub struct CoordinatorConfig {
    /// Metrics sync tick
    pub metrics_sync_interval: Duration,
    /// Handoff evaluation tick
    pub handoff_interval: Duration,
    /// Minimum time between handoff decisions
    pub handoff_cooldown: Duration,
    /// Device discovery polling interval
    pub discovery_interval: Duration,
    /// Battery fraction under which a device counts as low
    pub battery_threshold: f64,
    /// Bound for requests awaiting a peer reply
    pub peer_request_timeout: Duration,
    /// Bound for a single immediate send
    pub immediate_send_timeout: Duration,
    /// Staleness window for averaged samples
    pub max_sample_age: Duration,
    /// Handoff decisions kept in memory
    pub handoff_log_capacity: usize,
    /// Sync records kept per session
    pub sync_history_capacity: usize,
    /// Event bus buffer
    pub event_bus_capacity: usize,
    /// Immediate-delivery breaker
    pub breaker: DeliveryBreakerConfig,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            metrics_sync_interval: Duration::from_millis(intervals::METRICS_SYNC_INTERVAL_MS),
            handoff_interval: Duration::from_millis(intervals::HANDOFF_INTERVAL_MS),
            handoff_cooldown: Duration::from_secs(intervals::HANDOFF_COOLDOWN_SECS),
            discovery_interval: Duration::from_millis(intervals::DISCOVERY_INTERVAL_MS),
            battery_threshold: thresholds::BATTERY_LOW,
            peer_request_timeout: Duration::from_millis(timeouts::PEER_REQUEST_TIMEOUT_MS),
            immediate_send_timeout: Duration::from_millis(timeouts::IMMEDIATE_SEND_TIMEOUT_MS),
            max_sample_age: Duration::from_millis(thresholds::MAX_SAMPLE_AGE_MS),
            handoff_log_capacity: capacity::HANDOFF_LOG,
            sync_history_capacity: capacity::SYNC_HISTORY,
            event_bus_capacity: capacity::EVENT_BUS,
            breaker: DeliveryBreakerConfig::default(),
        }
    }
}

impl CoordinatorConfig {
    /// Load configuration from environment variables, falling back to defaults
    ///
    /// # Errors
    ///
    /// Returns an error if a variable is set to an unparseable value or the
    /// resulting configuration fails validation.
    pub fn from_env() -> Result<Self> {
        let defaults = Self::default();
        let config = Self {
            metrics_sync_interval: Duration::from_millis(parse_env_or(
                env_config::METRICS_SYNC_INTERVAL_MS,
                intervals::METRICS_SYNC_INTERVAL_MS,
            )?),
            handoff_interval: Duration::from_millis(parse_env_or(
                env_config::HANDOFF_INTERVAL_MS,
                intervals::HANDOFF_INTERVAL_MS,
            )?),
            handoff_cooldown: Duration::from_secs(parse_env_or(
                env_config::HANDOFF_COOLDOWN_SECS,
                intervals::HANDOFF_COOLDOWN_SECS,
            )?),
            discovery_interval: Duration::from_millis(parse_env_or(
                env_config::DISCOVERY_INTERVAL_MS,
                intervals::DISCOVERY_INTERVAL_MS,
            )?),
            battery_threshold: parse_env_or(
                env_config::BATTERY_THRESHOLD,
                thresholds::BATTERY_LOW,
            )?,
            peer_request_timeout: Duration::from_millis(parse_env_or(
                env_config::PEER_REQUEST_TIMEOUT_MS,
                timeouts::PEER_REQUEST_TIMEOUT_MS,
            )?),
            immediate_send_timeout: Duration::from_millis(parse_env_or(
                env_config::IMMEDIATE_SEND_TIMEOUT_MS,
                timeouts::IMMEDIATE_SEND_TIMEOUT_MS,
            )?),
            max_sample_age: Duration::from_millis(parse_env_or(
                env_config::MAX_SAMPLE_AGE_MS,
                thresholds::MAX_SAMPLE_AGE_MS,
            )?),
            handoff_log_capacity: parse_env_or(
                env_config::HANDOFF_LOG_CAPACITY,
                capacity::HANDOFF_LOG,
            )?,
            sync_history_capacity: parse_env_or(
                env_config::SYNC_HISTORY_CAPACITY,
                capacity::SYNC_HISTORY,
            )?,
            event_bus_capacity: defaults.event_bus_capacity,
            breaker: DeliveryBreakerConfig {
                failure_threshold: parse_env_or(
                    env_config::BREAKER_FAILURE_THRESHOLD,
                    thresholds::BREAKER_FAILURE_THRESHOLD,
                )?,
                recovery_timeout: Duration::from_millis(parse_env_or(
                    env_config::BREAKER_RECOVERY_MS,
                    thresholds::BREAKER_RECOVERY_MS,
                )?),
                success_threshold: defaults.breaker.success_threshold,
            },
        };

        config.validate()?;
        info!("{}", config.summary());
        Ok(config)
    }

    /// Reject configurations the core cannot run with
    ///
    /// # Errors
    ///
    /// Returns an error naming the first offending setting.
    pub fn validate(&self) -> Result<()> {
        for (name, value) in [
            (env_config::METRICS_SYNC_INTERVAL_MS, self.metrics_sync_interval),
            (env_config::HANDOFF_INTERVAL_MS, self.handoff_interval),
            (env_config::DISCOVERY_INTERVAL_MS, self.discovery_interval),
            (env_config::PEER_REQUEST_TIMEOUT_MS, self.peer_request_timeout),
            (env_config::IMMEDIATE_SEND_TIMEOUT_MS, self.immediate_send_timeout),
        ] {
            if value.is_zero() {
                bail!("{name} must be greater than zero");
            }
        }

        if !(0.0..=1.0).contains(&self.battery_threshold) {
            bail!(
                "{} must be a fraction between 0 and 1, got {}",
                env_config::BATTERY_THRESHOLD,
                self.battery_threshold
            );
        }
        if self.handoff_log_capacity == 0 {
            bail!("{} must be at least 1", env_config::HANDOFF_LOG_CAPACITY);
        }
        if self.sync_history_capacity == 0 {
            bail!("{} must be at least 1", env_config::SYNC_HISTORY_CAPACITY);
        }
        if self.breaker.failure_threshold == 0 {
            bail!("{} must be at least 1", env_config::BREAKER_FAILURE_THRESHOLD);
        }
        Ok(())
    }

    /// Parameters for a session's metrics sync channel
    #[must_use]
    pub fn sync_channel(&self) -> SyncChannelConfig {
        SyncChannelConfig {
            immediate_timeout: self.immediate_send_timeout,
            history_capacity: self.sync_history_capacity,
            breaker: self.breaker,
        }
    }

    /// Parameters for the handoff monitor
    #[must_use]
    pub fn handoff(&self) -> HandoffConfig {
        HandoffConfig {
            cooldown: self.handoff_cooldown,
            battery_threshold: self.battery_threshold,
            request_timeout: self.peer_request_timeout,
            log_capacity: self.handoff_log_capacity,
        }
    }

    /// One-line summary for startup logs
    #[must_use]
    pub fn summary(&self) -> String {
        format!(
            "Coordinator configuration: sync every {:?}, handoff every {:?} (cooldown {:?}), \
             discovery every {:?}, battery threshold {:.0}%, peer timeout {:?}",
            self.metrics_sync_interval,
            self.handoff_interval,
            self.handoff_cooldown,
            self.discovery_interval,
            self.battery_threshold * 100.0,
            self.peer_request_timeout,
        )
    }
}

/// Read and parse an environment variable, or use `default` when unset
fn parse_env_or<T>(key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: Error + Send + Sync + 'static,
{
    match env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("Invalid {key} value: {raw}")),
        Err(_) => Ok(default),
    }
}
