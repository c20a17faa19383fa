// ABOUTME: Circuit breaker guarding immediate-mode delivery to the peer
// ABOUTME: Routes straight to durable delivery after repeated failures until recovery is probed
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};
use std::time::{Duration, Instant};

use tandem_core::constants::thresholds::{
    BREAKER_FAILURE_THRESHOLD, BREAKER_RECOVERY_MS, BREAKER_SUCCESS_THRESHOLD,
};
use tracing::{info, warn};

/// Breaker states
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BreakerState {
    /// Immediate delivery is attempted
    Closed,
    /// Immediate delivery is skipped
    Open,
    /// Immediate delivery is probed one send at a time
    HalfOpen,
}

impl BreakerState {
    const fn from_u32(value: u32) -> Self {
        match value {
            0 => Self::Closed,
            1 => Self::Open,
            _ => Self::HalfOpen,
        }
    }

    const fn to_u32(self) -> u32 {
        match self {
            Self::Closed => 0,
            Self::Open => 1,
            Self::HalfOpen => 2,
        }
    }
}

/// Thresholds for the delivery breaker
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeliveryBreakerConfig {
    /// Consecutive immediate failures before opening
    pub failure_threshold: u32,
    /// Time spent open before immediate delivery is probed again
    pub recovery_timeout: Duration,
    /// Successful probes needed to close again
    pub success_threshold: u32,
}

impl Default for DeliveryBreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: BREAKER_FAILURE_THRESHOLD,
            recovery_timeout: Duration::from_millis(BREAKER_RECOVERY_MS),
            success_threshold: BREAKER_SUCCESS_THRESHOLD,
        }
    }
}

/// Lock-free breaker over immediate-mode sends to one peer
pub struct DeliveryBreaker {
    peer: String,
    state: AtomicU32,
    failure_count: AtomicU32,
    success_count: AtomicU32,
    probe_in_flight: AtomicBool,
    /// Millis since `start_instant` when the breaker last opened
    opened_at: AtomicU64,
    config: DeliveryBreakerConfig,
    start_instant: Instant,
}

impl DeliveryBreaker {
    /// Closed breaker for `peer`
    #[must_use]
    pub fn new(peer: &str, config: DeliveryBreakerConfig) -> Self {
        Self {
            peer: peer.to_owned(),
            state: AtomicU32::new(BreakerState::Closed.to_u32()),
            failure_count: AtomicU32::new(0),
            success_count: AtomicU32::new(0),
            probe_in_flight: AtomicBool::new(false),
            opened_at: AtomicU64::new(0),
            config,
            start_instant: Instant::now(),
        }
    }

    /// Current state
    #[must_use]
    pub fn state(&self) -> BreakerState {
        BreakerState::from_u32(self.state.load(Ordering::SeqCst))
    }

    /// Consecutive failures counted while closed
    #[must_use]
    pub fn failure_count(&self) -> u32 {
        self.failure_count.load(Ordering::SeqCst)
    }

    /// Whether the next send may try immediate delivery
    ///
    /// A `true` answer outside the closed state claims the probe slot; the
    /// caller must report the send through `record_success` or
    /// `record_failure`.
    #[must_use]
    pub fn allows_immediate(&self) -> bool {
        match self.state() {
            BreakerState::Closed => true,
            BreakerState::Open => self.try_half_open(),
            BreakerState::HalfOpen => self.claim_probe(),
        }
    }

    fn claim_probe(&self) -> bool {
        self.probe_in_flight
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
    }

    fn try_half_open(&self) -> bool {
        #[allow(clippy::cast_possible_truncation)]
        let recovery_ms = self.config.recovery_timeout.as_millis() as u64;
        let opened_at = self.opened_at.load(Ordering::SeqCst);
        if self.elapsed_millis().saturating_sub(opened_at) < recovery_ms {
            return false;
        }
        let moved = self
            .state
            .compare_exchange(
                BreakerState::Open.to_u32(),
                BreakerState::HalfOpen.to_u32(),
                Ordering::SeqCst,
                Ordering::SeqCst,
            )
            .is_ok();
        if !moved {
            return false;
        }
        info!(peer = %self.peer, "Delivery breaker half-open, probing immediate delivery");
        self.claim_probe()
    }

    fn elapsed_millis(&self) -> u64 {
        #[allow(clippy::cast_possible_truncation)]
        {
            self.start_instant.elapsed().as_millis() as u64
        }
    }

    /// Record a delivered immediate send
    pub fn record_success(&self) {
        self.probe_in_flight.store(false, Ordering::SeqCst);
        match self.state() {
            BreakerState::Closed => self.failure_count.store(0, Ordering::SeqCst),
            BreakerState::HalfOpen => {
                let count = self.success_count.fetch_add(1, Ordering::SeqCst) + 1;
                if count >= self.config.success_threshold {
                    self.state
                        .store(BreakerState::Closed.to_u32(), Ordering::SeqCst);
                    self.failure_count.store(0, Ordering::SeqCst);
                    self.success_count.store(0, Ordering::SeqCst);
                    info!(peer = %self.peer, "Delivery breaker closed, immediate delivery restored");
                }
            }
            BreakerState::Open => {}
        }
    }

    /// Record a failed immediate send
    pub fn record_failure(&self) {
        self.probe_in_flight.store(false, Ordering::SeqCst);
        match self.state() {
            BreakerState::Closed => {
                let count = self.failure_count.fetch_add(1, Ordering::SeqCst) + 1;
                if count >= self.config.failure_threshold {
                    self.open();
                    warn!(
                        peer = %self.peer,
                        failures = count,
                        "Delivery breaker opened, routing metrics to durable delivery"
                    );
                }
            }
            BreakerState::HalfOpen => {
                self.open();
                self.success_count.store(0, Ordering::SeqCst);
                warn!(peer = %self.peer, "Immediate delivery probe failed, breaker re-opened");
            }
            BreakerState::Open => {}
        }
    }

    fn open(&self) {
        self.opened_at
            .store(self.elapsed_millis(), Ordering::SeqCst);
        self.state
            .store(BreakerState::Open.to_u32(), Ordering::SeqCst);
    }

    /// Close the breaker, e.g. after the peer reconnected
    pub fn reset(&self) {
        self.state
            .store(BreakerState::Closed.to_u32(), Ordering::SeqCst);
        self.failure_count.store(0, Ordering::SeqCst);
        self.success_count.store(0, Ordering::SeqCst);
        self.probe_in_flight.store(false, Ordering::SeqCst);
    }
}
