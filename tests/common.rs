// ABOUTME: Shared test utilities and setup functions for integration tests
// ABOUTME: Provides quiet logging, device fixtures and a phone/watch pair linked over loopback
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence
#![allow(
    dead_code,
    clippy::missing_panics_doc,
    clippy::must_use_candidate,
    clippy::expect_used
)]
//! Shared test utilities for `tandem`

use std::env;
use std::future::Future;
use std::sync::{Arc, Once};
use std::time::Duration;

use chrono::{DateTime, Utc};
use tandem::config::CoordinatorConfig;
use tandem::coordinator::{CoordinationCore, CoreParts};
use tandem::registry::DeviceRegistry;
use tandem::sensors::{SyntheticSensors, SyntheticSignals};
use tandem::transport::{LoopbackEndpoint, LoopbackTransport};
use tandem_core::constants::capacity;
use tandem_core::models::{
    Device, DeviceCapabilities, DeviceClass, MetricKind, MetricSnapshot, MetricWithProvenance,
    SessionState,
};
use tokio::time::{sleep, Instant};
use tracing::Level;
use uuid::Uuid;

static INIT_LOGGER: Once = Once::new();

const WAIT_LIMIT: Duration = Duration::from_secs(3);
const POLL: Duration = Duration::from_millis(10);

/// Initialize quiet logging for tests (call once per test process)
pub fn init_test_logging() {
    INIT_LOGGER.call_once(|| {
        let log_level = match env::var("TEST_LOG").as_deref() {
            Ok("TRACE") => Level::TRACE,
            Ok("DEBUG") => Level::DEBUG,
            Ok("INFO") => Level::INFO,
            _ => Level::WARN,
        };

        tracing_subscriber::fmt()
            .with_max_level(log_level)
            .with_test_writer()
            .init();
    });
}

pub fn phone_device() -> Device {
    Device::new(
        "phone",
        DeviceClass::PrimaryUnit,
        "Phone",
        DeviceCapabilities::primary_unit(),
    )
}

pub fn watch_device() -> Device {
    Device::new(
        "watch",
        DeviceClass::CompanionUnit,
        "Watch",
        DeviceCapabilities::companion_unit(),
    )
}

pub fn strap_device(id: &str) -> Device {
    Device::new(
        id,
        DeviceClass::ExternalWearable,
        "Chest strap",
        DeviceCapabilities::heart_rate_strap(),
    )
}

/// Registry with the given devices registered and connected
pub fn live_registry(devices: Vec<Device>) -> Arc<DeviceRegistry> {
    let registry = Arc::new(DeviceRegistry::new());
    for device in devices {
        let id = device.id.clone();
        registry.register(device).expect("register device");
        registry.set_connectivity(&id, true).expect("connect device");
    }
    registry
}

/// Sample from `class` carrying one metric value, captured at `at`
pub fn sample(
    class: DeviceClass,
    metric: MetricKind,
    value: f64,
    at: DateTime<Utc>,
) -> MetricWithProvenance {
    MetricWithProvenance::new(MetricSnapshot::empty_at(at).with_value(metric, value), class)
}

/// Configuration whose periodic tasks never fire during a test
///
/// Tests drive ticks explicitly through the core's public API.
pub fn manual_config() -> CoordinatorConfig {
    CoordinatorConfig {
        metrics_sync_interval: Duration::from_secs(3_600),
        handoff_interval: Duration::from_secs(3_600),
        discovery_interval: Duration::from_secs(3_600),
        peer_request_timeout: Duration::from_millis(500),
        immediate_send_timeout: Duration::from_millis(500),
        ..CoordinatorConfig::default()
    }
}

/// One side of a linked pair
pub struct TestUnit {
    pub core: CoordinationCore,
    pub link: Arc<LoopbackTransport>,
    pub sensors: Arc<SyntheticSensors>,
    pub signals: Arc<SyntheticSignals>,
}

/// Phone and watch cores linked over an in-memory transport
pub struct TestPair {
    pub phone: TestUnit,
    pub watch: TestUnit,
}

impl TestPair {
    pub async fn shutdown(&self) {
        self.phone.core.shutdown().await;
        self.watch.core.shutdown().await;
    }
}

fn build_unit(
    config: &CoordinatorConfig,
    local: Device,
    peer: Device,
    endpoint: LoopbackEndpoint,
    signals: SyntheticSignals,
) -> TestUnit {
    let sensors = Arc::new(SyntheticSensors::new());
    let signals = Arc::new(signals);
    let link = Arc::clone(&endpoint.transport);
    let core = CoordinationCore::new(
        config.clone(),
        CoreParts {
            local,
            peer,
            transport: endpoint.transport,
            inbound: endpoint.inbound,
            sensors: sensors.clone(),
            signals: signals.clone(),
        },
    )
    .expect("build coordination core");
    TestUnit {
        core,
        link,
        sensors,
        signals,
    }
}

/// Build and start a phone/watch pair with the given environment signals
pub async fn start_pair(
    config: CoordinatorConfig,
    phone_signals: SyntheticSignals,
    watch_signals: SyntheticSignals,
) -> TestPair {
    init_test_logging();
    let (phone_end, watch_end) = LoopbackTransport::pair(
        phone_device().id,
        watch_device().id,
        capacity::INBOUND_QUEUE,
    );
    let phone = build_unit(
        &config,
        phone_device(),
        watch_device(),
        phone_end,
        phone_signals,
    );
    let watch = build_unit(
        &config,
        watch_device(),
        phone_device(),
        watch_end,
        watch_signals,
    );
    phone.core.start().await.expect("start phone core");
    watch.core.start().await.expect("start watch core");
    TestPair { phone, watch }
}

/// Healthy phone: charged, in the foreground, good satellite signal
pub fn healthy_phone() -> SyntheticSignals {
    SyntheticSignals::new(0.9, true, false)
}

/// Healthy watch: charged, heart rate sensor on the wrist
pub fn healthy_watch() -> SyntheticSignals {
    SyntheticSignals::new(0.8, false, true)
}

/// Poll `check` until it holds or the wait limit passes
pub async fn eventually<F, Fut>(mut check: F) -> bool
where
    F: FnMut() -> Fut,
    Fut: Future<Output = bool>,
{
    let deadline = Instant::now() + WAIT_LIMIT;
    loop {
        if check().await {
            return true;
        }
        if Instant::now() >= deadline {
            return false;
        }
        sleep(POLL).await;
    }
}

/// Wait until `core` holds session `session_id` in `state`
pub async fn wait_for_state(
    core: &CoordinationCore,
    session_id: Uuid,
    state: SessionState,
) -> bool {
    eventually(move || async move {
        core.session(session_id)
            .await
            .is_some_and(|session| session.state == state)
    })
    .await
}
