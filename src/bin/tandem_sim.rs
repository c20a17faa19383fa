// ABOUTME: Tandem simulator running a phone and a watch core linked by the loopback transport
// ABOUTME: Scripts battery drain, backgrounding and link drops, then prints the handoff log and final snapshot
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! Two-device workout simulator.
//!
//! Usage:
//! ```bash
//! # Outdoor run, 90 simulated seconds
//! cargo run --bin tandem-sim
//!
//! # Low phone battery hands tracking to the watch
//! cargo run --bin tandem-sim -- --phone-battery 0.15
//!
//! # Background the phone at 20s, bring it back at 60s
//! cargo run --bin tandem-sim -- --background-at 20 --foreground-at 60
//!
//! # Drop the link between 30s and 50s
//! cargo run --bin tandem-sim -- --drop-link-at 30 --restore-link-at 50
//! ```

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use tandem::config::CoordinatorConfig;
use tandem::coordinator::{CoordinationCore, CoreParts};
use tandem::events::CoordinationEvent;
use tandem::logging::{LogFormat, LoggingConfig};
use tandem::sensors::{SyntheticSensors, SyntheticSignals};
use tandem::sync::DeliveryMode;
use tandem::transport::{LoopbackEndpoint, LoopbackTransport};
use tandem_core::constants::capacity;
use tandem_core::models::{
    Device, DeviceCapabilities, DeviceClass, MetricKind, SessionState, WorkoutCategory,
};
use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;
use tokio::time;
use tracing::{info, warn};
use uuid::Uuid;

#[derive(Parser)]
#[command(
    name = "tandem-sim",
    about = "Tandem two-device workout simulator",
    long_about = "Run a phone and a watch coordination core over an in-memory link and script battery, foreground and link events"
)]
struct SimArgs {
    /// Workout category (running, cycling, hiking, walking, swimming, sports, strength, other)
    #[arg(long, default_value = "running")]
    category: String,

    /// Indoor workout (no satellite signal on the phone)
    #[arg(long)]
    indoor: bool,

    /// Simulated seconds to run
    #[arg(long, default_value = "90")]
    duration: u64,

    /// Athlete speed in meters per second
    #[arg(long, default_value = "3.0")]
    speed: f64,

    /// Initial phone battery as a fraction
    #[arg(long, default_value = "0.9")]
    phone_battery: f64,

    /// Phone battery drained per simulated second
    #[arg(long, default_value = "0.0")]
    battery_drain: f64,

    /// Simulated second at which the phone app goes to the background
    #[arg(long)]
    background_at: Option<u64>,

    /// Simulated second at which the phone app returns to the foreground
    #[arg(long)]
    foreground_at: Option<u64>,

    /// Simulated second at which the link drops
    #[arg(long)]
    drop_link_at: Option<u64>,

    /// Simulated second at which the link comes back
    #[arg(long)]
    restore_link_at: Option<u64>,

    /// Use the configured intervals instead of the accelerated ones
    #[arg(long)]
    realtime: bool,

    /// Enable debug logging
    #[arg(long, short = 'v')]
    verbose: bool,

    /// Emit logs as JSON lines
    #[arg(long)]
    json: bool,
}

struct Unit {
    core: CoordinationCore,
    link: Arc<LoopbackTransport>,
    sensors: Arc<SyntheticSensors>,
    signals: Arc<SyntheticSignals>,
    events: JoinHandle<()>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = SimArgs::parse();

    let level = if args.verbose { "debug" } else { "info" };
    LoggingConfig {
        level: level.into(),
        format: if args.json {
            LogFormat::Json
        } else {
            LogFormat::Compact
        },
        ..LoggingConfig::from_env()
    }
    .init()?;

    let mut config =
        CoordinatorConfig::from_env().context("Failed to load coordinator configuration")?;
    if !args.realtime {
        accelerate(&mut config);
    }
    config.validate()?;

    let category = WorkoutCategory::from_str_or_default(&args.category);
    let phone_device = Device::new(
        "phone",
        DeviceClass::PrimaryUnit,
        "Phone",
        DeviceCapabilities::primary_unit(),
    );
    let watch_device = Device::new(
        "watch",
        DeviceClass::CompanionUnit,
        "Watch",
        DeviceCapabilities::companion_unit(),
    );
    let (phone_end, watch_end) = LoopbackTransport::pair(
        phone_device.id.clone(),
        watch_device.id.clone(),
        capacity::INBOUND_QUEUE,
    );

    let phone = build_unit(
        &config,
        phone_device.clone(),
        watch_device.clone(),
        phone_end,
        SyntheticSignals::new(args.phone_battery, !args.indoor, false),
    )?;
    let watch = build_unit(
        &config,
        watch_device,
        phone_device,
        watch_end,
        SyntheticSignals::new(0.8, false, true),
    )?;
    phone.core.start().await?;
    watch.core.start().await?;

    let session = phone
        .core
        .start_session(category, args.indoor)
        .await
        .context("Failed to start the session")?;
    phone
        .core
        .request_transition(session.id, SessionState::Running)
        .await
        .context("Failed to move the session to running")?;
    info!(session.id = %session.id, category = %category, indoor = args.indoor, "Simulation started");

    let mut ticker = time::interval(config.metrics_sync_interval);
    for second in 0..args.duration {
        ticker.tick().await;
        step_sensors(&phone, &watch, &args, second);
        apply_script(&phone, &args, second).await;
    }

    if let Err(e) = phone
        .core
        .request_transition(session.id, SessionState::Completed)
        .await
    {
        warn!(error = %e, "Session could not be completed from the phone");
    }
    time::sleep(config.metrics_sync_interval).await;

    print_report(&phone, &watch, &args, session.id).await;

    for unit in [&phone, &watch] {
        unit.core.shutdown().await;
        unit.events.abort();
    }
    Ok(())
}

fn accelerate(config: &mut CoordinatorConfig) {
    config.metrics_sync_interval = Duration::from_millis(200);
    config.handoff_interval = Duration::from_millis(1_000);
    config.handoff_cooldown = Duration::from_secs(6);
    config.discovery_interval = Duration::from_millis(1_000);
    config.peer_request_timeout = Duration::from_millis(500);
    config.immediate_send_timeout = Duration::from_millis(250);
    config.breaker.recovery_timeout = Duration::from_secs(3);
}

fn build_unit(
    config: &CoordinatorConfig,
    local: Device,
    peer: Device,
    endpoint: LoopbackEndpoint,
    signals: SyntheticSignals,
) -> Result<Unit> {
    let name = local.name.clone();
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
    .with_context(|| format!("Failed to build the {name} core"))?;
    let events = spawn_event_log(name, &core);
    Ok(Unit {
        core,
        link,
        sensors,
        signals,
        events,
    })
}

fn spawn_event_log(device: String, core: &CoordinationCore) -> JoinHandle<()> {
    let mut events = core.subscribe();
    tokio::spawn(async move {
        loop {
            match events.recv().await {
                Ok(CoordinationEvent::SnapshotChanged(_)) => {}
                Ok(event) => info!(device = %device, ?event, "Coordination event"),
                Err(RecvError::Lagged(skipped)) => {
                    warn!(device = %device, skipped, "Event log fell behind");
                }
                Err(RecvError::Closed) => break,
            }
        }
    })
}

fn step_sensors(phone: &Unit, watch: &Unit, args: &SimArgs, second: u64) {
    let wobble = (second % 20) as f64;

    if !args.indoor {
        phone.sensors.set(MetricKind::Elevation, 40.0 + wobble / 2.0);
    }
    phone.sensors.advance(1.0, args.speed);

    // Wrist distance drifts a little short of the satellite track
    watch.sensors.advance(1.0, args.speed * 0.93);
    watch.sensors.set(MetricKind::HeartRate, 142.0 + wobble);
    watch.sensors.set(MetricKind::Cadence, 168.0 + wobble / 4.0);

    let battery = args.battery_drain.mul_add(-(second as f64), args.phone_battery);
    phone.signals.set_battery_level(battery);
}

async fn apply_script(phone: &Unit, args: &SimArgs, second: u64) {
    let at = Some(second);
    if args.background_at == at {
        info!(second, "Phone app moved to the background");
        phone.signals.set_foreground(false);
    }
    if args.foreground_at == at {
        info!(second, "Phone app returned to the foreground");
        phone.signals.set_foreground(true);
    }
    if args.drop_link_at == at {
        info!(second, "Link dropped");
        phone.link.set_link_up(false).await;
    }
    if args.restore_link_at == at {
        info!(second, "Link restored");
        phone.link.set_link_up(true).await;
    }
}

async fn print_report(phone: &Unit, watch: &Unit, args: &SimArgs, session_id: Uuid) {
    println!();
    println!(
        "== Tandem simulation: {} ({}), {} simulated seconds",
        args.category,
        if args.indoor { "indoor" } else { "outdoor" },
        args.duration
    );
    println!("Primary role (phone view): {}", phone.core.primary_role());
    println!("Primary role (watch view): {}", watch.core.primary_role());

    let log = phone.core.handoff_log().await;
    println!("Handoff log ({} decisions):", log.len());
    for decision in &log {
        println!(
            "  {}  {}  {}",
            decision.decided_at.format("%H:%M:%S%.3f"),
            decision.direction,
            decision.reason
        );
    }

    for (name, unit) in [("phone", phone), ("watch", watch)] {
        let connected: Vec<String> = unit
            .core
            .registry()
            .connected_devices()
            .iter()
            .map(|device| format!("{} ({})", device.name, device.class))
            .collect();
        println!("{name} sees: {}", connected.join(", "));

        let Some(session) = unit.core.session(session_id).await else {
            println!("{name}: no replica of the session");
            continue;
        };
        let reading = |metric, precision: usize| {
            session
                .snapshot
                .value(metric)
                .map_or_else(|| "-".to_owned(), |value| format!("{value:.precision$}"))
        };
        println!(
            "{name}: state {}, distance {} m, elapsed {} s, heart rate {} bpm, calories {} kcal",
            session.state,
            reading(MetricKind::Distance, 1),
            reading(MetricKind::ElapsedTime, 0),
            reading(MetricKind::HeartRate, 0),
            reading(MetricKind::Calories, 1)
        );
    }

    let history = phone.core.sync_history().await;
    let count = |mode| history.iter().filter(|record| record.mode == mode).count();
    println!(
        "Phone sync ticks: {} immediate, {} durable, {} undelivered, {} fallbacks",
        count(DeliveryMode::Immediate),
        count(DeliveryMode::Durable),
        count(DeliveryMode::Undelivered),
        history.iter().filter(|record| record.fell_back).count()
    );
}
