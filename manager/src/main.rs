use clap::Parser;
use fleet::events::{Reading, TelemetryEvent};
use fleet::log::{ActivityLog, LogEntry, LogLevel, Rolling};
use fleet::metrics;
use fleet::simulator::{Simulator, SimulatorConfig};
use fleet::store::{DeviceChange, DeviceStore};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast::error::RecvError;
use tracing::{error, info, warn};

const FEED_CAPACITY: usize = 50;

/// Headless console for a simulated IoT device fleet.
#[derive(Debug, Parser)]
#[command(name = "manager")]
struct Args {
    /// Milliseconds between telemetry ticks
    #[arg(long, env = "TICK_MS", default_value_t = 3000)]
    tick_ms: u64,

    /// Milliseconds before the first tick
    #[arg(long, env = "STARTUP_DELAY_MS", default_value_t = 1000)]
    startup_delay_ms: u64,

    /// Percent chance a tick yields a connection error instead of a reading
    #[arg(long, env = "ERROR_PCT", default_value_t = 10)]
    error_pct: u32,

    /// Seconds between fleet stats lines
    #[arg(long, env = "STATS_SECS", default_value_t = 30)]
    stats_secs: u64,

    /// Emit feed lines as JSON
    #[arg(long, env = "JSON_FEED")]
    json: bool,
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    // Initialize logging
    tracing_subscriber::fmt::init();

    info!("Starting IoT fleet manager");
    info!(
        "Tick: {}ms, startup delay: {}ms, error rate: {}%",
        args.tick_ms, args.startup_delay_ms, args.error_pct
    );

    metrics::init_metrics();

    let store = Arc::new(DeviceStore::seeded());
    let (online, offline) = match store.counts() {
        Ok(counts) => counts,
        Err(e) => {
            error!("Failed to read device store: {}", e);
            std::process::exit(1);
        }
    };
    info!(
        "Seeded {} devices ({} online, {} offline)",
        online + offline,
        online,
        offline
    );

    let config = SimulatorConfig {
        startup_delay: Duration::from_millis(args.startup_delay_ms),
        tick_interval: Duration::from_millis(args.tick_ms),
        error_pct: args.error_pct,
        ..SimulatorConfig::default()
    };
    let simulator = Simulator::new(Arc::clone(&store), config);

    let mut events = simulator.subscribe();
    let mut changes = store.subscribe();

    let mut activity = ActivityLog::new();
    let mut feed: Rolling<Reading> = Rolling::new(FEED_CAPACITY);
    activity.append(LogEntry::new(
        "Application Started",
        "System",
        "IoT fleet manager initialized",
        LogLevel::Success,
    ));

    simulator.start();

    let mut stats = tokio::time::interval(Duration::from_secs(args.stats_secs.max(1)));

    loop {
        tokio::select! {
            event = events.recv() => match event {
                Ok(TelemetryEvent::Reading(reading)) => {
                    if args.json {
                        match serde_json::to_string(&reading) {
                            Ok(line) => info!("{}", line),
                            Err(e) => error!("Failed to serialize reading: {}", e),
                        }
                    } else {
                        info!("{}", reading);
                    }
                    activity.append(LogEntry::new(
                        "Telemetry",
                        reading.device_name.as_str(),
                        format!("{}: {}{}", reading.measurement, reading.value, reading.unit),
                        LogLevel::Info,
                    ));
                    feed.push(reading);
                }
                Ok(TelemetryEvent::Error(connection_error)) => {
                    warn!("{}", connection_error);
                    activity.append(LogEntry::new(
                        "Connection Error",
                        connection_error.device_id.as_str(),
                        connection_error.message.clone(),
                        LogLevel::Error,
                    ));
                }
                Err(RecvError::Lagged(missed)) => {
                    warn!("Feed lagging, {} events dropped", missed);
                }
                Err(RecvError::Closed) => {
                    error!("Telemetry feed closed");
                    break;
                }
            },

            change = changes.recv() => match change {
                Ok(DeviceChange::Added { device }) => {
                    activity.append(LogEntry::new(
                        "Device Added",
                        device.name.as_str(),
                        format!("New device created with ID: {}", device.id),
                        LogLevel::Success,
                    ));
                }
                Ok(DeviceChange::Updated { name, fields, .. }) => {
                    let fields = fields
                        .iter()
                        .map(ToString::to_string)
                        .collect::<Vec<_>>()
                        .join(", ");
                    activity.append(LogEntry::new(
                        "Device Updated",
                        name,
                        format!("Fields changed: {}", fields),
                        LogLevel::Info,
                    ));
                }
                Ok(DeviceChange::Removed { name, .. }) => {
                    activity.append(LogEntry::new(
                        "Device Deleted",
                        name,
                        "Device removed from the fleet",
                        LogLevel::Info,
                    ));
                }
                Err(RecvError::Lagged(missed)) => {
                    warn!("Change stream lagging, {} notifications dropped", missed);
                }
                Err(RecvError::Closed) => break,
            },

            _ = stats.tick() => {
                match store.counts() {
                    Ok((online, offline)) => info!(
                        "Fleet: {} online, {} offline | feed {}/{} | log {}/100",
                        online,
                        offline,
                        feed.len(),
                        FEED_CAPACITY,
                        activity.len(),
                    ),
                    Err(e) => error!("Failed to read fleet stats: {}", e),
                }
            },

            _ = tokio::signal::ctrl_c() => {
                info!("Received shutdown signal");
                break;
            }
        }
    }

    simulator.stop();
    activity.append(LogEntry::new(
        "Application Stopped",
        "System",
        "IoT fleet manager shut down",
        LogLevel::Info,
    ));
    info!(
        "Retained {} feed entries, {} log entries",
        feed.len(),
        activity.len()
    );
    info!("Final metrics:\n{}", metrics::gather_metrics());
    info!("Shutting down");
}
