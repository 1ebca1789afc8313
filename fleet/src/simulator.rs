use crate::errors::Result;
use crate::events::{ConnectionError, Reading, TelemetryEvent};
use crate::metrics::{
    COMMANDS_TOTAL, COMMAND_FAILURES_TOTAL, CONNECTION_ERRORS_TOTAL, READINGS_TOTAL, TICKS_TOTAL,
};
use crate::store::DeviceStore;
use crate::telemetry;
use chrono::Utc;
use rand::Rng;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio::time::{interval, sleep};
use tracing::{debug, info, warn};

const EVENT_CHANNEL_CAPACITY: usize = 256;
const TIMEOUT_MESSAGE: &str = "Connection timeout - device not responding";

#[derive(Debug, Clone)]
pub struct SimulatorConfig {
    pub startup_delay: Duration,
    pub tick_interval: Duration,
    /// Percent chance in [0,100) that a tick yields a connection error
    /// instead of a reading.
    pub error_pct: u32,
    pub command_latency: Duration,
    pub command_failure_pct: u32,
}

impl Default for SimulatorConfig {
    fn default() -> Self {
        Self {
            startup_delay: Duration::from_secs(1),
            tick_interval: Duration::from_secs(3),
            error_pct: 10,
            command_latency: Duration::from_millis(500),
            command_failure_pct: 15,
        }
    }
}

/// Periodic telemetry feed over a shared device store. Stopped until
/// `start()`; every tick publishes at most one event to the broadcast
/// stream.
pub struct Simulator {
    store: Arc<DeviceStore>,
    config: SimulatorConfig,
    events: broadcast::Sender<TelemetryEvent>,
    task: Mutex<Option<JoinHandle<()>>>,
    running: Arc<AtomicBool>,
    // Serializes tick bodies; stop() acquires it to drain an in-flight
    // tick before returning.
    tick_gate: Arc<Mutex<()>>,
}

impl Simulator {
    pub fn new(store: Arc<DeviceStore>, config: SimulatorConfig) -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            store,
            config,
            events,
            task: Mutex::new(None),
            running: Arc::new(AtomicBool::new(false)),
            tick_gate: Arc::new(Mutex::new(())),
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<TelemetryEvent> {
        self.events.subscribe()
    }

    pub fn is_running(&self) -> bool {
        lock(&self.task)
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }

    /// Begins the periodic feed; no-op when already running.
    pub fn start(&self) {
        let mut task = lock(&self.task);
        if task.as_ref().is_some_and(|handle| !handle.is_finished()) {
            debug!("simulator already running");
            return;
        }

        info!(
            tick = ?self.config.tick_interval,
            startup_delay = ?self.config.startup_delay,
            "starting telemetry simulator"
        );
        self.running.store(true, Ordering::SeqCst);

        let store = Arc::clone(&self.store);
        let events = self.events.clone();
        let gate = Arc::clone(&self.tick_gate);
        let running = Arc::clone(&self.running);
        let config = self.config.clone();

        *task = Some(tokio::spawn(async move {
            sleep(config.startup_delay).await;
            let mut ticker = interval(config.tick_interval);
            loop {
                ticker.tick().await;
                run_tick(&gate, &running, &store, &events, config.error_pct);
            }
        }));
    }

    /// Cancels the periodic feed. Idempotent; once this returns, no
    /// further event is published.
    pub fn stop(&self) {
        let handle = lock(&self.task).take();
        let Some(handle) = handle else {
            return;
        };

        handle.abort();
        self.running.store(false, Ordering::SeqCst);
        // Wait out a tick body already past its gate check.
        drop(lock(&self.tick_gate));
        info!("telemetry simulator stopped");
    }

    /// Simulated command dispatch: fixed latency, occasional failure. A
    /// failure also lands on the event stream so subscribers can log it.
    pub async fn send_command(&self, device_id: &str, command: &str) -> bool {
        COMMANDS_TOTAL.inc();
        sleep(self.config.command_latency).await;

        if rand::thread_rng().gen_range(0..100u32) < self.config.command_failure_pct {
            COMMAND_FAILURES_TOTAL.inc();
            warn!(device_id, command, "command send failed");
            let _ = self.events.send(TelemetryEvent::Error(ConnectionError {
                device_id: device_id.to_string(),
                message: format!(
                    "Failed to send command '{}' - device unreachable",
                    command
                ),
                timestamp: Utc::now(),
            }));
            return false;
        }

        debug!(device_id, command, "command sent");
        true
    }
}

impl Drop for Simulator {
    fn drop(&mut self) {
        self.stop();
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

fn run_tick(
    gate: &Mutex<()>,
    running: &AtomicBool,
    store: &DeviceStore,
    events: &broadcast::Sender<TelemetryEvent>,
    error_pct: u32,
) {
    let _slot = lock(gate);
    if !running.load(Ordering::SeqCst) {
        return;
    }
    TICKS_TOTAL.inc();

    if let Some(event) = tick_event(store, &mut rand::thread_rng(), error_pct) {
        match &event {
            TelemetryEvent::Reading(reading) => {
                READINGS_TOTAL.inc();
                debug!(
                    device = %reading.device_name,
                    measurement = %reading.measurement,
                    value = reading.value,
                    "reading emitted"
                );
            }
            TelemetryEvent::Error(error) => {
                CONNECTION_ERRORS_TOTAL.inc();
                debug!(device_id = %error.device_id, "connection error emitted");
            }
        }
        // No subscribers is fine.
        let _ = events.send(event);
    }
}

/// One tick's event, with any internal fault downgraded to a connection
/// error so the schedule is never broken.
fn tick_event(
    store: &DeviceStore,
    rng: &mut impl Rng,
    error_pct: u32,
) -> Option<TelemetryEvent> {
    match poll_fleet(store, rng, error_pct) {
        Ok(event) => event,
        Err(fault) => {
            warn!("tick failed: {}", fault);
            Some(TelemetryEvent::Error(ConnectionError {
                device_id: "UNKNOWN".to_string(),
                message: format!("Communication error: {}", fault),
                timestamp: Utc::now(),
            }))
        }
    }
}

/// Picks an online device and manufactures either a reading or a
/// simulated connection failure. `None` when nothing is online.
fn poll_fleet(
    store: &DeviceStore,
    rng: &mut impl Rng,
    error_pct: u32,
) -> Result<Option<TelemetryEvent>> {
    let online = store.online_devices()?;
    if online.is_empty() {
        return Ok(None);
    }
    let device = &online[rng.gen_range(0..online.len())];

    if rng.gen_range(0..100u32) < error_pct {
        return Ok(Some(TelemetryEvent::Error(ConnectionError {
            device_id: device.id.clone(),
            message: TIMEOUT_MESSAGE.to_string(),
            timestamp: Utc::now(),
        })));
    }

    let measurement = telemetry::classify(device.kind, &device.name, rng);
    let value = telemetry::sample_value(measurement, rng);
    Ok(Some(TelemetryEvent::Reading(Reading {
        device_id: device.id.clone(),
        device_name: device.name.clone(),
        measurement,
        value,
        unit: measurement.unit().to_string(),
        timestamp: Utc::now(),
    })))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{DeviceDraft, DeviceKind};
    use crate::telemetry::Measurement;
    use rand::thread_rng;

    fn draft(name: &str, kind: DeviceKind, online: bool) -> DeviceDraft {
        DeviceDraft {
            name: name.to_string(),
            kind,
            ip_address: "10.0.0.1".to_string(),
            online,
            firmware_version: "v1.0.0".to_string(),
            units: "°C".to_string(),
            location: "Lab".to_string(),
        }
    }

    #[test]
    fn test_config_defaults_match_the_contract() {
        let config = SimulatorConfig::default();
        assert_eq!(config.startup_delay, Duration::from_secs(1));
        assert_eq!(config.tick_interval, Duration::from_secs(3));
        assert_eq!(config.error_pct, 10);
        assert_eq!(config.command_latency, Duration::from_millis(500));
        assert_eq!(config.command_failure_pct, 15);
    }

    #[test]
    fn test_empty_or_offline_fleet_yields_no_event() {
        let store = DeviceStore::new();
        let mut rng = thread_rng();
        assert!(poll_fleet(&store, &mut rng, 10).unwrap().is_none());

        store
            .add(draft("dark probe", DeviceKind::Sensor, false))
            .unwrap();
        assert!(poll_fleet(&store, &mut rng, 10).unwrap().is_none());
    }

    #[test]
    fn test_tick_yields_exactly_one_event_for_online_fleet() {
        let store = DeviceStore::new();
        store
            .add(draft("Temperature", DeviceKind::Sensor, true))
            .unwrap();
        let mut rng = thread_rng();

        for _ in 0..500 {
            let event = poll_fleet(&store, &mut rng, 10).unwrap();
            assert!(event.is_some());
        }
    }

    #[test]
    fn test_error_probability_extremes() {
        let store = DeviceStore::new();
        store
            .add(draft("Temperature", DeviceKind::Sensor, true))
            .unwrap();
        let mut rng = thread_rng();

        for _ in 0..200 {
            match poll_fleet(&store, &mut rng, 0).unwrap() {
                Some(TelemetryEvent::Reading(_)) => {}
                other => panic!("expected a reading, got {:?}", other),
            }
            match poll_fleet(&store, &mut rng, 100).unwrap() {
                Some(TelemetryEvent::Error(error)) => {
                    assert_eq!(error.message, TIMEOUT_MESSAGE);
                    assert_ne!(error.device_id, "UNKNOWN");
                }
                other => panic!("expected an error, got {:?}", other),
            }
        }
    }

    #[test]
    fn test_error_rate_is_plausible() {
        let store = DeviceStore::new();
        store
            .add(draft("Temperature", DeviceKind::Sensor, true))
            .unwrap();
        let mut rng = thread_rng();

        let mut errors = 0;
        for _ in 0..10_000 {
            if let Some(TelemetryEvent::Error(_)) =
                poll_fleet(&store, &mut rng, 10).unwrap()
            {
                errors += 1;
            }
        }
        // 10% nominal; 10k draws keeps the bound tight.
        assert!(
            (800..=1200).contains(&errors),
            "error count {} outside tolerance",
            errors
        );
    }

    #[test]
    fn test_named_sensor_pins_reading_kind_and_unit() {
        let store = DeviceStore::new();
        store
            .add(draft("Temperature", DeviceKind::Sensor, true))
            .unwrap();
        let mut rng = thread_rng();

        for _ in 0..100 {
            match poll_fleet(&store, &mut rng, 0).unwrap() {
                Some(TelemetryEvent::Reading(reading)) => {
                    assert_eq!(reading.measurement, Measurement::Temperature);
                    assert_eq!(reading.unit, "°C");
                    assert!((15.0..=65.0).contains(&reading.value));
                    assert_eq!(reading.device_name, "Temperature");
                }
                other => panic!("expected a reading, got {:?}", other),
            }
        }
    }

    #[test]
    fn test_tick_faults_downgrade_to_unknown_errors() {
        let store = DeviceStore::new();
        store.poison();
        let mut rng = thread_rng();

        match tick_event(&store, &mut rng, 10) {
            Some(TelemetryEvent::Error(error)) => {
                assert_eq!(error.device_id, "UNKNOWN");
                assert!(error.message.starts_with("Communication error:"));
            }
            other => panic!("expected a downgraded error, got {:?}", other),
        }
    }

    #[test]
    fn test_failed_command_lands_on_the_feed() {
        tokio_test::block_on(async {
            let store = Arc::new(DeviceStore::new());
            let simulator = Simulator::new(
                store,
                SimulatorConfig {
                    command_latency: Duration::from_millis(1),
                    command_failure_pct: 100,
                    ..SimulatorConfig::default()
                },
            );
            let mut events = simulator.subscribe();

            assert!(!simulator.send_command("dev-9", "reboot").await);
            match events.try_recv().unwrap() {
                TelemetryEvent::Error(error) => {
                    assert_eq!(error.device_id, "dev-9");
                    assert!(error.message.contains("'reboot'"));
                }
                other => panic!("unexpected event: {:?}", other),
            }
        });
    }

    #[test]
    fn test_command_success_emits_no_event() {
        tokio_test::block_on(async {
            let store = Arc::new(DeviceStore::new());
            let simulator = Simulator::new(
                store,
                SimulatorConfig {
                    command_latency: Duration::from_millis(1),
                    command_failure_pct: 0,
                    ..SimulatorConfig::default()
                },
            );
            let mut events = simulator.subscribe();

            assert!(simulator.send_command("dev-1", "ping").await);
            assert!(events.try_recv().is_err());
        });
    }
}
