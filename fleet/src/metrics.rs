use lazy_static::lazy_static;
use prometheus::{Counter, Encoder, Opts, Registry, TextEncoder};

lazy_static! {
    pub static ref REGISTRY: Registry = Registry::new();
    pub static ref TICKS_TOTAL: Counter = Counter::with_opts(Opts::new(
        "fleet_ticks_total",
        "Total simulator ticks fired"
    ))
    .unwrap();
    pub static ref READINGS_TOTAL: Counter = Counter::with_opts(Opts::new(
        "fleet_readings_total",
        "Total telemetry readings emitted"
    ))
    .unwrap();
    pub static ref CONNECTION_ERRORS_TOTAL: Counter = Counter::with_opts(Opts::new(
        "fleet_connection_errors_total",
        "Total simulated connection errors emitted"
    ))
    .unwrap();
    pub static ref COMMANDS_TOTAL: Counter = Counter::with_opts(Opts::new(
        "fleet_commands_total",
        "Total device commands dispatched"
    ))
    .unwrap();
    pub static ref COMMAND_FAILURES_TOTAL: Counter = Counter::with_opts(Opts::new(
        "fleet_command_failures_total",
        "Total device commands that failed"
    ))
    .unwrap();
}

pub fn init_metrics() {
    REGISTRY.register(Box::new(TICKS_TOTAL.clone())).unwrap();
    REGISTRY.register(Box::new(READINGS_TOTAL.clone())).unwrap();
    REGISTRY
        .register(Box::new(CONNECTION_ERRORS_TOTAL.clone()))
        .unwrap();
    REGISTRY.register(Box::new(COMMANDS_TOTAL.clone())).unwrap();
    REGISTRY
        .register(Box::new(COMMAND_FAILURES_TOTAL.clone()))
        .unwrap();
}

pub fn gather_metrics() -> String {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();
    let mut buffer = Vec::new();
    encoder.encode(&metric_families, &mut buffer).unwrap();
    String::from_utf8(buffer).unwrap()
}
