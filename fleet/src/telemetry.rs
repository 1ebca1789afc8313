use crate::model::DeviceKind;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Kind of measurement a device reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Measurement {
    Temperature,
    Humidity,
    Pressure,
    Vibration,
    Status,
    Position,
    Speed,
    Throughput,
    Output,
    Setpoint,
    Level,
    Count,
}

const GENERIC_SENSOR: [Measurement; 4] = [
    Measurement::Temperature,
    Measurement::Humidity,
    Measurement::Pressure,
    Measurement::Vibration,
];
const ACTUATOR: [Measurement; 3] = [
    Measurement::Status,
    Measurement::Position,
    Measurement::Speed,
];
const GATEWAY: [Measurement; 2] = [Measurement::Status, Measurement::Throughput];
const CONTROLLER: [Measurement; 3] = [
    Measurement::Status,
    Measurement::Output,
    Measurement::Setpoint,
];
const MONITOR: [Measurement; 3] = [
    Measurement::Status,
    Measurement::Level,
    Measurement::Count,
];
const FALLBACK: [Measurement; 5] = [
    Measurement::Temperature,
    Measurement::Humidity,
    Measurement::Pressure,
    Measurement::Vibration,
    Measurement::Status,
];

impl Measurement {
    pub fn unit(&self) -> &'static str {
        match self {
            Self::Temperature => "°C",
            Self::Humidity
            | Self::Status
            | Self::Position
            | Self::Output
            | Self::Level => "%",
            Self::Pressure => "kPa",
            Self::Vibration => "Hz",
            Self::Speed => "RPM",
            Self::Throughput => "Mbps",
            Self::Setpoint | Self::Count => "",
        }
    }
}

impl fmt::Display for Measurement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Temperature => "Temperature",
            Self::Humidity => "Humidity",
            Self::Pressure => "Pressure",
            Self::Vibration => "Vibration",
            Self::Status => "Status",
            Self::Position => "Position",
            Self::Speed => "Speed",
            Self::Throughput => "Throughput",
            Self::Output => "Output",
            Self::Setpoint => "Setpoint",
            Self::Level => "Level",
            Self::Count => "Count",
        };
        f.write_str(label)
    }
}

/// Picks the measurement a device reports from its kind and name.
/// Name checks are first-match-wins; the order is load-bearing.
pub fn classify(kind: DeviceKind, name: &str, rng: &mut impl Rng) -> Measurement {
    let name = name.to_lowercase();
    match kind {
        DeviceKind::Sensor => {
            if name == "temperature" || name.contains("temp") {
                Measurement::Temperature
            } else if name == "humidity" || name.contains("humid") {
                Measurement::Humidity
            } else if name.contains("pr") || name.contains("press") {
                Measurement::Pressure
            } else {
                pick(&GENERIC_SENSOR, rng)
            }
        }
        DeviceKind::Actuator => pick(&ACTUATOR, rng),
        DeviceKind::Gateway => pick(&GATEWAY, rng),
        DeviceKind::Controller => pick(&CONTROLLER, rng),
        DeviceKind::Monitor => pick(&MONITOR, rng),
        DeviceKind::Other => pick(&FALLBACK, rng),
    }
}

fn pick(pool: &[Measurement], rng: &mut impl Rng) -> Measurement {
    pool[rng.gen_range(0..pool.len())]
}

/// Manufactures a plausible value for a measurement.
pub fn sample_value(measurement: Measurement, rng: &mut impl Rng) -> f64 {
    match measurement {
        Measurement::Temperature => round2(rng.gen_range(15.0..=65.0)),
        Measurement::Humidity => round2(rng.gen_range(30.0..=90.0)),
        Measurement::Pressure => round2(rng.gen_range(95.0..=125.0)),
        Measurement::Vibration
        | Measurement::Status
        | Measurement::Position
        | Measurement::Output
        | Measurement::Setpoint
        | Measurement::Level => round2(rng.gen_range(0.0..=100.0)),
        Measurement::Speed => rng.gen_range(0.0..=3000.0_f64).round(),
        Measurement::Throughput => round2(rng.gen_range(0.0..=1000.0)),
        Measurement::Count => rng.gen_range(0..1000) as f64,
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::thread_rng;

    #[test]
    fn test_sensor_names_pin_the_measurement() {
        let mut rng = thread_rng();
        for _ in 0..50 {
            assert_eq!(
                classify(DeviceKind::Sensor, "Temperature", &mut rng),
                Measurement::Temperature
            );
            assert_eq!(
                classify(DeviceKind::Sensor, "outdoor temp unit", &mut rng),
                Measurement::Temperature
            );
            assert_eq!(
                classify(DeviceKind::Sensor, "Humidity", &mut rng),
                Measurement::Humidity
            );
            assert_eq!(
                classify(DeviceKind::Sensor, "humid bay", &mut rng),
                Measurement::Humidity
            );
            assert_eq!(
                classify(DeviceKind::Sensor, "Pr Sensor", &mut rng),
                Measurement::Pressure
            );
            assert_eq!(
                classify(DeviceKind::Sensor, "line press gauge", &mut rng),
                Measurement::Pressure
            );
        }
    }

    #[test]
    fn test_name_match_order_is_first_wins() {
        let mut rng = thread_rng();
        for _ in 0..50 {
            // Contains both "temp" and "pr"; the temperature check runs first.
            assert_eq!(
                classify(DeviceKind::Sensor, "temp-pressure combo", &mut rng),
                Measurement::Temperature
            );
            // "probe" contains "pr", but "humid" matched earlier.
            assert_eq!(
                classify(DeviceKind::Sensor, "humid probe", &mut rng),
                Measurement::Humidity
            );
        }
    }

    #[test]
    fn test_name_rules_only_apply_to_sensors() {
        let mut rng = thread_rng();
        for _ in 0..100 {
            let m = classify(DeviceKind::Actuator, "temp drive", &mut rng);
            assert!(matches!(
                m,
                Measurement::Status | Measurement::Position | Measurement::Speed
            ));
        }
    }

    #[test]
    fn test_kind_pools_are_respected() {
        let mut rng = thread_rng();
        for _ in 0..200 {
            assert!(matches!(
                classify(DeviceKind::Sensor, "dust", &mut rng),
                Measurement::Temperature
                    | Measurement::Humidity
                    | Measurement::Pressure
                    | Measurement::Vibration
            ));
            assert!(matches!(
                classify(DeviceKind::Gateway, "edge", &mut rng),
                Measurement::Status | Measurement::Throughput
            ));
            assert!(matches!(
                classify(DeviceKind::Controller, "loop", &mut rng),
                Measurement::Status | Measurement::Output | Measurement::Setpoint
            ));
            assert!(matches!(
                classify(DeviceKind::Monitor, "tank", &mut rng),
                Measurement::Status | Measurement::Level | Measurement::Count
            ));
            assert!(matches!(
                classify(DeviceKind::Other, "box", &mut rng),
                Measurement::Temperature
                    | Measurement::Humidity
                    | Measurement::Pressure
                    | Measurement::Vibration
                    | Measurement::Status
            ));
        }
    }

    #[test]
    fn test_values_stay_in_range_over_many_draws() {
        let mut rng = thread_rng();
        for _ in 0..10_000 {
            assert!((15.0..=65.0)
                .contains(&sample_value(Measurement::Temperature, &mut rng)));
            assert!((30.0..=90.0)
                .contains(&sample_value(Measurement::Humidity, &mut rng)));
            assert!((95.0..=125.0)
                .contains(&sample_value(Measurement::Pressure, &mut rng)));
            assert!((0.0..=100.0)
                .contains(&sample_value(Measurement::Vibration, &mut rng)));
            assert!((0.0..=100.0)
                .contains(&sample_value(Measurement::Status, &mut rng)));
            assert!((0.0..=100.0)
                .contains(&sample_value(Measurement::Setpoint, &mut rng)));
            assert!((0.0..=1000.0)
                .contains(&sample_value(Measurement::Throughput, &mut rng)));

            let speed = sample_value(Measurement::Speed, &mut rng);
            assert!((0.0..=3000.0).contains(&speed));
            assert_eq!(speed.fract(), 0.0);

            let count = sample_value(Measurement::Count, &mut rng);
            assert!((0.0..=999.0).contains(&count));
            assert_eq!(count.fract(), 0.0);
        }
    }

    #[test]
    fn test_values_round_to_two_decimals() {
        let mut rng = thread_rng();
        for _ in 0..1_000 {
            let v = sample_value(Measurement::Humidity, &mut rng);
            let cents = v * 100.0;
            assert!((cents - cents.round()).abs() < 1e-6);
        }
    }

    #[test]
    fn test_units_follow_the_measurement() {
        assert_eq!(Measurement::Temperature.unit(), "°C");
        assert_eq!(Measurement::Humidity.unit(), "%");
        assert_eq!(Measurement::Status.unit(), "%");
        assert_eq!(Measurement::Position.unit(), "%");
        assert_eq!(Measurement::Output.unit(), "%");
        assert_eq!(Measurement::Level.unit(), "%");
        assert_eq!(Measurement::Pressure.unit(), "kPa");
        assert_eq!(Measurement::Vibration.unit(), "Hz");
        assert_eq!(Measurement::Speed.unit(), "RPM");
        assert_eq!(Measurement::Throughput.unit(), "Mbps");
        assert_eq!(Measurement::Setpoint.unit(), "");
        assert_eq!(Measurement::Count.unit(), "");
    }
}
