//! Integration tests for the ControlLoop → monitor → controllers pipeline.
//!
//! These run on the host and drive whole cycles through mock sensor,
//! tank, actuator, telemetry and alert adapters.

use std::time::{Duration, Instant};

use smartfarm::app::ports::ReleasePosition;
use smartfarm::app::service::{ControlLoop, Slot};
use smartfarm::config::SystemConfig;
use smartfarm::preset::{KEY_SOIL, KEY_TEMP, PresetBoard, PresetStore};
use smartfarm::safety::{OverflowStatus, SupplyStatus, TankAlertStatus};
use smartfarm::sensors::SensorSnapshot;
use smartfarm::shutdown::Shutdown;

use crate::mock_hw::{
    ActuatorCall, Bench, FixedClock, RecordingAlerts, RecordingTelemetry, ScriptedSensors,
    ScriptedTanks,
};

const NOON: u8 = 12;

struct Rig {
    control: ControlLoop,
    bench: Bench,
    tanks: ScriptedTanks,
    sensors: Vec<ScriptedSensors>,
    presets: PresetBoard,
    telemetry: RecordingTelemetry,
    alerts: RecordingAlerts,
}

impl Rig {
    fn new(config: &SystemConfig, slots: &[ScriptedSensors]) -> Self {
        let bench = Bench::new();
        let tanks = ScriptedTanks::default();
        tanks.set(Some(10.0), Some(false));

        let mut control = ControlLoop::new(config, Box::new(tanks.clone()));
        let presets = PresetBoard::new();
        for (i, sensors) in slots.iter().enumerate() {
            let id = i as u8 + 1;
            let ctl = bench.controller(id, config, config.has_co2());
            control
                .add_slot(Slot::new(&config.device_serial, Box::new(sensors.clone()), ctl))
                .unwrap();
            presets.insert(id, PresetStore::default());
        }

        Self {
            control,
            bench,
            tanks,
            sensors: slots.to_vec(),
            presets,
            telemetry: RecordingTelemetry::default(),
            alerts: RecordingAlerts::default(),
        }
    }

    fn cycle(&mut self) -> anyhow::Result<()> {
        self.cycle_at(Instant::now(), NOON)
    }

    fn cycle_at(&mut self, now: Instant, hour: u8) -> anyhow::Result<()> {
        self.control
            .run_cycle(now, hour, &mut self.telemetry, &self.presets, &mut self.alerts)
    }
}

fn soil(raw: u16) -> SensorSnapshot {
    SensorSnapshot {
        soil_raw: Some(raw),
        ..SensorSnapshot::default()
    }
}

fn quad() -> SystemConfig {
    SystemConfig {
        device_serial: "B4001".into(),
        ..SystemConfig::default()
    }
}

// ── Interlock ordering ────────────────────────────────────────

#[test]
fn overflow_in_the_same_cycle_blocks_every_pump() {
    let slots: Vec<_> = (0..4).map(|_| ScriptedSensors::new(soil(2600))).collect();
    let mut rig = Rig::new(&quad(), &slots);
    rig.tanks.set(Some(10.0), Some(true));

    rig.cycle().unwrap();

    assert!(
        !rig.bench
            .calls()
            .iter()
            .any(|c| matches!(c, ActuatorCall::On { name: "pump", .. })),
        "tank check runs before any slot decides to water"
    );
    assert_eq!(rig.control.monitor().overflow_status(), OverflowStatus::Overflow);
}

#[test]
fn pump_follows_soil_until_interlock_trips() {
    let mut rig = Rig::new(&quad(), &[ScriptedSensors::new(soil(2600))]);

    rig.cycle().unwrap();
    assert!(rig.bench.is_on(1, "pump"));

    rig.tanks.set(Some(10.0), Some(true));
    rig.cycle().unwrap();
    assert!(!rig.bench.is_on(1, "pump"), "overflow overrides dry soil");

    rig.tanks.set(Some(10.0), Some(false));
    rig.cycle().unwrap();
    assert!(rig.bench.is_on(1, "pump"), "resumes once the tray is dry");
}

#[test]
fn lost_tank_reading_keeps_pumps_blocked() {
    let mut rig = Rig::new(&quad(), &[ScriptedSensors::new(soil(2600))]);
    rig.tanks.set(Some(28.0), Some(false));
    rig.cycle().unwrap();
    assert_eq!(rig.control.monitor().supply_status(), SupplyStatus::Critical);

    rig.tanks.set(None, None);
    rig.cycle().unwrap();
    assert!(!rig.bench.is_on(1, "pump"));
    assert_eq!(
        rig.control.monitor().get_status_summary().alert_status,
        TankAlertStatus::Attention
    );
}

// ── Alerts ────────────────────────────────────────────────────

#[test]
fn low_tank_alerts_once_per_cooldown_across_cycles() {
    let mut rig = Rig::new(&quad(), &[ScriptedSensors::default()]);
    rig.tanks.set(Some(26.0), Some(false));

    let t0 = Instant::now();
    for secs in [0, 10, 20, 30] {
        rig.cycle_at(t0 + Duration::from_secs(secs), NOON).unwrap();
    }
    assert_eq!(rig.alerts.messages.len(), 1);
    assert!(rig.alerts.messages[0].starts_with("[WARNING] [supply tank]"));

    rig.cycle_at(t0 + Duration::from_secs(300), NOON).unwrap();
    assert_eq!(rig.alerts.messages.len(), 2);
}

// ── Telemetry ─────────────────────────────────────────────────

#[test]
fn telemetry_carries_only_present_fields() {
    let reading = SensorSnapshot {
        temperature_c: Some(24.5),
        humidity_pct: Some(61.0),
        soil_raw: Some(2100),
        ..SensorSnapshot::default()
    };
    let mut rig = Rig::new(&quad(), &[ScriptedSensors::new(reading), ScriptedSensors::default()]);

    rig.cycle().unwrap();

    assert_eq!(
        rig.telemetry.frames,
        vec![(1, "temp=24.5;humidity=61;soil=2100".to_string())],
        "slot 2 had nothing to report"
    );
}

// ── Presets ───────────────────────────────────────────────────

#[test]
fn live_preset_update_changes_next_cycle() {
    let warm = SensorSnapshot {
        temperature_c: Some(26.0),
        ..SensorSnapshot::default()
    };
    let mut rig = Rig::new(&quad(), &[ScriptedSensors::new(warm)]);

    rig.cycle().unwrap();
    assert!(!rig.bench.is_on(1, "heater"), "26 °C is inside the default band");

    assert!(rig.presets.apply_update(1, &format!("{KEY_TEMP}=30;{KEY_SOIL}=2500")));
    rig.cycle().unwrap();
    assert!(rig.bench.is_on(1, "heater"));
    assert!(!rig.bench.is_on(1, "fan"));
}

// ── Failures ──────────────────────────────────────────────────

#[test]
fn broken_actuator_in_one_slot_does_not_stall_others() {
    let cold = SensorSnapshot {
        temperature_c: Some(18.0),
        ..SensorSnapshot::default()
    };
    let mut rig = Rig::new(&quad(), &[ScriptedSensors::new(cold), ScriptedSensors::new(cold)]);
    rig.bench.break_actuator(1, "heater");

    let err = rig.cycle().unwrap_err();
    assert!(format!("{err:#}").contains("slot 1"));
    assert!(!rig.bench.is_on(1, "heater"));
    assert!(rig.bench.is_on(2, "heater"));
}

#[test]
fn run_survives_a_panicking_cycle_and_stops_everything() {
    let config = SystemConfig {
        device_serial: "A1001".into(),
        control_interval_secs: 1,
        ..SystemConfig::default()
    };
    let shutdown = Shutdown::new();
    let sensors = ScriptedSensors {
        panic_on: Some(1),
        stop_on: Some((2, shutdown.clone())),
        ..ScriptedSensors::new(SensorSnapshot {
            temperature_c: Some(18.0),
            co2_ppm: Some(400),
            ..SensorSnapshot::default()
        })
    };
    let mut rig = Rig::new(&config, &[sensors]);

    rig.control.run(
        &FixedClock::at_hour(NOON),
        &shutdown,
        &mut rig.telemetry,
        &rig.presets,
        &mut rig.alerts,
    );

    assert_eq!(rig.control.cycles(), 2, "second cycle ran after the panic");
    assert!(rig.sensors[0].shut_down.get(), "caches stopped on exit");
    assert!(!rig.bench.is_on(1, "heater"), "stop_all switched the heater off");
    assert_eq!(
        rig.bench.calls().last(),
        Some(&ActuatorCall::Position {
            slot: 1,
            position: ReleasePosition::Idle
        }),
        "CO2 release parked"
    );
}
