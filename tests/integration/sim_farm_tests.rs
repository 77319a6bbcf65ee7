//! End-to-end cycles against the simulated farm: real caches, real pin
//! drivers, simulated plant.

use std::thread;
use std::time::{Duration, Instant};

use smartfarm::adapters::hardware::SimulatedFarm;
use smartfarm::config::{Co2Config, SystemConfig};
use smartfarm::preset::PresetBoard;

use crate::mock_hw::{RecordingAlerts, RecordingTelemetry};

fn fast_config(serial: &str) -> SystemConfig {
    SystemConfig {
        device_serial: serial.into(),
        cache_poll_interval_ms: 2,
        co2: Co2Config {
            servo_settle_ms: 0,
            ..Co2Config::default()
        },
        ..SystemConfig::default()
    }
}

#[test]
fn every_slot_reports_inline_channels_on_first_cycle() {
    let cfg = fast_config("B4010");
    let mut farm = SimulatedFarm::new(&cfg);
    let mut control = farm.build_loop(&cfg).unwrap();
    let mut telemetry = RecordingTelemetry::default();
    let mut alerts = RecordingAlerts::default();

    control
        .run_cycle(Instant::now(), 12, &mut telemetry, &PresetBoard::new(), &mut alerts)
        .unwrap();

    let slots: Vec<_> = telemetry.frames.iter().map(|(s, _)| *s).collect();
    assert_eq!(slots, vec![1, 2, 3, 4]);
    assert!(telemetry.frames.iter().all(|(_, p)| p.contains("measuredLight=") && p.contains("soil=")));
    control.shutdown_all();
}

#[test]
fn climate_cache_fills_in_the_background() {
    let cfg = fast_config("B1010");
    let mut farm = SimulatedFarm::new(&cfg);
    let mut control = farm.build_loop(&cfg).unwrap();
    let presets = PresetBoard::new();
    let mut alerts = RecordingAlerts::default();

    let deadline = Instant::now() + Duration::from_secs(5);
    let mut saw_temp = false;
    while !saw_temp && Instant::now() < deadline {
        let mut telemetry = RecordingTelemetry::default();
        control
            .run_cycle(Instant::now(), 12, &mut telemetry, &presets, &mut alerts)
            .unwrap();
        saw_temp = telemetry.frames.iter().any(|(_, p)| p.contains("temp="));
        thread::sleep(Duration::from_millis(5));
    }
    assert!(saw_temp);
    control.shutdown_all();
}

#[test]
fn overflowing_tray_keeps_simulated_pumps_off() {
    let cfg = fast_config("A4010");
    let mut farm = SimulatedFarm::new(&cfg);
    let mut control = farm.build_loop(&cfg).unwrap();
    let mut telemetry = RecordingTelemetry::default();
    let mut alerts = RecordingAlerts::default();

    farm.tank().set_overflow(true);
    control
        .run_cycle(Instant::now(), 12, &mut telemetry, &PresetBoard::new(), &mut alerts)
        .unwrap();

    for slot in 1..=4 {
        let plant = farm.plant(slot).unwrap();
        assert!(!plant.outputs().pump, "slot {slot} pump must stay off");
    }
    assert_eq!(alerts.messages.len(), 1);
    control.shutdown_all();
    for slot in 1..=4 {
        let out = farm.plant(slot).unwrap().outputs();
        assert!(!out.heater && !out.fan && !out.grow_light && !out.co2_release);
    }
}
