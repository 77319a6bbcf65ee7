//! Integration tests for the water tank monitor against a configured
//! device and the log alert sink's message format.

use std::time::{Duration, Instant};

use smartfarm::adapters::log_sink::stamp;
use smartfarm::app::ports::WateringInterlock;
use smartfarm::config::{SystemConfig, TankConfig};
use smartfarm::safety::{OverflowStatus, SupplyStatus, TankAlertStatus, WaterTankMonitor};

use crate::mock_hw::RecordingAlerts;

#[test]
fn documented_supply_walkthrough() {
    let mut m = WaterTankMonitor::new(&SystemConfig::default().tank);
    let mut alerts = RecordingAlerts::default();
    let now = Instant::now();

    let steps = [
        (10.0, SupplyStatus::Normal, 0),
        (26.0, SupplyStatus::Low, 1),
        (28.0, SupplyStatus::Critical, 2),
        (10.0, SupplyStatus::Normal, 2),
    ];
    for (distance, status, alerts_so_far) in steps {
        assert_eq!(m.check_supply_tank(Some(distance), now, &mut alerts), status);
        assert_eq!(alerts.messages.len(), alerts_so_far, "after {distance} cm");
    }
    assert_eq!(m.water_level_cm(), Some(20.0));
}

#[test]
fn custom_geometry_and_cooldown() {
    let cfg = TankConfig {
        height_cm: 50.0,
        low_threshold_cm: 12.0,
        critical_threshold_cm: 6.0,
        alert_cooldown_secs: 60,
    };
    let mut m = WaterTankMonitor::new(&cfg);
    let mut alerts = RecordingAlerts::default();
    let t0 = Instant::now();

    assert_eq!(m.check_supply_tank(Some(40.0), t0, &mut alerts), SupplyStatus::Low);
    assert_eq!(
        m.check_supply_tank(Some(40.0), t0 + Duration::from_secs(59), &mut alerts),
        SupplyStatus::Low
    );
    assert_eq!(alerts.messages.len(), 1);
    m.check_supply_tank(Some(40.0), t0 + Duration::from_secs(60), &mut alerts);
    assert_eq!(alerts.messages.len(), 2);

    assert_eq!(m.check_supply_tank(Some(44.0), t0, &mut alerts), SupplyStatus::Critical);
    assert!(m.should_block_watering());
}

#[test]
fn categories_do_not_share_cooldowns() {
    let mut m = WaterTankMonitor::new(&TankConfig::default());
    let mut alerts = RecordingAlerts::default();
    let t0 = Instant::now();

    m.check_supply_tank(Some(26.0), t0, &mut alerts);
    m.check_overflow_tank(Some(true), t0, &mut alerts);
    m.check_supply_tank(Some(28.0), t0, &mut alerts);
    assert_eq!(alerts.messages.len(), 3);

    let summary = m.get_status_summary();
    assert_eq!(summary.supply, SupplyStatus::Critical);
    assert_eq!(summary.overflow, OverflowStatus::Overflow);
    assert_eq!(summary.alert_status, TankAlertStatus::Attention);
}

#[test]
fn alert_line_is_stamped_by_the_sink() {
    let mut m = WaterTankMonitor::new(&TankConfig::default());
    let mut alerts = RecordingAlerts::default();
    m.check_supply_tank(Some(28.0), Instant::now(), &mut alerts);

    let line = stamp(&alerts.messages[0]);
    assert!(line.starts_with("[CRITICAL] [supply tank] Supply tank water level critical (2.0 cm)"));
    assert!(line.ends_with(')'));
}
