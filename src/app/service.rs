//! Orchestration loop, the hexagonal core.
//!
//! [`ControlLoop`] owns the shared [`WaterTankMonitor`] and every slot.
//! One cycle is:
//!
//! ```text
//!  TankSensorPort ──▶ WaterTankMonitor ──▶ AlertSink
//!                          │ interlock
//!  per slot:               ▼
//!  SensorPort ──▶ snapshot ──▶ TelemetrySink
//!                    │
//!  PresetSource ──▶ EnvironmentalController ──▶ actuators
//! ```
//!
//! The tank check always precedes every slot's irrigation decision within
//! a cycle.  All I/O flows through port traits injected at call sites, so
//! the whole loop runs against mock adapters in tests.

use std::panic::{self, AssertUnwindSafe};
use std::time::{Duration, Instant};

use anyhow::anyhow;
use log::{debug, error, info, warn};

use crate::config::{MAX_SLOTS, SystemConfig};
use crate::control::climate::EnvironmentalController;
use crate::error::{Error, Result};
use crate::preset::Preset;
use crate::safety::{TankAlertStatus, WaterTankMonitor};
use crate::shutdown::Shutdown;
use crate::telemetry::{farm_uid, fields_from_snapshot};

use super::ports::{AlertSink, Clock, PresetSource, SensorPort, SlotId, TankSensorPort, TelemetrySink};

// ───────────────────────────────────────────────────────────────
// Slot
// ───────────────────────────────────────────────────────────────

/// One growing slot: its sensors and its controller.
pub struct Slot {
    id: SlotId,
    farm_uid: String,
    sensors: Box<dyn SensorPort>,
    controller: EnvironmentalController,
}

impl Slot {
    pub fn new(device_serial: &str, sensors: Box<dyn SensorPort>, controller: EnvironmentalController) -> Self {
        let id = controller.slot();
        Self {
            id,
            farm_uid: farm_uid(device_serial, id),
            sensors,
            controller,
        }
    }

    pub fn id(&self) -> SlotId {
        self.id
    }

    pub fn farm_uid(&self) -> &str {
        &self.farm_uid
    }

    pub fn controller(&self) -> &EnvironmentalController {
        &self.controller
    }
}

// ───────────────────────────────────────────────────────────────
// ControlLoop
// ───────────────────────────────────────────────────────────────

pub struct ControlLoop {
    interval: Duration,
    monitor: WaterTankMonitor,
    tanks: Box<dyn TankSensorPort>,
    slots: heapless::Vec<Slot, MAX_SLOTS>,
    cycles: u64,
}

impl ControlLoop {
    pub fn new(config: &SystemConfig, tanks: Box<dyn TankSensorPort>) -> Self {
        Self {
            interval: Duration::from_secs(u64::from(config.control_interval_secs)),
            monitor: WaterTankMonitor::new(&config.tank),
            tanks,
            slots: heapless::Vec::new(),
            cycles: 0,
        }
    }

    pub fn add_slot(&mut self, slot: Slot) -> Result<()> {
        if self.slots.iter().any(|s| s.id == slot.id) {
            return Err(Error::Config("duplicate slot id"));
        }
        info!("slot {} ({}) registered", slot.id, slot.farm_uid);
        self.slots
            .push(slot)
            .map_err(|_| Error::Config("too many slots"))
    }

    pub fn slots(&self) -> &[Slot] {
        &self.slots
    }

    pub fn monitor(&self) -> &WaterTankMonitor {
        &self.monitor
    }

    /// Cycles started since construction.
    pub fn cycles(&self) -> u64 {
        self.cycles
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    // ── Per-cycle orchestration ───────────────────────────────

    /// Run one full cycle: tanks first, then every slot.
    ///
    /// Slots are independent: a failing slot does not stop the others, and
    /// the first failure is returned once every slot ran.
    pub fn run_cycle(
        &mut self,
        now: Instant,
        hour: u8,
        telemetry: &mut impl TelemetrySink,
        presets: &impl PresetSource,
        alerts: &mut impl AlertSink,
    ) -> anyhow::Result<()> {
        self.cycles += 1;

        // 1. Shared tanks
        let tanks = self.tanks.read_tanks();
        self.monitor.check_supply_tank(tanks.distance_cm, now, alerts);
        self.monitor.check_overflow_tank(tanks.water_detected, now, alerts);

        let summary = self.monitor.get_status_summary();
        if summary.alert_status == TankAlertStatus::Attention {
            warn!(
                "TANK | attention: supply {}, overflow {}",
                summary.supply, summary.overflow
            );
        }

        // 2. Slots
        let mut first_failure = None;
        for slot in self.slots.iter_mut() {
            let snap = slot.sensors.read_all();

            let fields = fields_from_snapshot(&snap);
            if fields.is_empty() {
                debug!("slot {}: no readings this cycle", slot.id);
            } else {
                telemetry.publish(slot.id, &fields);
            }

            let preset = Preset::from_map(&presets.get_preset(slot.id));
            if let Err(e) = slot.controller.control(&snap, &preset, &self.monitor, hour) {
                warn!("slot {}: {e}", slot.id);
                first_failure.get_or_insert((slot.id, e));
            }
        }

        match first_failure {
            Some((id, e)) => Err(anyhow::Error::new(e).context(format!("slot {id} control"))),
            None => Ok(()),
        }
    }

    /// Loop until `shutdown` fires, then stop every slot.
    ///
    /// An error or panic inside a cycle is logged and the loop carries on
    /// after the usual interval.
    pub fn run(
        &mut self,
        clock: &impl Clock,
        shutdown: &Shutdown,
        telemetry: &mut impl TelemetrySink,
        presets: &impl PresetSource,
        alerts: &mut impl AlertSink,
    ) {
        info!(
            "control loop started: {} slot(s), every {:?}",
            self.slots.len(),
            self.interval
        );

        while !shutdown.is_triggered() {
            let now = clock.now();
            let hour = clock.hour();

            let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
                self.run_cycle(now, hour, &mut *telemetry, presets, &mut *alerts)
            }))
            .unwrap_or_else(|_| Err(anyhow!("cycle panicked")));

            if let Err(e) = outcome {
                error!("cycle {} failed: {e:#}", self.cycles);
            }

            if shutdown.wait_timeout(self.interval) {
                break;
            }
        }

        info!("shutdown requested after {} cycle(s)", self.cycles);
        self.shutdown_all();
    }

    /// Stop every cache, then switch every slot's actuators off.
    pub fn shutdown_all(&mut self) {
        for slot in self.slots.iter_mut() {
            slot.sensors.shutdown();
        }
        for slot in self.slots.iter_mut() {
            if let Err(e) = slot.controller.stop_all() {
                error!("slot {}: stop failed: {e}", slot.id);
            }
        }
    }
}
