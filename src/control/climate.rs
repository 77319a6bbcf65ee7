//! Per-slot environmental controller.
//!
//! Each cycle the controller runs five independent arms against the
//! snapshot and the slot's preset:
//!
//! | Arm         | Input        | Actuator | Rule                                   |
//! |-------------|--------------|----------|----------------------------------------|
//! | temperature | °C           | heater, fan | below band: heat; above band: cool  |
//! | humidity    | %RH          | fan      | only while temperature is in band      |
//! | irrigation  | soil ADC     | pump     | interlock first, then dry/wet band     |
//! | light       | light ADC    | light    | forced off outside the daily window    |
//! | CO2         | ppm          | release  | two-threshold state machine            |
//!
//! An arm whose reading is absent does nothing this cycle.  Commands are
//! only issued when the desired state differs from what the actuator
//! reports, so a steady plant produces no actuator traffic.

use log::{error, info, warn};

use crate::app::ports::{ActuatorDriver, Co2ReleaseDriver, ReleasePosition, SlotId, WateringInterlock};
use crate::config::{Co2Config, ControlBands};
use crate::error::{ActuatorError, Error, Result};
use crate::preset::Preset;
use crate::schedule::DailyWindow;
use crate::sensors::SensorSnapshot;

use super::co2::{Co2Arm, Co2Thresholds};
use super::hysteresis::{Band, Demand, Zone};

/// Upper bound on transitions a single cycle can issue.
pub const MAX_TRANSITIONS: usize = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Actuator {
    Heater,
    Fan,
    Pump,
    Light,
    Co2Release,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    On,
    Off,
    Position(ReleasePosition),
}

/// One command the controller issued and the driver accepted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    pub actuator: Actuator,
    pub command: Command,
}

pub type CycleReport = heapless::Vec<Transition, MAX_TRANSITIONS>;

/// The actuators owned by one slot.
pub struct SlotActuators {
    pub heater: Box<dyn ActuatorDriver>,
    pub fan: Box<dyn ActuatorDriver>,
    pub pump: Box<dyn ActuatorDriver>,
    pub light: Box<dyn ActuatorDriver>,
    /// Fitted on CO2-capable models only.
    pub co2: Option<Box<dyn Co2ReleaseDriver>>,
}

/// Outcome collector for one cycle.
struct Cycle {
    slot: SlotId,
    report: CycleReport,
    fault: Option<ActuatorError>,
}

impl Cycle {
    fn new(slot: SlotId) -> Self {
        Self {
            slot,
            report: CycleReport::new(),
            fault: None,
        }
    }

    fn record(&mut self, actuator: Actuator, command: Command) {
        if self.report.push(Transition { actuator, command }).is_err() {
            warn!("slot {}: cycle report full, dropping {actuator:?}", self.slot);
        }
    }

    fn fail(&mut self, actuator: Actuator, e: ActuatorError) {
        error!("SLOT {} | {actuator:?} command failed: {e}", self.slot);
        self.fault.get_or_insert(e);
    }

    fn finish(self) -> Result<CycleReport> {
        match self.fault {
            Some(e) => Err(Error::Actuator(e)),
            None => Ok(self.report),
        }
    }

    /// Bring an on/off actuator to `on`, if it is not there already.
    fn drive(&mut self, actuator: Actuator, driver: &mut dyn ActuatorDriver, on: bool) {
        if driver.is_on() == on {
            return;
        }
        let result = if on { driver.turn_on() } else { driver.turn_off() };
        match result {
            Ok(()) => {
                info!(
                    "SLOT {} | {actuator:?} {}",
                    self.slot,
                    if on { "ON" } else { "OFF" }
                );
                self.record(actuator, if on { Command::On } else { Command::Off });
            }
            Err(e) => self.fail(actuator, e),
        }
    }

    fn apply(&mut self, actuator: Actuator, driver: &mut dyn ActuatorDriver, demand: Demand) {
        match demand {
            Demand::On => self.drive(actuator, driver, true),
            Demand::Off => self.drive(actuator, driver, false),
            Demand::Hold => {}
        }
    }
}

/// Hysteresis controller for one slot.
pub struct EnvironmentalController {
    slot: SlotId,
    actuators: SlotActuators,
    bands: ControlBands,
    co2_config: Co2Config,
    light_window: DailyWindow,
    co2_arm: Co2Arm,
}

impl EnvironmentalController {
    /// Take ownership of the slot's actuators.  A fitted CO2 release is
    /// driven to idle straight away.
    pub fn new(
        slot: SlotId,
        mut actuators: SlotActuators,
        bands: ControlBands,
        co2_config: Co2Config,
        light_window: DailyWindow,
    ) -> Self {
        if let Some(co2) = actuators.co2.as_mut() {
            if let Err(e) = co2.set_position(ReleasePosition::Idle) {
                warn!("slot {slot}: could not park CO2 release ({e})");
            }
        }
        Self {
            slot,
            actuators,
            bands,
            co2_config,
            light_window,
            co2_arm: Co2Arm::new(),
        }
    }

    pub fn slot(&self) -> SlotId {
        self.slot
    }

    pub fn has_co2(&self) -> bool {
        self.actuators.co2.is_some()
    }

    pub fn co2_position(&self) -> ReleasePosition {
        self.co2_arm.position()
    }

    /// Run every arm once.
    ///
    /// All arms run even if one of them fails; the first actuator error is
    /// returned afterwards and the failed arm retries next cycle.
    pub fn control(
        &mut self,
        snap: &SensorSnapshot,
        preset: &Preset,
        interlock: &impl WateringInterlock,
        hour: u8,
    ) -> Result<CycleReport> {
        let mut cycle = Cycle::new(self.slot);
        let b = self.bands;
        let acts = &mut self.actuators;

        // Temperature
        let temp_zone = snap.temperature_c.map(|t| {
            let zone = Band::around(preset.optimal_temp, b.temp_half_width_c, b.temp_half_width_c).zone(t);
            match zone {
                Zone::Below => {
                    cycle.drive(Actuator::Heater, acts.heater.as_mut(), true);
                    cycle.drive(Actuator::Fan, acts.fan.as_mut(), false);
                }
                Zone::Above => {
                    cycle.drive(Actuator::Heater, acts.heater.as_mut(), false);
                    cycle.drive(Actuator::Fan, acts.fan.as_mut(), true);
                }
                Zone::Inside => cycle.drive(Actuator::Heater, acts.heater.as_mut(), false),
            }
            zone
        });

        // Humidity owns the fan only while temperature is in band.
        if temp_zone == Some(Zone::Inside) {
            if let Some(h) = snap.humidity_pct {
                let demand = Band::around(preset.optimal_humidity, b.humidity_low, b.humidity_high).on_above(h);
                cycle.apply(Actuator::Fan, acts.fan.as_mut(), demand);
            }
        }

        // Irrigation
        if interlock.should_block_watering() {
            cycle.drive(Actuator::Pump, acts.pump.as_mut(), false);
        } else if let Some(soil) = snap.soil_raw {
            let demand = Band::around(preset.soil_moisture, b.soil_wet, b.soil_dry).on_above(f32::from(soil));
            cycle.apply(Actuator::Pump, acts.pump.as_mut(), demand);
        }

        // Light
        if !self.light_window.contains(hour) {
            cycle.drive(Actuator::Light, acts.light.as_mut(), false);
        } else if let Some(lux) = snap.light_raw {
            let demand = Band::around(preset.light_intensity, b.light_low, b.light_high).on_below(f32::from(lux));
            cycle.apply(Actuator::Light, acts.light.as_mut(), demand);
        }

        // CO2
        if let (Some(release), Some(ppm)) = (acts.co2.as_mut(), snap.co2_ppm) {
            let th = Co2Thresholds::for_target(preset.co2_level, &self.co2_config);
            if let Some(next) = self.co2_arm.decide(f32::from(ppm), th) {
                match release.set_position(next) {
                    Ok(()) => {
                        info!(
                            "SLOT {} | CO2 {next:?} ({ppm} ppm, release<{} recover>={})",
                            self.slot, th.release, th.recovery
                        );
                        self.co2_arm.commit(next);
                        cycle.record(Actuator::Co2Release, Command::Position(next));
                    }
                    Err(e) => cycle.fail(Actuator::Co2Release, e),
                }
            }
        }

        cycle.finish()
    }

    /// Switch off everything that reports ON and park the CO2 release.
    /// Every actuator is attempted; the first error is returned.
    pub fn stop_all(&mut self) -> Result<()> {
        let mut cycle = Cycle::new(self.slot);
        let acts = &mut self.actuators;
        cycle.drive(Actuator::Heater, acts.heater.as_mut(), false);
        cycle.drive(Actuator::Fan, acts.fan.as_mut(), false);
        cycle.drive(Actuator::Pump, acts.pump.as_mut(), false);
        cycle.drive(Actuator::Light, acts.light.as_mut(), false);

        if let Some(release) = acts.co2.as_mut() {
            if self.co2_arm.position() == ReleasePosition::Releasing {
                match release.set_position(ReleasePosition::Idle) {
                    Ok(()) => {
                        self.co2_arm.commit(ReleasePosition::Idle);
                        cycle.record(Actuator::Co2Release, Command::Position(ReleasePosition::Idle));
                    }
                    Err(e) => cycle.fail(Actuator::Co2Release, e),
                }
            }
        }

        info!("slot {}: all actuators stopped", self.slot);
        cycle.finish().map(|_| ())
    }
}
