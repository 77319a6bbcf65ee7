//! Simulated plant for running the controller on a host.
//!
//! A [`SimPlant`] is one slot's air/soil/light/CO2 state.  The actuator
//! outputs (set through `drivers::sim`) push the state around, and every
//! climate poll advances it by one step.  A [`SimTank`] is the shared water
//! supply that running pumps slowly drain.
//!
//! The sources are `Send` so they can live on cache poll threads, and they
//! misbehave the way the real parts do: the climate sensor drops a read now
//! and then, the CO2 module reports warm-up for its first polls.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::app::ports::SensorSource;
use crate::error::SensorError;

use super::ClimateReading;

/// One drive line into the simulated plant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlantOutput {
    Heater,
    Fan,
    Pump,
    GrowLight,
    Co2Release,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PlantOutputs {
    pub heater: bool,
    pub fan: bool,
    pub pump: bool,
    pub grow_light: bool,
    pub co2_release: bool,
}

impl PlantOutputs {
    fn set(&mut self, output: PlantOutput, on: bool) {
        match output {
            PlantOutput::Heater => self.heater = on,
            PlantOutput::Fan => self.fan = on,
            PlantOutput::Pump => self.pump = on,
            PlantOutput::GrowLight => self.grow_light = on,
            PlantOutput::Co2Release => self.co2_release = on,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlantState {
    pub temperature_c: f32,
    pub humidity_pct: f32,
    pub light_raw: f32,
    pub soil_raw: f32,
    pub co2_ppm: f32,
    pub outputs: PlantOutputs,
}

impl Default for PlantState {
    fn default() -> Self {
        Self {
            temperature_c: 21.0,
            humidity_pct: 65.0,
            light_raw: 2800.0,
            soil_raw: 2400.0,
            co2_ppm: 700.0,
            outputs: PlantOutputs::default(),
        }
    }
}

const AMBIENT_TEMP_C: f32 = 20.0;
const AMBIENT_LIGHT: f32 = 2800.0;
const GROW_LIGHT_GAIN: f32 = 3500.0;
const AMBIENT_CO2: f32 = 600.0;
/// Pump flow per step, in cm of supply tank level.
const PUMP_DRAW_CM: f32 = 0.02;

// ---------------------------------------------------------------------------
// SimTank
// ---------------------------------------------------------------------------

#[derive(Debug)]
struct TankState {
    height_cm: f32,
    level_cm: f32,
    overflow: bool,
}

/// Shared water supply and overflow tray.
#[derive(Debug, Clone)]
pub struct SimTank {
    inner: Arc<Mutex<TankState>>,
}

impl SimTank {
    pub fn new(height_cm: f32, level_cm: f32) -> Self {
        Self {
            inner: Arc::new(Mutex::new(TankState {
                height_cm,
                level_cm: level_cm.clamp(0.0, height_cm),
                overflow: false,
            })),
        }
    }

    fn state(&self) -> MutexGuard<'_, TankState> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn level_cm(&self) -> f32 {
        self.state().level_cm
    }

    pub fn refill(&self) {
        let mut s = self.state();
        s.level_cm = s.height_cm;
    }

    pub fn set_level(&self, level_cm: f32) {
        let mut s = self.state();
        s.level_cm = level_cm.clamp(0.0, s.height_cm);
    }

    pub fn set_overflow(&self, overflow: bool) {
        self.state().overflow = overflow;
    }

    fn drain(&self, cm: f32) {
        let mut s = self.state();
        s.level_cm = (s.level_cm - cm).max(0.0);
    }

    pub fn distance_source(&self) -> SimDistance {
        SimDistance(self.clone())
    }

    pub fn presence_source(&self) -> SimPresence {
        SimPresence(self.clone())
    }
}

/// Ultrasonic sensor at the top of the tank.
pub struct SimDistance(SimTank);

impl SensorSource for SimDistance {
    type Reading = f32;

    fn read(&mut self) -> Result<f32, SensorError> {
        let s = self.0.state();
        Ok(s.height_cm - s.level_cm)
    }
}

/// Water sensor in the overflow tray.
pub struct SimPresence(SimTank);

impl SensorSource for SimPresence {
    type Reading = bool;

    fn read(&mut self) -> Result<bool, SensorError> {
        Ok(self.0.state().overflow)
    }
}

// ---------------------------------------------------------------------------
// SimPlant
// ---------------------------------------------------------------------------

/// One slot's growing environment.
#[derive(Debug, Clone)]
pub struct SimPlant {
    inner: Arc<Mutex<PlantState>>,
    tank: Option<SimTank>,
}

impl SimPlant {
    pub fn new(initial: PlantState) -> Self {
        Self {
            inner: Arc::new(Mutex::new(initial)),
            tank: None,
        }
    }

    /// Pumps in this plant draw from `tank`.
    pub fn with_tank(mut self, tank: SimTank) -> Self {
        self.tank = Some(tank);
        self
    }

    fn state(&self) -> MutexGuard<'_, PlantState> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn snapshot(&self) -> PlantState {
        *self.state()
    }

    pub fn set_output(&self, output: PlantOutput, on: bool) {
        self.state().outputs.set(output, on);
    }

    pub fn outputs(&self) -> PlantOutputs {
        self.state().outputs
    }

    /// Advance the plant by one poll period.
    pub fn step(&self) {
        let pumping = {
            let mut s = self.state();
            let out = s.outputs;

            let mut dt = (AMBIENT_TEMP_C - s.temperature_c) * 0.05;
            if out.heater {
                dt += 0.4;
            }
            if out.fan {
                dt -= 0.3;
            }
            s.temperature_c += dt;

            let dh = if out.fan { -1.5 } else { 0.4 };
            s.humidity_pct = (s.humidity_pct + dh).clamp(0.0, 100.0);

            let target_light = AMBIENT_LIGHT + if out.grow_light { GROW_LIGHT_GAIN } else { 0.0 };
            s.light_raw += (target_light - s.light_raw) * 0.5;

            let ds = if out.pump { -60.0 } else { 8.0 };
            s.soil_raw = (s.soil_raw + ds).clamp(0.0, 4095.0);

            let dc = if out.co2_release { 40.0 } else { (AMBIENT_CO2 - s.co2_ppm) * 0.05 - 2.0 };
            s.co2_ppm = (s.co2_ppm + dc).max(0.0);

            out.pump
        };

        if pumping {
            if let Some(tank) = &self.tank {
                tank.drain(PUMP_DRAW_CM);
            }
        }
    }

    /// DHT-style sensor: every `drop_every`th read times out.
    pub fn climate_source(&self, drop_every: u32) -> SimClimate {
        SimClimate {
            plant: self.clone(),
            reads: 0,
            drop_every,
        }
    }

    /// NDIR-style module that reports warm-up for its first `warmup` reads.
    pub fn co2_source(&self, warmup: u32) -> SimCo2 {
        SimCo2 {
            plant: self.clone(),
            warmup,
        }
    }

    pub fn light_source(&self) -> SimLight {
        SimLight(self.clone())
    }

    pub fn soil_source(&self) -> SimSoil {
        SimSoil(self.clone())
    }
}

pub struct SimClimate {
    plant: SimPlant,
    reads: u32,
    drop_every: u32,
}

impl SensorSource for SimClimate {
    type Reading = ClimateReading;

    fn read(&mut self) -> Result<ClimateReading, SensorError> {
        self.plant.step();
        self.reads = self.reads.wrapping_add(1);
        if self.drop_every > 0 && self.reads % self.drop_every == 0 {
            return Err(SensorError::Timeout);
        }
        let s = self.plant.snapshot();
        Ok(ClimateReading {
            temperature_c: (s.temperature_c * 10.0).round() / 10.0,
            humidity_pct: s.humidity_pct.round(),
        })
    }
}

pub struct SimCo2 {
    plant: SimPlant,
    warmup: u32,
}

impl SensorSource for SimCo2 {
    type Reading = u16;

    fn read(&mut self) -> Result<u16, SensorError> {
        if self.warmup > 0 {
            self.warmup -= 1;
            return Err(SensorError::WarmingUp);
        }
        Ok(to_raw(self.plant.snapshot().co2_ppm, 5000))
    }
}

pub struct SimLight(SimPlant);

impl SensorSource for SimLight {
    type Reading = u16;

    fn read(&mut self) -> Result<u16, SensorError> {
        Ok(to_raw(self.0.snapshot().light_raw, u16::MAX))
    }
}

pub struct SimSoil(SimPlant);

impl SensorSource for SimSoil {
    type Reading = u16;

    fn read(&mut self) -> Result<u16, SensorError> {
        Ok(to_raw(self.0.snapshot().soil_raw, 4095))
    }
}

fn to_raw(value: f32, max: u16) -> u16 {
    value.round().clamp(0.0, f32::from(max)) as u16
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn heater_warms_and_fan_cools() {
        let plant = SimPlant::new(PlantState::default());
        let start = plant.snapshot().temperature_c;

        plant.set_output(PlantOutput::Heater, true);
        for _ in 0..5 {
            plant.step();
        }
        let warmed = plant.snapshot().temperature_c;
        assert!(warmed > start);

        plant.set_output(PlantOutput::Heater, false);
        plant.set_output(PlantOutput::Fan, true);
        for _ in 0..5 {
            plant.step();
        }
        assert!(plant.snapshot().temperature_c < warmed);
    }

    #[test]
    fn pump_wets_soil_and_drains_tank() {
        let tank = SimTank::new(30.0, 20.0);
        let plant = SimPlant::new(PlantState::default()).with_tank(tank.clone());
        let dry = plant.snapshot().soil_raw;

        plant.set_output(PlantOutput::Pump, true);
        plant.step();
        assert!(plant.snapshot().soil_raw < dry);
        assert!(tank.level_cm() < 20.0);
    }

    #[test]
    fn climate_source_drops_periodically() {
        let plant = SimPlant::new(PlantState::default());
        let mut src = plant.climate_source(3);
        assert!(src.read().is_ok());
        assert!(src.read().is_ok());
        assert_eq!(src.read(), Err(SensorError::Timeout));
        assert!(src.read().is_ok());
    }

    #[test]
    fn co2_source_warms_up_first() {
        let plant = SimPlant::new(PlantState::default());
        let mut src = plant.co2_source(2);
        assert_eq!(src.read(), Err(SensorError::WarmingUp));
        assert_eq!(src.read(), Err(SensorError::WarmingUp));
        assert_eq!(src.read(), Ok(700));
    }

    #[test]
    fn tank_distance_mirrors_level() {
        let tank = SimTank::new(30.0, 25.0);
        let mut d = tank.distance_source();
        assert_eq!(d.read(), Ok(5.0));
        tank.set_level(2.0);
        assert_eq!(d.read(), Ok(28.0));

        let mut p = tank.presence_source();
        assert_eq!(p.read(), Ok(false));
        tank.set_overflow(true);
        assert_eq!(p.read(), Ok(true));
    }
}
