//! Hardware adapter: wires slots and tanks to concrete peripherals.
//!
//! On a host there is no GPIO, so every slot is backed by a simulated plant
//! sharing one simulated water tank.  The wiring is the same as on the
//! board: per slot, cached climate and CO2 sensors, inline light and soil
//! channels, single-line relays for heater/fan/light, an H-bridge pump and
//! a servo-driven CO2 release on models that have one.

use std::collections::BTreeMap;

use embedded_hal::digital::OutputPin;
use log::info;

use crate::app::ports::{ActuatorDriver, Co2ReleaseDriver, PresetRequestSink, SlotId};
use crate::app::service::{ControlLoop, Slot};
use crate::config::SystemConfig;
use crate::control::climate::{EnvironmentalController, SlotActuators};
use crate::drivers::pin_group::PinGroup;
use crate::drivers::servo::ServoRelease;
use crate::drivers::sim::{SimPin, SimServoPwm};
use crate::error::Result;
use crate::preset::{NO_PRESET, PresetBoard, PresetMap, format_payload};
use crate::sensors::sim::{PlantOutput, PlantState, SimPlant, SimTank};
use crate::sensors::{Co2Source, SlotSensors, TankSensors};
use crate::telemetry::{farm_uid, preset_request_topic, preset_response_topic};

/// Every DHT read that lands on a multiple of this fails.
const CLIMATE_DROP_EVERY: u32 = 7;
/// CO2 module warm-up, in polls.
const CO2_WARMUP_POLLS: u32 = 3;
/// Supply tank starts this full.
const INITIAL_FILL: f32 = 0.8;

/// Simulated device: one shared tank plus a plant per slot.
pub struct SimulatedFarm {
    tank: SimTank,
    plants: Vec<(SlotId, SimPlant)>,
}

impl SimulatedFarm {
    pub fn new(config: &SystemConfig) -> Self {
        let height = config.tank.height_cm;
        Self {
            tank: SimTank::new(height, height * INITIAL_FILL),
            plants: Vec::new(),
        }
    }

    pub fn tank(&self) -> &SimTank {
        &self.tank
    }

    pub fn plant(&self, slot: SlotId) -> Option<&SimPlant> {
        self.plants.iter().find(|(id, _)| *id == slot).map(|(_, p)| p)
    }

    /// Build the loop with every configured slot registered.
    pub fn build_loop(&mut self, config: &SystemConfig) -> Result<ControlLoop> {
        let tanks = TankSensors::new(
            Box::new(self.tank.distance_source()),
            Box::new(self.tank.presence_source()),
        );
        let mut control = ControlLoop::new(config, Box::new(tanks));
        for id in config.slot_ids() {
            let slot = self.build_slot(config, id)?;
            control.add_slot(slot)?;
        }
        info!(
            "simulated {:?} device: {} slot(s), CO2 {}",
            config.model(),
            control.slots().len(),
            if config.has_co2() { "fitted" } else { "absent" }
        );
        Ok(control)
    }

    fn build_slot(&mut self, config: &SystemConfig, id: SlotId) -> Result<Slot> {
        let plant = SimPlant::new(PlantState::default()).with_tank(self.tank.clone());
        let poll = std::time::Duration::from_millis(u64::from(config.cache_poll_interval_ms));

        let sensors = SlotSensors::start(
            Box::new(plant.climate_source(CLIMATE_DROP_EVERY)),
            config
                .has_co2()
                .then(|| Box::new(plant.co2_source(CO2_WARMUP_POLLS)) as Co2Source),
            Box::new(plant.light_source()),
            Box::new(plant.soil_source()),
            poll,
        )?;

        let actuators = SlotActuators {
            heater: relay("heater", SimPin::drive(&plant, PlantOutput::Heater))?,
            fan: relay("fan", SimPin::drive(&plant, PlantOutput::Fan))?,
            pump: Box::new(PinGroup::h_bridge(
                "pump",
                SimPin::drive(&plant, PlantOutput::Pump),
                SimPin::passive(),
            )?),
            light: relay("light", SimPin::drive(&plant, PlantOutput::GrowLight))?,
            co2: config.has_co2().then(|| {
                Box::new(ServoRelease::new(SimServoPwm::new(&plant), &config.co2))
                    as Box<dyn Co2ReleaseDriver>
            }),
        };

        let controller =
            EnvironmentalController::new(id, actuators, config.bands, config.co2, config.light_window);
        self.plants.push((id, plant));
        Ok(Slot::new(&config.device_serial, Box::new(sensors), controller))
    }
}

/// Stand-in for the remote preset service.  Answers every request at once
/// with the preset stored in the config, or `none`.
pub struct SimPresetServer {
    device_serial: String,
    board: PresetBoard,
    stored: BTreeMap<SlotId, PresetMap>,
}

impl SimPresetServer {
    pub fn new(config: &SystemConfig, board: PresetBoard) -> Self {
        Self {
            device_serial: config.device_serial.clone(),
            board,
            stored: config.presets.clone(),
        }
    }
}

impl PresetRequestSink for SimPresetServer {
    fn request(&mut self, slot: SlotId) {
        let uid = farm_uid(&self.device_serial, slot);
        info!("PRESET | {} | request", preset_request_topic(&uid));

        let payload = self
            .stored
            .get(&slot)
            .filter(|m| !m.is_empty())
            .map_or_else(|| NO_PRESET.to_string(), format_payload);
        info!("PRESET | {} | {payload}", preset_response_topic(&uid));
        self.board.apply_response(slot, &payload);
    }
}

fn relay<P: OutputPin + 'static>(
    name: &'static str,
    pin: P,
) -> Result<Box<dyn ActuatorDriver>> {
    Ok(Box::new(PinGroup::single(name, pin)?))
}
