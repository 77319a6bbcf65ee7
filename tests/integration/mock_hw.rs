//! Mock hardware adapters for integration tests.
//!
//! Records every actuator call on a shared bench so tests can assert on the
//! full command history without touching real GPIO/PWM.  Sensor and tank
//! ports read from cells the test rewrites between cycles.

use std::cell::{Cell, RefCell};
use std::collections::BTreeMap;
use std::rc::Rc;
use std::time::Instant;

use smartfarm::app::ports::{
    ActuatorDriver, AlertSink, Clock, Co2ReleaseDriver, ReleasePosition, SensorPort, SlotId,
    TankSensorPort, TelemetrySink,
};
use smartfarm::config::SystemConfig;
use smartfarm::control::climate::{EnvironmentalController, SlotActuators};
use smartfarm::error::ActuatorError;
use smartfarm::sensors::{SensorSnapshot, TankReadings};
use smartfarm::shutdown::Shutdown;
use smartfarm::telemetry::{TelemetryFields, encode_payload};

// ── Actuator call record ──────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActuatorCall {
    On { slot: SlotId, name: &'static str },
    Off { slot: SlotId, name: &'static str },
    Position { slot: SlotId, position: ReleasePosition },
}

#[derive(Default)]
struct BenchState {
    calls: Vec<ActuatorCall>,
    on: BTreeMap<(SlotId, &'static str), bool>,
    broken: Vec<(SlotId, &'static str)>,
}

/// Shared record of every actuator in every slot.
#[derive(Clone, Default)]
pub struct Bench(Rc<RefCell<BenchState>>);

#[allow(dead_code)]
impl Bench {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> Vec<ActuatorCall> {
        self.0.borrow().calls.clone()
    }

    pub fn clear_calls(&self) {
        self.0.borrow_mut().calls.clear();
    }

    pub fn is_on(&self, slot: SlotId, name: &'static str) -> bool {
        self.0.borrow().on.get(&(slot, name)).copied().unwrap_or(false)
    }

    /// Every further command to this actuator fails.
    pub fn break_actuator(&self, slot: SlotId, name: &'static str) {
        self.0.borrow_mut().broken.push((slot, name));
    }

    pub fn actuators(&self, slot: SlotId, with_co2: bool) -> SlotActuators {
        let relay = |name| Box::new(MockActuator { bench: self.clone(), slot, name }) as Box<dyn ActuatorDriver>;
        SlotActuators {
            heater: relay("heater"),
            fan: relay("fan"),
            pump: relay("pump"),
            light: relay("light"),
            co2: with_co2.then(|| {
                Box::new(MockRelease { bench: self.clone(), slot }) as Box<dyn Co2ReleaseDriver>
            }),
        }
    }

    pub fn controller(&self, slot: SlotId, config: &SystemConfig, with_co2: bool) -> EnvironmentalController {
        EnvironmentalController::new(
            slot,
            self.actuators(slot, with_co2),
            config.bands,
            config.co2,
            config.light_window,
        )
    }
}

pub struct MockActuator {
    bench: Bench,
    slot: SlotId,
    name: &'static str,
}

impl MockActuator {
    fn set(&mut self, on: bool) -> Result<(), ActuatorError> {
        let mut b = self.bench.0.borrow_mut();
        if b.broken.contains(&(self.slot, self.name)) {
            return Err(ActuatorError::GpioWriteFailed);
        }
        b.calls.push(if on {
            ActuatorCall::On { slot: self.slot, name: self.name }
        } else {
            ActuatorCall::Off { slot: self.slot, name: self.name }
        });
        b.on.insert((self.slot, self.name), on);
        Ok(())
    }
}

impl ActuatorDriver for MockActuator {
    fn turn_on(&mut self) -> Result<(), ActuatorError> {
        self.set(true)
    }

    fn turn_off(&mut self) -> Result<(), ActuatorError> {
        self.set(false)
    }

    fn is_on(&self) -> bool {
        self.bench.is_on(self.slot, self.name)
    }
}

pub struct MockRelease {
    bench: Bench,
    slot: SlotId,
}

impl Co2ReleaseDriver for MockRelease {
    fn set_position(&mut self, position: ReleasePosition) -> Result<(), ActuatorError> {
        self.bench
            .0
            .borrow_mut()
            .calls
            .push(ActuatorCall::Position { slot: self.slot, position });
        Ok(())
    }
}

// ── Sensor ports ──────────────────────────────────────────────

/// Returns whatever snapshot the test put in the cell.
#[derive(Clone, Default)]
pub struct ScriptedSensors {
    pub snapshot: Rc<Cell<SensorSnapshot>>,
    pub reads: Rc<Cell<u32>>,
    pub shut_down: Rc<Cell<bool>>,
    /// Panic on this read number (1-based).
    pub panic_on: Option<u32>,
    /// Trigger shutdown on this read number.
    pub stop_on: Option<(u32, Shutdown)>,
}

#[allow(dead_code)]
impl ScriptedSensors {
    pub fn new(snapshot: SensorSnapshot) -> Self {
        let s = Self::default();
        s.snapshot.set(snapshot);
        s
    }

    pub fn set(&self, snapshot: SensorSnapshot) {
        self.snapshot.set(snapshot);
    }
}

impl SensorPort for ScriptedSensors {
    fn read_all(&mut self) -> SensorSnapshot {
        let n = self.reads.get() + 1;
        self.reads.set(n);
        if let Some((at, shutdown)) = &self.stop_on {
            if *at == n {
                shutdown.trigger();
            }
        }
        if self.panic_on == Some(n) {
            panic!("sensor bus wedged");
        }
        self.snapshot.get()
    }

    fn shutdown(&mut self) {
        self.shut_down.set(true);
    }
}

#[derive(Clone, Default)]
pub struct ScriptedTanks(pub Rc<Cell<TankReadings>>);

#[allow(dead_code)]
impl ScriptedTanks {
    pub fn set(&self, distance_cm: Option<f32>, water_detected: Option<bool>) {
        self.0.set(TankReadings { distance_cm, water_detected });
    }
}

impl TankSensorPort for ScriptedTanks {
    fn read_tanks(&mut self) -> TankReadings {
        self.0.get()
    }
}

// ── Sinks ─────────────────────────────────────────────────────

#[derive(Default)]
pub struct RecordingTelemetry {
    pub frames: Vec<(SlotId, String)>,
}

impl TelemetrySink for RecordingTelemetry {
    fn publish(&mut self, slot: SlotId, fields: &TelemetryFields) {
        self.frames.push((slot, encode_payload(fields)));
    }
}

#[derive(Default)]
pub struct RecordingAlerts {
    pub messages: Vec<String>,
}

impl AlertSink for RecordingAlerts {
    fn notify(&mut self, message: &str) {
        self.messages.push(message.to_string());
    }
}

// ── Clock ─────────────────────────────────────────────────────

/// Real monotonic time, pinned hour-of-day.
pub struct FixedClock {
    pub hour: u8,
}

impl FixedClock {
    pub fn at_hour(hour: u8) -> Self {
        Self { hour }
    }
}

impl Clock for FixedClock {
    fn now(&self) -> Instant {
        Instant::now()
    }

    fn hour(&self) -> u8 {
        self.hour
    }
}
