//! On/off actuator backed by a group of GPIO lines.
//!
//! Heater, fan and light relays are a single line each.  The pump sits
//! behind an H-bridge (two inputs), so "on" means IB1 high / IB2 low.
//! Off always drives every line low, which brakes the bridge and opens
//! the relays.
//!
//! The driver only flips its software state after every line accepted the
//! write; a partial failure leaves `is_on()` at its old value so the
//! controller retries on the next cycle.

use embedded_hal::digital::{OutputPin, PinState};
use log::debug;

use crate::app::ports::ActuatorDriver;
use crate::error::ActuatorError;

/// Largest group we wire (H-bridge inputs plus enable).
pub const MAX_PINS: usize = 3;

pub struct PinGroup<P: OutputPin> {
    name: &'static str,
    /// Each line with the level it takes when the actuator is on.
    pins: heapless::Vec<(P, PinState), MAX_PINS>,
    on: bool,
}

impl<P: OutputPin> PinGroup<P> {
    /// Build a group and drive it off.
    pub fn new(
        name: &'static str,
        pins: impl IntoIterator<Item = (P, PinState)>,
    ) -> Result<Self, ActuatorError> {
        let mut group_pins = heapless::Vec::new();
        for entry in pins {
            group_pins
                .push(entry)
                .map_err(|_| ActuatorError::GpioWriteFailed)?;
        }
        let mut group = Self {
            name,
            pins: group_pins,
            on: true,
        };
        group.turn_off()?;
        Ok(group)
    }

    /// Single active-high line.
    pub fn single(name: &'static str, pin: P) -> Result<Self, ActuatorError> {
        Self::new(name, [(pin, PinState::High)])
    }

    /// H-bridge pair: forward = `a` high, `b` low.
    pub fn h_bridge(name: &'static str, a: P, b: P) -> Result<Self, ActuatorError> {
        Self::new(name, [(a, PinState::High), (b, PinState::Low)])
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    fn write_all(&mut self, on: bool) -> Result<(), ActuatorError> {
        for (pin, on_level) in self.pins.iter_mut() {
            let level = if on { *on_level } else { PinState::Low };
            pin.set_state(level)
                .map_err(|_| ActuatorError::GpioWriteFailed)?;
        }
        self.on = on;
        debug!("{}: {}", self.name, if on { "on" } else { "off" });
        Ok(())
    }
}

impl<P: OutputPin> ActuatorDriver for PinGroup<P> {
    fn turn_on(&mut self) -> Result<(), ActuatorError> {
        self.write_all(true)
    }

    fn turn_off(&mut self) -> Result<(), ActuatorError> {
        self.write_all(false)
    }

    fn is_on(&self) -> bool {
        self.on
    }
}
