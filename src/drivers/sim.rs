//! `embedded-hal` pins and PWM wired into a [`SimPlant`].
//!
//! A [`SimPin`] is either the drive line of a plant output (its level is
//! the output's on/off state) or a passive line that only remembers its
//! level, like the second input of the pump H-bridge.

use core::convert::Infallible;

use embedded_hal::digital::{ErrorType as DigitalErrorType, OutputPin};
use embedded_hal::pwm::{ErrorType as PwmErrorType, SetDutyCycle};

use crate::sensors::sim::{PlantOutput, SimPlant};

pub struct SimPin {
    target: Option<(SimPlant, PlantOutput)>,
    high: bool,
}

impl SimPin {
    pub fn drive(plant: &SimPlant, output: PlantOutput) -> Self {
        Self {
            target: Some((plant.clone(), output)),
            high: false,
        }
    }

    pub fn passive() -> Self {
        Self {
            target: None,
            high: false,
        }
    }

    pub fn is_high(&self) -> bool {
        self.high
    }

    fn set(&mut self, high: bool) {
        self.high = high;
        if let Some((plant, output)) = &self.target {
            plant.set_output(*output, high);
        }
    }
}

impl DigitalErrorType for SimPin {
    type Error = Infallible;
}

impl OutputPin for SimPin {
    fn set_low(&mut self) -> Result<(), Infallible> {
        self.set(false);
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Infallible> {
        self.set(true);
        Ok(())
    }
}

/// 50 Hz servo channel, duty in µs of the 20 ms period.
pub struct SimServoPwm {
    plant: SimPlant,
    duty: u16,
}

const PERIOD_US: u16 = 20_000;
/// Angles at or past this count as open.
const OPEN_FROM_DEG: u32 = 45;

impl SimServoPwm {
    pub fn new(plant: &SimPlant) -> Self {
        Self {
            plant: plant.clone(),
            duty: 0,
        }
    }

    pub fn duty(&self) -> u16 {
        self.duty
    }
}

impl PwmErrorType for SimServoPwm {
    type Error = Infallible;
}

impl SetDutyCycle for SimServoPwm {
    fn max_duty_cycle(&self) -> u16 {
        PERIOD_US
    }

    fn set_duty_cycle(&mut self, duty: u16) -> Result<(), Infallible> {
        self.duty = duty;
        // No pulse: the horn stays where it was.
        if duty > 0 {
            let angle = (u32::from(duty) * 1800 / u32::from(PERIOD_US)).saturating_sub(36);
            self.plant
                .set_output(PlantOutput::Co2Release, angle >= OPEN_FROM_DEG);
        }
        Ok(())
    }
}
