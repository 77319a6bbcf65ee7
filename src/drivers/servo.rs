//! Hobby servo on a 50 Hz PWM channel, used to open the CO2 cartridge.
//!
//! Duty follows the board's mapping of `angle / 18 + 2` percent at 50 Hz.  The servo is driven for the
//! settle time and the pulse is then released so it does not buzz while
//! holding position.

use std::thread;
use std::time::Duration;

use embedded_hal::pwm::SetDutyCycle;
use log::debug;

use crate::app::ports::{Co2ReleaseDriver, ReleasePosition};
use crate::config::Co2Config;
use crate::error::ActuatorError;

/// Highest commandable angle.
pub const MAX_ANGLE_DEG: u8 = 180;

/// Duty as `(numerator, denominator)` for `angle` degrees.
pub fn duty_fraction(angle_deg: u8) -> (u16, u16) {
    (u16::from(angle_deg.min(MAX_ANGLE_DEG)) + 36, 1800)
}

pub struct ServoRelease<P: SetDutyCycle> {
    pwm: P,
    release_angle: u8,
    idle_angle: u8,
    settle: Duration,
}

impl<P: SetDutyCycle> ServoRelease<P> {
    pub fn new(pwm: P, config: &Co2Config) -> Self {
        Self {
            pwm,
            release_angle: config.release_angle_deg,
            idle_angle: config.idle_angle_deg,
            settle: Duration::from_millis(u64::from(config.servo_settle_ms)),
        }
    }

    pub fn angle_for(&self, position: ReleasePosition) -> u8 {
        match position {
            ReleasePosition::Idle => self.idle_angle,
            ReleasePosition::Releasing => self.release_angle,
        }
    }

    fn move_to(&mut self, angle: u8) -> Result<(), ActuatorError> {
        let (num, denom) = duty_fraction(angle);
        self.pwm
            .set_duty_cycle_fraction(num, denom)
            .map_err(|_| ActuatorError::PwmWriteFailed)?;
        thread::sleep(self.settle);
        self.pwm
            .set_duty_cycle_fully_off()
            .map_err(|_| ActuatorError::PwmWriteFailed)
    }
}

impl<P: SetDutyCycle> Co2ReleaseDriver for ServoRelease<P> {
    fn set_position(&mut self, position: ReleasePosition) -> Result<(), ActuatorError> {
        let angle = self.angle_for(position);
        debug!("servo: {position:?} ({angle}°)");
        self.move_to(angle)
    }
}
