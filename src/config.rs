//! System configuration parameters
//!
//! All tunable parameters for the SmartFarm controller.
//! Values are loaded from a JSON file via the [`ConfigPort`](crate::app::ports::ConfigPort)
//! adapter; every field falls back to its default when absent.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::app::ports::ConfigError;
use crate::preset::PresetMap;
use crate::schedule::DailyWindow;

/// Upper bound on slots per device (largest model has four).
pub const MAX_SLOTS: usize = 4;

/// Core system configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SystemConfig {
    // --- Device ---
    /// Device serial number, e.g. "A4001".  The prefix selects the model.
    pub device_serial: String,
    /// Explicit slot list.  `None` derives it from the device model.
    pub slots: Option<Vec<u8>>,
    /// Explicit CO2 flag.  `None` derives it from the device model.
    pub co2_enabled: Option<bool>,

    // --- Timing ---
    /// Control loop interval (seconds)
    pub control_interval_secs: u32,
    /// Background poll period for cached sensors (milliseconds)
    pub cache_poll_interval_ms: u32,
    /// How long startup waits for preset answers before running on defaults (seconds)
    pub preset_wait_secs: u32,

    // --- Subsystems ---
    pub tank: TankConfig,
    pub co2: Co2Config,
    pub bands: ControlBands,
    /// Hours during which the grow light may run.
    pub light_window: DailyWindow,

    /// Presets stored per slot number; the simulated preset server answers
    /// requests with these.
    pub presets: BTreeMap<u8, PresetMap>,
}

impl Default for SystemConfig {
    fn default() -> Self {
        Self {
            device_serial: "B1001".to_string(),
            slots: None,
            co2_enabled: None,

            control_interval_secs: 10,
            cache_poll_interval_ms: 2000,
            preset_wait_secs: 10,

            tank: TankConfig::default(),
            co2: Co2Config::default(),
            bands: ControlBands::default(),
            light_window: DailyWindow::default(),

            presets: BTreeMap::new(),
        }
    }
}

/// Water tank geometry and alerting.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TankConfig {
    /// Distance from the ultrasonic sensor to the tank floor (cm).
    pub height_cm: f32,
    /// Water level at or below which the supply tank is Low (cm).
    pub low_threshold_cm: f32,
    /// Water level at or below which the supply tank is Critical (cm).
    pub critical_threshold_cm: f32,
    /// Minimum spacing between two alerts of the same category (seconds).
    pub alert_cooldown_secs: u32,
}

impl Default for TankConfig {
    fn default() -> Self {
        Self {
            height_cm: 30.0,
            low_threshold_cm: 5.0,
            critical_threshold_cm: 3.0,
            alert_cooldown_secs: 300, // 5 min
        }
    }
}

/// CO2 release mechanism.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Co2Config {
    /// Release starts this far below the target (ppm).
    pub low_margin_ppm: f32,
    /// Release stops this far above the release threshold (ppm).
    pub recover_margin_ppm: f32,
    /// Servo angle that opens the cartridge (degrees).
    pub release_angle_deg: u8,
    /// Servo angle that closes the cartridge (degrees).
    pub idle_angle_deg: u8,
    /// How long the servo is driven before the pulse is released (ms).
    pub servo_settle_ms: u32,
}

impl Default for Co2Config {
    fn default() -> Self {
        Self {
            low_margin_ppm: 150.0,
            recover_margin_ppm: 50.0,
            release_angle_deg: 90,
            idle_angle_deg: 0,
            servo_settle_ms: 1000,
        }
    }
}

/// Hysteresis dead-bands around each preset target.
///
/// `*_low` / `*_high` are distances below / above the target at which the
/// arm switches; values between them leave the actuator untouched.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ControlBands {
    /// Half-width of the temperature band (°C).
    pub temp_half_width_c: f32,
    /// Fan turns on above target + this (%RH).
    pub humidity_high: f32,
    /// Fan turns off below target − this (%RH).
    pub humidity_low: f32,
    /// Pump turns on above target + this (raw ADC, higher = drier).
    pub soil_dry: f32,
    /// Pump turns off below target − this (raw ADC).
    pub soil_wet: f32,
    /// Light turns on below target − this.
    pub light_low: f32,
    /// Light turns off above target + this.
    pub light_high: f32,
}

impl Default for ControlBands {
    fn default() -> Self {
        Self {
            temp_half_width_c: 2.0,
            humidity_high: 10.0,
            humidity_low: 5.0,
            soil_dry: 500.0,
            soil_wet: 200.0,
            light_low: 1000.0,
            light_high: 500.0,
        }
    }
}

/// Hardware model, encoded in the first two characters of the serial.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceModel {
    /// Premium, four slots, CO2 release fitted.
    A4,
    /// Premium, one slot, CO2 release fitted.
    A1,
    /// Standard, four slots.
    B4,
    /// Standard, one slot.
    B1,
}

impl DeviceModel {
    /// Decode the model from a serial.  Unknown prefixes fall back to `B1`.
    pub fn from_serial(serial: &str) -> Self {
        let prefix: String = serial.chars().take(2).collect::<String>().to_ascii_uppercase();
        match prefix.as_str() {
            "A4" => Self::A4,
            "A1" => Self::A1,
            "B4" => Self::B4,
            _ => Self::B1,
        }
    }

    pub fn slot_count(self) -> u8 {
        match self {
            Self::A4 | Self::B4 => 4,
            Self::A1 | Self::B1 => 1,
        }
    }

    pub fn has_co2(self) -> bool {
        matches!(self, Self::A4 | Self::A1)
    }
}

impl SystemConfig {
    pub fn model(&self) -> DeviceModel {
        DeviceModel::from_serial(&self.device_serial)
    }

    /// Slot numbers to operate, 1-based.
    pub fn slot_ids(&self) -> Vec<u8> {
        match &self.slots {
            Some(slots) => slots.clone(),
            None => (1..=self.model().slot_count()).collect(),
        }
    }

    pub fn has_co2(&self) -> bool {
        self.co2_enabled.unwrap_or_else(|| self.model().has_co2())
    }

    /// Reject values that would make the controller unsafe or chatter.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.device_serial.trim().is_empty() {
            return Err(ConfigError::ValidationFailed("device_serial is empty"));
        }
        let slots = self.slot_ids();
        if slots.is_empty() || slots.len() > MAX_SLOTS {
            return Err(ConfigError::ValidationFailed("slot count must be 1..=4"));
        }
        if slots.contains(&0) {
            return Err(ConfigError::ValidationFailed("slot ids are 1-based"));
        }
        if slots.iter().enumerate().any(|(i, id)| slots[..i].contains(id)) {
            return Err(ConfigError::ValidationFailed("duplicate slot id"));
        }
        if self.control_interval_secs == 0 {
            return Err(ConfigError::ValidationFailed("control_interval_secs must be > 0"));
        }
        if self.cache_poll_interval_ms == 0 {
            return Err(ConfigError::ValidationFailed("cache_poll_interval_ms must be > 0"));
        }

        let t = &self.tank;
        if !(t.critical_threshold_cm >= 0.0
            && t.critical_threshold_cm < t.low_threshold_cm
            && t.low_threshold_cm < t.height_cm)
        {
            return Err(ConfigError::ValidationFailed(
                "tank thresholds must satisfy 0 <= critical < low < height",
            ));
        }

        let c = &self.co2;
        if [c.low_margin_ppm, c.recover_margin_ppm]
            .iter()
            .any(|m| !m.is_finite() || *m < 0.0)
        {
            return Err(ConfigError::ValidationFailed("co2 margins must be finite and >= 0"));
        }
        if c.release_angle_deg > 180 || c.idle_angle_deg > 180 {
            return Err(ConfigError::ValidationFailed("servo angles must be <= 180"));
        }

        if self.light_window.start_hour > 23 || self.light_window.end_hour > 23 {
            return Err(ConfigError::ValidationFailed("light window hours must be 0..=23"));
        }

        let b = &self.bands;
        let widths = [
            b.temp_half_width_c,
            b.humidity_high,
            b.humidity_low,
            b.soil_dry,
            b.soil_wet,
            b.light_low,
            b.light_high,
        ];
        if widths.iter().any(|w| !w.is_finite() || *w < 0.0) {
            return Err(ConfigError::ValidationFailed("bands must be finite and >= 0"));
        }

        Ok(())
    }
}
