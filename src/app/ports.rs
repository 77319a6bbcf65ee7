//! Port traits: the hexagonal boundary between domain logic and the outside world.
//!
//! ```text
//!   Adapter ──▶ Port trait ──▶ ControlLoop / EnvironmentalController (domain)
//! ```
//!
//! Driven adapters (sensors, actuators, telemetry, alerts, presets, clock,
//! config storage) implement these traits.  The domain core consumes them
//! via generics or boxed trait objects and never touches hardware directly.

use std::time::Instant;

use crate::config::SystemConfig;
use crate::error::{ActuatorError, SensorError};
use crate::preset::PresetMap;
use crate::sensors::{SensorSnapshot, TankReadings};
use crate::telemetry::TelemetryFields;

/// 1-based slot number within a device.
pub type SlotId = u8;

// ───────────────────────────────────────────────────────────────
// Sensor port (driven adapter: hardware → domain)
// ───────────────────────────────────────────────────────────────

/// One physical sensor.  Reads may be slow and may fail; a failure is
/// reported as an error and never panics the caller on purpose.
pub trait SensorSource {
    type Reading: Copy;

    fn read(&mut self) -> Result<Self::Reading, SensorError>;
}

impl<S: SensorSource + ?Sized> SensorSource for Box<S> {
    type Reading = S::Reading;

    fn read(&mut self) -> Result<Self::Reading, SensorError> {
        (**self).read()
    }
}

/// Read-side port for one slot: the loop calls this once per cycle.
pub trait SensorPort {
    /// Cached and inline readings combined into one snapshot.
    fn read_all(&mut self) -> SensorSnapshot;

    /// Stop any background polling.  Called once at shutdown.
    fn shutdown(&mut self) {}
}

/// Read-side port for the shared water tanks.
pub trait TankSensorPort {
    fn read_tanks(&mut self) -> TankReadings;
}

// ───────────────────────────────────────────────────────────────
// Actuator ports (driven adapter: domain → hardware)
// ───────────────────────────────────────────────────────────────

/// A single logical on/off actuator, however many pins back it.
pub trait ActuatorDriver {
    fn turn_on(&mut self) -> Result<(), ActuatorError>;

    fn turn_off(&mut self) -> Result<(), ActuatorError>;

    /// Software view of the actuator, updated only by successful commands.
    fn is_on(&self) -> bool;
}

/// Discrete positions of the CO2 cartridge release mechanism.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReleasePosition {
    Idle,
    Releasing,
}

/// CO2 release actuator (servo-driven cartridge valve).
pub trait Co2ReleaseDriver {
    fn set_position(&mut self, position: ReleasePosition) -> Result<(), ActuatorError>;
}

// ───────────────────────────────────────────────────────────────
// Safety interlock
// ───────────────────────────────────────────────────────────────

/// Predicate that overrides irrigation.  Implementations must be pure.
pub trait WateringInterlock {
    fn should_block_watering(&self) -> bool;
}

impl WateringInterlock for bool {
    fn should_block_watering(&self) -> bool {
        *self
    }
}

// ───────────────────────────────────────────────────────────────
// Outbound sinks (domain → transport / logging)
// ───────────────────────────────────────────────────────────────

/// Sensor telemetry, fire-and-forget.
pub trait TelemetrySink {
    fn publish(&mut self, slot: SlotId, fields: &TelemetryFields);
}

/// Human-readable alert notifications, fire-and-forget.
pub trait AlertSink {
    fn notify(&mut self, message: &str);
}

// ───────────────────────────────────────────────────────────────
// Inbound presets (remote source → domain)
// ───────────────────────────────────────────────────────────────

/// Snapshot read of a slot's preset.  The remote side may change it at any
/// time between cycles.
pub trait PresetSource {
    fn get_preset(&self, slot: SlotId) -> PresetMap;
}

/// Asks the remote source for a slot's stored preset.  The answer arrives
/// asynchronously through [`PresetBoard::apply_response`](crate::preset::PresetBoard::apply_response).
pub trait PresetRequestSink {
    fn request(&mut self, slot: SlotId);
}

// ───────────────────────────────────────────────────────────────
// Clock
// ───────────────────────────────────────────────────────────────

pub trait Clock {
    /// Monotonic time, used for alert cooldowns.
    fn now(&self) -> Instant;

    /// Local hour-of-day (0-23), used for the light window.
    fn hour(&self) -> u8;
}

// ───────────────────────────────────────────────────────────────
// Configuration port (driven adapter: domain ↔ persistent config)
// ───────────────────────────────────────────────────────────────

/// Loads and persists system configuration.
///
/// Implementations MUST validate before persisting and reject invalid
/// ranges with [`ConfigError::ValidationFailed`] instead of clamping.
pub trait ConfigPort {
    /// Load configuration.  Returns [`SystemConfig::default()`] if no stored
    /// config exists.
    fn load(&self) -> Result<SystemConfig, ConfigError>;

    /// Validate and persist configuration.
    fn save(&self, config: &SystemConfig) -> Result<(), ConfigError>;
}

/// Errors from [`ConfigPort`] operations.
#[derive(Debug)]
pub enum ConfigError {
    /// Stored config failed to parse.
    Corrupted(String),
    /// A config field failed range validation.
    ValidationFailed(&'static str),
    /// Generic I/O error from the storage backend.
    Io(std::io::Error),
}

impl core::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Corrupted(msg) => write!(f, "config corrupted: {}", msg),
            Self::ValidationFailed(msg) => write!(f, "validation failed: {}", msg),
            Self::Io(e) => write!(f, "I/O error: {}", e),
        }
    }
}

impl std::error::Error for ConfigError {}

impl From<std::io::Error> for ConfigError {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e)
    }
}
