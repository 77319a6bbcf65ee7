//! Sensor subsystem: per-slot and device-wide sensor aggregation.
//!
//! [`SlotSensors`] owns everything one slot reads: the background caches
//! for the unreliable climate and CO2 sensors, plus the light and soil
//! ADC channels that are read inline.  [`TankSensors`] owns the two water
//! tank sensors shared by every slot.  Both produce plain snapshots that
//! the control loop hands to the domain logic.

pub mod cache;
pub mod sim;

use log::{debug, info};

use crate::app::ports::{SensorPort, SensorSource, TankSensorPort};
use crate::error::Result;
use cache::SensorCache;

// ---------------------------------------------------------------------------
// Readings
// ---------------------------------------------------------------------------

/// A point-in-time snapshot of one slot's sensors.  `None` = not available
/// this cycle.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SensorSnapshot {
    /// Air temperature (°C).
    pub temperature_c: Option<f32>,
    /// Relative humidity (%).
    pub humidity_pct: Option<f32>,
    /// Raw light ADC value.
    pub light_raw: Option<u16>,
    /// Raw soil moisture ADC value (higher = drier).
    pub soil_raw: Option<u16>,
    /// CO2 concentration (ppm).
    pub co2_ppm: Option<u16>,
}

/// Temperature and humidity, read together from the same sensor.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClimateReading {
    pub temperature_c: f32,
    pub humidity_pct: f32,
}

/// Shared tank readings for one cycle.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct TankReadings {
    /// Ultrasonic sensor to water surface (cm).
    pub distance_cm: Option<f32>,
    /// Water detected in the overflow tray.
    pub water_detected: Option<bool>,
}

pub type ClimateSource = Box<dyn SensorSource<Reading = ClimateReading> + Send>;
pub type Co2Source = Box<dyn SensorSource<Reading = u16> + Send>;
pub type AdcSource = Box<dyn SensorSource<Reading = u16>>;
pub type DistanceSource = Box<dyn SensorSource<Reading = f32>>;
pub type PresenceSource = Box<dyn SensorSource<Reading = bool>>;

// ---------------------------------------------------------------------------
// SlotSensors
// ---------------------------------------------------------------------------

/// Everything one slot reads.  Owns its caches; nothing is shared across
/// slots.
pub struct SlotSensors {
    climate: SensorCache<ClimateReading>,
    co2: Option<SensorCache<u16>>,
    light: AdcSource,
    soil: AdcSource,
}

impl SlotSensors {
    /// Start the caches and take ownership of the inline channels.
    pub fn start(
        climate: ClimateSource,
        co2: Option<Co2Source>,
        light: AdcSource,
        soil: AdcSource,
        poll_period: std::time::Duration,
    ) -> Result<Self> {
        let mut climate_cache = SensorCache::new("climate", poll_period);
        climate_cache.start(climate)?;

        let co2_cache = match co2 {
            Some(source) => {
                let mut cache = SensorCache::new("co2", poll_period);
                cache.start(source)?;
                Some(cache)
            }
            None => None,
        };

        Ok(Self {
            climate: climate_cache,
            co2: co2_cache,
            light,
            soil,
        })
    }
}

impl SensorPort for SlotSensors {
    fn read_all(&mut self) -> SensorSnapshot {
        let climate = self.climate.get();
        SensorSnapshot {
            temperature_c: climate.map(|c| c.temperature_c).filter(|t| t.is_finite()),
            humidity_pct: climate.map(|c| c.humidity_pct).filter(|h| h.is_finite()),
            light_raw: read_inline("light", &mut self.light),
            soil_raw: read_inline("soil", &mut self.soil),
            co2_ppm: self.co2.as_ref().and_then(SensorCache::get),
        }
    }

    fn shutdown(&mut self) {
        self.climate.stop();
        let stats = self.climate.stats();
        info!(
            "climate cache stopped ({} ok / {} failed polls)",
            stats.successes, stats.failures
        );
        if let Some(co2) = &mut self.co2 {
            co2.stop();
            let stats = co2.stats();
            info!(
                "co2 cache stopped ({} ok / {} failed polls)",
                stats.successes, stats.failures
            );
        }
    }
}

// ---------------------------------------------------------------------------
// TankSensors
// ---------------------------------------------------------------------------

/// The supply-tank ultrasonic sensor and the overflow-tray water sensor.
pub struct TankSensors {
    supply: DistanceSource,
    overflow: PresenceSource,
}

impl TankSensors {
    pub fn new(supply: DistanceSource, overflow: PresenceSource) -> Self {
        Self { supply, overflow }
    }
}

impl TankSensorPort for TankSensors {
    fn read_tanks(&mut self) -> TankReadings {
        TankReadings {
            distance_cm: read_inline("supply tank", &mut self.supply),
            water_detected: read_inline("overflow tank", &mut self.overflow),
        }
    }
}

/// A failed inline read only costs this cycle's value.
fn read_inline<S: SensorSource + ?Sized>(name: &str, source: &mut S) -> Option<S::Reading> {
    match source.read() {
        Ok(v) => Some(v),
        Err(e) => {
            debug!("{name}: read failed ({e})");
            None
        }
    }
}
