//! Per-slot target presets.
//!
//! Presets arrive from the remote source as flat `key=value;key=value`
//! payloads and are kept as string maps.  The controller reads a
//! [`PresetMap`] once per cycle and turns it into a numeric [`Preset`],
//! substituting a fixed default for any missing or unparseable field.

use std::collections::BTreeMap;
use std::sync::{Arc, PoisonError, RwLock};
use std::time::{Duration, Instant};

use log::{debug, info, warn};

use crate::app::ports::{PresetRequestSink, PresetSource, SlotId};
use crate::shutdown::Shutdown;

/// Raw preset as delivered by the remote source.
pub type PresetMap = BTreeMap<String, String>;

pub const KEY_TEMP: &str = "OptimalTemp";
pub const KEY_HUMIDITY: &str = "OptimalHumidity";
pub const KEY_LIGHT: &str = "LightIntensity";
pub const KEY_SOIL: &str = "SoilMoisture";
pub const KEY_CO2: &str = "Co2Level";

/// Payload the remote source sends when it has no stored preset.
pub const NO_PRESET: &str = "none";

/// How often the startup wait re-checks readiness.
const READY_POLL: Duration = Duration::from_millis(100);

/// Numeric setpoints for one slot.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Preset {
    /// °C
    pub optimal_temp: f32,
    /// %RH
    pub optimal_humidity: f32,
    /// Raw light ADC / lux
    pub light_intensity: f32,
    /// Raw soil ADC (higher = drier)
    pub soil_moisture: f32,
    /// ppm
    pub co2_level: f32,
}

impl Default for Preset {
    fn default() -> Self {
        Self {
            optimal_temp: 25.0,
            optimal_humidity: 60.0,
            light_intensity: 5000.0,
            soil_moisture: 2000.0,
            co2_level: 800.0,
        }
    }
}

impl Preset {
    /// Build from a raw map, field by field.
    pub fn from_map(map: &PresetMap) -> Self {
        let d = Self::default();
        Self {
            optimal_temp: field(map, KEY_TEMP, d.optimal_temp),
            optimal_humidity: field(map, KEY_HUMIDITY, d.optimal_humidity),
            light_intensity: field(map, KEY_LIGHT, d.light_intensity),
            soil_moisture: field(map, KEY_SOIL, d.soil_moisture),
            co2_level: field(map, KEY_CO2, d.co2_level),
        }
    }
}

fn field(map: &PresetMap, key: &str, default: f32) -> f32 {
    match map.get(key).map(|v| v.trim().parse::<f32>()) {
        Some(Ok(v)) if v.is_finite() => v,
        Some(_) => {
            debug!("preset {key} unparseable, using default {default}");
            default
        }
        None => default,
    }
}

/// Parse a `key=value;key=value` payload.  Pairs without `=` are skipped;
/// keys and values are trimmed.
pub fn parse_payload(payload: &str) -> PresetMap {
    payload
        .split(';')
        .filter_map(|pair| pair.split_once('='))
        .map(|(k, v)| (k.trim().to_string(), v.trim().to_string()))
        .filter(|(k, _)| !k.is_empty())
        .collect()
}

/// Inverse of [`parse_payload`].
pub fn format_payload(map: &PresetMap) -> String {
    map.iter()
        .map(|(k, v)| format!("{k}={v}"))
        .collect::<Vec<_>>()
        .join(";")
}

// ───────────────────────────────────────────────────────────────
// PresetStore (one slot)
// ───────────────────────────────────────────────────────────────

/// Current preset of one slot plus whether the remote source has answered.
#[derive(Debug, Clone, Default)]
pub struct PresetStore {
    current: PresetMap,
    received: bool,
}

impl PresetStore {
    /// Merge a live update pushed by the remote source.
    /// Returns `true` if any field was carried.
    pub fn apply_update(&mut self, payload: &str) -> bool {
        let params = parse_payload(payload);
        if params.is_empty() {
            return false;
        }
        self.current.extend(params);
        true
    }

    /// Handle the answer to a preset request.  `none` means the source has
    /// nothing stored and the slot runs on defaults.
    pub fn apply_response(&mut self, payload: &str) {
        if payload.trim() == NO_PRESET {
            self.received = true;
            return;
        }
        if self.apply_update(payload) {
            self.received = true;
        }
    }

    pub fn is_ready(&self) -> bool {
        self.received
    }

    pub fn snapshot(&self) -> PresetMap {
        self.current.clone()
    }
}

// ───────────────────────────────────────────────────────────────
// PresetBoard (all slots, shared with the transport)
// ───────────────────────────────────────────────────────────────

/// Shared preset table.  Cloned handles see the same stores, so a transport
/// thread can apply updates while the control loop reads snapshots.
#[derive(Debug, Clone, Default)]
pub struct PresetBoard {
    stores: Arc<RwLock<BTreeMap<SlotId, PresetStore>>>,
}

impl PresetBoard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, slot: SlotId, store: PresetStore) {
        self.write(|stores| {
            stores.insert(slot, store);
        });
    }

    fn insert_if_absent(&self, slot: SlotId) {
        self.write(|stores| {
            stores.entry(slot).or_default();
        });
    }

    pub fn apply_update(&self, slot: SlotId, payload: &str) -> bool {
        let applied = self.write(|stores| {
            stores
                .entry(slot)
                .or_default()
                .apply_update(payload)
        });
        if applied {
            info!("PRESET | slot {slot} updated, applies from next cycle");
        }
        applied
    }

    pub fn apply_response(&self, slot: SlotId, payload: &str) {
        self.write(|stores| stores.entry(slot).or_default().apply_response(payload));
    }

    pub fn is_ready(&self, slot: SlotId) -> bool {
        self.read(|stores| stores.get(&slot).is_some_and(PresetStore::is_ready))
    }

    fn read<R>(&self, f: impl FnOnce(&BTreeMap<SlotId, PresetStore>) -> R) -> R {
        let guard = self.stores.read().unwrap_or_else(PoisonError::into_inner);
        f(&guard)
    }

    fn write<R>(&self, f: impl FnOnce(&mut BTreeMap<SlotId, PresetStore>) -> R) -> R {
        let mut guard = self.stores.write().unwrap_or_else(PoisonError::into_inner);
        f(&mut guard)
    }
}

impl PresetSource for PresetBoard {
    fn get_preset(&self, slot: SlotId) -> PresetMap {
        self.read(|stores| stores.get(&slot).map(PresetStore::snapshot).unwrap_or_default())
    }
}

// ───────────────────────────────────────────────────────────────
// Startup request
// ───────────────────────────────────────────────────────────────

/// Request every slot's preset, then wait until all have answered, `timeout`
/// passes or shutdown fires.
///
/// Returns the slots that got no answer; they run on defaults until a live
/// update arrives.
pub fn await_presets(
    board: &PresetBoard,
    slots: &[SlotId],
    requests: &mut impl PresetRequestSink,
    shutdown: &Shutdown,
    timeout: Duration,
) -> Vec<SlotId> {
    for &slot in slots {
        board.insert_if_absent(slot);
        requests.request(slot);
    }

    let deadline = Instant::now() + timeout;
    while !slots.iter().all(|&s| board.is_ready(s)) {
        let now = Instant::now();
        if now >= deadline || shutdown.wait_timeout((deadline - now).min(READY_POLL)) {
            break;
        }
    }

    let pending: Vec<SlotId> = slots.iter().copied().filter(|&s| !board.is_ready(s)).collect();
    for &slot in slots {
        if pending.contains(&slot) {
            warn!("PRESET | slot {slot}: no answer within {timeout:?}, running on defaults");
        } else {
            info!("PRESET | slot {slot}: preset received");
        }
    }
    pending
}
