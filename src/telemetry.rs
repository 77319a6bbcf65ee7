//! Telemetry frames and transport naming.
//!
//! A frame carries only the fields that were actually read this cycle.
//! On the wire a frame is a `key=value;key=value` string published to the
//! slot's sensor topic; the transport adapter decides how it leaves the box.

use crate::app::ports::SlotId;
use crate::sensors::SensorSnapshot;

/// Upper bound on fields per frame.
pub const MAX_FIELDS: usize = 8;

/// Named readings of one frame, in publish order.
pub type TelemetryFields = heapless::Vec<(&'static str, f32), MAX_FIELDS>;

/// Build a frame from a snapshot, skipping absent readings.
pub fn fields_from_snapshot(snap: &SensorSnapshot) -> TelemetryFields {
    [
        ("temp", snap.temperature_c),
        ("humidity", snap.humidity_pct),
        ("measuredLight", snap.light_raw.map(f32::from)),
        ("soil", snap.soil_raw.map(f32::from)),
        ("co2", snap.co2_ppm.map(f32::from)),
    ]
    .into_iter()
    .filter_map(|(key, value)| value.map(|v| (key, v)))
    .collect()
}

/// `key=value;key=value`, in frame order.
pub fn encode_payload(fields: &TelemetryFields) -> String {
    fields
        .iter()
        .map(|(k, v)| format!("{k}={v}"))
        .collect::<Vec<_>>()
        .join(";")
}

// ── Naming ────────────────────────────────────────────────────

/// `"{serial}:{slot}"`, the identifier the server keys a slot by.
pub fn farm_uid(device_serial: &str, slot: SlotId) -> String {
    format!("{device_serial}:{slot}")
}

pub fn sensor_topic(farm_uid: &str) -> String {
    format!("smartfarm/{farm_uid}/sensor/data")
}

/// Device-wide notification log topic (tank alerts).
pub fn notification_topic(device_serial: &str) -> String {
    format!("smartfarm/{device_serial}/sensor/nl")
}

/// Live preset updates pushed by the server.
pub fn preset_topic(farm_uid: &str) -> String {
    format!("smartfarm/{farm_uid}/preset")
}

pub fn preset_request_topic(farm_uid: &str) -> String {
    format!("smartfarm/{farm_uid}/preset/request")
}

/// Answer to a preset request (`none` when nothing is stored).
pub fn preset_response_topic(farm_uid: &str) -> String {
    format!("smartfarm/{farm_uid}/preset/response")
}
