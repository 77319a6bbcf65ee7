//! Log-based telemetry and alert sinks.
//!
//! Implements [`TelemetrySink`] and [`AlertSink`] by writing one structured
//! line per message to the log, tagged with the topic the message would be
//! published to.  A network transport adapter would implement the same
//! traits and send the identical payload.

use chrono::Local;
use log::{info, warn};

use crate::app::ports::{AlertSink, SlotId, TelemetrySink};
use crate::telemetry::{encode_payload, farm_uid, notification_topic, sensor_topic, TelemetryFields};

/// Wall-clock format appended to alert messages.
const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Logs every telemetry frame as `TELEM | topic | payload`.
pub struct LogTelemetrySink {
    device_serial: String,
    frames: u64,
}

impl LogTelemetrySink {
    pub fn new(device_serial: impl Into<String>) -> Self {
        Self {
            device_serial: device_serial.into(),
            frames: 0,
        }
    }

    /// Frames published since construction.
    pub fn frames(&self) -> u64 {
        self.frames
    }
}

impl TelemetrySink for LogTelemetrySink {
    fn publish(&mut self, slot: SlotId, fields: &TelemetryFields) {
        let topic = sensor_topic(&farm_uid(&self.device_serial, slot));
        info!("TELEM | {topic} | {}", encode_payload(fields));
        self.frames += 1;
    }
}

/// Logs every alert on the device notification topic, timestamped.
pub struct LogAlertSink {
    topic: String,
}

impl LogAlertSink {
    pub fn new(device_serial: &str) -> Self {
        Self {
            topic: notification_topic(device_serial),
        }
    }

    pub fn topic(&self) -> &str {
        &self.topic
    }
}

/// `message (YYYY-MM-DD HH:MM:SS)`.
pub fn stamp(message: &str) -> String {
    format!("{message} ({})", Local::now().format(TIMESTAMP_FORMAT))
}

impl AlertSink for LogAlertSink {
    fn notify(&mut self, message: &str) {
        warn!("ALERT | {} | {}", self.topic, stamp(message));
    }
}
