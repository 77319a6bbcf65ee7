//! Adapters: concrete implementations of the hexagonal port traits.
//!
//! | Adapter        | Implements                 | Connects to               |
//! |----------------|----------------------------|---------------------------|
//! | `config_file`  | ConfigPort                 | JSON file on disk         |
//! | `hardware`     | SensorPort, TankSensorPort | simulated plant and tank  |
//! |                | ActuatorDriver             | `embedded-hal` sim pins   |
//! |                | PresetRequestSink          | simulated preset service  |
//! | `log_sink`     | TelemetrySink, AlertSink   | log output                |
//! | `time`         | Clock                      | system + local wall clock |

pub mod config_file;
pub mod hardware;
pub mod log_sink;
pub mod time;
