//! Closed-loop control for one growing slot.
//!
//! - [`hysteresis`]: band decisions shared by the on/off arms
//! - [`co2`]: the CO2 release state machine
//! - [`climate`]: [`EnvironmentalController`](climate::EnvironmentalController),
//!   which runs every arm against a snapshot once per cycle

pub mod climate;
pub mod co2;
pub mod hysteresis;
