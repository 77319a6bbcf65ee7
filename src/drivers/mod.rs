//! Actuator drivers.
//!
//! Every on/off actuator is a [`PinGroup`](pin_group::PinGroup) of one or
//! more `embedded-hal` output pins; the CO2 cartridge valve is a hobby
//! servo behind [`ServoRelease`](servo::ServoRelease).  [`sim`] supplies
//! pins that drive the simulated plant.

pub mod pin_group;
pub mod servo;
pub mod sim;
