//! Application core: domain orchestration, no hardware I/O.
//!
//! The loop in [`service`] ties the tank monitor and the per-slot
//! controllers together.  Everything outside talks to it through the
//! **port traits** in [`ports`], so the core runs unchanged against the
//! simulated plant, real pins, or test mocks.

pub mod ports;
pub mod service;
