//! SmartFarm controller library.
//!
//! Exposes the domain logic (tank safety, per-slot control, orchestration)
//! and the host adapters for integration testing and for the binary.
//! Hardware is reached only through the traits in [`app::ports`].

#![deny(unused_must_use)]

pub mod adapters;
pub mod app;
pub mod config;
pub mod control;
pub mod drivers;
pub mod error;
pub mod preset;
pub mod safety;
pub mod schedule;
pub mod sensors;
pub mod shutdown;
pub mod telemetry;
