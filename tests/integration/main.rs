//! Integration test driver for `tests/integration/` submodule.
//!
//! Each `mod` below maps to a file that exercises a specific subsystem
//! against mock adapters.  All tests run on the host with no real hardware
//! required.

mod control_loop_tests;
mod mock_hw;
mod sim_farm_tests;
mod tank_monitor_tests;
