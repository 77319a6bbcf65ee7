//! System clock adapter.
//!
//! Monotonic time comes from `std::time::Instant`; the hour-of-day for the
//! light window comes from the local wall clock via `chrono`.

use std::time::Instant;

use chrono::{Local, Timelike};

use crate::app::ports::Clock;

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl SystemClock {
    pub fn new() -> Self {
        Self
    }
}

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }

    fn hour(&self) -> u8 {
        // chrono guarantees 0..=23
        Local::now().hour() as u8
    }
}
