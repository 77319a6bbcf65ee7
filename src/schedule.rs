//! Daily time-of-day windows.
//!
//! The grow-light arm only runs inside its active window; outside it the
//! light is forced off.  Windows are expressed in whole local hours and may
//! wrap around midnight.

use serde::{Deserialize, Serialize};

/// Half-open `[start_hour, end_hour)` window over local hours (0-23).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailyWindow {
    /// First active hour (inclusive).  E.g. 8 = 08:00.
    pub start_hour: u8,
    /// First inactive hour (exclusive).  E.g. 22 = 22:00.
    pub end_hour: u8,
}

impl DailyWindow {
    pub const fn new(start_hour: u8, end_hour: u8) -> Self {
        Self {
            start_hour,
            end_hour,
        }
    }

    /// Check if the given hour falls inside the window.
    pub fn contains(&self, hour: u8) -> bool {
        if self.start_hour <= self.end_hour {
            // e.g., 8..22 (daytime)
            hour >= self.start_hour && hour < self.end_hour
        } else {
            // e.g., 20..6 (overnight, wraps around midnight)
            hour >= self.start_hour || hour < self.end_hour
        }
    }
}

impl Default for DailyWindow {
    fn default() -> Self {
        Self::new(8, 22)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_window_is_eight_to_twenty_two() {
        let w = DailyWindow::default();
        assert!(!w.contains(7));
        assert!(w.contains(8));
        assert!(w.contains(21));
        assert!(!w.contains(22));
        assert!(!w.contains(0));
    }

    #[test]
    fn overnight_window_wraps_midnight() {
        let w = DailyWindow::new(20, 6);
        assert!(w.contains(23));
        assert!(w.contains(0));
        assert!(w.contains(5));
        assert!(!w.contains(6));
        assert!(!w.contains(12));
    }

    #[test]
    fn empty_window_never_contains() {
        let w = DailyWindow::new(9, 9);
        assert!((0..24).all(|h| !w.contains(h)));
    }
}
