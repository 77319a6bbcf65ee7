//! CO2 release state machine.
//!
//! ```text
//!            co2 < release
//!   Idle ───────────────────▶ Releasing
//!    ▲                            │
//!    └────────────────────────────┘
//!            co2 ≥ recovery
//! ```
//!
//! Between the two thresholds nothing happens, whatever the current state.
//! `recovery` is kept at least 10 ppm above `release` and never above the
//! target itself.

use crate::app::ports::ReleasePosition;
use crate::config::Co2Config;

/// Minimum gap between the release and recovery thresholds (ppm).
const MIN_GAP_PPM: f32 = 10.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Co2Thresholds {
    pub release: f32,
    pub recovery: f32,
}

impl Co2Thresholds {
    pub fn for_target(target_ppm: f32, cfg: &Co2Config) -> Self {
        let release = (target_ppm - cfg.low_margin_ppm).max(0.0);
        let recovery = target_ppm.min((release + cfg.recover_margin_ppm).max(release + MIN_GAP_PPM));
        Self { release, recovery }
    }
}

/// Tracks the last position the release mechanism was successfully sent to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Co2Arm {
    position: ReleasePosition,
}

impl Co2Arm {
    pub fn new() -> Self {
        Self {
            position: ReleasePosition::Idle,
        }
    }

    pub fn position(&self) -> ReleasePosition {
        self.position
    }

    /// Position to move to, if any.
    pub fn decide(&self, co2_ppm: f32, th: Co2Thresholds) -> Option<ReleasePosition> {
        match self.position {
            ReleasePosition::Idle if co2_ppm < th.release => Some(ReleasePosition::Releasing),
            ReleasePosition::Releasing if co2_ppm >= th.recovery => Some(ReleasePosition::Idle),
            _ => None,
        }
    }

    /// Record a position the driver accepted.
    pub fn commit(&mut self, position: ReleasePosition) {
        self.position = position;
    }
}

impl Default for Co2Arm {
    fn default() -> Self {
        Self::new()
    }
}
