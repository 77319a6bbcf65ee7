//! Water tank safety monitor.
//!
//! The monitor runs **once per cycle before any slot** and keeps two
//! independent statuses:
//!
//! - **Supply tank** (ultrasonic, mounted at the top): water level =
//!   tank height − measured distance, classified Normal / Low / Critical.
//! - **Overflow tray** (digital water sensor): water present = Overflow.
//!
//! ## Fail-safe bias
//!
//! A failed read leaves the previous status in place.  A tank that was
//! Critical stays Critical until a real reading says otherwise, so a
//! flaky sensor can never silently re-enable the pumps.
//!
//! ## Alerts
//!
//! Each alarming evaluation *attempts* an alert for its category.  A
//! per-category cooldown gate lets at most one through per window, so a
//! tank that sits at Low for an hour produces one alert per cooldown
//! rather than one per cycle.

use core::fmt;
use std::time::{Duration, Instant};

use log::{debug, error, info, warn};

use crate::app::ports::{AlertSink, WateringInterlock};
use crate::config::TankConfig;

// ---------------------------------------------------------------------------
// Statuses
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SupplyStatus {
    Normal,
    Low,
    Critical,
}

impl fmt::Display for SupplyStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Normal => write!(f, "normal"),
            Self::Low => write!(f, "low"),
            Self::Critical => write!(f, "critical"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OverflowStatus {
    Normal,
    Overflow,
}

impl fmt::Display for OverflowStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Normal => write!(f, "normal"),
            Self::Overflow => write!(f, "overflow"),
        }
    }
}

/// Aggregate of both tanks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TankAlertStatus {
    Normal,
    Attention,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TankSummary {
    pub supply: SupplyStatus,
    pub overflow: OverflowStatus,
    pub alert_status: TankAlertStatus,
}

// ---------------------------------------------------------------------------
// Alert categories and cooldown gate
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlertCategory {
    SupplyLow,
    SupplyCritical,
    Overflow,
}

impl AlertCategory {
    const COUNT: usize = 3;

    const fn index(self) -> usize {
        match self {
            Self::SupplyLow => 0,
            Self::SupplyCritical => 1,
            Self::Overflow => 2,
        }
    }

    pub const fn severity(self) -> &'static str {
        match self {
            Self::SupplyCritical => "CRITICAL",
            Self::SupplyLow | Self::Overflow => "WARNING",
        }
    }

    pub const fn tank(self) -> &'static str {
        match self {
            Self::SupplyLow | Self::SupplyCritical => "supply tank",
            Self::Overflow => "overflow tank",
        }
    }
}

/// Last dispatch instant per category.
#[derive(Debug)]
struct AlertGate {
    cooldown: Duration,
    last_sent: [Option<Instant>; AlertCategory::COUNT],
}

impl AlertGate {
    fn new(cooldown: Duration) -> Self {
        Self {
            cooldown,
            last_sent: [None; AlertCategory::COUNT],
        }
    }

    /// Claim the category's slot if its cooldown has elapsed.
    fn try_claim(&mut self, category: AlertCategory, now: Instant) -> bool {
        let last = &mut self.last_sent[category.index()];
        if let Some(prev) = *last {
            if now.saturating_duration_since(prev) < self.cooldown {
                return false;
            }
        }
        *last = Some(now);
        true
    }
}

// ---------------------------------------------------------------------------
// WaterTankMonitor
// ---------------------------------------------------------------------------

/// Shared across all slots; written only by the control loop.
pub struct WaterTankMonitor {
    height_cm: f32,
    low_cm: f32,
    critical_cm: f32,
    supply: SupplyStatus,
    overflow: OverflowStatus,
    /// Water level from the last valid supply reading.
    last_level_cm: Option<f32>,
    gate: AlertGate,
}

impl WaterTankMonitor {
    pub fn new(config: &TankConfig) -> Self {
        Self {
            height_cm: config.height_cm,
            low_cm: config.low_threshold_cm,
            critical_cm: config.critical_threshold_cm,
            supply: SupplyStatus::Normal,
            overflow: OverflowStatus::Normal,
            last_level_cm: None,
            gate: AlertGate::new(Duration::from_secs(u64::from(config.alert_cooldown_secs))),
        }
    }

    /// Classify a water level (cm above the tank floor).
    pub fn classify_level(&self, level_cm: f32) -> SupplyStatus {
        if level_cm <= self.critical_cm {
            SupplyStatus::Critical
        } else if level_cm <= self.low_cm {
            SupplyStatus::Low
        } else {
            SupplyStatus::Normal
        }
    }

    /// Evaluate the supply tank from an ultrasonic distance.
    /// `None` (or a non-finite value) keeps the previous status.
    pub fn check_supply_tank(
        &mut self,
        distance_cm: Option<f32>,
        now: Instant,
        alerts: &mut impl AlertSink,
    ) -> SupplyStatus {
        let Some(distance) = distance_cm.filter(|d| d.is_finite()) else {
            warn!("supply tank: no reading, holding status {}", self.supply);
            return self.supply;
        };

        let level = self.height_cm - distance;
        let status = self.classify_level(level);
        self.last_level_cm = Some(level);

        if status != self.supply {
            match status {
                SupplyStatus::Normal => info!("TANK | supply {} -> normal ({level:.1} cm)", self.supply),
                _ => error!("TANK | supply {} -> {status} ({level:.1} cm)", self.supply),
            }
        } else {
            debug!("supply tank: {status} ({level:.1} cm)");
        }
        self.supply = status;

        match status {
            SupplyStatus::Critical => self.dispatch(
                AlertCategory::SupplyCritical,
                &format!("Supply tank water level critical ({level:.1} cm). Refill immediately."),
                now,
                alerts,
            ),
            SupplyStatus::Low => self.dispatch(
                AlertCategory::SupplyLow,
                &format!("Supply tank water level low ({level:.1} cm). Please refill."),
                now,
                alerts,
            ),
            SupplyStatus::Normal => {}
        }

        status
    }

    /// Evaluate the overflow tray.  `None` keeps the previous status.
    pub fn check_overflow_tank(
        &mut self,
        water_detected: Option<bool>,
        now: Instant,
        alerts: &mut impl AlertSink,
    ) -> OverflowStatus {
        let Some(detected) = water_detected else {
            warn!("overflow tank: no reading, holding status {}", self.overflow);
            return self.overflow;
        };

        let status = if detected {
            OverflowStatus::Overflow
        } else {
            OverflowStatus::Normal
        };

        if status != self.overflow {
            match status {
                OverflowStatus::Overflow => error!("TANK | overflow tray: water detected"),
                OverflowStatus::Normal => info!("TANK | overflow tray: dry again"),
            }
        }
        self.overflow = status;

        if status == OverflowStatus::Overflow {
            self.dispatch(
                AlertCategory::Overflow,
                "Water detected in the overflow tank. Check drainage.",
                now,
                alerts,
            );
        }

        status
    }

    pub fn get_status_summary(&self) -> TankSummary {
        let all_normal =
            self.supply == SupplyStatus::Normal && self.overflow == OverflowStatus::Normal;
        TankSummary {
            supply: self.supply,
            overflow: self.overflow,
            alert_status: if all_normal {
                TankAlertStatus::Normal
            } else {
                TankAlertStatus::Attention
            },
        }
    }

    pub fn supply_status(&self) -> SupplyStatus {
        self.supply
    }

    pub fn overflow_status(&self) -> OverflowStatus {
        self.overflow
    }

    pub fn water_level_cm(&self) -> Option<f32> {
        self.last_level_cm
    }

    // ── Internal ──────────────────────────────────────────────

    fn dispatch(
        &mut self,
        category: AlertCategory,
        message: &str,
        now: Instant,
        alerts: &mut impl AlertSink,
    ) {
        if !self.gate.try_claim(category, now) {
            debug!("{category:?} alert suppressed (cooldown)");
            return;
        }
        alerts.notify(&format!(
            "[{}] [{}] {}",
            category.severity(),
            category.tank(),
            message
        ));
    }
}

impl WateringInterlock for WaterTankMonitor {
    /// True while the supply tank is Critical or the tray overflows.
    fn should_block_watering(&self) -> bool {
        self.supply == SupplyStatus::Critical || self.overflow == OverflowStatus::Overflow
    }
}
