//! Two-threshold band decisions shared by every control arm.
//!
//! A [`Band`] is `[low, high]` around a target.  Readings strictly outside
//! it produce a demand; readings inside (edges included) hold whatever the
//! actuator is currently doing.

/// Where a reading sits relative to a band.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Zone {
    Below,
    Inside,
    Above,
}

/// What an arm wants from its actuator this cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Demand {
    On,
    Off,
    /// Dead-band: leave the actuator alone.
    Hold,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Band {
    pub low: f32,
    pub high: f32,
}

impl Band {
    /// `[target - below, target + above]`.
    pub fn around(target: f32, below: f32, above: f32) -> Self {
        Self {
            low: target - below,
            high: target + above,
        }
    }

    pub fn zone(&self, value: f32) -> Zone {
        if value < self.low {
            Zone::Below
        } else if value > self.high {
            Zone::Above
        } else {
            Zone::Inside
        }
    }

    /// On above the band, off below it (fan on humidity, pump on dry soil).
    pub fn on_above(&self, value: f32) -> Demand {
        match self.zone(value) {
            Zone::Above => Demand::On,
            Zone::Below => Demand::Off,
            Zone::Inside => Demand::Hold,
        }
    }

    /// On below the band, off above it (grow light).
    pub fn on_below(&self, value: f32) -> Demand {
        match self.zone(value) {
            Zone::Below => Demand::On,
            Zone::Above => Demand::Off,
            Zone::Inside => Demand::Hold,
        }
    }
}
