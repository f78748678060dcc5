//! Distance-based fare calculation.
//!
//! `fare(meters) = max(minimum, ceil(meters / 1000 * per_km))`. A transfer
//! itinerary pays each leg's fare independently; there is no combined
//! discount.

use std::fmt;
use std::iter::Sum;
use std::ops::Add;

/// A price in whole currency units.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Fare(u32);

impl Fare {
    pub const fn new(units: u32) -> Self {
        Self(units)
    }

    pub const fn units(&self) -> u32 {
        self.0
    }
}

impl Add for Fare {
    type Output = Fare;

    fn add(self, rhs: Fare) -> Fare {
        Fare(self.0.saturating_add(rhs.0))
    }
}

impl Sum for Fare {
    fn sum<I: Iterator<Item = Fare>>(iter: I) -> Fare {
        iter.fold(Fare::default(), Add::add)
    }
}

impl fmt::Display for Fare {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Default price per kilometer.
pub const FARE_PER_KM: f64 = 2.20;

/// Default minimum fare for any ride.
pub const MINIMUM_FARE: u32 = 13;

/// Fare parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FareTable {
    /// Price per kilometer ridden.
    pub per_km: f64,

    /// Floor applied to every leg.
    pub minimum: u32,
}

impl FareTable {
    pub fn new(per_km: f64, minimum: u32) -> Self {
        Self { per_km, minimum }
    }

    /// Price one leg of `meters`.
    ///
    /// Negative or non-finite distances are priced at the minimum.
    pub fn fare(&self, meters: f64) -> Fare {
        if !meters.is_finite() || meters <= 0.0 {
            return Fare(self.minimum);
        }

        // Round away float noise first so 5 km at 2.20/km prices at 11, not 12
        let raw = (meters / 1000.0 * self.per_km * 1e6).round() / 1e6;
        let priced = raw.ceil().min(u32::MAX as f64) as u32;
        Fare(priced.max(self.minimum))
    }
}

impl Default for FareTable {
    fn default() -> Self {
        Self {
            per_km: FARE_PER_KM,
            minimum: MINIMUM_FARE,
        }
    }
}
