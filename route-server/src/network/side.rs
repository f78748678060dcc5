//! Side-of-road classification.
//!
//! Routes are directional and run along divided roads, so a pin on the far
//! side of the carriageway cannot board without crossing. Pins on the
//! right-hand side of the direction of travel are on the boarding side.

use crate::domain::{LatLng, Side};
use crate::geometry::{Polyline, Projection, bearing_deg};

/// Classifies pins relative to a route's direction of travel.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SideClassifier {
    on_corridor_m: f64,
    near_side_m: f64,
}

impl SideClassifier {
    /// Pins within `on_corridor_m` are always on the correct side; pins at
    /// `near_side_m` or beyond are always opposite.
    pub fn new(on_corridor_m: f64, near_side_m: f64) -> Self {
        Self {
            on_corridor_m,
            near_side_m,
        }
    }

    /// Classify from the pin's distance and the two bearings, in degrees.
    ///
    /// `pin_bearing` is measured from the projected point to the pin;
    /// `route_bearing` is the direction of travel at the projected point.
    pub fn classify(&self, distance_m: f64, pin_bearing: f64, route_bearing: f64) -> Side {
        if distance_m < self.on_corridor_m {
            return Side::Correct;
        }
        if distance_m >= self.near_side_m {
            return Side::Opposite;
        }

        if (pin_bearing - route_bearing).to_radians().sin() > 0.0 {
            Side::Correct
        } else {
            Side::Opposite
        }
    }

    /// Like [`classify`](Self::classify) without the far cutoff: a pin at
    /// any distance is on the correct side if it is to the right of travel.
    /// Used when judging walkable boarding points further from the pin.
    pub fn side_of_travel(&self, distance_m: f64, pin_bearing: f64, route_bearing: f64) -> Side {
        if distance_m < self.on_corridor_m
            || (pin_bearing - route_bearing).to_radians().sin() > 0.0
        {
            Side::Correct
        } else {
            Side::Opposite
        }
    }

    /// Classify `pin` given its projection onto `line`.
    pub fn classify_projection(&self, line: &Polyline, pin: LatLng, proj: &Projection) -> Side {
        // Bearings only matter in the side band; skip the trig otherwise
        if proj.distance_m < self.on_corridor_m {
            return Side::Correct;
        }
        if proj.distance_m >= self.near_side_m {
            return Side::Opposite;
        }

        match line.segment_bearing(proj.segment) {
            Some(route_bearing) => {
                self.classify(proj.distance_m, bearing_deg(proj.point, pin), route_bearing)
            }
            None => Side::Opposite,
        }
    }
}
