//! Point and segment measurements.

use geo::line_measures::{Bearing, Distance};
use geo::{Haversine, Point};

use crate::domain::LatLng;

/// Great-circle distance in meters.
pub fn haversine_m(a: LatLng, b: LatLng) -> f64 {
    Haversine.distance(Point::from(a), Point::from(b))
}

/// Initial great-circle bearing from `from` to `to`, degrees clockwise from
/// north in `[0, 360)`.
pub fn bearing_deg(from: LatLng, to: LatLng) -> f64 {
    Haversine
        .bearing(Point::from(from), Point::from(to))
        .rem_euclid(360.0)
}

/// Sum of great-circle distances between consecutive points, in meters.
pub fn length(points: &[LatLng]) -> f64 {
    points.windows(2).map(|w| haversine_m(w[0], w[1])).sum()
}

/// Nearest point on a segment to some query point.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SegmentProjection {
    /// The nearest point on the segment
    pub point: LatLng,
    /// Position of `point` along the segment in `[0, 1]`
    pub fraction: f64,
    /// Great-circle distance from the query point to `point`
    pub distance_m: f64,
}

/// Project `p` onto segment `a`-`b`.
///
/// Works in an equirectangular frame anchored at `a`, which is accurate at
/// street scale. A zero-length segment projects everything onto `a`.
pub fn closest_point_on_segment(p: LatLng, a: LatLng, b: LatLng) -> SegmentProjection {
    let scale = a.lat().to_radians().cos();

    let abx = (b.lng() - a.lng()) * scale;
    let aby = b.lat() - a.lat();
    let apx = (p.lng() - a.lng()) * scale;
    let apy = p.lat() - a.lat();

    let len2 = abx * abx + aby * aby;
    let fraction = if len2 > 0.0 {
        ((apx * abx + apy * aby) / len2).clamp(0.0, 1.0)
    } else {
        0.0
    };

    let point = a.lerp(&b, fraction);

    SegmentProjection {
        point,
        fraction,
        distance_m: haversine_m(p, point),
    }
}

/// Distance in meters from `p` to the nearest point of segment `a`-`b`.
pub fn point_to_segment_distance(p: LatLng, a: LatLng, b: LatLng) -> f64 {
    closest_point_on_segment(p, a, b).distance_m
}

/// Distance in meters from `p` to the nearest point of the path through
/// `points`. Infinite for fewer than 2 points.
pub fn distance_to_path(p: LatLng, points: &[LatLng]) -> f64 {
    points
        .windows(2)
        .map(|w| point_to_segment_distance(p, w[0], w[1]))
        .fold(f64::INFINITY, f64::min)
}

/// Whether `p` lies within `radius_m` of `center`.
pub fn within_radius(p: LatLng, center: LatLng, radius_m: f64) -> bool {
    haversine_m(p, center) <= radius_m
}
