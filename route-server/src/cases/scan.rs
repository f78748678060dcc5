//! Sampling a route for alternate boarding and alighting points.

use crate::domain::{LatLng, Side};
use crate::geometry::{
    DEGENERATE_SEGMENT_M, FRACTION_EPSILON, GeometryError, Polyline, Projection, bearing_deg,
    haversine_m, locate, substring,
};
use crate::network::SideClassifier;

/// Smallest step the scanner will take, whatever the config says.
const MIN_STEP_M: f64 = 0.5;

/// A position on a route close enough to a pin to walk to.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScanPoint {
    pub t: f64,
    pub point: LatLng,
    /// Walk from the pin, meters
    pub distance_m: f64,
    /// Which side of travel the pin is on, seen from this point
    pub side: Side,
}

/// The nearest point to `pin` whose fraction lies in `[t_lo, t_hi]`.
///
/// `None` for an empty or zero-length range.
pub fn nearest_in_range(
    line: &Polyline,
    pin: LatLng,
    t_lo: f64,
    t_hi: f64,
) -> Result<Option<Projection>, GeometryError> {
    if t_hi - t_lo <= FRACTION_EPSILON {
        return Ok(None);
    }

    let sub = substring(line, t_lo, t_hi)?;
    if sub.length_m() <= DEGENERATE_SEGMENT_M {
        return Ok(None);
    }

    let local = locate(&sub, pin)?;
    let t = (t_lo + local.t * (t_hi - t_lo)).clamp(t_lo, t_hi);
    let (segment, _) = line.segment_at_distance(t * line.length_m());

    Ok(Some(Projection {
        t,
        distance_m: local.distance_m,
        point: local.point,
        segment,
    }))
}

/// Samples a route at a fixed step around one pin.
#[derive(Debug, Clone, Copy)]
pub struct Scanner<'a> {
    line: &'a Polyline,
    pin: LatLng,
    radius_m: f64,
    step_m: f64,
    classifier: SideClassifier,
}

impl<'a> Scanner<'a> {
    pub fn new(
        line: &'a Polyline,
        pin: LatLng,
        radius_m: f64,
        step_m: f64,
        classifier: SideClassifier,
    ) -> Self {
        Self {
            line,
            pin,
            radius_m,
            step_m: step_m.max(MIN_STEP_M),
            classifier,
        }
    }

    /// Every sample in `[t_lo, t_hi]` within the radius, ordered by `t`.
    ///
    /// Samples fall every `step_m` along the line; the exact nearest point in
    /// the range is always included so a narrow range is never missed.
    pub fn scan(&self, t_lo: f64, t_hi: f64) -> Result<Vec<ScanPoint>, GeometryError> {
        if t_hi < t_lo {
            return Err(GeometryError::InvalidRange {
                start: t_lo,
                end: t_hi,
            });
        }

        let total = self.line.length_m();
        let d_lo = t_lo * total;
        let d_hi = t_hi * total;

        let mut points = Vec::new();
        let steps = ((d_hi - d_lo) / self.step_m).floor() as usize;
        for k in 0..=steps {
            let d = d_lo + k as f64 * self.step_m;
            self.push_sample(&mut points, d / total, self.line.point_at_distance(d));
        }
        self.push_sample(&mut points, t_hi, self.line.point_at_distance(d_hi));

        if let Some(nearest) = nearest_in_range(self.line, self.pin, t_lo, t_hi)? {
            self.push_sample(&mut points, nearest.t, nearest.point);
        }

        points.sort_by(|a, b| a.t.total_cmp(&b.t));
        points.dedup_by(|a, b| (a.t - b.t).abs() <= FRACTION_EPSILON);
        Ok(points)
    }

    fn push_sample(&self, points: &mut Vec<ScanPoint>, t: f64, point: LatLng) {
        let distance_m = haversine_m(point, self.pin);
        if distance_m > self.radius_m {
            return;
        }

        let (segment, _) = self.line.segment_at_distance(t * self.line.length_m());
        let side = match self.line.segment_bearing(segment) {
            Some(route_bearing) => self.classifier.side_of_travel(
                distance_m,
                bearing_deg(point, self.pin),
                route_bearing,
            ),
            None => Side::Opposite,
        };

        points.push(ScanPoint {
            t,
            point,
            distance_m,
            side,
        });
    }
}

/// The sample with the shortest walk, preferring the correct side of travel.
pub fn best_walk(points: &[ScanPoint]) -> Option<ScanPoint> {
    let nearest = |side: Option<Side>| {
        points
            .iter()
            .filter(|p| side.is_none_or(|s| p.side == s))
            .min_by(|a, b| a.distance_m.total_cmp(&b.distance_m))
            .copied()
    };
    nearest(Some(Side::Correct)).or_else(|| nearest(None))
}
