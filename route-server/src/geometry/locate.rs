//! Line referencing: point-to-fraction and fraction-range-to-line.

use crate::domain::LatLng;

use super::{GeometryError, Polyline, check_fraction, closest_point_on_segment};

/// Where a point lands when projected onto a polyline.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Projection {
    /// Fractional position of `point` along the line
    pub t: f64,
    /// Distance from the query point to `point`, meters
    pub distance_m: f64,
    /// Nearest point on the line
    pub point: LatLng,
    /// Index of the segment `point` lies on
    pub segment: usize,
}

/// Project `p` onto `line`.
///
/// The nearest non-degenerate segment wins; on ties the earliest segment is
/// kept, so a point at a shared vertex resolves to the smaller `t`.
///
/// # Errors
///
/// [`GeometryError::Degenerate`] if the line has zero length.
pub fn locate(line: &Polyline, p: LatLng) -> Result<Projection, GeometryError> {
    let total = line.length_m();
    if total <= super::DEGENERATE_SEGMENT_M {
        return Err(GeometryError::Degenerate);
    }

    let vertices = line.vertices();
    let cumulative = line.cumulative();

    let mut best: Option<Projection> = None;
    for i in 0..line.segment_count() {
        if line.is_degenerate_segment(i) {
            continue;
        }

        let proj = closest_point_on_segment(p, vertices[i], vertices[i + 1]);
        if best.is_some_and(|b| b.distance_m <= proj.distance_m) {
            continue;
        }

        let along = cumulative[i] + proj.fraction * line.segment_length(i);
        best = Some(Projection {
            t: (along / total).clamp(0.0, 1.0),
            distance_m: proj.distance_m,
            point: proj.point,
            segment: i,
        });
    }

    best.ok_or(GeometryError::Degenerate)
}

/// Extract the part of `line` between fractions `t1` and `t2`.
///
/// The result starts at the point at `t1`, keeps every original vertex
/// strictly between the two, and ends at the point at `t2`. Equal fractions
/// give a two-vertex, zero-length line.
///
/// # Errors
///
/// [`GeometryError::InvalidRange`] if `t1 > t2`; a wrapping ride on a loop
/// is two calls joined with [`Polyline::concat`]. Fractions outside
/// `[0, 1]` or non-finite fractions are rejected as well.
pub fn substring(line: &Polyline, t1: f64, t2: f64) -> Result<Polyline, GeometryError> {
    let t1 = check_fraction(t1)?;
    let t2 = check_fraction(t2)?;
    if t1 > t2 {
        return Err(GeometryError::InvalidRange { start: t1, end: t2 });
    }

    let total = line.length_m();
    let d1 = t1 * total;
    let d2 = t2 * total;

    let mut out = Vec::with_capacity(line.vertices().len() + 2);
    out.push(line.point_at_distance(d1));
    out.extend(
        line.vertices()
            .iter()
            .zip(line.cumulative())
            .filter(|&(_, c)| d1 < *c && *c < d2)
            .map(|(v, _)| *v),
    );
    out.push(line.point_at_distance(d2));

    Polyline::new(out)
}
