//! Geometry kernel.
//!
//! Pure, deterministic functions over polylines in geographic coordinates:
//! nearest-point projection ([`locate`]), sub-polyline extraction
//! ([`substring`]), geodesic length, segment intersection and radius tests.
//!
//! Fractional positions (`t`) are always measured as the ratio of cumulative
//! geodesic length from the first vertex, never as a vertex index.
//! Planar work (closest point on a segment, segment crossings) is done in
//! degree space with a local longitude scale; distances and lengths are
//! great-circle meters.

mod intersect;
mod locate;
mod measure;
mod polyline;

pub use intersect::{Crossing, intersect};
pub use locate::{Projection, locate, substring};
pub use measure::{
    SegmentProjection, bearing_deg, closest_point_on_segment, distance_to_path, haversine_m,
    length, point_to_segment_distance, within_radius,
};
pub use polyline::Polyline;

/// Segments shorter than this are treated as zero-length and skipped.
pub const DEGENERATE_SEGMENT_M: f64 = 1e-6;

/// Tolerance when comparing fractional positions.
pub const FRACTION_EPSILON: f64 = 1e-9;

/// Errors from kernel operations called outside their contract.
#[derive(Debug, Clone, Copy, PartialEq, thiserror::Error)]
pub enum GeometryError {
    /// Fewer than two vertices
    #[error("polyline needs at least 2 vertices, got {0}")]
    TooFewVertices(usize),

    /// Every segment has zero length, so no fraction can be computed
    #[error("polyline has zero length")]
    Degenerate,

    /// Fractional position outside `[0, 1]`
    #[error("fraction {0} is outside [0, 1]")]
    FractionOutOfRange(f64),

    /// Fractional position is NaN or infinite
    #[error("fraction is not a finite number")]
    NonFinite,

    /// `substring` called with start after end; wraparound needs two calls
    #[error("invalid range: start {start} is after end {end}")]
    InvalidRange { start: f64, end: f64 },
}

/// Validate a fractional position, absorbing float noise at the bounds.
pub(crate) fn check_fraction(t: f64) -> Result<f64, GeometryError> {
    if !t.is_finite() {
        return Err(GeometryError::NonFinite);
    }
    if !(-FRACTION_EPSILON..=1.0 + FRACTION_EPSILON).contains(&t) {
        return Err(GeometryError::FractionOutOfRange(t));
    }
    Ok(t.clamp(0.0, 1.0))
}
