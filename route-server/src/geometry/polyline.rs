//! Polyline with precomputed cumulative lengths.

use crate::domain::LatLng;

use super::{DEGENERATE_SEGMENT_M, GeometryError, bearing_deg, haversine_m};

/// An ordered sequence of at least two points.
///
/// `cumulative[i]` is the geodesic length from the first vertex to vertex
/// `i`, so fractional positions resolve with a binary search.
#[derive(Debug, Clone, PartialEq)]
pub struct Polyline {
    vertices: Vec<LatLng>,
    cumulative: Vec<f64>,
}

impl Polyline {
    pub fn new(vertices: Vec<LatLng>) -> Result<Self, GeometryError> {
        if vertices.len() < 2 {
            return Err(GeometryError::TooFewVertices(vertices.len()));
        }

        let mut cumulative = Vec::with_capacity(vertices.len());
        let mut total = 0.0;
        cumulative.push(total);
        for pair in vertices.windows(2) {
            total += haversine_m(pair[0], pair[1]);
            cumulative.push(total);
        }

        Ok(Self {
            vertices,
            cumulative,
        })
    }

    pub fn vertices(&self) -> &[LatLng] {
        &self.vertices
    }

    pub fn into_vertices(self) -> Vec<LatLng> {
        self.vertices
    }

    pub fn first(&self) -> LatLng {
        self.vertices[0]
    }

    pub fn last(&self) -> LatLng {
        self.vertices[self.vertices.len() - 1]
    }

    /// Total geodesic length in meters.
    pub fn length_m(&self) -> f64 {
        self.cumulative[self.cumulative.len() - 1]
    }

    pub fn cumulative(&self) -> &[f64] {
        &self.cumulative
    }

    pub fn segment_count(&self) -> usize {
        self.vertices.len() - 1
    }

    pub fn segment_length(&self, i: usize) -> f64 {
        self.cumulative[i + 1] - self.cumulative[i]
    }

    pub fn is_degenerate_segment(&self, i: usize) -> bool {
        self.segment_length(i) <= DEGENERATE_SEGMENT_M
    }

    /// The segment containing distance `d` from the start, and how far into
    /// that segment `d` falls. Clamped to the ends of the line.
    pub fn segment_at_distance(&self, d: f64) -> (usize, f64) {
        let d = d.clamp(0.0, self.length_m());
        // First vertex at or beyond d; the segment ends there
        let end = self.cumulative.partition_point(|c| *c < d);
        let i = end.saturating_sub(1).min(self.segment_count() - 1);
        (i, d - self.cumulative[i])
    }

    /// The point `d` meters along the line.
    pub fn point_at_distance(&self, d: f64) -> LatLng {
        let (i, into) = self.segment_at_distance(d);
        let len = self.segment_length(i);
        if len <= DEGENERATE_SEGMENT_M {
            return self.vertices[i];
        }
        self.vertices[i].lerp(&self.vertices[i + 1], (into / len).clamp(0.0, 1.0))
    }

    /// The point at fractional position `t`, clamped to `[0, 1]`.
    pub fn point_at(&self, t: f64) -> LatLng {
        self.point_at_distance(t.clamp(0.0, 1.0) * self.length_m())
    }

    /// Travel bearing of segment `i`. Degenerate segments borrow the bearing
    /// of the next non-degenerate one, or the previous one at the tail.
    pub fn segment_bearing(&self, i: usize) -> Option<f64> {
        let i = i.min(self.segment_count() - 1);
        (i..self.segment_count())
            .chain((0..i).rev())
            .find(|&j| !self.is_degenerate_segment(j))
            .map(|j| bearing_deg(self.vertices[j], self.vertices[j + 1]))
    }

    /// Join two lines, dropping the second's first vertex if it repeats the
    /// first's last.
    pub fn concat(mut self, other: Polyline) -> Polyline {
        let mut rest = other.vertices.into_iter().peekable();
        if rest
            .peek()
            .is_some_and(|next| haversine_m(self.last(), *next) <= DEGENERATE_SEGMENT_M)
        {
            rest.next();
        }
        for v in rest {
            let prev = self.cumulative[self.cumulative.len() - 1];
            let step = haversine_m(self.last(), v);
            self.vertices.push(v);
            self.cumulative.push(prev + step);
        }
        self
    }
}
