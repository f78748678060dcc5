//! Route identity and geometry.

use std::fmt;

use crate::geometry::{self, Polyline};

use super::{DomainError, LatLng};

/// Maximum gap between first and last vertex for a route to count as a loop.
pub const LOOP_TOLERANCE_M: f64 = 0.1;

/// Opaque route identifier assigned by the route store.
///
/// # Examples
///
/// ```
/// use route_server::domain::RouteId;
///
/// let id = RouteId::new("r-17").unwrap();
/// assert_eq!(id.as_str(), "r-17");
/// assert!(RouteId::new("  ").is_err());
/// ```
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RouteId(String);

impl RouteId {
    /// Create an identifier; surrounding whitespace is trimmed and the
    /// result must not be empty.
    pub fn new(id: impl Into<String>) -> Result<Self, DomainError> {
        let id = id.into();
        let trimmed = id.trim();
        if trimmed.is_empty() {
            return Err(DomainError::EmptyRouteId);
        }
        Ok(Self(trimmed.to_string()))
    }

    /// Returns the identifier as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for RouteId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RouteId({})", self.0)
    }
}

impl fmt::Display for RouteId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Public-facing route code (the sign shown on the vehicle).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RouteCode(String);

impl RouteCode {
    pub fn new(code: impl Into<String>) -> Self {
        Self(code.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RouteCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// The fixed, directional path of one transit route.
///
/// # Invariants
///
/// - At least 2 vertices
/// - Non-zero total length (not every segment is degenerate)
/// - `is_closed_loop` is true iff first and last vertex are within
///   [`LOOP_TOLERANCE_M`] of each other
///
/// Immutable once built; the engine never mutates a route.
#[derive(Debug, Clone)]
pub struct RoutePolyline {
    id: RouteId,
    code: RouteCode,
    name: Option<String>,
    line: Polyline,
    is_closed_loop: bool,
}

impl RoutePolyline {
    /// Build a route from its ordered vertices.
    ///
    /// # Errors
    ///
    /// Returns [`DomainError::InvalidGeometry`] if there are fewer than 2
    /// vertices or every segment has zero length.
    pub fn new(id: RouteId, code: RouteCode, vertices: Vec<LatLng>) -> Result<Self, DomainError> {
        let line = Polyline::new(vertices).map_err(|e| DomainError::InvalidGeometry {
            route: id.clone(),
            reason: e.to_string(),
        })?;

        if line.length_m() <= geometry::DEGENERATE_SEGMENT_M {
            return Err(DomainError::InvalidGeometry {
                route: id,
                reason: "all segments are degenerate".to_string(),
            });
        }

        let is_closed_loop =
            geometry::haversine_m(line.first(), line.last()) <= LOOP_TOLERANCE_M;

        Ok(Self {
            id,
            code,
            name: None,
            line,
            is_closed_loop,
        })
    }

    /// Attach a display name.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn id(&self) -> &RouteId {
        &self.id
    }

    pub fn code(&self) -> &RouteCode {
        &self.code
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// The route geometry.
    pub fn line(&self) -> &Polyline {
        &self.line
    }

    pub fn vertices(&self) -> &[LatLng] {
        self.line.vertices()
    }

    /// Whether travel may wrap from the last vertex back to the first.
    pub fn is_closed_loop(&self) -> bool {
        self.is_closed_loop
    }

    /// Total geodesic length in meters.
    pub fn length_m(&self) -> f64 {
        self.line.length_m()
    }
}
