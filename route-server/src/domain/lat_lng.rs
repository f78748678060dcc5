//! Geographic coordinate type.

use std::fmt;

use approx::abs_diff_eq;
use geo::Point;

/// Error returned when constructing a coordinate from invalid degrees.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("invalid coordinate ({lat}, {lng}): {reason}")]
pub struct InvalidCoordinate {
    lat: f64,
    lng: f64,
    reason: &'static str,
}

/// A WGS84 position with named latitude and longitude fields.
///
/// Latitude is within `[-90, 90]` and longitude within `[-180, 180]`; both
/// are finite. Any `LatLng` value is valid by construction.
///
/// Serialized geometry elsewhere in the crate uses `[lng, lat]` arrays; this
/// type keeps the fields named so the order can never be confused internally.
///
/// # Examples
///
/// ```
/// use route_server::domain::LatLng;
///
/// let p = LatLng::new(14.5995, 120.9842).unwrap();
/// assert_eq!(p.lat(), 14.5995);
/// assert_eq!(p.to_lng_lat(), [120.9842, 14.5995]);
///
/// assert!(LatLng::new(91.0, 0.0).is_err());
/// assert!(LatLng::new(f64::NAN, 0.0).is_err());
/// ```
#[derive(Clone, Copy, PartialEq, Default)]
pub struct LatLng {
    lat: f64,
    lng: f64,
}

impl LatLng {
    /// Create a coordinate from latitude and longitude in degrees.
    pub fn new(lat: f64, lng: f64) -> Result<Self, InvalidCoordinate> {
        if !lat.is_finite() || !lng.is_finite() {
            return Err(InvalidCoordinate {
                lat,
                lng,
                reason: "must be finite",
            });
        }

        if !(-90.0..=90.0).contains(&lat) {
            return Err(InvalidCoordinate {
                lat,
                lng,
                reason: "latitude must be within [-90, 90]",
            });
        }

        if !(-180.0..=180.0).contains(&lng) {
            return Err(InvalidCoordinate {
                lat,
                lng,
                reason: "longitude must be within [-180, 180]",
            });
        }

        Ok(Self { lat, lng })
    }

    /// Create a coordinate from a serialized `[lng, lat]` pair.
    pub fn from_lng_lat(pair: [f64; 2]) -> Result<Self, InvalidCoordinate> {
        Self::new(pair[1], pair[0])
    }

    /// Interpolated positions between two valid coordinates stay valid, so
    /// the kernel builds them without re-checking.
    pub(crate) fn new_unchecked(lat: f64, lng: f64) -> Self {
        debug_assert!(lat.is_finite() && lng.is_finite());
        Self { lat, lng }
    }

    /// Latitude in degrees.
    pub fn lat(&self) -> f64 {
        self.lat
    }

    /// Longitude in degrees.
    pub fn lng(&self) -> f64 {
        self.lng
    }

    /// The `[lng, lat]` pair used on the wire.
    pub fn to_lng_lat(&self) -> [f64; 2] {
        [self.lng, self.lat]
    }

    /// Linear interpolation in degree space. Endpoints are returned exactly.
    pub fn lerp(&self, other: &LatLng, fraction: f64) -> LatLng {
        if fraction <= 0.0 {
            return *self;
        }
        if fraction >= 1.0 {
            return *other;
        }
        LatLng::new_unchecked(
            self.lat + (other.lat - self.lat) * fraction,
            self.lng + (other.lng - self.lng) * fraction,
        )
    }

    /// Compare two coordinates within `epsilon` degrees on both axes.
    pub fn approx_eq(&self, other: &LatLng, epsilon: f64) -> bool {
        abs_diff_eq!(self.lat, other.lat, epsilon = epsilon)
            && abs_diff_eq!(self.lng, other.lng, epsilon = epsilon)
    }
}

impl fmt::Debug for LatLng {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "LatLng({}, {})", self.lat, self.lng)
    }
}

impl fmt::Display for LatLng {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.6},{:.6}", self.lat, self.lng)
    }
}

impl From<LatLng> for Point<f64> {
    fn from(p: LatLng) -> Self {
        Point::new(p.lng, p.lat)
    }
}

impl From<LatLng> for geo::Coord<f64> {
    fn from(p: LatLng) -> Self {
        geo::Coord { x: p.lng, y: p.lat }
    }
}


#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        /// Every in-range pair is accepted and survives the wire order roundtrip
        #[test]
        fn in_range_roundtrip(lat in -90.0f64..=90.0, lng in -180.0f64..=180.0) {
            let p = LatLng::new(lat, lng).unwrap();
            let back = LatLng::from_lng_lat(p.to_lng_lat()).unwrap();
            prop_assert_eq!(p, back);
        }

        /// Latitudes beyond the poles are always rejected
        #[test]
        fn polar_overflow_rejected(lat in 90.0001f64..1000.0, lng in -180.0f64..=180.0) {
            prop_assert!(LatLng::new(lat, lng).is_err());
            prop_assert!(LatLng::new(-lat, lng).is_err());
        }
    }
}
