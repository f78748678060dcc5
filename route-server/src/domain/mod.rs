//! Domain types for the route finder.
//!
//! This module contains the validated value types the engine works with:
//! coordinates, routes, and the itineraries produced for a query. Types
//! enforce their invariants at construction time, so code that receives
//! them can trust their validity.

mod error;
mod itinerary;
mod lat_lng;
mod route;

pub use error::DomainError;
pub use itinerary::{
    Annotations, CaseKind, CaseResult, ItineraryKey, RouteSegment, Side, TransferPoint,
};
pub use lat_lng::{InvalidCoordinate, LatLng};
pub use route::{LOOP_TOLERANCE_M, RouteCode, RouteId, RoutePolyline};
