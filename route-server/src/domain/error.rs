//! Domain error types.
//!
//! These errors represent validation failures in the domain layer. They are
//! distinct from storage and transport errors.

use super::RouteId;

/// Domain-level errors for validation and data consistency.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum DomainError {
    /// A route's geometry cannot be used by the kernel
    #[error("invalid geometry for route {route}: {reason}")]
    InvalidGeometry { route: RouteId, reason: String },

    /// A route identifier was empty
    #[error("route id must not be empty")]
    EmptyRouteId,

    /// An itinerary was built with the wrong number of legs for its case
    #[error("invalid itinerary: {0}")]
    InvalidItinerary(&'static str),
}
