//! Itinerary types produced by the case handlers.
//!
//! A [`CaseResult`] is one complete itinerary: one leg for single-route
//! cases, two legs joined at a [`TransferPoint`] for transfer cases.

use std::fmt;

use crate::fare::Fare;
use crate::geometry::FRACTION_EPSILON;

use super::{DomainError, LatLng, RouteCode, RouteId};

/// Which side of a directional corridor a pin is on.
///
/// Not stored on routes; computed per query from a projection and the local
/// route bearing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Side {
    /// Near enough, and on the side vehicles travel, to board without crossing
    Correct,
    /// Across the road, or too far from the corridor
    Opposite,
}

impl Side {
    pub fn is_correct(self) -> bool {
        self == Side::Correct
    }
}

/// The travel patterns the engine recognises, in dispatch priority order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum CaseKind {
    NormalForward,
    LoopAround,
    OppositeStart,
    OppositeEnd,
    BothOpposite,
    SimpleTransfer,
    TransferStartOpposite,
    TransferEndOpposite,
}

impl CaseKind {
    /// Heuristic score used only for ordering results.
    pub const fn confidence(self) -> f64 {
        match self {
            CaseKind::NormalForward => 1.0,
            CaseKind::LoopAround => 0.95,
            CaseKind::OppositeStart => 0.85,
            CaseKind::OppositeEnd => 0.90,
            CaseKind::BothOpposite => 0.75,
            CaseKind::SimpleTransfer => 0.70,
            CaseKind::TransferStartOpposite => 0.65,
            CaseKind::TransferEndOpposite => 0.65,
        }
    }

    /// Returns true for the two-route cases.
    pub const fn is_transfer(self) -> bool {
        matches!(
            self,
            CaseKind::SimpleTransfer
                | CaseKind::TransferStartOpposite
                | CaseKind::TransferEndOpposite
        )
    }

    /// Number of route legs an itinerary of this kind has.
    pub const fn leg_count(self) -> usize {
        if self.is_transfer() { 2 } else { 1 }
    }

    /// Stable snake_case name used in logs and API responses.
    pub const fn as_str(self) -> &'static str {
        match self {
            CaseKind::NormalForward => "normal_forward",
            CaseKind::LoopAround => "loop_around",
            CaseKind::OppositeStart => "opposite_start",
            CaseKind::OppositeEnd => "opposite_end",
            CaseKind::BothOpposite => "both_opposite",
            CaseKind::SimpleTransfer => "simple_transfer",
            CaseKind::TransferStartOpposite => "transfer_start_opposite",
            CaseKind::TransferEndOpposite => "transfer_end_opposite",
        }
    }
}

impl fmt::Display for CaseKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A crossing between two corridors usable to change routes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TransferPoint {
    /// Where the corridors meet
    pub point: LatLng,
    /// Fractional position on the first route
    pub t_a: f64,
    /// Fractional position on the second route
    pub t_b: f64,
}

impl TransferPoint {
    /// Usable only if it lies strictly after boarding on the first route and
    /// strictly before alighting on the second.
    pub fn is_feasible(&self, boarding_a: f64, alighting_b: f64) -> bool {
        boarding_a + FRACTION_EPSILON < self.t_a && self.t_b + FRACTION_EPSILON < alighting_b
    }
}

/// One ride on one route.
#[derive(Debug, Clone, PartialEq)]
pub struct RouteSegment {
    pub route_id: RouteId,
    pub route_code: RouteCode,
    /// Ordered coordinates of the extracted sub-path
    pub coordinates: Vec<LatLng>,
    /// Ride distance in meters
    pub distance_m: f64,
    pub fare: Fare,
    pub start_t: f64,
    pub end_t: f64,
    /// The ride wraps through the end of a closed-loop route
    pub requires_loop: bool,
    /// Walk from the origin pin to a relocated boarding point
    pub walk_to_board_m: Option<f64>,
    /// Walk from a relocated alighting point to the destination pin
    pub walk_from_alight_m: Option<f64>,
}

/// Debug details on how positions were corrected.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Annotations {
    pub original_start_t: Option<f64>,
    pub corrected_start_t: Option<f64>,
    pub original_end_t: Option<f64>,
    pub corrected_end_t: Option<f64>,
    pub walk_to_board_m: Option<f64>,
    pub walk_from_alight_m: Option<f64>,
}

/// Identity of an itinerary for de-duplication: the ridden route sequence
/// plus the snapped transfer location, if any.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ItineraryKey {
    routes: Vec<RouteId>,
    transfer_cell: Option<(i64, i64)>,
}

/// Transfer points within about a meter share a key.
const TRANSFER_CELL_DEGREES: f64 = 1e-5;

/// A complete, priced itinerary for one (origin, destination) pair.
///
/// # Invariants
///
/// - Exactly `kind.leg_count()` segments
/// - Totals equal the sums over segments
/// - `confidence == kind.confidence()`
#[derive(Debug, Clone, PartialEq)]
pub struct CaseResult {
    kind: CaseKind,
    segments: Vec<RouteSegment>,
    total_distance_m: f64,
    total_fare: Fare,
    confidence: f64,
    transfer: Option<TransferPoint>,
    annotations: Option<Annotations>,
}

impl CaseResult {
    /// Build an itinerary from fully computed segments.
    ///
    /// # Errors
    ///
    /// Returns [`DomainError::InvalidItinerary`] if the leg count does not
    /// match the case kind.
    pub fn new(kind: CaseKind, segments: Vec<RouteSegment>) -> Result<Self, DomainError> {
        if segments.len() != kind.leg_count() {
            return Err(DomainError::InvalidItinerary(if kind.is_transfer() {
                "transfer itineraries have exactly two legs"
            } else {
                "single-route itineraries have exactly one leg"
            }));
        }

        let total_distance_m = segments.iter().map(|s| s.distance_m).sum();
        let total_fare = segments.iter().map(|s| s.fare).sum();

        Ok(Self {
            kind,
            segments,
            total_distance_m,
            total_fare,
            confidence: kind.confidence(),
            transfer: None,
            annotations: None,
        })
    }

    pub fn with_transfer(mut self, transfer: TransferPoint) -> Self {
        self.transfer = Some(transfer);
        self
    }

    pub fn with_annotations(mut self, annotations: Annotations) -> Self {
        self.annotations = Some(annotations);
        self
    }

    pub fn kind(&self) -> CaseKind {
        self.kind
    }

    pub fn segments(&self) -> &[RouteSegment] {
        &self.segments
    }

    pub fn total_distance_m(&self) -> f64 {
        self.total_distance_m
    }

    pub fn total_fare(&self) -> Fare {
        self.total_fare
    }

    pub fn confidence(&self) -> f64 {
        self.confidence
    }

    pub fn transfer(&self) -> Option<&TransferPoint> {
        self.transfer.as_ref()
    }

    pub fn annotations(&self) -> Option<&Annotations> {
        self.annotations.as_ref()
    }

    /// Routes ridden, in order.
    pub fn route_ids(&self) -> impl Iterator<Item = &RouteId> {
        self.segments.iter().map(|s| &s.route_id)
    }

    /// Key under which equivalent itineraries collapse.
    pub fn itinerary_key(&self) -> ItineraryKey {
        ItineraryKey {
            routes: self.route_ids().cloned().collect(),
            transfer_cell: self.transfer.map(|tp| {
                (
                    (tp.point.lat() / TRANSFER_CELL_DEGREES).round() as i64,
                    (tp.point.lng() / TRANSFER_CELL_DEGREES).round() as i64,
                )
            }),
        }
    }
}
