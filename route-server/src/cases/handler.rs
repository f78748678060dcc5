//! The closed set of case handlers.

use std::sync::OnceLock;

use crate::domain::{CaseKind, CaseResult, DomainError, RoutePolyline, RouteSegment};
use crate::fare::FareTable;
use crate::geometry::{GeometryError, substring};
use crate::network::RouteNetworkView;

use super::config::CaseConfig;
use super::transfer::RoutePair;
use super::{single, transfer};

/// Failure inside one handler.
///
/// Geometry errors on a single candidate make that candidate non-matching
/// and never reach the dispatcher; whatever does reach it is logged there
/// and excludes only this handler's results.
#[derive(Debug, Clone, thiserror::Error)]
pub enum CaseError {
    #[error("geometry error: {0}")]
    Geometry(#[from] GeometryError),

    #[error("invalid itinerary: {0}")]
    Domain(#[from] DomainError),
}

/// Everything a handler reads while evaluating one query.
pub struct HandlerContext<'a> {
    pub view: &'a RouteNetworkView,
    pub config: &'a CaseConfig,
    pub fares: &'a FareTable,
    pairs: OnceLock<Vec<RoutePair<'a>>>,
}

impl<'a> HandlerContext<'a> {
    pub fn new(view: &'a RouteNetworkView, config: &'a CaseConfig, fares: &'a FareTable) -> Self {
        Self {
            view,
            config,
            fares,
            pairs: OnceLock::new(),
        }
    }

    /// Route pairs and their transfer points, computed on first use and
    /// shared by the transfer handlers.
    pub(crate) fn route_pairs(&self) -> &[RoutePair<'a>] {
        self.pairs
            .get_or_init(|| transfer::route_pairs(self.view, self.config))
    }
}

/// One travel pattern the dispatcher can try.
///
/// Variants are listed in dispatch priority order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CaseHandler {
    NormalForward,
    LoopAround,
    OppositeStart,
    OppositeEnd,
    BothOpposite,
    SimpleTransfer,
    TransferStartOpposite,
    TransferEndOpposite,
}

impl CaseHandler {
    /// Single-route handlers in priority order.
    pub const SINGLE_ROUTE: [CaseHandler; 5] = [
        CaseHandler::NormalForward,
        CaseHandler::LoopAround,
        CaseHandler::OppositeStart,
        CaseHandler::OppositeEnd,
        CaseHandler::BothOpposite,
    ];

    /// Transfer handlers in priority order.
    pub const TRANSFER: [CaseHandler; 3] = [
        CaseHandler::SimpleTransfer,
        CaseHandler::TransferStartOpposite,
        CaseHandler::TransferEndOpposite,
    ];

    /// The case kind this handler produces.
    pub fn kind(self) -> CaseKind {
        match self {
            CaseHandler::NormalForward => CaseKind::NormalForward,
            CaseHandler::LoopAround => CaseKind::LoopAround,
            CaseHandler::OppositeStart => CaseKind::OppositeStart,
            CaseHandler::OppositeEnd => CaseKind::OppositeEnd,
            CaseHandler::BothOpposite => CaseKind::BothOpposite,
            CaseHandler::SimpleTransfer => CaseKind::SimpleTransfer,
            CaseHandler::TransferStartOpposite => CaseKind::TransferStartOpposite,
            CaseHandler::TransferEndOpposite => CaseKind::TransferEndOpposite,
        }
    }

    /// Cheap check for whether any candidate could match.
    pub fn can_handle(self, ctx: &HandlerContext<'_>) -> bool {
        match self {
            CaseHandler::NormalForward
            | CaseHandler::LoopAround
            | CaseHandler::OppositeStart
            | CaseHandler::OppositeEnd
            | CaseHandler::BothOpposite => ctx
                .view
                .candidates()
                .iter()
                .any(|c| single::applies(self.kind(), c, ctx.config)),
            CaseHandler::SimpleTransfer
            | CaseHandler::TransferStartOpposite
            | CaseHandler::TransferEndOpposite => transfer::can_handle(self.kind(), ctx),
        }
    }

    /// Every itinerary this handler finds. May be empty.
    pub fn calculate(self, ctx: &HandlerContext<'_>) -> Result<Vec<CaseResult>, CaseError> {
        match self {
            CaseHandler::NormalForward
            | CaseHandler::LoopAround
            | CaseHandler::OppositeStart
            | CaseHandler::OppositeEnd
            | CaseHandler::BothOpposite => single::calculate(self.kind(), ctx),
            CaseHandler::SimpleTransfer
            | CaseHandler::TransferStartOpposite
            | CaseHandler::TransferEndOpposite => transfer::calculate(self.kind(), ctx),
        }
    }
}

/// A forward ride from `start_t` to `end_t`.
pub(crate) fn ride(
    route: &RoutePolyline,
    start_t: f64,
    end_t: f64,
    fares: &FareTable,
) -> Result<RouteSegment, GeometryError> {
    let sub = substring(route.line(), start_t, end_t)?;
    let distance_m = sub.length_m();

    Ok(RouteSegment {
        route_id: route.id().clone(),
        route_code: route.code().clone(),
        coordinates: sub.into_vertices(),
        distance_m,
        fare: fares.fare(distance_m),
        start_t,
        end_t,
        requires_loop: false,
        walk_to_board_m: None,
        walk_from_alight_m: None,
    })
}

/// A ride on a closed loop that passes through the route's end point.
pub(crate) fn loop_ride(
    route: &RoutePolyline,
    start_t: f64,
    end_t: f64,
    fares: &FareTable,
) -> Result<RouteSegment, GeometryError> {
    let tail = substring(route.line(), start_t, 1.0)?;
    let head = substring(route.line(), 0.0, end_t)?;
    let distance_m = tail.length_m() + head.length_m();

    Ok(RouteSegment {
        route_id: route.id().clone(),
        route_code: route.code().clone(),
        coordinates: tail.concat(head).into_vertices(),
        distance_m,
        fare: fares.fare(distance_m),
        start_t,
        end_t,
        requires_loop: true,
        walk_to_board_m: None,
        walk_from_alight_m: None,
    })
}
