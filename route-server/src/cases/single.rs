//! Single-route handlers.
//!
//! Each handler looks at every candidate route on its own and emits at most
//! one itinerary per route. Routes are directional: a ride always moves
//! toward larger `t`, wrapping through `t = 1.0` only on closed loops.

use tracing::debug;

use crate::domain::{Annotations, CaseKind, CaseResult, Side};
use crate::geometry::FRACTION_EPSILON;
use crate::network::Candidate;

use super::config::CaseConfig;
use super::handler::{CaseError, HandlerContext, loop_ride, ride};
use super::scan::{Scanner, nearest_in_range};

/// Whether `kind`'s preconditions hold for one candidate.
pub(super) fn applies(kind: CaseKind, c: &Candidate, config: &CaseConfig) -> bool {
    let start = c.origin().t;
    let end = c.destination().t;
    let both_correct = c.origin_side().is_correct() && c.destination_side().is_correct();
    let near_both =
        c.near_origin(config.single_route_radius_m) && c.near_destination(config.single_route_radius_m);

    match kind {
        CaseKind::NormalForward => both_correct && near_both && start + FRACTION_EPSILON < end,
        CaseKind::LoopAround => {
            both_correct && near_both && c.is_closed_loop() && start > end + FRACTION_EPSILON
        }
        CaseKind::OppositeStart => {
            c.origin_side() == Side::Opposite
                && c.origin().distance_m > config.opposite_min_m
                && c.near_origin(config.alternate_boarding_radius_m)
                && c.destination_side().is_correct()
                && c.near_destination(config.single_route_radius_m)
                && (start + FRACTION_EPSILON < end || c.is_closed_loop())
        }
        CaseKind::OppositeEnd => {
            c.origin_side().is_correct()
                && c.near_origin(config.single_route_radius_m)
                && c.destination_side() == Side::Opposite
                && c.destination().distance_m > config.opposite_min_m
                && c.near_destination(config.single_route_radius_m)
                && start + FRACTION_EPSILON < 1.0
        }
        CaseKind::BothOpposite => {
            (c.origin().distance_m > config.both_opposite_min_m
                || c.destination().distance_m > config.both_opposite_min_m)
                && c.near_origin(config.both_opposite_search_m)
                && c.near_destination(config.both_opposite_search_m)
                && start + FRACTION_EPSILON < end
        }
        CaseKind::SimpleTransfer
        | CaseKind::TransferStartOpposite
        | CaseKind::TransferEndOpposite => false,
    }
}

/// Run `kind` over every candidate it applies to.
pub(super) fn calculate(
    kind: CaseKind,
    ctx: &HandlerContext<'_>,
) -> Result<Vec<CaseResult>, CaseError> {
    let mut results = Vec::new();

    for candidate in ctx.view.candidates() {
        if !applies(kind, candidate, ctx.config) {
            continue;
        }

        let outcome = match kind {
            CaseKind::NormalForward => normal_forward(candidate, ctx),
            CaseKind::LoopAround => loop_around(candidate, ctx),
            CaseKind::OppositeStart => opposite_start(candidate, ctx),
            CaseKind::OppositeEnd => opposite_end(candidate, ctx),
            CaseKind::BothOpposite => both_opposite(candidate, ctx),
            _ => Ok(None),
        };

        match outcome {
            Ok(Some(result)) => results.push(result),
            Ok(None) => {}
            Err(CaseError::Geometry(e)) => {
                debug!(
                    case = %kind,
                    route = %candidate.route().id(),
                    error = %e,
                    "route does not match: geometry error"
                );
            }
            Err(e) => return Err(e),
        }
    }

    Ok(results)
}

fn normal_forward(
    c: &Candidate,
    ctx: &HandlerContext<'_>,
) -> Result<Option<CaseResult>, CaseError> {
    let segment = ride(c.route(), c.origin().t, c.destination().t, ctx.fares)?;
    Ok(Some(CaseResult::new(CaseKind::NormalForward, vec![segment])?))
}

fn loop_around(c: &Candidate, ctx: &HandlerContext<'_>) -> Result<Option<CaseResult>, CaseError> {
    let segment = loop_ride(c.route(), c.origin().t, c.destination().t, ctx.fares)?;
    Ok(Some(CaseResult::new(CaseKind::LoopAround, vec![segment])?))
}

/// Origin across the road: look further along the route for a point the
/// rider can walk to without crossing, before the destination.
fn opposite_start(
    c: &Candidate,
    ctx: &HandlerContext<'_>,
) -> Result<Option<CaseResult>, CaseError> {
    let config = ctx.config;
    let line = c.route().line();
    let raw = c.origin().t;
    let end = c.destination().t;
    let wraps = raw + FRACTION_EPSILON >= end;

    let scanner = Scanner::new(
        line,
        ctx.view.origin(),
        config.alternate_boarding_radius_m,
        config.scan_step_m,
        config.side_classifier(),
    );

    let mut samples = if wraps {
        let mut tail = scanner.scan(raw, 1.0)?;
        tail.extend(scanner.scan(0.0, end)?);
        tail
    } else {
        scanner.scan(raw, end)?
    };
    // Strictly after the raw boarding point and strictly before the destination
    samples.retain(|p| {
        p.side.is_correct()
            && if wraps {
                p.t > raw + FRACTION_EPSILON || p.t + FRACTION_EPSILON < end
            } else {
                p.t > raw + FRACTION_EPSILON && p.t + FRACTION_EPSILON < end
            }
    });

    let (board_t, walk_m) = match samples
        .iter()
        .min_by(|a, b| a.distance_m.total_cmp(&b.distance_m))
    {
        Some(p) => (p.t, p.distance_m),
        None => (raw, c.origin().distance_m),
    };

    let mut segment = if board_t + FRACTION_EPSILON < end {
        ride(c.route(), board_t, end, ctx.fares)?
    } else if c.is_closed_loop() {
        loop_ride(c.route(), board_t, end, ctx.fares)?
    } else {
        return Ok(None);
    };
    segment.walk_to_board_m = Some(walk_m);

    let annotations = Annotations {
        original_start_t: Some(raw),
        corrected_start_t: Some(board_t),
        walk_to_board_m: Some(walk_m),
        ..Annotations::default()
    };

    Ok(Some(
        CaseResult::new(CaseKind::OppositeStart, vec![segment])?.with_annotations(annotations),
    ))
}

/// Destination across the road: alight at the nearest point still ahead of
/// the boarding point and walk from there.
fn opposite_end(c: &Candidate, ctx: &HandlerContext<'_>) -> Result<Option<CaseResult>, CaseError> {
    let start = c.origin().t;
    let Some(alight) = nearest_in_range(c.route().line(), ctx.view.destination(), start, 1.0)?
    else {
        return Ok(None);
    };

    if alight.t <= start + FRACTION_EPSILON
        || alight.distance_m > ctx.config.single_route_radius_m
    {
        return Ok(None);
    }

    let mut segment = ride(c.route(), start, alight.t, ctx.fares)?;
    segment.walk_from_alight_m = Some(alight.distance_m);

    let annotations = Annotations {
        original_end_t: Some(c.destination().t),
        corrected_end_t: Some(alight.t),
        walk_from_alight_m: Some(alight.distance_m),
        ..Annotations::default()
    };

    Ok(Some(
        CaseResult::new(CaseKind::OppositeEnd, vec![segment])?.with_annotations(annotations),
    ))
}

/// Both pins off the corridor: pick the boarding and alighting samples that
/// give the shortest forward ride. Boarding stays before the raw destination
/// and alighting after the raw origin, so nearby pins cannot produce a ride
/// that goes nowhere.
fn both_opposite(
    c: &Candidate,
    ctx: &HandlerContext<'_>,
) -> Result<Option<CaseResult>, CaseError> {
    let config = ctx.config;
    let line = c.route().line();
    let classifier = config.side_classifier();
    let radius = config.both_opposite_search_m;
    let start = c.origin().t;
    let end = c.destination().t;

    let mut boards =
        Scanner::new(line, ctx.view.origin(), radius, config.scan_step_m, classifier)
            .scan(0.0, end)?;
    boards.retain(|b| b.t + FRACTION_EPSILON < end);
    let mut alights =
        Scanner::new(line, ctx.view.destination(), radius, config.scan_step_m, classifier)
            .scan(start, 1.0)?;
    alights.retain(|a| a.t > start + FRACTION_EPSILON);

    // Alighting samples are sorted by t, so the first one after a boarding
    // sample gives that boarding sample's shortest ride
    let best = boards
        .iter()
        .filter_map(|b| {
            let i = alights.partition_point(|a| a.t <= b.t + FRACTION_EPSILON);
            alights.get(i).map(|a| (b, a))
        })
        .min_by(|(b1, a1), (b2, a2)| {
            (a1.t - b1.t)
                .total_cmp(&(a2.t - b2.t))
                .then((b1.distance_m + a1.distance_m).total_cmp(&(b2.distance_m + a2.distance_m)))
        });

    let Some((board, alight)) = best else {
        return Ok(None);
    };

    let mut segment = ride(c.route(), board.t, alight.t, ctx.fares)?;
    segment.walk_to_board_m = Some(board.distance_m);
    segment.walk_from_alight_m = Some(alight.distance_m);

    let annotations = Annotations {
        original_start_t: Some(c.origin().t),
        corrected_start_t: Some(board.t),
        original_end_t: Some(c.destination().t),
        corrected_end_t: Some(alight.t),
        walk_to_board_m: Some(board.distance_m),
        walk_from_alight_m: Some(alight.distance_m),
    };

    Ok(Some(
        CaseResult::new(CaseKind::BothOpposite, vec![segment])?.with_annotations(annotations),
    ))
}
