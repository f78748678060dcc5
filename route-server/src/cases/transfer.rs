//! Two-route handlers.
//!
//! A transfer itinerary rides route A from near the origin to a crossing
//! with route B, then rides B to near the destination. Pairs are built once
//! per query, with their crossings, and shared by all three handlers.

use rayon::prelude::*;
use tracing::{debug, warn};

use crate::domain::{Annotations, CaseKind, CaseResult, TransferPoint};
use crate::geometry::{FRACTION_EPSILON, intersect};
use crate::network::{Candidate, RouteNetworkView};

use super::config::CaseConfig;
use super::handler::{CaseError, HandlerContext, ride};
use super::scan::{Scanner, best_walk};

/// Two distinct candidate routes and where they cross.
#[derive(Debug, Clone)]
pub(crate) struct RoutePair<'a> {
    /// Boarded near the origin
    pub a: &'a Candidate,
    /// Alighted near the destination
    pub b: &'a Candidate,
    /// Crossings, ordered along `a`
    pub transfers: Vec<TransferPoint>,
}

/// Build every route pair worth examining, nearest first, capped at
/// `config.max_route_pairs`. Pairs whose routes never meet are dropped.
pub(super) fn route_pairs<'a>(view: &'a RouteNetworkView, config: &CaseConfig) -> Vec<RoutePair<'a>> {
    let origins = view.near_origin(config.transfer_radius_m.max(config.alternate_boarding_radius_m));
    let destinations =
        view.near_destination(config.transfer_radius_m.max(config.transfer_end_radius_m));

    let mut pairs: Vec<(&Candidate, &Candidate)> = Vec::new();
    for a in &origins {
        for b in &destinations {
            if a.route().id() != b.route().id() {
                pairs.push((*a, *b));
            }
        }
    }

    let proximity = |(a, b): &(&Candidate, &Candidate)| a.origin().distance_m + b.destination().distance_m;
    pairs.sort_by(|x, y| {
        proximity(x)
            .total_cmp(&proximity(y))
            .then_with(|| x.0.route().id().cmp(y.0.route().id()))
            .then_with(|| x.1.route().id().cmp(y.1.route().id()))
    });

    if pairs.len() > config.max_route_pairs {
        warn!(
            pairs = pairs.len(),
            cap = config.max_route_pairs,
            "too many route pairs, examining the nearest only"
        );
        pairs.truncate(config.max_route_pairs);
    }

    let pairs: Vec<RoutePair<'a>> = pairs
        .into_par_iter()
        .map(|(a, b)| RoutePair {
            a,
            b,
            transfers: transfer_points(a, b),
        })
        .filter(|pair| !pair.transfers.is_empty())
        .collect();

    debug!(pairs = pairs.len(), "route pairs with transfer points");
    pairs
}

/// Positions closer than this count as the same transfer point.
const SAME_POSITION_T: f64 = 1e-6;

fn transfer_points(a: &Candidate, b: &Candidate) -> Vec<TransferPoint> {
    let mut points: Vec<TransferPoint> = intersect(a.route().line(), b.route().line())
        .into_iter()
        .map(|c| TransferPoint {
            point: c.point,
            t_a: c.t_a,
            t_b: c.t_b,
        })
        .collect();

    // On a loop the first vertex is also the last: a crossing there can be
    // reached at the end of the ride on A, and boarded at the start of B
    let mut seam = Vec::new();
    if a.is_closed_loop() {
        seam.extend(
            points
                .iter()
                .filter(|tp| tp.t_a <= SAME_POSITION_T)
                .map(|tp| TransferPoint { t_a: 1.0, ..*tp }),
        );
    }
    if b.is_closed_loop() {
        seam.extend(
            points
                .iter()
                .filter(|tp| tp.t_b >= 1.0 - SAME_POSITION_T)
                .map(|tp| TransferPoint { t_b: 0.0, ..*tp }),
        );
    }
    points.extend(seam);

    points.sort_by(|x, y| x.t_a.total_cmp(&y.t_a).then(x.t_b.total_cmp(&y.t_b)));
    points.dedup_by(|x, y| {
        (x.t_a - y.t_a).abs() <= SAME_POSITION_T && (x.t_b - y.t_b).abs() <= SAME_POSITION_T
    });
    points
}

/// Radii a pair must satisfy for `kind`: (origin to A, destination to B).
fn radii(kind: CaseKind, config: &CaseConfig) -> (f64, f64) {
    match kind {
        CaseKind::TransferStartOpposite => {
            (config.alternate_boarding_radius_m, config.transfer_radius_m)
        }
        CaseKind::TransferEndOpposite => (config.transfer_radius_m, config.transfer_end_radius_m),
        _ => (config.transfer_radius_m, config.transfer_radius_m),
    }
}

/// Whether some pair of distinct routes sits within `kind`'s radii. Does not
/// look for crossings.
pub(super) fn can_handle(kind: CaseKind, ctx: &HandlerContext<'_>) -> bool {
    let (ra, rb) = radii(kind, ctx.config);
    let origins = ctx.view.near_origin(ra);
    let destinations = ctx.view.near_destination(rb);

    origins
        .iter()
        .any(|a| destinations.iter().any(|b| a.route().id() != b.route().id()))
}

pub(super) fn calculate(
    kind: CaseKind,
    ctx: &HandlerContext<'_>,
) -> Result<Vec<CaseResult>, CaseError> {
    let (ra, rb) = radii(kind, ctx.config);

    let per_pair: Vec<Result<Vec<CaseResult>, CaseError>> = ctx
        .route_pairs()
        .par_iter()
        .filter(|pair| pair.a.near_origin(ra) && pair.b.near_destination(rb))
        .map(|pair| {
            let found = match kind {
                CaseKind::SimpleTransfer => simple(pair, ctx),
                CaseKind::TransferStartOpposite => start_opposite(pair, ctx),
                CaseKind::TransferEndOpposite => end_opposite(pair, ctx),
                _ => Ok(Vec::new()),
            };
            match found {
                Err(CaseError::Geometry(e)) => {
                    debug!(
                        case = %kind,
                        a = %pair.a.route().id(),
                        b = %pair.b.route().id(),
                        error = %e,
                        "route pair does not match: geometry error"
                    );
                    Ok(Vec::new())
                }
                other => other.map(|results| top_n(results, ctx.config.top_n_per_pair)),
            }
        })
        .collect();

    let mut results = Vec::new();
    for found in per_pair {
        results.extend(found?);
    }
    Ok(results)
}

/// Where a leg starts or ends, and how far the rider walks to it.
#[derive(Debug, Clone, Copy)]
struct Endpoint {
    t: f64,
    walk_m: Option<f64>,
}

impl Endpoint {
    fn raw(t: f64) -> Self {
        Self { t, walk_m: None }
    }
}

fn itinerary(
    kind: CaseKind,
    pair: &RoutePair<'_>,
    tp: TransferPoint,
    board: Endpoint,
    alight: Endpoint,
    ctx: &HandlerContext<'_>,
    annotations: Option<Annotations>,
) -> Result<CaseResult, CaseError> {
    let mut first = ride(pair.a.route(), board.t, tp.t_a, ctx.fares)?;
    first.walk_to_board_m = board.walk_m;

    let mut second = ride(pair.b.route(), tp.t_b, alight.t, ctx.fares)?;
    second.walk_from_alight_m = alight.walk_m;

    let result = CaseResult::new(kind, vec![first, second])?.with_transfer(tp);
    Ok(match annotations {
        Some(a) => result.with_annotations(a),
        None => result,
    })
}

/// Keep the `n` shortest itineraries.
fn top_n(mut results: Vec<CaseResult>, n: usize) -> Vec<CaseResult> {
    results.sort_by(|a, b| a.total_distance_m().total_cmp(&b.total_distance_m()));
    results.truncate(n);
    results
}

/// Board and alight at the raw projections.
fn simple(pair: &RoutePair<'_>, ctx: &HandlerContext<'_>) -> Result<Vec<CaseResult>, CaseError> {
    let boarding = pair.a.origin().t;
    let alighting = pair.b.destination().t;

    pair.transfers
        .iter()
        .filter(|tp| tp.is_feasible(boarding, alighting))
        .map(|tp| {
            itinerary(
                CaseKind::SimpleTransfer,
                pair,
                *tp,
                Endpoint::raw(boarding),
                Endpoint::raw(alighting),
                ctx,
                None,
            )
        })
        .collect()
}

/// The raw boarding point is past every usable crossing, or across the road:
/// find a boarding point near the origin before the earliest crossing.
fn start_opposite(
    pair: &RoutePair<'_>,
    ctx: &HandlerContext<'_>,
) -> Result<Vec<CaseResult>, CaseError> {
    let config = ctx.config;
    let raw = pair.a.origin().t;
    let alighting = pair.b.destination().t;

    // Crossings that still reach the destination on B
    let reachable: Vec<&TransferPoint> = pair
        .transfers
        .iter()
        .filter(|tp| tp.t_b + FRACTION_EPSILON < alighting)
        .collect();

    let Some(earliest) = reachable.iter().map(|tp| tp.t_a).min_by(f64::total_cmp) else {
        return Ok(Vec::new());
    };

    let raw_reaches = reachable.iter().any(|tp| tp.t_a > raw + FRACTION_EPSILON);
    if (raw_reaches && pair.a.origin_side().is_correct()) || earliest <= FRACTION_EPSILON {
        return Ok(Vec::new());
    }

    let scanner = Scanner::new(
        pair.a.route().line(),
        ctx.view.origin(),
        config.alternate_boarding_radius_m,
        config.scan_step_m,
        config.side_classifier(),
    );
    let mut samples = scanner.scan(0.0, earliest)?;
    samples.retain(|p| p.t + FRACTION_EPSILON < earliest);

    let Some(board) = best_walk(&samples) else {
        return Ok(Vec::new());
    };

    let annotations = Annotations {
        original_start_t: Some(raw),
        corrected_start_t: Some(board.t),
        walk_to_board_m: Some(board.distance_m),
        ..Annotations::default()
    };

    reachable
        .into_iter()
        .filter(|tp| tp.is_feasible(board.t, alighting))
        .map(|tp| {
            itinerary(
                CaseKind::TransferStartOpposite,
                pair,
                *tp,
                Endpoint {
                    t: board.t,
                    walk_m: Some(board.distance_m),
                },
                Endpoint::raw(alighting),
                ctx,
                Some(annotations.clone()),
            )
        })
        .collect()
}

/// The raw alighting point on B is not after the crossing, or is across the
/// road: alight at the earliest point near the destination after the
/// crossing.
fn end_opposite(
    pair: &RoutePair<'_>,
    ctx: &HandlerContext<'_>,
) -> Result<Vec<CaseResult>, CaseError> {
    let config = ctx.config;
    let boarding = pair.a.origin().t;
    let raw_alight = pair.b.destination().t;
    let destination_correct = pair.b.destination_side().is_correct();

    let scanner = Scanner::new(
        pair.b.route().line(),
        ctx.view.destination(),
        config.transfer_alighting_radius_m,
        config.scan_step_m,
        config.side_classifier(),
    );

    let mut results = Vec::new();
    for tp in pair
        .transfers
        .iter()
        .filter(|tp| tp.t_a > boarding + FRACTION_EPSILON)
    {
        if raw_alight > tp.t_b + FRACTION_EPSILON && destination_correct {
            continue;
        }

        let samples = scanner.scan(tp.t_b, 1.0)?;
        let Some(alight) = samples.iter().find(|p| p.t > tp.t_b + FRACTION_EPSILON) else {
            continue;
        };

        let annotations = Annotations {
            original_end_t: Some(raw_alight),
            corrected_end_t: Some(alight.t),
            walk_from_alight_m: Some(alight.distance_m),
            ..Annotations::default()
        };

        results.push(itinerary(
            CaseKind::TransferEndOpposite,
            pair,
            *tp,
            Endpoint::raw(boarding),
            Endpoint {
                t: alight.t,
                walk_m: Some(alight.distance_m),
            },
            ctx,
            Some(annotations),
        )?);
    }

    Ok(results)
}
