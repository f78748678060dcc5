//! End-to-end tests for the handler chain over hand-built route networks.

use std::sync::Arc;

use super::*;
use crate::domain::{CaseKind, LatLng, RouteCode, RouteId, RoutePolyline};
use crate::fare::{Fare, FareTable};
use crate::network::RouteNetworkView;

fn ll(lat: f64, lng: f64) -> LatLng {
    LatLng::new(lat, lng).unwrap()
}

fn route(id: &str, points: &[(f64, f64)]) -> Arc<RoutePolyline> {
    Arc::new(
        RoutePolyline::new(
            RouteId::new(id).unwrap(),
            RouteCode::new(id.to_uppercase()),
            points.iter().map(|&(lat, lng)| ll(lat, lng)).collect(),
        )
        .unwrap(),
    )
}

/// ~1112 m due east along the equator.
fn eastbound() -> Arc<RoutePolyline> {
    route("east", &[(0.0, 0.0), (0.0, 0.01)])
}

/// Closed square, ~1112 m a side: east, north, west, then south home.
fn ring() -> Arc<RoutePolyline> {
    route(
        "ring",
        &[
            (0.0, 0.0),
            (0.0, 0.01),
            (0.01, 0.01),
            (0.01, 0.0),
            (0.0, 0.0),
        ],
    )
}

fn dispatch_with(
    dispatcher: &Dispatcher,
    origin: LatLng,
    destination: LatLng,
    routes: Vec<Arc<RoutePolyline>>,
) -> DispatchResult {
    let view = RouteNetworkView::build(
        origin,
        destination,
        routes,
        &dispatcher.config().side_classifier(),
    );
    dispatcher.dispatch(&view)
}

fn dispatch(origin: LatLng, destination: LatLng, routes: Vec<Arc<RoutePolyline>>) -> DispatchResult {
    dispatch_with(&Dispatcher::default(), origin, destination, routes)
}

fn kinds(result: &DispatchResult) -> Vec<CaseKind> {
    result.results.iter().map(|r| r.kind()).collect()
}

#[test]
fn normal_forward() {
    // ~5.5 m south of an eastbound road: on the corridor
    let result = dispatch(ll(-0.00005, 0.002), ll(-0.00005, 0.008), vec![eastbound()]);

    assert_eq!(kinds(&result), vec![CaseKind::NormalForward]);
    assert_eq!(result.handlers_run, vec![CaseKind::NormalForward]);

    let itinerary = &result.results[0];
    assert_eq!(itinerary.confidence(), 1.0);
    let segment = &itinerary.segments()[0];
    assert!((segment.start_t - 0.2).abs() < 1e-6);
    assert!((segment.end_t - 0.8).abs() < 1e-6);
    assert!(!segment.requires_loop);
    assert!((segment.distance_m - 0.6 * eastbound().length_m()).abs() < 0.5);
    assert_eq!(segment.fare, Fare::new(13));
}

#[test]
fn loop_around() {
    // Origin on the southbound side at t = 0.8, destination on the eastbound
    // side at t = 0.2
    let result = dispatch(ll(0.008, 0.0), ll(0.0, 0.008), vec![ring()]);

    assert_eq!(kinds(&result), vec![CaseKind::LoopAround]);

    let itinerary = &result.results[0];
    assert_eq!(itinerary.confidence(), 0.95);
    let segment = &itinerary.segments()[0];
    assert!(segment.requires_loop);
    assert!((segment.start_t - 0.8).abs() < 1e-6);
    assert!((segment.end_t - 0.2).abs() < 1e-6);
    // Rides through the start vertex, not back along [0.2, 0.8]
    assert!((segment.distance_m - 0.4 * ring().length_m()).abs() < 1.0);
    assert!(segment.coordinates.iter().any(|p| p.approx_eq(&ll(0.0, 0.0), 1e-12)));
    assert!(!segment.coordinates.iter().any(|p| p.approx_eq(&ll(0.01, 0.01), 1e-12)));
}

#[test]
fn opposite_start_on_loop() {
    // ~44 m east of the southbound side at t = 0.95: across the road
    let result = dispatch(ll(0.002, 0.0004), ll(0.0, 0.004), vec![ring()]);

    assert!(!kinds(&result).contains(&CaseKind::NormalForward));
    assert_eq!(kinds(&result), vec![CaseKind::OppositeStart]);

    let itinerary = &result.results[0];
    assert_eq!(itinerary.confidence(), 0.85);
    let segment = &itinerary.segments()[0];
    assert!(segment.requires_loop);
    assert!((segment.end_t - 0.1).abs() < 1e-6);
    let walk = segment.walk_to_board_m.unwrap();
    assert!((walk - 44.5).abs() < 1.0, "walk = {walk}");

    let notes = itinerary.annotations().unwrap();
    assert!((notes.original_start_t.unwrap() - 0.95).abs() < 1e-6);
}

#[test]
fn opposite_start_finds_boarding_point_ahead() {
    // Route runs east past the origin, loops round the block and comes back
    // north along a street to the west. The origin is 25 m north of the
    // eastbound street (across it) but east of the northbound one, which
    // is its right-hand side.
    let block = route(
        "block",
        &[
            (0.0, 0.0),
            (0.0, 0.006),
            (0.0006, 0.006),
            (0.0006, 0.002),
            (0.01, 0.002),
        ],
    );
    let origin = ll(0.000225, 0.003);
    let destination = ll(0.008, 0.002);

    let result = dispatch(origin, destination, vec![block]);

    // Both-opposite also matches this route but ranks below
    assert_eq!(kinds(&result), vec![CaseKind::OppositeStart]);
    let itinerary = &result.results[0];
    let notes = itinerary.annotations().unwrap();
    assert!(notes.corrected_start_t.unwrap() > notes.original_start_t.unwrap());

    // Boards just after the last corner, round the block from the origin
    let segment = &itinerary.segments()[0];
    let walk = segment.walk_to_board_m.unwrap();
    assert!((100.0..130.0).contains(&walk), "walk = {walk}");
    assert!(!segment.requires_loop);
    assert!((segment.end_t - 0.9).abs() < 1e-3);
}

#[test]
fn opposite_end_beats_both_opposite() {
    // Destination ~50 m north of an eastbound road: across it
    let result = dispatch(ll(0.0, 0.002), ll(0.00045, 0.008), vec![eastbound()]);

    assert!(result.handlers_run.contains(&CaseKind::OppositeEnd));
    assert!(result.handlers_run.contains(&CaseKind::BothOpposite));
    // Same route, so only the higher-confidence itinerary survives
    assert_eq!(kinds(&result), vec![CaseKind::OppositeEnd]);

    let segment = &result.results[0].segments()[0];
    assert!((segment.end_t - 0.8).abs() < 1e-3);
    let walk = segment.walk_from_alight_m.unwrap();
    assert!((walk - 50.0).abs() < 1.0, "walk = {walk}");
}

#[test]
fn both_opposite_picks_shortest_ride() {
    // Both pins ~11 m off the corridor, so neither is "on" it but both are
    // within the both-opposite search radius
    let dispatcher = Dispatcher::new(
        CaseConfig {
            on_corridor_m: 5.0,
            near_side_m: 10.0,
            ..CaseConfig::default()
        },
        FareTable::default(),
    );
    let result = dispatch_with(&dispatcher, ll(0.0001, 0.002), ll(0.0001, 0.008), vec![eastbound()]);

    assert_eq!(kinds(&result), vec![CaseKind::BothOpposite]);
    let segment = &result.results[0].segments()[0];
    // Boards after the raw origin and alights before the raw destination
    assert!(segment.start_t > 0.2);
    assert!(segment.end_t < 0.8);
    assert!(segment.walk_to_board_m.unwrap() <= 100.0);
    assert!(segment.walk_from_alight_m.unwrap() <= 100.0);
}

#[test]
fn reverse_travel_on_non_loop_finds_nothing() {
    let result = dispatch(ll(0.0, 0.008), ll(0.0, 0.002), vec![eastbound()]);

    assert!(result.results.is_empty());
    assert!(result.handlers_run.is_empty());
}

#[test]
fn same_position_finds_nothing() {
    let result = dispatch(ll(0.0, 0.005), ll(0.0, 0.005), vec![eastbound()]);
    assert!(result.results.is_empty());
}

#[test]
fn reverse_travel_off_corridor_finds_nothing() {
    // ~22 m south of the road, in the side band and far enough off for the
    // both-opposite search, with the destination just behind the origin
    let result = dispatch(ll(-0.0002, 0.0051), ll(-0.0002, 0.0049), vec![eastbound()]);
    assert!(result.results.is_empty());
    assert!(result.handlers_run.is_empty());

    // Same again from across the road
    let result = dispatch(ll(0.0002, 0.008), ll(0.0002, 0.002), vec![eastbound()]);
    assert!(result.results.is_empty());
    assert!(result.handlers_run.is_empty());
}

#[test]
fn same_position_off_corridor_finds_nothing() {
    for pin in [ll(-0.0002, 0.005), ll(0.0002, 0.005)] {
        let result = dispatch(pin, pin, vec![eastbound()]);
        assert!(result.results.is_empty(), "pin {pin}");
        assert!(result.handlers_run.is_empty(), "pin {pin}");
    }
}

#[test]
fn opposite_start_behind_destination_on_non_loop_finds_nothing() {
    // Origin ~44 m across the road at t = 0.95, destination on the road at
    // t = 0.1: only a loop could get there
    let result = dispatch(ll(0.0004, 0.0095), ll(0.0, 0.001), vec![eastbound()]);
    assert!(result.results.is_empty());
    assert!(result.handlers_run.is_empty());
}

/// A: east along the equator, t = 0.5 at 0.01. B: north along 0.01, crossing
/// A at its t = 0.3.
fn crossing_pair() -> Vec<Arc<RoutePolyline>> {
    vec![
        route("a", &[(0.0, 0.0), (0.0, 0.02)]),
        route("b", &[(-0.006, 0.01), (0.014, 0.01)]),
    ]
}

#[test]
fn simple_transfer() {
    // Board A at 0.1, alight B at 0.9
    let result = dispatch(ll(0.0, 0.002), ll(0.012, 0.01), crossing_pair());

    assert_eq!(kinds(&result), vec![CaseKind::SimpleTransfer]);

    let itinerary = &result.results[0];
    assert_eq!(itinerary.confidence(), 0.70);
    let tp = itinerary.transfer().unwrap();
    assert!((tp.t_a - 0.5).abs() < 1e-6);
    assert!((tp.t_b - 0.3).abs() < 1e-6);
    assert!(tp.point.approx_eq(&ll(0.0, 0.01), 1e-9));

    let [first, second] = itinerary.segments() else {
        panic!("expected two legs");
    };
    assert_eq!(first.route_id.as_str(), "a");
    assert_eq!(second.route_id.as_str(), "b");
    assert!((first.start_t - 0.1).abs() < 1e-6);
    assert!((second.end_t - 0.9).abs() < 1e-6);

    // Each leg pays its own fare
    assert_eq!(itinerary.total_fare(), Fare::new(26));
    assert!(
        (itinerary.total_distance_m() - (first.distance_m + second.distance_m)).abs() < 1e-9
    );
}

#[test]
fn transfer_before_alighting_only() {
    // Alight B at 0.2, before the crossing at 0.3
    let result = dispatch(ll(0.0, 0.002), ll(-0.002, 0.01), crossing_pair());
    assert!(result.results.is_empty());
}

#[test]
fn transfer_start_opposite_boards_before_crossing() {
    // Origin is 120 m north of A, just past the crossing, so the raw boarding
    // point on A cannot reach it. B is nearer the origin and also matches on
    // its own; run transfers regardless so both show up.
    let dispatcher = Dispatcher::default().with_policy(TransferPolicy::Always);
    let result = dispatch_with(&dispatcher, ll(0.00108, 0.0106), ll(0.012, 0.01), crossing_pair());

    assert!(kinds(&result).contains(&CaseKind::OppositeStart));
    let itinerary = result
        .results
        .iter()
        .find(|r| r.kind() == CaseKind::TransferStartOpposite)
        .expect("transfer start opposite itinerary");

    let first = &itinerary.segments()[0];
    assert_eq!(first.route_id.as_str(), "a");
    assert!(first.start_t < 0.5);
    assert!(first.walk_to_board_m.unwrap() <= 200.0);
    let notes = itinerary.annotations().unwrap();
    assert!(notes.original_start_t.unwrap() > 0.5);
}

#[test]
fn transfer_end_opposite_alights_after_crossing() {
    // B runs north through the destination, crosses A, loops back and
    // crosses A again heading south ~67 m east of the destination. The raw
    // alighting point comes before either crossing.
    let a = route("a", &[(0.0, 0.0), (0.0, 0.02)]);
    let b = route(
        "b",
        &[
            (-0.003, 0.008),
            (0.002, 0.008),
            (0.002, 0.0086),
            (-0.0025, 0.0086),
        ],
    );

    let result = dispatch(ll(0.0, 0.002), ll(-0.002, 0.008), vec![a, b]);

    assert!(!result.results.is_empty());
    assert!(
        result
            .results
            .iter()
            .all(|r| r.kind() == CaseKind::TransferEndOpposite)
    );
    for itinerary in &result.results {
        let second = &itinerary.segments()[1];
        assert!(second.end_t > itinerary.transfer().unwrap().t_b);
        assert!(second.walk_from_alight_m.unwrap() <= 100.0);
    }
}

#[test]
fn transfer_at_loop_seam() {
    // b leaves the ring's start vertex and heads inside it. Boarding the
    // ring at t = 0.8, the crossing is reached by riding on to t = 1.0.
    let b = route("b", &[(0.0, 0.0), (0.006, 0.006)]);
    let result = dispatch(ll(0.008, 0.0), ll(0.005, 0.005), vec![ring(), b]);

    assert_eq!(kinds(&result), vec![CaseKind::SimpleTransfer]);
    let itinerary = &result.results[0];
    let tp = itinerary.transfer().unwrap();
    assert!((tp.t_a - 1.0).abs() < 1e-9);
    assert!(tp.t_b.abs() < 1e-9);

    let [first, second] = itinerary.segments() else {
        panic!("expected two legs");
    };
    assert_eq!(first.route_id.as_str(), "ring");
    assert!((first.start_t - 0.8).abs() < 1e-6);
    assert!((first.end_t - 1.0).abs() < 1e-9);
    assert!(!first.requires_loop);
    assert_eq!(second.route_id.as_str(), "b");
    assert!((second.end_t - 5.0 / 6.0).abs() < 1e-3);
}

#[test]
fn transfers_are_fallback_by_default() {
    // A serves the whole trip; B crosses A and ends near the destination
    let a = route("a", &[(0.0, 0.0), (0.0, 0.02)]);
    let b = route("b", &[(-0.005, 0.01), (0.0, 0.01), (0.0005, 0.018)]);
    let origin = ll(0.0, 0.002);
    let destination = ll(0.0, 0.018);

    let fallback = dispatch(origin, destination, vec![a.clone(), b.clone()]);
    assert_eq!(kinds(&fallback), vec![CaseKind::NormalForward]);

    let always = Dispatcher::default().with_policy(TransferPolicy::Always);
    let result = dispatch_with(&always, origin, destination, vec![a, b]);
    assert_eq!(result.results[0].kind(), CaseKind::NormalForward);
    assert!(kinds(&result).contains(&CaseKind::SimpleTransfer));
    assert!(result.handlers_run.contains(&CaseKind::SimpleTransfer));
}

#[test]
fn route_pair_cap_bounds_work() {
    let dispatcher = Dispatcher::new(
        CaseConfig::default().with_max_route_pairs(0),
        FareTable::default(),
    );
    let result = dispatch_with(&dispatcher, ll(0.0, 0.002), ll(0.012, 0.01), crossing_pair());

    assert!(result.results.is_empty());
    assert!(result.failures.is_empty());
}
