//! Ranking itineraries across handlers.

use std::cmp::Ordering;
use std::collections::HashSet;

use crate::domain::CaseResult;

/// Order itineraries best-first.
///
/// Itineraries are ranked by:
/// 1. Confidence (higher is better)
/// 2. Total ride distance (shorter is better)
pub fn rank_results(mut results: Vec<CaseResult>) -> Vec<CaseResult> {
    results.sort_by(compare);
    results
}

fn compare(a: &CaseResult, b: &CaseResult) -> Ordering {
    b.confidence()
        .total_cmp(&a.confidence())
        .then_with(|| a.total_distance_m().total_cmp(&b.total_distance_m()))
}

/// Collapse itineraries that ride the same routes through the same transfer
/// point, keeping the first of each. Call on ranked input so the best-ranked
/// copy survives.
pub fn deduplicate(results: Vec<CaseResult>) -> Vec<CaseResult> {
    let mut seen = HashSet::new();
    results
        .into_iter()
        .filter(|r| seen.insert(r.itinerary_key()))
        .collect()
}

/// Rank, de-duplicate and truncate to `max_results`.
pub fn finalize(results: Vec<CaseResult>, max_results: usize) -> Vec<CaseResult> {
    let mut results = deduplicate(rank_results(results));
    results.truncate(max_results);
    results
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{CaseKind, LatLng, RouteCode, RouteId, RouteSegment};
    use crate::fare::Fare;

    fn single(kind: CaseKind, route: &str, distance_m: f64) -> CaseResult {
        let segment = RouteSegment {
            route_id: RouteId::new(route).unwrap(),
            route_code: RouteCode::new(route),
            coordinates: vec![
                LatLng::new(0.0, 0.0).unwrap(),
                LatLng::new(0.0, 0.01).unwrap(),
            ],
            distance_m,
            fare: Fare::new(13),
            start_t: 0.2,
            end_t: 0.8,
            requires_loop: false,
            walk_to_board_m: None,
            walk_from_alight_m: None,
        };
        CaseResult::new(kind, vec![segment]).unwrap()
    }

    #[test]
    fn confidence_then_distance() {
        let ranked = rank_results(vec![
            single(CaseKind::BothOpposite, "a", 100.0),
            single(CaseKind::NormalForward, "b", 900.0),
            single(CaseKind::NormalForward, "c", 300.0),
            single(CaseKind::OppositeEnd, "d", 50.0),
        ]);

        let order: Vec<&str> = ranked
            .iter()
            .map(|r| r.segments()[0].route_id.as_str())
            .collect();
        assert_eq!(order, vec!["c", "b", "d", "a"]);
    }

    #[test]
    fn deduplicate_keeps_best_ranked() {
        let results = finalize(
            vec![
                single(CaseKind::BothOpposite, "a", 100.0),
                single(CaseKind::NormalForward, "a", 120.0),
                single(CaseKind::NormalForward, "b", 300.0),
            ],
            10,
        );

        assert_eq!(results.len(), 2);
        assert_eq!(results[0].kind(), CaseKind::NormalForward);
        assert_eq!(results[0].segments()[0].route_id.as_str(), "a");
    }

    #[test]
    fn truncates() {
        let results = finalize(
            (0..5)
                .map(|i| single(CaseKind::NormalForward, &format!("r{i}"), i as f64))
                .collect(),
            3,
        );
        assert_eq!(results.len(), 3);
    }
}
