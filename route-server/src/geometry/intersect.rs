//! Crossings between two polylines.

use geo::algorithm::line_intersection::{LineIntersection, line_intersection};
use geo::{Coord, Line};

use crate::domain::LatLng;

use super::{Polyline, haversine_m};

/// Crossings closer than this along both lines collapse into one.
const MERGE_DISTANCE_M: f64 = 1.0;

/// A point where two polylines meet, with its position along each.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Crossing {
    pub point: LatLng,
    /// Fractional position along the first line
    pub t_a: f64,
    /// Fractional position along the second line
    pub t_b: f64,
}

/// All points where `a` and `b` cross or touch, ordered along `a`.
///
/// Positions come from the segments the crossing was found on, so a line
/// that passes the same spot twice reports it once per pass. Shared road
/// sections report both ends of each overlapping stretch. Zero-length
/// segments never intersect anything.
pub fn intersect(a: &Polyline, b: &Polyline) -> Vec<Crossing> {
    let b_lines: Vec<(usize, Line<f64>)> = (0..b.segment_count())
        .filter(|&j| !b.is_degenerate_segment(j))
        .map(|j| (j, segment_line(b, j)))
        .collect();

    let mut hits: Vec<Crossing> = Vec::new();
    for i in 0..a.segment_count() {
        if a.is_degenerate_segment(i) {
            continue;
        }
        let line_a = segment_line(a, i);

        for &(j, line_b) in &b_lines {
            if !boxes_overlap(&line_a, &line_b) {
                continue;
            }
            let points = match line_intersection(line_a, line_b) {
                Some(LineIntersection::SinglePoint { intersection, .. }) => {
                    vec![to_lat_lng(intersection)]
                }
                Some(LineIntersection::Collinear { intersection }) => {
                    vec![to_lat_lng(intersection.start), to_lat_lng(intersection.end)]
                }
                None => Vec::new(),
            };
            hits.extend(points.into_iter().map(|point| Crossing {
                point,
                t_a: fraction_on_segment(a, i, point),
                t_b: fraction_on_segment(b, j, point),
            }));
        }
    }

    hits.sort_by(|p, q| p.t_a.total_cmp(&q.t_a).then(p.t_b.total_cmp(&q.t_b)));

    // A crossing at a vertex is found on both segments meeting there
    let (len_a, len_b) = (a.length_m(), b.length_m());
    let mut crossings: Vec<Crossing> = Vec::new();
    for hit in hits {
        let duplicate = crossings.iter().any(|kept| {
            (kept.t_a - hit.t_a).abs() * len_a <= MERGE_DISTANCE_M
                && (kept.t_b - hit.t_b).abs() * len_b <= MERGE_DISTANCE_M
        });
        if !duplicate {
            crossings.push(hit);
        }
    }

    crossings
}

/// Fractional position of `p`, which lies on segment `i` of `line`.
fn fraction_on_segment(line: &Polyline, i: usize, p: LatLng) -> f64 {
    let into = haversine_m(line.vertices()[i], p).min(line.segment_length(i));
    ((line.cumulative()[i] + into) / line.length_m()).clamp(0.0, 1.0)
}

fn segment_line(line: &Polyline, i: usize) -> Line<f64> {
    let v = line.vertices();
    Line::new(Coord::from(v[i]), Coord::from(v[i + 1]))
}

fn to_lat_lng(c: Coord<f64>) -> LatLng {
    LatLng::new_unchecked(c.y, c.x)
}

fn boxes_overlap(a: &Line<f64>, b: &Line<f64>) -> bool {
    let (a_min_x, a_max_x) = min_max(a.start.x, a.end.x);
    let (a_min_y, a_max_y) = min_max(a.start.y, a.end.y);
    let (b_min_x, b_max_x) = min_max(b.start.x, b.end.x);
    let (b_min_y, b_max_y) = min_max(b.start.y, b.end.y);
    a_min_x <= b_max_x && b_min_x <= a_max_x && a_min_y <= b_max_y && b_min_y <= a_max_y
}

fn min_max(p: f64, q: f64) -> (f64, f64) {
    if p <= q { (p, q) } else { (q, p) }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ll(lat: f64, lng: f64) -> LatLng {
        LatLng::new(lat, lng).unwrap()
    }

    fn line(points: &[(f64, f64)]) -> Polyline {
        Polyline::new(points.iter().map(|&(lat, lng)| ll(lat, lng)).collect()).unwrap()
    }

    #[test]
    fn single_crossing() {
        let a = line(&[(0.0, 0.0), (0.0, 0.02)]);
        let b = line(&[(-0.01, 0.01), (0.01, 0.01)]);
        let hits = intersect(&a, &b);
        assert_eq!(hits.len(), 1);
        assert!(hits[0].point.approx_eq(&ll(0.0, 0.01), 1e-12));
        assert!((hits[0].t_a - 0.5).abs() < 1e-6);
        assert!((hits[0].t_b - 0.5).abs() < 1e-6);
    }

    #[test]
    fn disjoint_lines() {
        let a = line(&[(0.0, 0.0), (0.0, 0.01)]);
        let b = line(&[(0.01, 0.0), (0.01, 0.01)]);
        assert!(intersect(&a, &b).is_empty());
    }

    #[test]
    fn repeated_crossings_ordered_along_first() {
        // b zig-zags across a three times
        let a = line(&[(0.0, 0.0), (0.0, 0.04)]);
        let b = line(&[
            (0.01, 0.005),
            (-0.01, 0.015),
            (0.01, 0.025),
            (-0.01, 0.035),
        ]);
        let hits = intersect(&a, &b);
        assert_eq!(hits.len(), 3);
        assert!(hits.windows(2).all(|w| w[0].point.lng() < w[1].point.lng()));
        assert!(hits.windows(2).all(|w| w[0].t_a < w[1].t_a && w[0].t_b < w[1].t_b));
    }

    #[test]
    fn shared_section_reports_both_ends() {
        let a = line(&[(0.0, 0.0), (0.0, 0.03)]);
        let b = line(&[(0.01, 0.01), (0.0, 0.01), (0.0, 0.02), (0.01, 0.02)]);
        let hits = intersect(&a, &b);
        assert_eq!(hits.len(), 2);
        assert!(hits[0].point.approx_eq(&ll(0.0, 0.01), 1e-9));
        assert!(hits[1].point.approx_eq(&ll(0.0, 0.02), 1e-9));
    }

    #[test]
    fn touching_at_shared_vertex_counts_once() {
        let a = line(&[(0.0, 0.0), (0.0, 0.01), (0.0, 0.02)]);
        let b = line(&[(0.01, 0.01), (0.0, 0.01), (-0.01, 0.01)]);
        assert_eq!(intersect(&a, &b).len(), 1);
    }

    #[test]
    fn second_pass_over_a_crossing_is_kept() {
        // b runs north across a, loops round and crosses a again at the
        // same spot heading south
        let a = line(&[(0.0, 0.0), (0.0, 0.02)]);
        let b = line(&[
            (-0.01, 0.01),
            (0.01, 0.01),
            (0.01, 0.012),
            (-0.01, 0.008),
        ]);
        let hits = intersect(&a, &b);
        assert_eq!(hits.len(), 2);
        assert!(hits.iter().all(|h| h.point.approx_eq(&ll(0.0, 0.01), 1e-9)));
        assert!(hits.iter().all(|h| (h.t_a - 0.5).abs() < 1e-6));
        assert!(hits[0].t_b < 0.25);
        assert!(hits[1].t_b > 0.5);
    }

    #[test]
    fn loop_seam_reports_both_ends() {
        let ring = line(&[
            (0.0, 0.0),
            (0.0, 0.01),
            (0.01, 0.01),
            (0.01, 0.0),
            (0.0, 0.0),
        ]);
        let diagonal = line(&[(-0.005, -0.005), (0.009, 0.009)]);
        let hits = intersect(&ring, &diagonal);
        assert_eq!(hits.len(), 2);
        assert!(hits[0].t_a.abs() < 1e-9);
        assert!((hits[1].t_a - 1.0).abs() < 1e-9);
        assert!((hits[0].t_b - hits[1].t_b).abs() < 1e-9);
    }
}
