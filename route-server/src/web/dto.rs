//! Data transfer objects for web requests and responses.
//!
//! All coordinates are `[lng, lat]` arrays.

use serde::{Deserialize, Serialize};

use crate::cases::HandlerFailure;
use crate::domain::{Annotations, CaseResult, LatLng, RoutePolyline, RouteSegment, TransferPoint};
use crate::finder::QueryResult;

/// Query string for `GET /api/itineraries`.
#[derive(Debug, Deserialize)]
pub struct ItineraryQuery {
    /// Origin as `lng,lat`
    pub origin: String,

    /// Destination as `lng,lat`
    pub destination: String,
}

/// Body for `POST /api/itineraries`.
#[derive(Debug, Deserialize)]
pub struct ItineraryRequest {
    pub origin: [f64; 2],
    pub destination: [f64; 2],
}

/// Parse a `lng,lat` pair.
pub fn parse_lng_lat(s: &str) -> Result<LatLng, String> {
    let (lng, lat) = s
        .split_once(',')
        .ok_or_else(|| format!("expected \"lng,lat\", got {s:?}"))?;
    let lng: f64 = lng
        .trim()
        .parse()
        .map_err(|_| format!("invalid longitude {lng:?}"))?;
    let lat: f64 = lat
        .trim()
        .parse()
        .map_err(|_| format!("invalid latitude {lat:?}"))?;
    LatLng::from_lng_lat([lng, lat]).map_err(|e| e.to_string())
}

/// Response for an itinerary query.
#[derive(Debug, Serialize)]
pub struct ItinerariesResponse {
    /// Ranked itineraries; empty when no route was found
    pub itineraries: Vec<ItineraryResult>,

    /// Distinct candidate routes near either pin
    pub candidates_considered: usize,

    /// Case handlers whose precondition held
    pub handlers_run: Vec<&'static str>,

    /// Case handlers that failed
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub failures: Vec<FailureResult>,
}

impl ItinerariesResponse {
    pub fn from_result(result: &QueryResult) -> Self {
        Self {
            itineraries: result.results.iter().map(ItineraryResult::from_case).collect(),
            candidates_considered: result.candidates_considered,
            handlers_run: result.handlers_run.iter().map(|k| k.as_str()).collect(),
            failures: result.failures.iter().map(FailureResult::from_failure).collect(),
        }
    }
}

/// One itinerary.
#[derive(Debug, Serialize)]
pub struct ItineraryResult {
    /// Case that produced it, e.g. `normal_forward`
    pub kind: &'static str,
    pub confidence: f64,
    pub total_distance_m: f64,
    pub total_fare: u32,
    pub segments: Vec<SegmentResult>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub transfer: Option<TransferResult>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub annotations: Option<AnnotationsResult>,
}

impl ItineraryResult {
    pub fn from_case(result: &CaseResult) -> Self {
        Self {
            kind: result.kind().as_str(),
            confidence: result.confidence(),
            total_distance_m: result.total_distance_m(),
            total_fare: result.total_fare().units(),
            segments: result.segments().iter().map(SegmentResult::from_segment).collect(),
            transfer: result.transfer().map(TransferResult::from_point),
            annotations: result.annotations().map(AnnotationsResult::from_annotations),
        }
    }
}

/// One ride on one route.
#[derive(Debug, Serialize)]
pub struct SegmentResult {
    pub route_id: String,
    pub route_code: String,
    pub coordinates: Vec<[f64; 2]>,
    pub distance_m: f64,
    pub fare: u32,
    pub start_t: f64,
    pub end_t: f64,
    pub requires_loop: bool,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub walk_to_board_m: Option<f64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub walk_from_alight_m: Option<f64>,
}

impl SegmentResult {
    pub fn from_segment(segment: &RouteSegment) -> Self {
        Self {
            route_id: segment.route_id.to_string(),
            route_code: segment.route_code.to_string(),
            coordinates: segment.coordinates.iter().map(LatLng::to_lng_lat).collect(),
            distance_m: segment.distance_m,
            fare: segment.fare.units(),
            start_t: segment.start_t,
            end_t: segment.end_t,
            requires_loop: segment.requires_loop,
            walk_to_board_m: segment.walk_to_board_m,
            walk_from_alight_m: segment.walk_from_alight_m,
        }
    }
}

/// Where the two legs of a transfer meet.
#[derive(Debug, Serialize)]
pub struct TransferResult {
    pub point: [f64; 2],
    pub t_a: f64,
    pub t_b: f64,
}

impl TransferResult {
    pub fn from_point(tp: &TransferPoint) -> Self {
        Self {
            point: tp.point.to_lng_lat(),
            t_a: tp.t_a,
            t_b: tp.t_b,
        }
    }
}

/// How boarding and alighting positions were corrected.
#[derive(Debug, Serialize)]
pub struct AnnotationsResult {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub original_start_t: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub corrected_start_t: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub original_end_t: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub corrected_end_t: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub walk_to_board_m: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub walk_from_alight_m: Option<f64>,
}

impl AnnotationsResult {
    pub fn from_annotations(a: &Annotations) -> Self {
        Self {
            original_start_t: a.original_start_t,
            corrected_start_t: a.corrected_start_t,
            original_end_t: a.original_end_t,
            corrected_end_t: a.corrected_end_t,
            walk_to_board_m: a.walk_to_board_m,
            walk_from_alight_m: a.walk_from_alight_m,
        }
    }
}

/// A handler that failed.
#[derive(Debug, Serialize)]
pub struct FailureResult {
    pub kind: &'static str,
    pub message: String,
}

impl FailureResult {
    pub fn from_failure(f: &HandlerFailure) -> Self {
        Self {
            kind: f.kind.as_str(),
            message: f.message.clone(),
        }
    }
}

/// Response for `GET /api/routes/{id}`.
#[derive(Debug, Serialize)]
pub struct RouteResponse {
    pub id: String,
    pub code: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    pub coordinates: Vec<[f64; 2]>,
    pub is_closed_loop: bool,
    pub length_m: f64,
}

impl RouteResponse {
    pub fn from_route(route: &RoutePolyline) -> Self {
        Self {
            id: route.id().to_string(),
            code: route.code().to_string(),
            name: route.name().map(str::to_string),
            coordinates: route.vertices().iter().map(LatLng::to_lng_lat).collect(),
            is_closed_loop: route.is_closed_loop(),
            length_m: route.length_m(),
        }
    }
}

/// Error response body.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}
