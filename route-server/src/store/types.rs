//! Wire records for route data.
//!
//! Coordinates are `[lng, lat]` pairs, the order the catalogue stores them in.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::domain::{DomainError, LatLng, RouteCode, RouteId, RoutePolyline};

/// One route as stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouteRecord {
    pub id: String,
    pub code: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub coordinates: Vec<[f64; 2]>,
}

impl RouteRecord {
    /// Validate into a route the engine can use.
    pub fn into_route(self) -> Result<RoutePolyline, DomainError> {
        let id = RouteId::new(self.id)?;

        let vertices = self
            .coordinates
            .iter()
            .map(|&pair| LatLng::from_lng_lat(pair))
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| DomainError::InvalidGeometry {
                route: id.clone(),
                reason: e.to_string(),
            })?;

        let route = RoutePolyline::new(id, RouteCode::new(self.code), vertices)?;
        Ok(match self.name {
            Some(name) => route.with_name(name),
            None => route,
        })
    }

    pub fn from_route(route: &RoutePolyline) -> Self {
        Self {
            id: route.id().to_string(),
            code: route.code().to_string(),
            name: route.name().map(str::to_string),
            coordinates: route.vertices().iter().map(LatLng::to_lng_lat).collect(),
        }
    }
}

/// Response body of the "routes near a point" lookup.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NearResponse {
    pub routes: Vec<RouteRecord>,
}

/// Convert records to routes, skipping (and logging) any that fail
/// validation.
pub fn convert_records(records: Vec<RouteRecord>) -> Vec<Arc<RoutePolyline>> {
    records
        .into_iter()
        .filter_map(|record| match record.into_route() {
            Ok(route) => Some(Arc::new(route)),
            Err(e) => {
                warn!(error = %e, "skipping invalid route");
                None
            }
        })
        .collect()
}
