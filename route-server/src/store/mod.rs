//! Route store boundary.
//!
//! The engine reads routes through [`RouteStore`] and never writes them.
//! Two implementations are provided:
//! - [`HttpRouteStore`] talks to an external route catalogue
//! - [`MemoryRouteStore`] serves routes loaded from a JSON file
//!
//! Geometry on the wire is `[lng, lat]` ordered; see [`RouteRecord`].

mod client;
mod error;
mod memory;
mod types;

use std::future::Future;
use std::sync::Arc;

use crate::domain::{LatLng, RouteId, RoutePolyline};

pub use client::{HttpRouteStore, HttpStoreConfig};
pub use error::StoreError;
pub use memory::MemoryRouteStore;
pub use types::{NearResponse, RouteRecord, convert_records};

/// Read access to the route catalogue.
pub trait RouteStore: Send + Sync {
    /// Routes whose geometry passes within `radius_m` of `point`.
    ///
    /// Routes that fail validation are skipped, not reported as errors.
    fn find_routes_near(
        &self,
        point: LatLng,
        radius_m: f64,
    ) -> impl Future<Output = Result<Vec<Arc<RoutePolyline>>, StoreError>> + Send;

    /// A single route, or `None` if the catalogue has no such id.
    fn get_route_by_id(
        &self,
        id: &RouteId,
    ) -> impl Future<Output = Result<Option<Arc<RoutePolyline>>, StoreError>> + Send;
}

/// The store a server process was configured with.
#[derive(Clone)]
pub enum RouteSource {
    Http(HttpRouteStore),
    Memory(MemoryRouteStore),
}

impl RouteStore for RouteSource {
    async fn find_routes_near(
        &self,
        point: LatLng,
        radius_m: f64,
    ) -> Result<Vec<Arc<RoutePolyline>>, StoreError> {
        match self {
            RouteSource::Http(store) => store.find_routes_near(point, radius_m).await,
            RouteSource::Memory(store) => store.find_routes_near(point, radius_m).await,
        }
    }

    async fn get_route_by_id(&self, id: &RouteId) -> Result<Option<Arc<RoutePolyline>>, StoreError> {
        match self {
            RouteSource::Http(store) => store.get_route_by_id(id).await,
            RouteSource::Memory(store) => store.get_route_by_id(id).await,
        }
    }
}
