//! Read-through cache in front of a route store.
//!
//! Nearby-route lookups are keyed by a snapped grid cell and the requested
//! radius, so queries from the same few blocks share an entry. The store is
//! asked about the cell centre with the radius widened by the cell's half
//! diagonal, which makes the cached answer a superset of the exact answer
//! for every point in the cell. Each hit is filtered back down to the exact
//! radius before it is returned.

use std::f64::consts::SQRT_2;
use std::sync::Arc;
use std::time::Duration;

use moka::future::Cache as MokaCache;
use tracing::trace;

use crate::domain::{LatLng, RouteId, RoutePolyline};
use crate::geometry::distance_to_path;
use crate::store::{RouteStore, StoreError};

/// Meters per degree of latitude.
const METERS_PER_DEGREE: f64 = 111_320.0;

/// Cache key for nearby lookups: (lat cell, lng cell, radius in whole meters).
type NearKey = (i64, i64, u32);

/// Cached nearby lookup.
type NearEntry = Arc<Vec<Arc<RoutePolyline>>>;

/// Configuration for the cache.
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// TTL for cached entries.
    pub ttl: Duration,

    /// Maximum number of cached entries per table.
    pub max_capacity: u64,

    /// Grid cell edge in meters.
    pub cell_m: f64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl: Duration::from_secs(300),
            max_capacity: 10_000,
            cell_m: 50.0,
        }
    }
}

/// Route store with caching.
///
/// Wraps any [`RouteStore`] and caches both lookups.
pub struct CachedRouteStore<S> {
    store: S,
    near: MokaCache<NearKey, NearEntry>,
    by_id: MokaCache<RouteId, Arc<RoutePolyline>>,
    cell_deg: f64,
    half_diagonal_m: f64,
}

impl<S: RouteStore> CachedRouteStore<S> {
    pub fn new(store: S, config: &CacheConfig) -> Self {
        let near = MokaCache::builder()
            .time_to_live(config.ttl)
            .max_capacity(config.max_capacity)
            .build();
        let by_id = MokaCache::builder()
            .time_to_live(config.ttl)
            .max_capacity(config.max_capacity)
            .build();

        let cell_m = config.cell_m.max(1.0);
        Self {
            store,
            near,
            by_id,
            cell_deg: cell_m / METERS_PER_DEGREE,
            half_diagonal_m: cell_m * SQRT_2 / 2.0,
        }
    }

    /// Grid cell containing `point`.
    fn cell(&self, point: LatLng) -> (i64, i64) {
        (
            (point.lat() / self.cell_deg).floor() as i64,
            (point.lng() / self.cell_deg).floor() as i64,
        )
    }

    /// Centre of a grid cell, or `None` if it falls off the globe.
    fn cell_center(&self, (lat, lng): (i64, i64)) -> Option<LatLng> {
        LatLng::new(
            (lat as f64 + 0.5) * self.cell_deg,
            (lng as f64 + 0.5) * self.cell_deg,
        )
        .ok()
    }

    /// Access the underlying store for operations that bypass cache.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Get cache statistics (for monitoring).
    pub fn entry_count(&self) -> u64 {
        self.near.entry_count() + self.by_id.entry_count()
    }

    /// Invalidate all cached entries.
    pub fn invalidate_all(&self) {
        self.near.invalidate_all();
        self.by_id.invalidate_all();
    }
}

impl<S: RouteStore> RouteStore for CachedRouteStore<S> {
    async fn find_routes_near(
        &self,
        point: LatLng,
        radius_m: f64,
    ) -> Result<Vec<Arc<RoutePolyline>>, StoreError> {
        let radius_key = radius_m.max(0.0).ceil() as u32;
        let cell = self.cell(point);

        let Some(center) = self.cell_center(cell) else {
            return self.store.find_routes_near(point, radius_m).await;
        };

        let key = (cell.0, cell.1, radius_key);
        let entry = match self.near.get(&key).await {
            Some(cached) => {
                trace!(?key, "route cache hit");
                cached
            }
            None => {
                let lookup_m = f64::from(radius_key) + self.half_diagonal_m;
                let routes = self.store.find_routes_near(center, lookup_m).await?;
                let entry = Arc::new(routes);
                self.near.insert(key, entry.clone()).await;
                entry
            }
        };

        Ok(entry
            .iter()
            .filter(|r| distance_to_path(point, r.vertices()) <= radius_m)
            .cloned()
            .collect())
    }

    async fn get_route_by_id(&self, id: &RouteId) -> Result<Option<Arc<RoutePolyline>>, StoreError> {
        if let Some(cached) = self.by_id.get(id).await {
            return Ok(Some(cached));
        }

        let route = self.store.get_route_by_id(id).await?;
        if let Some(route) = &route {
            self.by_id.insert(id.clone(), route.clone()).await;
        }
        Ok(route)
    }
}
