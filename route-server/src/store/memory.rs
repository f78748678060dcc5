//! In-memory route store.
//!
//! Holds the whole catalogue in memory, loaded from a JSON array of
//! [`RouteRecord`]s. Suitable for development, tests and small deployments.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::{debug, info};

use crate::domain::{LatLng, RouteId, RoutePolyline};
use crate::geometry::distance_to_path;

use super::RouteStore;
use super::error::StoreError;
use super::types::{RouteRecord, convert_records};

/// Route store that serves routes held in memory.
#[derive(Clone, Default)]
pub struct MemoryRouteStore {
    routes: Arc<RwLock<Vec<Arc<RoutePolyline>>>>,

    /// File the routes were loaded from, if any.
    path: Option<PathBuf>,
}

impl MemoryRouteStore {
    /// Create a store holding the given routes.
    pub fn new(routes: impl IntoIterator<Item = RoutePolyline>) -> Self {
        let routes = routes.into_iter().map(Arc::new).collect();
        Self {
            routes: Arc::new(RwLock::new(routes)),
            path: None,
        }
    }

    /// Load routes from a JSON file. Invalid routes are skipped.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref();
        let routes = read_routes(path)?;
        info!(path = %path.display(), routes = routes.len(), "loaded route data");

        Ok(Self {
            routes: Arc::new(RwLock::new(routes)),
            path: Some(path.to_path_buf()),
        })
    }

    /// Re-read the file this store was loaded from.
    ///
    /// Returns the number of routes now held. On error the current routes
    /// are kept.
    pub async fn reload(&self) -> Result<usize, StoreError> {
        let Some(path) = self.path.clone() else {
            return Err(StoreError::Io(std::io::Error::other(
                "store was not loaded from a file",
            )));
        };

        let routes = tokio::task::spawn_blocking(move || read_routes(&path))
            .await
            .map_err(|e| StoreError::Io(std::io::Error::other(e)))??;

        let count = routes.len();
        *self.routes.write().await = routes;
        info!(routes = count, "reloaded route data");
        Ok(count)
    }

    /// Number of routes held.
    pub async fn len(&self) -> usize {
        self.routes.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.routes.read().await.is_empty()
    }
}

fn read_routes(path: &Path) -> Result<Vec<Arc<RoutePolyline>>, StoreError> {
    let json = std::fs::read_to_string(path)?;
    let records: Vec<RouteRecord> = serde_json::from_str(&json).map_err(|e| StoreError::Json {
        message: format!("{}: {e}", path.display()),
        body: None,
    })?;
    Ok(convert_records(records))
}

impl RouteStore for MemoryRouteStore {
    async fn find_routes_near(
        &self,
        point: LatLng,
        radius_m: f64,
    ) -> Result<Vec<Arc<RoutePolyline>>, StoreError> {
        let routes = self.routes.read().await;
        let near: Vec<_> = routes
            .iter()
            .filter(|r| distance_to_path(point, r.vertices()) <= radius_m)
            .cloned()
            .collect();
        debug!(%point, radius_m, found = near.len(), "memory store lookup");
        Ok(near)
    }

    async fn get_route_by_id(&self, id: &RouteId) -> Result<Option<Arc<RoutePolyline>>, StoreError> {
        let routes = self.routes.read().await;
        Ok(routes.iter().find(|r| r.id() == id).cloned())
    }
}
