//! Application state for the web layer.

use std::sync::Arc;
use std::time::Duration;

use crate::cache::CachedRouteStore;
use crate::finder::RouteFinder;
use crate::store::RouteSource;

/// The store stack a server runs against.
pub type AppStore = CachedRouteStore<RouteSource>;

/// Default bound on a whole itinerary query.
const DEFAULT_QUERY_TIMEOUT: Duration = Duration::from_secs(10);

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    /// Query engine over the configured route store
    pub finder: Arc<RouteFinder<AppStore>>,

    /// Deadline applied to each itinerary query
    pub query_timeout: Duration,
}

impl AppState {
    pub fn new(finder: RouteFinder<AppStore>) -> Self {
        Self {
            finder: Arc::new(finder),
            query_timeout: DEFAULT_QUERY_TIMEOUT,
        }
    }

    pub fn with_query_timeout(mut self, timeout: Duration) -> Self {
        self.query_timeout = timeout;
        self
    }
}
