use std::net::SocketAddr;

use route_server::cache::{CacheConfig, CachedRouteStore};
use route_server::finder::{FinderConfig, RouteFinder};
use route_server::store::{HttpRouteStore, HttpStoreConfig, MemoryRouteStore, RouteSource};
use route_server::web::{AppState, create_router};
use tracing_subscriber::EnvFilter;

/// Route data used when no catalogue URL is configured.
const DEFAULT_ROUTE_DATA: &str = "data/routes.json";

const DEFAULT_BIND_ADDR: &str = "127.0.0.1:3000";

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("route_server=info,tower_http=info")),
        )
        .init();

    // Pick the route store: an external catalogue if configured, else local JSON
    let source = match std::env::var("ROUTE_STORE_URL") {
        Ok(url) => {
            tracing::info!(%url, "using HTTP route store");
            let store = HttpRouteStore::new(HttpStoreConfig::new(url))
                .expect("Failed to create HTTP route store");
            RouteSource::Http(store)
        }
        Err(_) => {
            let path =
                std::env::var("ROUTE_DATA").unwrap_or_else(|_| DEFAULT_ROUTE_DATA.to_string());
            let store = MemoryRouteStore::load(&path).expect("Failed to load route data");
            RouteSource::Memory(store)
        }
    };

    let store = CachedRouteStore::new(source, &CacheConfig::default());
    let finder = RouteFinder::new(store, FinderConfig::default());
    let app = create_router(AppState::new(finder));

    let addr: SocketAddr = std::env::var("BIND_ADDR")
        .unwrap_or_else(|_| DEFAULT_BIND_ADDR.to_string())
        .parse()
        .expect("BIND_ADDR must be host:port");

    tracing::info!("Route finder listening on http://{addr}");
    tracing::info!("  GET  /health");
    tracing::info!("  GET  /api/itineraries?origin=lng,lat&destination=lng,lat");
    tracing::info!("  POST /api/itineraries");
    tracing::info!("  GET  /api/routes/:id");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind");
    axum::serve(listener, app).await.expect("Server error");
}
