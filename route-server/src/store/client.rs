//! HTTP route store client.
//!
//! Talks to an external route catalogue over JSON. Bounds concurrent
//! requests with a semaphore so a burst of queries cannot flood the
//! catalogue.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Semaphore;
use tracing::debug;

use crate::domain::{LatLng, RouteId, RoutePolyline};

use super::RouteStore;
use super::error::StoreError;
use super::types::{NearResponse, RouteRecord, convert_records};

/// Default maximum concurrent requests.
const DEFAULT_MAX_CONCURRENT: usize = 8;

/// Configuration for the HTTP store client.
#[derive(Debug, Clone)]
pub struct HttpStoreConfig {
    /// Base URL of the catalogue, without trailing slash
    pub base_url: String,
    /// Per-request timeout
    pub timeout: Duration,
    /// Maximum concurrent requests
    pub max_concurrent: usize,
}

impl HttpStoreConfig {
    /// Create a new config for the catalogue at `base_url`.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            timeout: Duration::from_secs(5),
            max_concurrent: DEFAULT_MAX_CONCURRENT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_max_concurrent(mut self, n: usize) -> Self {
        self.max_concurrent = n;
        self
    }
}

/// Route store backed by an HTTP catalogue.
#[derive(Debug, Clone)]
pub struct HttpRouteStore {
    http: reqwest::Client,
    base_url: String,
    semaphore: Arc<Semaphore>,
}

impl HttpRouteStore {
    pub fn new(config: HttpStoreConfig) -> Result<Self, StoreError> {
        let http = reqwest::Client::builder().timeout(config.timeout).build()?;

        Ok(Self {
            http,
            base_url: config.base_url,
            semaphore: Arc::new(Semaphore::new(config.max_concurrent.max(1))),
        })
    }

    /// GET `url` and decode the JSON body. `Ok(None)` on 404.
    async fn get_json<T: serde::de::DeserializeOwned>(
        &self,
        url: &str,
        query: &[(&str, String)],
    ) -> Result<Option<T>, StoreError> {
        let _permit = self
            .semaphore
            .acquire()
            .await
            .map_err(|_| StoreError::Api {
                status: 0,
                message: "semaphore closed".to_string(),
            })?;

        let response = self.http.get(url).query(query).send().await?;
        let status = response.status();

        if status == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }

        if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN {
            return Err(StoreError::Unauthorized);
        }

        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(StoreError::RateLimited);
        }

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(StoreError::Api {
                status: status.as_u16(),
                message: body,
            });
        }

        let body = response.text().await?;
        serde_json::from_str(&body)
            .map(Some)
            .map_err(|e| StoreError::Json {
                message: e.to_string(),
                body: Some(body.chars().take(500).collect()),
            })
    }
}

impl RouteStore for HttpRouteStore {
    async fn find_routes_near(
        &self,
        point: LatLng,
        radius_m: f64,
    ) -> Result<Vec<Arc<RoutePolyline>>, StoreError> {
        let url = format!("{}/routes/near", self.base_url);
        let query = [
            ("lat", point.lat().to_string()),
            ("lng", point.lng().to_string()),
            ("radius", radius_m.to_string()),
        ];

        let Some(response) = self.get_json::<NearResponse>(&url, &query).await? else {
            return Err(StoreError::Api {
                status: 404,
                message: format!("{url} not found"),
            });
        };

        let routes = convert_records(response.routes);
        debug!(%point, radius_m, found = routes.len(), "http store lookup");
        Ok(routes)
    }

    async fn get_route_by_id(&self, id: &RouteId) -> Result<Option<Arc<RoutePolyline>>, StoreError> {
        let url = format!("{}/routes/{}", self.base_url, id.as_str());

        let Some(record) = self.get_json::<RouteRecord>(&url, &[]).await? else {
            return Ok(None);
        };

        record
            .into_route()
            .map(|r| Some(Arc::new(r)))
            .map_err(|e| StoreError::Json {
                message: e.to_string(),
                body: None,
            })
    }
}

#[cfg(test)]
mod tests {
    use axum::extract::{Path, Query};
    use axum::http::StatusCode;
    use axum::routing::get;
    use axum::{Json, Router};
    use serde::Deserialize;

    use super::*;

    #[derive(Deserialize)]
    struct NearParams {
        lat: f64,
        lng: f64,
        radius: f64,
    }

    fn east_record() -> serde_json::Value {
        serde_json::json!({
            "id": "east",
            "code": "E1",
            "coordinates": [[0.0, 0.0], [0.01, 0.0]]
        })
    }

    /// Stand-in catalogue on an ephemeral port.
    async fn serve_catalogue() -> String {
        let app = Router::new()
            .route(
                "/routes/near",
                get(|Query(p): Query<NearParams>| async move {
                    assert!(p.lat.abs() < 1.0 && p.lng.abs() < 1.0);
                    if p.radius < 50.0 {
                        return Json(serde_json::json!({ "routes": [] }));
                    }
                    Json(serde_json::json!({
                        "routes": [
                            east_record(),
                            {"id": "bad", "code": "B", "coordinates": [[0.0, 0.0]]}
                        ]
                    }))
                }),
            )
            .route(
                "/routes/:id",
                get(|Path(id): Path<String>| async move {
                    match id.as_str() {
                        "east" => Ok(Json(east_record())),
                        "limited" => Err(StatusCode::TOO_MANY_REQUESTS),
                        "broken" => Err(StatusCode::INTERNAL_SERVER_ERROR),
                        _ => Err(StatusCode::NOT_FOUND),
                    }
                }),
            );

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{addr}/")
    }

    fn ll(lat: f64, lng: f64) -> LatLng {
        LatLng::new(lat, lng).unwrap()
    }

    #[test]
    fn config_trims_trailing_slash() {
        let config = HttpStoreConfig::new("http://catalogue.local/api/");
        assert_eq!(config.base_url, "http://catalogue.local/api");
    }

    #[tokio::test]
    async fn find_near_skips_invalid_routes() {
        let store = HttpRouteStore::new(HttpStoreConfig::new(serve_catalogue().await)).unwrap();

        let routes = store.find_routes_near(ll(0.0005, 0.005), 200.0).await.unwrap();
        assert_eq!(routes.len(), 1);
        assert_eq!(routes[0].id().as_str(), "east");

        let routes = store.find_routes_near(ll(0.0005, 0.005), 10.0).await.unwrap();
        assert!(routes.is_empty());
    }

    #[tokio::test]
    async fn get_by_id_maps_status_codes() {
        let store = HttpRouteStore::new(HttpStoreConfig::new(serve_catalogue().await)).unwrap();
        let id = |s: &str| RouteId::new(s).unwrap();

        let east = store.get_route_by_id(&id("east")).await.unwrap().unwrap();
        assert!((east.length_m() - 1111.95).abs() < 1.0);

        assert!(store.get_route_by_id(&id("nope")).await.unwrap().is_none());

        let err = store.get_route_by_id(&id("limited")).await.unwrap_err();
        assert!(matches!(err, StoreError::RateLimited));

        let err = store.get_route_by_id(&id("broken")).await.unwrap_err();
        assert!(matches!(err, StoreError::Api { status: 500, .. }));
        assert!(err.is_retryable());
    }
}
