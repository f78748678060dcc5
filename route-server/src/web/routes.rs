//! HTTP route handlers.

use axum::body::Bytes;
use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
};
use tower_http::trace::TraceLayer;
use tracing::{error, warn};

use crate::domain::{LatLng, RouteId};
use crate::finder::{QueryError, QueryRequest};

use super::dto::*;
use super::state::AppState;

/// Create the application router.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route(
            "/api/itineraries",
            get(itineraries_from_query).post(itineraries_from_body),
        )
        .route("/api/routes/:id", get(get_route))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Health check endpoint.
async fn health() -> &'static str {
    "ok"
}

/// `GET /api/itineraries?origin=lng,lat&destination=lng,lat`
async fn itineraries_from_query(
    State(state): State<AppState>,
    Query(req): Query<ItineraryQuery>,
) -> Result<Json<ItinerariesResponse>, AppError> {
    let origin = parse_lng_lat(&req.origin).map_err(|e| AppError::BadRequest {
        message: format!("invalid origin: {e}"),
    })?;
    let destination = parse_lng_lat(&req.destination).map_err(|e| AppError::BadRequest {
        message: format!("invalid destination: {e}"),
    })?;

    find_itineraries(&state, origin, destination).await
}

/// `POST /api/itineraries` with `{"origin":[lng,lat],"destination":[lng,lat]}`
async fn itineraries_from_body(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<ItinerariesResponse>, AppError> {
    // Parse JSON manually so malformed bodies are a plain 400
    let req: ItineraryRequest = serde_json::from_slice(&body).map_err(|e| AppError::BadRequest {
        message: format!("invalid JSON: {e}"),
    })?;

    let origin = LatLng::from_lng_lat(req.origin).map_err(|e| AppError::BadRequest {
        message: format!("invalid origin: {e}"),
    })?;
    let destination = LatLng::from_lng_lat(req.destination).map_err(|e| AppError::BadRequest {
        message: format!("invalid destination: {e}"),
    })?;

    find_itineraries(&state, origin, destination).await
}

async fn find_itineraries(
    state: &AppState,
    origin: LatLng,
    destination: LatLng,
) -> Result<Json<ItinerariesResponse>, AppError> {
    let request = QueryRequest::new(origin, destination).with_timeout(state.query_timeout);
    let result = state.finder.find(request).await?;
    Ok(Json(ItinerariesResponse::from_result(&result)))
}

/// `GET /api/routes/{id}`
async fn get_route(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<RouteResponse>, AppError> {
    let route_id = RouteId::new(&id).map_err(|e| AppError::BadRequest {
        message: e.to_string(),
    })?;

    let route = state
        .finder
        .get_route(&route_id)
        .await?
        .ok_or_else(|| AppError::NotFound {
            message: format!("route {route_id} not found"),
        })?;

    Ok(Json(RouteResponse::from_route(&route)))
}

/// Application error type.
#[derive(Debug)]
pub enum AppError {
    BadRequest { message: String },
    NotFound { message: String },
    Unavailable { message: String },
    Timeout,
    Internal { message: String },
}

impl From<QueryError> for AppError {
    fn from(e: QueryError) -> Self {
        match e {
            QueryError::StorageUnavailable { .. } => AppError::Unavailable {
                message: e.to_string(),
            },
            QueryError::DeadlineExceeded => AppError::Timeout,
            QueryError::Internal(message) => AppError::Internal { message },
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AppError::BadRequest { message } => (StatusCode::BAD_REQUEST, message),
            AppError::NotFound { message } => (StatusCode::NOT_FOUND, message),
            AppError::Unavailable { message } => (StatusCode::SERVICE_UNAVAILABLE, message),
            AppError::Timeout => (
                StatusCode::GATEWAY_TIMEOUT,
                "query deadline exceeded".to_string(),
            ),
            AppError::Internal { message } => (StatusCode::INTERNAL_SERVER_ERROR, message),
        };

        if status.is_server_error() {
            error!(%status, %message, "request failed");
        } else {
            warn!(%status, %message, "request rejected");
        }

        let body = Json(ErrorResponse { error: message });
        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::cache::{CacheConfig, CachedRouteStore};
    use crate::domain::{RouteCode, RoutePolyline};
    use crate::finder::{FinderConfig, RouteFinder};
    use crate::store::{HttpRouteStore, HttpStoreConfig, MemoryRouteStore, RouteSource};

    fn ll(lat: f64, lng: f64) -> LatLng {
        LatLng::new(lat, lng).unwrap()
    }

    fn state_for(source: RouteSource) -> AppState {
        let config = FinderConfig::default()
            .with_fetch_timeout(Duration::from_millis(500))
            .with_backoff(Duration::from_millis(1), Duration::from_millis(2));
        let store = CachedRouteStore::new(source, &CacheConfig::default());
        AppState::new(RouteFinder::new(store, config))
    }

    fn memory_state() -> AppState {
        let east = RoutePolyline::new(
            RouteId::new("east").unwrap(),
            RouteCode::new("E1"),
            vec![ll(0.0, 0.0), ll(0.0, 0.01)],
        )
        .unwrap()
        .with_name("Eastbound");
        state_for(RouteSource::Memory(MemoryRouteStore::new([east])))
    }

    /// Serve `state` on an ephemeral port and return its base URL.
    async fn serve(state: AppState) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, create_router(state)).await.unwrap();
        });
        format!("http://{addr}")
    }

    #[tokio::test]
    async fn health() {
        let base = serve(memory_state()).await;
        let body = reqwest::get(format!("{base}/health"))
            .await
            .unwrap()
            .text()
            .await
            .unwrap();
        assert_eq!(body, "ok");
    }

    #[tokio::test]
    async fn itineraries_from_query_string() {
        let base = serve(memory_state()).await;

        let response = reqwest::get(format!(
            "{base}/api/itineraries?origin=0.002,0&destination=0.008,0"
        ))
        .await
        .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let json: serde_json::Value = response.json().await.unwrap();
        assert_eq!(json["candidates_considered"], 1);
        assert_eq!(json["handlers_run"][0], "normal_forward");
        assert_eq!(json["itineraries"][0]["kind"], "normal_forward");
        assert_eq!(json["itineraries"][0]["total_fare"], 13);
        assert_eq!(json["itineraries"][0]["segments"][0]["route_id"], "east");
    }

    #[tokio::test]
    async fn itineraries_from_body() {
        let base = serve(memory_state()).await;

        let response = reqwest::Client::new()
            .post(format!("{base}/api/itineraries"))
            .json(&serde_json::json!({"origin": [0.008, 0.0], "destination": [0.002, 0.0]}))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        // Against the direction of travel: no route, not an error
        let json: serde_json::Value = response.json().await.unwrap();
        assert_eq!(json["itineraries"].as_array().unwrap().len(), 0);
    }

    #[tokio::test]
    async fn malformed_input_is_bad_request() {
        let base = serve(memory_state()).await;
        let client = reqwest::Client::new();

        let response = client
            .get(format!("{base}/api/itineraries?origin=0.002&destination=0.008,0"))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let json: serde_json::Value = response.json().await.unwrap();
        assert!(json["error"].as_str().unwrap().contains("origin"));

        let response = client
            .post(format!("{base}/api/itineraries"))
            .body("{\"origin\": [0.0]}")
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let response = client
            .post(format!("{base}/api/itineraries"))
            .json(&serde_json::json!({"origin": [0.0, 95.0], "destination": [0.0, 0.0]}))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn route_lookup() {
        let base = serve(memory_state()).await;

        let response = reqwest::get(format!("{base}/api/routes/east")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let json: serde_json::Value = response.json().await.unwrap();
        assert_eq!(json["name"], "Eastbound");
        assert_eq!(json["is_closed_loop"], false);
        assert_eq!(json["coordinates"][1], serde_json::json!([0.01, 0.0]));

        let response = reqwest::get(format!("{base}/api/routes/west")).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn unreachable_store_is_service_unavailable() {
        // Nothing listens on a port we bound and released
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let dead = format!("http://{}", listener.local_addr().unwrap());
        drop(listener);

        let store = HttpRouteStore::new(HttpStoreConfig::new(dead)).unwrap();
        let base = serve(state_for(RouteSource::Http(store))).await;

        let response = reqwest::get(format!(
            "{base}/api/itineraries?origin=0.002,0&destination=0.008,0"
        ))
        .await
        .unwrap();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[test]
    fn error_status_codes() {
        let status = |e: AppError| e.into_response().status();

        assert_eq!(status(AppError::Timeout), StatusCode::GATEWAY_TIMEOUT);
        assert_eq!(
            status(QueryError::DeadlineExceeded.into()),
            StatusCode::GATEWAY_TIMEOUT
        );
        assert_eq!(
            status(
                QueryError::StorageUnavailable {
                    attempts: 3,
                    message: "down".into()
                }
                .into()
            ),
            StatusCode::SERVICE_UNAVAILABLE
        );
        assert_eq!(
            status(QueryError::Internal("boom".into()).into()),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
