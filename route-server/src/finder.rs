//! Query orchestration.
//!
//! A query fetches candidate routes near both pins from the route store,
//! builds a [`RouteNetworkView`] from their union, and runs the case
//! dispatcher over it. The fetch is the only I/O: each attempt is bounded by
//! a timeout, failed attempts are retried with capped exponential backoff,
//! and the caller's deadline bounds the whole thing. Dispatch is CPU-bound
//! and runs on the blocking pool.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use futures::future::join;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::cases::{CaseConfig, DispatchError, Dispatcher, HandlerFailure, TransferPolicy};
use crate::domain::{CaseKind, CaseResult, LatLng, RouteId, RoutePolyline};
use crate::fare::FareTable;
use crate::network::RouteNetworkView;
use crate::store::{RouteStore, StoreError};

/// Configuration for the route finder.
#[derive(Debug, Clone)]
pub struct FinderConfig {
    /// Timeout for one route store call
    pub fetch_timeout: Duration,

    /// Route store calls per lookup, including the first
    pub attempts: u32,

    /// Pause before the first retry; doubles on each further retry
    pub initial_backoff: Duration,

    /// Longest pause between retries
    pub max_backoff: Duration,

    /// When transfer handlers run
    pub policy: TransferPolicy,

    pub cases: CaseConfig,
    pub fares: FareTable,
}

impl Default for FinderConfig {
    fn default() -> Self {
        Self {
            fetch_timeout: Duration::from_secs(5),
            attempts: 3,
            initial_backoff: Duration::from_millis(100),
            max_backoff: Duration::from_secs(2),
            policy: TransferPolicy::default(),
            cases: CaseConfig::default(),
            fares: FareTable::default(),
        }
    }
}

impl FinderConfig {
    pub fn with_fetch_timeout(mut self, timeout: Duration) -> Self {
        self.fetch_timeout = timeout;
        self
    }

    pub fn with_attempts(mut self, attempts: u32) -> Self {
        self.attempts = attempts;
        self
    }

    pub fn with_backoff(mut self, initial: Duration, max: Duration) -> Self {
        self.initial_backoff = initial;
        self.max_backoff = max;
        self
    }

    pub fn with_policy(mut self, policy: TransferPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_cases(mut self, cases: CaseConfig) -> Self {
        self.cases = cases;
        self
    }

    pub fn with_fares(mut self, fares: FareTable) -> Self {
        self.fares = fares;
        self
    }
}

/// An itinerary query.
#[derive(Debug, Clone, Copy)]
pub struct QueryRequest {
    pub origin: LatLng,
    pub destination: LatLng,
    deadline: Option<Instant>,
}

impl QueryRequest {
    pub fn new(origin: LatLng, destination: LatLng) -> Self {
        Self {
            origin,
            destination,
            deadline: None,
        }
    }

    /// Abandon the query if it has not finished by `deadline`.
    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(deadline);
        self
    }

    /// Abandon the query if it has not finished within `timeout` from now.
    pub fn with_timeout(self, timeout: Duration) -> Self {
        self.with_deadline(Instant::now() + timeout)
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }
}

/// Result of an itinerary query.
#[derive(Debug, Clone)]
pub struct QueryResult {
    /// Ranked itineraries. Empty means no route was found.
    pub results: Vec<CaseResult>,

    /// Distinct candidate routes near either pin.
    pub candidates_considered: usize,

    /// Handlers whose precondition held.
    pub handlers_run: Vec<CaseKind>,

    /// Handlers that failed; their results were dropped.
    pub failures: Vec<HandlerFailure>,
}

/// Error from a query.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum QueryError {
    /// The route store could not be reached
    #[error("route store unavailable after {attempts} attempt(s): {message}")]
    StorageUnavailable { attempts: u32, message: String },

    /// The caller's deadline passed
    #[error("query deadline exceeded")]
    DeadlineExceeded,

    /// A bug, such as a panicked worker
    #[error("internal error: {0}")]
    Internal(String),
}

/// Answers itinerary queries against a route store.
pub struct RouteFinder<S> {
    store: S,
    dispatcher: Arc<Dispatcher>,
    config: FinderConfig,
}

impl<S: RouteStore> RouteFinder<S> {
    pub fn new(store: S, config: FinderConfig) -> Self {
        let dispatcher = Dispatcher::new(config.cases.clone(), config.fares).with_policy(config.policy);
        Self {
            store,
            dispatcher: Arc::new(dispatcher),
            config,
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn config(&self) -> &FinderConfig {
        &self.config
    }

    /// Find ranked itineraries from `request.origin` to `request.destination`.
    pub async fn find(&self, request: QueryRequest) -> Result<QueryResult, QueryError> {
        let started = std::time::Instant::now();
        let radius_m = self.config.cases.fetch_radius_m();

        let (near_origin, near_destination) = join(
            self.fetch_near(request.origin, radius_m, request.deadline),
            self.fetch_near(request.destination, radius_m, request.deadline),
        )
        .await;

        let mut routes = near_origin?;
        routes.extend(near_destination?);

        let view = RouteNetworkView::build(
            request.origin,
            request.destination,
            routes,
            &self.config.cases.side_classifier(),
        );
        let candidates_considered = view.len();
        debug!(candidates = candidates_considered, "built route network view");

        let dispatcher = Arc::clone(&self.dispatcher);
        let deadline = request.deadline.map(Instant::into_std);
        let dispatched = tokio::task::spawn_blocking(move || match deadline {
            Some(deadline) => dispatcher.dispatch_until(&view, deadline),
            None => Ok(dispatcher.dispatch(&view)),
        })
        .await
        .map_err(|e| QueryError::Internal(format!("dispatch worker failed: {e}")))?
        .map_err(|e| match e {
            DispatchError::DeadlineExceeded { handlers_run } => {
                warn!(handlers_run, "query deadline passed during dispatch");
                QueryError::DeadlineExceeded
            }
        })?;

        info!(
            origin = %request.origin,
            destination = %request.destination,
            candidates = candidates_considered,
            results = dispatched.results.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "query complete"
        );

        Ok(QueryResult {
            results: dispatched.results,
            candidates_considered,
            handlers_run: dispatched.handlers_run,
            failures: dispatched.failures,
        })
    }

    /// Look up one route by id.
    pub async fn get_route(&self, id: &RouteId) -> Result<Option<Arc<RoutePolyline>>, QueryError> {
        self.with_retry("get_route_by_id", None, || self.store.get_route_by_id(id))
            .await
    }

    async fn fetch_near(
        &self,
        point: LatLng,
        radius_m: f64,
        deadline: Option<Instant>,
    ) -> Result<Vec<Arc<RoutePolyline>>, QueryError> {
        self.with_retry("find_routes_near", deadline, || {
            self.store.find_routes_near(point, radius_m)
        })
        .await
    }

    /// Call the store until it answers, a non-retryable error occurs, the
    /// attempts run out, or `deadline` passes.
    async fn with_retry<T, F, Fut>(
        &self,
        operation: &'static str,
        deadline: Option<Instant>,
        mut call: F,
    ) -> Result<T, QueryError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, StoreError>>,
    {
        let attempts = self.config.attempts.max(1);
        let mut backoff = self.config.initial_backoff;
        let mut attempt = 0;

        loop {
            attempt += 1;

            let mut attempt_deadline = Instant::now() + self.config.fetch_timeout;
            if let Some(deadline) = deadline {
                attempt_deadline = attempt_deadline.min(deadline);
            }

            let error = match tokio::time::timeout_at(attempt_deadline, call()).await {
                Ok(Ok(value)) => return Ok(value),
                Ok(Err(e)) => e,
                Err(_) => StoreError::Timeout,
            };

            if let Some(deadline) = deadline
                && Instant::now() >= deadline
            {
                warn!(operation, attempt, "query deadline passed during route store call");
                return Err(QueryError::DeadlineExceeded);
            }

            warn!(operation, attempt, attempts, error = %error, "route store call failed");

            if attempt >= attempts || !error.is_retryable() {
                return Err(QueryError::StorageUnavailable {
                    attempts: attempt,
                    message: error.to_string(),
                });
            }

            let mut pause = backoff;
            if let Some(deadline) = deadline {
                pause = pause.min(deadline.saturating_duration_since(Instant::now()));
            }
            tokio::time::sleep(pause).await;
            backoff = (backoff * 2).min(self.config.max_backoff);
        }
    }
}
