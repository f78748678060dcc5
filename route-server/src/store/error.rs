//! Route store error types.

/// Errors from a route store.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// HTTP request failed (network error, timeout, etc.)
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    /// Route data could not be deserialized
    #[error("json parse error: {message}{}", body_suffix(.body))]
    Json {
        message: String,
        body: Option<String>,
    },

    /// Store returned an error status code
    #[error("store error {status}: {message}")]
    Api { status: u16, message: String },

    /// Invalid credentials or unauthorized
    #[error("unauthorized by route store")]
    Unauthorized,

    /// Rate limited by the store
    #[error("rate limited by route store")]
    RateLimited,

    /// No answer within the per-attempt timeout
    #[error("route store timed out")]
    Timeout,

    /// Reading local route data failed
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

fn body_suffix(body: &Option<String>) -> String {
    body.as_ref()
        .map(|b| format!(" (body: {b})"))
        .unwrap_or_default()
}

impl StoreError {
    /// Whether the same request might succeed if tried again.
    pub fn is_retryable(&self) -> bool {
        match self {
            StoreError::Http(e) => e.is_timeout() || e.is_connect() || e.is_request(),
            StoreError::Api { status, .. } => *status >= 500,
            StoreError::RateLimited | StoreError::Timeout => true,
            StoreError::Json { .. } | StoreError::Unauthorized | StoreError::Io(_) => false,
        }
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(err: serde_json::Error) -> Self {
        StoreError::Json {
            message: err.to_string(),
            body: None,
        }
    }
}
