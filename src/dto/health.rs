use serde::Serialize;
use utoipa::ToSchema;

/// Simple health response returned by the `/healthcheck` route.
#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    /// Health status ("ok" or "degraded").
    pub status: String,
    /// Row store backend the process is configured for.
    pub store: String,
}

impl HealthResponse {
    /// Create a health response indicating the store is reachable.
    pub fn ok(store: impl Into<String>) -> Self {
        Self {
            status: "ok".to_string(),
            store: store.into(),
        }
    }

    /// Create a health response indicating the process runs without a store.
    pub fn degraded(store: impl Into<String>) -> Self {
        Self {
            status: "degraded".to_string(),
            store: store.into(),
        }
    }
}
