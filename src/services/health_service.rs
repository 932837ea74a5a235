use tracing::warn;

use crate::{config::StoreKind, dto::health::HealthResponse, state::SharedState};

/// Report whether the row store is reachable, logging connectivity issues.
pub async fn health_status(state: &SharedState) -> HealthResponse {
    match state.require_store().await {
        Ok(store) => {
            if let Err(err) = store.health_check().await {
                warn!(error = %err, "row store health check failed");
            }
        }
        Err(_) => warn!("row store unavailable (degraded mode)"),
    }

    let store = match state.config().store {
        StoreKind::Supabase => "supabase",
        StoreKind::Memory => "memory",
    };
    if state.is_degraded() {
        HealthResponse::degraded(store)
    } else {
        HealthResponse::ok(store)
    }
}
