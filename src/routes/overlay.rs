use axum::{
    Json, Router,
    extract::State,
    routing::{get, post},
};

use crate::{
    dto::overlay::{OverlayStatus, ResyncResponse},
    error::AppError,
    services::overlay_service,
    state::SharedState,
};

#[utoipa::path(
    get,
    path = "/overlay/status",
    tag = "overlay",
    responses((status = 200, description = "What the overlay currently shows", body = OverlayStatus))
)]
pub async fn status(State(state): State<SharedState>) -> Result<Json<OverlayStatus>, AppError> {
    Ok(Json(overlay_service::status(&state).await?))
}

#[utoipa::path(
    post,
    path = "/overlay/resync",
    tag = "overlay",
    responses(
        (status = 200, description = "Rows re-fetched", body = ResyncResponse),
        (status = 503, description = "No row store connected")
    )
)]
/// Re-fetch the bound rows and reconcile them.
pub async fn resync(State(state): State<SharedState>) -> Result<Json<ResyncResponse>, AppError> {
    Ok(Json(overlay_service::resync(&state).await?))
}

/// Configure the overlay inspection routes.
pub fn router() -> Router<SharedState> {
    Router::<SharedState>::new()
        .route("/overlay/status", get(status))
        .route("/overlay/resync", post(resync))
}
