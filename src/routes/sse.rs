use std::convert::Infallible;

use axum::{Router, extract::State, response::sse::Sse, routing::get};
use futures::Stream;
use tracing::info;

use crate::{error::AppError, services::sse_service, state::SharedState};

#[utoipa::path(
    get,
    path = "/sse/overlay",
    tag = "sse",
    responses((status = 200, description = "Presentation command stream", content_type = "text/event-stream", body = String))
)]
/// Stream presentation commands to a renderer, starting with the current scene.
pub async fn overlay_stream(
    State(state): State<SharedState>,
) -> Result<Sse<impl Stream<Item = Result<axum::response::sse::Event, Infallible>>>, AppError> {
    let (receiver, initial) = sse_service::subscribe_overlay(&state)?;
    info!("New renderer SSE connection");
    Ok(sse_service::to_sse_stream(receiver, initial))
}

/// Configure the SSE endpoints.
pub fn router() -> Router<SharedState> {
    Router::<SharedState>::new().route("/sse/overlay", get(overlay_stream))
}
