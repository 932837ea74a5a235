//! HTTP routers of the overlay and control processes.

use axum::Router;
use utoipa::OpenApi;

use crate::{
    services::documentation::{ControlApiDoc, OverlayApiDoc},
    state::SharedState,
};

pub(crate) mod control;
pub(crate) mod docs;
pub(crate) mod health;
pub(crate) mod overlay;
pub(crate) mod sse;

/// Routes served by the overlay engine process.
pub fn overlay_router(state: SharedState) -> Router<()> {
    health::router()
        .merge(sse::router())
        .merge(overlay::router())
        .merge(docs::router(OverlayApiDoc::openapi()))
        .with_state(state)
}

/// Routes served by the control surface process.
pub fn control_router(state: SharedState) -> Router<()> {
    health::router()
        .merge(control::router(state.clone()))
        .merge(docs::router(ControlApiDoc::openapi()))
        .with_state(state)
}
