use crate::{
    dto::overlay::{OverlayStatus, ResyncResponse},
    error::ServiceError,
    services::feed,
    state::SharedState,
};

/// Current overlay status as reported by the actor.
pub async fn status(state: &SharedState) -> Result<OverlayStatus, ServiceError> {
    let overlay = state.overlay()?;
    Ok(overlay.handle.status().await?)
}

/// Re-fetch the bound rows and replay them into the overlay.
pub async fn resync(state: &SharedState) -> Result<ResyncResponse, ServiceError> {
    let overlay = state.overlay()?;
    let store = state.require_store().await?;
    let rows = feed::resync(store.as_ref(), &state.config().binding, &overlay.handle).await?;
    Ok(ResyncResponse { rows })
}
