use serde::Serialize;
use utoipa::ToSchema;

use crate::config::CardsMode;

#[derive(Clone, Debug)]
/// Dispatched payload carried across SSE channels.
pub struct ServerEvent {
    pub event: Option<String>,
    pub data: String,
}

impl ServerEvent {
    /// Convenience wrapper that serialises `payload` into the SSE data field.
    pub fn json<E, T>(event: E, payload: &T) -> serde_json::Result<Self>
    where
        E: Into<Option<String>>,
        T: Serialize,
    {
        Ok(Self {
            event: event.into(),
            data: serde_json::to_string(payload)?,
        })
    }
}

#[derive(Debug, Serialize, ToSchema)]
/// Initial metadata sent to a renderer when it connects.
pub struct Handshake {
    /// Table the overlay is bound to.
    pub table: String,
    pub cards: CardsMode,
    /// Whether the overlay is running without a store connection.
    pub degraded: bool,
}

#[derive(Debug, Serialize, ToSchema)]
/// Broadcast when the overlay enters or leaves degraded mode.
pub struct SystemStatus {
    pub degraded: bool,
}
