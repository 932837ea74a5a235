use serde::Serialize;
use utoipa::ToSchema;

use crate::overlay::{cards::CardStatus, countdown::CountdownPhase};

/// Countdown part of the overlay status.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct CountdownStatus {
    pub phase: CountdownPhase,
    pub remaining_secs: u64,
    /// Clock string as painted on the overlay.
    pub display: String,
}

/// Per-side part of the overlay status.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct SideStatus {
    /// Phase banner currently on screen.
    pub banner: Option<String>,
    /// Life points currently on screen, mid-animation values included.
    pub life_points: i64,
    pub card: CardStatus,
}

/// Snapshot returned by `GET /overlay/status`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct OverlayStatus {
    pub countdown: CountdownStatus,
    /// Banner transitions queued behind the active one.
    pub pending_transitions: usize,
    pub left: SideStatus,
    pub right: SideStatus,
}

/// Result of a manual resync.
#[derive(Debug, Serialize, ToSchema)]
pub struct ResyncResponse {
    /// Rows fetched and handed to the overlay.
    pub rows: usize,
}
