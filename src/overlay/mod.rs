//! Reconciliation and presentation-timing engine of the scoreboard overlay.

pub(crate) mod actor;
pub(crate) mod cards;
pub(crate) mod coalesce;
pub(crate) mod countdown;
pub(crate) mod images;
pub(crate) mod memo;
pub(crate) mod presenter;
pub(crate) mod reconciler;
pub(crate) mod schedule;
pub(crate) mod side;
pub(crate) mod transitions;
pub(crate) mod tween;

pub use self::actor::{OverlayClosed, OverlayHandle, spawn_overlay};
pub use self::images::{ImageError, ImageInfo, ImageLoader};
pub use self::presenter::{Presenter, ScenePresenter};
pub use self::reconciler::OverlaySettings;
pub use self::side::Side;

use self::schedule::Scheduler;

/// Sinks the core writes to while handling one event.
pub struct Outputs<'a> {
    /// Renderer commands and audio cues.
    pub presenter: &'a dyn Presenter,
    /// Timers, frame requests and image loads.
    pub scheduler: &'a mut dyn Scheduler,
}
