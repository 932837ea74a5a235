//! Presentation commands and the sink that delivers them to the renderer.

use std::sync::{Mutex, PoisonError};

use indexmap::IndexMap;
use serde::Serialize;
use thiserror::Error;
use tracing::warn;
use utoipa::ToSchema;

use crate::{config::CardsMode, dto::sse::ServerEvent, state::SseHub};

use super::side::Side;

/// SSE event name carrying a [`PresentCommand`].
pub const PRESENT_EVENT: &str = "present";

/// Plain text fields shown per side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum TextField {
    Record,
    Deck,
    Score,
}

/// Where a squashed name is pinned while compressed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum NameAnchor {
    Start,
    End,
}

impl NameAnchor {
    /// Left names grow away from the centre, right names towards it.
    pub fn for_side(side: Side) -> Self {
        match side {
            Side::Left => NameAnchor::Start,
            Side::Right => NameAnchor::End,
        }
    }
}

/// Short sounds the overlay may play.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum Cue {
    LifePoints,
}

/// One instruction for the browser renderer.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum PresentCommand {
    /// Replace a plain text field.
    SetText {
        side: Side,
        field: TextField,
        text: String,
    },
    /// Show the flag image at `url`.
    SetFlag {
        side: Side,
        url: String,
    },
    /// Commit the name, then compress it horizontally when it is wider
    /// than `max_width` pixels.
    FitName {
        side: Side,
        text: String,
        max_width: u32,
        anchor: NameAnchor,
    },
    /// Paint one life point animation step.
    SetLifePoints {
        side: Side,
        value: i64,
    },
    /// Paint the countdown text.
    SetTimer {
        text: String,
    },
    /// Slide a phase banner in.
    BannerEnter {
        side: Side,
        label: String,
        ticket: u64,
    },
    /// Start the exit animation of the current banner.
    BannerExit {
        side: Side,
        ticket: u64,
    },
    /// Remove a banner once its exit finished.
    BannerRemove {
        side: Side,
        ticket: u64,
    },
    /// Point the turn arrow at a side, or hide it.
    ArrowActive {
        side: Option<Side>,
    },
    /// Show the card highlight face down.
    CardShow {
        side: Side,
    },
    /// Turn the card highlight face up.
    CardFront {
        side: Side,
    },
    /// Hide the card highlight.
    CardHide {
        side: Side,
    },
    /// Swap in a preloaded card image.
    CardImage {
        side: Side,
        url: String,
        width: Option<u32>,
        height: Option<u32>,
    },
    /// Play a short sound.
    PlayCue {
        cue: Cue,
    },
    /// Apply the load-time layout.
    Layout {
        cards: CardsMode,
    },
}

/// How a command affects the replayable scene.
#[derive(Debug, PartialEq, Eq)]
enum SceneEffect {
    Set(String),
    Clear(String),
    Transient,
}

impl PresentCommand {
    fn scene_effect(&self) -> SceneEffect {
        use PresentCommand::*;
        match self {
            SetText { side, field, .. } => SceneEffect::Set(format!("text:{side}:{field:?}")),
            SetFlag { side, .. } => SceneEffect::Set(format!("flag:{side}")),
            FitName { side, .. } => SceneEffect::Set(format!("name:{side}")),
            SetLifePoints { side, .. } => SceneEffect::Set(format!("life_points:{side}")),
            SetTimer { .. } => SceneEffect::Set("timer".into()),
            BannerEnter { side, .. } => SceneEffect::Set(format!("banner:{side}")),
            BannerRemove { side, .. } => SceneEffect::Clear(format!("banner:{side}")),
            ArrowActive { .. } => SceneEffect::Set("arrow".into()),
            CardShow { side } | CardFront { side } | CardHide { side } => {
                SceneEffect::Set(format!("card_face:{side}"))
            }
            CardImage { side, .. } => SceneEffect::Set(format!("card_image:{side}")),
            Layout { .. } => SceneEffect::Set("layout".into()),
            BannerExit { .. } | PlayCue { .. } => SceneEffect::Transient,
        }
    }
}

/// Audio playback failure. Callers log and drop it.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CueError {
    #[error("no renderer is connected to play the cue")]
    NoRenderer,
    #[error("failed to encode cue: {0}")]
    Encode(String),
}

/// Sink for presentation commands.
///
/// Delivery is best effort: a command without a renderer attached is a no-op.
pub trait Presenter: Send + Sync {
    /// Forward one command to the renderer.
    fn present(&self, command: PresentCommand);
    /// Ask the renderer to play `cue`.
    fn play_cue(&self, cue: Cue) -> Result<(), CueError>;
}

/// Presenter broadcasting over SSE and remembering the current scene.
pub struct ScenePresenter {
    hub: SseHub,
    scene: Mutex<IndexMap<String, PresentCommand>>,
}

impl ScenePresenter {
    /// Create a presenter whose hub buffers `capacity` events per renderer.
    pub fn new(capacity: usize) -> Self {
        Self {
            hub: SseHub::new(capacity),
            scene: Mutex::new(IndexMap::new()),
        }
    }

    /// Broadcast hub renderers subscribe to.
    pub fn hub(&self) -> &SseHub {
        &self.hub
    }

    /// Latest command per scene slot, in first-write order.
    pub fn scene(&self) -> Vec<PresentCommand> {
        let scene = self.scene.lock().unwrap_or_else(PoisonError::into_inner);
        scene.values().cloned().collect()
    }

    fn remember(&self, command: &PresentCommand) {
        let mut scene = self.scene.lock().unwrap_or_else(PoisonError::into_inner);
        match command.scene_effect() {
            SceneEffect::Set(slot) => {
                scene.insert(slot, command.clone());
            }
            SceneEffect::Clear(slot) => {
                scene.shift_remove(&slot);
            }
            SceneEffect::Transient => {}
        }
    }
}

impl Presenter for ScenePresenter {
    fn present(&self, command: PresentCommand) {
        self.remember(&command);
        match ServerEvent::json(PRESENT_EVENT.to_string(), &command) {
            Ok(event) => self.hub.broadcast(event),
            Err(err) => warn!(error = %err, ?command, "failed to encode presentation command"),
        }
    }

    fn play_cue(&self, cue: Cue) -> Result<(), CueError> {
        if self.hub.receiver_count() == 0 {
            return Err(CueError::NoRenderer);
        }
        let event = ServerEvent::json(PRESENT_EVENT.to_string(), &PresentCommand::PlayCue { cue })
            .map_err(|err| CueError::Encode(err.to_string()))?;
        self.hub.broadcast(event);
        Ok(())
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;

    /// Presenter recording every command for assertions.
    #[derive(Default)]
    pub struct RecordingPresenter {
        commands: Mutex<Vec<PresentCommand>>,
        cues: Mutex<Vec<Cue>>,
        pub reject_cues: bool,
    }

    impl RecordingPresenter {
        pub fn rejecting_cues() -> Self {
            Self {
                reject_cues: true,
                ..Self::default()
            }
        }

        pub fn take(&self) -> Vec<PresentCommand> {
            std::mem::take(&mut *self.commands.lock().unwrap())
        }

        pub fn cues(&self) -> Vec<Cue> {
            self.cues.lock().unwrap().clone()
        }
    }

    impl Presenter for RecordingPresenter {
        fn present(&self, command: PresentCommand) {
            self.commands.lock().unwrap().push(command);
        }

        fn play_cue(&self, cue: Cue) -> Result<(), CueError> {
            self.cues.lock().unwrap().push(cue);
            if self.reject_cues {
                Err(CueError::NoRenderer)
            } else {
                Ok(())
            }
        }
    }
}
