//! Highlighted card per side, gated on its image finishing to load.

use std::time::Duration;

use serde::Serialize;
use tracing::{debug, info, warn};
use utoipa::ToSchema;

use crate::config::CardsMode;

use super::{
    Outputs,
    images::{ImageError, ImageInfo},
    presenter::PresentCommand,
    schedule::{ImageRequest, Wakeup},
    side::{Side, SideMap},
};

/// Time between starting the flip animation and revealing the front face.
pub const FLIP_REVEAL_DELAY: Duration = Duration::from_millis(1000);

/// What the renderer currently shows for a card.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum CardFace {
    #[default]
    Hidden,
    /// Flip animation started, front face not yet revealed.
    Turning,
    Front,
}

#[derive(Debug, Clone)]
struct CardSlot {
    face: CardFace,
    wants_front: bool,
    image_ready: bool,
    applied_url: Option<String>,
    generation: u64,
    flip_generation: u64,
}

impl Default for CardSlot {
    fn default() -> Self {
        Self {
            face: CardFace::Hidden,
            wants_front: false,
            image_ready: true,
            applied_url: None,
            generation: 0,
            flip_generation: 0,
        }
    }
}

/// Status view of one card.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct CardStatus {
    pub face: CardFace,
    pub flipped: bool,
    pub image_ready: bool,
    pub image_url: Option<String>,
}

/// Whether a highlight column holds something worth loading.
pub fn is_usable_image_url(url: &str) -> bool {
    let url = url.trim();
    !url.is_empty() && url != "null" && url != "undefined"
}

/// Card flip state and image readiness for both sides.
///
/// A flip to the front is never started while the side's latest highlight
/// image is still loading; it is remembered and started once the load
/// settles. Flips to the back always go through immediately.
#[derive(Debug)]
pub struct CardDeck {
    mode: CardsMode,
    slots: SideMap<CardSlot>,
}

impl CardDeck {
    pub fn new(mode: CardsMode) -> Self {
        Self {
            mode,
            slots: SideMap::default(),
        }
    }

    pub fn status(&self, side: Side) -> CardStatus {
        let slot = &self.slots[side];
        CardStatus {
            face: slot.face,
            flipped: slot.wants_front,
            image_ready: slot.image_ready,
            image_url: slot.applied_url.clone(),
        }
    }

    /// Start preloading a new highlight image for `side`.
    pub fn highlight(&mut self, side: Side, url: &str, out: &mut Outputs<'_>) {
        if self.mode == CardsMode::Hidden {
            return;
        }
        if !is_usable_image_url(url) {
            debug!(?side, url, "ignoring unusable card highlight");
            return;
        }

        let slot = &mut self.slots[side];
        slot.generation += 1;
        slot.image_ready = false;
        out.scheduler.preload_image(ImageRequest {
            side,
            generation: slot.generation,
            url: url.trim().to_string(),
        });
    }

    /// Apply a finished preload unless a newer one superseded it.
    pub fn image_loaded(
        &mut self,
        request: ImageRequest,
        result: Result<ImageInfo, ImageError>,
        out: &mut Outputs<'_>,
    ) {
        if self.mode == CardsMode::Hidden {
            return;
        }
        let side = request.side;
        let slot = &mut self.slots[side];
        if request.generation != slot.generation {
            debug!(
                ?side,
                url = %request.url,
                generation = request.generation,
                latest = slot.generation,
                "discarding stale card image load"
            );
            return;
        }

        match result {
            Ok(info) => {
                out.presenter.present(PresentCommand::CardImage {
                    side,
                    url: request.url.clone(),
                    width: info.width,
                    height: info.height,
                });
                slot.applied_url = Some(request.url);
            }
            Err(err) => {
                warn!(?side, error = %err, "card image failed to load, keeping previous image");
            }
        }
        slot.image_ready = true;

        if slot.wants_front && slot.face == CardFace::Hidden {
            info!(?side, "starting deferred card flip");
            self.turn_to_front(side, out);
        }
    }

    /// Flip the card of `side` to its front or back.
    pub fn flip(&mut self, side: Side, front: bool, out: &mut Outputs<'_>) {
        if self.mode == CardsMode::Hidden {
            return;
        }
        let slot = &mut self.slots[side];
        slot.wants_front = front;

        if !front {
            slot.flip_generation += 1;
            slot.face = CardFace::Hidden;
            out.presenter.present(PresentCommand::CardHide { side });
            return;
        }

        if !slot.image_ready {
            info!(?side, "card flip deferred until the highlight image is ready");
            return;
        }
        if slot.face == CardFace::Hidden {
            self.turn_to_front(side, out);
        }
    }

    /// Reveal the front face once the flip animation reached it.
    pub fn reveal_front(&mut self, side: Side, generation: u64, out: &mut Outputs<'_>) {
        let slot = &mut self.slots[side];
        if generation != slot.flip_generation || slot.face != CardFace::Turning {
            debug!(?side, generation, "ignoring superseded card reveal");
            return;
        }
        slot.face = CardFace::Front;
        out.presenter.present(PresentCommand::CardFront { side });
    }

    fn turn_to_front(&mut self, side: Side, out: &mut Outputs<'_>) {
        let slot = &mut self.slots[side];
        slot.flip_generation += 1;
        slot.face = CardFace::Turning;
        out.presenter.present(PresentCommand::CardShow { side });
        out.scheduler.after(
            FLIP_REVEAL_DELAY,
            Wakeup::CardFaceFront {
                side,
                generation: slot.flip_generation,
            },
        );
    }
}
