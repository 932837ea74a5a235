//! Single task owning the overlay state.

use std::sync::Arc;

use thiserror::Error;
use tokio::{
    sync::{mpsc, oneshot},
    task::JoinHandle,
};
use tracing::{debug, info};

use crate::{dao::models::PlayerRow, dto::overlay::OverlayStatus};

use super::{
    Outputs,
    images::{ImageError, ImageInfo, ImageLoader},
    presenter::Presenter,
    reconciler::{Now, OverlaySettings, RowReconciler},
    schedule::{ImageRequest, TokioScheduler, Wakeup},
};

/// Mailbox message for the overlay actor.
#[derive(Debug)]
pub enum OverlayMsg {
    /// Full snapshot of the bound rows.
    Rows(Vec<PlayerRow>),
    /// One change notification.
    RowChanged(PlayerRow),
    /// A scheduled continuation is due.
    Wakeup(Wakeup),
    /// An image preload finished.
    ImageLoaded {
        request: ImageRequest,
        result: Result<ImageInfo, ImageError>,
    },
    /// Status request.
    Status(oneshot::Sender<OverlayStatus>),
}

/// Returned when the actor task is gone.
#[derive(Debug, Error)]
#[error("overlay actor is not running")]
pub struct OverlayClosed;

/// Cloneable sender side of the overlay actor.
#[derive(Clone)]
pub struct OverlayHandle {
    sender: mpsc::UnboundedSender<OverlayMsg>,
}

impl OverlayHandle {
    /// Hand a fresh snapshot to the overlay.
    pub fn apply_snapshot(&self, rows: Vec<PlayerRow>) -> Result<(), OverlayClosed> {
        self.sender
            .send(OverlayMsg::Rows(rows))
            .map_err(|_| OverlayClosed)
    }

    /// Hand a single row change to the overlay.
    pub fn row_changed(&self, row: PlayerRow) -> Result<(), OverlayClosed> {
        self.sender
            .send(OverlayMsg::RowChanged(row))
            .map_err(|_| OverlayClosed)
    }

    /// Ask the actor for its current status.
    pub async fn status(&self) -> Result<OverlayStatus, OverlayClosed> {
        let (reply, response) = oneshot::channel();
        self.sender
            .send(OverlayMsg::Status(reply))
            .map_err(|_| OverlayClosed)?;
        response.await.map_err(|_| OverlayClosed)
    }
}

struct OverlayActor {
    reconciler: RowReconciler,
    presenter: Arc<dyn Presenter>,
    scheduler: TokioScheduler,
    mailbox: mpsc::UnboundedReceiver<OverlayMsg>,
}

/// Start the overlay actor. It stops once every handle is dropped.
pub fn spawn_overlay(
    settings: OverlaySettings,
    presenter: Arc<dyn Presenter>,
    images: Arc<dyn ImageLoader>,
) -> (OverlayHandle, JoinHandle<()>) {
    let (sender, mailbox) = mpsc::unbounded_channel();
    let actor = OverlayActor {
        reconciler: RowReconciler::new(settings),
        presenter,
        scheduler: TokioScheduler::new(sender.downgrade(), images),
        mailbox,
    };
    let task = tokio::spawn(actor.run());
    (OverlayHandle { sender }, task)
}

impl OverlayActor {
    async fn run(mut self) {
        {
            let mut out = Outputs {
                presenter: self.presenter.as_ref(),
                scheduler: &mut self.scheduler,
            };
            self.reconciler.start(&mut out);
        }
        info!("overlay actor started");

        while let Some(message) = self.mailbox.recv().await {
            self.handle(message);
        }

        info!("overlay actor stopped");
    }

    fn handle(&mut self, message: OverlayMsg) {
        if matches!(message, OverlayMsg::Wakeup(Wakeup::Frame)) {
            self.scheduler.frame_delivered();
        }

        let now = Now::capture();
        let mut out = Outputs {
            presenter: self.presenter.as_ref(),
            scheduler: &mut self.scheduler,
        };

        match message {
            OverlayMsg::Rows(rows) => {
                debug!(rows = rows.len(), "applying row snapshot");
                for row in rows {
                    self.reconciler.queue_snapshot_row(row, &mut out);
                }
            }
            OverlayMsg::RowChanged(row) => self.reconciler.queue_row(row, &mut out),
            OverlayMsg::Wakeup(wakeup) => self.reconciler.wakeup(wakeup, now, &mut out),
            OverlayMsg::ImageLoaded { request, result } => {
                self.reconciler.image_loaded(request, result, &mut out)
            }
            OverlayMsg::Status(reply) => {
                let _ = reply.send(self.reconciler.status());
            }
        }
    }
}
