//! Timers and asynchronous completions feeding back into the overlay actor.
//!
//! The core never sleeps or spawns on its own. It asks a [`Scheduler`] for a
//! continuation and receives it later as a [`Wakeup`] or an image-load result
//! through the actor mailbox.

use std::{
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
    time::Duration,
};

use tokio::{
    sync::mpsc,
    task::AbortHandle,
    time::{Instant, interval_at, sleep},
};

use super::{actor::OverlayMsg, images::ImageLoader, side::Side};

/// Display refresh interval used for coalescing and tween sampling.
pub const FRAME_INTERVAL: Duration = Duration::from_millis(16);

/// Deferred continuation delivered back to the overlay actor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Wakeup {
    /// Periodic countdown re-evaluation.
    CountdownPoll,
    /// Fixed-duration step of the active banner transition elapsed.
    Transition { ticket: u64 },
    /// Card flip reached the point where the front face is revealed.
    CardFaceFront { side: Side, generation: u64 },
    /// Display refresh tick.
    Frame,
}

/// Image preload issued on behalf of a side.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageRequest {
    pub side: Side,
    pub generation: u64,
    pub url: String,
}

/// Handle to a periodic wakeup. Dropping it stops the repetition.
#[derive(Debug)]
pub struct RepeatHandle {
    cancelled: Arc<AtomicBool>,
    abort: Option<AbortHandle>,
}

impl RepeatHandle {
    /// Wrap the task driving the repetition, if any.
    pub fn new(abort: Option<AbortHandle>) -> Self {
        Self {
            cancelled: Arc::new(AtomicBool::new(false)),
            abort,
        }
    }

    /// Stop the repetition. Idempotent.
    pub fn cancel(&mut self) {
        self.cancelled.store(true, Ordering::SeqCst);
        if let Some(abort) = self.abort.take() {
            abort.abort();
        }
    }

    #[cfg(test)]
    pub(crate) fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    #[cfg(test)]
    pub(crate) fn cancel_flag(&self) -> Arc<AtomicBool> {
        self.cancelled.clone()
    }
}

impl Drop for RepeatHandle {
    fn drop(&mut self) {
        self.cancel();
    }
}

/// Source of deferred continuations for the overlay core.
pub trait Scheduler {
    /// Deliver `wakeup` once after `delay`.
    fn after(&mut self, delay: Duration, wakeup: Wakeup);
    /// Deliver `wakeup` every `period`, first after one period.
    fn every(&mut self, period: Duration, wakeup: Wakeup) -> RepeatHandle;
    /// Start loading an image; the result comes back tagged with the request.
    fn preload_image(&mut self, request: ImageRequest);
    /// Ask for one display refresh tick. Repeated requests before the tick
    /// fires collapse into one.
    fn request_frame(&mut self);
}

/// Scheduler posting wakeups into the actor mailbox from Tokio tasks.
///
/// Holds a weak sender so pending timers never keep the actor alive.
pub struct TokioScheduler {
    mailbox: mpsc::WeakUnboundedSender<OverlayMsg>,
    images: Arc<dyn ImageLoader>,
    frame_pending: bool,
}

impl TokioScheduler {
    pub fn new(
        mailbox: mpsc::WeakUnboundedSender<OverlayMsg>,
        images: Arc<dyn ImageLoader>,
    ) -> Self {
        Self {
            mailbox,
            images,
            frame_pending: false,
        }
    }

    /// Mark the pending frame as delivered so the next request schedules a new one.
    pub fn frame_delivered(&mut self) {
        self.frame_pending = false;
    }
}

impl Scheduler for TokioScheduler {
    fn after(&mut self, delay: Duration, wakeup: Wakeup) {
        let mailbox = self.mailbox.clone();
        tokio::spawn(async move {
            sleep(delay).await;
            if let Some(mailbox) = mailbox.upgrade() {
                let _ = mailbox.send(OverlayMsg::Wakeup(wakeup));
            }
        });
    }

    fn every(&mut self, period: Duration, wakeup: Wakeup) -> RepeatHandle {
        let mailbox = self.mailbox.clone();
        let task = tokio::spawn(async move {
            let mut ticks = interval_at(Instant::now() + period, period);
            loop {
                ticks.tick().await;
                let Some(sender) = mailbox.upgrade() else {
                    break;
                };
                if sender.send(OverlayMsg::Wakeup(wakeup)).is_err() {
                    break;
                }
            }
        });
        RepeatHandle::new(Some(task.abort_handle()))
    }

    fn preload_image(&mut self, request: ImageRequest) {
        let mailbox = self.mailbox.clone();
        let images = self.images.clone();
        tokio::spawn(async move {
            let result = images.load(&request.url).await;
            if let Some(mailbox) = mailbox.upgrade() {
                let _ = mailbox.send(OverlayMsg::ImageLoaded { request, result });
            }
        });
    }

    fn request_frame(&mut self) {
        if self.frame_pending {
            return;
        }
        self.frame_pending = true;
        self.after(FRAME_INTERVAL, Wakeup::Frame);
    }
}
