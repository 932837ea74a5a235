//! Serial queue of phase banner transitions.

use std::{collections::VecDeque, time::Duration};

use tracing::debug;

use super::{
    Outputs,
    presenter::PresentCommand,
    schedule::Wakeup,
    side::{Side, SideMap},
};

/// Fixed duration of a banner exit or enter animation.
pub const TRANSITION_STEP: Duration = Duration::from_millis(500);

/// Banner change for one side. An empty label clears the side.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransitionRequest {
    pub side: Side,
    pub label: String,
}

impl TransitionRequest {
    pub fn show(side: Side, label: impl Into<String>) -> Self {
        Self {
            side,
            label: label.into(),
        }
    }

    pub fn clear(side: Side) -> Self {
        Self::show(side, String::new())
    }

    fn is_clear(&self) -> bool {
        self.label.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Stage {
    /// Previous banners are animating out.
    Exiting,
    /// The new banner is animating in.
    Entering,
}

#[derive(Debug)]
struct ActiveTransition {
    request: TransitionRequest,
    ticket: u64,
    stage: Stage,
    exiting: Vec<Side>,
}

/// Plays one banner transition at a time, in FIFO order.
///
/// While a step's timer is outstanding nothing is dequeued, so two banners
/// never animate at once and no animation is cut short.
#[derive(Debug, Default)]
pub struct TransitionQueue {
    pending: VecDeque<TransitionRequest>,
    active: Option<ActiveTransition>,
    displayed: SideMap<Option<String>>,
    arrow: Option<Side>,
    next_ticket: u64,
}

impl TransitionQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Banner label currently on screen for `side`.
    pub fn displayed(&self, side: Side) -> Option<&str> {
        self.displayed[side].as_deref()
    }

    /// Requests waiting behind the active transition.
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    #[cfg(test)]
    pub(crate) fn is_idle(&self) -> bool {
        self.active.is_none()
    }

    /// Queue a banner change and start it when nothing is animating.
    pub fn enqueue(&mut self, request: TransitionRequest, out: &mut Outputs<'_>) {
        debug!(side = ?request.side, label = %request.label, "queueing banner transition");
        self.pending.push_back(request);
        if self.active.is_none() {
            self.advance(out);
        }
    }

    /// Continue the active transition once its step timer fired.
    pub fn on_wakeup(&mut self, ticket: u64, out: &mut Outputs<'_>) {
        let Some(active) = self.active.take_if(|active| active.ticket == ticket) else {
            debug!(ticket, "ignoring stale transition wakeup");
            return;
        };

        match active.stage {
            Stage::Exiting => {
                for side in &active.exiting {
                    self.displayed[*side] = None;
                    out.presenter.present(PresentCommand::BannerRemove {
                        side: *side,
                        ticket,
                    });
                }
                if active.request.is_clear() {
                    self.point_arrow_away_from(active.request.side, out);
                    self.advance(out);
                } else {
                    self.enter(active.request, out);
                }
            }
            Stage::Entering => self.advance(out),
        }
    }

    fn advance(&mut self, out: &mut Outputs<'_>) {
        while let Some(request) = self.pending.pop_front() {
            let exiting: Vec<Side> = if request.is_clear() {
                vec![request.side]
            } else {
                vec![request.side.other(), request.side]
            }
            .into_iter()
            .filter(|side| self.displayed[*side].is_some())
            .collect();

            if !exiting.is_empty() {
                let ticket = self.issue_ticket();
                for side in &exiting {
                    out.presenter.present(PresentCommand::BannerExit {
                        side: *side,
                        ticket,
                    });
                }
                out.scheduler
                    .after(TRANSITION_STEP, Wakeup::Transition { ticket });
                self.active = Some(ActiveTransition {
                    request,
                    ticket,
                    stage: Stage::Exiting,
                    exiting,
                });
                return;
            }

            if request.is_clear() {
                self.point_arrow_away_from(request.side, out);
                continue;
            }

            self.enter(request, out);
            return;
        }
    }

    fn enter(&mut self, request: TransitionRequest, out: &mut Outputs<'_>) {
        let ticket = self.issue_ticket();
        let side = request.side;
        out.presenter.present(PresentCommand::BannerEnter {
            side,
            label: request.label.clone(),
            ticket,
        });
        self.displayed[side] = Some(request.label.clone());
        if self.arrow != Some(side) {
            self.arrow = Some(side);
            out.presenter
                .present(PresentCommand::ArrowActive { side: Some(side) });
        }
        out.scheduler
            .after(TRANSITION_STEP, Wakeup::Transition { ticket });
        self.active = Some(ActiveTransition {
            request,
            ticket,
            stage: Stage::Entering,
            exiting: Vec::new(),
        });
    }

    fn point_arrow_away_from(&mut self, side: Side, out: &mut Outputs<'_>) {
        if self.arrow == Some(side) {
            self.arrow = None;
            out.presenter
                .present(PresentCommand::ArrowActive { side: None });
        }
    }

    fn issue_ticket(&mut self) -> u64 {
        self.next_ticket += 1;
        self.next_ticket
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::overlay::{
        presenter::testing::RecordingPresenter, schedule::testing::ManualScheduler,
    };

    struct Harness {
        presenter: RecordingPresenter,
        scheduler: ManualScheduler,
        queue: TransitionQueue,
    }

    impl Harness {
        fn new() -> Self {
            Self {
                presenter: RecordingPresenter::default(),
                scheduler: ManualScheduler::default(),
                queue: TransitionQueue::new(),
            }
        }

        fn enqueue(&mut self, request: TransitionRequest) {
            let mut out = Outputs {
                presenter: &self.presenter,
                scheduler: &mut self.scheduler,
            };
            self.queue.enqueue(request, &mut out);
        }

        /// Fire every outstanding step timer until the queue is idle.
        fn settle(&mut self) {
            loop {
                let delayed = self.scheduler.take_delayed();
                if delayed.is_empty() {
                    break;
                }
                for (delay, wakeup) in delayed {
                    assert_eq!(delay, TRANSITION_STEP);
                    let Wakeup::Transition { ticket } = wakeup else {
                        panic!("unexpected wakeup {wakeup:?}");
                    };
                    let mut out = Outputs {
                        presenter: &self.presenter,
                        scheduler: &mut self.scheduler,
                    };
                    self.queue.on_wakeup(ticket, &mut out);
                }
            }
        }
    }

    fn on_screen(commands: &[PresentCommand]) -> Vec<Vec<String>> {
        let mut visible: Vec<(Side, String)> = Vec::new();
        let mut frames = Vec::new();
        for command in commands {
            match command {
                PresentCommand::BannerEnter { side, label, .. } => {
                    visible.push((*side, label.clone()))
                }
                PresentCommand::BannerRemove { side, .. } => visible.retain(|(s, _)| s != side),
                _ => continue,
            }
            frames.push(visible.iter().map(|(_, label)| label.clone()).collect());
        }
        frames
    }

    #[test]
    fn replacing_banner_exits_before_entering() {
        let mut harness = Harness::new();
        harness.enqueue(TransitionRequest::show(Side::Left, "Main Phase"));
        harness.enqueue(TransitionRequest::show(Side::Left, "End Phase"));
        assert_eq!(harness.queue.pending_len(), 1);
        harness.settle();

        let commands = harness.presenter.take();
        let frames = on_screen(&commands);
        assert!(frames.iter().all(|labels| labels.len() <= 1));
        assert_eq!(frames.last().unwrap(), &vec!["End Phase".to_string()]);
        assert_eq!(harness.queue.displayed(Side::Left), Some("End Phase"));
        assert!(harness.queue.is_idle());
    }

    #[test]
    fn nothing_dequeues_while_a_step_is_outstanding() {
        let mut harness = Harness::new();
        harness.enqueue(TransitionRequest::show(Side::Left, "Main Phase"));
        harness.enqueue(TransitionRequest::show(Side::Right, "Draw Phase"));
        harness.enqueue(TransitionRequest::show(Side::Left, "Battle Phase"));

        let entered = harness
            .presenter
            .take()
            .into_iter()
            .filter(|command| matches!(command, PresentCommand::BannerEnter { .. }))
            .count();
        assert_eq!(entered, 1);
        assert_eq!(harness.queue.pending_len(), 2);
        assert_eq!(harness.scheduler.delayed.len(), 1);
    }

    #[test]
    fn entering_one_side_removes_the_other() {
        let mut harness = Harness::new();
        harness.enqueue(TransitionRequest::show(Side::Left, "Main Phase"));
        harness.settle();
        harness.presenter.take();

        harness.enqueue(TransitionRequest::show(Side::Right, "Draw Phase"));
        harness.settle();

        let commands = harness.presenter.take();
        assert_eq!(
            commands[0],
            PresentCommand::BannerExit {
                side: Side::Left,
                ticket: 2
            }
        );
        assert!(commands.contains(&PresentCommand::ArrowActive {
            side: Some(Side::Right)
        }));
        assert_eq!(harness.queue.displayed(Side::Left), None);
        assert_eq!(harness.queue.displayed(Side::Right), Some("Draw Phase"));
    }

    #[test]
    fn clear_removes_banner_without_entering() {
        let mut harness = Harness::new();
        harness.enqueue(TransitionRequest::show(Side::Left, "Main Phase"));
        harness.settle();
        harness.presenter.take();

        harness.enqueue(TransitionRequest::clear(Side::Left));
        harness.settle();

        let commands = harness.presenter.take();
        assert!(
            !commands
                .iter()
                .any(|command| matches!(command, PresentCommand::BannerEnter { .. }))
        );
        assert!(commands.contains(&PresentCommand::ArrowActive { side: None }));
        assert_eq!(harness.queue.displayed(Side::Left), None);
        assert!(harness.queue.is_idle());
    }

    #[test]
    fn clear_of_empty_side_completes_immediately() {
        let mut harness = Harness::new();
        harness.enqueue(TransitionRequest::clear(Side::Right));
        harness.enqueue(TransitionRequest::show(Side::Right, "Standby Phase"));

        assert_eq!(harness.queue.displayed(Side::Right), Some("Standby Phase"));
        assert_eq!(harness.scheduler.delayed.len(), 1);
    }

    #[test]
    fn stale_ticket_is_ignored() {
        let mut harness = Harness::new();
        harness.enqueue(TransitionRequest::show(Side::Left, "Main Phase"));
        let mut out = Outputs {
            presenter: &harness.presenter,
            scheduler: &mut harness.scheduler,
        };
        harness.queue.on_wakeup(99, &mut out);
        assert!(!harness.queue.is_idle());
    }
}
