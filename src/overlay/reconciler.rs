//! Applies incoming rows to the overlay, field by field.

use std::time::Instant;

use time::OffsetDateTime;
use tracing::debug;

use crate::{
    clock::{ClockStyle, TimelineTimer, parse_to_seconds},
    config::CardsMode,
    dao::models::PlayerRow,
    dto::overlay::{CountdownStatus, OverlayStatus, SideStatus},
};

use super::{
    Outputs,
    cards::CardDeck,
    coalesce::FrameCoalescer,
    countdown::Countdown,
    images::{ImageError, ImageInfo},
    memo::{FieldKey, FieldMemo},
    presenter::{Cue, NameAnchor, PresentCommand, TextField},
    schedule::{ImageRequest, Wakeup},
    side::{Side, SideMap},
    transitions::{TransitionQueue, TransitionRequest},
    tween::ValueTween,
};

/// Load-time presentation settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OverlaySettings {
    /// Whether the card highlight is shown.
    pub cards: CardsMode,
    /// Countdown rendering style.
    pub clock: ClockStyle,
    /// Life points shown before the first row arrives.
    pub starting_life_points: i64,
    /// Width budget for player names, in pixels.
    pub name_max_width: u32,
}

impl Default for OverlaySettings {
    fn default() -> Self {
        Self {
            cards: CardsMode::Shown,
            clock: ClockStyle::MinutesOnly,
            starting_life_points: 8000,
            name_max_width: 288,
        }
    }
}

/// Monotonic and wall-clock time of the event being handled.
#[derive(Debug, Clone, Copy)]
pub struct Now {
    pub instant: Instant,
    pub wall: OffsetDateTime,
}

impl Now {
    pub fn capture() -> Self {
        Self {
            instant: Instant::now(),
            wall: OffsetDateTime::now_utc(),
        }
    }
}

/// Owner of every piece of overlay state.
///
/// Rows are buffered per display frame and then compared field by field
/// against what was last applied; only real changes reach the countdown,
/// the banner queue, the tweens, and the cards.
#[derive(Debug)]
pub struct RowReconciler {
    settings: OverlaySettings,
    memo: FieldMemo,
    countdown: Countdown,
    painted_timer: Option<String>,
    transitions: TransitionQueue,
    cards: CardDeck,
    life_points: SideMap<ValueTween>,
    coalescer: FrameCoalescer,
}

impl RowReconciler {
    pub fn new(settings: OverlaySettings) -> Self {
        Self {
            settings,
            memo: FieldMemo::new(),
            countdown: Countdown::new(),
            painted_timer: None,
            transitions: TransitionQueue::new(),
            cards: CardDeck::new(settings.cards),
            life_points: SideMap::from_fn(|_| ValueTween::new(settings.starting_life_points)),
            coalescer: FrameCoalescer::new(),
        }
    }

    /// Paint the initial scene.
    pub fn start(&mut self, out: &mut Outputs<'_>) {
        out.presenter.present(PresentCommand::Layout {
            cards: self.settings.cards,
        });
        for side in Side::BOTH {
            out.presenter.present(PresentCommand::SetLifePoints {
                side,
                value: self.life_points[side].displayed(),
            });
        }
    }

    /// Buffer a row until the next display frame.
    pub fn queue_row(&mut self, row: PlayerRow, out: &mut Outputs<'_>) {
        if self.coalescer.push(row) {
            out.scheduler.request_frame();
        }
    }

    /// Buffer a row read by a full resync. A live change already waiting for
    /// this frame takes precedence.
    pub fn queue_snapshot_row(&mut self, row: PlayerRow, out: &mut Outputs<'_>) {
        if self.coalescer.push_snapshot(row) {
            out.scheduler.request_frame();
        }
    }

    /// Dispatch a scheduled continuation.
    pub fn wakeup(&mut self, wakeup: Wakeup, now: Now, out: &mut Outputs<'_>) {
        match wakeup {
            Wakeup::CountdownPoll => {
                if self.countdown.poll(now.instant) {
                    self.paint_timer(out);
                }
            }
            Wakeup::Transition { ticket } => self.transitions.on_wakeup(ticket, out),
            Wakeup::CardFaceFront { side, generation } => {
                self.cards.reveal_front(side, generation, out)
            }
            Wakeup::Frame => self.frame(now, out),
        }
    }

    pub fn image_loaded(
        &mut self,
        request: ImageRequest,
        result: Result<ImageInfo, ImageError>,
        out: &mut Outputs<'_>,
    ) {
        self.cards.image_loaded(request, result, out);
    }

    /// One display refresh: reconcile the buffered rows, then step tweens.
    pub fn frame(&mut self, now: Now, out: &mut Outputs<'_>) {
        for row in self.coalescer.drain() {
            self.reconcile(&row, now, out);
        }

        let mut animating = false;
        for side in Side::BOTH {
            let tween = &mut self.life_points[side];
            if let Some(value) = tween.advance(now.instant) {
                out.presenter
                    .present(PresentCommand::SetLifePoints { side, value });
            }
            animating |= tween.is_animating();
        }
        if animating {
            out.scheduler.request_frame();
        }
    }

    /// Apply one row immediately.
    pub fn reconcile(&mut self, row: &PlayerRow, now: Now, out: &mut Outputs<'_>) {
        let side = row.side();

        let name = row.br_name.as_deref().unwrap_or("");
        if self.memo.observe(side, FieldKey::Name, name) {
            out.presenter.present(PresentCommand::FitName {
                side,
                text: name.to_string(),
                max_width: self.settings.name_max_width,
                anchor: NameAnchor::for_side(side),
            });
        }

        self.text_field(side, FieldKey::Record, TextField::Record, &row.record, out);
        self.text_field(side, FieldKey::Deck, TextField::Deck, &row.deck, out);

        let flag = row.flag_img_url.as_deref().unwrap_or("");
        if self.memo.observe(side, FieldKey::Flag, flag) {
            out.presenter.present(PresentCommand::SetFlag {
                side,
                url: flag.to_string(),
            });
        }

        if let Some(score) = row.score {
            if self.memo.observe(side, FieldKey::Score, score) {
                out.presenter.present(PresentCommand::SetText {
                    side,
                    field: TextField::Score,
                    text: score.to_string(),
                });
            }
        }

        if let Some(life_points) = row.life_points {
            if self.memo.observe(side, FieldKey::LifePoints, life_points) {
                self.animate_life_points(side, life_points, now, out);
            }
        }

        self.phase(side, row.phase.as_deref().unwrap_or(""), out);

        if let Some(url) = row.card_highlight.as_deref() {
            if self.memo.observe(side, FieldKey::CardHighlight, url) {
                self.cards.highlight(side, url, out);
            }
        }
        if let Some(flipped) = row.card_flipped {
            if self.memo.observe(side, FieldKey::CardFlipped, flipped) {
                self.cards.flip(side, flipped, out);
            }
        }

        if side.drives_timer() {
            self.timer(row, now, out);
        }
    }

    pub fn status(&self) -> OverlayStatus {
        let side_status = |side: Side| SideStatus {
            banner: self.transitions.displayed(side).map(str::to_string),
            life_points: self.life_points[side].displayed(),
            card: self.cards.status(side),
        };
        OverlayStatus {
            countdown: CountdownStatus {
                phase: self.countdown.phase(),
                remaining_secs: self.countdown.remaining_secs(),
                display: self.countdown.display(self.settings.clock),
            },
            pending_transitions: self.transitions.pending_len(),
            left: side_status(Side::Left),
            right: side_status(Side::Right),
        }
    }

    fn text_field(
        &mut self,
        side: Side,
        key: FieldKey,
        field: TextField,
        value: &Option<String>,
        out: &mut Outputs<'_>,
    ) {
        let text = value.as_deref().unwrap_or("");
        if self.memo.observe(side, key, text) {
            out.presenter.present(PresentCommand::SetText {
                side,
                field,
                text: text.to_string(),
            });
        }
    }

    fn animate_life_points(&mut self, side: Side, target: i64, now: Now, out: &mut Outputs<'_>) {
        if !self.life_points[side].retarget(target, now.instant) {
            return;
        }
        if let Err(err) = out.presenter.play_cue(Cue::LifePoints) {
            debug!(?side, error = %err, "life point cue not played");
        }
        out.scheduler.request_frame();
    }

    fn phase(&mut self, side: Side, raw: &str, out: &mut Outputs<'_>) {
        let normalized = raw.trim().to_lowercase();
        if !self.memo.observe(side, FieldKey::Phase, normalized.as_str()) {
            return;
        }
        let request = if normalized.is_empty() {
            TransitionRequest::clear(side)
        } else {
            TransitionRequest::show(side, raw.trim())
        };
        self.transitions.enqueue(request, out);
    }

    fn timer(&mut self, row: &PlayerRow, now: Now, out: &mut Outputs<'_>) {
        if row.has_timer_triple() {
            self.countdown.ensure_initialized();

            if let Some(raw) = row.timer_value.as_deref().map(str::trim) {
                match parse_to_seconds(raw) {
                    Some(seconds) => {
                        self.countdown.set_base(raw, seconds, now.instant);
                    }
                    None => debug!(raw, "ignoring unparseable timer value"),
                }
            }

            match row
                .timer_adjust
                .as_deref()
                .map(str::trim)
                .filter(|raw| !raw.is_empty())
            {
                Some(raw) => match parse_to_seconds(raw) {
                    Some(seconds) => {
                        self.countdown.apply_override(raw, seconds, now.instant);
                    }
                    None => debug!(raw, "ignoring unparseable timer adjust"),
                },
                None => self.countdown.clear_override(),
            }

            match row.timer_play {
                Some(true) => {
                    self.countdown.play(now.instant, out.scheduler);
                }
                Some(false) => {
                    self.countdown.pause(now.instant);
                }
                None => {}
            }
        } else if let Some(timeline) = TimelineTimer::from_row(row) {
            self.countdown.ensure_initialized();
            let seconds = (timeline.remaining_ms(now.wall) / 1000) as u64;
            self.countdown
                .apply_override(&timeline.change_key(), seconds, now.instant);
            if timeline.is_running() {
                self.countdown.play(now.instant, out.scheduler);
            } else {
                self.countdown.pause(now.instant);
            }
        } else {
            return;
        }

        self.paint_timer(out);
    }

    fn paint_timer(&mut self, out: &mut Outputs<'_>) {
        let text = self.countdown.display(self.settings.clock);
        if self.painted_timer.as_deref() == Some(text.as_str()) {
            return;
        }
        self.painted_timer = Some(text.clone());
        out.presenter.present(PresentCommand::SetTimer { text });
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use time::macros::datetime;

    use super::*;
    use crate::{
        clock::TimerRunState,
        overlay::{
            countdown::CountdownPhase, presenter::testing::RecordingPresenter,
            schedule::testing::ManualScheduler,
        },
    };

    struct Harness {
        presenter: RecordingPresenter,
        scheduler: ManualScheduler,
        reconciler: RowReconciler,
        start: Instant,
    }

    impl Harness {
        fn new() -> Self {
            Self::with_settings(OverlaySettings::default())
        }

        fn with_settings(settings: OverlaySettings) -> Self {
            Self::with_presenter(settings, RecordingPresenter::default())
        }

        fn with_presenter(settings: OverlaySettings, presenter: RecordingPresenter) -> Self {
            Self {
                presenter,
                scheduler: ManualScheduler::default(),
                reconciler: RowReconciler::new(settings),
                start: Instant::now(),
            }
        }

        fn at(&self, offset: Duration) -> Now {
            Now {
                instant: self.start + offset,
                wall: datetime!(2025-06-01 12:00:00 UTC) + offset,
            }
        }

        fn deliver(&mut self, row: PlayerRow, offset: Duration) {
            let now = self.at(offset);
            let mut out = Outputs {
                presenter: &self.presenter,
                scheduler: &mut self.scheduler,
            };
            self.reconciler.queue_row(row, &mut out);
            self.reconciler.frame(now, &mut out);
        }

        fn frames_until(&mut self, from: Duration, until: Duration) {
            let mut offset = from;
            while offset <= until {
                let now = self.at(offset);
                let mut out = Outputs {
                    presenter: &self.presenter,
                    scheduler: &mut self.scheduler,
                };
                self.reconciler.wakeup(Wakeup::Frame, now, &mut out);
                offset += Duration::from_millis(16);
            }
        }

        fn poll(&mut self, offset: Duration) {
            let now = self.at(offset);
            let mut out = Outputs {
                presenter: &self.presenter,
                scheduler: &mut self.scheduler,
            };
            self.reconciler.wakeup(Wakeup::CountdownPoll, now, &mut out);
        }
    }

    fn life_point_steps(commands: &[PresentCommand], side: Side) -> Vec<i64> {
        commands
            .iter()
            .filter_map(|command| match command {
                PresentCommand::SetLifePoints { side: s, value } if *s == side => Some(*value),
                _ => None,
            })
            .collect()
    }

    fn entered_banners(commands: &[PresentCommand]) -> Vec<(Side, String)> {
        commands
            .iter()
            .filter_map(|command| match command {
                PresentCommand::BannerEnter { side, label, .. } => Some((*side, label.clone())),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn battle_phase_update_animates_banners_and_starts_timer() {
        let mut h = Harness::new();
        h.deliver(
            PlayerRow {
                life_points: Some(8000),
                phase: Some(String::new()),
                timer_value: Some("5:00".into()),
                timer_play: Some(false),
                ..PlayerRow::new(1)
            },
            Duration::ZERO,
        );
        let initial = h.presenter.take();
        assert!(initial.contains(&PresentCommand::SetTimer {
            text: "5:00".into()
        }));
        assert!(life_point_steps(&initial, Side::Left).is_empty());

        h.deliver(
            PlayerRow {
                life_points: Some(7600),
                phase: Some("Battle Phase".into()),
                timer_play: Some(true),
                ..PlayerRow::new(1)
            },
            Duration::from_secs(1),
        );
        h.frames_until(Duration::from_millis(1016), Duration::from_millis(2600));
        h.poll(Duration::from_millis(2500));

        let commands = h.presenter.take();
        let steps = life_point_steps(&commands, Side::Left);
        assert!(steps.windows(2).all(|pair| pair[1] <= pair[0]));
        assert_eq!(steps.last(), Some(&7600));
        assert_eq!(h.presenter.cues(), vec![Cue::LifePoints]);
        assert_eq!(
            entered_banners(&commands),
            vec![(Side::Left, "Battle Phase".to_string())]
        );

        let status = h.reconciler.status();
        assert_eq!(status.countdown.phase, CountdownPhase::Running);
        assert_eq!(status.countdown.remaining_secs, 298);
        assert_eq!(status.countdown.display, "4:58");
        assert_eq!(status.left.banner.as_deref(), Some("Battle Phase"));
        assert_eq!(h.scheduler.active_repeats(), 1);
    }

    #[test]
    fn rejected_cue_does_not_hold_back_life_points() {
        let mut h = Harness::with_presenter(
            OverlaySettings::default(),
            RecordingPresenter::rejecting_cues(),
        );
        h.deliver(
            PlayerRow {
                life_points: Some(8000),
                ..PlayerRow::new(1)
            },
            Duration::ZERO,
        );
        h.presenter.take();

        h.deliver(
            PlayerRow {
                life_points: Some(5000),
                ..PlayerRow::new(1)
            },
            Duration::from_secs(1),
        );
        h.frames_until(Duration::from_millis(1016), Duration::from_millis(2700));

        let steps = life_point_steps(&h.presenter.take(), Side::Left);
        assert!(steps.len() > 1);
        assert_eq!(steps.last(), Some(&5000));
        assert_eq!(h.presenter.cues(), vec![Cue::LifePoints]);
        assert_eq!(h.reconciler.status().left.life_points, 5000);
    }

    #[test]
    fn resync_snapshot_in_same_frame_keeps_live_change() {
        let mut h = Harness::new();
        let now = h.at(Duration::ZERO);
        let mut out = Outputs {
            presenter: &h.presenter,
            scheduler: &mut h.scheduler,
        };
        h.reconciler.queue_row(
            PlayerRow {
                life_points: Some(6000),
                ..PlayerRow::new(1)
            },
            &mut out,
        );
        h.reconciler.queue_snapshot_row(
            PlayerRow {
                life_points: Some(8000),
                ..PlayerRow::new(1)
            },
            &mut out,
        );
        h.reconciler.frame(now, &mut out);
        h.frames_until(Duration::from_millis(16), Duration::from_millis(1600));

        assert_eq!(
            life_point_steps(&h.presenter.take(), Side::Left).last(),
            Some(&6000)
        );
        assert_eq!(h.reconciler.status().left.life_points, 6000);
    }

    #[test]
    fn identical_rows_do_not_retrigger_anything() {
        let mut h = Harness::new();
        let row = PlayerRow {
            br_name: Some("Jaden Yuki".into()),
            life_points: Some(6000),
            phase: Some("Main Phase 1".into()),
            card_highlight: Some("https://cards/neos.png".into()),
            card_flipped: Some(false),
            timer_value: Some("45".into()),
            ..PlayerRow::new(2)
        };

        h.deliver(row.clone(), Duration::ZERO);
        let delayed = h.scheduler.delayed.len();
        let images = h.scheduler.images.len();
        h.presenter.take();

        h.deliver(row, Duration::from_millis(100));
        assert!(h.presenter.take().iter().all(|command| matches!(
            command,
            PresentCommand::SetLifePoints { .. }
        )));
        assert_eq!(h.scheduler.delayed.len(), delayed);
        assert_eq!(h.scheduler.images.len(), images);
        assert_eq!(h.presenter.cues().len(), 1);
    }

    #[test]
    fn phase_change_detection_ignores_case_and_whitespace() {
        let mut h = Harness::new();
        h.deliver(
            PlayerRow {
                phase: Some("Draw Phase".into()),
                ..PlayerRow::new(1)
            },
            Duration::ZERO,
        );
        h.deliver(
            PlayerRow {
                phase: Some("  draw phase ".into()),
                ..PlayerRow::new(1)
            },
            Duration::from_millis(50),
        );

        assert_eq!(entered_banners(&h.presenter.take()).len(), 1);
        assert_eq!(h.reconciler.status().pending_transitions, 0);
    }

    #[test]
    fn only_player_one_rows_drive_the_timer() {
        let mut h = Harness::new();
        h.deliver(
            PlayerRow {
                timer_value: Some("10:00".into()),
                ..PlayerRow::new(4)
            },
            Duration::ZERO,
        );
        assert_eq!(
            h.reconciler.status().countdown.phase,
            CountdownPhase::Uninitialized
        );

        h.deliver(
            PlayerRow {
                timer_value: Some("10:00".into()),
                ..PlayerRow::new(3)
            },
            Duration::ZERO,
        );
        assert_eq!(h.reconciler.status().countdown.remaining_secs, 600);
    }

    #[test]
    fn names_are_fitted_with_side_anchor() {
        let mut h = Harness::new();
        h.deliver(
            PlayerRow {
                br_name: Some("Seto Kaiba".into()),
                ..PlayerRow::new(2)
            },
            Duration::ZERO,
        );
        assert!(h.presenter.take().contains(&PresentCommand::FitName {
            side: Side::Right,
            text: "Seto Kaiba".into(),
            max_width: 288,
            anchor: NameAnchor::End,
        }));
    }

    #[test]
    fn legacy_timeline_mirrors_into_countdown() {
        let mut h = Harness::new();
        h.deliver(
            PlayerRow {
                timer_state: Some(TimerRunState::Running),
                timer_duration_ms: Some(600_000),
                timer_started_at: Some(datetime!(2025-06-01 11:59:00 UTC)),
                timer_accumulated_pause_ms: Some(0),
                ..PlayerRow::new(1)
            },
            Duration::ZERO,
        );

        let status = h.reconciler.status();
        assert_eq!(status.countdown.phase, CountdownPhase::Running);
        assert_eq!(status.countdown.remaining_secs, 540);
    }

    #[test]
    fn override_replaces_running_time_and_clears_on_null() {
        let mut h = Harness::new();
        h.deliver(
            PlayerRow {
                timer_value: Some("5:00".into()),
                timer_play: Some(true),
                ..PlayerRow::new(1)
            },
            Duration::ZERO,
        );
        h.deliver(
            PlayerRow {
                timer_value: Some("5:00".into()),
                timer_adjust: Some("2:00".into()),
                timer_play: Some(true),
                ..PlayerRow::new(1)
            },
            Duration::from_secs(10),
        );
        assert_eq!(h.reconciler.status().countdown.remaining_secs, 120);

        h.deliver(
            PlayerRow {
                timer_value: Some("5:00".into()),
                timer_adjust: None,
                timer_play: Some(true),
                ..PlayerRow::new(1)
            },
            Duration::from_secs(20),
        );
        h.poll(Duration::from_secs(20));
        assert_eq!(h.reconciler.status().countdown.remaining_secs, 110);
    }

    #[test]
    fn hidden_cards_skip_preloads() {
        let mut h = Harness::with_settings(OverlaySettings {
            cards: CardsMode::Hidden,
            ..OverlaySettings::default()
        });
        h.deliver(
            PlayerRow {
                card_highlight: Some("https://cards/kuriboh.png".into()),
                card_flipped: Some(true),
                ..PlayerRow::new(1)
            },
            Duration::ZERO,
        );
        assert!(h.scheduler.images.is_empty());
    }
}
