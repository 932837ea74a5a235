//! The single countdown shared by the whole overlay.

use std::time::{Duration, Instant};

use serde::Serialize;
use utoipa::ToSchema;

use crate::clock::{ClockStyle, format_seconds};

use super::schedule::{RepeatHandle, Scheduler, Wakeup};

/// How often a running countdown re-evaluates its remaining time.
pub const POLL_INTERVAL: Duration = Duration::from_millis(250);

/// Lifecycle of the countdown.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum CountdownPhase {
    /// No timer row has been seen yet.
    Uninitialized,
    /// Remaining time is frozen.
    Paused,
    /// Remaining time is derived from the deadline on every poll.
    Running,
    /// Reached zero; stays here until a new base or override arrives.
    Expired,
}

/// Countdown derived from a wall-clock deadline.
///
/// While running, `remaining = max(0, floor((deadline - now) / 1s))`; while
/// paused it holds the last computed value. Base and override changes are
/// detected against the last applied raw strings, so a redelivered row never
/// restarts the countdown.
#[derive(Debug)]
pub struct Countdown {
    phase: CountdownPhase,
    remaining_secs: u64,
    deadline: Option<Instant>,
    last_base: Option<String>,
    last_override: Option<String>,
    poll: Option<RepeatHandle>,
}

impl Default for Countdown {
    fn default() -> Self {
        Self::new()
    }
}

impl Countdown {
    pub fn new() -> Self {
        Self {
            phase: CountdownPhase::Uninitialized,
            remaining_secs: 0,
            deadline: None,
            last_base: None,
            last_override: None,
            poll: None,
        }
    }

    pub fn phase(&self) -> CountdownPhase {
        self.phase
    }

    pub fn remaining_secs(&self) -> u64 {
        self.remaining_secs
    }

    pub fn display(&self, style: ClockStyle) -> String {
        format_seconds(self.remaining_secs, style)
    }

    /// Leave the uninitialized state with a paused zero countdown.
    pub fn ensure_initialized(&mut self) {
        if self.phase == CountdownPhase::Uninitialized {
            self.phase = CountdownPhase::Paused;
        }
    }

    /// Apply the base duration when it differs from the last applied raw value.
    ///
    /// Returns whether the remaining time was replaced.
    pub fn set_base(&mut self, raw: &str, seconds: u64, now: Instant) -> bool {
        if self.phase != CountdownPhase::Uninitialized && self.last_base.as_deref() == Some(raw) {
            return false;
        }
        self.last_base = Some(raw.to_string());
        self.replace_remaining(seconds, now);
        true
    }

    /// Hard-replace the remaining time when the override differs from the last
    /// applied one, including while running.
    pub fn apply_override(&mut self, raw: &str, seconds: u64, now: Instant) -> bool {
        if self.last_override.as_deref() == Some(raw) {
            return false;
        }
        self.last_override = Some(raw.to_string());
        self.replace_remaining(seconds, now);
        true
    }

    /// Forget the last applied override so that the same value counts as new
    /// when it is written again.
    pub fn clear_override(&mut self) {
        self.last_override = None;
    }

    /// Start counting down. No-op while already running.
    pub fn play(&mut self, now: Instant, scheduler: &mut dyn Scheduler) -> bool {
        match self.phase {
            CountdownPhase::Running => false,
            CountdownPhase::Expired if self.remaining_secs == 0 => false,
            _ if self.remaining_secs == 0 => {
                self.phase = CountdownPhase::Expired;
                true
            }
            _ => {
                self.deadline = Some(now + Duration::from_secs(self.remaining_secs));
                self.phase = CountdownPhase::Running;
                self.poll = Some(scheduler.every(POLL_INTERVAL, Wakeup::CountdownPoll));
                true
            }
        }
    }

    /// Re-evaluate the remaining time. Returns whether it changed.
    pub fn poll(&mut self, now: Instant) -> bool {
        if self.phase != CountdownPhase::Running {
            return false;
        }
        let remaining = self.remaining_at(now);
        let changed = remaining != self.remaining_secs;
        self.remaining_secs = remaining;
        if remaining == 0 {
            self.stop(CountdownPhase::Expired);
        }
        changed
    }

    /// Freeze the remaining time. No-op while not running.
    pub fn pause(&mut self, now: Instant) -> bool {
        if self.phase != CountdownPhase::Running {
            return false;
        }
        self.remaining_secs = self.remaining_at(now);
        let phase = if self.remaining_secs == 0 {
            CountdownPhase::Expired
        } else {
            CountdownPhase::Paused
        };
        self.stop(phase);
        true
    }

    fn remaining_at(&self, now: Instant) -> u64 {
        self.deadline
            .map(|deadline| deadline.saturating_duration_since(now).as_secs())
            .unwrap_or(self.remaining_secs)
    }

    fn replace_remaining(&mut self, seconds: u64, now: Instant) {
        self.remaining_secs = seconds;
        match self.phase {
            CountdownPhase::Running => {
                self.deadline = Some(now + Duration::from_secs(seconds));
            }
            CountdownPhase::Uninitialized | CountdownPhase::Expired => {
                self.phase = CountdownPhase::Paused;
            }
            CountdownPhase::Paused => {}
        }
    }

    fn stop(&mut self, phase: CountdownPhase) {
        self.phase = phase;
        self.deadline = None;
        if let Some(mut poll) = self.poll.take() {
            poll.cancel();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::overlay::schedule::testing::ManualScheduler;

    fn secs(value: u64) -> Duration {
        Duration::from_secs(value)
    }

    #[test]
    fn play_pause_and_override_follow_wall_clock() {
        let mut scheduler = ManualScheduler::default();
        let mut countdown = Countdown::new();
        let start = Instant::now();

        assert!(countdown.set_base("1:30", 90, start));
        assert_eq!(countdown.phase(), CountdownPhase::Paused);
        assert!(countdown.play(start, &mut scheduler));
        assert_eq!(scheduler.active_repeats(), 1);

        countdown.poll(start + secs(30));
        assert_eq!(countdown.remaining_secs(), 60);

        assert!(countdown.pause(start + secs(30)));
        assert_eq!(countdown.remaining_secs(), 60);
        assert_eq!(scheduler.active_repeats(), 0);
        assert!(!countdown.poll(start + secs(50)));
        assert_eq!(countdown.remaining_secs(), 60);

        assert!(countdown.apply_override("0:10", 10, start + secs(55)));
        assert_eq!(countdown.remaining_secs(), 10);
        assert_eq!(countdown.phase(), CountdownPhase::Paused);
    }

    #[test]
    fn redelivered_base_does_not_restart() {
        let mut scheduler = ManualScheduler::default();
        let mut countdown = Countdown::new();
        let start = Instant::now();

        countdown.set_base("5:00", 300, start);
        countdown.play(start, &mut scheduler);
        countdown.poll(start + secs(10));

        assert!(!countdown.set_base("5:00", 300, start + secs(10)));
        assert!(!countdown.play(start + secs(10), &mut scheduler));
        assert_eq!(countdown.remaining_secs(), 290);
        assert_eq!(scheduler.repeating.len(), 1);
    }

    #[test]
    fn override_while_running_rebases_deadline() {
        let mut scheduler = ManualScheduler::default();
        let mut countdown = Countdown::new();
        let start = Instant::now();

        countdown.set_base("5:00", 300, start);
        countdown.play(start, &mut scheduler);
        assert!(countdown.apply_override("1:00", 60, start + secs(20)));
        countdown.poll(start + secs(30));
        assert_eq!(countdown.remaining_secs(), 50);
        assert_eq!(countdown.phase(), CountdownPhase::Running);
    }

    #[test]
    fn cleared_override_can_be_reapplied() {
        let start = Instant::now();
        let mut countdown = Countdown::new();
        countdown.set_base("5:00", 300, start);

        assert!(countdown.apply_override("1:00", 60, start));
        assert!(!countdown.apply_override("1:00", 60, start));
        countdown.clear_override();
        countdown.set_base("4:00", 240, start);
        assert!(countdown.apply_override("1:00", 60, start));
        assert_eq!(countdown.remaining_secs(), 60);
    }

    #[test]
    fn expires_at_zero_and_stops_polling() {
        let mut scheduler = ManualScheduler::default();
        let mut countdown = Countdown::new();
        let start = Instant::now();

        countdown.set_base("0:02", 2, start);
        countdown.play(start, &mut scheduler);
        assert!(countdown.poll(start + secs(3)));
        assert_eq!(countdown.phase(), CountdownPhase::Expired);
        assert_eq!(countdown.remaining_secs(), 0);
        assert_eq!(scheduler.active_repeats(), 0);
        assert!(!countdown.play(start + secs(4), &mut scheduler));
    }

    #[test]
    fn play_with_nothing_left_expires_without_polling() {
        let mut scheduler = ManualScheduler::default();
        let mut countdown = Countdown::new();
        countdown.ensure_initialized();
        assert!(countdown.play(Instant::now(), &mut scheduler));
        assert_eq!(countdown.phase(), CountdownPhase::Expired);
        assert!(scheduler.repeating.is_empty());
    }

    #[test]
    fn pause_when_idle_is_noop() {
        let mut countdown = Countdown::new();
        countdown.set_base("3:20", 200, Instant::now());
        assert!(!countdown.pause(Instant::now()));
        assert_eq!(countdown.display(ClockStyle::MinutesOnly), "3:20");
    }
}
