//! Timestamp-timeline timer columns, read as a legacy mirror of the string
//! timer fields.

use serde::{Deserialize, Serialize};
use time::{Duration, OffsetDateTime};

use crate::dao::models::PlayerRow;

/// Run state stored in the `timer_state` column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimerRunState {
    /// Counting down from `timer_started_at`.
    Running,
    /// Frozen at `timer_paused_at`.
    Paused,
    /// Any other value written by older tooling.
    #[serde(other)]
    Idle,
}

/// Snapshot of the timeline columns of a row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimelineTimer {
    pub state: TimerRunState,
    pub duration_ms: i64,
    pub started_at: Option<OffsetDateTime>,
    pub paused_at: Option<OffsetDateTime>,
    pub accumulated_pause_ms: i64,
}

impl TimelineTimer {
    /// Extract the timeline columns, if the row carries a duration at all.
    pub fn from_row(row: &PlayerRow) -> Option<Self> {
        let duration_ms = row.timer_duration_ms?;
        Some(Self {
            state: row.timer_state.unwrap_or(TimerRunState::Idle),
            duration_ms,
            started_at: row.timer_started_at,
            paused_at: row.timer_paused_at,
            accumulated_pause_ms: row.timer_accumulated_pause_ms.unwrap_or(0),
        })
    }

    /// Whether the timeline says the clock is ticking.
    pub fn is_running(&self) -> bool {
        self.state == TimerRunState::Running
    }

    /// Remaining milliseconds at wall-clock `now`, never negative.
    ///
    /// Running: `duration - (now - started_at - accumulated_pause)`.
    /// Paused: the same formula evaluated at `paused_at`. A paused timer that
    /// never started reports its full duration.
    pub fn remaining_ms(&self, now: OffsetDateTime) -> i64 {
        let reference = match self.state {
            TimerRunState::Running => Some(now),
            TimerRunState::Paused => self.paused_at,
            TimerRunState::Idle => None,
        };

        let remaining = match (reference, self.started_at) {
            (Some(reference), Some(started)) => {
                let elapsed = reference - started - Duration::milliseconds(self.accumulated_pause_ms);
                self.duration_ms - elapsed.whole_milliseconds() as i64
            }
            _ => self.duration_ms,
        };

        remaining.clamp(0, self.duration_ms.max(0))
    }

    /// Change-detection key: equal keys describe the same operator action.
    pub fn change_key(&self) -> String {
        format!(
            "{:?}|{}|{}|{}|{}",
            self.state,
            self.duration_ms,
            self.started_at
                .map(|at| at.unix_timestamp_nanos())
                .unwrap_or_default(),
            self.paused_at
                .map(|at| at.unix_timestamp_nanos())
                .unwrap_or_default(),
            self.accumulated_pause_ms
        )
    }
}

#[cfg(test)]
mod tests {
    use time::macros::datetime;

    use super::*;

    fn timeline(state: TimerRunState) -> TimelineTimer {
        TimelineTimer {
            state,
            duration_ms: 45 * 60_000,
            started_at: Some(datetime!(2025-06-01 12:00:00 UTC)),
            paused_at: None,
            accumulated_pause_ms: 0,
        }
    }

    #[test]
    fn running_subtracts_elapsed_and_pauses() {
        let mut timer = timeline(TimerRunState::Running);
        timer.accumulated_pause_ms = 60_000;
        let now = datetime!(2025-06-01 12:10:00 UTC);
        assert_eq!(timer.remaining_ms(now), 36 * 60_000);
    }

    #[test]
    fn paused_is_frozen_at_pause_instant() {
        let mut timer = timeline(TimerRunState::Paused);
        timer.paused_at = Some(datetime!(2025-06-01 12:05:00 UTC));
        let later = datetime!(2025-06-01 13:00:00 UTC);
        assert_eq!(timer.remaining_ms(later), 40 * 60_000);
    }

    #[test]
    fn paused_before_start_reports_full_duration() {
        let mut timer = timeline(TimerRunState::Paused);
        timer.started_at = None;
        timer.paused_at = Some(datetime!(2025-06-01 12:05:00 UTC));
        assert_eq!(timer.remaining_ms(datetime!(2025-06-01 12:30:00 UTC)), 45 * 60_000);
    }

    #[test]
    fn clamps_to_zero_once_elapsed() {
        let timer = timeline(TimerRunState::Running);
        assert_eq!(timer.remaining_ms(datetime!(2025-06-01 14:00:00 UTC)), 0);
    }

    #[test]
    fn change_key_tracks_edits() {
        let a = timeline(TimerRunState::Running);
        let mut b = a.clone();
        assert_eq!(a.change_key(), b.change_key());
        b.state = TimerRunState::Paused;
        assert_ne!(a.change_key(), b.change_key());
    }
}
