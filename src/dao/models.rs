//! Wire models for the scoreboard tables.

use serde::{Deserialize, Serialize};
use serde_with::skip_serializing_none;
use time::OffsetDateTime;

use crate::{clock::TimerRunState, overlay::side::Side};

/// One seat row as stored in a `Stage{n}Scoreboard` table.
///
/// Every column except `id` is optional: realtime payloads and snapshot
/// fetches may omit columns, and columns may hold `null`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PlayerRow {
    pub id: i64,
    pub br_name: Option<String>,
    pub record: Option<String>,
    pub deck: Option<String>,
    pub flag_img_url: Option<String>,
    pub score: Option<i64>,
    pub life_points: Option<i64>,
    pub phase: Option<String>,
    pub card_highlight: Option<String>,
    pub card_flipped: Option<bool>,
    pub timer_value: Option<String>,
    pub timer_adjust: Option<String>,
    pub timer_play: Option<bool>,
    #[serde(rename = "timer_state")]
    pub timer_state: Option<TimerRunState>,
    #[serde(rename = "timer_duration_ms")]
    pub timer_duration_ms: Option<i64>,
    #[serde(rename = "timer_started_at", with = "time::serde::rfc3339::option")]
    pub timer_started_at: Option<OffsetDateTime>,
    #[serde(rename = "timer_paused_at", with = "time::serde::rfc3339::option")]
    pub timer_paused_at: Option<OffsetDateTime>,
    #[serde(rename = "timer_accumulated_pause_ms")]
    pub timer_accumulated_pause_ms: Option<i64>,
}

impl PlayerRow {
    /// Create an empty row for the given id.
    pub fn new(id: i64) -> Self {
        Self {
            id,
            ..Self::default()
        }
    }

    /// Logical side this row renders on.
    pub fn side(&self) -> Side {
        Side::from_row_id(self.id)
    }

    /// Whether any of the string-triple timer fields are present.
    pub fn has_timer_triple(&self) -> bool {
        self.timer_value.is_some() || self.timer_adjust.is_some() || self.timer_play.is_some()
    }
}

/// Partial column set written by the control surface.
///
/// `None` leaves a column untouched; `Some(None)` writes an explicit `null`.
#[skip_serializing_none]
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RowPatch {
    pub br_name: Option<String>,
    pub record: Option<String>,
    pub deck: Option<String>,
    pub flag_img_url: Option<String>,
    pub score: Option<i64>,
    pub life_points: Option<i64>,
    pub phase: Option<String>,
    pub card_highlight: Option<String>,
    pub card_flipped: Option<bool>,
    pub timer_value: Option<String>,
    #[serde(
        default,
        with = "::serde_with::rust::double_option",
        skip_serializing_if = "Option::is_none"
    )]
    pub timer_adjust: Option<Option<String>>,
    pub timer_play: Option<bool>,
}

impl RowPatch {
    /// Whether the patch writes nothing.
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Merge the patch into a stored row.
    pub fn apply_to(&self, row: &mut PlayerRow) {
        fn set<T: Clone>(slot: &mut Option<T>, value: &Option<T>) {
            if let Some(value) = value {
                *slot = Some(value.clone());
            }
        }

        set(&mut row.br_name, &self.br_name);
        set(&mut row.record, &self.record);
        set(&mut row.deck, &self.deck);
        set(&mut row.flag_img_url, &self.flag_img_url);
        set(&mut row.score, &self.score);
        set(&mut row.life_points, &self.life_points);
        set(&mut row.phase, &self.phase);
        set(&mut row.card_highlight, &self.card_highlight);
        set(&mut row.card_flipped, &self.card_flipped);
        set(&mut row.timer_value, &self.timer_value);
        if let Some(adjust) = &self.timer_adjust {
            row.timer_adjust = adjust.clone();
        }
        set(&mut row.timer_play, &self.timer_play);
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn decodes_realtime_record_with_unknown_columns() {
        let row: PlayerRow = serde_json::from_value(json!({
            "id": 3,
            "brName": "Kaiba",
            "lifePoints": 8000,
            "phase": null,
            "timerValue": "5:00",
            "timerPlay": false,
            "timer_state": "running",
            "timer_started_at": "2025-06-01T12:00:00+00:00",
            "created_at": "2025-06-01T11:00:00+00:00"
        }))
        .unwrap();

        assert_eq!(row.id, 3);
        assert_eq!(row.side(), Side::Left);
        assert_eq!(row.br_name.as_deref(), Some("Kaiba"));
        assert_eq!(row.phase, None);
        assert_eq!(row.timer_state, Some(TimerRunState::Running));
        assert!(row.timer_started_at.is_some());
        assert!(row.has_timer_triple());
    }

    #[test]
    fn patch_serializes_only_written_columns() {
        let patch = RowPatch {
            timer_value: Some("0:00".into()),
            timer_adjust: Some(None),
            ..RowPatch::default()
        };
        let value = serde_json::to_value(&patch).unwrap();
        assert_eq!(value, json!({ "timerValue": "0:00", "timerAdjust": null }));
    }

    #[test]
    fn patch_merges_into_row() {
        let mut row = PlayerRow::new(1);
        row.timer_adjust = Some("1:00".into());
        RowPatch {
            score: Some(2),
            timer_adjust: Some(None),
            ..RowPatch::default()
        }
        .apply_to(&mut row);
        assert_eq!(row.score, Some(2));
        assert_eq!(row.timer_adjust, None);
        assert!(RowPatch::default().is_empty());
    }
}
