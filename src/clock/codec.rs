//! Conversion between operator-entered clock strings and milliseconds.

use serde::{Deserialize, Serialize};

const MS_PER_SECOND: u64 = 1_000;
const MS_PER_MINUTE: u64 = 60 * MS_PER_SECOND;
const MS_PER_HOUR: u64 = 60 * MS_PER_MINUTE;

/// How a duration is rendered back into a clock string.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClockStyle {
    /// `m:ss`, minutes keep growing past an hour (`75:00`).
    #[default]
    MinutesOnly,
    /// `h:mm:ss` once the duration reaches an hour, `m:ss` below.
    HourAware,
}

/// Parse a clock string into milliseconds.
///
/// A bare integer is read as minutes; otherwise `mm:ss` or `hh:mm:ss` with
/// non-negative integer components. Components are not range checked, so
/// `90:00` is ninety minutes. Returns `None` for empty input, any
/// non-numeric component, or a value that does not fit in a `u64`.
pub fn parse_to_millis(input: &str) -> Option<u64> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return None;
    }

    if is_digits(trimmed) {
        return trimmed.parse::<u64>().ok()?.checked_mul(MS_PER_MINUTE);
    }

    let parts = trimmed
        .split(':')
        .map(|part| {
            let part = part.trim();
            if is_digits(part) {
                part.parse::<u64>().ok()
            } else {
                None
            }
        })
        .collect::<Option<Vec<_>>>()?;

    let (hours, minutes, seconds) = match parts.as_slice() {
        [minutes, seconds] => (0, *minutes, *seconds),
        [hours, minutes, seconds] => (*hours, *minutes, *seconds),
        _ => return None,
    };

    hours
        .checked_mul(MS_PER_HOUR)?
        .checked_add(minutes.checked_mul(MS_PER_MINUTE)?)?
        .checked_add(seconds.checked_mul(MS_PER_SECOND)?)
}

/// Parse a clock string into whole seconds.
pub fn parse_to_seconds(input: &str) -> Option<u64> {
    parse_to_millis(input).map(|ms| ms / MS_PER_SECOND)
}

/// Render milliseconds as a clock string, clamping negatives to zero and
/// rounding to the nearest second.
pub fn format_millis(ms: i64, style: ClockStyle) -> String {
    let ms = ms.max(0) as u64;
    let total = (ms + MS_PER_SECOND / 2) / MS_PER_SECOND;
    format_total_seconds(total, style)
}

/// Render whole seconds as a clock string.
pub fn format_seconds(seconds: u64, style: ClockStyle) -> String {
    format_total_seconds(seconds, style)
}

/// Parse then re-render an operator input in canonical form.
pub fn normalize_clock(input: &str, style: ClockStyle) -> Option<String> {
    parse_to_millis(input).map(|ms| format_total_seconds(ms / MS_PER_SECOND, style))
}

fn format_total_seconds(total: u64, style: ClockStyle) -> String {
    let secs = total % 60;
    match style {
        ClockStyle::MinutesOnly => format!("{}:{secs:02}", total / 60),
        ClockStyle::HourAware => {
            let hours = total / 3600;
            let mins = (total % 3600) / 60;
            if hours > 0 {
                format!("{hours}:{mins:02}:{secs:02}")
            } else {
                format!("{mins}:{secs:02}")
            }
        }
    }
}

fn is_digits(value: &str) -> bool {
    !value.is_empty() && value.bytes().all(|b| b.is_ascii_digit())
}
