//! Clock strings and timer column representations.

pub mod codec;
pub mod timeline;

pub use self::codec::{
    ClockStyle, format_millis, format_seconds, normalize_clock, parse_to_millis, parse_to_seconds,
};
pub use self::timeline::{TimelineTimer, TimerRunState};
