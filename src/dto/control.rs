//! DTO definitions used by the control REST API and documentation layer.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

use crate::dto::validation::validate_flag_code;

/// Operator status line returned by every control write.
#[derive(Debug, Serialize, ToSchema)]
pub struct StatusLine {
    pub ok: bool,
    pub message: String,
}

impl StatusLine {
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            ok: true,
            message: message.into(),
        }
    }
}

/// Player names for both seats.
#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct NamesRequest {
    #[validate(length(max = 64))]
    pub left: String,
    #[validate(length(max = 64))]
    pub right: String,
}

/// Deck label and country flag of one seat.
#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct MetaRequest {
    #[serde(default)]
    #[validate(length(max = 64))]
    pub deck: String,
    /// Two-letter country code; empty clears the flag.
    #[serde(default)]
    #[validate(custom(function = "validate_flag_code"))]
    pub flag_code: String,
}

/// Clock text entered by the operator (`45`, `45:00`, `1:05:00`).
#[derive(Debug, Deserialize, ToSchema)]
pub struct TimerRequest {
    pub input: String,
}

/// Free-form numeric field; unparsable text falls back to the field default.
#[derive(Debug, Deserialize, ToSchema)]
pub struct ValueRequest {
    #[serde(default)]
    pub value: String,
}

/// Phase label shown as a banner; empty clears it.
#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct PhaseRequest {
    #[serde(default)]
    #[validate(length(max = 64))]
    pub phase: String,
}

/// Card highlight and flip state; absent fields are left untouched.
#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct CardRequest {
    #[validate(url)]
    pub highlight: Option<String>,
    pub flipped: Option<bool>,
}

/// Editable fields of one seat as loaded into the control form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct SeatSnapshot {
    pub id: i64,
    pub name: String,
    pub score: i64,
    pub life_points: i64,
    pub deck: String,
    /// Uppercased code parsed from the stored flag URL.
    pub flag_code: String,
}

/// Both seats of the bound stage.
#[derive(Debug, Serialize, ToSchema)]
pub struct ControlSnapshot {
    pub table: String,
    pub left: Option<SeatSnapshot>,
    pub right: Option<SeatSnapshot>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn meta_request_rejects_long_flag_codes() {
        let request = MetaRequest {
            deck: "Blue-Eyes".into(),
            flag_code: "jpn".into(),
        };
        assert!(request.validate().is_err());

        let request = MetaRequest {
            deck: String::new(),
            flag_code: String::new(),
        };
        assert!(request.validate().is_ok());
    }

    #[test]
    fn card_request_requires_url_highlight() {
        let request = CardRequest {
            highlight: Some("not a url".into()),
            flipped: None,
        };
        assert!(request.validate().is_err());

        let request = CardRequest {
            highlight: None,
            flipped: Some(true),
        };
        assert!(request.validate().is_ok());
    }
}
