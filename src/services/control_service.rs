//! Control surface writes: every operator action becomes a partial row update.

use tracing::{info, warn};

use crate::{
    clock::{ClockStyle, normalize_clock},
    dao::models::{PlayerRow, RowPatch},
    dto::control::{
        CardRequest, ControlSnapshot, MetaRequest, NamesRequest, PhaseRequest, SeatSnapshot,
        StatusLine, TimerRequest, ValueRequest,
    },
    error::ServiceError,
    overlay::Side,
    state::SharedState,
};

/// Rejection shown when a clock input does not parse.
pub const TIME_INPUT_HINT: &str = "Enter a time like 45 or 45:00";
const FLAG_URL_PREFIX: &str = "https://flagcdn.com/h80/";
const DEFAULT_SCORE: i64 = 0;

async fn write(
    state: &SharedState,
    action: &'static str,
    ids: &[i64],
    patch: RowPatch,
) -> Result<(), ServiceError> {
    let store = state.require_store().await?;
    let table = &state.config().binding.table;
    store
        .update_rows(table, ids, patch)
        .await
        .map_err(ServiceError::write(action))
        .inspect_err(|err| warn!(error = %err, table, ?ids, "control write failed"))?;
    info!(action, table, ?ids, "control write applied");
    Ok(())
}

async fn write_side(
    state: &SharedState,
    action: &'static str,
    side: Side,
    patch: RowPatch,
) -> Result<(), ServiceError> {
    let id = state.config().binding.row_id(side);
    write(state, action, &[id], patch).await
}

async fn write_both(
    state: &SharedState,
    action: &'static str,
    patch: RowPatch,
) -> Result<(), ServiceError> {
    let ids = state.config().binding.row_ids;
    write(state, action, &ids, patch).await
}

fn parse_clock(input: &str) -> Result<String, ServiceError> {
    normalize_clock(input, ClockStyle::MinutesOnly)
        .ok_or_else(|| ServiceError::InvalidInput(TIME_INPUT_HINT.into()))
}

fn seat_label(side: Side) -> &'static str {
    match side {
        Side::Left => "Left",
        Side::Right => "Right",
    }
}

fn int_or(text: &str, default: i64) -> i64 {
    text.trim().parse().unwrap_or(default)
}

/// Flag image URL for a country code; empty clears the flag.
pub fn flag_url(code: &str) -> String {
    let code = code.trim().to_ascii_lowercase();
    if code.is_empty() {
        String::new()
    } else {
        format!("{FLAG_URL_PREFIX}{code}.png")
    }
}

/// Recover the two-letter country code from a stored flag URL.
pub fn flag_code(url: &str) -> String {
    let segment = url.trim().rsplit('/').next().unwrap_or_default();
    let stem = segment.split('.').next().unwrap_or_default();
    if stem.len() == 2 && stem.chars().all(|c| c.is_ascii_alphabetic()) {
        stem.to_ascii_uppercase()
    } else {
        String::new()
    }
}

fn seat(row: &PlayerRow, starting_life_points: i64) -> SeatSnapshot {
    SeatSnapshot {
        id: row.id,
        name: row.br_name.clone().unwrap_or_default(),
        score: row.score.unwrap_or(DEFAULT_SCORE),
        life_points: row.life_points.unwrap_or(starting_life_points),
        deck: row.deck.clone().unwrap_or_default(),
        flag_code: flag_code(row.flag_img_url.as_deref().unwrap_or_default()),
    }
}

/// Load both seats of the bound stage into the control form.
pub async fn load(state: &SharedState) -> Result<ControlSnapshot, ServiceError> {
    let store = state.require_store().await?;
    let config = state.config();
    let binding = &config.binding;
    let rows = store
        .fetch_rows(&binding.table, &binding.row_ids)
        .await
        .map_err(ServiceError::write("Load"))?;

    let find = |side: Side| {
        rows.iter()
            .find(|row| row.id == binding.row_id(side))
            .map(|row| seat(row, config.starting_life_points))
    };
    Ok(ControlSnapshot {
        table: binding.table.clone(),
        left: find(Side::Left),
        right: find(Side::Right),
    })
}

pub async fn save_names(
    state: &SharedState,
    request: NamesRequest,
) -> Result<StatusLine, ServiceError> {
    for (side, name) in [(Side::Left, &request.left), (Side::Right, &request.right)] {
        let patch = RowPatch {
            br_name: Some(name.trim().to_string()),
            ..RowPatch::default()
        };
        write_side(state, "Save names", side, patch).await?;
    }
    Ok(StatusLine::ok("Names saved"))
}

pub async fn set_meta(
    state: &SharedState,
    side: Side,
    request: MetaRequest,
) -> Result<StatusLine, ServiceError> {
    let patch = RowPatch {
        deck: Some(request.deck.trim().to_string()),
        flag_img_url: Some(flag_url(&request.flag_code)),
        ..RowPatch::default()
    };
    write_side(state, "Save meta", side, patch).await?;
    Ok(StatusLine::ok(format!("{} deck and flag saved", seat_label(side))))
}

/// Zero the clock first so subscribers see a change even when the new
/// value equals the old one.
async fn write_timer(
    state: &SharedState,
    action: &'static str,
    clock: String,
) -> Result<(), ServiceError> {
    let clear = RowPatch {
        timer_value: Some("0:00".into()),
        timer_adjust: Some(None),
        ..RowPatch::default()
    };
    write_both(state, action, clear).await?;

    let set = RowPatch {
        timer_value: Some(clock),
        timer_play: Some(false),
        ..RowPatch::default()
    };
    write_both(state, action, set).await
}

pub async fn timer_set(
    state: &SharedState,
    request: TimerRequest,
) -> Result<StatusLine, ServiceError> {
    let clock = parse_clock(&request.input)?;
    write_timer(state, "Set timer", clock.clone()).await?;
    Ok(StatusLine::ok(format!("Timer set to {clock}")))
}

pub async fn timer_reset(
    state: &SharedState,
    request: TimerRequest,
) -> Result<StatusLine, ServiceError> {
    let clock = parse_clock(&request.input)?;
    write_timer(state, "Reset timer", clock.clone()).await?;
    Ok(StatusLine::ok(format!("Timer reset to {clock}")))
}

pub async fn timer_play(state: &SharedState) -> Result<StatusLine, ServiceError> {
    let patch = RowPatch {
        timer_play: Some(true),
        ..RowPatch::default()
    };
    write_both(state, "Play timer", patch).await?;
    Ok(StatusLine::ok("Timer running"))
}

pub async fn timer_pause(state: &SharedState) -> Result<StatusLine, ServiceError> {
    let patch = RowPatch {
        timer_play: Some(false),
        ..RowPatch::default()
    };
    write_both(state, "Pause timer", patch).await?;
    Ok(StatusLine::ok("Timer paused"))
}

/// Override the running clock. Empty input clears the override.
pub async fn timer_adjust(
    state: &SharedState,
    request: TimerRequest,
) -> Result<StatusLine, ServiceError> {
    let adjust = if request.input.trim().is_empty() {
        None
    } else {
        Some(parse_clock(&request.input)?)
    };
    let message = match &adjust {
        Some(clock) => format!("Timer adjusted to {clock}"),
        None => "Timer adjustment cleared".to_string(),
    };
    let patch = RowPatch {
        timer_adjust: Some(adjust),
        ..RowPatch::default()
    };
    write_both(state, "Adjust timer", patch).await?;
    Ok(StatusLine::ok(message))
}

pub async fn set_score(
    state: &SharedState,
    side: Side,
    request: ValueRequest,
) -> Result<StatusLine, ServiceError> {
    let score = int_or(&request.value, DEFAULT_SCORE);
    let patch = RowPatch {
        score: Some(score),
        ..RowPatch::default()
    };
    write_side(state, "Save score", side, patch).await?;
    Ok(StatusLine::ok(format!("{} score set to {score}", seat_label(side))))
}

pub async fn reset_score(state: &SharedState, side: Side) -> Result<StatusLine, ServiceError> {
    let patch = RowPatch {
        score: Some(DEFAULT_SCORE),
        ..RowPatch::default()
    };
    write_side(state, "Reset score", side, patch).await?;
    Ok(StatusLine::ok(format!("{} score reset", seat_label(side))))
}

pub async fn set_life_points(
    state: &SharedState,
    side: Side,
    request: ValueRequest,
) -> Result<StatusLine, ServiceError> {
    let life_points = int_or(&request.value, state.config().starting_life_points);
    let patch = RowPatch {
        life_points: Some(life_points),
        ..RowPatch::default()
    };
    write_side(state, "Save life points", side, patch).await?;
    let label = seat_label(side);
    Ok(StatusLine::ok(format!("{label} life points set to {life_points}")))
}

pub async fn reset_life_points(
    state: &SharedState,
    side: Side,
) -> Result<StatusLine, ServiceError> {
    let patch = RowPatch {
        life_points: Some(state.config().starting_life_points),
        ..RowPatch::default()
    };
    write_side(state, "Reset life points", side, patch).await?;
    Ok(StatusLine::ok(format!("{} life points reset", seat_label(side))))
}

pub async fn set_phase(
    state: &SharedState,
    side: Side,
    request: PhaseRequest,
) -> Result<StatusLine, ServiceError> {
    let phase = request.phase.trim().to_string();
    let message = if phase.is_empty() {
        format!("{} phase cleared", seat_label(side))
    } else {
        format!("{} phase set to {phase}", seat_label(side))
    };
    let patch = RowPatch {
        phase: Some(phase),
        ..RowPatch::default()
    };
    write_side(state, "Save phase", side, patch).await?;
    Ok(StatusLine::ok(message))
}

pub async fn set_card(
    state: &SharedState,
    side: Side,
    request: CardRequest,
) -> Result<StatusLine, ServiceError> {
    let patch = RowPatch {
        card_highlight: request.highlight.map(|url| url.trim().to_string()),
        card_flipped: request.flipped,
        ..RowPatch::default()
    };
    if patch.is_empty() {
        return Err(ServiceError::InvalidInput(
            "Provide a highlight or a flipped state".into(),
        ));
    }
    write_side(state, "Save card", side, patch).await?;
    Ok(StatusLine::ok(format!("{} card saved", seat_label(side))))
}
