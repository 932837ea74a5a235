use axum::{
    Json, Router,
    body::Body,
    extract::{Path, State},
    http::Request,
    middleware::{self, Next},
    response::Response,
    routing::{get, post},
};
use validator::Validate;

use crate::{
    dto::control::{
        CardRequest, ControlSnapshot, MetaRequest, NamesRequest, PhaseRequest, StatusLine,
        TimerRequest, ValueRequest,
    },
    error::AppError,
    overlay::Side,
    services::control_service,
    state::SharedState,
};

const CONTROL_TOKEN_HEADER: &str = "x-control-token";

/// Operator endpoints writing partial rows into the bound stage.
pub fn router(state: SharedState) -> Router<SharedState> {
    Router::new()
        .route("/control/rows", get(load_rows))
        .route("/control/names", post(save_names))
        .route("/control/timer/set", post(timer_set))
        .route("/control/timer/reset", post(timer_reset))
        .route("/control/timer/play", post(timer_play))
        .route("/control/timer/pause", post(timer_pause))
        .route("/control/timer/adjust", post(timer_adjust))
        .route("/control/{side}/meta", post(set_meta))
        .route("/control/{side}/score", post(set_score))
        .route("/control/{side}/score/reset", post(reset_score))
        .route("/control/{side}/life-points", post(set_life_points))
        .route("/control/{side}/life-points/reset", post(reset_life_points))
        .route("/control/{side}/phase", post(set_phase))
        .route("/control/{side}/card", post(set_card))
        .route_layer(middleware::from_fn_with_state(state, require_control_token))
}

/// Load both seats of the bound stage.
#[utoipa::path(
    get,
    path = "/control/rows",
    tag = "control",
    responses((status = 200, description = "Current seat values", body = ControlSnapshot))
)]
pub async fn load_rows(State(state): State<SharedState>) -> Result<Json<ControlSnapshot>, AppError> {
    Ok(Json(control_service::load(&state).await?))
}

/// Save both player names.
#[utoipa::path(
    post,
    path = "/control/names",
    tag = "control",
    request_body = NamesRequest,
    responses((status = 200, description = "Names saved", body = StatusLine))
)]
pub async fn save_names(
    State(state): State<SharedState>,
    Json(request): Json<NamesRequest>,
) -> Result<Json<StatusLine>, AppError> {
    request.validate()?;
    Ok(Json(control_service::save_names(&state, request).await?))
}

/// Set the timer of both rows from an operator clock input.
#[utoipa::path(
    post,
    path = "/control/timer/set",
    tag = "control",
    request_body = TimerRequest,
    responses(
        (status = 200, description = "Timer set", body = StatusLine),
        (status = 400, description = "Input is not a clock value")
    )
)]
pub async fn timer_set(
    State(state): State<SharedState>,
    Json(request): Json<TimerRequest>,
) -> Result<Json<StatusLine>, AppError> {
    Ok(Json(control_service::timer_set(&state, request).await?))
}

/// Reset the timer of both rows to an operator clock input.
#[utoipa::path(
    post,
    path = "/control/timer/reset",
    tag = "control",
    request_body = TimerRequest,
    responses(
        (status = 200, description = "Timer reset", body = StatusLine),
        (status = 400, description = "Input is not a clock value")
    )
)]
pub async fn timer_reset(
    State(state): State<SharedState>,
    Json(request): Json<TimerRequest>,
) -> Result<Json<StatusLine>, AppError> {
    Ok(Json(control_service::timer_reset(&state, request).await?))
}

/// Start the countdown.
#[utoipa::path(
    post,
    path = "/control/timer/play",
    tag = "control",
    responses((status = 200, description = "Timer running", body = StatusLine))
)]
pub async fn timer_play(State(state): State<SharedState>) -> Result<Json<StatusLine>, AppError> {
    Ok(Json(control_service::timer_play(&state).await?))
}

/// Pause the countdown.
#[utoipa::path(
    post,
    path = "/control/timer/pause",
    tag = "control",
    responses((status = 200, description = "Timer paused", body = StatusLine))
)]
pub async fn timer_pause(State(state): State<SharedState>) -> Result<Json<StatusLine>, AppError> {
    Ok(Json(control_service::timer_pause(&state).await?))
}

/// Override the remaining time; empty input clears the override.
#[utoipa::path(
    post,
    path = "/control/timer/adjust",
    tag = "control",
    request_body = TimerRequest,
    responses(
        (status = 200, description = "Override written", body = StatusLine),
        (status = 400, description = "Input is not a clock value")
    )
)]
pub async fn timer_adjust(
    State(state): State<SharedState>,
    Json(request): Json<TimerRequest>,
) -> Result<Json<StatusLine>, AppError> {
    Ok(Json(control_service::timer_adjust(&state, request).await?))
}

/// Save deck label and flag of one seat.
#[utoipa::path(
    post,
    path = "/control/{side}/meta",
    tag = "control",
    params(("side" = Side, Path, description = "Seat to update")),
    request_body = MetaRequest,
    responses((status = 200, description = "Meta saved", body = StatusLine))
)]
pub async fn set_meta(
    State(state): State<SharedState>,
    Path(side): Path<Side>,
    Json(request): Json<MetaRequest>,
) -> Result<Json<StatusLine>, AppError> {
    request.validate()?;
    Ok(Json(control_service::set_meta(&state, side, request).await?))
}

/// Set the score of one seat; unparsable values write 0.
#[utoipa::path(
    post,
    path = "/control/{side}/score",
    tag = "control",
    params(("side" = Side, Path, description = "Seat to update")),
    request_body = ValueRequest,
    responses((status = 200, description = "Score saved", body = StatusLine))
)]
pub async fn set_score(
    State(state): State<SharedState>,
    Path(side): Path<Side>,
    Json(request): Json<ValueRequest>,
) -> Result<Json<StatusLine>, AppError> {
    Ok(Json(control_service::set_score(&state, side, request).await?))
}

#[utoipa::path(
    post,
    path = "/control/{side}/score/reset",
    tag = "control",
    params(("side" = Side, Path, description = "Seat to update")),
    responses((status = 200, description = "Score reset", body = StatusLine))
)]
pub async fn reset_score(
    State(state): State<SharedState>,
    Path(side): Path<Side>,
) -> Result<Json<StatusLine>, AppError> {
    Ok(Json(control_service::reset_score(&state, side).await?))
}

/// Set the life points of one seat; unparsable values write the starting amount.
#[utoipa::path(
    post,
    path = "/control/{side}/life-points",
    tag = "control",
    params(("side" = Side, Path, description = "Seat to update")),
    request_body = ValueRequest,
    responses((status = 200, description = "Life points saved", body = StatusLine))
)]
pub async fn set_life_points(
    State(state): State<SharedState>,
    Path(side): Path<Side>,
    Json(request): Json<ValueRequest>,
) -> Result<Json<StatusLine>, AppError> {
    Ok(Json(
        control_service::set_life_points(&state, side, request).await?,
    ))
}

#[utoipa::path(
    post,
    path = "/control/{side}/life-points/reset",
    tag = "control",
    params(("side" = Side, Path, description = "Seat to update")),
    responses((status = 200, description = "Life points reset", body = StatusLine))
)]
pub async fn reset_life_points(
    State(state): State<SharedState>,
    Path(side): Path<Side>,
) -> Result<Json<StatusLine>, AppError> {
    Ok(Json(control_service::reset_life_points(&state, side).await?))
}

/// Show a phase banner for one seat; empty clears it.
#[utoipa::path(
    post,
    path = "/control/{side}/phase",
    tag = "control",
    params(("side" = Side, Path, description = "Seat to update")),
    request_body = PhaseRequest,
    responses((status = 200, description = "Phase saved", body = StatusLine))
)]
pub async fn set_phase(
    State(state): State<SharedState>,
    Path(side): Path<Side>,
    Json(request): Json<PhaseRequest>,
) -> Result<Json<StatusLine>, AppError> {
    request.validate()?;
    Ok(Json(control_service::set_phase(&state, side, request).await?))
}

/// Change the highlighted card or its flip state.
#[utoipa::path(
    post,
    path = "/control/{side}/card",
    tag = "control",
    params(("side" = Side, Path, description = "Seat to update")),
    request_body = CardRequest,
    responses(
        (status = 200, description = "Card saved", body = StatusLine),
        (status = 400, description = "Nothing to write or invalid URL")
    )
)]
pub async fn set_card(
    State(state): State<SharedState>,
    Path(side): Path<Side>,
    Json(request): Json<CardRequest>,
) -> Result<Json<StatusLine>, AppError> {
    request.validate()?;
    Ok(Json(control_service::set_card(&state, side, request).await?))
}

async fn require_control_token(
    State(state): State<SharedState>,
    req: Request<Body>,
    next: Next,
) -> Result<Response, AppError> {
    let Some(expected) = state.config().control_token.as_deref() else {
        return Ok(next.run(req).await);
    };

    let provided = req
        .headers()
        .get(CONTROL_TOKEN_HEADER)
        .and_then(|value| value.to_str().ok())
        .ok_or_else(|| {
            AppError::Unauthorized("missing control token header `X-Control-Token`".into())
        })?;

    if provided == expected {
        Ok(next.run(req).await)
    } else {
        Err(AppError::Unauthorized("invalid control token".into()))
    }
}
