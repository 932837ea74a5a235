use utoipa::OpenApi;

#[derive(OpenApi)]
/// OpenAPI specification of the overlay engine.
#[openapi(
    paths(
        crate::routes::health::healthcheck,
        crate::routes::sse::overlay_stream,
        crate::routes::overlay::status,
        crate::routes::overlay::resync,
    ),
    components(
        schemas(
            crate::dto::health::HealthResponse,
            crate::dto::overlay::OverlayStatus,
            crate::dto::overlay::ResyncResponse,
            crate::dto::sse::Handshake,
            crate::dto::sse::SystemStatus,
            crate::overlay::presenter::PresentCommand,
        )
    ),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "sse", description = "Renderer presentation stream"),
        (name = "overlay", description = "Overlay inspection"),
    )
)]
pub struct OverlayApiDoc;

#[derive(OpenApi)]
/// OpenAPI specification of the control surface.
#[openapi(
    paths(
        crate::routes::health::healthcheck,
        crate::routes::control::load_rows,
        crate::routes::control::save_names,
        crate::routes::control::timer_set,
        crate::routes::control::timer_reset,
        crate::routes::control::timer_play,
        crate::routes::control::timer_pause,
        crate::routes::control::timer_adjust,
        crate::routes::control::set_meta,
        crate::routes::control::set_score,
        crate::routes::control::reset_score,
        crate::routes::control::set_life_points,
        crate::routes::control::reset_life_points,
        crate::routes::control::set_phase,
        crate::routes::control::set_card,
    ),
    components(
        schemas(
            crate::dto::health::HealthResponse,
            crate::dto::control::StatusLine,
            crate::dto::control::ControlSnapshot,
            crate::dto::control::SeatSnapshot,
            crate::overlay::Side,
        )
    ),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "control", description = "Operator writes into the stage rows"),
    )
)]
pub struct ControlApiDoc;
