use axum::Router;
use utoipa::openapi::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::state::SharedState;

/// Serve the Swagger UI backed by the given OpenAPI document.
pub fn router(doc: OpenApi) -> Router<SharedState> {
    SwaggerUi::new("/docs")
        .url("/api-doc/openapi.json", doc)
        .into()
}
