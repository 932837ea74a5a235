//! Overlay engine entrypoint: row store feed in, presentation commands out over SSE.

use std::sync::Arc;

use anyhow::Context;
use tracing::info;

use stage_scoreboard::{
    config::AppConfig,
    dao::row_store,
    overlay::{ScenePresenter, spawn_overlay},
    routes, server,
    services::{feed, image_loader::HttpImageLoader, sse_service, storage_supervisor},
    state::{AppState, OverlayParts},
};

const PRESENT_CAPACITY: usize = 256;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    server::init_tracing();

    let config = AppConfig::load();
    info!(
        table = %config.binding.table,
        ids = ?config.binding.row_ids,
        cards = ?config.params.cards,
        store = ?config.store,
        "overlay configured"
    );

    let presenter = Arc::new(ScenePresenter::new(PRESENT_CAPACITY));
    let images = HttpImageLoader::new().context("building image client")?;
    let (handle, _actor) = spawn_overlay(
        config.overlay_settings(),
        presenter.clone(),
        Arc::new(images),
    );

    let state = AppState::with_overlay(
        config.clone(),
        OverlayParts {
            presenter,
            handle: handle.clone(),
        },
    );

    tokio::spawn(storage_supervisor::run(state.clone(), move || {
        let config = config.clone();
        async move { row_store::open(&config).await }
    }));
    tokio::spawn(feed::run(state.clone(), handle));
    tokio::spawn(sse_service::announce_degraded(state.clone()));

    let port = server::port_from_env(&["PORT", "SERVER_PORT"], 8080);
    server::serve(routes::overlay_router(state), port).await
}
