//! Control surface entrypoint: operator REST writes into the row store.

use tracing::info;

use stage_scoreboard::{
    config::AppConfig, dao::row_store, routes, server, services::storage_supervisor,
    state::AppState,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    server::init_tracing();

    let config = AppConfig::load();
    info!(
        table = %config.binding.table,
        ids = ?config.binding.row_ids,
        token_required = config.control_token.is_some(),
        "control surface configured"
    );

    let state = AppState::new(config.clone());
    tokio::spawn(storage_supervisor::run(state.clone(), move || {
        let config = config.clone();
        async move { row_store::open(&config).await }
    }));

    let port = server::port_from_env(&["CONTROL_PORT"], 8081);
    server::serve(routes::control_router(state), port).await
}
