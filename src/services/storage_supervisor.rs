use std::{future::Future, sync::Arc, time::Duration};

use tokio::time::sleep;
use tracing::{info, warn};

use crate::{
    dao::{row_store::RowStore, storage::StorageError},
    state::SharedState,
};

const INITIAL_DELAY: Duration = Duration::from_millis(1_000);
const MAX_DELAY: Duration = Duration::from_secs(10);
const HEALTH_POLL_INTERVAL: Duration = Duration::from_secs(5);
const MAX_RECOVERY_ATTEMPTS: u32 = 3;

/// Connect to the row store and keep the shared state in degraded mode while it is unavailable.
pub async fn run<F, Fut>(state: SharedState, mut connect: F)
where
    F: FnMut() -> Fut + Send + 'static,
    Fut: Future<Output = Result<Arc<dyn RowStore>, StorageError>> + Send,
{
    let mut delay = INITIAL_DELAY;

    loop {
        match connect().await {
            Ok(store) => {
                state.set_store(store.clone()).await;
                info!("row store connection established; leaving degraded mode");
                delay = INITIAL_DELAY;

                supervise(&state, store.as_ref()).await;

                warn!("row store lost; reconnecting");
                state.clear_store().await;
                sleep(delay).await;
                delay = (delay * 2).min(MAX_DELAY);
            }
            Err(err) => {
                warn!(error = %err, "row store connection attempt failed");
                sleep(delay).await;
                delay = (delay * 2).min(MAX_DELAY);
            }
        }
    }
}

/// Poll health until the store stays unreachable for every recovery attempt.
async fn supervise(state: &SharedState, store: &dyn RowStore) {
    loop {
        match store.health_check().await {
            Ok(()) => {
                if state.is_degraded() {
                    info!("row store healthy again; leaving degraded mode");
                    state.update_degraded(false);
                }
                sleep(HEALTH_POLL_INTERVAL).await;
            }
            Err(err) => {
                warn!(error = %err, "row store health check failed; entering degraded mode");
                state.update_degraded(true);

                let mut attempt = 0;
                let mut retry_delay = INITIAL_DELAY;
                let mut recovered = false;
                while attempt < MAX_RECOVERY_ATTEMPTS {
                    sleep(retry_delay).await;
                    match store.health_check().await {
                        Ok(()) => {
                            info!(attempt, "row store recovered after health check failure");
                            recovered = true;
                            break;
                        }
                        Err(err) => {
                            warn!(attempt, error = %err, "row store recovery attempt failed");
                            attempt += 1;
                            retry_delay = (retry_delay * 2).min(MAX_DELAY);
                        }
                    }
                }

                if !recovered {
                    warn!("exhausted row store recovery attempts");
                    return;
                }
                state.update_degraded(false);
                sleep(HEALTH_POLL_INTERVAL).await;
            }
        }
    }
}
