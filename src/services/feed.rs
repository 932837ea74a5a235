//! Update feed: snapshot plus per-row change subscriptions into the overlay actor.

use std::time::Duration;

use futures::{StreamExt, stream::select_all};
use thiserror::Error;
use tokio::{sync::watch, time::sleep};
use tracing::{debug, info, warn};

use crate::{
    config::StageBinding,
    dao::{row_store::RowStore, storage::StorageError},
    error::ServiceError,
    overlay::{OverlayClosed, OverlayHandle},
    state::SharedState,
};

const INITIAL_DELAY: Duration = Duration::from_millis(1_000);
const MAX_DELAY: Duration = Duration::from_secs(10);

/// Failure of a single resync.
#[derive(Debug, Error)]
pub enum FeedError {
    /// The row store failed.
    #[error(transparent)]
    Storage(#[from] StorageError),
    /// The overlay actor stopped.
    #[error(transparent)]
    Closed(#[from] OverlayClosed),
}

impl From<FeedError> for ServiceError {
    fn from(err: FeedError) -> Self {
        match err {
            FeedError::Storage(err) => ServiceError::Unavailable(err),
            FeedError::Closed(err) => ServiceError::OverlayClosed(err),
        }
    }
}

/// Fetch the bound rows and hand them to the overlay as one snapshot.
pub async fn resync(
    store: &dyn RowStore,
    binding: &StageBinding,
    overlay: &OverlayHandle,
) -> Result<usize, FeedError> {
    let rows = store.fetch_rows(&binding.table, &binding.row_ids).await?;
    let count = rows.len();
    if count < binding.row_ids.len() {
        warn!(
            table = %binding.table,
            found = count,
            "snapshot is missing bound rows"
        );
    }
    overlay.apply_snapshot(rows)?;
    debug!(table = %binding.table, rows = count, "overlay resynced");
    Ok(count)
}

enum SessionEnd {
    OverlayClosed,
    StoreLost,
    Failed(StorageError),
}

/// Keep the overlay in sync with the store for as long as the actor runs.
///
/// Waits out degraded mode, and re-runs snapshot plus subscriptions with a
/// growing delay whenever a subscription fails.
pub async fn run(state: SharedState, overlay: OverlayHandle) {
    let binding = state.config().binding.clone();
    let mut degraded = state.degraded_watcher();
    let mut delay = INITIAL_DELAY;

    loop {
        let store = if state.is_degraded() {
            None
        } else {
            state.store().await
        };
        let Some(store) = store else {
            if degraded.wait_for(|degraded| !*degraded).await.is_err() {
                return;
            }
            continue;
        };

        match session(store.as_ref(), &binding, &overlay, &mut degraded, &mut delay).await {
            SessionEnd::OverlayClosed => {
                info!("overlay stopped; ending update feed");
                return;
            }
            SessionEnd::StoreLost => {
                info!("row store lost; update feed waiting for reconnection");
            }
            SessionEnd::Failed(err) => {
                warn!(
                    error = %err,
                    retry_in_ms = delay.as_millis() as u64,
                    "update feed interrupted; resubscribing"
                );
                sleep(delay).await;
                delay = (delay * 2).min(MAX_DELAY);
            }
        }
    }
}

async fn session(
    store: &dyn RowStore,
    binding: &StageBinding,
    overlay: &OverlayHandle,
    degraded: &mut watch::Receiver<bool>,
    delay: &mut Duration,
) -> SessionEnd {
    let mut subscriptions = Vec::with_capacity(binding.row_ids.len());
    for id in binding.row_ids {
        match store.subscribe(&binding.table, id).await {
            Ok(changes) => subscriptions.push(changes),
            Err(err) => return SessionEnd::Failed(err),
        }
    }

    match resync(store, binding, overlay).await {
        Ok(_) => {}
        Err(FeedError::Storage(err)) => return SessionEnd::Failed(err),
        Err(FeedError::Closed(_)) => return SessionEnd::OverlayClosed,
    }
    info!(table = %binding.table, ids = ?binding.row_ids, "update feed subscribed");

    let mut changes = select_all(subscriptions);
    loop {
        tokio::select! {
            change = changes.next() => match change {
                Some(Ok(row)) => {
                    *delay = INITIAL_DELAY;
                    if overlay.row_changed(row).is_err() {
                        return SessionEnd::OverlayClosed;
                    }
                }
                Some(Err(err)) => return SessionEnd::Failed(err),
                None => {
                    return SessionEnd::Failed(StorageError::SubscriptionClosed {
                        table: binding.table.clone(),
                        id: binding.row_ids[0],
                    });
                }
            },
            changed = degraded.changed() => {
                if changed.is_err() || *degraded.borrow_and_update() {
                    return SessionEnd::StoreLost;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use futures::future::BoxFuture;
    use tokio::time::timeout;

    use super::*;
    use crate::{
        config::AppConfig,
        dao::{
            models::{PlayerRow, RowPatch},
            row_store::memory::MemoryRowStore,
        },
        overlay::{
            ImageError, ImageInfo, ImageLoader, ScenePresenter,
            presenter::{PresentCommand, TextField},
            spawn_overlay,
        },
        state::{AppState, OverlayParts},
    };

    struct BlankImages;

    impl ImageLoader for BlankImages {
        fn load(&self, _url: &str) -> BoxFuture<'static, Result<ImageInfo, ImageError>> {
            Box::pin(async { Ok(ImageInfo::default()) })
        }
    }

    async fn wait_for_text(presenter: &ScenePresenter, expected: &str) -> bool {
        let probe = async {
            loop {
                let found = presenter.scene().iter().any(|command| {
                    matches!(
                        command,
                        PresentCommand::SetText { field: TextField::Deck, text, .. } if text == expected
                    )
                });
                if found {
                    return;
                }
                sleep(Duration::from_millis(10)).await;
            }
        };
        timeout(Duration::from_secs(2), probe).await.is_ok()
    }

    #[tokio::test]
    async fn snapshot_and_changes_reach_the_overlay() {
        let config = AppConfig::default();
        let table = config.binding.table.clone();
        let store = MemoryRowStore::seeded(&table, &config.binding.row_ids).await;
        let mut left = PlayerRow::new(1);
        left.deck = Some("Dragons".into());
        store.upsert(&table, left).await;

        let presenter = Arc::new(ScenePresenter::new(16));
        let (handle, _task) = spawn_overlay(
            config.overlay_settings(),
            presenter.clone(),
            Arc::new(BlankImages),
        );
        let state = AppState::with_overlay(
            config,
            OverlayParts {
                presenter: presenter.clone(),
                handle: handle.clone(),
            },
        );
        state.set_store(Arc::new(store.clone())).await;

        let feed = tokio::spawn(run(state.clone(), handle));
        assert!(wait_for_text(&presenter, "Dragons").await);

        store
            .update_rows(
                &table,
                &[2],
                RowPatch {
                    deck: Some("Spellcasters".into()),
                    ..RowPatch::default()
                },
            )
            .await
            .unwrap();
        assert!(wait_for_text(&presenter, "Spellcasters").await);
        feed.abort();
    }

    #[tokio::test]
    async fn resync_reports_fetched_rows() {
        let config = AppConfig::default();
        let store = MemoryRowStore::seeded(&config.binding.table, &[1]).await;
        let (handle, _task) = spawn_overlay(
            config.overlay_settings(),
            Arc::new(ScenePresenter::new(4)),
            Arc::new(BlankImages),
        );
        let rows = resync(&store, &config.binding, &handle).await.unwrap();
        assert_eq!(rows, 1);
    }

    #[tokio::test]
    async fn resync_against_missing_table_fails() {
        let config = AppConfig::default();
        let store = MemoryRowStore::new();
        let (handle, _task) = spawn_overlay(
            config.overlay_settings(),
            Arc::new(ScenePresenter::new(4)),
            Arc::new(BlankImages),
        );
        let err = resync(&store, &config.binding, &handle).await.unwrap_err();
        assert!(matches!(err, FeedError::Storage(StorageError::Rejected { .. })));
    }
}
