//! In-process row store used for rehearsal mode and tests.

use std::{collections::HashMap, sync::Arc};

use futures::{StreamExt, future::BoxFuture};
use indexmap::IndexMap;
use tokio::sync::{RwLock, broadcast};
use tokio_stream::wrappers::{BroadcastStream, errors::BroadcastStreamRecvError};
use tracing::debug;

use crate::dao::{
    models::{PlayerRow, RowPatch},
    row_store::{RowChanges, RowStore},
    storage::{StorageError, StorageResult},
};

const CHANGE_CAPACITY: usize = 64;

#[derive(Debug, Clone)]
struct RowChange {
    table: String,
    row: PlayerRow,
}

/// Rows kept in memory, with change notifications fanned out to subscribers.
#[derive(Clone)]
pub struct MemoryRowStore {
    tables: Arc<RwLock<HashMap<String, IndexMap<i64, PlayerRow>>>>,
    changes: broadcast::Sender<RowChange>,
}

impl Default for MemoryRowStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryRowStore {
    /// Create an empty store.
    pub fn new() -> Self {
        let (changes, _receiver) = broadcast::channel(CHANGE_CAPACITY);
        Self {
            tables: Arc::new(RwLock::new(HashMap::new())),
            changes,
        }
    }

    /// Create a store with one default row per id in `table`.
    pub async fn seeded(table: &str, ids: &[i64]) -> Self {
        let store = Self::new();
        for id in ids {
            store.upsert(table, PlayerRow::new(*id)).await;
        }
        store
    }

    /// Insert or replace a full row and notify subscribers.
    pub async fn upsert(&self, table: &str, row: PlayerRow) {
        {
            let mut tables = self.tables.write().await;
            tables
                .entry(table.to_string())
                .or_default()
                .insert(row.id, row.clone());
        }
        self.notify(table, row);
    }

    fn notify(&self, table: &str, row: PlayerRow) {
        let _ = self.changes.send(RowChange {
            table: table.to_string(),
            row,
        });
    }
}

impl RowStore for MemoryRowStore {
    fn fetch_rows(
        &self,
        table: &str,
        ids: &[i64],
    ) -> BoxFuture<'static, StorageResult<Vec<PlayerRow>>> {
        let store = self.clone();
        let table = table.to_string();
        let ids = ids.to_vec();
        Box::pin(async move {
            let tables = store.tables.read().await;
            let Some(rows) = tables.get(&table) else {
                return Err(StorageError::rejected(table, "relation does not exist"));
            };
            Ok(ids.iter().filter_map(|id| rows.get(id).cloned()).collect())
        })
    }

    fn update_rows(
        &self,
        table: &str,
        ids: &[i64],
        patch: RowPatch,
    ) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        let table = table.to_string();
        let ids = ids.to_vec();
        Box::pin(async move {
            let updated = {
                let mut tables = store.tables.write().await;
                let Some(rows) = tables.get_mut(&table) else {
                    return Err(StorageError::rejected(table, "relation does not exist"));
                };
                let mut updated = Vec::with_capacity(ids.len());
                for id in &ids {
                    if let Some(row) = rows.get_mut(id) {
                        patch.apply_to(row);
                        updated.push(row.clone());
                    }
                }
                updated
            };

            for row in updated {
                store.notify(&table, row);
            }
            Ok(())
        })
    }

    fn subscribe(&self, table: &str, id: i64) -> BoxFuture<'static, StorageResult<RowChanges>> {
        let receiver = self.changes.subscribe();
        let table = table.to_string();
        Box::pin(async move {
            let stream = BroadcastStream::new(receiver).filter_map(move |change| {
                let table = table.clone();
                async move {
                    match change {
                        Ok(change) if change.table == table && change.row.id == id => {
                            Some(Ok(change.row))
                        }
                        Ok(_) => None,
                        Err(BroadcastStreamRecvError::Lagged(skipped)) => {
                            debug!(skipped, id, "memory subscription lagged");
                            None
                        }
                    }
                }
            });
            Ok(stream.boxed())
        })
    }

    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>> {
        Box::pin(async { Ok(()) })
    }
}
