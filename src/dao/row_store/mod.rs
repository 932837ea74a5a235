//! Row store seam and backend selection.

pub(crate) mod memory;
#[cfg(feature = "supabase-store")]
pub(crate) mod supabase;

use std::sync::Arc;

use futures::{future::BoxFuture, stream::BoxStream};
use tracing::info;

use crate::{
    config::{AppConfig, StoreKind},
    dao::{
        models::{PlayerRow, RowPatch},
        storage::StorageResult,
    },
};

/// Stream of full row states delivered by a change subscription.
///
/// Ordering across rows is not guaranteed and unchanged states may be
/// delivered more than once.
pub type RowChanges = BoxStream<'static, StorageResult<PlayerRow>>;

/// Abstraction over the hosted table store holding the scoreboard rows.
pub trait RowStore: Send + Sync {
    /// Fetch the current state of the given rows.
    fn fetch_rows(
        &self,
        table: &str,
        ids: &[i64],
    ) -> BoxFuture<'static, StorageResult<Vec<PlayerRow>>>;
    /// Write a partial column set to every listed row.
    fn update_rows(
        &self,
        table: &str,
        ids: &[i64],
        patch: RowPatch,
    ) -> BoxFuture<'static, StorageResult<()>>;
    /// Subscribe to changes of a single row.
    fn subscribe(&self, table: &str, id: i64) -> BoxFuture<'static, StorageResult<RowChanges>>;
    /// Cheap round-trip proving the backend is reachable.
    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>>;
}

/// Open the row store backend selected in the configuration.
///
/// The memory backend starts with one default row per bound id.
pub async fn open(config: &AppConfig) -> StorageResult<Arc<dyn RowStore>> {
    let binding = &config.binding;
    match config.store {
        StoreKind::Memory => {
            let store = memory::MemoryRowStore::seeded(&binding.table, &binding.row_ids).await;
            info!(table = %binding.table, ids = ?binding.row_ids, "using in-memory row store");
            Ok(Arc::new(store))
        }
        #[cfg(feature = "supabase-store")]
        StoreKind::Supabase => {
            let supabase = supabase::SupabaseConfig::from_env()?;
            let store = supabase::SupabaseRowStore::connect(supabase).await?;
            info!(table = %binding.table, "connected to Supabase");
            Ok(Arc::new(store))
        }
        #[cfg(not(feature = "supabase-store"))]
        StoreKind::Supabase => Err(crate::dao::storage::StorageError::Unsupported("supabase")),
    }
}
