use std::sync::Arc;

use futures::future::BoxFuture;
use reqwest::{Client, Method, RequestBuilder, StatusCode};
use tracing::debug;

use crate::dao::{
    models::{PlayerRow, RowPatch},
    row_store::{RowChanges, RowStore},
    storage::StorageResult,
};

use super::{
    config::SupabaseConfig,
    error::{SupabaseError, SupabaseResult},
    realtime,
};

/// Row store backed by the hosted PostgREST and realtime endpoints.
#[derive(Clone)]
pub struct SupabaseRowStore {
    client: Client,
    rest_url: Arc<str>,
    api_key: Arc<str>,
    schema: Arc<str>,
    config: Arc<SupabaseConfig>,
}

impl SupabaseRowStore {
    /// Build the HTTP client and verify the project answers.
    pub async fn connect(config: SupabaseConfig) -> SupabaseResult<Self> {
        let client = Client::builder()
            .build()
            .map_err(|source| SupabaseError::ClientBuilder { source })?;

        let store = Self {
            client,
            rest_url: Arc::from(config.rest_url()),
            api_key: Arc::from(config.api_key.as_str()),
            schema: Arc::from(config.schema.as_str()),
            config: Arc::new(config),
        };

        store.ping().await?;
        Ok(store)
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let url = format!("{}/{}", self.rest_url, path);
        let profile_header = if method == Method::GET {
            "Accept-Profile"
        } else {
            "Content-Profile"
        };
        self.client
            .request(method, url)
            .header("apikey", self.api_key.as_ref())
            .bearer_auth(self.api_key.as_ref())
            .header(profile_header, self.schema.as_ref())
    }

    async fn ping(&self) -> SupabaseResult<()> {
        let response = self
            .request(Method::GET, "")
            .send()
            .await
            .map_err(|source| SupabaseError::RequestSend {
                path: "/".into(),
                source,
            })?;
        ensure_success("/", response).await.map(|_| ())
    }

    async fn select_rows(&self, table: &str, ids: &[i64]) -> SupabaseResult<Vec<PlayerRow>> {
        let path = format!("{table}?select=*&id=in.({})", id_list(ids));
        let response = self
            .request(Method::GET, &path)
            .send()
            .await
            .map_err(|source| SupabaseError::RequestSend {
                path: path.clone(),
                source,
            })?;

        ensure_success(&path, response)
            .await?
            .json::<Vec<PlayerRow>>()
            .await
            .map_err(|source| SupabaseError::DecodeResponse { path, source })
    }

    async fn patch_rows(&self, table: &str, ids: &[i64], patch: &RowPatch) -> SupabaseResult<()> {
        let path = format!("{table}?id=in.({})", id_list(ids));
        let response = self
            .request(Method::PATCH, &path)
            .header("Prefer", "return=minimal")
            .json(patch)
            .send()
            .await
            .map_err(|source| SupabaseError::RequestSend {
                path: path.clone(),
                source,
            })?;

        ensure_success(&path, response).await.map(|_| ())
    }
}

fn id_list(ids: &[i64]) -> String {
    ids.iter()
        .map(i64::to_string)
        .collect::<Vec<_>>()
        .join(",")
}

async fn ensure_success(
    path: &str,
    response: reqwest::Response,
) -> SupabaseResult<reqwest::Response> {
    let status = response.status();
    if status.is_success() || status == StatusCode::NOT_MODIFIED {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(SupabaseError::RequestStatus {
        path: path.to_string(),
        status,
        body,
    })
}

impl RowStore for SupabaseRowStore {
    fn fetch_rows(
        &self,
        table: &str,
        ids: &[i64],
    ) -> BoxFuture<'static, StorageResult<Vec<PlayerRow>>> {
        let store = self.clone();
        let table = table.to_string();
        let ids = ids.to_vec();
        Box::pin(async move { Ok(store.select_rows(&table, &ids).await?) })
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
            if patch.is_empty() || ids.is_empty() {
                debug!(%table, "skipping empty row update");
                return Ok(());
            }
            Ok(store.patch_rows(&table, &ids, &patch).await?)
        })
    }

    fn subscribe(&self, table: &str, id: i64) -> BoxFuture<'static, StorageResult<RowChanges>> {
        let config = self.config.clone();
        let table = table.to_string();
        Box::pin(async move { Ok(realtime::subscribe_row(&config, &table, id).await?) })
    }

    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { Ok(store.ping().await?) })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formats_postgrest_id_filter() {
        assert_eq!(id_list(&[1, 2]), "1,2");
        assert_eq!(id_list(&[]), "");
    }
}
