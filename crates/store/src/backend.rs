use async_trait::async_trait;
use std::sync::Arc;
use vecgate_common::{
    CollectionInfo, CollectionOptions, CollectionSchema, SearchConfig, SearchHit, ServerStatus,
    StoreResult,
};

/// One live connection to a vector-database server.
#[async_trait]
pub trait VectorBackend: Send + Sync {
    /// `host:port` this handle talks to.
    fn endpoint(&self) -> &str;

    async fn has_collection(&self, name: &str) -> StoreResult<bool>;

    async fn create_collection(
        &self,
        name: &str,
        schema: &CollectionSchema,
        options: &CollectionOptions,
    ) -> StoreResult<()>;

    async fn drop_collection(&self, name: &str) -> StoreResult<()>;

    async fn list_collections(&self) -> StoreResult<Vec<String>>;

    async fn server_status(&self) -> StoreResult<ServerStatus>;

    async fn describe_collection(&self, name: &str) -> StoreResult<CollectionInfo>;

    /// Inserts `ids[i] -> vectors[i]` into `vector_field` as one batch and
    /// returns the primary keys the server accepted.
    async fn insert(
        &self,
        collection: &str,
        vector_field: &str,
        ids: &[i64],
        vectors: &[Vec<f32>],
    ) -> StoreResult<Vec<i64>>;

    /// One hit list per query vector, each nearest first and at most
    /// `limit` long.
    async fn search(
        &self,
        collection: &str,
        vectors: &[Vec<f32>],
        params: &SearchConfig,
        limit: usize,
    ) -> StoreResult<Vec<Vec<SearchHit>>>;

    async fn close(&self) -> StoreResult<()> {
        Ok(())
    }
}

/// Opens backends for a host/port pair. One attempt, no retry.
#[async_trait]
pub trait Connector: Send + Sync {
    async fn connect(&self, host: &str, port: &str) -> StoreResult<Arc<dyn VectorBackend>>;
}

pub(crate) fn parse_port(port: &str) -> StoreResult<u16> {
    port.trim()
        .parse::<u16>()
        .ok()
        .filter(|p| *p != 0)
        .ok_or_else(|| vecgate_common::StoreError::InvalidRequest(format!("invalid port '{}'", port)))
}
