use crate::backend::VectorBackend;
use crate::registry::ConnectionRegistry;
use std::sync::Arc;
use tracing::{error, info};
use vecgate_common::{
    CollectionInfo, CollectionOptions, CollectionSchema, GatewayError, Result, SearchConfig,
    SearchHit, ServerStatus, StoreError, StoreResult,
};

/// Collection lifecycle operations over one connection alias.
#[derive(Clone)]
pub struct CollectionAdmin {
    registry: Arc<ConnectionRegistry>,
    alias: String,
}

impl CollectionAdmin {
    pub fn new(registry: Arc<ConnectionRegistry>, alias: impl Into<String>) -> Self {
        Self {
            registry,
            alias: alias.into(),
        }
    }

    pub fn alias(&self) -> &str {
        &self.alias
    }

    async fn backend(&self) -> Result<Arc<dyn VectorBackend>> {
        self.registry.backend(&self.alias).await
    }

    pub async fn create_collection(
        &self,
        name: &str,
        schema: &CollectionSchema,
        options: &CollectionOptions,
    ) -> Result<()> {
        let backend = self.backend().await?;

        let created = match schema.validate() {
            Ok(()) => backend.create_collection(name, schema, options).await,
            Err(e) => Err(e),
        };

        match created {
            Ok(()) => {
                info!("Collection '{}' created successfully", name);
                Ok(())
            }
            Err(e) => {
                error!(collection = %name, error = %e, "Failed to create collection");
                Err(GatewayError::creation(name, e))
            }
        }
    }

    /// Drops `name` if it exists. Returns whether anything was dropped; a
    /// missing collection is not an error.
    pub async fn delete_collection(&self, name: &str) -> Result<bool> {
        let backend = self.backend().await?;

        let result = async {
            if !backend.has_collection(name).await? {
                return Ok(false);
            }
            backend.drop_collection(name).await?;
            Ok::<bool, StoreError>(true)
        }
        .await;

        match result {
            Ok(true) => {
                info!("Collection '{}' deleted successfully", name);
                Ok(true)
            }
            Ok(false) => {
                info!("Collection '{}' does not exist", name);
                Ok(false)
            }
            Err(e) => {
                error!(collection = %name, error = %e, "Failed to delete collection");
                Err(GatewayError::deletion(name, e))
            }
        }
    }

    pub async fn list_collections(&self) -> Result<Vec<String>> {
        let backend = self.backend().await?;
        match backend.list_collections().await {
            Ok(collections) => {
                info!("Available collections: {:?}", collections);
                Ok(collections)
            }
            Err(e) => {
                error!(error = %e, "Failed to list collections");
                Err(GatewayError::query("list_collections", e))
            }
        }
    }

    pub async fn has_collection(&self, name: &str) -> Result<bool> {
        let backend = self.backend().await?;
        backend.has_collection(name).await.map_err(|e| {
            error!(collection = %name, error = %e, "Failed to check collection");
            GatewayError::query("has_collection", e)
        })
    }

    /// Server-wide liveness. Despite sitting next to the collection calls
    /// this inspects no particular collection; see [`Self::describe_collection`].
    pub async fn get_server_status(&self) -> Result<ServerStatus> {
        let backend = self.backend().await?;
        match backend.server_status().await {
            Ok(status) => {
                info!("Vector database status: healthy={} version={:?}", status.healthy, status.version);
                Ok(status)
            }
            Err(e) => {
                error!(error = %e, "Failed to check server status");
                Err(GatewayError::query("get_server_status", e))
            }
        }
    }

    pub async fn describe_collection(&self, name: &str) -> Result<CollectionInfo> {
        let backend = self.backend().await?;
        match backend.describe_collection(name).await {
            Ok(info) => Ok(info),
            Err(StoreError::CollectionNotFound(_)) => {
                error!(collection = %name, "Collection not found");
                Err(GatewayError::NotFound(name.to_string()))
            }
            Err(e) => {
                error!(collection = %name, error = %e, "Failed to describe collection");
                Err(GatewayError::query("describe_collection", e))
            }
        }
    }

    /// Raw-vector search: one ordered hit list per query vector.
    pub async fn search_vectors(
        &self,
        name: &str,
        vectors: &[Vec<f32>],
        params: &SearchConfig,
        limit: usize,
    ) -> Result<Vec<Vec<SearchHit>>> {
        let handle = self.collection(name).await?;
        match handle.search(vectors, params, limit).await {
            Ok(results) => {
                info!("Search completed. Found {} result lists", results.len());
                Ok(results)
            }
            Err(e) => {
                error!(collection = %name, error = %e, "Search failed");
                Err(GatewayError::search(format!("{} vector(s) in '{}'", vectors.len(), name), e))
            }
        }
    }

    /// Handle on an existing collection. Fails with `NotFound` otherwise.
    pub async fn collection(&self, name: &str) -> Result<CollectionHandle> {
        if !self.has_collection(name).await? {
            error!(collection = %name, "Collection does not exist");
            return Err(GatewayError::NotFound(name.to_string()));
        }

        Ok(CollectionHandle {
            name: name.to_string(),
            backend: self.backend().await?,
        })
    }
}

/// Ephemeral reference to one server-side collection.
#[derive(Clone)]
pub struct CollectionHandle {
    name: String,
    backend: Arc<dyn VectorBackend>,
}

impl CollectionHandle {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub async fn insert(
        &self,
        vector_field: &str,
        ids: &[i64],
        vectors: &[Vec<f32>],
    ) -> StoreResult<Vec<i64>> {
        self.backend.insert(&self.name, vector_field, ids, vectors).await
    }

    pub async fn search(
        &self,
        vectors: &[Vec<f32>],
        params: &SearchConfig,
        limit: usize,
    ) -> StoreResult<Vec<Vec<SearchHit>>> {
        if limit == 0 {
            return Err(StoreError::InvalidRequest("limit must be at least 1".to_string()));
        }
        self.backend.search(&self.name, vectors, params, limit).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::{InMemoryConnector, InMemoryServer};

    async fn connected_admin() -> (CollectionAdmin, Arc<InMemoryServer>) {
        let server = Arc::new(InMemoryServer::new());
        let registry = Arc::new(ConnectionRegistry::new(Arc::new(InMemoryConnector::new(
            server.clone(),
        ))));
        registry.connect("localhost", "19530", "default").await.unwrap();
        (CollectionAdmin::new(registry, "default"), server)
    }

    #[tokio::test]
    async fn test_requires_connection() {
        let server = Arc::new(InMemoryServer::new());
        let registry = Arc::new(ConnectionRegistry::new(Arc::new(InMemoryConnector::new(server))));
        let admin = CollectionAdmin::new(registry, "default");

        let err = admin.list_collections().await.unwrap_err();
        assert!(matches!(err, GatewayError::Connection { .. }));
    }

    #[tokio::test]
    async fn test_create_and_delete() {
        let (admin, _server) = connected_admin().await;
        let schema = CollectionSchema::for_embeddings(4);

        admin.create_collection("docs", &schema, &CollectionOptions::new()).await.unwrap();
        assert!(admin.has_collection("docs").await.unwrap());

        assert!(admin.delete_collection("docs").await.unwrap());
        assert!(!admin.has_collection("docs").await.unwrap());

        // second delete is a no-op
        assert!(!admin.delete_collection("docs").await.unwrap());
    }

    #[tokio::test]
    async fn test_create_existing_fails() {
        let (admin, _server) = connected_admin().await;
        let schema = CollectionSchema::for_embeddings(4);
        admin.create_collection("docs", &schema, &CollectionOptions::new()).await.unwrap();

        let err = admin
            .create_collection("docs", &schema, &CollectionOptions::new())
            .await
            .unwrap_err();
        assert!(matches!(err, GatewayError::Creation { .. }));
        assert!(matches!(err.store_error(), Some(StoreError::AlreadyExists(_))));
    }

    #[tokio::test]
    async fn test_create_invalid_schema_fails() {
        let (admin, _server) = connected_admin().await;
        let err = admin
            .create_collection("docs", &CollectionSchema::new(vec![]), &CollectionOptions::new())
            .await
            .unwrap_err();
        assert!(matches!(err.store_error(), Some(StoreError::InvalidSchema(_))));
        assert!(!admin.has_collection("docs").await.unwrap());
    }

    #[tokio::test]
    async fn test_delete_server_failure() {
        let (admin, server) = connected_admin().await;
        server.set_available(false);

        let err = admin.delete_collection("docs").await.unwrap_err();
        assert!(matches!(err, GatewayError::Deletion { .. }));
    }

    #[tokio::test]
    async fn test_server_status_and_describe() {
        let (admin, server) = connected_admin().await;
        assert!(admin.get_server_status().await.unwrap().healthy);

        admin
            .create_collection("docs", &CollectionSchema::for_embeddings(2), &CollectionOptions::new())
            .await
            .unwrap();
        let info = admin.describe_collection("docs").await.unwrap();
        assert_eq!(info.num_entities, 0);
        assert_eq!(info.vector_fields, vec!["vector".to_string()]);

        assert!(matches!(
            admin.describe_collection("missing").await.unwrap_err(),
            GatewayError::NotFound(_)
        ));

        server.set_available(false);
        assert!(matches!(
            admin.get_server_status().await.unwrap_err(),
            GatewayError::Query { .. }
        ));
    }

    #[tokio::test]
    async fn test_collection_handle_requires_existence() {
        let (admin, _server) = connected_admin().await;
        let err = admin.collection("missing").await.err().unwrap();
        assert!(matches!(err, GatewayError::NotFound(ref name) if name == "missing"));
    }

    #[tokio::test]
    async fn test_search_vectors() {
        let (admin, _server) = connected_admin().await;
        admin
            .create_collection("docs", &CollectionSchema::for_embeddings(2), &CollectionOptions::new())
            .await
            .unwrap();
        let handle = admin.collection("docs").await.unwrap();
        handle
            .insert("vector", &[10, 11], &[vec![0.0, 0.0], vec![3.0, 4.0]])
            .await
            .unwrap();

        let results = admin
            .search_vectors("docs", &[vec![3.0, 4.0]], &SearchConfig::default(), 10)
            .await
            .unwrap();
        assert_eq!(results[0].len(), 2);
        assert_eq!(results[0][0].id, 11);
        assert!((results[0][1].distance - 5.0).abs() < 1e-5);

        let err = admin
            .search_vectors("docs", &[vec![3.0, 4.0]], &SearchConfig::default(), 0)
            .await
            .unwrap_err();
        assert!(matches!(err, GatewayError::Search { .. }));
    }
}
