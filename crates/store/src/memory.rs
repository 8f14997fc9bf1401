//! A vector-database server living inside the process.
//!
//! Searches are exact (every stored vector is scored), so `nprobe` has no
//! effect here. Useful for tests and for running without a real server.

use crate::backend::{parse_port, Connector, VectorBackend};
use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::debug;
use vecgate_common::{
    sort_hits, CollectionInfo, CollectionOptions, CollectionSchema, MetricType, SearchConfig,
    SearchHit, ServerStatus, StoreError, StoreResult,
};

struct StoredCollection {
    schema: CollectionSchema,
    options: CollectionOptions,
    // primary key -> (vector field -> vector)
    records: BTreeMap<i64, HashMap<String, Vec<f32>>>,
}

impl StoredCollection {
    fn vector_dim(&self, field: &str) -> StoreResult<usize> {
        self.schema
            .field(field)
            .and_then(|f| f.dim())
            .ok_or_else(|| {
                StoreError::InvalidRequest(format!("'{}' is not a vector field of this collection", field))
            })
    }
}

pub struct InMemoryServer {
    endpoints: Vec<(String, String)>,
    version: String,
    available: AtomicBool,
    collections: RwLock<BTreeMap<String, StoredCollection>>,
}

impl InMemoryServer {
    /// A server reachable at `localhost:19530`.
    pub fn new() -> Self {
        Self {
            endpoints: vec![("localhost".to_string(), "19530".to_string())],
            version: env!("CARGO_PKG_VERSION").to_string(),
            available: AtomicBool::new(true),
            collections: RwLock::new(BTreeMap::new()),
        }
    }

    pub fn with_endpoint(mut self, host: impl Into<String>, port: impl Into<String>) -> Self {
        self.endpoints.push((host.into(), port.into()));
        self
    }

    /// Simulates an outage: every request fails with a transport error
    /// until availability is restored.
    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    pub fn accepts(&self, host: &str, port: &str) -> bool {
        self.endpoints.iter().any(|(h, p)| h == host && p == port)
    }

    /// Options the collection was created with.
    pub async fn collection_options(&self, name: &str) -> Option<CollectionOptions> {
        self.collections.read().await.get(name).map(|c| c.options.clone())
    }

    fn check_available(&self) -> StoreResult<()> {
        if self.available.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(StoreError::Transport("server unavailable".to_string()))
        }
    }
}

impl Default for InMemoryServer {
    fn default() -> Self {
        Self::new()
    }
}

pub struct InMemoryConnector {
    server: Arc<InMemoryServer>,
}

impl InMemoryConnector {
    pub fn new(server: Arc<InMemoryServer>) -> Self {
        Self { server }
    }
}

#[async_trait]
impl Connector for InMemoryConnector {
    async fn connect(&self, host: &str, port: &str) -> StoreResult<Arc<dyn VectorBackend>> {
        parse_port(port)?;
        let endpoint = format!("{}:{}", host, port);

        if !self.server.accepts(host, port) || !self.server.available.load(Ordering::SeqCst) {
            return Err(StoreError::Unreachable {
                endpoint,
                reason: "connection refused".to_string(),
            });
        }

        Ok(Arc::new(InMemoryBackend {
            server: self.server.clone(),
            endpoint,
        }))
    }
}

pub struct InMemoryBackend {
    server: Arc<InMemoryServer>,
    endpoint: String,
}

#[async_trait]
impl VectorBackend for InMemoryBackend {
    fn endpoint(&self) -> &str {
        &self.endpoint
    }

    async fn has_collection(&self, name: &str) -> StoreResult<bool> {
        self.server.check_available()?;
        Ok(self.server.collections.read().await.contains_key(name))
    }

    async fn create_collection(
        &self,
        name: &str,
        schema: &CollectionSchema,
        options: &CollectionOptions,
    ) -> StoreResult<()> {
        self.server.check_available()?;
        schema.validate()?;
        MetricType::from_options(options)?;

        let mut collections = self.server.collections.write().await;
        if collections.contains_key(name) {
            return Err(StoreError::AlreadyExists(name.to_string()));
        }

        collections.insert(
            name.to_string(),
            StoredCollection {
                schema: schema.clone(),
                options: options.clone(),
                records: BTreeMap::new(),
            },
        );
        Ok(())
    }

    async fn drop_collection(&self, name: &str) -> StoreResult<()> {
        self.server.check_available()?;
        self.server
            .collections
            .write()
            .await
            .remove(name)
            .map(|_| ())
            .ok_or_else(|| StoreError::CollectionNotFound(name.to_string()))
    }

    async fn list_collections(&self) -> StoreResult<Vec<String>> {
        self.server.check_available()?;
        Ok(self.server.collections.read().await.keys().cloned().collect())
    }

    async fn server_status(&self) -> StoreResult<ServerStatus> {
        self.server.check_available()?;
        Ok(ServerStatus {
            healthy: true,
            version: Some(self.server.version.clone()),
            checked_at: chrono::Utc::now(),
        })
    }

    async fn describe_collection(&self, name: &str) -> StoreResult<CollectionInfo> {
        self.server.check_available()?;
        let collections = self.server.collections.read().await;
        let collection = collections
            .get(name)
            .ok_or_else(|| StoreError::CollectionNotFound(name.to_string()))?;

        Ok(CollectionInfo {
            name: name.to_string(),
            num_entities: collection.records.len() as u64,
            vector_fields: collection
                .schema
                .vector_fields()
                .map(|f| f.name.clone())
                .collect(),
        })
    }

    async fn insert(
        &self,
        collection: &str,
        vector_field: &str,
        ids: &[i64],
        vectors: &[Vec<f32>],
    ) -> StoreResult<Vec<i64>> {
        self.server.check_available()?;

        if ids.len() != vectors.len() {
            return Err(StoreError::InvalidRequest(format!(
                "{} ids for {} vectors",
                ids.len(),
                vectors.len()
            )));
        }

        let mut collections = self.server.collections.write().await;
        let stored = collections
            .get_mut(collection)
            .ok_or_else(|| StoreError::CollectionNotFound(collection.to_string()))?;

        let dim = stored.vector_dim(vector_field)?;
        if let Some(bad) = vectors.iter().find(|v| v.len() != dim) {
            return Err(StoreError::InvalidRequest(format!(
                "vector dimension {} does not match field '{}' dimension {}",
                bad.len(),
                vector_field,
                dim
            )));
        }

        // Same primary key overwrites, as an upsert would.
        for (id, vector) in ids.iter().zip(vectors) {
            stored
                .records
                .entry(*id)
                .or_default()
                .insert(vector_field.to_string(), vector.clone());
        }

        debug!("Stored {} vectors in '{}'", ids.len(), collection);
        Ok(ids.to_vec())
    }

    async fn search(
        &self,
        collection: &str,
        vectors: &[Vec<f32>],
        params: &SearchConfig,
        limit: usize,
    ) -> StoreResult<Vec<Vec<SearchHit>>> {
        self.server.check_available()?;

        if limit == 0 {
            return Err(StoreError::InvalidRequest("limit must be at least 1".to_string()));
        }

        let collections = self.server.collections.read().await;
        let stored = collections
            .get(collection)
            .ok_or_else(|| StoreError::CollectionNotFound(collection.to_string()))?;
        let dim = stored.vector_dim(&params.anns_field)?;
        MetricType::from_options(&stored.options)?.ensure_searchable_with(params.metric_type)?;

        let mut results = Vec::with_capacity(vectors.len());
        for query in vectors {
            if query.len() != dim {
                return Err(StoreError::InvalidRequest(format!(
                    "query dimension {} does not match field '{}' dimension {}",
                    query.len(),
                    params.anns_field,
                    dim
                )));
            }

            let mut hits: Vec<SearchHit> = stored
                .records
                .iter()
                .filter_map(|(id, fields)| {
                    fields
                        .get(&params.anns_field)
                        .map(|v| SearchHit::new(*id, params.metric_type.distance(query, v)))
                })
                .collect();
            sort_hits(&mut hits);
            hits.truncate(limit);
            results.push(hits);
        }

        Ok(results)
    }
}
