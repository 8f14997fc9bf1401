use crate::backend::{parse_port, Connector, VectorBackend};
use async_trait::async_trait;
use qdrant_client::qdrant::{
    point_id::PointIdOptions, vectors_config::Config as VectorsConfigKind,
    CollectionInfo as QdrantCollectionInfo, CreateCollectionBuilder, Distance, PointStruct,
    ScoredPoint, SearchParamsBuilder, SearchPointsBuilder, UpsertPointsBuilder,
    VectorParamsBuilder, VectorParamsMap, VectorsConfig,
};
use qdrant_client::{Payload, Qdrant, QdrantError};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};
use vecgate_common::{
    sort_hits, CollectionInfo, CollectionOptions, CollectionSchema, MetricType, SearchConfig,
    SearchHit, ServerStatus, StoreError, StoreResult, METRIC_OPTION,
};

const SHARD_OPTIONS: [&str; 2] = ["shards_num", "shard_number"];
const REPLICATION_OPTION: &str = "replication_factor";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct QdrantConfig {
    /// Per-request timeout. `None` leaves the client default in place.
    pub timeout_seconds: Option<u64>,
    pub api_key: Option<String>,
}

impl QdrantConfig {
    pub fn with_timeout(mut self, seconds: u64) -> Self {
        self.timeout_seconds = Some(seconds);
        self
    }

    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }
}

/// Connects to Qdrant's gRPC endpoint (usually port 6334).
pub struct QdrantConnector {
    config: QdrantConfig,
}

impl QdrantConnector {
    pub fn new(config: QdrantConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl Connector for QdrantConnector {
    async fn connect(&self, host: &str, port: &str) -> StoreResult<Arc<dyn VectorBackend>> {
        let port = parse_port(port)?;
        let endpoint = format!("{}:{}", host, port);
        let url = format!("http://{}", endpoint);

        let mut builder = Qdrant::from_url(&url);
        if let Some(seconds) = self.config.timeout_seconds {
            builder = builder.timeout(Duration::from_secs(seconds));
        }
        if let Some(key) = &self.config.api_key {
            builder = builder.api_key(key.clone());
        }

        let client = builder.build().map_err(|e| StoreError::Unreachable {
            endpoint: endpoint.clone(),
            reason: e.to_string(),
        })?;

        // The client connects lazily; one health check makes connect fail fast.
        let reply = client.health_check().await.map_err(|e| StoreError::Unreachable {
            endpoint: endpoint.clone(),
            reason: e.to_string(),
        })?;
        debug!("Qdrant {} answered at {}", reply.version, endpoint);

        Ok(Arc::new(QdrantBackend { client, endpoint }))
    }
}

pub struct QdrantBackend {
    client: Qdrant,
    endpoint: String,
}

fn transport(e: QdrantError) -> StoreError {
    StoreError::Transport(e.to_string())
}

fn distance_for(metric: MetricType) -> Distance {
    match metric {
        MetricType::L2 => Distance::Euclid,
        MetricType::InnerProduct => Distance::Dot,
        MetricType::Cosine => Distance::Cosine,
    }
}

fn option_u32(options: &CollectionOptions, key: &str) -> StoreResult<Option<u32>> {
    match options.get(key) {
        None => Ok(None),
        Some(value) => value
            .as_u64()
            .and_then(|v| u32::try_from(v).ok())
            .map(Some)
            .ok_or_else(|| {
                StoreError::InvalidRequest(format!("option '{}' must be a non-negative integer", key))
            }),
    }
}

fn to_point_id(id: i64) -> StoreResult<u64> {
    u64::try_from(id)
        .map_err(|_| StoreError::InvalidRequest(format!("primary key {} is negative", id)))
}

fn to_hit(point: ScoredPoint, metric: MetricType) -> StoreResult<SearchHit> {
    let id = match point.id.and_then(|p| p.point_id_options) {
        Some(PointIdOptions::Num(n)) => i64::try_from(n)
            .map_err(|_| StoreError::InvalidRequest(format!("point id {} exceeds i64", n)))?,
        Some(PointIdOptions::Uuid(uuid)) => {
            return Err(StoreError::InvalidRequest(format!(
                "point id '{}' is not an integer primary key",
                uuid
            )))
        }
        None => return Err(StoreError::InvalidRequest("point without id".to_string())),
    };
    Ok(SearchHit::new(id, metric.score_to_distance(point.score)))
}

/// The metric a collection's vector field was created with.
fn collection_metric(info: &QdrantCollectionInfo, field: &str) -> StoreResult<MetricType> {
    let config = info
        .config
        .as_ref()
        .and_then(|c| c.params.as_ref())
        .and_then(|p| p.vectors_config.as_ref())
        .and_then(|v| v.config.as_ref());

    let params = match config {
        Some(VectorsConfigKind::ParamsMap(map)) => map.map.get(field),
        Some(VectorsConfigKind::Params(params)) if field.is_empty() => Some(params),
        _ => None,
    }
    .ok_or_else(|| {
        StoreError::InvalidRequest(format!("'{}' is not a vector field of this collection", field))
    })?;

    match params.distance() {
        Distance::Euclid => Ok(MetricType::L2),
        Distance::Dot => Ok(MetricType::InnerProduct),
        Distance::Cosine => Ok(MetricType::Cosine),
        other => Err(StoreError::InvalidRequest(format!(
            "unsupported Qdrant distance {:?} on '{}'",
            other, field
        ))),
    }
}

fn vector_names(info: &QdrantCollectionInfo) -> Vec<String> {
    let config = info
        .config
        .as_ref()
        .and_then(|c| c.params.as_ref())
        .and_then(|p| p.vectors_config.as_ref())
        .and_then(|v| v.config.as_ref());

    let mut names = match config {
        Some(VectorsConfigKind::ParamsMap(map)) => map.map.keys().cloned().collect(),
        Some(VectorsConfigKind::Params(_)) => vec![String::new()],
        None => Vec::new(),
    };
    names.sort();
    names
}

#[async_trait]
impl VectorBackend for QdrantBackend {
    fn endpoint(&self) -> &str {
        &self.endpoint
    }

    async fn has_collection(&self, name: &str) -> StoreResult<bool> {
        self.client.collection_exists(name).await.map_err(transport)
    }

    async fn create_collection(
        &self,
        name: &str,
        schema: &CollectionSchema,
        options: &CollectionOptions,
    ) -> StoreResult<()> {
        schema.validate()?;
        if self.has_collection(name).await? {
            return Err(StoreError::AlreadyExists(name.to_string()));
        }

        let distance = distance_for(MetricType::from_options(options)?);
        let map = schema
            .vector_fields()
            .filter_map(|field| {
                field.dim().map(|dim| {
                    (
                        field.name.clone(),
                        VectorParamsBuilder::new(dim as u64, distance).build(),
                    )
                })
            })
            .collect();
        let vectors_config = VectorsConfig {
            config: Some(VectorsConfigKind::ParamsMap(VectorParamsMap { map })),
        };

        let mut request = CreateCollectionBuilder::new(name).vectors_config(vectors_config);
        for key in SHARD_OPTIONS {
            if let Some(shards) = option_u32(options, key)? {
                request = request.shard_number(shards);
            }
        }
        if let Some(replication) = option_u32(options, REPLICATION_OPTION)? {
            request = request.replication_factor(replication);
        }

        for key in options.keys() {
            let known = key == METRIC_OPTION
                || key == REPLICATION_OPTION
                || SHARD_OPTIONS.contains(&key.as_str());
            if !known {
                debug!("Qdrant ignores collection option '{}'", key);
            }
        }

        self.client.create_collection(request).await.map_err(transport)?;
        info!("Qdrant collection '{}' created with {:?} distance", name, distance);
        Ok(())
    }

    async fn drop_collection(&self, name: &str) -> StoreResult<()> {
        self.client.delete_collection(name).await.map_err(transport)?;
        Ok(())
    }

    async fn list_collections(&self) -> StoreResult<Vec<String>> {
        let response = self.client.list_collections().await.map_err(transport)?;
        let mut names: Vec<String> = response.collections.into_iter().map(|c| c.name).collect();
        names.sort();
        Ok(names)
    }

    async fn server_status(&self) -> StoreResult<ServerStatus> {
        let reply = self.client.health_check().await.map_err(transport)?;
        Ok(ServerStatus {
            healthy: true,
            version: Some(reply.version),
            checked_at: chrono::Utc::now(),
        })
    }

    async fn describe_collection(&self, name: &str) -> StoreResult<CollectionInfo> {
        if !self.has_collection(name).await? {
            return Err(StoreError::CollectionNotFound(name.to_string()));
        }

        let response = self.client.collection_info(name).await.map_err(transport)?;
        let info = response
            .result
            .ok_or_else(|| StoreError::Transport("empty collection info".to_string()))?;

        Ok(CollectionInfo {
            name: name.to_string(),
            num_entities: info.points_count.unwrap_or(0),
            vector_fields: vector_names(&info),
        })
    }

    async fn insert(
        &self,
        collection: &str,
        vector_field: &str,
        ids: &[i64],
        vectors: &[Vec<f32>],
    ) -> StoreResult<Vec<i64>> {
        if ids.len() != vectors.len() {
            return Err(StoreError::InvalidRequest(format!(
                "{} ids for {} vectors",
                ids.len(),
                vectors.len()
            )));
        }

        let mut points = Vec::with_capacity(ids.len());
        for (id, vector) in ids.iter().zip(vectors) {
            let named = HashMap::from([(vector_field.to_string(), vector.clone())]);
            points.push(PointStruct::new(to_point_id(*id)?, named, Payload::new()));
        }

        self.client
            .upsert_points(UpsertPointsBuilder::new(collection, points).wait(true))
            .await
            .map_err(transport)?;

        Ok(ids.to_vec())
    }

    async fn search(
        &self,
        collection: &str,
        vectors: &[Vec<f32>],
        params: &SearchConfig,
        limit: usize,
    ) -> StoreResult<Vec<Vec<SearchHit>>> {
        // Scores only convert to distances under the collection's own metric.
        let info = self
            .client
            .collection_info(collection)
            .await
            .map_err(transport)?
            .result
            .ok_or_else(|| StoreError::Transport("empty collection info".to_string()))?;
        let metric = collection_metric(&info, &params.anns_field)?;
        metric.ensure_searchable_with(params.metric_type)?;

        let mut results = Vec::with_capacity(vectors.len());

        for vector in vectors {
            // Qdrant indexes with HNSW; nprobe drives the search-time ef.
            let request = SearchPointsBuilder::new(collection, vector.clone(), limit as u64)
                .vector_name(params.anns_field.clone())
                .params(SearchParamsBuilder::default().hnsw_ef(params.nprobe as u64).build());

            let response = self.client.search_points(request).await.map_err(transport)?;
            let mut hits = response
                .result
                .into_iter()
                .map(|point| to_hit(point, metric))
                .collect::<StoreResult<Vec<_>>>()?;
            sort_hits(&mut hits);
            hits.truncate(limit);
            results.push(hits);
        }

        Ok(results)
    }
}
