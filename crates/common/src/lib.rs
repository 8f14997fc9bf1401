pub mod config;
pub mod error;
pub mod schema;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

pub use config::{ConnectionConfig, GatewayConfig, SearchConfig};
pub use error::{BoxError, GatewayError, ModelError, ModelResult, Result, StoreError, StoreResult};
pub use schema::{CollectionSchema, DataType, FieldSchema};

/// Server-specific tuning parameters handed to the backend untouched
/// (e.g. `shards_num`, `metric_type`).
pub type CollectionOptions = BTreeMap<String, serde_json::Value>;

/// Collection option naming the metric a collection is indexed with.
pub const METRIC_OPTION: &str = "metric_type";

// Distance metrics understood by the search path
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MetricType {
    #[serde(rename = "L2")]
    L2,
    #[serde(rename = "IP")]
    InnerProduct,
    #[serde(rename = "COSINE")]
    Cosine,
}

impl MetricType {
    pub fn as_str(&self) -> &'static str {
        match self {
            MetricType::L2 => "L2",
            MetricType::InnerProduct => "IP",
            MetricType::Cosine => "COSINE",
        }
    }

    /// Distance between two vectors where smaller always means closer.
    ///
    /// L2 is the Euclidean distance, IP the negated inner product and
    /// COSINE `1 - cosine_similarity`. Vectors of different length are
    /// compared over their common prefix; callers validate dimensions.
    pub fn distance(&self, a: &[f32], b: &[f32]) -> f32 {
        match self {
            MetricType::L2 => a
                .iter()
                .zip(b)
                .map(|(x, y)| (x - y) * (x - y))
                .sum::<f32>()
                .sqrt(),
            MetricType::InnerProduct => -a.iter().zip(b).map(|(x, y)| x * y).sum::<f32>(),
            MetricType::Cosine => {
                let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
                let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
                let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
                if norm_a == 0.0 || norm_b == 0.0 {
                    1.0
                } else {
                    1.0 - dot / (norm_a * norm_b)
                }
            }
        }
    }

    /// Converts a raw server score into the "smaller is closer" distance
    /// used by [`SearchHit`]. Euclidean servers already report a distance.
    pub fn score_to_distance(&self, score: f32) -> f32 {
        match self {
            MetricType::L2 => score,
            MetricType::InnerProduct => -score,
            MetricType::Cosine => 1.0 - score,
        }
    }

    /// The metric a collection was created with: its `metric_type` option,
    /// or L2 when the option is absent.
    pub fn from_options(options: &CollectionOptions) -> StoreResult<Self> {
        match options.get(METRIC_OPTION) {
            None => Ok(MetricType::default()),
            Some(value) => value
                .as_str()
                .ok_or_else(|| {
                    StoreError::InvalidRequest(format!("option '{}' must be a string", METRIC_OPTION))
                })
                .and_then(|s| MetricType::from_str(s).map_err(StoreError::InvalidRequest)),
        }
    }

    /// Fails unless a search asking for `requested` can run against a
    /// collection indexed with `self`.
    pub fn ensure_searchable_with(&self, requested: MetricType) -> StoreResult<()> {
        if *self == requested {
            Ok(())
        } else {
            Err(StoreError::InvalidRequest(format!(
                "collection is indexed with {} but the search asked for {}",
                self, requested
            )))
        }
    }
}

impl Default for MetricType {
    fn default() -> Self {
        MetricType::L2
    }
}

impl fmt::Display for MetricType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MetricType {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "L2" => Ok(MetricType::L2),
            "IP" => Ok(MetricType::InnerProduct),
            "COSINE" => Ok(MetricType::Cosine),
            other => Err(format!("unknown metric type '{}'", other)),
        }
    }
}

// One nearest-neighbour match, ordered nearest first in result lists
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SearchHit {
    pub id: i64,
    pub distance: f32,
}

impl SearchHit {
    pub fn new(id: i64, distance: f32) -> Self {
        Self { id, distance }
    }
}

/// Sorts hits nearest first, breaking ties by id so results are stable.
pub fn sort_hits(hits: &mut [SearchHit]) {
    hits.sort_by(|a, b| a.distance.total_cmp(&b.distance).then(a.id.cmp(&b.id)));
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerStatus {
    pub healthy: bool,
    pub version: Option<String>,
    pub checked_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CollectionInfo {
    pub name: String,
    pub num_entities: u64,
    pub vector_fields: Vec<String>,
}
