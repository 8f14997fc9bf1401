use crate::MetricType;
use serde::{Deserialize, Serialize};

pub const DEFAULT_HOST: &str = "localhost";
pub const DEFAULT_PORT: &str = "19530";
pub const DEFAULT_ALIAS: &str = "default";
pub const DEFAULT_COLLECTION: &str = "LangChainCollection";
pub const DEFAULT_VECTOR_FIELD: &str = "vector";
pub const DEFAULT_NPROBE: u32 = 10;
pub const DEFAULT_TOP_K: usize = 10;

/// Where to connect and under which alias.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConnectionConfig {
    pub host: String,
    pub port: String,
    pub alias: String,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT.to_string(),
            alias: DEFAULT_ALIAS.to_string(),
        }
    }
}

impl ConnectionConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.host = host.into();
        self
    }

    pub fn with_port(mut self, port: impl Into<String>) -> Self {
        self.port = port.into();
        self
    }

    pub fn with_alias(mut self, alias: impl Into<String>) -> Self {
        self.alias = alias.into();
        self
    }

    pub fn endpoint(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Parameters of a nearest-neighbour search.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchConfig {
    pub metric_type: MetricType,
    /// Candidate partitions probed per query; a quality/speed tradeoff.
    pub nprobe: u32,
    /// Vector field searched against.
    pub anns_field: String,
    pub top_k: usize,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            metric_type: MetricType::L2,
            nprobe: DEFAULT_NPROBE,
            anns_field: DEFAULT_VECTOR_FIELD.to_string(),
            top_k: DEFAULT_TOP_K,
        }
    }
}

impl SearchConfig {
    pub fn with_metric(mut self, metric_type: MetricType) -> Self {
        self.metric_type = metric_type;
        self
    }

    pub fn with_nprobe(mut self, nprobe: u32) -> Self {
        self.nprobe = nprobe;
        self
    }

    pub fn with_anns_field(mut self, anns_field: impl Into<String>) -> Self {
        self.anns_field = anns_field.into();
        self
    }

    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = top_k;
        self
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.nprobe == 0 {
            return Err("nprobe must be at least 1".to_string());
        }
        if self.anns_field.trim().is_empty() {
            return Err("anns_field must not be empty".to_string());
        }
        if self.top_k == 0 {
            return Err("top_k must be at least 1".to_string());
        }
        Ok(())
    }
}

/// Settings for an embedding gateway bound to one collection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GatewayConfig {
    pub collection_name: String,
    pub search: SearchConfig,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            collection_name: DEFAULT_COLLECTION.to_string(),
            search: SearchConfig::default(),
        }
    }
}

impl GatewayConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_collection(mut self, collection_name: impl Into<String>) -> Self {
        self.collection_name = collection_name.into();
        self
    }

    pub fn with_search(mut self, search: SearchConfig) -> Self {
        self.search = search;
        self
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.collection_name.trim().is_empty() {
            return Err("collection name must not be empty".to_string());
        }
        self.search.validate()
    }
}
