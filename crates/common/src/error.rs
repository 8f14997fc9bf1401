use thiserror::Error;

pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Failures reported by a vector-database backend.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("server unreachable at {endpoint}: {reason}")]
    Unreachable { endpoint: String, reason: String },

    #[error("collection '{0}' already exists")]
    AlreadyExists(String),

    #[error("collection '{0}' does not exist")]
    CollectionNotFound(String),

    #[error("invalid schema: {0}")]
    InvalidSchema(String),

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("transport error: {0}")]
    Transport(String),
}

pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Failures reported by an embedding model.
#[derive(Debug, Error)]
pub enum ModelError {
    #[error("embedding request failed: {0}")]
    Request(String),

    #[error("embedding service returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("failed to decode embedding response: {0}")]
    Decode(String),

    #[error("model '{0}' returned an empty embedding")]
    EmptyEmbedding(String),
}

pub type ModelResult<T> = std::result::Result<T, ModelError>;

/// Error surfaced by the facade. One variant per failure site; the
/// underlying failure stays reachable through `Error::source`.
#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("connection failure for alias '{alias}': {source}")]
    Connection {
        alias: String,
        #[source]
        source: BoxError,
    },

    #[error("failed to create collection '{collection}': {source}")]
    Creation {
        collection: String,
        #[source]
        source: BoxError,
    },

    #[error("failed to delete collection '{collection}': {source}")]
    Deletion {
        collection: String,
        #[source]
        source: BoxError,
    },

    #[error("{operation} failed: {source}")]
    Query {
        operation: String,
        #[source]
        source: BoxError,
    },

    #[error("search failed for query '{query}': {source}")]
    Search {
        query: String,
        #[source]
        source: BoxError,
    },

    #[error("failed to insert embeddings into '{collection}': {source}")]
    Insertion {
        collection: String,
        #[source]
        source: BoxError,
    },

    #[error("failed to generate embedding for text '{text}': {source}")]
    Embedding {
        text: String,
        #[source]
        source: BoxError,
    },

    #[error("collection '{0}' does not exist")]
    NotFound(String),
}

impl GatewayError {
    pub fn connection(alias: impl Into<String>, source: impl Into<BoxError>) -> Self {
        GatewayError::Connection {
            alias: alias.into(),
            source: source.into(),
        }
    }

    pub fn creation(collection: impl Into<String>, source: impl Into<BoxError>) -> Self {
        GatewayError::Creation {
            collection: collection.into(),
            source: source.into(),
        }
    }

    pub fn deletion(collection: impl Into<String>, source: impl Into<BoxError>) -> Self {
        GatewayError::Deletion {
            collection: collection.into(),
            source: source.into(),
        }
    }

    pub fn query(operation: impl Into<String>, source: impl Into<BoxError>) -> Self {
        GatewayError::Query {
            operation: operation.into(),
            source: source.into(),
        }
    }

    pub fn search(query: impl Into<String>, source: impl Into<BoxError>) -> Self {
        GatewayError::Search {
            query: query.into(),
            source: source.into(),
        }
    }

    pub fn insertion(collection: impl Into<String>, source: impl Into<BoxError>) -> Self {
        GatewayError::Insertion {
            collection: collection.into(),
            source: source.into(),
        }
    }

    pub fn embedding(text: impl Into<String>, source: impl Into<BoxError>) -> Self {
        GatewayError::Embedding {
            text: text.into(),
            source: source.into(),
        }
    }

    /// Walks the source chain looking for a backend error of the given shape.
    pub fn store_error(&self) -> Option<&StoreError> {
        let mut current: Option<&(dyn std::error::Error + 'static)> =
            Some(self as &(dyn std::error::Error + 'static));
        while let Some(err) = current {
            if let Some(store) = err.downcast_ref::<StoreError>() {
                return Some(store);
            }
            current = err.source();
        }
        None
    }

    /// Same as [`GatewayError::store_error`] for embedding-model failures.
    pub fn model_error(&self) -> Option<&ModelError> {
        let mut current: Option<&(dyn std::error::Error + 'static)> =
            Some(self as &(dyn std::error::Error + 'static));
        while let Some(err) = current {
            if let Some(model) = err.downcast_ref::<ModelError>() {
                return Some(model);
            }
            current = err.source();
        }
        None
    }
}

pub type Result<T> = std::result::Result<T, GatewayError>;
