//! Connection management and collection lifecycle for vector databases

pub mod admin;
pub mod backend;
pub mod memory;
pub mod qdrant;
pub mod registry;

pub use admin::{CollectionAdmin, CollectionHandle};
pub use backend::{Connector, VectorBackend};
pub use memory::{InMemoryConnector, InMemoryServer};
pub use qdrant::{QdrantConfig, QdrantConnector};
pub use registry::ConnectionRegistry;
