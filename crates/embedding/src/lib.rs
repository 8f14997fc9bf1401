//! Text embeddings and the gateway that stores and searches them

pub mod gateway;
pub mod model;
pub mod ollama;

pub use gateway::EmbeddingGateway;
pub use model::EmbeddingModel;
pub use ollama::{OllamaConfig, OllamaEmbeddings};
