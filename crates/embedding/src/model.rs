use async_trait::async_trait;
use vecgate_common::ModelResult;

#[cfg(test)]
use mockall::automock;

/// A language model that turns one text into one fixed-length vector.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait EmbeddingModel: Send + Sync {
    fn model_name(&self) -> String;

    async fn embed_query(&self, text: &str) -> ModelResult<Vec<f32>>;
}
