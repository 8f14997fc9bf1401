use crate::model::EmbeddingModel;
use std::sync::Arc;
use tracing::{error, info};
use vecgate_common::{GatewayConfig, GatewayError, Result, SearchConfig, SearchHit};
use vecgate_store::{CollectionAdmin, CollectionHandle};

/// Embeds text with a language model and stores / searches the vectors in
/// one collection.
pub struct EmbeddingGateway {
    model: Arc<dyn EmbeddingModel>,
    collection: CollectionHandle,
    search: SearchConfig,
}

impl EmbeddingGateway {
    /// Binds to `config.collection_name`, which must already exist.
    pub async fn new(
        admin: &CollectionAdmin,
        model: Arc<dyn EmbeddingModel>,
        config: GatewayConfig,
    ) -> Result<Self> {
        if let Err(reason) = config.validate() {
            error!(collection = %config.collection_name, error = %reason, "Invalid gateway configuration");
            return Err(GatewayError::query("gateway configuration", reason));
        }

        let collection = admin.collection(&config.collection_name).await?;
        info!(
            "Embedding gateway ready: model '{}' on collection '{}'",
            model.model_name(),
            collection.name()
        );

        Ok(Self {
            model,
            collection,
            search: config.search,
        })
    }

    pub fn collection_name(&self) -> &str {
        self.collection.name()
    }

    pub fn search_config(&self) -> &SearchConfig {
        &self.search
    }

    pub async fn generate_embedding(&self, text: &str) -> Result<Vec<f32>> {
        match self.model.embed_query(text).await {
            Ok(vector) => Ok(vector),
            Err(e) => {
                error!(text = %text, error = %e, "Failed to generate embedding");
                Err(GatewayError::embedding(text, e))
            }
        }
    }

    /// Embeds every text in order, then inserts all of them in one request.
    ///
    /// Without `ids` the batch is numbered `0..texts.len()`. Numbering starts
    /// over on every call, so two calls without ids reuse the same keys; pass
    /// ids when inserting more than once into the same collection.
    pub async fn insert_embedding<S: AsRef<str>>(
        &self,
        texts: &[S],
        ids: Option<Vec<i64>>,
    ) -> Result<Vec<i64>> {
        let collection = self.collection.name();

        if texts.is_empty() {
            error!(collection = %collection, "Failed to insert embeddings: empty batch");
            return Err(GatewayError::insertion(collection, "no texts to insert"));
        }
        if let Some(ids) = &ids {
            if ids.len() != texts.len() {
                let reason = format!("{} ids for {} texts", ids.len(), texts.len());
                error!(collection = %collection, error = %reason, "Failed to insert embeddings");
                return Err(GatewayError::insertion(collection, reason));
            }
        }

        let mut vectors = Vec::with_capacity(texts.len());
        for text in texts {
            let vector = self
                .generate_embedding(text.as_ref())
                .await
                .map_err(|e| GatewayError::insertion(collection, e))?;
            vectors.push(vector);
        }

        let ids = ids.unwrap_or_else(|| (0..texts.len() as i64).collect());

        match self.collection.insert(&self.search.anns_field, &ids, &vectors).await {
            Ok(primary_keys) => {
                info!("Inserted {} records into collection '{}'", texts.len(), collection);
                Ok(primary_keys)
            }
            Err(e) => {
                error!(collection = %collection, error = %e, "Failed to insert embeddings");
                Err(GatewayError::insertion(collection, e))
            }
        }
    }

    /// Nearest neighbours of `query_text`, at most `top_k`, nearest first.
    pub async fn search_embedding(&self, query_text: &str, top_k: usize) -> Result<Vec<SearchHit>> {
        if top_k == 0 {
            error!(query = %query_text, "Search failed: top_k must be at least 1");
            return Err(GatewayError::search(query_text, "top_k must be at least 1"));
        }

        let query_vector = self
            .generate_embedding(query_text)
            .await
            .map_err(|e| GatewayError::search(query_text, e))?;

        match self.collection.search(&[query_vector], &self.search, top_k).await {
            Ok(mut results) => {
                let hits = results.pop().unwrap_or_default();
                info!("Found {} similar results for query '{}'", hits.len(), query_text);
                Ok(hits)
            }
            Err(e) => {
                error!(query = %query_text, error = %e, "Search failed");
                Err(GatewayError::search(query_text, e))
            }
        }
    }

    /// [`Self::search_embedding`] with the configured `top_k`.
    pub async fn search(&self, query_text: &str) -> Result<Vec<SearchHit>> {
        self.search_embedding(query_text, self.search.top_k).await
    }
}
