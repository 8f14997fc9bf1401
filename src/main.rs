use anyhow::Result;
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use vecgate_common::{
    CollectionOptions, CollectionSchema, ConnectionConfig, GatewayConfig, MetricType, SearchConfig,
};
use vecgate_embedding::{EmbeddingGateway, OllamaConfig, OllamaEmbeddings};
use vecgate_store::{
    CollectionAdmin, ConnectionRegistry, InMemoryConnector, InMemoryServer, QdrantConfig,
};

const SAMPLE_TEXTS: [&str; 4] = [
    "Rust guarantees memory safety without a garbage collector.",
    "Vector databases index embeddings for nearest neighbour search.",
    "Tokio is an asynchronous runtime for the Rust programming language.",
    "Cosine similarity compares the angle between two vectors.",
];

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "vecgate=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    dotenv::dotenv().ok();

    let connection = ConnectionConfig::default()
        .with_host(env_or("VECGATE_HOST", vecgate_common::config::DEFAULT_HOST))
        .with_port(env_or("VECGATE_PORT", vecgate_common::config::DEFAULT_PORT))
        .with_alias(env_or("VECGATE_ALIAS", vecgate_common::config::DEFAULT_ALIAS));

    let metric: MetricType = env_or("VECGATE_METRIC", "L2")
        .parse()
        .map_err(anyhow::Error::msg)?;
    let gateway_config = GatewayConfig::default()
        .with_collection(env_or(
            "VECGATE_COLLECTION",
            vecgate_common::config::DEFAULT_COLLECTION,
        ))
        .with_search(SearchConfig::default().with_metric(metric));
    gateway_config.validate().map_err(anyhow::Error::msg)?;

    let ollama = OllamaConfig::default()
        .with_base_url(env_or("VECGATE_OLLAMA_URL", vecgate_embedding::ollama::DEFAULT_BASE_URL))
        .with_model(env_or("VECGATE_MODEL", vecgate_embedding::ollama::DEFAULT_MODEL));
    let dim: usize = env_or("VECGATE_DIM", "384").parse()?;

    let registry = if env_or("VECGATE_BACKEND", "qdrant").eq_ignore_ascii_case("memory") {
        info!("Using the in-process vector store");
        let server = InMemoryServer::new().with_endpoint(&connection.host, &connection.port);
        Arc::new(ConnectionRegistry::new(Arc::new(InMemoryConnector::new(
            Arc::new(server),
        ))))
    } else {
        let mut qdrant = QdrantConfig::default();
        if let Ok(api_key) = std::env::var("VECGATE_QDRANT_API_KEY") {
            qdrant = qdrant.with_api_key(api_key);
        }
        Arc::new(ConnectionRegistry::qdrant(qdrant))
    };

    info!("Connecting to {} as '{}'", connection.endpoint(), connection.alias);
    registry.connect_with(&connection).await?;

    let outcome = run(&registry, &connection.alias, gateway_config, ollama, dim).await;
    if let Err(e) = &outcome {
        error!("Demo failed: {}", e);
    }

    registry.disconnect(&connection.alias).await?;
    outcome
}

async fn run(
    registry: &Arc<ConnectionRegistry>,
    alias: &str,
    config: GatewayConfig,
    ollama: OllamaConfig,
    dim: usize,
) -> Result<()> {
    let admin = CollectionAdmin::new(registry.clone(), alias);

    let status = admin.get_server_status().await?;
    info!(
        "Server healthy: {} (version {})",
        status.healthy,
        status.version.as_deref().unwrap_or("unknown")
    );

    let collection = config.collection_name.clone();
    if !admin.has_collection(&collection).await? {
        let mut options = CollectionOptions::new();
        options.insert(
            "metric_type".to_string(),
            serde_json::json!(config.search.metric_type.as_str()),
        );
        admin
            .create_collection(&collection, &CollectionSchema::for_embeddings(dim), &options)
            .await?;
    }
    info!("Collections: {:?}", admin.list_collections().await?);

    let model = Arc::new(OllamaEmbeddings::new(ollama)?);
    let gateway = EmbeddingGateway::new(&admin, model, config).await?;

    let ids: Vec<i64> = (1..=SAMPLE_TEXTS.len() as i64).collect();
    gateway.insert_embedding(&SAMPLE_TEXTS, Some(ids)).await?;

    let query = "How do I search embeddings?";
    for hit in gateway.search(query).await? {
        let text = usize::try_from(hit.id - 1)
            .ok()
            .and_then(|i| SAMPLE_TEXTS.get(i))
            .copied()
            .unwrap_or("?");
        println!("{:>3}  {:.4}  {}", hit.id, hit.distance, text);
    }

    let info = admin.describe_collection(&collection).await?;
    info!("'{}' holds {} entities", info.name, info.num_entities);

    Ok(())
}
