use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use vecgate_common::{
    CollectionOptions, CollectionSchema, GatewayConfig, GatewayError, MetricType, ModelResult,
    SearchConfig, StoreError, METRIC_OPTION,
};
use vecgate_embedding::{EmbeddingGateway, EmbeddingModel};
use vecgate_store::{CollectionAdmin, ConnectionRegistry, InMemoryConnector, InMemoryServer};

const DIM: usize = 26;

/// Letter-frequency vectors: deterministic, and similar texts land close.
struct LetterModel {
    calls: AtomicUsize,
}

impl LetterModel {
    fn new() -> Self {
        Self {
            calls: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl EmbeddingModel for LetterModel {
    fn model_name(&self) -> String {
        "letters".to_string()
    }

    async fn embed_query(&self, text: &str) -> ModelResult<Vec<f32>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let mut vector = vec![0.0; DIM];
        for c in text.to_ascii_lowercase().chars().filter(|c| c.is_ascii_lowercase()) {
            vector[(c as u8 - b'a') as usize] += 1.0;
        }
        Ok(vector)
    }
}

async fn connect() -> (Arc<ConnectionRegistry>, CollectionAdmin) {
    let server = Arc::new(InMemoryServer::new());
    let registry = Arc::new(ConnectionRegistry::new(Arc::new(InMemoryConnector::new(server))));
    registry.connect("localhost", "19530", "default").await.unwrap();
    let admin = CollectionAdmin::new(registry.clone(), "default");
    (registry, admin)
}

#[tokio::test]
async fn test_insert_then_search_finds_identical_text() {
    let (registry, admin) = connect().await;
    admin
        .create_collection("LangChainCollection", &CollectionSchema::for_embeddings(DIM), &CollectionOptions::new())
        .await
        .unwrap();

    let model = Arc::new(LetterModel::new());
    let gateway = EmbeddingGateway::new(&admin, model.clone(), GatewayConfig::default())
        .await
        .unwrap();

    let texts = [
        "rust ownership and borrowing",
        "vector databases store embeddings",
        "approximate nearest neighbour search",
        "tokio async runtime",
        "the quick brown fox",
        "collections hold records",
    ];
    let ids: Vec<i64> = (10..16).collect();
    let inserted = gateway.insert_embedding(&texts, Some(ids.clone())).await.unwrap();
    assert_eq!(inserted, ids);
    assert_eq!(model.calls.load(Ordering::SeqCst), texts.len());

    let hits = gateway
        .search_embedding("approximate nearest neighbour search", 5)
        .await
        .unwrap();
    assert!(hits.len() <= 5);
    assert_eq!(hits[0].id, 12);
    assert!(hits[0].distance.abs() < 1e-6);
    for pair in hits.windows(2) {
        assert!(pair[0].distance <= pair[1].distance);
    }

    registry.disconnect("default").await.unwrap();
}

#[tokio::test]
async fn test_default_id_collision_is_preserved() {
    let (_registry, admin) = connect().await;
    admin
        .create_collection("LangChainCollection", &CollectionSchema::for_embeddings(DIM), &CollectionOptions::new())
        .await
        .unwrap();
    let gateway = EmbeddingGateway::new(&admin, Arc::new(LetterModel::new()), GatewayConfig::default())
        .await
        .unwrap();

    assert_eq!(gateway.insert_embedding(&["a", "b", "c"], None).await.unwrap(), vec![0, 1, 2]);
    assert_eq!(gateway.insert_embedding(&["x", "y", "z"], None).await.unwrap(), vec![0, 1, 2]);

    // the second batch replaced the first one
    let hits = gateway.search_embedding("a", 10).await.unwrap();
    assert_eq!(hits.len(), 3);
    assert!(hits.iter().all(|hit| hit.distance > 0.0));
}

#[tokio::test]
async fn test_gateway_on_missing_collection() {
    let (_registry, admin) = connect().await;
    let model = Arc::new(LetterModel::new());

    let result = EmbeddingGateway::new(
        &admin,
        model.clone(),
        GatewayConfig::default().with_collection("nowhere"),
    )
    .await;

    assert!(matches!(result, Err(GatewayError::NotFound(_))));
    assert_eq!(model.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_custom_vector_field_and_metric() {
    let (_registry, admin) = connect().await;
    let schema = CollectionSchema::new(vec![
        vecgate_common::FieldSchema::primary_key("pk"),
        vecgate_common::FieldSchema::float_vector("text_vector", DIM),
    ]);
    let mut options = CollectionOptions::new();
    options.insert(METRIC_OPTION.to_string(), serde_json::json!("COSINE"));
    admin.create_collection("notes", &schema, &options).await.unwrap();

    let config = GatewayConfig::default().with_collection("notes").with_search(
        SearchConfig::default()
            .with_anns_field("text_vector")
            .with_metric(MetricType::Cosine)
            .with_top_k(2),
    );
    let gateway = EmbeddingGateway::new(&admin, Arc::new(LetterModel::new()), config)
        .await
        .unwrap();

    gateway
        .insert_embedding(&["aaaa", "abab", "zzzz"], Some(vec![1, 2, 3]))
        .await
        .unwrap();

    // cosine ignores magnitude: "aa" points the same way as "aaaa"
    let hits = gateway.search("aa").await.unwrap();
    assert_eq!(hits.len(), 2);
    assert_eq!(hits[0].id, 1);
    assert!(hits[0].distance.abs() < 1e-6);
    assert_eq!(hits[1].id, 2);
}

#[tokio::test]
async fn test_search_metric_must_match_collection() {
    let (_registry, admin) = connect().await;
    admin
        .create_collection("LangChainCollection", &CollectionSchema::for_embeddings(DIM), &CollectionOptions::new())
        .await
        .unwrap();

    let config = GatewayConfig::default()
        .with_search(SearchConfig::default().with_metric(MetricType::Cosine));
    let gateway = EmbeddingGateway::new(&admin, Arc::new(LetterModel::new()), config)
        .await
        .unwrap();
    gateway.insert_embedding(&["near", "far away"], None).await.unwrap();

    let err = gateway.search("near").await.unwrap_err();
    assert!(matches!(err, GatewayError::Search { .. }));
    assert!(matches!(err.store_error(), Some(StoreError::InvalidRequest(_))));
}
