use crate::backend::{Connector, VectorBackend};
use crate::qdrant::{QdrantConfig, QdrantConnector};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, error, info, warn};
use vecgate_common::{ConnectionConfig, GatewayError, Result, StoreError};

const MAX_ALIAS_LENGTH: usize = 255;

struct Connection {
    host: String,
    port: String,
    backend: Arc<dyn VectorBackend>,
}

impl Connection {
    fn endpoint(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Connecting an alias again succeeds only for the endpoint it is bound to.
    fn rebind(&self, host: &str, port: &str, alias: &str) -> Result<()> {
        if self.host == host && self.port == port {
            debug!("Alias '{}' already connected to {}", alias, self.endpoint());
            return Ok(());
        }
        let e = StoreError::InvalidRequest(format!("alias already bound to {}", self.endpoint()));
        error!(alias = %alias, error = %e, "Failed to connect to vector database");
        Err(GatewayError::connection(alias, e))
    }
}

/// Alias-keyed table of live connections. Shared by reference with every
/// component that needs network access.
pub struct ConnectionRegistry {
    connector: Arc<dyn Connector>,
    connections: RwLock<HashMap<String, Connection>>,
}

impl ConnectionRegistry {
    pub fn new(connector: Arc<dyn Connector>) -> Self {
        Self {
            connector,
            connections: RwLock::new(HashMap::new()),
        }
    }

    pub fn qdrant(config: QdrantConfig) -> Self {
        Self::new(Arc::new(QdrantConnector::new(config)))
    }

    pub async fn connect(&self, host: &str, port: &str, alias: &str) -> Result<()> {
        if let Err(e) = validate_alias(alias) {
            error!(alias = %alias, error = %e, "Failed to connect to vector database");
            return Err(GatewayError::connection(alias, e));
        }

        if let Some(existing) = self.connections.read().await.get(alias) {
            return existing.rebind(host, port, alias);
        }

        // No lock is held while the server is contacted.
        let backend = match self.connector.connect(host, port).await {
            Ok(backend) => backend,
            Err(e) => {
                error!(alias = %alias, host = %host, port = %port, error = %e, "Failed to connect to vector database");
                return Err(GatewayError::connection(alias, e));
            }
        };

        let mut connections = self.connections.write().await;
        if let Some(existing) = connections.get(alias) {
            // Bound by a concurrent connect while this one was in flight.
            let outcome = existing.rebind(host, port, alias);
            drop(connections);
            if let Err(e) = backend.close().await {
                warn!(alias = %alias, error = %e, "Failed to close redundant connection");
            }
            return outcome;
        }

        info!("Connected to vector database at {} (alias: {})", backend.endpoint(), alias);
        connections.insert(
            alias.to_string(),
            Connection {
                host: host.to_string(),
                port: port.to_string(),
                backend,
            },
        );
        Ok(())
    }

    pub async fn connect_with(&self, config: &ConnectionConfig) -> Result<()> {
        self.connect(&config.host, &config.port, &config.alias).await
    }

    pub async fn disconnect(&self, alias: &str) -> Result<()> {
        let removed = self.connections.write().await.remove(alias);

        let Some(connection) = removed else {
            let e = StoreError::InvalidRequest("no active connection".to_string());
            error!(alias = %alias, error = %e, "Failed to disconnect");
            return Err(GatewayError::connection(alias, e));
        };

        if let Err(e) = connection.backend.close().await {
            warn!(alias = %alias, error = %e, "Failed to disconnect cleanly");
            return Err(GatewayError::connection(alias, e));
        }

        info!(
            "Disconnected from vector database at {} (alias: {})",
            connection.backend.endpoint(),
            alias
        );
        Ok(())
    }

    pub async fn is_connected(&self, alias: &str) -> bool {
        self.connections.read().await.contains_key(alias)
    }

    pub async fn aliases(&self) -> Vec<String> {
        let mut aliases: Vec<String> = self.connections.read().await.keys().cloned().collect();
        aliases.sort();
        aliases
    }

    pub async fn endpoint(&self, alias: &str) -> Option<String> {
        self.connections.read().await.get(alias).map(Connection::endpoint)
    }

    /// The live backend for `alias`, or a connection failure when the alias
    /// was never connected (or has been disconnected).
    pub async fn backend(&self, alias: &str) -> Result<Arc<dyn VectorBackend>> {
        self.connections
            .read()
            .await
            .get(alias)
            .map(|c| c.backend.clone())
            .ok_or_else(|| {
                GatewayError::connection(
                    alias,
                    StoreError::InvalidRequest("no active connection".to_string()),
                )
            })
    }
}

pub fn validate_alias(alias: &str) -> std::result::Result<(), StoreError> {
    if alias.is_empty() {
        return Err(StoreError::InvalidRequest("alias is empty".to_string()));
    }
    if alias.len() > MAX_ALIAS_LENGTH {
        return Err(StoreError::InvalidRequest(format!(
            "alias longer than {} characters",
            MAX_ALIAS_LENGTH
        )));
    }
    if !alias
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
    {
        return Err(StoreError::InvalidRequest(format!("malformed alias '{}'", alias)));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::{InMemoryConnector, InMemoryServer};
    use async_trait::async_trait;
    use std::time::Duration;
    use tokio::sync::Notify;
    use vecgate_common::StoreResult;

    fn registry() -> ConnectionRegistry {
        let server = Arc::new(InMemoryServer::new());
        ConnectionRegistry::new(Arc::new(InMemoryConnector::new(server)))
    }

    #[test]
    fn test_alias_validation() {
        assert!(validate_alias("default").is_ok());
        assert!(validate_alias("alias_2-b").is_ok());
        assert!(validate_alias("").is_err());
        assert!(validate_alias("has space").is_err());
        assert!(validate_alias("slash/alias").is_err());
        assert!(validate_alias(&"a".repeat(256)).is_err());
    }

    #[tokio::test]
    async fn test_connect_then_disconnect() {
        let registry = registry();

        registry.connect("localhost", "19530", "default").await.unwrap();
        assert!(registry.is_connected("default").await);
        assert_eq!(registry.endpoint("default").await.unwrap(), "localhost:19530");
        assert_eq!(registry.backend("default").await.unwrap().endpoint(), "localhost:19530");

        registry.disconnect("default").await.unwrap();
        assert!(!registry.is_connected("default").await);
        assert!(registry.aliases().await.is_empty());
        assert!(registry.backend("default").await.is_err());
    }

    #[tokio::test]
    async fn test_disconnect_unknown_alias_fails() {
        let registry = registry();
        let err = registry.disconnect("never").await.unwrap_err();
        assert!(matches!(err, GatewayError::Connection { ref alias, .. } if alias == "never"));
    }

    #[tokio::test]
    async fn test_malformed_alias_fails() {
        let registry = registry();
        let err = registry.connect("localhost", "19530", "bad alias").await.unwrap_err();
        assert!(matches!(err, GatewayError::Connection { .. }));
        assert!(!registry.is_connected("bad alias").await);
    }

    #[tokio::test]
    async fn test_unreachable_endpoint_fails() {
        let registry = registry();
        let err = registry.connect("db.invalid", "19530", "remote").await.unwrap_err();
        assert!(matches!(err.store_error(), Some(StoreError::Unreachable { .. })));
        assert!(!registry.is_connected("remote").await);
    }

    #[tokio::test]
    async fn test_reconnect_same_endpoint_is_noop() {
        let registry = registry();
        registry.connect("localhost", "19530", "default").await.unwrap();
        registry.connect("localhost", "19530", "default").await.unwrap();
        assert_eq!(registry.aliases().await, vec!["default".to_string()]);
    }

    #[tokio::test]
    async fn test_rebinding_alias_to_other_endpoint_fails() {
        let server = Arc::new(InMemoryServer::new().with_endpoint("127.0.0.1", "19531"));
        let registry = ConnectionRegistry::new(Arc::new(InMemoryConnector::new(server)));

        registry.connect("localhost", "19530", "default").await.unwrap();
        let err = registry.connect("127.0.0.1", "19531", "default").await.unwrap_err();
        assert!(matches!(err, GatewayError::Connection { .. }));
        assert_eq!(registry.endpoint("default").await.unwrap(), "localhost:19530");
    }

    /// Waits for a release signal before connecting to hosts named "stalled".
    struct StalledConnector {
        inner: InMemoryConnector,
        release: Arc<Notify>,
    }

    #[async_trait]
    impl Connector for StalledConnector {
        async fn connect(&self, host: &str, port: &str) -> StoreResult<Arc<dyn VectorBackend>> {
            if host == "stalled" {
                self.release.notified().await;
            }
            self.inner.connect("localhost", port).await
        }
    }

    fn stalled_registry() -> (Arc<ConnectionRegistry>, Arc<Notify>) {
        let release = Arc::new(Notify::new());
        let connector = StalledConnector {
            inner: InMemoryConnector::new(Arc::new(InMemoryServer::new())),
            release: release.clone(),
        };
        (Arc::new(ConnectionRegistry::new(Arc::new(connector))), release)
    }

    #[tokio::test]
    async fn test_slow_connect_does_not_block_other_aliases() {
        let (registry, release) = stalled_registry();
        registry.connect("localhost", "19530", "default").await.unwrap();

        let pending = tokio::spawn({
            let registry = registry.clone();
            async move { registry.connect("stalled", "19530", "slow").await }
        });
        tokio::task::yield_now().await;

        let lookups = tokio::time::timeout(Duration::from_secs(1), async {
            registry.is_connected("default").await && registry.backend("default").await.is_ok()
        })
        .await;
        assert_eq!(lookups.ok(), Some(true));
        assert!(!registry.is_connected("slow").await);

        release.notify_one();
        pending.await.unwrap().unwrap();
        assert_eq!(registry.endpoint("slow").await.unwrap(), "stalled:19530");
    }

    #[tokio::test]
    async fn test_concurrent_connect_keeps_first_binding() {
        let (registry, release) = stalled_registry();

        let pending = tokio::spawn({
            let registry = registry.clone();
            async move { registry.connect("stalled", "19530", "default").await }
        });
        tokio::task::yield_now().await;

        registry.connect("localhost", "19530", "default").await.unwrap();
        release.notify_one();

        let err = pending.await.unwrap().unwrap_err();
        assert!(matches!(err, GatewayError::Connection { .. }));
        assert_eq!(registry.endpoint("default").await.unwrap(), "localhost:19530");
    }

    #[tokio::test]
    async fn test_multiple_aliases() {
        let registry = registry();
        registry
            .connect_with(&ConnectionConfig::default().with_alias("b"))
            .await
            .unwrap();
        registry
            .connect_with(&ConnectionConfig::default().with_alias("a"))
            .await
            .unwrap();
        assert_eq!(registry.aliases().await, vec!["a".to_string(), "b".to_string()]);
    }
}
