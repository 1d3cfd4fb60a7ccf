//! Object store contract and an in-memory implementation.

use async_trait::async_trait;
use dashmap::DashMap;
use std::sync::Arc;

use super::Address;
use crate::errors::StoreError;

/// Blob storage addressed by [`Address`].
///
/// Reads always observe the most recent write to an address: a downstream
/// stage consumes the latest output of its producer, never a pinned run.
#[async_trait]
pub trait ArtifactStore: Send + Sync {
    /// Stores `bytes` at `address`, superseding any earlier object.
    async fn put(&self, address: &Address, bytes: Vec<u8>) -> Result<(), StoreError>;

    /// Returns the latest object stored at `address`.
    async fn get(&self, address: &Address) -> Result<Vec<u8>, StoreError>;
}

/// Versions kept per address by [`InMemoryArtifactStore::new`].
pub const DEFAULT_VERSION_LIMIT: usize = 16;

/// Versioned in-memory artifact store for tests and local composition.
///
/// Every put is kept as a new version and `get` returns the newest one.
/// At most `version_limit` versions are retained per address; older ones
/// are dropped on put.
#[derive(Debug, Clone)]
pub struct InMemoryArtifactStore {
    objects: Arc<DashMap<Address, Vec<Vec<u8>>>>,
    version_limit: usize,
}

impl Default for InMemoryArtifactStore {
    fn default() -> Self {
        Self {
            objects: Arc::new(DashMap::new()),
            version_limit: DEFAULT_VERSION_LIMIT,
        }
    }
}

impl InMemoryArtifactStore {
    /// Creates a new in-memory store keeping [`DEFAULT_VERSION_LIMIT`] versions.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets how many versions are kept per address. Clamped to at least one.
    #[must_use]
    pub fn with_version_limit(mut self, limit: usize) -> Self {
        self.version_limit = limit.max(1);
        self
    }

    /// Returns how many versions are kept per address.
    #[must_use]
    pub fn version_limit(&self) -> usize {
        self.version_limit
    }

    /// Returns the number of addresses holding at least one object.
    #[must_use]
    pub fn len(&self) -> usize {
        self.objects.len()
    }

    /// Returns true if the store is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    /// Returns how many versions are retained for `address`.
    #[must_use]
    pub fn version_count(&self, address: &Address) -> usize {
        self.objects.get(address).map_or(0, |versions| versions.len())
    }

    /// Removes every version stored at `address`.
    pub fn remove(&self, address: &Address) {
        self.objects.remove(address);
    }
}

#[async_trait]
impl ArtifactStore for InMemoryArtifactStore {
    async fn put(&self, address: &Address, bytes: Vec<u8>) -> Result<(), StoreError> {
        tracing::debug!(address = %address.location(), size = bytes.len(), "storing artifact");
        let mut versions = self.objects.entry(address.clone()).or_default();
        versions.push(bytes);
        if versions.len() > self.version_limit {
            let excess = versions.len() - self.version_limit;
            versions.drain(..excess);
        }
        Ok(())
    }

    async fn get(&self, address: &Address) -> Result<Vec<u8>, StoreError> {
        self.objects
            .get(address)
            .and_then(|versions| versions.last().cloned())
            .ok_or_else(|| StoreError::not_found(address.location()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_put_then_get() {
        let store = InMemoryArtifactStore::new();
        let address = Address::new("artifacts", "build/jar");

        store.put(&address, b"jar-bytes".to_vec()).await.unwrap();

        assert_eq!(store.get(&address).await.unwrap(), b"jar-bytes".to_vec());
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn test_get_missing_is_not_found() {
        let store = InMemoryArtifactStore::new();
        let err = store.get(&Address::new("artifacts", "build/jar")).await.unwrap_err();

        assert_eq!(err, StoreError::not_found("artifacts/build/jar"));
    }

    #[tokio::test]
    async fn test_latest_version_wins() {
        let store = InMemoryArtifactStore::new();
        let address = Address::new("artifacts", "build/jar");

        store.put(&address, b"run-4".to_vec()).await.unwrap();
        store.put(&address, b"run-59".to_vec()).await.unwrap();

        assert_eq!(store.get(&address).await.unwrap(), b"run-59".to_vec());
        assert_eq!(store.version_count(&address), 2);

        store.remove(&address);
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_history_is_bounded() {
        let store = InMemoryArtifactStore::new().with_version_limit(2);
        let address = Address::new("artifacts", "build/jar");

        for run in 0..5_u8 {
            store.put(&address, vec![run]).await.unwrap();
        }

        assert_eq!(store.version_count(&address), 2);
        assert_eq!(store.get(&address).await.unwrap(), vec![4]);
    }

    #[tokio::test]
    async fn test_default_limit_and_clamp() {
        assert_eq!(InMemoryArtifactStore::new().version_limit(), DEFAULT_VERSION_LIMIT);

        let store = InMemoryArtifactStore::new().with_version_limit(0);
        assert_eq!(store.version_limit(), 1);

        let address = Address::new("artifacts", "build/jar");
        store.put(&address, b"a".to_vec()).await.unwrap();
        store.put(&address, b"b".to_vec()).await.unwrap();
        assert_eq!(store.version_count(&address), 1);
        assert_eq!(store.get(&address).await.unwrap(), b"b".to_vec());
    }

    #[tokio::test]
    async fn test_shared_across_tasks() {
        let store = InMemoryArtifactStore::new();
        let writer = store.clone();

        tokio::spawn(async move {
            writer
                .put(&Address::new("artifacts", "build/jar"), vec![1, 2, 3])
                .await
        })
        .await
        .unwrap()
        .unwrap();

        assert_eq!(store.get(&Address::new("artifacts", "build/jar")).await.unwrap(), vec![1, 2, 3]);
    }
}
