//! Bucket registry.
//!
//! Built once at startup from configuration and read-only afterwards.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::{info, warn};

use crate::config::{StoreBackend, StoreConfig};
use crate::store::{BucketStore, MemcachedBucketStore, MemoryBucketStore, StoreError};

/// Mapping from bucket name to its open store handle.
#[derive(Debug, Default)]
pub struct BucketRegistry {
    buckets: HashMap<String, Arc<dyn BucketStore>>,
}

impl BucketRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Open every configured bucket.
    ///
    /// Fails on the first bucket whose store cannot be reached.
    pub async fn from_config(config: &StoreConfig) -> Result<Self, StoreError> {
        let mut registry = Self::new();
        for spec in &config.buckets {
            let store: Arc<dyn BucketStore> = match config.backend {
                StoreBackend::Memory => Arc::new(MemoryBucketStore::new(spec.name())),
                StoreBackend::Memcached => Arc::new(
                    MemcachedBucketStore::connect(
                        spec.name(),
                        spec.addr(config),
                        config.operation_timeout(),
                        config.max_idle_connections,
                    )
                    .await?
                    .with_max_value_bytes(config.max_value_bytes),
                ),
            };
            info!(bucket = spec.name(), backend = %config.backend, "opened bucket");
            registry.insert(store);
        }
        Ok(registry)
    }

    /// Register a store under its own name. A later store with the same name
    /// replaces the earlier one.
    pub fn insert(&mut self, store: Arc<dyn BucketStore>) {
        let name = store.name().to_owned();
        if self.buckets.insert(name.clone(), store).is_some() {
            warn!(bucket = %name, "bucket configured more than once, keeping the last");
        }
    }

    /// Registered store for `bucket`.
    #[must_use]
    pub fn get(&self, bucket: &str) -> Option<Arc<dyn BucketStore>> {
        self.buckets.get(bucket).cloned()
    }

    /// Whether `bucket` is registered. Names are case-sensitive.
    #[must_use]
    pub fn contains(&self, bucket: &str) -> bool {
        self.buckets.contains_key(bucket)
    }

    /// Registered bucket names, sorted.
    #[must_use]
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.buckets.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Number of registered buckets.
    #[must_use]
    pub fn len(&self) -> usize {
        self.buckets.len()
    }

    /// Whether no bucket is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }
}
