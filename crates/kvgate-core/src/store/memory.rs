//! In-process bucket store.
//!
//! Keeps documents in a [`DashMap`] and hands out CAS tokens from a
//! per-bucket counter. Tokens start at 1, so a stored document never carries
//! the "no CAS check" token 0.

use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use bytes::Bytes;
use dashmap::DashMap;

use kvgate_model::types::{CasOutcome, Document};

use super::{BucketStore, StoreError};

#[derive(Debug, Clone)]
struct StoredValue {
    value: Bytes,
    cas: u64,
}

/// Bucket held entirely in memory.
///
/// # Examples
///
/// ```
/// use bytes::Bytes;
/// use kvgate_core::store::{BucketStore, MemoryBucketStore};
/// use kvgate_model::types::CasOutcome;
///
/// # tokio_test::block_on(async {
/// let store = MemoryBucketStore::new("default");
/// store.set("user1", Bytes::from("{}")).await.unwrap();
///
/// let doc = store.get("user1").await.unwrap().unwrap();
/// let outcome = store
///     .compare_and_swap("user1", doc.cas, Bytes::from("[]"))
///     .await
///     .unwrap();
/// assert_eq!(outcome, CasOutcome::Matched);
/// # });
/// ```
#[derive(Debug)]
pub struct MemoryBucketStore {
    name: String,
    documents: DashMap<String, StoredValue>,
    last_cas: AtomicU64,
}

impl MemoryBucketStore {
    /// Create an empty bucket.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            documents: DashMap::new(),
            last_cas: AtomicU64::new(0),
        }
    }

    /// Number of stored documents.
    #[must_use]
    pub fn len(&self) -> usize {
        self.documents.len()
    }

    /// Whether the bucket holds no documents.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    fn next_cas(&self) -> u64 {
        self.last_cas.fetch_add(1, Ordering::Relaxed) + 1
    }
}

#[async_trait]
impl BucketStore for MemoryBucketStore {
    fn name(&self) -> &str {
        &self.name
    }

    async fn get(&self, key: &str) -> Result<Option<Document>, StoreError> {
        Ok(self.documents.get(key).map(|entry| Document {
            key: key.to_owned(),
            value: entry.value.clone(),
            cas: entry.cas,
        }))
    }

    async fn set(&self, key: &str, value: Bytes) -> Result<bool, StoreError> {
        let cas = self.next_cas();
        self.documents
            .insert(key.to_owned(), StoredValue { value, cas });
        Ok(true)
    }

    async fn compare_and_swap(
        &self,
        key: &str,
        cas: u64,
        value: Bytes,
    ) -> Result<CasOutcome, StoreError> {
        // The shard stays write-locked between the token check and the write.
        let Some(mut entry) = self.documents.get_mut(key) else {
            return Ok(CasOutcome::NotFound);
        };
        if entry.cas != cas {
            return Ok(CasOutcome::Conflict);
        }
        *entry = StoredValue {
            value,
            cas: self.next_cas(),
        };
        Ok(CasOutcome::Matched)
    }
}
