//! Store collaborator interface.
//!
//! A [`BucketStore`] is a handle onto one bucket of the remote key-value
//! store. The gateway only ever needs point reads, unconditional writes and
//! compare-and-swap writes.

pub mod memcached;
pub mod memory;

use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use thiserror::Error;

use kvgate_model::types::{CasOutcome, Document};

pub use memcached::MemcachedBucketStore;
pub use memory::MemoryBucketStore;

/// Errors raised while talking to the store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The exchange with the store was cut short.
    #[error("interrupted while executing command: {0}")]
    Interrupted(String),
    /// The store did not answer in time.
    #[error("store operation timed out after {0:?}")]
    Timeout(Duration),
    /// Could not open a connection to the store.
    #[error("unable to connect to store at {addr}: {source}")]
    Connection {
        /// Store address.
        addr: String,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },
    /// The key cannot be expressed in the store's protocol.
    #[error("invalid document key [{0}]")]
    InvalidKey(String),
    /// The store sent something we did not expect.
    #[error("unexpected store reply: {0}")]
    Protocol(String),
    /// I/O error on an established connection.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Handle onto a single bucket.
#[async_trait]
pub trait BucketStore: std::fmt::Debug + Send + Sync {
    /// Bucket name, for logging.
    fn name(&self) -> &str;

    /// Point lookup. `Ok(None)` when the key does not exist.
    async fn get(&self, key: &str) -> Result<Option<Document>, StoreError>;

    /// Unconditional upsert. `Ok(false)` is the store's negative
    /// acknowledgment.
    async fn set(&self, key: &str, value: Bytes) -> Result<bool, StoreError>;

    /// Write `value` only if the stored CAS token equals `cas`.
    async fn compare_and_swap(
        &self,
        key: &str,
        cas: u64,
        value: Bytes,
    ) -> Result<CasOutcome, StoreError>;
}
