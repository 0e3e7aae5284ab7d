//! Document provider: executes validated operations against bucket stores.

use std::sync::Arc;

use bytes::Bytes;
use tracing::{debug, error};

use kvgate_model::error::GatewayError;
use kvgate_model::operations::{DocumentOperation, SaveMode};
use kvgate_model::types::{CasOutcome, DocumentOutcome, OperationResult};

use crate::error::store_error_to_gateway;
use crate::registry::BucketRegistry;
use crate::store::BucketStore;

/// Internal marker for a bucket that passed validation but is not open.
const REGISTRY_MISS: u32 = 101;

/// Executes document operations against the bucket registry.
#[derive(Debug)]
pub struct KvGateProvider {
    registry: Arc<BucketRegistry>,
}

impl KvGateProvider {
    /// Create a provider over an opened registry.
    #[must_use]
    pub fn new(registry: Arc<BucketRegistry>) -> Self {
        Self { registry }
    }

    /// Whether `bucket` is served by this gateway.
    #[must_use]
    pub fn bucket_exists(&self, bucket: &str) -> bool {
        self.registry.contains(bucket)
    }

    /// Execute a validated operation.
    pub async fn execute(&self, op: DocumentOperation) -> Result<OperationResult, GatewayError> {
        let store = self
            .registry
            .get(op.bucket())
            .ok_or_else(|| GatewayError::unexpected(REGISTRY_MISS))?;

        match op {
            DocumentOperation::Get { keys, .. } => {
                Ok(Self::get_documents(store.as_ref(), keys).await)
            }
            DocumentOperation::Save {
                key, mode, value, ..
            } => Self::save_document(store.as_ref(), &key, mode, value).await,
        }
    }

    /// Look up each key in order. A failed lookup becomes an error element
    /// and does not stop the remaining keys.
    async fn get_documents(store: &dyn BucketStore, keys: Vec<String>) -> OperationResult {
        let mut outcomes = Vec::with_capacity(keys.len());
        for key in keys {
            let outcome = match store.get(&key).await {
                Ok(Some(document)) => DocumentOutcome::found(document),
                Ok(None) => DocumentOutcome::missing(),
                Err(e) => {
                    error!(bucket = store.name(), key = %key, error = %e, "document lookup failed");
                    DocumentOutcome::failed(&store_error_to_gateway(e))
                }
            };
            outcomes.push(outcome);
        }
        OperationResult::Documents(outcomes)
    }

    async fn save_document(
        store: &dyn BucketStore,
        key: &str,
        mode: SaveMode,
        value: Bytes,
    ) -> Result<OperationResult, GatewayError> {
        match mode {
            SaveMode::Upsert => {
                let stored = store.set(key, value).await.map_err(|e| {
                    error!(bucket = store.name(), key, error = %e, "document write failed");
                    store_error_to_gateway(e)
                })?;
                if !stored {
                    error!(bucket = store.name(), key, "store declined document write");
                    return Err(GatewayError::save_failed());
                }
                Ok(OperationResult::Saved)
            }
            SaveMode::CompareAndSwap(cas) => {
                let outcome = store
                    .compare_and_swap(key, cas, value)
                    .await
                    .map_err(|e| {
                        error!(bucket = store.name(), key, cas, error = %e, "cas write failed");
                        store_error_to_gateway(e)
                    })?;
                match outcome {
                    CasOutcome::Matched => Ok(OperationResult::Saved),
                    CasOutcome::NotFound => {
                        debug!(
                            bucket = store.name(),
                            key,
                            cas,
                            "cas write against missing document"
                        );
                        Ok(OperationResult::Saved)
                    }
                    CasOutcome::Conflict => Err(GatewayError::cas_conflict()),
                }
            }
        }
    }
}
