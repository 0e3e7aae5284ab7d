//! Handler bridging the HTTP layer to the document provider.

use std::sync::Arc;

use kvgate_http::dispatch::{DocumentHandler, HandlerFuture};
use kvgate_model::operations::DocumentOperation;

use crate::provider::KvGateProvider;

/// Handler that bridges the HTTP layer to the [`KvGateProvider`].
#[derive(Debug)]
pub struct KvGateHandler {
    provider: Arc<KvGateProvider>,
}

impl KvGateHandler {
    /// Create a new handler wrapping a provider.
    #[must_use]
    pub fn new(provider: Arc<KvGateProvider>) -> Self {
        Self { provider }
    }
}

impl DocumentHandler for KvGateHandler {
    fn bucket_exists(&self, bucket: &str) -> bool {
        self.provider.bucket_exists(bucket)
    }

    fn handle_operation(&self, op: DocumentOperation) -> HandlerFuture {
        let provider = Arc::clone(&self.provider);
        Box::pin(async move { provider.execute(op).await })
    }
}
