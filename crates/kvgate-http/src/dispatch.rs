//! Handler trait and operation dispatch.

use std::future::Future;
use std::pin::Pin;

use kvgate_model::error::GatewayError;
use kvgate_model::operations::DocumentOperation;
use kvgate_model::types::OperationResult;

/// Boxed future returned by [`DocumentHandler::handle_operation`].
pub type HandlerFuture =
    Pin<Box<dyn Future<Output = Result<OperationResult, GatewayError>> + Send>>;

/// Trait that the store-facing business logic must implement.
///
/// The HTTP layer validates requests against [`bucket_exists`] and hands
/// every accepted request over as a typed [`DocumentOperation`]. Encoding
/// the result stays on the HTTP side so every code path shares one wire
/// format.
///
/// [`bucket_exists`]: DocumentHandler::bucket_exists
pub trait DocumentHandler: Send + Sync + 'static {
    /// Whether `bucket` is configured.
    fn bucket_exists(&self, bucket: &str) -> bool;

    /// Execute a validated operation against the store.
    fn handle_operation(&self, op: DocumentOperation) -> HandlerFuture;
}

/// Dispatch an operation to the handler.
pub async fn dispatch_operation<H: DocumentHandler>(
    handler: &H,
    op: DocumentOperation,
) -> Result<OperationResult, GatewayError> {
    tracing::debug!(
        method = %op.method(),
        bucket = %op.bucket(),
        "dispatching document operation"
    );
    handler.handle_operation(op).await
}
