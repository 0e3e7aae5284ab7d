//! KvGate HTTP service implementing the hyper `Service` trait.

use std::convert::Infallible;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use bytes::Bytes;
use http_body_util::BodyExt;
use hyper::body::Incoming;
use tracing::Instrument;

use kvgate_model::error::GatewayError;
use kvgate_model::gateway_error;
use kvgate_model::operations::DocumentMethod;

use crate::dispatch::{DocumentHandler, dispatch_operation};
use crate::response::{ResponseBody, encode_result, error_to_response};
use crate::router::resolve_request;

/// Header carrying the per-request id.
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Hyper `Service` implementation for the document gateway.
#[derive(Debug)]
pub struct KvGateHttpService<H: DocumentHandler> {
    handler: Arc<H>,
}

impl<H: DocumentHandler> KvGateHttpService<H> {
    /// Create a new `KvGateHttpService`.
    pub fn new(handler: Arc<H>) -> Self {
        Self { handler }
    }
}

impl<H: DocumentHandler> Clone for KvGateHttpService<H> {
    fn clone(&self) -> Self {
        Self {
            handler: Arc::clone(&self.handler),
        }
    }
}

impl<H: DocumentHandler> hyper::service::Service<http::Request<Incoming>>
    for KvGateHttpService<H>
{
    type Response = http::Response<ResponseBody>;
    type Error = Infallible;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn call(&self, req: http::Request<Incoming>) -> Self::Future {
        let handler = Arc::clone(&self.handler);
        let request_id = uuid::Uuid::new_v4().to_string();
        let span = tracing::debug_span!(
            "request",
            request_id = %request_id,
            method = %req.method(),
            path = %req.uri().path(),
        );

        Box::pin(
            async move {
                let response = process_request(req, handler.as_ref()).await;
                Ok(add_common_headers(response, &request_id))
            }
            .instrument(span),
        )
    }
}

/// Process a single request through parse, dispatch and encode.
///
/// Generic over the request body so the pipeline can be driven without a
/// socket.
pub async fn process_request<H, B>(
    req: http::Request<B>,
    handler: &H,
) -> http::Response<ResponseBody>
where
    H: DocumentHandler,
    B: http_body::Body<Data = Bytes>,
    B::Error: std::fmt::Display,
{
    tracing::debug!(
        query = req.uri().query().unwrap_or(""),
        content_length = req
            .headers()
            .get(http::header::CONTENT_LENGTH)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("-"),
        "processing request"
    );

    // 1. Validate everything that does not need the body.
    let ctx = match resolve_request(&req, |bucket| handler.bucket_exists(bucket)) {
        Ok(ctx) => ctx,
        Err(err) => {
            tracing::debug!(code = err.code.code(), message = %err.message, "rejected request");
            return error_to_response(&err);
        }
    };

    // 2. Collect the body of writes.
    let body = if ctx.method == DocumentMethod::Post {
        match collect_body(req.into_body()).await {
            Ok(body) => body,
            Err(err) => return error_to_response(&err),
        }
    } else {
        Bytes::new()
    };

    // 3. Build the operation.
    let op = match ctx.into_operation(body) {
        Ok(op) => op,
        Err(err) => {
            tracing::debug!(code = err.code.code(), message = %err.message, "rejected request");
            return error_to_response(&err);
        }
    };

    // 4. Dispatch and encode.
    let result = dispatch_operation(handler, op).await;
    if let Err(err) = &result {
        log_operation_error(err);
    }
    encode_result(result)
}

/// Store-tier failures point at the downstream store and are logged louder
/// than request-shape rejections.
fn log_operation_error(err: &GatewayError) {
    if err.code.is_store_failure() {
        tracing::warn!(code = err.code.code(), message = %err.message, "store operation failed");
    } else {
        tracing::debug!(code = err.code.code(), message = %err.message, "operation rejected");
    }
}

/// Collect the incoming body into a single `Bytes` buffer.
async fn collect_body<B>(body: B) -> Result<Bytes, GatewayError>
where
    B: http_body::Body<Data = Bytes>,
    B::Error: std::fmt::Display,
{
    body.collect()
        .await
        .map(http_body_util::Collected::to_bytes)
        .map_err(|e| {
            let mut err =
                gateway_error!(OperationFailed, format!("Unable to read request body: {e}"));
            err.status_code = http::StatusCode::BAD_REQUEST;
            err
        })
}

/// Add common response headers to every response.
fn add_common_headers(
    mut response: http::Response<ResponseBody>,
    request_id: &str,
) -> http::Response<ResponseBody> {
    let headers = response.headers_mut();

    if let Ok(hv) = http::HeaderValue::from_str(request_id) {
        headers.entry(REQUEST_ID_HEADER).or_insert(hv);
    }
    headers.insert("server", http::HeaderValue::from_static("kvgate"));

    response
}
