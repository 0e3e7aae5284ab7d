//! Response encoding.
//!
//! Wire format:
//!
//! ```json
//! [{"key": "user1", "cas": 42, "doc": "{\"name\":\"a\"}"},
//!  {"err": {"code": 13, "message": "No such document"}}]
//! ```
//!
//! for reads, `{}` for accepted writes, and
//!
//! ```json
//! {"err": {"code": 7, "message": "Invalid CAS value [abc]"}}
//! ```
//!
//! for every failure.

use std::fmt::Write as _;

use bytes::Bytes;
use http_body_util::Full;

use kvgate_model::error::GatewayError;
use kvgate_model::types::{ErrorEnvelope, OperationResult};

/// Response body type for every KvGate response.
pub type ResponseBody = Full<Bytes>;

/// Content type of write and error responses.
pub const CONTENT_TYPE: &str = "application/json";

/// Content type of read responses.
pub const CONTENT_TYPE_UTF8: &str = "application/json;charset=UTF-8";

/// Internal marker for a read result that could not be serialized.
const SERIALIZATION_FAULT: u32 = 102;

/// Serialize a gateway error into the `{"err": {..}}` envelope.
///
/// Never fails: if the JSON serializer errors out, the envelope is written
/// by hand instead.
#[must_use]
pub fn error_to_json(error: &GatewayError) -> Vec<u8> {
    serde_json::to_vec(&ErrorEnvelope::from(error)).unwrap_or_else(|e| {
        tracing::error!(error = %e, code = error.code.code(), "failed to serialize error envelope");
        fallback_error_json(error.code.code(), &error.message)
    })
}

/// Build the error envelope without the JSON library.
#[must_use]
pub fn fallback_error_json(code: u32, message: &str) -> Vec<u8> {
    let mut out = String::with_capacity(message.len() + 40);
    let _ = write!(out, "{{\"err\":{{\"code\":{code},\"message\":\"");
    for c in message.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if u32::from(c) < 0x20 => {
                let _ = write!(out, "\\u{:04x}", u32::from(c));
            }
            c => out.push(c),
        }
    }
    out.push_str("\"}}");
    out.into_bytes()
}

/// Convert a `GatewayError` into a complete HTTP error response.
#[must_use]
pub fn error_to_response(error: &GatewayError) -> http::Response<ResponseBody> {
    json_response(error.status_code, CONTENT_TYPE, error_to_json(error))
}

/// Encode the outcome of an operation into an HTTP response.
#[must_use]
pub fn encode_result(
    result: Result<OperationResult, GatewayError>,
) -> http::Response<ResponseBody> {
    match result {
        Ok(OperationResult::Documents(outcomes)) => match serde_json::to_vec(&outcomes) {
            Ok(json) => json_response(http::StatusCode::OK, CONTENT_TYPE_UTF8, json),
            Err(e) => {
                tracing::error!(error = %e, "failed to serialize documents");
                error_to_response(&GatewayError::unexpected(SERIALIZATION_FAULT).with_source(e))
            }
        },
        Ok(OperationResult::Saved) => {
            json_response(http::StatusCode::OK, CONTENT_TYPE, b"{}".to_vec())
        }
        Err(err) => error_to_response(&err),
    }
}

fn json_response(
    status: http::StatusCode,
    content_type: &'static str,
    json: Vec<u8>,
) -> http::Response<ResponseBody> {
    let mut response = http::Response::new(Full::new(Bytes::from(json)));
    *response.status_mut() = status;
    response.headers_mut().insert(
        http::header::CONTENT_TYPE,
        http::HeaderValue::from_static(content_type),
    );
    response
}
