//! Request validation and routing.
//!
//! The gateway exposes four shapes of request:
//!
//! ```text
//! GET  /{bucket}/{key}
//! GET  /{bucket}?keys=k1,k2,k3
//! POST /{bucket}/{key}              (Content-Type: application/json)
//! POST /{bucket}/{key}?cas={u64}    (Content-Type: application/json)
//! ```
//!
//! Checks run in a fixed order: path shape, key source, bucket lookup, CAS
//! parameter, method, then the method-specific checks. The first failing
//! check decides the error code.

use bytes::Bytes;
use percent_encoding::percent_decode_str;

use kvgate_model::error::GatewayError;
use kvgate_model::operations::{DocumentMethod, DocumentOperation, SaveMode};

/// Media type required on document writes.
const JSON_MEDIA_TYPE: &str = "application/json";

/// Where the keys of a request come from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DocumentTarget {
    /// `/{bucket}/{key}`
    Key(String),
    /// `/{bucket}?keys=..`, never empty.
    Keys(Vec<String>),
}

/// A request that passed every check that does not need the body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoutingContext {
    /// Resolved bucket name, known to the registry.
    pub bucket: String,
    /// Validated method.
    pub method: DocumentMethod,
    /// Requested key(s).
    pub target: DocumentTarget,
    /// Write mode derived from the `cas` parameter.
    pub mode: SaveMode,
}

impl RoutingContext {
    /// Turn the context into an operation, attaching the request body for
    /// writes.
    ///
    /// # Errors
    ///
    /// `NoKeyProvided` for a write addressed at a key list, and
    /// `UnsupportedContentType` for a body that is not UTF-8 text.
    pub fn into_operation(self, body: Bytes) -> Result<DocumentOperation, GatewayError> {
        match (self.method, self.target) {
            (DocumentMethod::Get, DocumentTarget::Key(key)) => Ok(DocumentOperation::Get {
                bucket: self.bucket,
                keys: vec![key],
            }),
            (DocumentMethod::Get, DocumentTarget::Keys(keys)) => Ok(DocumentOperation::Get {
                bucket: self.bucket,
                keys,
            }),
            (DocumentMethod::Post, DocumentTarget::Key(key)) => {
                if std::str::from_utf8(&body).is_err() {
                    return Err(GatewayError::with_message(
                        kvgate_model::ErrorCode::UnsupportedContentType,
                        "Request body is not valid UTF-8 text",
                    ));
                }
                Ok(DocumentOperation::Save {
                    bucket: self.bucket,
                    key,
                    mode: self.mode,
                    value: body,
                })
            }
            (DocumentMethod::Post, DocumentTarget::Keys(_)) => {
                Err(GatewayError::no_document_key())
            }
        }
    }
}

/// Validate the request line and headers of a gateway request.
///
/// `bucket_exists` answers whether a bucket name is configured; it is only
/// consulted once the path has been split successfully.
///
/// # Errors
///
/// Returns the first validation failure, already mapped to its code.
pub fn resolve_request<B>(
    req: &http::Request<B>,
    bucket_exists: impl Fn(&str) -> bool,
) -> Result<RoutingContext, GatewayError> {
    let query_params = parse_query_params(req.uri().query().unwrap_or(""));

    // 1-3. Path shape and key source.
    let segments = split_path(req.uri().path());
    if segments.len() > 2 {
        return Err(GatewayError::invalid_resource());
    }
    let mut segments = segments.into_iter();
    let bucket = match segments.next() {
        Some(bucket) if !bucket.is_empty() => bucket,
        _ => return Err(GatewayError::no_bucket()),
    };
    let target = match segments.next() {
        Some(key) => DocumentTarget::Key(key),
        None => DocumentTarget::Keys(parse_keys_param(&query_params)?),
    };

    // 4. Bucket lookup.
    if !bucket_exists(&bucket) {
        return Err(GatewayError::unknown_bucket(&bucket));
    }

    // 5. CAS token.
    let mode = match query_value(&query_params, "cas") {
        Some(raw) => SaveMode::from_token(
            raw.parse::<u64>()
                .map_err(|_| GatewayError::invalid_cas(raw))?,
        ),
        None => SaveMode::Upsert,
    };

    // 6. Method.
    let method = DocumentMethod::from_name(req.method().as_str())
        .ok_or_else(|| GatewayError::unsupported_method(req.method().as_str()))?;

    // 7-8. Method-specific checks.
    if method == DocumentMethod::Post {
        if !matches!(target, DocumentTarget::Key(_)) {
            return Err(GatewayError::no_document_key());
        }
        let content_type = req
            .headers()
            .get(http::header::CONTENT_TYPE)
            .map(|v| String::from_utf8_lossy(v.as_bytes()).into_owned())
            .unwrap_or_default();
        if !content_type.to_ascii_lowercase().contains(JSON_MEDIA_TYPE) {
            return Err(GatewayError::unsupported_content_type(&content_type));
        }
    }

    Ok(RoutingContext {
        bucket,
        method,
        target,
        mode,
    })
}

/// Split a request path into decoded segments.
///
/// Trailing empty segments are ignored, so `/bucket/` addresses the bucket
/// and `/bucket/key/` addresses the key.
fn split_path(path: &str) -> Vec<String> {
    let trimmed = path.strip_prefix('/').unwrap_or(path);
    let mut segments: Vec<&str> = trimmed.split('/').collect();
    while segments.last().is_some_and(|s| s.is_empty()) {
        segments.pop();
    }
    segments.into_iter().map(decode_uri_component).collect()
}

/// Extract the key list from the `keys` query parameter.
fn parse_keys_param(params: &[(String, String)]) -> Result<Vec<String>, GatewayError> {
    let raw = query_value(params, "keys").ok_or_else(GatewayError::no_key_provided)?;
    let keys: Vec<String> = raw
        .split(',')
        .filter(|k| !k.is_empty())
        .map(str::to_owned)
        .collect();
    if keys.is_empty() {
        return Err(GatewayError::empty_keys_parameter());
    }
    Ok(keys)
}

fn decode_uri_component(s: &str) -> String {
    percent_decode_str(s).decode_utf8_lossy().into_owned()
}

/// Decode a form-encoded query component, where `+` stands for a space.
fn decode_query_component(s: &str) -> String {
    decode_uri_component(&s.replace('+', " "))
}

fn parse_query_params(query: &str) -> Vec<(String, String)> {
    query
        .split('&')
        .filter(|s| !s.is_empty())
        .map(|pair| match pair.split_once('=') {
            Some((k, v)) => (decode_query_component(k), decode_query_component(v)),
            None => (decode_query_component(pair), String::new()),
        })
        .collect()
}

/// First value of a query parameter; duplicates are ignored.
fn query_value<'a>(params: &'a [(String, String)], key: &str) -> Option<&'a str> {
    params
        .iter()
        .find(|(k, _)| k == key)
        .map(|(_, v)| v.as_str())
}
