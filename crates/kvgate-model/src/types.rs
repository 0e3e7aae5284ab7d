//! Documents, store outcomes and their JSON wire shapes.

use std::borrow::Cow;

use bytes::Bytes;
use serde::Serialize;

use crate::error::GatewayError;

/// A document as returned by a store lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    /// Document key.
    pub key: String,
    /// Opaque value, never re-parsed by the gateway.
    pub value: Bytes,
    /// CAS token of the stored revision.
    pub cas: u64,
}

/// Outcome of a compare-and-swap write as reported by the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CasOutcome {
    /// The token matched and the value was written.
    Matched,
    /// No document exists under the key.
    NotFound,
    /// Another writer changed the document since the token was issued.
    Conflict,
}

/// `{"code": .., "message": ..}`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorBody {
    /// Numeric error code.
    pub code: u32,
    /// Human-readable message.
    pub message: Cow<'static, str>,
}

/// Shared body for the most frequent error. Never mutated, reused by every
/// request that hits a missing key.
pub static DOCUMENT_NOT_FOUND: ErrorBody = ErrorBody {
    code: 13,
    message: Cow::Borrowed("No such document"),
};

impl From<&GatewayError> for ErrorBody {
    fn from(err: &GatewayError) -> Self {
        Self {
            code: err.code.code(),
            message: Cow::Owned(err.message.clone()),
        }
    }
}

/// `{"err": {..}}`, the single error envelope used by every failure path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorEnvelope {
    /// The error.
    pub err: ErrorBody,
}

impl From<&GatewayError> for ErrorEnvelope {
    fn from(err: &GatewayError) -> Self {
        Self {
            err: ErrorBody::from(err),
        }
    }
}

/// One element of a GET response array.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum DocumentOutcome {
    /// The document exists.
    Found {
        /// Document key.
        key: String,
        /// CAS token of the returned revision.
        cas: u64,
        /// Raw document text.
        doc: String,
    },
    /// The key is absent from the bucket.
    Missing {
        /// Always [`DOCUMENT_NOT_FOUND`].
        err: &'static ErrorBody,
    },
    /// The lookup for this key failed; other keys are unaffected.
    Failed {
        /// Failure details.
        err: ErrorBody,
    },
}

impl DocumentOutcome {
    /// Build the outcome for a located document.
    #[must_use]
    pub fn found(document: Document) -> Self {
        Self::Found {
            doc: String::from_utf8_lossy(&document.value).into_owned(),
            key: document.key,
            cas: document.cas,
        }
    }

    /// Build the outcome for a missing key.
    #[must_use]
    pub fn missing() -> Self {
        Self::Missing {
            err: &DOCUMENT_NOT_FOUND,
        }
    }

    /// Build the outcome for a failed lookup.
    #[must_use]
    pub fn failed(err: &GatewayError) -> Self {
        Self::Failed {
            err: ErrorBody::from(err),
        }
    }
}

/// Successful result of a [`DocumentOperation`](crate::DocumentOperation).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OperationResult {
    /// Per-key outcomes of a GET, in request order.
    Documents(Vec<DocumentOutcome>),
    /// A POST was accepted; encoded as `{}`.
    Saved,
}
