//! Gateway error taxonomy.
//!
//! Every failure path, whether it is detected while validating the request or
//! while talking to the store, is reported as one of the numeric codes below.
//! The numbering is part of the wire contract: code 11 has never been assigned
//! and must stay unassigned.

use std::fmt;

/// Closed set of gateway error codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    /// Interrupted or failed while communicating with the store.
    OperationFailed,
    /// Resource path has more than bucket and key segments.
    InvalidResource,
    /// No bucket segment in the path.
    NoBucket,
    /// The bucket is not configured for this gateway.
    UnknownBucket,
    /// Neither a key segment nor a `keys` parameter was supplied.
    NoKeyProvided,
    /// The `keys` parameter split into zero keys.
    EmptyKeysParameter,
    /// An unreachable request state was reached.
    UnexpectedError,
    /// The `cas` parameter is not a non-negative 64-bit integer.
    InvalidCas,
    /// POST without an `application/json` content type.
    UnsupportedContentType,
    /// Method other than GET or POST.
    UnsupportedMethod,
    /// The store rejected an unconditional save.
    SaveFailed,
    /// The document was modified since the supplied CAS token was issued.
    CasConflict,
    /// The document does not exist.
    DocumentNotFound,
}

impl ErrorCode {
    /// Every defined code, in ascending numeric order.
    pub const ALL: [Self; 13] = [
        Self::OperationFailed,
        Self::InvalidResource,
        Self::NoBucket,
        Self::UnknownBucket,
        Self::NoKeyProvided,
        Self::EmptyKeysParameter,
        Self::UnexpectedError,
        Self::InvalidCas,
        Self::UnsupportedContentType,
        Self::UnsupportedMethod,
        Self::SaveFailed,
        Self::CasConflict,
        Self::DocumentNotFound,
    ];

    /// Returns the numeric code sent on the wire.
    #[must_use]
    pub fn code(&self) -> u32 {
        match self {
            Self::OperationFailed => 1,
            Self::InvalidResource => 2,
            Self::NoBucket | Self::UnknownBucket => 3,
            Self::NoKeyProvided => 4,
            Self::EmptyKeysParameter => 5,
            Self::UnexpectedError => 6,
            Self::InvalidCas => 7,
            Self::UnsupportedContentType => 8,
            Self::UnsupportedMethod => 9,
            Self::SaveFailed => 10,
            Self::CasConflict => 12,
            Self::DocumentNotFound => 13,
        }
    }

    /// Returns the short symbolic name of the code.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::OperationFailed => "OperationFailed",
            Self::InvalidResource => "InvalidResource",
            Self::NoBucket => "NoBucket",
            Self::UnknownBucket => "UnknownBucket",
            Self::NoKeyProvided => "NoKeyProvided",
            Self::EmptyKeysParameter => "EmptyKeysParameter",
            Self::UnexpectedError => "UnexpectedError",
            Self::InvalidCas => "InvalidCas",
            Self::UnsupportedContentType => "UnsupportedContentType",
            Self::UnsupportedMethod => "UnsupportedMethod",
            Self::SaveFailed => "SaveFailed",
            Self::CasConflict => "CasConflict",
            Self::DocumentNotFound => "DocumentNotFound",
        }
    }

    /// Returns the message used when no more specific one is available.
    #[must_use]
    pub fn default_message(&self) -> &'static str {
        match self {
            Self::OperationFailed => "Unable to execute command",
            Self::InvalidResource => "Invalid resource",
            Self::NoBucket => "No bucket provided",
            Self::UnknownBucket => "Unknown bucket",
            Self::NoKeyProvided => {
                "Either document key as a resource or keys as 'keys' parameters must be provided"
            }
            Self::EmptyKeysParameter => {
                "No documents keys. Either document key as a resource or keys as 'keys' \
                 parameters must be provided"
            }
            Self::UnexpectedError => "Unexpected internal error",
            Self::InvalidCas => "Invalid CAS value",
            Self::UnsupportedContentType => "Unsupported content type",
            Self::UnsupportedMethod => "Unsupported method type",
            Self::SaveFailed => "Unable to save document",
            Self::CasConflict => "CAS value mismatch, the document has been modified",
            Self::DocumentNotFound => "No such document",
        }
    }

    /// Returns the HTTP status the error is reported with.
    ///
    /// Store-tier outcomes keep `200 OK`: the request itself was well formed
    /// and the failure is reported in the body only.
    #[must_use]
    pub fn default_status_code(&self) -> http::StatusCode {
        match self {
            Self::NoBucket | Self::UnknownBucket => http::StatusCode::NOT_FOUND,
            Self::UnexpectedError => http::StatusCode::INTERNAL_SERVER_ERROR,
            Self::OperationFailed
            | Self::SaveFailed
            | Self::CasConflict
            | Self::DocumentNotFound => http::StatusCode::OK,
            Self::InvalidResource
            | Self::NoKeyProvided
            | Self::EmptyKeysParameter
            | Self::InvalidCas
            | Self::UnsupportedContentType
            | Self::UnsupportedMethod => http::StatusCode::BAD_REQUEST,
        }
    }

    /// Whether the code reports a problem with the downstream store rather
    /// than with the request.
    #[must_use]
    pub fn is_store_failure(&self) -> bool {
        matches!(
            self,
            Self::OperationFailed | Self::SaveFailed | Self::CasConflict
        )
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A gateway error: a code from the taxonomy plus a human-readable message.
#[derive(Debug)]
pub struct GatewayError {
    /// The error code.
    pub code: ErrorCode,
    /// A human-readable error message.
    pub message: String,
    /// The HTTP status code.
    pub status_code: http::StatusCode,
    /// The underlying source error, if any.
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl fmt::Display for GatewayError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "GatewayError({}/{}): {}",
            self.code,
            self.code.code(),
            self.message
        )
    }
}

impl std::error::Error for GatewayError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source
            .as_ref()
            .map(|e| e.as_ref() as &(dyn std::error::Error + 'static))
    }
}

impl GatewayError {
    /// Create a new `GatewayError` carrying the code's default message.
    #[must_use]
    pub fn new(code: ErrorCode) -> Self {
        Self::with_message(code, code.default_message())
    }

    /// Create a new `GatewayError` with a custom message.
    #[must_use]
    pub fn with_message(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            status_code: code.default_status_code(),
            message: message.into(),
            code,
            source: None,
        }
    }

    /// Set the source error.
    #[must_use]
    pub fn with_source(mut self, source: impl std::error::Error + Send + Sync + 'static) -> Self {
        self.source = Some(Box::new(source));
        self
    }

    // -- Convenience constructors --

    /// Path has more than two segments.
    #[must_use]
    pub fn invalid_resource() -> Self {
        Self::new(ErrorCode::InvalidResource)
    }

    /// Path has no bucket segment.
    #[must_use]
    pub fn no_bucket() -> Self {
        Self::new(ErrorCode::NoBucket)
    }

    /// Bucket is not in the registry.
    #[must_use]
    pub fn unknown_bucket(bucket: &str) -> Self {
        Self::with_message(ErrorCode::UnknownBucket, format!("Unknown bucket [{bucket}]"))
    }

    /// No key segment and no usable `keys` parameter.
    #[must_use]
    pub fn no_key_provided() -> Self {
        Self::new(ErrorCode::NoKeyProvided)
    }

    /// POST addressed at a bucket rather than a document.
    #[must_use]
    pub fn no_document_key() -> Self {
        Self::with_message(ErrorCode::NoKeyProvided, "No document key")
    }

    /// The `keys` parameter held no keys.
    #[must_use]
    pub fn empty_keys_parameter() -> Self {
        Self::new(ErrorCode::EmptyKeysParameter)
    }

    /// Unreachable internal state.
    #[must_use]
    pub fn unexpected(detail: impl fmt::Display) -> Self {
        Self::with_message(
            ErrorCode::UnexpectedError,
            format!("Unexpected error #{detail}"),
        )
    }

    /// Unparseable `cas` parameter.
    #[must_use]
    pub fn invalid_cas(raw: &str) -> Self {
        Self::with_message(ErrorCode::InvalidCas, format!("Invalid CAS value [{raw}]"))
    }

    /// POST with a content type other than JSON.
    #[must_use]
    pub fn unsupported_content_type(content_type: &str) -> Self {
        Self::with_message(
            ErrorCode::UnsupportedContentType,
            format!("Unsupported content type [{content_type}]"),
        )
    }

    /// Method other than GET or POST.
    #[must_use]
    pub fn unsupported_method(method: &str) -> Self {
        Self::with_message(
            ErrorCode::UnsupportedMethod,
            format!("Unsupported method type [{method}]"),
        )
    }

    /// Store call failed or was interrupted.
    #[must_use]
    pub fn operation_failed(message: impl Into<String>) -> Self {
        Self::with_message(ErrorCode::OperationFailed, message)
    }

    /// Store refused an unconditional save.
    #[must_use]
    pub fn save_failed() -> Self {
        Self::new(ErrorCode::SaveFailed)
    }

    /// CAS token no longer matches the stored document.
    #[must_use]
    pub fn cas_conflict() -> Self {
        Self::new(ErrorCode::CasConflict)
    }
}

/// Create a `GatewayError` from an error code.
///
/// # Examples
///
/// ```
/// use kvgate_model::gateway_error;
/// use kvgate_model::error::ErrorCode;
///
/// let err = gateway_error!(InvalidResource);
/// assert_eq!(err.code, ErrorCode::InvalidResource);
///
/// let err = gateway_error!(SaveFailed, "store said no");
/// assert_eq!(err.message, "store said no");
/// ```
#[macro_export]
macro_rules! gateway_error {
    ($code:ident) => {
        $crate::error::GatewayError::new($crate::error::ErrorCode::$code)
    };
    ($code:ident, $msg:expr) => {
        $crate::error::GatewayError::with_message($crate::error::ErrorCode::$code, $msg)
    };
}
