//! Validated request descriptors.
//!
//! A [`DocumentOperation`] is what the request parser hands to the business
//! logic once every shape check has passed. It is owned by a single request
//! and dropped once the response is written.

use std::fmt;

use bytes::Bytes;

/// HTTP methods the gateway understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DocumentMethod {
    /// Read one or more documents.
    Get,
    /// Write a single document.
    Post,
}

impl DocumentMethod {
    /// Parse a method name, ignoring ASCII case.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        if name.eq_ignore_ascii_case("get") {
            Some(Self::Get)
        } else if name.eq_ignore_ascii_case("post") {
            Some(Self::Post)
        } else {
            None
        }
    }

    /// Returns the canonical upper-case method name.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
        }
    }
}

impl fmt::Display for DocumentMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How a document write interacts with the value already stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveMode {
    /// Overwrite unconditionally, creating the document if needed.
    Upsert,
    /// Write only if the stored CAS token still equals this one.
    CompareAndSwap(u64),
}

impl SaveMode {
    /// Build the mode from a raw CAS token, where `0` means "no CAS check".
    #[must_use]
    pub fn from_token(cas: u64) -> Self {
        if cas == 0 {
            Self::Upsert
        } else {
            Self::CompareAndSwap(cas)
        }
    }
}

/// A fully validated gateway operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DocumentOperation {
    /// Fetch documents, one store lookup per key, in request order.
    Get {
        /// Target bucket.
        bucket: String,
        /// Keys to fetch. Never empty.
        keys: Vec<String>,
    },
    /// Store a single document.
    Save {
        /// Target bucket.
        bucket: String,
        /// Document key.
        key: String,
        /// Unconditional or CAS-qualified write.
        mode: SaveMode,
        /// Document body, passed through untouched.
        value: Bytes,
    },
}

impl DocumentOperation {
    /// The bucket this operation targets.
    #[must_use]
    pub fn bucket(&self) -> &str {
        match self {
            Self::Get { bucket, .. } | Self::Save { bucket, .. } => bucket,
        }
    }

    /// The method this operation was issued with.
    #[must_use]
    pub fn method(&self) -> DocumentMethod {
        match self {
            Self::Get { .. } => DocumentMethod::Get,
            Self::Save { .. } => DocumentMethod::Post,
        }
    }
}
