//! Model types for KvGate.
//!
//! This crate holds the vocabulary shared by the HTTP layer and the store
//! layer: the numeric error taxonomy, validated operation descriptors, and
//! the JSON wire shapes of documents and errors.
#![allow(clippy::module_name_repetitions)]

pub mod error;
pub mod operations;
pub mod types;

pub use error::{ErrorCode, GatewayError};
pub use operations::{DocumentMethod, DocumentOperation, SaveMode};
pub use types::{
    CasOutcome, Document, DocumentOutcome, ErrorBody, ErrorEnvelope, OperationResult,
};
