//! KvGate core: bucket registry, store backends and the translation of
//! validated operations into store calls.
#![allow(missing_docs, clippy::doc_markdown, clippy::module_name_repetitions)]

pub mod config;
pub mod error;
pub mod handler;
pub mod provider;
pub mod registry;
pub mod store;
