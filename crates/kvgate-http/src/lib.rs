//! HTTP layer for KvGate.
//!
//! - **Router**: validates method, path, query and content type into a
//!   [`DocumentOperation`](kvgate_model::DocumentOperation)
//! - **Handler trait**: the boundary between HTTP and the store logic
//! - **Response encoder**: the fixed JSON wire format, errors included
//! - **Service**: hyper `Service` tying the pipeline together
#![allow(missing_docs)]

pub mod dispatch;
pub mod response;
pub mod router;
pub mod service;

pub use dispatch::DocumentHandler;
pub use response::ResponseBody;
pub use service::KvGateHttpService;
