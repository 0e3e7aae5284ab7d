//! Conversion of store failures into gateway errors.

use kvgate_model::error::GatewayError;

use crate::store::StoreError;

/// Convert a store error into an `OperationFailed` gateway error.
#[must_use]
pub fn store_error_to_gateway(e: StoreError) -> GatewayError {
    let message = match &e {
        StoreError::Interrupted(_) => "Interrupted while executing command",
        _ => "Unable to execute command",
    };
    GatewayError::operation_failed(message).with_source(e)
}
