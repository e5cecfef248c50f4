//! Payload validation
//!
//! Turns raw bus bytes into an [`Order`]. Only the identifier is mandatory.

use thiserror::Error;

use super::Order;

/// Reasons a payload is rejected
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("malformed payload: {0}")]
    MalformedPayload(#[from] serde_json::Error),

    #[error("missing order_uid")]
    MissingIdentifier,
}

/// Decode `bytes` into an order
///
/// Fails with [`ValidationError::MalformedPayload`] when the bytes are not an
/// order document and with [`ValidationError::MissingIdentifier`] when
/// `order_uid` is empty or null. Any other `null` field decodes as its zero
/// value.
pub fn validate(bytes: &[u8]) -> Result<Order, ValidationError> {
    let order: Order = serde_json::from_slice(bytes)?;

    if order.order_uid.is_empty() {
        return Err(ValidationError::MissingIdentifier);
    }

    Ok(order)
}
