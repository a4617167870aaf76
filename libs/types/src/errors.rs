//! Error taxonomy shared across the OBM services
//!
//! Validation rejections are surfaced to the producer through the queue's
//! reply channel; they never reach the WAL or mutate the book.

use crate::ids::OrderId;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Reasons a request is rejected during validation
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum RejectReason {
    #[error("price must be a positive paise amount")]
    InvalidPrice,

    #[error("quantity must be positive")]
    InvalidQuantity,

    #[error("unrecognized side: {0} (expected +1 or -1)")]
    UnknownSide(i8),

    #[error("order id required for this operation")]
    MissingOrderId,

    /// Covers both never-seen and no-longer-live targets: terminal orders
    /// leave the book immediately, so neither can be modified or cancelled.
    #[error("order {order_id} not found on the book")]
    UnknownOrder { order_id: OrderId },

    #[error("order {order_id} is already live on the book")]
    DuplicateOrder { order_id: OrderId },
}
