use thiserror::Error;

use super::order::OrderStatus;

#[derive(Debug, Error)]
pub enum DomainError {
    #[error("Not found")]
    NotFound,
    #[error("Cart items not found: {0:?}")]
    CartItemsNotFound(Vec<i64>),
    #[error("Cart is empty")]
    EmptyCart,
    #[error("Insufficient stock for '{product}': only {available} available")]
    InsufficientStock { product: String, available: i32 },
    #[error("Permission denied")]
    PermissionDenied,
    #[error("Invalid or expired link token")]
    InvalidToken,
    #[error("Cannot change order status from {from} to {to}")]
    InvalidStatusTransition { from: OrderStatus, to: OrderStatus },
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Failure to deliver one seller notification. Logged, never surfaced to buyers.
#[derive(Debug, Error)]
pub enum NotificationError {
    #[error("Notification delivery failed: {0}")]
    DeliveryFailed(String),
    #[error("Messaging channel rejected the message ({status}): {description}")]
    Rejected { status: u16, description: String },
    #[error("Notification timed out after {0:?}")]
    Timeout(std::time::Duration),
}
