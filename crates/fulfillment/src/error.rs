//! Fulfillment error types.

use store::StoreError;
use thiserror::Error;

/// Errors that can occur during checkout orchestration.
///
/// Gateway declines are NOT errors: once a charge attempt ran, the outcome
/// is reported through `CheckoutOutcome { success: false }` with full audit
/// rows. Only pre-charge rejections and infrastructure failures surface here.
#[derive(Debug, Error)]
pub enum FulfillmentError {
    /// The checkout request is malformed or references missing data.
    #[error("Validation failed: {0}")]
    Validation(String),

    /// A matching charge was already taken inside the duplicate window.
    #[error("Duplicate charge rejected: {0}")]
    DuplicateCharge(String),

    /// No active warehouse exists to fulfill from.
    #[error("No warehouse available")]
    NoWarehouseAvailable,

    /// The payment gateway could not be reached (transport error or timeout).
    #[error("Payment gateway unreachable: {0}")]
    GatewayUnreachable(String),

    /// The carrier rate service failed or returned no usable quotes.
    #[error("Rate service error: {0}")]
    RateService(String),

    /// A stock reservation could not be taken. Caught internally after a
    /// successful charge and resolved through the fallback path.
    #[error("Reservation failed: {0}")]
    ReservationFailed(String),

    /// Store error.
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// Serialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Convenience type alias for fulfillment results.
pub type Result<T> = std::result::Result<T, FulfillmentError>;
