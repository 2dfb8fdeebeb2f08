//! Payment ledger entities.

use chrono::{DateTime, Utc};
use common::{OrderId, PaymentId, TransactionId};
use serde::{Deserialize, Serialize};

use crate::money::Money;

/// The settlement status of a transaction or payment row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum PaymentStatus {
    /// Authorization succeeded but settlement is deferred (held for review).
    #[default]
    Pending,

    /// Funds captured.
    Completed,

    /// Declined or unreachable gateway.
    Failed,
}

impl PaymentStatus {
    /// Returns the status name as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Pending => "Pending",
            PaymentStatus::Completed => "Completed",
            PaymentStatus::Failed => "Failed",
        }
    }
}

impl std::fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for PaymentStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Pending" => Ok(PaymentStatus::Pending),
            "Completed" => Ok(PaymentStatus::Completed),
            "Failed" => Ok(PaymentStatus::Failed),
            other => Err(format!("unknown payment status: {other}")),
        }
    }
}

/// Append-only ledger row for one gateway conversation.
///
/// Never mutated after creation: every attempt, successful or not, leaves
/// exactly one row behind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    pub id: TransactionId,
    pub order_id: OrderId,
    pub amount: Money,
    pub payment_status: PaymentStatus,
    pub gateway_name: String,
    pub gateway_transaction_id: String,
    /// Bounded serialized diagnostic blob from the gateway.
    pub gateway_response: String,
    pub created_at: DateTime<Utc>,
}

/// Maximum bytes of gateway diagnostics carried on a transaction row.
pub const GATEWAY_RESPONSE_MAX_LEN: usize = 1024;

impl Transaction {
    /// Truncates a gateway diagnostic blob to the ledger bound.
    pub fn bound_gateway_response(blob: &str) -> String {
        if blob.len() <= GATEWAY_RESPONSE_MAX_LEN {
            blob.to_string()
        } else {
            // Truncate on a char boundary
            let mut end = GATEWAY_RESPONSE_MAX_LEN;
            while !blob.is_char_boundary(end) {
                end -= 1;
            }
            blob[..end].to_string()
        }
    }
}

/// Append-only record of one payment attempt, one row per attempt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Payment {
    pub id: PaymentId,
    pub order_id: OrderId,
    pub payment_method: String,
    pub provider: String,
    pub transaction_id: TransactionId,
    pub amount: Money,
    pub currency: String,
    pub status: PaymentStatus,
    /// Set only when funds were actually captured.
    pub paid_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_status_is_pending() {
        assert_eq!(PaymentStatus::default(), PaymentStatus::Pending);
    }

    #[test]
    fn test_display() {
        assert_eq!(PaymentStatus::Pending.to_string(), "Pending");
        assert_eq!(PaymentStatus::Completed.to_string(), "Completed");
        assert_eq!(PaymentStatus::Failed.to_string(), "Failed");
    }

    #[test]
    fn test_bound_gateway_response_short_blob_untouched() {
        let blob = r#"{"responseCode":1}"#;
        assert_eq!(Transaction::bound_gateway_response(blob), blob);
    }

    #[test]
    fn test_bound_gateway_response_truncates() {
        let blob = "x".repeat(GATEWAY_RESPONSE_MAX_LEN + 100);
        let bounded = Transaction::bound_gateway_response(&blob);
        assert_eq!(bounded.len(), GATEWAY_RESPONSE_MAX_LEN);
    }

    #[test]
    fn test_bound_gateway_response_respects_char_boundaries() {
        let blob = "é".repeat(GATEWAY_RESPONSE_MAX_LEN);
        let bounded = Transaction::bound_gateway_response(&blob);
        assert!(bounded.len() <= GATEWAY_RESPONSE_MAX_LEN);
        assert!(bounded.chars().all(|c| c == 'é'));
    }

    #[test]
    fn test_status_serialization_roundtrip() {
        let status = PaymentStatus::Failed;
        let json = serde_json::to_string(&status).unwrap();
        let back: PaymentStatus = serde_json::from_str(&json).unwrap();
        assert_eq!(status, back);
    }
}
