//! Order entities and the order status machine.

use chrono::{DateTime, Utc};
use common::{AddressId, CustomerId, OrderId, VariantId};
use serde::{Deserialize, Serialize};

use crate::money::Money;

/// The status of an order in its lifecycle.
///
/// Status transitions driven by the payment orchestrator:
/// ```text
/// Pending ──► Processing ──► Shipped ──► Delivered
///    │
///    └──► Cancelled
/// ```
/// Declined and held payment attempts leave the order in `Pending` so the
/// failure stays auditable against a real order id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum OrderStatus {
    /// Order exists but payment has not cleared (also the decline/held state).
    #[default]
    Pending,

    /// Payment approved, order is being fulfilled.
    Processing,

    /// Order handed to a carrier.
    Shipped,

    /// Order delivered (terminal state).
    Delivered,

    /// Order was cancelled (terminal state).
    Cancelled,
}

impl OrderStatus {
    /// Returns true if this is a terminal state.
    pub fn is_terminal(&self) -> bool {
        matches!(self, OrderStatus::Delivered | OrderStatus::Cancelled)
    }

    /// Returns true if a payment attempt may run against the order.
    pub fn can_attempt_payment(&self) -> bool {
        matches!(self, OrderStatus::Pending)
    }

    /// Returns the status name as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "Pending",
            OrderStatus::Processing => "Processing",
            OrderStatus::Shipped => "Shipped",
            OrderStatus::Delivered => "Delivered",
            OrderStatus::Cancelled => "Cancelled",
        }
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for OrderStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Pending" => Ok(OrderStatus::Pending),
            "Processing" => Ok(OrderStatus::Processing),
            "Shipped" => Ok(OrderStatus::Shipped),
            "Delivered" => Ok(OrderStatus::Delivered),
            "Cancelled" => Ok(OrderStatus::Cancelled),
            other => Err(format!("unknown order status: {other}")),
        }
    }
}

/// A persisted order with its authoritative financial totals.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub customer_id: CustomerId,
    pub status: OrderStatus,
    pub subtotal: Money,
    pub discount_amount: Money,
    pub shipping_amount: Money,
    pub tax_amount: Money,
    pub total_amount: Money,
    pub billing_address_id: AddressId,
    pub shipping_address_id: AddressId,
    pub created_at: DateTime<Utc>,
}

/// A line item on an order. Immutable once the order is created.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderItem {
    pub order_id: OrderId,
    pub variant_id: VariantId,
    pub quantity: u32,
    pub unit_price: Money,
    pub total_price: Money,
    /// Effective unit price when a bulk tier matched the quantity.
    pub bulk_unit_price: Option<Money>,
    /// Line total at the bulk unit price, when one matched.
    pub bulk_total_price: Option<Money>,
}

/// Human-readable audit note attached to an order.
///
/// The notes are the audit trail for automated decisions: fee breakdowns,
/// failure reasons, provenance of cart-derived orders.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderNote {
    pub order_id: OrderId,
    pub note: String,
    pub is_internal: bool,
    pub created_at: DateTime<Utc>,
}

impl OrderNote {
    /// Creates an internal note timestamped now.
    pub fn internal(order_id: OrderId, note: impl Into<String>) -> Self {
        Self {
            order_id,
            note: note.into(),
            is_internal: true,
            created_at: Utc::now(),
        }
    }
}
