//! Carts — the source of truth for checkouts with no order id yet.

use common::{CartId, CustomerId, VariantId};
use serde::{Deserialize, Serialize};

use crate::money::Money;

/// An active shopping cart.
///
/// Cleared only after an order is successfully created from it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cart {
    pub id: CartId,
    pub customer_id: CustomerId,
}

impl Cart {
    /// Creates a cart for a customer.
    pub fn new(customer_id: CustomerId) -> Self {
        Self {
            id: CartId::new(),
            customer_id,
        }
    }
}

/// A line in a cart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartItem {
    pub cart_id: CartId,
    pub variant_id: VariantId,
    pub quantity: u32,
    pub unit_price: Money,
}
