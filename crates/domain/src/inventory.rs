//! Per-warehouse inventory rows.

use common::{VariantId, WarehouseId};
use serde::{Deserialize, Serialize};

/// Stock counters for one (variant, warehouse) pair.
///
/// Rows are created lazily on first reservation at a warehouse and mutated
/// in place thereafter, never deleted. `reserved_qty` may transiently exceed
/// `quantity` when `sell_when_out_of_stock` is set for the row; that is a
/// tolerated backorder state, not corruption.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InventoryLevel {
    pub variant_id: VariantId,
    pub location_id: WarehouseId,
    /// Units physically on hand.
    pub quantity: i64,
    /// Units committed to open orders but not yet shipped.
    pub reserved_qty: i64,
    pub low_stock_alert: i64,
    pub sell_when_out_of_stock: bool,
}

impl InventoryLevel {
    /// Creates an empty row for a lazily-initialized (variant, warehouse) pair.
    pub fn empty(variant_id: VariantId, location_id: WarehouseId, low_stock_alert: i64) -> Self {
        Self {
            variant_id,
            location_id,
            quantity: 0,
            reserved_qty: 0,
            low_stock_alert,
            sell_when_out_of_stock: false,
        }
    }

    /// Units actually available to promise: `max(0, quantity - reserved_qty)`.
    pub fn available(&self) -> i64 {
        (self.quantity - self.reserved_qty).max(0)
    }

    /// Returns true if the row can cover `required` more units, either from
    /// available stock or via its oversell allowance.
    pub fn can_satisfy(&self, required: i64) -> bool {
        self.sell_when_out_of_stock || self.available() >= required
    }

    /// Returns true if available stock has dropped to the alert threshold.
    pub fn is_low_stock(&self) -> bool {
        self.available() <= self.low_stock_alert
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(quantity: i64, reserved: i64) -> InventoryLevel {
        InventoryLevel {
            variant_id: VariantId::new(),
            location_id: WarehouseId::new(),
            quantity,
            reserved_qty: reserved,
            low_stock_alert: 5,
            sell_when_out_of_stock: false,
        }
    }

    #[test]
    fn test_available_subtracts_reservations() {
        assert_eq!(row(10, 3).available(), 7);
    }

    #[test]
    fn test_available_clamps_at_zero_when_overreserved() {
        // Oversold rows report zero available, not a negative count
        assert_eq!(row(5, 9).available(), 0);
    }

    #[test]
    fn test_can_satisfy_from_stock() {
        assert!(row(10, 3).can_satisfy(7));
        assert!(!row(10, 3).can_satisfy(8));
    }

    #[test]
    fn test_oversell_flag_permits_any_quantity() {
        let mut r = row(0, 0);
        r.sell_when_out_of_stock = true;
        assert!(r.can_satisfy(1000));
    }

    #[test]
    fn test_empty_row_has_no_stock() {
        let r = InventoryLevel::empty(VariantId::new(), WarehouseId::new(), 5);
        assert_eq!(r.quantity, 0);
        assert_eq!(r.reserved_qty, 0);
        assert_eq!(r.available(), 0);
        assert!(!r.can_satisfy(1));
    }

    #[test]
    fn test_low_stock_threshold() {
        assert!(row(6, 2).is_low_stock());
        assert!(!row(20, 2).is_low_stock());
    }
}
