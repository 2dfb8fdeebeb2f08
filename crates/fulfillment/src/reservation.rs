//! Stock reservation against a chosen warehouse.

use common::WarehouseId;
use domain::InventoryLevel;
use store::Store;

use crate::error::{FulfillmentError, Result};
use crate::selector::RequiredItem;

/// Reserves stock for order lines at one warehouse.
///
/// This is an at-least-reserve primitive: it never checks sufficiency, so
/// reservations can drive `reserved_qty` past `quantity` for a row. There is
/// no cross-item atomicity either; when a later line errors, earlier lines
/// stay reserved. Callers own compensation.
#[derive(Debug, Clone, Copy)]
pub struct ReservationManager {
    low_stock_alert: i64,
}

impl ReservationManager {
    /// Creates a manager that seeds lazily-created rows with the given
    /// low-stock threshold.
    pub fn new(low_stock_alert: i64) -> Self {
        Self { low_stock_alert }
    }

    /// Reserves every line at the warehouse, returning the updated rows in
    /// input order.
    #[tracing::instrument(skip(self, store, items), fields(warehouse = %warehouse_id))]
    pub async fn reserve<S: Store>(
        &self,
        store: &S,
        warehouse_id: WarehouseId,
        items: &[RequiredItem],
    ) -> Result<Vec<InventoryLevel>> {
        let mut levels = Vec::with_capacity(items.len());

        for item in items {
            store
                .ensure_inventory_level(item.variant_id, warehouse_id, self.low_stock_alert)
                .await
                .map_err(|e| FulfillmentError::ReservationFailed(e.to_string()))?;

            let level = store
                .reserve_stock(item.variant_id, warehouse_id, item.quantity)
                .await
                .map_err(|e| FulfillmentError::ReservationFailed(e.to_string()))?;

            if level.is_low_stock() {
                tracing::warn!(
                    variant = %level.variant_id,
                    available = level.available(),
                    threshold = level.low_stock_alert,
                    "stock at or below alert threshold"
                );
            }
            levels.push(level);
        }

        Ok(levels)
    }
}

impl Default for ReservationManager {
    fn default() -> Self {
        Self::new(5)
    }
}
