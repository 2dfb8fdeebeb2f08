//! Warehouse selection by distance and stock coverage.

use std::collections::HashMap;

use common::VariantId;
use domain::{haversine_km, Address, Geolocator, InventoryLevel, Warehouse};
use serde::{Deserialize, Serialize};
use store::Store;

use crate::error::{FulfillmentError, Result};

/// One line the selected warehouse must cover.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequiredItem {
    pub variant_id: VariantId,
    pub quantity: u32,
}

/// Per-variant availability gap at a degraded pick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockShortfall {
    pub available: i64,
    pub required: i64,
}

/// The selected warehouse with its distance and stock verdict.
///
/// `stock_available = false` is a soft signal, not an error: the nearest
/// warehouse is still returned so fulfillment can proceed in degraded mode,
/// with `stock_details` naming each variant's gap.
#[derive(Debug, Clone, PartialEq)]
pub struct WarehousePick {
    pub warehouse: Warehouse,
    pub distance_km: f64,
    pub stock_available: bool,
    pub stock_details: HashMap<VariantId, StockShortfall>,
}

/// Picks the fulfillment warehouse for a destination and item set.
#[derive(Debug, Clone, Copy, Default)]
pub struct WarehouseSelector {
    geolocator: Geolocator,
}

struct Candidate {
    warehouse: Warehouse,
    distance_km: f64,
    satisfies_all: bool,
    shortfalls: HashMap<VariantId, StockShortfall>,
}

impl WarehouseSelector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Selects a warehouse for the destination.
    ///
    /// Prefers the nearest warehouse whose inventory covers every required
    /// line. When none does, returns the nearest warehouse overall with
    /// `stock_available = false`. Errors only when no active warehouse
    /// exists at all.
    #[tracing::instrument(skip(self, store, destination, required))]
    pub async fn select<S: Store>(
        &self,
        store: &S,
        destination: &Address,
        required: &[RequiredItem],
    ) -> Result<WarehousePick> {
        let warehouses = store.active_warehouses().await?;
        if warehouses.is_empty() {
            return Err(FulfillmentError::NoWarehouseAvailable);
        }

        let dest = self
            .geolocator
            .locate(&destination.city, &destination.state, &destination.country);

        let mut candidates = Vec::with_capacity(warehouses.len());
        for warehouse in warehouses {
            let origin = self
                .geolocator
                .locate(&warehouse.city, &warehouse.state, &warehouse.country);
            let distance_km = haversine_km(origin, dest);

            let snapshot = store.inventory_for_warehouse(warehouse.id).await?;
            let by_variant: HashMap<VariantId, &InventoryLevel> =
                snapshot.iter().map(|level| (level.variant_id, level)).collect();

            let mut satisfies_all = true;
            let mut shortfalls = HashMap::new();
            for item in required {
                let needed = item.quantity as i64;
                // Missing row means the warehouse has never stocked the variant
                let (available, satisfied) = match by_variant.get(&item.variant_id) {
                    Some(level) => (level.available(), level.can_satisfy(needed)),
                    None => (0, false),
                };
                if !satisfied {
                    satisfies_all = false;
                }
                shortfalls.insert(
                    item.variant_id,
                    StockShortfall {
                        available,
                        required: needed,
                    },
                );
            }

            candidates.push(Candidate {
                warehouse,
                distance_km,
                satisfies_all,
                shortfalls,
            });
        }

        // Deterministic: distance first, warehouse id breaks exact ties
        candidates.sort_by(|a, b| {
            a.distance_km
                .total_cmp(&b.distance_km)
                .then_with(|| a.warehouse.id.cmp(&b.warehouse.id))
        });

        let pick = match candidates.iter().position(|c| c.satisfies_all) {
            Some(idx) => {
                let c = &candidates[idx];
                WarehousePick {
                    warehouse: c.warehouse.clone(),
                    distance_km: c.distance_km,
                    stock_available: true,
                    stock_details: HashMap::new(),
                }
            }
            None => {
                let c = &candidates[0];
                tracing::warn!(
                    warehouse = %c.warehouse.id,
                    distance_km = c.distance_km,
                    "no warehouse covers the full order, degrading to nearest"
                );
                WarehousePick {
                    warehouse: c.warehouse.clone(),
                    distance_km: c.distance_km,
                    stock_available: false,
                    stock_details: c.shortfalls.clone(),
                }
            }
        };

        tracing::info!(
            warehouse = %pick.warehouse.id,
            distance_km = pick.distance_km,
            stock_available = pick.stock_available,
            "warehouse selected"
        );
        Ok(pick)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::WarehouseId;
    use store::InMemoryStore;

    fn dest_austin() -> Address {
        Address::new("Ada", "1 Main St", "Austin", "TX", "78701", "US")
    }

    async fn seed_warehouse(store: &InMemoryStore, city: &str, state: &str) -> Warehouse {
        let warehouse = Warehouse::new(city, city, state, "US");
        store.insert_warehouse(&warehouse).await.unwrap();
        warehouse
    }

    async fn seed_stock(store: &InMemoryStore, variant_id: VariantId, wh: WarehouseId, qty: i64) {
        store
            .upsert_inventory_level(&InventoryLevel {
                variant_id,
                location_id: wh,
                quantity: qty,
                reserved_qty: 0,
                low_stock_alert: 5,
                sell_when_out_of_stock: false,
            })
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_no_active_warehouses_is_error() {
        let store = InMemoryStore::new();
        let selector = WarehouseSelector::new();

        let result = selector.select(&store, &dest_austin(), &[]).await;
        assert!(matches!(
            result,
            Err(FulfillmentError::NoWarehouseAvailable)
        ));
    }

    #[tokio::test]
    async fn test_nearest_stocked_warehouse_wins() {
        let store = InMemoryStore::new();
        let selector = WarehouseSelector::new();
        let variant_id = VariantId::new();

        let houston = seed_warehouse(&store, "Houston", "TX").await;
        let seattle = seed_warehouse(&store, "Seattle", "WA").await;
        seed_stock(&store, variant_id, houston.id, 10).await;
        seed_stock(&store, variant_id, seattle.id, 10).await;

        let pick = selector
            .select(
                &store,
                &dest_austin(),
                &[RequiredItem {
                    variant_id,
                    quantity: 5,
                }],
            )
            .await
            .unwrap();

        assert_eq!(pick.warehouse.id, houston.id);
        assert!(pick.stock_available);
        assert!(pick.stock_details.is_empty());
    }

    #[tokio::test]
    async fn test_farther_warehouse_preferred_when_it_has_stock() {
        let store = InMemoryStore::new();
        let selector = WarehouseSelector::new();
        let variant_id = VariantId::new();

        let houston = seed_warehouse(&store, "Houston", "TX").await;
        let seattle = seed_warehouse(&store, "Seattle", "WA").await;
        seed_stock(&store, variant_id, houston.id, 2).await;
        seed_stock(&store, variant_id, seattle.id, 50).await;

        let pick = selector
            .select(
                &store,
                &dest_austin(),
                &[RequiredItem {
                    variant_id,
                    quantity: 5,
                }],
            )
            .await
            .unwrap();

        assert_eq!(pick.warehouse.id, seattle.id);
        assert!(pick.stock_available);
    }

    #[tokio::test]
    async fn test_degraded_pick_when_nothing_satisfies() {
        let store = InMemoryStore::new();
        let selector = WarehouseSelector::new();
        let variant_id = VariantId::new();

        let houston = seed_warehouse(&store, "Houston", "TX").await;
        let seattle = seed_warehouse(&store, "Seattle", "WA").await;
        seed_stock(&store, variant_id, houston.id, 1).await;
        seed_stock(&store, variant_id, seattle.id, 2).await;

        let pick = selector
            .select(
                &store,
                &dest_austin(),
                &[RequiredItem {
                    variant_id,
                    quantity: 5,
                }],
            )
            .await
            .unwrap();

        // Nearest overall, flagged degraded, with the gap reported
        assert_eq!(pick.warehouse.id, houston.id);
        assert!(!pick.stock_available);
        let gap = pick.stock_details.get(&variant_id).unwrap();
        assert_eq!(gap.available, 1);
        assert_eq!(gap.required, 5);
    }

    #[tokio::test]
    async fn test_missing_inventory_row_counts_as_zero() {
        let store = InMemoryStore::new();
        let selector = WarehouseSelector::new();
        let variant_id = VariantId::new();

        seed_warehouse(&store, "Houston", "TX").await;

        let pick = selector
            .select(
                &store,
                &dest_austin(),
                &[RequiredItem {
                    variant_id,
                    quantity: 1,
                }],
            )
            .await
            .unwrap();

        assert!(!pick.stock_available);
        assert_eq!(pick.stock_details.get(&variant_id).unwrap().available, 0);
    }

    #[tokio::test]
    async fn test_oversell_flag_satisfies_any_quantity() {
        let store = InMemoryStore::new();
        let selector = WarehouseSelector::new();
        let variant_id = VariantId::new();

        let houston = seed_warehouse(&store, "Houston", "TX").await;
        store
            .upsert_inventory_level(&InventoryLevel {
                variant_id,
                location_id: houston.id,
                quantity: 0,
                reserved_qty: 0,
                low_stock_alert: 5,
                sell_when_out_of_stock: true,
            })
            .await
            .unwrap();

        let pick = selector
            .select(
                &store,
                &dest_austin(),
                &[RequiredItem {
                    variant_id,
                    quantity: 100,
                }],
            )
            .await
            .unwrap();

        assert!(pick.stock_available);
    }

    #[tokio::test]
    async fn test_empty_item_list_picks_nearest() {
        let store = InMemoryStore::new();
        let selector = WarehouseSelector::new();

        let houston = seed_warehouse(&store, "Houston", "TX").await;
        seed_warehouse(&store, "Seattle", "WA").await;

        let pick = selector.select(&store, &dest_austin(), &[]).await.unwrap();
        assert_eq!(pick.warehouse.id, houston.id);
        assert!(pick.stock_available);
    }
}
