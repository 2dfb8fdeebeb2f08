use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::{AddressId, CartId, CustomerId, OrderId, VariantId, WarehouseId};
use domain::{
    Address, Cart, CartItem, Customer, InventoryLevel, Order, OrderItem, OrderNote, OrderStatus,
    Payment, ShippingTier, Transaction, Variant, Warehouse,
};
use tokio::sync::RwLock;

use crate::{Result, Store, StoreError};

#[derive(Debug, Default)]
struct State {
    orders: HashMap<OrderId, Order>,
    order_items: Vec<OrderItem>,
    addresses: HashMap<AddressId, Address>,
    transactions: Vec<Transaction>,
    payments: Vec<Payment>,
    notes: Vec<OrderNote>,
    inventory: HashMap<(VariantId, WarehouseId), InventoryLevel>,
    warehouses: Vec<Warehouse>,
    variants: HashMap<VariantId, Variant>,
    customers: HashMap<CustomerId, Customer>,
    shipping_tiers: Vec<ShippingTier>,
    carts: HashMap<CartId, Cart>,
    cart_items: Vec<CartItem>,
}

/// In-memory store implementation for testing.
///
/// Provides the same interface as the PostgreSQL implementation. The
/// `reserve_stock` increment runs under a single write-lock acquisition, so
/// concurrent reservations serialize exactly as they do at the database.
#[derive(Clone, Default)]
pub struct InMemoryStore {
    state: Arc<RwLock<State>>,
    fail_on_reserve: Arc<AtomicBool>,
}

impl InMemoryStore {
    /// Creates a new empty in-memory store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Configures `reserve_stock` to fail until reset. Lets tests exercise
    /// the orchestrator's emergency fallback path.
    pub fn set_fail_on_reserve(&self, fail: bool) {
        self.fail_on_reserve.store(fail, Ordering::SeqCst);
    }

    /// Returns the number of transaction ledger rows.
    pub async fn transaction_count(&self) -> usize {
        self.state.read().await.transactions.len()
    }

    /// Returns the number of payment rows.
    pub async fn payment_count(&self) -> usize {
        self.state.read().await.payments.len()
    }

    /// Returns the number of order rows.
    pub async fn order_count(&self) -> usize {
        self.state.read().await.orders.len()
    }

    /// Returns the total reserved quantity across all inventory rows.
    pub async fn total_reserved(&self) -> i64 {
        self.state
            .read()
            .await
            .inventory
            .values()
            .map(|level| level.reserved_qty)
            .sum()
    }
}

#[async_trait]
impl Store for InMemoryStore {
    async fn insert_order(&self, order: &Order) -> Result<()> {
        self.state
            .write()
            .await
            .orders
            .insert(order.id, order.clone());
        Ok(())
    }

    async fn get_order(&self, order_id: OrderId) -> Result<Option<Order>> {
        Ok(self.state.read().await.orders.get(&order_id).cloned())
    }

    async fn set_order_status(&self, order_id: OrderId, status: OrderStatus) -> Result<()> {
        let mut state = self.state.write().await;
        let order = state
            .orders
            .get_mut(&order_id)
            .ok_or_else(|| StoreError::NotFound("order", order_id.to_string()))?;
        order.status = status;
        Ok(())
    }

    async fn insert_order_items(&self, items: &[OrderItem]) -> Result<()> {
        self.state
            .write()
            .await
            .order_items
            .extend_from_slice(items);
        Ok(())
    }

    async fn order_items(&self, order_id: OrderId) -> Result<Vec<OrderItem>> {
        Ok(self
            .state
            .read()
            .await
            .order_items
            .iter()
            .filter(|item| item.order_id == order_id)
            .cloned()
            .collect())
    }

    async fn insert_address(&self, address: &Address) -> Result<()> {
        self.state
            .write()
            .await
            .addresses
            .insert(address.id, address.clone());
        Ok(())
    }

    async fn get_address(&self, address_id: AddressId) -> Result<Option<Address>> {
        Ok(self.state.read().await.addresses.get(&address_id).cloned())
    }

    async fn insert_transaction(&self, transaction: &Transaction) -> Result<()> {
        self.state
            .write()
            .await
            .transactions
            .push(transaction.clone());
        Ok(())
    }

    async fn transactions_since(
        &self,
        gateway_name: &str,
        cutoff: DateTime<Utc>,
    ) -> Result<Vec<Transaction>> {
        let state = self.state.read().await;
        let mut matches: Vec<Transaction> = state
            .transactions
            .iter()
            .filter(|tx| tx.gateway_name == gateway_name && tx.created_at >= cutoff)
            .cloned()
            .collect();
        matches.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(matches)
    }

    async fn insert_payment(&self, payment: &Payment) -> Result<()> {
        self.state.write().await.payments.push(payment.clone());
        Ok(())
    }

    async fn insert_order_note(&self, note: &OrderNote) -> Result<()> {
        self.state.write().await.notes.push(note.clone());
        Ok(())
    }

    async fn order_notes(&self, order_id: OrderId) -> Result<Vec<OrderNote>> {
        Ok(self
            .state
            .read()
            .await
            .notes
            .iter()
            .filter(|note| note.order_id == order_id)
            .cloned()
            .collect())
    }

    async fn inventory_level(
        &self,
        variant_id: VariantId,
        warehouse_id: WarehouseId,
    ) -> Result<Option<InventoryLevel>> {
        Ok(self
            .state
            .read()
            .await
            .inventory
            .get(&(variant_id, warehouse_id))
            .cloned())
    }

    async fn ensure_inventory_level(
        &self,
        variant_id: VariantId,
        warehouse_id: WarehouseId,
        low_stock_alert: i64,
    ) -> Result<InventoryLevel> {
        let mut state = self.state.write().await;
        let level = state
            .inventory
            .entry((variant_id, warehouse_id))
            .or_insert_with(|| InventoryLevel::empty(variant_id, warehouse_id, low_stock_alert));
        Ok(level.clone())
    }

    async fn reserve_stock(
        &self,
        variant_id: VariantId,
        warehouse_id: WarehouseId,
        quantity: u32,
    ) -> Result<InventoryLevel> {
        if self.fail_on_reserve.load(Ordering::SeqCst) {
            return Err(StoreError::Backend(
                "reserve_stock unavailable".to_string(),
            ));
        }

        // Single write-lock acquisition covers the whole increment, matching
        // the atomicity of the SQL UPDATE in the Postgres implementation.
        let mut state = self.state.write().await;
        let level = state
            .inventory
            .get_mut(&(variant_id, warehouse_id))
            .ok_or_else(|| {
                StoreError::NotFound(
                    "inventory level",
                    format!("variant {variant_id} at warehouse {warehouse_id}"),
                )
            })?;
        level.reserved_qty += quantity as i64;
        Ok(level.clone())
    }

    async fn inventory_for_warehouse(
        &self,
        warehouse_id: WarehouseId,
    ) -> Result<Vec<InventoryLevel>> {
        Ok(self
            .state
            .read()
            .await
            .inventory
            .values()
            .filter(|level| level.location_id == warehouse_id)
            .cloned()
            .collect())
    }

    async fn inventory_for_variant(&self, variant_id: VariantId) -> Result<Vec<InventoryLevel>> {
        let state = self.state.read().await;
        let mut rows: Vec<InventoryLevel> = state
            .inventory
            .values()
            .filter(|level| level.variant_id == variant_id)
            .cloned()
            .collect();
        rows.sort_by_key(|level| level.location_id);
        Ok(rows)
    }

    async fn upsert_inventory_level(&self, level: &InventoryLevel) -> Result<()> {
        self.state
            .write()
            .await
            .inventory
            .insert((level.variant_id, level.location_id), level.clone());
        Ok(())
    }

    async fn insert_warehouse(&self, warehouse: &Warehouse) -> Result<()> {
        self.state.write().await.warehouses.push(warehouse.clone());
        Ok(())
    }

    async fn active_warehouses(&self) -> Result<Vec<Warehouse>> {
        Ok(self
            .state
            .read()
            .await
            .warehouses
            .iter()
            .filter(|w| w.is_active)
            .cloned()
            .collect())
    }

    async fn insert_variant(&self, variant: &Variant) -> Result<()> {
        self.state
            .write()
            .await
            .variants
            .insert(variant.id, variant.clone());
        Ok(())
    }

    async fn get_variant(&self, variant_id: VariantId) -> Result<Option<Variant>> {
        Ok(self.state.read().await.variants.get(&variant_id).cloned())
    }

    async fn insert_customer(&self, customer: &Customer) -> Result<()> {
        self.state
            .write()
            .await
            .customers
            .insert(customer.id, customer.clone());
        Ok(())
    }

    async fn get_customer(&self, customer_id: CustomerId) -> Result<Option<Customer>> {
        Ok(self.state.read().await.customers.get(&customer_id).cloned())
    }

    async fn insert_shipping_tier(&self, tier: &ShippingTier) -> Result<()> {
        self.state.write().await.shipping_tiers.push(*tier);
        Ok(())
    }

    async fn active_shipping_tiers(&self) -> Result<Vec<ShippingTier>> {
        Ok(self
            .state
            .read()
            .await
            .shipping_tiers
            .iter()
            .filter(|t| t.is_active)
            .copied()
            .collect())
    }

    async fn insert_cart(&self, cart: &Cart) -> Result<()> {
        self.state.write().await.carts.insert(cart.id, *cart);
        Ok(())
    }

    async fn insert_cart_item(&self, item: &CartItem) -> Result<()> {
        self.state.write().await.cart_items.push(*item);
        Ok(())
    }

    async fn active_cart(&self, customer_id: CustomerId) -> Result<Option<Cart>> {
        let state = self.state.read().await;
        let mut carts: Vec<&Cart> = state
            .carts
            .values()
            .filter(|c| c.customer_id == customer_id)
            .collect();
        carts.sort_by_key(|c| c.id);
        Ok(carts.first().map(|c| **c))
    }

    async fn cart_items(&self, cart_id: CartId) -> Result<Vec<CartItem>> {
        Ok(self
            .state
            .read()
            .await
            .cart_items
            .iter()
            .filter(|item| item.cart_id == cart_id)
            .copied()
            .collect())
    }

    async fn clear_cart(&self, cart_id: CartId) -> Result<()> {
        self.state
            .write()
            .await
            .cart_items
            .retain(|item| item.cart_id != cart_id);
        Ok(())
    }
}
