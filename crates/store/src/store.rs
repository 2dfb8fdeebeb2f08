use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::{AddressId, CartId, CustomerId, OrderId, VariantId, WarehouseId};
use domain::{
    Address, Cart, CartItem, Customer, InventoryLevel, Order, OrderItem, OrderNote, OrderStatus,
    Payment, ShippingTier, Transaction, Variant, Warehouse,
};

use crate::Result;

/// Core trait for persistence implementations.
///
/// All implementations must be thread-safe (Send + Sync). Multiple checkout
/// attempts may run concurrently against shared inventory rows, so
/// [`Store::reserve_stock`] must be a single atomic update at the storage
/// layer — never a read-then-write in process memory.
#[async_trait]
pub trait Store: Send + Sync {
    // --- Orders -----------------------------------------------------------

    /// Persists a new order.
    async fn insert_order(&self, order: &Order) -> Result<()>;

    /// Loads an order by id. Returns None if it doesn't exist.
    async fn get_order(&self, order_id: OrderId) -> Result<Option<Order>>;

    /// Updates an order's status.
    async fn set_order_status(&self, order_id: OrderId, status: OrderStatus) -> Result<()>;

    /// Persists order line items. Items are immutable once written.
    async fn insert_order_items(&self, items: &[OrderItem]) -> Result<()>;

    /// Returns the line items for an order.
    async fn order_items(&self, order_id: OrderId) -> Result<Vec<OrderItem>>;

    // --- Addresses --------------------------------------------------------

    /// Persists an address snapshot.
    async fn insert_address(&self, address: &Address) -> Result<()>;

    /// Loads an address snapshot by id.
    async fn get_address(&self, address_id: AddressId) -> Result<Option<Address>>;

    // --- Payment ledger ---------------------------------------------------

    /// Appends a transaction ledger row. Rows are never mutated afterwards.
    async fn insert_transaction(&self, transaction: &Transaction) -> Result<()>;

    /// Returns all transactions for a gateway created at or after `cutoff`,
    /// newest first. Used by the duplicate-charge guard.
    async fn transactions_since(
        &self,
        gateway_name: &str,
        cutoff: DateTime<Utc>,
    ) -> Result<Vec<Transaction>>;

    /// Appends a payment attempt row.
    async fn insert_payment(&self, payment: &Payment) -> Result<()>;

    // --- Order notes ------------------------------------------------------

    /// Appends an audit note to an order.
    async fn insert_order_note(&self, note: &OrderNote) -> Result<()>;

    /// Returns the notes for an order, oldest first.
    async fn order_notes(&self, order_id: OrderId) -> Result<Vec<OrderNote>>;

    // --- Inventory --------------------------------------------------------

    /// Loads the inventory row for a (variant, warehouse) pair.
    async fn inventory_level(
        &self,
        variant_id: VariantId,
        warehouse_id: WarehouseId,
    ) -> Result<Option<InventoryLevel>>;

    /// Ensures an inventory row exists for the pair, creating an empty one
    /// with the given low-stock threshold when absent. Idempotent.
    async fn ensure_inventory_level(
        &self,
        variant_id: VariantId,
        warehouse_id: WarehouseId,
        low_stock_alert: i64,
    ) -> Result<InventoryLevel>;

    /// Atomically increments `reserved_qty` by `quantity` and returns the
    /// updated row. The increment MUST happen in a single storage-layer
    /// update so concurrent reservations never lose counts.
    async fn reserve_stock(
        &self,
        variant_id: VariantId,
        warehouse_id: WarehouseId,
        quantity: u32,
    ) -> Result<InventoryLevel>;

    /// Returns the inventory snapshot for one warehouse.
    async fn inventory_for_warehouse(
        &self,
        warehouse_id: WarehouseId,
    ) -> Result<Vec<InventoryLevel>>;

    /// Returns every inventory row for a variant across all warehouses.
    /// Used by the emergency reservation fallback.
    async fn inventory_for_variant(&self, variant_id: VariantId) -> Result<Vec<InventoryLevel>>;

    /// Writes an inventory row verbatim (seeding and stock adjustments).
    async fn upsert_inventory_level(&self, level: &InventoryLevel) -> Result<()>;

    // --- Warehouses -------------------------------------------------------

    /// Persists a warehouse.
    async fn insert_warehouse(&self, warehouse: &Warehouse) -> Result<()>;

    /// Returns all active warehouses.
    async fn active_warehouses(&self) -> Result<Vec<Warehouse>>;

    // --- Catalog ----------------------------------------------------------

    /// Persists a variant.
    async fn insert_variant(&self, variant: &Variant) -> Result<()>;

    /// Loads a variant by id.
    async fn get_variant(&self, variant_id: VariantId) -> Result<Option<Variant>>;

    /// Persists a customer.
    async fn insert_customer(&self, customer: &Customer) -> Result<()>;

    /// Loads a customer by id.
    async fn get_customer(&self, customer_id: CustomerId) -> Result<Option<Customer>>;

    /// Persists a shipping tier.
    async fn insert_shipping_tier(&self, tier: &ShippingTier) -> Result<()>;

    /// Returns all active shipping tiers.
    async fn active_shipping_tiers(&self) -> Result<Vec<ShippingTier>>;

    // --- Carts ------------------------------------------------------------

    /// Persists a cart.
    async fn insert_cart(&self, cart: &Cart) -> Result<()>;

    /// Persists a cart line.
    async fn insert_cart_item(&self, item: &CartItem) -> Result<()>;

    /// Returns the customer's active cart, if any.
    async fn active_cart(&self, customer_id: CustomerId) -> Result<Option<Cart>>;

    /// Returns the lines of a cart.
    async fn cart_items(&self, cart_id: CartId) -> Result<Vec<CartItem>>;

    /// Removes every line from a cart. Called only after an order has been
    /// successfully created from it.
    async fn clear_cart(&self, cart_id: CartId) -> Result<()>;
}
