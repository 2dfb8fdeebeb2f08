use std::str::FromStr;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::{AddressId, CartId, CustomerId, OrderId, TransactionId, VariantId, WarehouseId};
use domain::{
    Address, BulkPrice, Cart, CartItem, Customer, CustomerTier, InventoryLevel, Money, Order,
    OrderItem, OrderNote, OrderStatus, Payment, SegmentPrice, ShippingTier, Transaction, Variant,
    Warehouse,
};
use sqlx::{postgres::PgRow, PgPool, Row};
use uuid::Uuid;

use crate::{Result, Store, StoreError};

/// PostgreSQL-backed store implementation.
#[derive(Clone)]
pub struct PostgresStore {
    pool: PgPool,
}

fn money(row: &PgRow, column: &str) -> Result<Money> {
    Ok(Money::from_cents(row.try_get::<i64, _>(column)?))
}

fn opt_money(row: &PgRow, column: &str) -> Result<Option<Money>> {
    Ok(row
        .try_get::<Option<i64>, _>(column)?
        .map(Money::from_cents))
}

fn parse_status<T: FromStr<Err = String>>(raw: &str) -> Result<T> {
    raw.parse().map_err(StoreError::Backend)
}

impl PostgresStore {
    /// Creates a new PostgreSQL store.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Gets a reference to the underlying connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Runs the database migrations.
    pub async fn run_migrations(&self) -> std::result::Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("../../migrations").run(&self.pool).await
    }

    fn row_to_order(row: PgRow) -> Result<Order> {
        let status: String = row.try_get("status")?;
        Ok(Order {
            id: OrderId::from_uuid(row.try_get::<Uuid, _>("id")?),
            customer_id: CustomerId::from_uuid(row.try_get::<Uuid, _>("customer_id")?),
            status: parse_status(&status)?,
            subtotal: money(&row, "subtotal")?,
            discount_amount: money(&row, "discount_amount")?,
            shipping_amount: money(&row, "shipping_amount")?,
            tax_amount: money(&row, "tax_amount")?,
            total_amount: money(&row, "total_amount")?,
            billing_address_id: AddressId::from_uuid(row.try_get::<Uuid, _>("billing_address_id")?),
            shipping_address_id: AddressId::from_uuid(
                row.try_get::<Uuid, _>("shipping_address_id")?,
            ),
            created_at: row.try_get::<DateTime<Utc>, _>("created_at")?,
        })
    }

    fn row_to_order_item(row: PgRow) -> Result<OrderItem> {
        Ok(OrderItem {
            order_id: OrderId::from_uuid(row.try_get::<Uuid, _>("order_id")?),
            variant_id: VariantId::from_uuid(row.try_get::<Uuid, _>("variant_id")?),
            quantity: row.try_get::<i32, _>("quantity")? as u32,
            unit_price: money(&row, "unit_price")?,
            total_price: money(&row, "total_price")?,
            bulk_unit_price: opt_money(&row, "bulk_unit_price")?,
            bulk_total_price: opt_money(&row, "bulk_total_price")?,
        })
    }

    fn row_to_transaction(row: PgRow) -> Result<Transaction> {
        let status: String = row.try_get("payment_status")?;
        Ok(Transaction {
            id: TransactionId::from_uuid(row.try_get::<Uuid, _>("id")?),
            order_id: OrderId::from_uuid(row.try_get::<Uuid, _>("order_id")?),
            amount: money(&row, "amount")?,
            payment_status: parse_status(&status)?,
            gateway_name: row.try_get("gateway_name")?,
            gateway_transaction_id: row.try_get("gateway_transaction_id")?,
            gateway_response: row.try_get("gateway_response")?,
            created_at: row.try_get::<DateTime<Utc>, _>("created_at")?,
        })
    }

    fn row_to_inventory_level(row: PgRow) -> Result<InventoryLevel> {
        Ok(InventoryLevel {
            variant_id: VariantId::from_uuid(row.try_get::<Uuid, _>("variant_id")?),
            location_id: WarehouseId::from_uuid(row.try_get::<Uuid, _>("location_id")?),
            quantity: row.try_get("quantity")?,
            reserved_qty: row.try_get("reserved_qty")?,
            low_stock_alert: row.try_get("low_stock_alert")?,
            sell_when_out_of_stock: row.try_get("sell_when_out_of_stock")?,
        })
    }

    fn row_to_warehouse(row: PgRow) -> Result<Warehouse> {
        Ok(Warehouse {
            id: WarehouseId::from_uuid(row.try_get::<Uuid, _>("id")?),
            name: row.try_get("name")?,
            city: row.try_get("city")?,
            state: row.try_get("state")?,
            country: row.try_get("country")?,
            is_active: row.try_get("is_active")?,
        })
    }

    fn row_to_variant(row: PgRow) -> Result<Variant> {
        let bulk_json: serde_json::Value = row.try_get("bulk_prices")?;
        let bulk_prices: Vec<BulkPrice> = serde_json::from_value(bulk_json)?;
        let segment_json: serde_json::Value = row.try_get("segment_prices")?;
        let segment_prices: Vec<SegmentPrice> = serde_json::from_value(segment_json)?;

        Ok(Variant {
            id: VariantId::from_uuid(row.try_get::<Uuid, _>("id")?),
            sku: row.try_get("sku")?,
            name: row.try_get("name")?,
            unit_price: money(&row, "unit_price")?,
            weight_oz: row.try_get::<i32, _>("weight_oz")? as u32,
            bulk_prices,
            segment_prices,
        })
    }

    fn row_to_shipping_tier(row: PgRow) -> Result<ShippingTier> {
        Ok(ShippingTier {
            min_subtotal: money(&row, "min_subtotal")?,
            max_subtotal: opt_money(&row, "max_subtotal")?,
            shipping_rate: money(&row, "shipping_rate")?,
            is_active: row.try_get("is_active")?,
        })
    }
}

#[async_trait]
impl Store for PostgresStore {
    async fn insert_order(&self, order: &Order) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO orders (id, customer_id, status, subtotal, discount_amount,
                                shipping_amount, tax_amount, total_amount,
                                billing_address_id, shipping_address_id, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            "#,
        )
        .bind(order.id.as_uuid())
        .bind(order.customer_id.as_uuid())
        .bind(order.status.as_str())
        .bind(order.subtotal.cents())
        .bind(order.discount_amount.cents())
        .bind(order.shipping_amount.cents())
        .bind(order.tax_amount.cents())
        .bind(order.total_amount.cents())
        .bind(order.billing_address_id.as_uuid())
        .bind(order.shipping_address_id.as_uuid())
        .bind(order.created_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn get_order(&self, order_id: OrderId) -> Result<Option<Order>> {
        let row = sqlx::query("SELECT * FROM orders WHERE id = $1")
            .bind(order_id.as_uuid())
            .fetch_optional(&self.pool)
            .await?;

        row.map(Self::row_to_order).transpose()
    }

    async fn set_order_status(&self, order_id: OrderId, status: OrderStatus) -> Result<()> {
        let result = sqlx::query("UPDATE orders SET status = $2 WHERE id = $1")
            .bind(order_id.as_uuid())
            .bind(status.as_str())
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound("order", order_id.to_string()));
        }
        Ok(())
    }

    async fn insert_order_items(&self, items: &[OrderItem]) -> Result<()> {
        let mut tx = self.pool.begin().await?;
        for item in items {
            sqlx::query(
                r#"
                INSERT INTO order_items (order_id, variant_id, quantity, unit_price,
                                         total_price, bulk_unit_price, bulk_total_price)
                VALUES ($1, $2, $3, $4, $5, $6, $7)
                "#,
            )
            .bind(item.order_id.as_uuid())
            .bind(item.variant_id.as_uuid())
            .bind(item.quantity as i32)
            .bind(item.unit_price.cents())
            .bind(item.total_price.cents())
            .bind(item.bulk_unit_price.map(|m| m.cents()))
            .bind(item.bulk_total_price.map(|m| m.cents()))
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await?;

        Ok(())
    }

    async fn order_items(&self, order_id: OrderId) -> Result<Vec<OrderItem>> {
        let rows = sqlx::query("SELECT * FROM order_items WHERE order_id = $1")
            .bind(order_id.as_uuid())
            .fetch_all(&self.pool)
            .await?;

        rows.into_iter().map(Self::row_to_order_item).collect()
    }

    async fn insert_address(&self, address: &Address) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO addresses (id, name, line1, line2, city, state, postal_code, country, phone)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(address.id.as_uuid())
        .bind(&address.name)
        .bind(&address.line1)
        .bind(&address.line2)
        .bind(&address.city)
        .bind(&address.state)
        .bind(&address.postal_code)
        .bind(&address.country)
        .bind(&address.phone)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn get_address(&self, address_id: AddressId) -> Result<Option<Address>> {
        let row = sqlx::query("SELECT * FROM addresses WHERE id = $1")
            .bind(address_id.as_uuid())
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(row) => Ok(Some(Address {
                id: AddressId::from_uuid(row.try_get::<Uuid, _>("id")?),
                name: row.try_get("name")?,
                line1: row.try_get("line1")?,
                line2: row.try_get("line2")?,
                city: row.try_get("city")?,
                state: row.try_get("state")?,
                postal_code: row.try_get("postal_code")?,
                country: row.try_get("country")?,
                phone: row.try_get("phone")?,
            })),
            None => Ok(None),
        }
    }

    async fn insert_transaction(&self, transaction: &Transaction) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO transactions (id, order_id, amount, payment_status, gateway_name,
                                      gateway_transaction_id, gateway_response, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(transaction.id.as_uuid())
        .bind(transaction.order_id.as_uuid())
        .bind(transaction.amount.cents())
        .bind(transaction.payment_status.as_str())
        .bind(&transaction.gateway_name)
        .bind(&transaction.gateway_transaction_id)
        .bind(&transaction.gateway_response)
        .bind(transaction.created_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn transactions_since(
        &self,
        gateway_name: &str,
        cutoff: DateTime<Utc>,
    ) -> Result<Vec<Transaction>> {
        let rows = sqlx::query(
            r#"
            SELECT * FROM transactions
            WHERE gateway_name = $1 AND created_at >= $2
            ORDER BY created_at DESC
            "#,
        )
        .bind(gateway_name)
        .bind(cutoff)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Self::row_to_transaction).collect()
    }

    async fn insert_payment(&self, payment: &Payment) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO payments (id, order_id, payment_method, provider, transaction_id,
                                  amount, currency, status, paid_at, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            "#,
        )
        .bind(payment.id.as_uuid())
        .bind(payment.order_id.as_uuid())
        .bind(&payment.payment_method)
        .bind(&payment.provider)
        .bind(payment.transaction_id.as_uuid())
        .bind(payment.amount.cents())
        .bind(&payment.currency)
        .bind(payment.status.as_str())
        .bind(payment.paid_at)
        .bind(payment.created_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn insert_order_note(&self, note: &OrderNote) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO order_notes (order_id, note, is_internal, created_at)
            VALUES ($1, $2, $3, $4)
            "#,
        )
        .bind(note.order_id.as_uuid())
        .bind(&note.note)
        .bind(note.is_internal)
        .bind(note.created_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn order_notes(&self, order_id: OrderId) -> Result<Vec<OrderNote>> {
        let rows = sqlx::query(
            "SELECT * FROM order_notes WHERE order_id = $1 ORDER BY created_at ASC",
        )
        .bind(order_id.as_uuid())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter()
            .map(|row| {
                Ok(OrderNote {
                    order_id: OrderId::from_uuid(row.try_get::<Uuid, _>("order_id")?),
                    note: row.try_get("note")?,
                    is_internal: row.try_get("is_internal")?,
                    created_at: row.try_get::<DateTime<Utc>, _>("created_at")?,
                })
            })
            .collect()
    }

    async fn inventory_level(
        &self,
        variant_id: VariantId,
        warehouse_id: WarehouseId,
    ) -> Result<Option<InventoryLevel>> {
        let row = sqlx::query(
            "SELECT * FROM inventory_levels WHERE variant_id = $1 AND location_id = $2",
        )
        .bind(variant_id.as_uuid())
        .bind(warehouse_id.as_uuid())
        .fetch_optional(&self.pool)
        .await?;

        row.map(Self::row_to_inventory_level).transpose()
    }

    async fn ensure_inventory_level(
        &self,
        variant_id: VariantId,
        warehouse_id: WarehouseId,
        low_stock_alert: i64,
    ) -> Result<InventoryLevel> {
        // DO NOTHING on conflict keeps an existing row's counters intact
        sqlx::query(
            r#"
            INSERT INTO inventory_levels (variant_id, location_id, quantity, reserved_qty,
                                          low_stock_alert, sell_when_out_of_stock)
            VALUES ($1, $2, 0, 0, $3, FALSE)
            ON CONFLICT (variant_id, location_id) DO NOTHING
            "#,
        )
        .bind(variant_id.as_uuid())
        .bind(warehouse_id.as_uuid())
        .bind(low_stock_alert)
        .execute(&self.pool)
        .await?;

        let row = sqlx::query(
            "SELECT * FROM inventory_levels WHERE variant_id = $1 AND location_id = $2",
        )
        .bind(variant_id.as_uuid())
        .bind(warehouse_id.as_uuid())
        .fetch_one(&self.pool)
        .await?;

        Self::row_to_inventory_level(row)
    }

    async fn reserve_stock(
        &self,
        variant_id: VariantId,
        warehouse_id: WarehouseId,
        quantity: u32,
    ) -> Result<InventoryLevel> {
        // Single UPDATE so concurrent reservations serialize at the row lock
        // instead of losing increments to a read-then-write race.
        let row = sqlx::query(
            r#"
            UPDATE inventory_levels
            SET reserved_qty = reserved_qty + $3
            WHERE variant_id = $1 AND location_id = $2
            RETURNING *
            "#,
        )
        .bind(variant_id.as_uuid())
        .bind(warehouse_id.as_uuid())
        .bind(quantity as i64)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => Self::row_to_inventory_level(row),
            None => Err(StoreError::NotFound(
                "inventory level",
                format!("variant {variant_id} at warehouse {warehouse_id}"),
            )),
        }
    }

    async fn inventory_for_warehouse(
        &self,
        warehouse_id: WarehouseId,
    ) -> Result<Vec<InventoryLevel>> {
        let rows = sqlx::query("SELECT * FROM inventory_levels WHERE location_id = $1")
            .bind(warehouse_id.as_uuid())
            .fetch_all(&self.pool)
            .await?;

        rows.into_iter().map(Self::row_to_inventory_level).collect()
    }

    async fn inventory_for_variant(&self, variant_id: VariantId) -> Result<Vec<InventoryLevel>> {
        let rows = sqlx::query(
            "SELECT * FROM inventory_levels WHERE variant_id = $1 ORDER BY location_id ASC",
        )
        .bind(variant_id.as_uuid())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Self::row_to_inventory_level).collect()
    }

    async fn upsert_inventory_level(&self, level: &InventoryLevel) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO inventory_levels (variant_id, location_id, quantity, reserved_qty,
                                          low_stock_alert, sell_when_out_of_stock)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (variant_id, location_id) DO UPDATE SET
                quantity = EXCLUDED.quantity,
                reserved_qty = EXCLUDED.reserved_qty,
                low_stock_alert = EXCLUDED.low_stock_alert,
                sell_when_out_of_stock = EXCLUDED.sell_when_out_of_stock
            "#,
        )
        .bind(level.variant_id.as_uuid())
        .bind(level.location_id.as_uuid())
        .bind(level.quantity)
        .bind(level.reserved_qty)
        .bind(level.low_stock_alert)
        .bind(level.sell_when_out_of_stock)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn insert_warehouse(&self, warehouse: &Warehouse) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO warehouses (id, name, city, state, country, is_active)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(warehouse.id.as_uuid())
        .bind(&warehouse.name)
        .bind(&warehouse.city)
        .bind(&warehouse.state)
        .bind(&warehouse.country)
        .bind(warehouse.is_active)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn active_warehouses(&self) -> Result<Vec<Warehouse>> {
        let rows = sqlx::query("SELECT * FROM warehouses WHERE is_active = TRUE")
            .fetch_all(&self.pool)
            .await?;

        rows.into_iter().map(Self::row_to_warehouse).collect()
    }

    async fn insert_variant(&self, variant: &Variant) -> Result<()> {
        let bulk_json = serde_json::to_value(&variant.bulk_prices)?;
        let segment_json = serde_json::to_value(&variant.segment_prices)?;

        sqlx::query(
            r#"
            INSERT INTO variants (id, sku, name, unit_price, weight_oz, bulk_prices, segment_prices)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(variant.id.as_uuid())
        .bind(&variant.sku)
        .bind(&variant.name)
        .bind(variant.unit_price.cents())
        .bind(variant.weight_oz as i32)
        .bind(bulk_json)
        .bind(segment_json)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn get_variant(&self, variant_id: VariantId) -> Result<Option<Variant>> {
        let row = sqlx::query("SELECT * FROM variants WHERE id = $1")
            .bind(variant_id.as_uuid())
            .fetch_optional(&self.pool)
            .await?;

        row.map(Self::row_to_variant).transpose()
    }

    async fn insert_customer(&self, customer: &Customer) -> Result<()> {
        sqlx::query("INSERT INTO customers (id, email, tier) VALUES ($1, $2, $3)")
            .bind(customer.id.as_uuid())
            .bind(&customer.email)
            .bind(customer.tier.as_str())
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    async fn get_customer(&self, customer_id: CustomerId) -> Result<Option<Customer>> {
        let row = sqlx::query("SELECT * FROM customers WHERE id = $1")
            .bind(customer_id.as_uuid())
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(row) => {
                let tier: String = row.try_get("tier")?;
                Ok(Some(Customer {
                    id: CustomerId::from_uuid(row.try_get::<Uuid, _>("id")?),
                    email: row.try_get("email")?,
                    tier: parse_status::<CustomerTier>(&tier)?,
                }))
            }
            None => Ok(None),
        }
    }

    async fn insert_shipping_tier(&self, tier: &ShippingTier) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO shipping_tiers (min_subtotal, max_subtotal, shipping_rate, is_active)
            VALUES ($1, $2, $3, $4)
            "#,
        )
        .bind(tier.min_subtotal.cents())
        .bind(tier.max_subtotal.map(|m| m.cents()))
        .bind(tier.shipping_rate.cents())
        .bind(tier.is_active)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn active_shipping_tiers(&self) -> Result<Vec<ShippingTier>> {
        let rows = sqlx::query(
            "SELECT * FROM shipping_tiers WHERE is_active = TRUE ORDER BY min_subtotal ASC",
        )
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Self::row_to_shipping_tier).collect()
    }

    async fn insert_cart(&self, cart: &Cart) -> Result<()> {
        sqlx::query("INSERT INTO carts (id, customer_id) VALUES ($1, $2)")
            .bind(cart.id.as_uuid())
            .bind(cart.customer_id.as_uuid())
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    async fn insert_cart_item(&self, item: &CartItem) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO cart_items (cart_id, variant_id, quantity, unit_price)
            VALUES ($1, $2, $3, $4)
            "#,
        )
        .bind(item.cart_id.as_uuid())
        .bind(item.variant_id.as_uuid())
        .bind(item.quantity as i32)
        .bind(item.unit_price.cents())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn active_cart(&self, customer_id: CustomerId) -> Result<Option<Cart>> {
        let row = sqlx::query(
            "SELECT * FROM carts WHERE customer_id = $1 ORDER BY id ASC LIMIT 1",
        )
        .bind(customer_id.as_uuid())
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => Ok(Some(Cart {
                id: CartId::from_uuid(row.try_get::<Uuid, _>("id")?),
                customer_id: CustomerId::from_uuid(row.try_get::<Uuid, _>("customer_id")?),
            })),
            None => Ok(None),
        }
    }

    async fn cart_items(&self, cart_id: CartId) -> Result<Vec<CartItem>> {
        let rows = sqlx::query("SELECT * FROM cart_items WHERE cart_id = $1")
            .bind(cart_id.as_uuid())
            .fetch_all(&self.pool)
            .await?;

        rows.into_iter()
            .map(|row| {
                Ok(CartItem {
                    cart_id: CartId::from_uuid(row.try_get::<Uuid, _>("cart_id")?),
                    variant_id: VariantId::from_uuid(row.try_get::<Uuid, _>("variant_id")?),
                    quantity: row.try_get::<i32, _>("quantity")? as u32,
                    unit_price: money(&row, "unit_price")?,
                })
            })
            .collect()
    }

    async fn clear_cart(&self, cart_id: CartId) -> Result<()> {
        sqlx::query("DELETE FROM cart_items WHERE cart_id = $1")
            .bind(cart_id.as_uuid())
            .execute(&self.pool)
            .await?;

        Ok(())
    }
}
