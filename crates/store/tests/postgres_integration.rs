//! PostgreSQL integration tests
//!
//! These tests use a shared PostgreSQL container for efficiency.
//! Run with:
//!
//! ```bash
//! cargo test -p store --test postgres_integration
//! ```

use std::sync::Arc;

use chrono::Utc;
use common::{AddressId, CustomerId, OrderId, PaymentId, TransactionId, VariantId};
use domain::{
    Address, BulkPrice, Cart, CartItem, Customer, CustomerTier, InventoryLevel, Money, Order,
    OrderItem, OrderNote, OrderStatus, Payment, PaymentStatus, ShippingTier, Transaction, Variant,
    Warehouse,
};
use serial_test::serial;
use sqlx::PgPool;
use store::{PostgresStore, Store, StoreError};
use testcontainers::{runners::AsyncRunner, ContainerAsync};
use testcontainers_modules::postgres::Postgres;
use tokio::sync::OnceCell;

/// Shared container info - container stays alive for all tests
struct ContainerInfo {
    #[allow(dead_code)] // Container must stay alive for tests
    container: ContainerAsync<Postgres>,
    connection_string: String,
}

/// Global shared container
static CONTAINER: OnceCell<Arc<ContainerInfo>> = OnceCell::const_new();

async fn get_container_info() -> Arc<ContainerInfo> {
    CONTAINER
        .get_or_init(|| async {
            let container = Postgres::default().start().await.unwrap();

            let host = container.get_host().await.unwrap();
            let port = container.get_host_port_ipv4(5432).await.unwrap();

            let connection_string =
                format!("postgres://postgres:postgres@{}:{}/postgres", host, port);

            // Create a temporary pool just for migrations
            let temp_pool = PgPool::connect(&connection_string).await.unwrap();

            // Run migrations using raw_sql to execute multiple statements
            sqlx::raw_sql(include_str!(
                "../../../migrations/001_create_fulfillment_tables.sql"
            ))
            .execute(&temp_pool)
            .await
            .unwrap();

            temp_pool.close().await;

            Arc::new(ContainerInfo {
                container,
                connection_string,
            })
        })
        .await
        .clone()
}

/// Get a fresh store with its own pool and cleared tables
async fn get_test_store() -> PostgresStore {
    let info = get_container_info().await;

    // Create a fresh pool for each test to avoid connection issues
    let pool = sqlx::postgres::PgPoolOptions::new()
        .max_connections(10)
        .connect(&info.connection_string)
        .await
        .unwrap();

    // Clear tables for test isolation
    sqlx::query(
        "TRUNCATE TABLE customers, addresses, orders, order_items, transactions, payments, \
         order_notes, warehouses, inventory_levels, variants, shipping_tiers, carts, cart_items",
    )
    .execute(&pool)
    .await
    .unwrap();

    PostgresStore::new(pool)
}

fn sample_order() -> Order {
    Order {
        id: OrderId::new(),
        customer_id: CustomerId::new(),
        status: OrderStatus::Pending,
        subtotal: Money::from_cents(10_000),
        discount_amount: Money::from_cents(500),
        shipping_amount: Money::from_cents(799),
        tax_amount: Money::from_cents(825),
        total_amount: Money::from_cents(11_124),
        billing_address_id: AddressId::new(),
        shipping_address_id: AddressId::new(),
        created_at: Utc::now(),
    }
}

#[tokio::test]
#[serial]
async fn order_roundtrip_preserves_totals() {
    let store = get_test_store().await;
    let order = sample_order();

    store.insert_order(&order).await.unwrap();
    let loaded = store.get_order(order.id).await.unwrap().unwrap();

    assert_eq!(loaded.id, order.id);
    assert_eq!(loaded.status, OrderStatus::Pending);
    assert_eq!(loaded.subtotal, order.subtotal);
    assert_eq!(loaded.discount_amount, order.discount_amount);
    assert_eq!(loaded.shipping_amount, order.shipping_amount);
    assert_eq!(loaded.tax_amount, order.tax_amount);
    assert_eq!(loaded.total_amount, order.total_amount);
}

#[tokio::test]
#[serial]
async fn set_order_status_updates_row() {
    let store = get_test_store().await;
    let order = sample_order();
    store.insert_order(&order).await.unwrap();

    store
        .set_order_status(order.id, OrderStatus::Processing)
        .await
        .unwrap();

    let loaded = store.get_order(order.id).await.unwrap().unwrap();
    assert_eq!(loaded.status, OrderStatus::Processing);
}

#[tokio::test]
#[serial]
async fn set_order_status_missing_order_is_not_found() {
    let store = get_test_store().await;

    let result = store
        .set_order_status(OrderId::new(), OrderStatus::Processing)
        .await;

    assert!(matches!(result, Err(StoreError::NotFound(_, _))));
}

#[tokio::test]
#[serial]
async fn order_items_roundtrip_with_bulk_columns() {
    let store = get_test_store().await;
    let order = sample_order();
    store.insert_order(&order).await.unwrap();

    let items = vec![
        OrderItem {
            order_id: order.id,
            variant_id: VariantId::new(),
            quantity: 2,
            unit_price: Money::from_cents(1000),
            total_price: Money::from_cents(2000),
            bulk_unit_price: None,
            bulk_total_price: None,
        },
        OrderItem {
            order_id: order.id,
            variant_id: VariantId::new(),
            quantity: 15,
            unit_price: Money::from_cents(1000),
            total_price: Money::from_cents(12_000),
            bulk_unit_price: Some(Money::from_cents(800)),
            bulk_total_price: Some(Money::from_cents(12_000)),
        },
    ];
    store.insert_order_items(&items).await.unwrap();

    let loaded = store.order_items(order.id).await.unwrap();
    assert_eq!(loaded.len(), 2);
    let bulk_line = loaded.iter().find(|i| i.quantity == 15).unwrap();
    assert_eq!(bulk_line.bulk_unit_price, Some(Money::from_cents(800)));
    assert_eq!(bulk_line.bulk_total_price, Some(Money::from_cents(12_000)));
}

#[tokio::test]
#[serial]
async fn address_roundtrip() {
    let store = get_test_store().await;
    let mut address = Address::new("Ada", "1 Main St", "Austin", "TX", "78701", "US");
    address.line2 = Some("Suite 4".to_string());
    address.phone = Some("555-0100".to_string());

    store.insert_address(&address).await.unwrap();
    let loaded = store.get_address(address.id).await.unwrap().unwrap();

    assert_eq!(loaded, address);
}

#[tokio::test]
#[serial]
async fn transactions_since_filters_by_gateway_and_cutoff() {
    let store = get_test_store().await;
    let order_id = OrderId::new();

    let recent = Transaction {
        id: TransactionId::new(),
        order_id,
        amount: Money::from_cents(5000),
        payment_status: PaymentStatus::Completed,
        gateway_name: "authnet".to_string(),
        gateway_transaction_id: "gw-1".to_string(),
        gateway_response: r#"{"responseCode":1}"#.to_string(),
        created_at: Utc::now(),
    };
    let old = Transaction {
        id: TransactionId::new(),
        created_at: Utc::now() - chrono::Duration::minutes(30),
        gateway_transaction_id: "gw-0".to_string(),
        ..recent.clone()
    };
    let other_gateway = Transaction {
        id: TransactionId::new(),
        gateway_name: "stripe".to_string(),
        gateway_transaction_id: "gw-2".to_string(),
        ..recent.clone()
    };

    store.insert_transaction(&recent).await.unwrap();
    store.insert_transaction(&old).await.unwrap();
    store.insert_transaction(&other_gateway).await.unwrap();

    let cutoff = Utc::now() - chrono::Duration::minutes(5);
    let found = store.transactions_since("authnet", cutoff).await.unwrap();

    assert_eq!(found.len(), 1);
    assert_eq!(found[0].id, recent.id);
    assert_eq!(found[0].gateway_response, recent.gateway_response);
}

#[tokio::test]
#[serial]
async fn payment_insert_succeeds() {
    let store = get_test_store().await;

    let payment = Payment {
        id: PaymentId::new(),
        order_id: OrderId::new(),
        payment_method: "credit_card".to_string(),
        provider: "authnet".to_string(),
        transaction_id: TransactionId::new(),
        amount: Money::from_cents(5000),
        currency: "USD".to_string(),
        status: PaymentStatus::Completed,
        paid_at: Some(Utc::now()),
        created_at: Utc::now(),
    };

    store.insert_payment(&payment).await.unwrap();
}

#[tokio::test]
#[serial]
async fn order_notes_returned_oldest_first() {
    let store = get_test_store().await;
    let order_id = OrderId::new();

    let first = OrderNote {
        order_id,
        note: "order created from cart".to_string(),
        is_internal: true,
        created_at: Utc::now() - chrono::Duration::seconds(10),
    };
    let second = OrderNote {
        order_id,
        note: "payment fee applied".to_string(),
        is_internal: true,
        created_at: Utc::now(),
    };
    store.insert_order_note(&second).await.unwrap();
    store.insert_order_note(&first).await.unwrap();

    let notes = store.order_notes(order_id).await.unwrap();
    assert_eq!(notes.len(), 2);
    assert_eq!(notes[0].note, "order created from cart");
    assert_eq!(notes[1].note, "payment fee applied");
}

#[tokio::test]
#[serial]
async fn ensure_inventory_level_creates_once() {
    let store = get_test_store().await;
    let variant_id = VariantId::new();
    let warehouse = Warehouse::new("East", "Newark", "NJ", "US");
    store.insert_warehouse(&warehouse).await.unwrap();

    let created = store
        .ensure_inventory_level(variant_id, warehouse.id, 5)
        .await
        .unwrap();
    assert_eq!(created.quantity, 0);
    assert_eq!(created.reserved_qty, 0);
    assert_eq!(created.low_stock_alert, 5);

    // Reserving then ensuring again must not reset the counters
    store
        .reserve_stock(variant_id, warehouse.id, 3)
        .await
        .unwrap();
    let again = store
        .ensure_inventory_level(variant_id, warehouse.id, 5)
        .await
        .unwrap();
    assert_eq!(again.reserved_qty, 3);
}

#[tokio::test]
#[serial]
async fn reserve_stock_missing_row_is_not_found() {
    let store = get_test_store().await;

    let result = store
        .reserve_stock(VariantId::new(), common::WarehouseId::new(), 1)
        .await;

    assert!(matches!(result, Err(StoreError::NotFound(_, _))));
}

#[tokio::test]
#[serial]
async fn concurrent_reservations_lose_no_increments() {
    let store = get_test_store().await;
    let variant_id = VariantId::new();
    let warehouse = Warehouse::new("East", "Newark", "NJ", "US");
    store.insert_warehouse(&warehouse).await.unwrap();
    store
        .upsert_inventory_level(&InventoryLevel {
            variant_id,
            location_id: warehouse.id,
            quantity: 100,
            reserved_qty: 0,
            low_stock_alert: 5,
            sell_when_out_of_stock: false,
        })
        .await
        .unwrap();

    let mut handles = Vec::new();
    for _ in 0..50 {
        let store = store.clone();
        handles.push(tokio::spawn(async move {
            store.reserve_stock(variant_id, warehouse.id, 1).await
        }));
    }
    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    let level = store
        .inventory_level(variant_id, warehouse.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(level.reserved_qty, 50);
}

#[tokio::test]
#[serial]
async fn variant_roundtrip_preserves_price_tiers() {
    let store = get_test_store().await;

    let variant = Variant {
        id: VariantId::new(),
        sku: "SKU-001".to_string(),
        name: "Widget".to_string(),
        unit_price: Money::from_cents(1000),
        weight_oz: 16,
        bulk_prices: vec![BulkPrice {
            min_qty: 10,
            max_qty: Some(19),
            price: Money::from_cents(800),
        }],
        segment_prices: vec![domain::SegmentPrice {
            tier: CustomerTier::Wholesale,
            price: Money::from_cents(900),
        }],
    };

    store.insert_variant(&variant).await.unwrap();
    let loaded = store.get_variant(variant.id).await.unwrap().unwrap();

    assert_eq!(loaded, variant);
}

#[tokio::test]
#[serial]
async fn customer_roundtrip_preserves_tier() {
    let store = get_test_store().await;

    let customer = Customer {
        id: CustomerId::new(),
        email: "buyer@example.com".to_string(),
        tier: CustomerTier::WholesaleHigh,
    };
    store.insert_customer(&customer).await.unwrap();

    let loaded = store.get_customer(customer.id).await.unwrap().unwrap();
    assert_eq!(loaded, customer);
}

#[tokio::test]
#[serial]
async fn active_shipping_tiers_skips_inactive() {
    let store = get_test_store().await;

    store
        .insert_shipping_tier(&ShippingTier {
            min_subtotal: Money::zero(),
            max_subtotal: Some(Money::from_dollars(50)),
            shipping_rate: Money::from_cents(799),
            is_active: true,
        })
        .await
        .unwrap();
    store
        .insert_shipping_tier(&ShippingTier {
            min_subtotal: Money::from_dollars(50),
            max_subtotal: None,
            shipping_rate: Money::zero(),
            is_active: false,
        })
        .await
        .unwrap();

    let tiers = store.active_shipping_tiers().await.unwrap();
    assert_eq!(tiers.len(), 1);
    assert_eq!(tiers[0].shipping_rate, Money::from_cents(799));
}

#[tokio::test]
#[serial]
async fn active_warehouses_skips_inactive() {
    let store = get_test_store().await;

    let mut east = Warehouse::new("East", "Newark", "NJ", "US");
    east.is_active = false;
    let west = Warehouse::new("West", "Los Angeles", "CA", "US");
    store.insert_warehouse(&east).await.unwrap();
    store.insert_warehouse(&west).await.unwrap();

    let active = store.active_warehouses().await.unwrap();
    assert_eq!(active.len(), 1);
    assert_eq!(active[0].id, west.id);
}

#[tokio::test]
#[serial]
async fn cart_lifecycle() {
    let store = get_test_store().await;
    let customer_id = CustomerId::new();

    let cart = Cart::new(customer_id);
    store.insert_cart(&cart).await.unwrap();
    store
        .insert_cart_item(&CartItem {
            cart_id: cart.id,
            variant_id: VariantId::new(),
            quantity: 3,
            unit_price: Money::from_cents(1500),
        })
        .await
        .unwrap();

    let found = store.active_cart(customer_id).await.unwrap().unwrap();
    assert_eq!(found.id, cart.id);

    let items = store.cart_items(cart.id).await.unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].quantity, 3);

    store.clear_cart(cart.id).await.unwrap();
    assert!(store.cart_items(cart.id).await.unwrap().is_empty());
}
