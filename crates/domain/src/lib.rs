//! Domain layer for the order-fulfillment core.
//!
//! Everything in this crate is pure: entities, monetary math, the financial
//! calculator, and geolocation. No I/O lives here, which keeps the whole
//! layer testable without a database or network.

pub mod address;
pub mod cart;
pub mod catalog;
pub mod geo;
pub mod inventory;
pub mod money;
pub mod order;
pub mod payment;
pub mod pricing;
pub mod warehouse;

pub use address::Address;
pub use cart::{Cart, CartItem};
pub use catalog::{BulkPrice, Customer, CustomerTier, SegmentPrice, ShippingTier, Variant};
pub use geo::{haversine_km, Coordinates, Geolocator};
pub use inventory::InventoryLevel;
pub use money::Money;
pub use order::{Order, OrderItem, OrderNote, OrderStatus};
pub use payment::{Payment, PaymentStatus, Transaction};
pub use pricing::{price_order, OrderTotals, PricedItem, PricingInput, PricingItem};
pub use warehouse::Warehouse;
