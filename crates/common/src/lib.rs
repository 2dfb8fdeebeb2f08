//! Shared identifier types used across the fulfillment workspace.

pub mod ids;

pub use ids::{
    AddressId, CartId, CustomerId, OrderId, PaymentId, TransactionId, VariantId, WarehouseId,
};
