//! Persistence collaborator for the fulfillment core.
//!
//! The [`Store`] trait covers CRUD for every persisted entity plus the one
//! concurrency-critical primitive: an atomic `reserve_stock` increment.
//! Two implementations ship with the crate: [`InMemoryStore`] for tests and
//! [`PostgresStore`] for production.

pub mod error;
pub mod memory;
pub mod postgres;
pub mod store;

pub use error::{Result, StoreError};
pub use memory::InMemoryStore;
pub use postgres::PostgresStore;
pub use store::Store;
