//! Warehouse / stock location entity.

use common::WarehouseId;
use serde::{Deserialize, Serialize};

/// A physical stock location orders can be fulfilled from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Warehouse {
    pub id: WarehouseId,
    pub name: String,
    pub city: String,
    pub state: String,
    pub country: String,
    pub is_active: bool,
}

impl Warehouse {
    /// Creates an active warehouse.
    pub fn new(
        name: impl Into<String>,
        city: impl Into<String>,
        state: impl Into<String>,
        country: impl Into<String>,
    ) -> Self {
        Self {
            id: WarehouseId::new(),
            name: name.into(),
            city: city.into(),
            state: state.into(),
            country: country.into(),
            is_active: true,
        }
    }
}
