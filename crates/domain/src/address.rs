//! Address snapshots.

use common::AddressId;
use serde::{Deserialize, Serialize};

/// A structural address snapshot.
///
/// Addresses are copied onto the order at creation time, never referenced
/// live, so later edits to a customer's address book cannot rewrite the
/// audit trail of a past order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Address {
    pub id: AddressId,
    pub name: String,
    pub line1: String,
    pub line2: Option<String>,
    pub city: String,
    pub state: String,
    pub postal_code: String,
    pub country: String,
    pub phone: Option<String>,
}

impl Address {
    /// Creates an address snapshot with a fresh id.
    pub fn new(
        name: impl Into<String>,
        line1: impl Into<String>,
        city: impl Into<String>,
        state: impl Into<String>,
        postal_code: impl Into<String>,
        country: impl Into<String>,
    ) -> Self {
        Self {
            id: AddressId::new(),
            name: name.into(),
            line1: line1.into(),
            line2: None,
            city: city.into(),
            state: state.into(),
            postal_code: postal_code.into(),
            country: country.into(),
            phone: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_assigns_fresh_id() {
        let a = Address::new("Ada", "1 Main St", "Austin", "TX", "78701", "US");
        let b = Address::new("Ada", "1 Main St", "Austin", "TX", "78701", "US");
        assert_ne!(a.id, b.id);
        assert_eq!(a.city, "Austin");
        assert!(a.line2.is_none());
    }

    #[test]
    fn test_serialization_roundtrip() {
        let addr = Address::new("Ada", "1 Main St", "Austin", "TX", "78701", "US");
        let json = serde_json::to_string(&addr).unwrap();
        let back: Address = serde_json::from_str(&json).unwrap();
        assert_eq!(addr, back);
    }
}
