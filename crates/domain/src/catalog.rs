//! Catalog entities: variants, price tiers, customers, shipping tiers.

use common::{CustomerId, VariantId};
use serde::{Deserialize, Serialize};

use crate::money::Money;

/// Pricing segment a customer belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum CustomerTier {
    #[default]
    Retail,
    Wholesale,
    /// High-volume wholesale / B2B accounts; qualifies for the automatic
    /// high-value discount.
    WholesaleHigh,
    Enterprise,
}

impl CustomerTier {
    /// Returns true for the tier that qualifies for the automatic
    /// high-value-customer discount.
    pub fn qualifies_for_volume_discount(&self) -> bool {
        matches!(self, CustomerTier::WholesaleHigh)
    }

    /// Returns the tier name as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            CustomerTier::Retail => "Retail",
            CustomerTier::Wholesale => "Wholesale",
            CustomerTier::WholesaleHigh => "WholesaleHigh",
            CustomerTier::Enterprise => "Enterprise",
        }
    }
}

impl std::fmt::Display for CustomerTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for CustomerTier {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Retail" => Ok(CustomerTier::Retail),
            "Wholesale" => Ok(CustomerTier::Wholesale),
            "WholesaleHigh" => Ok(CustomerTier::WholesaleHigh),
            "Enterprise" => Ok(CustomerTier::Enterprise),
            other => Err(format!("unknown customer tier: {other}")),
        }
    }
}

/// A customer account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Customer {
    pub id: CustomerId,
    pub email: String,
    pub tier: CustomerTier,
}

/// A `[min_qty, max_qty)` price band overriding the base unit price.
///
/// `max_qty = None` means the band is open-ended. Bands are assumed
/// non-overlapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BulkPrice {
    pub min_qty: u32,
    pub max_qty: Option<u32>,
    pub price: Money,
}

impl BulkPrice {
    /// Returns true if `quantity` falls inside `[min_qty, max_qty ?? ∞)`.
    pub fn contains(&self, quantity: u32) -> bool {
        quantity >= self.min_qty && self.max_qty.map_or(true, |max| quantity <= max)
    }
}

/// A price override keyed by customer tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SegmentPrice {
    pub tier: CustomerTier,
    pub price: Money,
}

/// A sellable product variant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Variant {
    pub id: VariantId,
    pub sku: String,
    pub name: String,
    pub unit_price: Money,
    /// Shipping weight in ounces.
    pub weight_oz: u32,
    pub bulk_prices: Vec<BulkPrice>,
    pub segment_prices: Vec<SegmentPrice>,
}

impl Variant {
    /// Finds the bulk tier covering `quantity`, if any.
    pub fn bulk_price_for(&self, quantity: u32) -> Option<&BulkPrice> {
        self.bulk_prices.iter().find(|bp| bp.contains(quantity))
    }

    /// Finds the segment price for a customer tier, if any.
    pub fn segment_price_for(&self, tier: CustomerTier) -> Option<Money> {
        self.segment_prices
            .iter()
            .find(|sp| sp.tier == tier)
            .map(|sp| sp.price)
    }
}

/// A subtotal band mapping to a flat shipping rate.
///
/// Bands are assumed non-overlapping; `max_subtotal = None` is open-ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShippingTier {
    pub min_subtotal: Money,
    pub max_subtotal: Option<Money>,
    pub shipping_rate: Money,
    pub is_active: bool,
}

impl ShippingTier {
    /// Returns true if `amount` falls inside this tier's band.
    pub fn contains(&self, amount: Money) -> bool {
        amount >= self.min_subtotal && self.max_subtotal.map_or(true, |max| amount < max)
    }
}
