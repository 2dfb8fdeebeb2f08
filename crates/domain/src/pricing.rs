//! The financial calculator.
//!
//! Pure computation with no I/O: subtotal via per-variant bulk-price tiers,
//! discount (explicit override or the automatic high-value rule), shipping
//! (tiered lookup with manual override), tax pass-through, payment fee, and
//! the grand total. Every intermediate is whole cents, so each accumulation
//! step is rounded by construction.

use common::VariantId;
use serde::{Deserialize, Serialize};

use crate::catalog::{BulkPrice, CustomerTier, ShippingTier, Variant};
use crate::money::Money;

/// Subtotal at or above which qualifying B2B customers get the automatic
/// discount.
pub const VOLUME_DISCOUNT_THRESHOLD: Money = Money::from_cents(500_000);

/// Automatic discount percentage for qualifying high-value orders.
pub const VOLUME_DISCOUNT_PCT: f64 = 10.0;

/// One line of input to the calculator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PricingItem {
    pub variant_id: VariantId,
    pub quantity: u32,
    /// Base unit price for the line (usually the cart's captured price).
    pub unit_price: Money,
    /// Tier-segment override for this customer, when the variant defines one.
    pub segment_price: Option<Money>,
    pub bulk_prices: Vec<BulkPrice>,
}

impl PricingItem {
    /// Builds a pricing line from a catalog variant, resolving the segment
    /// price for the customer's tier.
    pub fn from_variant(
        variant: &Variant,
        tier: CustomerTier,
        quantity: u32,
        unit_price: Money,
    ) -> Self {
        Self {
            variant_id: variant.id,
            quantity,
            unit_price,
            segment_price: variant.segment_price_for(tier),
            bulk_prices: variant.bulk_prices.clone(),
        }
    }
}

/// Full input to the calculator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PricingInput {
    pub items: Vec<PricingItem>,
    pub tier: CustomerTier,
    /// Explicit discount; wins over the automatic rule when positive.
    pub discount_override: Option<Money>,
    /// Manual shipping charge; wins over the tier lookup.
    pub shipping_override: Option<Money>,
    /// Tax is supplied by the caller and only participates in totaling.
    pub tax: Money,
    /// Payment-fee percentage applied on top of the fee base.
    pub fee_percent: Option<f64>,
    pub shipping_tiers: Vec<ShippingTier>,
}

/// A priced output line, ready to persist as an `OrderItem`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PricedItem {
    pub variant_id: VariantId,
    pub quantity: u32,
    pub unit_price: Money,
    pub total_price: Money,
    pub bulk_unit_price: Option<Money>,
    pub bulk_total_price: Option<Money>,
}

/// Authoritative totals for an order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderTotals {
    pub items: Vec<PricedItem>,
    pub subtotal: Money,
    pub discount: Money,
    pub shipping: Money,
    pub tax: Money,
    pub payment_fee: Money,
    pub total: Money,
}

/// Computes authoritative order totals.
///
/// Malformed tier tables never error; they simply fail to match and fall
/// through to the defaults.
pub fn price_order(input: &PricingInput) -> OrderTotals {
    let mut items = Vec::with_capacity(input.items.len());
    let mut subtotal = Money::zero();

    for line in &input.items {
        let base_price = line.segment_price.unwrap_or(line.unit_price);
        let bulk = line
            .bulk_prices
            .iter()
            .find(|bp| bp.contains(line.quantity));

        let effective = bulk.map_or(base_price, |bp| bp.price);
        let total_price = effective.multiply(line.quantity);
        subtotal += total_price;

        items.push(PricedItem {
            variant_id: line.variant_id,
            quantity: line.quantity,
            unit_price: base_price,
            total_price,
            bulk_unit_price: bulk.map(|bp| bp.price),
            bulk_total_price: bulk.map(|bp| bp.price.multiply(line.quantity)),
        });
    }

    let discount = match input.discount_override {
        Some(d) if d.is_positive() => d,
        _ => {
            if input.tier.qualifies_for_volume_discount() && subtotal >= VOLUME_DISCOUNT_THRESHOLD {
                subtotal.percent(VOLUME_DISCOUNT_PCT)
            } else {
                Money::zero()
            }
        }
    };

    let discounted = subtotal.saturating_sub(discount);

    let shipping = input.shipping_override.unwrap_or_else(|| {
        input
            .shipping_tiers
            .iter()
            .filter(|t| t.is_active && t.contains(discounted))
            .max_by_key(|t| t.min_subtotal)
            .map(|t| t.shipping_rate)
            .unwrap_or_else(Money::zero)
    });

    let fee_base = discounted + input.tax + shipping;
    let payment_fee = input
        .fee_percent
        .map(|pct| fee_base.percent(pct))
        .unwrap_or_else(Money::zero);

    OrderTotals {
        items,
        subtotal,
        discount,
        shipping,
        tax: input.tax,
        payment_fee,
        total: fee_base + payment_fee,
    }
}
