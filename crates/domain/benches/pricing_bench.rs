use common::VariantId;
use criterion::{criterion_group, criterion_main, Criterion};
use domain::{
    haversine_km, price_order, BulkPrice, Coordinates, CustomerTier, Geolocator, Money,
    PricingInput, PricingItem, ShippingTier,
};

fn pricing_input(lines: usize) -> PricingInput {
    let items = (0..lines)
        .map(|i| PricingItem {
            variant_id: VariantId::new(),
            quantity: (i as u32 % 30) + 1,
            unit_price: Money::from_cents(1000 + i as i64),
            segment_price: None,
            bulk_prices: vec![
                BulkPrice {
                    min_qty: 10,
                    max_qty: Some(19),
                    price: Money::from_cents(800),
                },
                BulkPrice {
                    min_qty: 20,
                    max_qty: None,
                    price: Money::from_cents(700),
                },
            ],
        })
        .collect();

    PricingInput {
        items,
        tier: CustomerTier::WholesaleHigh,
        discount_override: None,
        shipping_override: None,
        tax: Money::from_cents(825),
        fee_percent: Some(2.9),
        shipping_tiers: vec![
            ShippingTier {
                min_subtotal: Money::zero(),
                max_subtotal: Some(Money::from_dollars(100)),
                shipping_rate: Money::from_cents(999),
                is_active: true,
            },
            ShippingTier {
                min_subtotal: Money::from_dollars(100),
                max_subtotal: None,
                shipping_rate: Money::zero(),
                is_active: true,
            },
        ],
    }
}

fn bench_price_order(c: &mut Criterion) {
    let small = pricing_input(3);
    let large = pricing_input(100);

    c.bench_function("pricing/price_order_3_lines", |b| {
        b.iter(|| price_order(&small));
    });

    c.bench_function("pricing/price_order_100_lines", |b| {
        b.iter(|| price_order(&large));
    });
}

fn bench_geolocate(c: &mut Criterion) {
    let geo = Geolocator::new();

    c.bench_function("geo/locate_exact_match", |b| {
        b.iter(|| geo.locate("Chicago", "IL", "US"));
    });

    c.bench_function("geo/locate_centroid_fallback", |b| {
        b.iter(|| geo.locate("Nowheresville", "??", "US"));
    });
}

fn bench_haversine(c: &mut Criterion) {
    let nyc = Coordinates::new(40.7128, -74.0060);
    let la = Coordinates::new(34.0522, -118.2437);

    c.bench_function("geo/haversine_km", |b| {
        b.iter(|| haversine_km(nyc, la));
    });
}

criterion_group!(benches, bench_price_order, bench_geolocate, bench_haversine);
criterion_main!(benches);
