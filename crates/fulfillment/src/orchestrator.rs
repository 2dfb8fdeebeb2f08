//! Payment orchestration for checkout.
//!
//! Drives one checkout attempt end to end: snapshot assembly, duplicate
//! guard, the gateway conversation, ledger writes, and stock reservation.
//! The cardinal rule is that once the gateway may have moved money, every
//! later problem degrades the outcome instead of failing it, so the audit
//! trail always reflects what the customer was charged.

use std::collections::HashMap;

use chrono::{Duration, Utc};
use common::{CartId, CustomerId, OrderId, PaymentId, TransactionId, VariantId};
use domain::{
    price_order, Address, Money, Order, OrderItem, OrderNote, OrderStatus, OrderTotals, Payment,
    PaymentStatus, PricedItem, PricingInput, PricingItem, Transaction,
};
use serde::{Deserialize, Serialize};
use store::Store;

use crate::config::Config;
use crate::error::{FulfillmentError, Result};
use crate::gateway::{ChargeLineItem, ChargeRequest, GatewayResponse, PaymentGateway};
use crate::reservation::ReservationManager;
use crate::selector::{RequiredItem, WarehouseSelector};
use crate::state::{CheckoutPhase, GatewayDisposition};

/// One checkout attempt.
///
/// Either `order_id` names an existing pending order to charge, or the
/// customer's active cart is priced into a new order.
#[derive(Debug, Clone)]
pub struct CheckoutRequest {
    pub customer_id: CustomerId,
    pub order_id: Option<OrderId>,
    /// Explicit charge amount; computed from the order or cart when absent.
    pub amount: Option<Money>,
    pub card_number: String,
    pub card_expiry: String,
    pub card_cvv: Option<String>,
    pub billing_address: Address,
    pub shipping_address: Address,
    pub tax: Money,
    pub fee_percent: Option<f64>,
    pub payment_method: String,
}

/// Gateway fields surfaced on the checkout outcome.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GatewaySummary {
    pub response_code: i64,
    pub transaction_id: String,
    pub auth_code: String,
    pub avs_result_code: String,
    pub cvv_result_code: String,
    pub message: String,
}

impl GatewaySummary {
    fn from_response(resp: &GatewayResponse) -> Self {
        Self {
            response_code: resp.response_code,
            transaction_id: resp.transaction_id.clone(),
            auth_code: resp.auth_code.clone(),
            avs_result_code: resp.avs_result_code.clone(),
            cvv_result_code: resp.cvv_result_code.clone(),
            message: resp.message.clone(),
        }
    }
}

/// The result of a checkout that reached the gateway.
///
/// `success = false` means the gateway answered with a decline or was
/// unreachable; the failed attempt is fully persisted either way.
#[derive(Debug, Clone, PartialEq)]
pub struct CheckoutOutcome {
    pub success: bool,
    pub error: Option<String>,
    pub gateway: Option<GatewaySummary>,
    pub order_id: OrderId,
    pub transaction_id: TransactionId,
    /// True when stock was reserved through the emergency fallback path
    /// rather than at the selected warehouse.
    pub reservation_degraded: bool,
}

/// Where the priced snapshot came from.
enum SnapshotSource {
    Existing(Order),
    Cart { cart_id: CartId, totals: OrderTotals },
}

/// In-memory priced view of what is being charged. Persisted only after the
/// gateway has answered.
struct OrderSnapshot {
    amount: Money,
    lines: Vec<PricedItem>,
    line_names: HashMap<VariantId, (String, String)>,
    source: SnapshotSource,
}

/// Orchestrates checkout attempts against a store and a payment gateway.
pub struct PaymentOrchestrator<S: Store, G: PaymentGateway> {
    store: S,
    gateway: G,
    selector: WarehouseSelector,
    reservations: ReservationManager,
    config: Config,
}

impl<S: Store, G: PaymentGateway> PaymentOrchestrator<S, G> {
    /// Creates a new orchestrator.
    pub fn new(store: S, gateway: G, config: Config) -> Self {
        let reservations = ReservationManager::new(config.low_stock_alert);
        Self {
            store,
            gateway,
            selector: WarehouseSelector::new(),
            reservations,
            config,
        }
    }

    /// Gets a reference to the active configuration.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Runs one checkout attempt.
    ///
    /// Errors are returned only for problems found before the gateway was
    /// called: validation failures, the duplicate guard, store faults.
    /// After the gateway answers, the attempt always resolves to an
    /// `Ok(CheckoutOutcome)` carrying the persisted order and ledger ids.
    #[tracing::instrument(skip(self, req), fields(customer = %req.customer_id))]
    pub async fn checkout(&self, req: &CheckoutRequest) -> Result<CheckoutOutcome> {
        metrics::counter!("checkout_attempts_total").increment(1);
        let started = std::time::Instant::now();

        self.validate(req)?;
        let snapshot = self.assemble_snapshot(req).await?;
        self.duplicate_guard(req, snapshot.amount).await?;

        let charge_req = self.build_charge_request(req, &snapshot);
        tracing::debug!(phase = %CheckoutPhase::GatewayCalled, amount = %snapshot.amount, "sending charge");

        let gateway_result = match tokio::time::timeout(
            self.config.gateway_timeout,
            self.gateway.charge(&charge_req),
        )
        .await
        {
            Ok(Ok(resp)) => Ok(resp),
            Ok(Err(e)) => Err(e.to_string()),
            Err(_) => Err("gateway call timed out".to_string()),
        };

        let (outcome, phase) = match gateway_result {
            Err(reason) => {
                metrics::counter!("checkout_declined").increment(1);
                let outcome = self.record_failure(req, &snapshot, None, &reason).await?;
                (outcome, CheckoutPhase::Unreachable)
            }
            Ok(resp) => match GatewayDisposition::classify(resp.response_code) {
                GatewayDisposition::Declined => {
                    metrics::counter!("checkout_declined").increment(1);
                    let reason = resp.message.clone();
                    let outcome = self
                        .record_failure(req, &snapshot, Some(&resp), &reason)
                        .await?;
                    (outcome, CheckoutPhase::Declined)
                }
                disposition => {
                    metrics::counter!("checkout_approved").increment(1);
                    let mut outcome = self
                        .record_success(req, &snapshot, &resp, disposition)
                        .await?;
                    let phase = self
                        .reserve_for_order(req, &snapshot, outcome.order_id)
                        .await;
                    outcome.reservation_degraded = phase.reservation_degraded();
                    (outcome, phase)
                }
            },
        };

        metrics::histogram!("checkout_duration_seconds").record(started.elapsed().as_secs_f64());
        tracing::info!(
            phase = %phase,
            success = outcome.success,
            order = %outcome.order_id,
            transaction = %outcome.transaction_id,
            "checkout finished"
        );
        Ok(outcome)
    }

    fn validate(&self, req: &CheckoutRequest) -> Result<()> {
        let digits = req.card_number.trim();
        // The duplicate guard and gateway masking slice off the trailing
        // four digits; anything non-ASCII here is garbage input
        if digits.len() < 4 || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return Err(FulfillmentError::Validation(
                "card number must be at least four digits".to_string(),
            ));
        }
        if req.card_expiry.trim().is_empty() {
            return Err(FulfillmentError::Validation(
                "card expiry is required".to_string(),
            ));
        }
        Ok(())
    }

    /// Builds the priced in-memory view of the charge. Nothing is persisted
    /// here; order rows only exist once the gateway has answered.
    async fn assemble_snapshot(&self, req: &CheckoutRequest) -> Result<OrderSnapshot> {
        if let Some(order_id) = req.order_id {
            let order = self.store.get_order(order_id).await?.ok_or_else(|| {
                FulfillmentError::Validation(format!("order {order_id} not found"))
            })?;
            if !order.status.can_attempt_payment() {
                return Err(FulfillmentError::Validation(format!(
                    "order {} is {} and cannot be charged",
                    order.id, order.status
                )));
            }

            let items = self.store.order_items(order_id).await?;
            let lines: Vec<PricedItem> = items
                .into_iter()
                .map(|item| PricedItem {
                    variant_id: item.variant_id,
                    quantity: item.quantity,
                    unit_price: item.unit_price,
                    total_price: item.total_price,
                    bulk_unit_price: item.bulk_unit_price,
                    bulk_total_price: item.bulk_total_price,
                })
                .collect();
            let line_names = self.variant_names(&lines).await?;

            Ok(OrderSnapshot {
                amount: req.amount.unwrap_or(order.total_amount),
                lines,
                line_names,
                source: SnapshotSource::Existing(order),
            })
        } else {
            let cart = self
                .store
                .active_cart(req.customer_id)
                .await?
                .ok_or_else(|| {
                    FulfillmentError::Validation("customer has no active cart".to_string())
                })?;
            let cart_items = self.store.cart_items(cart.id).await?;
            if cart_items.is_empty() {
                return Err(FulfillmentError::Validation("cart is empty".to_string()));
            }

            let tier = self
                .store
                .get_customer(req.customer_id)
                .await?
                .map(|c| c.tier)
                .unwrap_or_default();

            let mut pricing_items = Vec::with_capacity(cart_items.len());
            let mut line_names = HashMap::new();
            for item in &cart_items {
                let variant = self.store.get_variant(item.variant_id).await?.ok_or_else(|| {
                    FulfillmentError::Validation(format!("variant {} not found", item.variant_id))
                })?;
                pricing_items.push(PricingItem::from_variant(
                    &variant,
                    tier,
                    item.quantity,
                    item.unit_price,
                ));
                line_names.insert(variant.id, (variant.sku, variant.name));
            }

            let shipping_tiers = self.store.active_shipping_tiers().await?;
            let totals = price_order(&PricingInput {
                items: pricing_items,
                tier,
                discount_override: None,
                shipping_override: None,
                tax: req.tax,
                fee_percent: req.fee_percent,
                shipping_tiers,
            });

            Ok(OrderSnapshot {
                amount: req.amount.unwrap_or(totals.total),
                lines: totals.items.clone(),
                line_names,
                source: SnapshotSource::Cart {
                    cart_id: cart.id,
                    totals,
                },
            })
        }
    }

    async fn variant_names(
        &self,
        lines: &[PricedItem],
    ) -> Result<HashMap<VariantId, (String, String)>> {
        let mut names = HashMap::new();
        for line in lines {
            if let Some(variant) = self.store.get_variant(line.variant_id).await? {
                names.insert(variant.id, (variant.sku, variant.name));
            }
        }
        Ok(names)
    }

    /// Rejects the attempt when a matching charge was already taken inside
    /// the lookback window.
    ///
    /// The match key is approximate by design: same gateway, same amount,
    /// and the card's last four digits appearing in a recent diagnostic
    /// blob. It catches accidental double submits without requiring a real
    /// idempotency key from callers.
    async fn duplicate_guard(&self, req: &CheckoutRequest, amount: Money) -> Result<()> {
        let cutoff = Utc::now() - Duration::seconds(self.config.duplicate_window_secs);
        let recent = self
            .store
            .transactions_since(&self.config.gateway_name, cutoff)
            .await?;

        let digits = req.card_number.trim();
        let last4 = &digits[digits.len().saturating_sub(4)..];

        if let Some(hit) = recent
            .iter()
            .find(|tx| tx.amount == amount && tx.gateway_response.contains(last4))
        {
            metrics::counter!("checkout_duplicate_rejected").increment(1);
            tracing::warn!(matched = %hit.id, amount = %amount, "duplicate charge rejected");
            return Err(FulfillmentError::DuplicateCharge(format!(
                "matching charge {} taken at {}",
                hit.id, hit.created_at
            )));
        }
        Ok(())
    }

    fn build_charge_request(&self, req: &CheckoutRequest, snapshot: &OrderSnapshot) -> ChargeRequest {
        let description = match &snapshot.source {
            SnapshotSource::Existing(order) => format!("Payment for order {}", order.id),
            SnapshotSource::Cart { cart_id, .. } => format!("Checkout for cart {cart_id}"),
        };

        let mut charge = ChargeRequest::new(
            snapshot.amount,
            req.card_number.trim(),
            req.card_expiry.trim(),
            &req.customer_id.to_string(),
            &description,
        );
        if let Some(cvv) = &req.card_cvv {
            charge = charge.with_cvv(cvv.clone());
        }

        let line_items = snapshot
            .lines
            .iter()
            .map(|line| {
                let (sku, name) = snapshot
                    .line_names
                    .get(&line.variant_id)
                    .cloned()
                    .unwrap_or_else(|| {
                        let id = line.variant_id.to_string();
                        (id.clone(), id)
                    });
                ChargeLineItem::new(&sku, &name, line.quantity, line.unit_price)
            })
            .collect();
        charge.with_line_items(line_items)
    }

    /// Creates the order row and its satellites from a cart snapshot.
    async fn create_order(
        &self,
        req: &CheckoutRequest,
        snapshot: &OrderSnapshot,
        totals: &OrderTotals,
        cart_id: CartId,
        status: OrderStatus,
    ) -> Result<Order> {
        self.store.insert_address(&req.billing_address).await?;
        self.store.insert_address(&req.shipping_address).await?;

        let order = Order {
            id: OrderId::new(),
            customer_id: req.customer_id,
            status,
            subtotal: totals.subtotal,
            discount_amount: totals.discount,
            shipping_amount: totals.shipping,
            tax_amount: totals.tax,
            total_amount: snapshot.amount,
            billing_address_id: req.billing_address.id,
            shipping_address_id: req.shipping_address.id,
            created_at: Utc::now(),
        };
        self.store.insert_order(&order).await?;

        let items: Vec<OrderItem> = snapshot
            .lines
            .iter()
            .map(|line| OrderItem {
                order_id: order.id,
                variant_id: line.variant_id,
                quantity: line.quantity,
                unit_price: line.unit_price,
                total_price: line.total_price,
                bulk_unit_price: line.bulk_unit_price,
                bulk_total_price: line.bulk_total_price,
            })
            .collect();
        self.store.insert_order_items(&items).await?;

        self.store
            .insert_order_note(&OrderNote::internal(
                order.id,
                format!("Order created from cart {cart_id}"),
            ))
            .await?;

        if totals.payment_fee.is_positive() {
            let base = totals.subtotal.saturating_sub(totals.discount) + totals.tax + totals.shipping;
            self.store
                .insert_order_note(&OrderNote::internal(
                    order.id,
                    format!(
                        "Payment processing fee {} applied on base {}",
                        totals.payment_fee, base
                    ),
                ))
                .await?;
        }

        Ok(order)
    }

    /// Persists a failed attempt: order (created pending when needed),
    /// FAILED ledger rows, and an explanatory note.
    async fn record_failure(
        &self,
        req: &CheckoutRequest,
        snapshot: &OrderSnapshot,
        resp: Option<&GatewayResponse>,
        reason: &str,
    ) -> Result<CheckoutOutcome> {
        let order = match &snapshot.source {
            SnapshotSource::Existing(order) => order.clone(),
            SnapshotSource::Cart { cart_id, totals } => {
                self.create_order(req, snapshot, totals, *cart_id, OrderStatus::Pending)
                    .await?
            }
        };

        let transaction = Transaction {
            id: TransactionId::new(),
            order_id: order.id,
            amount: snapshot.amount,
            payment_status: PaymentStatus::Failed,
            gateway_name: self.config.gateway_name.clone(),
            gateway_transaction_id: resp.map(|r| r.transaction_id.clone()).unwrap_or_default(),
            gateway_response: resp
                .map(GatewayResponse::diagnostic_blob)
                .unwrap_or_else(|| Transaction::bound_gateway_response(reason)),
            created_at: Utc::now(),
        };
        self.store.insert_transaction(&transaction).await?;

        self.store
            .insert_payment(&Payment {
                id: PaymentId::new(),
                order_id: order.id,
                payment_method: req.payment_method.clone(),
                provider: self.config.gateway_name.clone(),
                transaction_id: transaction.id,
                amount: snapshot.amount,
                currency: "USD".to_string(),
                status: PaymentStatus::Failed,
                paid_at: None,
                created_at: Utc::now(),
            })
            .await?;

        self.store
            .insert_order_note(&OrderNote::internal(
                order.id,
                format!("Payment failed: {reason}"),
            ))
            .await?;

        tracing::warn!(order = %order.id, reason, "charge failed");
        Ok(CheckoutOutcome {
            success: false,
            error: Some(reason.to_string()),
            gateway: resp.map(GatewaySummary::from_response),
            order_id: order.id,
            transaction_id: transaction.id,
            reservation_degraded: false,
        })
    }

    /// Persists an approved or held attempt: order creation or status
    /// update, ledger rows, cart clearing, verification warnings.
    async fn record_success(
        &self,
        req: &CheckoutRequest,
        snapshot: &OrderSnapshot,
        resp: &GatewayResponse,
        disposition: GatewayDisposition,
    ) -> Result<CheckoutOutcome> {
        let approved = disposition == GatewayDisposition::Approved;
        // Held charges leave the order pending until a human releases them
        let order_status = if approved {
            OrderStatus::Processing
        } else {
            OrderStatus::Pending
        };

        let order = match &snapshot.source {
            SnapshotSource::Existing(order) => {
                self.store.set_order_status(order.id, order_status).await?;
                order.clone()
            }
            SnapshotSource::Cart { cart_id, totals } => {
                let order = self
                    .create_order(req, snapshot, totals, *cart_id, order_status)
                    .await?;
                self.store.clear_cart(*cart_id).await?;
                order
            }
        };

        if approved && (!resp.avs_matched() || !resp.cvv_matched()) {
            tracing::warn!(
                order = %order.id,
                avs = %resp.avs_result_code,
                cvv = %resp.cvv_result_code,
                "verification mismatch on approved charge"
            );
        }

        let payment_status = if approved {
            PaymentStatus::Completed
        } else {
            PaymentStatus::Pending
        };

        let transaction = Transaction {
            id: TransactionId::new(),
            order_id: order.id,
            amount: snapshot.amount,
            payment_status,
            gateway_name: self.config.gateway_name.clone(),
            gateway_transaction_id: resp.transaction_id.clone(),
            gateway_response: resp.diagnostic_blob(),
            created_at: Utc::now(),
        };
        self.store.insert_transaction(&transaction).await?;

        self.store
            .insert_payment(&Payment {
                id: PaymentId::new(),
                order_id: order.id,
                payment_method: req.payment_method.clone(),
                provider: self.config.gateway_name.clone(),
                transaction_id: transaction.id,
                amount: snapshot.amount,
                currency: "USD".to_string(),
                status: payment_status,
                paid_at: approved.then(Utc::now),
                created_at: Utc::now(),
            })
            .await?;

        tracing::info!(
            order = %order.id,
            disposition = %disposition,
            gateway_txn = %resp.transaction_id,
            "charge accepted"
        );
        Ok(CheckoutOutcome {
            success: true,
            error: None,
            gateway: Some(GatewaySummary::from_response(resp)),
            order_id: order.id,
            transaction_id: transaction.id,
            reservation_degraded: false,
        })
    }

    /// Reserves stock for the charged order. Never fails the checkout; the
    /// returned phase says which reservation path completed.
    async fn reserve_for_order(
        &self,
        req: &CheckoutRequest,
        snapshot: &OrderSnapshot,
        order_id: OrderId,
    ) -> CheckoutPhase {
        let required: Vec<RequiredItem> = snapshot
            .lines
            .iter()
            .map(|line| RequiredItem {
                variant_id: line.variant_id,
                quantity: line.quantity,
            })
            .collect();
        if required.is_empty() {
            return CheckoutPhase::Reserved;
        }

        match self
            .selector
            .select(&self.store, &req.shipping_address, &required)
            .await
        {
            Ok(pick) => {
                match self
                    .reservations
                    .reserve(&self.store, pick.warehouse.id, &required)
                    .await
                {
                    Ok(_) => CheckoutPhase::Reserved,
                    Err(e) => {
                        tracing::warn!(
                            order = %order_id,
                            warehouse = %pick.warehouse.id,
                            error = %e,
                            "reservation failed, trying fallback"
                        );
                        self.fallback_reserve(order_id, &required).await
                    }
                }
            }
            Err(e) => {
                tracing::warn!(order = %order_id, error = %e, "warehouse selection failed, trying fallback");
                self.fallback_reserve(order_id, &required).await
            }
        }
    }

    /// Last-resort reservation: any inventory row anywhere for each variant.
    /// Individual failures are logged and skipped; the order was already
    /// charged and must not fail here.
    async fn fallback_reserve(
        &self,
        order_id: OrderId,
        required: &[RequiredItem],
    ) -> CheckoutPhase {
        metrics::counter!("reservation_fallback_total").increment(1);
        let mut all_reserved = true;

        for item in required {
            let rows = match self.store.inventory_for_variant(item.variant_id).await {
                Ok(rows) => rows,
                Err(e) => {
                    tracing::warn!(order = %order_id, variant = %item.variant_id, error = %e, "fallback inventory lookup failed");
                    all_reserved = false;
                    continue;
                }
            };
            let Some(row) = rows.first() else {
                tracing::warn!(order = %order_id, variant = %item.variant_id, "no inventory row anywhere for variant");
                all_reserved = false;
                continue;
            };
            if let Err(e) = self
                .store
                .reserve_stock(item.variant_id, row.location_id, item.quantity)
                .await
            {
                tracing::warn!(order = %order_id, variant = %item.variant_id, error = %e, "fallback reservation failed");
                all_reserved = false;
            }
        }

        if all_reserved {
            CheckoutPhase::ReserveFailedFallbackOk
        } else {
            CheckoutPhase::ReserveFailedFallbackFailed
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::InMemoryPaymentGateway;
    use domain::{Cart, CartItem, Variant};
    use store::InMemoryStore;

    type TestOrchestrator = PaymentOrchestrator<InMemoryStore, InMemoryPaymentGateway>;

    fn setup() -> (TestOrchestrator, InMemoryStore, InMemoryPaymentGateway) {
        let store = InMemoryStore::new();
        let gateway = InMemoryPaymentGateway::new();
        let orchestrator =
            PaymentOrchestrator::new(store.clone(), gateway.clone(), Config::default());
        (orchestrator, store, gateway)
    }

    fn request(customer_id: CustomerId) -> CheckoutRequest {
        CheckoutRequest {
            customer_id,
            order_id: None,
            amount: None,
            card_number: "4111111111111111".to_string(),
            card_expiry: "2030-12".to_string(),
            card_cvv: None,
            billing_address: Address::new("Ada", "1 Main St", "Austin", "TX", "78701", "US"),
            shipping_address: Address::new("Ada", "1 Main St", "Austin", "TX", "78701", "US"),
            tax: Money::zero(),
            fee_percent: None,
            payment_method: "credit_card".to_string(),
        }
    }

    async fn seed_cart(store: &InMemoryStore, customer_id: CustomerId, variant: &Variant) {
        store.insert_variant(variant).await.unwrap();
        let cart = Cart::new(customer_id);
        store.insert_cart(&cart).await.unwrap();
        store
            .insert_cart_item(&CartItem {
                cart_id: cart.id,
                variant_id: variant.id,
                quantity: 1,
                unit_price: variant.unit_price,
            })
            .await
            .unwrap();
    }

    fn variant(name: &str) -> Variant {
        Variant {
            id: VariantId::new(),
            sku: "SKU-001".to_string(),
            name: name.to_string(),
            unit_price: Money::from_cents(2500),
            weight_oz: 16,
            bulk_prices: vec![],
            segment_prices: vec![],
        }
    }

    #[tokio::test]
    async fn test_short_card_number_is_rejected_before_anything_runs() {
        let (orchestrator, _store, gateway) = setup();
        let mut req = request(CustomerId::new());
        req.card_number = "41".to_string();

        let result = orchestrator.checkout(&req).await;
        assert!(matches!(result, Err(FulfillmentError::Validation(_))));
        assert_eq!(gateway.charge_count(), 0);
    }

    #[tokio::test]
    async fn test_non_digit_card_number_is_rejected() {
        let (orchestrator, _store, gateway) = setup();
        let mut req = request(CustomerId::new());
        req.card_number = "xx€€".to_string();

        let result = orchestrator.checkout(&req).await;
        assert!(matches!(result, Err(FulfillmentError::Validation(_))));
        assert_eq!(gateway.charge_count(), 0);

        req.card_number = "4111-1111".to_string();
        let result = orchestrator.checkout(&req).await;
        assert!(matches!(result, Err(FulfillmentError::Validation(_))));
    }

    #[tokio::test]
    async fn test_blank_expiry_is_rejected() {
        let (orchestrator, _store, _gateway) = setup();
        let mut req = request(CustomerId::new());
        req.card_expiry = "  ".to_string();

        let result = orchestrator.checkout(&req).await;
        assert!(matches!(result, Err(FulfillmentError::Validation(_))));
    }

    #[tokio::test]
    async fn test_missing_cart_is_rejected() {
        let (orchestrator, _store, gateway) = setup();

        let result = orchestrator.checkout(&request(CustomerId::new())).await;
        assert!(matches!(result, Err(FulfillmentError::Validation(_))));
        assert_eq!(gateway.charge_count(), 0);
    }

    #[tokio::test]
    async fn test_charge_request_carries_truncated_line_items() {
        let (orchestrator, store, gateway) = setup();
        let customer_id = CustomerId::new();
        let long_name = "Widget ".repeat(20);
        seed_cart(&store, customer_id, &variant(&long_name)).await;

        orchestrator.checkout(&request(customer_id)).await.unwrap();

        let sent = gateway.last_request().unwrap();
        assert_eq!(sent.line_items.len(), 1);
        assert!(sent.line_items[0].name.len() <= 31);
        assert_eq!(sent.amount, Money::from_cents(2500));
    }

    #[tokio::test]
    async fn test_explicit_amount_overrides_computed_total() {
        let (orchestrator, store, gateway) = setup();
        let customer_id = CustomerId::new();
        seed_cart(&store, customer_id, &variant("Widget")).await;

        let mut req = request(customer_id);
        req.amount = Some(Money::from_cents(999));
        let outcome = orchestrator.checkout(&req).await.unwrap();

        assert!(outcome.success);
        assert_eq!(gateway.last_request().unwrap().amount, Money::from_cents(999));
        let order = store.get_order(outcome.order_id).await.unwrap().unwrap();
        assert_eq!(order.total_amount, Money::from_cents(999));
    }

    #[tokio::test]
    async fn test_no_warehouse_degrades_instead_of_failing() {
        let (orchestrator, store, _gateway) = setup();
        let customer_id = CustomerId::new();
        seed_cart(&store, customer_id, &variant("Widget")).await;

        // No warehouses at all: the charge still lands, reservation degrades
        let outcome = orchestrator.checkout(&request(customer_id)).await.unwrap();
        assert!(outcome.success);
        assert!(outcome.reservation_degraded);
    }
}
