//! Payment gateway trait and in-memory implementation.

use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use domain::{Money, Transaction};
use serde::{Deserialize, Serialize};

use crate::error::FulfillmentError;

/// Gateway field limits, enforced at request build time.
const LINE_ITEM_ID_MAX: usize = 31;
const LINE_ITEM_NAME_MAX: usize = 31;
const DESCRIPTION_MAX: usize = 255;
const CUSTOMER_REF_MAX: usize = 20;

/// Truncates a string to `max` bytes on a char boundary.
fn bounded(value: &str, max: usize) -> String {
    if value.len() <= max {
        return value.to_string();
    }
    let mut end = max;
    while !value.is_char_boundary(end) {
        end -= 1;
    }
    value[..end].to_string()
}

/// One line item forwarded to the gateway.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChargeLineItem {
    pub id: String,
    pub name: String,
    pub quantity: u32,
    pub unit_price: Money,
}

impl ChargeLineItem {
    /// Builds a line item, truncating id and name to the gateway limits.
    pub fn new(id: &str, name: &str, quantity: u32, unit_price: Money) -> Self {
        Self {
            id: bounded(id, LINE_ITEM_ID_MAX),
            name: bounded(name, LINE_ITEM_NAME_MAX),
            quantity,
            unit_price,
        }
    }
}

/// A charge request shaped to the gateway's field limits.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChargeRequest {
    pub amount: Money,
    pub card_number: String,
    pub card_expiry: String,
    pub card_cvv: Option<String>,
    pub customer_ref: String,
    pub description: String,
    pub line_items: Vec<ChargeLineItem>,
}

impl ChargeRequest {
    /// Builds a charge request. Customer reference and description are
    /// truncated to the gateway limits.
    pub fn new(
        amount: Money,
        card_number: impl Into<String>,
        card_expiry: impl Into<String>,
        customer_ref: &str,
        description: &str,
    ) -> Self {
        Self {
            amount,
            card_number: card_number.into(),
            card_expiry: card_expiry.into(),
            card_cvv: None,
            customer_ref: bounded(customer_ref, CUSTOMER_REF_MAX),
            description: bounded(description, DESCRIPTION_MAX),
            line_items: Vec::new(),
        }
    }

    /// Sets the card verification value.
    pub fn with_cvv(mut self, cvv: impl Into<String>) -> Self {
        self.card_cvv = Some(cvv.into());
        self
    }

    /// Attaches line items (already truncated by [`ChargeLineItem::new`]).
    pub fn with_line_items(mut self, items: Vec<ChargeLineItem>) -> Self {
        self.line_items = items;
        self
    }

    /// Last four digits of the card number.
    pub fn card_last4(&self) -> &str {
        let digits = self.card_number.len();
        if digits <= 4 {
            &self.card_number
        } else {
            &self.card_number[digits - 4..]
        }
    }
}

/// The gateway's answer to one charge conversation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GatewayResponse {
    /// Envelope-level result ("Ok" or "Error").
    pub result_code: String,
    pub transaction_id: String,
    /// Numeric disposition code; see [`crate::GatewayDisposition::classify`].
    pub response_code: i64,
    pub auth_code: String,
    pub avs_result_code: String,
    pub cvv_result_code: String,
    /// Masked account number echoed by the gateway (e.g. `XXXX1111`).
    pub account_number: String,
    pub message: String,
}

impl GatewayResponse {
    /// Serializes the response into the bounded diagnostic blob stored on
    /// the transaction ledger row.
    pub fn diagnostic_blob(&self) -> String {
        let raw = serde_json::to_string(self).unwrap_or_default();
        Transaction::bound_gateway_response(&raw)
    }

    /// Returns true if the AVS result is one of the full-match codes.
    pub fn avs_matched(&self) -> bool {
        matches!(self.avs_result_code.as_str(), "Y" | "X")
    }

    /// Returns true if the CVV matched.
    pub fn cvv_matched(&self) -> bool {
        self.cvv_result_code == "M"
    }
}

/// Trait for payment gateway operations.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Submits a charge. Returns the gateway's classification payload, or an
    /// error only when the gateway could not be reached at all.
    async fn charge(&self, request: &ChargeRequest) -> Result<GatewayResponse, FulfillmentError>;
}

#[derive(Debug)]
struct InMemoryGatewayState {
    response_code: i64,
    avs_code: String,
    cvv_code: String,
    message: String,
    fail_transport: bool,
    requests: Vec<ChargeRequest>,
    next_id: u32,
}

impl Default for InMemoryGatewayState {
    fn default() -> Self {
        Self {
            response_code: 1,
            avs_code: "Y".to_string(),
            cvv_code: "M".to_string(),
            message: "This transaction has been approved.".to_string(),
            fail_transport: false,
            requests: Vec::new(),
            next_id: 0,
        }
    }
}

/// In-memory payment gateway for testing.
///
/// Approves everything by default; response code, AVS/CVV results and a
/// transport-failure switch are configurable per test.
#[derive(Debug, Clone, Default)]
pub struct InMemoryPaymentGateway {
    state: Arc<RwLock<InMemoryGatewayState>>,
}

impl InMemoryPaymentGateway {
    /// Creates a new approving gateway.
    pub fn new() -> Self {
        Self::default()
    }

    /// Configures the numeric response code returned on the next charges.
    pub fn set_response_code(&self, code: i64) {
        self.state.write().unwrap().response_code = code;
    }

    /// Configures the AVS result code.
    pub fn set_avs_code(&self, code: impl Into<String>) {
        self.state.write().unwrap().avs_code = code.into();
    }

    /// Configures the CVV result code.
    pub fn set_cvv_code(&self, code: impl Into<String>) {
        self.state.write().unwrap().cvv_code = code.into();
    }

    /// Configures the human-readable gateway message.
    pub fn set_message(&self, message: impl Into<String>) {
        self.state.write().unwrap().message = message.into();
    }

    /// Configures the gateway to fail at the transport level.
    pub fn set_fail_transport(&self, fail: bool) {
        self.state.write().unwrap().fail_transport = fail;
    }

    /// Returns the number of charge requests that reached the gateway.
    pub fn charge_count(&self) -> usize {
        self.state.read().unwrap().requests.len()
    }

    /// Returns the most recent charge request, if any.
    pub fn last_request(&self) -> Option<ChargeRequest> {
        self.state.read().unwrap().requests.last().cloned()
    }
}

#[async_trait]
impl PaymentGateway for InMemoryPaymentGateway {
    async fn charge(&self, request: &ChargeRequest) -> Result<GatewayResponse, FulfillmentError> {
        let mut state = self.state.write().unwrap();

        if state.fail_transport {
            return Err(FulfillmentError::GatewayUnreachable(
                "connection refused".to_string(),
            ));
        }

        state.next_id += 1;
        state.requests.push(request.clone());

        let approved = state.response_code == 1;
        Ok(GatewayResponse {
            result_code: if approved { "Ok" } else { "Error" }.to_string(),
            transaction_id: format!("GW-{:06}", state.next_id),
            response_code: state.response_code,
            auth_code: if approved {
                format!("AUTH{:04}", state.next_id)
            } else {
                String::new()
            },
            avs_result_code: state.avs_code.clone(),
            cvv_result_code: state.cvv_code.clone(),
            account_number: format!("XXXX{}", request.card_last4()),
            message: state.message.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_line_item_fields_are_truncated() {
        let long = "x".repeat(100);
        let item = ChargeLineItem::new(&long, &long, 1, Money::from_cents(100));
        assert_eq!(item.id.len(), LINE_ITEM_ID_MAX);
        assert_eq!(item.name.len(), LINE_ITEM_NAME_MAX);
    }

    #[test]
    fn test_request_fields_are_truncated() {
        let long = "y".repeat(500);
        let req = ChargeRequest::new(
            Money::from_cents(1000),
            "4111111111111111",
            "2030-12",
            &long,
            &long,
        );
        assert_eq!(req.customer_ref.len(), CUSTOMER_REF_MAX);
        assert_eq!(req.description.len(), DESCRIPTION_MAX);
    }

    #[test]
    fn test_truncation_respects_char_boundaries() {
        let s = "é".repeat(40);
        let item = ChargeLineItem::new(&s, &s, 1, Money::zero());
        assert!(item.id.len() <= LINE_ITEM_ID_MAX);
        assert!(item.id.chars().all(|c| c == 'é'));
    }

    #[test]
    fn test_card_last4() {
        let req = ChargeRequest::new(Money::zero(), "4111111111111111", "2030-12", "c", "d");
        assert_eq!(req.card_last4(), "1111");
    }

    #[tokio::test]
    async fn test_default_gateway_approves() {
        let gateway = InMemoryPaymentGateway::new();
        let req = ChargeRequest::new(
            Money::from_cents(5000),
            "4111111111111111",
            "2030-12",
            "cust",
            "order",
        );

        let resp = gateway.charge(&req).await.unwrap();
        assert_eq!(resp.response_code, 1);
        assert_eq!(resp.result_code, "Ok");
        assert!(resp.avs_matched());
        assert!(resp.cvv_matched());
        assert_eq!(resp.account_number, "XXXX1111");
        assert_eq!(gateway.charge_count(), 1);
    }

    #[tokio::test]
    async fn test_configured_decline() {
        let gateway = InMemoryPaymentGateway::new();
        gateway.set_response_code(2);
        gateway.set_message("This transaction has been declined.");

        let req = ChargeRequest::new(Money::from_cents(5000), "4111", "2030-12", "c", "d");
        let resp = gateway.charge(&req).await.unwrap();
        assert_eq!(resp.response_code, 2);
        assert!(resp.auth_code.is_empty());
    }

    #[tokio::test]
    async fn test_transport_failure() {
        let gateway = InMemoryPaymentGateway::new();
        gateway.set_fail_transport(true);

        let req = ChargeRequest::new(Money::from_cents(5000), "4111", "2030-12", "c", "d");
        let result = gateway.charge(&req).await;
        assert!(matches!(
            result,
            Err(FulfillmentError::GatewayUnreachable(_))
        ));
        assert_eq!(gateway.charge_count(), 0);
    }

    #[test]
    fn test_diagnostic_blob_is_bounded() {
        let resp = GatewayResponse {
            result_code: "Ok".to_string(),
            transaction_id: "GW-000001".to_string(),
            response_code: 1,
            auth_code: "AUTH0001".to_string(),
            avs_result_code: "Y".to_string(),
            cvv_result_code: "M".to_string(),
            account_number: "XXXX1111".to_string(),
            message: "m".repeat(5000),
        };
        let blob = resp.diagnostic_blob();
        assert!(blob.len() <= domain::payment::GATEWAY_RESPONSE_MAX_LEN);
        assert!(blob.contains("XXXX1111"));
    }
}
