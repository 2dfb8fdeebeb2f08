//! Carrier rate quoting.
//!
//! The rate collaborator is fronted by a trait taking and returning raw JSON:
//! carrier aggregators disagree on both request and response shapes, so the
//! quoter owns the two-attempt request policy and the tolerant response
//! normalization instead of pushing either onto callers.

use std::sync::{Arc, RwLock};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use domain::{Address, Money, Warehouse};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::error::{FulfillmentError, Result};

/// Minimum billable weight in whole pounds.
const MIN_WEIGHT_LB: u32 = 3;

/// Trait for carrier rate collaborators.
#[async_trait]
pub trait CarrierRateService: Send + Sync {
    /// Fetches rates for a shipment payload. The payload shape is owned by
    /// the caller; the response is returned unparsed.
    async fn fetch_rates(&self, payload: &Value) -> Result<Value>;
}

/// Package dimensions in inches.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Dimensions {
    pub length_in: f64,
    pub width_in: f64,
    pub height_in: f64,
}

/// One normalized carrier quote.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RateQuote {
    pub amount: Money,
    pub carrier: String,
    pub service: String,
    pub estimated_days: Option<i64>,
    pub rate_id: String,
    pub guaranteed: bool,
    pub trackable: bool,
}

/// All usable quotes for one shipment, cheapest first.
#[derive(Debug, Clone, PartialEq)]
pub struct RateQuoteSet {
    pub best: RateQuote,
    pub all: Vec<RateQuote>,
}

/// Builds shipment payloads, drives the collaborator and normalizes answers.
pub struct RateQuoter<R: CarrierRateService> {
    service: R,
    timeout: Option<Duration>,
}

impl<R: CarrierRateService> RateQuoter<R> {
    /// Creates a new rate quoter over a collaborator.
    pub fn new(service: R) -> Self {
        Self {
            service,
            timeout: None,
        }
    }

    /// Creates a quoter that bounds each collaborator call to `timeout`.
    pub fn with_timeout(service: R, timeout: Duration) -> Self {
        Self {
            service,
            timeout: Some(timeout),
        }
    }

    async fn fetch(&self, payload: &Value) -> Result<Value> {
        match self.timeout {
            Some(budget) => tokio::time::timeout(budget, self.service.fetch_rates(payload))
                .await
                .map_err(|_| {
                    FulfillmentError::RateService("rate request timed out".to_string())
                })?,
            None => self.service.fetch_rates(payload).await,
        }
    }

    /// Quotes a shipment from a warehouse to a destination address.
    ///
    /// The collaborator is tried twice: first with the shipment nested under
    /// a `"shipment"` key, then flat. A failure on both attempts, an
    /// unrecognized response shape, or zero usable quotes is a hard error;
    /// no synthetic rate is ever invented.
    #[tracing::instrument(skip(self, origin, destination), fields(warehouse = %origin.id))]
    pub async fn quote(
        &self,
        origin: &Warehouse,
        destination: &Address,
        weight_oz: u32,
        dims: Option<Dimensions>,
        carrier: Option<&str>,
    ) -> Result<RateQuoteSet> {
        let shipment = self.shipment_payload(origin, destination, weight_oz, dims, carrier);

        let response = match self.fetch(&json!({ "shipment": shipment })).await {
            Ok(response) => {
                tracing::debug!(shape = "wrapped", "rate request accepted");
                response
            }
            Err(first_err) => {
                tracing::info!(error = %first_err, "wrapped rate request failed, retrying flat");
                let response = self.fetch(&shipment).await.map_err(|e| {
                    FulfillmentError::RateService(format!(
                        "both request shapes failed: {first_err}; {e}"
                    ))
                })?;
                tracing::debug!(shape = "flat", "rate request accepted");
                response
            }
        };

        let mut quotes = normalize_rates(&response)?;
        if let Some(wanted) = carrier {
            quotes.retain(|q| q.carrier.eq_ignore_ascii_case(wanted));
        }
        if quotes.is_empty() {
            return Err(FulfillmentError::RateService(
                "no usable quotes in rate response".to_string(),
            ));
        }

        quotes.sort_by_key(|q| q.amount);
        let best = quotes[0].clone();
        Ok(RateQuoteSet { best, all: quotes })
    }

    fn shipment_payload(
        &self,
        origin: &Warehouse,
        destination: &Address,
        weight_oz: u32,
        dims: Option<Dimensions>,
        carrier: Option<&str>,
    ) -> Value {
        // Carriers bill whole pounds; anything tiny still ships as 3 lb
        let weight_lb = (weight_oz / 16).max(MIN_WEIGHT_LB);

        let mut shipment = json!({
            "from_address": {
                "city": origin.city,
                "state": origin.state,
                "country": origin.country,
            },
            "to_address": {
                "street1": destination.line1,
                "city": destination.city,
                "state": destination.state,
                "zip": destination.postal_code,
                "country": destination.country,
            },
            "weight": { "value": weight_lb, "unit": "lb" },
            "ship_date": Utc::now().format("%Y-%m-%d").to_string(),
        });
        if let Some(d) = dims {
            shipment["dimensions"] = json!({
                "length": d.length_in,
                "width": d.width_in,
                "height": d.height_in,
                "unit": "in",
            });
        }
        if let Some(wanted) = carrier {
            shipment["carrier"] = json!(wanted);
        }
        shipment
    }
}

/// Normalizes a rate response into quotes.
///
/// Accepts a bare JSON array or an array nested under `"rates"`. Entries
/// missing a parseable amount are skipped.
fn normalize_rates(response: &Value) -> Result<Vec<RateQuote>> {
    let entries = if let Some(array) = response.as_array() {
        array
    } else if let Some(array) = response.get("rates").and_then(Value::as_array) {
        array
    } else {
        return Err(FulfillmentError::RateService(
            "unrecognized rate response shape".to_string(),
        ));
    };

    Ok(entries.iter().filter_map(parse_rate_entry).collect())
}

fn parse_rate_entry(entry: &Value) -> Option<RateQuote> {
    let amount = entry.get("amount").and_then(parse_amount)?;

    let string_field = |keys: &[&str]| -> String {
        keys.iter()
            .find_map(|k| entry.get(*k).and_then(Value::as_str))
            .unwrap_or_default()
            .to_string()
    };

    Some(RateQuote {
        amount,
        carrier: string_field(&["carrier", "provider"]),
        service: string_field(&["service", "servicelevel"]),
        estimated_days: entry.get("estimated_days").and_then(Value::as_i64),
        rate_id: string_field(&["id", "rate_id", "object_id"]),
        guaranteed: entry
            .get("guaranteed")
            .and_then(Value::as_bool)
            .unwrap_or(false),
        trackable: entry
            .get("trackable")
            .and_then(Value::as_bool)
            .unwrap_or(false),
    })
}

/// Parses a dollar amount that may arrive as a number or a string.
fn parse_amount(value: &Value) -> Option<Money> {
    let dollars = match value {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.trim().parse::<f64>().ok()?,
        _ => return None,
    };
    if !dollars.is_finite() || dollars < 0.0 {
        return None;
    }
    Some(Money::from_cents((dollars * 100.0).round() as i64))
}

#[derive(Debug)]
struct InMemoryRateState {
    response: Value,
    fail_first: bool,
    fail_always: bool,
    payloads: Vec<Value>,
}

impl Default for InMemoryRateState {
    fn default() -> Self {
        Self {
            response: json!([
                { "amount": "12.50", "carrier": "usps", "service": "Priority",
                  "estimated_days": 2, "id": "rate-1", "trackable": true },
                { "amount": 8.99, "carrier": "usps", "service": "Ground",
                  "estimated_days": 5, "id": "rate-2", "trackable": true },
            ]),
            fail_first: false,
            fail_always: false,
            payloads: Vec::new(),
        }
    }
}

/// In-memory carrier rate service for testing.
#[derive(Debug, Clone, Default)]
pub struct InMemoryCarrierRateService {
    state: Arc<RwLock<InMemoryRateState>>,
}

impl InMemoryCarrierRateService {
    /// Creates a service answering with two default USPS rates.
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the canned response.
    pub fn set_response(&self, response: Value) {
        self.state.write().unwrap().response = response;
    }

    /// Configures the service to reject the first request it sees.
    pub fn set_fail_first_attempt(&self, fail: bool) {
        self.state.write().unwrap().fail_first = fail;
    }

    /// Configures the service to reject every request.
    pub fn set_fail_always(&self, fail: bool) {
        self.state.write().unwrap().fail_always = fail;
    }

    /// Returns the number of requests received.
    pub fn call_count(&self) -> usize {
        self.state.read().unwrap().payloads.len()
    }

    /// Returns the most recent request payload, if any.
    pub fn last_payload(&self) -> Option<Value> {
        self.state.read().unwrap().payloads.last().cloned()
    }
}

#[async_trait]
impl CarrierRateService for InMemoryCarrierRateService {
    async fn fetch_rates(&self, payload: &Value) -> Result<Value> {
        let mut state = self.state.write().unwrap();
        state.payloads.push(payload.clone());

        if state.fail_always || (state.fail_first && state.payloads.len() == 1) {
            return Err(FulfillmentError::RateService(
                "rate request rejected".to_string(),
            ));
        }
        Ok(state.response.clone())
    }
}
