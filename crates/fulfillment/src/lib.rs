//! Order fulfillment orchestration.
//!
//! Ties the domain model and the store together into the operational flows
//! of the back office: charging a card through the payment gateway with a
//! duplicate guard and a full audit trail, picking the fulfillment warehouse
//! by distance and stock, reserving inventory, and quoting carrier rates.

pub mod config;
pub mod error;
pub mod gateway;
pub mod orchestrator;
pub mod rates;
pub mod reservation;
pub mod selector;
pub mod state;

pub use config::Config;
pub use error::{FulfillmentError, Result};
pub use gateway::{
    ChargeLineItem, ChargeRequest, GatewayResponse, InMemoryPaymentGateway, PaymentGateway,
};
pub use orchestrator::{CheckoutOutcome, CheckoutRequest, GatewaySummary, PaymentOrchestrator};
pub use rates::{
    CarrierRateService, Dimensions, InMemoryCarrierRateService, RateQuote, RateQuoteSet, RateQuoter,
};
pub use reservation::ReservationManager;
pub use selector::{RequiredItem, StockShortfall, WarehousePick, WarehouseSelector};
pub use state::{CheckoutPhase, GatewayDisposition};
