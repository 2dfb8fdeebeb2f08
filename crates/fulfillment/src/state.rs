//! Checkout state machine.

use serde::{Deserialize, Serialize};

/// The phase a checkout attempt is in.
///
/// Phase transitions:
/// ```text
/// Received ──┬──► DuplicateRejected
///            └──► GatewayCalled ──┬──► Approved ────┬──► Reserved ───────────────────┐
///                                 ├──► HeldPending ─┤──► ReserveFailedFallbackOk ────┼──► Done
///                                 │                 └──► ReserveFailedFallbackFailed ┤
///                                 ├──► Declined ────────────────────────────────────►┤
///                                 └──► Unreachable ─────────────────────────────────►┘
/// ```
/// Declined and unreachable attempts still reach `Done`: their ledger rows
/// are written before the checkout finishes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum CheckoutPhase {
    /// Request accepted, snapshot not yet assembled.
    #[default]
    Received,

    /// Duplicate guard matched a recent charge; nothing was sent out.
    DuplicateRejected,

    /// Charge request handed to the gateway.
    GatewayCalled,

    /// Gateway approved the charge.
    Approved,

    /// Gateway authorized but settlement is held for review.
    HeldPending,

    /// Gateway declined the charge.
    Declined,

    /// Gateway transport failed or timed out.
    Unreachable,

    /// Stock reserved at the selected warehouse.
    Reserved,

    /// Primary reservation failed; the emergency fallback reserved instead.
    ReserveFailedFallbackOk,

    /// Primary reservation and the emergency fallback both failed. The
    /// charge stands; the shortfall is left for manual follow-up.
    ReserveFailedFallbackFailed,

    /// Checkout finished (terminal state).
    Done,
}

impl CheckoutPhase {
    /// Returns true if a charge may still be attempted from this phase.
    pub fn can_charge(&self) -> bool {
        matches!(self, CheckoutPhase::Received)
    }

    /// Returns true if the gateway accepted the charge (funds moved or held).
    pub fn charge_succeeded(&self) -> bool {
        matches!(self, CheckoutPhase::Approved | CheckoutPhase::HeldPending)
    }

    /// Returns true if this is a terminal phase.
    pub fn is_terminal(&self) -> bool {
        matches!(self, CheckoutPhase::Done | CheckoutPhase::DuplicateRejected)
    }

    /// Returns true if reservation ran through (or past) the fallback path.
    pub fn reservation_degraded(&self) -> bool {
        matches!(
            self,
            CheckoutPhase::ReserveFailedFallbackOk | CheckoutPhase::ReserveFailedFallbackFailed
        )
    }

    /// Returns the phase name as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            CheckoutPhase::Received => "Received",
            CheckoutPhase::DuplicateRejected => "DuplicateRejected",
            CheckoutPhase::GatewayCalled => "GatewayCalled",
            CheckoutPhase::Approved => "Approved",
            CheckoutPhase::HeldPending => "HeldPending",
            CheckoutPhase::Declined => "Declined",
            CheckoutPhase::Unreachable => "Unreachable",
            CheckoutPhase::Reserved => "Reserved",
            CheckoutPhase::ReserveFailedFallbackOk => "ReserveFailedFallbackOk",
            CheckoutPhase::ReserveFailedFallbackFailed => "ReserveFailedFallbackFailed",
            CheckoutPhase::Done => "Done",
        }
    }
}

impl std::fmt::Display for CheckoutPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Classified outcome of one gateway conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GatewayDisposition {
    /// Funds captured.
    Approved,

    /// Authorized but held for manual review before settlement.
    Held,

    /// Charge refused.
    Declined,
}

impl GatewayDisposition {
    /// Classifies a gateway numeric response code.
    ///
    /// Code 1 is an approval. Codes 4, 252 and 253 are the held-for-review
    /// family: the customer's card was authorized but settlement is
    /// deferred. Everything else is a decline.
    pub fn classify(response_code: i64) -> Self {
        match response_code {
            1 => GatewayDisposition::Approved,
            4 | 252 | 253 => GatewayDisposition::Held,
            _ => GatewayDisposition::Declined,
        }
    }

    /// Returns true if the charge attempt moved or committed funds.
    pub fn is_success(&self) -> bool {
        matches!(
            self,
            GatewayDisposition::Approved | GatewayDisposition::Held
        )
    }

    /// Returns the disposition name as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            GatewayDisposition::Approved => "Approved",
            GatewayDisposition::Held => "Held",
            GatewayDisposition::Declined => "Declined",
        }
    }
}

impl std::fmt::Display for GatewayDisposition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
