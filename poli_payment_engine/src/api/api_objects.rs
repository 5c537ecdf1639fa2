use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{
    db_types::{Amount, Order, OrderPayment, PaymentState},
    reconciliation::ReconcileOutcome,
};

/// What a gateway callback should do with the buyer's browser.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallbackResponse {
    Redirect(String),
    /// The order secret in the URL, or the token, does not belong to this order/payment.
    Forbidden,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WebhookOutcome {
    Reconciled(ReconcileOutcome),
    /// The token is not one this service initiated.
    Unmapped,
    /// The gateway record could not be fetched.
    Unavailable,
    /// The gateway record does not belong to the order the token was issued for.
    Mismatch,
    /// Processing failed. The nudge is acknowledged anyway.
    Error(String),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlacedOrder {
    pub order: Order,
    pub payments: Vec<OrderPayment>,
    /// False if the order was already known.
    pub inserted: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderSummary {
    pub identifier: String,
    pub verbose_name: String,
    pub test_mode_message: Option<String>,
    pub abort_pending_allowed: bool,
    pub valid_session: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentRedirect {
    pub payment_id: i64,
    pub redirect_url: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentDetails {
    pub id: i64,
    pub local_id: i64,
    pub provider: String,
    pub state: PaymentState,
    pub amount: Amount,
    pub short: String,
    pub matching_id: Option<String>,
    pub details: Value,
}
