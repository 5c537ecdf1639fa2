use poli_payment_engine::{
    db_types::{Amount, NewOrder, NewPayment, OrderCode},
    mail_filter::MailDecision,
};
use serde::{Deserialize, Serialize};

/// Body of `PUT /host/events/{organizer}/{event}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventParams {
    pub name: String,
    pub currency: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProvidersQuery {
    pub total: Option<Amount>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckoutPrepareParams {
    pub provider: String,
    pub total: Amount,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckoutPrepareResult {
    pub provider: String,
    pub ready: bool,
}

/// The order-placed notification sent by the host.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderPlacedNotification {
    pub organizer: String,
    pub event: String,
    pub order: NewOrder,
    #[serde(default)]
    pub payments: Vec<NewPayment>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MailFilterParams {
    pub organizer: String,
    pub event: String,
    pub order_code: OrderCode,
    pub subject: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MailFilterResult {
    pub decision: MailDecision,
}

/// Form body of the POLi nudge.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WebhookForm {
    #[serde(alias = "Token")]
    pub token: Option<String>,
}

/// Query string of the buyer's return from POLi.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReturnQuery {
    #[serde(alias = "Token")]
    pub token: Option<String>,
}
