//! Records shared between the host application and this service.
//!
//! Orders, payments and events are owned by the host. They are mirrored here so that backends and the provider can
//! talk about them with concrete types.
use std::{fmt::Display, str::FromStr};

use chrono::{DateTime, Utc};
use log::error;
pub use poli_common::Amount;
use poli_tools::PoliTransaction;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use sqlx::{FromRow, Type};
use thiserror::Error;

#[derive(Debug, Clone, Error)]
#[error("Invalid value: {0}")]
pub struct ConversionError(String);

//--------------------------------------        Event          ---------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct Event {
    pub id: i64,
    pub organizer: String,
    pub slug: String,
    pub name: String,
    pub currency: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewEvent {
    pub organizer: String,
    pub slug: String,
    pub name: String,
    pub currency: String,
}

impl NewEvent {
    pub fn new<S: Into<String>>(organizer: S, slug: S, currency: S) -> Self {
        let slug = slug.into();
        Self { organizer: organizer.into(), name: slug.clone(), slug, currency: currency.into() }
    }
}

//--------------------------------------   OrderStatus     ---------------------------------------------------------
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Type, Serialize, Deserialize)]
#[sqlx(rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    /// Placed, awaiting payment.
    #[default]
    Pending,
    Paid,
    Expired,
    Canceled,
}

impl Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OrderStatus::Pending => write!(f, "pending"),
            OrderStatus::Paid => write!(f, "paid"),
            OrderStatus::Expired => write!(f, "expired"),
            OrderStatus::Canceled => write!(f, "canceled"),
        }
    }
}

impl FromStr for OrderStatus {
    type Err = ConversionError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pending" | "n" => Ok(Self::Pending),
            "paid" | "p" => Ok(Self::Paid),
            "expired" | "e" => Ok(Self::Expired),
            "canceled" | "cancelled" | "c" => Ok(Self::Canceled),
            s => Err(ConversionError(format!("Invalid order status: {s}"))),
        }
    }
}

impl From<String> for OrderStatus {
    fn from(value: String) -> Self {
        value.parse().unwrap_or_else(|_| {
            error!("Invalid order status: {value}. But this conversion cannot fail. Defaulting to Pending");
            OrderStatus::Pending
        })
    }
}

//--------------------------------------   PaymentState    ---------------------------------------------------------
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Type, Serialize, Deserialize)]
#[sqlx(rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum PaymentState {
    #[default]
    Created,
    Pending,
    Confirmed,
    Canceled,
    Failed,
    Refunded,
}

impl PaymentState {
    pub fn is_failed_or_canceled(&self) -> bool {
        matches!(self, Self::Failed | Self::Canceled)
    }
}

impl Display for PaymentState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PaymentState::Created => write!(f, "created"),
            PaymentState::Pending => write!(f, "pending"),
            PaymentState::Confirmed => write!(f, "confirmed"),
            PaymentState::Canceled => write!(f, "canceled"),
            PaymentState::Failed => write!(f, "failed"),
            PaymentState::Refunded => write!(f, "refunded"),
        }
    }
}

impl FromStr for PaymentState {
    type Err = ConversionError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "created" => Ok(Self::Created),
            "pending" => Ok(Self::Pending),
            "confirmed" => Ok(Self::Confirmed),
            "canceled" | "cancelled" => Ok(Self::Canceled),
            "failed" => Ok(Self::Failed),
            "refunded" => Ok(Self::Refunded),
            s => Err(ConversionError(format!("Invalid payment state: {s}"))),
        }
    }
}

//--------------------------------------        OrderCode       ---------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq, Hash, Type, Serialize, Deserialize)]
#[sqlx(transparent)]
#[serde(transparent)]
pub struct OrderCode(pub String);

impl OrderCode {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for OrderCode {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for OrderCode {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl Display for OrderCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

//--------------------------------------        Order       ---------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct Order {
    pub id: i64,
    pub event_id: i64,
    pub code: OrderCode,
    /// The order's shared secret. Gateway return and cancel URLs carry it as proof of ownership.
    #[serde(skip_serializing)]
    pub secret: String,
    pub status: OrderStatus,
    pub total: Amount,
    pub email: Option<String>,
    pub locale: Option<String>,
    pub require_approval: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

//--------------------------------------        NewOrder       ---------------------------------------------------------
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewOrder {
    /// Filled in from the event the order is placed for.
    #[serde(default)]
    pub event_id: i64,
    pub code: OrderCode,
    pub secret: String,
    #[serde(default)]
    pub status: OrderStatus,
    pub total: Amount,
    pub email: Option<String>,
    pub locale: Option<String>,
    #[serde(default)]
    pub require_approval: bool,
}

impl NewOrder {
    pub fn new<S: Into<String>>(event_id: i64, code: S, secret: S, total: Amount) -> Self {
        Self {
            event_id,
            code: OrderCode(code.into()),
            secret: secret.into(),
            status: OrderStatus::Pending,
            total,
            email: None,
            locale: None,
            require_approval: false,
        }
    }

    pub fn with_email<S: Into<String>>(mut self, email: S) -> Self {
        self.email = Some(email.into());
        self
    }
}

//--------------------------------------     OrderPayment     ---------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct OrderPayment {
    pub id: i64,
    /// Sequence number of the payment within its order, as assigned by the host.
    pub local_id: i64,
    pub order_id: i64,
    pub provider: String,
    pub amount: Amount,
    pub state: PaymentState,
    pub info: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl OrderPayment {
    /// The info blob as a JSON object. Returns `None` if there is no blob, or it is not a JSON object.
    pub fn info_data(&self) -> Option<PoliTransaction> {
        let raw = self.info.as_deref()?;
        match serde_json::from_str::<Value>(raw) {
            Ok(Value::Object(map)) => Some(PoliTransaction::from(map)),
            _ => None,
        }
    }

    /// Like [`Self::info_data`], but distinguishes a missing blob (`Ok(None)`) from one that cannot be parsed.
    pub fn try_info_data(&self) -> Result<Option<Map<String, Value>>, ConversionError> {
        match self.info.as_deref() {
            None | Some("") => Ok(None),
            Some(raw) => match serde_json::from_str::<Value>(raw) {
                Ok(Value::Object(map)) => Ok(Some(map)),
                Ok(_) => Err(ConversionError(format!("Payment info for payment {} is not a JSON object", self.id))),
                Err(e) => Err(ConversionError(format!("Payment info for payment {} is malformed. {e}", self.id))),
            },
        }
    }

    pub fn is_shredded(&self) -> bool {
        self.info_data().map(|d| d.is_shredded()).unwrap_or(false)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewPayment {
    pub local_id: i64,
    pub provider: String,
    pub amount: Amount,
    #[serde(default)]
    pub state: PaymentState,
}

impl NewPayment {
    pub fn new<S: Into<String>>(local_id: i64, provider: S, amount: Amount) -> Self {
        Self { local_id, provider: provider.into(), amount, state: PaymentState::Created }
    }
}

//--------------------------------------     OrderLogEntry     ---------------------------------------------------------
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct OrderLogEntry {
    pub id: i64,
    pub order_id: i64,
    pub action_type: String,
    /// JSON-encoded detail
    pub data: String,
    pub created_at: DateTime<Utc>,
}

impl OrderLogEntry {
    pub fn data_json(&self) -> Value {
        serde_json::from_str(&self.data).unwrap_or(Value::Null)
    }
}

//--------------------------------------   TransactionToken    ---------------------------------------------------------
/// Links a gateway transaction to the payment it was initiated for.
///
/// `token` is the gateway's transaction reference (`TransactionRefNo`). `gateway_token` is the session token carried in
/// the navigate URL, which the gateway echoes back on the return URL and in nudges. Lookups match either.
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct TransactionToken {
    pub token: String,
    pub gateway_token: Option<String>,
    pub event_id: i64,
    pub order_code: OrderCode,
    pub payment_id: i64,
    pub navigate_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub consumed_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewTransactionToken {
    pub token: String,
    pub gateway_token: Option<String>,
    pub event_id: i64,
    pub order_code: OrderCode,
    pub payment_id: i64,
    pub navigate_url: Option<String>,
}

//--------------------------------------   ScheduledReminder   ---------------------------------------------------------
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Type, Serialize, Deserialize)]
#[sqlx(rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum ReminderStatus {
    #[default]
    Scheduled,
    Sent,
    Skipped,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct ScheduledReminder {
    pub id: i64,
    pub event_id: i64,
    pub order_code: OrderCode,
    pub run_at: DateTime<Utc>,
    pub status: ReminderStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

//--------------------------------------      EmailMessage     ---------------------------------------------------------
/// An outbound e-mail, placed in the outbox for the host to deliver.
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct EmailMessage {
    pub id: i64,
    pub event_id: i64,
    pub order_id: Option<i64>,
    pub recipient: String,
    pub subject: String,
    pub body: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewEmail {
    pub event_id: i64,
    pub order_id: Option<i64>,
    pub recipient: String,
    pub subject: String,
    pub body: String,
}

#[cfg(test)]
mod test {
    use chrono::Utc;

    use super::*;

    fn payment(info: Option<&str>) -> OrderPayment {
        OrderPayment {
            id: 1,
            local_id: 1,
            order_id: 1,
            provider: "poli".into(),
            amount: Amount::from_cents(100),
            state: PaymentState::Created,
            info: info.map(String::from),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn info_blob_access() {
        assert!(payment(None).info_data().is_none());
        assert!(payment(Some("not json")).info_data().is_none());
        assert!(payment(Some("not json")).try_info_data().is_err());
        assert!(payment(Some("[1,2]")).try_info_data().is_err());
        assert!(payment(Some("")).try_info_data().unwrap().is_none());
        let p = payment(Some(r#"{"TransactionRefNo":"T1","_shredded":true}"#));
        assert_eq!(p.info_data().unwrap().ref_no().as_deref(), Some("T1"));
        assert!(p.is_shredded());
    }

    #[test]
    fn status_strings() {
        assert_eq!("cancelled".parse::<OrderStatus>().unwrap(), OrderStatus::Canceled);
        assert_eq!(OrderStatus::from("bogus".to_string()), OrderStatus::Pending);
        assert_eq!("Confirmed".parse::<PaymentState>().unwrap(), PaymentState::Confirmed);
        assert!("nope".parse::<PaymentState>().is_err());
        assert!(PaymentState::Canceled.is_failed_or_canceled());
        assert!(!PaymentState::Pending.is_failed_or_canceled());
    }
}
