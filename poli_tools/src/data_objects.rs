use std::fmt::Display;

use poli_common::Amount;
use serde::{Deserialize, Serialize, Serializer};
use serde_json::{Map, Value};

use crate::{helpers::value_as_text, PoliApiError};

/// Fields of a transaction record that survive data-retention redaction.
pub const SHRED_ALLOW_LIST: [&str; 8] = [
    "TransactionRefNo",
    "TransactionID",
    "TransactionStatusCode",
    "TransactionStatus",
    "PaymentAmount",
    "CurrencyCode",
    "EstablishedDateTime",
    "EndDateTime",
];

/// Marker key written into a redacted record.
pub const SHREDDED_FIELD: &str = "_shredded";

//--------------------------------------   InitiateTransaction   -----------------------------------------------------
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct InitiateTransaction {
    pub amount: Amount,
    pub currency_code: String,
    pub merchant_reference: String,
    #[serde(rename = "MerchantHomepageURL")]
    pub merchant_homepage_url: String,
    #[serde(rename = "SuccessURL")]
    pub success_url: String,
    #[serde(rename = "FailureURL")]
    pub failure_url: String,
    #[serde(rename = "CancellationURL")]
    pub cancellation_url: String,
    #[serde(rename = "NotificationURL")]
    pub notification_url: String,
    pub timeout: u32,
    #[serde(serialize_with = "as_json_string")]
    pub merchant_data: MerchantData,
}

/// Correlation data echoed back by the gateway. POLi transports it as an opaque string, so it is JSON-encoded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MerchantData {
    pub order_code: String,
    pub payment_id: i64,
}

fn as_json_string<S: Serializer>(data: &MerchantData, serializer: S) -> Result<S::Ok, S::Error> {
    let s = serde_json::to_string(data).map_err(serde::ser::Error::custom)?;
    serializer.serialize_str(&s)
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct InitiateTransactionResponse {
    #[serde(default)]
    pub success: bool,
    pub transaction_ref_no: Option<String>,
    #[serde(rename = "NavigateURL")]
    pub navigate_url: Option<String>,
    pub error_code: Option<Value>,
    pub error_message: Option<String>,
}

impl InitiateTransactionResponse {
    pub fn error_code(&self) -> String {
        self.error_code.as_ref().and_then(value_as_text).unwrap_or_else(|| "Unknown".to_string())
    }

    pub fn error_message(&self) -> String {
        self.error_message.clone().unwrap_or_else(|| "Unknown error".to_string())
    }
}

//--------------------------------------   TransactionStatus   -------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransactionStatus {
    Completed,
    Failed,
    Timeout,
    ReceiptNotReceived,
    /// Non-terminal or unrecognised codes (Initiated, InProcess, Cancelled, ...).
    Other(String),
}

impl From<&str> for TransactionStatus {
    fn from(code: &str) -> Self {
        match code {
            "Completed" => Self::Completed,
            "Failed" => Self::Failed,
            "TimedOut" | "Timeout" => Self::Timeout,
            "ReceiptUnverified" | "ReceiptNotReceived" => Self::ReceiptNotReceived,
            other => Self::Other(other.to_string()),
        }
    }
}

impl Display for TransactionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Completed => write!(f, "Completed"),
            Self::Failed => write!(f, "Failed"),
            Self::Timeout => write!(f, "Timeout"),
            Self::ReceiptNotReceived => write!(f, "ReceiptNotReceived"),
            Self::Other(s) => write!(f, "{s}"),
        }
    }
}

//--------------------------------------   PoliTransaction   ---------------------------------------------------------
/// The full transaction record returned by `GetTransaction`.
///
/// POLi returns dozens of fields, most of which this service never reads, and the record is persisted verbatim as the
/// payment info blob. It is therefore kept as a raw JSON object with typed accessors for the handful of fields we use.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PoliTransaction(Map<String, Value>);

impl PoliTransaction {
    pub fn from_json(s: &str) -> Result<Self, PoliApiError> {
        serde_json::from_str(s).map_err(|e| PoliApiError::JsonError(e.to_string()))
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }

    pub fn into_value(self) -> Value {
        Value::Object(self.0)
    }

    pub fn get_text(&self, key: &str) -> Option<String> {
        self.0.get(key).and_then(value_as_text)
    }

    pub fn status_code(&self) -> Option<String> {
        self.get_text("TransactionStatusCode")
    }

    pub fn status(&self) -> Option<TransactionStatus> {
        self.status_code().map(|s| TransactionStatus::from(s.as_str()))
    }

    pub fn status_text(&self) -> Option<String> {
        self.get_text("TransactionStatus")
    }

    pub fn ref_no(&self) -> Option<String> {
        self.get_text("TransactionRefNo")
    }

    pub fn transaction_id(&self) -> Option<String> {
        self.get_text("TransactionID")
    }

    pub fn merchant_reference(&self) -> Option<String> {
        self.get_text("MerchantReference")
    }

    pub fn bank_receipt(&self) -> Option<String> {
        self.get_text("BankReceipt")
    }

    pub fn financial_institution(&self) -> Option<String> {
        self.get_text("FinancialInstitutionName")
    }

    /// Decodes `MerchantData`. Returns `None` if it is missing or not the JSON this service writes.
    pub fn merchant_data(&self) -> Option<MerchantData> {
        let raw = self.0.get("MerchantData")?.as_str()?;
        serde_json::from_str(raw).ok()
    }

    pub fn is_shredded(&self) -> bool {
        self.0.get(SHREDDED_FIELD).and_then(Value::as_bool).unwrap_or(false)
    }

    /// Returns a copy holding only the allow-listed fields, marked as shredded. Allow-listed fields that are absent
    /// are written as `null`.
    pub fn shredded(&self) -> Self {
        let mut map = Map::with_capacity(SHRED_ALLOW_LIST.len() + 1);
        for key in SHRED_ALLOW_LIST {
            let v = self.0.get(key).cloned().unwrap_or(Value::Null);
            map.insert(key.to_string(), v);
        }
        map.insert(SHREDDED_FIELD.to_string(), Value::Bool(true));
        Self(map)
    }
}

impl From<Map<String, Value>> for PoliTransaction {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}
