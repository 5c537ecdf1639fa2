use thiserror::Error;

use crate::db_types::OrderCode;

#[derive(Debug, Clone, Error)]
pub enum GatewayStoreError {
    #[error("Database engine error: {0}")]
    DatabaseError(String),
    #[error("The requested event {0} does not exist")]
    EventNotFound(String),
    #[error("The requested order {0} does not exist")]
    OrderNotFound(OrderCode),
    #[error("The requested order (internal id {0}) does not exist")]
    OrderIdNotFound(i64),
    #[error("The requested payment {0} does not exist")]
    PaymentNotFound(i64),
    #[error("Could not encode data for storage: {0}")]
    EncodingError(String),
    #[error("Mail could not be queued: {0}")]
    MailError(String),
}

impl From<sqlx::Error> for GatewayStoreError {
    fn from(e: sqlx::Error) -> Self {
        GatewayStoreError::DatabaseError(e.to_string())
    }
}

impl From<serde_json::Error> for GatewayStoreError {
    fn from(e: serde_json::Error) -> Self {
        GatewayStoreError::EncodingError(e.to_string())
    }
}
