use thiserror::Error;

use crate::{
    db_types::OrderCode,
    provider::{settings::SettingsValidationError, PaymentError},
    traits::GatewayStoreError,
};

#[derive(Debug, Clone, Error)]
pub enum FlowError {
    #[error("Token is required")]
    MissingToken,
    #[error("The event {0} does not exist")]
    EventNotFound(String),
    #[error("The order {0} does not exist")]
    OrderNotFound(OrderCode),
    #[error("The payment {0} does not exist")]
    PaymentNotFound(i64),
    #[error("No payment provider is registered as '{0}'")]
    ProviderNotFound(String),
    #[error("{0}")]
    Store(#[from] GatewayStoreError),
    #[error("{0}")]
    Payment(#[from] PaymentError),
    #[error("{0}")]
    Settings(#[from] SettingsValidationError),
}
