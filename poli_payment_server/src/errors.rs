use actix_web::{
    error::ResponseError,
    http::{header::ContentType, StatusCode},
    HttpResponse,
};
use poli_payment_engine::{provider::settings::SettingsValidationError, FlowError, GatewayStoreError, PaymentError};
use serde_json::json;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("Could not initialize server. {0}")]
    InitializeError(String),
    #[error("An error occurred on the backend of the server. {0}")]
    BackendError(String),
    #[error("Could not read request body: {0}")]
    InvalidRequestBody(String),
    #[error("Could not read request path: {0}")]
    InvalidRequestPath(String),
    #[error("An I/O error happened in the server. {0}")]
    IOError(#[from] std::io::Error),
    #[error("Invalid server configuration. {0}")]
    ConfigurationError(String),
    #[error("UnspecifiedError. {0}")]
    Unspecified(String),
    #[error("The data was not found. {0}")]
    NoRecordFound(String),
    #[error("{0}")]
    InvalidSettings(SettingsValidationError),
    #[error("{0}")]
    PaymentFailed(PaymentError),
    #[error("Forbidden. {0}")]
    Forbidden(String),
}

impl ResponseError for ServerError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidRequestBody(_) => StatusCode::BAD_REQUEST,
            Self::InvalidRequestPath(_) => StatusCode::BAD_REQUEST,
            Self::InvalidSettings(_) => StatusCode::BAD_REQUEST,
            Self::PaymentFailed(PaymentError::Store(_)) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::PaymentFailed(PaymentError::GatewayUnreachable(_)) => StatusCode::BAD_GATEWAY,
            Self::PaymentFailed(_) => StatusCode::UNPROCESSABLE_ENTITY,
            Self::InitializeError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::BackendError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::IOError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::ConfigurationError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Unspecified(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::NoRecordFound(_) => StatusCode::NOT_FOUND,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let body = match self {
            Self::InvalidSettings(e) => json!({ "error": self.to_string(), "fields": e.errors }),
            _ => json!({ "error": self.to_string() }),
        };
        HttpResponse::build(self.status_code()).insert_header(ContentType::json()).body(body.to_string())
    }
}

impl From<FlowError> for ServerError {
    fn from(e: FlowError) -> Self {
        match e {
            FlowError::MissingToken => Self::InvalidRequestBody(e.to_string()),
            FlowError::EventNotFound(_) |
            FlowError::OrderNotFound(_) |
            FlowError::PaymentNotFound(_) |
            FlowError::ProviderNotFound(_) => Self::NoRecordFound(e.to_string()),
            FlowError::Store(e) => e.into(),
            FlowError::Payment(e) => Self::PaymentFailed(e),
            FlowError::Settings(e) => Self::InvalidSettings(e),
        }
    }
}

impl From<GatewayStoreError> for ServerError {
    fn from(e: GatewayStoreError) -> Self {
        match e {
            GatewayStoreError::EventNotFound(_) |
            GatewayStoreError::OrderNotFound(_) |
            GatewayStoreError::OrderIdNotFound(_) |
            GatewayStoreError::PaymentNotFound(_) => Self::NoRecordFound(e.to_string()),
            _ => Self::BackendError(e.to_string()),
        }
    }
}
