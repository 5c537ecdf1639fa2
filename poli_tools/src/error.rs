use thiserror::Error;

#[derive(Debug, Error)]
pub enum PoliApiError {
    #[error("Could not initialize client: {0}")]
    Initialization(String),
    #[error("Could not reach the POLi API: {0}")]
    Unreachable(String),
    #[error("Invalid REST response: {0}")]
    RestResponseError(String),
    #[error("Could not deserialize JSON: {0}")]
    JsonError(String),
    #[error("Query failed. Error {status}. {message}")]
    QueryError { status: u16, message: String },
}

impl PoliApiError {
    /// Transport-level failures: the gateway could not be reached, timed out, or refused the request.
    pub fn is_unreachable(&self) -> bool {
        matches!(self, Self::Unreachable(_) | Self::RestResponseError(_) | Self::QueryError { .. })
    }
}
