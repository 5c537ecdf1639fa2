use crate::{
    db_types::{NewTransactionToken, TransactionToken},
    traits::GatewayStoreError,
};

/// The server-side record of which payment a gateway transaction token belongs to.
#[allow(async_fn_in_trait)]
pub trait TransactionTokens {
    /// Stores the mapping. Saving a token that already exists replaces the previous mapping.
    async fn save_transaction_token(&self, token: NewTransactionToken) -> Result<TransactionToken, GatewayStoreError>;

    /// Finds the mapping whose transaction reference or gateway session token equals `token`.
    async fn fetch_transaction_token(&self, token: &str) -> Result<Option<TransactionToken>, GatewayStoreError>;

    /// Records that the buyer has returned with this token. Returns `None` if the token is unknown. Consuming a token
    /// twice keeps the first timestamp.
    async fn consume_transaction_token(&self, token: &str) -> Result<Option<TransactionToken>, GatewayStoreError>;
}
