//! A minimal async client for the POLi bank-transfer gateway.
//!
//! Only the two calls a merchant integration needs are covered: initiating a transaction and fetching its record.
mod api;
mod config;
mod error;

mod data_objects;
pub mod helpers;

pub use api::PoliApi;
pub use config::{PoliConfig, PoliEndpoint};
pub use data_objects::{
    InitiateTransaction,
    InitiateTransactionResponse,
    MerchantData,
    PoliTransaction,
    TransactionStatus,
    SHREDDED_FIELD,
    SHRED_ALLOW_LIST,
};
pub use error::PoliApiError;
