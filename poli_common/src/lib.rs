mod amount;
mod helpers;

pub mod op;
mod secret;

pub use amount::{Amount, AmountConversionError, SUPPORTED_CURRENCIES};
pub use helpers::{is_supported_currency, parse_boolean_flag};
pub use secret::Secret;
