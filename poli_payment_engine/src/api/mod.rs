//! # Payment engine API
//!
//! The programmatic API of the engine. Each API is created by supplying a backend that implements the traits in
//! [`crate::traits`]; the server holds one instance of each.
//!
//! * [`checkout_api`] covers the host's checkout pipeline and back-office: events, settings, provider selection,
//!   starting payments and reporting on them.
//! * [`payment_flow_api`] handles gateway callbacks (return, cancel, webhook), order notifications and the e-mail
//!   filter.
//! * [`reminder_api`] schedules and sends the delayed payment reminder.
//!
//! ```rust,ignore
//! use poli_payment_engine::{CheckoutApi, ProviderRegistry, SqliteDatabase};
//! let db = SqliteDatabase::new_with_url(...).await?;
//! let api = CheckoutApi::new(db, ProviderRegistry::new());
//! let settings = api.poli_settings(&event).await?;
//! ```
pub mod api_objects;
pub mod checkout_api;
pub mod errors;
pub mod payment_flow_api;
pub mod reminder_api;
