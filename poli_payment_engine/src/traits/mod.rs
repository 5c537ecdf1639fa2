//! #  Backend contracts
//!
//! The host application owns orders, payments, settings and mail delivery. This module defines the seams through
//! which the engine reaches those things. A backend (e.g. [`crate::SqliteDatabase`]) implements all of them; tests
//! can mock any one in isolation.
//!
//! * [`OrderManagement`] reads and mutates events, orders, payments and the order action log.
//! * [`SettingsStore`] is the per-event key-value settings store.
//! * [`TransactionTokens`] maps gateway transaction tokens to the payments they were initiated for.
//! * [`ReminderQueue`] is the delayed task queue for payment reminders.
//! * [`Mailer`] hands outbound e-mail to the host.
//!
//! [`GatewayBackend`] bundles all of the above and is implemented automatically.
mod mailer;
mod order_management;
mod reminder_queue;
mod settings_store;
mod store_error;
mod transaction_tokens;

pub use mailer::Mailer;
pub use order_management::OrderManagement;
pub use reminder_queue::ReminderQueue;
pub use settings_store::SettingsStore;
pub use store_error::GatewayStoreError;
pub use transaction_tokens::TransactionTokens;

/// Everything the POLi provider and its flows need from the host.
pub trait GatewayBackend: OrderManagement + SettingsStore + TransactionTokens + ReminderQueue + Mailer {}

impl<T> GatewayBackend for T where T: OrderManagement + SettingsStore + TransactionTokens + ReminderQueue + Mailer {}
