//! POLi Payment Engine
//!
//! The POLi Payment Engine lets a ticketing host accept POLi bank transfers for its orders. It contains the core
//! logic of the integration and is independent of any web framework.
//!
//! The library is divided into these main sections:
//! 1. The backend contracts ([`mod@traits`]). The host owns events, orders, payments, settings and mail. Backends
//!    implement the traits in this module. [`SqliteDatabase`] is the bundled implementation.
//! 2. The POLi provider ([`mod@provider`]). It initiates transactions, reports on payments and shreds personal data.
//! 3. Reconciliation ([`mod@reconciliation`]). Maps a gateway transaction record onto the payment state machine.
//! 4. The public API ([`mod@api`]). Checkout, callbacks from the gateway and payment reminders.
//!
//! The engine also provides a set of events that can be subscribed to. When a new order is placed, an
//! `OrderPlacedEvent` is emitted. A simple Actor framework is used so that you can easily hook into these events and
//! perform custom actions, such as scheduling a reminder.
pub mod api;
pub mod db_types;
pub mod events;
pub mod log_actions;
pub mod mail_filter;
pub mod provider;
pub mod reconciliation;
pub mod traits;
pub mod urls;

#[cfg(feature = "sqlite")]
mod sqlite;

#[cfg(all(feature = "sqlite", any(feature = "test_utils", test)))]
pub mod test_utils;

pub use api::{
    api_objects,
    checkout_api::CheckoutApi,
    errors::FlowError,
    payment_flow_api::{CallbackPath, PaymentFlowApi},
    reminder_api::{ReminderApi, ReminderResult},
};
pub use provider::{PaymentError, PaymentProvider, PoliProvider, ProviderRegistry, POLI_IDENTIFIER};
#[cfg(feature = "sqlite")]
pub use sqlite::SqliteDatabase;
pub use traits::{
    GatewayBackend,
    GatewayStoreError,
    Mailer,
    OrderManagement,
    ReminderQueue,
    SettingsStore,
    TransactionTokens,
};
pub use urls::UrlBuilder;
