use serde_json::Value;

use crate::{
    db_types::{Event, NewEvent, NewOrder, NewPayment, Order, OrderCode, OrderLogEntry, OrderPayment, PaymentState},
    traits::GatewayStoreError,
};

/// Access to the host's events, orders and payments.
///
/// Payment state transitions go through [`Self::set_payment_state`] and [`Self::confirm_payment`]. The latter is the
/// host's "confirm" operation, which may have side effects on the order (e.g. marking it paid).
#[allow(async_fn_in_trait)]
pub trait OrderManagement {
    /// Creates the event if it does not exist yet, otherwise updates its name and currency.
    async fn upsert_event(&self, event: NewEvent) -> Result<Event, GatewayStoreError>;

    async fn fetch_event(&self, organizer: &str, slug: &str) -> Result<Option<Event>, GatewayStoreError>;

    async fn fetch_event_by_id(&self, id: i64) -> Result<Option<Event>, GatewayStoreError>;

    /// Stores the order. This call is idempotent: if an order with the same code already exists for the event, it is
    /// returned unchanged and the second value is `false`.
    async fn insert_order(&self, order: NewOrder) -> Result<(Order, bool), GatewayStoreError>;

    /// Stores a payment for the given order. Idempotent on `(order_id, local_id)`.
    async fn insert_payment(&self, order_id: i64, payment: NewPayment) -> Result<OrderPayment, GatewayStoreError>;

    async fn fetch_order(&self, event_id: i64, code: &OrderCode) -> Result<Option<Order>, GatewayStoreError>;

    async fn fetch_order_by_id(&self, id: i64) -> Result<Option<Order>, GatewayStoreError>;

    async fn fetch_payment(&self, payment_id: i64) -> Result<Option<OrderPayment>, GatewayStoreError>;

    async fn fetch_payments_for_order(&self, order_id: i64) -> Result<Vec<OrderPayment>, GatewayStoreError>;

    /// Overwrites the payment's info blob.
    async fn update_payment_info(&self, payment_id: i64, info: &str) -> Result<OrderPayment, GatewayStoreError>;

    /// Sets the payment state unconditionally. Returns the updated payment.
    async fn set_payment_state(
        &self,
        payment_id: i64,
        state: PaymentState,
    ) -> Result<OrderPayment, GatewayStoreError>;

    /// Marks the payment as confirmed. If the confirmed payments now cover the order total, the order is marked paid.
    async fn confirm_payment(&self, payment_id: i64) -> Result<OrderPayment, GatewayStoreError>;

    /// Appends an entry to the order's action log.
    async fn log_order_action(&self, order_id: i64, action_type: &str, data: Value) -> Result<(), GatewayStoreError>;

    async fn fetch_order_log(&self, order_id: i64) -> Result<Vec<OrderLogEntry>, GatewayStoreError>;
}
