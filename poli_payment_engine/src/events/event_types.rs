use serde::{Deserialize, Serialize};

use crate::db_types::{Event, Order, OrderPayment};

/// Fired when the host reports a newly placed order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderPlacedEvent {
    pub event: Event,
    pub order: Order,
    pub payments: Vec<OrderPayment>,
}

impl OrderPlacedEvent {
    pub fn new(event: Event, order: Order, payments: Vec<OrderPayment>) -> Self {
        Self { event, order, payments }
    }

    pub fn uses_provider(&self, identifier: &str) -> bool {
        self.payments.iter().any(|p| p.provider == identifier)
    }
}

/// Fired when a return or webhook moves a POLi payment into the confirmed state. Repeated status checks for an
/// already confirmed payment do not fire it again.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentConfirmedEvent {
    pub event: Event,
    /// The order as loaded when the callback arrived. Its status may not yet show the payment.
    pub order: Order,
    pub payment: OrderPayment,
    pub transaction_ref_no: Option<String>,
}

impl PaymentConfirmedEvent {
    pub fn new(event: Event, order: Order, payment: OrderPayment, transaction_ref_no: Option<String>) -> Self {
        Self { event, order, payment, transaction_ref_no }
    }
}
