//! Action types written to the host's order log.
pub const PAYMENT_FAILED: &str = "pretix.event.order.payment.failed";
pub const PAYMENT_CONFIRMED: &str = "pretix.event.order.payment.confirmed";
pub const PAYMENT_CANCELED: &str = "pretix.event.order.payment.canceled";
pub const EMAIL_ORDER_PLACED: &str = "pretix.event.order.email.order_placed";
pub const EMAIL_ORDER_PLACED_REQUIRE_APPROVAL: &str = "pretix.event.order.email.order_placed_require_approval";
