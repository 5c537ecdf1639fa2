//! Suppression of the "order placed" e-mail while a POLi payment is in flight.
//!
//! The buyer is redirected to their bank straight after placing the order. An "order placed, please pay" e-mail
//! arriving at that moment is confusing, so it is held back. The payment-received e-mail still goes out, and the
//! reminder worker sends the held-back message later if the order is still unpaid.
use serde::{Deserialize, Serialize};

use crate::{db_types::OrderPayment, provider::POLI_IDENTIFIER};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MailDecision {
    Send,
    Suppress,
}

pub fn filter_order_mail(subject: &str, payments: &[OrderPayment]) -> MailDecision {
    if !payments.iter().any(|p| p.provider == POLI_IDENTIFIER) {
        return MailDecision::Send;
    }
    let subject = subject.to_lowercase();
    if subject.contains("your order:") && !subject.contains("payment received") {
        MailDecision::Suppress
    } else {
        MailDecision::Send
    }
}
