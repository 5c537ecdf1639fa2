//! Maps gateway transaction statuses onto payment state transitions.
//!
//! | Status             | Transition                                      |
//! |--------------------|-------------------------------------------------|
//! | Completed          | confirm, unless already confirmed               |
//! | Failed / Timeout   | mark failed, unless already failed or canceled  |
//! | ReceiptNotReceived | force pending                                   |
//! | anything else      | none, reported as unresolved                    |
//!
//! Every transition is idempotent, so duplicate status checks for the same payment are harmless.
use log::*;
use poli_tools::{PoliTransaction, TransactionStatus};
use serde_json::json;

use crate::{
    db_types::{OrderPayment, PaymentState},
    log_actions,
    provider::POLI_IDENTIFIER,
    traits::{GatewayStoreError, OrderManagement},
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Transition {
    Confirm,
    Fail,
    ForcePending,
    /// The payment is already where the status says it should be.
    NoChange,
    /// The status does not map onto a payment state.
    Unresolved(String),
}

/// Decides what to do with a payment in `state` given the gateway `status`.
pub fn decide(status: &TransactionStatus, state: PaymentState) -> Transition {
    match status {
        TransactionStatus::Completed if state == PaymentState::Confirmed => Transition::NoChange,
        TransactionStatus::Completed => Transition::Confirm,
        TransactionStatus::Failed | TransactionStatus::Timeout if state.is_failed_or_canceled() => Transition::NoChange,
        TransactionStatus::Failed | TransactionStatus::Timeout => Transition::Fail,
        TransactionStatus::ReceiptNotReceived => Transition::ForcePending,
        TransactionStatus::Other(s) => Transition::Unresolved(s.clone()),
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReconcileOutcome {
    /// The payment is confirmed, now or from before.
    Confirmed,
    Failed,
    Pending,
    /// The status was unknown, or the host refused the transition. The payment is left as it was.
    Unresolved,
    /// The record carried no status code. Nothing was persisted.
    MissingStatus,
}

#[derive(Debug, Clone)]
pub struct Reconciliation {
    pub outcome: ReconcileOutcome,
    /// The payment after reconciliation.
    pub payment: OrderPayment,
}

/// Applies a gateway transaction record to a payment.
///
/// The raw record is written to the payment's info blob first, unless the blob has been shredded. Then the
/// transition from [`decide`] is applied. A host error on `confirm` is logged and reported as unresolved; any other
/// store error is returned.
pub async fn reconcile<B: OrderManagement>(
    db: &B,
    payment: &OrderPayment,
    transaction: &PoliTransaction,
) -> Result<Reconciliation, GatewayStoreError> {
    let ref_no = transaction.ref_no().unwrap_or_default();
    let status = match transaction.status() {
        Some(s) => s,
        None => {
            error!("🔄️ POLi transaction {ref_no} for payment {} has no status code. Ignoring it.", payment.id);
            return Ok(Reconciliation { outcome: ReconcileOutcome::MissingStatus, payment: payment.clone() });
        },
    };
    let mut current = if payment.is_shredded() {
        warn!("🔄️ Payment {} has been shredded. Transaction {ref_no} will not be stored in its info.", payment.id);
        payment.clone()
    } else {
        let info = serde_json::to_string(transaction)?;
        db.update_payment_info(payment.id, &info).await?
    };
    let outcome = match decide(&status, current.state) {
        Transition::Confirm => match db.confirm_payment(current.id).await {
            Ok(p) => {
                info!("🔄️✅️ POLi payment confirmed: {}, Transaction: {ref_no}", p.id);
                log_transition(db, &p, log_actions::PAYMENT_CONFIRMED, &ref_no).await;
                current = p;
                ReconcileOutcome::Confirmed
            },
            Err(e) => {
                error!("🔄️ Failed to confirm POLi payment {}: {e}", current.id);
                ReconcileOutcome::Unresolved
            },
        },
        Transition::Fail => {
            current = db.set_payment_state(current.id, PaymentState::Failed).await?;
            warn!("🔄️❌️ POLi payment {} marked failed ({status}), Transaction: {ref_no}", current.id);
            log_transition(db, &current, log_actions::PAYMENT_FAILED, &ref_no).await;
            ReconcileOutcome::Failed
        },
        Transition::ForcePending => {
            if current.state != PaymentState::Pending {
                current = db.set_payment_state(current.id, PaymentState::Pending).await?;
            }
            warn!("🔄️ POLi payment receipt not received: {}, Transaction: {ref_no}", current.id);
            ReconcileOutcome::Pending
        },
        Transition::NoChange => {
            debug!("🔄️ POLi payment {} is already {}. Nothing to do for {status}.", current.id, current.state);
            match current.state {
                PaymentState::Confirmed => ReconcileOutcome::Confirmed,
                _ => ReconcileOutcome::Failed,
            }
        },
        Transition::Unresolved(code) => {
            error!("🔄️ POLi unknown transaction status: {code} for payment {}", current.id);
            ReconcileOutcome::Unresolved
        },
    };
    Ok(Reconciliation { outcome, payment: current })
}

async fn log_transition<B: OrderManagement>(db: &B, payment: &OrderPayment, action: &str, ref_no: &str) {
    let data = json!({ "local_id": payment.local_id, "provider": POLI_IDENTIFIER, "transaction_ref_no": ref_no });
    if let Err(e) = db.log_order_action(payment.order_id, action, data).await {
        error!("🔄️ Could not write {action} to the log of order #{}: {e}", payment.order_id);
    }
}
