use std::fmt::Debug;

use log::*;
use poli_tools::PoliTransaction;
use serde_json::json;

use crate::{
    api::{
        api_objects::{CallbackResponse, PlacedOrder, WebhookOutcome},
        errors::FlowError,
    },
    db_types::{Event, NewOrder, NewPayment, Order, OrderCode, OrderPayment, PaymentState, TransactionToken},
    events::{EventProducers, OrderPlacedEvent, PaymentConfirmedEvent},
    log_actions,
    mail_filter::{filter_order_mail, MailDecision},
    provider::{PoliProvider, POLI_IDENTIFIER},
    reconciliation::{reconcile, ReconcileOutcome, Reconciliation},
    traits::GatewayBackend,
    urls::{notices, UrlBuilder},
};

/// `PaymentFlowApi` handles everything that happens after the buyer leaves for the gateway: the browser coming back
/// (return and cancel), server-to-server nudges, and order notifications from the host.
pub struct PaymentFlowApi<B> {
    db: B,
    provider: PoliProvider<B>,
    producers: EventProducers,
}

impl<B> Debug for PaymentFlowApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "PaymentFlowApi")
    }
}

/// Identifies the payment a buyer is returning for. All three values come from the callback URL.
#[derive(Debug, Clone)]
pub struct CallbackPath {
    pub order_code: OrderCode,
    pub payment_id: i64,
    pub hash: String,
}

impl<B> PaymentFlowApi<B> {
    pub fn new(db: B, provider: PoliProvider<B>, producers: EventProducers) -> Self {
        Self { db, provider, producers }
    }

    fn urls(&self) -> &UrlBuilder {
        self.provider.urls()
    }
}

impl<B> PaymentFlowApi<B>
where B: GatewayBackend
{
    pub async fn fetch_event(&self, organizer: &str, slug: &str) -> Result<Event, FlowError> {
        self.db.fetch_event(organizer, slug).await?.ok_or_else(|| FlowError::EventNotFound(format!("{organizer}/{slug}")))
    }

    /// Records an order placed on the host, together with its payments.
    ///
    /// This call is idempotent. Subscribers to the order-placed hook are only notified the first time an order is seen.
    pub async fn process_new_order(
        &self,
        event: &Event,
        mut order: NewOrder,
        payments: Vec<NewPayment>,
    ) -> Result<PlacedOrder, FlowError> {
        order.event_id = event.id;
        let (order, inserted) = self.db.insert_order(order).await?;
        let mut saved = Vec::with_capacity(payments.len());
        for p in payments {
            saved.push(self.db.insert_payment(order.id, p).await?);
        }
        let payments = self.db.fetch_payments_for_order(order.id).await?;
        if inserted {
            debug!("🔄️📦️ Order {} placed for event #{} with {} payments", order.code, event.id, saved.len());
            self.call_order_placed_hook(event, &order, &payments).await;
        } else {
            debug!("🔄️📦️ Order {} was already known. Not notifying subscribers.", order.code);
        }
        Ok(PlacedOrder { order, payments, inserted })
    }

    async fn call_order_placed_hook(&self, event: &Event, order: &Order, payments: &[OrderPayment]) {
        debug!("🔄️📦️ Notifying order placed hook subscribers");
        let ev = OrderPlacedEvent::new(event.clone(), order.clone(), payments.to_vec());
        self.producers.publish_order_placed(ev).await;
    }

    /// Notifies subscribers if reconciliation just moved `before` into the confirmed state.
    async fn call_payment_confirmed_hook(
        &self,
        event: &Event,
        order: &Order,
        before: &OrderPayment,
        result: &Reconciliation,
        transaction: &PoliTransaction,
    ) {
        if before.state == PaymentState::Confirmed || result.payment.state != PaymentState::Confirmed {
            return;
        }
        debug!("🔄️✅️ Notifying payment confirmed hook subscribers for payment {}", result.payment.id);
        let ev = PaymentConfirmedEvent::new(event.clone(), order.clone(), result.payment.clone(), transaction.ref_no());
        self.producers.publish_payment_confirmed(ev).await;
    }

    /// Handles the buyer being sent back from the gateway.
    pub async fn handle_return(&self, event: &Event, path: CallbackPath, token: Option<String>) -> CallbackResponse {
        let token = match token.filter(|t| !t.trim().is_empty()) {
            Some(t) => t,
            None => {
                warn!("🔄️ POLi return for order {} without a token", path.order_code);
                let url = self.urls().order_page_with_error(event, path.order_code.as_str(), &path.hash, notices::NO_TOKEN);
                return CallbackResponse::Redirect(url);
            },
        };
        match self.process_return(event, &path, &token).await {
            Ok(response) => response,
            Err(e) => {
                error!("🔄️ Error processing POLi return for order {}: {e}", path.order_code);
                CallbackResponse::Redirect(self.urls().event_index_with_notice(event, notices::PROCESSING_ERROR))
            },
        }
    }

    async fn process_return(&self, event: &Event, path: &CallbackPath, token: &str) -> Result<CallbackResponse, FlowError> {
        let (order, payment) = match self.order_and_payment(event, path).await? {
            Ok(found) => found,
            Err(response) => return Ok(response),
        };
        let mapping = self.db.fetch_transaction_token(token).await?;
        if let Some(m) = &mapping {
            if !mapping_matches(m, event, &payment) {
                warn!("🔄️ POLi token {token} was issued for payment {}, not {}", m.payment_id, payment.id);
                return Ok(CallbackResponse::Forbidden);
            }
            if m.consumed_at.is_some() {
                warn!("🔄️ POLi token {token} for payment {} was already used", payment.id);
                return Ok(CallbackResponse::Forbidden);
            }
        }
        let Some(transaction) = self.provider.get_transaction_status(event, token).await else {
            let url = self.urls().order_page_with_notice(event, &order, notices::PAYMENT_UNVERIFIED);
            return Ok(CallbackResponse::Redirect(url));
        };
        if !reference_matches(&transaction, &order.code) {
            warn!(
                "🔄️ POLi transaction for token {token} references order {:?}, not {}",
                transaction.merchant_reference(),
                order.code
            );
            return Ok(CallbackResponse::Forbidden);
        }
        let result = reconcile(&self.db, &payment, &transaction).await?;
        self.call_payment_confirmed_hook(event, &order, &payment, &result, &transaction).await;
        self.consume_token(token, mapping.as_ref(), &transaction).await;
        let notice = match result.payment.state {
            PaymentState::Confirmed => notices::PAYMENT_SUCCESS,
            PaymentState::Pending => notices::PAYMENT_PROCESSING,
            _ => notices::PAYMENT_FAILED,
        };
        Ok(CallbackResponse::Redirect(self.urls().order_page_with_notice(event, &order, notice)))
    }

    async fn consume_token(&self, token: &str, mapping: Option<&TransactionToken>, transaction: &PoliTransaction) {
        let key = match (mapping, transaction.ref_no()) {
            (Some(m), _) => m.token.clone(),
            (None, Some(ref_no)) => ref_no,
            (None, None) => token.to_string(),
        };
        match self.db.consume_transaction_token(&key).await {
            Ok(Some(_)) => trace!("🔄️ POLi token {key} consumed"),
            Ok(None) => debug!("🔄️ POLi token {key} has no mapping to consume"),
            Err(e) => error!("🔄️ Could not mark POLi token {key} as consumed: {e}"),
        }
    }

    /// Handles the buyer aborting on the gateway's pages. Only a payment that was never started remotely is canceled.
    pub async fn handle_cancel(&self, event: &Event, path: CallbackPath) -> CallbackResponse {
        match self.process_cancel(event, &path).await {
            Ok(response) => response,
            Err(e) => {
                error!("🔄️ Error processing POLi cancel for order {}: {e}", path.order_code);
                CallbackResponse::Redirect(self.urls().event_index_with_notice(event, notices::PROCESSING_ERROR))
            },
        }
    }

    async fn process_cancel(&self, event: &Event, path: &CallbackPath) -> Result<CallbackResponse, FlowError> {
        let (order, payment) = match self.order_and_payment(event, path).await? {
            Ok(found) => found,
            Err(response) => return Ok(response),
        };
        if payment.state == PaymentState::Created {
            let payment = self.db.set_payment_state(payment.id, PaymentState::Canceled).await?;
            info!("🔄️❌️ POLi payment {} canceled by the buyer", payment.id);
            let data = json!({ "local_id": payment.local_id, "provider": POLI_IDENTIFIER });
            if let Err(e) = self.db.log_order_action(order.id, log_actions::PAYMENT_CANCELED, data).await {
                error!("🔄️ Could not write cancelation to the log of order {}: {e}", order.code);
            }
        } else {
            debug!("🔄️ POLi cancel for payment {} ignored. It is {}.", payment.id, payment.state);
        }
        Ok(CallbackResponse::Redirect(self.urls().order_page_with_notice(event, &order, notices::PAYMENT_CANCELLED)))
    }

    /// Looks up the order and payment named in a callback URL and checks the order secret.
    ///
    /// The outer error is a store failure. The inner `Err` is the response to send when the lookup fails.
    async fn order_and_payment(
        &self,
        event: &Event,
        path: &CallbackPath,
    ) -> Result<Result<(Order, OrderPayment), CallbackResponse>, FlowError> {
        let Some(order) = self.db.fetch_order(event.id, &path.order_code).await? else {
            warn!("🔄️ POLi callback for unknown order {}", path.order_code);
            return Ok(Err(CallbackResponse::Redirect(
                self.urls().event_index_with_notice(event, notices::ORDER_NOT_FOUND),
            )));
        };
        if order.secret != path.hash {
            warn!("🔄️ POLi callback for order {} with the wrong secret", order.code);
            return Ok(Err(CallbackResponse::Forbidden));
        }
        let payment = self
            .db
            .fetch_payment(path.payment_id)
            .await?
            .filter(|p| p.order_id == order.id && p.provider == POLI_IDENTIFIER);
        match payment {
            Some(p) => Ok(Ok((order, p))),
            None => {
                warn!("🔄️ POLi callback for unknown payment {} on order {}", path.payment_id, order.code);
                Ok(Err(CallbackResponse::Redirect(
                    self.urls().event_index_with_notice(event, notices::PAYMENT_NOT_FOUND),
                )))
            },
        }
    }

    /// Handles a server-to-server nudge from the gateway.
    ///
    /// Only a missing token is an error. Everything else is acknowledged, and processing failures are reported as
    /// [`WebhookOutcome::Error`].
    pub async fn handle_webhook(&self, event: &Event, token: Option<String>) -> Result<WebhookOutcome, FlowError> {
        let token = match token.filter(|t| !t.trim().is_empty()) {
            Some(t) => t,
            None => {
                warn!("🔄️ POLi webhook received without token");
                return Err(FlowError::MissingToken);
            },
        };
        info!("🔄️ POLi webhook received with token: {token}");
        match self.process_webhook(event, &token).await {
            Ok(outcome) => Ok(outcome),
            Err(e) => {
                error!("🔄️ Error processing POLi webhook: {e}");
                Ok(WebhookOutcome::Error(e.to_string()))
            },
        }
    }

    async fn process_webhook(&self, event: &Event, token: &str) -> Result<WebhookOutcome, FlowError> {
        let mut transaction = None;
        let mapping = match self.db.fetch_transaction_token(token).await? {
            Some(m) => m,
            None => {
                let Some(tx) = self.provider.get_transaction_status(event, token).await else {
                    return Ok(WebhookOutcome::Unavailable);
                };
                let by_ref = match tx.ref_no() {
                    Some(ref_no) => self.db.fetch_transaction_token(&ref_no).await?,
                    None => None,
                };
                match by_ref {
                    Some(m) => {
                        transaction = Some(tx);
                        m
                    },
                    None => {
                        warn!("🔄️ POLi webhook token {token} does not belong to any payment initiated here");
                        return Ok(WebhookOutcome::Unmapped);
                    },
                }
            },
        };
        if mapping.event_id != event.id {
            warn!("🔄️ POLi webhook token {token} belongs to event #{}, not #{}", mapping.event_id, event.id);
            return Ok(WebhookOutcome::Mismatch);
        }
        let transaction = match transaction {
            Some(tx) => tx,
            None => match self.provider.get_transaction_status(event, token).await {
                Some(tx) => tx,
                None => return Ok(WebhookOutcome::Unavailable),
            },
        };
        if transaction.merchant_reference().as_deref() != Some(mapping.order_code.as_str()) {
            warn!(
                "🔄️ POLi webhook transaction references order {:?}, but token {token} was issued for {}",
                transaction.merchant_reference(),
                mapping.order_code
            );
            return Ok(WebhookOutcome::Mismatch);
        }
        let order = self
            .db
            .fetch_order(event.id, &mapping.order_code)
            .await?
            .ok_or_else(|| FlowError::OrderNotFound(mapping.order_code.clone()))?;
        let payment = self
            .db
            .fetch_payment(mapping.payment_id)
            .await?
            .filter(|p| p.order_id == order.id)
            .ok_or(FlowError::PaymentNotFound(mapping.payment_id))?;
        let result = reconcile(&self.db, &payment, &transaction).await?;
        self.call_payment_confirmed_hook(event, &order, &payment, &result, &transaction).await;
        if result.outcome == ReconcileOutcome::Unresolved {
            debug!("🔄️ POLi webhook for payment {} left it unresolved", payment.id);
        }
        Ok(WebhookOutcome::Reconciled(result.outcome))
    }

    /// Decides whether an outbound order e-mail should be sent now.
    pub async fn filter_mail(&self, event: &Event, order_code: &OrderCode, subject: &str) -> Result<MailDecision, FlowError> {
        let Some(order) = self.db.fetch_order(event.id, order_code).await? else {
            return Ok(MailDecision::Send);
        };
        let payments = self.db.fetch_payments_for_order(order.id).await?;
        let decision = filter_order_mail(subject, &payments);
        if decision == MailDecision::Suppress {
            info!("🔄️📧️ Holding back '{subject}' for order {order_code} while its POLi payment is in progress");
        }
        Ok(decision)
    }
}

fn mapping_matches(mapping: &TransactionToken, event: &Event, payment: &OrderPayment) -> bool {
    mapping.event_id == event.id && mapping.payment_id == payment.id
}

/// A record without a merchant reference is accepted. One with a different reference is not.
fn reference_matches(transaction: &PoliTransaction, code: &OrderCode) -> bool {
    transaction.merchant_reference().map(|r| r == code.as_str()).unwrap_or(true)
}
