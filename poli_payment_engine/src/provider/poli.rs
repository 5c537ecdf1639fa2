use async_trait::async_trait;
use log::*;
use poli_common::is_supported_currency;
use poli_tools::{
    helpers::navigate_url_token,
    InitiateTransaction,
    InitiateTransactionResponse,
    MerchantData,
    PoliApi,
    PoliTransaction,
};
use serde_json::{json, Value};

use crate::{
    db_types::{Amount, Event, NewTransactionToken, Order, OrderPayment},
    log_actions,
    provider::{settings::PoliSettings, PaymentError, PaymentProvider},
    traits::{GatewayBackend, GatewayStoreError},
    urls::UrlBuilder,
};

pub const POLI_IDENTIFIER: &str = "poli";

const TEST_MODE_MESSAGE: &str = "POLi test mode is enabled. No real money will be transferred.";

/// The POLi bank-transfer provider.
///
/// The provider is not bound to an event. Settings are read from the backend on every call, so a single instance
/// serves all events.
#[derive(Clone)]
pub struct PoliProvider<B> {
    db: B,
    urls: UrlBuilder,
    api_base_url: Option<String>,
}

impl<B> PoliProvider<B> {
    pub fn new(db: B, urls: UrlBuilder) -> Self {
        Self { db, urls, api_base_url: None }
    }

    /// Sends all gateway calls to `base_url` instead of the endpoint configured for the event.
    pub fn with_api_base_url<S: Into<String>>(mut self, base_url: Option<S>) -> Self {
        self.api_base_url = base_url.map(Into::into);
        self
    }

    pub fn urls(&self) -> &UrlBuilder {
        &self.urls
    }
}

impl<B: GatewayBackend> PoliProvider<B> {
    pub async fn settings(&self, event: &Event) -> Result<PoliSettings, GatewayStoreError> {
        PoliSettings::load(&self.db, event.id).await
    }

    fn api(&self, settings: &PoliSettings) -> Result<PoliApi, PaymentError> {
        PoliApi::new(settings.api_config(self.api_base_url.as_deref())).map_err(|e| {
            error!("💳️ Could not create POLi client: {e}");
            PaymentError::GatewayUnreachable(e.to_string())
        })
    }

    /// Fetches the gateway's record for a transaction. Every failure is logged and reported as `None`.
    pub async fn get_transaction_status(&self, event: &Event, token: &str) -> Option<PoliTransaction> {
        let settings = match self.settings(event).await {
            Ok(s) => s,
            Err(e) => {
                error!("💳️ Could not load POLi settings for event #{}: {e}", event.id);
                return None;
            },
        };
        let api = self.api(&settings).ok()?;
        match api.get_transaction(token).await {
            Ok(tx) => Some(tx),
            Err(e) => {
                error!("💳️ POLi GetTransaction failed for token {token}: {e}");
                None
            },
        }
    }

    fn initiate_request(
        &self,
        event: &Event,
        order: &Order,
        payment: &OrderPayment,
        settings: &PoliSettings,
    ) -> InitiateTransaction {
        let return_url = self.urls.return_url(event, order, payment.id);
        InitiateTransaction {
            amount: payment.amount,
            currency_code: event.currency.clone(),
            merchant_reference: order.code.to_string(),
            merchant_homepage_url: self.urls.event_index(event),
            success_url: return_url.clone(),
            failure_url: return_url,
            cancellation_url: self.urls.cancel_url(event, order, payment.id),
            notification_url: self.urls.webhook_url(event),
            timeout: settings.timeout,
            merchant_data: MerchantData { order_code: order.code.to_string(), payment_id: payment.id },
        }
    }

    async fn initiate(&self, event: &Event, order: &Order, payment: &OrderPayment) -> Result<Option<String>, PaymentError> {
        let settings = self.settings(event).await?;
        if !settings.is_configured() {
            warn!("💳️ POLi payment {} requested, but event #{} has no POLi credentials", payment.id, event.id);
            return Err(PaymentError::NotConfigured);
        }
        let api = self.api(&settings)?;
        let request = self.initiate_request(event, order, payment, &settings);
        match api.initiate_transaction(&request).await {
            Ok(response) if response.success => self.on_initiated(event, order, payment, response).await,
            Ok(response) => {
                let code = response.error_code();
                let message = response.error_message();
                error!("💳️ POLi InitiateTransaction failed for payment {}: {code} - {message}", payment.id);
                self.log_failure(order, payment, format!("{code}: {message}")).await;
                Err(PaymentError::TransactionRejected { code, message })
            },
            Err(e) => {
                error!("💳️ POLi API request failed for payment {}: {e}", payment.id);
                self.log_failure(order, payment, e.to_string()).await;
                Err(PaymentError::GatewayUnreachable(e.to_string()))
            },
        }
    }

    async fn on_initiated(
        &self,
        event: &Event,
        order: &Order,
        payment: &OrderPayment,
        response: InitiateTransactionResponse,
    ) -> Result<Option<String>, PaymentError> {
        let (ref_no, navigate_url) = match (response.transaction_ref_no, response.navigate_url) {
            (Some(r), Some(u)) if !r.is_empty() && !u.is_empty() => (r, u),
            _ => {
                error!("💳️ POLi reported success for payment {} without a transaction reference", payment.id);
                let message = "Missing TransactionRefNo or NavigateURL".to_string();
                self.log_failure(order, payment, message.clone()).await;
                return Err(PaymentError::TransactionRejected { code: "Unknown".into(), message });
            },
        };
        let mapping = NewTransactionToken {
            token: ref_no.clone(),
            gateway_token: navigate_url_token(&navigate_url),
            event_id: event.id,
            order_code: order.code.clone(),
            payment_id: payment.id,
            navigate_url: Some(navigate_url.clone()),
        };
        self.db.save_transaction_token(mapping).await?;
        if payment.is_shredded() {
            warn!("💳️ Payment {} has been shredded. Not recording transaction {ref_no} in its info.", payment.id);
        } else {
            let info = json!({ "transaction_ref_no": ref_no, "navigate_url": navigate_url });
            self.db.update_payment_info(payment.id, &info.to_string()).await?;
        }
        info!("💳️ POLi transaction initiated for payment {}: {ref_no}", payment.id);
        Ok(Some(navigate_url))
    }

    async fn log_failure(&self, order: &Order, payment: &OrderPayment, error: String) {
        let data = json!({ "local_id": payment.local_id, "provider": POLI_IDENTIFIER, "error": error });
        if let Err(e) = self.db.log_order_action(order.id, log_actions::PAYMENT_FAILED, data).await {
            error!("💳️ Could not write payment failure to the log of order {}: {e}", order.code);
        }
    }
}

#[async_trait(?Send)]
impl<B> PaymentProvider for PoliProvider<B>
where B: GatewayBackend + Send + Sync
{
    fn identifier(&self) -> &'static str {
        POLI_IDENTIFIER
    }

    fn verbose_name(&self) -> &'static str {
        "POLi"
    }

    async fn test_mode_message(&self, event: &Event) -> Option<String> {
        match self.settings(event).await {
            Ok(s) if s.endpoint.is_test() => Some(TEST_MODE_MESSAGE.to_string()),
            Ok(_) => None,
            Err(e) => {
                error!("💳️ Could not load POLi settings for event #{}: {e}", event.id);
                None
            },
        }
    }

    fn abort_pending_allowed(&self) -> bool {
        true
    }

    async fn is_allowed(&self, event: &Event, _total: Option<Amount>) -> bool {
        if !is_supported_currency(&event.currency) {
            trace!("💳️ POLi not offered for event #{}: currency {} is not supported", event.id, event.currency);
            return false;
        }
        match self.settings(event).await {
            Ok(s) => s.enabled,
            Err(e) => {
                error!("💳️ Could not load POLi settings for event #{}: {e}", event.id);
                false
            },
        }
    }

    /// There is nothing to collect before the order is placed. The transaction is initiated in `execute_payment`.
    fn payment_is_valid_session(&self, _event: &Event) -> bool {
        true
    }

    async fn checkout_prepare(&self, event: &Event, total: Amount) -> Result<bool, PaymentError> {
        debug!("💳️ POLi checkout_prepare for event #{} with total {total} {}", event.id, event.currency);
        if !self.is_allowed(event, Some(total)).await {
            return Err(PaymentError::NotAllowed);
        }
        if !self.settings(event).await?.is_configured() {
            return Err(PaymentError::NotConfigured);
        }
        Ok(true)
    }

    async fn execute_payment(
        &self,
        event: &Event,
        order: &Order,
        payment: &OrderPayment,
    ) -> Result<Option<String>, PaymentError> {
        self.initiate(event, order, payment).await
    }

    async fn payment_prepare(
        &self,
        event: &Event,
        order: &Order,
        payment: &OrderPayment,
    ) -> Result<Option<String>, PaymentError> {
        self.initiate(event, order, payment).await
    }

    fn payment_control_render_short(&self, payment: &OrderPayment) -> String {
        if let Some(data) = payment.info_data() {
            if let Some(ref_no) = data.ref_no() {
                let status = data.status_text().unwrap_or_else(|| "Unknown".to_string());
                return format!("POLi {ref_no} ({status})");
            }
        }
        format!("POLi ({})", payment.state)
    }

    fn matching_id(&self, payment: &OrderPayment) -> Option<String> {
        let data = payment.info_data()?;
        data.ref_no().or_else(|| data.transaction_id())
    }

    async fn shred_payment_info(&self, payment: &OrderPayment) -> Result<(), PaymentError> {
        let data = match payment.try_info_data() {
            Ok(Some(data)) => PoliTransaction::from(data),
            Ok(None) => return Ok(()),
            Err(e) => {
                warn!("💳️ Failed to shred payment info for payment {}: {e}", payment.id);
                return Ok(());
            },
        };
        let shredded = data.shredded();
        let info = serde_json::to_string(&shredded).map_err(GatewayStoreError::from)?;
        self.db.update_payment_info(payment.id, &info).await?;
        info!("💳️ Payment info for payment {} has been shredded", payment.id);
        Ok(())
    }

    fn api_payment_details(&self, payment: &OrderPayment) -> Value {
        let data = payment.info_data().unwrap_or_default();
        json!({
            "transaction_ref_no": data.ref_no(),
            "transaction_id": data.transaction_id(),
            "transaction_status": data.status_text(),
            "bank_receipt": data.bank_receipt(),
            "financial_institution": data.financial_institution(),
        })
    }
}
