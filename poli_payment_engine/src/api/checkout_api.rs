use log::*;

use crate::{
    api::{
        api_objects::{PaymentDetails, PaymentRedirect, ProviderSummary},
        errors::FlowError,
    },
    db_types::{Amount, Event, NewEvent, Order, OrderPayment},
    provider::{
        settings::{PoliSettings, PublicSettings, SettingsForm},
        PaymentProvider,
        ProviderRegistry,
    },
    traits::GatewayBackend,
};

/// The host's checkout pipeline and back-office, as seen by the payment providers.
pub struct CheckoutApi<B> {
    db: B,
    registry: ProviderRegistry,
}

impl<B> CheckoutApi<B> {
    pub fn new(db: B, registry: ProviderRegistry) -> Self {
        Self { db, registry }
    }

    pub fn registry(&self) -> &ProviderRegistry {
        &self.registry
    }
}

impl<B> CheckoutApi<B>
where B: GatewayBackend
{
    pub async fn upsert_event(&self, event: NewEvent) -> Result<Event, FlowError> {
        let event = self.db.upsert_event(event).await?;
        debug!("🛒️ Event {}/{} is #{}", event.organizer, event.slug, event.id);
        Ok(event)
    }

    pub async fn fetch_event(&self, organizer: &str, slug: &str) -> Result<Event, FlowError> {
        self.db.fetch_event(organizer, slug).await?.ok_or_else(|| FlowError::EventNotFound(format!("{organizer}/{slug}")))
    }

    pub async fn poli_settings(&self, event: &Event) -> Result<PublicSettings, FlowError> {
        Ok(PoliSettings::load(&self.db, event.id).await?.public_view())
    }

    /// Validates and stores the POLi settings form for the event.
    pub async fn update_poli_settings(&self, event: &Event, form: SettingsForm) -> Result<PublicSettings, FlowError> {
        let current = PoliSettings::load(&self.db, event.id).await?;
        let settings = form.validate(&current).map_err(|e| {
            info!("🛒️ Rejected POLi settings for event #{}: {e}", event.id);
            e
        })?;
        settings.save(&self.db, event.id).await?;
        Ok(settings.public_view())
    }

    /// The providers that can be offered for the event and cart total.
    pub async fn allowed_providers(&self, event: &Event, total: Option<Amount>) -> Vec<ProviderSummary> {
        let mut result = Vec::new();
        for p in self.registry.allowed_for(event, total).await {
            result.push(ProviderSummary {
                identifier: p.identifier().to_string(),
                verbose_name: p.verbose_name().to_string(),
                test_mode_message: p.test_mode_message(event).await,
                abort_pending_allowed: p.abort_pending_allowed(),
                valid_session: p.payment_is_valid_session(event),
            });
        }
        result
    }

    pub async fn checkout_prepare(&self, event: &Event, provider: &str, total: Amount) -> Result<bool, FlowError> {
        let p = self.provider(provider)?;
        Ok(p.checkout_prepare(event, total).await?)
    }

    /// Starts the payment with its provider. `retry` selects `payment_prepare` (existing order, new attempt) over
    /// `execute_payment` (freshly placed order).
    pub async fn start_payment(&self, payment_id: i64, retry: bool) -> Result<PaymentRedirect, FlowError> {
        let (event, order, payment) = self.payment_context(payment_id).await?;
        let p = self.provider(&payment.provider)?;
        let redirect_url = if retry {
            p.payment_prepare(&event, &order, &payment).await?
        } else {
            p.execute_payment(&event, &order, &payment).await?
        };
        Ok(PaymentRedirect { payment_id, redirect_url })
    }

    pub async fn payment_details(&self, payment_id: i64) -> Result<PaymentDetails, FlowError> {
        let payment = self.db.fetch_payment(payment_id).await?.ok_or(FlowError::PaymentNotFound(payment_id))?;
        let p = self.provider(&payment.provider)?;
        Ok(PaymentDetails {
            id: payment.id,
            local_id: payment.local_id,
            provider: payment.provider.clone(),
            state: payment.state,
            amount: payment.amount,
            short: p.payment_control_render_short(&payment),
            matching_id: p.matching_id(&payment),
            details: p.api_payment_details(&payment),
        })
    }

    pub async fn shred_payment(&self, payment_id: i64) -> Result<PaymentDetails, FlowError> {
        let payment = self.db.fetch_payment(payment_id).await?.ok_or(FlowError::PaymentNotFound(payment_id))?;
        let p = self.provider(&payment.provider)?;
        p.shred_payment_info(&payment).await?;
        self.payment_details(payment_id).await
    }

    fn provider(&self, identifier: &str) -> Result<std::sync::Arc<dyn PaymentProvider>, FlowError> {
        self.registry.get(identifier).ok_or_else(|| FlowError::ProviderNotFound(identifier.to_string()))
    }

    async fn payment_context(&self, payment_id: i64) -> Result<(Event, Order, OrderPayment), FlowError> {
        let payment = self.db.fetch_payment(payment_id).await?.ok_or(FlowError::PaymentNotFound(payment_id))?;
        let order = self
            .db
            .fetch_order_by_id(payment.order_id)
            .await?
            .ok_or(FlowError::PaymentNotFound(payment_id))?;
        let event = self
            .db
            .fetch_event_by_id(order.event_id)
            .await?
            .ok_or_else(|| FlowError::EventNotFound(format!("#{}", order.event_id)))?;
        Ok((event, order, payment))
    }
}
