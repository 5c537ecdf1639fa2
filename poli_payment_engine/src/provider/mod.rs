//! # Payment providers
//!
//! A payment provider is the capability the host's checkout pipeline calls into: it decides whether it can be
//! offered, starts payments and renders what it knows about a payment. Providers are registered into a
//! [`ProviderRegistry`] at startup and looked up by identifier.
//!
//! [`PoliProvider`] is the only implementation in this crate.
mod poli;
pub mod settings;

use std::sync::Arc;

use async_trait::async_trait;
use log::*;
pub use poli::{PoliProvider, POLI_IDENTIFIER};
use serde_json::Value;
use thiserror::Error;

use crate::{
    db_types::{Amount, Event, Order, OrderPayment},
    traits::GatewayStoreError,
};

/// Errors raised to the buyer during checkout. The display text is user-facing.
#[derive(Debug, Clone, Error)]
pub enum PaymentError {
    #[error("We were unable to reach POLi. Please try again or contact support.")]
    GatewayUnreachable(String),
    #[error("We were unable to initiate the POLi transaction. Please try again or contact support.")]
    TransactionRejected { code: String, message: String },
    #[error("POLi is not available for this event.")]
    NotAllowed,
    #[error("POLi has not been configured for this event.")]
    NotConfigured,
    #[error("An internal error occurred while processing your payment.")]
    Store(#[from] GatewayStoreError),
}

#[async_trait(?Send)]
pub trait PaymentProvider: Send + Sync {
    fn identifier(&self) -> &'static str;

    fn verbose_name(&self) -> &'static str;

    /// A warning shown to the buyer when the provider is running against a test environment.
    async fn test_mode_message(&self, event: &Event) -> Option<String>;

    /// Whether pending payments may be aborted by the buyer.
    fn abort_pending_allowed(&self) -> bool;

    /// Whether the provider may be offered for this event and cart total.
    async fn is_allowed(&self, event: &Event, total: Option<Amount>) -> bool;

    /// Whether the checkout session holds everything needed to execute a payment.
    fn payment_is_valid_session(&self, event: &Event) -> bool;

    /// Called when the buyer selects this provider during checkout.
    async fn checkout_prepare(&self, event: &Event, total: Amount) -> Result<bool, PaymentError>;

    /// Starts the payment once the order has been placed. Returns a URL to redirect the buyer to, if any.
    async fn execute_payment(
        &self,
        event: &Event,
        order: &Order,
        payment: &OrderPayment,
    ) -> Result<Option<String>, PaymentError>;

    /// Starts a payment for an existing order, e.g. on retry or change of payment method.
    async fn payment_prepare(
        &self,
        event: &Event,
        order: &Order,
        payment: &OrderPayment,
    ) -> Result<Option<String>, PaymentError>;

    fn payment_control_render_short(&self, payment: &OrderPayment) -> String;

    /// A gateway-side identifier for reconciliation against bank statements.
    fn matching_id(&self, payment: &OrderPayment) -> Option<String>;

    /// Removes sensitive data from the payment's info blob.
    async fn shred_payment_info(&self, payment: &OrderPayment) -> Result<(), PaymentError>;

    fn api_payment_details(&self, payment: &OrderPayment) -> Value;
}

#[derive(Default, Clone)]
pub struct ProviderRegistry {
    providers: Vec<Arc<dyn PaymentProvider>>,
}

impl ProviderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a provider. A provider with the same identifier replaces the earlier registration.
    pub fn register<P: PaymentProvider + 'static>(&mut self, provider: P) -> &mut Self {
        let id = provider.identifier();
        if self.providers.iter().any(|p| p.identifier() == id) {
            warn!("🔌️ Payment provider '{id}' registered twice. Replacing the earlier registration.");
            self.providers.retain(|p| p.identifier() != id);
        }
        info!("🔌️ Registered payment provider '{id}'");
        self.providers.push(Arc::new(provider));
        self
    }

    pub fn get(&self, identifier: &str) -> Option<Arc<dyn PaymentProvider>> {
        self.providers.iter().find(|p| p.identifier() == identifier).cloned()
    }

    pub fn identifiers(&self) -> Vec<&'static str> {
        self.providers.iter().map(|p| p.identifier()).collect()
    }

    /// The providers that may be offered for the event.
    pub async fn allowed_for(&self, event: &Event, total: Option<Amount>) -> Vec<Arc<dyn PaymentProvider>> {
        let mut result = Vec::with_capacity(self.providers.len());
        for p in &self.providers {
            if p.is_allowed(event, total).await {
                result.push(Arc::clone(p));
            }
        }
        result
    }
}
