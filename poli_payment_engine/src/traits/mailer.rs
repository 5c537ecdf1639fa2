use crate::{
    db_types::{EmailMessage, NewEmail},
    traits::GatewayStoreError,
};

#[allow(async_fn_in_trait)]
pub trait Mailer {
    /// Queues the message for delivery by the host.
    async fn send_mail(&self, email: NewEmail) -> Result<EmailMessage, GatewayStoreError>;

    async fn fetch_mail_for_order(&self, order_id: i64) -> Result<Vec<EmailMessage>, GatewayStoreError>;
}
