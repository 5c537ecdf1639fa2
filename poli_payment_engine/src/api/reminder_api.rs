use chrono::{DateTime, Duration, Utc};
use log::*;

use crate::{
    db_types::{EmailMessage, Event, NewEmail, Order, OrderStatus, PaymentState, ReminderStatus, ScheduledReminder},
    events::{OrderPlacedEvent, PaymentConfirmedEvent},
    log_actions,
    provider::POLI_IDENTIFIER,
    traits::{GatewayBackend, GatewayStoreError},
    urls::UrlBuilder,
};

pub const DEFAULT_REMINDER_DELAY_MINUTES: i64 = 120;

pub const KEY_SUBJECT_ORDER_PLACED: &str = "mail_subject_order_placed";
pub const KEY_TEXT_ORDER_PLACED: &str = "mail_text_order_placed";
pub const KEY_SUBJECT_ORDER_PLACED_APPROVAL: &str = "mail_subject_order_placed_require_approval";
pub const KEY_TEXT_ORDER_PLACED_APPROVAL: &str = "mail_text_order_placed_require_approval";

const DEFAULT_SUBJECT_ORDER_PLACED: &str = "Your order: {code}";
const DEFAULT_TEXT_ORDER_PLACED: &str = "Hello,\n\nwe successfully received your order for {event} with a total \
                                         value of {total} {currency}. Please complete your payment before the order \
                                         expires.\n\nYou can change your order details and view the status of your \
                                         order at\n{url}\n\nBest regards,\nYour {event} team";
const DEFAULT_SUBJECT_ORDER_PLACED_APPROVAL: &str = "Your order: {code}";
const DEFAULT_TEXT_ORDER_PLACED_APPROVAL: &str = "Hello,\n\nwe successfully received your order for {event} with a \
                                                  total value of {total} {currency}. Since you ordered a product \
                                                  that requires approval by the event organizer, we ask you to be \
                                                  patient and wait for our next email.\n\nYou can view the status \
                                                  of your order at\n{url}\n\nBest regards,\nYour {event} team";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReminderResult {
    Sent(EmailMessage),
    Skipped(String),
    /// The e-mail could not be handed to the host.
    Failed(String),
}

impl ReminderResult {
    pub fn status(&self) -> ReminderStatus {
        match self {
            Self::Sent(_) => ReminderStatus::Sent,
            Self::Skipped(_) => ReminderStatus::Skipped,
            Self::Failed(_) => ReminderStatus::Failed,
        }
    }
}

/// Schedules and sends the delayed "order placed" reminder for orders paid with POLi.
pub struct ReminderApi<B> {
    db: B,
    urls: UrlBuilder,
    delay: Duration,
}

impl<B> ReminderApi<B> {
    pub fn new(db: B, urls: UrlBuilder) -> Self {
        Self { db, urls, delay: Duration::minutes(DEFAULT_REMINDER_DELAY_MINUTES) }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }
}

impl<B> ReminderApi<B>
where B: GatewayBackend
{
    /// Queues a reminder if the order uses POLi. Failures are logged and never propagated, so that order processing
    /// carries on regardless.
    pub async fn schedule_for_order(&self, placed: &OrderPlacedEvent) -> Option<ScheduledReminder> {
        if !placed.uses_provider(POLI_IDENTIFIER) {
            trace!("⏰️ Order {} does not use POLi. No reminder needed.", placed.order.code);
            return None;
        }
        let run_at = Utc::now() + self.delay;
        match self.db.schedule_reminder(placed.event.id, &placed.order.code, run_at).await {
            Ok(r) => {
                info!("⏰️ Payment reminder for order {} scheduled for {run_at}", placed.order.code);
                Some(r)
            },
            Err(e) => {
                error!("⏰️ Could not schedule payment reminder for order {}: {e}", placed.order.code);
                None
            },
        }
    }

    /// Withdraws the pending reminders of an order whose POLi payment was just confirmed. Failures are logged and
    /// swallowed. Returns the number of reminders withdrawn.
    pub async fn withdraw_for_payment(&self, confirmed: &PaymentConfirmedEvent) -> u64 {
        let code = &confirmed.order.code;
        match self.db.withdraw_reminders(confirmed.event.id, code).await {
            Ok(0) => {
                trace!("⏰️ No pending payment reminder for order {code}");
                0
            },
            Ok(n) => {
                info!("⏰️ Payment for order {code} confirmed. {n} payment reminder(s) withdrawn");
                n
            },
            Err(e) => {
                error!("⏰️ Could not withdraw payment reminders for order {code}: {e}");
                0
            },
        }
    }

    /// Runs every reminder that is due at `now`. Returns the reminders that were processed with their results.
    ///
    /// A reminder whose status cannot be stored stays scheduled and is picked up again on the next run.
    pub async fn process_due_reminders(
        &self,
        now: DateTime<Utc>,
    ) -> Result<Vec<(ScheduledReminder, ReminderResult)>, GatewayStoreError> {
        let due = self.db.fetch_due_reminders(now).await?;
        if !due.is_empty() {
            debug!("⏰️ {} payment reminders are due", due.len());
        }
        let mut results = Vec::with_capacity(due.len());
        for reminder in due {
            let result = match self.run_reminder(&reminder).await {
                Ok(r) => r,
                Err(e) => {
                    error!("⏰️ Payment reminder #{} for order {} failed: {e}", reminder.id, reminder.order_code);
                    ReminderResult::Failed(e.to_string())
                },
            };
            if let Err(e) = self.db.update_reminder_status(reminder.id, result.status()).await {
                error!("⏰️ Could not mark payment reminder #{} as {:?}: {e}", reminder.id, result.status());
            }
            results.push((reminder, result));
        }
        Ok(results)
    }

    /// Sends the "order placed" e-mail for the reminder's order, unless the order no longer needs it.
    pub async fn run_reminder(&self, reminder: &ScheduledReminder) -> Result<ReminderResult, GatewayStoreError> {
        let code = &reminder.order_code;
        let event = self.db.fetch_event_by_id(reminder.event_id).await?;
        let order = match &event {
            Some(ev) => self.db.fetch_order(ev.id, code).await?,
            None => None,
        };
        let (Some(event), Some(order)) = (event, order) else {
            warn!("⏰️ Order {code} not found, skipping reminder email");
            return Ok(ReminderResult::Skipped("order not found".into()));
        };
        if order.status == OrderStatus::Paid {
            info!("⏰️ Order {code} already paid, skipping reminder email");
            return Ok(ReminderResult::Skipped("order paid".into()));
        }
        let payments = self.db.fetch_payments_for_order(order.id).await?;
        if payments.iter().any(|p| p.provider == POLI_IDENTIFIER && p.state == PaymentState::Confirmed) {
            info!("⏰️ Order {code} has confirmed POLi payment, skipping reminder email");
            return Ok(ReminderResult::Skipped("payment confirmed".into()));
        }
        if matches!(order.status, OrderStatus::Expired | OrderStatus::Canceled) {
            info!("⏰️ Order {code} is {}, skipping reminder email", order.status);
            return Ok(ReminderResult::Skipped(format!("order {}", order.status)));
        }
        let Some(recipient) = order.email.clone().filter(|e| !e.trim().is_empty()) else {
            warn!("⏰️ Order {code} has no e-mail address, skipping reminder email");
            return Ok(ReminderResult::Skipped("no e-mail address".into()));
        };
        let (subject, body, log_entry) = self.compose(&event, &order).await?;
        let email = NewEmail { event_id: event.id, order_id: Some(order.id), recipient, subject, body };
        match self.db.send_mail(email).await {
            Ok(message) => {
                let data = serde_json::json!({ "subject": message.subject, "recipient": message.recipient });
                if let Err(e) = self.db.log_order_action(order.id, log_entry, data).await {
                    error!("⏰️ Could not log reminder email for order {code}: {e}");
                }
                info!("⏰️ Sent pending payment reminder email for order {code}");
                Ok(ReminderResult::Sent(message))
            },
            Err(e) => {
                error!("⏰️ Reminder email for order {code} could not be sent: {e}");
                Ok(ReminderResult::Failed(e.to_string()))
            },
        }
    }

    async fn compose(&self, event: &Event, order: &Order) -> Result<(String, String, &'static str), GatewayStoreError> {
        let (subject_key, text_key, default_subject, default_text, log_entry) = if order.require_approval {
            (
                KEY_SUBJECT_ORDER_PLACED_APPROVAL,
                KEY_TEXT_ORDER_PLACED_APPROVAL,
                DEFAULT_SUBJECT_ORDER_PLACED_APPROVAL,
                DEFAULT_TEXT_ORDER_PLACED_APPROVAL,
                log_actions::EMAIL_ORDER_PLACED_REQUIRE_APPROVAL,
            )
        } else {
            (
                KEY_SUBJECT_ORDER_PLACED,
                KEY_TEXT_ORDER_PLACED,
                DEFAULT_SUBJECT_ORDER_PLACED,
                DEFAULT_TEXT_ORDER_PLACED,
                log_actions::EMAIL_ORDER_PLACED,
            )
        };
        let subject = self.db.fetch_setting(event.id, subject_key).await?.unwrap_or_else(|| default_subject.into());
        let text = self.db.fetch_setting(event.id, text_key).await?.unwrap_or_else(|| default_text.into());
        let url = self.urls.order_page(event, order.code.as_str(), &order.secret);
        let total = order.total.to_string();
        let vars = [
            ("code", order.code.as_str()),
            ("event", event.name.as_str()),
            ("total", total.as_str()),
            ("currency", event.currency.as_str()),
            ("url", url.as_str()),
        ];
        Ok((render_template(&subject, &vars), render_template(&text, &vars), log_entry))
    }
}

/// Replaces `{name}` placeholders. Unknown placeholders are left as they are.
pub fn render_template(template: &str, vars: &[(&str, &str)]) -> String {
    vars.iter().fold(template.to_string(), |acc, (k, v)| acc.replace(&format!("{{{k}}}"), v))
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn templates() {
        let s = render_template("Your order: {code} ({total} {currency}) {unknown}", &[
            ("code", "ABC12"),
            ("total", "10.00"),
            ("currency", "NZD"),
        ]);
        assert_eq!(s, "Your order: ABC12 (10.00 NZD) {unknown}");
    }
}
