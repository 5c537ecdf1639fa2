//! `SqliteDatabase` is a concrete implementation of a POLi payment engine backend.
//!
//! Unsurprisingly, it uses SQLite as the backend and implements all the traits defined in the [`crate::traits`]
//! module.
use std::fmt::Debug;

use chrono::{DateTime, Utc};
use log::*;
use serde_json::Value;
use sqlx::{error::ErrorKind, SqlitePool};

use super::db::{db_url, events, mail, new_pool, order_log, orders, payments, reminders, settings, tokens};
use crate::{
    db_types::{
        EmailMessage,
        Event,
        NewEmail,
        NewEvent,
        NewOrder,
        NewPayment,
        NewTransactionToken,
        Order,
        OrderCode,
        OrderLogEntry,
        OrderPayment,
        OrderStatus,
        PaymentState,
        ReminderStatus,
        ScheduledReminder,
        TransactionToken,
    },
    traits::{GatewayStoreError, Mailer, OrderManagement, ReminderQueue, SettingsStore, TransactionTokens},
};

#[derive(Clone)]
pub struct SqliteDatabase {
    url: String,
    pool: SqlitePool,
}

impl Debug for SqliteDatabase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "SqliteDatabase ({:?})", self.pool)
    }
}

impl SqliteDatabase {
    /// Creates a new database API object, using the URL from the `POLI_DATABASE_URL` environment variable.
    pub async fn new(max_connections: u32) -> Result<Self, sqlx::Error> {
        let url = db_url();
        SqliteDatabase::new_with_url(url.as_str(), max_connections).await
    }

    pub async fn new_with_url(url: &str, max_connections: u32) -> Result<Self, sqlx::Error> {
        trace!("Creating new database connection pool with url {url}");
        let pool = new_pool(url, max_connections).await?;
        let url = url.to_string();
        Ok(Self { url, pool })
    }

    /// Brings the schema up to date using the embedded migrations.
    pub async fn migrate(&self) -> Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("./src/sqlite/migrations").run(&self.pool).await?;
        info!("🗃️ Database migrations are up to date");
        Ok(())
    }

    pub fn url(&self) -> &str {
        self.url.as_str()
    }

    /// Returns a reference to the database connection pool.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

impl OrderManagement for SqliteDatabase {
    async fn upsert_event(&self, event: NewEvent) -> Result<Event, GatewayStoreError> {
        let mut conn = self.pool.acquire().await?;
        let event = events::upsert_event(event, &mut conn).await?;
        Ok(event)
    }

    async fn fetch_event(&self, organizer: &str, slug: &str) -> Result<Option<Event>, GatewayStoreError> {
        let mut conn = self.pool.acquire().await?;
        let event = events::fetch_event(organizer, slug, &mut conn).await?;
        Ok(event)
    }

    async fn fetch_event_by_id(&self, id: i64) -> Result<Option<Event>, GatewayStoreError> {
        let mut conn = self.pool.acquire().await?;
        let event = events::fetch_event_by_id(id, &mut conn).await?;
        Ok(event)
    }

    async fn insert_order(&self, order: NewOrder) -> Result<(Order, bool), GatewayStoreError> {
        let mut conn = self.pool.acquire().await?;
        let result = orders::idempotent_insert(order, &mut conn).await?;
        if !result.1 {
            debug!("🗃️ Order [{}] already exists. Nothing to insert", result.0.code);
        }
        Ok(result)
    }

    async fn insert_payment(&self, order_id: i64, payment: NewPayment) -> Result<OrderPayment, GatewayStoreError> {
        let mut conn = self.pool.acquire().await?;
        payments::idempotent_insert(order_id, payment, &mut conn).await.map_err(|e| {
            let missing_order =
                e.as_database_error().is_some_and(|db_err| matches!(db_err.kind(), ErrorKind::ForeignKeyViolation));
            if missing_order {
                GatewayStoreError::OrderIdNotFound(order_id)
            } else {
                e.into()
            }
        })
    }

    async fn fetch_order(&self, event_id: i64, code: &OrderCode) -> Result<Option<Order>, GatewayStoreError> {
        let mut conn = self.pool.acquire().await?;
        let order = orders::fetch_order(event_id, code, &mut conn).await?;
        Ok(order)
    }

    async fn fetch_order_by_id(&self, id: i64) -> Result<Option<Order>, GatewayStoreError> {
        let mut conn = self.pool.acquire().await?;
        let order = orders::fetch_order_by_id(id, &mut conn).await?;
        Ok(order)
    }

    async fn fetch_payment(&self, payment_id: i64) -> Result<Option<OrderPayment>, GatewayStoreError> {
        let mut conn = self.pool.acquire().await?;
        let payment = payments::fetch_payment(payment_id, &mut conn).await?;
        Ok(payment)
    }

    async fn fetch_payments_for_order(&self, order_id: i64) -> Result<Vec<OrderPayment>, GatewayStoreError> {
        let mut conn = self.pool.acquire().await?;
        let payments = payments::fetch_payments_for_order(order_id, &mut conn).await?;
        Ok(payments)
    }

    async fn update_payment_info(&self, payment_id: i64, info: &str) -> Result<OrderPayment, GatewayStoreError> {
        let mut conn = self.pool.acquire().await?;
        payments::update_info(payment_id, info, &mut conn).await?.ok_or(GatewayStoreError::PaymentNotFound(payment_id))
    }

    async fn set_payment_state(
        &self,
        payment_id: i64,
        state: PaymentState,
    ) -> Result<OrderPayment, GatewayStoreError> {
        let mut conn = self.pool.acquire().await?;
        let payment = payments::update_state(payment_id, state, &mut conn)
            .await?
            .ok_or(GatewayStoreError::PaymentNotFound(payment_id))?;
        debug!("🗃️ Payment {payment_id} is now {state}");
        Ok(payment)
    }

    async fn confirm_payment(&self, payment_id: i64) -> Result<OrderPayment, GatewayStoreError> {
        let mut tx = self.pool.begin().await?;
        let payment = payments::update_state(payment_id, PaymentState::Confirmed, &mut tx)
            .await?
            .ok_or(GatewayStoreError::PaymentNotFound(payment_id))?;
        let order = orders::fetch_order_by_id(payment.order_id, &mut tx)
            .await?
            .ok_or(GatewayStoreError::OrderIdNotFound(payment.order_id))?;
        let paid = payments::confirmed_total(order.id, &mut tx).await?;
        if paid >= order.total && order.status != OrderStatus::Paid {
            orders::update_order_status(order.id, OrderStatus::Paid, &mut tx).await?;
            info!("🗃️ Order [{}] is fully paid ({paid} of {})", order.code, order.total);
        }
        tx.commit().await?;
        debug!("🗃️ Payment {payment_id} confirmed");
        Ok(payment)
    }

    async fn log_order_action(&self, order_id: i64, action_type: &str, data: Value) -> Result<(), GatewayStoreError> {
        let data = serde_json::to_string(&data)?;
        let mut conn = self.pool.acquire().await?;
        order_log::insert_entry(order_id, action_type, &data, &mut conn).await?;
        trace!("🗃️ Order {order_id}: logged {action_type}");
        Ok(())
    }

    async fn fetch_order_log(&self, order_id: i64) -> Result<Vec<OrderLogEntry>, GatewayStoreError> {
        let mut conn = self.pool.acquire().await?;
        let entries = order_log::fetch_entries(order_id, &mut conn).await?;
        Ok(entries)
    }
}

impl SettingsStore for SqliteDatabase {
    async fn fetch_setting(&self, event_id: i64, key: &str) -> Result<Option<String>, GatewayStoreError> {
        let mut conn = self.pool.acquire().await?;
        let value = settings::fetch_setting(event_id, key, &mut conn).await?;
        Ok(value)
    }

    async fn save_setting(&self, event_id: i64, key: &str, value: &str) -> Result<(), GatewayStoreError> {
        let mut conn = self.pool.acquire().await?;
        settings::save_setting(event_id, key, value, &mut conn).await?;
        Ok(())
    }

    async fn delete_setting(&self, event_id: i64, key: &str) -> Result<(), GatewayStoreError> {
        let mut conn = self.pool.acquire().await?;
        settings::delete_setting(event_id, key, &mut conn).await?;
        Ok(())
    }
}

impl TransactionTokens for SqliteDatabase {
    async fn save_transaction_token(&self, token: NewTransactionToken) -> Result<TransactionToken, GatewayStoreError> {
        let mut conn = self.pool.acquire().await?;
        let token = tokens::upsert_token(token, &mut conn).await?;
        trace!("🗃️ Transaction token {} mapped to payment {}", token.token, token.payment_id);
        Ok(token)
    }

    async fn fetch_transaction_token(&self, token: &str) -> Result<Option<TransactionToken>, GatewayStoreError> {
        let mut conn = self.pool.acquire().await?;
        let token = tokens::fetch_token(token, &mut conn).await?;
        Ok(token)
    }

    async fn consume_transaction_token(&self, token: &str) -> Result<Option<TransactionToken>, GatewayStoreError> {
        let mut conn = self.pool.acquire().await?;
        let token = tokens::consume_token(token, &mut conn).await?;
        Ok(token)
    }
}

impl ReminderQueue for SqliteDatabase {
    async fn schedule_reminder(
        &self,
        event_id: i64,
        order_code: &OrderCode,
        run_at: DateTime<Utc>,
    ) -> Result<ScheduledReminder, GatewayStoreError> {
        let mut conn = self.pool.acquire().await?;
        let reminder = reminders::insert_reminder(event_id, order_code, run_at, &mut conn).await?;
        Ok(reminder)
    }

    async fn fetch_due_reminders(&self, now: DateTime<Utc>) -> Result<Vec<ScheduledReminder>, GatewayStoreError> {
        let mut conn = self.pool.acquire().await?;
        let due = reminders::fetch_due(now, &mut conn).await?;
        Ok(due)
    }

    async fn update_reminder_status(&self, id: i64, status: ReminderStatus) -> Result<(), GatewayStoreError> {
        let mut conn = self.pool.acquire().await?;
        let updated = reminders::update_status(id, status, &mut conn).await?;
        if updated == 0 {
            warn!("🗃️ Reminder {id} does not exist. Status {status:?} not recorded");
        }
        Ok(())
    }

    async fn withdraw_reminders(&self, event_id: i64, order_code: &OrderCode) -> Result<u64, GatewayStoreError> {
        let mut conn = self.pool.acquire().await?;
        let withdrawn = reminders::skip_for_order(event_id, order_code, &mut conn).await?;
        trace!("🗃️ {withdrawn} reminders for order {order_code} withdrawn");
        Ok(withdrawn)
    }
}

impl Mailer for SqliteDatabase {
    async fn send_mail(&self, email: NewEmail) -> Result<EmailMessage, GatewayStoreError> {
        let mut conn = self.pool.acquire().await?;
        let message = mail::insert_email(email, &mut conn).await?;
        debug!("🗃️ Mail #{} to {} queued: {}", message.id, message.recipient, message.subject);
        Ok(message)
    }

    async fn fetch_mail_for_order(&self, order_id: i64) -> Result<Vec<EmailMessage>, GatewayStoreError> {
        let mut conn = self.pool.acquire().await?;
        let messages = mail::fetch_for_order(order_id, &mut conn).await?;
        Ok(messages)
    }
}
