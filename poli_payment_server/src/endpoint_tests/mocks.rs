use chrono::{DateTime, Utc};
use mockall::mock;
use poli_payment_engine::{
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
        PaymentState,
        ReminderStatus,
        ScheduledReminder,
        TransactionToken,
    },
    GatewayStoreError,
    Mailer,
    OrderManagement,
    ReminderQueue,
    SettingsStore,
    TransactionTokens,
};
use serde_json::Value;

mock! {
    pub Backend {}
    impl OrderManagement for Backend {
        async fn upsert_event(&self, event: NewEvent) -> Result<Event, GatewayStoreError>;
        async fn fetch_event(&self, organizer: &str, slug: &str) -> Result<Option<Event>, GatewayStoreError>;
        async fn fetch_event_by_id(&self, id: i64) -> Result<Option<Event>, GatewayStoreError>;
        async fn insert_order(&self, order: NewOrder) -> Result<(Order, bool), GatewayStoreError>;
        async fn insert_payment(&self, order_id: i64, payment: NewPayment) -> Result<OrderPayment, GatewayStoreError>;
        async fn fetch_order(&self, event_id: i64, code: &OrderCode) -> Result<Option<Order>, GatewayStoreError>;
        async fn fetch_order_by_id(&self, id: i64) -> Result<Option<Order>, GatewayStoreError>;
        async fn fetch_payment(&self, payment_id: i64) -> Result<Option<OrderPayment>, GatewayStoreError>;
        async fn fetch_payments_for_order(&self, order_id: i64) -> Result<Vec<OrderPayment>, GatewayStoreError>;
        async fn update_payment_info(&self, payment_id: i64, info: &str) -> Result<OrderPayment, GatewayStoreError>;
        async fn set_payment_state(&self, payment_id: i64, state: PaymentState) -> Result<OrderPayment, GatewayStoreError>;
        async fn confirm_payment(&self, payment_id: i64) -> Result<OrderPayment, GatewayStoreError>;
        async fn log_order_action(&self, order_id: i64, action_type: &str, data: Value) -> Result<(), GatewayStoreError>;
        async fn fetch_order_log(&self, order_id: i64) -> Result<Vec<OrderLogEntry>, GatewayStoreError>;
    }
    impl SettingsStore for Backend {
        async fn fetch_setting(&self, event_id: i64, key: &str) -> Result<Option<String>, GatewayStoreError>;
        async fn save_setting(&self, event_id: i64, key: &str, value: &str) -> Result<(), GatewayStoreError>;
        async fn delete_setting(&self, event_id: i64, key: &str) -> Result<(), GatewayStoreError>;
    }
    impl TransactionTokens for Backend {
        async fn save_transaction_token(&self, token: NewTransactionToken) -> Result<TransactionToken, GatewayStoreError>;
        async fn fetch_transaction_token(&self, token: &str) -> Result<Option<TransactionToken>, GatewayStoreError>;
        async fn consume_transaction_token(&self, token: &str) -> Result<Option<TransactionToken>, GatewayStoreError>;
    }
    impl ReminderQueue for Backend {
        async fn schedule_reminder(&self, event_id: i64, order_code: &OrderCode, run_at: DateTime<Utc>) -> Result<ScheduledReminder, GatewayStoreError>;
        async fn fetch_due_reminders(&self, now: DateTime<Utc>) -> Result<Vec<ScheduledReminder>, GatewayStoreError>;
        async fn update_reminder_status(&self, id: i64, status: ReminderStatus) -> Result<(), GatewayStoreError>;
        async fn withdraw_reminders(&self, event_id: i64, order_code: &OrderCode) -> Result<u64, GatewayStoreError>;
    }
    impl Mailer for Backend {
        async fn send_mail(&self, email: NewEmail) -> Result<EmailMessage, GatewayStoreError>;
        async fn fetch_mail_for_order(&self, order_id: i64) -> Result<Vec<EmailMessage>, GatewayStoreError>;
    }
}
