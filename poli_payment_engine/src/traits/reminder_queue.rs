use chrono::{DateTime, Utc};

use crate::{
    db_types::{OrderCode, ReminderStatus, ScheduledReminder},
    traits::GatewayStoreError,
};

#[allow(async_fn_in_trait)]
pub trait ReminderQueue {
    async fn schedule_reminder(
        &self,
        event_id: i64,
        order_code: &OrderCode,
        run_at: DateTime<Utc>,
    ) -> Result<ScheduledReminder, GatewayStoreError>;

    /// All reminders still in the `Scheduled` state whose `run_at` is at or before `now`, oldest first.
    async fn fetch_due_reminders(&self, now: DateTime<Utc>) -> Result<Vec<ScheduledReminder>, GatewayStoreError>;

    async fn update_reminder_status(&self, id: i64, status: ReminderStatus) -> Result<(), GatewayStoreError>;

    /// Skips every reminder for the order that has not run yet. Returns how many were withdrawn.
    async fn withdraw_reminders(&self, event_id: i64, order_code: &OrderCode) -> Result<u64, GatewayStoreError>;
}
