use std::{sync::Arc, time::Duration};

use chrono::Utc;
use log::*;
use poli_payment_engine::{ReminderApi, ReminderResult, SqliteDatabase};
use tokio::task::JoinHandle;

/// Starts the payment reminder worker. Do not await the returned JoinHandle, as it will run indefinitely.
pub fn start_reminder_worker(api: Arc<ReminderApi<SqliteDatabase>>, interval: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut timer = tokio::time::interval(interval);
        info!("⏰️ Payment reminder worker started. Polling every {}s", interval.as_secs());
        loop {
            timer.tick().await;
            trace!("⏰️ Running payment reminder job");
            match api.process_due_reminders(Utc::now()).await {
                Ok(results) if results.is_empty() => {},
                Ok(results) => {
                    let sent = results.iter().filter(|(_, r)| matches!(r, ReminderResult::Sent(_))).count();
                    info!("⏰️ {} payment reminders processed, {sent} sent", results.len());
                    for (reminder, result) in &results {
                        debug!("⏰️ Reminder #{} for order {}: {}", reminder.id, reminder.order_code, describe(result));
                    }
                },
                Err(e) => {
                    error!("⏰️ Error running payment reminder job: {e}");
                },
            }
        }
    })
}

fn describe(result: &ReminderResult) -> String {
    match result {
        ReminderResult::Sent(mail) => format!("sent to {}", mail.recipient),
        ReminderResult::Skipped(reason) => format!("skipped. {reason}"),
        ReminderResult::Failed(reason) => format!("failed. {reason}"),
    }
}
