use std::sync::Arc;

use futures::future::BoxFuture;
use log::*;
use poli_payment_engine::{
    events::{EventHandlers, EventHooks},
    ReminderApi,
    SqliteDatabase,
    POLI_IDENTIFIER,
};

pub const REMINDER_EVENT_BUFFER_SIZE: usize = 25;

/// Assigns the payment reminder handlers.
///
/// When an order that will be paid with POLi is placed, a reminder is queued and sent by the reminder worker once the
/// delay has passed. When its POLi payment is confirmed before then, the reminder is withdrawn.
pub fn create_reminder_event_handlers(api: Arc<ReminderApi<SqliteDatabase>>) -> EventHandlers {
    let mut hooks = EventHooks::default();
    let scheduler = Arc::clone(&api);
    hooks.on_order_placed(move |ev| {
        if !ev.uses_provider(POLI_IDENTIFIER) {
            trace!("⏰️ Order {} is not paid with POLi. Ignoring.", ev.order.code);
            return no_op();
        }
        let api = Arc::clone(&scheduler);
        Box::pin(async move {
            if api.schedule_for_order(&ev).await.is_none() {
                debug!("⏰️ No payment reminder was scheduled for order {}", ev.order.code);
            }
        })
    });
    hooks.on_payment_confirmed(move |ev| {
        let api = Arc::clone(&api);
        Box::pin(async move {
            api.withdraw_for_payment(&ev).await;
        })
    });
    EventHandlers::new(REMINDER_EVENT_BUFFER_SIZE, hooks)
}

fn no_op() -> BoxFuture<'static, ()> {
    Box::pin(async {})
}
