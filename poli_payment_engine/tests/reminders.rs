use chrono::{Duration, Utc};
use poli_payment_engine::{
    api::reminder_api::KEY_SUBJECT_ORDER_PLACED,
    db_types::{Amount, NewOrder, NewPayment, OrderCode, OrderStatus, ReminderStatus},
    events::{OrderPlacedEvent, PaymentConfirmedEvent},
    log_actions,
    Mailer,
    OrderManagement,
    ReminderApi,
    ReminderQueue,
    ReminderResult,
    SettingsStore,
    UrlBuilder,
    POLI_IDENTIFIER,
};
use support::{prepare_env::*, *};

mod support;

#[tokio::test]
async fn reminder_is_sent_for_unpaid_order() {
    let db = setup().await;
    let event = new_event(&db).await;
    let (order, payment) = new_order(&db, &event).await;
    db.save_setting(event.id, KEY_SUBJECT_ORDER_PLACED, "Reminder: {code} ({total} {currency})").await.unwrap();
    let api = ReminderApi::new(db.clone(), UrlBuilder::new(SITE_URL)).with_delay(Duration::minutes(30));

    let placed = OrderPlacedEvent::new(event.clone(), order.clone(), vec![payment]);
    let reminder = api.schedule_for_order(&placed).await.expect("reminder scheduled");
    assert!(reminder.run_at > Utc::now() + Duration::minutes(29));

    let early = api.process_due_reminders(Utc::now()).await.unwrap();
    assert!(early.is_empty());

    let results = api.process_due_reminders(Utc::now() + Duration::minutes(31)).await.unwrap();
    assert_eq!(results.len(), 1);
    let ReminderResult::Sent(message) = &results[0].1 else { panic!("Expected a sent reminder: {results:?}") };
    assert_eq!(message.recipient, "jo@example.com");
    assert_eq!(message.subject, "Reminder: ABC12 (25.50 NZD)");
    assert!(message.body.contains("https://tix.example/demo/conf/order/ABC12/s3cr3t/"));
    assert!(message.body.contains("Demo Conference"));

    let outbox = db.fetch_mail_for_order(order.id).await.unwrap();
    assert_eq!(outbox.len(), 1);
    let log = db.fetch_order_log(order.id).await.unwrap();
    assert_eq!(log[0].action_type, log_actions::EMAIL_ORDER_PLACED);

    // Already processed reminders are not picked up again.
    let again = api.process_due_reminders(Utc::now() + Duration::hours(5)).await.unwrap();
    assert!(again.is_empty());
    tear_down(db).await;
}

#[tokio::test]
async fn reminder_is_skipped_once_paid() {
    let db = setup().await;
    let event = new_event(&db).await;
    let (order, payment) = new_order(&db, &event).await;
    let api = ReminderApi::new(db.clone(), UrlBuilder::new(SITE_URL));
    let placed = OrderPlacedEvent::new(event.clone(), order.clone(), vec![payment.clone()]);
    api.schedule_for_order(&placed).await.expect("reminder scheduled");

    db.confirm_payment(payment.id).await.unwrap();
    let results = api.process_due_reminders(Utc::now() + Duration::hours(3)).await.unwrap();
    assert_eq!(results.len(), 1);
    assert!(matches!(&results[0].1, ReminderResult::Skipped(reason) if reason == "order paid"));
    assert_eq!(results[0].1.status(), ReminderStatus::Skipped);
    assert!(db.fetch_mail_for_order(order.id).await.unwrap().is_empty());
    assert!(db.fetch_due_reminders(Utc::now() + Duration::hours(3)).await.unwrap().is_empty());
    tear_down(db).await;
}

#[tokio::test]
async fn reminders_only_for_poli_orders() {
    let db = setup().await;
    let event = new_event(&db).await;
    let order = NewOrder::new(event.id, "BANK1", "secret", Amount::from_cents(500));
    let (order, _) = db.insert_order(order).await.unwrap();
    let payment = db.insert_payment(order.id, NewPayment::new(1, "banktransfer", Amount::from_cents(500))).await.unwrap();
    let api = ReminderApi::new(db.clone(), UrlBuilder::new(SITE_URL));

    let placed = OrderPlacedEvent::new(event, order, vec![payment]);
    assert!(api.schedule_for_order(&placed).await.is_none());
    tear_down(db).await;
}

#[tokio::test]
async fn reminder_without_address_is_skipped() {
    let db = setup().await;
    let event = new_event(&db).await;
    let order = NewOrder::new(event.id, "NOADR", "secret", Amount::from_cents(500));
    let (order, _) = db.insert_order(order).await.unwrap();
    let api = ReminderApi::new(db.clone(), UrlBuilder::new(SITE_URL));
    db.schedule_reminder(event.id, &OrderCode::from("NOADR"), Utc::now()).await.unwrap();
    db.schedule_reminder(event.id, &OrderCode::from("GONE1"), Utc::now()).await.unwrap();

    let results = api.process_due_reminders(Utc::now() + Duration::seconds(1)).await.unwrap();
    let reasons = results
        .iter()
        .map(|(_, r)| match r {
            ReminderResult::Skipped(reason) => reason.clone(),
            other => panic!("Unexpected result {other:?}"),
        })
        .collect::<Vec<_>>();
    assert_eq!(reasons, vec!["no e-mail address".to_string(), "order not found".to_string()]);
    assert!(db.fetch_mail_for_order(order.id).await.unwrap().is_empty());
    tear_down(db).await;
}

#[tokio::test]
async fn reminder_is_skipped_for_closed_orders() {
    let db = setup().await;
    let event = new_event(&db).await;
    for (code, status) in [("EXP01", OrderStatus::Expired), ("CAN01", OrderStatus::Canceled)] {
        let mut order = NewOrder::new(event.id, code, "secret", Amount::from_cents(500)).with_email("jo@example.com");
        order.status = status;
        let (order, _) = db.insert_order(order).await.unwrap();
        db.insert_payment(order.id, NewPayment::new(1, POLI_IDENTIFIER, Amount::from_cents(500))).await.unwrap();
        db.schedule_reminder(event.id, &OrderCode::from(code), Utc::now()).await.unwrap();
    }
    let api = ReminderApi::new(db.clone(), UrlBuilder::new(SITE_URL));

    let results = api.process_due_reminders(Utc::now() + Duration::seconds(1)).await.unwrap();
    let reasons = results
        .iter()
        .map(|(_, r)| match r {
            ReminderResult::Skipped(reason) => reason.clone(),
            other => panic!("Unexpected result {other:?}"),
        })
        .collect::<Vec<_>>();
    assert_eq!(reasons, vec!["order expired".to_string(), "order canceled".to_string()]);
    tear_down(db).await;
}

#[tokio::test]
async fn reminder_is_skipped_for_partly_paid_poli_order() {
    let db = setup().await;
    let event = new_event(&db).await;
    let order = NewOrder::new(event.id, "PART1", "secret", Amount::from_cents(3000)).with_email("jo@example.com");
    let (order, _) = db.insert_order(order).await.unwrap();
    let poli = db.insert_payment(order.id, NewPayment::new(1, POLI_IDENTIFIER, Amount::from_cents(1000))).await.unwrap();
    db.insert_payment(order.id, NewPayment::new(2, "banktransfer", Amount::from_cents(2000))).await.unwrap();
    db.confirm_payment(poli.id).await.unwrap();
    let order = db.fetch_order_by_id(order.id).await.unwrap().unwrap();
    assert_eq!(order.status, OrderStatus::Pending);
    let api = ReminderApi::new(db.clone(), UrlBuilder::new(SITE_URL));
    let reminder = db.schedule_reminder(event.id, &order.code, Utc::now()).await.unwrap();

    let result = api.run_reminder(&reminder).await.unwrap();
    assert_eq!(result, ReminderResult::Skipped("payment confirmed".into()));
    assert!(db.fetch_mail_for_order(order.id).await.unwrap().is_empty());
    tear_down(db).await;
}

#[tokio::test]
async fn scheduling_failure_is_swallowed() {
    let db = setup().await;
    let event = new_event(&db).await;
    let (order, payment) = new_order(&db, &event).await;
    sqlx::query("DROP TABLE reminders").execute(db.pool()).await.unwrap();
    let api = ReminderApi::new(db.clone(), UrlBuilder::new(SITE_URL));

    let placed = OrderPlacedEvent::new(event.clone(), order.clone(), vec![payment]);
    assert!(api.schedule_for_order(&placed).await.is_none());
    let order = db.fetch_order_by_id(order.id).await.unwrap().unwrap();
    assert_eq!(order.status, OrderStatus::Pending);
    tear_down(db).await;
}

#[tokio::test]
async fn status_update_failure_does_not_stop_the_batch() {
    let db = setup().await;
    let event = new_event(&db).await;
    let order = NewOrder::new(event.id, "NOADR", "secret", Amount::from_cents(500));
    db.insert_order(order).await.unwrap();
    db.schedule_reminder(event.id, &OrderCode::from("FAIL1"), Utc::now() - Duration::seconds(5)).await.unwrap();
    db.schedule_reminder(event.id, &OrderCode::from("NOADR"), Utc::now()).await.unwrap();
    sqlx::query(
        r#"
            CREATE TRIGGER reminders_frozen BEFORE UPDATE ON reminders WHEN OLD.order_code = 'FAIL1'
            BEGIN SELECT RAISE(ABORT, 'reminder is frozen'); END;
        "#,
    )
    .execute(db.pool())
    .await
    .unwrap();
    let api = ReminderApi::new(db.clone(), UrlBuilder::new(SITE_URL));

    let results = api.process_due_reminders(Utc::now() + Duration::seconds(1)).await.unwrap();
    let codes = results.iter().map(|(r, _)| r.order_code.as_str().to_string()).collect::<Vec<_>>();
    assert_eq!(codes, vec!["FAIL1".to_string(), "NOADR".to_string()]);

    // The reminder that could not be updated is retried on the next run.
    let due = db.fetch_due_reminders(Utc::now() + Duration::seconds(1)).await.unwrap();
    assert_eq!(due.len(), 1);
    assert_eq!(due[0].order_code.as_str(), "FAIL1");
    tear_down(db).await;
}

#[tokio::test]
async fn confirmed_payment_withdraws_the_reminder() {
    let db = setup().await;
    let event = new_event(&db).await;
    let (order, payment) = new_order(&db, &event).await;
    let api = ReminderApi::new(db.clone(), UrlBuilder::new(SITE_URL));
    let placed = OrderPlacedEvent::new(event.clone(), order.clone(), vec![payment.clone()]);
    api.schedule_for_order(&placed).await.expect("reminder scheduled");

    let payment = db.confirm_payment(payment.id).await.unwrap();
    let confirmed = PaymentConfirmedEvent::new(event.clone(), order.clone(), payment, Some("996117408041".into()));
    assert_eq!(api.withdraw_for_payment(&confirmed).await, 1);
    assert_eq!(api.withdraw_for_payment(&confirmed).await, 0);
    let due = api.process_due_reminders(Utc::now() + Duration::hours(3)).await.unwrap();
    assert!(due.is_empty());
    assert!(db.fetch_mail_for_order(order.id).await.unwrap().is_empty());
    tear_down(db).await;
}
