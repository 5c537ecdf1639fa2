use std::{
    sync::{
        atomic::{AtomicI32, Ordering},
        Arc,
    },
    time::Duration,
};

use log::*;
use poli_payment_engine::{
    api_objects::{CallbackResponse, WebhookOutcome},
    db_types::{Amount, NewOrder, NewPayment, OrderCode},
    events::{EventHandlers, EventHooks, EventProducers},
    reconciliation::ReconcileOutcome,
    CallbackPath,
    PaymentFlowApi,
    POLI_IDENTIFIER,
};
use wiremock::{
    matchers::{method, path},
    Mock,
    MockServer,
    ResponseTemplate,
};
use support::{prepare_env::*, *};

mod support;

#[derive(Default, Clone)]
struct HookCalled {
    called: Arc<AtomicI32>,
}

impl HookCalled {
    pub fn called(&self) {
        let _ = self.called.fetch_add(1, Ordering::Relaxed);
    }

    pub fn count(&self) -> i32 {
        self.called.load(Ordering::Relaxed)
    }
}

async fn wait_for(counter: &HookCalled, expected: i32) {
    for _ in 0..50 {
        if counter.count() >= expected {
            break;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
}

#[tokio::test]
async fn on_order_placed() {
    let db = setup().await;
    let event = new_event(&db).await;
    let counter = HookCalled::default();
    let counter_copy = counter.clone();
    let mut hooks = EventHooks::default();
    hooks.on_order_placed(move |ev| {
        info!("🪝️ {}", ev.order.code);
        assert!(ev.uses_provider(POLI_IDENTIFIER));
        counter_copy.called();
        Box::pin(async {})
    });
    let handlers = EventHandlers::new(16, hooks);
    let producers = handlers.producers();
    handlers.start_handlers().await;
    let api = PaymentFlowApi::new(db.clone(), provider(&db, "http://127.0.0.1:9"), producers);

    for code in ["ORD01", "ORD02", "ORD01"] {
        let order = NewOrder::new(0, code, "secret", Amount::from_cents(1000));
        let payment = NewPayment::new(1, POLI_IDENTIFIER, Amount::from_cents(1000));
        let placed = api.process_new_order(&event, order, vec![payment]).await.expect("Error processing order");
        assert_eq!(placed.payments.len(), 1);
        assert_eq!(placed.order.event_id, event.id);
    }
    wait_for(&counter, 2).await;
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(counter.count(), 2);
    tear_down(db).await;
}

#[tokio::test]
async fn on_payment_confirmed_fires_once_per_payment() {
    let db = setup().await;
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/v2/Transaction/Initiate"))
        .respond_with(ResponseTemplate::new(200).set_body_string(INITIATE_SUCCESS))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/v2/Transaction/GetTransaction"))
        .respond_with(ResponseTemplate::new(200).set_body_json(transaction_with_status("Completed")))
        .mount(&server)
        .await;
    let event = new_event(&db).await;
    configure_poli(&db, &event).await;
    let (_order, payment) = new_order(&db, &event).await;
    checkout(&db, &server.uri()).start_payment(payment.id, false).await.unwrap();

    let placed = HookCalled::default();
    let confirmed = HookCalled::default();
    let (placed_copy, confirmed_copy) = (placed.clone(), confirmed.clone());
    let mut hooks = EventHooks::default();
    hooks.on_order_placed(move |_| {
        placed_copy.called();
        Box::pin(async {})
    });
    hooks.on_payment_confirmed(move |ev| {
        info!("🪝️ {} confirmed with {:?}", ev.order.code, ev.transaction_ref_no);
        assert_eq!(ev.transaction_ref_no.as_deref(), Some("996117408041"));
        assert_eq!(ev.order.code.as_str(), ORDER_CODE);
        confirmed_copy.called();
        Box::pin(async {})
    });
    let handlers = EventHandlers::new(4, hooks);
    let producers = handlers.producers().merge(EventProducers::default());
    assert!(!producers.is_empty());
    handlers.start_handlers().await;
    let api = PaymentFlowApi::new(db.clone(), provider(&db, &server.uri()), producers);

    let path = CallbackPath { order_code: OrderCode::from(ORDER_CODE), payment_id: payment.id, hash: ORDER_SECRET.into() };
    let response = api.handle_return(&event, path, Some("uL2a7tbJ2y+2IVzBX3BqJlEwgiZzOX7A".into())).await;
    assert!(matches!(response, CallbackResponse::Redirect(_)));
    let outcome = api.handle_webhook(&event, Some("996117408041".into())).await.unwrap();
    assert_eq!(outcome, WebhookOutcome::Reconciled(ReconcileOutcome::Confirmed));

    wait_for(&confirmed, 1).await;
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(confirmed.count(), 1);
    assert_eq!(placed.count(), 0);
    tear_down(db).await;
}
