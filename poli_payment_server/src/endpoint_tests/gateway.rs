use actix_web::{http::StatusCode, test::TestRequest, web};
use poli_payment_engine::{events::EventProducers, PaymentFlowApi, PoliProvider};

use super::{
    helpers::{event, order, send_request, urls, TestResponse},
    mocks::MockBackend,
};
use crate::{
    config::ServerOptions,
    poli_routes::{PoliCancelRoute, PoliReturnRoute, PoliWebhookRoute},
};

async fn call(req: TestRequest, db: MockBackend, options: ServerOptions) -> TestResponse {
    let flow = web::Data::new(PaymentFlowApi::new(
        db,
        PoliProvider::new(MockBackend::new(), urls()),
        EventProducers::default(),
    ));
    send_request(req, move |cfg| {
        cfg.app_data(flow)
            .app_data(web::Data::new(options))
            .service(PoliReturnRoute::<MockBackend>::new())
            .service(PoliCancelRoute::<MockBackend>::new())
            .service(PoliWebhookRoute::<MockBackend>::new());
    })
    .await
}

fn backend_with_event() -> MockBackend {
    let mut db = MockBackend::new();
    db.expect_fetch_event().returning(|_, _| Ok(Some(event("NZD"))));
    db
}

#[actix_web::test]
async fn webhook_without_token_is_rejected() {
    let _ = env_logger::try_init().ok();
    let req = TestRequest::post()
        .uri("/demo/conf/poli/webhook")
        .insert_header(("Content-Type", "application/x-www-form-urlencoded"))
        .set_payload("");
    let res = call(req, backend_with_event(), ServerOptions::default()).await;
    assert_eq!(res.status, StatusCode::BAD_REQUEST);
    assert_eq!(res.body, "Token is required");
}

#[actix_web::test]
async fn webhook_from_unlisted_address_is_forbidden() {
    let _ = env_logger::try_init().ok();
    let mut db = MockBackend::new();
    db.expect_fetch_event().never();
    let options = ServerOptions {
        webhook_whitelist: Some(vec!["203.0.113.7".parse().unwrap()]),
        ..ServerOptions::default()
    };
    let req = TestRequest::post()
        .uri("/demo/conf/poli/webhook")
        .peer_addr("192.0.2.1:40000".parse().unwrap())
        .insert_header(("Content-Type", "application/x-www-form-urlencoded"))
        .set_payload("Token=abc");
    let res = call(req, db, options).await;
    assert_eq!(res.status, StatusCode::FORBIDDEN);
}

#[actix_web::test]
async fn webhook_for_unknown_event_is_not_found() {
    let _ = env_logger::try_init().ok();
    let mut db = MockBackend::new();
    db.expect_fetch_event().returning(|_, _| Ok(None));
    db.expect_fetch_transaction_token().never();
    let req = TestRequest::post()
        .uri("/demo/gone/poli/webhook")
        .insert_header(("Content-Type", "application/x-www-form-urlencoded"))
        .set_payload("Token=abc");
    let res = call(req, db, ServerOptions::default()).await;
    assert_eq!(res.status, StatusCode::NOT_FOUND);
}

#[actix_web::test]
async fn return_without_token_redirects_with_error() {
    let _ = env_logger::try_init().ok();
    let mut db = backend_with_event();
    db.expect_fetch_order().never();
    let req = TestRequest::get().uri("/demo/conf/poli/return/ABC12/3/s3cr3t/");
    let res = call(req, db, ServerOptions::default()).await;
    assert_eq!(res.status, StatusCode::FOUND);
    assert_eq!(res.location.as_deref(), Some("https://tix.example/demo/conf/order/ABC12/s3cr3t/?error=poli_no_token"));
}

#[actix_web::test]
async fn return_with_wrong_secret_is_forbidden() {
    let _ = env_logger::try_init().ok();
    let mut db = backend_with_event();
    db.expect_fetch_order().returning(|_, _| Ok(Some(order())));
    db.expect_fetch_payment().never();
    let req = TestRequest::get().uri("/demo/conf/poli/return/ABC12/3/guessed/?token=uL2a7tbJ2y");
    let res = call(req, db, ServerOptions::default()).await;
    assert_eq!(res.status, StatusCode::FORBIDDEN);
}

#[actix_web::test]
async fn cancel_for_unknown_order_redirects_to_event() {
    let _ = env_logger::try_init().ok();
    let mut db = backend_with_event();
    db.expect_fetch_order().returning(|_, _| Ok(None));
    db.expect_set_payment_state().never();
    let req = TestRequest::get().uri("/demo/conf/poli/cancel/ZZZ99/3/s3cr3t/");
    let res = call(req, db, ServerOptions::default()).await;
    assert_eq!(res.status, StatusCode::FOUND);
    assert_eq!(res.location.as_deref(), Some("https://tix.example/demo/conf/?notice=poli_order_not_found"));
}
