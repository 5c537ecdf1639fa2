use actix_web::{
    http::{Method, StatusCode},
    test::TestRequest,
    web,
};
use poli_common::Secret;
use poli_payment_engine::{
    db_types::OrderCode,
    events::EventProducers,
    provider::settings::{KEY_AUTHENTICATION_CODE, KEY_ENABLED, KEY_MERCHANT_CODE},
    CheckoutApi,
    PaymentFlowApi,
    PoliProvider,
    ProviderRegistry,
};

use super::{
    helpers::{event, host_signature, send_request, signed, urls},
    mocks::MockBackend,
};
use crate::{
    config::HostApiConfig,
    middleware::{HostSignature, HOST_HMAC_HEADER},
    routes::{health, MailFilterRoute, PoliSettingsRoute, ProvidersRoute, UpdatePoliSettingsRoute},
};

fn checkout_api(db: MockBackend) -> web::Data<CheckoutApi<MockBackend>> {
    let mut registry = ProviderRegistry::new();
    let mut provider_db = MockBackend::new();
    provider_db.expect_fetch_setting().returning(|_, _| Ok(None));
    registry.register(PoliProvider::new(provider_db, urls()));
    web::Data::new(CheckoutApi::new(db, registry))
}

fn configure_settings(cfg: &mut web::ServiceConfig, api: web::Data<CheckoutApi<MockBackend>>) {
    cfg.app_data(api).service(
        web::scope("/host")
            .wrap(host_signature())
            .service(PoliSettingsRoute::<MockBackend>::new())
            .service(UpdatePoliSettingsRoute::<MockBackend>::new())
            .service(ProvidersRoute::<MockBackend>::new()),
    );
}

fn known_event(db: &mut MockBackend, currency: &'static str) {
    db.expect_fetch_event().returning(move |_, _| Ok(Some(event(currency))));
}

#[actix_web::test]
async fn health_endpoint() {
    let res = send_request(TestRequest::get().uri("/health"), |cfg| {
        cfg.service(health);
    })
    .await;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.body, "👍️\n");
}

#[actix_web::test]
async fn unsigned_host_request_is_forbidden() {
    let _ = env_logger::try_init().ok();
    let mut db = MockBackend::new();
    db.expect_fetch_event().never();
    let api = checkout_api(db);
    let req = TestRequest::get().uri("/host/events/demo/conf/settings/poli");
    let res = send_request(req, |cfg| configure_settings(cfg, api)).await;
    assert_eq!(res.status, StatusCode::FORBIDDEN);
    assert_eq!(res.body, r#"{"error":"Forbidden. No host signature found."}"#);
}

#[actix_web::test]
async fn badly_signed_host_request_is_forbidden() {
    let _ = env_logger::try_init().ok();
    let mut db = MockBackend::new();
    db.expect_fetch_event().never();
    let api = checkout_api(db);
    let req = TestRequest::get()
        .uri("/host/events/demo/conf/settings/poli")
        .insert_header(("X-Host-Hmac-Sha256", "qp4uNXX11wmLbKzNeQiIw21f22M0KnO62i1qUXR6hJQ="));
    let res = send_request(req, |cfg| configure_settings(cfg, api)).await;
    assert_eq!(res.status, StatusCode::FORBIDDEN);
    assert_eq!(res.body, r#"{"error":"Forbidden. Invalid host signature."}"#);
}

#[actix_web::test]
async fn signature_for_another_resource_is_forbidden() {
    let _ = env_logger::try_init().ok();
    let mut db = MockBackend::new();
    db.expect_fetch_event().never();
    let api = checkout_api(db);
    let borrowed = signed(Method::GET, "/host/events/demo/conf/providers?total=25.50", "")
        .to_http_request()
        .headers()
        .get(HOST_HMAC_HEADER)
        .cloned()
        .unwrap();
    let req = TestRequest::get().uri("/host/events/demo/conf/settings/poli").insert_header((HOST_HMAC_HEADER, borrowed));
    let res = send_request(req, |cfg| configure_settings(cfg, api)).await;
    assert_eq!(res.status, StatusCode::FORBIDDEN);
    assert_eq!(res.body, r#"{"error":"Forbidden. Invalid host signature."}"#);
}

#[actix_web::test]
async fn unsigned_host_request_passes_when_checks_are_disabled() {
    let _ = env_logger::try_init().ok();
    let mut db = MockBackend::new();
    db.expect_fetch_event().returning(|_, _| Ok(None));
    let api = checkout_api(db);
    let unchecked = HostSignature::new(&HostApiConfig { hmac_secret: Secret::default(), hmac_checks: false });
    let req = TestRequest::get().uri("/host/events/demo/nope/settings/poli");
    let res = send_request(req, |cfg| {
        cfg.app_data(api).service(web::scope("/host").wrap(unchecked).service(PoliSettingsRoute::<MockBackend>::new()));
    })
    .await;
    assert_eq!(res.status, StatusCode::NOT_FOUND);
}

#[actix_web::test]
async fn settings_never_reveal_the_authentication_code() {
    let _ = env_logger::try_init().ok();
    let mut db = MockBackend::new();
    known_event(&mut db, "NZD");
    db.expect_fetch_setting().returning(|_, key| {
        Ok(match key {
            KEY_ENABLED => Some("True".to_string()),
            KEY_AUTHENTICATION_CODE => Some("aZ9#fake".to_string()),
            KEY_MERCHANT_CODE => Some("SS64192".to_string()),
            _ => None,
        })
    });
    let api = checkout_api(db);
    let req = signed(Method::GET, "/host/events/demo/conf/settings/poli", "");
    let res = send_request(req, |cfg| configure_settings(cfg, api)).await;
    assert_eq!(res.status, StatusCode::OK);
    assert!(res.body.contains(r#""authentication_code_set":true"#));
    assert!(res.body.contains(r#""merchant_code":"SS64192""#));
    assert!(!res.body.contains("aZ9#fake"));
}

#[actix_web::test]
async fn invalid_settings_are_rejected_per_field() {
    let _ = env_logger::try_init().ok();
    let mut db = MockBackend::new();
    known_event(&mut db, "NZD");
    db.expect_fetch_setting().returning(|_, _| Ok(None));
    db.expect_save_setting().never();
    let api = checkout_api(db);
    let body = r#"{"_enabled":true,"merchant_code":"","timeout":5}"#;
    let req = signed(Method::PUT, "/host/events/demo/conf/settings/poli", body);
    let res = send_request(req, |cfg| configure_settings(cfg, api)).await;
    assert_eq!(res.status, StatusCode::BAD_REQUEST);
    let json: serde_json::Value = serde_json::from_str(&res.body).unwrap();
    let fields = json["fields"].as_object().unwrap();
    assert!(fields.contains_key("payment_poli_authentication_code"));
    assert!(fields.contains_key("payment_poli_merchant_code"));
    assert!(fields.contains_key("payment_poli_timeout"));
}

#[actix_web::test]
async fn settings_for_unknown_event_are_not_found() {
    let _ = env_logger::try_init().ok();
    let mut db = MockBackend::new();
    db.expect_fetch_event().returning(|_, _| Ok(None));
    let api = checkout_api(db);
    let req = signed(Method::GET, "/host/events/demo/nope/settings/poli", "");
    let res = send_request(req, |cfg| configure_settings(cfg, api)).await;
    assert_eq!(res.status, StatusCode::NOT_FOUND);
    assert!(res.body.contains("demo/nope"));
}

#[actix_web::test]
async fn poli_is_not_offered_in_unsupported_currencies() {
    let _ = env_logger::try_init().ok();
    let mut db = MockBackend::new();
    known_event(&mut db, "USD");
    let api = checkout_api(db);
    let req = signed(Method::GET, "/host/events/demo/conf/providers?total=25.50", "");
    let res = send_request(req, |cfg| configure_settings(cfg, api)).await;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.body, "[]");
}

#[actix_web::test]
async fn mail_for_unknown_orders_is_sent() {
    let _ = env_logger::try_init().ok();
    let mut db = MockBackend::new();
    known_event(&mut db, "NZD");
    db.expect_fetch_order().withf(|_, code| code == &OrderCode::from("ZZZ99")).returning(|_, _| Ok(None));
    let flow = web::Data::new(PaymentFlowApi::new(
        db,
        PoliProvider::new(MockBackend::new(), urls()),
        EventProducers::default(),
    ));
    let body = r#"{"organizer":"demo","event":"conf","order_code":"ZZZ99","subject":"Your order: ZZZ99"}"#;
    let req = signed(Method::POST, "/host/mail/filter", body);
    let res = send_request(req, |cfg| {
        cfg.app_data(flow).service(web::scope("/host").wrap(host_signature()).service(MailFilterRoute::<MockBackend>::new()));
    })
    .await;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.body, r#"{"decision":"send"}"#);
}
