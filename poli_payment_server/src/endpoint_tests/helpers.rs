use actix_web::{
    body::MessageBody,
    http::{header, Method, StatusCode},
    test,
    test::TestRequest,
    web::ServiceConfig,
    App,
};
use chrono::{TimeZone, Utc};
use log::debug;
use poli_common::Secret;
use poli_payment_engine::{
    db_types::{Amount, Event, Order, OrderCode, OrderStatus},
    UrlBuilder,
};

use crate::{
    config::HostApiConfig,
    middleware::{sign_host_request, HostSignature, HOST_HMAC_HEADER},
};

pub const SITE_URL: &str = "https://tix.example";
// Test-only secret. DO NOT re-use it anywhere.
pub const HMAC_SECRET: &str = "a2b3c4d5-host-test-secret";

pub struct TestResponse {
    pub status: StatusCode,
    pub location: Option<String>,
    pub body: String,
}

pub fn urls() -> UrlBuilder {
    UrlBuilder::new(SITE_URL)
}

pub fn host_signature() -> HostSignature {
    HostSignature::new(&HostApiConfig { hmac_secret: Secret::new(HMAC_SECRET.to_string()), hmac_checks: true })
}

/// A host API request carrying a valid signature for its method, path and `body`.
pub fn signed(method: Method, uri: &str, body: &str) -> TestRequest {
    let signature = sign_host_request(HMAC_SECRET, method.as_str(), uri, body.as_bytes());
    TestRequest::default()
        .method(method)
        .uri(uri)
        .insert_header((HOST_HMAC_HEADER, signature))
        .insert_header((header::CONTENT_TYPE, "application/json"))
        .set_payload(body.to_string())
}

pub async fn send_request<F>(req: TestRequest, configure: F) -> TestResponse
where F: FnOnce(&mut ServiceConfig) {
    let app = test::init_service(App::new().configure(configure)).await;
    debug!("Making request");
    match test::try_call_service(&app, req.to_request()).await {
        Ok(res) => {
            let status = res.status();
            let location = res.headers().get(header::LOCATION).and_then(|v| v.to_str().ok()).map(String::from);
            let body = String::from_utf8_lossy(&test::read_body(res).await).into_owned();
            TestResponse { status, location, body }
        },
        Err(e) => {
            let res = e.error_response();
            let status = res.status();
            let body = res.into_body().try_into_bytes().map(|b| String::from_utf8_lossy(&b).into_owned());
            TestResponse { status, location: None, body: body.unwrap_or_default() }
        },
    }
}

pub fn event(currency: &str) -> Event {
    Event {
        id: 1,
        organizer: "demo".into(),
        slug: "conf".into(),
        name: "Demo Conference".into(),
        currency: currency.into(),
        created_at: Utc.with_ymd_and_hms(2024, 3, 1, 9, 0, 0).unwrap(),
    }
}

pub fn order() -> Order {
    let ts = Utc.with_ymd_and_hms(2024, 3, 2, 10, 30, 0).unwrap();
    Order {
        id: 7,
        event_id: 1,
        code: OrderCode::from("ABC12"),
        secret: "s3cr3t".into(),
        status: OrderStatus::Pending,
        total: Amount::from(2550),
        email: Some("jo@example.com".into()),
        locale: None,
        require_approval: false,
        created_at: ts,
        updated_at: ts,
    }
}
