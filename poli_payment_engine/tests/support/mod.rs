#![allow(dead_code)]
pub mod prepare_env;

use poli_payment_engine::{
    db_types::{Amount, Event, NewEvent, NewOrder, NewPayment, Order, OrderPayment},
    provider::settings::PoliSettings,
    CheckoutApi,
    OrderManagement,
    PoliProvider,
    ProviderRegistry,
    SqliteDatabase,
    UrlBuilder,
    POLI_IDENTIFIER,
};
use poli_common::Secret;
use poli_tools::PoliEndpoint;

pub const SITE_URL: &str = "https://tix.example";
pub const ORDER_CODE: &str = "ABC12";
pub const ORDER_SECRET: &str = "s3cr3t";
pub const BASIC_AUTH: &str = "Basic U1M2NDE5MjphWjkjZmFrZQ==";
pub const INITIATE_SUCCESS: &str = include_str!("../../../poli_tools/test_assets/initiate_success.json");
pub const INITIATE_FAILURE: &str = include_str!("../../../poli_tools/test_assets/initiate_failure.json");
pub const TX_COMPLETED: &str = include_str!("../../../poli_tools/test_assets/get_transaction_completed.json");

pub fn transaction_with_status(status: &str) -> serde_json::Value {
    let mut tx: serde_json::Value = serde_json::from_str(TX_COMPLETED).unwrap();
    tx["TransactionStatusCode"] = status.into();
    tx
}

pub async fn new_event(db: &SqliteDatabase) -> Event {
    let mut event = NewEvent::new("demo", "conf", "NZD");
    event.name = "Demo Conference".into();
    db.upsert_event(event).await.unwrap()
}

pub async fn configure_poli(db: &SqliteDatabase, event: &Event) {
    let settings = PoliSettings {
        enabled: true,
        authentication_code: Secret::new("aZ9#fake".to_string()),
        merchant_code: "SS64192".into(),
        endpoint: PoliEndpoint::Uat,
        timeout: 900,
    };
    settings.save(db, event.id).await.unwrap();
}

pub async fn new_order(db: &SqliteDatabase, event: &Event) -> (Order, OrderPayment) {
    let order = NewOrder::new(event.id, ORDER_CODE, ORDER_SECRET, Amount::from_cents(2550)).with_email("jo@example.com");
    let (order, _) = db.insert_order(order).await.unwrap();
    let payment = NewPayment::new(1, POLI_IDENTIFIER, Amount::from_cents(2550));
    let payment = db.insert_payment(order.id, payment).await.unwrap();
    (order, payment)
}

pub fn provider(db: &SqliteDatabase, api_base_url: &str) -> PoliProvider<SqliteDatabase> {
    PoliProvider::new(db.clone(), UrlBuilder::new(SITE_URL)).with_api_base_url(Some(api_base_url))
}

pub fn checkout(db: &SqliteDatabase, api_base_url: &str) -> CheckoutApi<SqliteDatabase> {
    let mut registry = ProviderRegistry::new();
    registry.register(provider(db, api_base_url));
    CheckoutApi::new(db.clone(), registry)
}
