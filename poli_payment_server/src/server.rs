use std::{sync::Arc, time::Duration};

use actix_web::{dev::Server, http::KeepAlive, middleware::Logger, web, web::ServiceConfig, App, HttpServer};
use log::*;
use poli_payment_engine::{
    events::EventProducers,
    CheckoutApi,
    PaymentFlowApi,
    PoliProvider,
    ProviderRegistry,
    ReminderApi,
    SqliteDatabase,
    UrlBuilder,
};

use crate::{
    config::{ServerConfig, ServerOptions},
    errors::ServerError,
    integrations::reminders::create_reminder_event_handlers,
    middleware::HostSignature,
    poli_routes::{PoliCancelRoute, PoliReturnRoute, PoliWebhookRoute},
    reminder_worker::start_reminder_worker,
    routes::{
        health,
        CheckoutPrepareRoute,
        ExecutePaymentRoute,
        MailFilterRoute,
        OrderPlacedRoute,
        PaymentDetailsRoute,
        PoliSettingsRoute,
        PreparePaymentRoute,
        ProvidersRoute,
        ShredPaymentRoute,
        UpdatePoliSettingsRoute,
        UpsertEventRoute,
    },
};

pub async fn run_server(config: ServerConfig) -> Result<(), ServerError> {
    let db = SqliteDatabase::new_with_url(&config.database_url, 25)
        .await
        .map_err(|e| ServerError::InitializeError(e.to_string()))?;
    db.migrate().await.map_err(|e| ServerError::InitializeError(format!("Database migration failed. {e}")))?;
    info!("🗃️ Database ready at {}", db.url());
    let urls = UrlBuilder::new(&config.site_url);
    let reminders = Arc::new(ReminderApi::new(db.clone(), urls).with_delay(config.reminder_delay));
    let handlers = create_reminder_event_handlers(Arc::clone(&reminders));
    let producers = handlers.producers();
    handlers.start_handlers().await;
    let _worker = start_reminder_worker(reminders, config.reminder_poll_interval);
    let srv = create_server_instance(config, db, producers)?;
    srv.await.map_err(|e| ServerError::Unspecified(e.to_string()))
}

pub fn create_server_instance(
    config: ServerConfig,
    db: SqliteDatabase,
    producers: EventProducers,
) -> Result<Server, ServerError> {
    let (host, port) = (config.host.clone(), config.port);
    let srv = HttpServer::new(move || {
        App::new()
            .wrap(Logger::new("%t (%D ms) %s %a %{Host}i %U").log_target("poli::access_log"))
            .configure(configure_services(&config, db.clone(), producers.clone()))
    })
    .keep_alive(KeepAlive::Timeout(Duration::from_secs(600)))
    .bind((host.as_str(), port))?
    .run();
    Ok(srv)
}

/// Registers the APIs and every route of the server. Each worker gets its own API instances over a shared pool.
pub fn configure_services(
    config: &ServerConfig,
    db: SqliteDatabase,
    producers: EventProducers,
) -> impl FnOnce(&mut ServiceConfig) {
    let urls = UrlBuilder::new(&config.site_url);
    let provider = PoliProvider::new(db.clone(), urls).with_api_base_url(config.api_base_url.clone());
    let mut registry = ProviderRegistry::new();
    registry.register(provider.clone());
    let checkout_api = CheckoutApi::new(db.clone(), registry);
    let flow_api = PaymentFlowApi::new(db, provider, producers);
    let options = ServerOptions::from_config(config);
    let host_signature = HostSignature::new(&config.host_api);
    move |cfg| {
        let host_scope = web::scope("/host")
            .wrap(host_signature)
            .service(UpsertEventRoute::<SqliteDatabase>::new())
            .service(PoliSettingsRoute::<SqliteDatabase>::new())
            .service(UpdatePoliSettingsRoute::<SqliteDatabase>::new())
            .service(ProvidersRoute::<SqliteDatabase>::new())
            .service(CheckoutPrepareRoute::<SqliteDatabase>::new())
            .service(OrderPlacedRoute::<SqliteDatabase>::new())
            .service(ExecutePaymentRoute::<SqliteDatabase>::new())
            .service(PreparePaymentRoute::<SqliteDatabase>::new())
            .service(PaymentDetailsRoute::<SqliteDatabase>::new())
            .service(ShredPaymentRoute::<SqliteDatabase>::new())
            .service(MailFilterRoute::<SqliteDatabase>::new());
        cfg.app_data(web::Data::new(checkout_api))
            .app_data(web::Data::new(flow_api))
            .app_data(web::Data::new(options))
            .service(health)
            .service(host_scope)
            .service(PoliReturnRoute::<SqliteDatabase>::new())
            .service(PoliCancelRoute::<SqliteDatabase>::new())
            .service(PoliWebhookRoute::<SqliteDatabase>::new());
    }
}
