//! Request handler definitions
//!
//! Host API routes live here. They are mounted under `/host` and signed with the host HMAC.
//! Handlers that are more than a line or two go into a separate module (see [`crate::poli_routes`]).
//!
//! Every handler is async. Database and POLi API calls must never block a worker thread.
use actix_web::{get, web, HttpResponse, Responder};
use log::*;
use poli_payment_engine::{
    db_types::NewEvent,
    provider::settings::SettingsForm,
    CheckoutApi,
    GatewayBackend,
    PaymentFlowApi,
};

use crate::{
    data_objects::{
        CheckoutPrepareParams,
        CheckoutPrepareResult,
        EventParams,
        MailFilterParams,
        MailFilterResult,
        OrderPlacedNotification,
        ProvidersQuery,
    },
    errors::ServerError,
};

// Web-actix cannot handle generics in handlers, so it's implemented manually using the `route!` macro
#[macro_export]
macro_rules! route {
    ($name:ident => $method:ident $path:literal impl $($bounds:ty),+) => {
        paste::paste! { pub struct [<$name:camel Route>]< $( [< T $bounds:camel> ],)+ >( $( core::marker::PhantomData<fn() -> [< T $bounds:camel> ] >,)+ );}
        paste::paste! { impl< $( [< T $bounds:camel> ],)+ > [<$name:camel Route>]< $( [< T $bounds:camel> ],)+ > {
            #[allow(clippy::new_without_default)]
            pub fn new() -> Self {
                Self($( core::marker::PhantomData::<fn() -> [< T $bounds:camel> ] >,)+)
            }
        }}
        paste::paste! { impl<$( [< T $bounds:camel >] , )+> actix_web::dev::HttpServiceFactory for [<$name:camel Route>]<$([<T $bounds:camel>],)+>
        where
            $([<T $bounds:camel>]: $bounds + 'static,)+
        {
            fn register(self, config: &mut actix_web::dev::AppService) {
                let res = actix_web::Resource::new($path)
                    .name(stringify!($name))
                    .guard(actix_web::guard::$method())
                    .to($name::< $( [< T $bounds:camel >], )+>);
                actix_web::dev::HttpServiceFactory::register(res, config);
            }
        }}
    };
}

// ----------------------------------------------   Health  ----------------------------------------------------
#[get("/health")]
pub async fn health() -> impl Responder {
    trace!("💻️ Received health check request");
    HttpResponse::Ok().body("👍️\n")
}

//----------------------------------------------   Events  ----------------------------------------------------
route!(upsert_event => Put "/events/{organizer}/{event}" impl GatewayBackend);
/// Creates or updates an event. The host calls this whenever an event is created or its currency changes.
pub async fn upsert_event<B: GatewayBackend>(
    path: web::Path<(String, String)>,
    body: web::Json<EventParams>,
    api: web::Data<CheckoutApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let (organizer, slug) = path.into_inner();
    let EventParams { name, currency } = body.into_inner();
    debug!("💻️ PUT event {organizer}/{slug}");
    let event = api.upsert_event(NewEvent { organizer, slug, name, currency: currency.to_uppercase() }).await?;
    Ok(HttpResponse::Ok().json(event))
}

//----------------------------------------------   Settings  ----------------------------------------------------
route!(poli_settings => Get "/events/{organizer}/{event}/settings/poli" impl GatewayBackend);
/// Returns the POLi settings for the event. The authentication code is never returned, only whether it is set.
pub async fn poli_settings<B: GatewayBackend>(
    path: web::Path<(String, String)>,
    api: web::Data<CheckoutApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let (organizer, slug) = path.into_inner();
    debug!("💻️ GET POLi settings for {organizer}/{slug}");
    let event = api.fetch_event(&organizer, &slug).await?;
    let settings = api.poli_settings(&event).await?;
    Ok(HttpResponse::Ok().json(settings))
}

route!(update_poli_settings => Put "/events/{organizer}/{event}/settings/poli" impl GatewayBackend);
/// Validates and saves the POLi settings form. Validation errors are returned per field with a 400 status.
pub async fn update_poli_settings<B: GatewayBackend>(
    path: web::Path<(String, String)>,
    body: web::Json<SettingsForm>,
    api: web::Data<CheckoutApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let (organizer, slug) = path.into_inner();
    debug!("💻️ PUT POLi settings for {organizer}/{slug}");
    let event = api.fetch_event(&organizer, &slug).await?;
    let settings = api.update_poli_settings(&event, body.into_inner()).await?;
    Ok(HttpResponse::Ok().json(settings))
}

//----------------------------------------------   Checkout  ----------------------------------------------------
route!(providers => Get "/events/{organizer}/{event}/providers" impl GatewayBackend);
pub async fn providers<B: GatewayBackend>(
    path: web::Path<(String, String)>,
    query: web::Query<ProvidersQuery>,
    api: web::Data<CheckoutApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let (organizer, slug) = path.into_inner();
    let event = api.fetch_event(&organizer, &slug).await?;
    let providers = api.allowed_providers(&event, query.total).await;
    debug!("💻️ {} payment providers available for {organizer}/{slug}", providers.len());
    Ok(HttpResponse::Ok().json(providers))
}

route!(checkout_prepare => Post "/events/{organizer}/{event}/checkout_prepare" impl GatewayBackend);
pub async fn checkout_prepare<B: GatewayBackend>(
    path: web::Path<(String, String)>,
    body: web::Json<CheckoutPrepareParams>,
    api: web::Data<CheckoutApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let (organizer, slug) = path.into_inner();
    let CheckoutPrepareParams { provider, total } = body.into_inner();
    let event = api.fetch_event(&organizer, &slug).await?;
    let ready = api.checkout_prepare(&event, &provider, total).await?;
    Ok(HttpResponse::Ok().json(CheckoutPrepareResult { provider, ready }))
}

//----------------------------------------------   Orders  ----------------------------------------------------
route!(order_placed => Post "/orders" impl GatewayBackend);
/// The host notifies us of every placed order. The call is idempotent.
pub async fn order_placed<B: GatewayBackend>(
    body: web::Json<OrderPlacedNotification>,
    api: web::Data<PaymentFlowApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let OrderPlacedNotification { organizer, event, order, payments } = body.into_inner();
    debug!("💻️ Order {} placed for {organizer}/{event}", order.code);
    let event = api.fetch_event(&organizer, &event).await?;
    let placed = api.process_new_order(&event, order, payments).await?;
    Ok(HttpResponse::Ok().json(placed))
}

//----------------------------------------------   Payments  ----------------------------------------------------
route!(execute_payment => Post "/payments/{id}/execute" impl GatewayBackend);
/// Starts the remote transaction for a freshly placed order and returns the URL to send the buyer to.
pub async fn execute_payment<B: GatewayBackend>(
    path: web::Path<i64>,
    api: web::Data<CheckoutApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let payment_id = path.into_inner();
    debug!("💻️ Executing payment {payment_id}");
    let redirect = api.start_payment(payment_id, false).await?;
    Ok(HttpResponse::Ok().json(redirect))
}

route!(prepare_payment => Post "/payments/{id}/prepare" impl GatewayBackend);
/// Starts a new remote transaction for an existing order, e.g. when the buyer retries.
pub async fn prepare_payment<B: GatewayBackend>(
    path: web::Path<i64>,
    api: web::Data<CheckoutApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let payment_id = path.into_inner();
    debug!("💻️ Preparing payment {payment_id}");
    let redirect = api.start_payment(payment_id, true).await?;
    Ok(HttpResponse::Ok().json(redirect))
}

route!(payment_details => Get "/payments/{id}" impl GatewayBackend);
pub async fn payment_details<B: GatewayBackend>(
    path: web::Path<i64>,
    api: web::Data<CheckoutApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let details = api.payment_details(path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(details))
}

route!(shred_payment => Post "/payments/{id}/shred" impl GatewayBackend);
pub async fn shred_payment<B: GatewayBackend>(
    path: web::Path<i64>,
    api: web::Data<CheckoutApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let payment_id = path.into_inner();
    info!("💻️ Shredding payment info for payment {payment_id}");
    let details = api.shred_payment(payment_id).await?;
    Ok(HttpResponse::Ok().json(details))
}

//----------------------------------------------   Mail  ----------------------------------------------------
route!(mail_filter => Post "/mail/filter" impl GatewayBackend);
/// Tells the host whether to send an outbound order e-mail now.
pub async fn mail_filter<B: GatewayBackend>(
    body: web::Json<MailFilterParams>,
    api: web::Data<PaymentFlowApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let MailFilterParams { organizer, event, order_code, subject } = body.into_inner();
    let event = api.fetch_event(&organizer, &event).await?;
    let decision = api.filter_mail(&event, &order_code, &subject).await?;
    Ok(HttpResponse::Ok().json(MailFilterResult { decision }))
}
