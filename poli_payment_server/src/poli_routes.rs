//! Routes that POLi, or the buyer's browser coming back from POLi, call.
//!
//! These are public. The return and cancel URLs carry the order secret, and webhook nudges are only acted on after
//! the transaction has been fetched from the POLi API.
use actix_web::{http::header, web, HttpRequest, HttpResponse};
use log::*;
use poli_payment_engine::{
    api_objects::{CallbackResponse, WebhookOutcome},
    db_types::OrderCode,
    CallbackPath,
    GatewayBackend,
    PaymentFlowApi,
};

use crate::{
    config::ServerOptions,
    data_objects::{ReturnQuery, WebhookForm},
    errors::ServerError,
    helpers::{get_remote_ip, is_whitelisted},
    route,
};

route!(poli_return => Get "/{organizer}/{event}/poli/return/{order}/{payment}/{hash}/" impl GatewayBackend);
/// The buyer's browser lands here after the POLi payment pages, whatever the outcome.
pub async fn poli_return<B: GatewayBackend>(
    path: web::Path<(String, String, String, i64, String)>,
    query: web::Query<ReturnQuery>,
    api: web::Data<PaymentFlowApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let (organizer, slug, order, payment_id, hash) = path.into_inner();
    debug!("💻️ POLi return for order {order}, payment {payment_id}");
    let event = api.fetch_event(&organizer, &slug).await?;
    let path = CallbackPath { order_code: OrderCode(order), payment_id, hash };
    let response = api.handle_return(&event, path, query.into_inner().token).await;
    Ok(callback_response(response))
}

route!(poli_cancel => Get "/{organizer}/{event}/poli/cancel/{order}/{payment}/{hash}/" impl GatewayBackend);
/// The buyer abandoned the payment on the POLi pages.
pub async fn poli_cancel<B: GatewayBackend>(
    path: web::Path<(String, String, String, i64, String)>,
    api: web::Data<PaymentFlowApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let (organizer, slug, order, payment_id, hash) = path.into_inner();
    debug!("💻️ POLi cancel for order {order}, payment {payment_id}");
    let event = api.fetch_event(&organizer, &slug).await?;
    let path = CallbackPath { order_code: OrderCode(order), payment_id, hash };
    Ok(callback_response(api.handle_cancel(&event, path).await))
}

route!(poli_webhook => Post "/{organizer}/{event}/poli/webhook" impl GatewayBackend);
/// POLi's server-to-server nudge. The form body carries the transaction token and nothing else we trust.
pub async fn poli_webhook<B: GatewayBackend>(
    req: HttpRequest,
    path: web::Path<(String, String)>,
    form: web::Form<WebhookForm>,
    options: web::Data<ServerOptions>,
    api: web::Data<PaymentFlowApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let remote_ip = get_remote_ip(&req, options.use_x_forwarded_for, options.use_forwarded);
    if !is_whitelisted(remote_ip, options.webhook_whitelist.as_deref()) {
        warn!("💻️ Rejected POLi webhook from {remote_ip:?}. The address is not whitelisted.");
        return Err(ServerError::Forbidden("Webhook caller is not whitelisted".into()));
    }
    let (organizer, slug) = path.into_inner();
    let event = api.fetch_event(&organizer, &slug).await?;
    let outcome = match api.handle_webhook(&event, form.into_inner().token).await {
        Ok(outcome) => outcome,
        Err(e) => {
            return Ok(HttpResponse::BadRequest().content_type("text/plain").body(format!("{e}")));
        },
    };
    trace!("💻️ POLi webhook outcome: {outcome:?}");
    let response = match outcome {
        WebhookOutcome::Error(_) => HttpResponse::Accepted(),
        _ => HttpResponse::Ok(),
    }
    .content_type("text/plain")
    .body("OK");
    Ok(response)
}

fn callback_response(response: CallbackResponse) -> HttpResponse {
    match response {
        CallbackResponse::Redirect(url) => HttpResponse::Found().insert_header((header::LOCATION, url)).finish(),
        CallbackResponse::Forbidden => HttpResponse::Forbidden().content_type("text/plain").body("Forbidden"),
    }
}
