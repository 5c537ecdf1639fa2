//! Request signing for the `/host` API.
//!
//! The ticketing host signs every call with the shared `POLI_HOST_HMAC_SECRET`. The `X-Host-Hmac-Sha256` header
//! carries the base64-encoded HMAC-SHA256 of
//!
//! ```text
//! {METHOD}\n{path and query}\n{raw body}
//! ```
//!
//! Method and path are part of the signed message, so a signature made for one bodyless `GET` is not valid for any
//! other resource. With checks enabled and no secret configured, every call is refused.

use std::{
    future::{ready, Ready},
    rc::Rc,
};

use actix_http::h1;
use actix_web::{
    dev::{forward_ready, Payload, Service, ServiceRequest, ServiceResponse, Transform},
    web,
    Error,
};
use futures::future::LocalBoxFuture;
use hmac::{Hmac, Mac};
use log::{debug, trace, warn};
use poli_common::Secret;
use sha2::Sha256;
use thiserror::Error;

use super::HOST_HMAC_HEADER;
use crate::{config::HostApiConfig, errors::ServerError, helpers::calculate_hmac};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SignatureError {
    #[error("No host API secret is configured.")]
    Unconfigured,
    #[error("No host signature found.")]
    Missing,
    #[error("The host signature is not valid base64.")]
    Malformed,
    #[error("Invalid host signature.")]
    Mismatch,
}

/// The byte string the host signs for a request.
pub fn signing_message(method: &str, target: &str, body: &[u8]) -> Vec<u8> {
    let mut message = Vec::with_capacity(method.len() + target.len() + body.len() + 2);
    message.extend_from_slice(method.as_bytes());
    message.push(b'\n');
    message.extend_from_slice(target.as_bytes());
    message.push(b'\n');
    message.extend_from_slice(body);
    message
}

/// The header value the host sends for a request. Used by host-side tooling and tests.
pub fn sign_host_request(secret: &str, method: &str, target: &str, body: &[u8]) -> String {
    calculate_hmac(secret, &signing_message(method, target, body))
}

/// Checks `signature` against `message` in constant time.
pub fn verify_signature(secret: &str, message: &[u8], signature: Option<&str>) -> Result<(), SignatureError> {
    if secret.is_empty() {
        return Err(SignatureError::Unconfigured);
    }
    let signature = signature.map(str::trim).filter(|s| !s.is_empty()).ok_or(SignatureError::Missing)?;
    let expected = base64::decode(signature).map_err(|_| SignatureError::Malformed)?;
    let mut mac = Hmac::<Sha256>::new_from_slice(secret.as_bytes()).map_err(|_| SignatureError::Unconfigured)?;
    mac.update(message);
    mac.verify_slice(&expected).map_err(|_| SignatureError::Mismatch)
}

/// Wraps the `/host` scope. See the module docs for the signing scheme.
pub struct HostSignature {
    secret: Secret<String>,
    enabled: bool,
}

impl HostSignature {
    pub fn new(config: &HostApiConfig) -> Self {
        Self { secret: config.hmac_secret.clone(), enabled: config.hmac_checks }
    }
}

impl<S, B> Transform<S, ServiceRequest> for HostSignature
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Error = Error;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;
    type InitError = ();
    type Response = ServiceResponse<B>;
    type Transform = HostSignatureMiddleware<S>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(HostSignatureMiddleware {
            secret: self.secret.clone(),
            enabled: self.enabled,
            service: Rc::new(service),
        }))
    }
}

pub struct HostSignatureMiddleware<S> {
    secret: Secret<String>,
    enabled: bool,
    service: Rc<S>,
}

impl<S, B> Service<ServiceRequest> for HostSignatureMiddleware<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;
    type Response = ServiceResponse<B>;

    forward_ready!(service);

    fn call(&self, mut req: ServiceRequest) -> Self::Future {
        let service = Rc::clone(&self.service);
        let secret = self.secret.clone();
        let enabled = self.enabled;
        Box::pin(async move {
            let method = req.method().to_string();
            let target = req.uri().path_and_query().map(|pq| pq.as_str().to_string()).unwrap_or_default();
            if !enabled {
                trace!("🔐️ Unchecked host API call {method} {target}");
                return service.call(req).await;
            }
            let body = req.extract::<web::Bytes>().await.map_err(|e| {
                warn!("🔐️ Could not read the body of host API call {method} {target}: {e}");
                ServerError::InvalidRequestBody(e.to_string())
            })?;
            let signature = req.headers().get(HOST_HMAC_HEADER).and_then(|v| v.to_str().ok());
            let message = signing_message(&method, &target, &body);
            match verify_signature(secret.reveal(), &message, signature) {
                Ok(()) => {
                    debug!("🔐️ Host API call {method} {target} ✅️");
                    req.set_payload(bytes_to_payload(body));
                    service.call(req).await
                },
                Err(e) => {
                    warn!("🔐️ Host API call {method} {target} refused: {e}");
                    Err(ServerError::Forbidden(e.to_string()).into())
                },
            }
        })
    }
}

fn bytes_to_payload(buf: web::Bytes) -> Payload {
    let (_, mut pl) = h1::Payload::create(true);
    pl.unread_data(buf);
    Payload::from(pl)
}

#[cfg(test)]
mod test {
    use super::*;

    const SECRET: &str = "host-signing-test-secret";

    #[test]
    fn method_and_path_are_signed() {
        let sig = sign_host_request(SECRET, "GET", "/host/payments/1", b"");
        let message = signing_message("GET", "/host/payments/1", b"");
        assert_eq!(verify_signature(SECRET, &message, Some(&sig)), Ok(()));

        let other_path = signing_message("GET", "/host/payments/2", b"");
        assert_eq!(verify_signature(SECRET, &other_path, Some(&sig)), Err(SignatureError::Mismatch));
        let other_method = signing_message("POST", "/host/payments/1", b"");
        assert_eq!(verify_signature(SECRET, &other_method, Some(&sig)), Err(SignatureError::Mismatch));
        let with_body = signing_message("GET", "/host/payments/1", b"{}");
        assert_eq!(verify_signature(SECRET, &with_body, Some(&sig)), Err(SignatureError::Mismatch));
    }

    #[test]
    fn bad_signatures() {
        let message = signing_message("PUT", "/host/events/demo/conf", br#"{"currency":"NZD"}"#);
        assert_eq!(verify_signature(SECRET, &message, None), Err(SignatureError::Missing));
        assert_eq!(verify_signature(SECRET, &message, Some("  ")), Err(SignatureError::Missing));
        assert_eq!(verify_signature(SECRET, &message, Some("not base64!")), Err(SignatureError::Malformed));
        let sig = sign_host_request("another-secret", "PUT", "/host/events/demo/conf", br#"{"currency":"NZD"}"#);
        assert_eq!(verify_signature(SECRET, &message, Some(&sig)), Err(SignatureError::Mismatch));
        let sig = sign_host_request("", "PUT", "/host/events/demo/conf", br#"{"currency":"NZD"}"#);
        assert_eq!(verify_signature("", &message, Some(&sig)), Err(SignatureError::Unconfigured));
    }
}
