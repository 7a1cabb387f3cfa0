//! Webhook signature middleware for Actix Web.
//!
//! The payment provider signs every webhook body with HMAC-SHA256, keyed with the shared webhook secret
//! (`TKT_WEBHOOK_SECRET`), and sends the base64-encoded digest in the header named by `TKT_WEBHOOK_HMAC_HEADER`.
//! While a signing secret is being rotated the provider sends one signature per active secret, so the header may
//! hold a comma- or space-separated list, with each entry optionally tagged `v1=`. The call is accepted if any entry
//! matches:
//!
//! ```text
//! x-provider-signature: v1=Zm9v...=, v1=YmFy...=
//! ```
//!
//! Wrap the webhook scope with [`HmacMiddlewareFactory`] to reject unsigned or badly signed calls with a 403. The body
//! is buffered to compute the digest and handed back to the inner service untouched.

use std::{
    future::{ready, Ready},
    rc::Rc,
};

use actix_http::h1;
use actix_web::{
    dev::{forward_ready, Payload, Service, ServiceRequest, ServiceResponse, Transform},
    error::{ErrorBadRequest, ErrorForbidden},
    web,
    Error,
};
use futures::future::LocalBoxFuture;
use hmac::{Hmac, Mac};
use log::{error, trace, warn};
use sha2::Sha256;
use thiserror::Error;
use tkt_common::Secret;

type HmacSha256 = Hmac<Sha256>;

const SIGNATURE_TAG: &str = "v1=";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum SignatureError {
    #[error("Webhook signatures cannot be verified.")]
    NoKey,
    #[error("No HMAC signature found.")]
    Missing,
    #[error("Malformed HMAC signature.")]
    Malformed,
    #[error("Invalid HMAC signature.")]
    Mismatch,
}

/// The base64-encoded HMAC-SHA256 of `body` under `key`, as the provider would send it.
pub fn sign_body(key: &Secret<String>, body: &[u8]) -> Result<String, SignatureError> {
    let mut mac = HmacSha256::new_from_slice(key.as_bytes()).map_err(|_| SignatureError::NoKey)?;
    mac.update(body);
    Ok(base64::encode(mac.finalize().into_bytes()))
}

/// Checks the signature header of a webhook call against its raw body.
///
/// Every entry is base64-decoded and compared with [`Mac::verify_slice`], which runs in constant time. Entries that
/// are not valid base64 are skipped. If none of them decode, the header is reported as malformed.
pub fn verify_signature(key: &Secret<String>, body: &[u8], header: &str) -> Result<(), SignatureError> {
    if !key.is_set() {
        return Err(SignatureError::NoKey);
    }
    let mut mac = HmacSha256::new_from_slice(key.as_bytes()).map_err(|_| SignatureError::NoKey)?;
    mac.update(body);
    let mut entries = header
        .split([',', ' '])
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| s.strip_prefix(SIGNATURE_TAG).unwrap_or(s))
        .peekable();
    if entries.peek().is_none() {
        return Err(SignatureError::Missing);
    }
    let mut decoded_any = false;
    for entry in entries {
        let Ok(signature) = base64::decode(entry) else {
            trace!("🔐️ Skipping signature entry that is not base64");
            continue;
        };
        decoded_any = true;
        if mac.clone().verify_slice(&signature).is_ok() {
            return Ok(());
        }
    }
    if decoded_any {
        Err(SignatureError::Mismatch)
    } else {
        Err(SignatureError::Malformed)
    }
}

pub struct HmacMiddlewareFactory {
    hmac_header: String,
    key: Secret<String>,
    // If false, then the middleware will not check the HMAC signature and always allow the call
    enabled: bool,
}

impl HmacMiddlewareFactory {
    pub fn new(hmac_header: &str, key: Secret<String>, enabled: bool) -> Self {
        HmacMiddlewareFactory { hmac_header: hmac_header.into(), key, enabled }
    }
}

impl<S, B> Transform<S, ServiceRequest> for HmacMiddlewareFactory
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Error = Error;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;
    type InitError = ();
    type Response = ServiceResponse<B>;
    type Transform = HmacMiddlewareService<S>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(HmacMiddlewareService {
            hmac_header: self.hmac_header.clone(),
            key: self.key.clone(),
            enabled: self.enabled,
            service: Rc::new(service),
        }))
    }
}

pub struct HmacMiddlewareService<S> {
    hmac_header: String,
    key: Secret<String>,
    enabled: bool,
    service: Rc<S>,
}

impl<S, B> Service<ServiceRequest> for HmacMiddlewareService<S>
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
        let key = self.key.clone();
        let hmac_header = self.hmac_header.clone();
        let enabled = self.enabled;
        Box::pin(async move {
            if !enabled {
                trace!("🔐️ HMAC checks are disabled. Allowing request.");
                return service.call(req).await;
            }
            let header = match req.headers().get(&hmac_header).map(|v| v.to_str()) {
                None => None,
                Some(Ok(value)) => Some(value.to_string()),
                Some(Err(_)) => {
                    warn!("🔐️ The {hmac_header} header is not valid ASCII. Denying access.");
                    return Err(ErrorForbidden(SignatureError::Malformed));
                },
            };
            let header = header.unwrap_or_default();
            let body = req.extract::<web::Bytes>().await.map_err(|e| {
                warn!("🔐️ Failed to extract request data: {e:?}");
                ErrorBadRequest("Failed to extract request data.")
            })?;
            match verify_signature(&key, body.as_ref(), &header) {
                Ok(()) => {
                    trace!("🔐️ HMAC check for request ✅️");
                    req.set_payload(bytes_to_payload(body));
                    service.call(req).await
                },
                Err(SignatureError::NoKey) => {
                    error!("🔐️ HMAC checks are enabled, but no webhook secret is configured. Denying access.");
                    Err(ErrorForbidden(SignatureError::NoKey))
                },
                Err(e) => {
                    warn!("🔐️ Webhook signature rejected ({e}) for a {} byte body. Denying access.", body.len());
                    Err(ErrorForbidden(e))
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
