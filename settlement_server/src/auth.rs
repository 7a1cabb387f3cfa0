//! Identity of the caller on client-facing routes.
//!
//! Authentication happens upstream of this server. The gateway in front of it puts the id of the signed-in user in a
//! request header (`TKT_IDENTITY_HEADER`), and [`TrustedUser`] simply reads it back. Whether the user actually exists
//! is checked by the settlement API.
use std::future::{ready, Ready};

use actix_web::{dev::Payload, web, FromRequest, HttpRequest};
use log::debug;
use settlement_engine::db_types::UserId;

use crate::{
    config::DEFAULT_IDENTITY_HEADER,
    errors::{AuthError, ServerError},
};

/// The name of the header carrying the trusted user id. Register it as app data to override the default.
#[derive(Debug, Clone)]
pub struct IdentityHeader(pub String);

impl Default for IdentityHeader {
    fn default() -> Self {
        Self(DEFAULT_IDENTITY_HEADER.to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrustedUser(pub UserId);

impl TrustedUser {
    pub fn user_id(&self) -> &UserId {
        &self.0
    }
}

impl FromRequest for TrustedUser {
    type Error = ServerError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        let header = req.app_data::<web::Data<IdentityHeader>>().map(|h| h.0.clone()).unwrap_or_default();
        let header = if header.is_empty() { DEFAULT_IDENTITY_HEADER.to_string() } else { header };
        let user = req
            .headers()
            .get(header.as_str())
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(|s| TrustedUser(UserId::from(s)));
        ready(user.ok_or_else(|| {
            debug!("🔐️ Request to {} has no {header} header", req.path());
            ServerError::AuthenticationError(AuthError::MissingIdentity(header))
        }))
    }
}
