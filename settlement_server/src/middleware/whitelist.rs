//! IP whitelist middleware.
//!
//! When a whitelist is configured, only requests whose remote address (see [`get_remote_ip`]) is on the list are
//! passed on. Everything else gets a 403. With no whitelist every request is allowed through.

use std::{
    future::{ready, Ready},
    net::IpAddr,
    rc::Rc,
};

use actix_web::{
    dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform},
    Error,
};
use futures::future::LocalBoxFuture;
use log::{debug, warn};

use crate::{
    errors::{AuthError, ServerError},
    helpers::get_remote_ip,
};

#[derive(Clone)]
pub struct WhitelistMiddlewareFactory {
    whitelist: Option<Rc<Vec<IpAddr>>>,
    use_x_forwarded_for: bool,
    use_forwarded: bool,
}

impl WhitelistMiddlewareFactory {
    pub fn new(whitelist: Option<Vec<IpAddr>>, use_x_forwarded_for: bool, use_forwarded: bool) -> Self {
        Self { whitelist: whitelist.map(Rc::new), use_x_forwarded_for, use_forwarded }
    }
}

impl<S, B> Transform<S, ServiceRequest> for WhitelistMiddlewareFactory
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Error = Error;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;
    type InitError = ();
    type Response = ServiceResponse<B>;
    type Transform = WhitelistMiddlewareService<S>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(WhitelistMiddlewareService {
            whitelist: self.whitelist.clone(),
            use_x_forwarded_for: self.use_x_forwarded_for,
            use_forwarded: self.use_forwarded,
            service: Rc::new(service),
        }))
    }
}

pub struct WhitelistMiddlewareService<S> {
    whitelist: Option<Rc<Vec<IpAddr>>>,
    use_x_forwarded_for: bool,
    use_forwarded: bool,
    service: Rc<S>,
}

impl<S, B> Service<ServiceRequest> for WhitelistMiddlewareService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;
    type Response = ServiceResponse<B>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let service = Rc::clone(&self.service);
        let allowed = match &self.whitelist {
            None => true,
            Some(whitelist) => match get_remote_ip(req.request(), self.use_x_forwarded_for, self.use_forwarded) {
                Some(ip) => {
                    debug!("🔐️ Webhook call from {ip}");
                    whitelist.contains(&ip)
                },
                None => {
                    warn!("🔐️ No IP address found for the remote peer. Denying access.");
                    false
                },
            },
        };
        Box::pin(async move {
            if allowed {
                service.call(req).await
            } else {
                warn!("🔐️ Webhook call from a peer that is not on the whitelist. Denying access.");
                Err(ServerError::AuthenticationError(AuthError::ForbiddenPeer).into())
            }
        })
    }
}
