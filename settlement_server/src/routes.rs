//! Request handler definitions
//!
//! Define each route and it handler here.
//! Handlers that are more than a line or two MUST go into a separate module. Keep this module neat and tidy 🙏
//!
//! Since each worker thread processes its requests sequentially, handlers which block the current thread will cause the
//! current worker to stop processing new requests. Any I/O (database calls, provider lookups) must be awaited, never
//! blocked on.
use actix_web::{get, web, HttpResponse, Responder};
use log::*;
use settlement_engine::{CheckoutLookup, SettlementApi, SettlementBackend};

use crate::{
    auth::TrustedUser,
    data_objects::{ConfirmPurchaseRequest, ConfirmPurchaseResponse},
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

// ----------------------------------------------   Checkout  ----------------------------------------------------
route!(confirm_checkout => Post "/checkout/confirm" impl SettlementBackend, CheckoutLookup);
/// The client confirms a checkout after the provider redirects the purchaser back to the marketplace.
///
/// Settles the purchase if no provider notification has done so yet, and returns the order either way.
pub async fn confirm_checkout<B, L>(
    user: TrustedUser,
    body: web::Json<ConfirmPurchaseRequest>,
    api: web::Data<SettlementApi<B, L>>,
) -> Result<HttpResponse, ServerError>
where
    B: SettlementBackend,
    L: CheckoutLookup,
{
    let request = body.into_inner();
    debug!(
        "🎟️ User {} is confirming checkout {} for {} x {}",
        user.user_id(),
        request.session_token,
        request.quantity,
        request.ticket_type_id
    );
    let result = api.confirm_purchase(user.user_id(), request.into()).await.map_err(|e| {
        info!("🎟️ Checkout confirmation for user {} failed. {e}", user.user_id());
        ServerError::from(e)
    })?;
    Ok(HttpResponse::Ok().json(ConfirmPurchaseResponse::from(result)))
}
