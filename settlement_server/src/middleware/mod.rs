mod hmac;
mod whitelist;

pub use hmac::{sign_body, verify_signature, HmacMiddlewareFactory, HmacMiddlewareService, SignatureError};
pub use whitelist::{WhitelistMiddlewareFactory, WhitelistMiddlewareService};
