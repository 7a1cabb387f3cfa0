mod cents;
mod helpers;

pub mod op;
mod secret;

pub use cents::{Cents, CentsConversionError, DEFAULT_CURRENCY_CODE};
pub use helpers::{base_url, lowercase_or, parse_boolean_flag, parse_list};
pub use secret::Secret;
