use crate::traits::{data_objects::CheckoutDetails, LookupError};

/// Read access to the payment provider.
///
/// Implementations must bound every call with a timeout and report it as [`LookupError::Timeout`] so that the caller
/// can retry the whole settlement later. Records the provider does not know about (or cannot describe) are returned as
/// `Ok(None)`.
#[allow(async_fn_in_trait)]
pub trait CheckoutLookup {
    /// Fetch the email address the provider has on file for `customer_ref`.
    async fn fetch_customer_email(&self, customer_ref: &str) -> Result<Option<String>, LookupError>;

    /// The ids of every provider customer registered under `email`. An empty list if there are none.
    async fn find_customer_refs(&self, email: &str) -> Result<Vec<String>, LookupError>;

    /// Fetch a checkout session by its id.
    async fn fetch_checkout(&self, checkout_id: &str) -> Result<Option<CheckoutDetails>, LookupError>;
}
