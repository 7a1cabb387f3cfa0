use log::*;
use provider_tools::{ProviderApi, ProviderApiError, ProviderCheckout, ProviderCustomer};
use settlement_engine::{traits::CheckoutDetails, CheckoutLookup, LookupError};

/// Exposes the provider REST client to the settlement engine.
///
/// Only transient failures are surfaced. Any other failure (an error status, a response we cannot decode) is logged
/// and treated as "no result" so that the identity resolver can move on to its next strategy.
#[derive(Clone)]
pub struct ProviderLookup {
    api: ProviderApi,
}

impl ProviderLookup {
    pub fn new(api: ProviderApi) -> Self {
        Self { api }
    }
}

fn to_lookup_error(e: ProviderApiError) -> Result<(), LookupError> {
    match e {
        ProviderApiError::Timeout(s) => Err(LookupError::Timeout(s)),
        ProviderApiError::Unavailable(s) => Err(LookupError::Unavailable(s)),
        e => {
            warn!("🛰️ Provider lookup failed and will be treated as not found. {e}");
            Ok(())
        },
    }
}

impl CheckoutLookup for ProviderLookup {
    async fn fetch_customer_email(&self, customer_ref: &str) -> Result<Option<String>, LookupError> {
        match self.api.get_customer(customer_ref).await {
            Ok(customer) => Ok(customer.and_then(|c| c.email).filter(|e| !e.trim().is_empty())),
            Err(e) => to_lookup_error(e).map(|_| None),
        }
    }

    async fn find_customer_refs(&self, email: &str) -> Result<Vec<String>, LookupError> {
        match self.api.search_customers_by_email(email).await {
            Ok(customers) => Ok(customer_refs_for(email, customers)),
            Err(e) => to_lookup_error(e).map(|_| Vec::new()),
        }
    }

    async fn fetch_checkout(&self, checkout_id: &str) -> Result<Option<CheckoutDetails>, LookupError> {
        match self.api.get_checkout(checkout_id).await {
            Ok(checkout) => Ok(checkout.map(checkout_details)),
            Err(e) => to_lookup_error(e).map(|_| None),
        }
    }
}

/// Search results are only trusted for customers whose address matches `email` exactly, ignoring case.
pub fn customer_refs_for(email: &str, customers: Vec<ProviderCustomer>) -> Vec<String> {
    customers
        .into_iter()
        .filter(|c| c.email.as_deref().is_some_and(|e| e.trim().eq_ignore_ascii_case(email.trim())))
        .map(|c| c.id)
        .collect()
}

pub fn checkout_details(checkout: ProviderCheckout) -> CheckoutDetails {
    CheckoutDetails {
        id: checkout.id,
        status: checkout.status,
        payment_status: checkout.payment_status,
        customer_ref: checkout.customer,
        customer_email: checkout.customer_email,
        product_ref: checkout.product,
        payment_reference: checkout.payment_reference,
        metadata: checkout.metadata,
        return_url: checkout.return_url,
    }
}
