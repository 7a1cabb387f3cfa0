use std::collections::HashMap;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ProviderCustomer {
    pub id: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct CustomerList {
    #[serde(default)]
    pub data: Vec<ProviderCustomer>,
}

/// A checkout session as recorded by the provider.
///
/// Only the fields the settlement engine needs are modelled; everything else in the provider response is ignored.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ProviderCheckout {
    pub id: String,
    /// Provider status string, e.g. "complete", "open", "expired".
    #[serde(default)]
    pub status: Option<String>,
    /// Payment status string, e.g. "paid", "unpaid".
    #[serde(default)]
    pub payment_status: Option<String>,
    #[serde(default)]
    pub customer: Option<String>,
    #[serde(default)]
    pub customer_email: Option<String>,
    #[serde(default)]
    pub product: Option<String>,
    /// The id of the payment that settled this checkout, when the provider has linked one.
    #[serde(default)]
    pub payment_reference: Option<String>,
    #[serde(default)]
    pub metadata: HashMap<String, String>,
    /// The success URL the marketplace supplied when it created this checkout.
    #[serde(default)]
    pub return_url: Option<String>,
}
