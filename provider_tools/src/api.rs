use std::sync::Arc;

use log::*;
use reqwest::{
    header::{HeaderMap, HeaderValue, AUTHORIZATION},
    Client,
    Url,
};
use serde::de::DeserializeOwned;

use crate::{
    config::ProviderConfig,
    data_objects::{CustomerList, ProviderCheckout, ProviderCustomer},
    ProviderApiError,
};

#[derive(Clone)]
pub struct ProviderApi {
    config: ProviderConfig,
    client: Arc<Client>,
}

impl ProviderApi {
    pub fn new(config: ProviderConfig) -> Result<Self, ProviderApiError> {
        let mut headers = HeaderMap::with_capacity(2);
        let mut auth = HeaderValue::from_str(format!("Bearer {}", config.secret_key.reveal()).as_str())
            .map_err(|e| ProviderApiError::Initialization(e.to_string()))?;
        auth.set_sensitive(true);
        headers.insert(AUTHORIZATION, auth);
        headers.insert("Accept", HeaderValue::from_static("application/json"));
        let client = Client::builder()
            .default_headers(headers)
            .timeout(config.timeout)
            .build()
            .map_err(|e| ProviderApiError::Initialization(e.to_string()))?;
        Ok(Self { config, client: Arc::new(client) })
    }

    pub fn config(&self) -> &ProviderConfig {
        &self.config
    }

    /// Builds the full request URL from the configured base and the given path segments. Segments are percent-encoded,
    /// so ids supplied by the provider cannot alter the request path.
    pub fn url(&self, segments: &[&str]) -> Result<Url, ProviderApiError> {
        let mut url = Url::parse(&self.config.api_url)
            .map_err(|e| ProviderApiError::Initialization(format!("Invalid provider URL. {e}")))?;
        url.path_segments_mut()
            .map_err(|_| ProviderApiError::Initialization("Provider URL cannot be a base".to_string()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    /// Performs a GET request and deserializes the response. Any non-success status is returned as
    /// [`ProviderApiError::QueryError`].
    pub async fn rest_get<T: DeserializeOwned>(
        &self,
        segments: &[&str],
        params: &[(&str, &str)],
    ) -> Result<T, ProviderApiError> {
        let url = self.url(segments)?;
        trace!("🛰️ Sending REST query: {url}");
        let mut req = self.client.get(url);
        if !params.is_empty() {
            req = req.query(params);
        }
        let response = req.send().await?;
        if response.status().is_success() {
            trace!("🛰️ REST query successful. {}", response.status());
            response.json::<T>().await.map_err(|e| ProviderApiError::JsonError(e.to_string()))
        } else {
            let status = response.status().as_u16();
            let message = response.text().await.unwrap_or_default();
            Err(ProviderApiError::QueryError { status, message })
        }
    }

    /// Like [`Self::rest_get`], but maps "the provider answered, just not usefully" (non-success status, unparseable
    /// body) to `Ok(None)`. Only transient failures are returned as errors.
    async fn fetch_optional<T: DeserializeOwned>(
        &self,
        segments: &[&str],
        params: &[(&str, &str)],
    ) -> Result<Option<T>, ProviderApiError> {
        match self.rest_get::<T>(segments, params).await {
            Ok(v) => Ok(Some(v)),
            Err(ProviderApiError::QueryError { status, message }) => {
                warn!("🛰️ Provider lookup for /{} returned {status}. Treating as no result. {message}", segments.join("/"));
                Ok(None)
            },
            Err(ProviderApiError::JsonError(e)) => {
                warn!("🛰️ Provider lookup for /{} returned an unexpected body. Treating as no result. {e}", segments.join("/"));
                Ok(None)
            },
            Err(e) => Err(e),
        }
    }

    pub async fn get_customer(&self, customer_id: &str) -> Result<Option<ProviderCustomer>, ProviderApiError> {
        debug!("🛰️ Fetching customer {customer_id}");
        self.fetch_optional(&["v1", "customers", customer_id], &[]).await
    }

    pub async fn search_customers_by_email(&self, email: &str) -> Result<Vec<ProviderCustomer>, ProviderApiError> {
        debug!("🛰️ Searching for customers with email {email}");
        let list = self.fetch_optional::<CustomerList>(&["v1", "customers", "search"], &[("email", email)]).await?;
        Ok(list.map(|l| l.data).unwrap_or_default())
    }

    pub async fn get_checkout(&self, checkout_id: &str) -> Result<Option<ProviderCheckout>, ProviderApiError> {
        debug!("🛰️ Fetching checkout {checkout_id}");
        self.fetch_optional(&["v1", "checkouts", checkout_id], &[]).await
    }
}
