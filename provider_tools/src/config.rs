use std::time::Duration;

use log::*;
use tkt_common::{base_url, Secret};

const DEFAULT_PROVIDER_API_URL: &str = "https://api.payments.example.com";
const DEFAULT_PROVIDER_TIMEOUT_MS: u64 = 5_000;

#[derive(Debug, Clone)]
pub struct ProviderConfig {
    /// Base URL of the provider REST API, without a trailing slash. e.g. "https://api.stripe.com"
    pub api_url: String,
    /// Bearer token used to authenticate lookups.
    pub secret_key: Secret<String>,
    /// Upper bound on every request made to the provider.
    pub timeout: Duration,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_PROVIDER_API_URL.to_string(),
            secret_key: Secret::default(),
            timeout: Duration::from_millis(DEFAULT_PROVIDER_TIMEOUT_MS),
        }
    }
}

impl ProviderConfig {
    pub fn new(api_url: &str, secret_key: &str) -> Self {
        Self {
            api_url: base_url(api_url),
            secret_key: Secret::new(secret_key.to_string()),
            ..Default::default()
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn new_from_env_or_default() -> Self {
        let api_url = std::env::var("TKT_PROVIDER_API_URL").unwrap_or_else(|_| {
            warn!("🛰️ TKT_PROVIDER_API_URL not set, using (probably useless) default");
            DEFAULT_PROVIDER_API_URL.to_string()
        });
        let secret_key = Secret::from_env("TKT_PROVIDER_SECRET_KEY").unwrap_or_else(|| {
            warn!("🛰️ TKT_PROVIDER_SECRET_KEY not set. Provider lookups will be rejected upstream.");
            Secret::default()
        });
        if secret_key.is_set() {
            info!("🛰️ Provider lookups authenticate with {}", secret_key.hint());
        }
        let timeout = std::env::var("TKT_PROVIDER_TIMEOUT_MS")
            .map_err(|_| {
                info!("🛰️ TKT_PROVIDER_TIMEOUT_MS is not set. Using the default of {DEFAULT_PROVIDER_TIMEOUT_MS}ms.")
            })
            .and_then(|s| {
                s.parse::<u64>().map_err(|e| warn!("🛰️ Invalid configuration value for TKT_PROVIDER_TIMEOUT_MS. {e}"))
            })
            .map(Duration::from_millis)
            .unwrap_or(Duration::from_millis(DEFAULT_PROVIDER_TIMEOUT_MS));
        Self { api_url: base_url(&api_url), secret_key, timeout }
    }
}
