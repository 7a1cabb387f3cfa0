use std::{env, net::IpAddr, str::FromStr, time::Duration};

use log::*;
use provider_tools::ProviderConfig;
use settlement_engine::{
    db_types::InventoryMode,
    settlement_objects::{SettlementOptions, DEFAULT_DUPLICATE_WINDOW_MINUTES, DEFAULT_MAX_QUANTITY},
};
use tkt_common::{lowercase_or, parse_boolean_flag, parse_list, Secret, DEFAULT_CURRENCY_CODE};

const DEFAULT_TKT_HOST: &str = "127.0.0.1";
const DEFAULT_TKT_PORT: u16 = 8460;
const DEFAULT_DATABASE_URL: &str = "sqlite://data/tkt_store.db";
pub const DEFAULT_IDENTITY_HEADER: &str = "x-tkt-user-id";
pub const DEFAULT_HMAC_HEADER: &str = "x-provider-signature";
const DEFAULT_SETTLEMENT_MAX_ATTEMPTS: u32 = 3;
const DEFAULT_SETTLEMENT_RETRY_DELAY_MS: u64 = 2_000;

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub database_url: String,
    /// If true, the X-Forwarded-For header will be used to determine the client's IP address, rather than the
    /// connection's remote address.
    pub use_x_forwarded_for: bool,
    /// If true, the Forwarded header will be used to determine the client's IP address.
    pub use_forwarded: bool,
    /// The request header carrying the id of the user that the upstream gateway has already authenticated.
    pub identity_header: String,
    pub webhook: WebhookConfig,
    pub provider: ProviderConfig,
    pub settlement: SettlementOptions,
    pub retry_policy: RetryPolicy,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_TKT_HOST.to_string(),
            port: DEFAULT_TKT_PORT,
            database_url: DEFAULT_DATABASE_URL.to_string(),
            use_x_forwarded_for: false,
            use_forwarded: false,
            identity_header: DEFAULT_IDENTITY_HEADER.to_string(),
            webhook: WebhookConfig::default(),
            provider: ProviderConfig::default(),
            settlement: SettlementOptions::default(),
            retry_policy: RetryPolicy::default(),
        }
    }
}

impl ServerConfig {
    pub fn new(host: &str, port: u16) -> Self {
        Self { host: host.to_string(), port, ..Default::default() }
    }

    pub fn from_env_or_default() -> Self {
        let host = env::var("TKT_HOST").ok().unwrap_or_else(|| DEFAULT_TKT_HOST.into());
        let port = env::var("TKT_PORT")
            .map(|s| {
                s.parse::<u16>().unwrap_or_else(|e| {
                    error!(
                        "🪛️ {s} is not a valid port for TKT_PORT. {e} Using the default, {DEFAULT_TKT_PORT}, instead."
                    );
                    DEFAULT_TKT_PORT
                })
            })
            .ok()
            .unwrap_or(DEFAULT_TKT_PORT);
        let database_url = env::var("TKT_DATABASE_URL").ok().unwrap_or_else(|| {
            warn!("🪛️ TKT_DATABASE_URL is not set. Using the default, {DEFAULT_DATABASE_URL}.");
            DEFAULT_DATABASE_URL.to_string()
        });
        let use_x_forwarded_for = parse_boolean_flag(env::var("TKT_USE_X_FORWARDED_FOR").ok(), false);
        let use_forwarded = parse_boolean_flag(env::var("TKT_USE_FORWARDED").ok(), false);
        let identity_header = lowercase_or(env::var("TKT_IDENTITY_HEADER").ok(), DEFAULT_IDENTITY_HEADER);
        Self {
            host,
            port,
            database_url,
            use_x_forwarded_for,
            use_forwarded,
            identity_header,
            webhook: WebhookConfig::from_env_or_defaults(),
            provider: ProviderConfig::new_from_env_or_default(),
            settlement: settlement_options_from_env(),
            retry_policy: RetryPolicy::from_env_or_defaults(),
        }
    }
}

//-------------------------------------------------  WebhookConfig  ----------------------------------------------------
#[derive(Clone, Debug)]
pub struct WebhookConfig {
    /// The key the provider signs webhook bodies with.
    pub hmac_secret: Secret<String>,
    pub hmac_header: String,
    pub hmac_checks: bool,
    /// If supplied, webhook calls are only accepted from these addresses.
    /// To explicitly disable the whitelist, set this to "false", "none", or "0".
    pub whitelist: Option<Vec<IpAddr>>,
}

impl Default for WebhookConfig {
    fn default() -> Self {
        Self {
            hmac_secret: Secret::default(),
            hmac_header: DEFAULT_HMAC_HEADER.to_string(),
            hmac_checks: true,
            whitelist: None,
        }
    }
}

impl WebhookConfig {
    pub fn from_env_or_defaults() -> Self {
        let hmac_secret = match Secret::from_env("TKT_WEBHOOK_SECRET") {
            Some(secret) => {
                info!("🪛️ Webhook signatures will be checked against {}", secret.hint());
                secret
            },
            None => {
                error!("🪛️ TKT_WEBHOOK_SECRET is not set. Please set it to the webhook signing secret for your provider.");
                Secret::default()
            },
        };
        let hmac_header = lowercase_or(env::var("TKT_WEBHOOK_HMAC_HEADER").ok(), DEFAULT_HMAC_HEADER);
        let hmac_checks = parse_boolean_flag(env::var("TKT_WEBHOOK_HMAC_CHECKS").ok(), true);
        if !hmac_checks {
            warn!("🚨️ Webhook signature checks are DISABLED. Anyone can post settlement notifications to this server.");
        }
        let whitelist = env::var("TKT_WEBHOOK_IP_WHITELIST").ok().and_then(|s| parse_whitelist(&s));
        match &whitelist {
            Some(whitelist) if whitelist.is_empty() => {
                warn!(
                    "🚨️ The webhook IP whitelist was configured, but is empty. The server will run, but won't accept \
                     any webhook calls."
                );
            },
            None => {
                info!("🪛️ No webhook IP whitelist is set. Only HMAC validation will be used.");
            },
            Some(v) => {
                let addrs = v.iter().map(|a| a.to_string()).collect::<Vec<_>>().join(", ");
                info!("🪛️ Webhook IP whitelist: {addrs}");
            },
        }
        Self { hmac_secret, hmac_header, hmac_checks, whitelist }
    }
}

fn parse_whitelist(s: &str) -> Option<Vec<IpAddr>> {
    if ["none", "false", "0", ""].contains(&s.trim().to_lowercase().as_str()) {
        info!(
            "🪛️ Webhook IP whitelist is disabled. If this is not what you want, set TKT_WEBHOOK_IP_WHITELIST to a \
             comma-separated list of IP addresses to enable it."
        );
        return None;
    }
    let ip_addrs = parse_list(Some(s.to_string()))
        .unwrap_or_default()
        .into_iter()
        .filter_map(|s| {
            IpAddr::from_str(&s)
                .map_err(|e| warn!("🪛️ Ignoring invalid IP address ({s}) in TKT_WEBHOOK_IP_WHITELIST: {e}"))
                .ok()
        })
        .collect::<Vec<IpAddr>>();
    Some(ip_addrs)
}

//-------------------------------------------------  Settlement  -------------------------------------------------------
fn settlement_options_from_env() -> SettlementOptions {
    let defaults = SettlementOptions::default();
    let currency = lowercase_or(env::var("TKT_CURRENCY").ok(), DEFAULT_CURRENCY_CODE);
    let window = env_number::<i64>("TKT_DUPLICATE_WINDOW_MINUTES", DEFAULT_DUPLICATE_WINDOW_MINUTES);
    let inventory_mode = env::var("TKT_INVENTORY_MODE")
        .map_err(|_| info!("🪛️ TKT_INVENTORY_MODE is not set. Using the default, {}.", InventoryMode::default()))
        .and_then(|s| {
            s.parse::<InventoryMode>().map_err(|e| warn!("🪛️ Invalid configuration value for TKT_INVENTORY_MODE. {e}"))
        })
        .unwrap_or_default();
    let success_statuses = parse_list(env::var("TKT_SUCCESS_STATUSES").ok()).unwrap_or(defaults.success_statuses);
    let max_quantity = env_number::<i64>("TKT_MAX_QUANTITY", DEFAULT_MAX_QUANTITY);
    SettlementOptions {
        currency,
        duplicate_window: chrono::Duration::minutes(window),
        inventory_mode,
        success_statuses,
        max_quantity,
    }
}

/// How the background settlement worker retries a notification that failed with a transient error.
#[derive(Clone, Copy, Debug)]
pub struct RetryPolicy {
    /// Total number of attempts, including the first one. Always at least 1.
    pub max_attempts: u32,
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_SETTLEMENT_MAX_ATTEMPTS,
            delay: Duration::from_millis(DEFAULT_SETTLEMENT_RETRY_DELAY_MS),
        }
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, delay: Duration) -> Self {
        Self { max_attempts: max_attempts.max(1), delay }
    }

    pub fn from_env_or_defaults() -> Self {
        let max_attempts = env_number::<u32>("TKT_SETTLEMENT_MAX_ATTEMPTS", DEFAULT_SETTLEMENT_MAX_ATTEMPTS);
        let delay = env_number::<u64>("TKT_SETTLEMENT_RETRY_DELAY_MS", DEFAULT_SETTLEMENT_RETRY_DELAY_MS);
        Self::new(max_attempts, Duration::from_millis(delay))
    }
}

fn env_number<T>(name: &str, default: T) -> T
where
    T: FromStr + PartialOrd + Default + std::fmt::Display + Copy,
    T::Err: std::fmt::Display,
{
    env::var(name)
        .map_err(|_| info!("🪛️ {name} is not set. Using the default value of {default}."))
        .and_then(|s| s.trim().parse::<T>().map_err(|e| warn!("🪛️ Invalid configuration value for {name}. {e}")))
        .and_then(|v| {
            if v > T::default() {
                Ok(v)
            } else {
                warn!("🪛️ {name} must be positive. Using the default value of {default}.");
                Err(())
            }
        })
        .unwrap_or(default)
}
