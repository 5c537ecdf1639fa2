use std::{env, net::IpAddr, time::Duration as StdDuration};

use chrono::Duration;
use log::*;
use poli_common::{parse_boolean_flag, Secret};
use poli_payment_engine::api::reminder_api::DEFAULT_REMINDER_DELAY_MINUTES;

const DEFAULT_POLI_HOST: &str = "127.0.0.1";
const DEFAULT_POLI_PORT: u16 = 8370;
const DEFAULT_SITE_URL: &str = "http://localhost:8370";
const DEFAULT_REMINDER_POLL_SECONDS: u64 = 60;

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub database_url: String,
    /// The public base URL of the ticket shop. Return, cancel and webhook URLs handed to POLi are built from it.
    pub site_url: String,
    /// If set, all POLi API calls go to this URL instead of the endpoint configured per event.
    pub api_base_url: Option<String>,
    pub host_api: HostApiConfig,
    /// If true, the X-Forwarded-For header will be used to determine the client's IP address, rather than the
    /// connection's remote address.
    pub use_x_forwarded_for: bool,
    /// If true, the Forwarded header will be used to determine the client's IP address, rather than the
    /// connection's remote address.
    pub use_forwarded: bool,
    /// If supplied, POLi webhook requests are only accepted from these addresses.
    pub webhook_whitelist: Option<Vec<IpAddr>>,
    /// How long after an order is placed the payment reminder is sent.
    pub reminder_delay: Duration,
    /// How often the reminder worker checks for due reminders.
    pub reminder_poll_interval: StdDuration,
}

#[derive(Clone, Debug, Default)]
pub struct HostApiConfig {
    /// Shared secret for the `X-Host-Hmac-Sha256` signature on host API requests.
    pub hmac_secret: Secret<String>,
    pub hmac_checks: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_POLI_HOST.to_string(),
            port: DEFAULT_POLI_PORT,
            database_url: String::default(),
            site_url: DEFAULT_SITE_URL.to_string(),
            api_base_url: None,
            host_api: HostApiConfig { hmac_secret: Secret::default(), hmac_checks: true },
            use_x_forwarded_for: false,
            use_forwarded: false,
            webhook_whitelist: None,
            reminder_delay: Duration::minutes(DEFAULT_REMINDER_DELAY_MINUTES),
            reminder_poll_interval: StdDuration::from_secs(DEFAULT_REMINDER_POLL_SECONDS),
        }
    }
}

impl ServerConfig {
    pub fn new(host: &str, port: u16) -> Self {
        Self { host: host.to_string(), port, ..Default::default() }
    }

    pub fn from_env_or_default() -> Self {
        let host = env::var("POLI_HOST").ok().unwrap_or_else(|| DEFAULT_POLI_HOST.into());
        let port = env::var("POLI_PORT")
            .map(|s| {
                s.parse::<u16>().unwrap_or_else(|e| {
                    error!(
                        "🪛️ {s} is not a valid port for POLI_PORT. {e} Using the default, {DEFAULT_POLI_PORT}, instead."
                    );
                    DEFAULT_POLI_PORT
                })
            })
            .ok()
            .unwrap_or(DEFAULT_POLI_PORT);
        let database_url = env::var("POLI_DATABASE_URL").ok().unwrap_or_else(|| {
            error!("🪛️ POLI_DATABASE_URL is not set. Please set it to the URL for the POLi gateway database.");
            String::default()
        });
        let site_url = env::var("POLI_SITE_URL").ok().unwrap_or_else(|| {
            warn!(
                "🪛️ POLI_SITE_URL is not set. Using {DEFAULT_SITE_URL}. POLi will not be able to send buyers back to \
                 the shop unless this is the public URL of the shop."
            );
            DEFAULT_SITE_URL.to_string()
        });
        let api_base_url = env::var("POLI_API_BASE_URL").ok().filter(|s| !s.trim().is_empty());
        if let Some(url) = &api_base_url {
            warn!("🚨️ All POLi API calls will be sent to {url}, regardless of the event settings.");
        }
        let host_api = HostApiConfig::from_env_or_defaults();
        let use_x_forwarded_for = parse_boolean_flag(env::var("POLI_USE_X_FORWARDED_FOR").ok(), false);
        let use_forwarded = parse_boolean_flag(env::var("POLI_USE_FORWARDED").ok(), false);
        let webhook_whitelist = configure_whitelist();
        let reminder_delay = env::var("POLI_REMINDER_DELAY_MINUTES")
            .map_err(|_| {
                info!(
                    "🪛️ POLI_REMINDER_DELAY_MINUTES is not set. Using the default value of \
                     {DEFAULT_REMINDER_DELAY_MINUTES} minutes."
                )
            })
            .and_then(|s| {
                s.parse::<i64>()
                    .map(Duration::minutes)
                    .map_err(|e| warn!("🪛️ Invalid configuration value for POLI_REMINDER_DELAY_MINUTES. {e}"))
            })
            .ok()
            .unwrap_or_else(|| Duration::minutes(DEFAULT_REMINDER_DELAY_MINUTES));
        let reminder_poll_interval = env::var("POLI_REMINDER_POLL_SECONDS")
            .ok()
            .and_then(|s| {
                s.parse::<u64>()
                    .map_err(|e| warn!("🪛️ Invalid configuration value for POLI_REMINDER_POLL_SECONDS. {e}"))
                    .ok()
            })
            .filter(|s| *s > 0)
            .map(StdDuration::from_secs)
            .unwrap_or(StdDuration::from_secs(DEFAULT_REMINDER_POLL_SECONDS));
        Self {
            host,
            port,
            database_url,
            site_url,
            api_base_url,
            host_api,
            use_x_forwarded_for,
            use_forwarded,
            webhook_whitelist,
            reminder_delay,
            reminder_poll_interval,
        }
    }
}

impl HostApiConfig {
    pub fn from_env_or_defaults() -> Self {
        let hmac_secret = env::var("POLI_HOST_HMAC_SECRET").ok().unwrap_or_else(|| {
            error!("🪛️ POLI_HOST_HMAC_SECRET is not set. Please set it to the secret shared with the ticketing host.");
            String::default()
        });
        let hmac_checks = parse_boolean_flag(env::var("POLI_HOST_HMAC_CHECKS").ok(), true);
        if !hmac_checks {
            warn!("🚨️ HMAC checks on the host API are disabled. Anyone can call the /host endpoints. 🚨️");
        }
        Self { hmac_secret: Secret::new(hmac_secret), hmac_checks }
    }
}

fn configure_whitelist() -> Option<Vec<IpAddr>> {
    let whitelist = env::var("POLI_WEBHOOK_IP_WHITELIST").ok().and_then(|s| parse_whitelist(&s));
    match &whitelist {
        Some(whitelist) if whitelist.is_empty() => {
            warn!(
                "🚨️ The POLi webhook IP whitelist was configured, but is empty. The server will run, but won't \
                 accept any POLi nudges."
            );
        },
        None => {
            info!("🪛️ No POLi webhook IP whitelist is set. Nudges are verified against the POLi API only.");
        },
        Some(v) => {
            let addrs = v.iter().map(|a| a.to_string()).collect::<Vec<_>>().join(", ");
            info!("🪛️ POLi webhook IP whitelist: {addrs}");
        },
    }
    whitelist
}

/// Parses a comma-separated list of IP addresses. "none", "false" and "0" disable the whitelist.
pub fn parse_whitelist(s: &str) -> Option<Vec<IpAddr>> {
    if ["none", "false", "0", ""].contains(&s.trim().to_lowercase().as_str()) {
        return None;
    }
    let ip_addrs = s
        .split(',')
        .filter_map(|s| {
            s.trim()
                .parse()
                .map_err(|e| {
                    warn!("🪛️ Ignoring invalid IP address ({s}) in POLI_WEBHOOK_IP_WHITELIST: {e}");
                })
                .ok()
        })
        .collect::<Vec<IpAddr>>();
    Some(ip_addrs)
}

//-------------------------------------------------  ServerOptions  ----------------------------------------------------
/// A subset of the server configuration that is used to configure the server's behaviour. Generally we try to keep this
/// as small as possible, and exclude secrets to avoid passing sensitive information around the system.
#[derive(Clone, Debug, Default)]
pub struct ServerOptions {
    pub use_x_forwarded_for: bool,
    pub use_forwarded: bool,
    pub webhook_whitelist: Option<Vec<IpAddr>>,
}

impl ServerOptions {
    pub fn from_config(config: &ServerConfig) -> Self {
        Self {
            use_x_forwarded_for: config.use_x_forwarded_for,
            use_forwarded: config.use_forwarded,
            webhook_whitelist: config.webhook_whitelist.clone(),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn whitelist_parsing() {
        assert_eq!(parse_whitelist("none"), None);
        assert_eq!(parse_whitelist("FALSE"), None);
        let list = parse_whitelist("203.0.113.7, not-an-ip,::1").unwrap();
        assert_eq!(list, vec!["203.0.113.7".parse::<IpAddr>().unwrap(), "::1".parse::<IpAddr>().unwrap()]);
    }
}
