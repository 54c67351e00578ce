use std::{str::FromStr, time::Duration};

use anyhow::Context;

pub const DEFAULT_BIND_ADDRESS: &str = "0.0.0.0:4500";
pub const DEFAULT_OUTBOUND_CAPACITY: usize = 64;
pub const DEFAULT_AUTH_TIMEOUT: Duration = Duration::from_secs(30);

/// Runtime settings, read from the environment (and `.env` when present).
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub bind_address: String,
    /// Frames buffered per connection before forwards start missing.
    pub outbound_capacity: usize,
    /// How long a connection may stay unauthenticated. `None` never reaps.
    pub auth_timeout: Option<Duration>,
    pub gemini_api_key: Option<String>,
    pub log_json: bool,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Config> {
        let database_url = dotenv::var("DATABASE_URL").context("DATABASE_URL is not set")?;
        let bind_address = dotenv::var("BIND_ADDRESS").unwrap_or_else(|_| DEFAULT_BIND_ADDRESS.to_owned());

        let outbound_capacity = parse_var("OUTBOUND_CAPACITY")?.unwrap_or(DEFAULT_OUTBOUND_CAPACITY);
        if outbound_capacity == 0 {
            anyhow::bail!("OUTBOUND_CAPACITY must be at least 1");
        }

        let auth_timeout = match parse_var::<u64>("AUTH_TIMEOUT_SECS")? {
            Some(0) => None,
            Some(secs) => Some(Duration::from_secs(secs)),
            None => Some(DEFAULT_AUTH_TIMEOUT),
        };

        let gemini_api_key = dotenv::var("GEMINI_API_KEY").ok().filter(|key| !key.is_empty());
        let log_json = parse_var("LOG_JSON")?.unwrap_or(false);

        Ok(Config {
            database_url,
            bind_address,
            outbound_capacity,
            auth_timeout,
            gemini_api_key,
            log_json,
        })
    }
}

fn parse_var<T>(key: &str) -> anyhow::Result<Option<T>>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match dotenv::var(key) {
        Ok(raw) => raw.trim().parse().map(Some).with_context(|| format!("invalid {key}: {raw}")),
        Err(_) => Ok(None),
    }
}

pub fn init_tracing(log_json: bool) {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("campusrelay=info,tower_http=info"));
    let registry = tracing_subscriber::registry().with(filter);
    if log_json {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}
