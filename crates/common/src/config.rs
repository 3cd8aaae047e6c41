use anyhow::Result;
use serde::Deserialize;
use std::str::FromStr;

#[derive(Debug, Deserialize)]
pub struct Config {
    pub general: General,
    pub watchlist: Watchlist,
    pub fetch: Fetch,
    pub pnl: Pnl,
    pub cache: Cache,
    pub apis: Apis,
}

#[derive(Debug, Deserialize)]
pub struct General {
    pub log_level: String,
}

#[derive(Debug, Deserialize)]
pub struct Watchlist {
    pub query_id: u64,
    pub poll_interval_secs: u64,
    pub max_polls: u32,
}

#[derive(Debug, Deserialize)]
pub struct Fetch {
    pub request_timeout_secs: u64,
    pub rate_limit_delay_ms: u64,
    pub transfers_page_size: u32,
    pub dust_threshold_usd: f64,
}

#[derive(Debug, Deserialize)]
pub struct Pnl {
    pub price_lookup_delay_ms: u64,
    pub min_allocation_pct: f64,
}

#[derive(Debug, Deserialize)]
pub struct Cache {
    pub path: String,
    pub daily_price_ttl_secs: i64,
}

#[derive(Debug, Deserialize)]
pub struct Apis {
    pub dune_api_url: String,
    pub covalent_api_url: String,
    pub etherscan_api_url: String,
    pub coingecko_api_url: String,
}

impl Config {
    pub fn load() -> Result<Self> {
        let content = std::fs::read_to_string("config/default.toml")?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(s: &str) -> Result<Self> {
        Ok(toml::from_str(s)?)
    }
}

impl FromStr for Config {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Self::from_toml_str(s)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("missing required environment variable {0} (set it in the environment or .env)")]
    MissingCredential(&'static str),
}

/// API credentials. All three are required; a missing one is a startup
/// failure reported before any network call — there is no degraded mode.
#[derive(Debug, Clone)]
pub struct Credentials {
    pub dune_api_key: String,
    pub covalent_api_key: String,
    pub etherscan_api_key: String,
}

impl Credentials {
    pub fn from_env() -> std::result::Result<Self, ConfigError> {
        Ok(Self {
            dune_api_key: require_env("DUNE_API_KEY")?,
            covalent_api_key: require_env("COVALENT_API_KEY")?,
            etherscan_api_key: require_env("ETHERSCAN_API_KEY")?,
        })
    }
}

fn require_env(name: &'static str) -> std::result::Result<String, ConfigError> {
    match std::env::var(name) {
        Ok(v) if !v.trim().is_empty() => Ok(v),
        _ => Err(ConfigError::MissingCredential(name)),
    }
}
