use std::{env, fmt::Display, str::FromStr, time::Duration};

use anyhow::{anyhow, Context};
use jsonwebtoken::Algorithm;
use tracing::info;

use crate::auth::key_family;

pub struct Config {
    pub port: u16,
    pub db_path: String,
    pub reset_db: bool,
    pub auth_domain: String,
    pub audience: String,
    pub algorithms: Vec<Algorithm>,
    pub jwks_cache_ttl: Duration,
    pub jwks_fetch_timeout: Duration,
    pub jwks_min_refresh: Duration,
}

impl Config {
    /// Reads the process environment. `.env` is loaded by the caller, before
    /// logging is set up, so it can carry `RUST_LOG` too.
    pub fn from_env() -> anyhow::Result<Self> {
        Ok(Self {
            port: try_load("COFFEE_PORT", "5000")?,
            db_path: try_load("COFFEE_DB_PATH", "drinks.db")?,
            reset_db: try_load("COFFEE_RESET_DB", "false")?,
            auth_domain: required("AUTH0_DOMAIN")?,
            audience: required("API_AUDIENCE")?,
            algorithms: parse_algorithms(&try_load::<String>("AUTH0_ALGORITHMS", "RS256")?)?,
            jwks_cache_ttl: Duration::from_secs(try_load("JWKS_CACHE_TTL_SECS", "600")?),
            jwks_fetch_timeout: Duration::from_secs(try_load("JWKS_FETCH_TIMEOUT_SECS", "5")?),
            jwks_min_refresh: Duration::from_secs(try_load("JWKS_MIN_REFRESH_SECS", "30")?),
        })
    }

    /// Tokens must name this issuer exactly, trailing slash included.
    pub fn issuer(&self) -> String {
        format!("https://{}/", self.auth_domain)
    }

    pub fn jwks_url(&self) -> String {
        format!("https://{}/.well-known/jwks.json", self.auth_domain)
    }
}

fn required(key: &str) -> anyhow::Result<String> {
    env::var(key)
        .ok()
        .filter(|v| !v.trim().is_empty())
        .ok_or_else(|| anyhow!("Environment variable {key} must be set"))
}

fn try_load<T: FromStr>(key: &str, default: &str) -> anyhow::Result<T>
where
    T::Err: Display,
{
    let raw = env::var(key).unwrap_or_else(|_| {
        info!("{key} not set, using default: {default}");
        default.to_string()
    });
    raw.parse()
        .map_err(|e| anyhow!("Invalid {key} value {raw:?}: {e}"))
}

fn parse_algorithms(raw: &str) -> anyhow::Result<Vec<Algorithm>> {
    let algorithms = raw
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| Algorithm::from_str(s).with_context(|| format!("Unsupported algorithm {s}")))
        .collect::<anyhow::Result<Vec<_>>>()?;

    let Some(&first) = algorithms.first() else {
        return Err(anyhow!("AUTH0_ALGORITHMS must name at least one algorithm"));
    };
    if let Some(&other) = algorithms
        .iter()
        .find(|a| key_family(**a) != key_family(first))
    {
        return Err(anyhow!(
            "AUTH0_ALGORITHMS mixes key families: {first:?} ({}) and {other:?} ({})",
            key_family(first),
            key_family(other)
        ));
    }
    Ok(algorithms)
}
