//! # Server Configuration
//!
//! Settings for `greenfis serve`. Command-line flags win; anything left unset
//! falls back to a `GREENFIS_*` environment variable, then to a default.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::num::NonZeroU32;
use std::path::PathBuf;

/// Default database file name.
pub const DEFAULT_DATABASE: &str = "greenfis.redb";

/// Default listen port.
pub const DEFAULT_PORT: u16 = 8080;

/// Default requests per second across all clients.
pub const DEFAULT_RATE_LIMIT: u32 = 100;

/// Environment variable names.
pub mod env {
    pub const DATABASE: &str = "GREENFIS_DB";
    pub const HOST: &str = "GREENFIS_HOST";
    pub const PORT: &str = "GREENFIS_PORT";
    pub const API_KEY: &str = "GREENFIS_API_KEY";
    pub const RATE_LIMIT: &str = "GREENFIS_RATE_LIMIT";
    pub const CORS_ORIGINS: &str = "GREENFIS_CORS_ORIGINS";
}

/// Fully resolved server settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub host: IpAddr,
    pub port: u16,
    /// `None` disables authentication.
    pub api_key: Option<String>,
    /// `None` disables rate limiting.
    pub rate_limit: Option<NonZeroU32>,
    /// Empty means same-origin only.
    pub cors_origins: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: IpAddr::V4(Ipv4Addr::LOCALHOST),
            port: DEFAULT_PORT,
            api_key: None,
            rate_limit: NonZeroU32::new(DEFAULT_RATE_LIMIT),
            cors_origins: Vec::new(),
        }
    }
}

impl ServerConfig {
    #[must_use]
    pub fn addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}

/// Values given on the command line; `None` means "not given".
#[derive(Debug, Clone, Default)]
pub struct ServeOverrides {
    pub host: Option<IpAddr>,
    pub port: Option<u16>,
    pub api_key: Option<String>,
    /// `Some(0)` disables rate limiting.
    pub rate_limit: Option<u32>,
    pub cors_origins: Vec<String>,
}

/// A configuration value that could not be parsed.
#[derive(Debug, thiserror::Error)]
#[error("invalid value {value:?} for {name}")]
pub struct ConfigError {
    pub name: &'static str,
    pub value: String,
}

/// Resolve against the process environment.
pub fn resolve(overrides: ServeOverrides) -> Result<ServerConfig, ConfigError> {
    resolve_with(overrides, |name| std::env::var(name).ok())
}

/// Resolve with an explicit environment lookup.
pub fn resolve_with(
    overrides: ServeOverrides,
    lookup: impl Fn(&str) -> Option<String>,
) -> Result<ServerConfig, ConfigError> {
    let defaults = ServerConfig::default();
    let lookup = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

    let host = match overrides.host {
        Some(host) => host,
        None => parse_env(&lookup, env::HOST)?.unwrap_or(defaults.host),
    };
    let port = match overrides.port {
        Some(port) => port,
        None => parse_env(&lookup, env::PORT)?.unwrap_or(defaults.port),
    };
    let api_key = overrides.api_key.or_else(|| lookup(env::API_KEY));
    let rate_limit = match overrides.rate_limit {
        Some(n) => NonZeroU32::new(n),
        None => match parse_env::<u32>(&lookup, env::RATE_LIMIT)? {
            Some(n) => NonZeroU32::new(n),
            None => defaults.rate_limit,
        },
    };
    let cors_origins = if overrides.cors_origins.is_empty() {
        lookup(env::CORS_ORIGINS)
            .map(|list| {
                list.split(',')
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(String::from)
                    .collect()
            })
            .unwrap_or_default()
    } else {
        overrides.cors_origins
    };

    Ok(ServerConfig {
        host,
        port,
        api_key,
        rate_limit,
        cors_origins,
    })
}

fn parse_env<T: std::str::FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    name: &'static str,
) -> Result<Option<T>, ConfigError> {
    match lookup(name) {
        None => Ok(None),
        Some(value) => value
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ConfigError { name, value }),
    }
}

/// Database path: flag, then `GREENFIS_DB`, then [`DEFAULT_DATABASE`].
#[must_use]
pub fn database_path(flag: Option<PathBuf>) -> PathBuf {
    flag.or_else(|| std::env::var_os(env::DATABASE).map(PathBuf::from))
        .unwrap_or_else(|| PathBuf::from(DEFAULT_DATABASE))
}
