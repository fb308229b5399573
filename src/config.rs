use crate::error::ConfigError;
use std::env;
use std::num::NonZeroUsize;
use std::thread;

pub const DEFAULT_HOST: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 8080;

/// Settings for the HTTP server.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Number of threads handling connections.
    pub workers: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_owned(),
            port: DEFAULT_PORT,
            workers: default_workers(),
        }
    }
}

fn default_workers() -> usize {
    thread::available_parallelism().map(NonZeroUsize::get).unwrap_or(1)
}

impl ServerConfig {
    /// Reads `PORT`, `IDENTICON_HOST` and `IDENTICON_WORKERS` from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds a config from an arbitrary key lookup. Unset or empty keys keep their default.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let mut config = Self::default();

        if let Some(host) = get("IDENTICON_HOST") {
            config.host = host.trim().to_owned();
        }
        if let Some(port) = get("PORT") {
            config.port = parse_port(&port)?;
        }
        if let Some(workers) = get("IDENTICON_WORKERS") {
            config.workers = parse_workers(&workers)?;
        }
        Ok(config)
    }

    /// `host:port` as passed to the listener.
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

pub fn parse_port(value: &str) -> Result<u16, ConfigError> {
    value.trim().parse().map_err(|source| ConfigError::InvalidPort {
        value: value.to_owned(),
        source,
    })
}

pub fn parse_workers(value: &str) -> Result<usize, ConfigError> {
    match value.trim().parse::<usize>() {
        Ok(n) if n > 0 => Ok(n),
        _ => Err(ConfigError::InvalidWorkers {
            value: value.to_owned(),
        }),
    }
}
