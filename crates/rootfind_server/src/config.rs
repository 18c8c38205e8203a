use anyhow::{bail, Context, Result};
use rootfind_core::solvers::DEFAULT_MAX_ITERATIONS;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::PathBuf;

pub const DEFAULT_PORT: u16 = 5001;

/// Server settings, read from the environment.
///
/// | variable | default |
/// |---|---|
/// | `ROOTFIND_HOST` | `127.0.0.1` |
/// | `PORT` | `5001` |
/// | `ROOTFIND_STORE` | unset: calculations are kept in memory |
/// | `ROOTFIND_MAX_ITERATIONS` | `100` |
#[derive(Debug, Clone, PartialEq)]
pub struct ServerConfig {
    pub host: IpAddr,
    pub port: u16,
    /// JSON-lines file the calculation log is appended to.
    pub store_path: Option<PathBuf>,
    /// Cap used when a request has no `maxIterations`.
    pub max_iterations: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: IpAddr::V4(Ipv4Addr::LOCALHOST),
            port: DEFAULT_PORT,
            store_path: None,
            max_iterations: DEFAULT_MAX_ITERATIONS,
        }
    }
}

impl ServerConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from any key/value source. Empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let lookup = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());
        let mut config = Self::default();

        if let Some(host) = lookup("ROOTFIND_HOST") {
            config.host = host
                .trim()
                .parse()
                .with_context(|| format!("ROOTFIND_HOST must be an IP address, got \"{host}\""))?;
        }
        if let Some(port) = lookup("PORT") {
            config.port = port
                .trim()
                .parse()
                .with_context(|| format!("PORT must be a port number, got \"{port}\""))?;
        }
        if let Some(path) = lookup("ROOTFIND_STORE") {
            config.store_path = Some(PathBuf::from(path));
        }
        if let Some(cap) = lookup("ROOTFIND_MAX_ITERATIONS") {
            let cap: usize = cap.trim().parse().with_context(|| {
                format!("ROOTFIND_MAX_ITERATIONS must be a whole number, got \"{cap}\"")
            })?;
            if cap == 0 {
                bail!("ROOTFIND_MAX_ITERATIONS must be greater than zero");
            }
            config.max_iterations = cap;
        }
        Ok(config)
    }

    pub fn address(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}
