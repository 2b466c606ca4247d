use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::{Context, Result, bail};

const PLACEHOLDER_SECRETS: &[&str] = &[
    "change-me-to-a-random-string",
    "dev-secret-change-me",
];

#[derive(Debug, Clone)]
pub struct Config {
    pub db_path: PathBuf,
    pub host: String,
    pub port: u16,
    pub jwt_secret: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup. `from_env` passes the process environment.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let jwt_secret = lookup("PARLEY_JWT_SECRET").unwrap_or_default();
        if jwt_secret.is_empty() || PLACEHOLDER_SECRETS.contains(&jwt_secret.as_str()) {
            bail!(
                "PARLEY_JWT_SECRET is unset or still a placeholder; \
                 it must match the token issuer's secret"
            );
        }

        let db_path = lookup("PARLEY_DB_PATH")
            .unwrap_or_else(|| "parley.db".into())
            .into();
        let host = lookup("PARLEY_HOST").unwrap_or_else(|| "0.0.0.0".into());
        let port = lookup("PARLEY_PORT")
            .unwrap_or_else(|| "3000".into())
            .parse()
            .context("PARLEY_PORT is not a valid port")?;

        Ok(Self {
            db_path,
            host,
            port,
            jwt_secret,
        })
    }

    pub fn addr(&self) -> Result<SocketAddr> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .with_context(|| format!("invalid listen address {}:{}", self.host, self.port))
    }
}
