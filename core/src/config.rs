//! Construction-time client configuration.
//!
//! # Design
//! `ClientConfig` is plain data with serde support so an embedding
//! application can load it from its own config file, or from the
//! environment via `from_env`. Validation (parsing the base URL, generating
//! a secret) happens once, in `ClientBuilder::build`.

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::transport::DEFAULT_TIMEOUT;

pub const DEFAULT_BASE_URL: &str = "https://www.jsonstore.io";

pub const DEFAULT_USER_AGENT: &str = concat!("jsonstore-rs/", env!("CARGO_PKG_VERSION"));

pub const ENV_BASE_URL: &str = "JSONSTORE_BASE_URL";
pub const ENV_SECRET: &str = "JSONSTORE_SECRET";
pub const ENV_TIMEOUT_MS: &str = "JSONSTORE_TIMEOUT_MS";

#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    pub base_url: String,
    /// Explicit secret. `None` generates one at build time.
    pub secret: Option<String>,
    /// Timeout for the default transport, in milliseconds. Must be non-zero.
    pub timeout_ms: u64,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            secret: None,
            timeout_ms: DEFAULT_TIMEOUT.as_millis() as u64,
        }
    }
}

impl ClientConfig {
    /// Defaults overridden by `JSONSTORE_*` environment variables.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Defaults overridden by whatever `lookup` returns for the
    /// `JSONSTORE_*` keys.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();
        if let Some(base_url) = lookup(ENV_BASE_URL) {
            config.base_url = base_url;
        }
        if let Some(secret) = lookup(ENV_SECRET) {
            config.secret = Some(secret);
        }
        if let Some(raw) = lookup(ENV_TIMEOUT_MS) {
            config.timeout_ms = raw.trim().parse().map_err(|_| Error::InvalidConfig {
                key: ENV_TIMEOUT_MS.to_string(),
                value: raw.clone(),
            })?;
        }
        Ok(config)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

impl fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientConfig")
            .field("base_url", &self.base_url)
            .field("secret", &self.secret.as_ref().map(|_| "<redacted>"))
            .field("timeout_ms", &self.timeout_ms)
            .finish()
    }
}
