//! Client secrets.
//!
//! # Design
//! A secret is a capability: whoever knows it can read, overwrite and
//! delete everything stored beneath it. Only entropy matters, so a
//! generated secret is 64 bytes from the OS random source, hashed with
//! SHA-256 to a fixed 64-character lowercase hex string. `Debug` never
//! prints the value.

use std::fmt;

use sha2::{Digest, Sha256};

use crate::error::{Error, Result};

/// Number of random bytes drawn for a generated secret.
pub const RANDOM_BYTES: usize = 64;

/// Length of a generated secret in hex characters.
pub const SECRET_LEN: usize = 64;

#[derive(Clone, PartialEq, Eq)]
pub struct Secret(String);

impl Secret {
    /// Wrap an explicit secret. An empty value is kept as-is; requests made
    /// with it fail with `Error::NoSecret`.
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Generate a fresh secret from the OS random source.
    pub fn generate() -> Result<Self> {
        let mut bytes = [0u8; RANDOM_BYTES];
        getrandom::getrandom(&mut bytes).map_err(Error::RandomnessUnavailable)?;
        Ok(Self(sha256_hex(&bytes)))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            f.write_str("Secret(<empty>)")
        } else {
            f.write_str("Secret(<redacted>)")
        }
    }
}

fn sha256_hex(bytes: &[u8]) -> String {
    hex::encode(Sha256::digest(bytes))
}
