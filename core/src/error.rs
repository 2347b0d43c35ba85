//! Error types for the jsonstore client.
//!
//! # Design
//! The four status-derived kinds (`NotFound`, `InternalServerError`,
//! `UnexpectedStatus`) and the local kinds (`NoSecret`, `Serialization`,
//! `Decode`, `RandomnessUnavailable`) are distinct variants so callers can
//! match on them. Failures raised by the transport are kept in their own
//! `TransportError` and wrapped transparently: the client cannot tell a
//! refused connection from a DNS failure, so it does not try to.

use thiserror::Error;

use crate::transport::TransportError;

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Errors returned by `Client` operations and construction.
#[derive(Debug, Error)]
pub enum Error {
    /// The client has an empty secret. No request was sent.
    #[error("client has no secret")]
    NoSecret,

    /// The server returned 404.
    #[error("not found")]
    NotFound,

    /// The server returned 500.
    #[error("internal server error")]
    InternalServerError,

    /// The server returned a status outside 200, 201, 404 and 500.
    #[error("unexpected status {0}")]
    UnexpectedStatus(u16),

    /// The outgoing value could not be encoded as JSON. No request was sent.
    #[error("serialization failed: {0}")]
    Serialization(#[source] serde_json::Error),

    /// The response body did not match `{"result": T}`.
    #[error("decoding response failed: {0}")]
    Decode(#[source] serde_json::Error),

    /// The platform's secure random source could not be read.
    #[error("secure randomness unavailable: {0}")]
    RandomnessUnavailable(#[source] getrandom::Error),

    #[error("invalid base URL {url:?}: {reason}")]
    InvalidBaseUrl { url: String, reason: String },

    #[error("invalid configuration value for {key}: {value:?}")]
    InvalidConfig { key: String, value: String },

    #[error(transparent)]
    Transport(#[from] TransportError),
}

impl Error {
    /// Whether the error came from the server's status code rather than
    /// from the client or the transport.
    pub fn is_status(&self) -> bool {
        matches!(
            self,
            Error::NotFound | Error::InternalServerError | Error::UnexpectedStatus(_)
        )
    }
}
