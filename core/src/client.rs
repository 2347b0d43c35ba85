//! The jsonstore client.
//!
//! # Design
//! `Client` holds only construction-time state: transport, base URL,
//! secret and user agent. Nothing is mutated after `build` returns, so a
//! client (or a clone of it, which shares the transport) can be used from
//! any number of threads without locking.
//!
//! Each verb follows the same pipeline: reject an empty secret, resolve the
//! path, build the request, execute it through the transport with the
//! caller's context, then interpret the response. `get` decodes the
//! envelope; the write verbs discard whatever the server sends back.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::debug;
use url::Url;

use crate::config::{ClientConfig, DEFAULT_USER_AGENT};
use crate::context::Context;
use crate::error::{Error, Result};
use crate::http::{build_request, HttpMethod, HttpRequest, HttpResponse};
use crate::path;
use crate::response;
use crate::secret::Secret;
use crate::transport::{Transport, UreqTransport};

#[derive(Clone)]
pub struct Client {
    transport: Arc<dyn Transport>,
    base_url: Url,
    secret: Secret,
    user_agent: String,
}

impl Client {
    /// Client against the default service with a freshly generated secret.
    pub fn new() -> Result<Self> {
        Self::builder().build()
    }

    pub fn builder() -> ClientBuilder {
        ClientBuilder::default()
    }

    pub fn secret(&self) -> &str {
        self.secret.as_str()
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub fn user_agent(&self) -> &str {
        &self.user_agent
    }

    /// The URL the verbs target for `segments`, without sending anything.
    pub fn url<S: AsRef<str>>(&self, segments: &[S]) -> Url {
        path::resolve(&self.base_url, self.secret.as_str(), segments)
    }

    /// Fetch the value stored at `path`.
    pub fn get<T: DeserializeOwned>(&self, ctx: &Context, path: &str) -> Result<T> {
        let request = self.request::<()>(HttpMethod::Get, path, None)?;
        response::read_result(self.send(ctx, path, request)?)
    }

    /// Store `value` at `path`.
    pub fn post<T: Serialize + ?Sized>(&self, ctx: &Context, path: &str, value: &T) -> Result<()> {
        let request = self.request(HttpMethod::Post, path, Some(value))?;
        response::discard(self.send(ctx, path, request)?)
    }

    /// Update the value at `path`.
    pub fn put<T: Serialize + ?Sized>(&self, ctx: &Context, path: &str, value: &T) -> Result<()> {
        let request = self.request(HttpMethod::Put, path, Some(value))?;
        response::discard(self.send(ctx, path, request)?)
    }

    /// Remove the value at `path`.
    pub fn delete(&self, ctx: &Context, path: &str) -> Result<()> {
        let request = self.request::<()>(HttpMethod::Delete, path, None)?;
        response::discard(self.send(ctx, path, request)?)
    }

    fn request<T: Serialize + ?Sized>(
        &self,
        method: HttpMethod,
        path: &str,
        payload: Option<&T>,
    ) -> Result<HttpRequest> {
        if self.secret.is_empty() {
            return Err(Error::NoSecret);
        }
        let url = self.url(&[path]);
        build_request(method, url.into(), payload, &self.user_agent)
    }

    fn send(&self, ctx: &Context, path: &str, request: HttpRequest) -> Result<HttpResponse> {
        debug!(method = %request.method, path, "sending request");
        let response = self.transport.execute(ctx, request)?;
        debug!(status = response.status, path, "received response");
        Ok(response)
    }
}

impl fmt::Debug for Client {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Client")
            .field("base_url", &self.base_url.as_str())
            .field("secret", &self.secret)
            .field("user_agent", &self.user_agent)
            .finish_non_exhaustive()
    }
}

/// Builder for `Client`. Later calls override earlier ones.
#[derive(Default)]
pub struct ClientBuilder {
    config: ClientConfig,
    transport: Option<Arc<dyn Transport>>,
}

impl ClientBuilder {
    /// Replace base URL, secret and timeout with those from `config`.
    pub fn config(mut self, config: ClientConfig) -> Self {
        self.config = config;
        self
    }

    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.config.base_url = base_url.into();
        self
    }

    /// Use `secret` instead of generating one. An empty secret is kept, and
    /// every request made with it fails with `Error::NoSecret`.
    pub fn secret(mut self, secret: impl Into<String>) -> Self {
        self.config.secret = Some(secret.into());
        self
    }

    /// Timeout of the default transport, rounded up to whole milliseconds.
    /// Ignored when a transport is given.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        let millis = timeout.as_nanos().div_ceil(1_000_000);
        self.config.timeout_ms = u64::try_from(millis).unwrap_or(u64::MAX);
        self
    }

    pub fn transport(mut self, transport: impl Transport + 'static) -> Self {
        self.transport = Some(Arc::new(transport));
        self
    }

    pub fn build(self) -> Result<Client> {
        let base_url = parse_base_url(&self.config.base_url)?;
        if self.config.timeout_ms == 0 {
            return Err(Error::InvalidConfig {
                key: "timeout".to_string(),
                value: "0ms".to_string(),
            });
        }
        let timeout = self.config.timeout();
        let secret = match self.config.secret {
            Some(secret) => Secret::new(secret),
            None => Secret::generate()?,
        };
        let transport = self
            .transport
            .unwrap_or_else(|| Arc::new(UreqTransport::new(timeout)));

        Ok(Client {
            transport,
            base_url,
            secret,
            user_agent: DEFAULT_USER_AGENT.to_string(),
        })
    }
}

fn parse_base_url(raw: &str) -> Result<Url> {
    let invalid = |reason: String| Error::InvalidBaseUrl {
        url: raw.to_string(),
        reason,
    };
    let url = Url::parse(raw).map_err(|e| invalid(e.to_string()))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(invalid(format!("unsupported scheme {:?}", url.scheme())));
    }
    Ok(url)
}
