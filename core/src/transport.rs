//! Pluggable HTTP execution.
//!
//! # Design
//! `Transport` is the seam between request building and the network. The
//! default `UreqTransport` runs requests on a blocking `ureq::Agent` whose
//! global timeout bounds calls that carry no deadline. A context deadline is
//! mapped onto the per-request timeout.
//!
//! The blocking call runs on a worker thread while the caller polls the
//! context, so cancellation or deadline expiry returns promptly. An abandoned
//! worker is left to finish against the agent timeout and its response is
//! dropped. Once the head has arrived, body reads go through a reader that
//! reports a finished context the same way, so a deadline hit while decoding
//! is `DeadlineExceeded` too.
//!
//! Failures are returned as `TransportError` and never reclassified into
//! status errors. Status codes are not interpreted here at all.

use std::fmt;
use std::io::{self, Read};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::thread;
use std::time::Duration;

use thiserror::Error;
use tracing::trace;

use crate::context::Context;
use crate::http::{HttpMethod, HttpRequest, HttpResponse, ResponseBody};

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// How often a waiting caller re-checks its context.
const POLL_INTERVAL: Duration = Duration::from_millis(10);

type UreqResult = Result<ureq::http::Response<ureq::Body>, ureq::Error>;

/// Errors raised while executing a request, passed through to the caller
/// unchanged.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("request cancelled")]
    Cancelled,

    #[error("request deadline exceeded")]
    DeadlineExceeded,

    #[error(transparent)]
    Http(#[from] ureq::Error),

    #[error(transparent)]
    Io(#[from] io::Error),

    #[error(transparent)]
    Other(Box<dyn std::error::Error + Send + Sync>),
}

impl TransportError {
    /// Recover a `TransportError` that was carried through an `io::Error`
    /// by a body reader, or wrap the I/O error as-is.
    pub fn from_io(err: io::Error) -> Self {
        if !err
            .get_ref()
            .is_some_and(|inner| inner.is::<TransportError>())
        {
            return TransportError::Io(err);
        }
        let kind = err.kind();
        match err.into_inner().map(|inner| inner.downcast::<TransportError>()) {
            Some(Ok(inner)) => *inner,
            Some(Err(other)) => TransportError::Io(io::Error::new(kind, other)),
            None => TransportError::Io(kind.into()),
        }
    }

    fn into_io(self) -> io::Error {
        io::Error::new(io::ErrorKind::Other, self)
    }
}

/// Executes a built request and returns the response with its body unread.
///
/// Implementations must be safe to share between threads: a single client
/// issues concurrent requests through one transport.
pub trait Transport: Send + Sync {
    fn execute(&self, ctx: &Context, request: HttpRequest) -> Result<HttpResponse, TransportError>;
}

/// Blocking transport backed by `ureq`.
#[derive(Clone)]
pub struct UreqTransport {
    agent: ureq::Agent,
}

impl UreqTransport {
    /// Agent with `timeout` as its global request timeout.
    pub fn new(timeout: Duration) -> Self {
        let agent = ureq::Agent::config_builder()
            .timeout_global(Some(timeout))
            .http_status_as_error(false)
            .build()
            .new_agent();
        Self { agent }
    }

    /// Use a caller-configured agent.
    pub fn from_agent(agent: ureq::Agent) -> Self {
        Self { agent }
    }
}

impl Default for UreqTransport {
    fn default() -> Self {
        Self::new(DEFAULT_TIMEOUT)
    }
}

impl fmt::Debug for UreqTransport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UreqTransport").finish_non_exhaustive()
    }
}

impl Transport for UreqTransport {
    fn execute(&self, ctx: &Context, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        ctx.check()?;
        let timeout = ctx.remaining();

        let HttpRequest {
            method,
            url,
            headers,
            body,
        } = request;

        let (tx, rx) = mpsc::channel();
        let agent = self.agent.clone();
        thread::Builder::new()
            .name("jsonstore-request".to_string())
            .spawn(move || {
                // The receiver is gone if the caller gave up; the response is
                // dropped here, releasing the connection.
                let _ = tx.send(dispatch(&agent, method, &url, &headers, body, timeout));
            })?;

        let result = loop {
            match rx.recv_timeout(POLL_INTERVAL) {
                Ok(result) => break result,
                Err(RecvTimeoutError::Timeout) => ctx.check()?,
                Err(RecvTimeoutError::Disconnected) => {
                    return Err(TransportError::Other(
                        "request worker exited without a response".into(),
                    ));
                }
            }
        };

        let response = match result {
            Ok(response) => response,
            // Agents built with status-as-error enabled still get their
            // status mapped by the client.
            Err(ureq::Error::StatusCode(status)) => {
                trace!(status, "response head received without body");
                return Ok(HttpResponse::new(status, ResponseBody::empty()));
            }
            // With a deadline set, the per-request timeout is the deadline.
            Err(ureq::Error::Timeout(_)) if timeout.is_some() => {
                return Err(TransportError::DeadlineExceeded);
            }
            Err(e) => {
                ctx.check()?;
                return Err(TransportError::Http(e));
            }
        };

        let status = response.status().as_u16();
        trace!(status, "response head received");
        ctx.check()?;

        let headers = response
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|value| (name.as_str().to_string(), value.to_string()))
            })
            .collect();

        Ok(HttpResponse {
            status,
            headers,
            body: ResponseBody::new(ContextReader {
                inner: response.into_body().into_reader(),
                ctx: ctx.clone(),
            }),
        })
    }
}

fn dispatch(
    agent: &ureq::Agent,
    method: HttpMethod,
    url: &str,
    headers: &[(String, String)],
    body: Option<String>,
    timeout: Option<Duration>,
) -> UreqResult {
    match method {
        HttpMethod::Get => configure(agent.get(url), headers, timeout).call(),
        HttpMethod::Delete => configure(agent.delete(url), headers, timeout).call(),
        HttpMethod::Post => {
            let builder = configure(agent.post(url), headers, timeout);
            match &body {
                Some(body) => builder.send(body.as_bytes()),
                None => builder.send_empty(),
            }
        }
        HttpMethod::Put => {
            let builder = configure(agent.put(url), headers, timeout);
            match &body {
                Some(body) => builder.send(body.as_bytes()),
                None => builder.send_empty(),
            }
        }
    }
}

/// Body reader that fails with the context's reason once it is done, and
/// attributes read errors to the context when it has finished.
struct ContextReader<R> {
    inner: R,
    ctx: Context,
}

impl<R: Read> Read for ContextReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.ctx.check().map_err(TransportError::into_io)?;
        self.inner.read(buf).map_err(|e| match self.ctx.check() {
            Err(done) => done.into_io(),
            Ok(()) => e,
        })
    }
}

fn configure<B>(
    mut builder: ureq::RequestBuilder<B>,
    headers: &[(String, String)],
    timeout: Option<Duration>,
) -> ureq::RequestBuilder<B> {
    for (name, value) in headers {
        builder = builder.header(name.as_str(), value.as_str());
    }
    if let Some(timeout) = timeout {
        builder = builder.config().timeout_global(Some(timeout)).build();
    }
    builder
}
