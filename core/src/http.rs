//! HTTP requests and responses as plain data.
//!
//! # Design
//! The client builds `HttpRequest` values without touching the network and
//! hands them to a `Transport`. Responses come back as `HttpResponse` with a
//! streaming `ResponseBody`, so decoding reads straight from the wire.
//!
//! `ResponseBody` owns the underlying reader. Dropping it drains at most
//! `DRAIN_LIMIT` bytes and then releases the reader, which is what returns
//! (or closes) the connection. Every exit path out of response handling goes
//! through that `Drop`, whether the status was mapped to an error, decoding
//! failed, or the body was ignored.

use std::fmt;
use std::io::{self, Cursor, Read};

use serde::Serialize;

use crate::error::{Error, Result};

/// Upper bound on bytes read from a body that is being discarded.
pub const DRAIN_LIMIT: u64 = 1024;

pub const CONTENT_TYPE_JSON: &str = "application/json";

/// HTTP method for a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Delete,
}

impl HttpMethod {
    pub fn as_str(self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Delete => "DELETE",
        }
    }

    /// Whether requests with this method carry a JSON payload.
    pub fn has_body(self) -> bool {
        matches!(self, HttpMethod::Post | HttpMethod::Put)
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An HTTP request described as plain data.
#[derive(Debug, Clone)]
pub struct HttpRequest {
    pub method: HttpMethod,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: Option<String>,
}

impl HttpRequest {
    /// First header value matching `name`, compared case-insensitively.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }
}

/// An HTTP response whose body is still unread.
#[derive(Debug)]
pub struct HttpResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: ResponseBody,
}

impl HttpResponse {
    pub fn new(status: u16, body: impl Into<ResponseBody>) -> Self {
        Self {
            status,
            headers: Vec::new(),
            body: body.into(),
        }
    }
}

/// Owned response body stream, drained and released on drop.
pub struct ResponseBody {
    reader: Box<dyn Read>,
}

impl ResponseBody {
    pub fn new(reader: impl Read + 'static) -> Self {
        Self {
            reader: Box::new(reader),
        }
    }

    pub fn empty() -> Self {
        Self::new(io::empty())
    }
}

impl Read for ResponseBody {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.reader.read(buf)
    }
}

impl Drop for ResponseBody {
    fn drop(&mut self) {
        // Errors here only mean the connection will not be reused.
        let _ = io::copy(&mut self.reader.by_ref().take(DRAIN_LIMIT), &mut io::sink());
    }
}

impl fmt::Debug for ResponseBody {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResponseBody").finish_non_exhaustive()
    }
}

impl From<String> for ResponseBody {
    fn from(body: String) -> Self {
        Self::new(Cursor::new(body.into_bytes()))
    }
}

impl From<&'static str> for ResponseBody {
    fn from(body: &'static str) -> Self {
        Self::new(body.as_bytes())
    }
}

impl From<Vec<u8>> for ResponseBody {
    fn from(body: Vec<u8>) -> Self {
        Self::new(Cursor::new(body))
    }
}

/// Build a request for `method` against an already resolved `url`.
///
/// `payload` is serialized only for `Post` and `Put`; for `Get` and `Delete`
/// it is ignored and no body is attached. An absent payload on a write
/// produces an empty body. Every request carries `Accept`, `Content-Type`
/// and `User-Agent`.
pub fn build_request<T: Serialize + ?Sized>(
    method: HttpMethod,
    url: String,
    payload: Option<&T>,
    user_agent: &str,
) -> Result<HttpRequest> {
    let body = match payload {
        Some(value) if method.has_body() => {
            Some(serde_json::to_string(value).map_err(Error::Serialization)?)
        }
        _ => None,
    };

    Ok(HttpRequest {
        method,
        url,
        headers: vec![
            ("Accept".to_string(), CONTENT_TYPE_JSON.to_string()),
            ("Content-Type".to_string(), CONTENT_TYPE_JSON.to_string()),
            ("User-Agent".to_string(), user_agent.to_string()),
        ],
        body,
    })
}
