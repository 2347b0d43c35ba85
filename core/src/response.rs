//! Status mapping and `{"result": T}` envelope decoding.
//!
//! # Design
//! `check_status` is the only place status codes become errors, and
//! `decode_envelope` is the only place the envelope is unwrapped. Both
//! `read_result` and `discard` take the response by value: the body is
//! dropped (and so drained and released) before they return, on every path.

use std::io::{self, Read};

use serde::de::DeserializeOwned;
use serde::Deserialize;

use crate::error::{Error, Result};
use crate::http::HttpResponse;
use crate::transport::TransportError;

#[derive(Deserialize)]
struct Envelope<T> {
    result: T,
}

/// Map a status code onto success or a domain error.
///
/// | status | outcome                      |
/// |--------|------------------------------|
/// | 200    | `Ok`                         |
/// | 201    | `Ok`                         |
/// | 404    | `Error::NotFound`            |
/// | 500    | `Error::InternalServerError` |
/// | other  | `Error::UnexpectedStatus`    |
pub fn check_status(status: u16) -> Result<()> {
    match status {
        200 | 201 => Ok(()),
        404 => Err(Error::NotFound),
        500 => Err(Error::InternalServerError),
        other => Err(Error::UnexpectedStatus(other)),
    }
}

/// Decode `{"result": T}` from `reader` and return the inner `T`.
///
/// A read failure on the underlying stream is a transport error, keeping
/// `Cancelled` or `DeadlineExceeded` when the reader reports one; anything
/// else that goes wrong is `Error::Decode`.
pub fn decode_envelope<T: DeserializeOwned, R: Read>(reader: R) -> Result<T> {
    match serde_json::from_reader::<_, Envelope<T>>(reader) {
        Ok(envelope) => Ok(envelope.result),
        Err(e) if e.is_io() => Err(TransportError::from_io(io::Error::from(e)).into()),
        Err(e) => Err(Error::Decode(e)),
    }
}

/// Check the status and decode the envelope into `T`.
pub fn read_result<T: DeserializeOwned>(response: HttpResponse) -> Result<T> {
    let HttpResponse { status, mut body, .. } = response;
    check_status(status)?;
    decode_envelope(&mut body)
}

/// Check the status and throw the body away without parsing it.
pub fn discard(response: HttpResponse) -> Result<()> {
    check_status(response.status)
}
