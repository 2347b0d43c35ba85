//! Blocking client for the jsonstore key-path JSON document API.
//!
//! # Overview
//! A jsonstore service keeps arbitrary JSON beneath a secret:
//! `GET|POST|PUT|DELETE /{secret}/{path}`, with successful reads wrapped as
//! `{"result": value}`. `Client` maps those four verbs onto typed Rust calls.
//!
//! ```no_run
//! use jsonstore::{Client, Context};
//! use serde::{Deserialize, Serialize};
//!
//! #[derive(Serialize, Deserialize)]
//! struct Example {
//!     number: i64,
//!     text: String,
//! }
//!
//! # fn main() -> jsonstore::Result<()> {
//! let ctx = Context::background();
//! let store = Client::builder().secret("3ba7860f742fc15d5b6e1508e2de1e0c").build()?;
//!
//! store.post(&ctx, "key", &Example { number: 1234, text: "initial".into() })?;
//! store.put(&ctx, "key/text", "modified")?;
//!
//! let example: Example = store.get(&ctx, "key")?;
//! println!("{} -> {}", store.url(&["key"]), example.text);
//! # Ok(())
//! # }
//! ```
//!
//! # Design
//! - `path` resolves segments to URLs, `http` builds requests as plain
//!   data, `response` maps statuses and unwraps the envelope, `transport`
//!   executes requests. `Client` composes them.
//! - The client is immutable after construction and `Send + Sync`.
//! - Errors are returned, never logged or retried. Retrying a `post` is not
//!   safe in general, so that decision belongs to the caller.

pub mod client;
pub mod config;
pub mod context;
pub mod error;
pub mod http;
pub mod path;
pub mod response;
pub mod secret;
pub mod transport;

pub use client::{Client, ClientBuilder};
pub use config::ClientConfig;
pub use context::Context;
pub use error::{Error, Result};
pub use http::{HttpMethod, HttpRequest, HttpResponse, ResponseBody};
pub use secret::Secret;
pub use transport::{Transport, TransportError, UreqTransport};
pub use tokio_util::sync::CancellationToken;
