//! Per-call cancellation and deadline context.
//!
//! # Design
//! Every verb on `Client` takes a `Context`. The client never acts on it
//! directly; it hands it to the `Transport`, which is responsible for
//! aborting the request. Cancellation and deadline expiry surface as
//! `TransportError` values so they are never mistaken for a status error.

use std::time::{Duration, Instant};

use tokio_util::sync::CancellationToken;

use crate::transport::TransportError;

#[derive(Debug, Clone)]
pub struct Context {
    deadline: Option<Instant>,
    token: CancellationToken,
}

impl Default for Context {
    fn default() -> Self {
        Self::background()
    }
}

impl Context {
    /// A context with no deadline that is never cancelled unless a token is
    /// attached later.
    pub fn background() -> Self {
        Self {
            deadline: None,
            token: CancellationToken::new(),
        }
    }

    /// Bound the context to `timeout` from now. An earlier existing deadline
    /// is kept.
    pub fn with_timeout(self, timeout: Duration) -> Self {
        self.with_deadline(Instant::now() + timeout)
    }

    /// Bound the context to `deadline`. An earlier existing deadline is kept.
    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(match self.deadline {
            Some(current) => current.min(deadline),
            None => deadline,
        });
        self
    }

    /// Replace the cancellation token. Cancelling `token` (or its parent)
    /// cancels every request issued with this context.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.token = token;
        self
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Time left before the deadline, `None` when no deadline is set.
    /// Saturates at zero once the deadline has passed.
    pub fn remaining(&self) -> Option<Duration> {
        self.deadline
            .map(|deadline| deadline.saturating_duration_since(Instant::now()))
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    pub fn cancellation_token(&self) -> &CancellationToken {
        &self.token
    }

    /// Fail with the reason the context is done, if it is.
    pub fn check(&self) -> Result<(), TransportError> {
        if self.token.is_cancelled() {
            return Err(TransportError::Cancelled);
        }
        match self.deadline {
            Some(deadline) if Instant::now() >= deadline => Err(TransportError::DeadlineExceeded),
            _ => Ok(()),
        }
    }
}
