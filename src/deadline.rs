//! Cancellation deadlines for outbound HTTP calls.
//!
//! Every network call in the crate runs under a [`Deadline`]. Expiry drops the
//! in-flight future, which aborts the underlying request.

use std::future::Future;
use std::time::Duration;

use tokio::time::Instant;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Deadline {
    Never,
    At(Instant),
}

/// Returned when the deadline fires before the wrapped future completes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("deadline elapsed")]
pub struct Expired;

impl Deadline {
    pub fn after(timeout: Duration) -> Self {
        Deadline::At(Instant::now() + timeout)
    }

    /// A deadline that has already passed.
    pub fn expired() -> Self {
        Deadline::At(Instant::now())
    }

    pub async fn run<F: Future>(self, fut: F) -> Result<F::Output, Expired> {
        match self {
            Deadline::Never => Ok(fut.await),
            Deadline::At(at) => {
                tokio::select! {
                    biased;
                    _ = tokio::time::sleep_until(at) => Err(Expired),
                    out = fut => Ok(out),
                }
            }
        }
    }
}
