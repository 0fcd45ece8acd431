//! Shared utilities for use cases.
//!
//! Cancellation checks and the bounded-wait helper used at every
//! suspension point.

use std::future::Future;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// True if the token exists and is cancelled.
pub(crate) fn is_cancelled(token: &Option<CancellationToken>) -> bool {
    token.as_ref().is_some_and(|t| t.is_cancelled())
}

/// Resolves when the token is cancelled; never resolves without a token.
pub(crate) async fn cancelled(token: &Option<CancellationToken>) {
    match token {
        Some(token) => token.cancelled().await,
        None => std::future::pending().await,
    }
}

/// Outcome of [`bounded`].
pub(crate) enum Bounded<T> {
    Ready(T),
    Cancelled,
    TimedOut,
}

/// Await `fut` until it finishes, the token is cancelled, or `timeout` elapses.
/// Cancellation wins ties.
pub(crate) async fn bounded<F: Future>(
    fut: F,
    timeout: Duration,
    token: &Option<CancellationToken>,
) -> Bounded<F::Output> {
    tokio::select! {
        biased;
        _ = cancelled(token) => Bounded::Cancelled,
        result = tokio::time::timeout(timeout, fut) => match result {
            Ok(value) => Bounded::Ready(value),
            Err(_) => Bounded::TimedOut,
        },
    }
}
