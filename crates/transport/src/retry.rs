//! Retry classification and backoff.
//!
//! [`classify`] is a pure function from a [`TransportFailure`] to a
//! [`RetryPolicy`]. Only failures to *establish* a connection are retried:
//! once bytes may have reached the peer, repeating the request could repeat
//! its effect.
//!
//! [`backoff_delay`] gives the wait before the n-th retry:
//! `retry_delay * 2^(n-1)`, i.e. `d, 2d, 4d, ...`. The product saturates at
//! [`Duration::MAX`] rather than wrapping.

use std::time::Duration;

use protocol::{RetryPolicy, TransportFailure};

/// Decides whether `failure` may be retried.
pub fn classify(failure: &TransportFailure) -> RetryPolicy {
    match failure {
        TransportFailure::Connect { .. } | TransportFailure::ConnectTimeout { .. } => {
            RetryPolicy::Retryable { after: None }
        }
        TransportFailure::Timeout { .. }
        | TransportFailure::Io { .. }
        | TransportFailure::Protocol { .. }
        | TransportFailure::Interceptor { .. }
        | TransportFailure::Transport(_)
        | TransportFailure::Other { .. } => RetryPolicy::NonRetryable,
    }
}

/// Delay before retry number `retry` (1-based).
pub fn backoff_delay(base: Duration, retry: u32) -> Duration {
    let mut delay = base;
    let mut exponent = retry.saturating_sub(1);
    // A few 31-bit steps reach Duration::MAX from any non-zero base.
    while exponent > 0 && !delay.is_zero() && delay != Duration::MAX {
        let step = exponent.min(31);
        delay = delay.saturating_mul(1 << step);
        exponent -= step;
    }
    delay
}

/// Blocks the calling thread between attempts.
pub trait Sleeper: Send + Sync {
    /// Blocks for `duration`.
    fn sleep(&self, duration: Duration);
}

/// [`Sleeper`] backed by [`std::thread::sleep`].
#[derive(Debug, Clone, Copy, Default)]
pub struct ThreadSleeper;

impl Sleeper for ThreadSleeper {
    fn sleep(&self, duration: Duration) {
        std::thread::sleep(duration);
    }
}
