/*!
 * Per-kind retry policy for backend calls.
 *
 * Every attempt runs under `tokio::time::timeout`. Remote backends retry rate
 * limits (honouring `Retry-After`), network errors and timeouts with
 * exponential backoff up to `max_retries`. Local backends retry a timeout
 * once with a doubled deadline and never retry an unavailable service.
 * Authentication failures are never retried.
 */

use std::time::Duration;

use log::{debug, warn};
use tokio_util::sync::CancellationToken;

use crate::app_config::BackendConfig;
use crate::errors::BackendError;

use super::{BackendKind, BackendRequest, BackendResponse, TranslationBackend};

/// Upper bound on a single backoff sleep
const MAX_BACKOFF: Duration = Duration::from_secs(60);

/// Retry settings for one backend
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryPolicy {
    /// Retries after the first attempt (remote backends)
    pub max_retries: u32,
    /// Base backoff, doubled on each retry
    pub backoff_base: Duration,
    /// Deadline of the first attempt
    pub timeout: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            backoff_base: Duration::from_millis(1000),
            timeout: Duration::from_secs(30),
        }
    }
}

impl RetryPolicy {
    pub fn from_config(config: &BackendConfig) -> Self {
        Self {
            max_retries: config.max_retries,
            backoff_base: Duration::from_millis(config.retry_backoff_ms),
            timeout: config.timeout(),
        }
    }

    /// Backoff before retry number `retry` (1-based)
    pub fn backoff(&self, retry: u32) -> Duration {
        let factor = 1u32.checked_shl(retry.saturating_sub(1)).unwrap_or(u32::MAX);
        self.backoff_base.saturating_mul(factor).min(MAX_BACKOFF)
    }
}

/// Result of a call including every attempt made
#[derive(Debug)]
pub struct CallOutcome {
    pub result: Result<BackendResponse, BackendError>,
    /// Number of times the backend was invoked
    pub attempts: u32,
}

/// Invoke a backend once under the given deadline.
pub async fn call_with_timeout(
    backend: &dyn TranslationBackend,
    request: &BackendRequest,
    timeout: Duration,
) -> Result<BackendResponse, BackendError> {
    match tokio::time::timeout(timeout, backend.translate(request)).await {
        Ok(result) => result,
        Err(_) => Err(BackendError::Timeout(timeout)),
    }
}

/// Invoke a backend, retrying according to its kind.
///
/// Cancellation is checked before every retry; an attempt that has started
/// is never interrupted, only its deadline applies.
pub async fn call_with_retry(
    backend: &dyn TranslationBackend,
    request: &BackendRequest,
    policy: &RetryPolicy,
    cancel: &CancellationToken,
) -> CallOutcome {
    let kind = backend.kind();
    let mut timeout = policy.timeout;
    let mut attempts = 0u32;
    let mut local_timeout_retried = false;

    loop {
        let mut attempt_request = request.clone();
        attempt_request.timeout = timeout;
        attempts += 1;

        let error = match call_with_timeout(backend, &attempt_request, timeout).await {
            Ok(response) => {
                return CallOutcome {
                    result: Ok(response),
                    attempts,
                };
            }
            Err(error) => error,
        };

        let retries_used = attempts - 1;
        let may_retry = error.is_retryable(kind)
            && match kind {
                BackendKind::Remote => retries_used < policy.max_retries,
                BackendKind::Local => !local_timeout_retried,
            };

        if !may_retry || cancel.is_cancelled() {
            if error.is_fatal() {
                warn!("Backend '{}' failed with a fatal error: {}", backend.name(), error);
            } else {
                debug!(
                    "Backend '{}' gave up after {} attempt(s): {}",
                    backend.name(),
                    attempts,
                    error
                );
            }
            return CallOutcome {
                result: Err(error),
                attempts,
            };
        }

        let delay = match (kind, &error) {
            (BackendKind::Local, _) => {
                local_timeout_retried = true;
                timeout = timeout.saturating_mul(2);
                Duration::ZERO
            }
            (BackendKind::Remote, BackendError::RateLimit { retry_after: Some(wait), .. }) => (*wait).min(MAX_BACKOFF),
            (BackendKind::Remote, _) => policy.backoff(attempts),
        };

        warn!(
            "Backend '{}' attempt {} failed: {}. Retrying in {:?}",
            backend.name(),
            attempts,
            error,
            delay
        );
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        if cancel.is_cancelled() {
            return CallOutcome {
                result: Err(error),
                attempts,
            };
        }
    }
}
