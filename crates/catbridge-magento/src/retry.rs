//! Retry with exponential back-off and jitter for source requests.
//!
//! A page fetch is retried only on conditions that may clear on their own.
//! Everything else surfaces immediately so a broken run fails fast.

use std::future::Future;
use std::time::Duration;

use crate::error::SourceError;

const MAX_DELAY_MS: u64 = 30_000;

/// Returns `true` for errors worth retrying after a back-off delay.
///
/// **Retriable:**
/// - [`SourceError::RateLimited`]: HTTP 429.
/// - [`SourceError::UnexpectedStatus`] with a 5xx status.
/// - [`SourceError::Http`] timeouts and connection failures.
///
/// **Not retriable:** 4xx responses, credential rejections, malformed bodies,
/// pagination limits and local file errors.
pub(crate) fn is_retriable(err: &SourceError) -> bool {
    match err {
        SourceError::RateLimited { .. } => true,
        SourceError::UnexpectedStatus { status, .. } => *status >= 500,
        SourceError::Http(e) => e.is_timeout() || e.is_connect() || e.is_request(),
        SourceError::Deserialize { .. }
        | SourceError::Unauthorized { .. }
        | SourceError::InvalidBaseUrl { .. }
        | SourceError::PaginationLimit { .. }
        | SourceError::FileIo { .. } => false,
    }
}

/// Runs `operation` with up to `max_retries` additional attempts on transient
/// errors.
///
/// The n-th retry sleeps `backoff_base_ms * 2^(n-1)` ms, ±25 % jitter, capped
/// at 30 s. A rate-limit response with a `Retry-After` hint waits at least
/// that long.
pub(crate) async fn retry_with_backoff<T, F, Fut>(
    max_retries: u32,
    backoff_base_ms: u64,
    mut operation: F,
) -> Result<T, SourceError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, SourceError>>,
{
    let mut attempt = 0u32;
    loop {
        match operation().await {
            Ok(value) => return Ok(value),
            Err(err) => {
                if !is_retriable(&err) || attempt >= max_retries {
                    return Err(err);
                }
                attempt += 1;
                let delay_ms = backoff_delay_ms(backoff_base_ms, attempt, &err);
                tracing::warn!(
                    attempt,
                    max_retries,
                    delay_ms,
                    error = %err,
                    "transient source error; retrying after back-off"
                );
                tokio::time::sleep(Duration::from_millis(delay_ms)).await;
            }
        }
    }
}

fn backoff_delay_ms(backoff_base_ms: u64, attempt: u32, err: &SourceError) -> u64 {
    let computed = backoff_base_ms.saturating_mul(1u64 << (attempt - 1).min(10));
    let capped = computed.min(MAX_DELAY_MS);
    #[allow(
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss,
        clippy::cast_precision_loss
    )]
    let jittered = (capped as f64 * (rand::random::<f64>() * 0.5 + 0.75)) as u64;

    match err {
        SourceError::RateLimited {
            retry_after_secs, ..
        } if backoff_base_ms > 0 => jittered.max(retry_after_secs.saturating_mul(1000)),
        _ => jittered,
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    use super::*;

    fn rate_limited() -> SourceError {
        SourceError::RateLimited {
            url: "https://shop.example.com/rest/V1/products".to_owned(),
            retry_after_secs: 1,
        }
    }

    #[test]
    fn server_errors_are_retriable_client_errors_are_not() {
        assert!(is_retriable(&SourceError::UnexpectedStatus {
            status: 503,
            url: "u".into()
        }));
        assert!(!is_retriable(&SourceError::UnexpectedStatus {
            status: 404,
            url: "u".into()
        }));
        assert!(!is_retriable(&SourceError::Unauthorized {
            status: 401,
            url: "u".into()
        }));
        assert!(is_retriable(&rate_limited()));
    }

    #[test]
    fn zero_base_means_no_delay_even_when_rate_limited() {
        assert_eq!(backoff_delay_ms(0, 1, &rate_limited()), 0);
    }

    #[test]
    fn delay_is_capped() {
        let err = SourceError::UnexpectedStatus {
            status: 500,
            url: "u".into(),
        };
        let delay = backoff_delay_ms(60_000, 5, &err);
        assert!(delay <= MAX_DELAY_MS * 5 / 4, "delay {delay} exceeds cap");
    }

    #[tokio::test]
    async fn retries_transient_errors_then_succeeds() {
        let calls = Arc::new(AtomicU32::new(0));
        let c = Arc::clone(&calls);
        let result = retry_with_backoff(3, 0, || {
            let c = Arc::clone(&c);
            async move {
                if c.fetch_add(1, Ordering::SeqCst) < 2 {
                    Err(rate_limited())
                } else {
                    Ok::<u32, SourceError>(7)
                }
            }
        })
        .await;
        assert_eq!(result.expect("eventually ok"), 7);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn gives_up_after_max_retries() {
        let calls = Arc::new(AtomicU32::new(0));
        let c = Arc::clone(&calls);
        let result = retry_with_backoff(2, 0, || {
            let c = Arc::clone(&c);
            async move {
                c.fetch_add(1, Ordering::SeqCst);
                Err::<u32, SourceError>(rate_limited())
            }
        })
        .await;
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert!(matches!(result, Err(SourceError::RateLimited { .. })));
    }

    #[tokio::test]
    async fn does_not_retry_client_errors() {
        let calls = Arc::new(AtomicU32::new(0));
        let c = Arc::clone(&calls);
        let result = retry_with_backoff(3, 0, || {
            let c = Arc::clone(&c);
            async move {
                c.fetch_add(1, Ordering::SeqCst);
                Err::<u32, SourceError>(SourceError::UnexpectedStatus {
                    status: 400,
                    url: "u".into(),
                })
            }
        })
        .await;
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(result.is_err());
    }
}
