//! Fixed-delay retry shared by every remote call of the pipeline.

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

use fieldsync_engine::RetryPolicy;
use tracing::warn;

/// Run `op` until it succeeds, `is_retryable` rejects the error, or the
/// policy's attempts are used up. Returns the last error.
pub async fn retry_fixed<T, E, F, Fut, P>(
    policy: RetryPolicy,
    label: &str,
    mut op: F,
    is_retryable: P,
) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    P: Fn(&E) -> bool,
    E: Display,
{
    let mut attempt = 1;
    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(e) => {
                if !policy.should_retry(attempt, is_retryable(&e)) {
                    return Err(e);
                }
                warn!(
                    attempt,
                    max_attempts = policy.max_attempts,
                    "{} failed, retrying in {} ms: {}",
                    label,
                    policy.delay_ms,
                    e
                );
                tokio::time::sleep(Duration::from_millis(policy.delay_ms)).await;
                attempt += 1;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[tokio::test]
    async fn retries_until_success() {
        let calls = AtomicU32::new(0);
        let result: Result<u32, String> = retry_fixed(
            RetryPolicy::new(3, 0),
            "op",
            || async {
                let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
                if n < 3 {
                    Err(format!("fail {n}"))
                } else {
                    Ok(n)
                }
            },
            |_| true,
        )
        .await;

        assert_eq!(result, Ok(3));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn gives_up_after_max_attempts() {
        let calls = AtomicU32::new(0);
        let result: Result<(), &str> = retry_fixed(
            RetryPolicy::new(3, 0),
            "op",
            || async {
                calls.fetch_add(1, Ordering::SeqCst);
                Err("HTTP 500")
            },
            |_| true,
        )
        .await;

        assert_eq!(result, Err("HTTP 500"));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn non_retryable_stops_immediately() {
        let calls = AtomicU32::new(0);
        let result: Result<(), &str> = retry_fixed(
            RetryPolicy::new(3, 0),
            "op",
            || async {
                calls.fetch_add(1, Ordering::SeqCst);
                Err("HTTP 401")
            },
            |_| false,
        )
        .await;

        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
