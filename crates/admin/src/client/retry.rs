//! Bounded retry for client calls.

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

/// A fixed number of attempts with a fixed pause between them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub attempts: u32,
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempts: 3,
            delay: Duration::from_secs(1),
        }
    }
}

/// Run `op` until it succeeds or the attempts run out.
///
/// Each failure is logged. Returns `None` after the last failed attempt; a
/// policy with zero attempts never calls `op`.
pub async fn with_retry<T, E, F, Fut>(policy: RetryPolicy, mut op: F) -> Option<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Display,
{
    for attempt in 1..=policy.attempts {
        match op().await {
            Ok(value) => return Some(value),
            Err(e) => {
                tracing::warn!(attempt, attempts = policy.attempts, error = %e, "Request failed");
                if attempt < policy.attempts {
                    tokio::time::sleep(policy.delay).await;
                }
            }
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    const FAST: RetryPolicy = RetryPolicy {
        attempts: 3,
        delay: Duration::ZERO,
    };

    #[tokio::test]
    async fn test_stops_at_first_success() {
        let mut calls = 0;
        let result = with_retry(FAST, || {
            calls += 1;
            let n = calls;
            async move { if n < 2 { Err("busy") } else { Ok(n) } }
        })
        .await;

        assert_eq!(result, Some(2));
        assert_eq!(calls, 2);
    }

    #[tokio::test]
    async fn test_gives_up_after_last_attempt() {
        let mut calls = 0;
        let result: Option<()> = with_retry(FAST, || {
            calls += 1;
            async { Err("down") }
        })
        .await;

        assert_eq!(result, None);
        assert_eq!(calls, 3);
    }

    #[tokio::test]
    async fn test_zero_attempts_never_calls() {
        let mut calls = 0;
        let policy = RetryPolicy {
            attempts: 0,
            ..FAST
        };
        let result: Option<()> = with_retry(policy, || {
            calls += 1;
            async { Ok::<_, &str>(()) }
        })
        .await;

        assert_eq!(result, None);
        assert_eq!(calls, 0);
    }
}
