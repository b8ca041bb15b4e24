pub mod local_only;
pub mod registration;
pub mod signing;

use std::future::Future;
use std::time::Duration;

/// Bounded retry with linearly increasing delay, per `spec.md` §4.3.1 step 4
/// and §9 ("Retry/backoff for VRF refresh"): 3 attempts, `150ms * attempt`
/// between them. Used for the just-in-time VRF challenge refresh in both
/// `RegistrationFlow` and `SigningFlow`.
pub async fn jit_retry<T, E, F, Fut>(mut attempt_fn: F) -> Result<T, E>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    const MAX_ATTEMPTS: u32 = 3;
    const BACKOFF_MS: u64 = 150;

    let mut last_err = None;
    for attempt in 1..=MAX_ATTEMPTS {
        match attempt_fn(attempt).await {
            Ok(value) => return Ok(value),
            Err(e) => {
                last_err = Some(e);
                if attempt < MAX_ATTEMPTS {
                    tokio::time::sleep(Duration::from_millis(BACKOFF_MS * attempt as u64)).await;
                }
            }
        }
    }
    Err(last_err.expect("at least one attempt runs"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[tokio::test]
    async fn succeeds_immediately_without_retrying() {
        let calls = AtomicU32::new(0);
        let result: Result<u32, &str> = jit_retry(|_attempt| {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Ok(42) }
        })
        .await;
        assert_eq!(result, Ok(42));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn retries_up_to_three_times_then_fails() {
        let calls = AtomicU32::new(0);
        let result: Result<u32, &str> = jit_retry(|_attempt| {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err("still failing") }
        })
        .await;
        assert_eq!(result, Err("still failing"));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn succeeds_on_a_later_attempt() {
        let calls = AtomicU32::new(0);
        let result: Result<u32, &str> = jit_retry(|attempt| {
            calls.fetch_add(1, Ordering::SeqCst);
            async move { if attempt < 2 { Err("not yet") } else { Ok(7) } }
        })
        .await;
        assert_eq!(result, Ok(7));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }
}
