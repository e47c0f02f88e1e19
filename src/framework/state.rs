use std::{fmt::Display, time::Duration};

use tracing::{error, warn};

use crate::env::MAX_RETRIES;

/// The longest pause between two attempts of a transaction.
const MAX_BACKOFF: Duration = Duration::from_secs(8);

/// An error that controls the flow of a transaction.
#[non_exhaustive]
#[derive(Debug, PartialEq, Eq)]
pub enum StateError<E> {
    /// The transaction failed transiently and should retry if possible.
    ///
    /// See: [`retry_if_possible`]
    Retry(E),
    /// The transaction failed for good and should exit immediately.
    Cancelled(E),
}

impl<E> StateError<E> {
    /// Unwraps the underlying error, forgetting whether it was retryable.
    pub fn into_inner(self) -> E {
        match self {
            Self::Retry(err) | Self::Cancelled(err) => err,
        }
    }

    /// Maps the underlying error while keeping the control flow.
    pub fn map<F, R>(self, f: F) -> StateError<R>
    where
        F: FnOnce(E) -> R,
    {
        match self {
            Self::Retry(err) => StateError::Retry(f(err)),
            Self::Cancelled(err) => StateError::Cancelled(f(err)),
        }
    }
}

/// The result of a single attempt of a transaction.
pub type StateResult<T, E> = Result<T, StateError<E>>;

/// Decides whether retrying is allowed based on the retries so far and the [`MAX_RETRIES`] environment variable.
///
/// Returns `true` and counts the retry if another attempt is allowed.
pub fn retry_if_possible(retry: &mut u8) -> bool {
    retry_within(retry, *MAX_RETRIES)
}

fn retry_within(retry: &mut u8, max_retries: u8) -> bool {
    if *retry >= max_retries {
        error!("retried for too many times ({max_retries}), stopping!");
        return false;
    }
    *retry += 1;
    warn!("retrying… ({retry} / {max_retries})");
    true
}

/// The pause before the given retry: 250ms, doubled per retry, capped at [`MAX_BACKOFF`].
pub fn backoff(retry: u8) -> Duration {
    let exponent = u32::from(retry.saturating_sub(1)).min(6);
    Duration::from_millis(250 * 2_u64.pow(exponent)).min(MAX_BACKOFF)
}

/// Runs a transaction until it succeeds, is cancelled, or the retry limit is reached.
///
/// # Errors
///
/// Returns the error of the last attempt if the transaction is cancelled or retried for too many times.
pub async fn retry<T, E, F, Fut>(name: &str, mut transaction: F) -> Result<T, E>
where
    E: Display,
    F: FnMut() -> Fut,
    Fut: Future<Output = StateResult<T, E>>,
{
    let mut retry: u8 = 0;

    loop {
        match transaction().await {
            Ok(value) => return Ok(value),
            Err(StateError::Retry(err)) => {
                warn!("transaction {name} failed: {err}");
                if !retry_if_possible(&mut retry) {
                    return Err(err);
                }
                tokio::time::sleep(backoff(retry)).await;
            }
            Err(StateError::Cancelled(err)) => {
                error!("transaction {name} cancelled: {err}");
                return Err(err);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::atomic::{AtomicU8, Ordering};

    #[test]
    fn backoff_doubles_and_caps() {
        assert_eq!(backoff(1), Duration::from_millis(250));
        assert_eq!(backoff(2), Duration::from_millis(500));
        assert_eq!(backoff(3), Duration::from_secs(1));
        assert_eq!(backoff(200), MAX_BACKOFF);
    }

    #[test]
    fn retries_are_bounded() {
        let mut retry = 0;
        let mut allowed = 0;
        while retry_if_possible(&mut retry) {
            allowed += 1;
        }
        assert_eq!(allowed, *MAX_RETRIES);
    }

    #[test]
    fn the_largest_limit_still_stops() {
        let mut retry = 0;
        let mut allowed = 0_u32;
        while retry_within(&mut retry, u8::MAX) {
            allowed += 1;
            assert!(allowed <= 255, "retried past the limit");
        }
        assert_eq!(allowed, 255);
        assert_eq!(retry, u8::MAX);
    }

    #[test]
    fn no_retries_with_a_zero_limit() {
        let mut retry = 0;
        assert!(!retry_within(&mut retry, 0));
        assert_eq!(retry, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn transient_failures_are_retried() {
        let attempts = &AtomicU8::new(0);
        let result: Result<&str, String> = retry("flaky", move || async move {
            match attempts.fetch_add(1, Ordering::SeqCst) {
                0 | 1 => Err(StateError::Retry(String::from("connection reset"))),
                _ => Ok("42!"),
            }
        })
        .await;

        assert_eq!(result, Ok("42!"));
        assert_eq!(attempts.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn cancelled_transactions_stop_immediately() {
        let attempts = &AtomicU8::new(0);
        let result: Result<(), String> = retry("doomed", move || async move {
            attempts.fetch_add(1, Ordering::SeqCst);
            Err(StateError::Cancelled(String::from("not found")))
        })
        .await;

        assert_eq!(result, Err(String::from("not found")));
        assert_eq!(attempts.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn exhausted_retries_surface_the_last_error() {
        let attempts = &AtomicU8::new(0);
        let result: Result<(), String> = retry("hopeless", move || async move {
            attempts.fetch_add(1, Ordering::SeqCst);
            Err(StateError::Retry(String::from("rate limited")))
        })
        .await;

        assert_eq!(result, Err(String::from("rate limited")));
        assert_eq!(attempts.load(Ordering::SeqCst), *MAX_RETRIES + 1);
    }
}
