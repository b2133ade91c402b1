use std::time::Duration;

use tracing::warn;

use crate::error::FetchError;

pub const DEFAULT_MAX_ATTEMPTS: u32 = 5;
pub const DEFAULT_BACKOFF: Duration = Duration::from_secs(15);

/// Bounded retry for API calls. Rate-limit responses wait the server-provided
/// delay, other transient failures wait a fixed backoff.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            backoff: DEFAULT_BACKOFF,
        }
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            ..Self::default()
        }
    }

    pub fn run<T>(&self, op: impl FnMut() -> Result<T, FetchError>) -> Result<T, FetchError> {
        self.run_with_sleep(op, std::thread::sleep)
    }

    pub fn run_with_sleep<T>(
        &self,
        mut op: impl FnMut() -> Result<T, FetchError>,
        sleep: impl Fn(Duration),
    ) -> Result<T, FetchError> {
        let mut attempt = 0;

        loop {
            attempt += 1;

            let err = match op() {
                Ok(value) => return Ok(value),
                Err(err) => err,
            };

            if !err.is_retryable() {
                return Err(err);
            }

            if attempt >= self.max_attempts {
                return Err(FetchError::Exhausted {
                    attempts: attempt,
                    last: Box::new(err),
                });
            }

            let wait = match &err {
                FetchError::RateLimited { retry_after } => *retry_after,
                _ => self.backoff,
            };
            warn!(attempt, max_attempts = self.max_attempts, ?wait, "request failed: {err}");
            sleep(wait);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    fn no_sleep(_: Duration) {}

    #[test]
    fn succeeds_after_transient_failures() {
        let mut calls = 0;
        let result = RetryPolicy::new(3).run_with_sleep(
            || {
                calls += 1;
                if calls < 3 {
                    Err(FetchError::ServiceUnavailable { status: 503 })
                } else {
                    Ok(calls)
                }
            },
            no_sleep,
        );
        assert_eq!(result.unwrap(), 3);
    }

    #[test]
    fn not_found_is_not_retried() {
        let mut calls = 0;
        let result: Result<(), _> = RetryPolicy::new(5).run_with_sleep(
            || {
                calls += 1;
                Err(FetchError::NotFound { url: "x".into() })
            },
            no_sleep,
        );
        assert_eq!(calls, 1);
        assert!(matches!(result, Err(FetchError::NotFound { .. })));
    }

    #[test]
    fn gives_up_after_max_attempts() {
        let mut calls = 0;
        let result: Result<(), _> = RetryPolicy::new(4).run_with_sleep(
            || {
                calls += 1;
                Err(FetchError::Unclassified { status: 500 })
            },
            no_sleep,
        );
        assert_eq!(calls, 4);
        match result {
            Err(FetchError::Exhausted { attempts, last }) => {
                assert_eq!(attempts, 4);
                assert!(matches!(*last, FetchError::Unclassified { status: 500 }));
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn waits_retry_after_on_rate_limit_and_fixed_backoff_otherwise() {
        let waits = RefCell::new(Vec::new());
        let mut calls = 0;
        let _ = RetryPolicy::new(3).run_with_sleep(
            || {
                calls += 1;
                match calls {
                    1 => Err(FetchError::RateLimited {
                        retry_after: Duration::from_secs(2),
                    }),
                    2 => Err(FetchError::Unclassified { status: 502 }),
                    _ => Ok(()),
                }
            },
            |d| waits.borrow_mut().push(d),
        );
        assert_eq!(
            *waits.borrow(),
            vec![Duration::from_secs(2), DEFAULT_BACKOFF]
        );
    }
}
