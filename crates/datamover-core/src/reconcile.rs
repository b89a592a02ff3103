//! Bounded reconciliation poller.
//!
//! The poller re-fetches an externally reconciled object until a readiness
//! predicate holds, a terminal-failure predicate fires, the fetch fails or the time
//! budget runs out. It is a plain future: dropping it stops the wait.

use std::future::Future;
use std::time::Duration;

use thiserror::Error;
use tracing::{error, info};

/// Interval between fetches when none is configured.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(5);
/// Total wait budget when none is configured.
pub const DEFAULT_POLL_TIMEOUT: Duration = Duration::from_secs(10 * 60);

/// Ways a poll can end without a ready value.
#[derive(Debug, Error)]
pub enum PollError<E> {
    /// The budget ran out before the object became ready.
    #[error("timed out waiting for reconciliation")]
    Timeout {
        /// What was being waited on.
        subject: String,
        /// Budget that elapsed.
        timeout: Duration,
    },
    /// The object reported a failure it cannot recover from.
    #[error("reconciliation reported a terminal failure")]
    TerminalFailure {
        /// What was being waited on.
        subject: String,
    },
    /// Fetching the object failed; the poll is abandoned.
    #[error("fetch failed while waiting for reconciliation")]
    Fetch {
        /// What was being waited on.
        subject: String,
        /// Fetch failure.
        #[source]
        source: E,
    },
}

impl<E> PollError<E> {
    /// Subject the failed poll was waiting on.
    #[must_use]
    pub fn subject(&self) -> &str {
        match self {
            Self::Timeout { subject, .. }
            | Self::TerminalFailure { subject }
            | Self::Fetch { subject, .. } => subject,
        }
    }

    /// Whether the poll ran out of time.
    #[must_use]
    pub const fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }

    /// Whether the poll stopped on a terminal failure.
    #[must_use]
    pub const fn is_terminal_failure(&self) -> bool {
        matches!(self, Self::TerminalFailure { .. })
    }

    /// Fetch error that ended the poll, if any.
    #[must_use]
    pub const fn fetch_error(&self) -> Option<&E> {
        match self {
            Self::Fetch { source, .. } => Some(source),
            _ => None,
        }
    }
}

/// Convenience alias for poll results.
pub type PollResult<T, E> = Result<T, PollError<E>>;

/// Fixed-interval poller with an overall time budget.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Poller {
    interval: Duration,
    timeout: Duration,
}

impl Default for Poller {
    fn default() -> Self {
        Self::new(DEFAULT_POLL_INTERVAL, DEFAULT_POLL_TIMEOUT)
    }
}

impl Poller {
    /// Builds a poller.
    #[must_use]
    pub const fn new(interval: Duration, timeout: Duration) -> Self {
        Self { interval, timeout }
    }

    /// Interval between fetches.
    #[must_use]
    pub const fn interval(&self) -> Duration {
        self.interval
    }

    /// Overall budget.
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Fetches immediately and then once per interval until `is_ready` holds.
    ///
    /// `is_terminal_failure` is checked before `is_ready` on every fetch.
    ///
    /// # Errors
    ///
    /// - [`PollError::TerminalFailure`] as soon as `is_terminal_failure` holds.
    /// - [`PollError::Fetch`] on the first fetch error; fetches are not retried.
    /// - [`PollError::Timeout`] once the budget has elapsed.
    pub async fn wait_until<T, E, F, Fut, R, X>(
        &self,
        subject: &str,
        mut fetch: F,
        is_ready: R,
        is_terminal_failure: X,
    ) -> PollResult<T, E>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        R: Fn(&T) -> bool,
        X: Fn(&T) -> bool,
    {
        let polling = async {
            loop {
                let value = fetch().await.map_err(|source| PollError::Fetch {
                    subject: subject.to_string(),
                    source,
                })?;
                if is_terminal_failure(&value) {
                    return Err(PollError::TerminalFailure {
                        subject: subject.to_string(),
                    });
                }
                if is_ready(&value) {
                    return Ok(value);
                }
                info!(
                    subject,
                    retry_secs = self.interval.as_secs(),
                    "waiting for reconciliation"
                );
                tokio::time::sleep(self.interval).await;
            }
        };

        if let Ok(result) = tokio::time::timeout(self.timeout, polling).await {
            result
        } else {
            error!(
                subject,
                timeout_secs = self.timeout.as_secs(),
                "timed out waiting for reconciliation"
            );
            Err(PollError::Timeout {
                subject: subject.to_string(),
                timeout: self.timeout,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use std::io;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use tokio::time::Instant;

    use super::*;

    fn counting_fetch(
        calls: Arc<AtomicUsize>,
    ) -> impl FnMut() -> std::future::Ready<Result<usize, io::Error>> {
        move || std::future::ready(Ok(calls.fetch_add(1, Ordering::SeqCst) + 1))
    }

    #[tokio::test(start_paused = true)]
    async fn ready_on_first_fetch_returns_without_waiting() -> anyhow::Result<()> {
        let calls = Arc::new(AtomicUsize::new(0));
        let started = Instant::now();
        let value = Poller::default()
            .wait_until("vsb apps/vsb-1", counting_fetch(Arc::clone(&calls)), |_| true, |_| false)
            .await?;

        assert_eq!(value, 1);
        assert_eq!(started.elapsed(), Duration::ZERO);
        Ok(())
    }

    #[tokio::test(start_paused = true)]
    async fn ready_on_second_fetch_waits_one_interval() -> anyhow::Result<()> {
        let calls = Arc::new(AtomicUsize::new(0));
        let started = Instant::now();
        let value = Poller::default()
            .wait_until(
                "vsb apps/vsb-1",
                counting_fetch(Arc::clone(&calls)),
                |count| *count >= 2,
                |_| false,
            )
            .await?;

        assert_eq!(value, 2);
        let elapsed = started.elapsed();
        assert!(elapsed >= DEFAULT_POLL_INTERVAL);
        assert!(elapsed < DEFAULT_POLL_INTERVAL * 2);
        Ok(())
    }

    #[tokio::test(start_paused = true)]
    async fn never_ready_times_out_after_the_budget() {
        let calls = Arc::new(AtomicUsize::new(0));
        let poller = Poller::new(Duration::from_secs(5), Duration::from_secs(60));
        let started = Instant::now();
        let result = poller
            .wait_until("vsr apps/vsr-1", counting_fetch(Arc::clone(&calls)), |_| false, |_| false)
            .await;

        let elapsed = started.elapsed();
        assert!(matches!(result, Err(PollError::Timeout { .. })));
        assert!(elapsed >= Duration::from_secs(60));
        assert!(elapsed < Duration::from_secs(65));
        assert!(calls.load(Ordering::SeqCst) >= 12);
    }

    #[tokio::test(start_paused = true)]
    async fn terminal_failure_wins_over_readiness() {
        let calls = Arc::new(AtomicUsize::new(0));
        let result = Poller::default()
            .wait_until("vsb apps/vsb-1", counting_fetch(Arc::clone(&calls)), |_| true, |_| true)
            .await;

        assert!(result.as_ref().is_err_and(PollError::is_terminal_failure));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn fetch_errors_end_the_poll_immediately() {
        let started = Instant::now();
        let result: PollResult<(), io::Error> = Poller::default()
            .wait_until(
                "vsb apps/vsb-1",
                || std::future::ready(Err(io::Error::other("connection refused"))),
                |_| true,
                |_| false,
            )
            .await;

        let err = result.err();
        assert!(err.as_ref().and_then(PollError::fetch_error).is_some());
        assert_eq!(err.as_ref().map(PollError::subject), Some("vsb apps/vsb-1"));
        assert_eq!(started.elapsed(), Duration::ZERO);
    }
}
