//! Sequential retry loop with cancellable backoff waits.

use std::future::Future;
use std::time::Duration;

use tokio::sync::watch;
use tokio::time::{sleep, sleep_until, Instant};

use crate::{Backoff, DeeplError, Result};

/// Attempt budget plus the delay schedule between attempts.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RetryPolicy {
    max_attempts: u32,
    backoff: Backoff,
}

impl Default for RetryPolicy {
    /// 5 attempts, 1 s initial delay, 120 s cap, factor 1.6, jitter 0.23.
    fn default() -> Self {
        Self {
            max_attempts: 5,
            backoff: Backoff::default(),
        }
    }
}

impl RetryPolicy {
    /// `max_attempts` counts the first attempt and must be at least 1.
    pub fn new(max_attempts: u32, backoff: Backoff) -> Result<Self> {
        if max_attempts == 0 {
            return Err(DeeplError::Config(
                "max_attempts must be at least 1".to_owned(),
            ));
        }
        Ok(Self {
            max_attempts,
            backoff,
        })
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    pub fn backoff(&self) -> &Backoff {
        &self.backoff
    }
}

/// Fires a [`Cancellation`].
#[derive(Debug)]
pub struct CancelHandle {
    tx: watch::Sender<bool>,
}

impl CancelHandle {
    pub fn cancel(&self) {
        self.tx.send_replace(true);
    }
}

/// Cloneable signal that aborts retry waits.
#[derive(Clone, Debug)]
pub struct Cancellation {
    fired: watch::Receiver<bool>,
    deadline: Option<Instant>,
}

impl Default for Cancellation {
    fn default() -> Self {
        Self::never()
    }
}

impl Cancellation {
    pub fn new() -> (CancelHandle, Self) {
        let (tx, fired) = watch::channel(false);
        (
            CancelHandle { tx },
            Self {
                fired,
                deadline: None,
            },
        )
    }

    /// A signal that only fires through a deadline, if one is added.
    pub fn never() -> Self {
        let (_, signal) = Self::new();
        signal
    }

    /// Additionally fires once `timeout` has elapsed from now.
    pub fn with_deadline(mut self, timeout: Duration) -> Self {
        let deadline = Instant::now() + timeout;
        self.deadline = Some(match self.deadline {
            Some(existing) => existing.min(deadline),
            None => deadline,
        });
        self
    }

    pub fn is_cancelled(&self) -> bool {
        *self.fired.borrow() || self.deadline.is_some_and(|d| Instant::now() >= d)
    }

    /// Completes when the signal fires. Pends forever if it never can.
    pub async fn cancelled(&self) {
        let mut fired = self.fired.clone();
        let signal = async move {
            // Dropped handle without cancel: nothing can fire any more.
            if fired.wait_for(|cancelled| *cancelled).await.is_err() {
                std::future::pending::<()>().await;
            }
        };
        match self.deadline {
            Some(deadline) => {
                tokio::select! {
                    () = signal => {}
                    () = sleep_until(deadline) => {}
                }
            }
            None => signal.await,
        }
    }
}

/// Terminal failure of [`retry`].
#[derive(Debug)]
pub enum RetryError<E> {
    /// The predicate refused to retry this error.
    Fatal(E),
    /// The final permitted attempt failed.
    Exhausted { attempts: u32, last: E },
    /// The signal fired during a backoff wait.
    Cancelled,
}

impl From<RetryError<DeeplError>> for DeeplError {
    fn from(err: RetryError<DeeplError>) -> Self {
        match err {
            RetryError::Fatal(err) => err,
            RetryError::Exhausted { attempts, last } => DeeplError::Exhausted {
                attempts,
                last: Box::new(last),
            },
            RetryError::Cancelled => DeeplError::Cancelled,
        }
    }
}

/// Runs `operation` until it succeeds, fails fatally, exhausts the policy or
/// is cancelled.
///
/// `operation` receives the 0-based attempt index. Attempts never overlap: the
/// next one starts only after the previous future resolved and the backoff
/// wait for its index elapsed.
pub async fn retry<T, E, Op, Fut, P>(
    policy: &RetryPolicy,
    cancellation: &Cancellation,
    mut should_retry: P,
    mut operation: Op,
) -> std::result::Result<T, RetryError<E>>
where
    Op: FnMut(u32) -> Fut,
    Fut: Future<Output = std::result::Result<T, E>>,
    P: FnMut(&E) -> bool,
{
    let mut attempt = 0u32;
    loop {
        let err = match operation(attempt).await {
            Ok(value) => return Ok(value),
            Err(err) => err,
        };

        if !should_retry(&err) {
            #[cfg(feature = "tracing")]
            tracing::debug!(attempt, "failure is not retriable");
            return Err(RetryError::Fatal(err));
        }

        let attempts = attempt + 1;
        if attempts >= policy.max_attempts {
            #[cfg(feature = "tracing")]
            tracing::debug!(attempts, "retry budget exhausted");
            return Err(RetryError::Exhausted { attempts, last: err });
        }

        let delay = policy.backoff.delay(attempt);

        #[cfg(feature = "tracing")]
        tracing::debug!(
            attempt = attempts,
            delay_ms = delay.as_millis() as u64,
            "retrying after transient failure"
        );

        tokio::select! {
            biased;
            () = cancellation.cancelled() => return Err(RetryError::Cancelled),
            () = sleep(delay) => {}
        }
        attempt = attempts;
    }
}
