//! Fallback poller.
//!
//! Interval-based fetching for state the live channel does not push,
//! or for sessions running on a [`NullTransport`](crate::transport::NullTransport).
//! Each [`PollTarget`] pairs a fetch with a stop condition; the poller
//! runs one target at a time and starting a new one cancels the
//! previous task first, so ticks never overlap and a stale target never
//! outlives its replacement.

use crate::error::Result;
use futures::future::BoxFuture;
use std::future::Future;
use std::time::Duration;
use tokio::task::JoinHandle;

/// What to poll and when to stop.
pub struct PollTarget<S> {
    fetch: Box<dyn Fn() -> BoxFuture<'static, Result<S>> + Send + Sync>,
    stop_condition: Box<dyn Fn(&S) -> bool + Send + Sync>,
    interval: Duration,
    max_attempts: Option<u32>,
}

impl<S: Send + 'static> PollTarget<S> {
    /// A target that fetches every `interval` until `stop_condition`
    /// holds on a snapshot.
    pub fn new<F, Fut, C>(interval: Duration, fetch: F, stop_condition: C) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<S>> + Send + 'static,
        C: Fn(&S) -> bool + Send + Sync + 'static,
    {
        Self {
            fetch: Box::new(move || Box::pin(fetch())),
            stop_condition: Box::new(stop_condition),
            interval,
            max_attempts: None,
        }
    }

    /// Give up after `attempts` ticks even if the condition never holds.
    pub fn max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = Some(attempts);
        self
    }
}

/// Drives at most one [`PollTarget`] at a time.
#[derive(Default)]
pub struct FallbackPoller {
    task: Option<JoinHandle<()>>,
}

impl FallbackPoller {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start polling `target`, delivering each snapshot to
    /// `on_snapshot`. Any previously running target is cancelled before
    /// the new one begins.
    pub fn start<S, H>(&mut self, target: PollTarget<S>, mut on_snapshot: H)
    where
        S: Send + 'static,
        H: FnMut(&S) + Send + 'static,
    {
        self.cancel();
        self.task = Some(tokio::spawn(async move {
            let mut attempts: u32 = 0;
            loop {
                // Sleeping before the fetch (not concurrently with it)
                // keeps ticks strictly sequential even when a fetch
                // takes longer than the interval.
                tokio::time::sleep(target.interval).await;
                attempts += 1;
                match (target.fetch)().await {
                    Ok(snapshot) => {
                        let done = (target.stop_condition)(&snapshot);
                        on_snapshot(&snapshot);
                        if done {
                            tracing::debug!(attempts, "poll target satisfied");
                            return;
                        }
                    }
                    Err(e) => {
                        tracing::warn!(error = %e, attempts, "poll tick failed");
                    }
                }
                if let Some(max) = target.max_attempts {
                    if attempts >= max {
                        tracing::warn!(max, "poll target gave up");
                        return;
                    }
                }
            }
        }));
    }

    /// Stop the running target, if any.
    pub fn cancel(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }

    /// Whether a target is still running.
    pub fn is_active(&self) -> bool {
        self.task.as_ref().is_some_and(|t| !t.is_finished())
    }
}

impl Drop for FallbackPoller {
    fn drop(&mut self) {
        self.cancel();
    }
}
