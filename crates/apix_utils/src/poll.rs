//! Bounded polling of remote jobs.
//!
//! A [JobBackend] knows how to read a job and whether a read job has reached a terminal state.
//! [poll_job] reads the job on a fixed interval until it is terminal, or until a deadline
//! elapses, after which exactly one final read is made and returned marked as timed out.

use std::time::Duration;

use async_trait::async_trait;
use tokio::time::{self, Instant, MissedTickBehavior};

/// Substituted for a zero poll timeout; zero never means "don't wait".
pub const DEFAULT_POLL_TIMEOUT: Duration = Duration::from_secs(24 * 60 * 60);

/// The smallest interval [poll_job] will tick at.
const MIN_POLL_INTERVAL: Duration = Duration::from_millis(1);

#[async_trait]
pub trait JobBackend: Send + Sync {
    type Job: Send;
    type Error: Send;

    async fn read_job(&self, id: &str) -> Result<Self::Job, Self::Error>;

    /// Whether the job has reached a state from which it will not transition further.
    fn is_done(&self, job: &Self::Job) -> bool;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PolledJob<J> {
    pub job: J,
    /// Set when the deadline elapsed before a terminal state was observed.
    /// Never set by the backend.
    pub timed_out: bool,
}

/// Polls job `id` every `interval` until it is done or `timeout` elapses.
///
/// The first read happens one `interval` after the call. A read error aborts polling and is
/// returned as-is; retrying reads is the backend's concern.
pub async fn poll_job<B>(
    backend: &B,
    id: &str,
    interval: Duration,
    timeout: Duration,
) -> Result<PolledJob<B::Job>, B::Error>
where
    B: JobBackend + ?Sized,
{
    let timeout = if timeout.is_zero() {
        DEFAULT_POLL_TIMEOUT
    } else {
        timeout
    };
    let interval = interval.max(MIN_POLL_INTERVAL);

    let start = Instant::now();
    let deadline = time::sleep_until(start + timeout);
    tokio::pin!(deadline);

    let mut ticker = time::interval_at(start + interval, interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            biased;

            _ = &mut deadline => {
                let job = backend.read_job(id).await?;
                tracing::debug!(job_id = id, ?timeout, "job did not finish before deadline");
                return Ok(PolledJob { job, timed_out: true });
            }
            _ = ticker.tick() => {
                let job = backend.read_job(id).await?;
                if backend.is_done(&job) {
                    return Ok(PolledJob { job, timed_out: false });
                }
            }
        }
    }
}
