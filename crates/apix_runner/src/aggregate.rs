//! The single consumption point for all results of a run.

use std::{
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    },
    time::Duration,
};

use apix_reporting::Reporter;
use apix_utils::{log_assert, stop_signal};
use tokio::{sync::mpsc, task::JoinHandle, time::Instant};
use tracing::{error, info};

use crate::{
    config::DEFAULT_COLLECT_TIMEOUT,
    outcome::{Outcome, ResultBatch, ResultRecord},
};

pub const PROGRESS_INTERVAL: Duration = Duration::from_secs(10);

pub struct Aggregator {
    reporters: Vec<Box<dyn Reporter>>,
    app_base_url: String,
    progress_interval: Duration,
    collect_timeout: Duration,
}

/// The queue closed while results were still outstanding.
struct QueueClosed;

impl Aggregator {
    pub fn new(reporters: Vec<Box<dyn Reporter>>, app_base_url: &str) -> Self {
        Self {
            reporters,
            app_base_url: app_base_url.to_owned(),
            progress_interval: PROGRESS_INTERVAL,
            collect_timeout: DEFAULT_COLLECT_TIMEOUT,
        }
    }

    pub fn with_collect_timeout(mut self, collect_timeout: Duration) -> Self {
        self.collect_timeout = collect_timeout;
        self
    }

    /// Consumes `expected` result batches, reports every record in them, and renders all
    /// reporters.
    ///
    /// Returns whether the run passed. Never errors; a queue that closes early or a run that
    /// outlives the collect timeout is logged and fails the run.
    pub async fn collect(
        mut self,
        mut results_rx: mpsc::UnboundedReceiver<ResultBatch>,
        expected: usize,
    ) -> bool {
        let remaining = Arc::new(AtomicUsize::new(expected));
        let (stop_progress, progress) = self.start_progress(remaining.clone());

        let mut passed = true;
        let collect_timeout = self.collect_timeout;
        let consumed = tokio::time::timeout(
            collect_timeout,
            self.consume(&mut results_rx, &remaining, &mut passed),
        )
        .await;

        match consumed {
            Ok(Ok(())) => {}
            Ok(Err(QueueClosed)) => {
                error!(
                    remaining = remaining.load(Ordering::SeqCst),
                    "all result producers exited before every result arrived"
                );
                passed = false;
            }
            Err(_) => {
                error!(
                    remaining = remaining.load(Ordering::SeqCst),
                    timeout = ?collect_timeout,
                    "timed out collecting results"
                );
                passed = false;
            }
        }

        stop_progress.stop();
        if let Err(error) = progress.await {
            error!(%error, "progress logger failed");
        }

        for reporter in self.reporters {
            if let Err(error) = reporter.render() {
                error!(%error, "failed to render report");
            }
        }

        passed
    }

    async fn consume(
        &mut self,
        results_rx: &mut mpsc::UnboundedReceiver<ResultBatch>,
        remaining: &AtomicUsize,
        passed: &mut bool,
    ) -> Result<(), QueueClosed> {
        while remaining.load(Ordering::SeqCst) > 0 {
            let batch = results_rx.recv().await.ok_or(QueueClosed)?;
            log_assert!(!batch.is_empty(), "received an empty result batch");

            remaining.fetch_sub(1, Ordering::SeqCst);

            for record in batch {
                if !self.handle(record) {
                    *passed = false;
                }
            }
        }
        Ok(())
    }

    /// Reports one record. Returns false if it fails the run.
    fn handle(&mut self, record: ResultRecord) -> bool {
        let reported = record.to_reported(&self.app_base_url);
        let report = reported.url.as_deref().unwrap_or_default();

        match record.outcome {
            Outcome::Passed => {
                info!(
                    project = %record.project.name,
                    test = %record.test.name,
                    report,
                    "test finished"
                );
            }
            Outcome::Failed { count } => {
                error!(
                    failures = count,
                    project = %record.project.name,
                    test = %record.test.name,
                    report,
                    "test finished with errors"
                );
            }
            Outcome::TimedOut => {
                error!(
                    project = %record.project.name,
                    report,
                    "test did not finish in time"
                );
            }
            Outcome::Pending => {}
        }

        for reporter in self.reporters.iter_mut() {
            if let Err(error) = reporter.add(&reported) {
                error!(%error, name = %reported.name, "failed to report test result");
            }
        }

        !record.outcome.fails_run()
    }

    fn start_progress(
        &self,
        remaining: Arc<AtomicUsize>,
    ) -> (stop_signal::StopTx, JoinHandle<()>) {
        let (stop_tx, mut stop_rx) = stop_signal::make_pair();
        let period = self.progress_interval;

        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
            loop {
                tokio::select! {
                    biased;
                    _ = &mut stop_rx => break,
                    _ = ticker.tick() => {
                        info!(remaining = remaining.load(Ordering::SeqCst), "waiting for results");
                    }
                }
            }
        });

        (stop_tx, handle)
    }
}
