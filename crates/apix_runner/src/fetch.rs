//! Recovers the results of triggered runs.
//!
//! Every identifier returned by a trigger becomes one independent unit of work, spawned onto
//! the runtime. A unit sends exactly one [ResultBatch] to the aggregator, unless the run is
//! cancelled before it finishes. Every call a unit makes to the service goes through a shared
//! semaphore, which bounds how many calls are in flight at once. Units hold no permit while
//! they sleep between polls, so they proceed independently of each other.

use std::{future::Future, sync::Arc, time::Duration};

use tokio::{
    sync::{mpsc, Semaphore},
    time::Instant,
};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::{
    api::{ApiError, ApiTester, AsyncResponse, ProjectMeta, TestMeta},
    config::Suite,
    outcome::{event_url, ResultBatch, ResultRecord},
};

pub const DEFAULT_MAX_WAIT: Duration = Duration::from_secs(180);
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(5);

/// How long to wait for a single event result, and how often to ask for it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollTiming {
    pub max_wait: Duration,
    pub interval: Duration,
}

impl Default for PollTiming {
    fn default() -> Self {
        Self {
            max_wait: DEFAULT_MAX_WAIT,
            interval: DEFAULT_POLL_INTERVAL,
        }
    }
}

#[derive(Clone)]
pub struct Fetcher {
    api: Arc<dyn ApiTester>,
    results_tx: mpsc::UnboundedSender<ResultBatch>,
    permits: Arc<Semaphore>,
    cancel: CancellationToken,
    app_base_url: Arc<str>,
    timing: PollTiming,
}

/// Everything a unit needs to know about the trigger it came from.
#[derive(Clone)]
struct Group {
    hook_id: Arc<str>,
    fallback_project: ProjectMeta,
    max_wait: Duration,
}

impl Fetcher {
    pub fn new(
        api: Arc<dyn ApiTester>,
        results_tx: mpsc::UnboundedSender<ResultBatch>,
        concurrency: usize,
        cancel: CancellationToken,
        app_base_url: &str,
    ) -> Self {
        Self {
            api,
            results_tx,
            permits: Arc::new(Semaphore::new(concurrency.max(1))),
            cancel,
            app_base_url: app_base_url.into(),
            timing: PollTiming::default(),
        }
    }

    pub fn with_timing(mut self, timing: PollTiming) -> Self {
        self.timing = timing;
        self
    }

    fn group(&self, suite: &Suite) -> Group {
        Group {
            hook_id: suite.hook_id.as_str().into(),
            fallback_project: ProjectMeta {
                id: suite.project_id.clone(),
                name: suite.project_name.clone(),
            },
            max_wait: suite.timeout().unwrap_or(self.timing.max_wait),
        }
    }

    /// Reports the tests of a trigger without waiting for their results.
    ///
    /// Returns the number of units spawned, one per test id.
    pub fn fetch_test_details(&self, suite: &Suite, response: &AsyncResponse) -> usize {
        let AsyncResponse {
            event_ids,
            test_ids,
            ..
        } = response;

        if test_ids.len() != event_ids.len() {
            warn!(
                suite = %suite.name,
                test_ids = test_ids.len(),
                event_ids = event_ids.len(),
                "number of test ids does not match the number of events; expecting one result per test id"
            );
        }

        let units = test_ids.len();
        if units == 0 && event_ids.is_empty() {
            return 0;
        }

        let this = self.clone();
        let group = self.group(suite);
        let event_ids = event_ids.clone();
        let test_ids = test_ids.clone();

        tokio::spawn(async move {
            let project = this.project_meta(&group).await;
            this.log_started(&project, &event_ids);

            for test_id in test_ids {
                let this = this.clone();
                let group = group.clone();
                let project = project.clone();
                tokio::spawn(async move {
                    this.unit(this.pending_test(group, project, test_id)).await
                });
            }
        });

        units
    }

    /// Reports an uploaded local test without waiting for its result.
    ///
    /// Local tests have no id on the service, so the test is reported under `test_name` and the
    /// configured project. Returns the one unit spawned.
    pub fn local_test_details(
        &self,
        suite: &Suite,
        response: &AsyncResponse,
        test_name: &str,
    ) -> usize {
        let project = self.group(suite).fallback_project;
        self.log_started(&project, &response.event_ids);

        let test = TestMeta {
            id: String::new(),
            name: test_name.to_owned(),
        };
        let record = ResultRecord::pending(test, project);

        let this = self.clone();
        tokio::spawn(async move { this.unit(async move { vec![record] }).await });

        1
    }

    fn log_started(&self, project: &ProjectMeta, event_ids: &[String]) {
        for event_id in event_ids {
            info!(
                project = %project.name,
                report = %event_url(&self.app_base_url, &project.id, event_id),
                "test started"
            );
        }
    }

    /// Polls for the result of every event of a trigger.
    ///
    /// Returns the number of units spawned, one per event id.
    pub fn poll_event_results(&self, suite: &Suite, response: &AsyncResponse) -> usize {
        let units = response.event_ids.len();
        if units == 0 {
            return 0;
        }

        let this = self.clone();
        let group = self.group(suite);
        let event_ids = response.event_ids.clone();

        tokio::spawn(async move {
            let project = this.project_meta(&group).await;

            for event_id in event_ids {
                let this = this.clone();
                let group = group.clone();
                let project = project.clone();
                let start = Instant::now();
                tokio::spawn(async move {
                    this.unit(this.poll_event(group, project, event_id, start))
                        .await
                });
            }
        });

        units
    }

    /// Runs one unit and forwards its batch.
    ///
    /// Cancellation drops the unit at its next suspension point without sending anything.
    async fn unit(&self, work: impl Future<Output = ResultBatch>) {
        let batch = tokio::select! {
            _ = self.cancel.cancelled() => return,
            batch = work => batch,
        };

        if self.results_tx.send(batch).is_err() {
            debug!("dropping result batch; the aggregator stopped consuming");
        }
    }

    /// Makes one call to the service once a permit is free. The permit is released as soon as
    /// the call returns.
    async fn call<T>(
        &self,
        call: impl Future<Output = Result<T, ApiError>>,
    ) -> Result<T, ApiError> {
        let _permit = self
            .permits
            .acquire()
            .await
            .map_err(|_| ApiError::Transport("fetcher is shut down".to_owned()))?;
        call.await
    }

    async fn project_meta(&self, group: &Group) -> ProjectMeta {
        match self.call(self.api.get_project(&group.hook_id)).await {
            Ok(project) => project,
            Err(error) => {
                warn!(
                    %error,
                    project = %group.fallback_project.name,
                    "failed to fetch project metadata; using configured values"
                );
                group.fallback_project.clone()
            }
        }
    }

    async fn pending_test(
        &self,
        group: Group,
        project: ProjectMeta,
        test_id: String,
    ) -> ResultBatch {
        let test = match self.call(self.api.get_test(&group.hook_id, &test_id)).await {
            Ok(test) => test,
            Err(error) => {
                warn!(%error, %test_id, "failed to fetch test metadata");
                TestMeta {
                    id: test_id,
                    name: String::new(),
                }
            }
        };

        vec![ResultRecord::pending(test, project)]
    }

    /// Polls until the event has a result, or until `group.max_wait` has passed since `start`.
    async fn poll_event(
        &self,
        group: Group,
        project: ProjectMeta,
        event_id: String,
        start: Instant,
    ) -> ResultBatch {
        loop {
            let read = self.call(self.api.get_event_result(&group.hook_id, &event_id));
            match read.await {
                Ok(event) => return vec![ResultRecord::from_event(event, &project)],
                Err(error) if !error.is_not_found() => {
                    error!(%error, %event_id, project = %project.name, "failed to fetch test result");
                    return vec![ResultRecord::hard_failure(event_id, project)];
                }
                Err(_) => {}
            }

            if start.elapsed() >= group.max_wait {
                warn!(
                    %event_id,
                    project = %project.name,
                    max_wait = ?group.max_wait,
                    "gave up waiting for test result"
                );
                return vec![ResultRecord::timed_out(event_id, project)];
            }

            tokio::time::sleep(self.timing.interval).await;
        }
    }
}
