//! Triggers the runs of every suite.

use std::{path::PathBuf, sync::Arc};

use tracing::{error, info, warn};

use crate::{
    api::{ApiError, ApiTester, AsyncResponse, TestRequest, Tunnel},
    config::Suite,
    fetch::Fetcher,
    local,
};

/// What a single trigger runs.
#[derive(Debug, Clone, Copy)]
enum Target<'a> {
    All,
    Test(&'a str),
    Tag(&'a str),
    /// An uploaded local test, by its request name.
    Ephemeral(&'a str),
}

pub struct Dispatcher {
    api: Arc<dyn ApiTester>,
    fetcher: Fetcher,
    build_id: String,
    tunnel: Tunnel,
    root_dir: PathBuf,
    fire_and_forget: bool,
}

impl Dispatcher {
    pub fn new(
        api: Arc<dyn ApiTester>,
        fetcher: Fetcher,
        build_id: String,
        tunnel: Tunnel,
        root_dir: PathBuf,
        fire_and_forget: bool,
    ) -> Self {
        Self {
            api,
            fetcher,
            build_id,
            tunnel,
            root_dir,
            fire_and_forget,
        }
    }

    /// Triggers every suite in order and hands the returned ids off to the fetcher.
    ///
    /// Returns how many result batches to expect. The dispatcher is consumed, so once this
    /// returns, only spawned fetcher units hold on to the result queue.
    pub async fn dispatch(self, suites: &[Suite]) -> usize {
        let mut expected = 0;

        for suite in suites {
            if suite.runs_local_tests() {
                expected += self.dispatch_local(suite).await;
                continue;
            }

            let request = TestRequest {
                params: suite.env.clone(),
                ..Default::default()
            };

            if suite.runs_all() {
                expected += self.trigger(suite, Target::All, &request).await;
                continue;
            }
            for test in suite.tests.iter() {
                expected += self.trigger(suite, Target::Test(test), &request).await;
            }
            for tag in suite.tags.iter() {
                expected += self.trigger(suite, Target::Tag(tag), &request).await;
            }
        }

        expected
    }

    /// Uploads every local test of the suite, in discovery order.
    async fn dispatch_local(&self, suite: &Suite) -> usize {
        let found = {
            let root_dir = self.root_dir.clone();
            let suite = suite.clone();
            tokio::task::spawn_blocking(move || local::suite_requests(&root_dir, &suite)).await
        };
        let requests = match found {
            Ok(Ok(requests)) => requests,
            Ok(Err(error)) => {
                error!(%error, suite = %suite.name, "failed to find local tests");
                return 0;
            }
            Err(error) => {
                error!(%error, suite = %suite.name, "local test discovery did not complete");
                return 0;
            }
        };

        if requests.is_empty() {
            warn!(
                suite = %suite.name,
                root_dir = %self.root_dir.display(),
                test_match = ?suite.test_match,
                "no local tests found; a test is a directory holding a unit and an input file"
            );
            return 0;
        }

        let mut expected = 0;
        for request in requests.iter() {
            info!(project = %suite.project_name, test = %request.name, "running test");
            expected += self
                .trigger(suite, Target::Ephemeral(&request.name), request)
                .await;
        }
        expected
    }

    async fn trigger(&self, suite: &Suite, target: Target<'_>, request: &TestRequest) -> usize {
        let response = match self.run(&suite.hook_id, target, request).await {
            Ok(response) => response,
            Err(error) => {
                match target {
                    Target::All => {
                        error!(%error, project = %suite.project_name, "failed to run project")
                    }
                    Target::Test(test) | Target::Ephemeral(test) => {
                        error!(%error, project = %suite.project_name, test, "failed to run test")
                    }
                    Target::Tag(tag) => {
                        error!(%error, project = %suite.project_name, tag, "failed to run tag")
                    }
                }
                return 0;
            }
        };

        info!(
            suite = %suite.name,
            project = %suite.project_name,
            events = response.event_ids.len(),
            tests = response.test_ids.len(),
            "triggered"
        );

        match (self.fire_and_forget, target) {
            (true, Target::Ephemeral(name)) => {
                self.fetcher.local_test_details(suite, &response, name)
            }
            (true, _) => self.fetcher.fetch_test_details(suite, &response),
            (false, _) => self.fetcher.poll_event_results(suite, &response),
        }
    }

    async fn run(
        &self,
        hook_id: &str,
        target: Target<'_>,
        request: &TestRequest,
    ) -> Result<AsyncResponse, ApiError> {
        let (api, build, tunnel) = (&self.api, &self.build_id, &self.tunnel);
        match target {
            Target::All => api.run_all_async(hook_id, build, tunnel, request).await,
            Target::Test(test) => {
                api.run_test_async(hook_id, test, build, tunnel, request)
                    .await
            }
            Target::Tag(tag) => api.run_tag_async(hook_id, tag, build, tunnel, request).await,
            Target::Ephemeral(_) => {
                api.run_ephemeral_async(hook_id, build, tunnel, request)
                    .await
            }
        }
    }
}
