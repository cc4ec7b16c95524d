//! Runs a whole project: resolve suites, dispatch, collect.

use std::sync::Arc;

use apix_reporting::Reporter;
use apix_utils::exit::ExitCode;
use thiserror::Error;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::{
    aggregate::Aggregator,
    api::ApiTester,
    config::{ConfigError, Project},
    dispatch::Dispatcher,
    fetch::{Fetcher, PollTiming},
    hooks::{self, HookError},
};

#[derive(Debug, Error)]
pub enum RunnerError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("failed to prepare suites:\n{}", format_hook_errors(.0))]
    PrepareSuites(Vec<HookError>),
}

fn format_hook_errors(errors: &[HookError]) -> String {
    errors
        .iter()
        .map(|e| format!("  - {e}"))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Logs every trigger a run of `project` would make, without making any.
pub fn log_dry_run(project: &Project) {
    info!(
        config = %project.config_file_path.display(),
        "dry run; no tests will be triggered"
    );
    for suite in project.suites.iter() {
        if suite.runs_local_tests() {
            info!(
                suite = %suite.name,
                project = %suite.project_name,
                root_dir = %project.root_dir.display(),
                test_match = ?suite.test_match,
                "would run local tests"
            );
            continue;
        }
        if suite.runs_all() {
            info!(suite = %suite.name, project = %suite.project_name, "would run all tests");
            continue;
        }
        for test in suite.tests.iter() {
            info!(suite = %suite.name, project = %suite.project_name, %test, "would run test");
        }
        for tag in suite.tags.iter() {
            info!(suite = %suite.name, project = %suite.project_name, %tag, "would run tag");
        }
    }
}

pub struct Runner {
    api: Arc<dyn ApiTester>,
    project: Project,
    app_base_url: String,
    fire_and_forget: bool,
    reporters: Vec<Box<dyn Reporter>>,
    timing: PollTiming,
}

impl Runner {
    /// Prepares a run of `project`, which must already have its defaults set and be validated.
    pub fn new(
        api: Arc<dyn ApiTester>,
        project: Project,
        fire_and_forget: bool,
        reporters: Vec<Box<dyn Reporter>>,
    ) -> Result<Self, RunnerError> {
        let app_base_url = project.region()?.app_base_url().to_owned();
        Ok(Self {
            api,
            project,
            app_base_url,
            fire_and_forget,
            reporters,
            timing: PollTiming::default(),
        })
    }

    pub fn with_poll_timing(mut self, timing: PollTiming) -> Self {
        self.timing = timing;
        self
    }

    pub async fn run_project(mut self) -> Result<ExitCode, RunnerError> {
        if self.project.dry_run {
            log_dry_run(&self.project);
            return Ok(ExitCode::SUCCESS);
        }

        if self.project.suites.is_empty() {
            warn!("no suites to run");
        }

        hooks::resolve_hook_ids(self.api.as_ref(), &mut self.project.suites)
            .await
            .map_err(RunnerError::PrepareSuites)?;

        let passed = self.run_suites().await;
        Ok(ExitCode::from_verdict(passed))
    }

    async fn run_suites(self) -> bool {
        let Self {
            api,
            project,
            app_base_url,
            fire_and_forget,
            reporters,
            timing,
        } = self;

        let (results_tx, results_rx) = mpsc::unbounded_channel();
        let cancel = CancellationToken::new();

        let fetcher = Fetcher::new(
            api.clone(),
            results_tx,
            project.sauce.concurrency,
            cancel.clone(),
            &app_base_url,
        )
        .with_timing(timing);

        let dispatcher = Dispatcher::new(
            api,
            fetcher,
            project.sauce.metadata.build.clone(),
            project.sauce.tunnel.clone(),
            project.root_dir.clone(),
            fire_and_forget,
        );
        let expected = dispatcher.dispatch(&project.suites).await;

        info!(expected, "waiting for results");

        let passed = Aggregator::new(reporters, &app_base_url)
            .with_collect_timeout(project.collect_timeout())
            .collect(results_rx, expected)
            .await;

        // Anything still polling has nobody left to report to.
        cancel.cancel();

        passed
    }
}
