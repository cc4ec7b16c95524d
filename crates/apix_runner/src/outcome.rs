//! Normalized terminal results of a unit of work, and how they map onto reporter statuses.

use std::time::Duration;

use apix_reporting::{ReportedResult, Status};
use apix_utils::time::EpochMillis;

use crate::api::{EventResult, ProjectMeta, TestMeta};

/// The terminal state of one unit of work.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Passed,
    Failed {
        count: u32,
    },
    /// The run was triggered but never waited for.
    Pending,
    /// Gave up waiting for the result.
    TimedOut,
}

impl Outcome {
    pub fn from_failures(count: u32) -> Self {
        if count == 0 {
            Outcome::Passed
        } else {
            Outcome::Failed { count }
        }
    }

    pub fn status(&self) -> Status {
        match self {
            Outcome::Passed => Status::Passed,
            Outcome::Failed { .. } => Status::Failed,
            Outcome::Pending | Outcome::TimedOut => Status::InProgress,
        }
    }

    /// Whether a record with this outcome makes the whole run fail.
    pub fn fails_run(&self) -> bool {
        match self {
            Outcome::Passed | Outcome::Pending => false,
            Outcome::Failed { .. } | Outcome::TimedOut => true,
        }
    }
}

/// What one fetcher unit sends to the aggregator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResultRecord {
    pub event_id: Option<String>,
    pub test: TestMeta,
    pub project: ProjectMeta,
    pub execution_time: Duration,
    pub outcome: Outcome,
    pub finished_at: EpochMillis,
}

/// Every fetcher unit sends exactly one batch.
pub type ResultBatch = Vec<ResultRecord>;

impl ResultRecord {
    /// A result the remote service finished processing.
    ///
    /// The service's own project metadata wins; `project` fills in when it is missing.
    pub fn from_event(event: EventResult, project: &ProjectMeta) -> Self {
        let EventResult {
            event_id,
            failures_count,
            project: event_project,
            test,
            execution_time_seconds,
        } = event;

        let project = if event_project.name.is_empty() {
            project.clone()
        } else {
            event_project
        };

        Self {
            event_id: Some(event_id),
            test,
            project,
            execution_time: Duration::from_secs(execution_time_seconds),
            outcome: Outcome::from_failures(failures_count),
            finished_at: EpochMillis::now(),
        }
    }

    /// The result of an event could not be fetched.
    pub fn hard_failure(event_id: String, project: ProjectMeta) -> Self {
        Self::unresolved(event_id, project, Outcome::Failed { count: 1 })
    }

    pub fn timed_out(event_id: String, project: ProjectMeta) -> Self {
        Self::unresolved(event_id, project, Outcome::TimedOut)
    }

    pub fn pending(test: TestMeta, project: ProjectMeta) -> Self {
        Self {
            event_id: None,
            test,
            project,
            execution_time: Duration::ZERO,
            outcome: Outcome::Pending,
            finished_at: EpochMillis::now(),
        }
    }

    fn unresolved(event_id: String, project: ProjectMeta, outcome: Outcome) -> Self {
        Self {
            event_id: Some(event_id),
            test: TestMeta::default(),
            project,
            execution_time: Duration::ZERO,
            outcome,
            finished_at: EpochMillis::now(),
        }
    }

    pub fn display_name(&self) -> String {
        if self.test.name.is_empty() {
            self.project.name.clone()
        } else {
            format!("{} - {}", self.project.name, self.test.name)
        }
    }

    /// Link to the result in the web app. Pending runs have nothing to link to yet.
    pub fn report_url(&self, app_base_url: &str) -> Option<String> {
        if self.outcome == Outcome::Pending {
            return None;
        }
        let event_id = self.event_id.as_deref()?;
        Some(event_url(app_base_url, &self.project.id, event_id))
    }

    pub fn to_reported(&self, app_base_url: &str) -> ReportedResult {
        ReportedResult {
            name: self.display_name(),
            url: self.report_url(app_base_url),
            status: self.outcome.status(),
            duration: self.execution_time,
            started_at: self.finished_at.minus(self.execution_time),
            finished_at: self.finished_at,
            timed_out: self.outcome == Outcome::TimedOut,
        }
    }
}

pub fn event_url(app_base_url: &str, project_id: &str, event_id: &str) -> String {
    format!("{app_base_url}/api-testing/project/{project_id}/event/{event_id}")
}
