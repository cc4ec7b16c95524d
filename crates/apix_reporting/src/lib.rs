use std::{fmt, time::Duration};

use apix_utils::time::EpochMillis;
use serde_derive::{Deserialize, Serialize};
use thiserror::Error;

pub mod output;

/// The status vocabulary reporters understand.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Status {
    #[serde(rename = "passed")]
    Passed,
    #[serde(rename = "failed")]
    Failed,
    /// The result is not known yet, either because the run was not waited for or because
    /// waiting for it timed out.
    #[serde(rename = "in progress")]
    InProgress,
}

impl Status {
    pub fn as_str(&self) -> &'static str {
        match self {
            Status::Passed => "passed",
            Status::Failed => "failed",
            Status::InProgress => "in progress",
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A normalized test result, as handed to every [Reporter].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportedResult {
    pub name: String,
    /// Link to the result in the web app. Absent when the run was not waited for.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    pub status: Status,
    pub duration: Duration,
    pub started_at: EpochMillis,
    pub finished_at: EpochMillis,
    pub timed_out: bool,
}

impl ReportedResult {
    /// Whether this result makes the run unsuccessful.
    pub fn is_fail_like(&self) -> bool {
        self.status == Status::Failed || self.timed_out
    }
}

#[derive(Debug, Error)]
pub enum ReportingError {
    #[error("failed to format a test result in the reporting format")]
    FailedToFormat,
    #[error("failed to write a report to an output buffer")]
    FailedToWrite,
    #[error("{0}")]
    Io(#[from] std::io::Error),
}

/// A [`Reporter`] defines a way to emit apix test results.
///
/// A reporter is allowed to be side-effectful.
pub trait Reporter: Send {
    /// Consume the next test result.
    fn add(&mut self, result: &ReportedResult) -> Result<(), ReportingError>;

    /// Consume the reporter and write out whatever it has collected.
    ///
    /// Called exactly once, after the last call to [Self::add].
    fn render(self: Box<Self>) -> Result<(), ReportingError>;
}
