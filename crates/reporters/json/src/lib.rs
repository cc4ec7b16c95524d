use std::{fs, io::Write, path::PathBuf};

use apix_reporting::{ReportedResult, Reporter, ReportingError, Status};
use serde_derive::Serialize;

#[derive(Serialize, Debug, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
struct JsonResult {
    name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    url: Option<String>,
    status: Status,
    duration_millis: u128,
    start_time: u128,
    end_time: u128,
    timed_out: bool,
}

impl From<ReportedResult> for JsonResult {
    fn from(result: ReportedResult) -> Self {
        let ReportedResult {
            name,
            url,
            status,
            duration,
            started_at,
            finished_at,
            timed_out,
        } = result;

        Self {
            name,
            url,
            status,
            duration_millis: duration.as_millis(),
            start_time: started_at.as_millis(),
            end_time: finished_at.as_millis(),
            timed_out,
        }
    }
}

#[derive(Serialize)]
struct JsonReport<'a> {
    passed: bool,
    tests: &'a [JsonResult],
}

#[derive(Default)]
pub struct Collector {
    results: Vec<JsonResult>,
}

impl Collector {
    pub fn push_result(&mut self, result: &ReportedResult) {
        self.results.push(result.clone().into());
    }

    pub fn write_json(&self, writer: impl Write) -> Result<(), ReportingError> {
        let report = JsonReport {
            passed: self
                .results
                .iter()
                .all(|r| r.status != Status::Failed && !r.timed_out),
            tests: &self.results,
        };
        serde_json::to_writer_pretty(writer, &report).map_err(|_| ReportingError::FailedToFormat)
    }
}

/// Writes all results as one JSON document on render.
pub struct JsonReporter {
    path: PathBuf,
    collector: Collector,
}

impl JsonReporter {
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            collector: Default::default(),
        }
    }
}

impl Reporter for JsonReporter {
    fn add(&mut self, result: &ReportedResult) -> Result<(), ReportingError> {
        self.collector.push_result(result);
        Ok(())
    }

    fn render(self: Box<Self>) -> Result<(), ReportingError> {
        let mut fd = fs::File::create(&self.path)?;
        self.collector.write_json(&mut fd)?;
        fd.flush()?;
        Ok(())
    }
}
