use std::{fs, io::Write, path::PathBuf};

use apix_reporting::{ReportedResult, Reporter, ReportingError, Status};
use junit_report as junit;

pub struct Collector {
    test_suite: junit::TestSuite,
}

fn get_current_timestamp() -> junit::OffsetDateTime {
    if cfg!(test) {
        junit::OffsetDateTime::UNIX_EPOCH
    } else {
        junit::OffsetDateTime::now_utc()
    }
}

impl Collector {
    pub fn new(test_suite_name: &str) -> Self {
        let mut test_suite = junit::TestSuite::new(test_suite_name);
        test_suite.set_timestamp(get_current_timestamp());

        Self { test_suite }
    }

    pub fn push_result(&mut self, result: &ReportedResult) {
        let ReportedResult {
            name,
            url,
            status,
            duration,
            timed_out,
            started_at: _,
            finished_at: _,
        } = result;

        let duration = junit::Duration::milliseconds(duration.as_millis() as _);
        let message = url.as_deref().unwrap_or_default();

        let test_case = match (status, timed_out) {
            (Status::Failed, _) => junit::TestCase::failure(name, duration, "failure", message),
            (_, true) => junit::TestCase::error(name, duration, "timed out", message),
            (Status::Passed, false) => junit::TestCase::success(name, duration),
            (Status::InProgress, false) => junit::TestCase::skipped(name),
        };

        self.test_suite.add_testcase(test_case);
    }

    pub fn write_xml(self, writer: impl Write) -> Result<(), String> {
        let mut junit_report = junit::Report::new();
        junit_report.add_testsuite(self.test_suite);
        junit_report.write_xml(writer).map_err(|e| e.to_string())
    }
}

/// Collects all results and writes them as a JUnit XML file on render.
pub struct JUnitXmlReporter {
    path: PathBuf,
    collector: Collector,
}

impl JUnitXmlReporter {
    pub fn new(path: PathBuf, test_suite_name: &str) -> Self {
        Self {
            path,
            collector: Collector::new(test_suite_name),
        }
    }
}

impl Reporter for JUnitXmlReporter {
    fn add(&mut self, result: &ReportedResult) -> Result<(), ReportingError> {
        self.collector.push_result(result);
        Ok(())
    }

    fn render(self: Box<Self>) -> Result<(), ReportingError> {
        let Self { path, collector } = *self;
        let fd = fs::OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(path)?;
        collector
            .write_xml(fd)
            .map_err(|_| ReportingError::FailedToFormat)
    }
}

#[cfg(test)]
mod test {
    use std::time::Duration;

    use apix_reporting::{ReportedResult, Reporter, Status};
    use apix_reporting_test_utils::default_result;

    use crate::{Collector, JUnitXmlReporter};

    fn result(name: &str, status: Status, millis: u64) -> ReportedResult {
        ReportedResult {
            name: name.to_owned(),
            url: None,
            status,
            duration: Duration::from_millis(millis),
            ..default_result()
        }
    }

    #[test]
    fn generates_junit_xml_for_all_statuses() {
        let mut collector = Collector::new("suite");
        collector.push_result(&result("petstore - test1", Status::Passed, 11));
        collector.push_result(&ReportedResult {
            url: Some("https://app/event/e2".to_owned()),
            ..result("petstore - test2", Status::Failed, 22)
        });
        collector.push_result(&ReportedResult {
            timed_out: true,
            ..result("petstore - test3", Status::InProgress, 0)
        });
        collector.push_result(&result("petstore - test4", Status::InProgress, 44));

        let mut buf = vec![];
        collector.write_xml(&mut buf).expect("failed to write");
        let xml = String::from_utf8(buf).expect("not utf8 XML");

        assert_eq!(
            xml,
            concat!(
                r#"<?xml version="1.0" encoding="utf-8"?>"#,
                r#"<testsuites>"#,
                r#"<testsuite id="0" name="suite" package="testsuite/suite" tests="4" errors="1" failures="1" hostname="localhost" timestamp="1970-01-01T00:00:00Z" time="0.033">"#,
                r#"<testcase name="petstore - test1" time="0.011"/>"#,
                r#"<testcase name="petstore - test2" time="0.022">"#,
                r#"<failure type="failure" message="https://app/event/e2"/>"#,
                r#"</testcase>"#,
                r#"<testcase name="petstore - test3" time="0">"#,
                r#"<error type="timed out" message=""/>"#,
                r#"</testcase>"#,
                r#"<testcase name="petstore - test4" time="0">"#,
                r#"<skipped/>"#,
                r#"</testcase>"#,
                r#"</testsuite>"#,
                r#"</testsuites>"#,
            )
        );
    }

    #[test]
    fn render_writes_report_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("results.xml");

        let mut reporter = Box::new(JUnitXmlReporter::new(path.clone(), "apix"));
        reporter
            .add(&result("petstore - test1", Status::Passed, 11))
            .unwrap();
        reporter.render().unwrap();

        let xml = std::fs::read_to_string(path).unwrap();
        assert!(xml.contains(r#"<testcase name="petstore - test1" time="0.011"/>"#));
    }
}
