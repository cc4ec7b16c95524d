use std::io::Write;

use apix_reporting::{
    output::{format_result_line, format_result_summary, format_summary_counts, SummaryCounts},
    ReportedResult, Reporter, ReportingError,
};
use termcolor::WriteColor;

/// Streams all test results line-by-line to an output buffer, and prints a summary of failing
/// and timed-out tests at the end.
pub struct LineReporter<W = Box<dyn WriteColor + Send>> {
    /// The output buffer.
    buffer: W,

    /// Failures for which a longer summary should be printed at the end.
    delayed_summaries: Vec<ReportedResult>,

    counts: SummaryCounts,
}

impl<W: WriteColor + Send> LineReporter<W> {
    pub fn new(buffer: W) -> Self {
        Self {
            buffer,
            delayed_summaries: Default::default(),
            counts: Default::default(),
        }
    }
}

impl<W: WriteColor + Send> Reporter for LineReporter<W> {
    fn add(&mut self, result: &ReportedResult) -> Result<(), ReportingError> {
        format_result_line(&mut self.buffer, result)?;

        self.counts.account(result);
        if result.is_fail_like() {
            self.delayed_summaries.push(result.clone());
        }

        Ok(())
    }

    fn render(mut self: Box<Self>) -> Result<(), ReportingError> {
        let delayed_summaries = std::mem::take(&mut self.delayed_summaries);
        for result in delayed_summaries.iter() {
            writeln!(self.buffer)?;
            format_result_summary(&mut self.buffer, result)?;
        }

        writeln!(self.buffer)?;
        format_summary_counts(&mut self.buffer, &self.counts)?;

        self.buffer
            .flush()
            .map_err(|_| ReportingError::FailedToWrite)?;

        Ok(())
    }
}

#[cfg(test)]
mod test {
    use apix_reporting::{ReportedResult, Reporter, Status};
    use apix_reporting_test_utils::{default_result, MockWriter};

    use super::LineReporter;

    fn with_reporter(f: impl FnOnce(Box<LineReporter<&mut MockWriter>>)) -> MockWriter {
        let mut mock_writer = MockWriter::default();
        f(Box::new(LineReporter::new(&mut mock_writer)));
        mock_writer
    }

    #[test]
    fn write_on_result() {
        let MockWriter {
            buffer,
            num_writes,
            num_flushes,
        } = with_reporter(|mut reporter| {
            reporter.add(&default_result()).unwrap();
            reporter.add(&default_result()).unwrap();
        });

        assert!(!buffer.is_empty());
        assert!(num_writes > 1);
        assert_eq!(num_flushes, 0);
    }

    #[test]
    fn flush_buffer_on_render() {
        let MockWriter { num_flushes, .. } =
            with_reporter(|reporter| reporter.render().unwrap());

        assert_eq!(num_flushes, 1);
    }

    #[test]
    fn formats_results_as_lines() {
        let MockWriter { buffer, .. } = with_reporter(|mut reporter| {
            reporter
                .add(&ReportedResult {
                    name: "petstore - get pet".to_owned(),
                    ..default_result()
                })
                .unwrap();
            reporter
                .add(&ReportedResult {
                    name: "petstore - add pet".to_owned(),
                    status: Status::Failed,
                    ..default_result()
                })
                .unwrap();
            reporter
                .add(&ReportedResult {
                    name: "petstore".to_owned(),
                    url: Some(
                        "https://app.saucelabs.com/api-testing/project/p1/event/e3".to_owned(),
                    ),
                    status: Status::InProgress,
                    timed_out: true,
                    ..default_result()
                })
                .unwrap();
            reporter
                .add(&ReportedResult {
                    name: "petstore - delete pet".to_owned(),
                    url: None,
                    status: Status::InProgress,
                    ..default_result()
                })
                .unwrap();
            reporter.render().unwrap();
        });

        let output = String::from_utf8(buffer).expect("output should be formatted as utf8");
        insta::assert_snapshot!(output, @r###"
        petstore - get pet: ok
        petstore - add pet: FAILED
        petstore: TIMED OUT
        petstore - delete pet: in progress

        --- petstore - add pet: FAILED ---
        report: https://app.saucelabs.com/api-testing/project/p1/event/e1
        (completed in 1 m, 15 s, 3 ms)

        --- petstore: TIMED OUT ---
        report: https://app.saucelabs.com/api-testing/project/p1/event/e3
        (gave up waiting for a result)

        --- apix summary ---
        4 tests, 1 passed, 1 failed, 1 timed out, 1 in progress
        "###);
    }
}
