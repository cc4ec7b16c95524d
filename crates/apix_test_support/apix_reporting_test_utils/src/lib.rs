use std::{io, time::Duration};

use apix_reporting::{ReportedResult, Status};
use apix_utils::time::EpochMillis;

#[derive(Default)]
pub struct MockWriter {
    pub buffer: Vec<u8>,
    pub num_writes: u64,
    pub num_flushes: u64,
}

impl termcolor::WriteColor for &mut MockWriter {
    fn supports_color(&self) -> bool {
        false
    }

    fn set_color(&mut self, _spec: &termcolor::ColorSpec) -> io::Result<()> {
        Ok(())
    }

    fn reset(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl io::Write for MockWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.buffer.extend(buf);
        self.num_writes += 1;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.num_flushes += 1;
        Ok(())
    }
}

#[allow(clippy::identity_op)]
pub fn default_result() -> ReportedResult {
    let duration = Duration::from_millis(1 * 60 * 1000 + 15 * 1000 + 3);
    let finished_at = EpochMillis::from_millis(1_700_000_000_000);
    ReportedResult {
        name: "default project - default test".to_owned(),
        url: Some(
            "https://app.saucelabs.com/api-testing/project/p1/event/e1".to_owned(),
        ),
        status: Status::Passed,
        duration,
        started_at: finished_at.minus(duration),
        finished_at,
        timed_out: false,
    }
}
