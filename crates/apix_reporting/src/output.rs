use std::{io, time::Duration};

use termcolor::{Color, ColorSpec, WriteColor};

use crate::{ReportedResult, Status};

const MILLIS_IN_SECOND: u64 = 1000;

/// Running totals over the results a reporter has seen.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SummaryCounts {
    pub passed: u64,
    pub failed: u64,
    pub timed_out: u64,
    pub in_progress: u64,
}

impl SummaryCounts {
    pub fn account(&mut self, result: &ReportedResult) {
        match (result.status, result.timed_out) {
            (Status::Failed, _) => self.failed += 1,
            (_, true) => self.timed_out += 1,
            (Status::Passed, false) => self.passed += 1,
            (Status::InProgress, false) => self.in_progress += 1,
        }
    }

    pub fn total(&self) -> u64 {
        self.passed + self.failed + self.timed_out + self.in_progress
    }

    pub fn num_failing(&self) -> u64 {
        self.failed + self.timed_out
    }
}

/// Formats a test result on a single line.
pub fn format_result_line(writer: &mut impl WriteColor, result: &ReportedResult) -> io::Result<()> {
    write!(writer, "{}: ", &result.name)?;
    format_status(writer, result)?;
    writeln!(writer)
}

/// Formats the longer description of a failing result, printed after all results are in.
pub fn format_result_summary(
    writer: &mut impl WriteColor,
    result: &ReportedResult,
) -> io::Result<()> {
    write!(writer, "--- {}: ", &result.name)?;
    format_status(writer, result)?;
    writeln!(writer, " ---")?;
    if let Some(url) = &result.url {
        writeln!(writer, "report: {url}")?;
    }
    if result.timed_out {
        writeln!(writer, "(gave up waiting for a result)")
    } else {
        write!(writer, "(completed in ")?;
        format_duration(writer, result.duration)?;
        writeln!(writer, ")")
    }
}

pub fn format_summary_counts(writer: &mut impl WriteColor, counts: &SummaryCounts) -> io::Result<()> {
    let SummaryCounts {
        passed,
        failed,
        timed_out,
        in_progress,
    } = *counts;

    writeln!(writer, "--- apix summary ---")?;
    with_color_spec(writer, &bold_spec(), |w| {
        write!(w, "{} tests", counts.total())
    })?;
    write!(writer, ", ")?;
    with_color_spec(writer, &green_bold_spec(), |w| write!(w, "{passed} passed"))?;
    write!(writer, ", ")?;
    with_color_spec(writer, &failing_spec(failed), |w| write!(w, "{failed} failed"))?;
    write!(writer, ", ")?;
    with_color_spec(writer, &failing_spec(timed_out), |w| {
        write!(w, "{timed_out} timed out")
    })?;
    write!(writer, ", ")?;
    with_color(writer, Color::Yellow, |w| write!(w, "{in_progress} in progress"))?;
    writeln!(writer)
}

pub fn format_duration(writer: &mut impl io::Write, duration: Duration) -> io::Result<()> {
    const MILLIS_IN_MINUTE: u64 = 60 * MILLIS_IN_SECOND;

    let millis = duration.as_millis() as u64;
    let (minutes, millis) = (millis / MILLIS_IN_MINUTE, millis % MILLIS_IN_MINUTE);
    let (seconds, millis) = (millis / MILLIS_IN_SECOND, millis % MILLIS_IN_SECOND);

    let mut written = false;
    if minutes > 0 {
        write!(writer, "{minutes} m")?;
        written = true;
    }
    if seconds > 0 {
        if written {
            write!(writer, ", ")?;
        }
        write!(writer, "{seconds} s")?;
        written = true;
    }
    if millis > 0 || !written {
        if written {
            write!(writer, ", ")?;
        }
        write!(writer, "{millis} ms")?;
    }

    Ok(())
}

fn bold_spec() -> ColorSpec {
    let mut spec = ColorSpec::new();
    spec.set_bold(true);
    spec
}

fn green_bold_spec() -> ColorSpec {
    let mut spec = ColorSpec::new();
    spec.set_fg(Some(Color::Green)).set_bold(true);
    spec
}

fn failing_spec(num_failing: u64) -> ColorSpec {
    if num_failing == 0 {
        ColorSpec::new()
    } else {
        let mut spec = ColorSpec::new();
        spec.set_fg(Some(Color::Red)).set_bold(true);
        spec
    }
}

fn status_color(result: &ReportedResult) -> Color {
    match (result.status, result.timed_out) {
        (Status::Failed, _) | (_, true) => Color::Red,
        (Status::Passed, false) => Color::Green,
        (Status::InProgress, false) => Color::Yellow,
    }
}

fn with_color<W>(
    writer: &mut W,
    color: Color,
    f: impl FnOnce(&mut W) -> io::Result<()>,
) -> io::Result<()>
where
    W: WriteColor,
{
    with_color_spec(writer, ColorSpec::new().set_fg(Some(color)), f)
}

fn with_color_spec<W>(
    writer: &mut W,
    color_spec: &ColorSpec,
    f: impl FnOnce(&mut W) -> io::Result<()>,
) -> io::Result<()>
where
    W: WriteColor,
{
    writer.set_color(color_spec)?;
    f(writer)?;
    writer.reset()
}

fn format_status(writer: &mut impl WriteColor, result: &ReportedResult) -> io::Result<()> {
    let color = status_color(result);
    let status = match (result.status, result.timed_out) {
        (Status::Failed, _) => "FAILED",
        (_, true) => "TIMED OUT",
        (Status::Passed, false) => "ok",
        (Status::InProgress, false) => "in progress",
    };

    with_color(writer, color, |w| write!(w, "{status}"))
}
