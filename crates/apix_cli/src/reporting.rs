use std::{fmt::Display, path::PathBuf, str::FromStr};

use apix_json_reporter::JsonReporter;
use apix_junit_xml::JUnitXmlReporter;
use apix_line_reporter::LineReporter;
use apix_reporting::Reporter;
use termcolor::{ColorChoice, StandardStream};

static DEFAULT_JUNIT_XML_PATH: &str = "apix-test-results.xml";
static DEFAULT_JSON_PATH: &str = "apix-test-results.json";

#[derive(PartialEq, Eq, Debug, Clone)]
pub enum ReporterKind {
    /// Writes to stdout
    Stdout,
    /// Writes JUnit XML to a file
    JUnitXml(PathBuf),
    /// Writes a JSON summary to a file
    Json(PathBuf),
}

impl Display for ReporterKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ReporterKind::Stdout => write!(f, "stdout"),
            ReporterKind::JUnitXml(path) => write!(f, "junit-xml={}", path.display()),
            ReporterKind::Json(path) => write!(f, "json={}", path.display()),
        }
    }
}

/// Splits `name[=path]`, falling back to `default` when no path, or a blank one, is given.
fn path_arg(s: &str, name: &str, default: &str) -> Option<PathBuf> {
    let rest = s.strip_prefix(name)?;
    let path = match rest.strip_prefix('=') {
        Some(path) if !path.trim().is_empty() => path,
        Some(_) => default,
        None if rest.is_empty() => default,
        None => return None,
    };
    Some(PathBuf::from(path))
}

impl FromStr for ReporterKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s == "stdout" {
            return Ok(Self::Stdout);
        }
        if let Some(path) = path_arg(s, "junit-xml", DEFAULT_JUNIT_XML_PATH) {
            return Ok(Self::JUnitXml(path));
        }
        if let Some(path) = path_arg(s, "json", DEFAULT_JSON_PATH) {
            return Ok(Self::Json(path));
        }
        Err(format!("Unknown reporter {}", s))
    }
}

/// Builds one reporter per kind, in the order given. Results are fed to them in that order.
pub fn build_reporters(
    kinds: impl IntoIterator<Item = ReporterKind>,
    test_suite_name: &str,
) -> Vec<Box<dyn Reporter>> {
    kinds
        .into_iter()
        .map(|kind| -> Box<dyn Reporter> {
            match kind {
                ReporterKind::Stdout => Box::new(LineReporter::new(StandardStream::stdout(
                    ColorChoice::Auto,
                ))),
                ReporterKind::JUnitXml(path) => {
                    Box::new(JUnitXmlReporter::new(path, test_suite_name))
                }
                ReporterKind::Json(path) => Box::new(JsonReporter::new(path)),
            }
        })
        .collect()
}

#[cfg(test)]
mod test_reporter_kind {
    use super::{ReporterKind, DEFAULT_JSON_PATH, DEFAULT_JUNIT_XML_PATH};
    use std::{path::PathBuf, str::FromStr};

    #[test]
    fn parse_unknown_reporter() {
        assert_eq!(
            ReporterKind::from_str("not-a-reporter"),
            Err("Unknown reporter not-a-reporter".to_string())
        );
    }

    #[test]
    fn parse_stdout_reporter() {
        assert_eq!(ReporterKind::from_str("stdout"), Ok(ReporterKind::Stdout));
    }

    #[test]
    fn parse_junit_reporter_with_path() {
        assert_eq!(
            ReporterKind::from_str("junit-xml=reports/out.xml"),
            Ok(ReporterKind::JUnitXml(PathBuf::from("reports/out.xml")))
        );
    }

    #[test]
    fn parse_junit_reporter_without_path() {
        for arg in ["junit-xml", "junit-xml=", "junit-xml=  "] {
            assert_eq!(
                ReporterKind::from_str(arg),
                Ok(ReporterKind::JUnitXml(PathBuf::from(DEFAULT_JUNIT_XML_PATH))),
                "{arg}"
            );
        }
    }

    #[test]
    fn parse_json_reporter() {
        assert_eq!(
            ReporterKind::from_str("json"),
            Ok(ReporterKind::Json(PathBuf::from(DEFAULT_JSON_PATH)))
        );
        assert_eq!(
            ReporterKind::from_str("json=out.json"),
            Ok(ReporterKind::Json(PathBuf::from("out.json")))
        );
    }

    #[test]
    fn reporter_name_must_match_exactly() {
        assert!(ReporterKind::from_str("jsonl").is_err());
        assert!(ReporterKind::from_str("junit-xmlfoo").is_err());
    }

    #[test]
    fn display_round_trips() {
        let kind = ReporterKind::JUnitXml(PathBuf::from("out.xml"));
        assert_eq!(ReporterKind::from_str(&kind.to_string()), Ok(kind));
    }
}
