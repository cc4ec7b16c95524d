//! Tests kept on disk, uploaded with every run instead of being stored on the service.
//!
//! A local test is a directory holding a unit file and an input file. Test directories are
//! found under the project's root directory and named by their path relative to it.

use std::{
    collections::BTreeMap,
    fs, io,
    path::{Path, PathBuf},
};

use regex::Regex;
use thiserror::Error;
use tracing::warn;
use walkdir::WalkDir;

use crate::{api::TestRequest, config::Suite};

pub const UNIT_FILE_NAMES: [&str; 2] = ["unit.yaml", "unit.yml"];
pub const INPUT_FILE_NAMES: [&str; 2] = ["input.yaml", "input.yml"];

#[derive(Debug, Error)]
pub enum LocalTestError {
    #[error("failed to walk {}: {source}", root.display())]
    Walk {
        root: PathBuf,
        source: walkdir::Error,
    },
    #[error("no unit file ({}) in {}", UNIT_FILE_NAMES.join(", "), dir.display())]
    MissingUnitFile { dir: PathBuf },
    #[error("no input file ({}) in {}", INPUT_FILE_NAMES.join(", "), dir.display())]
    MissingInputFile { dir: PathBuf },
    #[error("failed to read {}: {source}", path.display())]
    Read { path: PathBuf, source: io::Error },
}

fn find_file(dir: &Path, names: &[&str]) -> Option<PathBuf> {
    names.iter().map(|name| dir.join(name)).find(|p| p.is_file())
}

fn is_test_dir(dir: &Path) -> bool {
    find_file(dir, &UNIT_FILE_NAMES).is_some() && find_file(dir, &INPUT_FILE_NAMES).is_some()
}

/// `path` relative to `root`, with `/` separators. The root itself is `.`.
fn relative_name(root: &Path, path: &Path) -> String {
    let rel = path.strip_prefix(root).unwrap_or(path);
    if rel.as_os_str().is_empty() {
        return ".".to_owned();
    }
    rel.components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

/// Patterns that fail to compile are skipped.
fn compile_patterns(test_match: &[String]) -> Vec<Regex> {
    test_match
        .iter()
        .filter_map(|pattern| match Regex::new(pattern) {
            Ok(re) => Some(re),
            Err(error) => {
                warn!(%pattern, %error, "ignoring invalid test_match pattern");
                None
            }
        })
        .collect()
}

/// Finds every test directory under `root` whose relative name matches any of `test_match`.
/// No patterns match everything.
///
/// Matching directories without both a unit and an input file are skipped. Tests are returned
/// in walk order, with entries of a directory sorted by name.
pub fn find_tests(root: &Path, test_match: &[String]) -> Result<Vec<String>, LocalTestError> {
    let patterns = compile_patterns(test_match);
    let matches = |name: &str| test_match.is_empty() || patterns.iter().any(|re| re.is_match(name));

    let mut tests = vec![];
    for entry in WalkDir::new(root).sort_by_file_name() {
        let entry = entry.map_err(|source| LocalTestError::Walk {
            root: root.to_owned(),
            source,
        })?;
        if !entry.file_type().is_dir() {
            continue;
        }

        let name = relative_name(root, entry.path());
        if !matches(&name) {
            continue;
        }
        if !is_test_dir(entry.path()) {
            warn!(path = %entry.path().display(), "skipping matching directory; unit or input file missing");
            continue;
        }
        tests.push(name);
    }

    Ok(tests)
}

fn read(path: PathBuf) -> Result<String, LocalTestError> {
    fs::read_to_string(&path).map_err(|source| LocalTestError::Read { path, source })
}

/// Builds the request uploading the test in `test_dir`.
pub fn new_test_request(
    test_dir: &Path,
    suite_name: &str,
    test_name: &str,
    tags: &[String],
    env: &BTreeMap<String, String>,
) -> Result<TestRequest, LocalTestError> {
    let unit_file =
        find_file(test_dir, &UNIT_FILE_NAMES).ok_or_else(|| LocalTestError::MissingUnitFile {
            dir: test_dir.to_owned(),
        })?;
    let input_file =
        find_file(test_dir, &INPUT_FILE_NAMES).ok_or_else(|| LocalTestError::MissingInputFile {
            dir: test_dir.to_owned(),
        })?;

    Ok(TestRequest {
        name: format!("{suite_name} - {test_name}"),
        tags: tags.to_vec(),
        input: read(input_file)?,
        unit: read(unit_file)?,
        params: env.clone(),
    })
}

/// Requests for every local test of `suite` under `root`.
///
/// A test that cannot be read is skipped with a warning; the others still run.
pub fn suite_requests(root: &Path, suite: &Suite) -> Result<Vec<TestRequest>, LocalTestError> {
    let tests = find_tests(root, &suite.test_match)?;

    let requests = tests
        .iter()
        .filter_map(|test| {
            let request =
                new_test_request(&root.join(test), &suite.name, test, &suite.tags, &suite.env);
            match request {
                Ok(request) => Some(request),
                Err(error) => {
                    warn!(%error, suite = %suite.name, %test, "unable to open test");
                    None
                }
            }
        })
        .collect();

    Ok(requests)
}
