//! The `apix.toml` project configuration.

use std::{
    collections::{BTreeMap, HashSet},
    fs,
    path::{Path, PathBuf},
    str::FromStr,
    time::Duration,
};

use serde_derive::{Deserialize, Serialize};
use thiserror::Error;

use crate::{api::Tunnel, region::Region};

pub const DEFAULT_REGION: &str = "us-west-1";
pub const DEFAULT_CONCURRENCY: usize = 64;
pub const DEFAULT_COLLECT_TIMEOUT: Duration = Duration::from_secs(60 * 60);

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {}: {source}", path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("no sauce region set")]
    MissingRegion,
    #[error("{0}")]
    UnknownRegion(String),
    #[error("suite {0:?} is missing a project_name")]
    NoProjectName(String),
    #[error("suite name {0:?} is used more than once")]
    DuplicateSuiteName(String),
    #[error("no suite named {0:?} found")]
    SuiteNameNotFound(String),
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Project {
    #[serde(default)]
    pub suites: Vec<Suite>,
    #[serde(default)]
    pub sauce: SauceConfig,
    /// Params applied to every suite.
    #[serde(default)]
    pub env: BTreeMap<String, String>,
    #[serde(default)]
    pub dry_run: bool,
    /// Upper bound on how long to wait for all results of a run.
    #[serde(default)]
    pub collect_timeout_secs: Option<u64>,
    /// Directory local tests are looked up in.
    #[serde(default)]
    pub root_dir: PathBuf,

    #[serde(skip)]
    pub config_file_path: PathBuf,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SauceConfig {
    #[serde(default)]
    pub region: String,
    /// How many results may be fetched concurrently.
    #[serde(default)]
    pub concurrency: usize,
    #[serde(default)]
    pub metadata: Metadata,
    #[serde(default)]
    pub tunnel: Tunnel,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Metadata {
    #[serde(default)]
    pub build: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Suite {
    pub name: String,
    #[serde(default)]
    pub project_name: String,
    /// Technical id of the project's hook, required to trigger runs.
    /// Resolved from `project_name` when not set.
    #[serde(default)]
    pub hook_id: String,
    #[serde(default)]
    pub project_id: String,
    #[serde(default)]
    pub tests: Vec<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    /// How long to wait for each result before giving up on it.
    #[serde(default)]
    pub timeout_secs: Option<u64>,
    #[serde(default)]
    pub env: BTreeMap<String, String>,
    /// Whether to run the tests stored on the service, rather than local ones.
    /// When unset, a suite runs local tests only if it declares `test_match` patterns.
    #[serde(default)]
    pub use_remote_tests: Option<bool>,
    /// Patterns selecting local test directories by their path relative to the root dir.
    #[serde(default)]
    pub test_match: Vec<String>,
}

impl Suite {
    /// A suite with neither tests nor tags runs everything under its hook.
    pub fn runs_all(&self) -> bool {
        self.tests.is_empty() && self.tags.is_empty()
    }

    pub fn runs_local_tests(&self) -> bool {
        !self
            .use_remote_tests
            .unwrap_or(self.test_match.is_empty())
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs
            .filter(|secs| *secs > 0)
            .map(Duration::from_secs)
    }
}

impl FromStr for Project {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(toml::from_str(s)?)
    }
}

impl Project {
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let toml_str = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_owned(),
            source,
        })?;
        let mut project = Project::from_str(&toml_str)?;
        project.config_file_path = path.to_owned();
        Ok(project)
    }

    /// Fills in whatever the user left blank.
    pub fn set_defaults(&mut self) {
        if self.sauce.region.is_empty() {
            self.sauce.region = DEFAULT_REGION.to_owned();
        }

        if self.sauce.concurrency < 1 {
            self.sauce.concurrency = DEFAULT_CONCURRENCY;
        }

        if self.root_dir.as_os_str().is_empty() {
            self.root_dir = PathBuf::from(".");
        }

        // Global params are applied onto every suite, overriding suite values of the same key.
        for suite in self.suites.iter_mut() {
            for (k, v) in self.env.iter() {
                suite.env.insert(k.clone(), v.clone());
            }
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.region()?;

        let mut seen = HashSet::new();
        for suite in self.suites.iter() {
            if suite.project_name.is_empty() {
                return Err(ConfigError::NoProjectName(suite.name.clone()));
            }
            if !seen.insert(suite.name.as_str()) {
                return Err(ConfigError::DuplicateSuiteName(suite.name.clone()));
            }
        }

        Ok(())
    }

    pub fn region(&self) -> Result<Region, ConfigError> {
        if self.sauce.region.is_empty() {
            return Err(ConfigError::MissingRegion);
        }
        Region::from_str(&self.sauce.region).map_err(ConfigError::UnknownRegion)
    }

    /// Narrows the project down to the suite named `suite_name`.
    pub fn filter_suites(&mut self, suite_name: &str) -> Result<(), ConfigError> {
        let suite = self
            .suites
            .iter()
            .find(|s| s.name == suite_name)
            .cloned()
            .ok_or_else(|| ConfigError::SuiteNameNotFound(suite_name.to_owned()))?;
        self.suites = vec![suite];
        Ok(())
    }

    pub fn suite_names(&self) -> impl Iterator<Item = &str> {
        self.suites.iter().map(|s| s.name.as_str())
    }

    pub fn collect_timeout(&self) -> Duration {
        self.collect_timeout_secs
            .filter(|secs| *secs > 0)
            .map(Duration::from_secs)
            .unwrap_or(DEFAULT_COLLECT_TIMEOUT)
    }
}
