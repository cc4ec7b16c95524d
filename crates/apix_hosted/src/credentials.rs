use core::fmt;
use std::str::FromStr;

use serde_derive::{Deserialize, Serialize};
use thiserror::Error;

/// The secret half of a user's credentials. Never printed in full.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AccessKey(String);

#[derive(Debug, Error)]
pub enum AccessKeyError {
    #[error("access key must not be empty")]
    Empty,
}

impl AccessKey {
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for AccessKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("AccessKey(***)")
    }
}

impl FromStr for AccessKey {
    type Err = AccessKeyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            return Err(AccessKeyError::Empty);
        }
        Ok(Self(s.to_owned()))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials {
    pub username: String,
    pub access_key: AccessKey,
}

impl Credentials {
    pub fn new(username: impl Into<String>, access_key: AccessKey) -> Self {
        Self {
            username: username.into(),
            access_key,
        }
    }

    pub fn is_valid(&self) -> bool {
        !self.username.is_empty() && !self.access_key.0.is_empty()
    }
}
