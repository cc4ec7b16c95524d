//! The interface to the remote api-testing service.

use std::collections::BTreeMap;

use async_trait::async_trait;
use serde_derive::{Deserialize, Serialize};
use thiserror::Error;

/// Metadata of an api-testing project.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectMeta {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub name: String,
}

/// Metadata of a single test definition.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestMeta {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub name: String,
}

/// A hook scopes trigger and fetch calls to one project.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Hook {
    #[serde(default)]
    pub identifier: String,
    #[serde(default)]
    pub name: String,
}

/// The result of one executed test, as reported by the service once the run has been processed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventResult {
    #[serde(rename = "_id", default)]
    pub event_id: String,
    #[serde(default)]
    pub failures_count: u32,
    #[serde(default)]
    pub project: ProjectMeta,
    #[serde(default)]
    pub test: TestMeta,
    #[serde(default)]
    pub execution_time_seconds: u64,
}

/// Identifiers returned by a trigger.
///
/// There is one event id per scheduled execution, to poll for its result, and one test id per
/// test whose metadata can be fetched right away. The two lists need not have the same length.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AsyncResponse {
    #[serde(default)]
    pub context_ids: Vec<String>,
    #[serde(default)]
    pub event_ids: Vec<String>,
    #[serde(default)]
    pub task_id: Option<String>,
    #[serde(default)]
    pub test_ids: Vec<String>,
}

/// Body sent along with every trigger.
///
/// Triggers of tests stored on the service only carry `params`. Ephemeral runs of local tests
/// also upload the test definition itself.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TestRequest {
    #[serde(skip_serializing_if = "String::is_empty")]
    pub name: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    /// Contents of the test's input file.
    #[serde(skip_serializing_if = "String::is_empty")]
    pub input: String,
    /// Contents of the test's unit file.
    #[serde(skip_serializing_if = "String::is_empty")]
    pub unit: String,
    pub params: BTreeMap<String, String>,
}

/// A tunnel the remote service should route test traffic through.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tunnel {
    #[serde(default)]
    pub name: String,
    /// Owner of a shared tunnel. Defaults to the requesting user.
    #[serde(default)]
    pub owner: String,
}

#[derive(Debug, Error)]
pub enum ApiError {
    /// The service has not finished processing the event yet.
    #[error("event not found")]
    EventNotFound,
    #[error("internal server error")]
    InternalServerError,
    #[error("request failed; unexpected response code: '{status}', msg: '{body}'")]
    UnexpectedStatus { status: u16, body: String },
    #[error("invalid url {0}")]
    InvalidUrl(String),
    #[error("could not authenticate against the api-testing service")]
    Unauthenticated,
    #[error("api-testing service returned an unexpected schema: {0}")]
    SchemaError(String),
    #[error("request failed: {0}")]
    Transport(String),
}

impl ApiError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, ApiError::EventNotFound)
    }
}

/// Calls into the remote api-testing service.
///
/// Implementations are stateless request/response clients; retrying failed requests, if
/// desired, is their concern.
#[async_trait]
pub trait ApiTester: Send + Sync {
    async fn get_project(&self, hook_id: &str) -> Result<ProjectMeta, ApiError>;

    /// Fails with [ApiError::EventNotFound] until the event has been processed.
    async fn get_event_result(&self, hook_id: &str, event_id: &str)
        -> Result<EventResult, ApiError>;

    async fn get_test(&self, hook_id: &str, test_id: &str) -> Result<TestMeta, ApiError>;

    async fn get_projects(&self) -> Result<Vec<ProjectMeta>, ApiError>;

    async fn get_hooks(&self, project_id: &str) -> Result<Vec<Hook>, ApiError>;

    async fn run_all_async(
        &self,
        hook_id: &str,
        build_id: &str,
        tunnel: &Tunnel,
        request: &TestRequest,
    ) -> Result<AsyncResponse, ApiError>;

    async fn run_test_async(
        &self,
        hook_id: &str,
        test_id: &str,
        build_id: &str,
        tunnel: &Tunnel,
        request: &TestRequest,
    ) -> Result<AsyncResponse, ApiError>;

    async fn run_tag_async(
        &self,
        hook_id: &str,
        tag: &str,
        build_id: &str,
        tunnel: &Tunnel,
        request: &TestRequest,
    ) -> Result<AsyncResponse, ApiError>;

    /// Runs the test definition carried by `request`, without storing it on the service.
    async fn run_ephemeral_async(
        &self,
        hook_id: &str,
        build_id: &str,
        tunnel: &Tunnel,
        request: &TestRequest,
    ) -> Result<AsyncResponse, ApiError>;
}
