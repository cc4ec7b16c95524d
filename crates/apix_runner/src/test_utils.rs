use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc, Mutex,
    },
    time::Duration,
};

use apix_reporting::{ReportedResult, Reporter, ReportingError};
use async_trait::async_trait;

use crate::{
    api::{
        ApiError, ApiTester, AsyncResponse, EventResult, Hook, ProjectMeta, TestMeta, TestRequest,
        Tunnel,
    },
    config::Suite,
};

/// How the fake service answers reads of one event.
#[derive(Debug, Clone)]
pub enum EventScript {
    /// Not found until the n-th read, which returns the result.
    ReadyAfter(usize, EventResult),
    /// Every read fails with a server error.
    Fail,
}

pub fn petstore() -> ProjectMeta {
    ProjectMeta {
        id: "p1".to_owned(),
        name: "petstore".to_owned(),
    }
}

pub fn event(event_id: &str, failures_count: u32) -> EventResult {
    EventResult {
        event_id: event_id.to_owned(),
        failures_count,
        project: ProjectMeta::default(),
        test: TestMeta {
            id: format!("t-{event_id}"),
            name: format!("test {event_id}"),
        },
        execution_time_seconds: 2,
    }
}

pub fn suite(name: &str) -> Suite {
    Suite {
        name: name.to_owned(),
        project_name: "petstore".to_owned(),
        hook_id: "hook-1".to_owned(),
        project_id: "p1".to_owned(),
        ..Default::default()
    }
}

pub fn ids(ids: &[&str]) -> Vec<String> {
    ids.iter().map(|s| s.to_string()).collect()
}

/// An in-memory api-testing service.
///
/// Unknown events are never found, and triggers without a scripted response fail.
pub struct FakeApi {
    pub project: Option<ProjectMeta>,
    pub projects: Option<Vec<ProjectMeta>>,
    pub hooks: HashMap<String, Vec<Hook>>,
    pub tests: HashMap<String, TestMeta>,
    pub events: HashMap<String, EventScript>,
    /// Keyed by `all:{hook}`, `test:{name}`, `tag:{name}` or `exec:{request name}`.
    pub triggers: HashMap<String, AsyncResponse>,
    pub fetch_delay: Duration,

    pub reads: Mutex<HashMap<String, usize>>,
    pub triggered: Mutex<Vec<String>>,
    pub requests: Mutex<Vec<TestRequest>>,
    pub hook_lookups: AtomicUsize,
    pub in_flight: AtomicUsize,
    pub max_in_flight: AtomicUsize,
}

impl Default for FakeApi {
    fn default() -> Self {
        Self {
            project: Some(petstore()),
            projects: Some(vec![]),
            hooks: HashMap::new(),
            tests: HashMap::new(),
            events: HashMap::new(),
            triggers: HashMap::new(),
            fetch_delay: Duration::ZERO,
            reads: Default::default(),
            triggered: Default::default(),
            requests: Default::default(),
            hook_lookups: AtomicUsize::new(0),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
        }
    }
}

impl FakeApi {
    pub fn with_event(mut self, event_id: &str, script: EventScript) -> Self {
        self.events.insert(event_id.to_owned(), script);
        self
    }

    pub fn with_test(mut self, test_id: &str, name: &str) -> Self {
        self.tests.insert(
            test_id.to_owned(),
            TestMeta {
                id: test_id.to_owned(),
                name: name.to_owned(),
            },
        );
        self
    }

    pub fn with_trigger(mut self, key: &str, response: AsyncResponse) -> Self {
        self.triggers.insert(key.to_owned(), response);
        self
    }

    pub fn with_fetch_delay(mut self, delay: Duration) -> Self {
        self.fetch_delay = delay;
        self
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    pub fn reads_of(&self, event_id: &str) -> usize {
        self.reads
            .lock()
            .unwrap()
            .get(event_id)
            .copied()
            .unwrap_or(0)
    }

    pub fn triggered(&self) -> Vec<String> {
        self.triggered.lock().unwrap().clone()
    }

    fn trigger(&self, key: String, request: &TestRequest) -> Result<AsyncResponse, ApiError> {
        self.requests.lock().unwrap().push(request.clone());
        let response = self.triggers.get(&key).cloned();
        self.triggered.lock().unwrap().push(key);
        response.ok_or(ApiError::UnexpectedStatus {
            status: 400,
            body: "no such target".to_owned(),
        })
    }
}

#[async_trait]
impl ApiTester for FakeApi {
    async fn get_project(&self, _hook_id: &str) -> Result<ProjectMeta, ApiError> {
        self.project.clone().ok_or(ApiError::InternalServerError)
    }

    async fn get_event_result(
        &self,
        _hook_id: &str,
        event_id: &str,
    ) -> Result<EventResult, ApiError> {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        if !self.fetch_delay.is_zero() {
            tokio::time::sleep(self.fetch_delay).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        let read_no = {
            let mut reads = self.reads.lock().unwrap();
            let read_no = reads.entry(event_id.to_owned()).or_default();
            *read_no += 1;
            *read_no
        };

        match self.events.get(event_id) {
            Some(EventScript::ReadyAfter(n, result)) if read_no >= *n => Ok(result.clone()),
            Some(EventScript::Fail) => Err(ApiError::InternalServerError),
            _ => Err(ApiError::EventNotFound),
        }
    }

    async fn get_test(&self, _hook_id: &str, test_id: &str) -> Result<TestMeta, ApiError> {
        self.tests
            .get(test_id)
            .cloned()
            .ok_or(ApiError::UnexpectedStatus {
                status: 404,
                body: "test not found".to_owned(),
            })
    }

    async fn get_projects(&self) -> Result<Vec<ProjectMeta>, ApiError> {
        self.projects.clone().ok_or(ApiError::Unauthenticated)
    }

    async fn get_hooks(&self, project_id: &str) -> Result<Vec<Hook>, ApiError> {
        self.hook_lookups.fetch_add(1, Ordering::SeqCst);
        self.hooks
            .get(project_id)
            .cloned()
            .ok_or(ApiError::InternalServerError)
    }

    async fn run_all_async(
        &self,
        hook_id: &str,
        _build_id: &str,
        _tunnel: &Tunnel,
        request: &TestRequest,
    ) -> Result<AsyncResponse, ApiError> {
        self.trigger(format!("all:{hook_id}"), request)
    }

    async fn run_test_async(
        &self,
        _hook_id: &str,
        test_id: &str,
        _build_id: &str,
        _tunnel: &Tunnel,
        request: &TestRequest,
    ) -> Result<AsyncResponse, ApiError> {
        self.trigger(format!("test:{test_id}"), request)
    }

    async fn run_tag_async(
        &self,
        _hook_id: &str,
        tag: &str,
        _build_id: &str,
        _tunnel: &Tunnel,
        request: &TestRequest,
    ) -> Result<AsyncResponse, ApiError> {
        self.trigger(format!("tag:{tag}"), request)
    }

    async fn run_ephemeral_async(
        &self,
        _hook_id: &str,
        _build_id: &str,
        _tunnel: &Tunnel,
        request: &TestRequest,
    ) -> Result<AsyncResponse, ApiError> {
        self.trigger(format!("exec:{}", request.name), request)
    }
}

/// Records every call made into it, in order, across all reporters sharing the same log.
#[derive(Clone)]
pub struct RecordingReporter {
    pub name: &'static str,
    pub log: Arc<Mutex<Vec<String>>>,
    pub results: Arc<Mutex<Vec<ReportedResult>>>,
}

impl RecordingReporter {
    pub fn new(name: &'static str, log: Arc<Mutex<Vec<String>>>) -> Self {
        Self {
            name,
            log,
            results: Default::default(),
        }
    }

    pub fn results(&self) -> Vec<ReportedResult> {
        self.results.lock().unwrap().clone()
    }
}

impl Reporter for RecordingReporter {
    fn add(&mut self, result: &ReportedResult) -> Result<(), ReportingError> {
        self.log
            .lock()
            .unwrap()
            .push(format!("{}: add {}", self.name, result.name));
        self.results.lock().unwrap().push(result.clone());
        Ok(())
    }

    fn render(self: Box<Self>) -> Result<(), ReportingError> {
        self.log
            .lock()
            .unwrap()
            .push(format!("{}: render", self.name));
        Ok(())
    }
}
