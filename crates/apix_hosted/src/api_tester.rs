//! [ApiTester] over the hosted api-testing REST service.

use apix_runner::api::{
    ApiError, ApiTester, AsyncResponse, EventResult, Hook, ProjectMeta, TestMeta, TestRequest,
    Tunnel,
};
use async_trait::async_trait;
use url::Url;
use serde_derive::Deserialize;

use crate::{credentials::Credentials, error::Error, retry::Decay, transport::Transport};

#[derive(Debug, Clone)]
pub struct ApiTesterClient {
    transport: Transport,
}

#[derive(Deserialize)]
struct PublishedTest {
    #[serde(alias = "Published")]
    published: TestMeta,
}

impl ApiTesterClient {
    /// `api_base_url` is the region's api host, e.g. `https://api.us-west-1.saucelabs.com`.
    pub fn new(api_base_url: &str, credentials: Credentials) -> Result<Self, Error> {
        Ok(Self {
            transport: Transport::new(api_base_url, credentials)?,
        })
    }

    pub fn with_decay(mut self, decay: Decay) -> Self {
        self.transport = self.transport.with_decay(decay);
        self
    }

    fn hook_url<'a>(
        &self,
        hook_id: &'a str,
        rest: impl IntoIterator<Item = &'a str>,
    ) -> Result<Url, Error> {
        let segments = ["api-testing", "rest", "v4", hook_id];
        self.transport.url(segments.into_iter().chain(rest))
    }

    /// A trigger url, carrying the build and tunnel the run belongs to.
    fn trigger_url<'a>(
        &self,
        hook_id: &'a str,
        rest: impl IntoIterator<Item = &'a str>,
        build_id: &str,
        tunnel: &Tunnel,
    ) -> Result<Url, Error> {
        let mut url = self.hook_url(hook_id, rest)?;
        {
            let mut query = url.query_pairs_mut();
            if !build_id.is_empty() {
                query.append_pair("buildId", build_id);
            }
            if !tunnel.name.is_empty() {
                let owner = if tunnel.owner.is_empty() {
                    self.transport.username()
                } else {
                    tunnel.owner.as_str()
                };
                query.append_pair("tunnelId", &format!("{owner}:{}", tunnel.name));
            }
        }
        if url.query() == Some("") {
            url.set_query(None);
        }
        Ok(url)
    }

    async fn trigger(&self, url: Url, request: &TestRequest) -> Result<AsyncResponse, ApiError> {
        Ok(self.transport.post(url, request).await?)
    }
}

#[async_trait]
impl ApiTester for ApiTesterClient {
    async fn get_project(&self, hook_id: &str) -> Result<ProjectMeta, ApiError> {
        let url = self.hook_url(hook_id, [])?;
        Ok(self.transport.get(url).await?)
    }

    async fn get_event_result(
        &self,
        hook_id: &str,
        event_id: &str,
    ) -> Result<EventResult, ApiError> {
        let url = self.hook_url(hook_id, ["insights", "events", event_id])?;
        match self.transport.get(url).await {
            Ok(result) => Ok(result),
            // Answered until the event has been processed.
            Err(Error::NotFound(_)) => Err(ApiError::EventNotFound),
            Err(e) => Err(e.into()),
        }
    }

    async fn get_test(&self, hook_id: &str, test_id: &str) -> Result<TestMeta, ApiError> {
        let url = self.hook_url(hook_id, ["tests", test_id])?;
        let test: PublishedTest = self.transport.get(url).await?;
        Ok(test.published)
    }

    async fn get_projects(&self) -> Result<Vec<ProjectMeta>, ApiError> {
        let url = self.transport.url(["api-testing", "api", "project"])?;
        Ok(self.transport.get(url).await?)
    }

    async fn get_hooks(&self, project_id: &str) -> Result<Vec<Hook>, ApiError> {
        let url = self
            .transport
            .url(["api-testing", "api", "project", project_id, "hook"])?;
        Ok(self.transport.get(url).await?)
    }

    async fn run_all_async(
        &self,
        hook_id: &str,
        build_id: &str,
        tunnel: &Tunnel,
        request: &TestRequest,
    ) -> Result<AsyncResponse, ApiError> {
        let url = self.trigger_url(hook_id, ["tests", "_run-all"], build_id, tunnel)?;
        self.trigger(url, request).await
    }

    async fn run_test_async(
        &self,
        hook_id: &str,
        test_id: &str,
        build_id: &str,
        tunnel: &Tunnel,
        request: &TestRequest,
    ) -> Result<AsyncResponse, ApiError> {
        let url = self.trigger_url(hook_id, ["tests", test_id, "_run"], build_id, tunnel)?;
        self.trigger(url, request).await
    }

    async fn run_tag_async(
        &self,
        hook_id: &str,
        tag: &str,
        build_id: &str,
        tunnel: &Tunnel,
        request: &TestRequest,
    ) -> Result<AsyncResponse, ApiError> {
        let url = self.trigger_url(hook_id, ["tests", "_tag", tag, "_run"], build_id, tunnel)?;
        self.trigger(url, request).await
    }

    async fn run_ephemeral_async(
        &self,
        hook_id: &str,
        build_id: &str,
        tunnel: &Tunnel,
        request: &TestRequest,
    ) -> Result<AsyncResponse, ApiError> {
        let url = self.trigger_url(hook_id, ["tests", "_exec"], build_id, tunnel)?;
        self.trigger(url, request).await
    }
}
