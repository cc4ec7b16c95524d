//! Jobs on the hosted job service, and how to tell when they are finished.

use std::time::Duration;

use apix_utils::poll::{poll_job, JobBackend, PolledJob};
use async_trait::async_trait;
use serde_derive::Deserialize;

use crate::{credentials::Credentials, error::Error, retry::Decay, transport::Transport};

/// Statuses a job never transitions out of.
pub const TERMINAL_JOB_STATUSES: [&str; 4] = ["complete", "error", "passed", "failed"];

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct Job {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub passed: bool,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub error: String,
}

impl Job {
    pub fn is_done(&self) -> bool {
        TERMINAL_JOB_STATUSES.contains(&self.status.as_str())
    }
}

#[derive(Debug, Clone)]
pub struct JobClient {
    transport: Transport,
}

impl JobClient {
    pub fn new(api_base_url: &str, credentials: Credentials) -> Result<Self, Error> {
        Ok(Self {
            transport: Transport::new(api_base_url, credentials)?,
        })
    }

    pub fn with_decay(mut self, decay: Decay) -> Self {
        self.transport = self.transport.with_decay(decay);
        self
    }

    pub async fn read_job(&self, id: &str) -> Result<Job, Error> {
        let username = self.transport.username().to_owned();
        let url = self
            .transport
            .url(["rest", "v1", username.as_str(), "jobs", id])?;
        self.transport.get(url).await
    }

    /// Waits for job `id` to finish, giving up after `timeout`. A zero timeout waits a day.
    pub async fn wait(
        &self,
        id: &str,
        interval: Duration,
        timeout: Duration,
    ) -> Result<PolledJob<Job>, Error> {
        poll_job(self, id, interval, timeout).await
    }
}

#[async_trait]
impl JobBackend for JobClient {
    type Job = Job;
    type Error = Error;

    async fn read_job(&self, id: &str) -> Result<Job, Error> {
        JobClient::read_job(self, id).await
    }

    fn is_done(&self, job: &Job) -> bool {
        job.is_done()
    }
}

#[cfg(test)]
mod test {
    use std::{str::FromStr, time::Duration};

    use mockito::Server;
    use serde_json::json;

    use super::{Job, JobClient};
    use crate::{AccessKey, Credentials, Decay, HostedError};

    fn client(url: &str) -> JobClient {
        let creds = Credentials::new("jdoe", AccessKey::from_str("secret-key").unwrap());
        JobClient::new(url, creds).unwrap().with_decay(Decay::NONE)
    }

    #[test]
    fn terminal_statuses() {
        for status in ["complete", "error", "passed", "failed"] {
            let job = Job {
                status: status.to_owned(),
                ..Default::default()
            };
            assert!(job.is_done(), "{status}");
        }
        for status in ["new", "queued", "in progress", ""] {
            let job = Job {
                status: status.to_owned(),
                ..Default::default()
            };
            assert!(!job.is_done(), "{status}");
        }
    }

    #[tokio::test]
    async fn read_job() {
        let mut server = Server::new_async().await;

        let _m = server
            .mock("GET", "/rest/v1/jdoe/jobs/job-1")
            .with_status(200)
            .with_body(
                json!({
                    "id": "job-1",
                    "name": "checkout flow",
                    "passed": true,
                    "status": "complete",
                    "error": "",
                })
                .to_string(),
            )
            .create_async()
            .await;

        let job = client(&server.url()).read_job("job-1").await.unwrap();
        assert_eq!(job.name, "checkout flow");
        assert!(job.passed);
        assert!(job.is_done());
    }

    #[tokio::test]
    async fn wait_for_finished_job() {
        let mut server = Server::new_async().await;

        let _m = server
            .mock("GET", "/rest/v1/jdoe/jobs/job-1")
            .with_status(200)
            .with_body(json!({"id": "job-1", "passed": false, "status": "failed"}).to_string())
            .create_async()
            .await;

        let polled = client(&server.url())
            .wait("job-1", Duration::from_millis(10), Duration::from_secs(5))
            .await
            .unwrap();

        assert!(!polled.timed_out);
        assert_eq!(polled.job.status, "failed");
    }

    #[tokio::test]
    async fn wait_gives_up_on_running_job() {
        let mut server = Server::new_async().await;

        let _m = server
            .mock("GET", "/rest/v1/jdoe/jobs/job-1")
            .with_status(200)
            .with_body(json!({"id": "job-1", "status": "in progress"}).to_string())
            .create_async()
            .await;

        let polled = client(&server.url())
            .wait("job-1", Duration::from_millis(10), Duration::from_millis(50))
            .await
            .unwrap();

        assert!(polled.timed_out);
        assert_eq!(polled.job.status, "in progress");
    }

    #[tokio::test]
    async fn missing_job() {
        let mut server = Server::new_async().await;

        let _m = server
            .mock("GET", "/rest/v1/jdoe/jobs/nope")
            .with_status(404)
            .create_async()
            .await;

        let err = client(&server.url())
            .wait("nope", Duration::from_millis(10), Duration::from_secs(1))
            .await
            .unwrap_err();

        assert!(matches!(err, HostedError::NotFound(..)));
    }
}
