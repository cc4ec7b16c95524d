mod api_tester;
mod credentials;
mod error;
mod job;
mod retry;
mod transport;

pub use api_tester::ApiTesterClient;
pub use credentials::{AccessKey, Credentials};
pub use error::Error as HostedError;
pub use job::{Job, JobClient, TERMINAL_JOB_STATUSES};
pub use retry::Decay;
