use std::time::Duration;

use reqwest::{RequestBuilder, StatusCode};

/// How often, and how patiently, to retry a request the server failed or rate-limited.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Decay {
    pub max_attempts: usize,
    pub first_delay: Duration,
    pub multiplier: u32,
}

// Decay with {1, 2, 4}-second delays
impl Default for Decay {
    fn default() -> Self {
        Self {
            max_attempts: 4,
            first_delay: Duration::from_secs(1),
            multiplier: 2,
        }
    }
}

impl Decay {
    /// Never retries.
    pub const NONE: Decay = Decay {
        max_attempts: 1,
        first_delay: Duration::ZERO,
        multiplier: 1,
    };

    fn retrier(self) -> impl FnMut(usize) -> Option<Duration> {
        let mut delay = self.first_delay;
        move |last_attempt| {
            if last_attempt >= self.max_attempts {
                return None;
            }
            let this_delay = delay;
            delay *= self.multiplier;
            Some(this_delay)
        }
    }
}

/// Attempts a request a number of times, retrying with an exponential decay if the server was
/// determined to have errored or notified a rate-limit.
pub(crate) async fn send_request_with_decay(
    build_request: impl Fn() -> RequestBuilder,
    decay: Decay,
) -> reqwest::Result<reqwest::Response> {
    send_request_with_decay_help(build_request, decay.retrier()).await
}

async fn send_request_with_decay_help(
    build_request: impl Fn() -> RequestBuilder,
    mut next_delay: impl FnMut(usize) -> Option<Duration>,
) -> reqwest::Result<reqwest::Response> {
    let mut last_attempt = 0;
    loop {
        last_attempt += 1;

        let response = build_request().send().await?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        if status.is_server_error() || status == StatusCode::TOO_MANY_REQUESTS {
            match next_delay(last_attempt) {
                Some(delay) => {
                    tracing::debug!(?status, ?delay, "server error, retrying after decay");
                    tokio::time::sleep(delay).await;
                    continue;
                }
                None => {
                    tracing::info!(?last_attempt, "not retrying hosted API");
                    return Ok(response);
                }
            }
        } else {
            // Client errors, including "not found", are answers rather than failures.
            return Ok(response);
        }
    }
}
