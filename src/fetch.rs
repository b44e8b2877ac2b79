use crate::endpoint::redact;
use crate::{FetchConfig, Result, ScraperError};
use rand::seq::SliceRandom;
use reqwest::header::USER_AGENT;
use reqwest::Client;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, error, instrument, warn};

/// The `Fetcher` performs rate limited GET requests with a bounded, linear retry policy.
/// Every attempt, retries included, waits `request_delay` first. After a failed attempt
/// `n` it waits `n * backoff_step`, and gives up once `max_retries` retries have failed.
pub struct Fetcher {
    /// The HTTP client used for making requests.
    client: Client,
    /// The request policy.
    config: FetchConfig,
}

impl Fetcher {
    /// Creates a new `Fetcher` with the given policy.
    ///
    /// # Returns
    ///
    /// A `Result` containing the `Fetcher`, or an error if the client could not be created.
    pub fn new(config: FetchConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.timeout)
            .gzip(true)
            .build()
            .map_err(ScraperError::RequestError)?;

        Ok(Self { client, config })
    }

    /// Fetches the body at `url`, retrying transport errors and non-2xx statuses.
    ///
    /// # Returns
    ///
    /// The response body, or `ScraperError::RetriesExhausted` once every attempt has failed.
    #[instrument(skip(self, url), fields(url = %redact(url)))]
    pub async fn fetch(&self, url: &str) -> Result<String> {
        let mut retries = 0;

        loop {
            sleep(self.config.request_delay).await;

            match self.try_fetch(url).await {
                Ok(body) => {
                    debug!("Fetched {} bytes", body.len());
                    return Ok(body);
                }
                Err(e) if retries < self.config.max_retries => {
                    retries += 1;
                    let delay = backoff_delay(self.config.backoff_step, retries);
                    warn!(
                        "Attempt {} failed: {}; retry {}/{} in {:?}",
                        retries, e, retries, self.config.max_retries, delay
                    );
                    sleep(delay).await;
                }
                Err(e) => {
                    let attempts = retries + 1;
                    error!("Attempt {} failed: {}; giving up", attempts, e);
                    return Err(ScraperError::RetriesExhausted {
                        url: redact(url),
                        attempts,
                    });
                }
            }
        }
    }

    /// Performs a single attempt.
    async fn try_fetch(&self, url: &str) -> Result<String> {
        let mut request = self
            .client
            .get(url)
            .header("Accept", "text/html,application/xhtml+xml,application/xml;q=0.9,image/avif,image/webp,*/*;q=0.8")
            .header("Accept-Language", "en-US,en;q=0.5");

        if let Some(agent) = self.pick_user_agent() {
            request = request.header(USER_AGENT, agent);
        }

        let response = request.send().await?;

        let status = response.status();
        debug!("Response status: {}", status);
        if !status.is_success() {
            return Err(ScraperError::StatusError {
                status: status.as_u16(),
                url: redact(url),
            });
        }

        Ok(response.text().await?)
    }

    fn pick_user_agent(&self) -> Option<String> {
        self.config
            .user_agents
            .choose(&mut rand::thread_rng())
            .cloned()
    }
}

/// Wait before retry `retry` (1-based).
pub fn backoff_delay(step: Duration, retry: u32) -> Duration {
    step.saturating_mul(retry)
}
