use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

use super::types::{PipeCreated, PipeDefinition, PipeOutput, PipeRun};
use crate::config::{LangbaseConfig, PipeConfig, RequestConfig};
use crate::error::{LangbaseError, LangbaseResult};

/// Client for the Langbase pipes API
#[derive(Clone)]
pub struct LangbaseClient {
    http: Client,
    base_url: String,
    api_key: String,
    request: RequestConfig,
}

impl LangbaseClient {
    pub fn new(config: &LangbaseConfig, request: RequestConfig) -> LangbaseResult<Self> {
        let http = Client::builder()
            .timeout(Duration::from_millis(request.timeout_ms))
            .build()
            .map_err(LangbaseError::Http)?;

        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            request,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Run a pipe and return its completion.
    ///
    /// Every failure is retried up to `max_retries` times with exponential
    /// backoff. The last failure is reported as [`LangbaseError::Unavailable`].
    pub async fn run_pipe(&self, run: &PipeRun) -> LangbaseResult<PipeOutput> {
        let mut attempt = 0;
        loop {
            let started = Instant::now();
            match self.post::<_, PipeOutput>("/v1/pipes/run", run).await {
                Ok(output) => {
                    debug!(
                        pipe = %run.name,
                        attempt,
                        latency_ms = started.elapsed().as_millis(),
                        "Pipe run completed"
                    );
                    return Ok(output);
                }
                Err(e) if attempt < self.request.max_retries => {
                    let delay = self.backoff(attempt);
                    warn!(
                        pipe = %run.name,
                        attempt,
                        error = %e,
                        delay_ms = delay.as_millis(),
                        "Pipe run failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => {
                    warn!(pipe = %run.name, attempt, error = %e, "Pipe run failed");
                    return Err(LangbaseError::Unavailable {
                        message: e.to_string(),
                        retries: attempt,
                    });
                }
            }
        }
    }

    /// Upsert the scenario and vision pipes. A 409 means the pipe is
    /// already there and is not an error.
    pub async fn ensure_garden_pipes(&self, pipes: &PipeConfig) -> LangbaseResult<()> {
        for definition in [PipeDefinition::scenario(pipes), PipeDefinition::vision(pipes)] {
            match self.post::<_, PipeCreated>("/v1/pipes", &definition).await {
                Ok(created) => info!(
                    pipe = %created.name,
                    url = created.url.as_deref().unwrap_or("-"),
                    "Pipe ready"
                ),
                Err(LangbaseError::Api { status: 409, .. }) => {
                    info!(pipe = %definition.name, "Pipe already exists")
                }
                Err(e) => return Err(e),
            }
        }
        Ok(())
    }

    fn backoff(&self, attempt: u32) -> Duration {
        let factor = 1_u64 << attempt.min(16);
        Duration::from_millis(self.request.retry_delay_ms.saturating_mul(factor))
    }

    async fn post<B, R>(&self, path: &str, body: &B) -> LangbaseResult<R>
    where
        B: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        let response = self
            .http
            .post(format!("{}{}", self.base_url, path))
            .bearer_auth(&self.api_key)
            .json(body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    LangbaseError::Timeout {
                        timeout_ms: self.request.timeout_ms,
                    }
                } else {
                    LangbaseError::Http(e)
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(LangbaseError::Api {
                status: status.as_u16(),
                message,
            });
        }

        response
            .json::<R>()
            .await
            .map_err(|e| LangbaseError::InvalidResponse {
                message: format!("Failed to parse response from {}: {}", path, e),
            })
    }
}
