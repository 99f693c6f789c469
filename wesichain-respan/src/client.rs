use std::time::Duration;

use reqwest::{Client, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use tokio::time::sleep;

use crate::{IngestError, LogPayload, RetryPolicy};

/// Marks ingest traffic so the receiving service does not trace its own
/// ingestion.
pub const DOGFOOD_HEADER: &str = "X-Respan-Dogfood";

/// How a batch left the client when no error was raised.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Delivery {
    Accepted { attempts: usize },
    /// A 3xx/4xx answer; logged and not retried.
    Rejected { status: StatusCode, attempts: usize },
}

#[derive(Clone)]
pub struct IngestClient {
    client: Client,
    endpoint: String,
    api_key: SecretString,
    retry: RetryPolicy,
}

impl IngestClient {
    pub fn new(
        endpoint: impl Into<String>,
        api_key: SecretString,
        timeout: Duration,
        retry: RetryPolicy,
    ) -> Result<Self, IngestError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            endpoint: endpoint.into(),
            api_key,
            retry,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// POST the batch as one JSON array, retrying transport failures and 5xx
    /// answers with exponential backoff.
    pub async fn send_batch(&self, batch: &[LogPayload]) -> Result<Delivery, IngestError> {
        let max_attempts = self.retry.max_attempts();
        let mut attempt = 0;

        loop {
            attempt += 1;
            let failure = match self.post(batch).await {
                Ok(status) if status.is_server_error() => IngestError::Server { status },
                Ok(status) if status.as_u16() >= 300 => {
                    tracing::warn!(
                        status = status.as_u16(),
                        payloads = batch.len(),
                        "respan ingest rejected batch"
                    );
                    return Ok(Delivery::Rejected {
                        status,
                        attempts: attempt,
                    });
                }
                Ok(_) => return Ok(Delivery::Accepted { attempts: attempt }),
                Err(err) => IngestError::Request(err),
            };

            if attempt >= max_attempts {
                return Err(failure);
            }
            let delay = self.retry.delay_for(attempt);
            tracing::warn!(
                attempt,
                max_attempts,
                delay_ms = delay.as_millis() as u64,
                error = %failure,
                "respan ingest attempt failed, retrying"
            );
            sleep(delay).await;
        }
    }

    async fn post(&self, batch: &[LogPayload]) -> Result<StatusCode, reqwest::Error> {
        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(self.api_key.expose_secret())
            .header(DOGFOOD_HEADER, "1")
            .json(batch)
            .send()
            .await?;
        Ok(response.status())
    }
}
