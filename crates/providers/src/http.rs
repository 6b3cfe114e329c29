//! HTTP adapter for remote generation services.
//!
//! Speaks the submit-then-poll protocol most hosted engines expose:
//! `POST {base}/jobs` to start a generation, `GET {base}/jobs/{id}` until
//! the remote job reaches a terminal state. The dispatcher wraps the
//! whole call in its own timeout, so the poll loop here is unbounded.

use std::time::Duration;

use serde::Deserialize;

use crate::error::ProviderError;
use crate::request::{GenerationRequest, GenerationResult};
use crate::Provider;

/// HTTP timeout for a single request to the remote service. This bounds
/// one round trip, not the generation itself.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// How often the adapter polls for a remote job's completion.
const POLL_INTERVAL: Duration = Duration::from_secs(2);

/// Remote job envelope returned by both endpoints.
#[derive(Debug, Deserialize)]
struct RemoteJob {
    id: String,
    status: String,
    #[serde(default)]
    result: Option<serde_json::Value>,
    #[serde(default)]
    error: Option<String>,
}

/// A generation service reachable over HTTP with bearer-token auth.
pub struct HttpProvider {
    base_url: String,
    token: String,
    client: reqwest::Client,
}

impl HttpProvider {
    /// Create an adapter for the service at `base_url`.
    pub fn new(base_url: impl Into<String>, token: impl Into<String>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .expect("Failed to build reqwest HTTP client");
        Self {
            base_url: base_url.into(),
            token: token.into(),
            client,
        }
    }

    /// Submit the generation, returning the remote job id.
    async fn submit(&self, request: &GenerationRequest) -> Result<String, ProviderError> {
        let url = format!("{}/jobs", self.base_url);
        let body = serde_json::json!({
            "type": request.media_type.code(),
            "client_ref": request.job_id,
            "payload": request.payload,
        });

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.token)
            .json(&body)
            .send()
            .await?;

        let status = response.status().as_u16();
        if !response.status().is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(ProviderError::from_http_status(status, &text));
        }

        let remote: RemoteJob = response
            .json()
            .await
            .map_err(|e| ProviderError::Fatal(format!("Malformed submit response: {e}")))?;
        Ok(remote.id)
    }

    /// Fetch the remote job's current state.
    async fn fetch(&self, remote_id: &str) -> Result<RemoteJob, ProviderError> {
        let url = format!("{}/jobs/{remote_id}", self.base_url);
        let response = self
            .client
            .get(&url)
            .bearer_auth(&self.token)
            .send()
            .await?;

        let status = response.status().as_u16();
        if !response.status().is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(ProviderError::from_http_status(status, &text));
        }

        response
            .json()
            .await
            .map_err(|e| ProviderError::Fatal(format!("Malformed job response: {e}")))
    }
}

#[async_trait::async_trait]
impl Provider for HttpProvider {
    async fn generate(
        &self,
        request: &GenerationRequest,
    ) -> Result<GenerationResult, ProviderError> {
        let remote_id = self.submit(request).await?;
        tracing::debug!(
            job_id = request.job_id,
            remote_id = %remote_id,
            media_type = %request.media_type,
            "Generation submitted to provider",
        );

        loop {
            let remote = self.fetch(&remote_id).await?;
            match remote.status.as_str() {
                "done" => {
                    return Ok(GenerationResult {
                        reference: Some(remote.id),
                        output: remote.result.unwrap_or(serde_json::Value::Null),
                    });
                }
                "error" => {
                    // Remote-reported errors are permanent rejections of
                    // this input; flapping infrastructure shows up as HTTP
                    // failures instead.
                    return Err(ProviderError::Fatal(
                        remote.error.unwrap_or_else(|| "Provider reported failure".into()),
                    ));
                }
                _ => tokio::time::sleep(POLL_INTERVAL).await,
            }
        }
    }
}
