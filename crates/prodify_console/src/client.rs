//! HTTP client for the Prodify inference gateway.

use crate::{ConsoleConfig, GenerationBackend, SubmissionResponse, is_streaming_content_type};
use async_trait::async_trait;
use futures_util::{StreamExt, TryStreamExt};
use prodify_core::{
    GenerationRequest, Health, JobStatusResponse, ModelsResponse, Readiness,
};
use prodify_error::{ConsoleError, ConsoleErrorKind};
use reqwest::{Client, Response, Url, header::CONTENT_TYPE};
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::{debug, error, instrument};

/// Header carrying the gateway API key.
pub const API_KEY_HEADER: &str = "x-api-key";

const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// Client for the gateway's `/generate`, `/status`, `/models`, `/healthz`
/// and `/readyz` endpoints.
///
/// Every request carries the configured API key. Non-streaming requests are
/// bounded by the configured request timeout, body included. A streaming
/// submission is only bounded until its response headers arrive, so long
/// streams are not cut off.
#[derive(Clone)]
pub struct ProdifyClient {
    client: Client,
    base_url: Url,
    api_key: String,
    request_timeout: Duration,
}

impl ProdifyClient {
    /// Creates a client from a console configuration.
    ///
    /// # Errors
    ///
    /// Returns `InvalidRequest` if the base URL cannot be parsed and `Http` if
    /// the underlying client cannot be built.
    #[instrument(skip(config), fields(base_url = %config.base_url()))]
    pub fn new(config: &ConsoleConfig) -> Result<Self, ConsoleError> {
        let base_url = Url::parse(config.base_url()).map_err(|e| {
            ConsoleError::new(ConsoleErrorKind::InvalidRequest(format!(
                "Invalid base URL '{}': {}",
                config.base_url(),
                e
            )))
        })?;
        if base_url.cannot_be_a_base() {
            return Err(ConsoleError::new(ConsoleErrorKind::InvalidRequest(format!(
                "Base URL '{}' cannot carry a path",
                base_url
            ))));
        }

        let client = Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .build()
            .map_err(|e| ConsoleErrorKind::Http(format!("Failed to build HTTP client: {}", e)))?;

        debug!(base_url = %base_url, "Created gateway client");

        Ok(Self {
            client,
            base_url,
            api_key: config.api_key().clone(),
            request_timeout: *config.request_timeout(),
        })
    }

    /// Gateway base URL.
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Appends path segments to the base URL, percent-encoding each one.
    fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    /// Liveness of the gateway process.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the body is not understood.
    #[instrument(skip(self))]
    pub async fn health(&self) -> Result<bool, ConsoleError> {
        let health: Health = self.get_json(self.endpoint(&["healthz"])).await?;
        Ok(*health.ok())
    }

    /// Whether the gateway can reach its model backend.
    ///
    /// An unready gateway answers with a non-success status and a readiness
    /// body; that body is returned as `Ok` rather than as an API error.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the body is not understood.
    #[instrument(skip(self))]
    pub async fn readiness(&self) -> Result<Readiness, ConsoleError> {
        let response = self
            .request(self.client.get(self.endpoint(&["readyz"])))
            .timeout(self.request_timeout)
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;

        let status = response.status();
        let body = response.text().await.map_err(|e| self.transport_error(e))?;
        match serde_json::from_str::<Readiness>(&body) {
            Ok(readiness) => Ok(readiness),
            Err(_) if !status.is_success() => Err(ConsoleError::new(ConsoleErrorKind::Api {
                status: status.as_u16(),
                message: body,
            })),
            Err(e) => Err(ConsoleError::new(ConsoleErrorKind::ResponseParsing(format!(
                "Failed to parse readiness: {}",
                e
            )))),
        }
    }

    fn request(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        builder.header(API_KEY_HEADER, &self.api_key)
    }

    fn transport_error(&self, e: reqwest::Error) -> ConsoleError {
        error!(error = ?e, "HTTP request failed");
        ConsoleError::new(ConsoleErrorKind::Http(format!("Request failed: {}", e)))
    }

    async fn ensure_success(&self, response: Response) -> Result<Response, ConsoleError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let message = response.text().await.unwrap_or_default();
        error!(status = %status, error = %message, "API error");
        Err(ConsoleError::new(ConsoleErrorKind::Api {
            status: status.as_u16(),
            message,
        }))
    }

    async fn get_json<T: DeserializeOwned>(&self, url: Url) -> Result<T, ConsoleError> {
        debug!(url = %url, "GET");
        let response = self
            .request(self.client.get(url))
            .timeout(self.request_timeout)
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;
        let response = self.ensure_success(response).await?;
        response.json().await.map_err(|e| {
            error!(error = ?e, "Failed to parse response");
            ConsoleError::new(ConsoleErrorKind::ResponseParsing(format!(
                "Failed to parse JSON: {}",
                e
            )))
        })
    }
}

impl std::fmt::Debug for ProdifyClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProdifyClient")
            .field("base_url", &self.base_url.as_str())
            .field("request_timeout", &self.request_timeout)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl GenerationBackend for ProdifyClient {
    #[instrument(skip(self, request), fields(model = %request.model(), max_tokens = request.max_tokens()))]
    async fn submit(&self, request: &GenerationRequest) -> Result<SubmissionResponse, ConsoleError> {
        let url = self.endpoint(&["generate"]);
        debug!(url = %url, stream = ?request.stream(), "Submitting generation");

        let deadline = tokio::time::Instant::now() + self.request_timeout;
        let send = self.request(self.client.post(url)).json(request).send();
        let response = tokio::time::timeout_at(deadline, send)
            .await
            .map_err(|_| {
                error!(timeout_secs = self.request_timeout.as_secs(), "Submission timed out");
                ConsoleError::new(ConsoleErrorKind::Http(format!(
                    "No response within {} s",
                    self.request_timeout.as_secs()
                )))
            })?
            .map_err(|e| self.transport_error(e))?;
        let response = self.ensure_success(response).await?;

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        debug!(status = %response.status(), content_type = ?content_type, "Submission accepted");

        if !content_type.as_deref().is_some_and(is_streaming_content_type) {
            let body = tokio::time::timeout_at(deadline, response.bytes())
                .await
                .map_err(|_| {
                    error!(timeout_secs = self.request_timeout.as_secs(), "Response body stalled");
                    ConsoleError::new(ConsoleErrorKind::Http(format!(
                        "Response body incomplete after {} s",
                        self.request_timeout.as_secs()
                    )))
                })?
                .map_err(|e| self.transport_error(e))?;
            return Ok(SubmissionResponse::from_bytes(content_type.as_deref(), body));
        }

        let body = response
            .bytes_stream()
            .map_err(|e| ConsoleError::new(ConsoleErrorKind::Stream(e.to_string())))
            .boxed();
        Ok(SubmissionResponse::new(content_type, body))
    }

    #[instrument(skip(self))]
    async fn job_status(&self, job_id: &str) -> Result<JobStatusResponse, ConsoleError> {
        self.get_json(self.endpoint(&["status", job_id])).await
    }

    #[instrument(skip(self))]
    async fn list_models(&self) -> Result<Vec<String>, ConsoleError> {
        let models: ModelsResponse = self.get_json(self.endpoint(&["models"])).await?;
        debug!(count = models.models().len(), "Listed models");
        Ok(models.into_models())
    }
}
