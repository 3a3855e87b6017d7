//! Control Plane REST Client
//!
//! Native REST implementation of [`ControlPlane`](super::ControlPlane).
//! Uses reqwest (rustls) for HTTP requests and token authentication.
//!
//! All requests share one connection pool and one concurrency limiter, so the
//! whole operator issues at most `max_concurrent` calls at a time regardless of
//! the number of reconcile workers.

mod operations;

use super::RemoteError;
use crate::observability::metrics;
use anyhow::{Context, Result};
use reqwest::{Client, Method};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Semaphore;
use tracing::debug;

/// Control plane REST client
#[derive(Clone)]
pub struct ControlPlaneREST {
    http_client: Client,
    base_url: String,
    token: Option<String>,
    limiter: Arc<Semaphore>,
}

/// Error body returned by the API on failure
#[derive(Debug, Deserialize)]
struct ApiErrorResponse {
    message: String,
    #[serde(default)]
    errors: Vec<ApiErrorDetail>,
}

#[derive(Debug, Deserialize)]
struct ApiErrorDetail {
    message: String,
}

impl std::fmt::Debug for ControlPlaneREST {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ControlPlaneREST")
            .field("base_url", &self.base_url)
            .field("authenticated", &self.token.is_some())
            .field("available_permits", &self.limiter.available_permits())
            .finish_non_exhaustive()
    }
}

impl ControlPlaneREST {
    /// Create a new control plane client
    ///
    /// # Errors
    /// Returns an error if the HTTP client cannot be built
    #[allow(
        clippy::missing_errors_doc,
        reason = "Error documentation is provided in doc comments"
    )]
    pub fn new(
        base_url: &str,
        token: Option<String>,
        max_concurrent: usize,
        request_timeout: Duration,
    ) -> Result<Self> {
        let http_client = Client::builder()
            .timeout(request_timeout)
            .user_agent(concat!("managed-service-operator/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            http_client,
            base_url: base_url.trim_end_matches('/').to_string(),
            token,
            limiter: Arc::new(Semaphore::new(max_concurrent.max(1))),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Build HTTP request with authentication headers
    fn make_request(
        &self,
        method: Method,
        path: &str,
        body: Option<serde_json::Value>,
    ) -> reqwest::RequestBuilder {
        let url = format!("{}/v1/{}", self.base_url, path.trim_start_matches('/'));

        let mut request = self
            .http_client
            .request(method, &url)
            .header("Content-Type", "application/json");

        if let Some(token) = &self.token {
            request = request.header("Authorization", format!("aivenv1 {token}"));
        }

        if let Some(body) = body {
            request = request.json(&body);
        }

        request
    }

    /// Turn a failed response into a classified error
    fn handle_error_response(status: reqwest::StatusCode, error_text: &str) -> RemoteError {
        let message = match serde_json::from_str::<ApiErrorResponse>(error_text) {
            Ok(body) if body.errors.is_empty() => body.message,
            Ok(body) => {
                let details: Vec<&str> = body.errors.iter().map(|e| e.message.as_str()).collect();
                format!("{} ({})", body.message, details.join("; "))
            }
            Err(_) if error_text.is_empty() => status
                .canonical_reason()
                .unwrap_or("unknown error")
                .to_string(),
            Err(_) => error_text.to_string(),
        };
        RemoteError::from_status(status.as_u16(), message)
    }

    /// Send a request through the limiter and return the raw body
    async fn execute(
        &self,
        operation: &str,
        method: Method,
        path: &str,
        body: Option<serde_json::Value>,
    ) -> Result<String, RemoteError> {
        let _permit = self
            .limiter
            .acquire()
            .await
            .map_err(|e| RemoteError::Transient(format!("request limiter closed: {e}")))?;

        let start = Instant::now();
        let result = self.execute_unmetered(method, path, body).await;
        let outcome = match &result {
            Ok(_) => "success",
            Err(e) => e.class(),
        };
        metrics::record_remote_request(operation, outcome, start.elapsed().as_secs_f64());
        result
    }

    async fn execute_unmetered(
        &self,
        method: Method,
        path: &str,
        body: Option<serde_json::Value>,
    ) -> Result<String, RemoteError> {
        debug!(%method, path, "Sending control plane request");
        let response = self.make_request(method, path, body).send().await?;
        let status = response.status();
        let text = response.text().await?;

        if status.is_success() {
            Ok(text)
        } else {
            Err(Self::handle_error_response(status, &text))
        }
    }

    /// Send a request and decode the JSON response
    async fn send_json<T: DeserializeOwned>(
        &self,
        operation: &str,
        method: Method,
        path: &str,
        body: Option<serde_json::Value>,
    ) -> Result<T, RemoteError> {
        let text = self.execute(operation, method, path, body).await?;
        serde_json::from_str(&text)
            .map_err(|e| RemoteError::Fatal(format!("invalid {operation} response: {e}")))
    }
}
