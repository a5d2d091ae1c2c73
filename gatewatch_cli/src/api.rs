//! Backend API client for the console endpoints
//!
//! Every command talks to the interception backend through this client; it
//! owns the one configured `reqwest::Client` and the uniform error handling
//! for non-2xx responses (`{"detail": ...}` body when the backend sends one,
//! a status-derived message otherwise).

use gatewatch_common::{
    constants, AnalyzeVerdict, CaptureStarted, CaptureStopped, CapturedRequest, DashboardStats,
    ErrorBody, ReputationVerdict, RequestPayload, ResponsePreview,
};
use reqwest::{Client, Response, StatusCode};
use serde::Serialize;
use std::time::Duration;
use thiserror::Error;

/// Errors surfaced by backend calls. `Rejected` carries the user-facing
/// message already resolved (server detail or generic fallback).
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{detail}")]
    Rejected { status: StatusCode, detail: String },

    #[error("backend unreachable: {0}")]
    Transport(#[from] reqwest::Error),
}

/// Client for the interception backend
#[derive(Clone)]
pub struct ApiClient {
    base_url: String,
    client: Client,
}

#[derive(Serialize)]
struct CheckUrlBody<'a> {
    url: &'a str,
}

impl ApiClient {
    /// Create a new API client for the given base URL
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client: Client::builder()
                .timeout(Duration::from_secs(30))
                .build()
                .expect("Failed to build HTTP client"),
        }
    }

    /// Get the backend base URL
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Resolve a non-2xx response into `ApiError::Rejected`, preferring the
    /// backend's `detail` field when the error body parses as JSON.
    async fn check(response: Response) -> Result<Response, ApiError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let detail = response
            .json::<ErrorBody>()
            .await
            .ok()
            .and_then(|body| body.detail)
            .unwrap_or_else(|| format!("request failed with status {}", status));

        Err(ApiError::Rejected { status, detail })
    }

    /// Fetch the snapshot of currently known captured requests
    pub async fn pending_requests(&self) -> Result<Vec<CapturedRequest>, ApiError> {
        let response = self
            .client
            .get(self.endpoint(constants::SNAPSHOT_PATH))
            .send()
            .await?;
        Ok(Self::check(response).await?.json().await?)
    }

    /// Start traffic capture
    pub async fn start_capture(&self) -> Result<CaptureStarted, ApiError> {
        let response = self
            .client
            .post(self.endpoint(constants::START_CAPTURE_PATH))
            .send()
            .await?;
        Ok(Self::check(response).await?.json().await?)
    }

    /// Stop traffic capture
    pub async fn stop_capture(&self) -> Result<CaptureStopped, ApiError> {
        let response = self
            .client
            .post(self.endpoint(constants::STOP_CAPTURE_PATH))
            .send()
            .await?;
        Ok(Self::check(response).await?.json().await?)
    }

    /// Replay an edited request against its target, returning the upstream
    /// response preview
    pub async fn replay(&self, payload: &RequestPayload) -> Result<ResponsePreview, ApiError> {
        let response = self
            .client
            .post(self.endpoint(constants::REPLAY_PATH))
            .json(payload)
            .send()
            .await?;
        Ok(Self::check(response).await?.json().await?)
    }

    /// Submit a parsed request for classification
    pub async fn analyze(&self, payload: &RequestPayload) -> Result<AnalyzeVerdict, ApiError> {
        let response = self
            .client
            .post(self.endpoint(constants::ANALYZE_PATH))
            .json(payload)
            .send()
            .await?;
        Ok(Self::check(response).await?.json().await?)
    }

    /// Fetch aggregate dashboard telemetry
    pub async fn dashboard_stats(&self) -> Result<DashboardStats, ApiError> {
        let response = self
            .client
            .get(self.endpoint(constants::DASHBOARD_PATH))
            .send()
            .await?;
        Ok(Self::check(response).await?.json().await?)
    }

    /// Look up a URL's reputation
    pub async fn check_url(&self, url: &str) -> Result<ReputationVerdict, ApiError> {
        let response = self
            .client
            .post(self.endpoint(constants::CHECK_URL_PATH))
            .json(&CheckUrlBody { url })
            .send()
            .await?;
        Ok(Self::check(response).await?.json().await?)
    }
}
