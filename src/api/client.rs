//! HTTP implementation of the analysis backend.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;

use crate::DEFAULT_API_URL;

use super::backend::AnalysisBackend;
use super::error::{ApiError, ApiResult};
use super::types::{
    AutoFixRequest, AutoFixResponse, CreatePrRequest, CreatePrResponse, ErrorBody, RefreshRequest,
    StatusResponse, SubmitRequest, SubmitResponse,
};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Client for the code-review backend API.
#[derive(Clone)]
pub struct HttpBackend {
    client: Client,
    base_url: String,
}

impl HttpBackend {
    /// Create a client against the default backend URL.
    pub fn new() -> Self {
        Self::with_url(DEFAULT_API_URL.to_string())
    }

    /// Create a client against a custom backend URL.
    pub fn with_url(base_url: String) -> Self {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .unwrap_or_else(|_| Client::new());

        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Turn a non-2xx response into a `ServerError`, preferring the JSON
    /// error payload over the raw body.
    async fn error_from(response: reqwest::Response) -> ApiError {
        let status = response.status().as_u16();
        let raw = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<ErrorBody>(&raw)
            .ok()
            .and_then(ErrorBody::into_message)
            .unwrap_or_else(|| {
                if raw.is_empty() {
                    format!("HTTP error! status: {status}")
                } else {
                    raw
                }
            });

        ApiError::ServerError { status, message }
    }
}

#[async_trait]
impl AnalysisBackend for HttpBackend {
    async fn submit(&self, request: &SubmitRequest) -> ApiResult<SubmitResponse> {
        let url = format!("{}/api/analyze", self.base_url);
        let response = self.client.post(&url).json(request).send().await?;

        if !response.status().is_success() {
            return Err(Self::error_from(response).await);
        }

        let submitted: SubmitResponse = response.json().await?;
        Ok(submitted)
    }

    async fn fetch_status(&self, analysis_id: &str) -> ApiResult<StatusResponse> {
        let url = format!("{}/api/analyze/{}", self.base_url, analysis_id);
        let response = self.client.get(&url).send().await?;

        if response.status().as_u16() == 404 {
            return Err(ApiError::NotFound {
                id: analysis_id.to_string(),
            });
        }

        if !response.status().is_success() {
            return Err(Self::error_from(response).await);
        }

        let status: StatusResponse = response.json().await?;
        Ok(status)
    }

    async fn request_refresh(
        &self,
        analysis_id: &str,
        request: &RefreshRequest,
    ) -> ApiResult<()> {
        let url = format!("{}/api/analyze/{}/refresh", self.base_url, analysis_id);
        let response = self.client.post(&url).json(request).send().await?;

        if response.status().as_u16() == 404 {
            return Err(ApiError::NotFound {
                id: analysis_id.to_string(),
            });
        }

        if !response.status().is_success() {
            return Err(Self::error_from(response).await);
        }

        Ok(())
    }

    async fn create_pull_request(&self, request: &CreatePrRequest) -> ApiResult<CreatePrResponse> {
        let url = format!("{}/api/pr/create", self.base_url);
        let response = self.client.post(&url).json(request).send().await?;

        if !response.status().is_success() {
            return Err(Self::error_from(response).await);
        }

        let created: CreatePrResponse = response.json().await?;
        Ok(created)
    }

    async fn auto_fix(&self, request: &AutoFixRequest) -> ApiResult<AutoFixResponse> {
        let url = format!("{}/api/pr/fix/auto", self.base_url);
        let response = self.client.post(&url).json(request).send().await?;

        if !response.status().is_success() {
            return Err(Self::error_from(response).await);
        }

        let outcome: AutoFixResponse = response.json().await?;
        Ok(outcome)
    }

    async fn health(&self) -> ApiResult<()> {
        let url = format!("{}/health", self.base_url);
        let response = self.client.get(&url).send().await?;

        if !response.status().is_success() {
            return Err(Self::error_from(response).await);
        }

        Ok(())
    }
}

impl Default for HttpBackend {
    fn default() -> Self {
        Self::new()
    }
}
