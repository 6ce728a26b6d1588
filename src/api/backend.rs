use async_trait::async_trait;

use super::error::ApiResult;
use super::types::{
    AutoFixRequest, AutoFixResponse, CreatePrRequest, CreatePrResponse, RefreshRequest,
    StatusResponse, SubmitRequest, SubmitResponse,
};

/// Remote operations against the code-review backend. The poller and CLI
/// only see this trait, so tests can swap in a scripted implementation.
#[async_trait]
pub trait AnalysisBackend: Send + Sync {
    async fn submit(&self, request: &SubmitRequest) -> ApiResult<SubmitResponse>;

    async fn fetch_status(&self, analysis_id: &str) -> ApiResult<StatusResponse>;

    async fn request_refresh(
        &self,
        analysis_id: &str,
        request: &RefreshRequest,
    ) -> ApiResult<()>;

    async fn create_pull_request(&self, request: &CreatePrRequest) -> ApiResult<CreatePrResponse>;

    async fn auto_fix(&self, request: &AutoFixRequest) -> ApiResult<AutoFixResponse>;

    async fn health(&self) -> ApiResult<()>;
}
