//! Request and response payloads for the analysis backend.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::{AnalysisStatus, FinalReport};

/// Status payload returned by `GET /api/analyze/{id}`.
///
/// Everything except `status` is optional so a partial payload from the
/// backend still deserializes; the reconciler fills gaps from the mirror.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusResponse {
    pub id: Option<String>,
    pub status: AnalysisStatus,
    pub progress: Option<u8>,
    pub results: Option<FinalReport>,
    pub error: Option<String>,
    pub refresh_error: Option<String>,
    pub repository_url: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitRequest {
    pub repository_url: String,
    #[serde(rename = "includeGitHubIssues")]
    pub include_github_issues: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub github_token: Option<String>,
    pub analysis_id: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitResponse {
    pub analysis_id: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub github_token: Option<String>,
}

/// Whether a pull request targets a code-review issue or a GitHub issue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum IssueType {
    Code,
    Github,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatePrRequest {
    pub analysis_id: String,
    pub issue_type: IssueType,
    pub issue_identifier: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub original_code: Option<String>,
    pub github_token: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatePrResponse {
    pub pr_url: Option<String>,
    pub message: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AutoFixRequest {
    pub github_token: String,
    pub owner: String,
    pub repo: String,
    pub file_path: String,
    pub original_code: String,
    pub fixed_code: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AutoFixResponse {
    #[serde(default)]
    pub success: bool,
    pub strategy: Option<String>,
    pub message: Option<String>,
}

/// Error payload shape used across backend endpoints. Either field may be
/// present depending on the route.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ErrorBody {
    pub error: Option<String>,
    pub message: Option<String>,
}

impl ErrorBody {
    pub fn into_message(self) -> Option<String> {
        self.error.or(self.message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn submit_request_uses_backend_field_names() {
        let request = SubmitRequest {
            repository_url: "https://github.com/acme/widget".into(),
            include_github_issues: true,
            github_token: Some("ghp_secret".into()),
            analysis_id: "analysis_1712_abc".into(),
        };

        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["repositoryUrl"], "https://github.com/acme/widget");
        assert_eq!(json["includeGitHubIssues"], true);
        assert_eq!(json["githubToken"], "ghp_secret");
        assert_eq!(json["analysisId"], "analysis_1712_abc");
    }

    #[test]
    fn submit_request_omits_absent_token() {
        let request = SubmitRequest {
            repository_url: "https://github.com/acme/widget".into(),
            include_github_issues: false,
            github_token: None,
            analysis_id: "analysis_1712_abc".into(),
        };

        let json = serde_json::to_value(&request).unwrap();
        assert!(json.get("githubToken").is_none());
    }

    #[test]
    fn status_response_tolerates_minimal_payload() {
        let parsed: StatusResponse = serde_json::from_str(r#"{"status":"processing"}"#).unwrap();
        assert_eq!(parsed.status, AnalysisStatus::Processing);
        assert!(parsed.progress.is_none());
        assert!(parsed.results.is_none());
    }

    #[test]
    fn refresh_error_maps_from_camel_case() {
        let parsed: StatusResponse = serde_json::from_str(
            r#"{"status":"processing","refreshError":"fetch failed upstream"}"#,
        )
        .unwrap();
        assert_eq!(parsed.refresh_error.as_deref(), Some("fetch failed upstream"));
    }

    #[test]
    fn error_body_prefers_error_field() {
        let body: ErrorBody =
            serde_json::from_str(r#"{"error":"Invalid repository","message":"ignored"}"#).unwrap();
        assert_eq!(body.into_message().as_deref(), Some("Invalid repository"));

        let fallback: ErrorBody = serde_json::from_str(r#"{"message":"kept"}"#).unwrap();
        assert_eq!(fallback.into_message().as_deref(), Some("kept"));
    }
}
