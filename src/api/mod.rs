//! Backend API surface: request types, the transport trait, the reqwest
//! implementation, and client-side validation shared by every entry point.

pub mod backend;
pub mod client;
pub mod error;
pub mod github;
pub mod types;

pub use backend::AnalysisBackend;
pub use client::HttpBackend;
pub use error::{ApiError, ApiResult};

use chrono::Utc;
use rand::{distributions::Alphanumeric, Rng};
use url::Url;

/// Validate a repository URL before submitting it to the backend. The
/// messages are user-facing and returned verbatim by the CLI.
pub fn validate_repository_url(url: &str, include_github_issues: bool) -> ApiResult<()> {
    let trimmed = url.trim();
    if trimmed.is_empty() {
        return Err(ApiError::Validation(
            "Please enter a repository URL".to_string(),
        ));
    }

    if !is_valid_repo_url(trimmed) {
        return Err(ApiError::Validation(
            "Please enter a valid GitHub or GitLab repository URL".to_string(),
        ));
    }

    if include_github_issues && !trimmed.contains("github.com") {
        return Err(ApiError::Validation(
            "GitHub issues analysis is only available for GitHub repositories".to_string(),
        ));
    }

    Ok(())
}

/// Accepts `https://github.com/<owner>/<repo>` or the GitLab equivalent,
/// with an optional trailing slash. Owner and repo are limited to word
/// characters, hyphens, and dots.
fn is_valid_repo_url(raw: &str) -> bool {
    let Ok(parsed) = Url::parse(raw) else {
        return false;
    };

    if parsed.scheme() != "https" || parsed.query().is_some() || parsed.fragment().is_some() {
        return false;
    }

    match parsed.host_str() {
        Some("github.com") | Some("gitlab.com") => {}
        _ => return false,
    }

    let segments: Vec<&str> = parsed.path().trim_matches('/').split('/').collect();
    segments.len() == 2
        && segments
            .iter()
            .all(|segment| !segment.is_empty() && segment.chars().all(is_segment_char))
}

fn is_segment_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_' || c == '-' || c == '.'
}

/// Generate a client-side analysis id: `analysis_<unix millis>_<9 random
/// lowercase alphanumerics>`. The backend echoes it back or assigns its own.
pub fn generate_analysis_id() -> String {
    let millis = Utc::now().timestamp_millis();
    let suffix: String = rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(9)
        .map(char::from)
        .collect::<String>()
        .to_lowercase();

    format!("analysis_{millis}_{suffix}")
}

/// Split a GitHub repository URL into its owner and repo segments, as the
/// auto-fix endpoint wants them separately.
pub fn parse_github_owner_repo(repository_url: &str) -> ApiResult<(String, String)> {
    let parsed = Url::parse(repository_url).map_err(|_| {
        ApiError::Validation(format!("Invalid repository URL: {repository_url}"))
    })?;

    if parsed.host_str() != Some("github.com") {
        return Err(ApiError::Validation(
            "Auto-fix is only available for GitHub repositories".to_string(),
        ));
    }

    let mut segments = parsed.path().trim_matches('/').split('/');
    match (segments.next(), segments.next()) {
        (Some(owner), Some(repo)) if !owner.is_empty() && !repo.is_empty() => Ok((
            owner.to_string(),
            repo.trim_end_matches(".git").to_string(),
        )),
        _ => Err(ApiError::Validation(format!(
            "Repository URL has no owner/repo path: {repository_url}"
        ))),
    }
}
