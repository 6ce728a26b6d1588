//! Direct GitHub API access for repository listing. This talks to
//! api.github.com with the user's token, not to the analysis backend.

use std::time::Duration;

use reqwest::header::{ACCEPT, AUTHORIZATION, USER_AGENT};
use serde::Deserialize;

use super::error::{ApiError, ApiResult};

const GITHUB_REPOS_URL: &str = "https://api.github.com/user/repos?sort=updated&per_page=100";

#[derive(Debug, Clone, Deserialize)]
pub struct GithubRepo {
    pub id: u64,
    pub name: String,
    pub full_name: String,
    pub html_url: String,
    pub description: Option<String>,
    pub private: bool,
    pub fork: bool,
    pub stargazers_count: u32,
    pub language: Option<String>,
    pub updated_at: String,
}

/// List the authenticated user's repositories, most recently updated first.
pub async fn list_user_repos(token: &str) -> ApiResult<Vec<GithubRepo>> {
    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(30))
        .build()
        .unwrap_or_else(|_| reqwest::Client::new());

    let response = client
        .get(GITHUB_REPOS_URL)
        .header(AUTHORIZATION, format!("Bearer {token}"))
        .header(ACCEPT, "application/vnd.github.v3+json")
        .header(USER_AGENT, "codelens")
        .send()
        .await?;

    if !response.status().is_success() {
        return Err(ApiError::ServerError {
            status: response.status().as_u16(),
            message: format!("GitHub API error: {}", response.status().as_u16()),
        });
    }

    let repos: Vec<GithubRepo> = response.json().await?;
    Ok(repos)
}
