pub mod api;
pub mod cli;
pub mod db;
pub mod models;
pub mod notify;
pub mod poller;
pub mod settings;
pub mod view;

use std::sync::Arc;
use std::{fs, path::PathBuf};

use anyhow::{Context, Result};
use chrono::Utc;
use log::warn;

use api::types::SubmitRequest;
use api::AnalysisBackend;
use db::Database;
use models::Analysis;
use notify::Notifier;
use settings::SettingsStore;

/// Hosted backend used when no override is configured.
pub const DEFAULT_API_URL: &str = "https://codereview-backend-pau3.onrender.com";

/// Everything a command needs: the backend port, the optional local mirror,
/// persisted settings, and a notifier for user-facing messages.
pub struct AppContext {
    pub backend: Arc<dyn AnalysisBackend>,
    pub db: Option<Database>,
    pub settings: SettingsStore,
    pub notifier: Arc<dyn Notifier>,
    pub github_token_override: Option<String>,
}

impl AppContext {
    /// Token from the command line or environment wins over the stored one.
    pub fn github_token(&self) -> Option<String> {
        self.github_token_override
            .clone()
            .or_else(|| self.settings.github_token())
    }
}

/// Per-user data directory holding the settings file and the local mirror.
pub fn data_dir() -> Result<PathBuf> {
    let base = dirs::data_dir().context("could not determine a data directory")?;
    let dir = base.join("codelens");
    fs::create_dir_all(&dir)
        .with_context(|| format!("Failed to create data directory {}", dir.display()))?;
    Ok(dir)
}

/// Validate and submit a new analysis, then seed the local mirror so the
/// poller has a baseline to merge into. Returns the analysis id to poll.
pub async fn submit_analysis(
    ctx: &AppContext,
    repository_url: &str,
    include_github_issues: bool,
) -> Result<String> {
    api::validate_repository_url(repository_url, include_github_issues)?;

    let request = SubmitRequest {
        repository_url: repository_url.to_string(),
        include_github_issues,
        github_token: ctx.github_token(),
        analysis_id: api::generate_analysis_id(),
    };

    let response = ctx.backend.submit(&request).await?;
    // The backend may assign its own id; keep ours when it echoes nothing.
    let analysis_id = response.analysis_id.unwrap_or_else(|| request.analysis_id.clone());

    if let Some(db) = &ctx.db {
        let record = Analysis::processing(
            analysis_id.clone(),
            repository_url.to_string(),
            Utc::now(),
        );
        if let Err(err) = db.insert_analysis(&record).await {
            warn!("failed to seed local record for {analysis_id}: {err:#}");
        }
    }

    Ok(analysis_id)
}
