//! Command-line surface: argument definitions plus the handlers wiring the
//! backend client, the poller, and the local mirror together.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{anyhow, bail, Context, Result};
use clap::{Parser, Subcommand};
use log::warn;

use crate::api::types::{AutoFixRequest, CreatePrRequest, IssueType, RefreshRequest};
use crate::api::{github, AnalysisBackend, HttpBackend};
use crate::db::Database;
use crate::models::{Analysis, FinalReport, IssueSuggestion};
use crate::notify::ConsoleNotifier;
use crate::poller::{reconcile_once, refresh_wait, PollConfig, PollController, RefreshOutcome};
use crate::settings::SettingsStore;
use crate::view;
use crate::{data_dir, submit_analysis, AppContext, DEFAULT_API_URL};

/// Repository code review from the terminal: submit analyses, watch their
/// progress, and act on the findings.
#[derive(Parser)]
#[command(name = "codelens", version, about)]
pub struct Cli {
    /// Backend base URL
    #[arg(long, global = true, env = "CODELENS_API_URL")]
    pub api_url: Option<String>,

    /// Path of the local state database
    #[arg(long, global = true, value_name = "FILE")]
    pub db_path: Option<PathBuf>,

    /// Run without the local state database
    #[arg(long, global = true)]
    pub no_mirror: bool,

    /// GitHub token for private repositories and pull requests
    #[arg(long, global = true, env = "CODELENS_GITHUB_TOKEN", hide_env_values = true)]
    pub github_token: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Submit a repository for analysis and watch it complete
    Analyze {
        /// HTTPS URL of the GitHub or GitLab repository
        repository_url: String,

        /// Also analyze the repository's open GitHub issues
        #[arg(long)]
        include_github_issues: bool,

        /// Print the analysis id and exit instead of watching
        #[arg(long)]
        no_watch: bool,
    },

    /// Watch a running analysis until it finishes
    Watch { analysis_id: String },

    /// Show the current state of an analysis once
    Status { analysis_id: String },

    /// List locally stored analyses, newest first
    History,

    /// Remove an analysis from local storage
    Delete { analysis_id: String },

    /// Print the full report of a completed analysis
    Report { analysis_id: String },

    /// Open a pull request that fixes a reported issue
    Pr {
        analysis_id: String,

        /// Issue to fix: a GitHub issue number or a code issue message
        issue_identifier: String,

        #[arg(long, value_enum, default_value = "code")]
        issue_type: IssueType,

        /// File the issue belongs to (code issues)
        #[arg(long)]
        file_path: Option<String>,
    },

    /// Apply a suggested fix directly to the repository
    Fix {
        analysis_id: String,

        /// File whose first suggested fix should be applied
        file_path: String,
    },

    /// Ask the backend to re-analyze, optionally for a single file
    Refresh {
        analysis_id: String,

        #[arg(long)]
        file_path: Option<String>,

        /// Block until the refresh lands
        #[arg(long)]
        wait: bool,
    },

    /// List your GitHub repositories, most recently updated first
    Repos,

    /// Check that the backend is reachable
    Health,

    /// Manage the stored GitHub token
    Token {
        #[command(subcommand)]
        action: TokenAction,
    },
}

#[derive(Subcommand)]
pub enum TokenAction {
    /// Store a token for future runs
    Set { value: String },
    /// Forget the stored token
    Clear,
}

pub async fn run(cli: Cli) -> Result<()> {
    let ctx = build_context(&cli)?;

    match cli.command {
        Commands::Analyze {
            repository_url,
            include_github_issues,
            no_watch,
        } => run_analyze(&ctx, &repository_url, include_github_issues, !no_watch).await,
        Commands::Watch { analysis_id } => watch_analysis(&ctx, &analysis_id).await,
        Commands::Status { analysis_id } => run_status(&ctx, &analysis_id).await,
        Commands::History => run_history(&ctx).await,
        Commands::Delete { analysis_id } => run_delete(&ctx, &analysis_id).await,
        Commands::Report { analysis_id } => run_report(&ctx, &analysis_id).await,
        Commands::Pr {
            analysis_id,
            issue_identifier,
            issue_type,
            file_path,
        } => run_pr(&ctx, &analysis_id, issue_type, &issue_identifier, file_path).await,
        Commands::Fix {
            analysis_id,
            file_path,
        } => run_fix(&ctx, &analysis_id, &file_path).await,
        Commands::Refresh {
            analysis_id,
            file_path,
            wait,
        } => run_refresh(&ctx, &analysis_id, file_path, wait).await,
        Commands::Repos => run_repos(&ctx).await,
        Commands::Health => run_health(&ctx).await,
        Commands::Token { action } => run_token(&ctx, action),
    }
}

fn build_context(cli: &Cli) -> Result<AppContext> {
    let data_dir = data_dir()?;
    let settings = SettingsStore::new(data_dir.join("settings.json"))?;

    let api_url = cli
        .api_url
        .clone()
        .or_else(|| settings.api_url())
        .unwrap_or_else(|| DEFAULT_API_URL.to_string());
    let backend: Arc<dyn AnalysisBackend> = Arc::new(HttpBackend::with_url(api_url));

    let db = if cli.no_mirror {
        None
    } else {
        let db_path = cli
            .db_path
            .clone()
            .or_else(|| settings.database_path())
            .unwrap_or_else(|| data_dir.join("codelens.sqlite3"));
        match Database::new(db_path) {
            Ok(db) => Some(db),
            Err(err) => {
                warn!("local state database unavailable, continuing without it: {err:#}");
                None
            }
        }
    };

    Ok(AppContext {
        backend,
        db,
        settings,
        notifier: Arc::new(ConsoleNotifier),
        github_token_override: cli.github_token.clone(),
    })
}

async fn run_analyze(
    ctx: &AppContext,
    repository_url: &str,
    include_github_issues: bool,
    watch: bool,
) -> Result<()> {
    let analysis_id = submit_analysis(ctx, repository_url, include_github_issues)
        .await
        .context("Failed to start analysis")?;

    if watch {
        ctx.notifier
            .info(&format!("Started analysis {analysis_id}"));
        watch_analysis(ctx, &analysis_id).await
    } else {
        println!("{analysis_id}");
        Ok(())
    }
}

/// Render every published snapshot until the poll loop finishes or the
/// user interrupts; either way the loop is stopped before returning.
async fn watch_analysis(ctx: &AppContext, analysis_id: &str) -> Result<()> {
    let mut controller = PollController::new(PollConfig::status_watch());
    let mut rx = controller.start(
        analysis_id.to_string(),
        ctx.backend.clone(),
        ctx.db.clone(),
    )?;

    let mut last_render = String::new();
    loop {
        let rendered = {
            let snapshot = rx.borrow_and_update();
            view::render_text(&view::view_state(snapshot.as_ref()))
        };
        if rendered != last_render {
            println!("{rendered}");
            println!();
            last_render = rendered;
        }

        tokio::select! {
            changed = rx.changed() => {
                if changed.is_err() {
                    break;
                }
            }
            _ = tokio::signal::ctrl_c() => {
                ctx.notifier.info("Stopping watch; the analysis keeps running remotely.");
                break;
            }
        }
    }

    controller.stop().await
}

async fn run_status(ctx: &AppContext, analysis_id: &str) -> Result<()> {
    match reconcile_once(ctx.backend.as_ref(), ctx.db.as_ref(), analysis_id).await {
        Ok(snapshot) => {
            println!("{}", view::render_text(&view::view_state(Some(&snapshot))));
            Ok(())
        }
        Err(err) => {
            let stored = match &ctx.db {
                Some(db) => db.get_analysis(analysis_id).await.ok().flatten(),
                None => None,
            };
            match stored {
                Some(stored) => {
                    warn!("backend unavailable, showing last stored state: {err}");
                    println!("{}", view::render_text(&view::view_state(Some(&stored))));
                    Ok(())
                }
                None => Err(err.into()),
            }
        }
    }
}

async fn run_history(ctx: &AppContext) -> Result<()> {
    let Some(db) = &ctx.db else {
        bail!("History needs the local state database; run without --no-mirror");
    };

    let analyses = db.list_analyses().await?;
    if analyses.is_empty() {
        ctx.notifier.info("No analyses stored yet.");
        return Ok(());
    }

    for analysis in analyses {
        println!(
            "{}  {:<10}  {:>3}%  {}  {}",
            analysis.updated_at.format("%Y-%m-%d %H:%M"),
            analysis.status.as_str(),
            analysis.progress,
            analysis.id,
            analysis.repository_url
        );
    }
    Ok(())
}

async fn run_delete(ctx: &AppContext, analysis_id: &str) -> Result<()> {
    let Some(db) = &ctx.db else {
        bail!("Delete needs the local state database; run without --no-mirror");
    };

    db.delete_analysis(analysis_id).await?;
    ctx.notifier
        .success(&format!("Deleted {analysis_id} from local storage."));
    Ok(())
}

async fn run_report(ctx: &AppContext, analysis_id: &str) -> Result<()> {
    let report = load_report(ctx, analysis_id).await?;
    print!("{}", view::render_report(&report));
    Ok(())
}

async fn run_pr(
    ctx: &AppContext,
    analysis_id: &str,
    issue_type: IssueType,
    issue_identifier: &str,
    file_path: Option<String>,
) -> Result<()> {
    let token = require_token(ctx)?;

    // The backend locates the block to rewrite from the original code in
    // the report, so pull it out when the report is available.
    let mut file_path = file_path;
    let mut original_code = None;
    match load_report(ctx, analysis_id).await {
        Ok(report) => {
            let (found_path, found_code) =
                lookup_issue_code(&report, issue_type, issue_identifier, file_path.as_deref());
            if file_path.is_none() {
                file_path = found_path;
            }
            original_code = found_code;
        }
        Err(err) => warn!("continuing without report context: {err:#}"),
    }

    let request = CreatePrRequest {
        analysis_id: analysis_id.to_string(),
        issue_type,
        issue_identifier: issue_identifier.to_string(),
        file_path,
        original_code,
        github_token: token,
    };

    let response = ctx.backend.create_pull_request(&request).await?;
    match response.pr_url {
        Some(url) => {
            ctx.notifier.success("✅ Pull Request created successfully!");
            println!("{url}");
            Ok(())
        }
        None => bail!(response
            .message
            .unwrap_or_else(|| "An unknown error occurred.".to_string())),
    }
}

async fn run_fix(ctx: &AppContext, analysis_id: &str, file_path: &str) -> Result<()> {
    let token = require_token(ctx)?;

    let snapshot = load_snapshot(ctx, analysis_id).await?;
    let report = match snapshot.results.clone() {
        Some(report) => report,
        None => load_report(ctx, analysis_id).await?,
    };
    let (owner, repo) = crate::api::parse_github_owner_repo(&snapshot.repository_url)?;

    let suggestion = find_file_suggestion(&report, file_path)
        .ok_or_else(|| anyhow!("No fix suggestion available for {file_path}"))?;

    let request = AutoFixRequest {
        github_token: token,
        owner,
        repo,
        file_path: file_path.to_string(),
        original_code: suggestion.original_code.clone(),
        fixed_code: suggestion.fixed_code.clone(),
    };

    let response = ctx.backend.auto_fix(&request).await?;
    if response.success {
        let strategy = response
            .strategy
            .unwrap_or_else(|| "Direct commit".to_string());
        ctx.notifier
            .success(&format!("✅ Fix applied successfully! ({strategy})"));
        return Ok(());
    }

    let message = response
        .message
        .unwrap_or_else(|| "Failed to apply fix".to_string());
    if message.contains("Couldn't apply the fix") {
        ctx.notifier
            .info("File has changed since analysis. Try refreshing the analysis first.");
    }
    bail!(message)
}

async fn run_refresh(
    ctx: &AppContext,
    analysis_id: &str,
    file_path: Option<String>,
    wait: bool,
) -> Result<()> {
    let request = RefreshRequest {
        file_path,
        github_token: ctx.github_token(),
    };
    ctx.backend.request_refresh(analysis_id, &request).await?;
    ctx.notifier
        .success("Analysis refresh started. Check back in a moment.");

    if !wait {
        return Ok(());
    }

    match refresh_wait(
        ctx.backend.as_ref(),
        analysis_id,
        &PollConfig::refresh_watch(),
    )
    .await
    {
        RefreshOutcome::Completed => {
            ctx.notifier.success("Analysis refreshed successfully!");
            Ok(())
        }
        RefreshOutcome::Failed(message) => bail!("Refresh failed: {message}"),
        RefreshOutcome::TimedOut => bail!("Analysis refresh timed out"),
        RefreshOutcome::CheckError(message) => bail!("Error checking refresh status: {message}"),
    }
}

async fn run_repos(ctx: &AppContext) -> Result<()> {
    let token = require_token(ctx)?;
    let repos = github::list_user_repos(&token).await?;

    if repos.is_empty() {
        ctx.notifier.info("No repositories found for this token.");
        return Ok(());
    }

    for repo in repos {
        let mut markers = Vec::new();
        if repo.private {
            markers.push("private");
        }
        if repo.fork {
            markers.push("fork");
        }
        let markers = if markers.is_empty() {
            String::new()
        } else {
            format!(" [{}]", markers.join(", "))
        };

        println!(
            "{}{}  stars {}  {}",
            repo.full_name,
            markers,
            repo.stargazers_count,
            repo.language.as_deref().unwrap_or("-")
        );
        println!("    {}", repo.html_url);
    }
    Ok(())
}

async fn run_health(ctx: &AppContext) -> Result<()> {
    ctx.backend
        .health()
        .await
        .context("Backend health check failed")?;
    ctx.notifier.success("Backend is healthy.");
    Ok(())
}

fn run_token(ctx: &AppContext, action: TokenAction) -> Result<()> {
    match action {
        TokenAction::Set { value } => {
            ctx.settings.set_github_token(Some(value))?;
            ctx.notifier.success("GitHub token saved.");
        }
        TokenAction::Clear => {
            ctx.settings.set_github_token(None)?;
            ctx.notifier.success("GitHub token cleared.");
        }
    }
    Ok(())
}

fn require_token(ctx: &AppContext) -> Result<String> {
    ctx.github_token().ok_or_else(|| {
        anyhow!("A GitHub token is required; pass --github-token or run `codelens token set`")
    })
}

/// Last known snapshot: the mirror when it has one, the backend otherwise.
async fn load_snapshot(ctx: &AppContext, analysis_id: &str) -> Result<Analysis> {
    if let Some(db) = &ctx.db {
        if let Some(stored) = db.get_analysis(analysis_id).await? {
            return Ok(stored);
        }
    }

    reconcile_once(ctx.backend.as_ref(), ctx.db.as_ref(), analysis_id)
        .await
        .map_err(Into::into)
}

/// The report for an analysis, refetching when the mirror has none yet.
async fn load_report(ctx: &AppContext, analysis_id: &str) -> Result<FinalReport> {
    if let Some(db) = &ctx.db {
        if let Some(stored) = db.get_analysis(analysis_id).await? {
            if let Some(report) = stored.results {
                return Ok(report);
            }
        }
    }

    let snapshot = reconcile_once(ctx.backend.as_ref(), ctx.db.as_ref(), analysis_id).await?;
    snapshot
        .results
        .ok_or_else(|| anyhow!("Analysis {analysis_id} has no completed report yet"))
}

fn find_file_suggestion<'a>(
    report: &'a FinalReport,
    file_path: &str,
) -> Option<&'a IssueSuggestion> {
    report
        .file_analysis
        .iter()
        .find(|file| file.file_path == file_path)?
        .issues
        .iter()
        .find_map(|issue| issue.suggestion.as_ref())
}

/// Resolve the file and original code for an issue out of the report. Code
/// issues match on the issue message within the given file; GitHub issues
/// match on issue number or title and carry their own solution location.
fn lookup_issue_code(
    report: &FinalReport,
    issue_type: IssueType,
    issue_identifier: &str,
    file_path: Option<&str>,
) -> (Option<String>, Option<String>) {
    match issue_type {
        IssueType::Code => {
            let Some(path) = file_path else {
                return (None, None);
            };
            let Some(file) = report
                .file_analysis
                .iter()
                .find(|file| file.file_path == path)
            else {
                return (None, None);
            };

            let matched = file
                .issues
                .iter()
                .find(|issue| issue.message == issue_identifier)
                .and_then(|issue| issue.suggestion.as_ref())
                .or_else(|| {
                    file.issues
                        .iter()
                        .find_map(|issue| issue.suggestion.as_ref())
                });

            (
                Some(path.to_string()),
                matched.map(|suggestion| suggestion.original_code.clone()),
            )
        }
        IssueType::Github => {
            let Some(github) = &report.github_issues else {
                return (None, None);
            };
            let number: Option<u32> = issue_identifier.parse().ok();
            let matched = github.analyses.iter().find(|analysis| {
                number == Some(analysis.issue.number) || analysis.issue.title == issue_identifier
            });

            match matched {
                Some(analysis) => (
                    analysis.solution.file_path.clone(),
                    analysis.solution.original_code.clone(),
                ),
                None => (None, None),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use tempfile::TempDir;

    use crate::models::AnalysisStatus;
    use crate::notify::test_support::RecordingNotifier;
    use crate::poller::test_support::{ScriptStep, ScriptedBackend};

    use super::*;

    fn sample_report() -> FinalReport {
        serde_json::from_str(crate::models::report::SAMPLE_REPORT_JSON).unwrap()
    }

    fn test_context(
        dir: &TempDir,
        backend: Arc<dyn AnalysisBackend>,
        with_db: bool,
    ) -> (AppContext, Arc<RecordingNotifier>) {
        let notifier = Arc::new(RecordingNotifier::default());
        let db = if with_db {
            Some(Database::new(dir.path().join("mirror.sqlite3")).unwrap())
        } else {
            None
        };

        let ctx = AppContext {
            backend,
            db,
            settings: SettingsStore::new(dir.path().join("settings.json")).unwrap(),
            notifier: notifier.clone(),
            github_token_override: None,
        };
        (ctx, notifier)
    }

    #[test]
    fn analyze_parses_flags() {
        let cli = Cli::try_parse_from([
            "codelens",
            "analyze",
            "https://github.com/acme/widget",
            "--include-github-issues",
            "--no-watch",
        ])
        .unwrap();

        match cli.command {
            Commands::Analyze {
                repository_url,
                include_github_issues,
                no_watch,
            } => {
                assert_eq!(repository_url, "https://github.com/acme/widget");
                assert!(include_github_issues);
                assert!(no_watch);
            }
            _ => panic!("expected analyze"),
        }
    }

    #[test]
    fn pr_defaults_to_code_issues() {
        let cli = Cli::try_parse_from(["codelens", "pr", "analysis_1", "some issue"]).unwrap();
        match cli.command {
            Commands::Pr {
                issue_type,
                file_path,
                ..
            } => {
                assert_eq!(issue_type, IssueType::Code);
                assert!(file_path.is_none());
            }
            _ => panic!("expected pr"),
        }
    }

    #[test]
    fn global_flags_parse_after_the_subcommand() {
        let cli = Cli::try_parse_from([
            "codelens",
            "status",
            "analysis_1",
            "--api-url",
            "http://localhost:3001",
            "--no-mirror",
        ])
        .unwrap();

        assert_eq!(cli.api_url.as_deref(), Some("http://localhost:3001"));
        assert!(cli.no_mirror);
    }

    #[test]
    fn token_subcommands_parse() {
        let cli = Cli::try_parse_from(["codelens", "token", "set", "ghp_abc"]).unwrap();
        match cli.command {
            Commands::Token {
                action: TokenAction::Set { value },
            } => assert_eq!(value, "ghp_abc"),
            _ => panic!("expected token set"),
        }

        let cli = Cli::try_parse_from(["codelens", "token", "clear"]).unwrap();
        assert!(matches!(
            cli.command,
            Commands::Token {
                action: TokenAction::Clear
            }
        ));
    }

    #[test]
    fn code_issue_lookup_pulls_the_original_code() {
        let report = sample_report();
        let (path, code) = lookup_issue_code(
            &report,
            IssueType::Code,
            "String-built SQL allows injection",
            Some("src/db.py"),
        );
        assert_eq!(path.as_deref(), Some("src/db.py"));
        assert!(code.unwrap().contains("cur.execute"));
    }

    #[test]
    fn github_issue_lookup_matches_by_number() {
        let report = sample_report();
        let (path, code) = lookup_issue_code(&report, IssueType::Github, "17", None);
        assert_eq!(path.as_deref(), Some("src/config.py"));
        // The sample solution carries no code block.
        assert!(code.is_none());
    }

    #[test]
    fn fix_lookup_finds_the_first_suggestion() {
        let report = sample_report();
        let suggestion = find_file_suggestion(&report, "src/db.py").unwrap();
        assert!(suggestion.fixed_code.contains('?'));
        assert!(find_file_suggestion(&report, "src/other.py").is_none());
    }

    #[tokio::test]
    async fn status_falls_back_to_the_mirror_when_the_backend_is_down() {
        let dir = TempDir::new().unwrap();
        let backend = Arc::new(ScriptedBackend::new(vec![ScriptStep::ServerError(503)]));
        let (ctx, _notifier) = test_context(&dir, backend, true);

        let mut stored = Analysis::processing(
            "analysis_1".to_string(),
            "https://github.com/acme/widget".to_string(),
            Utc::now(),
        );
        stored.status = AnalysisStatus::Completed;
        stored.progress = 100;
        ctx.db.as_ref().unwrap().insert_analysis(&stored).await.unwrap();

        assert!(run_status(&ctx, "analysis_1").await.is_ok());
    }

    #[tokio::test]
    async fn status_without_mirror_or_backend_errors_out() {
        let dir = TempDir::new().unwrap();
        let backend = Arc::new(ScriptedBackend::new(vec![ScriptStep::ServerError(503)]));
        let (ctx, _notifier) = test_context(&dir, backend, false);

        assert!(run_status(&ctx, "analysis_1").await.is_err());
    }

    #[tokio::test]
    async fn token_commands_update_settings_and_notify() {
        let dir = TempDir::new().unwrap();
        let backend = Arc::new(ScriptedBackend::new(vec![]));
        let (ctx, notifier) = test_context(&dir, backend, false);

        run_token(
            &ctx,
            TokenAction::Set {
                value: "ghp_saved".to_string(),
            },
        )
        .unwrap();
        assert_eq!(ctx.settings.github_token().as_deref(), Some("ghp_saved"));

        run_token(&ctx, TokenAction::Clear).unwrap();
        assert!(ctx.settings.github_token().is_none());

        let recorded = notifier.recorded();
        assert_eq!(recorded.len(), 2);
        assert_eq!(recorded[0].0, "success");
    }

    #[tokio::test]
    async fn history_requires_the_mirror() {
        let dir = TempDir::new().unwrap();
        let backend = Arc::new(ScriptedBackend::new(vec![]));
        let (ctx, _notifier) = test_context(&dir, backend, false);

        let err = run_history(&ctx).await.unwrap_err();
        assert!(err.to_string().contains("--no-mirror"));
    }
}
