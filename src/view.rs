//! Render-ready projections of reconciled analysis state. Pure functions;
//! all I/O stays with the caller.

use std::fmt::Write as _;

use url::Url;

use crate::models::{Analysis, AnalysisStatus, FileAnalysis, FinalReport};

/// The five states a watcher can be in, derived from the latest snapshot.
#[derive(Debug, PartialEq)]
pub enum ViewState<'a> {
    LoadingInitial,
    Processing {
        repository_name: String,
        progress: u8,
    },
    Failed {
        error: String,
    },
    Completed {
        report: &'a FinalReport,
        duration_secs: i64,
    },
    UnexpectedStatus {
        status: String,
    },
}

pub fn view_state(analysis: Option<&Analysis>) -> ViewState<'_> {
    let Some(analysis) = analysis else {
        return ViewState::LoadingInitial;
    };

    match &analysis.status {
        AnalysisStatus::Processing => ViewState::Processing {
            repository_name: repository_name(&analysis.repository_url),
            progress: analysis.progress,
        },
        AnalysisStatus::Failed => ViewState::Failed {
            error: analysis
                .error
                .clone()
                .unwrap_or_else(|| "An unknown error occurred during analysis.".to_string()),
        },
        AnalysisStatus::Completed => match &analysis.results {
            Some(report) => ViewState::Completed {
                report,
                duration_secs: (analysis.updated_at - analysis.created_at).num_seconds(),
            },
            // Completed without a report is not a state we know how to
            // show; fall through like any unrecognized status.
            None => ViewState::UnexpectedStatus {
                status: analysis.status.as_str().to_string(),
            },
        },
        AnalysisStatus::Unknown(raw) => ViewState::UnexpectedStatus { status: raw.clone() },
    }
}

/// Repository display name: the URL path without its leading slash, or the
/// raw input when it does not parse as a URL.
pub fn repository_name(url: &str) -> String {
    match Url::parse(url) {
        Ok(parsed) => {
            let path = parsed.path();
            path.strip_prefix('/').unwrap_or(path).to_string()
        }
        Err(_) => url.to_string(),
    }
}

/// One-screen text rendering of the current state.
pub fn render_text(state: &ViewState<'_>) -> String {
    match state {
        ViewState::LoadingInitial => {
            "Loading Analysis\nFetching analysis status...".to_string()
        }
        ViewState::Processing {
            repository_name,
            progress,
        } => format!(
            "Analyzing {repository_name}\nExamining your code for bugs, security issues, and optimization opportunities.\nProgress: {progress}%"
        ),
        ViewState::Failed { error } => {
            format!("Analysis Failed\n{error}\nRun the analyze command again to retry.")
        }
        ViewState::Completed {
            report,
            duration_secs,
        } => format!(
            "Analysis completed in {duration_secs}s\n\n{}",
            render_report(report)
        ),
        ViewState::UnexpectedStatus { status } => {
            format!("Unexpected Status\nStatus: {status}")
        }
    }
}

/// Full report rendering for completed analyses.
pub fn render_report(report: &FinalReport) -> String {
    let mut out = String::new();
    let overview = &report.overview;

    let _ = writeln!(out, "Repository: {}", overview.repository_name);
    let _ = writeln!(
        out,
        "Files: {}  Lines: {}  Score: {}  Risk: {}",
        overview.total_files,
        overview.lines_of_code,
        overview.overall_score,
        overview.risk_level.as_str()
    );

    let _ = writeln!(out, "\nCategories");
    for (label, score) in [
        ("Code quality", &report.categories.code_quality),
        ("Security", &report.categories.security),
        ("Performance", &report.categories.performance),
        ("Maintainability", &report.categories.maintainability),
    ] {
        let _ = writeln!(
            out,
            "  {label:<16} {:>5}  ({} issues, {} critical)",
            score.score, score.issues, score.critical_issues
        );
    }

    if !report.file_analysis.is_empty() {
        let _ = writeln!(out, "\nFiles");
        for file in &report.file_analysis {
            render_file(&mut out, file);
        }
    }

    let recommendations = &report.recommendations;
    for (label, entries) in [
        ("Immediate", &recommendations.immediate),
        ("Short term", &recommendations.short_term),
        ("Long term", &recommendations.long_term),
    ] {
        if entries.is_empty() {
            continue;
        }
        let _ = writeln!(out, "\n{label}");
        for entry in entries {
            let _ = writeln!(out, "  - {entry}");
        }
    }

    if let Some(github) = &report.github_issues {
        let _ = writeln!(out, "\nGitHub issues ({})", github.total_issues);
        for analysis in &github.analyses {
            let issue = &analysis.issue;
            let _ = writeln!(
                out,
                "  #{} {} [{}] priority {}",
                issue.number,
                issue.title,
                match issue.state {
                    crate::models::IssueState::Open => "open",
                    crate::models::IssueState::Closed => "closed",
                },
                analysis.priority
            );
            let _ = writeln!(out, "      {}", analysis.solution.summary);
        }
    }

    out
}

fn render_file(out: &mut String, file: &FileAnalysis) {
    let _ = writeln!(
        out,
        "  {}  score {}  maintainability {}",
        file.file_path, file.score, file.maintainability
    );

    for issue in &file.issues {
        let location = issue
            .line
            .map(|line| format!("line {line}"))
            .unwrap_or_else(|| "file".to_string());
        let _ = writeln!(
            out,
            "    [{} {}] {}: {}",
            issue.severity.as_str(),
            issue.issue_type.as_str(),
            location,
            issue.message
        );
    }
}
