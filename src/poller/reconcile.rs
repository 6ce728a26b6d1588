//! Per-tick reconciliation of remote status against the local mirror.

use chrono::{DateTime, Utc};
use log::warn;

use crate::api::types::StatusResponse;
use crate::api::{AnalysisBackend, ApiError};
use crate::db::Database;
use crate::models::{Analysis, AnalysisStatus};

use super::session::PollSession;
use super::PollConfig;

const TIMEOUT_ERROR: &str = "Analysis timed out after 5 minutes";
const FETCH_FAILED_ERROR: &str = "unable to fetch status after multiple attempts";

/// What a single reconciliation tick produced. `snapshot` is `None` when
/// there is nothing new to show (remote down, no mirror to fall back on).
pub(crate) struct TickOutcome {
    pub snapshot: Option<Analysis>,
    pub stop: bool,
}

/// Merge a fresh remote status into the last mirrored snapshot.
///
/// The remote response wins field by field; anything it does not carry is
/// kept from the mirror. A terminal mirror is never demoted by a remote
/// response that claims the analysis went back to processing.
pub(crate) fn merge_snapshots(
    mirror: Option<&Analysis>,
    remote: &StatusResponse,
    analysis_id: &str,
    now: DateTime<Utc>,
) -> Analysis {
    if let Some(known) = mirror {
        if known.status.is_terminal() && !remote.status.is_terminal() {
            return known.clone();
        }
    }

    let mut merged = match mirror {
        Some(known) => known.clone(),
        None => Analysis {
            id: analysis_id.to_string(),
            status: AnalysisStatus::Processing,
            progress: 0,
            results: None,
            error: None,
            repository_url: remote.repository_url.clone().unwrap_or_default(),
            created_at: remote.created_at.unwrap_or(now),
            updated_at: now,
        },
    };

    merged.id = analysis_id.to_string();
    merged.status = remote.status.clone();
    if let Some(progress) = remote.progress {
        merged.progress = progress.min(100);
    }
    if let Some(results) = &remote.results {
        merged.results = Some(results.clone());
    }
    if let Some(error) = &remote.error {
        merged.error = Some(error.clone());
    }
    if let Some(url) = &remote.repository_url {
        if !url.is_empty() {
            merged.repository_url = url.clone();
        }
    }
    merged.updated_at = remote.updated_at.unwrap_or(now);

    merged
}

/// Run one reconciliation tick: consult the mirror, fetch remote status,
/// merge, persist when something changed, and decide whether to keep going.
pub(crate) async fn reconcile_tick(
    session: &mut PollSession,
    backend: &dyn AnalysisBackend,
    db: Option<&Database>,
    config: &PollConfig,
) -> TickOutcome {
    let now = Utc::now();

    if session.attempt_count >= config.max_attempts {
        warn!(
            "Analysis {} still not terminal after {} attempts, giving up",
            session.analysis_id, session.attempt_count
        );
        return TickOutcome {
            snapshot: Some(forced_failure(&session.analysis_id, TIMEOUT_ERROR, now)),
            stop: true,
        };
    }

    session.record_attempt();

    let mirror = read_mirror(db, &session.analysis_id).await;

    let fetched = match tokio::time::timeout(
        config.fetch_timeout,
        backend.fetch_status(&session.analysis_id),
    )
    .await
    {
        Ok(result) => result,
        Err(_) => Err(ApiError::Timeout {
            seconds: config.fetch_timeout.as_secs(),
        }),
    };

    match fetched {
        Ok(remote) => {
            session.record_remote_success();
            let merged = merge_snapshots(mirror.as_ref(), &remote, &session.analysis_id, now);

            if let Some(db) = db {
                persist_merged(db, mirror.as_ref(), &merged).await;
            }

            let stop = merged.status.is_terminal();
            TickOutcome {
                snapshot: Some(merged),
                stop,
            }
        }
        Err(err) => {
            session.record_remote_failure();
            warn!(
                "Status fetch failed for {} (consecutive failures: {}): {err}",
                session.analysis_id, session.consecutive_remote_failures
            );

            // The mirror is the fallback for exactly this case: a remote
            // blip must not wipe out previously good state.
            if let Some(last_known) = mirror {
                let stop = last_known.status.is_terminal();
                return TickOutcome {
                    snapshot: Some(last_known),
                    stop,
                };
            }

            if session.consecutive_remote_failures >= config.max_retries {
                return TickOutcome {
                    snapshot: Some(forced_failure(&session.analysis_id, FETCH_FAILED_ERROR, now)),
                    stop: true,
                };
            }

            TickOutcome {
                snapshot: None,
                stop: false,
            }
        }
    }
}

/// One-shot reconciliation for status queries outside a poll loop: fetch,
/// merge with the mirror, persist when something changed.
pub async fn reconcile_once(
    backend: &dyn AnalysisBackend,
    db: Option<&Database>,
    analysis_id: &str,
) -> crate::api::ApiResult<Analysis> {
    let now = Utc::now();
    let mirror = read_mirror(db, analysis_id).await;

    let remote = backend.fetch_status(analysis_id).await?;
    let merged = merge_snapshots(mirror.as_ref(), &remote, analysis_id, now);

    if let Some(db) = db {
        persist_merged(db, mirror.as_ref(), &merged).await;
    }

    Ok(merged)
}

async fn read_mirror(db: Option<&Database>, analysis_id: &str) -> Option<Analysis> {
    let db = db?;
    match db.get_analysis(analysis_id).await {
        Ok(found) => found,
        Err(err) => {
            warn!("Mirror read failed for {analysis_id}: {err:#}");
            None
        }
    }
}

/// Write the merged snapshot when it changed something worth persisting.
/// Failures are logged and swallowed, the mirror is best-effort.
async fn persist_merged(db: &Database, mirror: Option<&Analysis>, merged: &Analysis) {
    let write = match mirror {
        None => db.insert_analysis(merged).await,
        Some(existing) if differs_in_watched_fields(existing, merged) => {
            db.upsert_analysis(merged).await
        }
        Some(_) => return,
    };

    if let Err(err) = write {
        warn!("Mirror write failed for {}: {err:#}", merged.id);
    }
}

fn differs_in_watched_fields(mirror: &Analysis, merged: &Analysis) -> bool {
    mirror.status != merged.status
        || mirror.progress != merged.progress
        || mirror.results != merged.results
        || mirror.error != merged.error
}

/// Session-local failure state shown to the user but never written to the
/// mirror, so a later session can still recover real state.
fn forced_failure(analysis_id: &str, message: &str, now: DateTime<Utc>) -> Analysis {
    Analysis {
        id: analysis_id.to_string(),
        status: AnalysisStatus::Failed,
        progress: 100,
        results: None,
        error: Some(message.to_string()),
        repository_url: String::new(),
        created_at: now,
        updated_at: now,
    }
}
