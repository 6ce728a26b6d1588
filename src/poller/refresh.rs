use crate::api::AnalysisBackend;
use crate::models::AnalysisStatus;

use super::PollConfig;

/// How a refresh wait ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RefreshOutcome {
    Completed,
    /// The backend recorded a refresh error for the analysis.
    Failed(String),
    TimedOut,
    /// A status check itself failed; the wait aborts rather than retrying.
    CheckError(String),
}

/// Wait for a previously requested refresh to land, checking status on a
/// slow cadence until the analysis is completed again.
pub async fn refresh_wait(
    backend: &dyn AnalysisBackend,
    analysis_id: &str,
    config: &PollConfig,
) -> RefreshOutcome {
    let mut attempts = 0;

    loop {
        let status = match backend.fetch_status(analysis_id).await {
            Ok(status) => status,
            Err(err) => return RefreshOutcome::CheckError(err.to_string()),
        };

        if let Some(refresh_error) = status.refresh_error {
            return RefreshOutcome::Failed(refresh_error);
        }

        if status.status == AnalysisStatus::Completed {
            return RefreshOutcome::Completed;
        }

        attempts += 1;
        if attempts >= config.max_attempts {
            return RefreshOutcome::TimedOut;
        }

        tokio::time::sleep(config.interval).await;
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use crate::api::types::StatusResponse;
    use crate::poller::test_support::{ScriptStep, ScriptedBackend};

    use super::*;

    fn fast_config(max_attempts: u32) -> PollConfig {
        PollConfig {
            interval: Duration::from_millis(1),
            max_attempts,
            max_retries: 3,
            fetch_timeout: Duration::from_secs(5),
        }
    }

    fn step(status: AnalysisStatus, refresh_error: Option<&str>) -> ScriptStep {
        ScriptStep::Status(StatusResponse {
            id: None,
            status,
            progress: None,
            results: None,
            error: None,
            refresh_error: refresh_error.map(str::to_string),
            repository_url: None,
            created_at: None,
            updated_at: None,
        })
    }

    #[tokio::test]
    async fn resolves_once_the_analysis_completes() {
        let backend = ScriptedBackend::new(vec![
            step(AnalysisStatus::Processing, None),
            step(AnalysisStatus::Completed, None),
        ]);

        let outcome = refresh_wait(&backend, "analysis_1", &fast_config(30)).await;
        assert_eq!(outcome, RefreshOutcome::Completed);
    }

    #[tokio::test]
    async fn backend_refresh_error_wins_over_status() {
        let backend = ScriptedBackend::new(vec![step(
            AnalysisStatus::Completed,
            Some("file no longer exists"),
        )]);

        let outcome = refresh_wait(&backend, "analysis_1", &fast_config(30)).await;
        assert_eq!(
            outcome,
            RefreshOutcome::Failed("file no longer exists".to_string())
        );
    }

    #[tokio::test]
    async fn transport_error_aborts_the_wait() {
        let backend = ScriptedBackend::new(vec![ScriptStep::ServerError(503)]);

        let outcome = refresh_wait(&backend, "analysis_1", &fast_config(30)).await;
        match outcome {
            RefreshOutcome::CheckError(message) => assert!(message.contains("503")),
            other => panic!("expected CheckError, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn gives_up_after_the_attempt_ceiling() {
        let backend = ScriptedBackend::new(vec![step(AnalysisStatus::Processing, None)]);

        let outcome = refresh_wait(&backend, "analysis_1", &fast_config(3)).await;
        assert_eq!(outcome, RefreshOutcome::TimedOut);
    }
}
