use std::sync::Arc;

use anyhow::{bail, Context, Result};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::api::AnalysisBackend;
use crate::db::Database;
use crate::models::Analysis;

use super::loop_worker::poll_loop;
use super::session::PollSession;
use super::PollConfig;

/// Owns one polling loop at a time. `start` hands back a watch receiver
/// with the latest reconciled snapshot; `stop` cancels the loop and waits
/// for it to wind down.
pub struct PollController {
    config: PollConfig,
    handle: Option<JoinHandle<()>>,
    cancel_token: Option<CancellationToken>,
}

impl PollController {
    pub fn new(config: PollConfig) -> Self {
        Self {
            config,
            handle: None,
            cancel_token: None,
        }
    }

    pub fn start(
        &mut self,
        analysis_id: String,
        backend: Arc<dyn AnalysisBackend>,
        db: Option<Database>,
    ) -> Result<watch::Receiver<Option<Analysis>>> {
        if self.handle.is_some() {
            bail!("poll session already active");
        }

        let cancel_token = CancellationToken::new();
        let token_clone = cancel_token.clone();
        let (state_tx, state_rx) = watch::channel(None);
        let session = PollSession::new(analysis_id);

        let handle = tokio::spawn(poll_loop(
            session,
            backend,
            db,
            self.config.clone(),
            state_tx,
            token_clone,
        ));

        self.handle = Some(handle);
        self.cancel_token = Some(cancel_token);
        Ok(state_rx)
    }

    pub fn is_active(&self) -> bool {
        self.handle.is_some()
    }

    pub async fn stop(&mut self) -> Result<()> {
        if let Some(token) = self.cancel_token.take() {
            token.cancel();
        }

        if let Some(handle) = self.handle.take() {
            handle
                .await
                .context("poll loop task failed to join")
                .map(|_| ())
        } else {
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use tempfile::TempDir;

    use crate::models::AnalysisStatus;
    use crate::poller::test_support::{ScriptStep, ScriptedBackend};

    use super::*;

    fn fast_config() -> PollConfig {
        PollConfig {
            interval: Duration::from_millis(10),
            max_attempts: 150,
            max_retries: 3,
            fetch_timeout: Duration::from_secs(5),
        }
    }

    fn processing_step(progress: u8) -> ScriptStep {
        ScriptStep::Status(crate::api::types::StatusResponse {
            id: None,
            status: AnalysisStatus::Processing,
            progress: Some(progress),
            results: None,
            error: None,
            refresh_error: None,
            repository_url: Some("https://github.com/acme/widget".to_string()),
            created_at: None,
            updated_at: None,
        })
    }

    fn completed_step() -> ScriptStep {
        ScriptStep::Status(crate::api::types::StatusResponse {
            id: None,
            status: AnalysisStatus::Completed,
            progress: Some(100),
            results: None,
            error: None,
            refresh_error: None,
            repository_url: Some("https://github.com/acme/widget".to_string()),
            created_at: None,
            updated_at: None,
        })
    }

    #[tokio::test]
    async fn publishes_snapshots_until_terminal() {
        let backend = Arc::new(ScriptedBackend::new(vec![
            processing_step(40),
            completed_step(),
        ]));

        let mut controller = PollController::new(fast_config());
        let mut rx = controller
            .start("analysis_1".to_string(), backend, None)
            .unwrap();

        let mut last_seen = None;
        while rx.changed().await.is_ok() {
            last_seen = rx.borrow_and_update().clone();
        }

        let final_state = last_seen.unwrap();
        assert_eq!(final_state.status, AnalysisStatus::Completed);

        controller.stop().await.unwrap();
        assert!(!controller.is_active());
    }

    #[tokio::test]
    async fn start_while_active_is_rejected() {
        let backend = Arc::new(ScriptedBackend::new(vec![ScriptStep::Hang]));
        let mut controller = PollController::new(fast_config());

        let _rx = controller
            .start("analysis_1".to_string(), backend.clone(), None)
            .unwrap();
        let second = controller.start("analysis_2".to_string(), backend, None);
        assert!(second.is_err());

        controller.stop().await.unwrap();
    }

    #[tokio::test]
    async fn stop_is_idempotent() {
        let backend = Arc::new(ScriptedBackend::new(vec![ScriptStep::Hang]));
        let mut controller = PollController::new(fast_config());

        let _rx = controller
            .start("analysis_1".to_string(), backend, None)
            .unwrap();

        controller.stop().await.unwrap();
        controller.stop().await.unwrap();
        assert!(!controller.is_active());
    }

    #[tokio::test]
    async fn cancellation_discards_the_inflight_tick() {
        let dir = TempDir::new().unwrap();
        let db = Database::new(dir.path().join("codelens.sqlite3")).unwrap();

        let backend = Arc::new(ScriptedBackend::new(vec![ScriptStep::Hang]));
        let mut controller = PollController::new(fast_config());
        let rx = controller
            .start("analysis_1".to_string(), backend, Some(db.clone()))
            .unwrap();

        // Let the first tick start and get stuck in the hung fetch.
        tokio::time::sleep(Duration::from_millis(50)).await;
        controller.stop().await.unwrap();

        assert!(rx.borrow().is_none());
        assert!(db.get_analysis("analysis_1").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn controller_can_run_again_after_stop() {
        let mut controller = PollController::new(fast_config());

        let hung = Arc::new(ScriptedBackend::new(vec![ScriptStep::Hang]));
        let _rx = controller
            .start("analysis_1".to_string(), hung, None)
            .unwrap();
        controller.stop().await.unwrap();

        let quick = Arc::new(ScriptedBackend::new(vec![completed_step()]));
        let mut rx = controller
            .start("analysis_2".to_string(), quick, None)
            .unwrap();

        let mut last_seen = None;
        while rx.changed().await.is_ok() {
            last_seen = rx.borrow_and_update().clone();
        }
        assert_eq!(last_seen.unwrap().status, AnalysisStatus::Completed);

        controller.stop().await.unwrap();
    }
}
