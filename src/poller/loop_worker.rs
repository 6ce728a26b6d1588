use std::sync::Arc;

use log::info;
use tokio::sync::watch;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use crate::api::AnalysisBackend;
use crate::db::Database;
use crate::models::Analysis;

use super::reconcile::reconcile_tick;
use super::session::PollSession;
use super::PollConfig;

/// Drive reconciliation ticks until a stop condition or cancellation.
///
/// The first tick fires immediately, then on the configured cadence. Ticks
/// never overlap: the next one is not armed until the previous finished.
/// Cancellation drops an in-flight tick, so nothing is published or
/// persisted for it.
pub(crate) async fn poll_loop(
    mut session: PollSession,
    backend: Arc<dyn AnalysisBackend>,
    db: Option<Database>,
    config: PollConfig,
    publisher: watch::Sender<Option<Analysis>>,
    cancel_token: CancellationToken,
) {
    let analysis_id = session.analysis_id.clone();
    let mut ticker = tokio::time::interval(config.interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = ticker.tick() => {}
            _ = cancel_token.cancelled() => {
                info!("Poll loop for {analysis_id} shutting down");
                break;
            }
        }

        let tick = reconcile_tick(&mut session, backend.as_ref(), db.as_ref(), &config);
        let outcome = tokio::select! {
            outcome = tick => outcome,
            _ = cancel_token.cancelled() => {
                info!("Poll loop for {analysis_id} cancelled mid-tick");
                break;
            }
        };

        if let Some(snapshot) = outcome.snapshot {
            let snapshot = session.clamp_progress(snapshot);
            publisher.send_replace(Some(snapshot));
        }

        if outcome.stop {
            session.deactivate();
            info!(
                "Poll loop for {analysis_id} finished after {} attempts",
                session.attempt_count
            );
            break;
        }
    }
}
