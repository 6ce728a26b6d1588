use crate::models::Analysis;

/// Bookkeeping for one polling run. A session lives exactly as long as its
/// loop: created on start, deactivated when a stop condition fires.
#[derive(Debug, Clone)]
pub struct PollSession {
    pub analysis_id: String,
    pub attempt_count: u32,
    pub consecutive_remote_failures: u32,
    pub is_active: bool,
    last_progress: u8,
}

impl PollSession {
    pub fn new(analysis_id: String) -> Self {
        Self {
            analysis_id,
            attempt_count: 0,
            consecutive_remote_failures: 0,
            is_active: true,
            last_progress: 0,
        }
    }

    /// One tick, counted regardless of how the tick turns out.
    pub fn record_attempt(&mut self) {
        self.attempt_count += 1;
    }

    pub fn record_remote_failure(&mut self) {
        self.consecutive_remote_failures += 1;
    }

    pub fn record_remote_success(&mut self) {
        self.consecutive_remote_failures = 0;
    }

    pub fn deactivate(&mut self) {
        self.is_active = false;
    }

    /// Displayed progress never goes backwards within a session, even if a
    /// stale source briefly reports a lower value.
    pub fn clamp_progress(&mut self, mut snapshot: Analysis) -> Analysis {
        if snapshot.progress < self.last_progress {
            snapshot.progress = self.last_progress;
        } else {
            self.last_progress = snapshot.progress;
        }
        snapshot
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;

    fn snapshot_with_progress(progress: u8) -> Analysis {
        let mut analysis = Analysis::processing(
            "analysis_1".to_string(),
            "https://github.com/acme/widget".to_string(),
            Utc::now(),
        );
        analysis.progress = progress;
        analysis
    }

    #[test]
    fn new_session_starts_active_and_unattempted() {
        let session = PollSession::new("analysis_1".to_string());
        assert!(session.is_active);
        assert_eq!(session.attempt_count, 0);
        assert_eq!(session.consecutive_remote_failures, 0);
    }

    #[test]
    fn failures_accumulate_until_a_success() {
        let mut session = PollSession::new("analysis_1".to_string());
        session.record_remote_failure();
        session.record_remote_failure();
        assert_eq!(session.consecutive_remote_failures, 2);

        session.record_remote_success();
        assert_eq!(session.consecutive_remote_failures, 0);
    }

    #[test]
    fn progress_is_clamped_to_its_high_water_mark() {
        let mut session = PollSession::new("analysis_1".to_string());

        let shown = session.clamp_progress(snapshot_with_progress(45));
        assert_eq!(shown.progress, 45);

        let stale = session.clamp_progress(snapshot_with_progress(30));
        assert_eq!(stale.progress, 45);

        let ahead = session.clamp_progress(snapshot_with_progress(80));
        assert_eq!(ahead.progress, 80);
    }
}
