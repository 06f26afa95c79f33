//! Progress publishing
//!
//! Thin wrapper over the session store that maps phases to their percent
//! and clamps updates to be monotonic. Store failures are logged and
//! swallowed; progress is observability, not control flow.

use std::sync::Arc;

use tracing::info;

use crate::models::session::Phase;
use crate::services::session_store::SessionStore;

pub struct ProgressReporter {
    store: Arc<SessionStore>,
    session_id: String,
    last_percent: u8,
}

impl ProgressReporter {
    pub fn new(store: Arc<SessionStore>, session_id: impl Into<String>) -> Self {
        Self {
            store,
            session_id: session_id.into(),
            last_percent: 0,
        }
    }

    /// Publish a phase transition. Updates that would lower the percent
    /// are reported at the last observed value instead.
    pub async fn report(&mut self, phase: Phase) {
        let percent = phase.percent().max(self.last_percent);
        self.last_percent = percent;
        info!("🚀 [{:>3}%] {}", percent, phase.description());
        self.store
            .update_progress(&self.session_id, phase.key(), percent, phase.description())
            .await;
    }

    /// Publish a failure at the current percent.
    pub async fn report_failure(&self, detail: &str) {
        self.store
            .update_progress(&self.session_id, Phase::Failed.key(), self.last_percent, detail)
            .await;
    }
}
