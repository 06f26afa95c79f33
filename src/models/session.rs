//! Session state machine and progress phases
//!
//! Progress is monotonic within a session. Phases only move forward; a
//! failure is terminal but keeps the percent already reached so observers
//! see where the run died.

use chrono::Local;

/// Workflow phases in execution order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Init,
    NavigatingLogin,
    LoggingIn,
    NavigatingForm,
    UploadingFile,
    ConfiguringOptions,
    FillingForm,
    AcceptingTerms,
    Submitting,
    AwaitingResult,
    Extracting,
    Done,
    Failed,
}

impl Phase {
    /// Percent shown to observers at this phase
    pub fn percent(&self) -> u8 {
        match self {
            Phase::Init => 5,
            Phase::NavigatingLogin => 10,
            Phase::LoggingIn => 20,
            Phase::NavigatingForm => 30,
            Phase::UploadingFile => 40,
            Phase::ConfiguringOptions => 50,
            Phase::FillingForm => 60,
            Phase::AcceptingTerms => 70,
            Phase::Submitting => 80,
            Phase::AwaitingResult => 90,
            Phase::Extracting => 95,
            Phase::Done => 100,
            Phase::Failed => 0,
        }
    }

    /// Stable key used in progress updates and logs
    pub fn key(&self) -> &'static str {
        match self {
            Phase::Init => "initializing",
            Phase::NavigatingLogin => "navigating_to_login",
            Phase::LoggingIn => "logging_in",
            Phase::NavigatingForm => "navigating_to_form",
            Phase::UploadingFile => "uploading_file",
            Phase::ConfiguringOptions => "configuring_options",
            Phase::FillingForm => "filling_form",
            Phase::AcceptingTerms => "accepting_terms",
            Phase::Submitting => "submitting_form",
            Phase::AwaitingResult => "downloading_results",
            Phase::Extracting => "extracting_results",
            Phase::Done => "completed",
            Phase::Failed => "failed",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            Phase::Init => "Starting browser session",
            Phase::NavigatingLogin => "Opening the verification portal",
            Phase::LoggingIn => "Authenticating",
            Phase::NavigatingForm => "Opening the request form",
            Phase::UploadingFile => "Uploading the batch file",
            Phase::ConfiguringOptions => "Selecting certificate options",
            Phase::FillingForm => "Entering request details",
            Phase::AcceptingTerms => "Accepting terms",
            Phase::Submitting => "Submitting the request",
            Phase::AwaitingResult => "Waiting for results",
            Phase::Extracting => "Reading the result page",
            Phase::Done => "Completed",
            Phase::Failed => "Failed",
        }
    }

    /// Ordinal for forward-only enforcement. Failed sorts last so it is
    /// reachable from anywhere.
    fn order(&self) -> u8 {
        match self {
            Phase::Init => 0,
            Phase::NavigatingLogin => 1,
            Phase::LoggingIn => 2,
            Phase::NavigatingForm => 3,
            Phase::UploadingFile => 4,
            Phase::ConfiguringOptions => 5,
            Phase::FillingForm => 6,
            Phase::AcceptingTerms => 7,
            Phase::Submitting => 8,
            Phase::AwaitingResult => 9,
            Phase::Extracting => 10,
            Phase::Done => 11,
            Phase::Failed => 12,
        }
    }
}

/// Mutable state of one verification session
#[derive(Debug, Clone)]
pub struct SessionState {
    pub session_id: String,
    pub phase: Phase,
    /// Highest percent reached, never decreases
    pub progress_percent: u8,
    pub error: Option<String>,
}

impl SessionState {
    pub fn new(session_id: impl Into<String>) -> Self {
        Self {
            session_id: session_id.into(),
            phase: Phase::Init,
            progress_percent: Phase::Init.percent(),
            error: None,
        }
    }

    /// Move to a later phase. Backward transitions are ignored so a retry
    /// inside a phase never rewinds observed progress.
    pub fn advance(&mut self, phase: Phase) {
        if phase.order() <= self.phase.order() && phase != self.phase {
            return;
        }
        self.phase = phase;
        let pct = phase.percent();
        if pct > self.progress_percent {
            self.progress_percent = pct;
        }
    }

    /// Terminal failure, reachable from any phase. Percent is kept.
    pub fn fail(&mut self, error: impl Into<String>) {
        self.phase = Phase::Failed;
        self.error = Some(error.into());
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self.phase, Phase::Done | Phase::Failed)
    }
}

/// Timestamp-based session identifier, unique enough per process run.
pub fn new_session_id() -> String {
    Local::now().format("%Y%m%d_%H%M%S").to_string()
}

/// Transaction id reported with each eligibility result.
pub fn new_transaction_id() -> String {
    format!("PUP_{}", Local::now().format("%Y%m%d_%H%M%S"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_progress_is_monotonic() {
        let mut state = SessionState::new("t");
        let mut last = 0;
        for phase in [
            Phase::Init,
            Phase::NavigatingLogin,
            Phase::LoggingIn,
            Phase::NavigatingForm,
            Phase::FillingForm,
            Phase::Submitting,
            Phase::AwaitingResult,
            Phase::Done,
        ] {
            state.advance(phase);
            assert!(state.progress_percent >= last);
            last = state.progress_percent;
        }
        assert_eq!(state.progress_percent, 100);
    }

    #[test]
    fn test_backward_transition_ignored() {
        let mut state = SessionState::new("t");
        state.advance(Phase::Submitting);
        state.advance(Phase::LoggingIn);
        assert_eq!(state.phase, Phase::Submitting);
        assert_eq!(state.progress_percent, 80);
    }

    #[test]
    fn test_fail_from_any_phase_keeps_percent() {
        let mut state = SessionState::new("t");
        state.advance(Phase::AwaitingResult);
        state.fail("timed out");
        assert_eq!(state.phase, Phase::Failed);
        assert_eq!(state.progress_percent, 90);
        assert!(state.is_terminal());
    }

    #[test]
    fn test_phase_percent_table() {
        assert_eq!(Phase::Init.percent(), 5);
        assert_eq!(Phase::NavigatingLogin.percent(), 10);
        assert_eq!(Phase::LoggingIn.percent(), 20);
        assert_eq!(Phase::NavigatingForm.percent(), 30);
        assert_eq!(Phase::FillingForm.percent(), 60);
        assert_eq!(Phase::Submitting.percent(), 80);
        assert_eq!(Phase::AwaitingResult.percent(), 90);
        assert_eq!(Phase::Done.percent(), 100);
    }
}
