//! Response and artifact types returned to callers

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Machine-readable reason for the eligibility outcome
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MatchReasonCode {
    MatchFound,
    NoMatch,
    SystemError,
    Unknown,
}

/// Coverage classification derived from the result page
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ScraEligibilityType {
    ActiveDuty,
    NotCovered,
    Error,
    Unknown,
}

/// Eligibility determination for one person
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EligibilityResult {
    pub covered: bool,
    pub match_reason_code: MatchReasonCode,
    pub scra_eligibility_type: ScraEligibilityType,
    pub transaction_id: String,
    /// First 2000 chars of the result page body, for audit
    pub raw_page_excerpt: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date_of_interest: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub active_duty_indicator_code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub active_duty_start_date: Option<String>,
}

/// A captured screenshot tied to a workflow step
#[derive(Debug, Clone)]
pub struct ScreenshotArtifact {
    /// Step name such as "01_main_page_loaded"
    pub step: String,
    pub filename: String,
    pub description: String,
    pub bytes: Vec<u8>,
    pub captured_at: DateTime<Utc>,
}

/// The downloaded or rendered result certificate
#[derive(Debug, Clone)]
pub struct PdfArtifact {
    pub filename: String,
    pub bytes: Vec<u8>,
    pub captured_at: DateTime<Utc>,
}

/// Everything the automation observed during one session
#[derive(Debug, Clone, Default)]
pub struct AutomationResult {
    pub session_id: String,
    pub screenshots: Vec<ScreenshotArtifact>,
    pub pdf: Option<PdfArtifact>,
    pub raw_output: String,
    pub page_url: String,
    pub timestamp: Option<DateTime<Utc>>,
}

/// Outcome of a single-record verification
#[derive(Debug, Clone)]
pub struct VerificationResponse {
    pub success: bool,
    pub eligibility: Option<EligibilityResult>,
    pub automation: AutomationResult,
    pub error: Option<String>,
    pub timestamp: DateTime<Utc>,
}

impl VerificationResponse {
    pub fn failure(automation: AutomationResult, error: impl Into<String>) -> Self {
        Self {
            success: false,
            eligibility: None,
            automation,
            error: Some(error.into()),
            timestamp: Utc::now(),
        }
    }
}

/// Outcome of a batch run
#[derive(Debug, Clone)]
pub struct BatchResponse {
    pub success: bool,
    pub summary: BatchSummary,
    pub automation: AutomationResult,
    pub error: Option<String>,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct BatchSummary {
    pub records_processed: usize,
    pub certificate_downloaded: bool,
    /// Set when the certificate came from rendering the result page instead
    /// of the portal's own download
    pub rendered_fallback: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_enums_serialize_screaming_snake() {
        assert_eq!(
            serde_json::to_string(&MatchReasonCode::MatchFound).unwrap(),
            "\"MATCH_FOUND\""
        );
        assert_eq!(
            serde_json::to_string(&ScraEligibilityType::ActiveDuty).unwrap(),
            "\"ACTIVE_DUTY\""
        );
        assert_eq!(
            serde_json::to_string(&ScraEligibilityType::NotCovered).unwrap(),
            "\"NOT_COVERED\""
        );
    }

    #[test]
    fn test_failure_response() {
        let resp = VerificationResponse::failure(AutomationResult::default(), "login failed");
        assert!(!resp.success);
        assert!(resp.eligibility.is_none());
        assert_eq!(resp.error.as_deref(), Some("login failed"));
    }
}
