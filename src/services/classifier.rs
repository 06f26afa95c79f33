//! Keyword-driven classification of the result page
//!
//! The portal renders outcomes as free text, so classification matches
//! lowercased page text against three keyword tables. Error phrases win
//! over everything, then positive coverage, then explicit non-coverage.

use tracing::info;

use crate::models::result::{MatchReasonCode, ScraEligibilityType};

/// Phrases indicating the person is covered
const COVERED_KEYWORDS: [&str; 6] = [
    "covered",
    "protected",
    "eligible",
    "active duty",
    "servicemember",
    "military service confirmed",
];

/// Phrases indicating the person is explicitly not covered
const NOT_COVERED_KEYWORDS: [&str; 6] = [
    "not covered",
    "not protected",
    "not eligible",
    "no coverage",
    "not found",
    "no record",
];

/// Phrases indicating the portal failed rather than answered
const ERROR_KEYWORDS: [&str; 6] = [
    "error",
    "failed",
    "invalid",
    "unable to verify",
    "timeout",
    "system error",
];

/// Classification of one result page
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Classification {
    pub covered: bool,
    pub match_reason_code: MatchReasonCode,
    pub eligibility_type: ScraEligibilityType,
}

/// Does the text contain any outcome phrase at all. Used to poll for the
/// result page settling before classification.
pub fn mentions_outcome(page_text: &str) -> bool {
    let text = page_text.to_lowercase();
    [&COVERED_KEYWORDS[..], &NOT_COVERED_KEYWORDS[..], &ERROR_KEYWORDS[..]]
        .iter()
        .any(|table| table.iter().any(|kw| text.contains(kw)))
}

/// Classify result page text.
///
/// Precedence: any error phrase forces a system-error outcome because the
/// portal renders failures alongside stale form text. A covered phrase
/// with no negation wins next ("not covered" contains "covered", so the
/// negated table must be checked before trusting the positive one).
pub fn classify(page_text: &str) -> Classification {
    let text = page_text.to_lowercase();

    let has = |table: &[&str]| table.iter().any(|kw| text.contains(kw));

    let classification = if has(&ERROR_KEYWORDS) {
        Classification {
            covered: false,
            match_reason_code: MatchReasonCode::SystemError,
            eligibility_type: ScraEligibilityType::Error,
        }
    } else if has(&COVERED_KEYWORDS) && !has(&NOT_COVERED_KEYWORDS) {
        Classification {
            covered: true,
            match_reason_code: MatchReasonCode::MatchFound,
            eligibility_type: ScraEligibilityType::ActiveDuty,
        }
    } else if has(&NOT_COVERED_KEYWORDS) {
        Classification {
            covered: false,
            match_reason_code: MatchReasonCode::NoMatch,
            eligibility_type: ScraEligibilityType::NotCovered,
        }
    } else {
        Classification {
            covered: false,
            match_reason_code: MatchReasonCode::Unknown,
            eligibility_type: ScraEligibilityType::Unknown,
        }
    };

    info!(
        "🔍 Result classified: covered={} reason={:?}",
        classification.covered, classification.match_reason_code
    );
    classification
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_covered_page() {
        let c = classify("Status: the individual is on Active Duty and is covered.");
        assert!(c.covered);
        assert_eq!(c.match_reason_code, MatchReasonCode::MatchFound);
        assert_eq!(c.eligibility_type, ScraEligibilityType::ActiveDuty);
    }

    #[test]
    fn test_not_covered_beats_covered_substring() {
        // "not covered" contains "covered"; negation must win
        let c = classify("The individual is NOT COVERED under the Act.");
        assert!(!c.covered);
        assert_eq!(c.match_reason_code, MatchReasonCode::NoMatch);
        assert_eq!(c.eligibility_type, ScraEligibilityType::NotCovered);
    }

    #[test]
    fn test_error_beats_everything() {
        let c = classify("System error occurred. Individual is covered.");
        assert!(!c.covered);
        assert_eq!(c.match_reason_code, MatchReasonCode::SystemError);
        assert_eq!(c.eligibility_type, ScraEligibilityType::Error);
    }

    #[test]
    fn test_no_keywords_is_unknown() {
        let c = classify("Welcome to the portal. Please fill out the form.");
        assert!(!c.covered);
        assert_eq!(c.match_reason_code, MatchReasonCode::Unknown);
        assert_eq!(c.eligibility_type, ScraEligibilityType::Unknown);
    }

    #[test]
    fn test_case_insensitive() {
        let c = classify("MILITARY SERVICE CONFIRMED");
        assert!(c.covered);
    }

    #[test]
    fn test_no_record_is_not_covered() {
        let c = classify("No record was located for the submitted individual.");
        assert_eq!(c.eligibility_type, ScraEligibilityType::NotCovered);
    }
}
