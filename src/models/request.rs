//! Verification request and the date/SSN normalisation it relies on

use chrono::NaiveDate;
use regex::Regex;
use serde::{Deserialize, Serialize};

/// One person to verify against the portal
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerificationRequest {
    pub ssn: String,
    pub first_name: String,
    pub last_name: String,
    #[serde(default)]
    pub middle_name: Option<String>,
    #[serde(default)]
    pub suffix: Option<String>,
    #[serde(default)]
    pub date_of_birth: String,
    pub active_duty_date: String,
}

impl VerificationRequest {
    /// SSN reduced to digits only.
    pub fn normalized_ssn(&self) -> String {
        normalize_ssn(&self.ssn)
    }
}

/// Date formats tried in order before the digit-extraction fallback.
/// Two-digit years resolve the way the portal's batch spec expects
/// (69-99 into the 1900s).
const DATE_FORMATS: &[&str] = &[
    "%m/%d/%y", // 10/29/86
    "%m-%d-%y", // 10-29-86
    "%m/%d/%Y", // 10/29/1986
    "%m-%d-%Y", // 10-29-1986
    "%Y-%m-%d", // 1986-10-29
    "%Y/%m/%d", // 1986/10/29
    "%d/%m/%Y", // 29/10/1986 (European)
    "%d-%m-%Y", // 29-10-1986
    "%d/%m/%y", // 29/10/86 (European)
];

/// Strip everything but digits; truncate to the 9 the form accepts.
pub fn normalize_ssn(ssn: &str) -> String {
    let digits: String = ssn.chars().filter(|c| c.is_ascii_digit()).collect();
    if digits.len() >= 9 {
        digits[..9].to_string()
    } else {
        digits
    }
}

/// Mask an SSN for logging: all but the last four characters. Counts
/// chars, not bytes, since the value arrives unvalidated from callers.
pub fn mask_ssn(ssn: &str) -> String {
    let len = ssn.chars().count();
    if len <= 4 {
        return "*".repeat(len);
    }
    let tail: String = ssn.chars().skip(len - 4).collect();
    format!("{}{}", "*".repeat(len - 4), tail)
}

/// Normalise any accepted textual date to `YYYYMMDD`.
///
/// Tries the explicit format list first, then falls back to extracting the
/// digits and zero-padding to eight, accepting the candidate only when it is
/// a real calendar date. Anything unparseable becomes an empty string; this
/// never fails.
pub fn to_yyyymmdd(date_value: &str) -> String {
    let date_value = date_value.trim();
    if date_value.is_empty() {
        return String::new();
    }

    let digits: String = date_value.chars().filter(|c| c.is_ascii_digit()).collect();

    // Already YYYYMMDD, validate against the calendar and keep
    if digits.len() == 8 && digits == date_value {
        return match NaiveDate::parse_from_str(&digits, "%Y%m%d") {
            Ok(_) => digits,
            Err(_) => String::new(),
        };
    }

    for fmt in DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(date_value, fmt) {
            return date.format("%Y%m%d").to_string();
        }
    }

    // Digit-extraction fallback, zero-padded, calendar-checked
    if digits.len() >= 6 {
        let mut candidate: String = digits.chars().take(8).collect();
        while candidate.len() < 8 {
            candidate.push('0');
        }
        if NaiveDate::parse_from_str(&candidate, "%Y%m%d").is_ok() {
            return candidate;
        }
        return String::new();
    }

    String::new()
}

/// Render any accepted textual date as `MM/DD/YYYY` for the portal's form
/// fields. Unknown formats pass through unchanged, matching the form's own
/// tolerance; this never fails.
pub fn to_mmddyyyy(date_value: &str) -> String {
    let date_value = date_value.trim();
    if date_value.is_empty() {
        return String::new();
    }

    // Already MM/DD/YYYY
    let parts: Vec<&str> = date_value.split('/').collect();
    if parts.len() == 3 && parts[2].len() == 4 {
        return date_value.to_string();
    }

    if date_value.len() == 8 && date_value.chars().all(|c| c.is_ascii_digit()) {
        if let Ok(date) = NaiveDate::parse_from_str(date_value, "%Y%m%d") {
            return date.format("%m/%d/%Y").to_string();
        }
    }

    for fmt in DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(date_value, fmt) {
            return date.format("%m/%d/%Y").to_string();
        }
    }

    date_value.to_string()
}

/// Lowercase, non-alphanumerics to underscores, runs collapsed, trimmed.
/// Shared by the ingestion column mapper.
pub fn normalize_identifier(name: &str) -> String {
    let lowered = name.trim().to_lowercase();
    let re = Regex::new(r"[^\w]").expect("static regex");
    let underscored = re.replace_all(&lowered, "_");
    let re_collapse = Regex::new(r"_+").expect("static regex");
    re_collapse
        .replace_all(&underscored, "_")
        .trim_matches('_')
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_two_digit_year_normalizes() {
        assert_eq!(to_yyyymmdd("10/29/86"), "19861029");
    }

    #[test]
    fn test_iso_and_compact_forms() {
        assert_eq!(to_yyyymmdd("1986-10-29"), "19861029");
        assert_eq!(to_yyyymmdd("19861029"), "19861029");
        assert_eq!(to_yyyymmdd("10/29/1986"), "19861029");
    }

    #[test]
    fn test_invalid_date_becomes_empty() {
        // Invalid month/day must never raise, only empty out
        assert_eq!(to_yyyymmdd("13/45/2020"), "");
        assert_eq!(to_yyyymmdd(""), "");
        assert_eq!(to_yyyymmdd("not a date"), "");
    }

    #[test]
    fn test_digit_fallback_is_calendar_checked() {
        // 8 compact digits that are not a real date are rejected
        assert_eq!(to_yyyymmdd("99999999"), "");
    }

    #[test]
    fn test_to_mmddyyyy() {
        assert_eq!(to_mmddyyyy("1986-10-29"), "10/29/1986");
        assert_eq!(to_mmddyyyy("19861029"), "10/29/1986");
        assert_eq!(to_mmddyyyy("10/29/1986"), "10/29/1986");
        // Unknown formats pass through
        assert_eq!(to_mmddyyyy("sometime"), "sometime");
    }

    #[test]
    fn test_normalize_ssn() {
        assert_eq!(normalize_ssn("123-45-6789"), "123456789");
        assert_eq!(normalize_ssn("12345678901"), "123456789");
        assert_eq!(normalize_ssn("12345"), "12345");
        assert_eq!(normalize_ssn(""), "");
    }

    #[test]
    fn test_mask_ssn() {
        assert_eq!(mask_ssn("123456789"), "*****6789");
        assert_eq!(mask_ssn("123"), "***");
    }

    #[test]
    fn test_mask_ssn_multibyte_input() {
        // Caller JSON is arbitrary; masking must never slice mid-char
        assert_eq!(mask_ssn("12345é789"), "*****é789");
        assert_eq!(mask_ssn("日本語"), "***");
        assert_eq!(mask_ssn("ａｂｃｄｅｆ"), "**ｃｄｅｆ");
    }

    #[test]
    fn test_normalize_identifier() {
        assert_eq!(normalize_identifier("Last Name"), "last_name");
        assert_eq!(normalize_identifier("  SSN #"), "ssn");
        assert_eq!(normalize_identifier("active--duty  date"), "active_duty_date");
    }
}
