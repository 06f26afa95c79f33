//! Fixed-width record codec for the portal's batch upload format
//!
//! Layout, 119 bytes total:
//! - SSN             positions 0..9    (9 digits or spaces)
//! - Date of birth   positions 9..17   (YYYYMMDD or spaces)
//! - Last name       positions 17..43  (26, space-padded)
//! - First name      positions 43..91  (48, space-padded)
//! - Active duty date positions 91..99 (8, required)
//! - Middle name     positions 99..119 (20, optional, space-padded)

use chrono::NaiveDate;

use crate::models::request::{to_yyyymmdd, VerificationRequest};

/// Encoded record length in bytes
pub const RECORD_LEN: usize = 119;

/// One person's verification request in canonical batch form
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FixedWidthRecord {
    /// Empty or exactly 9 digits
    pub ssn: String,
    /// Empty or YYYYMMDD
    pub date_of_birth: String,
    pub last_name: String,
    pub first_name: String,
    pub middle_name: String,
    /// Always present, YYYYMMDD
    pub active_duty_date: String,
}

impl FixedWidthRecord {
    /// Field-level validation; recoverable issues accumulate as strings
    /// instead of raising.
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();

        if !self.ssn.is_empty() {
            if self.ssn.len() != 9 {
                errors.push(format!("SSN must be 9 digits or empty, got {}", self.ssn.len()));
            } else if !self.ssn.chars().all(|c| c.is_ascii_digit()) {
                errors.push("SSN must contain only digits or be empty".to_string());
            }
        }

        if self.last_name.is_empty() {
            errors.push("Last name is required".to_string());
        }

        if self.first_name.is_empty() {
            errors.push("First name is required".to_string());
        }

        if self.active_duty_date.is_empty() {
            errors.push("Active duty status date is required".to_string());
        } else if self.active_duty_date.len() != 8 {
            errors.push("Active duty status date must be in YYYYMMDD format".to_string());
        } else if NaiveDate::parse_from_str(&self.active_duty_date, "%Y%m%d").is_err() {
            errors.push(format!(
                "Active duty status date '{}' is not a valid date",
                self.active_duty_date
            ));
        }

        if !self.date_of_birth.is_empty() {
            if self.date_of_birth.len() != 8 {
                errors.push("Date of birth must be in YYYYMMDD format or empty".to_string());
            } else if NaiveDate::parse_from_str(&self.date_of_birth, "%Y%m%d").is_err() {
                errors.push(format!(
                    "Date of birth '{}' is not a valid date",
                    self.date_of_birth
                ));
            }
        }

        errors
    }

    /// Encode to exactly [`RECORD_LEN`] bytes. SSNs and dates that are not
    /// well-formed at this point render as space runs so the fixed layout
    /// never corrupts.
    pub fn encode(&self) -> String {
        let mut line = String::with_capacity(RECORD_LEN);

        let ssn = self.ssn.trim();
        if ssn.len() == 9 && ssn.chars().all(|c| c.is_ascii_digit()) {
            line.push_str(ssn);
        } else {
            line.push_str(&" ".repeat(9));
        }

        let dob = self.date_of_birth.trim();
        if dob.len() == 8 && dob.chars().all(|c| c.is_ascii_digit()) {
            line.push_str(dob);
        } else {
            line.push_str(&" ".repeat(8));
        }

        line.push_str(&pad_field(&title_case(self.last_name.trim()), 26));
        line.push_str(&pad_field(&title_case(self.first_name.trim()), 48));

        line.push_str(&pad_field(&self.active_duty_date, 8));

        line.push_str(&pad_field(&title_case(self.middle_name.trim()), 20));

        // Exact length regardless of field content
        pad_field(&line, RECORD_LEN)
    }

    /// Decode one encoded line. Fields come back trimmed; short lines are
    /// treated as space-padded to full length.
    pub fn decode(line: &str) -> Self {
        let padded = pad_field(line, RECORD_LEN);
        let chars: Vec<char> = padded.chars().collect();
        let slice = |from: usize, to: usize| -> String {
            chars[from..to].iter().collect::<String>().trim().to_string()
        };

        Self {
            ssn: slice(0, 9),
            date_of_birth: slice(9, 17),
            last_name: slice(17, 43),
            first_name: slice(43, 91),
            active_duty_date: slice(91, 99),
            middle_name: slice(99, 119),
        }
    }

    /// View as a single-record verification request.
    pub fn to_request(&self) -> VerificationRequest {
        VerificationRequest {
            ssn: self.ssn.clone(),
            first_name: self.first_name.clone(),
            last_name: self.last_name.clone(),
            middle_name: if self.middle_name.is_empty() {
                None
            } else {
                Some(self.middle_name.clone())
            },
            suffix: None,
            date_of_birth: self.date_of_birth.clone(),
            active_duty_date: self.active_duty_date.clone(),
        }
    }
}

/// Parse a newline-separated blob of encoded records, skipping blank lines.
pub fn decode_blob(blob: &str) -> Vec<FixedWidthRecord> {
    blob.lines()
        .filter(|line| !line.trim().is_empty())
        .map(FixedWidthRecord::decode)
        .collect()
}

/// Encode records to the upload blob, one line each.
pub fn encode_records(records: &[FixedWidthRecord]) -> String {
    records
        .iter()
        .map(FixedWidthRecord::encode)
        .collect::<Vec<_>>()
        .join("\n")
}

/// Space-pad or truncate to an exact width.
fn pad_field(value: &str, width: usize) -> String {
    let mut out: String = value.chars().take(width).collect();
    while out.chars().count() < width {
        out.push(' ');
    }
    out
}

/// First letter of each word upper, rest lower, the way the portal renders
/// names in its batch layout.
fn title_case(value: &str) -> String {
    value
        .split(' ')
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => {
                    first.to_uppercase().collect::<String>() + &chars.as_str().to_lowercase()
                }
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Build a record from cleaned tabular fields. Dates run through the full
/// normaliser so recoverable garbage empties out instead of failing.
pub fn record_from_fields(
    ssn: &str,
    date_of_birth: &str,
    last_name: &str,
    first_name: &str,
    middle_name: &str,
    active_duty_date: &str,
) -> FixedWidthRecord {
    FixedWidthRecord {
        ssn: crate::models::request::normalize_ssn(ssn),
        date_of_birth: to_yyyymmdd(date_of_birth),
        last_name: clean_name(last_name),
        first_name: clean_name(first_name),
        middle_name: clean_name(middle_name),
        active_duty_date: to_yyyymmdd(active_duty_date),
    }
}

/// Trim, uppercase, bound to the 20 chars the portal's importer accepts.
fn clean_name(name: &str) -> String {
    name.trim().to_uppercase().chars().take(20).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_record() -> FixedWidthRecord {
        FixedWidthRecord {
            ssn: "123456789".to_string(),
            date_of_birth: "19861029".to_string(),
            last_name: "DOE".to_string(),
            first_name: "JOHN".to_string(),
            middle_name: "M".to_string(),
            active_duty_date: "20251005".to_string(),
        }
    }

    #[test]
    fn test_encode_is_exactly_119_bytes() {
        assert_eq!(sample_record().encode().len(), RECORD_LEN);

        // Empty optionals still produce the full layout
        let minimal = FixedWidthRecord {
            ssn: String::new(),
            date_of_birth: String::new(),
            last_name: "SMITH".to_string(),
            first_name: "JANE".to_string(),
            middle_name: String::new(),
            active_duty_date: "20250101".to_string(),
        };
        assert_eq!(minimal.encode().len(), RECORD_LEN);
    }

    #[test]
    fn test_malformed_fields_become_space_runs() {
        let record = FixedWidthRecord {
            ssn: "12345".to_string(),
            date_of_birth: "1986".to_string(),
            last_name: "DOE".to_string(),
            first_name: "JOHN".to_string(),
            middle_name: String::new(),
            active_duty_date: "20251005".to_string(),
        };
        let line = record.encode();
        assert_eq!(line.len(), RECORD_LEN);
        assert_eq!(&line[0..9], "         ");
        assert_eq!(&line[9..17], "        ");
    }

    #[test]
    fn test_field_offsets() {
        let line = sample_record().encode();
        assert_eq!(&line[0..9], "123456789");
        assert_eq!(&line[9..17], "19861029");
        assert_eq!(&line[17..20], "Doe");
        assert_eq!(&line[43..47], "John");
        assert_eq!(&line[91..99], "20251005");
        assert_eq!(&line[99..100], "M");
    }

    #[test]
    fn test_decode_roundtrips_validated_record() {
        let record = sample_record();
        let decoded = FixedWidthRecord::decode(&record.encode());
        assert_eq!(decoded.ssn, record.ssn);
        assert_eq!(decoded.date_of_birth, record.date_of_birth);
        assert_eq!(decoded.active_duty_date, record.active_duty_date);
        // Names come back title-cased; compare case-insensitively
        assert_eq!(decoded.last_name.to_uppercase(), record.last_name);
        assert_eq!(decoded.first_name.to_uppercase(), record.first_name);
        assert_eq!(decoded.middle_name.to_uppercase(), record.middle_name);
    }

    #[test]
    fn test_validate_flags_missing_required() {
        let record = FixedWidthRecord::default();
        let errors = record.validate();
        assert!(errors.iter().any(|e| e.contains("Last name")));
        assert!(errors.iter().any(|e| e.contains("First name")));
        assert!(errors.iter().any(|e| e.contains("Active duty")));
    }

    #[test]
    fn test_validate_checks_calendar() {
        let record = FixedWidthRecord {
            last_name: "DOE".to_string(),
            first_name: "JOHN".to_string(),
            active_duty_date: "20251345".to_string(),
            ..FixedWidthRecord::default()
        };
        let errors = record.validate();
        assert!(errors.iter().any(|e| e.contains("not a valid date")));
    }

    #[test]
    fn test_record_from_fields_normalizes() {
        let record = record_from_fields(
            "123-45-6789",
            "10/29/86",
            " doe ",
            "john",
            "",
            "10/5/25",
        );
        assert_eq!(record.ssn, "123456789");
        assert_eq!(record.date_of_birth, "19861029");
        assert_eq!(record.last_name, "DOE");
        assert_eq!(record.active_duty_date, "20251005");
        assert!(record.validate().is_empty());
    }
}
