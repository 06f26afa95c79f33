//! Tabular ingestion for batch verification
//!
//! Accepts delimited text (comma, tab, pipe or semicolon), maps headers
//! through a synonym table onto canonical column names, and produces the
//! fixed-width upload blob plus per-row error strings.

use std::collections::HashMap;

use tracing::{info, warn};

use crate::models::record::{encode_records, record_from_fields, FixedWidthRecord};
use crate::models::request::normalize_identifier;

/// Columns a usable table must resolve
pub const REQUIRED_COLUMNS: [&str; 4] = ["ssn", "last_name", "first_name", "active_duty_status_date"];

/// Columns carried through when present
pub const OPTIONAL_COLUMNS: [&str; 3] = ["middle_name", "date_of_birth", "customer_record_id"];

/// Header synonyms, canonical name first
const COLUMN_SYNONYMS: [(&str, &[&str]); 7] = [
    (
        "ssn",
        &["social_security_number", "social_security", "ss_number", "ssn_number"],
    ),
    ("last_name", &["lastname", "surname", "family_name", "last"]),
    ("first_name", &["firstname", "given_name", "first"]),
    ("middle_name", &["middlename", "middle_initial", "middle", "mi"]),
    (
        "date_of_birth",
        &["dob", "birth_date", "birthdate", "date_birth"],
    ),
    (
        "active_duty_status_date",
        &["active_duty_date", "duty_date", "status_date", "service_date"],
    ),
    (
        "customer_record_id",
        &["customer_id", "record_id", "id", "customer_number"],
    ),
];

/// Outcome of one ingestion pass
#[derive(Debug, Default)]
pub struct IngestOutcome {
    /// Upload-ready blob, empty when any row failed
    pub blob: String,
    pub records: Vec<FixedWidthRecord>,
    /// "Row N: ..." strings, one per failed row
    pub errors: Vec<String>,
}

/// Parse delimited text into validated records and the encoded upload blob.
/// Any row error empties the blob so a partial batch never reaches the
/// portal, but the records and errors still come back for reporting.
pub fn ingest(text: &str) -> IngestOutcome {
    let (records, errors) = parse_table(text);
    let blob = if errors.is_empty() && !records.is_empty() {
        encode_records(&records)
    } else {
        String::new()
    };
    IngestOutcome { blob, records, errors }
}

/// Parse delimited text into records, accumulating row-level errors rather
/// than stopping at the first bad row. A missing required column aborts
/// with a single error naming every absent column.
pub fn parse_table(text: &str) -> (Vec<FixedWidthRecord>, Vec<String>) {
    let mut lines = text.lines().filter(|l| !l.trim().is_empty());

    let header_line = match lines.next() {
        Some(line) => line,
        None => return (Vec::new(), vec!["Input is empty".to_string()]),
    };

    let delimiter = sniff_delimiter(header_line);
    let headers: Vec<String> = split_row(header_line, delimiter)
        .iter()
        .map(|h| canonical_column(h))
        .collect();

    let missing: Vec<&str> = REQUIRED_COLUMNS
        .iter()
        .filter(|col| !headers.iter().any(|h| h == *col))
        .copied()
        .collect();
    if !missing.is_empty() {
        return (
            Vec::new(),
            vec![format!("Missing required columns: {}", missing.join(", "))],
        );
    }

    let index: HashMap<&str, usize> = headers
        .iter()
        .enumerate()
        .map(|(i, h)| (h.as_str(), i))
        .collect();

    let mut records = Vec::new();
    let mut errors = Vec::new();

    for (row_number, line) in lines.enumerate() {
        let row_number = row_number + 2; // header is row 1
        let cells = split_row(line, delimiter);
        let cell = |name: &str| -> &str {
            index
                .get(name)
                .and_then(|&i| cells.get(i))
                .map(String::as_str)
                .unwrap_or("")
        };

        let record = record_from_fields(
            cell("ssn"),
            cell("date_of_birth"),
            cell("last_name"),
            cell("first_name"),
            cell("middle_name"),
            cell("active_duty_status_date"),
        );

        let row_errors = record.validate();
        if row_errors.is_empty() {
            records.push(record);
        } else {
            for e in row_errors {
                errors.push(format!("Row {}: {}", row_number, e));
            }
        }
    }

    if records.is_empty() && errors.is_empty() {
        errors.push("No data rows found".to_string());
    }

    if errors.is_empty() {
        info!("✓ Parsed {} record(s)", records.len());
    } else {
        warn!("⚠️ Ingestion produced {} error(s)", errors.len());
    }

    (records, errors)
}

/// Pick the delimiter that splits the header into the most cells.
fn sniff_delimiter(header: &str) -> char {
    [',', '\t', '|', ';']
        .into_iter()
        .max_by_key(|&d| header.matches(d).count())
        .unwrap_or(',')
}

/// Split one row honouring double-quoted cells.
fn split_row(line: &str, delimiter: char) -> Vec<String> {
    let mut cells = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut chars = line.chars().peekable();

    while let Some(c) = chars.next() {
        if c == '"' {
            if in_quotes && chars.peek() == Some(&'"') {
                current.push('"');
                chars.next();
            } else {
                in_quotes = !in_quotes;
            }
        } else if c == delimiter && !in_quotes {
            cells.push(current.trim().to_string());
            current = String::new();
        } else {
            current.push(c);
        }
    }
    cells.push(current.trim().to_string());
    cells
}

/// Map a raw header to its canonical column name.
fn canonical_column(raw: &str) -> String {
    let normalized = normalize_identifier(raw);
    for (canonical, synonyms) in COLUMN_SYNONYMS {
        if normalized == canonical || synonyms.contains(&normalized.as_str()) {
            return canonical.to_string();
        }
    }
    normalized
}

#[cfg(test)]
mod tests {
    use super::*;

    const VALID_TABLE: &str = "\
ssn,last_name,first_name,middle_name,date_of_birth,active_duty_status_date
123456789,DOE,JOHN,M,19861029,20251005
987654321,SMITH,JANE,,10/29/1990,10/05/2025
111223333,BROWN,ALICE,K,,20250101";

    #[test]
    fn test_three_valid_rows_produce_three_records() {
        let outcome = ingest(VALID_TABLE);
        assert!(outcome.errors.is_empty(), "{:?}", outcome.errors);
        assert_eq!(outcome.records.len(), 3);
        assert_eq!(outcome.blob.lines().count(), 3);
        for line in outcome.blob.lines() {
            assert_eq!(line.len(), crate::models::record::RECORD_LEN);
        }
    }

    #[test]
    fn test_missing_required_column_aborts_naming_it() {
        let text = "last_name,first_name,active_duty_status_date\nDOE,JOHN,20251005";
        let (records, errors) = parse_table(text);
        assert!(records.is_empty());
        assert_eq!(errors.len(), 1);
        assert!(errors[0].contains("ssn"), "{}", errors[0]);
    }

    #[test]
    fn test_row_errors_carry_row_numbers() {
        let text = "\
ssn,last_name,first_name,active_duty_status_date
123456789,DOE,JOHN,20251005
123456789,,JOHN,20251005";
        let (records, errors) = parse_table(text);
        assert_eq!(records.len(), 1);
        assert!(errors.iter().any(|e| e.starts_with("Row 3:")), "{:?}", errors);
    }

    #[test]
    fn test_errors_empty_the_blob() {
        let text = "\
ssn,last_name,first_name,active_duty_status_date
123456789,,JOHN,20251005";
        let outcome = ingest(text);
        assert!(outcome.blob.is_empty());
        assert!(!outcome.errors.is_empty());
    }

    #[test]
    fn test_header_synonyms_resolve() {
        let text = "\
social_security_number,surname,given_name,duty_date
123456789,DOE,JOHN,20251005";
        let (records, errors) = parse_table(text);
        assert!(errors.is_empty(), "{:?}", errors);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].last_name, "DOE");
    }

    #[test]
    fn test_tab_delimiter_sniffed() {
        let text = "ssn\tlast_name\tfirst_name\tactive_duty_status_date\n123456789\tDOE\tJOHN\t20251005";
        let (records, errors) = parse_table(text);
        assert!(errors.is_empty(), "{:?}", errors);
        assert_eq!(records.len(), 1);
    }

    #[test]
    fn test_quoted_cells() {
        let text = "\
ssn,last_name,first_name,active_duty_status_date
123456789,\"DOE, JR\",JOHN,20251005";
        let (records, errors) = parse_table(text);
        assert!(errors.is_empty(), "{:?}", errors);
        assert_eq!(records[0].last_name, "DOE, JR");
    }
}
