//! End-to-end tests of the ingestion and record codec through the public API

use scra_verify::models::ingest::{ingest, parse_table};
use scra_verify::models::record::{decode_blob, FixedWidthRecord, RECORD_LEN};

const TABLE: &str = "\
ssn,last_name,first_name,middle_name,date_of_birth,active_duty_status_date
123456789,DOE,JOHN,M,10/29/1986,10/05/2025
987654321,SMITH,JANE,,19900315,20250101
555443333,O'BRIEN,PATRICK,J,,20250601";

#[test]
fn ingest_produces_one_line_per_record() {
    let outcome = ingest(TABLE);
    assert!(outcome.errors.is_empty(), "{:?}", outcome.errors);
    assert_eq!(outcome.records.len(), 3);

    let lines: Vec<&str> = outcome.blob.lines().collect();
    assert_eq!(lines.len(), 3);
    for line in &lines {
        assert_eq!(line.len(), RECORD_LEN);
    }
}

#[test]
fn blob_decodes_back_to_source_fields() {
    let outcome = ingest(TABLE);
    let decoded = decode_blob(&outcome.blob);
    assert_eq!(decoded.len(), 3);

    assert_eq!(decoded[0].ssn, "123456789");
    assert_eq!(decoded[0].date_of_birth, "19861029");
    assert_eq!(decoded[0].active_duty_date, "20251005");
    assert_eq!(decoded[0].last_name.to_uppercase(), "DOE");

    // Missing DOB decodes as empty, not as garbage
    assert_eq!(decoded[2].date_of_birth, "");
}

#[test]
fn mixed_date_formats_normalize_to_yyyymmdd() {
    let outcome = ingest(TABLE);
    assert_eq!(outcome.records[0].date_of_birth, "19861029");
    assert_eq!(outcome.records[1].date_of_birth, "19900315");
}

#[test]
fn dashed_ssn_normalizes() {
    let text = "\
ssn,last_name,first_name,active_duty_status_date
123-45-6789,DOE,JOHN,20251005";
    let (records, errors) = parse_table(text);
    assert!(errors.is_empty(), "{:?}", errors);
    assert_eq!(records[0].ssn, "123456789");
}

#[test]
fn bad_row_blocks_the_blob_but_not_good_rows() {
    let text = "\
ssn,last_name,first_name,active_duty_status_date
123456789,DOE,JOHN,20251005
987654321,SMITH,,20250101";
    let outcome = ingest(text);
    assert_eq!(outcome.records.len(), 1);
    assert!(outcome.blob.is_empty());
    assert!(outcome.errors.iter().any(|e| e.starts_with("Row 3:")));
}

#[test]
fn decode_tolerates_short_lines() {
    let record = FixedWidthRecord::decode("123456789");
    assert_eq!(record.ssn, "123456789");
    assert_eq!(record.last_name, "");
    assert_eq!(record.active_duty_date, "");
}
