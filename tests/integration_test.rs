//! Integration tests
//!
//! The ignored tests drive a real browser against the live portal and need
//! SCRA_USERNAME / SCRA_PASSWORD set. Run them explicitly:
//!
//!     cargo test -- --ignored
//!
//! The remaining tests exercise orchestration without any browser.

use scra_verify::{App, Config, VerificationRequest};

fn test_request() -> VerificationRequest {
    VerificationRequest {
        ssn: "123-45-6789".to_string(),
        first_name: "JOHN".to_string(),
        last_name: "DOE".to_string(),
        middle_name: None,
        suffix: None,
        date_of_birth: "10/29/1986".to_string(),
        active_duty_date: "10/05/2025".to_string(),
    }
}

#[test]
fn initialize_rejects_missing_credentials() {
    let config = Config {
        scra_username: String::new(),
        scra_password: String::new(),
        ..Config::default()
    };
    let err = App::initialize(config).err().expect("should reject");
    assert!(err.to_string().contains("SCRA_USERNAME"), "{}", err);
}

#[test]
fn initialize_accepts_credentials_without_store() {
    let config = Config {
        scra_username: "user".to_string(),
        scra_password: "pass".to_string(),
        session_store_url: None,
        ..Config::default()
    };
    let app = App::initialize(config).expect("should initialize");
    assert!(app.config().session_store_url.is_none());
}

#[tokio::test]
async fn batch_refuses_empty_input_without_launching() {
    let config = Config {
        scra_username: "user".to_string(),
        scra_password: "pass".to_string(),
        ..Config::default()
    };
    let app = App::initialize(config).unwrap();
    let response = app.verify_batch_fixed_width("").await;
    assert!(!response.success);
    assert!(response.error.unwrap().contains("no valid records"));
}

#[tokio::test]
async fn batch_refuses_table_with_row_errors() {
    let config = Config {
        scra_username: "user".to_string(),
        scra_password: "pass".to_string(),
        ..Config::default()
    };
    let app = App::initialize(config).unwrap();
    let table = "\
ssn,last_name,first_name,active_duty_status_date
123456789,,JOHN,20251005";
    let response = app.verify_batch_table(table).await;
    assert!(!response.success);
    assert!(response.error.unwrap().contains("validation errors"));
}

#[tokio::test]
#[ignore]
async fn live_single_record_verification() {
    scra_verify::utils::init_logging();
    let config = Config::from_env();
    let app = App::initialize(config).expect("credentials must be set");

    let response = app.verify_single(&test_request()).await;

    println!("success: {}", response.success);
    println!("eligibility: {:?}", response.eligibility);
    println!("screenshots: {}", response.automation.screenshots.len());
    assert!(!response.automation.session_id.is_empty());
    // A live run must at least reach the portal and capture evidence
    assert!(!response.automation.screenshots.is_empty());
    // A verdict always carries a certificate, downloaded or rendered
    if response.success {
        assert!(response.automation.pdf.is_some());
    }
}

#[tokio::test]
#[ignore]
async fn live_batch_verification() {
    scra_verify::utils::init_logging();
    let config = Config::from_env();
    let app = App::initialize(config).expect("credentials must be set");

    let table = "\
ssn,last_name,first_name,active_duty_status_date
123456789,DOE,JOHN,20251005";
    let response = app.verify_batch_table(table).await;

    println!("success: {}", response.success);
    println!("summary: {:?}", response.summary);
    assert_eq!(response.summary.records_processed, 1);
    if response.success {
        // Exactly one of the two artifact paths must have produced the PDF
        assert!(response.automation.pdf.is_some());
        assert!(
            response.summary.certificate_downloaded != response.summary.rendered_fallback
        );
    }
}
