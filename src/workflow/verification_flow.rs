//! Single-record verification flow
//!
//! Drives the portal through login, form fill, submit and result
//! extraction as a forward-only state machine. Every phase advances the
//! session state, publishes progress and captures a numbered screenshot,
//! so a failed run leaves a visual trail of exactly how far it got.

use std::path::PathBuf;
use std::time::Duration;

use tempfile::TempDir;
use tracing::{info, warn};

use crate::browser::session::BrowserHandle;
use crate::config::Config;
use crate::error::{AppError, AppResult, FormError, LoginError};
use crate::infrastructure::page_driver::PageDriver;
use crate::infrastructure::selector::{CheckboxInfo, SelectorStrategy};
use crate::models::request::{mask_ssn, to_mmddyyyy, to_yyyymmdd, VerificationRequest};
use crate::models::result::{
    EligibilityResult, PdfArtifact, ScreenshotArtifact,
};
use crate::models::session::{new_transaction_id, Phase, SessionState};
use crate::services::artifact_recorder::ArtifactRecorder;
use crate::services::classifier;
use crate::services::progress_reporter::ProgressReporter;
use crate::utils::logging::truncate_text;
use crate::workflow::navigation::goto_with_strategies;

/// Result page excerpt kept for audit
const RAW_EXCERPT_LIMIT: usize = 2000;

// ========== Selector strategy tables ==========

/// Login form fields
const USERNAME_FIELD: SelectorStrategy = SelectorStrategy::css("input[name=\"username\"]", 10_000);
const PASSWORD_FIELD: SelectorStrategy = SelectorStrategy::css("input[name=\"password\"]", 5_000);

/// Visible signals that login was rejected
const LOGIN_FAILURE_INDICATORS: [SelectorStrategy; 3] = [
    SelectorStrategy::css(".error", 500),
    SelectorStrategy::css(".alert-danger", 500),
    SelectorStrategy::css("[class*=\"error\"]", 500),
];

/// Visible signals that login landed on an authenticated page
const LOGIN_SUCCESS_INDICATORS: [SelectorStrategy; 5] = [
    SelectorStrategy::css("a[href*=\"logout\"]", 1_000),
    SelectorStrategy::css(".main-content", 1_000),
    SelectorStrategy::css(".dashboard", 1_000),
    SelectorStrategy::with_text("button", "menu", 1_000),
    SelectorStrategy::with_text("a", "single record", 1_000),
];

/// Fields that prove the verification form actually rendered
const VERIFICATION_FIELD_INDICATORS: [SelectorStrategy; 4] = [
    SelectorStrategy::css("#ssnInput", 10_000),
    SelectorStrategy::css("#lastNameInput", 3_000),
    SelectorStrategy::css("input[name=\"lastName\"]", 2_000),
    SelectorStrategy::css("input[name=\"ssn\"]", 2_000),
];

/// Controls that submit the filled form, most specific first
const SUBMIT_STRATEGIES: [SelectorStrategy; 4] = [
    SelectorStrategy::css("button.btn.btn-primary", 3_000),
    SelectorStrategy::with_text("button", "submit", 3_000),
    SelectorStrategy::css("button[type=\"submit\"]", 2_000),
    SelectorStrategy::css("input[type=\"submit\"]", 2_000),
];

/// Overlays the portal shows before the form is reachable
const MODAL_DISMISS_STRATEGIES: [SelectorStrategy; 5] = [
    SelectorStrategy::with_text(".modal-content button", "accept", 2_000),
    SelectorStrategy::with_text("button", "accept", 1_000),
    SelectorStrategy::with_text("button", "agree", 1_000),
    SelectorStrategy::with_text("button", "ok", 1_000),
    SelectorStrategy::css(".modal button", 1_000),
];

/// Checkbox label phrases that identify agreement boxes
const AGREEMENT_KEYWORDS: [&str; 6] = ["accept", "agree", "terms", "privacy", "policy", "consent"];

/// Unmatched unchecked boxes clicked as a fallback when no label matched
const AGREEMENT_FALLBACK_CLICKS: usize = 2;

/// Accumulated output of one flow run, success or not
pub struct FlowOutcome {
    pub state: SessionState,
    pub screenshots: Vec<ScreenshotArtifact>,
    pub pdf: Option<PdfArtifact>,
    pub raw_output: String,
    pub page_url: String,
}

pub struct VerificationFlow<'a> {
    pub(crate) config: &'a Config,
    pub(crate) driver: PageDriver,
    pub(crate) recorder: ArtifactRecorder,
    pub(crate) progress: ProgressReporter,
    pub(crate) state: SessionState,
    pub(crate) screenshots: Vec<ScreenshotArtifact>,
    pub(crate) pdf: Option<PdfArtifact>,
    pub(crate) raw_output: String,
}

impl<'a> VerificationFlow<'a> {
    pub fn new(
        config: &'a Config,
        driver: PageDriver,
        recorder: ArtifactRecorder,
        progress: ProgressReporter,
        session_id: &str,
    ) -> Self {
        Self {
            config,
            driver,
            recorder,
            progress,
            state: SessionState::new(session_id),
            screenshots: Vec::new(),
            pdf: None,
            raw_output: String::new(),
        }
    }

    /// Run the full single-record flow. On error the caller still gets
    /// the artifacts gathered so far via [`Self::into_outcome`].
    pub async fn run_single(
        &mut self,
        handle: &BrowserHandle,
        request: &VerificationRequest,
    ) -> AppResult<EligibilityResult> {
        info!(
            "🚀 Verifying {} {} (SSN {})",
            request.first_name,
            request.last_name,
            mask_ssn(&request.ssn)
        );

        self.enter(Phase::Init).await;

        // Armed before submit so a result PDF lands somewhere we watch
        let scratch = TempDir::new()?;
        self.allow_downloads(handle, scratch.path()).await?;

        self.enter(Phase::NavigatingLogin).await;
        goto_with_strategies(&self.driver, &self.config.login_url).await?;
        self.shot("01_main_page_loaded", "Portal landing page").await;

        self.dismiss_modals().await;
        self.shot("02_after_agreements", "After dismissing overlays").await;

        self.enter(Phase::LoggingIn).await;
        self.login().await?;
        self.shot("03_after_login", "Authenticated").await;

        self.enter(Phase::NavigatingForm).await;
        goto_with_strategies(&self.driver, &self.config.single_record_url).await?;
        self.dismiss_modals().await;
        self.require_verification_form().await?;
        self.shot("04_form_loaded", "Single record form").await;

        self.enter(Phase::FillingForm).await;
        self.fill_single_form(request).await;
        self.shot("05_form_filled", "Form filled").await;

        self.enter(Phase::AcceptingTerms).await;
        self.accept_agreements().await;

        self.enter(Phase::Submitting).await;
        self.submit_form().await?;
        self.shot("06_after_submit", "Form submitted").await;

        self.enter(Phase::AwaitingResult).await;
        let text = self.await_result_text().await;

        self.enter(Phase::Extracting).await;
        self.raw_output = text.clone();
        self.shot("07_result_page", "Result page").await;

        // Downloaded certificate preferred, page render as fallback.
        // A verdict without any artifact is an error.
        let download = self.await_download(scratch.path()).await;
        let (pdf, _) = self.finish_artifact(download).await?;
        self.pdf = Some(pdf);

        let result = build_eligibility(&text, request);

        self.enter(Phase::Done).await;
        Ok(result)
    }

    /// Consume the flow into whatever it gathered.
    pub async fn into_outcome(self) -> FlowOutcome {
        let page_url = self.driver.current_url().await.unwrap_or_default();
        FlowOutcome {
            state: self.state,
            screenshots: self.screenshots,
            pdf: self.pdf,
            raw_output: self.raw_output,
            page_url,
        }
    }

    /// Mark failure, publish it and grab a diagnostic screenshot.
    pub async fn record_failure(&mut self, error: &AppError) {
        let detail = error.to_string();
        warn!("⚠️ Flow failed at {:?}: {}", self.state.phase, detail);
        self.state.fail(detail.clone());
        self.progress.report_failure(&detail).await;
        self.shot("99_error", "State at failure").await;
    }

    // ========== Phase helpers ==========

    pub(crate) async fn enter(&mut self, phase: Phase) {
        self.state.advance(phase);
        self.progress.report(phase).await;
    }

    pub(crate) async fn shot(&mut self, step: &str, description: &str) {
        if let Some(artifact) = self
            .recorder
            .capture_screenshot(self.driver.page(), step, description)
            .await
        {
            self.screenshots.push(artifact);
        }
    }

    /// Click through consent overlays until none respond.
    pub(crate) async fn dismiss_modals(&self) {
        for strategy in &MODAL_DISMISS_STRATEGIES {
            if self.driver.probe_visible(strategy).await && self.driver.click_element(strategy).await {
                info!("✓ Dismissed overlay via {}", strategy.selector);
                tokio::time::sleep(Duration::from_millis(500)).await;
            }
        }
    }

    /// Fill credentials and submit with Enter, then verify the outcome
    /// from page indicators and the URL.
    pub(crate) async fn login(&self) -> AppResult<()> {
        if !self.driver.wait_visible(&USERNAME_FIELD).await {
            return Err(AppError::Login(LoginError::FieldsNotFound));
        }
        self.driver
            .fill_element(&USERNAME_FIELD, &self.config.scra_username)
            .await;
        self.driver
            .fill_element(&PASSWORD_FIELD, &self.config.scra_password)
            .await;
        self.driver.press_enter(&PASSWORD_FIELD).await;

        tokio::time::sleep(Duration::from_secs(3)).await;

        let body = self.driver.body_text().await.unwrap_or_default();
        if body.contains("Invalid username or password") {
            return Err(AppError::login_failure("Invalid username or password"));
        }
        for indicator in &LOGIN_FAILURE_INDICATORS {
            if self.driver.probe_visible(indicator).await {
                return Err(AppError::login_failure(format!(
                    "failure indicator visible: {}",
                    indicator.selector
                )));
            }
        }

        for indicator in &LOGIN_SUCCESS_INDICATORS {
            if self.driver.probe_visible(indicator).await {
                info!("✓ Login verified via {}", indicator.selector);
                return Ok(());
            }
        }

        // No positive indicator; leaving the login URL counts
        let url = self.driver.current_url().await.unwrap_or_default();
        if !url.is_empty() && url != self.config.login_url {
            info!("✓ Login verified via URL change");
            return Ok(());
        }
        Err(AppError::Login(LoginError::Unverified))
    }

    /// The form page keeps the login markup when auth silently expired.
    async fn require_verification_form(&self) -> AppResult<()> {
        if self.driver.first_match(&VERIFICATION_FIELD_INDICATORS).await.is_some() {
            return Ok(());
        }
        if self.driver.probe_visible(&USERNAME_FIELD).await {
            warn!("⚠️ Login fields still present on the form page");
        }
        Err(AppError::Form(FormError::StaleNavigation))
    }

    /// Fill every known field that has a value. Empty values are skipped
    /// so optional fields never clear portal defaults.
    async fn fill_single_form(&self, request: &VerificationRequest) {
        let ssn = request.normalized_ssn();
        let birth = to_mmddyyyy(&request.date_of_birth);
        let duty = to_mmddyyyy(&request.active_duty_date);
        let middle = request.middle_name.clone().unwrap_or_default();

        let fields: [(&'static str, &str, &'static str); 7] = [
            ("#ssnInput", &ssn, "SSN"),
            ("#ssnConfirmationInput", &ssn, "SSN confirmation"),
            ("#lastNameInput", &request.last_name, "last name"),
            ("#firstNameInput", &request.first_name, "first name"),
            ("#middleNameInput", &middle, "middle name"),
            ("#mat-input-0", &birth, "date of birth"),
            ("#mat-input-1", &duty, "active duty date"),
        ];

        for (selector, value, label) in fields {
            if value.is_empty() {
                continue;
            }
            let strategy = SelectorStrategy::css(selector, 2_000);
            if self.driver.wait_visible(&strategy).await
                && self.driver.fill_element(&strategy, value).await
            {
                if label.starts_with("SSN") {
                    info!("✓ Filled {} ({})", label, mask_ssn(value));
                } else {
                    info!("✓ Filled {}", label);
                }
            } else {
                warn!("⚠️ Field not found: {} ({})", selector, label);
            }
        }
    }

    /// Check agreement boxes by label keyword; when nothing matches,
    /// check up to a couple of unchecked boxes as a fallback.
    pub(crate) async fn accept_agreements(&self) {
        let boxes = self.driver.checkbox_scan().await;
        for index in plan_agreement_clicks(&boxes) {
            if self.driver.click_checkbox(index).await {
                let label = boxes
                    .iter()
                    .find(|b| b.index == index)
                    .map(|b| b.label.as_str())
                    .unwrap_or("");
                info!("✓ Checked agreement box {}: {}", index, truncate_text(label, 60));
            }
        }
    }

    pub(crate) async fn submit_form(&self) -> AppResult<()> {
        match self.driver.first_match(&SUBMIT_STRATEGIES).await {
            Some(strategy) => {
                if self.driver.click_element(strategy).await {
                    info!("📤 Submitted via {}", strategy.selector);
                    Ok(())
                } else {
                    Err(AppError::Form(FormError::SubmitControlNotFound))
                }
            }
            None => Err(AppError::Form(FormError::SubmitControlNotFound)),
        }
    }

    /// Poll the page until outcome text appears or the budget runs out.
    /// A timeout returns whatever text is present; classification then
    /// reports UNKNOWN rather than failing the run.
    async fn await_result_text(&self) -> String {
        let budget = Duration::from_secs(self.config.result_poll_timeout_secs);
        let started = tokio::time::Instant::now();
        let mut last_log = started;

        loop {
            let text = self.driver.body_text().await.unwrap_or_default();
            if classifier::mentions_outcome(&text) {
                return text;
            }
            if started.elapsed() >= budget {
                warn!("⚠️ No outcome text within {}s", budget.as_secs());
                return text;
            }
            if last_log.elapsed() >= Duration::from_secs(5) {
                info!(
                    "Waiting for result... ({}s elapsed)",
                    started.elapsed().as_secs()
                );
                last_log = tokio::time::Instant::now();
            }
            tokio::time::sleep(Duration::from_secs(1)).await;
        }
    }

    /// Turn a download attempt into a stored PDF, rendering the current
    /// page when the download failed or could not be stored. Returns the
    /// artifact plus whether the render fallback produced it. Both paths
    /// failing is a hard error; a successful run always has an artifact.
    pub(crate) async fn finish_artifact(
        &self,
        download: AppResult<PathBuf>,
    ) -> AppResult<(PdfArtifact, bool)> {
        match download {
            Ok(path) => match self.recorder.store_downloaded_pdf(&path).await {
                Ok(pdf) => return Ok((pdf, false)),
                Err(e) => warn!("⚠️ Downloaded result could not be stored: {}", e),
            },
            Err(e) => warn!("⚠️ Result download failed, rendering page instead: {}", e),
        }
        let pdf = self.recorder.render_page_pdf(self.driver.page()).await?;
        Ok((pdf, true))
    }
}

/// Decide which checkboxes to click on an agreement screen. Boxes whose
/// label matches an agreement keyword are checked; when no label matches
/// at all, up to [`AGREEMENT_FALLBACK_CLICKS`] unchecked boxes get
/// clicked blind. Disabled boxes are never clicked and never consume a
/// fallback slot.
/// Build the eligibility verdict from the result page text. The active
/// duty start date is only reported when the service member is covered;
/// the date of interest echoes the request either way.
fn build_eligibility(text: &str, request: &VerificationRequest) -> EligibilityResult {
    let classification = classifier::classify(text);
    EligibilityResult {
        covered: classification.covered,
        match_reason_code: classification.match_reason_code,
        scra_eligibility_type: classification.eligibility_type,
        transaction_id: new_transaction_id(),
        raw_page_excerpt: text.chars().take(RAW_EXCERPT_LIMIT).collect(),
        date_of_interest: Some(to_mmddyyyy(&request.active_duty_date)),
        active_duty_indicator_code: Some(
            if classification.covered { "Y" } else { "N" }.to_string(),
        ),
        active_duty_start_date: classification
            .covered
            .then(|| to_yyyymmdd(&request.active_duty_date)),
    }
}

fn plan_agreement_clicks(boxes: &[CheckboxInfo]) -> Vec<usize> {
    let mut clicks = Vec::new();
    let mut matched = false;
    for b in boxes {
        let label = b.label.to_lowercase();
        if AGREEMENT_KEYWORDS.iter().any(|kw| label.contains(kw)) {
            matched = true;
            if !b.checked && !b.disabled {
                clicks.push(b.index);
            }
        }
    }
    if !matched {
        clicks.extend(
            boxes
                .iter()
                .filter(|b| !b.checked && !b.disabled)
                .take(AGREEMENT_FALLBACK_CLICKS)
                .map(|b| b.index),
        );
    }
    clicks
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cb(index: usize, label: &str, checked: bool, disabled: bool) -> CheckboxInfo {
        CheckboxInfo {
            index,
            label: label.to_string(),
            checked,
            disabled,
        }
    }

    fn sample_request() -> VerificationRequest {
        VerificationRequest {
            ssn: "123-45-6789".to_string(),
            first_name: "JOHN".to_string(),
            last_name: "DOE".to_string(),
            middle_name: None,
            suffix: None,
            date_of_birth: "01/15/1990".to_string(),
            active_duty_date: "03/01/2024".to_string(),
        }
    }

    #[test]
    fn test_plan_clicks_labelled_boxes() {
        let boxes = vec![
            cb(0, "I accept the terms of use", false, false),
            cb(1, "Remember me", false, false),
            cb(2, "Privacy Act statement", true, false),
        ];
        // Only the unchecked keyword match; no fallback once a label matched
        assert_eq!(plan_agreement_clicks(&boxes), vec![0]);
    }

    #[test]
    fn test_plan_clicks_skips_disabled_in_fallback() {
        // No labels match, so the fallback clicks kick in. The disabled
        // box must not consume one of the two slots.
        let boxes = vec![
            cb(0, "", false, true),
            cb(1, "", false, false),
            cb(2, "", false, false),
            cb(3, "", false, false),
        ];
        assert_eq!(plan_agreement_clicks(&boxes), vec![1, 2]);
    }

    #[test]
    fn test_plan_clicks_skips_disabled_keyword_match() {
        let boxes = vec![
            cb(0, "I agree to the terms", false, true),
            cb(1, "Consent to monitoring", false, false),
        ];
        assert_eq!(plan_agreement_clicks(&boxes), vec![1]);
    }

    #[test]
    fn test_plan_clicks_no_fallback_when_matches_all_checked() {
        let boxes = vec![
            cb(0, "I accept", true, false),
            cb(1, "Newsletter signup", false, false),
        ];
        assert!(plan_agreement_clicks(&boxes).is_empty());
    }

    #[test]
    fn test_eligibility_start_date_follows_coverage() {
        let request = sample_request();

        let covered = build_eligibility("Active Duty Status: YES, covered by SCRA", &request);
        assert!(covered.covered);
        assert_eq!(covered.active_duty_indicator_code.as_deref(), Some("Y"));
        assert_eq!(covered.active_duty_start_date.as_deref(), Some("20240301"));
        assert_eq!(covered.date_of_interest.as_deref(), Some("03/01/2024"));

        let uncovered = build_eligibility("not covered by SCRA protections", &request);
        assert!(!uncovered.covered);
        assert_eq!(uncovered.active_duty_indicator_code.as_deref(), Some("N"));
        assert_eq!(uncovered.active_duty_start_date, None);
    }

    #[test]
    fn test_submit_strategies_specific_first() {
        assert_eq!(SUBMIT_STRATEGIES[0].selector, "button.btn.btn-primary");
        assert_eq!(SUBMIT_STRATEGIES[1].text, Some("submit"));
    }

    #[test]
    fn test_agreement_keywords_cover_common_labels() {
        for label in [
            "I accept the terms of use",
            "I agree",
            "Privacy Act statement",
            "Consent to monitoring",
        ] {
            let lower = label.to_lowercase();
            assert!(
                AGREEMENT_KEYWORDS.iter().any(|kw| lower.contains(kw)),
                "{} matched no keyword",
                label
            );
        }
    }
}
