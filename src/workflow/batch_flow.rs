//! Multi-record batch flow
//!
//! Uploads the fixed-width batch file, selects certificate options,
//! submits, and waits for the certificate download. The certificate
//! opens in a popup, so the flow swaps the driver onto the new page
//! before clicking download. When no file ever lands, the result page is
//! rendered to PDF so the caller always gets an artifact.

use std::path::{Path, PathBuf};
use std::time::Duration;

use chromiumoxide::cdp::browser_protocol::browser::{
    SetDownloadBehaviorBehavior, SetDownloadBehaviorParams,
};
use chromiumoxide::cdp::browser_protocol::dom::{
    GetDocumentParams, QuerySelectorParams, SetFileInputFilesParams,
};
use tempfile::TempDir;
use tracing::{info, warn};

use crate::browser::session::BrowserHandle;
use crate::error::{AppError, AppResult, FormError, ResultError};
use crate::infrastructure::selector::SelectorStrategy;
use crate::models::record::FixedWidthRecord;
use crate::models::result::BatchSummary;
use crate::models::session::Phase;
use crate::workflow::navigation::goto_with_strategies;
use crate::workflow::verification_flow::VerificationFlow;

/// Controls that open the generated certificate
const CERTIFICATE_LINK_STRATEGIES: [SelectorStrategy; 3] = [
    SelectorStrategy::with_text("a", "certificate", 3_000),
    SelectorStrategy::css("a[href*=\"certificate\"]", 2_000),
    SelectorStrategy::with_text("button", "certificate", 2_000),
];

/// Controls that trigger the PDF download inside the certificate view
const DOWNLOAD_STRATEGIES: [SelectorStrategy; 3] = [
    SelectorStrategy::with_text("button", "download", 3_000),
    SelectorStrategy::css("a[download]", 2_000),
    SelectorStrategy::with_text("a", "download", 2_000),
];

/// Radio that requests certificate generation
const CERTIFICATE_YES_STRATEGIES: [SelectorStrategy; 2] = [
    SelectorStrategy::css("input[type=\"radio\"][value=\"yes\" i]", 3_000),
    SelectorStrategy::with_text("label", "yes", 2_000),
];

impl<'a> VerificationFlow<'a> {
    /// Run the full batch flow over pre-validated records.
    pub async fn run_batch(
        &mut self,
        handle: &BrowserHandle,
        records: &[FixedWidthRecord],
        blob: &str,
    ) -> AppResult<BatchSummary> {
        info!("🚀 Batch verification of {} record(s)", records.len());

        self.enter(Phase::Init).await;

        // Downloads land in a per-session scratch dir, cleaned on drop
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
        goto_with_strategies(&self.driver, &self.config.multi_record_url).await?;
        self.shot("04_form_loaded", "Multi record form").await;

        self.enter(Phase::UploadingFile).await;
        let upload_name = format!("scra_batch_{}.txt", self.state.session_id);
        let upload_path = scratch.path().join(&upload_name);
        tokio::fs::write(&upload_path, blob)
            .await
            .map_err(|e| AppError::file_write_failed(upload_path.display().to_string(), e))?;
        self.attach_upload(&upload_path).await?;
        self.shot("05_file_attached", "Batch file attached").await;

        self.enter(Phase::ConfiguringOptions).await;
        self.request_certificate().await;

        self.enter(Phase::AcceptingTerms).await;
        self.accept_agreements().await;
        self.shot("06_options_configured", "Options and terms set").await;

        self.enter(Phase::Submitting).await;
        self.submit_form().await?;
        self.shot("07_after_submit", "Batch submitted").await;

        self.enter(Phase::AwaitingResult).await;
        self.await_processed(&upload_name).await;
        self.shot("08_results_listed", "Results table").await;

        let mut summary = BatchSummary {
            records_processed: records.len(),
            certificate_downloaded: false,
            rendered_fallback: false,
        };

        // A failure storing the downloaded certificate still falls back
        // to the page render before giving up.
        let download = self.fetch_certificate(handle, scratch.path()).await;
        let (pdf, rendered) = self.finish_artifact(download).await?;
        self.pdf = Some(pdf);
        summary.certificate_downloaded = !rendered;
        summary.rendered_fallback = rendered;

        self.enter(Phase::Extracting).await;
        self.raw_output = self.driver.body_text().await.unwrap_or_default();
        self.shot("09_final_state", "Final page state").await;

        self.enter(Phase::Done).await;
        Ok(summary)
    }

    /// Route browser downloads into the scratch directory.
    pub(crate) async fn allow_downloads(&self, handle: &BrowserHandle, dir: &Path) -> AppResult<()> {
        let params = SetDownloadBehaviorParams::builder()
            .behavior(SetDownloadBehaviorBehavior::Allow)
            .download_path(dir.display().to_string())
            .build()
            .map_err(|e| {
                AppError::Browser(crate::error::BrowserError::DownloadSetupFailed {
                    source: Box::new(std::io::Error::new(std::io::ErrorKind::InvalidInput, e)),
                })
            })?;
        handle.browser().execute(params).await?;
        Ok(())
    }

    /// Attach the batch file to the form's file input through CDP. The
    /// input is usually hidden behind a styled drop zone, so DOM-level
    /// attachment is the only reliable route.
    async fn attach_upload(&self, path: &Path) -> AppResult<()> {
        let page = self.driver.page();
        let doc = page.execute(GetDocumentParams::default()).await?;
        let root = doc.root.node_id.clone();

        let found = page
            .execute(QuerySelectorParams::new(root, "input[type=\"file\"]"))
            .await?;
        let node_id = found.node_id.clone();
        if node_id.inner() == &0 {
            return Err(AppError::Form(FormError::UploadControlNotFound));
        }

        let params = SetFileInputFilesParams::builder()
            .file(path.display().to_string())
            .node_id(node_id)
            .build()
            .map_err(|e| AppError::Other(format!("file attach failed: {}", e)))?;
        page.execute(params).await?;
        info!("✓ Attached batch file {}", path.display());
        Ok(())
    }

    /// Select "yes" for certificate generation. Missing controls are
    /// tolerated; some portal versions default to generating one.
    async fn request_certificate(&self) {
        for strategy in &CERTIFICATE_YES_STRATEGIES {
            if self.driver.probe_visible(strategy).await && self.driver.click_element(strategy).await {
                info!("✓ Requested certificate via {}", strategy.selector);
                return;
            }
        }
        warn!("⚠️ Certificate radio not found, relying on portal default");
    }

    /// Wait for the results table to list the uploaded file.
    async fn await_processed(&self, upload_name: &str) {
        let budget = Duration::from_secs(self.config.result_poll_timeout_secs);
        let started = tokio::time::Instant::now();
        let mut last_log = started;

        loop {
            let body = self.driver.body_text().await.unwrap_or_default();
            if body.contains(upload_name) {
                info!("✓ Results table lists {}", upload_name);
                return;
            }
            if started.elapsed() >= budget {
                warn!("⚠️ {} never appeared in results within {}s", upload_name, budget.as_secs());
                return;
            }
            if last_log.elapsed() >= Duration::from_secs(5) {
                info!("Waiting for processing... ({}s elapsed)", started.elapsed().as_secs());
                last_log = tokio::time::Instant::now();
            }
            tokio::time::sleep(Duration::from_secs(2)).await;
        }
    }

    /// Open the certificate, follow its popup, click download, and wait
    /// for the file to land in the scratch directory.
    async fn fetch_certificate(
        &mut self,
        handle: &BrowserHandle,
        download_dir: &Path,
    ) -> AppResult<PathBuf> {
        let known_urls: Vec<String> = self.open_page_urls(handle).await;

        match self.driver.first_match(&CERTIFICATE_LINK_STRATEGIES).await {
            Some(strategy) => {
                self.driver.click_element(strategy).await;
                info!("✓ Opened certificate via {}", strategy.selector);
            }
            None => {
                return Err(AppError::Result(ResultError::NoArtifact {
                    detail: "certificate link not found".to_string(),
                }));
            }
        }

        // The certificate usually opens in a new tab
        if let Some(popup) = self.find_new_page(handle, &known_urls).await {
            info!("✓ Certificate opened in popup, switching to it");
            self.driver.swap_page(popup);
            self.shot("10_certificate_view", "Certificate popup").await;
        }

        if let Some(strategy) = self.driver.first_match(&DOWNLOAD_STRATEGIES).await {
            self.driver.click_element(strategy).await;
            info!("📤 Download triggered via {}", strategy.selector);
        }

        self.await_download(download_dir).await
    }

    async fn open_page_urls(&self, handle: &BrowserHandle) -> Vec<String> {
        let mut urls = Vec::new();
        if let Ok(pages) = handle.browser().pages().await {
            for page in pages {
                if let Ok(Some(url)) = page.url().await {
                    urls.push(url);
                }
            }
        }
        urls
    }

    /// Poll for a page whose URL was not open before the click.
    async fn find_new_page(
        &self,
        handle: &BrowserHandle,
        known_urls: &[String],
    ) -> Option<chromiumoxide::page::Page> {
        let deadline = tokio::time::Instant::now() + Duration::from_secs(10);
        while tokio::time::Instant::now() < deadline {
            if let Ok(pages) = handle.browser().pages().await {
                for page in pages {
                    if let Ok(Some(url)) = page.url().await {
                        if !url.is_empty()
                            && url != "about:blank"
                            && !known_urls.contains(&url)
                        {
                            return Some(page);
                        }
                    }
                }
            }
            tokio::time::sleep(Duration::from_millis(500)).await;
        }
        None
    }

    /// Poll the scratch dir until a finished file appears. Chrome writes
    /// in-progress downloads as .crdownload, which are skipped.
    pub(crate) async fn await_download(&self, dir: &Path) -> AppResult<PathBuf> {
        let budget = Duration::from_secs(self.config.download_timeout_secs);
        let started = tokio::time::Instant::now();
        let mut last_log = started;

        loop {
            let mut entries = tokio::fs::read_dir(dir).await?;
            while let Some(entry) = entries.next_entry().await? {
                let path = entry.path();
                let name = path.file_name().map(|n| n.to_string_lossy().to_string()).unwrap_or_default();
                if name.ends_with(".crdownload") || name.starts_with("scra_batch_") {
                    continue;
                }
                info!("✓ Download landed: {}", name);
                return Ok(path);
            }
            if started.elapsed() >= budget {
                return Err(AppError::Result(ResultError::NoArtifact {
                    detail: format!("no download within {}s", budget.as_secs()),
                }));
            }
            if last_log.elapsed() >= Duration::from_secs(5) {
                info!("Waiting for download... ({}s elapsed)", started.elapsed().as_secs());
                last_log = tokio::time::Instant::now();
            }
            tokio::time::sleep(Duration::from_secs(1)).await;
        }
    }
}
