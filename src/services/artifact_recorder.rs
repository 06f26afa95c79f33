//! Screenshot and PDF capture
//!
//! Capture is best-effort wherever possible: a stuck renderer must not
//! kill the verification, so full-page capture runs under a timeout and
//! degrades to a viewport shot before giving up. Uploads to the session
//! store happen on spawned tasks so capture never blocks the workflow.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use chromiumoxide::cdp::browser_protocol::page::PrintToPdfParams;
use chromiumoxide::page::{Page, ScreenshotParams};
use chrono::Utc;
use tracing::{debug, info, warn};

use crate::error::{AppError, AppResult, ResultError};
use crate::models::result::{PdfArtifact, ScreenshotArtifact};
use crate::services::session_store::SessionStore;

pub struct ArtifactRecorder {
    store: Arc<SessionStore>,
    session_id: String,
    development_mode: bool,
}

impl ArtifactRecorder {
    pub fn new(store: Arc<SessionStore>, session_id: impl Into<String>, development_mode: bool) -> Self {
        Self {
            store,
            session_id: session_id.into(),
            development_mode,
        }
    }

    /// Capture a screenshot for a workflow step. Returns `None` when the
    /// page cannot produce one; the workflow carries on either way.
    pub async fn capture_screenshot(
        &self,
        page: &Page,
        step: &str,
        description: &str,
    ) -> Option<ScreenshotArtifact> {
        // Development runs tolerate slower renderers
        let (full_timeout, viewport_timeout) = if self.development_mode {
            (Duration::from_secs(15), Duration::from_secs(10))
        } else {
            (Duration::from_secs(8), Duration::from_secs(5))
        };

        let full = ScreenshotParams::builder().full_page(true).build();
        let bytes = match tokio::time::timeout(full_timeout, page.screenshot(full)).await {
            Ok(Ok(bytes)) => bytes,
            Ok(Err(e)) => {
                let text = e.to_string().to_lowercase();
                if text.contains("closed") || text.contains("target") {
                    warn!("⚠️ Page context gone, skipping screenshot {}", step);
                    return None;
                }
                debug!("Full-page screenshot failed for {}: {}", step, e);
                self.viewport_fallback(page, step, viewport_timeout).await?
            }
            Err(_) => {
                debug!("Full-page screenshot timed out for {}", step);
                self.viewport_fallback(page, step, viewport_timeout).await?
            }
        };

        let artifact = ScreenshotArtifact {
            step: step.to_string(),
            filename: format!("{}_{}.png", self.session_id, step),
            description: description.to_string(),
            bytes,
            captured_at: Utc::now(),
        };
        info!("✓ Screenshot {} captured ({} bytes)", step, artifact.bytes.len());

        self.persist_screenshot(&artifact);
        Some(artifact)
    }

    async fn viewport_fallback(
        &self,
        page: &Page,
        step: &str,
        timeout: Duration,
    ) -> Option<Vec<u8>> {
        let params = ScreenshotParams::builder().full_page(false).build();
        match tokio::time::timeout(timeout, page.screenshot(params)).await {
            Ok(Ok(bytes)) => Some(bytes),
            Ok(Err(e)) => {
                warn!("⚠️ Viewport screenshot also failed for {}: {}", step, e);
                None
            }
            Err(_) => {
                warn!("⚠️ Viewport screenshot timed out for {}", step);
                None
            }
        }
    }

    /// Upload and, in development, keep a local copy under dbg_artifacts/.
    fn persist_screenshot(&self, artifact: &ScreenshotArtifact) {
        let store = Arc::clone(&self.store);
        let session_id = self.session_id.clone();
        let shot = artifact.clone();
        tokio::spawn(async move {
            store.upload_screenshot(&session_id, &shot).await;
        });

        if self.development_mode {
            let dir = format!("dbg_artifacts/{}/screenshots", self.session_id);
            let path = format!("{}/{}", dir, artifact.filename);
            let bytes = artifact.bytes.clone();
            tokio::spawn(async move {
                if tokio::fs::create_dir_all(&dir).await.is_ok() {
                    if let Err(e) = tokio::fs::write(&path, &bytes).await {
                        warn!("⚠️ Local screenshot copy failed: {}", e);
                    }
                }
            });
        }
    }

    /// Wrap a downloaded certificate file as an artifact and upload it.
    pub async fn store_downloaded_pdf(&self, path: &Path) -> AppResult<PdfArtifact> {
        let bytes = tokio::fs::read(path).await?;
        let filename = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| format!("{}_certificate.pdf", self.session_id));
        let artifact = PdfArtifact {
            filename,
            bytes,
            captured_at: Utc::now(),
        };
        info!("✓ Certificate captured: {} ({} bytes)", artifact.filename, artifact.bytes.len());
        self.store.upload_pdf(&self.session_id, &artifact).await;
        Ok(artifact)
    }

    /// Render the current page to PDF. Used when the portal's own download
    /// never materialises.
    pub async fn render_page_pdf(&self, page: &Page) -> AppResult<PdfArtifact> {
        let params = PrintToPdfParams {
            print_background: Some(true),
            prefer_css_page_size: Some(true),
            paper_width: Some(8.27),
            paper_height: Some(11.69),
            margin_top: Some(1.0),
            margin_bottom: Some(1.0),
            margin_left: Some(1.0),
            margin_right: Some(1.0),
            ..Default::default()
        };
        let bytes = page.pdf(params).await.map_err(|e| {
            AppError::Result(ResultError::NoArtifact {
                detail: format!("page render failed: {}", e),
            })
        })?;
        let artifact = PdfArtifact {
            filename: format!("{}_result_page.pdf", self.session_id),
            bytes,
            captured_at: Utc::now(),
        };
        info!("✓ Result page rendered to PDF ({} bytes)", artifact.bytes.len());
        self.store.upload_pdf(&self.session_id, &artifact).await;
        Ok(artifact)
    }
}
