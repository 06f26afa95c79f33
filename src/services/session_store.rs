//! Remote session store client
//!
//! Persists session rows, progress updates and captured artifacts to an
//! HTTP store. When no store URL is configured every call is a no-op so
//! the automation runs identically in local development.

use std::time::Duration;

use serde_json::json;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::error::AppResult;
use crate::models::result::{PdfArtifact, ScreenshotArtifact};

/// Upload retries for screenshot artifacts
const UPLOAD_RETRIES: usize = 3;

pub struct SessionStore {
    client: reqwest::Client,
    base_url: Option<String>,
    api_key: String,
    store_user: Option<String>,
}

impl SessionStore {
    pub fn new(config: &Config) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .unwrap_or_default();
        Self {
            client,
            base_url: config.session_store_url.clone(),
            api_key: config.session_store_key.clone(),
            store_user: config.store_user.clone(),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.base_url.is_some()
    }

    fn url(&self, path: &str) -> Option<String> {
        self.base_url
            .as_ref()
            .map(|base| format!("{}/{}", base.trim_end_matches('/'), path))
    }

    /// Create the session row. Failures are surfaced so the caller can
    /// decide whether to proceed without persistence.
    pub async fn create_session(&self, session_id: &str, kind: &str) -> AppResult<()> {
        let Some(url) = self.url("sessions") else {
            debug!("Session store disabled, skipping create");
            return Ok(());
        };
        let body = json!({
            "session_id": session_id,
            "kind": kind,
            "user": &self.store_user,
            "status": "running",
        });
        self.client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await?
            .error_for_status()?;
        info!("✓ Session {} registered with store", session_id);
        Ok(())
    }

    /// Push a progress update. Best-effort, never fails the workflow.
    pub async fn update_progress(&self, session_id: &str, phase_key: &str, percent: u8, detail: &str) {
        let Some(url) = self.url(&format!("sessions/{}/progress", session_id)) else {
            return;
        };
        let body = json!({
            "phase": phase_key,
            "percent": percent,
            "detail": detail,
        });
        let result = self
            .client
            .patch(&url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await;
        if let Err(e) = result {
            warn!("⚠️ Progress update failed for {}: {}", session_id, e);
        }
    }

    /// Mark the session finished. Best-effort.
    pub async fn complete_session(&self, session_id: &str, success: bool, error: Option<&str>) {
        let Some(url) = self.url(&format!("sessions/{}", session_id)) else {
            return;
        };
        let body = json!({
            "status": if success { "completed" } else { "failed" },
            "error": error,
        });
        let result = self
            .client
            .patch(&url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await;
        match result {
            Ok(_) => info!("✓ Session {} marked {}", session_id, if success { "completed" } else { "failed" }),
            Err(e) => warn!("⚠️ Session completion update failed: {}", e),
        }
    }

    /// Upload one screenshot, retrying transient failures. Bytes go up as
    /// the raw request body so the store can stream them to blob storage.
    pub async fn upload_screenshot(&self, session_id: &str, shot: &ScreenshotArtifact) {
        let Some(url) = self.url(&format!("sessions/{}/screenshots/{}", session_id, shot.filename)) else {
            return;
        };
        for attempt in 1..=UPLOAD_RETRIES {
            let result = self
                .client
                .put(&url)
                .bearer_auth(&self.api_key)
                .header("content-type", "image/png")
                .header("x-step", &shot.step)
                .body(shot.bytes.clone())
                .send()
                .await
                .and_then(|r| r.error_for_status());
            match result {
                Ok(_) => {
                    debug!("📤 Uploaded screenshot {} ({} bytes)", shot.filename, shot.bytes.len());
                    return;
                }
                Err(e) if attempt < UPLOAD_RETRIES => {
                    warn!("⚠️ Screenshot upload attempt {}/{} failed: {}", attempt, UPLOAD_RETRIES, e);
                    tokio::time::sleep(Duration::from_millis(500 * attempt as u64)).await;
                }
                Err(e) => {
                    warn!("⚠️ Giving up on screenshot {}: {}", shot.filename, e);
                }
            }
        }
    }

    /// Upload the certificate PDF. Best-effort.
    pub async fn upload_pdf(&self, session_id: &str, pdf: &PdfArtifact) {
        let Some(url) = self.url(&format!("sessions/{}/pdf/{}", session_id, pdf.filename)) else {
            return;
        };
        let result = self
            .client
            .put(&url)
            .bearer_auth(&self.api_key)
            .header("content-type", "application/pdf")
            .body(pdf.bytes.clone())
            .send()
            .await
            .and_then(|r| r.error_for_status());
        match result {
            Ok(_) => info!("📤 Uploaded PDF {} ({} bytes)", pdf.filename, pdf.bytes.len()),
            Err(e) => warn!("⚠️ PDF upload failed: {}", e),
        }
    }

    /// List screenshot filenames stored for a session.
    pub async fn fetch_screenshot_names(&self, session_id: &str) -> AppResult<Vec<String>> {
        let Some(url) = self.url(&format!("sessions/{}/screenshots", session_id)) else {
            return Ok(Vec::new());
        };
        let names = self
            .client
            .get(&url)
            .bearer_auth(&self.api_key)
            .send()
            .await?
            .error_for_status()?
            .json::<Vec<String>>()
            .await?;
        Ok(names)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_disabled_store_builds_no_urls() {
        let config = Config {
            session_store_url: None,
            ..Config::default()
        };
        let store = SessionStore::new(&config);
        assert!(!store.is_enabled());
        assert!(store.url("sessions").is_none());
    }

    #[test]
    fn test_url_joining_strips_trailing_slash() {
        let config = Config {
            session_store_url: Some("https://store.example.com/api/".to_string()),
            ..Config::default()
        };
        let store = SessionStore::new(&config);
        assert_eq!(
            store.url("sessions").as_deref(),
            Some("https://store.example.com/api/sessions")
        );
    }
}
