//! Orchestration layer
//!
//! Owns the session lifecycle around the workflow: validates configuration
//! before any browser starts, launches one browser per session, runs the
//! flow, and guarantees teardown whether the flow succeeded or not.

use std::sync::Arc;

use chrono::Utc;
use tracing::{error, info};

use crate::browser::session::BrowserHandle;
use crate::config::Config;
use crate::error::{AppError, AppResult, IngestError};
use crate::infrastructure::page_driver::PageDriver;
use crate::models::ingest;
use crate::models::record::FixedWidthRecord;
use crate::models::request::VerificationRequest;
use crate::models::result::{AutomationResult, BatchResponse, BatchSummary, VerificationResponse};
use crate::models::session::new_session_id;
use crate::services::artifact_recorder::ArtifactRecorder;
use crate::services::progress_reporter::ProgressReporter;
use crate::services::session_store::SessionStore;
use crate::workflow::verification_flow::{FlowOutcome, VerificationFlow};

pub struct App {
    config: Config,
    store: Arc<SessionStore>,
}

impl App {
    /// Validate configuration and build the shared services. Credential
    /// problems surface here, before any browser process exists.
    pub fn initialize(config: Config) -> AppResult<Self> {
        config.validate()?;
        let store = Arc::new(SessionStore::new(&config));
        Ok(Self { config, store })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Verify one person interactively through the single-record form.
    pub async fn verify_single(&self, request: &VerificationRequest) -> VerificationResponse {
        let session_id = new_session_id();
        info!("Session {} started (single record)", session_id);

        if let Err(e) = self.store.create_session(&session_id, "single").await {
            error!("Session store registration failed: {}", e);
        }

        let handle = match BrowserHandle::start(&self.config).await {
            Ok(handle) => handle,
            Err(e) => {
                self.store
                    .complete_session(&session_id, false, Some(&e.to_string()))
                    .await;
                return VerificationResponse::failure(
                    AutomationResult {
                        session_id,
                        ..AutomationResult::default()
                    },
                    e.to_string(),
                );
            }
        };

        let (result, outcome) = self.run_single_flow(&handle, &session_id, request).await;
        handle.shutdown().await;

        let success = result.is_ok();
        let error = result.as_ref().err().map(|e| e.to_string());
        self.store
            .complete_session(&session_id, success, error.as_deref())
            .await;

        VerificationResponse {
            success,
            eligibility: result.ok(),
            automation: assemble_automation(session_id, outcome),
            error,
            timestamp: Utc::now(),
        }
    }

    async fn run_single_flow(
        &self,
        handle: &BrowserHandle,
        session_id: &str,
        request: &VerificationRequest,
    ) -> (
        AppResult<crate::models::result::EligibilityResult>,
        Option<FlowOutcome>,
    ) {
        let page = match handle.new_page().await {
            Ok(page) => page,
            Err(e) => return (Err(e), None),
        };

        let mut flow = VerificationFlow::new(
            &self.config,
            PageDriver::new(page),
            ArtifactRecorder::new(
                Arc::clone(&self.store),
                session_id,
                self.config.development_mode,
            ),
            ProgressReporter::new(Arc::clone(&self.store), session_id),
            session_id,
        );

        let result = flow.run_single(handle, request).await;
        if let Err(ref e) = result {
            flow.record_failure(e).await;
        }
        (result, Some(flow.into_outcome().await))
    }

    /// Verify a batch from an already-encoded fixed-width blob.
    pub async fn verify_batch_fixed_width(&self, blob: &str) -> BatchResponse {
        let records = crate::models::record::decode_blob(blob);
        if records.is_empty() {
            return batch_failure(
                new_session_id(),
                AppError::Ingest(IngestError::NoValidRecords),
            );
        }
        self.run_batch(records, blob.to_string()).await
    }

    /// Ingest delimited text and verify the resulting batch. Any row
    /// error refuses the whole batch so a partial file never reaches the
    /// portal.
    pub async fn verify_batch_table(&self, text: &str) -> BatchResponse {
        let outcome = ingest::ingest(text);
        if !outcome.errors.is_empty() {
            for e in &outcome.errors {
                error!("Ingestion: {}", e);
            }
            return batch_failure(
                new_session_id(),
                AppError::Ingest(IngestError::RowErrors {
                    count: outcome.errors.len(),
                }),
            );
        }
        if outcome.records.is_empty() {
            return batch_failure(
                new_session_id(),
                AppError::Ingest(IngestError::NoValidRecords),
            );
        }
        let blob = outcome.blob;
        self.run_batch(outcome.records, blob).await
    }

    async fn run_batch(&self, records: Vec<FixedWidthRecord>, blob: String) -> BatchResponse {
        let session_id = new_session_id();
        info!(
            "Session {} started (batch, {} records)",
            session_id,
            records.len()
        );

        if let Err(e) = self.store.create_session(&session_id, "batch").await {
            error!("Session store registration failed: {}", e);
        }

        let handle = match BrowserHandle::start(&self.config).await {
            Ok(handle) => handle,
            Err(e) => return batch_failure(session_id, e),
        };

        let page = match handle.new_page().await {
            Ok(page) => page,
            Err(e) => {
                handle.shutdown().await;
                return batch_failure(session_id, e);
            }
        };

        let mut flow = VerificationFlow::new(
            &self.config,
            PageDriver::new(page),
            ArtifactRecorder::new(
                Arc::clone(&self.store),
                &session_id,
                self.config.development_mode,
            ),
            ProgressReporter::new(Arc::clone(&self.store), &session_id),
            &session_id,
        );

        let result = flow.run_batch(&handle, &records, &blob).await;
        if let Err(ref e) = result {
            flow.record_failure(e).await;
        }
        let outcome = flow.into_outcome().await;
        handle.shutdown().await;

        let success = result.is_ok();
        let error = result.as_ref().err().map(|e| e.to_string());
        self.store
            .complete_session(&session_id, success, error.as_deref())
            .await;

        BatchResponse {
            success,
            summary: result.unwrap_or_else(|_| BatchSummary {
                records_processed: records.len(),
                ..BatchSummary::default()
            }),
            automation: assemble_automation(session_id, Some(outcome)),
            error,
            timestamp: Utc::now(),
        }
    }
}

fn assemble_automation(session_id: String, outcome: Option<FlowOutcome>) -> AutomationResult {
    match outcome {
        Some(o) => AutomationResult {
            session_id,
            screenshots: o.screenshots,
            pdf: o.pdf,
            raw_output: o.raw_output,
            page_url: o.page_url,
            timestamp: Some(Utc::now()),
        },
        None => AutomationResult {
            session_id,
            timestamp: Some(Utc::now()),
            ..AutomationResult::default()
        },
    }
}

fn batch_failure(session_id: String, error: AppError) -> BatchResponse {
    BatchResponse {
        success: false,
        summary: BatchSummary::default(),
        automation: AutomationResult {
            session_id,
            timestamp: Some(Utc::now()),
            ..AutomationResult::default()
        },
        error: Some(error.to_string()),
        timestamp: Utc::now(),
    }
}
