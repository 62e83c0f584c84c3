use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info};

use crate::config::Config;
use crate::error::{AppError, AppResult};
use crate::models::{ExtractedText, StructuredResult, UploadRequest};
use crate::services::delegate::ExtractionDelegate;
use crate::services::scratch::ScratchSpace;
use crate::services::stager::{StagedFile, Stager};
use crate::services::text_extractor::TextExtractor;
use crate::services::validator::UploadValidator;

/// What a successful run hands back to the response layer.
#[derive(Debug)]
pub struct ProcessOutcome {
    pub fields: StructuredResult,
    pub extracted: ExtractedText,
    pub processing_time_ms: u64,
}

/// Runs one upload through validate → stage → extract → delegate.
///
/// The staged file lives exactly as long as the [`StagedFile`] guard inside
/// `process`, so it is gone by the time `process` returns or its future is
/// dropped, whatever the outcome.
pub struct IntakePipeline {
    validator: UploadValidator,
    stager: Stager,
    extractor: Arc<TextExtractor>,
    delegate: Arc<dyn ExtractionDelegate>,
}

impl IntakePipeline {
    pub fn new(config: &Config, scratch: ScratchSpace, delegate: Arc<dyn ExtractionDelegate>) -> Self {
        Self {
            validator: UploadValidator::new(config.allowed_extensions.clone()),
            stager: Stager::new(scratch, config.max_file_size_bytes()),
            extractor: Arc::new(TextExtractor::new()),
            delegate,
        }
    }

    pub fn scratch(&self) -> &ScratchSpace {
        self.stager.scratch()
    }

    pub fn max_upload_bytes(&self) -> usize {
        self.stager.max_bytes()
    }

    pub fn delegate(&self) -> &dyn ExtractionDelegate {
        self.delegate.as_ref()
    }

    pub async fn process(&self, request_id: &str, upload: Option<UploadRequest>) -> AppResult<ProcessOutcome> {
        let start = Instant::now();

        let validated = self.validator.validate(upload.as_ref())?;
        // validate() fails on None, so the upload is present here.
        let upload = upload.ok_or(AppError::MissingFile)?;

        let staged = self.stager.stage(&upload.content, &validated)?;
        drop(upload);

        info!(
            request_id = %request_id,
            staged_name = %staged.file_name(),
            "Upload staged for extraction"
        );

        let result = self.run_staged(request_id, &staged).await;
        staged.release();

        let (fields, extracted) = result.map_err(|e| {
            error!(request_id = %request_id, error = %e, "Processing failed after staging");
            e
        })?;

        let processing_time_ms = start.elapsed().as_millis() as u64;
        info!(
            request_id = %request_id,
            pages = extracted.pages,
            text_length = extracted.text.len(),
            fields = fields.len(),
            processing_time_ms,
            "Upload processed"
        );

        Ok(ProcessOutcome {
            fields,
            extracted,
            processing_time_ms,
        })
    }

    async fn run_staged(&self, request_id: &str, staged: &StagedFile) -> AppResult<(StructuredResult, ExtractedText)> {
        let extractor = Arc::clone(&self.extractor);
        let path = staged.path().to_path_buf();
        let extracted = tokio::task::spawn_blocking(move || extractor.extract(&path))
            .await
            .map_err(|e| AppError::internal(format!("extraction task failed: {}", e)))??;

        debug!(
            request_id = %request_id,
            delegate = self.delegate.name(),
            text_length = extracted.text.len(),
            "Handing text to extraction delegate"
        );

        let raw = self
            .delegate
            .extract(&extracted.text)
            .await
            .map_err(|e| AppError::extraction_failed(format!("{:#}", e)))?;

        let fields = StructuredResult::parse(&raw)?;
        Ok((fields, extracted))
    }
}
