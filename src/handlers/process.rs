use axum::{
    extract::{
        multipart::{MultipartError, MultipartRejection},
        Multipart, State,
    },
    http::{HeaderMap, StatusCode},
    response::Json,
};
use bytes::BytesMut;
use tracing::{debug, info};

use crate::error::{AppError, AppResult};
use crate::handlers::AppState;
use crate::middleware::logging::REQUEST_ID_HEADER;
use crate::models::{ProcessResponse, UploadRequest};

/// Multipart field that carries the résumé.
pub const UPLOAD_FIELD: &str = "pdf_doc";

pub async fn process_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    multipart: Result<Multipart, MultipartRejection>,
) -> AppResult<Json<ProcessResponse>> {
    let request_id = headers
        .get(REQUEST_ID_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(str::to_string)
        .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());

    info!(request_id = %request_id, "Starting resume upload request");

    let mut multipart = multipart.map_err(|e| AppError::invalid_multipart(e.body_text()))?;

    let pipeline = &state.pipeline;
    let upload = read_upload(&mut multipart, pipeline.max_upload_bytes()).await?;

    if let Some(upload) = &upload {
        debug!(
            request_id = %request_id,
            file_size = upload.size(),
            "Upload read from multipart form"
        );
    }

    let outcome = pipeline.process(&request_id, upload).await?;

    Ok(Json(ProcessResponse::new(
        outcome.fields,
        &outcome.extracted,
        outcome.processing_time_ms,
    )))
}

/// Reads the `pdf_doc` file field, streaming it so an oversized upload is
/// rejected as soon as it crosses `max_bytes`. Other fields are drained and
/// ignored. A `pdf_doc` part without a filename is not a file and is skipped.
async fn read_upload(multipart: &mut Multipart, max_bytes: usize) -> AppResult<Option<UploadRequest>> {
    let limit_mb = max_bytes / (1024 * 1024);
    let to_app_error = |e: MultipartError| multipart_error(e, limit_mb);

    let mut upload = None;
    while let Some(mut field) = multipart.next_field().await.map_err(to_app_error)? {
        let file_name = if upload.is_none() && field.name() == Some(UPLOAD_FIELD) {
            field.file_name().map(str::to_string)
        } else {
            None
        };

        let Some(file_name) = file_name else {
            while field.chunk().await.map_err(to_app_error)?.is_some() {}
            continue;
        };

        let mut content = BytesMut::new();
        while let Some(chunk) = field.chunk().await.map_err(to_app_error)? {
            if content.len() + chunk.len() > max_bytes {
                return Err(AppError::PayloadTooLarge { limit_mb });
            }
            content.extend_from_slice(&chunk);
        }

        upload = Some(UploadRequest::new(file_name, content.freeze()));
    }

    Ok(upload)
}

fn multipart_error(err: MultipartError, limit_mb: usize) -> AppError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        AppError::PayloadTooLarge { limit_mb }
    } else {
        AppError::invalid_multipart(err.body_text())
    }
}
