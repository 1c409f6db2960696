use axum::{
    extract::{multipart::MultipartError, Multipart, State},
    http::StatusCode,
    Json,
};
use tracing::{info, info_span, Instrument, Span};
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::{DocumentInput, DocumentType, FailureKind, ResultRecord};
use crate::state::AppState;

const FILE_FIELD: &str = "file";
const INVALID_TYPE_MESSAGE: &str =
    "Invalid file type. Please upload PDF, DOCX, DOC, or TXT files.";

/// POST /api/v1/extract-resume
///
/// Expects a multipart body with the document in the `file` field. The record
/// is returned as-is; a failure record is paired with a 4xx/5xx status.
pub async fn handle_extract_resume(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<ResultRecord>), AppError> {
    let input = read_upload(&mut multipart)
        .await?
        .ok_or_else(|| AppError::Validation("No file provided".to_string()))?;

    if DocumentType::from_mime(&input.content_type).is_none() {
        return Err(AppError::Validation(INVALID_TYPE_MESSAGE.to_string()));
    }

    let span = info_span!(
        "extract_resume",
        request_id = %Uuid::new_v4(),
        file = %input.file_name,
        content_type = %input.content_type,
    );
    run_extraction(state, input).instrument(span).await
}

async fn run_extraction(
    state: AppState,
    input: DocumentInput,
) -> Result<(StatusCode, Json<ResultRecord>), AppError> {
    info!(bytes = input.bytes.len(), "Extracting resume");

    let timeout = state.config.extraction_timeout();
    let extractor = state.extractor.clone();
    let span = Span::current();

    // Parsing is CPU-bound; keep it off the async executor.
    let task = tokio::task::spawn_blocking(move || span.in_scope(|| extractor.extract(&input)));

    let record = tokio::time::timeout(timeout, task)
        .await
        .map_err(|_| AppError::Timeout(timeout.as_secs()))?
        .map_err(|e| AppError::Internal(anyhow::anyhow!("spawn_blocking failed in extraction: {e}")))?;

    Ok((status_for(&record), Json(record)))
}

/// First `file` field of the upload, if any. Other fields are skipped.
async fn read_upload(multipart: &mut Multipart) -> Result<Option<DocumentInput>, AppError> {
    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        if field.name() != Some(FILE_FIELD) {
            continue;
        }
        let file_name = field.file_name().unwrap_or("upload").to_string();
        let content_type = field.content_type().unwrap_or_default().to_string();
        let bytes = field.bytes().await.map_err(multipart_error)?;

        return Ok(Some(DocumentInput::new(bytes, content_type, file_name)));
    }
    Ok(None)
}

fn multipart_error(e: MultipartError) -> AppError {
    if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
        AppError::PayloadTooLarge(e.body_text())
    } else {
        AppError::Validation(format!("Invalid multipart upload: {}", e.body_text()))
    }
}

fn status_for(record: &ResultRecord) -> StatusCode {
    match record.failure {
        None => StatusCode::OK,
        Some(FailureKind::UnsupportedFormat) => StatusCode::UNSUPPORTED_MEDIA_TYPE,
        Some(FailureKind::CorruptDocument) => StatusCode::UNPROCESSABLE_ENTITY,
        Some(FailureKind::MissingDependency) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}
