use axum::{
    extract::{Multipart, Path, State},
    http::StatusCode,
    Json,
};
use serde::Serialize;
use uuid::Uuid;

use crate::errors::AppError;
use crate::resume::ResumeSummary;
use crate::state::AppState;

#[derive(Serialize)]
pub struct UploadResponse {
    pub resume: ResumeSummary,
}

#[derive(Serialize)]
pub struct ListResponse {
    pub resumes: Vec<ResumeSummary>,
}

/// POST /api/v1/resume
/// Multipart upload: a `user_id` text field plus a `file` PDF field.
pub async fn handle_upload(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<UploadResponse>, AppError> {
    let mut user_id: Option<String> = None;
    let mut filename: Option<String> = None;
    let mut bytes: Option<Vec<u8>> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::Validation(format!("Malformed multipart body: {e}")))?
    {
        let name = field.name().map(str::to_string);
        match name.as_deref() {
            Some("user_id") => {
                user_id = Some(
                    field
                        .text()
                        .await
                        .map_err(|e| AppError::Validation(e.to_string()))?,
                );
            }
            Some("file") => {
                filename = Some(
                    field
                        .file_name()
                        .unwrap_or("resume.pdf")
                        .to_string(),
                );
                bytes = Some(
                    field
                        .bytes()
                        .await
                        .map_err(|e| AppError::Validation(e.to_string()))?
                        .to_vec(),
                );
            }
            _ => {}
        }
    }

    let user_id =
        user_id.ok_or_else(|| AppError::Validation("Missing 'user_id' field".to_string()))?;
    let filename =
        filename.ok_or_else(|| AppError::Validation("Missing 'file' field".to_string()))?;
    let bytes = bytes.ok_or_else(|| AppError::Validation("Missing 'file' field".to_string()))?;
    if bytes.is_empty() {
        return Err(AppError::Validation("Uploaded file is empty".to_string()));
    }

    // pdf-extract is CPU-bound; keep it off the async runtime.
    let text = tokio::task::spawn_blocking(move || pdf_extract::extract_text_from_mem(&bytes))
        .await
        .map_err(|e| AppError::Internal(e.into()))?
        .map_err(|e| AppError::Validation(format!("Could not extract text from PDF: {e}")))?;
    if text.trim().is_empty() {
        return Err(AppError::Validation(
            "PDF contains no extractable text".to_string(),
        ));
    }

    let resume = state.resumes.save(&user_id, &filename, &text).await?;
    Ok(Json(UploadResponse { resume }))
}

/// GET /api/v1/resume/:user_id
pub async fn handle_list(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Result<Json<ListResponse>, AppError> {
    let resumes = state.resumes.list(&user_id).await?;
    Ok(Json(ListResponse { resumes }))
}

/// DELETE /api/v1/resume/:user_id/:resume_id
pub async fn handle_delete(
    State(state): State<AppState>,
    Path((user_id, resume_id)): Path<(String, Uuid)>,
) -> Result<StatusCode, AppError> {
    if state.resumes.delete(&user_id, resume_id).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(AppError::NotFound(format!(
            "Resume {resume_id} not found for user {user_id}"
        )))
    }
}
