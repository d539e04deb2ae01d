//! # Policy Management
//!
//! Upload PDFs as policies, list what is stored, delete by filename.
//!
//! Uploads are all-or-nothing: every file in the request is validated and
//! extracted before anything is written, and raw files saved under
//! `UPLOAD_DIR` are rolled back if storing the policies fails. One bad PDF
//! leaves both the stored policy set and the directory exactly as they were.

use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::multipart::MultipartRejection;
use axum::extract::{DefaultBodyLimit, Multipart, Path, State};
use axum::http::StatusCode;
use axum::routing::{delete, get, post};
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use polcheck_core::Policy;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::error::AppError;
use crate::extractors::{extract_multipart, multipart_error};
use crate::state::{AppState, PolicyRecord};
use crate::uploads::{extract_blocking, is_pdf, remove_upload, sanitize_filename, stage_uploads};

/// Multipart field carrying the policy files. May repeat.
pub const UPLOAD_FIELD: &str = "files";

// -- DTOs ---------------------------------------------------------------------

/// Response of a successful upload.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct UploadResponse {
    pub message: String,
    /// Number of files in the request.
    pub uploaded: usize,
    /// Sanitized filenames, in upload order.
    pub filenames: Vec<String>,
}

/// OpenAPI shape of the upload form.
#[derive(ToSchema)]
pub struct UploadForm {
    /// One or more PDF files.
    #[schema(value_type = Vec<String>, format = Binary)]
    pub files: Vec<String>,
}

/// One stored policy, without its text.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct PolicySummary {
    pub filename: String,
    /// Length of the extracted text in characters.
    pub characters: usize,
    pub updated_at: DateTime<Utc>,
}

impl From<&PolicyRecord> for PolicySummary {
    fn from(record: &PolicyRecord) -> Self {
        Self {
            filename: record.filename.clone(),
            characters: record.text.chars().count(),
            updated_at: record.updated_at,
        }
    }
}

/// Response of `GET /policies`.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct PolicyListResponse {
    pub policies: Vec<PolicySummary>,
    pub count: usize,
}

// -- Router -------------------------------------------------------------------

/// Build the policies router. The upload route carries its own body limit.
pub fn router(max_upload_bytes: usize) -> Router<AppState> {
    Router::new()
        .route(
            "/upload_policy",
            post(upload_policy).layer(DefaultBodyLimit::max(max_upload_bytes)),
        )
        .route("/policies", get(list_policies))
        .route("/policies/:filename", delete(delete_policy))
}

// -- Handlers -----------------------------------------------------------------

/// POST /upload_policy: Upload one or more PDF policies.
#[utoipa::path(
    post,
    path = "/upload_policy",
    request_body(content = UploadForm, content_type = "multipart/form-data"),
    responses(
        (status = 200, description = "Policies extracted and stored", body = UploadResponse),
        (status = 413, description = "Upload exceeds MAX_UPLOAD_BYTES", body = crate::error::ErrorBody),
        (status = 422, description = "No files, or a file is not a PDF", body = crate::error::ErrorBody),
        (status = 500, description = "Text extraction failed; nothing was stored", body = crate::error::ErrorBody),
    ),
    tag = "policies"
)]
pub(crate) async fn upload_policy(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<UploadResponse>, AppError> {
    let mut multipart = extract_multipart(multipart)?;
    let mut files: Vec<(String, Bytes)> = Vec::new();

    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        if field.name() != Some(UPLOAD_FIELD) {
            continue;
        }
        let raw_name = field.file_name().unwrap_or_default().to_string();
        let bytes = field.bytes().await.map_err(multipart_error)?;

        // Browsers send an empty, unnamed part when no file was chosen.
        if raw_name.is_empty() && bytes.is_empty() {
            continue;
        }

        let filename = sanitize_filename(&raw_name)
            .ok_or_else(|| AppError::Validation(format!("invalid filename: {raw_name:?}")))?;
        if !is_pdf(&filename) {
            return Err(AppError::Validation(format!(
                "'{filename}' is not a PDF; only .pdf files are accepted"
            )));
        }
        files.push((filename, bytes));
    }

    if files.is_empty() {
        return Err(AppError::Validation("No files uploaded".to_string()));
    }

    let mut policies = Vec::with_capacity(files.len());
    for (filename, bytes) in &files {
        let text = extract_blocking(Arc::clone(&state.extractor), bytes.to_vec())
            .await
            .map_err(|e| AppError::Internal(format!("extraction task failed: {e}")))?
            .map_err(|e| AppError::extraction(filename, &e))?;
        tracing::debug!(
            %filename,
            bytes = bytes.len(),
            chars = text.len(),
            extractor = state.extractor.name(),
            "extracted policy text"
        );
        policies.push(Policy::new(filename.clone(), text));
    }

    let save_failed = |e: std::io::Error| AppError::Internal(format!("failed to save uploads: {e}"));
    let committed = match &state.config.upload_dir {
        Some(dir) => {
            let staged = stage_uploads(dir, &files).await.map_err(save_failed)?;
            Some(staged.commit().await.map_err(save_failed)?)
        }
        None => None,
    };

    if let Err(e) = state.policies.upsert_policies(policies).await {
        if let Some(committed) = committed {
            committed.rollback().await;
        }
        return Err(e.into());
    }
    if let Some(committed) = committed {
        committed.finish().await;
    }

    let filenames: Vec<String> = files.into_iter().map(|(name, _)| name).collect();
    let uploaded = filenames.len();
    tracing::info!(uploaded, ?filenames, "policy documents uploaded");

    Ok(Json(UploadResponse {
        message: format!("{uploaded} policy documents uploaded and processed."),
        uploaded,
        filenames,
    }))
}

/// GET /policies: List stored policies, ordered by filename.
#[utoipa::path(
    get,
    path = "/policies",
    responses(
        (status = 200, description = "Stored policies", body = PolicyListResponse),
    ),
    tag = "policies"
)]
pub(crate) async fn list_policies(
    State(state): State<AppState>,
) -> Result<Json<PolicyListResponse>, AppError> {
    let records = state.policies.list_policies().await?;
    let policies: Vec<PolicySummary> = records.iter().map(PolicySummary::from).collect();
    Ok(Json(PolicyListResponse {
        count: policies.len(),
        policies,
    }))
}

/// DELETE /policies/{filename}: Remove a stored policy.
#[utoipa::path(
    delete,
    path = "/policies/{filename}",
    params(("filename" = String, Path, description = "Stored policy filename")),
    responses(
        (status = 204, description = "Policy deleted"),
        (status = 404, description = "No such policy", body = crate::error::ErrorBody),
    ),
    tag = "policies"
)]
pub(crate) async fn delete_policy(
    State(state): State<AppState>,
    Path(filename): Path<String>,
) -> Result<StatusCode, AppError> {
    if !state.policies.delete_policy(&filename).await? {
        return Err(AppError::not_found(format!("policy '{filename}' not found")));
    }

    // Stored keys are single path components, so this stays inside the dir.
    if let Some(dir) = &state.config.upload_dir {
        remove_upload(dir, &filename)
            .await
            .map_err(|e| AppError::Internal(format!("failed to remove {filename}: {e}")))?;
    }

    tracing::info!(%filename, "policy deleted");
    Ok(StatusCode::NO_CONTENT)
}
