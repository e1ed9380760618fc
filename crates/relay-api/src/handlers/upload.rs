//! File upload handler

use axum::{
    extract::{Multipart, State},
    Json,
};
use serde::Serialize;

use crate::response::{ApiError, ApiResult, Created};
use crate::state::AppState;
use crate::upload::{StoredFile, UploadError, UploadStore, MAX_FILES};

/// Multipart field carrying the files
pub const FILES_FIELD: &str = "files";

/// Upload response body
#[derive(Debug, Serialize)]
pub struct UploadResponse {
    pub message: &'static str,
    pub files: Vec<StoredFile>,
}

/// Upload up to ten files
///
/// POST /upload/file
///
/// Each accepted part is streamed straight to disk. If any part is rejected
/// the files already written for this request are removed again.
pub async fn upload_files(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> ApiResult<Created<Json<UploadResponse>>> {
    let mut files = Vec::new();

    if let Err(e) = receive_files(state.uploads(), &mut multipart, &mut files).await {
        state.uploads().discard(&files).await;
        return Err(e);
    }

    if files.is_empty() {
        return Err(UploadError::NoFiles.into());
    }

    Ok(Created(Json(UploadResponse {
        message: "Files uploaded successfully",
        files,
    })))
}

/// Stream every `files` part into the store, recording each file as soon as
/// it is created so a failure can clean it up
async fn receive_files(
    store: &UploadStore,
    multipart: &mut Multipart,
    files: &mut Vec<StoredFile>,
) -> ApiResult<()> {
    while let Some(mut field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::invalid_body(e.body_text()))?
    {
        if field.name() != Some(FILES_FIELD) {
            continue;
        }

        if files.len() == MAX_FILES {
            return Err(UploadError::TooManyFiles.into());
        }

        let content_type = field.content_type().unwrap_or_default().to_string();
        if !UploadStore::is_allowed_mime(&content_type) {
            return Err(UploadError::UnsupportedType(content_type).into());
        }

        let original = field.file_name().unwrap_or_default().to_string();
        let mut writer = store.create(&original).await?;
        files.push(writer.stored().clone());

        while let Some(chunk) = field
            .chunk()
            .await
            .map_err(|e| ApiError::invalid_body(e.body_text()))?
        {
            writer.write(&chunk).await?;
        }

        writer.finish().await?;
    }

    Ok(())
}
