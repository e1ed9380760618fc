//! On-disk upload store
//!
//! Files land in `<root>/files/` under a fresh `<uuid><ext>` name and are
//! served back from `/uploads/files/<name>`.

use relay_common::AppError;
use serde::Serialize;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::fs::File;
use tokio::io::AsyncWriteExt;

/// MIME subtypes accepted for upload
pub const ALLOWED_SUBTYPES: &[&str] = &["jpg", "jpeg", "png", "gif", "pdf", "txt"];

/// Maximum number of files in one request
pub const MAX_FILES: usize = 10;

const FILES_DIR: &str = "files";
const PUBLIC_PREFIX: &str = "/uploads/files";

/// Upload failures
#[derive(Debug, Error)]
pub enum UploadError {
    #[error("No files uploaded")]
    NoFiles,

    #[error("Too many files: at most {MAX_FILES} per request")]
    TooManyFiles,

    #[error("Unsupported file type: {0}")]
    UnsupportedType(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<UploadError> for AppError {
    fn from(err: UploadError) -> Self {
        match err {
            UploadError::Io(e) => AppError::Storage(e.to_string()),
            other => AppError::InvalidInput(other.to_string()),
        }
    }
}

/// A file written to the store
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredFile {
    pub file_name: String,
    pub file_url: String,
}

/// Upload directory
#[derive(Debug, Clone)]
pub struct UploadStore {
    root: PathBuf,
}

impl UploadStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Directory served under `/uploads`
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Directory uploaded files are written to
    pub fn files_dir(&self) -> PathBuf {
        self.root.join(FILES_DIR)
    }

    /// Create the store directories if missing
    pub async fn init(&self) -> Result<(), UploadError> {
        tokio::fs::create_dir_all(self.files_dir()).await?;
        Ok(())
    }

    /// Whether a declared content type may be stored
    pub fn is_allowed_mime(content_type: &str) -> bool {
        let essence = content_type
            .split(';')
            .next()
            .unwrap_or_default()
            .trim()
            .to_ascii_lowercase();

        essence
            .rsplit_once('/')
            .is_some_and(|(_, subtype)| ALLOWED_SUBTYPES.contains(&subtype))
    }

    /// Fresh storage name keeping the original extension
    pub fn unique_file_name(original: &str) -> String {
        let ext = Path::new(original)
            .extension()
            .and_then(|ext| ext.to_str())
            .filter(|ext| !ext.is_empty() && ext.chars().all(|c| c.is_ascii_alphanumeric()))
            .map(|ext| format!(".{ext}"))
            .unwrap_or_default();

        format!("{}{ext}", uuid::Uuid::new_v4())
    }

    /// Public URL of a stored file
    pub fn url_for(file_name: &str) -> String {
        format!("{PUBLIC_PREFIX}/{file_name}")
    }

    /// Open a new file under a generated name for streaming writes
    pub async fn create(&self, original_name: &str) -> Result<UploadWriter, UploadError> {
        let file_name = Self::unique_file_name(original_name);
        let path = self.files_dir().join(&file_name);
        let file = File::create(&path).await?;

        Ok(UploadWriter {
            original: original_name.to_string(),
            stored: StoredFile {
                file_url: Self::url_for(&file_name),
                file_name,
            },
            file,
            written: 0,
        })
    }

    /// Remove files written earlier, e.g. when a later part of the same
    /// request is rejected. Missing files are skipped.
    pub async fn discard(&self, files: &[StoredFile]) {
        for stored in files {
            let path = self.files_dir().join(&stored.file_name);
            match tokio::fs::remove_file(&path).await {
                Ok(()) => {
                    tracing::debug!(file_name = %stored.file_name, "Discarded upload");
                }
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => {
                    tracing::warn!(file_name = %stored.file_name, error = %e, "Failed to discard upload");
                }
            }
        }
    }
}

/// A file being streamed into the store
#[derive(Debug)]
pub struct UploadWriter {
    original: String,
    stored: StoredFile,
    file: File,
    written: usize,
}

impl UploadWriter {
    /// Name and URL the file is stored under
    pub fn stored(&self) -> &StoredFile {
        &self.stored
    }

    /// Append one chunk
    pub async fn write(&mut self, chunk: &[u8]) -> Result<(), UploadError> {
        self.file.write_all(chunk).await?;
        self.written += chunk.len();
        Ok(())
    }

    /// Flush to disk and hand back the stored file
    pub async fn finish(mut self) -> Result<StoredFile, UploadError> {
        self.file.flush().await?;

        tracing::info!(
            original = %self.original,
            file_name = %self.stored.file_name,
            size = self.written,
            "File uploaded"
        );

        Ok(self.stored)
    }
}
