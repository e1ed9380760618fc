//! Uploaded file storage

mod store;

pub use store::{StoredFile, UploadError, UploadStore, UploadWriter, ALLOWED_SUBTYPES, MAX_FILES};
