//! Client-side checks mirroring the backend's upload limits.
//!
//! The backend accepts PDF files only, with a name of at most 100 characters
//! and at most 5 MiB of content. Checking first saves a round trip for files
//! that would be rejected anyway.

use std::path::Path;

use thiserror::Error;

pub const MAX_UPLOAD_BYTES: u64 = 5 * 1024 * 1024;
pub const MAX_FILENAME_CHARS: usize = 100;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum UploadRejected {
    #[error("no file name in {0:?}")]
    NoFileName(String),
    #[error("only PDF files are allowed: {0}")]
    NotPdf(String),
    #[error("file name is too long ({0} characters, limit 100)")]
    NameTooLong(usize),
    #[error("file too large ({0} bytes, limit 5 MiB)")]
    TooLarge(u64),
}

/// Final path component of `path`, as the backend will see it.
pub fn upload_file_name(path: &Path) -> Result<String, UploadRejected> {
    path.file_name()
        .and_then(|n| n.to_str())
        .map(str::to_string)
        .ok_or_else(|| UploadRejected::NoFileName(path.display().to_string()))
}

/// Check a file name and content length against the backend limits.
pub fn check_upload(file_name: &str, len: u64) -> Result<(), UploadRejected> {
    if !file_name.to_ascii_lowercase().ends_with(".pdf") {
        return Err(UploadRejected::NotPdf(file_name.to_string()));
    }
    let chars = file_name.chars().count();
    if chars > MAX_FILENAME_CHARS {
        return Err(UploadRejected::NameTooLong(chars));
    }
    if len > MAX_UPLOAD_BYTES {
        return Err(UploadRejected::TooLarge(len));
    }
    Ok(())
}
