mod imagekit;

use async_trait::async_trait;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::NamedTempFile;

pub use self::imagekit::ImageKitClient;

#[derive(Debug, thiserror::Error)]
pub enum MediaError {
    #[error("CDN rejected upload with status {status}: {body}")]
    Rejected { status: u16, body: String },

    #[error("CDN request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Could not read staged file: {0}")]
    Io(#[from] std::io::Error),

    #[error("CDN is not configured: {0} is missing")]
    NotConfigured(&'static str),
}

/// What to send to the CDN.
#[derive(Debug, Clone)]
pub struct UploadRequest<'a> {
    pub path: &'a Path,
    pub file_name: &'a str,
    pub content_type: &'a str,
    pub use_unique_file_name: bool,
    pub tags: Vec<String>,
}

/// Where the CDN put it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadedMedia {
    pub file_id: String,
    pub name: String,
    pub url: String,
}

/// Remote storage for media bytes. The service keeps only the returned URL.
#[async_trait]
pub trait MediaStore: Send + Sync {
    async fn upload(&self, request: UploadRequest<'_>) -> Result<UploadedMedia, MediaError>;
}

pub type DynMediaStore = Arc<dyn MediaStore>;

/// An upload payload parked on local disk for the duration of one request.
/// The file is removed when this value is dropped, whichever way the
/// request ends.
#[derive(Debug)]
pub struct StagedFile {
    file: NamedTempFile,
}

impl StagedFile {
    pub fn write(dir: &Path, original_name: &str, data: &[u8]) -> std::io::Result<Self> {
        std::fs::create_dir_all(dir)?;

        let suffix = Path::new(original_name)
            .extension()
            .map(|ext| format!(".{}", ext.to_string_lossy()))
            .unwrap_or_default();

        let mut file = tempfile::Builder::new()
            .prefix("upload-")
            .suffix(&suffix)
            .tempfile_in(dir)?;
        file.write_all(data)?;
        file.flush()?;

        Ok(Self { file })
    }

    pub fn path(&self) -> &Path {
        self.file.path()
    }

    pub fn path_buf(&self) -> PathBuf {
        self.file.path().to_path_buf()
    }
}

/// The declared content type, or a guess from the file name when the
/// client sent none.
pub fn resolve_content_type(declared: Option<&str>, file_name: &str) -> String {
    match declared.map(str::trim) {
        Some(ct) if !ct.is_empty() => ct.to_string(),
        _ => mime_guess::from_path(file_name)
            .first_or_octet_stream()
            .essence_str()
            .to_string(),
    }
}
