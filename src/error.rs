use std::path::{Path, PathBuf};

/// Errors returned by the metadata codec.
///
/// Extraction from JPEG never produces an error for undecodable text (it
/// yields an empty string instead); everything else is surfaced here so the
/// caller can decide how to present it.
#[derive(Debug, thiserror::Error)]
pub enum MetadataError {
    /// The file or folder does not exist.
    #[error("file not found: {}", .0.display())]
    NotFound(PathBuf),

    /// The bytes do not have the structure the codec expects.
    #[error("invalid format: {0}")]
    Format(String),

    /// Text could not be decoded or encoded in the required encoding.
    #[error("encoding error: {0}")]
    Encoding(String),

    /// The file extension is not one of png, jpg, jpeg.
    #[error("unsupported file type: {}", .0.display())]
    Unsupported(PathBuf),

    /// Batch replace was asked to search for an empty string.
    #[error("search text must not be empty")]
    EmptyPattern,

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl MetadataError {
    pub(crate) fn format(msg: impl Into<String>) -> Self {
        Self::Format(msg.into())
    }
}

pub type Result<T> = std::result::Result<T, MetadataError>;

/// Read a whole file, mapping a missing file to [`MetadataError::NotFound`].
pub(crate) fn read_file(path: &Path) -> Result<Vec<u8>> {
    std::fs::read(path).map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => MetadataError::NotFound(path.to_path_buf()),
        _ => MetadataError::Io(e),
    })
}
