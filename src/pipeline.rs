use serde::Serialize;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::backup;
use crate::error::{MetadataError, Result};
use crate::{jpeg, png};

/// Supported image extensions (compared lowercase).
const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg"];

/// Which adapter handles a file, determined by its extension.
///
/// # Example
///
/// ```rust
/// use sd_params::pipeline::ImageKind;
/// use std::path::Path;
///
/// assert_eq!(ImageKind::from_path(Path::new("out.PNG")), Some(ImageKind::Png));
/// assert_eq!(ImageKind::from_path(Path::new("out.jpeg")), Some(ImageKind::Jpeg));
/// assert_eq!(ImageKind::from_path(Path::new("out.webp")), None);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageKind {
    /// `tEXt`/`iTXt` chunk keyed `parameters`
    Png,
    /// UTF-16BE region between `00 3C` and `FF DB`
    Jpeg,
}

impl ImageKind {
    /// Determine the image kind from a file path extension.
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_lowercase();
        match ext.as_str() {
            "png" => Some(Self::Png),
            "jpg" | "jpeg" => Some(Self::Jpeg),
            _ => None,
        }
    }

    fn of(path: &Path) -> Result<Self> {
        Self::from_path(path).ok_or_else(|| MetadataError::Unsupported(path.to_path_buf()))
    }

    pub fn extract(self, path: &Path) -> Result<String> {
        match self {
            Self::Png => png::extract(path),
            Self::Jpeg => jpeg::extract(path),
        }
    }

    pub fn write(self, path: &Path, text: &str, make_backup: bool) -> Result<()> {
        match self {
            Self::Png => png::write(path, text, make_backup),
            Self::Jpeg => jpeg::write(path, text, make_backup),
        }
    }
}

/// Editing state of a file as far as the disk can tell.
///
/// Unsaved edits are the caller's business; the codec only knows whether a
/// backup sidecar exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageStatus {
    /// Never written through the codec with backups on.
    Pristine,
    /// A `.backup` sidecar exists.
    Edited,
}

impl ImageStatus {
    pub fn of(path: &Path) -> Self {
        Self::from(backup::has_backup(path))
    }
}

impl From<bool> for ImageStatus {
    /// Map "has a backup sidecar" to a status.
    fn from(has_backup: bool) -> Self {
        if has_backup { Self::Edited } else { Self::Pristine }
    }
}

/// A supported image found in a folder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ImageEntry {
    pub name: String,
    pub path: PathBuf,
    pub has_backup: bool,
}

impl ImageEntry {
    pub fn status(&self) -> ImageStatus {
        ImageStatus::from(self.has_backup)
    }
}

/// One file that failed during a batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BatchError {
    pub file: String,
    pub message: String,
}

/// Outcome of [`batch_replace`].
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
pub struct BatchResult {
    pub modified_count: usize,
    pub errors: Vec<BatchError>,
}

/// Read the parameters text of a PNG or JPEG file.
pub fn read_metadata(path: &Path) -> Result<String> {
    if !path.exists() {
        return Err(MetadataError::NotFound(path.to_path_buf()));
    }
    ImageKind::of(path)?.extract(path)
}

/// Replace the parameters text of a PNG or JPEG file.
///
/// With `make_backup`, the original bytes are saved to `<path>.backup` the
/// first time the file is written.
pub fn write_metadata(path: &Path, text: &str, make_backup: bool) -> Result<()> {
    if !path.exists() {
        return Err(MetadataError::NotFound(path.to_path_buf()));
    }
    ImageKind::of(path)?.write(path, text, make_backup)
}

/// List supported images directly inside `folder`, sorted by file name.
pub fn list_images(folder: &Path) -> Result<Vec<ImageEntry>> {
    if !folder.is_dir() {
        return Err(MetadataError::NotFound(folder.to_path_buf()));
    }

    let mut images = Vec::new();
    for entry in WalkDir::new(folder)
        .min_depth(1)
        .max_depth(1)
        .sort_by_file_name()
    {
        let entry = match entry {
            Ok(e) => e,
            Err(e) => {
                log::warn!("Skipping unreadable entry in {}: {e}", folder.display());
                continue;
            }
        };
        let path = entry.path();
        // Path::is_file follows symlinks, so linked images are listed too
        if !path.is_file() || !is_supported_image(path) {
            continue;
        }
        images.push(ImageEntry {
            name: entry.file_name().to_string_lossy().into_owned(),
            path: path.to_path_buf(),
            has_backup: backup::has_backup(path),
        });
    }

    Ok(images)
}

/// Replace every occurrence of `find` with `replace` in the parameters of
/// each image in `folder` (not recursive).
///
/// Files whose parameters do not contain `find` are left alone. A file that
/// fails to read or write is recorded in [`BatchResult::errors`] and the
/// batch moves on.
///
/// # Example
///
/// ```rust,no_run
/// use sd_params::pipeline::batch_replace;
/// use std::path::Path;
///
/// let result = batch_replace(Path::new("./outputs"), "lowres", "worst quality", true)?;
/// println!("{} file(s) modified", result.modified_count);
/// for err in &result.errors {
///     eprintln!("{}: {}", err.file, err.message);
/// }
/// # Ok::<(), sd_params::MetadataError>(())
/// ```
pub fn batch_replace(
    folder: &Path,
    find: &str,
    replace: &str,
    make_backup: bool,
) -> Result<BatchResult> {
    if find.is_empty() {
        return Err(MetadataError::EmptyPattern);
    }

    let images = list_images(folder)?;
    log::info!("Batch replace over {} image(s) in {}", images.len(), folder.display());

    let mut result = BatchResult::default();
    for image in &images {
        match replace_in_file(&image.path, find, replace, make_backup) {
            Ok(true) => {
                log::debug!("Modified {}", image.name);
                result.modified_count += 1;
            }
            Ok(false) => log::debug!("No match in {}", image.name),
            Err(e) => {
                log::warn!("Failed to process {}: {e}", image.name);
                result.errors.push(BatchError {
                    file: image.name.clone(),
                    message: e.to_string(),
                });
            }
        }
    }

    log::info!(
        "Batch done: {} modified, {} failed",
        result.modified_count,
        result.errors.len()
    );
    Ok(result)
}

fn replace_in_file(path: &Path, find: &str, replace: &str, make_backup: bool) -> Result<bool> {
    let kind = ImageKind::of(path)?;
    let text = kind.extract(path)?;
    if !text.contains(find) {
        return Ok(false);
    }
    kind.write(path, &text.replace(find, replace), make_backup)?;
    Ok(true)
}

/// Check if a file has a supported image extension.
fn is_supported_image(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| IMAGE_EXTENSIONS.contains(&ext.to_lowercase().as_str()))
        .unwrap_or(false)
}
