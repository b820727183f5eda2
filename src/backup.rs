use std::ffi::OsString;
use std::fs::{self, File, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};

use crate::error::{MetadataError, Result};

const BACKUP_SUFFIX: &str = ".backup";

/// Path of the sidecar backup for `path`: the full file name with
/// `.backup` appended (`a.png` -> `a.png.backup`).
pub fn backup_path(path: &Path) -> PathBuf {
    let mut name = OsString::from(path.as_os_str());
    name.push(BACKUP_SUFFIX);
    PathBuf::from(name)
}

/// Whether the file has ever been edited, i.e. its backup sidecar exists.
pub fn has_backup(path: &Path) -> bool {
    backup_path(path).exists()
}

/// Copy the current content of `path` to its backup sidecar, unless a
/// backup already exists.
///
/// The backup therefore always holds the original, pre-edit bytes. The
/// modification time of the original is carried over where the platform
/// allows it.
pub fn ensure_backup(path: &Path) -> Result<PathBuf> {
    let backup = backup_path(path);

    let mut source = File::open(path).map_err(|e| match e.kind() {
        io::ErrorKind::NotFound => MetadataError::NotFound(path.to_path_buf()),
        _ => MetadataError::Io(e),
    })?;

    // create_new makes the filesystem refuse to replace an existing sidecar
    let mut sidecar = match OpenOptions::new().write(true).create_new(true).open(&backup) {
        Ok(f) => f,
        Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
            log::debug!("Backup already present: {}", backup.display());
            return Ok(backup);
        }
        Err(e) => return Err(e.into()),
    };

    if let Err(e) = io::copy(&mut source, &mut sidecar) {
        drop(sidecar);
        if let Err(rm) = fs::remove_file(&backup) {
            log::warn!("Could not remove partial backup {}: {rm}", backup.display());
        }
        return Err(e.into());
    }
    if let Err(e) = copy_metadata(&source, &sidecar) {
        log::debug!("Could not preserve metadata on {}: {e}", backup.display());
    }
    log::debug!("Backup created: {}", backup.display());
    Ok(backup)
}

/// Carry permissions and modification time over to the sidecar.
fn copy_metadata(source: &File, sidecar: &File) -> io::Result<()> {
    let meta = source.metadata()?;
    sidecar.set_modified(meta.modified()?)?;
    sidecar.set_permissions(meta.permissions())
}

/// Replace the content of `path` with `bytes`, taking the backup first when
/// asked to.
pub(crate) fn commit(path: &Path, bytes: &[u8], make_backup: bool) -> Result<()> {
    if make_backup {
        ensure_backup(path)?;
    }
    fs::write(path, bytes)?;
    log::info!("Wrote {} bytes to {}", bytes.len(), path.display());
    Ok(())
}
