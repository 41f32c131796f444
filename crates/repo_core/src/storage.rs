//! Filesystem side of load/save. A save is serialized and encrypted fully in
//! memory first; the only filesystem change before the write is rotating the
//! previous file to `<path>.bak`.
//!
//! Rename-then-write is not atomic: a crash between the two steps leaves the
//! previous save only at the `.bak` path.

use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};

use log::{debug, info};

use crate::core_api::{CoreError, CoreErrorCode};
use crate::document::SaveDocument;

pub const BACKUP_SUFFIX: &str = ".bak";

pub fn load(path: &Path, passphrase: &str) -> Result<SaveDocument, CoreError> {
    let bytes = read_bytes(path)?;
    SaveDocument::decrypt(&bytes, passphrase).map_err(|e| {
        CoreError::new(e.code, format!("{}: {}", path.display(), e.message))
    })
}

pub fn save(path: &Path, document: &SaveDocument, passphrase: &str) -> Result<(), CoreError> {
    let bytes = document.encrypt(passphrase)?;
    write_with_backup(path, &bytes)?;
    Ok(())
}

pub fn read_bytes(path: &Path) -> Result<Vec<u8>, CoreError> {
    fs::read(path).map_err(|e| {
        CoreError::new(
            CoreErrorCode::Io,
            format!("failed to read {}: {e}", path.display()),
        )
    })
}

/// `path` with `.bak` appended to the full file name (`editable.es3.bak`).
pub fn backup_path(path: &Path) -> PathBuf {
    let mut name = OsString::from(path.as_os_str());
    name.push(BACKUP_SUFFIX);
    PathBuf::from(name)
}

/// Moves an existing file at `path` to its backup slot, replacing any older
/// backup, then writes `bytes` to `path`. Returns the backup path if one was made.
pub fn write_with_backup(path: &Path, bytes: &[u8]) -> Result<Option<PathBuf>, CoreError> {
    let backup = if path.exists() {
        let backup = backup_path(path);
        if backup.exists() {
            fs::remove_file(&backup).map_err(|e| io_error("remove old backup", &backup, e))?;
        }
        fs::rename(path, &backup).map_err(|e| io_error("back up", path, e))?;
        debug!("rotated {} to {}", path.display(), backup.display());
        Some(backup)
    } else {
        None
    };

    fs::write(path, bytes).map_err(|e| io_error("write", path, e))?;
    info!("wrote {} bytes to {}", bytes.len(), path.display());
    Ok(backup)
}

fn io_error(action: &str, path: &Path, e: std::io::Error) -> CoreError {
    CoreError::new(
        CoreErrorCode::Io,
        format!("failed to {action} {}: {e}", path.display()),
    )
}
