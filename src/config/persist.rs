//! Writing configuration back to disk.
//!
//! Invariants:
//! - The format comes from the extension and is checked before any write.
//! - Files are created with owner-only permissions (`0o600` on Unix).
//! - Writes are atomic (temp file in the target directory + rename).

use super::format::Format;
use crate::error::{ConfigError, Result};
use serde::Serialize;
use std::io::Write;
use std::path::Path;
use tempfile::NamedTempFile;
use tracing::debug;

/// Serialize `value` into `path`, replacing any existing file.
pub fn persist<T: Serialize + ?Sized>(value: &T, path: impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref();
    let format = Format::from_path(path)?;
    let content = format.encode(value).map_err(|message| ConfigError::Encode {
        path: path.to_path_buf(),
        message,
    })?;

    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(dir)?;

    let mut temp = NamedTempFile::new_in(dir)?;
    restrict_permissions(temp.as_file())?;
    temp.write_all(content.as_bytes())?;
    temp.as_file().sync_all()?;
    temp.persist(path).map_err(|e| ConfigError::Io(e.error))?;

    debug!(path = %path.display(), format = %format, "Configuration saved");
    Ok(())
}

/// Alias for [`persist`].
pub fn save<T: Serialize + ?Sized>(value: &T, path: impl AsRef<Path>) -> Result<()> {
    persist(value, path)
}

#[cfg(unix)]
fn restrict_permissions(file: &std::fs::File) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;
    file.set_permissions(std::fs::Permissions::from_mode(0o600))?;
    Ok(())
}

#[cfg(not(unix))]
fn restrict_permissions(_file: &std::fs::File) -> Result<()> {
    Ok(())
}
