//! Atomic write primitives
//!
//! Temp file plus rename, so readers never see a partial archive

#![allow(clippy::result_large_err)]

use crate::errors::{io_error, Result};
use std::fs;
use std::path::Path;

/// Atomically replace `target_path` with `content`
pub fn atomic_write(target_path: &Path, content: &[u8]) -> Result<()> {
    if let Some(parent) = target_path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).map_err(|e| io_error("create_archive_dir", e))?;
        }
    }

    let temp_path = target_path.with_extension("tmp");
    fs::write(&temp_path, content).map_err(|e| io_error("write_archive_temp", e))?;
    fs::rename(&temp_path, target_path).map_err(|e| io_error("rename_archive_temp", e))?;

    Ok(())
}
