//! # FS-Online Filesystem I/O Utilities
//!
//! File: cli/src/common/fs/io.rs
//!
//! ## Overview
//!
//! Small wrappers around `std::fs` that attach the offending path to every
//! error and honour the dry-run flag used by the tree-building commands.
//!
//! ## Usage
//!
//! ```rust
//! use crate::common::fs::io;
//!
//! io::ensure_dir_with_mode(&conventions.dev_dir, 0o770, dry_run)?;
//! let manifest = io::read_file_to_string(&addon.join("__manifest__.py"))?;
//! if io::write_if_changed(&addon.join("__init__.py"), "from . import models\n")? {
//!     info!("Updated __init__.py");
//! }
//! ```
//!
use crate::core::error::{FsonlineError, Result};
use anyhow::Context;
use std::fs;
use std::path::Path;
use tracing::{debug, info};

/// Ensures that a directory exists at the specified path (like `mkdir -p`).
///
/// # Errors
///
/// - `FsonlineError::FilesystemConflict` if the path exists but is not a directory.
/// - An I/O error with context if creating the directory fails.
pub fn ensure_dir_exists(path: &Path) -> Result<()> {
    if !path.exists() {
        fs::create_dir_all(path)
            .with_context(|| format!("Failed to create directory {:?}", path))?;
        info!("Created directory: {:?}", path);
    } else if !path.is_dir() {
        anyhow::bail!(FsonlineError::FilesystemConflict(format!(
            "Path exists but is not a directory: {:?}",
            path
        )));
    } else {
        debug!("Directory already exists: {:?}", path);
    }
    Ok(())
}

/// Like [`ensure_dir_exists`], but applies `mode` (Unix permission bits) to a
/// newly created directory. An existing directory keeps its permissions.
/// With `dry_run` nothing is created; the intent is only logged.
pub fn ensure_dir_with_mode(path: &Path, mode: u32, dry_run: bool) -> Result<()> {
    if dry_run {
        info!("[dry run] Would create directory {:?} (mode {:o})", path, mode);
        return Ok(());
    }

    let existed = path.is_dir();
    ensure_dir_exists(path)?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        if !existed {
            fs::set_permissions(path, fs::Permissions::from_mode(mode))
                .with_context(|| format!("Failed to set mode {:o} on {:?}", mode, path))?;
        }
    }
    #[cfg(not(unix))]
    {
        let _ = (existed, mode);
    }

    Ok(())
}

/// Reads the entire content of a file into a string.
pub fn read_file_to_string(path: &Path) -> Result<String> {
    fs::read_to_string(path).with_context(|| format!("Failed to read file {:?}", path))
}

/// Writes `content` to `path`, overwriting it. Parent directories are created.
pub fn write_string_to_file(path: &Path, content: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        ensure_dir_exists(parent)?;
    }
    fs::write(path, content).with_context(|| format!("Failed to write to file {:?}", path))?;
    debug!("Wrote content to file: {:?}", path);
    Ok(())
}

/// Writes `content` only if it differs from what is on disk.
///
/// Returns `true` if the file was written.
pub fn write_if_changed(path: &Path, content: &str) -> Result<bool> {
    if path.is_file() && read_file_to_string(path)? == content {
        debug!("Unchanged: {:?}", path);
        return Ok(false);
    }
    write_string_to_file(path, content)?;
    Ok(true)
}

/// Returns `true` if `path` is a directory with at least one entry.
pub fn dir_has_entries(path: &Path) -> Result<bool> {
    if !path.is_dir() {
        return Ok(false);
    }
    let mut entries =
        fs::read_dir(path).with_context(|| format!("Failed to list directory {:?}", path))?;
    Ok(entries.next().is_some())
}
