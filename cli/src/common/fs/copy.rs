//! # FS-Online Filesystem Copy Operations
//!
//! File: cli/src/common/fs/copy.rs
//!
//! ## Overview
//!
//! Two kinds of copies are needed:
//!
//! - **Tree copies** for the copy mode of the tree builders (`symlink-odoo
//!   --mode copy`, `build-odoo --copy`). Symbolic links inside the source are
//!   recreated verbatim instead of being followed, so a copied Odoo checkout
//!   keeps the exact shape of the original.
//! - **No-clobber merges** for scaffolding: generated files are merged into an
//!   existing addon without touching any file that is already there.
//!
//! Tree copies walk the source with `walkdir`; merges are delegated to
//! `fs_extra` with `skip_exist` set.
//!
use crate::core::error::{FsonlineError, Result};
use anyhow::{bail, Context};
use std::fs;
use std::path::Path;
use tracing::{debug, info};
use walkdir::WalkDir;

/// Copies a single file, directory or link from `source` to `target`.
///
/// # Errors
///
/// - `FsonlineError::FilesystemConflict` if anything already exists at `target`.
/// - An I/O error with context for any failure during the copy.
pub fn copy_entry(source: &Path, target: &Path, dry_run: bool) -> Result<()> {
    if target.symlink_metadata().is_ok() {
        bail!(FsonlineError::FilesystemConflict(format!(
            "Copy target {:?} already exists",
            target
        )));
    }
    let metadata = source
        .symlink_metadata()
        .with_context(|| format!("Copy source {:?} is not accessible", source))?;

    if dry_run {
        info!("[dry run] Would copy {:?} -> {:?}", source, target);
        return Ok(());
    }

    if metadata.file_type().is_symlink() {
        copy_link(source, target)?;
    } else if metadata.is_dir() {
        copy_tree(source, target)?;
    } else {
        fs::copy(source, target)
            .with_context(|| format!("Failed to copy {:?} to {:?}", source, target))?;
    }
    debug!("Copied {:?} -> {:?}", source, target);
    Ok(())
}

/// Recursively copies the directory `source` to `target`, recreating nested links as links.
pub fn copy_tree(source: &Path, target: &Path) -> Result<()> {
    for entry in WalkDir::new(source).follow_links(false) {
        let entry = entry.with_context(|| format!("Failed to walk {:?}", source))?;
        // Every walked path lies below `source`.
        let relative = entry
            .path()
            .strip_prefix(source)
            .with_context(|| format!("{:?} is outside {:?}", entry.path(), source))?;
        let dest = target.join(relative);
        let file_type = entry.file_type();

        if file_type.is_symlink() {
            copy_link(entry.path(), &dest)?;
        } else if file_type.is_dir() {
            fs::create_dir_all(&dest)
                .with_context(|| format!("Failed to create directory {:?}", dest))?;
        } else {
            fs::copy(entry.path(), &dest)
                .with_context(|| format!("Failed to copy {:?} to {:?}", entry.path(), dest))?;
        }
    }
    Ok(())
}

/// Recreates the link `source` at `target` with the same stored target.
fn copy_link(source: &Path, target: &Path) -> Result<()> {
    let stored = fs::read_link(source).with_context(|| format!("Failed to read link {:?}", source))?;

    #[cfg(unix)]
    {
        std::os::unix::fs::symlink(&stored, target)
            .with_context(|| format!("Failed to create symlink {:?} -> {:?}", target, stored))?;
    }
    #[cfg(windows)]
    {
        let created = if source.is_dir() {
            std::os::windows::fs::symlink_dir(&stored, target)
        } else {
            std::os::windows::fs::symlink_file(&stored, target)
        };
        created.with_context(|| format!("Failed to create symlink {:?} -> {:?}", target, stored))?;
    }
    #[cfg(not(any(unix, windows)))]
    {
        bail!("Copying links is not implemented for this platform ({:?}).", stored);
    }
    Ok(())
}

/// Merges the contents of `source` into the existing directory `target`.
///
/// Files that already exist in `target` are kept unchanged; missing files and
/// directories are created.
pub fn merge_dir_no_clobber(source: &Path, target: &Path) -> Result<()> {
    let mut options = fs_extra::dir::CopyOptions::new();
    options.content_only = true;
    options.skip_exist = true;
    options.overwrite = false;

    info!("Merging {:?} into {:?} (existing files are kept)", source, target);
    fs_extra::dir::copy(source, target, &options).map_err(|e| {
        anyhow::anyhow!(e).context(format!("Failed to merge {:?} into {:?}", source, target))
    })?;
    Ok(())
}
