//! # FS-Online Filesystem Link Operations
//!
//! File: cli/src/common/fs/links.rs
//!
//! ## Overview
//!
//! Creates the **relative** symbolic links the development tree is made of.
//! A link's target is always computed from the directory that holds the link,
//! so a checkout can be moved or mounted elsewhere (e.g. into a container)
//! without breaking the tree.
//!
//! ## Architecture
//!
//! `create_relative_symlink` is the single entry point:
//! - **Source Validation:** the `source` path must exist.
//! - **Target Computation:** `pathdiff::diff_paths(source, link.parent())`.
//! - **Existing Entries:** a link that already points to the same relative
//!   target is left alone. Anything else at the link path is a
//!   `FilesystemConflict`; nothing is ever overwritten or backed up.
//! - **Dry Run:** only logs what would be linked.
//!
//! ## Usage
//!
//! ```rust
//! use crate::common::fs::links;
//!
//! let outcome = links::create_relative_symlink(
//!     Path::new("/repo/src/OCA/OCB/odoo-bin"),
//!     Path::new("/repo/dev/fsonline/odoo-bin"),
//!     false,
//! )?;
//! // dev/fsonline/odoo-bin -> ../../src/OCA/OCB/odoo-bin
//! ```
//!
use crate::core::error::{FsonlineError, Result};
use anyhow::{bail, Context};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// What `create_relative_symlink` did (or would do) for one entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkOutcome {
    Created,
    AlreadyLinked,
    Planned,
}

/// Computes the target to store in a link at `link` so that it resolves to `source`.
///
/// Both paths must be absolute.
pub fn relative_link_target(source: &Path, link: &Path) -> Result<PathBuf> {
    // The link is resolved relative to the directory it lives in.
    let link_dir = link.parent().unwrap_or_else(|| Path::new("/"));
    if !source.is_absolute() || !link_dir.is_absolute() {
        bail!(FsonlineError::Configuration(format!(
            "Can not compute a relative link from {:?} to {:?}: both paths must be absolute",
            link, source
        )));
    }

    pathdiff::diff_paths(source, link_dir).ok_or_else(|| {
        anyhow::anyhow!(FsonlineError::Configuration(format!(
            "No relative path from {:?} to {:?}",
            link_dir, source
        )))
    })
}

/// Creates a relative symbolic link at `link` pointing to `source`.
///
/// # Errors
///
/// - `FsonlineError::Validation` if `source` does not exist.
/// - `FsonlineError::FilesystemConflict` if something other than the same
///   relative link already occupies `link`.
/// - An I/O error with context if the link can not be created.
pub fn create_relative_symlink(source: &Path, link: &Path, dry_run: bool) -> Result<LinkOutcome> {
    // 1. The source has to exist (a dangling source symlink counts as existing).
    if source.symlink_metadata().is_err() {
        bail!(FsonlineError::Validation(format!(
            "Symlink source path does not exist: {:?}",
            source
        )));
    }

    let relative = relative_link_target(source, link)?;

    // 2. Something already at the link path: only the identical link is accepted.
    if link.symlink_metadata().is_ok() {
        match std::fs::read_link(link) {
            Ok(existing) if existing == relative => {
                debug!("Symlink already exists and is correct: {:?}", link);
                return Ok(LinkOutcome::AlreadyLinked);
            }
            Ok(existing) => bail!(FsonlineError::FilesystemConflict(format!(
                "{:?} is a link to {:?}, expected {:?}",
                link, existing, relative
            ))),
            Err(_) => bail!(FsonlineError::FilesystemConflict(format!(
                "{:?} already exists and is not a link",
                link
            ))),
        }
    }

    if dry_run {
        info!("[dry run] Would link {:?} -> {:?}", link, relative);
        return Ok(LinkOutcome::Planned);
    }

    // 3. Platform-specific link creation.
    #[cfg(unix)]
    {
        std::os::unix::fs::symlink(&relative, link)
            .with_context(|| format!("Failed to create symlink {:?} -> {:?}", link, relative))?;
    }
    #[cfg(windows)]
    {
        if source.is_dir() {
            std::os::windows::fs::symlink_dir(&relative, link).with_context(|| {
                format!("Failed to create directory symlink {:?} -> {:?}", link, relative)
            })?;
        } else {
            std::os::windows::fs::symlink_file(&relative, link).with_context(|| {
                format!("Failed to create file symlink {:?} -> {:?}", link, relative)
            })?;
        }
    }
    #[cfg(not(any(unix, windows)))]
    {
        bail!("Symlink creation is not implemented for this platform.");
    }

    debug!("Created symlink: {:?} -> {:?}", link, relative);
    Ok(LinkOutcome::Created)
}
