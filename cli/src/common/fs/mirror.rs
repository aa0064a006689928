//! # FS-Online Tree Mirroring
//!
//! File: cli/src/common/fs/mirror.rs
//!
//! ## Overview
//!
//! Builds a directory whose direct children stand in for the children of a
//! source directory, either as relative symbolic links (`TreeMode::Link`) or
//! as full copies (`TreeMode::Copy`). The development tree under
//! `dev/fsonline` and the build tree under `build/` are assembled from
//! several such mirrors plus individually placed addons.
//!
//! ## Architecture
//!
//! - `mirror` handles one source directory: optional guarded clean of the
//!   target, then one `place_entry` per child, sorted by name.
//! - `link_entry` / `copy_entry` place a single entry.
//! - `clean_target` removes a target, but only if it lies strictly below a
//!   given root directory.
//! - Every step is recorded in a `SymlinkPlan`, which is all a dry run
//!   produces.
//!
use crate::common::fs::{copy, io, links};
use crate::core::error::{FsonlineError, Result};
use anyhow::{bail, Context};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// How entries are placed into the target tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum TreeMode {
    /// Relative symbolic links.
    #[default]
    Link,
    /// Recursive copies (nested links preserved).
    Copy,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlanAction {
    Link,
    Copy,
    /// A correct link was already in place.
    Skip,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlanEntry {
    pub source: PathBuf,
    pub target: PathBuf,
    pub action: PlanAction,
}

/// Ordered record of everything a tree build did or, in a dry run, would do.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SymlinkPlan {
    entries: Vec<PlanEntry>,
}

impl SymlinkPlan {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, entry: PlanEntry) {
        self.entries.push(entry);
    }

    pub fn extend(&mut self, other: SymlinkPlan) {
        self.entries.extend(other.entries);
    }

    pub fn entries(&self) -> &[PlanEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of entries with the given action.
    pub fn count(&self, action: PlanAction) -> usize {
        self.entries.iter().filter(|e| e.action == action).count()
    }
}

#[derive(Debug, Clone, Default)]
pub struct MirrorOptions {
    pub mode: TreeMode,
    pub dry_run: bool,
    /// When set, the target directory is removed first. It must lie strictly below this root.
    pub clean_root: Option<PathBuf>,
    /// Dry runs only: plan as if the target were empty (it is about to be cleaned).
    pub assume_empty: bool,
}

/// # Mirror A Directory (`mirror`)
///
/// Places every direct child of `source_dir` whose name is not in `exclude`
/// into `target_dir`, creating `target_dir` if needed.
///
/// # Errors
///
/// - `FsonlineError::Validation` if `source_dir` is not a directory.
/// - `FsonlineError::FilesystemConflict` if an entry already exists at a
///   target path (except an identical link) or if the clean guard refuses.
pub fn mirror(
    source_dir: &Path,
    target_dir: &Path,
    exclude: &[&str],
    options: &MirrorOptions,
) -> Result<SymlinkPlan> {
    if !source_dir.is_dir() {
        bail!(FsonlineError::Validation(format!(
            "Mirror source {:?} is not a directory",
            source_dir
        )));
    }

    let mut fresh = options.dry_run && options.assume_empty;
    if let Some(root) = &options.clean_root {
        fresh |= clean_target(target_dir, root, options.dry_run)? && options.dry_run;
    }
    if !options.dry_run {
        io::ensure_dir_exists(target_dir)?;
    }

    info!(
        "Mirroring {:?} into {:?} ({:?})",
        source_dir, target_dir, options.mode
    );

    let mut plan = SymlinkPlan::new();
    for child in list_children(source_dir, exclude)? {
        let Some(name) = child.file_name() else {
            continue;
        };
        let target = target_dir.join(name);
        if fresh {
            plan.push(planned_entry(&child, &target, options.mode));
        } else {
            plan.push(place_entry(&child, &target, options.mode, options.dry_run)?);
        }
    }
    Ok(plan)
}

/// Direct children of `source_dir` not named in `exclude`, sorted by path.
pub fn list_children(source_dir: &Path, exclude: &[&str]) -> Result<Vec<PathBuf>> {
    let mut children: Vec<PathBuf> = fs::read_dir(source_dir)
        .with_context(|| format!("Failed to list directory {:?}", source_dir))?
        .map(|entry| entry.map(|e| e.path()))
        .collect::<std::io::Result<_>>()
        .with_context(|| format!("Failed to list directory {:?}", source_dir))?;
    children.retain(|child| match child.file_name() {
        Some(name) if exclude.iter().any(|excluded| name == *excluded) => {
            debug!("Excluded from mirror: {:?}", child);
            false
        }
        _ => true,
    });
    children.sort();
    Ok(children)
}

/// The entry `place_entry` would produce at an empty `target`. Nothing is checked or touched.
pub fn planned_entry(source: &Path, target: &Path, mode: TreeMode) -> PlanEntry {
    let action = match mode {
        TreeMode::Link => PlanAction::Link,
        TreeMode::Copy => PlanAction::Copy,
    };
    PlanEntry {
        source: source.to_path_buf(),
        target: target.to_path_buf(),
        action,
    }
}

/// Places one entry with the given mode.
pub fn place_entry(source: &Path, target: &Path, mode: TreeMode, dry_run: bool) -> Result<PlanEntry> {
    match mode {
        TreeMode::Link => link_entry(source, target, dry_run),
        TreeMode::Copy => copy_entry(source, target, dry_run),
    }
}

/// Links `source` at `target` with a relative link.
pub fn link_entry(source: &Path, target: &Path, dry_run: bool) -> Result<PlanEntry> {
    let action = match links::create_relative_symlink(source, target, dry_run)? {
        links::LinkOutcome::AlreadyLinked => PlanAction::Skip,
        links::LinkOutcome::Created | links::LinkOutcome::Planned => PlanAction::Link,
    };
    Ok(PlanEntry {
        source: source.to_path_buf(),
        target: target.to_path_buf(),
        action,
    })
}

/// Copies `source` to `target`, preserving nested links.
pub fn copy_entry(source: &Path, target: &Path, dry_run: bool) -> Result<PlanEntry> {
    copy::copy_entry(source, target, dry_run)?;
    Ok(PlanEntry {
        source: source.to_path_buf(),
        target: target.to_path_buf(),
        action: PlanAction::Copy,
    })
}

/// # Guarded Clean (`clean_target`)
///
/// Removes `target` (a directory tree, file or link) if it exists.
/// Returns `true` if something was (or in a dry run would be) removed.
///
/// # Errors
///
/// `FsonlineError::FilesystemConflict` if `target` is not strictly below `root`.
pub fn clean_target(target: &Path, root: &Path, dry_run: bool) -> Result<bool> {
    if target.symlink_metadata().is_err() {
        debug!("Nothing to clean at {:?}", target);
        return Ok(false);
    }

    let root_abs = root
        .canonicalize()
        .with_context(|| format!("Clean root {:?} is not accessible", root))?;
    // Resolve the parent only, so a link at `target` is judged by where it lives.
    let target_abs = match (target.parent(), target.file_name()) {
        (Some(parent), Some(name)) => parent
            .canonicalize()
            .with_context(|| format!("Clean target parent {:?} is not accessible", parent))?
            .join(name),
        _ => target.to_path_buf(),
    };

    if target_abs == root_abs || !target_abs.starts_with(&root_abs) {
        bail!(FsonlineError::FilesystemConflict(format!(
            "Refusing to clean {:?}: it is not inside {:?}",
            target_abs, root_abs
        )));
    }

    if dry_run {
        info!("[dry run] Would remove {:?}", target_abs);
        return Ok(true);
    }

    warn!("Removing {:?}", target_abs);
    let metadata = target.symlink_metadata()?;
    if metadata.is_dir() {
        fs::remove_dir_all(target).with_context(|| format!("Failed to remove {:?}", target))?;
    } else {
        fs::remove_file(target).with_context(|| format!("Failed to remove {:?}", target))?;
    }
    Ok(true)
}

// --- Unit Tests ---
#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::core::error::error_class;
    use tempfile::tempdir;

    /// A miniature Odoo checkout: `odoo-bin`, `setup.py`, `addons/`, `odoo/`.
    fn odoo_source(root: &Path) -> PathBuf {
        let src = root.join("src/OCA/OCB");
        fs::create_dir_all(src.join("addons/web")).unwrap();
        fs::create_dir_all(src.join("odoo/addons/base")).unwrap();
        fs::write(src.join("odoo-bin"), "#!/usr/bin/env python3").unwrap();
        fs::write(src.join("setup.py"), "setup()").unwrap();
        src
    }

    fn link_options() -> MirrorOptions {
        MirrorOptions::default()
    }

    #[test]
    fn test_mirror_links_sorted_children_with_excludes() -> Result<()> {
        let dir = tempdir()?;
        let src = odoo_source(dir.path());
        let tgt = dir.path().join("dev/fsonline");

        let plan = mirror(&src, &tgt, &["addons", "odoo"], &link_options())?;
        let targets: Vec<_> = plan.entries().iter().map(|e| e.target.clone()).collect();
        assert_eq!(targets, vec![tgt.join("odoo-bin"), tgt.join("setup.py")]);
        assert_eq!(plan.count(PlanAction::Link), 2);

        for entry in plan.entries() {
            let stored = fs::read_link(&entry.target)?;
            assert!(stored.is_relative(), "{:?} must be relative", stored);
        }
        assert_eq!(fs::read_to_string(tgt.join("setup.py"))?, "setup()");
        assert!(tgt.join("addons").symlink_metadata().is_err());
        Ok(())
    }

    #[test]
    fn test_mirror_rerun_skips_existing_links() -> Result<()> {
        let dir = tempdir()?;
        let src = odoo_source(dir.path());
        let tgt = dir.path().join("dev/fsonline");
        mirror(&src, &tgt, &[], &link_options())?;
        let again = mirror(&src, &tgt, &[], &link_options())?;
        assert_eq!(again.count(PlanAction::Skip), again.len());
        Ok(())
    }

    #[test]
    fn test_mirror_conflict_on_foreign_entry() -> Result<()> {
        let dir = tempdir()?;
        let src = odoo_source(dir.path());
        let tgt = dir.path().join("dev/fsonline");
        fs::create_dir_all(&tgt)?;
        fs::write(tgt.join("setup.py"), "local edit")?;

        let err = mirror(&src, &tgt, &[], &link_options()).unwrap_err();
        assert!(matches!(
            error_class(&err),
            Some(FsonlineError::FilesystemConflict(_))
        ));
        assert_eq!(fs::read_to_string(tgt.join("setup.py"))?, "local edit");
        Ok(())
    }

    #[test]
    fn test_mirror_relocation_keeps_links_valid() -> Result<()> {
        let dir = tempdir()?;
        let repo = dir.path().join("repo");
        let src = odoo_source(&repo);
        mirror(&src, &repo.join("dev/fsonline"), &[], &link_options())?;

        let moved = dir.path().join("elsewhere");
        fs::rename(&repo, &moved)?;
        assert_eq!(fs::read_to_string(moved.join("dev/fsonline/setup.py"))?, "setup()");
        assert!(moved.join("dev/fsonline/odoo/addons/base").is_dir());
        Ok(())
    }

    #[test]
    fn test_mirror_dry_run_mutates_nothing() -> Result<()> {
        let dir = tempdir()?;
        let src = odoo_source(dir.path());
        let tgt = dir.path().join("dev/fsonline");
        let options = MirrorOptions {
            dry_run: true,
            ..MirrorOptions::default()
        };
        let plan = mirror(&src, &tgt, &["odoo"], &options)?;
        assert_eq!(plan.len(), 3);
        assert!(!tgt.exists());
        Ok(())
    }

    #[test]
    fn test_mirror_copy_mode() -> Result<()> {
        let dir = tempdir()?;
        let src = odoo_source(dir.path());
        let tgt = dir.path().join("build/odoo");
        let options = MirrorOptions {
            mode: TreeMode::Copy,
            ..MirrorOptions::default()
        };
        let plan = mirror(&src, &tgt, &["addons"], &options)?;
        assert_eq!(plan.count(PlanAction::Copy), 3);
        assert!(!tgt.join("setup.py").is_symlink());
        assert!(tgt.join("odoo/addons/base").is_dir());
        Ok(())
    }

    #[test]
    fn test_mirror_clean_root_guard() -> Result<()> {
        let dir = tempdir()?;
        let src = odoo_source(dir.path());
        let build = dir.path().join("build");
        let tgt = build.join("odoo");
        fs::create_dir_all(&tgt)?;
        fs::write(tgt.join("stale.txt"), "old")?;

        let options = MirrorOptions {
            clean_root: Some(build.clone()),
            ..MirrorOptions::default()
        };
        mirror(&src, &tgt, &[], &options)?;
        assert!(!tgt.join("stale.txt").exists());
        assert!(tgt.join("setup.py").is_symlink());

        let outside = MirrorOptions {
            clean_root: Some(dir.path().join("src")),
            ..MirrorOptions::default()
        };
        let err = mirror(&src, &tgt, &[], &outside).unwrap_err();
        assert!(matches!(
            error_class(&err),
            Some(FsonlineError::FilesystemConflict(_))
        ));
        assert!(tgt.join("setup.py").is_symlink());
        Ok(())
    }

    #[test]
    fn test_dry_clean_plans_over_conflicting_entries() -> Result<()> {
        let dir = tempdir()?;
        let src = odoo_source(dir.path());
        let build = dir.path().join("build");
        let tgt = build.join("odoo");
        fs::create_dir_all(&tgt)?;
        fs::write(tgt.join("setup.py"), "stale copy")?;

        let options = MirrorOptions {
            dry_run: true,
            clean_root: Some(build.clone()),
            ..MirrorOptions::default()
        };
        let plan = mirror(&src, &tgt, &[], &options)?;
        assert_eq!(plan.count(PlanAction::Link), plan.len());
        assert_eq!(plan.len(), 4);
        assert_eq!(fs::read_to_string(tgt.join("setup.py"))?, "stale copy");
        Ok(())
    }

    #[test]
    fn test_clean_target_refuses_root_and_outside() -> Result<()> {
        let dir = tempdir()?;
        let build = dir.path().join("build");
        fs::create_dir_all(build.join("odoo"))?;
        fs::create_dir_all(dir.path().join("out"))?;

        assert!(clean_target(&build, &build, false).is_err());
        assert!(clean_target(&dir.path().join("out"), &build, false).is_err());
        assert!(clean_target(&build.join("../out"), &build, false).is_err());
        assert!(dir.path().join("out").is_dir());

        assert!(clean_target(&build.join("odoo"), &build, true)?);
        assert!(build.join("odoo").is_dir());
        assert!(clean_target(&build.join("odoo"), &build, false)?);
        assert!(!build.join("odoo").exists());
        assert!(!clean_target(&build.join("odoo"), &build, false)?);
        Ok(())
    }

    #[test]
    fn test_link_entry_for_single_addon() -> Result<()> {
        let dir = tempdir()?;
        let addon = dir.path().join("src/custom/widgets");
        fs::create_dir_all(&addon)?;
        let addons_dir = dir.path().join("dev/fsonline/odoo/addons");
        fs::create_dir_all(&addons_dir)?;

        let entry = link_entry(&addon, &addons_dir.join("widgets"), false)?;
        assert_eq!(entry.action, PlanAction::Link);
        assert_eq!(
            fs::read_link(addons_dir.join("widgets"))?,
            PathBuf::from("../../../../src/custom/widgets")
        );
        Ok(())
    }
}
