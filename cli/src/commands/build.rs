//! # FS-Online Build-Odoo Command
//!
//! File: cli/src/commands/build.rs
//!
//! ## Overview
//!
//! Assembles a self-contained Odoo tree below `build/` as described by the
//! repository's `build.yml`:
//!
//! - **Linked build** (default): `odoo_tgt` mirrors `odoo_src` without its
//!   `addons/` directory; `addons_tgt` links every addon found in
//!   `<odoo_src>/odoo/addons/*`, `<odoo_src>/addons/*` and `addons_src`.
//! - **Copied build** (`--copy`): `odoo_src` is copied to `odoo_tgt` (links
//!   inside it are kept as links) and every addon from `<odoo_src>/addons/*`
//!   and `addons_src` is copied into `addons_tgt`.
//!
//! Both targets are deleted first. The configuration is validated before
//! anything is deleted, and deletion is refused for anything outside `build/`.
//!
//! ## Examples
//!
//! ```bash
//! fsonline build-odoo
//! fsonline build-odoo --copy --dry
//! ```
//!
use crate::commands::{print_plan, CommandContext};
use crate::common::fs::io;
use crate::common::fs::mirror::{
    clean_target, copy_entry, list_children, mirror, place_entry, planned_entry, MirrorOptions,
    SymlinkPlan, TreeMode,
};
use crate::core::addons::find_addons;
use crate::core::build_config::BuildConfig;
use crate::core::conventions::Conventions;
use crate::core::error::{FsonlineError, Result};
use anyhow::bail;
use clap::Parser;
use tracing::{debug, info};

#[derive(Parser, Debug, Clone)]
#[command(about = "Build the Odoo tree below build/ from build.yml")]
pub struct BuildArgs {
    /// Copy sources instead of linking them.
    #[arg(long)]
    pub copy: bool,

    /// Only log what would be done.
    #[arg(long)]
    pub dry: bool,
}

pub fn handle_build(ctx: &CommandContext, args: BuildArgs) -> Result<()> {
    debug!("Build args: {:?}", args);
    let config = BuildConfig::load(&ctx.conventions.build_config_file)?;
    let plan = build_odoo(&ctx.conventions, &config, &args)?;
    if args.dry {
        print_plan(&plan);
    }

    let verb = if args.dry { "Would place" } else { "Placed" };
    println!(
        "{} {} entries below {}",
        verb,
        plan.len(),
        config.layout(&ctx.conventions.repo_dir).build_root.display()
    );
    Ok(())
}

/// # Build Odoo (`build_odoo`)
///
/// Rebuilds both targets of `config` for the repository of `conventions`.
///
/// # Errors
///
/// - `FsonlineError::Validation` if `odoo_src` is not a directory.
/// - `FsonlineError::FilesystemConflict` if a target resolves outside `build/`.
/// - `FsonlineError::AddonConfig` from addon discovery.
pub fn build_odoo(conventions: &Conventions, config: &BuildConfig, args: &BuildArgs) -> Result<SymlinkPlan> {
    config.validate()?;
    let repo_dir = &conventions.repo_dir;
    let layout = config.layout(repo_dir);

    if !layout.odoo_src.is_dir() {
        bail!(FsonlineError::Validation(format!(
            "odoo_src {:?} is missing or not a directory",
            layout.odoo_src
        )));
    }

    // Discover before deleting anything, so a bad search path leaves the old build intact.
    let addons = find_addons(
        &config.addon_search_paths(!args.copy),
        Some(repo_dir),
        &conventions.manifest_name,
    )?;

    for target in [&layout.odoo_tgt, &layout.addons_tgt] {
        clean_target(target, &layout.build_root, args.dry)?;
    }

    let mode = if args.copy { TreeMode::Copy } else { TreeMode::Link };
    let mut plan = SymlinkPlan::new();

    // Both targets are wiped first, so a dry run plans every entry as new.
    if args.dry {
        if args.copy {
            plan.push(planned_entry(&layout.odoo_src, &layout.odoo_tgt, mode));
        } else {
            for child in list_children(&layout.odoo_src, &["addons"])? {
                if let Some(name) = child.file_name() {
                    let target = layout.odoo_tgt.join(name);
                    plan.push(planned_entry(&child, &target, mode));
                }
            }
        }
        for (name, path) in addons.iter() {
            plan.push(planned_entry(path, &layout.addons_tgt.join(name), mode));
        }
        info!("[dry run] Would place {} entries below {:?}", plan.len(), layout.build_root);
        return Ok(plan);
    }

    io::ensure_dir_exists(&layout.build_root)?;
    if args.copy {
        info!("Copying {:?} to {:?}", layout.odoo_src, layout.odoo_tgt);
        plan.push(copy_entry(&layout.odoo_src, &layout.odoo_tgt, false)?);
    } else {
        let options = MirrorOptions {
            mode: TreeMode::Link,
            ..MirrorOptions::default()
        };
        plan.extend(mirror(&layout.odoo_src, &layout.odoo_tgt, &["addons"], &options)?);
    }

    io::ensure_dir_exists(&layout.addons_tgt)?;
    for (name, path) in addons.iter() {
        plan.push(place_entry(path, &layout.addons_tgt.join(name), mode, false)?);
    }

    info!(
        "Build tree ready: {} entries, {} addons",
        plan.len(),
        addons.len()
    );
    Ok(plan)
}

// --- Unit Tests ---
#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::core::conventions::{CORE_MARKER, ODOO_MANIFEST_NAME, VCS_MARKER};
    use crate::core::error::error_class;
    use crate::common::fs::mirror::PlanAction;
    use std::fs;
    use std::path::{Path, PathBuf};
    use tempfile::{tempdir, TempDir};

    const BUILD_YML: &str = "odoo:\n  odoo_src: src/OCA/OCB\n  addons_src:\n    - src/custom/*\n";

    fn fixture() -> (TempDir, Conventions) {
        let dir = tempdir().unwrap();
        let repo = dir.path().canonicalize().unwrap();
        fs::create_dir_all(repo.join(VCS_MARKER)).unwrap();
        fs::write(repo.join(CORE_MARKER), "").unwrap();
        let odoo = repo.join("src/OCA/OCB");
        for addon in [
            odoo.join("odoo/addons/base"),
            odoo.join("addons/web"),
            repo.join("src/custom/widgets"),
        ] {
            fs::create_dir_all(&addon).unwrap();
            fs::write(addon.join(ODOO_MANIFEST_NAME), "{}").unwrap();
        }
        fs::write(odoo.join("odoo-bin"), "").unwrap();
        std::os::unix::fs::symlink("odoo-bin", odoo.join("openerp-server")).unwrap();
        fs::write(repo.join("build.yml"), BUILD_YML).unwrap();
        let conventions = Conventions::from_core_dir(repo).unwrap();
        (dir, conventions)
    }

    fn config(conventions: &Conventions) -> BuildConfig {
        BuildConfig::load(&conventions.build_config_file).unwrap()
    }

    fn args(copy: bool, dry: bool) -> BuildArgs {
        BuildArgs { copy, dry }
    }

    #[test]
    fn test_linked_build() -> Result<()> {
        let (_dir, conventions) = fixture();
        let build = conventions.repo_dir.join("build");
        build_odoo(&conventions, &config(&conventions), &args(false, false))?;

        assert_eq!(
            fs::read_link(build.join("odoo/odoo-bin"))?,
            PathBuf::from("../../src/OCA/OCB/odoo-bin")
        );
        assert!(build.join("odoo/odoo").is_symlink());
        assert!(build.join("odoo/addons").symlink_metadata().is_err());
        for addon in ["base", "web", "widgets"] {
            let link = build.join("addons").join(addon);
            assert!(link.is_symlink() && link.is_dir(), "{} missing", addon);
        }
        Ok(())
    }

    #[test]
    fn test_copied_build_replaces_previous_build() -> Result<()> {
        let (_dir, conventions) = fixture();
        let build = conventions.repo_dir.join("build");
        build_odoo(&conventions, &config(&conventions), &args(false, false))?;
        build_odoo(&conventions, &config(&conventions), &args(true, false))?;

        assert!(build.join("odoo/odoo-bin").is_file());
        assert!(!build.join("odoo/odoo-bin").is_symlink());
        assert_eq!(
            fs::read_link(build.join("odoo/openerp-server"))?,
            PathBuf::from("odoo-bin")
        );
        assert!(build.join("odoo/addons/web").is_dir());
        assert!(build.join("addons/widgets").is_dir() && !build.join("addons/widgets").is_symlink());
        assert!(build.join("addons/web").is_dir());
        assert!(build.join("addons/base").symlink_metadata().is_err());
        Ok(())
    }

    #[test]
    fn test_dry_run_keeps_existing_build() -> Result<()> {
        let (_dir, conventions) = fixture();
        let build = conventions.repo_dir.join("build");
        build_odoo(&conventions, &config(&conventions), &args(false, false))?;
        let copied = build_odoo(&conventions, &config(&conventions), &args(true, true))?;
        assert_eq!(copied.count(PlanAction::Copy), 3);
        let linked = build_odoo(&conventions, &config(&conventions), &args(false, true))?;
        assert_eq!(linked.count(PlanAction::Link), linked.len());
        assert!(linked.entries().iter().any(|e| e.target == build.join("addons/base")));
        assert!(build.join("addons/widgets").is_symlink());
        Ok(())
    }

    #[test]
    fn test_target_outside_build_fails_before_mutation() -> Result<()> {
        let (_dir, conventions) = fixture();
        let out = conventions.repo_dir.join("out/addons");
        fs::create_dir_all(&out)?;
        fs::write(out.join("keep.txt"), "keep")?;
        fs::write(
            conventions.repo_dir.join("build.yml"),
            "odoo:\n  odoo_src: src/OCA/OCB\n  addons_tgt: out/addons\n",
        )?;

        let err = BuildConfig::load(&conventions.build_config_file).unwrap_err();
        assert!(matches!(
            error_class(&err),
            Some(FsonlineError::Configuration(_))
        ));
        assert!(out.join("keep.txt").is_file());
        assert!(!conventions.repo_dir.join("build").exists());
        Ok(())
    }

    #[test]
    fn test_missing_odoo_src_is_validation_error() {
        let (_dir, conventions) = fixture();
        let config = BuildConfig::from_yaml_str("odoo:\n  odoo_src: src/missing\n").unwrap();
        let err = build_odoo(&conventions, &config, &args(false, false)).unwrap_err();
        assert!(matches!(error_class(&err), Some(FsonlineError::Validation(_))));
        assert!(!Path::new(&conventions.repo_dir.join("build")).exists());
    }
}
