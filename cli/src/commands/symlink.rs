//! # FS-Online Symlink-Odoo Command
//!
//! File: cli/src/commands/symlink.rs
//!
//! ## Overview
//!
//! Assembles the development tree `dev/fsonline` from the Odoo checkout
//! (`CORE_ODOO_SRC`) and every configured core and instance addon:
//!
//! ```text
//! dev/fsonline/
//!   odoo-bin, setup.py, ...      -> <odoo>/*            (except addons/, odoo/)
//!   odoo/
//!     __init__.py, http.py, ...  -> <odoo>/odoo/*       (except addons/)
//!     addons/
//!       base, web, ...           -> <odoo>/odoo/addons/* and <odoo>/addons/*
//!       <addon>                  -> each CORE_ADDON_SRC / INST_ADDON_SRC addon
//! ```
//!
//! Every link is relative, so the tree survives moving the checkout. With
//! `--mode copy` the same tree is built from copies instead.
//!
//! ## Examples
//!
//! ```bash
//! fsonline symlink-odoo
//! fsonline symlink-odoo --clean --dry
//! fsonline symlink-odoo --mode copy --dir-mode 750
//! ```
//!
use crate::commands::{parse_dir_mode, print_plan, CommandContext};
use crate::common::fs::io;
use crate::common::fs::mirror::{
    clean_target, mirror, place_entry, planned_entry, MirrorOptions, PlanAction, SymlinkPlan,
    TreeMode,
};
use crate::core::error::Result;
use crate::core::settings::Settings;
use clap::Parser;
use tracing::{debug, info, warn};

#[derive(Parser, Debug, Clone)]
#[command(about = "Symlink (or copy) Odoo and all addons into dev/fsonline")]
pub struct SymlinkArgs {
    /// Place entries as relative links or as copies.
    #[arg(long, value_enum, default_value_t = TreeMode::Link)]
    pub mode: TreeMode,

    /// Permission bits (octal) for directories created by this command.
    #[arg(long, default_value = "770", value_parser = parse_dir_mode)]
    pub dir_mode: u32,

    /// Remove dev/fsonline before building it again.
    #[arg(long)]
    pub clean: bool,

    /// Only log what would be done.
    #[arg(long)]
    pub dry: bool,
}

/// # Handle Symlink-Odoo Command (`handle_symlink`)
///
/// Resolves the settings and builds the development tree.
pub fn handle_symlink(ctx: &CommandContext, args: SymlinkArgs) -> Result<()> {
    debug!("Symlink args: {:?}", args);
    let settings = ctx.settings()?;
    let plan = build_dev_tree(&settings, &args)?;
    if args.dry {
        print_plan(&plan);
    }

    if plan.is_empty() {
        warn!("Nothing to place: {:?} has no entries", settings.core_odoo_dir);
    }

    let verb = if args.dry { "Would place" } else { "Placed" };
    println!(
        "{} {} entries in {} ({} already up to date)",
        verb,
        plan.len() - plan.count(PlanAction::Skip),
        settings.conventions.dev_fson_tgt_dir.display(),
        plan.count(PlanAction::Skip)
    );
    Ok(())
}

/// Builds `dev/fsonline` for `settings`. Returns every placed entry.
pub fn build_dev_tree(settings: &Settings, args: &SymlinkArgs) -> Result<SymlinkPlan> {
    let conventions = &settings.conventions;
    let odoo_src = &settings.core_odoo_dir;
    let fson_tgt = &conventions.dev_fson_tgt_dir;
    let mut plan = SymlinkPlan::new();

    io::ensure_dir_with_mode(&conventions.dev_dir, args.dir_mode, args.dry)?;
    // A dry clean leaves the old tree on disk, so plan against an empty one.
    let assume_empty =
        args.clean && clean_target(fson_tgt, &conventions.dev_dir, args.dry)? && args.dry;
    io::ensure_dir_with_mode(fson_tgt, args.dir_mode, args.dry)?;

    let options = MirrorOptions {
        mode: args.mode,
        dry_run: args.dry,
        clean_root: None,
        assume_empty,
    };

    info!(
        "Placing Odoo from {:?} into {:?} ({:?})",
        odoo_src, fson_tgt, args.mode
    );

    // <odoo>/* without the two addon locations
    plan.extend(mirror(odoo_src, fson_tgt, &["addons", "odoo"], &options)?);

    // <odoo>/odoo/* without odoo/addons
    let odoo_tgt = fson_tgt.join("odoo");
    io::ensure_dir_with_mode(&odoo_tgt, args.dir_mode, args.dry)?;
    plan.extend(mirror(&odoo_src.join("odoo"), &odoo_tgt, &["addons"], &options)?);

    // Framework and standard addons share one addons directory.
    let addons_tgt = odoo_tgt.join("addons");
    io::ensure_dir_with_mode(&addons_tgt, args.dir_mode, args.dry)?;
    for source in [odoo_src.join("odoo").join("addons"), odoo_src.join("addons")] {
        if source.is_dir() {
            plan.extend(mirror(&source, &addons_tgt, &[], &options)?);
        } else {
            warn!("Odoo addon directory {:?} does not exist, skipping", source);
        }
    }

    // Core addons first, then instance addons.
    for (name, path) in settings.all_addon_dirs()?.iter() {
        let target = addons_tgt.join(name);
        if assume_empty {
            plan.push(planned_entry(path, &target, args.mode));
        } else {
            plan.push(place_entry(path, &target, args.mode, args.dry)?);
        }
    }

    info!(
        "Development tree {:?}: {} placed, {} already in place",
        fson_tgt,
        plan.len() - plan.count(PlanAction::Skip),
        plan.count(PlanAction::Skip)
    );
    Ok(plan)
}
