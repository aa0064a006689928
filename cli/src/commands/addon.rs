//! # FS-Online Addon Scaffolding Commands
//!
//! File: cli/src/commands/addon.rs
//!
//! ## Overview
//!
//! `create-addon` and `create-model` generate code from the `copier` templates
//! in `tools/copier-templates`:
//!
//! - **create-addon** renders `odoo_addon` into a new directory below
//!   `CORE_ADDON_TGT` (core repository) or `INST_ADDON_TGT` (instance
//!   repository). `--minimal` switches off every optional template part.
//! - **create-model** renders `odoo_model` into a scratch directory next to
//!   the addon (`<addon>--tmp--`), merges the result into the addon without
//!   overwriting existing files, and then runs the post-processor so the new
//!   model, views and access rules are wired into the init files and the
//!   manifest. The scratch directory is removed whatever happens.
//!
//! Outside an instance repository both commands always target the core
//! repository. `--preview` prints the `copier` command instead of running it.
//!
//! ## Examples
//!
//! ```bash
//! fsonline create-addon --name fso_widgets --minimal
//! fsonline create-model --addon fso_widgets --preview
//! ```
//!
use crate::commands::CommandContext;
use crate::common::fs::{copy, io};
use crate::common::process::{preview_command, run_command};
use crate::core::error::{FsonlineError, Result};
use crate::core::scaffold::{find_manifest, PostProcessor, ProcessReport};
use crate::core::settings::Settings;
use anyhow::bail;
use clap::Parser;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

const COPIER: &str = "copier";
const ADDON_TEMPLATE: &str = "odoo_addon";
const MODEL_TEMPLATE: &str = "odoo_model";
const SCRATCH_SUFFIX: &str = "--tmp--";

/// Template parts switched off by `--minimal`.
const OPTIONAL_PARTS: [&str; 9] = [
    "models",
    "views",
    "security",
    "data",
    "i18n",
    "controllers",
    "static",
    "demo",
    "unittest",
];

#[derive(Parser, Debug, Clone)]
#[command(about = "Create a new Odoo addon from the copier template")]
pub struct CreateAddonArgs {
    /// Technical name of the addon (letters, digits, underscores).
    #[arg(long)]
    pub name: String,

    /// Create the addon in the core repository even inside an instance.
    #[arg(long)]
    pub core: bool,

    /// Skip every optional part of the template.
    #[arg(long)]
    pub minimal: bool,

    /// Print the copier command without running it.
    #[arg(long)]
    pub preview: bool,
}

#[derive(Parser, Debug, Clone)]
#[command(about = "Add a new model to an existing addon")]
pub struct CreateModelArgs {
    /// Technical name of the target addon.
    #[arg(long)]
    pub addon: String,

    /// Look the addon up in the core repository even inside an instance.
    #[arg(long)]
    pub core: bool,

    /// Print the copier command without running it.
    #[arg(long)]
    pub preview: bool,
}

/// Checks that `name` can be used as a Python package name.
pub fn validate_addon_name(name: &str) -> Result<()> {
    let valid = name
        .chars()
        .next()
        .is_some_and(|first| first.is_ascii_alphabetic() || first == '_')
        && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_');
    if !valid {
        bail!(FsonlineError::Validation(format!(
            "'{}' is not a valid addon name (use letters, digits and underscores)",
            name
        )));
    }
    Ok(())
}

/// Directory of the addon `name`, in the core or the instance repository.
///
/// Outside an instance repository the core repository is used regardless of `core`.
pub fn addon_dir(settings: &Settings, name: &str, core: bool) -> PathBuf {
    let conventions = &settings.conventions;
    match (&conventions.inst_dir, core) {
        (Some(inst_dir), false) => inst_dir.join(&settings.inst_addon_tgt).join(name),
        _ => conventions.core_dir.join(&settings.core_addon_tgt).join(name),
    }
}

pub fn addon_copier_args(template: &Path, target: &Path, minimal: bool) -> Vec<String> {
    let mut args = vec![
        template.to_string_lossy().into_owned(),
        target.to_string_lossy().into_owned(),
    ];
    if minimal {
        for part in OPTIONAL_PARTS {
            args.push("-d".to_string());
            args.push(format!("{}=False", part));
        }
    }
    args
}

pub fn model_copier_args(template: &Path, scratch: &Path, addon: &str) -> Vec<String> {
    vec![
        template.to_string_lossy().into_owned(),
        scratch.to_string_lossy().into_owned(),
        "-d".to_string(),
        format!("addon_name={}", addon),
    ]
}

/// `<addon>--tmp--`, next to the addon directory.
pub fn scratch_dir(addon: &Path) -> PathBuf {
    let mut name = addon.as_os_str().to_os_string();
    name.push(SCRATCH_SUFFIX);
    PathBuf::from(name)
}

fn template_dir(settings: &Settings, template: &str) -> Result<PathBuf> {
    let path = settings.conventions.templates_dir.join(template);
    if !path.is_dir() {
        bail!(FsonlineError::Validation(format!(
            "Copier template {:?} not found",
            path
        )));
    }
    Ok(path)
}

/// # Handle Create-Addon Command (`handle_create_addon`)
///
/// # Errors
///
/// - `FsonlineError::Validation` for an invalid name, a non-empty target
///   directory or a missing template.
/// - `FsonlineError::ExternalCommand` if `copier` fails.
pub async fn handle_create_addon(ctx: &CommandContext, args: CreateAddonArgs) -> Result<()> {
    debug!("Create-addon args: {:?}", args);
    validate_addon_name(&args.name)?;
    let settings = ctx.settings()?;
    if !args.core && !settings.conventions.is_instance() {
        info!("Not in an instance repository, creating a core addon");
    }

    let target = addon_dir(&settings, &args.name, args.core);
    if target.is_dir() && io::dir_has_entries(&target)? {
        bail!(FsonlineError::Validation(format!(
            "Target addon directory {:?} is not empty",
            target
        )));
    }

    let template = settings.conventions.templates_dir.join(ADDON_TEMPLATE);
    let copier_args = addon_copier_args(&template, &target, args.minimal);
    if args.preview {
        println!("{}", preview_command(COPIER, &copier_args));
        return Ok(());
    }

    template_dir(&settings, ADDON_TEMPLATE)?;
    info!("Creating addon '{}' in {:?}", args.name, target);
    run_command(COPIER, &copier_args, None).await?;
    println!("Created addon '{}' in {}", args.name, target.display());
    Ok(())
}

/// # Handle Create-Model Command (`handle_create_model`)
///
/// # Errors
///
/// - `FsonlineError::Validation` if the addon has no manifest or the template is missing.
/// - `FsonlineError::FilesystemConflict` if a scratch directory is left over.
/// - `FsonlineError::ExternalCommand` if `copier` fails.
pub async fn handle_create_model(ctx: &CommandContext, args: CreateModelArgs) -> Result<()> {
    debug!("Create-model args: {:?}", args);
    validate_addon_name(&args.addon)?;
    let settings = ctx.settings()?;

    let target = addon_dir(&settings, &args.addon, args.core);
    if find_manifest(&target).is_none() {
        bail!(FsonlineError::Validation(format!(
            "{:?} is not an addon (no manifest found)",
            target
        )));
    }

    let scratch = scratch_dir(&target);
    if scratch.symlink_metadata().is_ok() {
        bail!(FsonlineError::FilesystemConflict(format!(
            "Scratch directory {:?} exists; remove it and try again",
            scratch
        )));
    }

    let template = settings.conventions.templates_dir.join(MODEL_TEMPLATE);
    let copier_args = model_copier_args(&template, &scratch, &args.addon);
    if args.preview {
        println!("{}", preview_command(COPIER, &copier_args));
        println!("Then merge {} into {}", scratch.display(), target.display());
        return Ok(());
    }

    template_dir(&settings, MODEL_TEMPLATE)?;
    let outcome = match run_command(COPIER, &copier_args, None).await {
        Ok(()) => integrate_model(&scratch, &target),
        Err(e) => Err(e),
    };
    remove_scratch(&scratch);

    let report = outcome?;
    println!(
        "Addon '{}': {} model(s), {} data file(s), {} file(s) updated",
        args.addon,
        report.models.len(),
        report.data_files.len(),
        report.changed_files.len()
    );
    Ok(())
}

/// Merges generated files from `scratch` into `addon` and updates init files and manifest.
pub fn integrate_model(scratch: &Path, addon: &Path) -> Result<ProcessReport> {
    copy::merge_dir_no_clobber(scratch, addon)?;
    PostProcessor::new(addon).process()
}

fn remove_scratch(scratch: &Path) {
    if scratch.symlink_metadata().is_err() {
        return;
    }
    match fs::remove_dir_all(scratch) {
        Ok(()) => debug!("Removed scratch directory {:?}", scratch),
        Err(e) => warn!("Could not remove scratch directory {:?}: {}", scratch, e),
    }
}

// --- Unit Tests ---
#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::conventions::{Conventions, CORE_MARKER, ODOO_MANIFEST_NAME, VCS_MARKER};
    use crate::core::error::error_class;
    use indexmap::IndexMap;
    use tempfile::{tempdir, TempDir};

    fn core_settings() -> (TempDir, Settings) {
        let dir = tempdir().unwrap();
        let core = dir.path().canonicalize().unwrap();
        fs::create_dir_all(core.join(VCS_MARKER)).unwrap();
        fs::write(core.join(CORE_MARKER), "").unwrap();
        fs::create_dir_all(core.join("src/OCA/OCB/odoo/addons/base")).unwrap();
        fs::write(core.join("core.env"), "CORE_ODOO_SRC=src/OCA/OCB\n").unwrap();
        let conventions = Conventions::from_core_dir(core).unwrap();
        let settings =
            Settings::resolve_with_env(&conventions, &IndexMap::new(), &IndexMap::new()).unwrap();
        (dir, settings)
    }

    #[test]
    fn test_validate_addon_name() {
        assert!(validate_addon_name("fso_widgets").is_ok());
        assert!(validate_addon_name("_private2").is_ok());
        for bad in ["", "2fast", "my-addon", "a b", "../x"] {
            let err = validate_addon_name(bad).unwrap_err();
            assert!(matches!(error_class(&err), Some(FsonlineError::Validation(_))), "{}", bad);
        }
    }

    #[test]
    fn test_addon_dir_outside_instance_is_core() {
        let (_dir, settings) = core_settings();
        let core = settings.conventions.core_dir.clone();
        assert_eq!(addon_dir(&settings, "widgets", false), core.join("src/DADI/widgets"));
        assert_eq!(addon_dir(&settings, "widgets", true), core.join("src/DADI/widgets"));
    }

    #[test]
    fn test_copier_args() {
        let template = Path::new("/core/tools/copier-templates/odoo_addon");
        let target = Path::new("/core/src/DADI/widgets");
        assert_eq!(addon_copier_args(template, target, false).len(), 2);

        let minimal = addon_copier_args(template, target, true);
        assert_eq!(minimal.len(), 2 + 2 * OPTIONAL_PARTS.len());
        assert_eq!(minimal[2..4], ["-d".to_string(), "models=False".to_string()]);
        assert!(minimal.contains(&"unittest=False".to_string()));

        let model = model_copier_args(template, &scratch_dir(target), "widgets");
        assert_eq!(
            preview_command(COPIER, &model),
            "copier /core/tools/copier-templates/odoo_addon /core/src/DADI/widgets--tmp-- -d addon_name=widgets"
        );
    }

    #[test]
    fn test_integrate_model_merges_and_wires_up() -> Result<()> {
        let dir = tempdir()?;
        let addon = dir.path().join("widgets");
        fs::create_dir_all(addon.join("models"))?;
        fs::write(addon.join(ODOO_MANIFEST_NAME), "{\n    'name': 'Widgets',\n    'data': [],\n}\n")?;
        fs::write(addon.join("__init__.py"), "")?;
        fs::write(addon.join("models/__init__.py"), "from . import gadget\n")?;
        fs::write(addon.join("models/gadget.py"), "# gadget\n")?;

        let scratch = scratch_dir(&addon);
        fs::create_dir_all(scratch.join("models"))?;
        fs::create_dir_all(scratch.join("views"))?;
        fs::write(scratch.join("models/__init__.py"), "from . import widget\n")?;
        fs::write(scratch.join("models/widget.py"), "# widget\n")?;
        fs::write(scratch.join("views/widget_views.xml"), "<odoo/>\n")?;

        let report = integrate_model(&scratch, &addon)?;
        remove_scratch(&scratch);

        assert!(!scratch.exists());
        assert_eq!(report.models, vec!["gadget".to_string(), "widget".to_string()]);
        let init = fs::read_to_string(addon.join("models/__init__.py"))?;
        assert!(init.contains("from . import gadget") && init.contains("from . import widget"));
        assert!(fs::read_to_string(addon.join("__init__.py"))?.contains("from . import models"));
        assert!(fs::read_to_string(addon.join(ODOO_MANIFEST_NAME))?.contains("'views/widget_views.xml'"));
        Ok(())
    }

    #[tokio::test]
    async fn test_create_model_requires_manifest() {
        let (_dir, settings) = core_settings();
        let ctx = CommandContext::new(settings.conventions.clone(), IndexMap::new());
        fs::create_dir_all(addon_dir(&settings, "widgets", true)).unwrap();
        let args = CreateModelArgs {
            addon: "widgets".to_string(),
            core: false,
            preview: true,
        };
        let err = handle_create_model(&ctx, args).await.unwrap_err();
        assert!(matches!(error_class(&err), Some(FsonlineError::Validation(_))));
    }

    #[tokio::test]
    async fn test_create_addon_refuses_non_empty_target() {
        let (_dir, settings) = core_settings();
        let ctx = CommandContext::new(settings.conventions.clone(), IndexMap::new());
        let target = addon_dir(&settings, "widgets", true);
        fs::create_dir_all(&target).unwrap();
        fs::write(target.join("README.md"), "").unwrap();
        let args = CreateAddonArgs {
            name: "widgets".to_string(),
            core: false,
            minimal: false,
            preview: true,
        };
        let err = handle_create_addon(&ctx, args).await.unwrap_err();
        assert!(matches!(error_class(&err), Some(FsonlineError::Validation(_))));
    }
}
