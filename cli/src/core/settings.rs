//! # FS-Online Settings Resolution
//!
//! File: cli/src/core/settings.rs
//!
//! ## Overview
//!
//! Produces the validated, immutable `Settings` every command works from.
//! Values come from three layers, lowest precedence first:
//!
//! 1. The process environment (only the keys listed in [`KNOWN_KEYS`])
//! 2. The layered env files of the core and instance repositories
//! 3. Explicit overrides (`--env` and `--set KEY=VALUE` on the command line)
//!
//! ## Architecture
//!
//! Resolution runs in fixed stages:
//! - Pick the environment name (override, then process environment, then the
//!   base env files, then `DEV`)
//! - Merge the env files for that environment and layer the values
//! - Check the shape of every value, collecting all violations into one error
//! - Compute the derived directories (Odoo source, core and instance addons)
//!
//! Nothing is cached between calls; each resolution reads the files again.
//!
//! ## Examples
//!
//! ```rust
//! let conventions = Conventions::detect(&Conventions::start_points(None))?;
//! let settings = Settings::resolve(&conventions, &IndexMap::new())?;
//! for (name, path) in settings.all_addon_dirs()?.iter() {
//!     println!("{name}: {}", path.display());
//! }
//! ```
//!
use crate::core::addons::{find_addons, AddonMap};
use crate::core::conventions::Conventions;
use crate::core::envfile::{merge_env_files, EnvironmentName, MergedEnvText, ENVIRONMENT_KEY};
use crate::core::error::{FsonlineError, Result};
use anyhow::bail;
use indexmap::IndexMap;
use std::path::{Component, Path, PathBuf};
use tracing::{debug, info, trace, warn};

pub const CORE_ODOO_SRC_KEY: &str = "CORE_ODOO_SRC";
pub const CORE_ADDON_SRC_KEY: &str = "CORE_ADDON_SRC";
pub const INST_ADDON_SRC_KEY: &str = "INST_ADDON_SRC";
pub const CORE_ADDON_TGT_KEY: &str = "CORE_ADDON_TGT";
pub const INST_ADDON_TGT_KEY: &str = "INST_ADDON_TGT";

/// Keys read from the process environment and accepted as overrides.
pub const KNOWN_KEYS: [&str; 6] = [
    ENVIRONMENT_KEY,
    CORE_ODOO_SRC_KEY,
    CORE_ADDON_SRC_KEY,
    INST_ADDON_SRC_KEY,
    CORE_ADDON_TGT_KEY,
    INST_ADDON_TGT_KEY,
];

const DEFAULT_CORE_ADDON_TGT: &str = "src/DADI";
const DEFAULT_INST_ADDON_TGT: &str = "src_inst";

/// Fully resolved settings for one command run.
#[derive(Debug, Clone)]
pub struct Settings {
    pub env: EnvironmentName,
    pub conventions: Conventions,

    // Raw values, relative to the core (or instance) directory.
    pub core_odoo_src: PathBuf,
    pub core_addon_src: Vec<PathBuf>,
    pub inst_addon_src: Vec<PathBuf>,
    pub core_addon_tgt: PathBuf,
    pub inst_addon_tgt: PathBuf,

    // Computed.
    pub core_odoo_dir: PathBuf,
    pub core_addon_dirs: AddonMap,
    pub inst_addon_dirs: AddonMap,

    pub env_file_data: MergedEnvText,
}

impl Settings {
    /// # Resolve Settings (`resolve`)
    ///
    /// Resolves the settings with the current process environment as the lowest layer.
    ///
    /// # Errors
    ///
    /// See [`Settings::resolve_with_env`].
    pub fn resolve(conventions: &Conventions, overrides: &IndexMap<String, String>) -> Result<Self> {
        let process_env: IndexMap<String, String> = KNOWN_KEYS
            .iter()
            .filter_map(|key| std::env::var(key).ok().map(|value| (key.to_string(), value)))
            .collect();
        Self::resolve_with_env(conventions, overrides, &process_env)
    }

    /// # Resolve Settings From A Snapshot (`resolve_with_env`)
    ///
    /// Same as [`Settings::resolve`], but reads "process environment" values
    /// from `process_env` instead of the real environment.
    ///
    /// # Errors
    ///
    /// - `FsonlineError::Configuration` for an unknown override key, an unknown
    ///   environment name or a malformed env file.
    /// - `FsonlineError::Validation` listing every malformed value, or if the
    ///   Odoo source directory is missing or incomplete.
    /// - `FsonlineError::AddonConfig` from addon discovery.
    pub fn resolve_with_env(
        conventions: &Conventions,
        overrides: &IndexMap<String, String>,
        process_env: &IndexMap<String, String>,
    ) -> Result<Self> {
        let overrides: IndexMap<String, String> = overrides
            .iter()
            .map(|(key, value)| (key.trim().to_ascii_uppercase(), value.clone()))
            .collect();
        let unknown: Vec<&str> = overrides
            .keys()
            .map(String::as_str)
            .filter(|key| !KNOWN_KEYS.contains(key))
            .collect();
        if !unknown.is_empty() {
            bail!(FsonlineError::Configuration(format!(
                "Unknown setting override(s): {} (expected one of: {})",
                unknown.join(", "),
                KNOWN_KEYS.join(", ")
            )));
        }
        let process_env: IndexMap<String, String> = process_env
            .iter()
            .filter(|(key, _)| KNOWN_KEYS.contains(&key.as_str()))
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect();

        let env = resolve_environment(conventions, &overrides, &process_env)?;
        info!("Resolving settings for environment {}", env);

        let env_file_data = merge_env_files(Some(env), &conventions.env_files())?;
        for source in env_file_data.sources() {
            debug!("Loaded env file {:?}", source);
        }
        trace!("Merged env text:\n{}", env_file_data.text());

        let mut values = process_env;
        values.extend(env_file_data.parse()?);
        values.extend(overrides);

        let raw = RawValues::from_layers(&values)?;
        Self::compute(env, conventions, raw, env_file_data)
    }

    fn compute(
        env: EnvironmentName,
        conventions: &Conventions,
        raw: RawValues,
        env_file_data: MergedEnvText,
    ) -> Result<Self> {
        let core_odoo_dir = conventions.core_dir.join(&raw.core_odoo_src);
        if !core_odoo_dir.is_dir() {
            bail!(FsonlineError::Validation(format!(
                "core_odoo_dir {:?} is missing or not a directory",
                core_odoo_dir
            )));
        }
        if !core_odoo_dir.join("odoo").join("addons").join("base").is_dir() {
            bail!(FsonlineError::Validation(format!(
                "No Odoo sources found in core_odoo_dir {:?} (missing odoo/addons/base)",
                core_odoo_dir
            )));
        }

        let core_addon_dirs = if raw.core_addon_src.is_empty() {
            AddonMap::new()
        } else {
            find_addons(
                &raw.core_addon_src,
                Some(&conventions.core_dir),
                &conventions.manifest_name,
            )?
        };

        let inst_addon_dirs = match &conventions.inst_dir {
            Some(inst_dir) if !raw.inst_addon_src.is_empty() => {
                find_addons(&raw.inst_addon_src, Some(inst_dir), &conventions.manifest_name)?
            }
            None if !raw.inst_addon_src.is_empty() => {
                warn!(
                    "{} is set but this is a core repository; ignoring it",
                    INST_ADDON_SRC_KEY
                );
                AddonMap::new()
            }
            _ => AddonMap::new(),
        };

        let settings = Settings {
            env,
            conventions: conventions.clone(),
            core_odoo_src: raw.core_odoo_src,
            core_addon_src: raw.core_addon_src,
            inst_addon_src: raw.inst_addon_src,
            core_addon_tgt: raw.core_addon_tgt,
            inst_addon_tgt: raw.inst_addon_tgt,
            core_odoo_dir,
            core_addon_dirs,
            inst_addon_dirs,
            env_file_data,
        };

        // Surface core/instance name clashes now instead of halfway through a tree build.
        let all = settings.all_addon_dirs()?;
        if all.is_empty() {
            info!("No core or instance addons configured");
        }
        debug!("Addons: {:?}", all.names().collect::<Vec<_>>());
        Ok(settings)
    }

    /// Core addons followed by instance addons.
    ///
    /// # Errors
    ///
    /// `FsonlineError::AddonConfig` if an instance addon reuses a core addon name.
    pub fn all_addon_dirs(&self) -> Result<AddonMap> {
        let mut all = self.core_addon_dirs.clone();
        all.merge(&self.inst_addon_dirs)?;
        Ok(all)
    }
}

fn resolve_environment(
    conventions: &Conventions,
    overrides: &IndexMap<String, String>,
    process_env: &IndexMap<String, String>,
) -> Result<EnvironmentName> {
    if let Some(value) = overrides.get(ENVIRONMENT_KEY) {
        debug!("Environment taken from override");
        return Ok(value.parse()?);
    }
    if let Some(value) = process_env.get(ENVIRONMENT_KEY) {
        debug!("Environment taken from the process environment");
        return Ok(value.parse()?);
    }

    let base = merge_env_files(None, &conventions.env_files())?.parse()?;
    match base.get(ENVIRONMENT_KEY) {
        Some(value) => {
            debug!("Environment taken from the base env files");
            Ok(value.parse()?)
        }
        None => Ok(EnvironmentName::default()),
    }
}

/// Layered values after shape validation, before any filesystem checks.
#[derive(Debug)]
struct RawValues {
    core_odoo_src: PathBuf,
    core_addon_src: Vec<PathBuf>,
    inst_addon_src: Vec<PathBuf>,
    core_addon_tgt: PathBuf,
    inst_addon_tgt: PathBuf,
}

impl RawValues {
    fn from_layers(values: &IndexMap<String, String>) -> Result<Self> {
        let mut violations = Vec::new();

        let core_odoo_src = match values.get(CORE_ODOO_SRC_KEY).map(|v| v.trim()) {
            Some(value) if !value.is_empty() => {
                relative_path(CORE_ODOO_SRC_KEY, value, &mut violations)
            }
            _ => {
                violations.push(format!("{} is required", CORE_ODOO_SRC_KEY));
                PathBuf::new()
            }
        };

        let core_addon_tgt = relative_path(
            CORE_ADDON_TGT_KEY,
            values
                .get(CORE_ADDON_TGT_KEY)
                .map(String::as_str)
                .unwrap_or(DEFAULT_CORE_ADDON_TGT),
            &mut violations,
        );
        let inst_addon_tgt = relative_path(
            INST_ADDON_TGT_KEY,
            values
                .get(INST_ADDON_TGT_KEY)
                .map(String::as_str)
                .unwrap_or(DEFAULT_INST_ADDON_TGT),
            &mut violations,
        );

        let core_addon_src = path_list(CORE_ADDON_SRC_KEY, values, &mut violations);
        let inst_addon_src = path_list(INST_ADDON_SRC_KEY, values, &mut violations);

        if !violations.is_empty() {
            bail!(FsonlineError::Validation(format!(
                "{} invalid setting(s): {}",
                violations.len(),
                violations.join("; ")
            )));
        }

        Ok(RawValues {
            core_odoo_src,
            core_addon_src,
            inst_addon_src,
            core_addon_tgt,
            inst_addon_tgt,
        })
    }
}

fn expand(key: &str, value: &str, violations: &mut Vec<String>) -> PathBuf {
    match shellexpand::full(value.trim()) {
        Ok(expanded) => PathBuf::from(expanded.as_ref()),
        Err(e) => {
            violations.push(format!("{}: {}", key, e));
            PathBuf::from(value.trim())
        }
    }
}

fn relative_path(key: &str, value: &str, violations: &mut Vec<String>) -> PathBuf {
    let path = expand(key, value, violations);
    if let Some(problem) = relative_path_problem(&path) {
        violations.push(format!("{} '{}' {}", key, path.display(), problem));
    }
    path
}

/// Why `path` is unusable as a repository-relative setting, if it is.
pub fn relative_path_problem(path: &Path) -> Option<&'static str> {
    if path.is_absolute() {
        return Some("must be relative");
    }
    if path.as_os_str().len() <= 1 {
        return Some("is too short");
    }
    if path
        .components()
        .all(|c| matches!(c, Component::CurDir | Component::ParentDir))
    {
        return Some("must name a directory below the repository");
    }
    None
}

fn path_list(
    key: &str,
    values: &IndexMap<String, String>,
    violations: &mut Vec<String>,
) -> Vec<PathBuf> {
    let Some(raw) = values.get(key).map(|v| v.trim()) else {
        return Vec::new();
    };
    if raw.is_empty() {
        return Vec::new();
    }

    let items: Vec<String> = if raw.starts_with('[') {
        match serde_json::from_str::<Vec<String>>(raw) {
            Ok(items) => items,
            Err(e) => {
                violations.push(format!("{} is not a valid JSON list of strings: {}", key, e));
                return Vec::new();
            }
        }
    } else {
        raw.split(',').map(str::to_string).collect()
    };

    items
        .iter()
        .map(|item| item.trim())
        .filter(|item| !item.is_empty())
        .map(|item| expand(key, item, violations))
        .collect()
}
