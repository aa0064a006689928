//! # FS-Online Build Configuration
//!
//! File: cli/src/core/build_config.rs
//!
//! ## Overview
//!
//! Describes where `build-odoo` reads Odoo and addon sources from and where it
//! assembles the build tree. The file lives at the repository root as
//! `build.yml` (or `build.toml`):
//!
//! ```yaml
//! odoo:
//!   odoo_src: src/OCA/OCB
//!   odoo_tgt: build/odoo
//!   addons_tgt: build/addons
//!   addons_src:
//!     - src/OCA/web/*
//!     - src/custom/*
//! ```
//!
//! All paths are relative to the repository root. Both targets must lie below
//! `build/`, because `build-odoo` deletes them before every run. The file is
//! fully validated before anything on disk is touched.
//!
use crate::core::error::{FsonlineError, Result};
use crate::core::settings::relative_path_problem;
use anyhow::{bail, Context};
use serde::Deserialize;
use std::fs;
use std::path::{Component, Path, PathBuf};
use tracing::debug;

/// Directory (relative to the repository root) that holds every build output.
pub const BUILD_DIR_NAME: &str = "build";

#[derive(Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct BuildConfig {
    pub odoo: OdooBuildConfig,
}

#[derive(Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct OdooBuildConfig {
    /// Odoo checkout (the directory containing `odoo-bin`).
    pub odoo_src: PathBuf,
    #[serde(default = "default_odoo_tgt")]
    pub odoo_tgt: PathBuf,
    #[serde(default = "default_addons_tgt")]
    pub addons_tgt: PathBuf,
    /// Additional addon search paths; wildcards allowed.
    #[serde(default)]
    pub addons_src: Vec<PathBuf>,
}

fn default_odoo_tgt() -> PathBuf {
    PathBuf::from(BUILD_DIR_NAME).join("odoo")
}
fn default_addons_tgt() -> PathBuf {
    PathBuf::from(BUILD_DIR_NAME).join("addons")
}

/// Absolute locations derived from a validated `BuildConfig`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildLayout {
    pub build_root: PathBuf,
    pub odoo_src: PathBuf,
    pub odoo_tgt: PathBuf,
    pub addons_tgt: PathBuf,
}

impl BuildConfig {
    /// # Load Build Config (`load`)
    ///
    /// Parses `path` as YAML (`.yml`, `.yaml`) or TOML (`.toml`) and validates it.
    ///
    /// # Errors
    ///
    /// `FsonlineError::Configuration` if the file is missing, unparsable, of an
    /// unknown type, or fails [`BuildConfig::validate`].
    pub fn load(path: &Path) -> Result<Self> {
        if !path.is_file() {
            bail!(FsonlineError::Configuration(format!(
                "Build configuration {:?} not found",
                path
            )));
        }
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read build configuration {:?}", path))?;

        let extension = path
            .extension()
            .map(|ext| ext.to_string_lossy().to_ascii_lowercase())
            .unwrap_or_default();
        let config = match extension.as_str() {
            "yml" | "yaml" => Self::from_yaml_str(&content),
            "toml" => Self::from_toml_str(&content),
            other => bail!(FsonlineError::Configuration(format!(
                "Unsupported build configuration type '{}' for {:?}",
                other, path
            ))),
        }
        .with_context(|| format!("Invalid build configuration {:?}", path))?;

        debug!("Loaded build configuration from {:?}: {:?}", path, config);
        Ok(config)
    }

    pub fn from_yaml_str(content: &str) -> Result<Self> {
        let config: BuildConfig = serde_yaml::from_str(content)
            .map_err(|e| FsonlineError::Configuration(format!("YAML parse error: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: BuildConfig = toml::from_str(content)
            .map_err(|e| FsonlineError::Configuration(format!("TOML parse error: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Checks path shapes only; nothing on disk is consulted.
    pub fn validate(&self) -> Result<()> {
        let odoo = &self.odoo;
        let mut paths: Vec<(&str, &Path)> = vec![
            ("odoo_src", odoo.odoo_src.as_path()),
            ("odoo_tgt", odoo.odoo_tgt.as_path()),
            ("addons_tgt", odoo.addons_tgt.as_path()),
        ];
        paths.extend(odoo.addons_src.iter().map(|p| ("addons_src", p.as_path())));

        for (key, path) in paths {
            if let Some(problem) = relative_path_problem(path) {
                bail!(FsonlineError::Configuration(format!(
                    "odoo.{} '{}' {}",
                    key,
                    path.display(),
                    problem
                )));
            }
        }

        for (key, target) in [("odoo_tgt", &odoo.odoo_tgt), ("addons_tgt", &odoo.addons_tgt)] {
            if !is_below_build_dir(target) {
                bail!(FsonlineError::Configuration(format!(
                    "odoo.{} '{}' must be inside '{}/'",
                    key,
                    target.display(),
                    BUILD_DIR_NAME
                )));
            }
        }
        if odoo.odoo_tgt == odoo.addons_tgt {
            bail!(FsonlineError::Configuration(format!(
                "odoo.odoo_tgt and odoo.addons_tgt must differ (both '{}')",
                odoo.odoo_tgt.display()
            )));
        }
        Ok(())
    }

    /// Absolute locations below `repo_dir`.
    pub fn layout(&self, repo_dir: &Path) -> BuildLayout {
        BuildLayout {
            build_root: repo_dir.join(BUILD_DIR_NAME),
            odoo_src: repo_dir.join(&self.odoo.odoo_src),
            odoo_tgt: repo_dir.join(&self.odoo.odoo_tgt),
            addons_tgt: repo_dir.join(&self.odoo.addons_tgt),
        }
    }

    /// Addon search patterns, relative to the repository root.
    ///
    /// Linked builds gather the framework addons (`odoo/addons/*`) as well;
    /// copied builds already carry them inside the copied Odoo tree.
    pub fn addon_search_paths(&self, include_framework_addons: bool) -> Vec<PathBuf> {
        let odoo_src = &self.odoo.odoo_src;
        let mut patterns = Vec::new();
        if include_framework_addons {
            patterns.push(odoo_src.join("odoo").join("addons").join("*"));
        }
        patterns.push(odoo_src.join("addons").join("*"));
        patterns.extend(self.odoo.addons_src.iter().cloned());
        patterns
    }
}

/// `true` if `path` is `build/<something>` without any `..` escaping it.
fn is_below_build_dir(path: &Path) -> bool {
    let mut components = path.components();
    let first_is_build = matches!(
        components.next(),
        Some(Component::Normal(name)) if name == BUILD_DIR_NAME
    );
    let rest: Vec<Component> = components.collect();
    first_is_build
        && !rest.is_empty()
        && rest.iter().all(|c| matches!(c, Component::Normal(_)))
}
