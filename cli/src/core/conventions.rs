//! # FS-Online Repository Conventions
//!
//! File: cli/src/core/conventions.rs
//!
//! ## Overview
//!
//! Detects which kind of FS-Online checkout the tool is running in and derives
//! every well-known directory and file name from it.
//!
//! - A **core** repository carries a `.core` marker file at its root.
//! - An **instance** repository embeds the core repository one level below its
//!   own root and carries an `.instance` marker file next to it:
//!
//! ```text
//! aiat/                 <- instance root (repo_dir)
//!   .instance
//!   inst.env
//!   fsonline/           <- core root
//!     .core
//!     core.env
//! ```
//!
//! The resulting `Conventions` value is built once at startup and passed by
//! reference to everything that needs a path.
//!
use crate::core::error::{FsonlineError, Result};
use anyhow::bail;
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

pub const CORE_MARKER: &str = ".core";
pub const INSTANCE_MARKER: &str = ".instance";
pub const VCS_MARKER: &str = ".git";
pub const ODOO_MANIFEST_NAME: &str = "__manifest__.py";
pub const CORE_ENV_NAME: &str = "core.env";
pub const INST_ENV_NAME: &str = "inst.env";
/// Build configuration file names, in lookup order.
pub const BUILD_CONFIG_NAMES: [&str; 2] = ["build.yml", "build.toml"];

/// Whether the checkout is the core repository itself or an instance on top of it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RepositoryMode {
    Core,
    Instance,
}

impl fmt::Display for RepositoryMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RepositoryMode::Core => f.write_str("core"),
            RepositoryMode::Instance => f.write_str("instance"),
        }
    }
}

/// Resolved absolute locations of the repository layout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Conventions {
    pub mode: RepositoryMode,
    pub core_dir: PathBuf,
    pub inst_dir: Option<PathBuf>,
    /// The outermost repository: `inst_dir` in instance mode, `core_dir` otherwise.
    pub repo_dir: PathBuf,
    pub tools_dir: PathBuf,
    pub templates_dir: PathBuf,
    pub dev_dir: PathBuf,
    pub stg_dir: PathBuf,
    pub prd_dir: PathBuf,
    pub dev_fson_tgt_dir: PathBuf,
    pub core_env_file: PathBuf,
    pub inst_env_file: Option<PathBuf>,
    pub build_config_file: PathBuf,
    pub manifest_name: String,
}

impl Conventions {
    /// # Detect Conventions (`detect`)
    ///
    /// Walks upward from each start point in turn and uses the first directory
    /// holding a `.core` marker file as the core root.
    ///
    /// # Errors
    ///
    /// - `FsonlineError::Configuration` if no start point lies inside a core repository.
    /// - `FsonlineError::Validation` if the detected layout violates its invariants.
    pub fn detect(start_points: &[PathBuf]) -> Result<Self> {
        for start in start_points {
            let start = match start.canonicalize() {
                Ok(p) => p,
                Err(e) => {
                    debug!("Skipping start point {:?}: {}", start, e);
                    continue;
                }
            };
            if let Some(core_dir) = find_core_root(&start) {
                debug!("Found {} marker in {:?}", CORE_MARKER, core_dir);
                return Self::from_core_dir(core_dir);
            }
        }

        bail!(FsonlineError::Configuration(format!(
            "No '{}' marker found above any of {:?}. Run this tool from within an FS-Online repository or pass --core-dir.",
            CORE_MARKER, start_points
        )))
    }

    /// Start points for [`Conventions::detect`]: the explicit directory if one
    /// was given, otherwise the executable's directory and the working directory.
    pub fn start_points(explicit: Option<&Path>) -> Vec<PathBuf> {
        if let Some(dir) = explicit {
            return vec![dir.to_path_buf()];
        }

        let mut points = Vec::new();
        if let Some(exe_dir) = std::env::current_exe()
            .ok()
            .and_then(|exe| exe.parent().map(Path::to_path_buf))
        {
            points.push(exe_dir);
        }
        if let Ok(cwd) = std::env::current_dir() {
            points.push(cwd);
        }
        points
    }

    /// Derives the full layout from a known core root.
    pub fn from_core_dir(core_dir: PathBuf) -> Result<Self> {
        let inst_dir = core_dir
            .parent()
            .filter(|parent| parent.join(INSTANCE_MARKER).is_file())
            .map(Path::to_path_buf);

        let mode = if inst_dir.is_some() {
            RepositoryMode::Instance
        } else {
            RepositoryMode::Core
        };

        let repo_dir = inst_dir.clone().unwrap_or_else(|| core_dir.clone());
        let tools_dir = core_dir.join("tools");
        let dev_dir = repo_dir.join("dev");

        let conventions = Conventions {
            mode,
            templates_dir: tools_dir.join("copier-templates"),
            tools_dir,
            inst_env_file: inst_dir.as_ref().map(|dir| dir.join(INST_ENV_NAME)),
            core_env_file: core_dir.join(CORE_ENV_NAME),
            stg_dir: repo_dir.join("stg"),
            prd_dir: repo_dir.join("prd"),
            dev_fson_tgt_dir: dev_dir.join("fsonline"),
            dev_dir,
            build_config_file: locate_build_config(&repo_dir),
            manifest_name: ODOO_MANIFEST_NAME.to_string(),
            core_dir,
            inst_dir,
            repo_dir,
        };
        conventions.validate()?;

        info!(
            "Detected {} repository at {:?}",
            conventions.mode, conventions.repo_dir
        );
        Ok(conventions)
    }

    pub fn is_instance(&self) -> bool {
        self.mode == RepositoryMode::Instance
    }

    /// Base env files in merge order: core first, then instance.
    pub fn env_files(&self) -> Vec<Option<PathBuf>> {
        vec![Some(self.core_env_file.clone()), self.inst_env_file.clone()]
    }

    fn validate(&self) -> Result<()> {
        if !self.repo_dir.is_absolute() {
            bail!(FsonlineError::Validation(format!(
                "Repository root {:?} must be absolute",
                self.repo_dir
            )));
        }
        if self.repo_dir.parent().is_none() {
            bail!(FsonlineError::Validation(format!(
                "Repository root {:?} can not be the filesystem root",
                self.repo_dir
            )));
        }

        for dir in std::iter::once(&self.core_dir).chain(self.inst_dir.iter()) {
            // A submodule checkout has a `.git` file instead of a directory.
            if !dir.join(VCS_MARKER).exists() {
                bail!(FsonlineError::Validation(format!(
                    "{:?} has no {} marker inside",
                    dir, VCS_MARKER
                )));
            }
        }
        Ok(())
    }
}

fn find_core_root(start: &Path) -> Option<PathBuf> {
    start
        .ancestors()
        .find(|dir| dir.join(CORE_MARKER).is_file())
        .map(Path::to_path_buf)
}

fn locate_build_config(repo_dir: &Path) -> PathBuf {
    BUILD_CONFIG_NAMES
        .iter()
        .map(|name| repo_dir.join(name))
        .find(|path| path.is_file())
        .unwrap_or_else(|| repo_dir.join(BUILD_CONFIG_NAMES[0]))
}
