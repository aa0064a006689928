//! # FS-Online Addon Discovery
//!
//! File: cli/src/core/addons.rs
//!
//! ## Overview
//!
//! Expands addon search paths (shell-style wildcards allowed) into a map of
//! addon name to absolute directory. A directory counts as an addon when it
//! directly contains the Odoo manifest file.
//!
//! Odoo resolves addons by directory name, so two addons with the same name
//! can never both be installed. Discovery therefore refuses a second path for
//! a name it has already seen, naming both locations.
//!
use crate::core::error::{FsonlineError, Result};
use anyhow::bail;
use glob::Pattern;
use indexmap::IndexMap;
use std::path::{Path, PathBuf};
use tracing::{debug, trace};

/// Insertion-ordered `addon name -> directory` map with unique names.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AddonMap {
    addons: IndexMap<String, PathBuf>,
}

impl AddonMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an addon. Re-adding the same name with a path resolving to the same
    /// directory is a no-op; the first path is kept.
    ///
    /// # Errors
    ///
    /// `FsonlineError::AddonConfig` if `name` is already mapped to a different directory.
    pub fn insert(&mut self, name: impl Into<String>, path: impl Into<PathBuf>) -> Result<()> {
        let name = name.into();
        let path = path.into();

        if let Some(existing) = self.get(&name) {
            if same_directory(existing, &path) {
                trace!("Addon '{}' already registered at {:?}", name, path);
                return Ok(());
            }
            bail!(FsonlineError::AddonConfig(format!(
                "Addon '{}' found in two locations: {:?} and {:?}",
                name, existing, path
            )));
        }

        self.addons.insert(name, path);
        Ok(())
    }

    /// Appends every entry of `other`, applying the same collision rule as [`AddonMap::insert`].
    pub fn merge(&mut self, other: &AddonMap) -> Result<()> {
        for (name, path) in other.iter() {
            self.insert(name, path)?;
        }
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&Path> {
        self.addons.get(name).map(PathBuf::as_path)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Path)> {
        self.addons
            .iter()
            .map(|(name, path)| (name.as_str(), path.as_path()))
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.addons.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.addons.len()
    }

    pub fn is_empty(&self) -> bool {
        self.addons.is_empty()
    }
}

/// Lexically equal, or both resolving to the same existing directory.
fn same_directory(a: &Path, b: &Path) -> bool {
    if a == b {
        return true;
    }
    match (a.canonicalize(), b.canonicalize()) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}

/// # Find Addons (`find_addons`)
///
/// Expands each search pattern and collects every matched directory that
/// contains `manifest`.
///
/// - Patterns are de-duplicated, keeping the first occurrence.
/// - Relative patterns are joined onto `base_dir`. Wildcard characters inside
///   `base_dir` itself are escaped, so only the pattern part is expanded.
/// - Expansion is sorted, so the result order only depends on the patterns and
///   the directory names.
///
/// # Errors
///
/// - `FsonlineError::Configuration` if `base_dir` is relative, or if a pattern is
///   relative and no `base_dir` was given, or if a pattern is malformed.
/// - `FsonlineError::Validation` if `base_dir` is not an existing directory.
/// - `FsonlineError::AddonConfig` if a pattern matches no directory at all, if
///   a matched directory cannot be read, or if the same addon name is found in
///   two different directories.
pub fn find_addons(
    patterns: &[PathBuf],
    base_dir: Option<&Path>,
    manifest: &str,
) -> Result<AddonMap> {
    if let Some(base) = base_dir {
        if !base.is_absolute() {
            bail!(FsonlineError::Configuration(format!(
                "Addon search base {:?} must be absolute",
                base
            )));
        }
        if !base.is_dir() {
            bail!(FsonlineError::Validation(format!(
                "Addon search base {:?} is not an existing directory",
                base
            )));
        }
    }

    let mut unique: Vec<&PathBuf> = Vec::with_capacity(patterns.len());
    for pattern in patterns {
        if !unique.contains(&pattern) {
            unique.push(pattern);
        }
    }

    let mut addons = AddonMap::new();
    for pattern in unique {
        let expression = glob_expression(pattern, base_dir)?;
        debug!("Searching addons in '{}'", expression);

        let mut matched: Vec<PathBuf> = glob::glob(&expression)
            .map_err(|e| {
                FsonlineError::Configuration(format!(
                    "Invalid addon search pattern '{}': {}",
                    expression, e
                ))
            })?
            .filter(|entry| entry.as_ref().map_or(true, |path| path.is_dir()))
            .collect::<std::result::Result<_, _>>()
            .map_err(|e: glob::GlobError| {
                FsonlineError::AddonConfig(format!(
                    "Cannot search addons in {:?}: {}",
                    e.path(),
                    e.error()
                ))
            })?;
        matched.sort();

        if matched.is_empty() {
            bail!(FsonlineError::AddonConfig(format!(
                "Addon search path '{}' matched no directory",
                expression
            )));
        }

        for dir in matched {
            if !dir.join(manifest).is_file() {
                trace!("Skipping {:?}: no {}", dir, manifest);
                continue;
            }
            let Some(name) = dir.file_name().map(|n| n.to_string_lossy().into_owned()) else {
                continue;
            };
            addons.insert(name, dir)?;
        }
    }

    debug!("Found {} addons", addons.len());
    Ok(addons)
}

fn glob_expression(pattern: &Path, base_dir: Option<&Path>) -> Result<String> {
    if pattern.is_absolute() {
        return Ok(pattern.to_string_lossy().into_owned());
    }
    match base_dir {
        Some(base) => Ok(format!(
            "{}/{}",
            Pattern::escape(&base.to_string_lossy()),
            pattern.to_string_lossy()
        )),
        None => bail!(FsonlineError::Configuration(format!(
            "Addon search path {:?} is relative but no base directory was given",
            pattern
        ))),
    }
}
