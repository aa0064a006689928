//! # FS-Online Layered Env Files
//!
//! File: cli/src/core/envfile.rs
//!
//! ## Overview
//!
//! Settings are read from flat `KEY=VALUE` files that can be layered per
//! checkout and per environment. For every base file (`core.env`, then
//! `inst.env`) the following candidates are read in order, each one skipped
//! silently when it does not exist:
//!
//! 1. `<base>`
//! 2. `<base>.local`
//! 3. `<base>.<env>` (only when a target environment is given)
//! 4. `<base>.<env>.local` (only when a target environment is given)
//!
//! Later files override earlier ones key by key. Every call builds a fresh
//! `MergedEnvText`, so two resolutions in the same process never see each
//! other's content.
//!
use crate::core::error::{FsonlineError, Result};
use anyhow::{bail, Context};
use indexmap::IndexMap;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::debug;

/// Process environment variable (and settings key) selecting the environment.
pub const ENVIRONMENT_KEY: &str = "FSONLINE_ENVIRONMENT";

/// Deployment environment the settings are resolved for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EnvironmentName {
    #[default]
    Dev,
    Stg,
    Prd,
}

impl EnvironmentName {
    pub const ALL: [EnvironmentName; 3] = [
        EnvironmentName::Dev,
        EnvironmentName::Stg,
        EnvironmentName::Prd,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            EnvironmentName::Dev => "DEV",
            EnvironmentName::Stg => "STG",
            EnvironmentName::Prd => "PRD",
        }
    }

    /// Suffix used for environment-specific env files, e.g. `core.env.dev`.
    pub fn file_suffix(&self) -> &'static str {
        match self {
            EnvironmentName::Dev => "dev",
            EnvironmentName::Stg => "stg",
            EnvironmentName::Prd => "prd",
        }
    }
}

impl fmt::Display for EnvironmentName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EnvironmentName {
    type Err = FsonlineError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let wanted = s.trim();
        EnvironmentName::ALL
            .into_iter()
            .find(|env| env.as_str().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| {
                FsonlineError::Configuration(format!(
                    "Unknown environment '{}' for {}. Expected one of DEV, STG, PRD.",
                    s, ENVIRONMENT_KEY
                ))
            })
    }
}

/// The content of one env file that took part in a merge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnvSegment {
    pub path: PathBuf,
    pub content: String,
}

/// Ordered content of every env file found for one resolution.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MergedEnvText {
    segments: Vec<EnvSegment>,
}

impl MergedEnvText {
    pub fn sources(&self) -> impl Iterator<Item = &Path> {
        self.segments.iter().map(|segment| segment.path.as_path())
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// Concatenated text. Each file is newline-terminated so that the last line
    /// of one file never runs into the first line of the next.
    pub fn text(&self) -> String {
        let mut text = String::new();
        for segment in &self.segments {
            text.push_str(&segment.content);
            if !segment.content.is_empty() && !segment.content.ends_with('\n') {
                text.push('\n');
            }
        }
        text
    }

    /// Parses all segments in order; the last occurrence of a key wins.
    pub fn parse(&self) -> Result<IndexMap<String, String>> {
        let mut values = IndexMap::new();
        for segment in &self.segments {
            let parsed = parse_env_text(&segment.content)
                .with_context(|| format!("Failed to parse env file {:?}", segment.path))?;
            values.extend(parsed);
        }
        Ok(values)
    }
}

/// # Candidate Files (`candidate_files`)
///
/// Lists the files checked for one base file, lowest precedence first.
pub fn candidate_files(base: &Path, target_env: Option<EnvironmentName>) -> Vec<PathBuf> {
    let name = base
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();

    let mut files = vec![
        base.to_path_buf(),
        base.with_file_name(format!("{name}.local")),
    ];
    if let Some(env) = target_env {
        let suffix = env.file_suffix();
        files.push(base.with_file_name(format!("{name}.{suffix}")));
        files.push(base.with_file_name(format!("{name}.{suffix}.local")));
    }
    files
}

/// # Merge Env Files (`merge_env_files`)
///
/// Reads every existing candidate of every base file in precedence order.
/// `None` entries (e.g. the instance env file of a core checkout) are skipped.
///
/// # Errors
///
/// Returns an `Err` if an existing candidate cannot be read.
pub fn merge_env_files(
    target_env: Option<EnvironmentName>,
    files: &[Option<PathBuf>],
) -> Result<MergedEnvText> {
    let mut merged = MergedEnvText::default();

    for base in files.iter().flatten() {
        for candidate in candidate_files(base, target_env) {
            if !candidate.is_file() {
                continue;
            }
            debug!("Merging env file {:?}", candidate);
            let content = fs::read_to_string(&candidate)
                .with_context(|| format!("Failed to read env file {:?}", candidate))?;
            merged.segments.push(EnvSegment {
                path: candidate,
                content,
            });
        }
    }

    Ok(merged)
}

/// # Parse Env Text (`parse_env_text`)
///
/// Parses `KEY=VALUE` lines into an ordered map.
///
/// - Blank lines and lines starting with `#` are ignored.
/// - An `export ` prefix is accepted.
/// - Keys are upper-cased; values are trimmed.
/// - Values wrapped in matching single or double quotes are unquoted verbatim;
///   unquoted values lose a trailing ` # comment`.
///
/// # Errors
///
/// `FsonlineError::Configuration` naming the line for a line without `=` or
/// with an empty key.
pub fn parse_env_text(text: &str) -> Result<IndexMap<String, String>> {
    let mut values = IndexMap::new();

    for (index, raw) in text.lines().enumerate() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let line = line.strip_prefix("export ").unwrap_or(line);

        let Some((key, value)) = line.split_once('=') else {
            bail!(FsonlineError::Configuration(format!(
                "line {}: expected KEY=VALUE, got '{}'",
                index + 1,
                raw
            )));
        };
        let key = key.trim();
        if key.is_empty() {
            bail!(FsonlineError::Configuration(format!(
                "line {}: empty key in '{}'",
                index + 1,
                raw
            )));
        }

        values.insert(key.to_ascii_uppercase(), unquote(value.trim()));
    }

    Ok(values)
}

fn unquote(value: &str) -> String {
    for quote in ['"', '\''] {
        if value.len() >= 2 && value.starts_with(quote) && value.ends_with(quote) {
            return value[1..value.len() - 1].to_string();
        }
    }
    match value.find(" #") {
        Some(pos) => value[..pos].trim_end().to_string(),
        None => value.to_string(),
    }
}
