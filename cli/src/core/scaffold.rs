//! # FS-Online Scaffolding Post-Processor
//!
//! File: cli/src/core/scaffold.rs
//!
//! ## Overview
//!
//! After `copier` has generated files into an addon, the addon's Python
//! packages and its manifest have to know about them. `PostProcessor` reads
//! the addon structure and brings three files up to date:
//!
//! - `models/__init__.py`: one `from . import <model>` line per model module
//! - `__init__.py`: `from . import models`
//! - the manifest's `'data': [...]` list: every view (`views/**/*.xml`) and
//!   security file (`security/**/*.csv`), sorted, relative to the addon root
//!
//! Init files are only ever extended, never reordered or pruned. A file is
//! written only when its content changes, so running the post-processor
//! twice leaves the addon byte-for-byte identical.
//!
use crate::common::fs::io;
use crate::core::conventions::ODOO_MANIFEST_NAME;
use crate::core::error::{FsonlineError, Result};
use anyhow::Context;
use regex::Regex;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use walkdir::WalkDir;

/// Manifest name used by older templates.
pub const LEGACY_MANIFEST_NAME: &str = "manifest.py";

const MODEL_IGNORE_FILES: [&str; 3] = ["__init__.py", ODOO_MANIFEST_NAME, LEGACY_MANIFEST_NAME];
const DATA_LIST_START: &str = r#"(["'])data["']\s*:\s*\["#;

/// What a post-processing run found and changed.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ProcessReport {
    pub models: Vec<String>,
    pub data_files: Vec<String>,
    pub changed_files: Vec<PathBuf>,
}

pub struct PostProcessor {
    addon_path: PathBuf,
}

impl PostProcessor {
    pub fn new(addon_path: impl Into<PathBuf>) -> Self {
        Self {
            addon_path: addon_path.into(),
        }
    }

    /// # Process Addon (`process`)
    ///
    /// Scans the addon and updates init files and manifest.
    ///
    /// # Errors
    ///
    /// - `FsonlineError::Validation` if the addon has no manifest.
    /// - I/O errors with context.
    pub fn process(&self) -> Result<ProcessReport> {
        info!("Checking addon: {:?}", self.addon_path);
        let manifest = self.manifest_path()?;

        let models = self.model_entries()?;
        let mut data: BTreeSet<String> = BTreeSet::new();
        data.extend(self.relative_files("views", "xml")?);
        data.extend(self.relative_files("security", "csv")?);
        let data_files: Vec<String> = data.into_iter().collect();

        let mut report = ProcessReport {
            models,
            data_files,
            changed_files: Vec::new(),
        };

        if !report.models.is_empty() {
            let model_lines: Vec<String> = report
                .models
                .iter()
                .map(|model| format!("from . import {}", model))
                .collect();
            let models_init = self.addon_path.join("models").join("__init__.py");
            if ensure_file_has_lines(&models_init, &model_lines)? {
                report.changed_files.push(models_init);
            }

            let addon_init = self.addon_path.join("__init__.py");
            if ensure_file_has_lines(&addon_init, &["from . import models".to_string()])? {
                report.changed_files.push(addon_init);
            }
        }

        if rewrite_manifest_data(&manifest, &report.data_files)? {
            report.changed_files.push(manifest);
        }

        info!(
            "Post-processed {:?}: {} model(s), {} data file(s), {} file(s) changed",
            self.addon_path,
            report.models.len(),
            report.data_files.len(),
            report.changed_files.len()
        );
        Ok(report)
    }

    /// `__manifest__.py`, falling back to `manifest.py`.
    fn manifest_path(&self) -> Result<PathBuf> {
        find_manifest(&self.addon_path).ok_or_else(|| {
            anyhow::anyhow!(FsonlineError::Validation(format!(
                "No {} or {} in addon {:?}",
                ODOO_MANIFEST_NAME, LEGACY_MANIFEST_NAME, self.addon_path
            )))
        })
    }

    /// Module names of the Python files directly inside `models/`.
    fn model_entries(&self) -> Result<Vec<String>> {
        let models_dir = self.addon_path.join("models");
        if !models_dir.is_dir() {
            return Ok(Vec::new());
        }

        let mut models = Vec::new();
        for entry in WalkDir::new(&models_dir).min_depth(1).max_depth(1).sort_by_file_name() {
            let entry = entry.with_context(|| format!("Failed to walk {:?}", models_dir))?;
            let path = entry.path();
            let name = entry.file_name().to_string_lossy().to_ascii_lowercase();
            if !entry.file_type().is_file()
                || path.extension().map_or(true, |ext| ext != "py")
                || MODEL_IGNORE_FILES.contains(&name.as_str())
            {
                continue;
            }
            if let Some(stem) = path.file_stem() {
                models.push(stem.to_string_lossy().into_owned());
            }
        }
        Ok(models)
    }

    /// Files with `extension` anywhere below `sub_dir`, as `/`-separated paths
    /// relative to the addon root.
    fn relative_files(&self, sub_dir: &str, extension: &str) -> Result<Vec<String>> {
        let dir = self.addon_path.join(sub_dir);
        if !dir.is_dir() {
            return Ok(Vec::new());
        }

        let mut files = Vec::new();
        for entry in WalkDir::new(&dir).sort_by_file_name() {
            let entry = entry.with_context(|| format!("Failed to walk {:?}", dir))?;
            if !entry.file_type().is_file()
                || entry.path().extension().map_or(true, |ext| ext != extension)
            {
                continue;
            }
            let relative = entry
                .path()
                .strip_prefix(&self.addon_path)
                .with_context(|| format!("{:?} is outside the addon", entry.path()))?;
            let parts: Vec<String> = relative
                .components()
                .map(|c| c.as_os_str().to_string_lossy().into_owned())
                .collect();
            files.push(parts.join("/"));
        }
        Ok(files)
    }
}

/// Returns the manifest file of `addon_dir`, preferring `__manifest__.py`.
pub fn find_manifest(addon_dir: &Path) -> Option<PathBuf> {
    [ODOO_MANIFEST_NAME, LEGACY_MANIFEST_NAME]
        .iter()
        .map(|name| addon_dir.join(name))
        .find(|path| path.is_file())
}

/// Appends every line of `lines` that `path` does not contain yet.
/// Creates the file if missing. Returns `true` if the file was written.
fn ensure_file_has_lines(path: &Path, lines: &[String]) -> Result<bool> {
    let existing = if path.is_file() {
        io::read_file_to_string(path)?
    } else {
        String::new()
    };

    let mut content = existing.clone();
    for line in lines {
        if content.lines().any(|l| l.trim() == line.trim()) {
            continue;
        }
        if !content.is_empty() && !content.ends_with('\n') {
            content.push('\n');
        }
        content.push_str(line);
        content.push('\n');
    }

    if content == existing && path.is_file() {
        return Ok(false);
    }
    io::write_if_changed(path, &content)
}

/// Formats the manifest `data` list.
pub fn format_data_list(data_files: &[String]) -> String {
    if data_files.is_empty() {
        return "'data': []".to_string();
    }
    let items: Vec<String> = data_files
        .iter()
        .map(|file| format!("        '{}'", file))
        .collect();
    format!("'data': [\n{}\n    ]", items.join(",\n"))
}

/// Byte length of a list body up to and including its closing `]`, given the
/// text right after the opening `[`. Brackets inside strings and `#` comments
/// are ignored.
fn list_body_len(text: &str) -> Option<usize> {
    let mut depth = 1usize;
    let mut quote: Option<char> = None;
    let mut escaped = false;
    let mut comment = false;
    for (index, c) in text.char_indices() {
        if comment {
            comment = c != '\n';
            continue;
        }
        if let Some(open) = quote {
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == open {
                quote = None;
            }
            continue;
        }
        match c {
            '\'' | '"' => quote = Some(c),
            '#' => comment = true,
            '[' => depth += 1,
            ']' => {
                depth -= 1;
                if depth == 0 {
                    return Some(index + 1);
                }
            }
            _ => {}
        }
    }
    None
}

/// Replaces the first `'data': [...]` list in the manifest. Returns `true` if the file changed.
fn rewrite_manifest_data(manifest: &Path, data_files: &[String]) -> Result<bool> {
    let content = io::read_file_to_string(manifest)?;
    let pattern = Regex::new(DATA_LIST_START)?;
    let span = pattern.find(&content).and_then(|start| {
        list_body_len(&content[start.end()..]).map(|len| (start.start(), start.end() + len))
    });

    let Some((start, end)) = span else {
        if data_files.is_empty() {
            debug!("No data list in {:?} and nothing to add", manifest);
        } else {
            warn!(
                "No 'data' list found in {:?}; {} data file(s) not registered",
                manifest,
                data_files.len()
            );
        }
        return Ok(false);
    };

    let updated = format!(
        "{}{}{}",
        &content[..start],
        format_data_list(data_files),
        &content[end..]
    );
    io::write_if_changed(manifest, &updated)
}

// --- Unit Tests ---
#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::error::error_class;
    use std::fs;
    use tempfile::tempdir;

    const MANIFEST: &str = "{\n    'name': 'Widgets',\n    'depends': ['base'],\n    'data': [\n        'views/old.xml',\n    ],\n    'installable': True,\n}\n";

    fn scaffolded_addon(root: &Path) -> PathBuf {
        let addon = root.join("widgets");
        fs::create_dir_all(addon.join("models")).unwrap();
        fs::create_dir_all(addon.join("views/wizards")).unwrap();
        fs::create_dir_all(addon.join("security")).unwrap();
        fs::write(addon.join(ODOO_MANIFEST_NAME), MANIFEST).unwrap();
        fs::write(addon.join("models/car.py"), "class Car: pass\n").unwrap();
        fs::write(addon.join("models/bike.py"), "class Bike: pass\n").unwrap();
        fs::write(addon.join("models/__init__.py"), "from . import bike\n").unwrap();
        fs::write(addon.join("models/notes.txt"), "").unwrap();
        fs::write(addon.join("views/car.xml"), "<odoo/>").unwrap();
        fs::write(addon.join("views/wizards/assign.xml"), "<odoo/>").unwrap();
        fs::write(addon.join("security/ir.model.access.csv"), "id\n").unwrap();
        addon
    }

    #[test]
    fn test_process_updates_init_files_and_manifest() -> Result<()> {
        let dir = tempdir()?;
        let addon = scaffolded_addon(dir.path());

        let report = PostProcessor::new(&addon).process()?;
        assert_eq!(report.models, vec!["bike", "car"]);
        assert_eq!(
            report.data_files,
            vec![
                "security/ir.model.access.csv",
                "views/car.xml",
                "views/wizards/assign.xml",
            ]
        );

        assert_eq!(
            fs::read_to_string(addon.join("models/__init__.py"))?,
            "from . import bike\nfrom . import car\n"
        );
        assert_eq!(fs::read_to_string(addon.join("__init__.py"))?, "from . import models\n");

        let manifest = fs::read_to_string(addon.join(ODOO_MANIFEST_NAME))?;
        assert!(manifest.contains(
            "'data': [\n        'security/ir.model.access.csv',\n        'views/car.xml',\n        'views/wizards/assign.xml'\n    ],"
        ));
        assert!(!manifest.contains("views/old.xml"));
        assert!(manifest.contains("'depends': ['base']"));
        assert!(manifest.contains("'installable': True"));
        Ok(())
    }

    #[test]
    fn test_second_run_is_byte_identical() -> Result<()> {
        let dir = tempdir()?;
        let addon = scaffolded_addon(dir.path());
        PostProcessor::new(&addon).process()?;

        let snapshot: Vec<String> = ["__init__.py", "models/__init__.py", ODOO_MANIFEST_NAME]
            .iter()
            .map(|f| fs::read_to_string(addon.join(f)).unwrap())
            .collect();

        let report = PostProcessor::new(&addon).process()?;
        assert!(report.changed_files.is_empty());
        let again: Vec<String> = ["__init__.py", "models/__init__.py", ODOO_MANIFEST_NAME]
            .iter()
            .map(|f| fs::read_to_string(addon.join(f)).unwrap())
            .collect();
        assert_eq!(snapshot, again);
        Ok(())
    }

    #[test]
    fn test_existing_init_lines_are_kept() -> Result<()> {
        let dir = tempdir()?;
        let addon = scaffolded_addon(dir.path());
        fs::write(addon.join("__init__.py"), "from . import controllers")?;
        PostProcessor::new(&addon).process()?;
        assert_eq!(
            fs::read_to_string(addon.join("__init__.py"))?,
            "from . import controllers\nfrom . import models\n"
        );
        Ok(())
    }

    #[test]
    fn test_addon_without_models_gets_no_init_files() -> Result<()> {
        let dir = tempdir()?;
        let addon = dir.path().join("theme");
        fs::create_dir_all(addon.join("views"))?;
        fs::write(addon.join(LEGACY_MANIFEST_NAME), "{\"data\": []}\n")?;
        fs::write(addon.join("views/layout.xml"), "<odoo/>")?;

        let report = PostProcessor::new(&addon).process()?;
        assert!(report.models.is_empty());
        assert!(!addon.join("__init__.py").exists());
        assert!(!addon.join("models").exists());
        assert_eq!(
            fs::read_to_string(addon.join(LEGACY_MANIFEST_NAME))?,
            "{'data': [\n        'views/layout.xml'\n    ]}\n"
        );
        Ok(())
    }

    #[test]
    fn test_missing_manifest_is_validation_error() {
        let dir = tempdir().unwrap();
        let err = PostProcessor::new(dir.path()).process().unwrap_err();
        assert!(matches!(error_class(&err), Some(FsonlineError::Validation(_))));
    }

    #[test]
    fn test_data_list_with_brackets_in_strings_and_comments() -> Result<()> {
        let dir = tempdir()?;
        let manifest = dir.path().join(ODOO_MANIFEST_NAME);
        fs::write(
            &manifest,
            "{\n    'data': [\n        # old views ] moved\n        'views/legacy].xml',\n        \"report/[draft].xml\",\n    ],\n    'demo': ['demo/demo.xml'],\n}\n",
        )?;

        assert!(rewrite_manifest_data(&manifest, &["views/car.xml".to_string()])?);
        assert_eq!(
            fs::read_to_string(&manifest)?,
            "{\n    'data': [\n        'views/car.xml'\n    ],\n    'demo': ['demo/demo.xml'],\n}\n"
        );
        Ok(())
    }

    #[test]
    fn test_unterminated_data_list_is_left_alone() -> Result<()> {
        let dir = tempdir()?;
        let manifest = dir.path().join(ODOO_MANIFEST_NAME);
        fs::write(&manifest, "{'data': ['views/a.xml',\n")?;
        assert!(!rewrite_manifest_data(&manifest, &["views/car.xml".to_string()])?);
        assert_eq!(fs::read_to_string(&manifest)?, "{'data': ['views/a.xml',\n");
        Ok(())
    }

    #[test]
    fn test_format_data_list() {
        assert_eq!(format_data_list(&[]), "'data': []");
        assert_eq!(
            format_data_list(&["views/a.xml".to_string()]),
            "'data': [\n        'views/a.xml'\n    ]"
        );
    }
}
