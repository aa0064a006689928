//! # FS-Online CLI Integration Test Common Helpers
//!
//! File: cli/tests/common.rs
//!
//! ## Overview
//!
//! Shared helpers for the integration tests: a handle on the compiled
//! `fsonline` binary and a throwaway core repository with a miniature Odoo
//! checkout and one custom addon.
//!
//! ```text
//! <tmp>/
//!   .git/  .core  core.env
//!   src/OCA/OCB/odoo-bin
//!   src/OCA/OCB/odoo/__init__.py
//!   src/OCA/OCB/odoo/addons/base/__manifest__.py
//!   src/OCA/OCB/addons/web/__manifest__.py
//!   src/custom/widgets/__manifest__.py
//! ```
//!

// Different test files use different helpers.
#![allow(dead_code)]

pub use assert_cmd::Command;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

pub const CORE_ENV: &str = "CORE_ODOO_SRC=src/OCA/OCB\nCORE_ADDON_SRC=src/custom/*\n";

/// The `fsonline` binary, with settings-related variables from the caller's
/// environment removed so only the fixture decides.
pub fn fsonline_cmd() -> Command {
    let mut cmd = Command::cargo_bin("fsonline").expect("Failed to find fsonline binary for testing");
    for var in [
        "FSONLINE_CORE_DIR",
        "FSONLINE_ENVIRONMENT",
        "CORE_ODOO_SRC",
        "CORE_ADDON_SRC",
        "INST_ADDON_SRC",
        "CORE_ADDON_TGT",
        "INST_ADDON_TGT",
        "LOG_LEVEL",
        "RUST_LOG",
    ] {
        cmd.env_remove(var);
    }
    cmd
}

/// A core repository fixture. The directory lives as long as the value.
pub struct CoreRepo {
    _dir: TempDir,
    pub root: PathBuf,
}

impl CoreRepo {
    pub fn new() -> Self {
        let dir = tempfile::tempdir().expect("Failed to create temp dir");
        let root = dir.path().canonicalize().expect("Failed to canonicalize temp dir");
        fs::create_dir_all(root.join(".git")).unwrap();
        fs::write(root.join(".core"), "").unwrap();
        fs::write(root.join("core.env"), CORE_ENV).unwrap();

        let odoo = root.join("src/OCA/OCB");
        fs::create_dir_all(odoo.join("odoo")).unwrap();
        fs::write(odoo.join("odoo-bin"), "#!/usr/bin/env python3\n").unwrap();
        fs::write(odoo.join("odoo/__init__.py"), "").unwrap();
        for addon in ["odoo/addons/base", "addons/web"] {
            write_addon(&odoo.join(addon));
        }
        write_addon(&root.join("src/custom/widgets"));
        Self { _dir: dir, root }
    }

    /// `fsonline --core-dir <root> <args...>`
    pub fn cmd(&self, args: &[&str]) -> Command {
        let mut cmd = fsonline_cmd();
        cmd.arg("--core-dir").arg(&self.root).args(args);
        cmd
    }
}

pub fn write_addon(path: &Path) {
    fs::create_dir_all(path).unwrap();
    fs::write(path.join("__manifest__.py"), "{'name': 'x'}\n").unwrap();
}
