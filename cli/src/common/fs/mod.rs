//! # FS-Online Filesystem Utilities (`common::fs`)
//!
//! File: cli/src/common/fs/mod.rs
//!
//! ## Overview
//!
//! Filesystem building blocks for the development and build trees.
//!
//! - **`io`**: directory creation (with permission bits), reads, and writes that
//!   only touch a file when its content changes.
//! - **`links`**: relative symbolic links that refuse to overwrite anything.
//! - **`copy`**: tree copies that keep nested links, and no-clobber merges.
//! - **`mirror`**: assembles a target directory from the children of a source
//!   directory, plus the guarded clean of a previous build.
//!
//! Import from the specific submodule, e.g. `crate::common::fs::mirror::mirror`.
//!

/// Tree copies and no-clobber merges.
pub mod copy;
/// Basic file I/O (`ensure_dir_exists`, `write_if_changed`, ...).
pub mod io;
/// Relative symbolic links.
pub mod links;
/// Directory mirroring and guarded cleaning.
pub mod mirror;
