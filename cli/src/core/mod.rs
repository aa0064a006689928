//! # FS-Online Core Infrastructure
//!
//! File: cli/src/core/mod.rs
//!
//! ## Overview
//!
//! Everything that knows about FS-Online repositories: how a checkout is laid
//! out, how settings are layered and validated, how addons are found, and how
//! generated addon scaffolding is wired into Odoo.
//!
//! ## Architecture
//!
//! Leaf-first:
//! - `error`: the error taxonomy and the crate-wide `Result`
//! - `logging`: subscriber setup and command timing
//! - `conventions`: core/instance detection and every well-known path
//! - `envfile`: layered `core.env` / `inst.env` files
//! - `addons`: addon discovery from wildcard search paths
//! - `settings`: resolution and validation of all settings
//! - `build_config`: the `build.yml` description used by `build-odoo`
//! - `scaffold`: post-processing of `copier` output
//!
//! ## Usage
//!
//! ```rust
//! use crate::core::conventions::Conventions;
//! use crate::core::settings::Settings;
//!
//! let conventions = Conventions::detect(&Conventions::start_points(None))?;
//! let settings = Settings::resolve(&conventions, &overrides)?;
//! ```
//!
pub mod addons;
pub mod build_config;
pub mod conventions;
pub mod envfile;
pub mod error;
pub mod logging;
pub mod scaffold;
pub mod settings;
