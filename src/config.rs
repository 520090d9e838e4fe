// src/config.rs

//! Options controlling how the build state trusts event-based tracking.

use anyhow::{Context, Result};
use serde::Deserialize;

/// Tuning knobs for [`BuildFsState`](crate::state::BuildFsState).
///
/// ```toml
/// always_scan_fs = false
/// ```
#[derive(Debug, Clone, Copy, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StateOptions {
    /// When true, dirty files are always determined by scanning the
    /// filesystem and comparing timestamps; event-based change tracking is
    /// never trusted and `is_initial_scan_performed` always reports false.
    #[serde(default)]
    pub always_scan_fs: bool,
}

impl StateOptions {
    /// Parse options from a TOML snippet, typically a section of the build
    /// driver's configuration file.
    pub fn from_toml_str(s: &str) -> Result<Self> {
        toml::from_str(s).context("parsing build state options")
    }
}
