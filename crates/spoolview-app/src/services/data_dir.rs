// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Platform-aware configuration directory resolution.

use std::path::{Path, PathBuf};

use spoolview_core::ModelConfig;
use tracing::{debug, warn};

const CONFIG_FILE: &str = "config.json";

/// Return the application configuration directory.
pub fn config_dir() -> PathBuf {
    dirs_fallback().join("spoolview")
}

/// Load the configuration from `dir`, falling back to defaults when the file
/// is missing or unreadable.
pub fn load_config(dir: &Path) -> ModelConfig {
    let path = dir.join(CONFIG_FILE);
    if !path.exists() {
        debug!(path = %path.display(), "no configuration file, using defaults");
        return ModelConfig::default();
    }
    match ModelConfig::load(&path) {
        Ok(config) => config,
        Err(e) => {
            warn!(path = %path.display(), error = %e, "ignoring unusable configuration");
            ModelConfig::default()
        }
    }
}

fn dirs_fallback() -> PathBuf {
    // Try XDG config dir, then fallback to home
    if let Ok(xdg) = std::env::var("XDG_CONFIG_HOME") {
        return PathBuf::from(xdg);
    }
    if let Ok(home) = std::env::var("HOME") {
        return PathBuf::from(home).join(".config");
    }
    // Last resort
    PathBuf::from("/tmp")
}
