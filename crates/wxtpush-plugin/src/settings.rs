// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Settings file and data directory resolution.

use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use wxtpush_core::error::Result;
use wxtpush_core::PushConfig;

const SETTINGS_FILE: &str = "settings.json";

/// Return the plugin data directory, creating it if needed.
///
/// On mobile the host should pass its own documents directory instead.
pub fn data_dir() -> PathBuf {
    let dir = base_dir().join("wxtpush");
    std::fs::create_dir_all(&dir).ok();
    dir
}

fn base_dir() -> PathBuf {
    if let Ok(xdg) = std::env::var("XDG_DATA_HOME") {
        return PathBuf::from(xdg);
    }
    if let Ok(home) = std::env::var("HOME") {
        return PathBuf::from(home).join(".local").join("share");
    }
    std::env::temp_dir()
}

/// Load settings from `dir`. A missing file gives the defaults; so does an
/// unreadable or malformed one, with a warning.
pub fn load_settings(dir: &Path) -> PushConfig {
    let path = dir.join(SETTINGS_FILE);
    let data = match std::fs::read_to_string(&path) {
        Ok(data) => data,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            debug!(path = %path.display(), "no settings file, using defaults");
            return PushConfig::default();
        }
        Err(e) => {
            warn!(path = %path.display(), error = %e, "settings unreadable, using defaults");
            return PushConfig::default();
        }
    };
    match serde_json::from_str(&data) {
        Ok(config) => config,
        Err(e) => {
            warn!(path = %path.display(), error = %e, "settings malformed, using defaults");
            PushConfig::default()
        }
    }
}

pub fn persist_settings(dir: &Path, config: &PushConfig) -> Result<()> {
    let json = serde_json::to_string_pretty(config)?;
    std::fs::write(dir.join(SETTINGS_FILE), json)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(load_settings(dir.path()), PushConfig::default());
    }

    #[test]
    fn malformed_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(SETTINGS_FILE), "{not json").unwrap();
        assert_eq!(load_settings(dir.path()), PushConfig::default());
    }

    #[test]
    fn persisted_settings_load_back() {
        let dir = tempfile::tempdir().unwrap();
        let config = PushConfig {
            simulated_delay_ms: 250,
            nudges_enabled: false,
            ..PushConfig::default()
        };
        persist_settings(dir.path(), &config).unwrap();
        assert_eq!(load_settings(dir.path()), config);
    }
}
