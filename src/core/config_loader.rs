//! # Config Loader
//!
//! Loads the optional `config.toml`. A missing file is not an error: every key has a
//! default, and the library itself never reads configuration. Only the CLI resolves
//! settings into the explicit arguments of the process units.

use crate::core::paths::{self, PathError};
use crate::models::Settings;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors from loading the config file.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// The config location could not be resolved.
    #[error(transparent)]
    Path(#[from] PathError),
    /// The file exists but could not be read.
    #[error("Could not read config file '{path}': {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    /// The file is not valid TOML for [`Settings`].
    #[error("Failed to parse config file '{path}': {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

/// Loads settings from the default location (or `$PROCPACK_CONFIG`).
pub fn load_settings() -> Result<Settings, ConfigError> {
    let path = paths::get_config_file_path()?;
    load_settings_from(&path)
}

/// Loads settings from `path`, falling back to defaults when the file does not exist.
pub fn load_settings_from(path: &Path) -> Result<Settings, ConfigError> {
    if !path.exists() {
        log::debug!(
            "No config file at '{}', using defaults.",
            path.display()
        );
        return Ok(Settings::default());
    }

    let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let settings = toml::from_str(&content).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })?;
    log::debug!("Loaded config from '{}': {:?}", path.display(), settings);
    Ok(settings)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let settings = load_settings_from(&dir.path().join("absent.toml")).unwrap();
        assert_eq!(settings, Settings::default());
    }

    #[test]
    fn test_file_values_override_defaults() {
        // --- Setup ---
        let mut file = NamedTempFile::new().unwrap();
        write!(
            file,
            "[terminate]\nmax_wait_ms = 50\nforce = true\n\n[browser]\ncommand = \"firefox\"\n"
        )
        .unwrap();
        file.flush().unwrap();

        // --- Execute ---
        let settings = load_settings_from(file.path()).unwrap();

        // --- Assert ---
        assert_eq!(settings.terminate.max_wait_ms, 50);
        assert!(settings.terminate.force);
        assert_eq!(settings.browser.command.as_deref(), Some("firefox"));
        assert_eq!(settings.history.shell, "bash");
    }

    #[test]
    fn test_malformed_file_reports_path() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "[terminate\nforce = maybe").unwrap();
        file.flush().unwrap();

        let err = load_settings_from(file.path()).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
        assert!(err.to_string().contains(&file.path().display().to_string()));
    }
}
