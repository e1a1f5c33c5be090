// src/core/paths.rs

use crate::constants::{CONFIG_DIR_NAME, CONFIG_ENV_VAR, CONFIG_FILENAME};
use lazy_static::lazy_static;
use std::env;
use std::path::PathBuf;
use std::sync::{Mutex, PoisonError};
use thiserror::Error;

lazy_static! {
    static ref PROCPACK_CONFIG_DIR: Mutex<Option<PathBuf>> = Mutex::new(None);
}

/// Errors from resolving procpack's paths.
#[derive(Error, Debug)]
pub enum PathError {
    /// The platform has no config directory for this user.
    #[error("Could not find system config directory.")]
    ConfigDirNotFound,
    /// A `~` or `$VAR` in the template could not be expanded.
    #[error("Failed to expand path template '{template}': {message}")]
    Expansion { template: String, message: String },
}

/// Returns the procpack configuration directory (`~/.config/procpack` on Linux).
///
/// The lookup is memoized: the first call computes and caches the path,
/// subsequent calls return the cached value. The directory is not created.
pub fn get_config_dir() -> Result<PathBuf, PathError> {
    let mut cached = PROCPACK_CONFIG_DIR
        .lock()
        .unwrap_or_else(PoisonError::into_inner);

    if let Some(path) = &*cached {
        return Ok(path.clone());
    }

    let config_path = dirs::config_dir()
        .ok_or(PathError::ConfigDirNotFound)?
        .join(CONFIG_DIR_NAME);
    *cached = Some(config_path.clone());
    Ok(config_path)
}

/// Returns the path of the configuration file.
///
/// `$PROCPACK_CONFIG` wins when set; it may contain `~` and `$VARS`.
pub fn get_config_file_path() -> Result<PathBuf, PathError> {
    match env::var(CONFIG_ENV_VAR) {
        Ok(template) if !template.trim().is_empty() => expand_path(&template),
        _ => get_config_dir().map(|dir| dir.join(CONFIG_FILENAME)),
    }
}

/// Expands `~` and environment variables in a user-supplied path.
pub fn expand_path(template: &str) -> Result<PathBuf, PathError> {
    let expanded = shellexpand::full(template).map_err(|e| PathError::Expansion {
        template: template.to_string(),
        message: e.to_string(),
    })?;
    Ok(PathBuf::from(expanded.into_owned()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_dir_is_memoized() {
        let Ok(first) = get_config_dir() else {
            // No config dir on this platform (e.g. a bare container without HOME).
            return;
        };
        let second = get_config_dir().unwrap();
        assert_eq!(first, second);
        assert!(first.ends_with(CONFIG_DIR_NAME));
    }

    #[test]
    fn test_expand_path_resolves_home() {
        let Some(home) = dirs::home_dir() else {
            return;
        };
        let expanded = expand_path("~/projects").unwrap();
        assert_eq!(expanded, home.join("projects"));
    }

    #[test]
    fn test_expand_path_reports_missing_variables() {
        let result = expand_path("$PROCPACK_SURELY_UNDEFINED_VARIABLE/dir");
        assert!(matches!(result, Err(PathError::Expansion { .. })));
    }
}
