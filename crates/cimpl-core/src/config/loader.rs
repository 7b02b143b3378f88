//! Configuration file discovery and loading

use super::ExpanderConfig;
use crate::error::CimplError;
use crate::result::Result;
use std::path::{Path, PathBuf};

const CONFIG_FILENAMES: &[&str] = &["cimpl.toml", "cimpl.yaml", "cimpl.yml", "cimpl.json"];

/// Configuration loader for discovering and loading config files
pub struct ConfigLoader;

impl ConfigLoader {
    /// Auto-discover config file by traversing upward from start_path
    ///
    /// Searches each directory for `cimpl.toml`, `cimpl.yaml`, `cimpl.yml`
    /// and `cimpl.json`, in that order, until one is found or the filesystem
    /// root is reached.
    pub fn auto_discover(start_path: &Path) -> Result<Option<PathBuf>> {
        let mut current = start_path
            .canonicalize()
            .map_err(|e| CimplError::config_error(format!("Invalid path: {e}")))?;

        loop {
            for filename in CONFIG_FILENAMES {
                let config_path = current.join(filename);
                if config_path.is_file() {
                    tracing::debug!("Found config: {}", config_path.display());
                    return Ok(Some(config_path));
                }
            }

            match current.parent() {
                Some(parent) => current = parent.to_path_buf(),
                None => break,
            }
        }

        Ok(None)
    }

    /// Load configuration from a specific file
    pub fn load_from_file(path: &Path) -> Result<ExpanderConfig> {
        ExpanderConfig::load(path).map_err(|e| {
            CimplError::config_error(format!(
                "Failed to load config from '{}': {}",
                path.display(),
                e
            ))
        })
    }

    /// Load config from an explicit path, or discover one
    ///
    /// Unlike an explicit path, a failed discovery is not an error: the
    /// engine runs with [`ExpanderConfig::default`].
    pub fn load(custom_path: Option<&Path>, start_dir: Option<&Path>) -> Result<ExpanderConfig> {
        if let Some(path) = custom_path {
            if !path.exists() {
                return Err(CimplError::config_error(format!(
                    "Config file not found: {}",
                    path.display()
                )));
            }
            return Self::load_from_file(path);
        }

        let search_dir = start_dir.unwrap_or_else(|| Path::new("."));
        match Self::auto_discover(search_dir)? {
            Some(path) => Self::load_from_file(&path),
            None => {
                tracing::debug!("No config file found, using defaults");
                Ok(ExpanderConfig::default())
            }
        }
    }
}
