//! Store configuration.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Result, StoreError};

/// Locations and mode for one store instance.
///
/// A config names the protocol label recorded for the store, the two files
/// it owns on disk, and whether this handle may write. Configs are plain
/// data; nothing is opened until [`Store::open`](crate::Store::open).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Label for the deployment or device this store records.
    pub protocol: String,
    /// Path of the schema sidecar file.
    pub schema_path: PathBuf,
    /// Path of the binary chain file.
    pub storage_path: PathBuf,
    /// Whether mutating operations are allowed through this handle.
    pub writable: bool,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            protocol: "bluecrab".to_string(),
            schema_path: PathBuf::from("bluecrab.schema"),
            storage_path: PathBuf::from("bluecrab.db"),
            writable: true,
        }
    }
}

impl StoreConfig {
    /// Return this configuration with writes disabled.
    pub fn read_only(mut self) -> Self {
        self.writable = false;
        self
    }

    /// Load a configuration from a TOML file.
    pub fn from_toml_file(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)?;
        toml::from_str(&text).map_err(|e| StoreError::Config(e.to_string()))
    }

    /// Serialize to a TOML document.
    pub fn to_toml_string(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| StoreError::Config(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_writable() {
        let config = StoreConfig::default();
        assert_eq!(config.protocol, "bluecrab");
        assert!(config.writable);
    }

    #[test]
    fn read_only_clears_writable() {
        let config = StoreConfig::default().read_only();
        assert!(!config.writable);
    }

    #[test]
    fn toml_roundtrip() {
        let config = StoreConfig {
            protocol: "greenhouse".to_string(),
            schema_path: PathBuf::from("greenhouse.schema"),
            storage_path: PathBuf::from("greenhouse.db"),
            writable: false,
        };
        let text = config.to_toml_string().unwrap();
        let parsed: StoreConfig = toml::from_str(&text).unwrap();
        assert_eq!(parsed, config);
    }

    #[test]
    fn loads_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("store.toml");
        let config = StoreConfig::default().read_only();
        fs::write(&path, config.to_toml_string().unwrap()).unwrap();

        let loaded = StoreConfig::from_toml_file(&path).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn malformed_toml_is_a_config_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("store.toml");
        fs::write(&path, "protocol = [unclosed").unwrap();

        let err = StoreConfig::from_toml_file(&path).unwrap_err();
        assert!(matches!(err, StoreError::Config(_)));
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = StoreConfig::from_toml_file(&dir.path().join("absent.toml")).unwrap_err();
        assert!(matches!(err, StoreError::Io(_)));
    }
}
