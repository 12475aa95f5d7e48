//! JSON file adapter implementing [`ConfigPort`].
//!
//! - Missing file: defaults.
//! - Parse failure: [`ConfigError::Corrupted`].
//! - Every loaded or saved config is validated first.
//! - Saves write a sibling temp file and rename it over the target.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use log::{info, warn};

use crate::app::ports::{ConfigError, ConfigPort};
use crate::config::NodeConfig;

pub struct JsonConfigFile {
    path: PathBuf,
}

impl JsonConfigFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ConfigPort for JsonConfigFile {
    fn load(&self) -> Result<NodeConfig, ConfigError> {
        let bytes = match fs::read(&self.path) {
            Ok(b) => b,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                info!("config: {} not found, using defaults", self.path.display());
                return Ok(NodeConfig::default());
            }
            Err(e) => {
                warn!("config: read {} failed: {}", self.path.display(), e);
                return Err(ConfigError::IoError);
            }
        };

        let cfg: NodeConfig = serde_json::from_slice(&bytes).map_err(|e| {
            warn!("config: {} is not valid: {}", self.path.display(), e);
            ConfigError::Corrupted
        })?;
        cfg.validate()?;
        info!("config: loaded {}", self.path.display());
        Ok(cfg)
    }

    fn save(&self, config: &NodeConfig) -> Result<(), ConfigError> {
        config.validate()?;
        let json = serde_json::to_vec_pretty(config).map_err(|_| ConfigError::Corrupted)?;

        let mut tmp = self.path.clone().into_os_string();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);
        fs::write(&tmp, &json).map_err(|_| ConfigError::IoError)?;
        fs::rename(&tmp, &self.path).map_err(|_| ConfigError::IoError)?;
        info!("config: saved {}", self.path.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonConfigFile::new(dir.path().join("node.json"));
        assert_eq!(store.load().unwrap(), NodeConfig::default());
    }

    #[test]
    fn save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonConfigFile::new(dir.path().join("node.json"));
        let cfg = NodeConfig {
            telemetry_interval_ms: 250,
            ..NodeConfig::default()
        };
        store.save(&cfg).unwrap();
        assert!(store.path().is_file());
        assert_eq!(store.load().unwrap(), cfg);
        assert!(!dir.path().join("node.json.tmp").exists());
    }

    #[test]
    fn garbage_is_corrupted() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("node.json");
        fs::write(&path, b"{ not json").unwrap();
        assert_eq!(JsonConfigFile::new(path).load(), Err(ConfigError::Corrupted));
    }

    #[test]
    fn invalid_config_is_not_saved() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("node.json");
        let store = JsonConfigFile::new(&path);
        let cfg = NodeConfig {
            accept_poll_ms: 0,
            ..NodeConfig::default()
        };
        assert!(matches!(store.save(&cfg), Err(ConfigError::ValidationFailed(_))));
        assert!(!path.exists());
    }

    #[test]
    fn invalid_file_fails_validation_on_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("node.json");
        fs::write(&path, br#"{ "alarm_poll_interval_us": 0 }"#).unwrap();
        assert!(matches!(
            JsonConfigFile::new(path).load(),
            Err(ConfigError::ValidationFailed(_))
        ));
    }
}
