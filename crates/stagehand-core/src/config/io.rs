//! YAML settings files

use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::path::Path;

/// Read a YAML settings file, falling back to `T::default()`
///
/// A missing file is normal on first launch. A file that can't be read or
/// parsed is logged and ignored so the player still starts.
pub fn load_config<T>(path: &Path) -> T
where
    T: DeserializeOwned + Default,
{
    if !path.exists() {
        log::info!("{} not found, starting with default settings", path.display());
        return T::default();
    }
    match read_yaml(path) {
        Ok(config) => {
            log::debug!("Settings read from {}", path.display());
            config
        }
        Err(e) => {
            log::warn!("Ignoring {}: {:#}", path.display(), e);
            T::default()
        }
    }
}

fn read_yaml<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let text = std::fs::read_to_string(path).context("unreadable")?;
    serde_yaml::from_str(&text).context("not valid settings YAML")
}

/// Write settings as YAML, creating the folder if needed
pub fn save_config<T>(config: &T, path: &Path) -> Result<()>
where
    T: Serialize,
{
    if let Some(dir) = path.parent() {
        std::fs::create_dir_all(dir).with_context(|| format!("creating {}", dir.display()))?;
    }
    let yaml = serde_yaml::to_string(config).context("encoding settings")?;
    std::fs::write(path, yaml).with_context(|| format!("writing {}", path.display()))?;
    log::debug!("Settings written to {}", path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TransportConfig;

    #[test]
    fn test_load_nonexistent_returns_default() {
        let config: TransportConfig = load_config(Path::new("/nonexistent/path/config.yaml"));
        assert_eq!(config, TransportConfig::default());
    }

    #[test]
    fn test_invalid_yaml_returns_default() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.yaml");
        std::fs::write(&path, "auto_advance_grace_secs: [not a number").unwrap();

        let config: TransportConfig = load_config(&path);
        assert_eq!(config, TransportConfig::default());
    }

    #[test]
    fn test_save_creates_directories_and_reloads() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("transport.yaml");

        let config = TransportConfig {
            auto_advance_grace_secs: 8.0,
            ..Default::default()
        };
        save_config(&config, &path).unwrap();

        let loaded: TransportConfig = load_config(&path);
        assert_eq!(loaded.auto_advance_grace_secs, 8.0);
        assert_eq!(loaded.prev_restart_threshold_secs, 2.0);
    }
}
