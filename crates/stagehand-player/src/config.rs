//! Player configuration for stagehand-player
//!
//! Configuration is stored as YAML in the user's config directory.
//! Default location: ~/.config/stagehand/player.yaml

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use stagehand_core::audio::AudioConfig;
use stagehand_core::config::{default_config_path, default_session_dir, TransportConfig};
use stagehand_core::pad::DEFAULT_PAD_VOLUME;

pub const CONFIG_FILE: &str = "player.yaml";

/// Root configuration structure
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlayerConfig {
    /// Output device, buffer size and preferred sample rate
    pub audio: AudioConfig,
    /// Fade, grace and restart timings
    pub transport: TransportConfig,
    /// Route click/guide channels to the left bus on load
    pub auto_pan: bool,
    pub pad_volume: f32,
    /// Where the session (snapshot, stored stems, custom pads) lives.
    /// Default: ~/.local/share/stagehand/session
    pub session_dir: Option<PathBuf>,
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            audio: AudioConfig::default(),
            transport: TransportConfig::default(),
            auto_pan: true,
            pad_volume: DEFAULT_PAD_VOLUME,
            session_dir: None,
        }
    }
}

impl PlayerConfig {
    pub fn session_dir(&self) -> PathBuf {
        self.session_dir.clone().unwrap_or_else(default_session_dir)
    }
}

pub fn default_path() -> PathBuf {
    default_config_path(CONFIG_FILE)
}

#[cfg(test)]
mod tests {
    use super::*;
    use stagehand_core::config::{load_config, save_config};

    #[test]
    fn test_partial_yaml_keeps_defaults() {
        let yaml = "auto_pan: false\ntransport:\n  fade_out_secs: 3.0\n";
        let config: PlayerConfig = serde_yaml::from_str(yaml).unwrap();

        assert!(!config.auto_pan);
        assert_eq!(config.transport.fade_out_secs, 3.0);
        assert_eq!(config.transport.auto_advance_grace_secs, 5.0);
        assert_eq!(config.pad_volume, DEFAULT_PAD_VOLUME);
        assert_eq!(config.audio, AudioConfig::default());
    }

    #[test]
    fn test_session_dir_override() {
        let mut config = PlayerConfig::default();
        assert_eq!(config.session_dir(), default_session_dir());

        config.session_dir = Some(PathBuf::from("/tmp/gig"));
        assert_eq!(config.session_dir(), PathBuf::from("/tmp/gig"));
    }

    #[test]
    fn test_save_and_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE);

        let config = PlayerConfig {
            pad_volume: 0.7,
            session_dir: Some(dir.path().join("session")),
            ..Default::default()
        };
        save_config(&config, &path).unwrap();

        let loaded: PlayerConfig = load_config(&path);
        assert_eq!(loaded, config);
    }
}
