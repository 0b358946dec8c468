//! Standard locations for configuration and session data

use std::path::PathBuf;

const APP_DIR: &str = "stagehand";

/// Default config file path for a given file name
///
/// Returns: `{config_dir}/stagehand/{filename}` (e.g. `~/.config/stagehand/player.yaml`)
pub fn default_config_path(filename: &str) -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_DIR)
        .join(filename)
}

/// Default directory for the persisted session (snapshot + stored stems)
///
/// Returns: `{data_dir}/stagehand/session`
pub fn default_session_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_DIR)
        .join("session")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_path_includes_filename() {
        let path = default_config_path("player.yaml");
        assert!(path.ends_with("stagehand/player.yaml"));
    }

    #[test]
    fn test_session_dir() {
        assert!(default_session_dir().ends_with("stagehand/session"));
    }
}
