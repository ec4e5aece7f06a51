//! Startup settings, owned and rewritten by the settings surface; the
//! daemon only reads them once at launch.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

pub const DEFAULT_PORT: u16 = 9901;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Settings {
    pub listen_port: u16,
    pub default_sound: Option<String>,
    pub start_paused: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            listen_port: DEFAULT_PORT,
            default_sound: None,
            start_paused: false,
        }
    }
}

fn settings_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("valetd").join("settings.json"))
}

/// Load settings from the user config directory, defaulting on a missing
/// or unreadable file.
pub fn load() -> Settings {
    match settings_path() {
        Some(path) => load_from(&path),
        None => {
            log::warn!("no config directory on this host, using default settings");
            Settings::default()
        }
    }
}

fn load_from(path: &Path) -> Settings {
    let raw = match fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(_) => return Settings::default(),
    };
    match serde_json::from_str(&raw) {
        Ok(settings) => settings,
        Err(e) => {
            log::warn!("ignoring malformed settings at {}: {e}", path.display());
            Settings::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scratch_dir() -> PathBuf {
        let dir = std::env::temp_dir().join(format!("valetd-test-{}", std::process::id()));
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn missing_file_yields_defaults() {
        let settings = load_from(&scratch_dir().join("absent.json"));
        assert_eq!(settings.listen_port, DEFAULT_PORT);
        assert!(!settings.start_paused);
    }

    #[test]
    fn malformed_file_yields_defaults() {
        let path = scratch_dir().join("broken.json");
        fs::write(&path, "{not json").unwrap();
        assert_eq!(load_from(&path).listen_port, DEFAULT_PORT);
        let _ = fs::remove_file(path);
    }

    #[test]
    fn saved_settings_round_trip() {
        let path = scratch_dir().join("settings.json");
        let settings = Settings {
            listen_port: 4242,
            default_sound: Some("Glass".into()),
            start_paused: true,
        };
        fs::write(&path, serde_json::to_string(&settings).unwrap()).unwrap();

        let loaded = load_from(&path);
        assert_eq!(loaded.listen_port, 4242);
        assert_eq!(loaded.default_sound, Some("Glass".into()));
        assert!(loaded.start_paused);
        let _ = fs::remove_file(path);
    }

    #[test]
    fn partial_file_fills_in_defaults() {
        let path = scratch_dir().join("partial.json");
        fs::write(&path, r#"{"startPaused":true}"#).unwrap();
        let loaded = load_from(&path);
        assert!(loaded.start_paused);
        assert_eq!(loaded.listen_port, DEFAULT_PORT);
        let _ = fs::remove_file(path);
    }
}
