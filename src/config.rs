//! Hub configuration.

use std::{
    fs, io,
    path::{Path, PathBuf},
};

use serde::Deserialize;

/// Where evdev device nodes appear.
pub const DEFAULT_INPUT_DIRECTORY: &str = "/dev/input";
/// Where touch-video (`v4l-touch*`) device nodes appear.
pub const DEFAULT_VIDEO_DIRECTORY: &str = "/dev";

/// Configuration for a hub instance.
///
/// Deserializable from TOML; every field has a default, so an empty document is a valid
/// configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Directory scanned and watched for evdev nodes.
    pub input_directory: PathBuf,
    /// Directory scanned and watched for touch-video nodes.
    pub video_directory: PathBuf,
    /// Directory holding per-device `.idc` configuration files, if any.
    pub config_directory: Option<PathBuf>,
    /// Path globs that are never opened.
    pub excluded_devices: Vec<String>,
    /// Whether to install the synthetic always-present keyboard at id −1.
    pub virtual_keyboard: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            input_directory: PathBuf::from(DEFAULT_INPUT_DIRECTORY),
            video_directory: PathBuf::from(DEFAULT_VIDEO_DIRECTORY),
            config_directory: None,
            excluded_devices: Vec::new(),
            virtual_keyboard: false,
        }
    }
}

impl Config {
    /// Parses a configuration from TOML text.
    pub fn from_toml(text: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(text)
    }

    /// Loads and parses the TOML configuration file at `path`.
    pub fn load(path: &Path) -> io::Result<Self> {
        let text = fs::read_to_string(path)?;
        Self::from_toml(&text).map_err(|e| {
            io::Error::new(
                io::ErrorKind::InvalidData,
                format!("invalid config '{}': {e}", path.display()),
            )
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_is_default() {
        let config = Config::from_toml("").unwrap();
        assert_eq!(config.input_directory, Path::new(DEFAULT_INPUT_DIRECTORY));
        assert_eq!(config.video_directory, Path::new(DEFAULT_VIDEO_DIRECTORY));
        assert!(config.excluded_devices.is_empty());
        assert!(!config.virtual_keyboard);
    }

    #[test]
    fn full_document() {
        let config = Config::from_toml(
            r#"
            input_directory = "/tmp/fake-input"
            video_directory = "/tmp/fake-video"
            config_directory = "/tmp/idc"
            excluded_devices = ["/dev/input/event7", "/dev/input/event1*"]
            virtual_keyboard = true
            "#,
        )
        .unwrap();
        assert_eq!(config.input_directory, Path::new("/tmp/fake-input"));
        assert_eq!(config.excluded_devices.len(), 2);
        assert!(config.virtual_keyboard);
    }

    #[test]
    fn unknown_fields_are_rejected() {
        assert!(Config::from_toml("no_such_option = 1").is_err());
    }
}
