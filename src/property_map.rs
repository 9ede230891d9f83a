//! Per-device configuration files.
//!
//! Devices can ship an auxiliary configuration file holding tuning properties (`device.type`,
//! `audio.mic`, ...). The format is one `key = value` pair per line, with `#` starting a comment.

use std::{collections::HashMap, fs, io, path::Path};

/// A flat string-to-string property table loaded from a device configuration file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PropertyMap {
    props: HashMap<String, String>,
}

impl PropertyMap {
    /// Creates an empty map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads and parses the file at `path`.
    pub fn load(path: &Path) -> io::Result<Self> {
        let contents = fs::read_to_string(path)?;
        Self::parse(&contents).map_err(|line| {
            io::Error::new(
                io::ErrorKind::InvalidData,
                format!("malformed property on line {line} of '{}'", path.display()),
            )
        })
    }

    /// Parses configuration text. On failure, returns the offending 1-based line number.
    pub fn parse(contents: &str) -> Result<Self, usize> {
        let mut props = HashMap::new();
        for (index, raw_line) in contents.lines().enumerate() {
            let line = match raw_line.split_once('#') {
                Some((before, _)) => before,
                None => raw_line,
            }
            .trim();
            if line.is_empty() {
                continue;
            }
            let (key, value) = line.split_once('=').ok_or(index + 1)?;
            let (key, value) = (key.trim(), value.trim());
            if key.is_empty() {
                return Err(index + 1);
            }
            props.insert(key.to_string(), value.to_string());
        }
        Ok(Self { props })
    }

    /// Returns the raw string value of `key`.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.props.get(key).map(|s| s.as_str())
    }

    /// Returns `key` interpreted as a boolean (`1`/`true` are true, `0`/`false` are false).
    pub fn get_bool(&self, key: &str) -> Option<bool> {
        match self.get(key)? {
            "1" | "true" => Some(true),
            "0" | "false" => Some(false),
            other => {
                log::warn!("property '{key}' has non-boolean value '{other}'");
                None
            }
        }
    }

    /// Returns `key` parsed as an integer.
    pub fn get_i32(&self, key: &str) -> Option<i32> {
        let raw = self.get(key)?;
        match raw.parse() {
            Ok(v) => Some(v),
            Err(_) => {
                log::warn!("property '{key}' has non-integer value '{raw}'");
                None
            }
        }
    }

    /// Returns whether the map holds no properties.
    pub fn is_empty(&self) -> bool {
        self.props.is_empty()
    }

    /// Returns the number of properties.
    pub fn len(&self) -> usize {
        self.props.len()
    }
}
