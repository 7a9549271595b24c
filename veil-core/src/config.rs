#![forbid(unsafe_code)]

//! Veil process configuration. Parses a TOML file into a strongly-typed
//! structure; the shaper section only overrides what a deployment wants to
//! change from the built-in defaults.

use std::{fs, path::Path};

use serde::Deserialize;

use crate::error::ConfigError;

/// Top-level configuration shared by Veil processes.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct VeilConfig {
    /// Logging verbosity (`error`, `warn`, `info`, `debug`, `trace`).
    pub log_level: Option<String>,

    /// Path to the server private identity file.
    pub identity_path: Option<String>,

    /// Shaper overrides.
    pub shaper: ShaperOverrides,
}

impl Default for VeilConfig {
    fn default() -> Self {
        Self {
            log_level: Some("info".to_string()),
            identity_path: None,
            shaper: ShaperOverrides::default(),
        }
    }
}

/// Optional overrides for the shaping loop.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ShaperOverrides {
    /// Inbound/pull buffer size in bytes.
    pub buffer_size: Option<usize>,

    /// Maximum session lifetime in seconds; the shaper self-closes after it.
    pub max_session_secs: Option<u64>,
}

impl VeilConfig {
    /// Load a configuration file from the given path.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let data = fs::read_to_string(path)?;
        Ok(toml::from_str(&data)?)
    }
}
