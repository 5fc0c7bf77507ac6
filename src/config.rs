use std::{fs, path::Path};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::output::VirtualDeviceConfig;
use crate::profile::{CcRangeTable, DeviceProfile, LedOverrides, ProfileError};

/// Configuration used when no file is given on the command line.
pub const DEFAULT_CONFIG: &str = include_str!("../midi2joy.yml");

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },
    #[error("invalid config: {0}")]
    Parse(#[from] serde_yaml::Error),
    #[error("invalid profile: {0}")]
    Profile(#[from] ProfileError),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub midi: MidiConfig,
    #[serde(default)]
    pub devices: DevicesConfig,
    pub profile: ProfileConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MidiConfig {
    #[serde(default = "default_client_name")]
    pub client_name: String,
    /// Port name substring; empty selects the last enumerated port.
    #[serde(default)]
    pub input: String,
    #[serde(default)]
    pub output: String,
}

impl Default for MidiConfig {
    fn default() -> Self {
        Self {
            client_name: default_client_name(),
            input: String::new(),
            output: String::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DevicesConfig {
    /// Device ids in the order they are probed and addressed.
    #[serde(default = "default_probe_order")]
    pub probe_order: Vec<u32>,
    #[serde(default = "default_min_buttons")]
    pub min_buttons: u32,
    #[serde(default, rename = "virtual")]
    pub virtual_devices: Vec<VirtualDeviceConfig>,
}

impl Default for DevicesConfig {
    fn default() -> Self {
        Self {
            probe_order: default_probe_order(),
            min_buttons: default_min_buttons(),
            virtual_devices: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProfileConfig {
    pub ranges: DeviceProfile,
    #[serde(default)]
    pub led_overrides: LedOverrides,
}

impl ProfileConfig {
    pub fn table(&self) -> Result<CcRangeTable, ProfileError> {
        CcRangeTable::new(self.ranges.clone())
    }
}

impl Config {
    /// Load `path`, or the built-in configuration when `path` is `None`.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(path) => {
                let text = fs::read_to_string(path).map_err(|source| ConfigError::Io {
                    path: path.display().to_string(),
                    source,
                })?;
                Self::parse(&text)
            }
            None => Self::parse(DEFAULT_CONFIG),
        }
    }

    /// Parse a YAML document and validate its profile.
    pub fn parse(text: &str) -> Result<Self, ConfigError> {
        let config: Config = serde_yaml::from_str(text)?;
        config.profile.table()?;
        Ok(config)
    }
}

fn default_client_name() -> String {
    "midi2joy".into()
}

fn default_probe_order() -> Vec<u32> {
    (1..=16).collect()
}

fn default_min_buttons() -> u32 {
    8
}
