//! Tree map configuration.
//!
//! Configuration is a JSON document; every field is optional. When no path is
//! given the per-user config directory is searched for `wstreemap.json`.

use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use directories::ProjectDirs;
use log::{debug, info};
use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};

use crate::error::Result;

pub const CONFIG_FILE_NAME: &str = "wstreemap.json";

/// How messages are grouped below a host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Display, EnumString, Serialize, Deserialize)]
#[strum(serialize_all = "kebab-case")]
#[serde(rename_all = "kebab-case")]
pub enum MessageGrouping {
    /// A single "Messages" folder per host.
    #[default]
    Flat,
    /// One folder per (direction, opcode) pair, created on first use.
    ByKind,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MapConfig {
    pub message_grouping: MessageGrouping,
    pub max_leaf_name_length: usize,
    pub unreadable_placeholder: String,
    pub handshake_folder_name: String,
    pub message_folder_name: String,
    /// Enabled payload analyzers, tried in this order.
    pub analyzers: Vec<String>,
}

impl Default for MapConfig {
    fn default() -> Self {
        MapConfig {
            message_grouping: MessageGrouping::Flat,
            max_leaf_name_length: 80,
            unreadable_placeholder: "unreadable binary".to_string(),
            handshake_folder_name: "Handshakes".to_string(),
            message_folder_name: "Messages".to_string(),
            analyzers: vec!["json".to_string()],
        }
    }
}

impl MapConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let reader = BufReader::new(File::open(path)?);
        let config: MapConfig = serde_json::from_reader(reader)?;
        info!("Loaded tree map configuration from {}", path.display());
        Ok(config)
    }

    /// Load `path` if given, else the per-user config file if it exists, else defaults.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        if let Some(path) = path {
            return Self::load(path);
        }

        match Self::user_config_path() {
            Some(path) if path.is_file() => Self::load(&path),
            _ => {
                debug!("No configuration file found, using defaults");
                Ok(Self::default())
            }
        }
    }

    pub fn user_config_path() -> Option<PathBuf> {
        ProjectDirs::from("org", "wstreemap", "wstreemap")
            .map(|dirs| dirs.config_dir().join(CONFIG_FILE_NAME))
    }
}
