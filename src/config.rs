use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::TracksideError;
use crate::assembler::DEFAULT_FRAME_RATE;

const CONFIG_FILE_NAME: &str = "config.json";

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct AppConfig {
    /// Session archive location, the user cache directory when unset
    pub cache_dir: Option<PathBuf>,
    pub frame_rate: u32,
    /// Where replay files go when no output path is given
    pub output_dir: Option<PathBuf>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            cache_dir: None,
            frame_rate: DEFAULT_FRAME_RATE,
            output_dir: None,
        }
    }
}

impl AppConfig {
    pub fn config_path() -> Result<PathBuf, TracksideError> {
        Ok(dirs::config_dir()
            .ok_or(TracksideError::NoConfigDir)?
            .join("trackside")
            .join(CONFIG_FILE_NAME))
    }

    /// Config saved in the user config directory, if there is one
    pub fn from_local_file() -> Result<Option<Self>, TracksideError> {
        Self::from_file(&Self::config_path()?)
    }

    pub fn from_file(config_path: &Path) -> Result<Option<Self>, TracksideError> {
        if !config_path.exists() {
            return Ok(None);
        }
        let file = std::fs::File::open(config_path)
            .map_err(|e| TracksideError::ConfigIOError { source: e })?;
        serde_json::from_reader(file)
            .map(Some)
            .map_err(|e| TracksideError::ConfigSerializeError { source: e })
    }

    pub fn save(&self) -> Result<(), TracksideError> {
        self.save_to(&Self::config_path()?)
    }

    pub fn save_to(&self, config_path: &Path) -> Result<(), TracksideError> {
        if let Some(parent) = config_path.parent() {
            if !parent.exists() {
                std::fs::create_dir_all(parent)
                    .map_err(|e| TracksideError::ConfigIOError { source: e })?;
            }
        }

        let file = std::fs::File::create(config_path)
            .map_err(|e| TracksideError::ConfigIOError { source: e })?;
        serde_json::to_writer_pretty(file, self)
            .map_err(|e| TracksideError::ConfigSerializeError { source: e })
    }
}
