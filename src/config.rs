use std::fs;
use std::path::{Path, PathBuf};
use serde::Deserialize;
use url::Url;
use crate::upload::{Result, UploadError};

pub const DEFAULT_CONTENT_TYPE: &str = "video/quicktime";
pub const DEFAULT_TIMEOUT_SECS: u64 = 300;
pub const DEFAULT_CHUNK_SIZE: usize = 64 * 1024;
pub const DEFAULT_RETENTION_LIMIT: usize = 5;

#[derive(Deserialize, Debug, Clone)]
pub struct Config {
    pub upload: UploadConfig,
    #[serde(default)]
    pub library: LibraryConfig,
}

/// Static transfer settings, shared by every queued item.
#[derive(Deserialize, Debug, Clone)]
pub struct UploadConfig {
    pub endpoint: String,
    #[serde(default = "default_content_type")]
    pub content_type: String,
    pub token: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,
}

/// Where recordings are kept and how many of them survive.
#[derive(Deserialize, Debug, Clone)]
pub struct LibraryConfig {
    #[serde(default = "default_library_dir")]
    pub dir: PathBuf,
    #[serde(default = "default_retention_limit")]
    pub retention_limit: usize,
}

impl Default for LibraryConfig {
    fn default() -> Self {
        Self {
            dir: default_library_dir(),
            retention_limit: DEFAULT_RETENTION_LIMIT,
        }
    }
}

fn default_content_type() -> String {
    DEFAULT_CONTENT_TYPE.to_string()
}

fn default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

fn default_chunk_size() -> usize {
    DEFAULT_CHUNK_SIZE
}

fn default_library_dir() -> PathBuf {
    PathBuf::from("videos")
}

fn default_retention_limit() -> usize {
    DEFAULT_RETENTION_LIMIT
}

impl Config {
    pub fn load(path: impl AsRef<Path>) -> Result<Config> {
        let path = path.as_ref();
        let config_str = fs::read_to_string(path)
            .map_err(|err| UploadError::config(format!("can't read {}: {}", path.display(), err)))?;

        Self::from_toml(&config_str)
    }

    pub fn from_toml(config_str: &str) -> Result<Config> {
        let config: Config = toml::from_str(config_str)
            .map_err(|err| UploadError::config(err.to_string()))?;
        config.validate()?;

        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        Url::parse(&self.upload.endpoint)
            .map_err(|err| UploadError::config(format!("invalid endpoint '{}': {}", self.upload.endpoint, err)))?;

        if self.upload.timeout_secs == 0 {
            return Err(UploadError::config("timeout_secs must be greater than zero"));
        }

        if self.upload.chunk_size == 0 {
            return Err(UploadError::config("chunk_size must be greater than zero"));
        }

        if self.library.retention_limit == 0 {
            return Err(UploadError::config("retention_limit must be at least 1"));
        }

        Ok(())
    }
}
