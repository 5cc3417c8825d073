//! Configuration management for the runner.

use brewsync_engine::{parse_timestamp, RebuildFlagPolicy, SyncOptions, Timestamp, WindowOverrides};
use std::env;
use std::path::PathBuf;
use std::str::FromStr;

/// Which pass to run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Mode {
    /// Rebuild when the rebuild flag is set, pull otherwise.
    #[default]
    Auto,
    Pull,
    Rebuild,
}

impl FromStr for Mode {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "auto" => Ok(Mode::Auto),
            "pull" => Ok(Mode::Pull),
            "rebuild" => Ok(Mode::Rebuild),
            _ => Err(ConfigError::InvalidMode(s.to_string())),
        }
    }
}

/// Runner configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Directory holding the export files
    pub export_path: PathBuf,
    /// Full export read by rebuild
    pub export_file: String,
    /// Archive read by pull
    pub archive_file: String,
    /// Names the store and cursor files
    pub collection: String,
    /// Where the store and cursor files live
    pub data_dir: PathBuf,
    pub mode: Mode,
    pub begin: Option<Timestamp>,
    pub end: Option<Timestamp>,
    pub rebuild_flag: RebuildFlagPolicy,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration from any variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        let export_path = var("BEERSMITH_DEFAULT_PATH")
            .map(PathBuf::from)
            .ok_or(ConfigError::MissingExportPath)?;

        let export_file =
            var("BEERSMITH_DEFAULT_FILENAME").unwrap_or_else(|| "Recipe.bsmx".to_string());
        let archive_file =
            var("BEERSMITH_ARCHIVE_FILENAME").unwrap_or_else(|| "Archive.bsmx".to_string());
        let collection = var("BEERSMITH_COLLECTION").unwrap_or_else(|| "recipes".to_string());
        let data_dir = var("BREWSYNC_DATA_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("./data"));

        let mode = var("BREWSYNC_MODE")
            .map(|value| value.parse())
            .transpose()?
            .unwrap_or_default();

        let begin = timestamp_var("BREWSYNC_BEGIN", var("BREWSYNC_BEGIN"))?;
        let end = timestamp_var("BREWSYNC_END", var("BREWSYNC_END"))?;

        let keep_flag = match var("BREWSYNC_KEEP_REBUILD_FLAG") {
            Some(value) => parse_flag("BREWSYNC_KEEP_REBUILD_FLAG", &value)?,
            None => false,
        };
        let rebuild_flag = if keep_flag {
            RebuildFlagPolicy::KeepUntilRebuild
        } else {
            RebuildFlagPolicy::ClearOnPull
        };

        Ok(Self {
            export_path,
            export_file,
            archive_file,
            collection,
            data_dir,
            mode,
            begin,
            end,
            rebuild_flag,
        })
    }

    pub fn sync_options(&self) -> SyncOptions {
        SyncOptions {
            export_file: self.export_file.clone(),
            archive_file: self.archive_file.clone(),
            rebuild_flag: self.rebuild_flag,
        }
    }

    pub fn overrides(&self) -> WindowOverrides {
        WindowOverrides {
            start: self.begin,
            end: self.end,
        }
    }

    pub fn store_path(&self) -> PathBuf {
        self.data_dir.join(format!("{}.json", self.collection))
    }

    pub fn cursor_path(&self) -> PathBuf {
        self.data_dir.join(format!("{}.cursor.json", self.collection))
    }
}

fn timestamp_var(key: &'static str, value: Option<String>) -> Result<Option<Timestamp>, ConfigError> {
    value
        .map(|value| {
            parse_timestamp(&value).map_err(|_| ConfigError::InvalidDate { key, value })
        })
        .transpose()
}

fn parse_flag(key: &'static str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::InvalidFlag {
            key,
            value: value.to_string(),
        }),
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("BEERSMITH_DEFAULT_PATH environment variable is required")]
    MissingExportPath,

    #[error("Invalid BREWSYNC_MODE value: {0} (expected auto, pull or rebuild)")]
    InvalidMode(String),

    #[error("Invalid {key} date: {value}")]
    InvalidDate { key: &'static str, value: String },

    #[error("Invalid {key} value: {value}")]
    InvalidFlag { key: &'static str, value: String },
}
