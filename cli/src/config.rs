use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use stride_core::plans::WeekStart;

pub const DATA_DIR_ENV: &str = "STRIDE_DATA_DIR";
const CONFIG_FILE: &str = "config.json";
const DEFAULT_LOOKUP_TIMEOUT_SECS: u64 = 10;

/// Optional `config.json` in the data directory. Every field has a default.
#[derive(Debug, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    pub health_data_file: Option<PathBuf>,
    pub week_start: WeekStart,
    pub lookup_timeout_secs: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            health_data_file: None,
            week_start: WeekStart::default(),
            lookup_timeout_secs: DEFAULT_LOOKUP_TIMEOUT_SECS,
        }
    }
}

pub struct Config {
    pub db_path: PathBuf,
    pub data_dir: PathBuf,
    pub image_dir: PathBuf,
    pub settings: Settings,
}

impl Config {
    pub fn load() -> Result<Self> {
        let data_dir = match std::env::var_os(DATA_DIR_ENV) {
            Some(dir) if !dir.is_empty() => PathBuf::from(dir),
            _ => ProjectDirs::from("", "", "stride")
                .context("Could not determine home directory")?
                .data_dir()
                .to_path_buf(),
        };
        Self::load_from(data_dir)
    }

    pub fn load_from(data_dir: PathBuf) -> Result<Self> {
        std::fs::create_dir_all(&data_dir)
            .with_context(|| format!("Failed to create data directory: {}", data_dir.display()))?;

        let settings = read_settings(&data_dir.join(CONFIG_FILE))?;
        tracing::debug!(data_dir = %data_dir.display(), ?settings, "config loaded");

        Ok(Config {
            db_path: data_dir.join("stride.db"),
            image_dir: data_dir.join("images"),
            data_dir,
            settings,
        })
    }

    pub fn lookup_timeout(&self) -> Duration {
        Duration::from_secs(self.settings.lookup_timeout_secs.max(1))
    }

    /// Relative health file paths resolve against the data directory.
    pub fn health_data_file(&self) -> Option<PathBuf> {
        self.settings
            .health_data_file
            .as_ref()
            .map(|p| self.data_dir.join(p))
    }
}

fn read_settings(path: &Path) -> Result<Settings> {
    if !path.exists() {
        return Ok(Settings::default());
    }
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("Invalid config file {}", path.display()))
}
