// Configuration: a single value built once in `main` and handed to the
// API client and the UI. Sources are layered, later wins:
// defaults -> JSON config file -> environment -> command-line flags.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_BASE_MODEL: &str = "gpt-3.5-turbo";
pub const DEFAULT_DATA_DIR: &str = "./data";

const CONFIG_DIR_NAME: &str = "finetune-cli";
const CONFIG_FILE_NAME: &str = "config.json";

/// Resolved runtime configuration.
#[derive(Debug, Clone)]
pub struct Config {
    pub api_key: String,
    pub base_url: String,
    pub data_dir: PathBuf,
    pub base_model: String,
    pub request_timeout: Option<Duration>,
}

/// Shape of the optional JSON config file. Every key may be omitted.
#[derive(Debug, Default, Deserialize)]
pub struct FileConfig {
    pub api_key: Option<String>,
    pub base_url: Option<String>,
    pub data_dir: Option<PathBuf>,
    pub base_model: Option<String>,
    pub request_timeout_secs: Option<u64>,
}

/// Values coming from command-line flags. `None` means "not given".
#[derive(Debug, Default, Clone)]
pub struct Overrides {
    pub config_path: Option<PathBuf>,
    pub base_url: Option<String>,
    pub data_dir: Option<PathBuf>,
    pub base_model: Option<String>,
    pub request_timeout_secs: Option<u64>,
}

impl FileConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let config: FileConfig = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;
        Ok(config)
    }
}

impl Config {
    /// Build the configuration from the process environment, the config
    /// file (explicit path or the per-user default) and the given flags.
    pub fn load(overrides: &Overrides) -> Result<Self> {
        let file = match &overrides.config_path {
            Some(path) => FileConfig::load(path)?,
            None => match default_config_path().filter(|p| p.exists()) {
                Some(path) => FileConfig::load(&path)?,
                None => FileConfig::default(),
            },
        };
        Self::resolve(file, |key| std::env::var(key).ok(), overrides)
    }

    /// Merge the layers. `env` is injected so tests do not have to touch
    /// the real process environment.
    pub fn resolve<F>(file: FileConfig, env: F, overrides: &Overrides) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| env(key).filter(|v| !v.trim().is_empty());

        let api_key = non_empty("OPENAI_API_KEY")
            .or_else(|| non_empty("API_KEY"))
            .or(file.api_key)
            .context("API key not set (OPENAI_API_KEY or API_KEY)")?;

        let base_url = overrides
            .base_url
            .clone()
            .or_else(|| non_empty("OPENAI_BASE_URL"))
            .or(file.base_url)
            .unwrap_or_else(|| DEFAULT_BASE_URL.into());

        let data_dir = overrides
            .data_dir
            .clone()
            .or_else(|| non_empty("FINETUNE_DATA_DIR").map(PathBuf::from))
            .or(file.data_dir)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_DATA_DIR));

        let base_model = overrides
            .base_model
            .clone()
            .or_else(|| non_empty("FINETUNE_BASE_MODEL"))
            .or(file.base_model)
            .unwrap_or_else(|| DEFAULT_BASE_MODEL.into());

        let request_timeout = overrides
            .request_timeout_secs
            .or(file.request_timeout_secs)
            .map(Duration::from_secs);

        Ok(Config {
            api_key,
            base_url: base_url.trim_end_matches('/').to_string(),
            data_dir,
            base_model,
            request_timeout,
        })
    }
}

/// `<config dir>/finetune-cli/config.json`, if the platform has a config dir.
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join(CONFIG_DIR_NAME).join(CONFIG_FILE_NAME))
}
