use std::env;
use std::fs;
use std::path::Path;

use serde::Deserialize;
use thiserror::Error;

use crate::core::affinity::AffinityMode;
use crate::core::report::DEFAULT_MASK_WIDTH;

pub const DEFAULT_LOG_FILTER: &str = "warn";

/// Largest useful mask width: 64 bits in hex.
pub const MAX_MASK_WIDTH: usize = 16;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub log_filter: String,
    pub affinity_mode: AffinityMode,
    pub mask_width: usize,
    pub show_cpus: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_filter: DEFAULT_LOG_FILTER.to_string(),
            affinity_mode: AffinityMode::Sentinel,
            mask_width: DEFAULT_MASK_WIDTH,
            show_cpus: false,
        }
    }
}

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(deny_unknown_fields)]
pub struct FileConfig {
    pub log_filter: Option<String>,
    pub affinity_mode: Option<AffinityMode>,
    pub mask_width: Option<usize>,
    pub show_cpus: Option<bool>,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("YAML parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("config parse error: {0}")]
    Parse(String),
}

impl Config {
    /// Reads a TOML or YAML file, picked by extension (TOML when unknown).
    pub fn load_file<P: AsRef<Path>>(path: P) -> Result<FileConfig, ConfigError> {
        let path_ref = path.as_ref();
        let raw = fs::read_to_string(path_ref)?;
        let ext = path_ref
            .extension()
            .and_then(|s| s.to_str())
            .unwrap_or("toml")
            .to_ascii_lowercase();

        if ext == "yaml" || ext == "yml" {
            let cfg: FileConfig = serde_yaml::from_str(&raw)?;
            Ok(cfg)
        } else {
            let cfg: FileConfig = toml::from_str(&raw)?;
            Ok(cfg)
        }
    }

    /// Load configuration from an optional file path and environment variables.
    ///
    /// Precedence: built-in defaults, then file values, then environment.
    /// Without a path, `THREADSCOPE_CONFIG` names the file; with neither, no
    /// file is read.
    pub fn load<P: AsRef<Path>>(path: Option<P>) -> Result<Self, ConfigError> {
        Self::load_with(path, |key: &str| env::var(key).ok())
    }

    /// [`Config::load`] with environment values taken from `lookup`.
    pub fn load_with<P, F>(path: Option<P>, lookup: F) -> Result<Self, ConfigError>
    where
        P: AsRef<Path>,
        F: Fn(&str) -> Option<String>,
    {
        let file_cfg = match path {
            Some(p) => Self::load_file(p)?,
            None => match lookup("THREADSCOPE_CONFIG") {
                Some(p) => Self::load_file(p)?,
                None => FileConfig::default(),
            },
        };

        Self::from_sources(file_cfg, lookup)
    }

    /// Merges file values with overrides from `lookup` (environment-shaped).
    pub fn from_sources<F>(file_cfg: FileConfig, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Config::default();

        // File defaults.
        let mut log_filter = file_cfg.log_filter.unwrap_or(defaults.log_filter);
        let mut affinity_mode = file_cfg.affinity_mode.unwrap_or(defaults.affinity_mode);
        let mut mask_width = file_cfg.mask_width.unwrap_or(defaults.mask_width);
        let mut show_cpus = file_cfg.show_cpus.unwrap_or(defaults.show_cpus);

        // Env overrides.
        if let Some(v) = lookup("THREADSCOPE_LOG") {
            log_filter = v;
        }

        if let Some(v) = lookup("THREADSCOPE_AFFINITY_MODE") {
            affinity_mode = v
                .parse()
                .map_err(|e| ConfigError::Parse(format!("THREADSCOPE_AFFINITY_MODE: {e}")))?;
        }

        if let Some(v) = lookup("THREADSCOPE_MASK_WIDTH") {
            mask_width = v
                .trim()
                .parse()
                .map_err(|e| ConfigError::Parse(format!("THREADSCOPE_MASK_WIDTH: {e}")))?;
        }

        if let Some(v) = lookup("THREADSCOPE_SHOW_CPUS") {
            show_cpus = matches!(v.to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on");
        }

        if !(1..=MAX_MASK_WIDTH).contains(&mask_width) {
            return Err(ConfigError::Parse(format!(
                "mask_width must be between 1 and {MAX_MASK_WIDTH}, got {mask_width}"
            )));
        }

        if let Err(e) = tracing_subscriber::EnvFilter::try_new(&log_filter) {
            return Err(ConfigError::Parse(format!("log_filter '{log_filter}': {e}")));
        }

        Ok(Config {
            log_filter,
            affinity_mode,
            mask_width,
            show_cpus,
        })
    }
}
