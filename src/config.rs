// ⚙️ Configuration - TOML file with environment overrides
//
// Priority: CLI flags > env vars > config file > defaults

use crate::corrections::{CorrectionSet, MetricsCorrection};
use crate::repository::InMemoryRepository;
use crate::sample::sample_repository;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::{Path, PathBuf};

/// Env var naming the config file
pub const CONFIG_ENV: &str = "CIRCULAR_TRACE_CONFIG";
/// Env var overriding `data_path`
pub const DATA_ENV: &str = "CIRCULAR_TRACE_DATA";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,

    /// Directory holding the bundled single-page app
    #[serde(default = "default_static_dir")]
    pub static_dir: PathBuf,
}

fn default_bind_addr() -> String {
    "0.0.0.0:3000".to_string()
}

fn default_static_dir() -> PathBuf {
    PathBuf::from("dist")
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfig {
            bind_addr: default_bind_addr(),
            static_dir: default_static_dir(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// JSON dataset; the built-in sample is used when unset
    #[serde(default)]
    pub data_path: Option<PathBuf>,

    /// Where the CLI writes exports
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,

    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub corrections: Vec<MetricsCorrection>,
}

fn default_output_dir() -> PathBuf {
    PathBuf::from(".")
}

impl Default for Config {
    fn default() -> Self {
        Config {
            data_path: None,
            output_dir: default_output_dir(),
            server: ServerConfig::default(),
            corrections: Vec::new(),
        }
    }
}

impl Config {
    /// Load from an explicit path, else from `CIRCULAR_TRACE_CONFIG`, else defaults
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let from_env = env::var_os(CONFIG_ENV).map(PathBuf::from);
        let mut config = match path.map(Path::to_path_buf).or(from_env) {
            Some(p) => Self::from_file(&p)?,
            None => Config::default(),
        };

        if let Some(data) = env::var_os(DATA_ENV) {
            config.data_path = Some(PathBuf::from(data));
        }

        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;
        Self::from_toml(&contents).with_context(|| format!("Failed to parse config file: {:?}", path))
    }

    pub fn from_toml(contents: &str) -> Result<Self> {
        Ok(toml::from_str(contents)?)
    }

    pub fn correction_set(&self) -> CorrectionSet {
        CorrectionSet::from_corrections(self.corrections.clone())
    }

    /// Repository backing this configuration
    pub fn repository(&self) -> Result<InMemoryRepository> {
        match &self.data_path {
            Some(path) => InMemoryRepository::from_json_file(path),
            None => {
                log::info!("no data_path configured, using the built-in sample dataset");
                Ok(sample_repository())
            }
        }
    }
}
