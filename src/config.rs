use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::display::DEFAULT_LIMIT;
use crate::embedding::DEFAULT_OUTPUT_EMBEDDING_LENGTH;
use crate::store::DEFAULT_IMAGE_SIZE;

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub store: StoreConfig,

    #[serde(default)]
    pub model: ModelConfig,

    #[serde(default)]
    pub display: DisplayConfig,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    /// Directory on disk laid out like the bucket
    #[default]
    Local,
    /// S3-compatible bucket reachable over HTTPS
    Http,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    #[serde(default)]
    pub backend: StoreBackend,

    /// Root directory for the local backend
    #[serde(default = "default_store_root")]
    pub root: PathBuf,

    /// Bucket URL for the http backend, e.g. `https://<bucket>.s3.amazonaws.com`
    #[serde(default = "default_store_base_url")]
    pub base_url: String,

    /// Size variant used when none is given on the command line
    #[serde(default = "default_image_size")]
    pub image_size: String,

    #[serde(default = "default_store_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_store_root() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("catalog-embed")
        .join("bucket")
}

fn default_store_base_url() -> String {
    "https://amazon-berkeley-objects.s3.amazonaws.com".to_string()
}

fn default_image_size() -> String {
    DEFAULT_IMAGE_SIZE.to_string()
}

fn default_store_timeout_secs() -> u64 {
    30
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: StoreBackend::default(),
            root: default_store_root(),
            base_url: default_store_base_url(),
            image_size: default_image_size(),
            timeout_secs: default_store_timeout_secs(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    /// Runtime endpoint; requests go to `{endpoint}/model/{model_id}/invoke`
    #[serde(default = "default_model_endpoint")]
    pub endpoint: String,

    #[serde(default = "default_model_id")]
    pub model_id: String,

    /// Bearer API key. Falls back to `AWS_BEARER_TOKEN_BEDROCK` when unset.
    #[serde(default)]
    pub api_key: Option<String>,

    #[serde(default = "default_output_embedding_length")]
    pub output_embedding_length: u32,

    #[serde(default = "default_model_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_model_endpoint() -> String {
    "https://bedrock-runtime.us-east-1.amazonaws.com".to_string()
}

fn default_model_id() -> String {
    "amazon.titan-embed-image-v1".to_string()
}

fn default_output_embedding_length() -> u32 {
    DEFAULT_OUTPUT_EMBEDDING_LENGTH
}

fn default_model_timeout_secs() -> u64 {
    60
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            endpoint: default_model_endpoint(),
            model_id: default_model_id(),
            api_key: None,
            output_embedding_length: default_output_embedding_length(),
            timeout_secs: default_model_timeout_secs(),
        }
    }
}

impl ModelConfig {
    /// Configured key, or the one from the environment
    pub fn resolved_api_key(&self) -> Option<String> {
        self.api_key
            .clone()
            .or_else(|| std::env::var("AWS_BEARER_TOKEN_BEDROCK").ok())
            .filter(|key| !key.is_empty())
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ImageProtocol {
    /// Query the terminal for its graphics protocol
    #[default]
    Auto,
    Halfblocks,
    /// Captions only
    None,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DisplayConfig {
    #[serde(default = "default_limit")]
    pub limit: usize,

    #[serde(default = "default_panel_width")]
    pub panel_width: u32,

    #[serde(default = "default_panel_height")]
    pub panel_height: u32,

    #[serde(default)]
    pub protocol: ImageProtocol,
}

fn default_limit() -> usize {
    DEFAULT_LIMIT
}

// 3x2 inch panels at 100 dpi
fn default_panel_width() -> u32 {
    300
}

fn default_panel_height() -> u32 {
    200
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            limit: default_limit(),
            panel_width: default_panel_width(),
            panel_height: default_panel_height(),
            protocol: ImageProtocol::default(),
        }
    }
}

impl Config {
    /// Load from `CATALOG_EMBED_CONFIG` or the default location, writing a
    /// default file when none exists yet.
    pub fn load() -> Result<Self> {
        let config_path = match std::env::var_os("CATALOG_EMBED_CONFIG") {
            Some(path) => PathBuf::from(path),
            None => Self::config_dir().join("config.toml"),
        };

        if config_path.exists() {
            Self::load_from(&config_path)
        } else {
            let config = Config::default();
            config.save_to(&config_path)?;
            Ok(config)
        }
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config {}", path.display()))?;
        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config {}", path.display()))?;
        Ok(config)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;

        Ok(())
    }

    pub fn config_dir() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("catalog-embed")
    }
}
