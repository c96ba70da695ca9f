//! TOML configuration with environment overrides.
//!
//! ```toml
//! [elasticsearch]
//! url = "http://127.0.0.1:9200"
//! user = "elastic"
//! pass = "password"
//! timeout_secs = 30
//!
//! [index]
//! prefix = "telos-mainnet"
//! delta_spec = "delta-v1.5"
//! action_spec = "action-v1.5"
//! docs_per_index = 10000000
//!
//! [integrity]
//! scan_window = 10000000
//! duplicate_page_size = 100
//! backstep_base = 10
//! backstep_attempts = 5
//! ```
//!
//! Every key is optional. `IX_ES_URL`, `IX_ES_USER`, `IX_ES_PASS` and
//! `IX_CHAIN_PREFIX` override the file.

use index_integrity::{ElasticConfig, IndexLayout, IntegrityConfig};
use serde::Deserialize;
use std::fs;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

const DEFAULT_URL: &str = "http://127.0.0.1:9200";
const DEFAULT_PREFIX: &str = "telos-mainnet";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read {path}: {error}")]
    Io { path: String, error: String },

    #[error("Failed to parse config: {0}")]
    Parse(String),
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct ConfigFile {
    #[serde(default)]
    elasticsearch: ElasticSection,
    #[serde(default)]
    index: IndexSection,
    #[serde(default)]
    integrity: IntegritySection,
}

#[derive(Debug, Default, Deserialize)]
struct ElasticSection {
    url: Option<String>,
    user: Option<String>,
    pass: Option<String>,
    timeout_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct IndexSection {
    prefix: Option<String>,
    delta_spec: Option<String>,
    action_spec: Option<String>,
    docs_per_index: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct IntegritySection {
    scan_window: Option<u64>,
    duplicate_page_size: Option<usize>,
    backstep_base: Option<u64>,
    backstep_attempts: Option<u32>,
}

/// Everything the CLI needs to build the engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdminConfig {
    pub elastic: ElasticConfig,
    pub integrity: IntegrityConfig,
}

impl Default for AdminConfig {
    fn default() -> Self {
        Self::from_file(ConfigFile::default())
    }
}

impl AdminConfig {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path.as_ref()).map_err(|e| ConfigError::Io {
            path: path.as_ref().display().to_string(),
            error: e.to_string(),
        })?;
        Self::parse(&content)
    }

    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        let file: ConfigFile = toml::from_str(content).map_err(|e| ConfigError::Parse(e.to_string()))?;
        Ok(Self::from_file(file))
    }

    fn from_file(file: ConfigFile) -> Self {
        let es = file.elasticsearch;
        let mut elastic = ElasticConfig::new(es.url.unwrap_or_else(|| DEFAULT_URL.to_string()));
        elastic.user = es.user;
        elastic.pass = es.pass;
        if let Some(secs) = es.timeout_secs {
            elastic.timeout = Duration::from_secs(secs);
        }

        let ix = file.index;
        let mut layout = IndexLayout::new(ix.prefix.unwrap_or_else(|| DEFAULT_PREFIX.to_string()));
        if let Some(spec) = ix.delta_spec {
            layout.delta_spec = spec;
        }
        if let Some(spec) = ix.action_spec {
            layout.action_spec = spec;
        }
        if let Some(docs) = ix.docs_per_index {
            layout.docs_per_index = docs;
        }

        let ic = file.integrity;
        let mut integrity = IntegrityConfig::new(layout);
        if let Some(window) = ic.scan_window {
            integrity.scan_window = window;
        }
        if let Some(size) = ic.duplicate_page_size {
            integrity.duplicate_page_size = size;
        }
        if let Some(base) = ic.backstep_base {
            integrity.backstep_base = base;
        }
        if let Some(attempts) = ic.backstep_attempts {
            integrity.backstep_attempts = attempts;
        }

        Self { elastic, integrity }
    }

    /// Apply `IX_*` overrides read through `var`.
    pub fn apply_env<F>(&mut self, var: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = var("IX_ES_URL") {
            self.elastic.url = url;
        }
        if let Some(user) = var("IX_ES_USER") {
            self.elastic.user = Some(user);
        }
        if let Some(pass) = var("IX_ES_PASS") {
            self.elastic.pass = Some(pass);
        }
        if let Some(prefix) = var("IX_CHAIN_PREFIX") {
            self.integrity.layout.chain_prefix = prefix;
        }
    }

    pub fn chain_prefix(&self) -> &str {
        &self.integrity.layout.chain_prefix
    }
}
