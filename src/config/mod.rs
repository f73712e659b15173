//! Configuration system (layered: defaults < TOML file < environment).

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use crate::error::{EngineError, Result};
use crate::graph::DEFAULT_MAX_ITERATIONS;
use crate::provider::openai::DEFAULT_MODEL;
use crate::types::GenerationSettings;
use crate::util::retry::RetryPolicy;

pub const DEFAULT_SYSTEM_PROMPT: &str = "You are a helpful assistant. \
Use the document retrieval tool whenever a question needs facts you were not told in this conversation. \
Keep answers short and friendly.";

/// Engine configuration. Every field has a default.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub model: String,
    pub api_key: Option<String>,
    pub base_url: Option<String>,
    pub system_prompt: String,
    pub max_iterations: usize,
    pub generation_timeout_ms: u64,
    /// Deadline for the agent run of a `respond` call; unbounded when absent.
    pub respond_timeout_ms: Option<u64>,
    pub retry: RetryConfig,
    pub settings: GenerationSettings,
    pub retrieval: RetrievalConfig,
    pub store: StoreConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            model: DEFAULT_MODEL.to_string(),
            api_key: None,
            base_url: None,
            system_prompt: DEFAULT_SYSTEM_PROMPT.to_string(),
            max_iterations: DEFAULT_MAX_ITERATIONS,
            generation_timeout_ms: 60_000,
            respond_timeout_ms: None,
            retry: RetryConfig::default(),
            settings: GenerationSettings::default(),
            retrieval: RetrievalConfig::default(),
            store: StoreConfig::default(),
        }
    }
}

/// Retry policy for a single generate step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    pub max_attempts: u32,
    pub initial_backoff_ms: u64,
    pub max_backoff_ms: u64,
    pub multiplier: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_backoff_ms: 500,
            max_backoff_ms: 30_000,
            multiplier: 2.0,
        }
    }
}

/// How the retrieval tool is advertised and where its passages come from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrievalConfig {
    pub tool_name: String,
    pub description: String,
    pub top_k: usize,
    /// JSON passages file for the keyword index. No retrieval tool without it.
    pub passages_path: Option<PathBuf>,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            tool_name: "retrieve_documents".to_string(),
            description: "Search the knowledge base and return passages relevant to the query."
                .to_string(),
            top_k: 4,
            passages_path: None,
        }
    }
}

#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum StoreKind {
    #[default]
    Memory,
    File,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    pub kind: StoreKind,
    pub directory: Option<PathBuf>,
}

impl EngineConfig {
    /// Defaults overlaid with the environment (`.env` loaded if present).
    pub fn from_env() -> Result<Self> {
        let _ = dotenvy::dotenv();
        let mut config = Self::default();
        config.apply_env()?;
        Ok(config)
    }

    /// Parse a TOML file. Missing keys take their defaults.
    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            EngineError::Configuration(format!("cannot read {}: {e}", path.display()))
        })?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| EngineError::Configuration(e.to_string()))
    }

    /// Full layering: defaults, then the optional file, then the environment.
    /// The result is validated.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let _ = dotenvy::dotenv();
        let mut config = match path {
            Some(path) => Self::from_toml_file(path)?,
            None => Self::default(),
        };
        config.apply_env()?;
        config.validate()?;
        Ok(config)
    }

    /// Overlay environment variables onto this config.
    pub fn apply_env(&mut self) -> Result<()> {
        if let Some(key) = env_var("API_KEY").or_else(|| env_var("OPENAI_API_KEY")) {
            self.api_key = Some(key);
        }
        if let Some(url) = env_var("OPENAI_BASE_URL") {
            self.base_url = Some(url);
        }
        if let Some(model) = env_var("THREADWISE_MODEL") {
            self.model = model;
        }
        if let Some(prompt) = env_var("THREADWISE_SYSTEM_PROMPT") {
            self.system_prompt = prompt;
        }
        if let Some(raw) = env_var("THREADWISE_MAX_ITERATIONS") {
            self.max_iterations = raw.parse().map_err(|_| {
                EngineError::Configuration(format!(
                    "THREADWISE_MAX_ITERATIONS must be a positive integer, got '{raw}'"
                ))
            })?;
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_iterations == 0 {
            return Err(EngineError::Configuration(
                "max_iterations must be at least 1".to_string(),
            ));
        }
        if self.model.trim().is_empty() {
            return Err(EngineError::Configuration("model cannot be empty".to_string()));
        }
        RetryPolicy::from(&self.retry).validate()?;
        if self.retrieval.tool_name.trim().is_empty() {
            return Err(EngineError::Configuration(
                "retrieval.tool_name cannot be empty".to_string(),
            ));
        }
        if self.retrieval.top_k == 0 {
            return Err(EngineError::Configuration(
                "retrieval.top_k must be at least 1".to_string(),
            ));
        }
        if self.store.kind == StoreKind::File && self.store.directory.is_none() {
            return Err(EngineError::Configuration(
                "store.directory is required for the file store".to_string(),
            ));
        }
        Ok(())
    }

    pub fn generation_timeout(&self) -> Duration {
        Duration::from_millis(self.generation_timeout_ms)
    }

    pub fn respond_timeout(&self) -> Option<Duration> {
        self.respond_timeout_ms.map(Duration::from_millis)
    }
}

fn env_var(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}
