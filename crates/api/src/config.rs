use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use extract::{LlmClient, OllamaClient, OpenAiClient, RetryPolicy};
use ingest::ChunkerConfig;

/// Environment variable naming an optional JSON config file.
pub const CONFIG_PATH_VAR: &str = "DECK_CONFIG";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub llm: LlmConfig,
    pub chunking: ChunkingConfig,
    pub retry: RetryConfig,
    pub cache: CacheConfig,
    pub charts: ChartsConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind_addr: String,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum LlmProvider {
    OpenAi,
    Ollama,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    pub provider: LlmProvider,
    pub base_url: String,
    pub model: String,
    /// Never serialized back out.
    #[serde(skip_serializing)]
    pub api_key: Option<String>,
    pub temperature: f32,
    pub max_tokens: u32,
    pub request_timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChunkingConfig {
    /// Default for requests that do not say.
    pub enabled: bool,
    pub chunk_size: usize,
    pub overlap: usize,
    pub min_chunk_len: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    pub max_retries: usize,
    pub backoff_step_ms: u64,
    pub max_backoff_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    pub enabled: bool,
    pub max_entries: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChartsConfig {
    pub top_n: usize,
    pub max_kpi_cards: usize,
    pub fill_kpi_placeholders: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0:5001".to_string(),
        }
    }
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: LlmProvider::OpenAi,
            base_url: extract::llm::openai::DEFAULT_BASE_URL.to_string(),
            model: "gpt-4o-mini".to_string(),
            api_key: None,
            temperature: 0.1,
            max_tokens: 2000,
            request_timeout_secs: 60,
        }
    }
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        let chunker = ChunkerConfig::default();
        Self {
            enabled: false,
            chunk_size: chunker.chunk_size,
            overlap: chunker.overlap,
            min_chunk_len: chunker.min_chunk_len,
        }
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            backoff_step_ms: 2000,
            max_backoff_ms: 8000,
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_entries: 10000,
        }
    }
}

impl Default for ChartsConfig {
    fn default() -> Self {
        Self {
            top_n: charts::DEFAULT_TOP_N,
            max_kpi_cards: 6,
            fill_kpi_placeholders: false,
        }
    }
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

impl AppConfig {
    /// Defaults, then the file named by `DECK_CONFIG` if set, then
    /// environment overrides.
    pub fn load() -> Result<Self> {
        let mut config = match std::env::var(CONFIG_PATH_VAR) {
            Ok(path) => Self::from_file(Path::new(&path))?,
            Err(_) => Self::default(),
        };
        config.apply_overrides(|key| std::env::var(key).ok());
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        serde_json::from_str(&raw)
            .with_context(|| format!("Failed to parse config file {}", path.display()))
    }

    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(key) = lookup("OPENAI_API_KEY").filter(|k| !k.trim().is_empty()) {
            self.llm.api_key = Some(key);
        }
        match lookup("LLM_PROVIDER").map(|p| p.trim().to_ascii_lowercase()).as_deref() {
            Some("openai") => self.llm.provider = LlmProvider::OpenAi,
            Some("ollama") => {
                if self.llm.provider != LlmProvider::Ollama {
                    self.llm.base_url = "http://localhost:11434".to_string();
                    self.llm.model = "llama3".to_string();
                }
                self.llm.provider = LlmProvider::Ollama;
            }
            Some(other) => tracing::warn!(provider = other, "Unknown LLM_PROVIDER, keeping configured provider"),
            None => {}
        }
        if let Some(url) = lookup("LLM_BASE_URL") {
            self.llm.base_url = url;
        }
        if let Some(model) = lookup("LLM_MODEL") {
            self.llm.model = model;
        }
        if let Some(enabled) = lookup("USE_CHUNKING").as_deref().and_then(parse_flag) {
            self.chunking.enabled = enabled;
        }
        if let Some(addr) = lookup("BIND_ADDR") {
            self.server.bind_addr = addr;
        }
    }

    pub fn chunker_config(&self) -> ChunkerConfig {
        ChunkerConfig {
            chunk_size: self.chunking.chunk_size,
            overlap: self.chunking.overlap,
            min_chunk_len: self.chunking.min_chunk_len,
        }
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::linear(
            self.retry.max_retries,
            self.retry.backoff_step_ms,
            self.retry.max_backoff_ms,
        )
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.llm.request_timeout_secs)
    }

    pub fn build_llm_client(&self) -> std::sync::Arc<dyn LlmClient> {
        let llm = &self.llm;
        match llm.provider {
            LlmProvider::OpenAi => std::sync::Arc::new(
                OpenAiClient::new(&llm.base_url, &llm.model, llm.api_key.clone(), self.request_timeout())
                    .with_sampling(llm.temperature, llm.max_tokens),
            ),
            LlmProvider::Ollama => std::sync::Arc::new(
                OllamaClient::new(&llm.base_url, &llm.model, self.request_timeout())
                    .with_temperature(llm.temperature),
            ),
        }
    }
}
