// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration file support for ragpipe
//!
//! Loads configuration from .ragpiperc.toml in current directory or ~/.config/ragpipe/config.toml

use anyhow::{Context, Result};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// How chunk ids are assigned at ingestion time
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IdStrategy {
    /// Hash of source, offset and content; re-ingestion overwrites
    #[default]
    Hash,
    /// Random v4 UUID; re-ingestion appends
    Random,
}

/// Vector index configuration
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct IndexConfig {
    /// Base directory; each backend gets its own subdirectory
    pub base_path: Option<PathBuf>,
    /// Collection name inside the backend directory
    pub collection: Option<String>,
    /// Records embedded and written per batch
    pub batch_size: Option<usize>,
    /// Chunks returned per query
    pub top_k: Option<usize>,
    /// Chunk id assignment
    pub id_strategy: Option<IdStrategy>,
}

impl IndexConfig {
    /// Get base path (defaults to ".ragpipe/index")
    pub fn base_path(&self) -> PathBuf {
        self.base_path
            .clone()
            .unwrap_or_else(|| PathBuf::from(".ragpipe").join("index"))
    }

    /// Get collection name (defaults to "knowledge_base")
    pub fn collection(&self) -> &str {
        self.collection.as_deref().unwrap_or("knowledge_base")
    }

    /// Get batch size (defaults to 100)
    pub fn batch_size(&self) -> usize {
        match self.batch_size {
            Some(0) | None => 100,
            Some(n) => n,
        }
    }

    /// Get top-k (defaults to 4)
    pub fn top_k(&self) -> usize {
        self.top_k.unwrap_or(4)
    }

    /// Get id strategy (defaults to Hash)
    pub fn id_strategy(&self) -> IdStrategy {
        self.id_strategy.unwrap_or_default()
    }
}

/// Splitter configuration
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct SplitterConfig {
    /// Characters repeated between consecutive chunks
    pub chunk_overlap: Option<usize>,
    /// Per-backend chunk size overrides
    pub chunk_sizes: HashMap<String, usize>,
    /// Chunk size for backends not in `chunk_sizes`
    pub default_chunk_size: Option<usize>,
    /// Documents above this size are skipped
    pub max_document_bytes: Option<usize>,
}

impl SplitterConfig {
    /// Get chunk overlap (defaults to 100)
    pub fn chunk_overlap(&self) -> usize {
        self.chunk_overlap.unwrap_or(100)
    }

    /// Get default chunk size (defaults to 1000)
    pub fn default_chunk_size(&self) -> usize {
        self.default_chunk_size.unwrap_or(1000)
    }

    /// Get max document bytes (defaults to 2MB)
    pub fn max_document_bytes(&self) -> usize {
        self.max_document_bytes.unwrap_or(2_000_000)
    }
}

/// Loader configuration
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct LoaderConfig {
    /// Files above this size are skipped
    pub max_file_bytes: Option<u64>,
}

impl LoaderConfig {
    /// Get max file bytes (defaults to 2MB)
    pub fn max_file_bytes(&self) -> u64 {
        self.max_file_bytes.unwrap_or(2_000_000)
    }
}

/// Outbound HTTP configuration
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    /// Per-call timeout in seconds
    pub timeout_secs: Option<u64>,
}

impl HttpConfig {
    /// Get per-call timeout (defaults to 30 seconds)
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs.unwrap_or(30))
    }
}

/// Feature-extraction endpoint backend ("hf")
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct EndpointEmbeddingConfig {
    /// Full endpoint URL; derived from `model` when absent
    pub url: Option<String>,
    /// Model identifier
    pub model: Option<String>,
    /// Environment variable holding the bearer token
    pub token_env: Option<String>,
}

impl EndpointEmbeddingConfig {
    /// Get model (defaults to "sentence-transformers/all-MiniLM-L6-v2")
    pub fn model(&self) -> &str {
        self.model
            .as_deref()
            .unwrap_or("sentence-transformers/all-MiniLM-L6-v2")
    }

    /// Get endpoint URL (defaults to the hosted inference route for `model`)
    pub fn url(&self) -> String {
        self.url.clone().unwrap_or_else(|| {
            format!(
                "https://router.huggingface.co/hf-inference/models/{}/pipeline/feature-extraction",
                self.model()
            )
        })
    }

    /// Get token variable name (defaults to "HF_ACCESS_TOKEN")
    pub fn token_env(&self) -> &str {
        self.token_env.as_deref().unwrap_or("HF_ACCESS_TOKEN")
    }
}

/// Gemini embedding backend
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct GeminiEmbeddingConfig {
    pub model: Option<String>,
    pub base_url: Option<String>,
    pub api_key_env: Option<String>,
}

impl GeminiEmbeddingConfig {
    /// Get model (defaults to "text-embedding-004")
    pub fn model(&self) -> &str {
        self.model.as_deref().unwrap_or("text-embedding-004")
    }

    /// Get base URL (defaults to the public v1beta API)
    pub fn base_url(&self) -> &str {
        self.base_url
            .as_deref()
            .unwrap_or("https://generativelanguage.googleapis.com/v1beta")
    }

    /// Get API key variable name (defaults to "GEMINI_API_KEY")
    pub fn api_key_env(&self) -> &str {
        self.api_key_env.as_deref().unwrap_or("GEMINI_API_KEY")
    }
}

/// Offline hashing backend
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct HashingEmbeddingConfig {
    pub dimension: Option<usize>,
}

impl HashingEmbeddingConfig {
    /// Get dimension (defaults to 1024)
    pub fn dimension(&self) -> usize {
        match self.dimension {
            Some(0) | None => 1024,
            Some(n) => n,
        }
    }
}

/// Embedding backends
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct EmbeddingsConfig {
    pub hf: EndpointEmbeddingConfig,
    pub gemini: GeminiEmbeddingConfig,
    pub hashing: HashingEmbeddingConfig,
}

/// Wire protocol of a language model candidate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelProvider {
    Gemini,
    /// Any `/chat/completions` API (Groq, OpenAI, local servers)
    Openai,
}

/// One language model candidate
#[derive(Debug, Clone, Deserialize)]
pub struct ModelConfig {
    pub provider: ModelProvider,
    pub model: String,
    #[serde(default)]
    pub base_url: Option<String>,
    #[serde(default)]
    pub api_key_env: Option<String>,
    #[serde(default)]
    pub temperature: Option<f32>,
}

impl ModelConfig {
    /// Get base URL (defaults per provider: Gemini v1beta, Groq OpenAI-compatible)
    pub fn base_url(&self) -> &str {
        self.base_url.as_deref().unwrap_or(match self.provider {
            ModelProvider::Gemini => "https://generativelanguage.googleapis.com/v1beta",
            ModelProvider::Openai => "https://api.groq.com/openai/v1",
        })
    }

    /// Get API key variable name (defaults per provider)
    pub fn api_key_env(&self) -> &str {
        self.api_key_env.as_deref().unwrap_or(match self.provider {
            ModelProvider::Gemini => "GEMINI_API_KEY",
            ModelProvider::Openai => "GROQ_API_KEY",
        })
    }

    /// Get temperature (defaults to 0.2)
    pub fn temperature(&self) -> f32 {
        self.temperature.unwrap_or(0.2)
    }
}

/// Answer generation configuration
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct GenerationConfig {
    /// Prompt template with `{context}` and `{query}` placeholders
    pub prompt_path: Option<PathBuf>,
    /// Candidate models, tried in order
    pub models: Option<Vec<ModelConfig>>,
}

impl GenerationConfig {
    /// Get prompt path (defaults to "prompts/rag.txt")
    pub fn prompt_path(&self) -> PathBuf {
        self.prompt_path
            .clone()
            .unwrap_or_else(|| PathBuf::from("prompts").join("rag.txt"))
    }

    /// Get candidate models (defaults to Gemini, then Groq)
    pub fn models(&self) -> Vec<ModelConfig> {
        self.models.clone().unwrap_or_else(|| {
            vec![
                ModelConfig {
                    provider: ModelProvider::Gemini,
                    model: "gemini-1.5-flash".to_string(),
                    base_url: None,
                    api_key_env: None,
                    temperature: None,
                },
                ModelConfig {
                    provider: ModelProvider::Openai,
                    model: "llama-3.1-8b-instant".to_string(),
                    base_url: None,
                    api_key_env: None,
                    temperature: None,
                },
            ]
        })
    }
}

/// Configuration loaded from .ragpiperc.toml or ~/.config/ragpipe/config.toml
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub index: IndexConfig,
    pub splitter: SplitterConfig,
    pub loader: LoaderConfig,
    pub http: HttpConfig,
    pub embeddings: EmbeddingsConfig,
    pub generation: GenerationConfig,
}

impl Config {
    /// Load configuration from files
    ///
    /// Precedence (highest to lowest):
    /// 1. .ragpiperc.toml in current directory
    /// 2. ~/.config/ragpipe/config.toml
    pub fn load() -> Self {
        if let Some(config) = Self::load_from_path(Path::new(".ragpiperc.toml")) {
            return config;
        }

        if let Some(home) = dirs::home_dir() {
            let config_path = home.join(".config").join("ragpipe").join("config.toml");
            if let Some(config) = Self::load_from_path(&config_path) {
                return config;
            }
        }

        Self::default()
    }

    /// Load an explicitly requested file; unlike [`Config::load`], failures are errors.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config {}", path.display()))?;
        toml::from_str(&content)
            .with_context(|| format!("Failed to parse config {}", path.display()))
    }

    fn load_from_path(path: &Path) -> Option<Self> {
        let content = std::fs::read_to_string(path).ok()?;
        match toml::from_str(&content) {
            Ok(config) => Some(config),
            Err(e) => {
                tracing::warn!("Failed to parse {}: {}", path.display(), e);
                None
            }
        }
    }
}
