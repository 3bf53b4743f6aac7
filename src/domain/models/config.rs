//! Configuration tree for the Quarry engine.
//!
//! Every section has serde defaults so a missing config file still yields a
//! working engine; the loader layers YAML files and `QUARRY_` environment
//! variables on top.

use serde::{Deserialize, Serialize};

use super::chunk::ChunkOptions;

/// Main configuration structure for Quarry
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct QuarryConfig {
    /// Chunking parameters
    #[serde(default)]
    pub chunking: ChunkOptions,

    /// Embedding provider selection and credentials
    #[serde(default)]
    pub embedding: EmbeddingConfig,

    /// Retry policy for provider calls
    #[serde(default)]
    pub retry: RetryConfig,

    /// Embedding cache configuration
    #[serde(default)]
    pub cache: CacheConfig,

    /// Vector store configuration
    #[serde(default)]
    pub store: StoreConfig,

    /// Batch ingestion configuration
    #[serde(default)]
    pub ingestion: IngestionConfig,

    /// Retrieval and deduplication configuration
    #[serde(default)]
    pub retrieval: RetrievalConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Default for QuarryConfig {
    fn default() -> Self {
        Self {
            chunking: ChunkOptions::default(),
            embedding: EmbeddingConfig::default(),
            retry: RetryConfig::default(),
            cache: CacheConfig::default(),
            store: StoreConfig::default(),
            ingestion: IngestionConfig::default(),
            retrieval: RetrievalConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

/// Embedding provider configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct EmbeddingConfig {
    /// Provider name: openai, azure (alias azure-openai), ollama (alias local)
    #[serde(default = "default_provider")]
    pub provider: String,

    /// Model identifier passed to the provider
    #[serde(default = "default_model")]
    pub model: String,

    /// Expected vector dimension; every returned and stored vector is
    /// validated against this
    #[serde(default = "default_dimension")]
    pub dimension: usize,

    /// Texts per provider request; requests are split at `MAX_BATCH_SIZE`
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    /// API key; falls back to the provider's conventional environment
    /// variable when unset
    #[serde(default)]
    pub api_key: Option<String>,

    /// Endpoint override (required for azure, optional elsewhere)
    #[serde(default)]
    pub base_url: Option<String>,

    /// Azure deployment name; defaults to `model` when unset
    #[serde(default)]
    pub deployment: Option<String>,

    /// Azure API version query parameter
    #[serde(default = "default_api_version")]
    pub api_version: String,

    /// Per-request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_provider() -> String {
    "openai".to_string()
}

fn default_model() -> String {
    "text-embedding-3-small".to_string()
}

const fn default_dimension() -> usize {
    1536
}

const fn default_batch_size() -> usize {
    10
}

fn default_api_version() -> String {
    "2024-02-01".to_string()
}

const fn default_timeout_secs() -> u64 {
    30
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            model: default_model(),
            dimension: default_dimension(),
            batch_size: default_batch_size(),
            api_key: None,
            base_url: None,
            deployment: None,
            api_version: default_api_version(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

/// Retry policy configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct RetryConfig {
    /// Total attempts including the first (so 3 means 2 retries)
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Delay before the second attempt in milliseconds
    #[serde(default = "default_base_delay_ms")]
    pub base_delay_ms: u64,

    /// Exponential growth factor between delays
    #[serde(default = "default_multiplier")]
    pub multiplier: f64,

    /// Uniform jitter applied to each delay, as a fraction in [0, 1]
    #[serde(default = "default_jitter_factor")]
    pub jitter_factor: f64,

    /// Ceiling on any single delay in milliseconds
    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,
}

const fn default_max_attempts() -> u32 {
    3
}

const fn default_base_delay_ms() -> u64 {
    200
}

const fn default_multiplier() -> f64 {
    2.0
}

const fn default_jitter_factor() -> f64 {
    0.2
}

const fn default_max_delay_ms() -> u64 {
    10_000
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            base_delay_ms: default_base_delay_ms(),
            multiplier: default_multiplier(),
            jitter_factor: default_jitter_factor(),
            max_delay_ms: default_max_delay_ms(),
        }
    }
}

/// Embedding cache configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct CacheConfig {
    /// Disable to skip both population and fallback reads
    #[serde(default = "default_cache_enabled")]
    pub enabled: bool,

    /// Entry time-to-live in seconds
    #[serde(default = "default_cache_ttl_secs")]
    pub ttl_secs: u64,

    /// Hard cap on entries; oldest entries are evicted past it
    #[serde(default = "default_cache_max_entries")]
    pub max_entries: u64,
}

const fn default_cache_enabled() -> bool {
    true
}

const fn default_cache_ttl_secs() -> u64 {
    3600
}

const fn default_cache_max_entries() -> u64 {
    10_000
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: default_cache_enabled(),
            ttl_secs: default_cache_ttl_secs(),
            max_entries: default_cache_max_entries(),
        }
    }
}

/// Vector store configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct StoreConfig {
    /// Path to the `SQLite` database file
    #[serde(default = "default_database_path")]
    pub database_path: String,

    /// Maximum number of pooled connections
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

fn default_database_path() -> String {
    "quarry.db".to_string()
}

const fn default_max_connections() -> u32 {
    5
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
            max_connections: default_max_connections(),
        }
    }
}

/// Batch ingestion configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct IngestionConfig {
    /// Files processed concurrently within one batch
    #[serde(default = "default_max_parallel_files")]
    pub max_parallel_files: usize,

    /// Keep processing remaining files after one fails
    #[serde(default = "default_continue_on_error")]
    pub continue_on_error: bool,
}

const fn default_max_parallel_files() -> usize {
    4
}

const fn default_continue_on_error() -> bool {
    true
}

impl Default for IngestionConfig {
    fn default() -> Self {
        Self {
            max_parallel_files: default_max_parallel_files(),
            continue_on_error: default_continue_on_error(),
        }
    }
}

/// Retrieval configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct RetrievalConfig {
    /// Distinct source files surviving deduplication
    #[serde(default = "default_max_context_documents")]
    pub max_context_documents: usize,

    /// Raw chunk hits fetched from the store before deduplication
    #[serde(default = "default_top_k")]
    pub top_k: usize,
}

const fn default_max_context_documents() -> usize {
    5
}

const fn default_top_k() -> usize {
    20
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            max_context_documents: default_max_context_documents(),
            top_k: default_top_k(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct LoggingConfig {
    /// Log level: trace, debug, info, warn, error
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log format: json or pretty
    #[serde(default = "default_log_format")]
    pub format: String,

    /// Optional directory for a daily-rotated log file
    #[serde(default)]
    pub directory: Option<String>,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
            directory: None,
        }
    }
}
