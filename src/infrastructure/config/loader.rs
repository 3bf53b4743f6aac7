use anyhow::{Context, Result};
use figment::providers::{Env, Format, Serialized, Yaml};
use figment::Figment;
use thiserror::Error;

use crate::domain::models::QuarryConfig;

/// Configuration error types
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid chunking configuration: {0}")]
    InvalidChunking(String),

    #[error("Embedding provider cannot be empty")]
    EmptyProvider,

    #[error("Invalid embedding dimension: {0}. Must be at least 1")]
    InvalidDimension(usize),

    #[error("Invalid batch_size: {0}. Must be at least 1")]
    InvalidBatchSize(usize),

    #[error("Invalid max_attempts: {0}. Cannot be 0")]
    InvalidMaxAttempts(u32),

    #[error("Invalid jitter_factor: {0}. Must be between 0.0 and 1.0")]
    InvalidJitter(f64),

    #[error(
        "Invalid backoff configuration: base_delay_ms ({0}) must not exceed max_delay_ms ({1})"
    )]
    InvalidBackoff(u64, u64),

    #[error("Database path cannot be empty")]
    EmptyDatabasePath,

    #[error("Invalid max_connections: {0}. Must be at least 1")]
    InvalidMaxConnections(u32),

    #[error("Invalid max_parallel_files: {0}. Must be at least 1")]
    InvalidParallelism(usize),

    #[error("Invalid log level: {0}. Must be one of: trace, debug, info, warn, error")]
    InvalidLogLevel(String),

    #[error("Invalid log format: {0}. Must be one of: json, pretty")]
    InvalidLogFormat(String),

    #[error("Configuration validation failed: {0}")]
    ValidationFailed(String),
}

/// Configuration loader with hierarchical merging
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration with hierarchical merging
    ///
    /// Precedence (lowest to highest):
    /// 1. Programmatic defaults (Serialized)
    /// 2. quarry.yaml (project config)
    /// 3. quarry.local.yaml (local overrides, optional, git-ignored)
    /// 4. Environment variables (`QUARRY_`* prefix, highest priority)
    ///
    /// Nested fields use `__` in environment variables, e.g.
    /// `QUARRY_CHUNKING__CHUNK_SIZE=256`.
    pub fn load() -> Result<QuarryConfig> {
        let config: QuarryConfig = Figment::new()
            .merge(Serialized::defaults(QuarryConfig::default()))
            .merge(Yaml::file("quarry.yaml"))
            .merge(Yaml::file("quarry.local.yaml"))
            .merge(Env::prefixed("QUARRY_").split("__"))
            .extract()
            .context("Failed to extract configuration from figment")?;

        Self::validate(&config)?;
        Ok(config)
    }

    /// Load configuration from a specific file, still honoring env overrides
    pub fn load_from_file(path: impl AsRef<std::path::Path>) -> Result<QuarryConfig> {
        let config: QuarryConfig = Figment::new()
            .merge(Serialized::defaults(QuarryConfig::default()))
            .merge(Yaml::file(path.as_ref()))
            .merge(Env::prefixed("QUARRY_").split("__"))
            .extract()
            .context(format!(
                "Failed to load config from {}",
                path.as_ref().display()
            ))?;

        Self::validate(&config)?;
        Ok(config)
    }

    /// Validate configuration after loading
    pub fn validate(config: &QuarryConfig) -> Result<(), ConfigError> {
        config
            .chunking
            .validate()
            .map_err(ConfigError::InvalidChunking)?;

        if config.embedding.provider.trim().is_empty() {
            return Err(ConfigError::EmptyProvider);
        }

        if config.embedding.dimension == 0 {
            return Err(ConfigError::InvalidDimension(config.embedding.dimension));
        }

        if config.embedding.batch_size == 0 {
            return Err(ConfigError::InvalidBatchSize(config.embedding.batch_size));
        }

        if config.retry.max_attempts == 0 {
            return Err(ConfigError::InvalidMaxAttempts(config.retry.max_attempts));
        }

        if !(0.0..=1.0).contains(&config.retry.jitter_factor) {
            return Err(ConfigError::InvalidJitter(config.retry.jitter_factor));
        }

        if config.retry.base_delay_ms > config.retry.max_delay_ms {
            return Err(ConfigError::InvalidBackoff(
                config.retry.base_delay_ms,
                config.retry.max_delay_ms,
            ));
        }

        if config.store.database_path.is_empty() {
            return Err(ConfigError::EmptyDatabasePath);
        }

        if config.store.max_connections == 0 {
            return Err(ConfigError::InvalidMaxConnections(
                config.store.max_connections,
            ));
        }

        if config.ingestion.max_parallel_files == 0 {
            return Err(ConfigError::InvalidParallelism(
                config.ingestion.max_parallel_files,
            ));
        }

        if config.retrieval.top_k == 0 {
            return Err(ConfigError::ValidationFailed(
                "retrieval.top_k must be at least 1".to_string(),
            ));
        }

        if config.retrieval.max_context_documents == 0 {
            return Err(ConfigError::ValidationFailed(
                "retrieval.max_context_documents must be at least 1".to_string(),
            ));
        }

        let valid_log_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_log_levels.contains(&config.logging.level.as_str()) {
            return Err(ConfigError::InvalidLogLevel(config.logging.level.clone()));
        }

        let valid_log_formats = ["json", "pretty"];
        if !valid_log_formats.contains(&config.logging.format.as_str()) {
            return Err(ConfigError::InvalidLogFormat(config.logging.format.clone()));
        }

        Ok(())
    }
}
