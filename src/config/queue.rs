//! Queue configuration structures.

use std::collections::HashMap;
use std::env;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors raised while loading or validating configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// `capacity` must be a positive integer.
    #[error("capacity must be greater than 0")]
    ZeroCapacity,
    /// `concurrency_limit`, when set, must be a positive integer.
    #[error("concurrency_limit must be greater than 0")]
    ZeroConcurrencyLimit,
    /// A queue set must define at least one queue.
    #[error("at least one queue must be defined")]
    NoQueues,
    /// A named queue in a set failed validation.
    #[error("queue `{name}` invalid: {source}")]
    InvalidQueue {
        /// Queue name.
        name: String,
        /// Underlying validation failure.
        #[source]
        source: Box<ConfigError>,
    },
    /// Input could not be parsed.
    #[error("parse error: {0}")]
    Parse(String),
    /// An environment variable is missing or malformed.
    #[error("environment variable `{var}`: {reason}")]
    Env {
        /// Variable name.
        var: String,
        /// What went wrong.
        reason: String,
    },
}

/// Configuration of a single admission queue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueConfig {
    /// Maximum admitted requests outstanding (running plus deferred).
    pub capacity: usize,
    /// Maximum simultaneously executing tasks; defaults to `capacity`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub concurrency_limit: Option<usize>,
    /// Name used in logs and diagnostics.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

impl QueueConfig {
    /// Configuration with the given capacity and defaults elsewhere.
    pub const fn new(capacity: usize) -> Self {
        Self {
            capacity,
            concurrency_limit: None,
            label: None,
        }
    }

    /// Set the concurrency limit.
    #[must_use]
    pub fn with_concurrency_limit(mut self, limit: usize) -> Self {
        self.concurrency_limit = Some(limit);
        self
    }

    /// Set the diagnostics label.
    #[must_use]
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    /// Validate configuration values.
    pub const fn validate(&self) -> Result<(), ConfigError> {
        if self.capacity == 0 {
            return Err(ConfigError::ZeroCapacity);
        }
        if matches!(self.concurrency_limit, Some(0)) {
            return Err(ConfigError::ZeroConcurrencyLimit);
        }
        Ok(())
    }

    /// Concurrency limit as configured, defaulting to capacity.
    pub fn concurrency_limit(&self) -> usize {
        self.concurrency_limit.unwrap_or(self.capacity)
    }

    /// Concurrency limit actually enforced: never more than capacity.
    pub fn effective_concurrency(&self) -> usize {
        self.concurrency_limit().min(self.capacity)
    }

    /// Parse configuration from a JSON string and validate.
    pub fn from_json_str(input: &str) -> Result<Self, ConfigError> {
        let cfg: Self =
            serde_json::from_str(input).map_err(|e| ConfigError::Parse(e.to_string()))?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Load configuration from `<PREFIX>_CAPACITY`, `<PREFIX>_CONCURRENCY_LIMIT`
    /// and `<PREFIX>_LABEL`, reading a `.env` file first when present.
    pub fn from_env(prefix: &str) -> Result<Self, ConfigError> {
        // A missing .env file is fine; the process environment still applies.
        let _ = dotenvy::dotenv();

        let capacity_var = format!("{prefix}_CAPACITY");
        let capacity = env::var(&capacity_var)
            .map_err(|e| ConfigError::Env {
                var: capacity_var.clone(),
                reason: e.to_string(),
            })
            .and_then(|raw| parse_count(&capacity_var, &raw))?;

        let limit_var = format!("{prefix}_CONCURRENCY_LIMIT");
        let concurrency_limit = match env::var(&limit_var) {
            Ok(raw) => Some(parse_count(&limit_var, &raw)?),
            Err(env::VarError::NotPresent) => None,
            Err(e) => {
                return Err(ConfigError::Env {
                    var: limit_var,
                    reason: e.to_string(),
                })
            }
        };

        let label = env::var(format!("{prefix}_LABEL")).ok();

        let cfg = Self {
            capacity,
            concurrency_limit,
            label,
        };
        cfg.validate()?;
        Ok(cfg)
    }
}

fn parse_count(var: &str, raw: &str) -> Result<usize, ConfigError> {
    raw.trim().parse().map_err(|e: std::num::ParseIntError| ConfigError::Env {
        var: var.to_string(),
        reason: e.to_string(),
    })
}

/// A named set of queues, e.g. one per protected resource.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueSetConfig {
    /// Map of queue name to configuration.
    pub queues: HashMap<String, QueueConfig>,
}

impl QueueSetConfig {
    /// Validate all queues and ensure at least one exists.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.queues.is_empty() {
            return Err(ConfigError::NoQueues);
        }
        for (name, queue) in &self.queues {
            queue.validate().map_err(|e| ConfigError::InvalidQueue {
                name: name.clone(),
                source: Box::new(e),
            })?;
        }
        Ok(())
    }

    /// Parse a queue set from a JSON string and validate.
    pub fn from_json_str(input: &str) -> Result<Self, ConfigError> {
        let cfg: Self =
            serde_json::from_str(input).map_err(|e| ConfigError::Parse(e.to_string()))?;
        cfg.validate()?;
        Ok(cfg)
    }
}
