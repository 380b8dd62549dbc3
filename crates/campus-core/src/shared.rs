//! Shared types used across all Campus Companion crates.

use serde::{Deserialize, Serialize};
use std::path::Path;
use uuid::Uuid;

/// Identifies one interactive session for log correlation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionContext {
    /// Unique session identifier.
    pub session_id: String,
    /// Optional correlation id for request tracing.
    pub correlation_id: Option<String>,
}

impl SessionContext {
    pub fn new() -> Self {
        Self {
            session_id: Uuid::new_v4().simple().to_string(),
            correlation_id: None,
        }
    }
}

impl Default for SessionContext {
    fn default() -> Self {
        Self::new()
    }
}

/// Global application configuration. Load from TOML or env.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoreConfig {
    /// Application identity (e.g. "Campus Companion").
    pub app_name: String,
    /// Path of the JSON knowledge base file.
    pub knowledge_path: String,
    /// Minimum similarity ratio for a local answer; below it the remote
    /// fallback is consulted.
    pub match_threshold: f64,
    /// Fallback model mode (e.g. "mock", "live").
    pub llm_mode: String,
    /// Reserved token that ends the session. Compared case-insensitively.
    pub exit_token: String,
}

impl CoreConfig {
    /// Load config from file and environment. Precedence: env `CAMPUS_CONFIG`
    /// path > `config/assistant.toml` > defaults.
    pub fn load() -> Result<Self, config::ConfigError> {
        let config_path =
            std::env::var("CAMPUS_CONFIG").unwrap_or_else(|_| "config/assistant.toml".to_string());
        let builder = config::Config::builder()
            .set_default("app_name", "Campus Companion")?
            .set_default("knowledge_path", "data/knowledge_base.json")?
            .set_default("match_threshold", 0.6)?
            .set_default("llm_mode", "mock")?
            .set_default("exit_token", "exit")?;

        let path = Path::new(&config_path);
        let builder = if path.exists() {
            builder.add_source(config::File::from(path))
        } else {
            builder
        };

        let built = builder
            .add_source(config::Environment::with_prefix("CAMPUS").separator("__"))
            .build()?;

        built.try_deserialize()
    }
}
