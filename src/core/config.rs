//! Configuration management for Ragent
//!
//! Supports environment variables, config files, and runtime overrides.
//!
//! Config file location: ~/.config/ragent/config.toml

use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::PathBuf;
use url::Url;

use crate::core::error::{RagentError, Result};

/// Main configuration for Ragent
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Model API configuration
    pub openai: OpenAiConfig,
    /// Model configuration
    pub models: ModelConfig,
    /// Knowledge base configuration
    pub knowledge_base: KnowledgeBaseConfig,
    /// Agent configuration
    pub agent: AgentConfig,
    /// HTTP server configuration
    #[serde(default)]
    pub server: ServerConfig,
    /// Streaming configuration
    #[serde(default)]
    pub streaming: StreamingConfig,
}

/// OpenAI-compatible API configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenAiConfig {
    /// Base URL including the version segment (default: https://api.openai.com/v1)
    pub base_url: String,
    /// API key; read from OPENAI_API_KEY and never written back to disk
    #[serde(default, skip_serializing)]
    pub api_key: String,
    /// Request timeout in seconds
    pub timeout_secs: u64,
}

/// Model configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    /// Model used for tool selection and answering
    /// Default: gpt-4o-mini
    pub answering: String,
    /// Model used to embed knowledge base queries
    /// Default: text-embedding-3-small
    pub embedding: String,
}

/// Vector knowledge base configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KnowledgeBaseConfig {
    /// Supabase project URL
    pub supabase_url: String,
    /// Supabase API key; never written back to disk
    #[serde(default, skip_serializing)]
    pub supabase_key: String,
    /// Name of the RPC that performs the similarity match
    pub match_function: String,
    /// Number of chunks requested per query
    pub match_count: usize,
    /// Short description of what the knowledge base covers, used in the system prompt
    pub description: String,
}

/// Agent behavior configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentConfig {
    /// Maximum model turns per question
    /// Default: 3
    pub max_steps: usize,
    /// Whether to emit debug logging
    pub debug: bool,
    /// Replacement for the built-in system instruction
    pub system_prompt: Option<String>,
    /// System prompt for the streaming chat session
    pub chat_system_prompt: String,
}

/// HTTP server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Bind address
    pub host: String,
    /// Port number (default: 3000)
    pub port: u16,
}

/// Streaming configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StreamingConfig {
    /// Whether chat responses are streamed
    pub enabled: bool,
    /// Print tokens as they arrive (vs buffering)
    pub print_tokens: bool,
}

fn env_flag(key: &str) -> Option<bool> {
    env::var(key).ok().map(|v| v == "true" || v == "1")
}

impl Default for OpenAiConfig {
    fn default() -> Self {
        Self {
            base_url: env::var("OPENAI_BASE_URL")
                .unwrap_or_else(|_| "https://api.openai.com/v1".to_string()),
            api_key: env::var("OPENAI_API_KEY").unwrap_or_default(),
            timeout_secs: 120,
        }
    }
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            answering: env::var("RAGENT_MODEL").unwrap_or_else(|_| "gpt-4o-mini".to_string()),
            embedding: env::var("RAGENT_EMBEDDING_MODEL")
                .unwrap_or_else(|_| "text-embedding-3-small".to_string()),
        }
    }
}

impl Default for KnowledgeBaseConfig {
    fn default() -> Self {
        Self {
            supabase_url: env::var("SUPABASE_URL").unwrap_or_default(),
            supabase_key: env::var("SUPABASE_API_KEY").unwrap_or_default(),
            match_function: "match_documents".to_string(),
            match_count: 5,
            description: env::var("RAGENT_KB_DESCRIPTION")
                .unwrap_or_else(|_| "our product, its courses, platform features and pricing".to_string()),
        }
    }
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            max_steps: 3,
            debug: env_flag("RAGENT_DEBUG").unwrap_or(false),
            system_prompt: None,
            chat_system_prompt: "You are a helpful assistant. Answer in concise Markdown."
                .to_string(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: env::var("PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(3000),
        }
    }
}

impl Default for StreamingConfig {
    fn default() -> Self {
        Self {
            enabled: env_flag("RAGENT_STREAMING").unwrap_or(true),
            print_tokens: true,
        }
    }
}

impl Config {
    /// Get the config directory path
    pub fn config_dir() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("ragent")
    }

    /// Get the config file path
    pub fn config_file() -> PathBuf {
        Self::config_dir().join("config.toml")
    }

    /// Load configuration from file, environment, and defaults
    /// Priority: CLI args > config file > env vars > defaults
    pub fn load() -> Self {
        let _ = dotenvy::dotenv();

        match Self::load_from_file() {
            Ok(config) => config,
            Err(e) => {
                tracing::debug!(error = %e, "no usable config file, using defaults");
                Self::default()
            }
        }
    }

    /// Load configuration from file only
    pub fn load_from_file() -> Result<Self> {
        let config_path = Self::config_file();

        if !config_path.exists() {
            return Err(RagentError::config("Config file not found"));
        }

        let content = fs::read_to_string(&config_path)
            .map_err(|e| RagentError::config(format!("Failed to read config: {}", e)))?;

        Self::from_toml(&content)
    }

    /// Parse configuration from TOML text; secrets still come from the environment
    pub fn from_toml(content: &str) -> Result<Self> {
        let mut config: Config = toml::from_str(content)
            .map_err(|e| RagentError::config(format!("Failed to parse config: {}", e)))?;

        if config.openai.api_key.is_empty() {
            config.openai.api_key = env::var("OPENAI_API_KEY").unwrap_or_default();
        }
        if config.knowledge_base.supabase_key.is_empty() {
            config.knowledge_base.supabase_key = env::var("SUPABASE_API_KEY").unwrap_or_default();
        }

        Ok(config)
    }

    /// Check that URLs parse and the step budget is usable
    pub fn validate(&self) -> Result<()> {
        Url::parse(&self.openai.base_url).map_err(|e| {
            RagentError::config(format!("Invalid base_url '{}': {}", self.openai.base_url, e))
        })?;

        if !self.knowledge_base.supabase_url.is_empty() {
            Url::parse(&self.knowledge_base.supabase_url).map_err(|e| {
                RagentError::config(format!(
                    "Invalid supabase_url '{}': {}",
                    self.knowledge_base.supabase_url, e
                ))
            })?;
        }

        if self.agent.max_steps == 0 {
            return Err(RagentError::config("agent.max_steps must be at least 1"));
        }

        Ok(())
    }

    /// Whether the knowledge base backend has enough settings to be reached
    pub fn knowledge_base_configured(&self) -> bool {
        !self.knowledge_base.supabase_url.is_empty() && !self.knowledge_base.supabase_key.is_empty()
    }

    /// Socket address for the HTTP server
    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}
