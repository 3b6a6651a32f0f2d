//! Configuration management for Concierge
//!
//! Supports environment variables, config files, and runtime overrides.
//!
//! Config file location: ~/.config/concierge/config.toml

use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::PathBuf;

use crate::core::error::{ConciergeError, Result};
use crate::core::types::AgentVariant;

/// Main configuration for Concierge
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// LLM endpoint configuration
    #[serde(default)]
    pub llm: LlmConfig,
    /// Remote agent configuration
    #[serde(default)]
    pub agents: AgentsConfig,
    /// Routing loop configuration
    #[serde(default)]
    pub routing: RoutingConfig,
    /// Identity / reputation registry configuration
    #[serde(default)]
    pub identity: IdentityConfig,
    /// HTTP surface configuration
    #[serde(default)]
    pub server: ServerConfig,
}

/// OpenAI-compatible chat completions endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    /// Base URL, without the `/chat/completions` suffix
    pub base_url: String,
    /// Model used for routing decisions
    pub model: String,
    /// Request timeout in seconds
    pub timeout_secs: u64,
    /// Sampling temperature
    pub temperature: Option<f32>,
    /// API key, read from the environment only
    #[serde(skip)]
    pub api_key: Option<String>,
}

/// Remote agents the host routes to
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentsConfig {
    /// Base addresses probed for agent cards at startup
    pub addresses: Vec<String>,
    /// Timeout for card fetches and task sends, in seconds
    pub timeout_secs: u64,
}

/// Routing loop behavior
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RoutingConfig {
    /// Maximum model calls per user message
    /// Default: 10
    pub max_steps: usize,
    /// Whether to show debug output
    pub debug: bool,
    /// Replaces the built-in routing instructions when set
    pub system_prompt: Option<String>,
}

/// Identity registry settings shared by the authorizer and the HTTP surface
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IdentityConfig {
    /// Chain id used for CAIP-10 addresses
    pub chain_id: String,
    /// Upper bound on every registry call, in seconds
    pub timeout_secs: u64,
    /// Registry domains per agent variant
    pub domains: DomainConfig,
    /// Per-variant signing keys, read from the environment only
    #[serde(skip)]
    pub keys: SigningKeys,
}

/// Registry domain of each agent variant
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DomainConfig {
    pub assistant: String,
    pub finder: String,
    pub reserve: String,
    pub weather: String,
}

/// Hex private keys; never serialized
#[derive(Clone, Default)]
pub struct SigningKeys {
    pub default: Option<String>,
    pub assistant: Option<String>,
    pub finder: Option<String>,
    pub reserve: Option<String>,
    pub weather: Option<String>,
}

impl std::fmt::Debug for SigningKeys {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mark = |k: &Option<String>| if k.is_some() { "<set>" } else { "<unset>" };
        f.debug_struct("SigningKeys")
            .field("default", &mark(&self.default))
            .field("assistant", &mark(&self.assistant))
            .field("finder", &mark(&self.finder))
            .field("reserve", &mark(&self.reserve))
            .field("weather", &mark(&self.weather))
            .finish()
    }
}

/// HTTP surface settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Public URL advertised in the agent card
    pub public_url: Option<String>,
    /// Idle time after which a chat session is dropped
    pub session_ttl_secs: u64,
}

fn env_flag(name: &str, default: bool) -> bool {
    env::var(name)
        .map(|v| v == "true" || v == "1")
        .unwrap_or(default)
}

fn env_parse<T: std::str::FromStr>(name: &str) -> Option<T> {
    env::var(name).ok().and_then(|v| v.trim().parse().ok())
}

fn env_nonempty(name: &str) -> Option<String> {
    env::var(name).ok().filter(|v| !v.trim().is_empty())
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            base_url: env::var("OPENAI_BASE_URL")
                .unwrap_or_else(|_| "https://api.openai.com/v1".to_string()),
            model: env::var("OPENAI_MODEL").unwrap_or_else(|_| "gpt-4o-mini".to_string()),
            timeout_secs: 60,
            temperature: None,
            api_key: env_nonempty("OPENAI_API_KEY"),
        }
    }
}

impl Default for AgentsConfig {
    fn default() -> Self {
        Self {
            addresses: vec![
                env::var("AIR_AGENT_URL").unwrap_or_else(|_| "http://localhost:10002".to_string()),
                env::var("WEA_AGENT_URL").unwrap_or_else(|_| "http://localhost:10001".to_string()),
            ],
            timeout_secs: 30,
        }
    }
}

impl Default for RoutingConfig {
    fn default() -> Self {
        Self {
            max_steps: env_parse("CONCIERGE_MAX_STEPS").unwrap_or(10),
            debug: env_flag("CONCIERGE_DEBUG", false),
            system_prompt: None,
        }
    }
}

impl Default for IdentityConfig {
    fn default() -> Self {
        Self {
            chain_id: env::var("ERC8004_CHAIN_ID").unwrap_or_else(|_| "11155111".to_string()),
            timeout_secs: env_parse("ERC8004_RPC_TIMEOUT_SEC").unwrap_or(20),
            domains: DomainConfig::default(),
            keys: SigningKeys::from_env(),
        }
    }
}

impl Default for DomainConfig {
    fn default() -> Self {
        Self {
            assistant: env_nonempty("ERC8004_AGENT_DOMAIN_ASSISTANT")
                .or_else(|| env_nonempty("ERC8004_AGENT_DOMAIN"))
                .unwrap_or_else(|| "assistant.localhost:8083".to_string()),
            finder: env_nonempty("FINDER_DOMAIN")
                .unwrap_or_else(|| "finder.localhost:10002".to_string()),
            reserve: env_nonempty("RESERVE_DOMAIN")
                .unwrap_or_else(|| "reserve.localhost:10002".to_string()),
            weather: env_nonempty("WEATHER_DOMAIN")
                .unwrap_or_else(|| "weather.localhost:10001".to_string()),
        }
    }
}

impl SigningKeys {
    /// Read keys from `ERC8004_PRIVATE_KEY[_<VARIANT>]`
    pub fn from_env() -> Self {
        Self {
            default: env_nonempty("ERC8004_PRIVATE_KEY"),
            assistant: env_nonempty("ERC8004_PRIVATE_KEY_ASSISTANT"),
            finder: env_nonempty("ERC8004_PRIVATE_KEY_FINDER"),
            reserve: env_nonempty("ERC8004_PRIVATE_KEY_RESERVE"),
            weather: env_nonempty("ERC8004_PRIVATE_KEY_WEATHER"),
        }
    }

    /// Key for `variant`, falling back to the shared default key
    pub fn for_variant(&self, variant: AgentVariant) -> Option<&str> {
        let specific = match variant {
            AgentVariant::Assistant => &self.assistant,
            AgentVariant::Finder => &self.finder,
            AgentVariant::Reserve => &self.reserve,
            AgentVariant::Weather => &self.weather,
        };
        specific.as_deref().or(self.default.as_deref())
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: env::var("APP_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port: env_parse("APP_PORT").unwrap_or(8083),
            public_url: env_nonempty("APP_URL"),
            session_ttl_secs: env_parse("APP_SESSION_TTL_SEC").unwrap_or(3600),
        }
    }
}

impl DomainConfig {
    /// Registry domain for `variant`
    pub fn for_variant(&self, variant: AgentVariant) -> &str {
        match variant {
            AgentVariant::Assistant => &self.assistant,
            AgentVariant::Finder => &self.finder,
            AgentVariant::Reserve => &self.reserve,
            AgentVariant::Weather => &self.weather,
        }
    }
}

impl Config {
    /// Get the config directory path
    pub fn config_dir() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("concierge")
    }

    /// Get the config file path
    pub fn config_file() -> PathBuf {
        Self::config_dir().join("config.toml")
    }

    /// Load configuration from file, environment, and defaults
    /// Priority: CLI args > config file > env vars > defaults
    pub fn load() -> Self {
        // Try to load .env file if it exists
        let _ = dotenvy::dotenv();

        match Self::load_from_file() {
            Ok(config) => {
                tracing::info!(path = %Self::config_file().display(), "Loaded config file");
                config
            }
            Err(e) => {
                tracing::debug!("Using default configuration: {}", e);
                Self::default()
            }
        }
    }

    /// Load configuration from file only
    pub fn load_from_file() -> Result<Self> {
        let config_path = Self::config_file();

        if !config_path.exists() {
            return Err(ConciergeError::config("Config file not found"));
        }

        let content = fs::read_to_string(&config_path)
            .map_err(|e| ConciergeError::config(format!("Failed to read config: {}", e)))?;

        Self::from_toml(&content)
    }

    /// Parse configuration from TOML text; secrets always come from the environment
    pub fn from_toml(content: &str) -> Result<Self> {
        let mut config: Config = toml::from_str(content)
            .map_err(|e| ConciergeError::config(format!("Failed to parse config: {}", e)))?;
        config.llm.api_key = env_nonempty("OPENAI_API_KEY");
        config.identity.keys = SigningKeys::from_env();
        Ok(config)
    }

    /// Public URL of this host, derived from the server settings when unset
    pub fn public_url(&self) -> String {
        self.server
            .public_url
            .clone()
            .unwrap_or_else(|| format!("http://{}:{}", self.server.host, self.server.port))
    }
}
