//! Configuration module for the bridge server
//!
//! This module handles server configuration from various sources: .env files, YAML files,
//! and environment variables. Priority: YAML > ENV vars > .env values > defaults.
//!
//! # Modules
//! - `yaml`: YAML configuration file loading
//! - `env`: Environment variable loading
//! - `merge`: Merging YAML and environment configurations
//! - `validation`: Configuration validation logic
//! - `agent`: Agent persona texts
//!
//! # Example
//! ```rust,no_run
//! use voice_llm_bridge::config::ServerConfig;
//! use std::path::PathBuf;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! // Load from environment variables only
//! let config = ServerConfig::from_env()?;
//!
//! // Load from YAML file with environment variable overrides
//! let config_path = PathBuf::from("config.yaml");
//! let config = ServerConfig::from_file(&config_path)?;
//!
//! println!("Server listening on {}", config.address());
//! # Ok(())
//! # }
//! ```

use std::fmt;
use std::path::PathBuf;

use thiserror::Error;
use tracing::info;

mod agent;
mod env;
mod merge;
mod validation;
mod yaml;

pub use agent::{
    AgentConfig, DEFAULT_BEGIN_MESSAGE, DEFAULT_FALLBACK_REPLY, DEFAULT_REMINDER_PROMPT,
    DEFAULT_SYSTEM_PROMPT,
};

pub const DEFAULT_HOST: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 3000;
pub const DEFAULT_WS_IDLE_TIMEOUT_SECS: u64 = 300;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse YAML config: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Missing required configuration: {0}")]
    Missing(&'static str),

    #[error("Invalid value for {name}: {reason}")]
    Invalid { name: &'static str, reason: String },
}

/// TLS configuration for HTTPS and WSS
#[derive(Debug, Clone)]
pub struct TlsConfig {
    /// Path to PEM certificate chain
    pub cert_path: PathBuf,
    /// Path to PEM private key
    pub key_path: PathBuf,
}

/// Completion endpoint and sampling parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct LlmSettings {
    pub base_url: String,
    pub model: String,
    pub temperature: f32,
    pub max_tokens: u32,
    pub frequency_penalty: f32,
    pub presence_penalty: f32,
    pub connect_timeout_secs: u64,
    /// Longest silence tolerated between two stream events
    pub stream_idle_timeout_secs: u64,
}

impl Default for LlmSettings {
    fn default() -> Self {
        Self {
            base_url: "https://api.openai.com/v1".to_string(),
            model: "gpt-4-turbo-preview".to_string(),
            temperature: 0.3,
            max_tokens: 200,
            frequency_penalty: 0.5,
            presence_penalty: 0.5,
            connect_timeout_secs: 10,
            stream_idle_timeout_secs: 30,
        }
    }
}

/// Business webhook timeouts and the per-turn tool round cap.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolSettings {
    /// Timeout for availability checks and cancellations
    pub lookup_timeout_ms: u64,
    /// Timeout for bookings
    pub booking_timeout_ms: u64,
    /// Maximum completion rounds in a single turn
    pub max_rounds: u32,
}

impl Default for ToolSettings {
    fn default() -> Self {
        Self {
            lookup_timeout_ms: 5_000,
            booking_timeout_ms: 10_000,
            max_rounds: 5,
        }
    }
}

/// CORS, rate limiting and connection limits.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SecuritySettings {
    /// CORS allowed origins (comma-separated list or "*" for all)
    pub cors_allowed_origins: Option<String>,
    pub rate_limit_requests_per_second: u32,
    pub rate_limit_burst_size: u32,
    /// Global cap on concurrent WebSocket connections (unlimited when None)
    pub max_websocket_connections: Option<usize>,
    pub max_connections_per_ip: u32,
}

impl Default for SecuritySettings {
    fn default() -> Self {
        Self {
            cors_allowed_origins: None,
            rate_limit_requests_per_second: 60,
            rate_limit_burst_size: 10,
            max_websocket_connections: None,
            max_connections_per_ip: 100,
        }
    }
}

/// Server configuration
///
/// Contains all the configuration needed to run the bridge:
/// - Server settings (host, port, TLS)
/// - Voice platform and LLM credentials
/// - Business webhook location and tool timeouts
/// - Agent persona texts
/// - Security settings (CORS, rate limiting, connection limits)
#[derive(Clone)]
pub struct ServerConfig {
    // Server settings
    pub host: String,
    pub port: u16,

    // TLS configuration (optional)
    pub tls: Option<TlsConfig>,

    /// Voice platform API key, also used to verify webhook signatures
    pub retell_api_key: String,
    pub openai_api_key: String,
    pub business_webhook_url: Option<String>,

    pub llm: LlmSettings,
    pub tools: ToolSettings,
    pub agent: AgentConfig,

    /// Close an LLM WebSocket after this long without an inbound frame
    pub ws_idle_timeout_secs: u64,

    pub security: SecuritySettings,
}

/// Implement Drop to zeroize all secret fields when ServerConfig is dropped.
impl Drop for ServerConfig {
    fn drop(&mut self) {
        use zeroize::Zeroize;

        self.retell_api_key.zeroize();
        self.openai_api_key.zeroize();
    }
}

impl fmt::Debug for ServerConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServerConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("tls", &self.tls)
            .field("retell_api_key", &presence(&self.retell_api_key))
            .field("openai_api_key", &presence(&self.openai_api_key))
            .field("business_webhook_url", &self.business_webhook_url)
            .field("llm", &self.llm)
            .field("tools", &self.tools)
            .field("ws_idle_timeout_secs", &self.ws_idle_timeout_secs)
            .field("security", &self.security)
            .finish_non_exhaustive()
    }
}

fn presence(secret: &str) -> &'static str {
    if secret.is_empty() {
        "<missing>"
    } else {
        "<configured>"
    }
}

impl ServerConfig {
    /// Build a configuration from the three required values, with defaults for everything else.
    ///
    /// No validation is performed.
    pub fn new(
        retell_api_key: impl Into<String>,
        openai_api_key: impl Into<String>,
        business_webhook_url: Option<String>,
    ) -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            tls: None,
            retell_api_key: retell_api_key.into(),
            openai_api_key: openai_api_key.into(),
            business_webhook_url,
            llm: LlmSettings::default(),
            tools: ToolSettings::default(),
            agent: AgentConfig::default(),
            ws_idle_timeout_secs: DEFAULT_WS_IDLE_TIMEOUT_SECS,
            security: SecuritySettings::default(),
        }
    }

    /// Load configuration from environment variables and defaults
    ///
    /// The `.env` file is loaded by `main` before this is called.
    ///
    /// # Errors
    /// Returns an error if a variable has an invalid format, a required value
    /// is missing, or validation fails.
    pub fn from_env() -> Result<Self, ConfigError> {
        let config = merge::merge_config(None)?;
        validation::validate(&config)?;
        Ok(config)
    }

    /// Load configuration from a YAML file with environment variable base
    ///
    /// Priority order (highest to lowest):
    /// 1. YAML file values
    /// 2. Environment variables (actual ENV vars override .env values)
    /// 3. .env file values
    /// 4. Default values
    ///
    /// After loading and merging, performs validation on the final configuration.
    ///
    /// # Errors
    /// Returns an error if:
    /// - The YAML file cannot be read or is malformed
    /// - Environment variables have invalid formats
    /// - Configuration validation fails
    pub fn from_file(path: &PathBuf) -> Result<Self, ConfigError> {
        let yaml_config = yaml::YamlConfig::from_file(path)?;
        let config = merge::merge_config(Some(yaml_config))?;
        validation::validate(&config)?;
        Ok(config)
    }

    /// Get the server address as a string
    ///
    /// Returns the address in the format "host:port"
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Check if TLS is enabled
    pub fn is_tls_enabled(&self) -> bool {
        self.tls.is_some()
    }

    /// Log which settings are in effect, without revealing secrets.
    pub fn log_summary(&self) {
        info!(
            address = %self.address(),
            tls = self.is_tls_enabled(),
            retell_api_key = presence(&self.retell_api_key),
            openai_api_key = presence(&self.openai_api_key),
            business_webhook = self.business_webhook_url.is_some(),
            model = %self.llm.model,
            max_tool_rounds = self.tools.max_rounds,
            "Configuration loaded"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::env;
    use std::fs;
    use tempfile::TempDir;

    const ENV_VARS: &[&str] = &[
        "HOST",
        "PORT",
        "TLS_ENABLED",
        "TLS_CERT_PATH",
        "TLS_KEY_PATH",
        "RETELL_API_KEY",
        "OPENAI_API_KEY",
        "OPENAI_APIKEY",
        "BUSINESS_WEBHOOK_URL",
        "N8N_WEBHOOK_URL",
        "OPENAI_BASE_URL",
        "LLM_MODEL",
        "LLM_TEMPERATURE",
        "LLM_MAX_TOKENS",
        "MAX_TOOL_ROUNDS",
        "TOOL_LOOKUP_TIMEOUT_MS",
        "TOOL_BOOKING_TIMEOUT_MS",
        "AGENT_BEGIN_MESSAGE",
        "WS_IDLE_TIMEOUT_SECS",
        "CORS_ALLOWED_ORIGINS",
        "MAX_WEBSOCKET_CONNECTIONS",
    ];

    // Helper to clean up environment variables
    fn cleanup_env_vars() {
        for name in ENV_VARS {
            unsafe { env::remove_var(name) };
        }
    }

    fn set_required_env() {
        unsafe {
            env::set_var("RETELL_API_KEY", "key_env");
            env::set_var("OPENAI_API_KEY", "sk-env");
            env::set_var("BUSINESS_WEBHOOK_URL", "https://n8n.example.com/hook");
        }
    }

    #[test]
    #[serial]
    fn test_from_env_defaults() {
        cleanup_env_vars();
        set_required_env();

        let config = ServerConfig::from_env().unwrap();

        assert_eq!(config.host, "0.0.0.0");
        assert_eq!(config.port, 3000);
        assert!(!config.is_tls_enabled());
        assert_eq!(config.retell_api_key, "key_env");
        assert_eq!(config.llm, LlmSettings::default());
        assert_eq!(config.tools, ToolSettings::default());
        assert_eq!(config.agent.begin_message, DEFAULT_BEGIN_MESSAGE);
        assert_eq!(config.ws_idle_timeout_secs, 300);
        assert_eq!(config.security, SecuritySettings::default());

        cleanup_env_vars();
    }

    #[test]
    #[serial]
    fn test_from_env_overrides() {
        cleanup_env_vars();
        set_required_env();
        unsafe {
            env::set_var("PORT", "8081");
            env::set_var("LLM_MODEL", "gpt-4o-mini");
            env::set_var("MAX_TOOL_ROUNDS", "3");
            env::set_var("AGENT_BEGIN_MESSAGE", "Buenos días");
            env::set_var("MAX_WEBSOCKET_CONNECTIONS", "25");
        }

        let config = ServerConfig::from_env().unwrap();
        assert_eq!(config.port, 8081);
        assert_eq!(config.llm.model, "gpt-4o-mini");
        assert_eq!(config.tools.max_rounds, 3);
        assert_eq!(config.agent.begin_message, "Buenos días");
        assert_eq!(config.security.max_websocket_connections, Some(25));

        cleanup_env_vars();
    }

    #[test]
    #[serial]
    fn test_from_env_missing_required() {
        cleanup_env_vars();
        unsafe {
            env::set_var("OPENAI_API_KEY", "sk-env");
            env::set_var("BUSINESS_WEBHOOK_URL", "https://n8n.example.com/hook");
        }

        let err = ServerConfig::from_env().unwrap_err();
        assert!(matches!(err, ConfigError::Missing("RETELL_API_KEY")));

        cleanup_env_vars();
    }

    #[test]
    #[serial]
    fn test_tls_enabled_without_paths_fails() {
        cleanup_env_vars();
        set_required_env();
        unsafe { env::set_var("TLS_ENABLED", "true") };

        let err = ServerConfig::from_env().unwrap_err();
        assert!(matches!(err, ConfigError::Missing(_)));

        cleanup_env_vars();
    }

    #[test]
    #[serial]
    fn test_from_file_yaml_overrides_env() {
        cleanup_env_vars();
        set_required_env();
        unsafe {
            env::set_var("HOST", "0.0.0.0");
            env::set_var("LLM_MODEL", "env-model");
        }

        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("config.yaml");
        let yaml_content = r#"
server:
  host: "127.0.0.1"
  port: 8080
llm:
  model: "yaml-model"
tools:
  booking_timeout_ms: 12000
"#;
        fs::write(&config_path, yaml_content).unwrap();

        let config = ServerConfig::from_file(&config_path).unwrap();

        // YAML overrides ENV
        assert_eq!(config.host, "127.0.0.1");
        assert_eq!(config.llm.model, "yaml-model");
        assert_eq!(config.port, 8080);
        assert_eq!(config.tools.booking_timeout_ms, 12000);
        // ENV fills what YAML leaves out
        assert_eq!(config.openai_api_key, "sk-env");

        cleanup_env_vars();
    }

    #[test]
    #[serial]
    fn test_from_file_missing_file() {
        cleanup_env_vars();

        let config_path = PathBuf::from("/nonexistent/config.yaml");
        let result = ServerConfig::from_file(&config_path);

        assert!(result.is_err());
        assert!(
            result
                .unwrap_err()
                .to_string()
                .contains("Failed to read config file")
        );
    }

    #[test]
    fn test_address() {
        let mut config = ServerConfig::new("k", "sk", None);
        config.host = "127.0.0.1".to_string();
        config.port = 9000;
        assert_eq!(config.address(), "127.0.0.1:9000");
    }

    #[test]
    fn test_debug_masks_secrets() {
        let config = ServerConfig::new("key_super_secret", "sk-super-secret", None);
        let debug = format!("{config:?}");
        assert!(!debug.contains("super_secret"));
        assert!(!debug.contains("super-secret"));
        assert!(debug.contains("<configured>"));
    }
}
