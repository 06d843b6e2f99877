//! YAML configuration file loading
//!
//! Every section and field is optional; anything left out falls back to the
//! environment and then to built-in defaults.
//!
//! # Example
//! ```yaml
//! server:
//!   host: "0.0.0.0"
//!   port: 3000
//!
//! platform:
//!   retell_api_key: "key_..."
//!
//! llm:
//!   api_key: "sk-..."
//!   model: "gpt-4-turbo-preview"
//!   temperature: 0.3
//!
//! tools:
//!   webhook_url: "https://n8n.example.com/webhook/clinic"
//!   booking_timeout_ms: 10000
//!
//! agent:
//!   begin_message: "Hola, ¿en qué puedo ayudarte?"
//!
//! connection:
//!   idle_timeout_secs: 300
//!
//! security:
//!   cors_allowed_origins: "*"
//! ```

use serde::Deserialize;
use std::path::PathBuf;

use super::ConfigError;

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct YamlConfig {
    pub server: Option<ServerYaml>,
    pub platform: Option<PlatformYaml>,
    pub llm: Option<LlmYaml>,
    pub tools: Option<ToolsYaml>,
    pub agent: Option<AgentYaml>,
    pub connection: Option<ConnectionYaml>,
    pub security: Option<SecurityYaml>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct ServerYaml {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub tls: Option<TlsYaml>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct TlsYaml {
    pub enabled: Option<bool>,
    pub cert_path: Option<PathBuf>,
    pub key_path: Option<PathBuf>,
}

/// Voice platform credentials
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct PlatformYaml {
    /// Also the key webhook signatures are computed with
    pub retell_api_key: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct LlmYaml {
    pub api_key: Option<String>,
    pub base_url: Option<String>,
    pub model: Option<String>,
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
    pub frequency_penalty: Option<f32>,
    pub presence_penalty: Option<f32>,
    pub connect_timeout_secs: Option<u64>,
    pub stream_idle_timeout_secs: Option<u64>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct ToolsYaml {
    pub webhook_url: Option<String>,
    pub lookup_timeout_ms: Option<u64>,
    pub booking_timeout_ms: Option<u64>,
    pub max_rounds: Option<u32>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct AgentYaml {
    pub begin_message: Option<String>,
    pub system_prompt: Option<String>,
    pub reminder_prompt: Option<String>,
    pub fallback_reply: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct ConnectionYaml {
    pub idle_timeout_secs: Option<u64>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct SecurityYaml {
    /// CORS allowed origins (comma-separated list or "*" for all)
    pub cors_allowed_origins: Option<String>,
    /// Maximum requests per second per IP address
    pub rate_limit_requests_per_second: Option<u32>,
    /// Maximum burst size for rate limiting
    pub rate_limit_burst_size: Option<u32>,
    /// Maximum concurrent WebSocket connections
    pub max_websocket_connections: Option<usize>,
    /// Maximum connections per IP address
    pub max_connections_per_ip: Option<u32>,
}

impl YamlConfig {
    /// Load YAML configuration from a file
    ///
    /// # Errors
    /// Returns an error if the file cannot be read or the YAML is malformed.
    pub fn from_file(path: &PathBuf) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.clone(),
            source,
        })?;

        let config: YamlConfig = serde_yaml::from_str(&contents)?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_yaml_config_full() {
        let yaml = r#"
server:
  host: "127.0.0.1"
  port: 8080
  tls:
    enabled: true
    cert_path: "/etc/certs/server.crt"
    key_path: "/etc/certs/server.key"
platform:
  retell_api_key: "key_yaml"
llm:
  api_key: "sk-yaml"
  base_url: "http://localhost:9000/v1"
  model: "gpt-4o-mini"
  temperature: 0.7
  max_tokens: 150
tools:
  webhook_url: "https://n8n.example.com/hook"
  lookup_timeout_ms: 3000
  max_rounds: 3
agent:
  begin_message: "Buenas tardes"
connection:
  idle_timeout_secs: 120
security:
  cors_allowed_origins: "*"
  rate_limit_requests_per_second: 30
  max_websocket_connections: 50
"#;
        let config: YamlConfig = serde_yaml::from_str(yaml).unwrap();

        let server = config.server.unwrap();
        assert_eq!(server.host.as_deref(), Some("127.0.0.1"));
        assert_eq!(server.port, Some(8080));
        let tls = server.tls.unwrap();
        assert_eq!(tls.enabled, Some(true));
        assert_eq!(tls.cert_path, Some(PathBuf::from("/etc/certs/server.crt")));

        assert_eq!(
            config.platform.unwrap().retell_api_key.as_deref(),
            Some("key_yaml")
        );

        let llm = config.llm.unwrap();
        assert_eq!(llm.model.as_deref(), Some("gpt-4o-mini"));
        assert_eq!(llm.max_tokens, Some(150));
        assert_eq!(llm.temperature, Some(0.7));

        let tools = config.tools.unwrap();
        assert_eq!(tools.lookup_timeout_ms, Some(3000));
        assert_eq!(tools.booking_timeout_ms, None);
        assert_eq!(tools.max_rounds, Some(3));

        assert_eq!(
            config.agent.unwrap().begin_message.as_deref(),
            Some("Buenas tardes")
        );
        assert_eq!(config.connection.unwrap().idle_timeout_secs, Some(120));

        let security = config.security.unwrap();
        assert_eq!(security.cors_allowed_origins.as_deref(), Some("*"));
        assert_eq!(security.max_websocket_connections, Some(50));
        assert_eq!(security.max_connections_per_ip, None);
    }

    #[test]
    fn test_yaml_config_empty() {
        let config: YamlConfig = serde_yaml::from_str("{}").unwrap();
        assert!(config.server.is_none());
        assert!(config.llm.is_none());
        assert!(config.security.is_none());
    }

    #[test]
    fn test_from_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.yaml");
        fs::write(&path, "server:\n  port: 4000\n").unwrap();

        let config = YamlConfig::from_file(&path).unwrap();
        assert_eq!(config.server.unwrap().port, Some(4000));
    }

    #[test]
    fn test_from_file_not_found() {
        let result = YamlConfig::from_file(&PathBuf::from("/nonexistent/config.yaml"));
        assert!(matches!(result, Err(ConfigError::Read { .. })));
    }

    #[test]
    fn test_from_file_invalid_yaml() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.yaml");
        fs::write(&path, "server:\n  port: \"not a number\"\n").unwrap();

        let result = YamlConfig::from_file(&path);
        assert!(matches!(result, Err(ConfigError::Yaml(_))));
    }
}
