//! Environment variable loading
//!
//! Reads every supported variable into an all-optional [`EnvConfig`]. Values
//! that are present but unparsable are reported instead of being ignored.

use std::env;
use std::path::PathBuf;
use std::str::FromStr;

use super::ConfigError;

#[derive(Debug, Clone, Default)]
pub struct EnvConfig {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub tls_enabled: Option<bool>,
    pub tls_cert_path: Option<PathBuf>,
    pub tls_key_path: Option<PathBuf>,

    pub retell_api_key: Option<String>,
    pub openai_api_key: Option<String>,
    pub business_webhook_url: Option<String>,

    pub openai_base_url: Option<String>,
    pub llm_model: Option<String>,
    pub llm_temperature: Option<f32>,
    pub llm_max_tokens: Option<u32>,
    pub llm_frequency_penalty: Option<f32>,
    pub llm_presence_penalty: Option<f32>,
    pub llm_connect_timeout_secs: Option<u64>,
    pub llm_stream_idle_timeout_secs: Option<u64>,

    pub tool_lookup_timeout_ms: Option<u64>,
    pub tool_booking_timeout_ms: Option<u64>,
    pub max_tool_rounds: Option<u32>,

    pub agent_begin_message: Option<String>,
    pub agent_system_prompt: Option<String>,
    pub agent_reminder_prompt: Option<String>,
    pub agent_fallback_reply: Option<String>,

    pub ws_idle_timeout_secs: Option<u64>,

    pub cors_allowed_origins: Option<String>,
    pub rate_limit_requests_per_second: Option<u32>,
    pub rate_limit_burst_size: Option<u32>,
    pub max_websocket_connections: Option<usize>,
    pub max_connections_per_ip: Option<u32>,
}

impl EnvConfig {
    pub fn load() -> Result<Self, ConfigError> {
        Ok(Self {
            host: string_var("HOST"),
            port: parse_var("PORT")?,
            tls_enabled: parse_var("TLS_ENABLED")?,
            tls_cert_path: string_var("TLS_CERT_PATH").map(PathBuf::from),
            tls_key_path: string_var("TLS_KEY_PATH").map(PathBuf::from),

            retell_api_key: string_var("RETELL_API_KEY"),
            openai_api_key: string_var("OPENAI_API_KEY").or_else(|| string_var("OPENAI_APIKEY")),
            business_webhook_url: string_var("BUSINESS_WEBHOOK_URL")
                .or_else(|| string_var("N8N_WEBHOOK_URL")),

            openai_base_url: string_var("OPENAI_BASE_URL"),
            llm_model: string_var("LLM_MODEL"),
            llm_temperature: parse_var("LLM_TEMPERATURE")?,
            llm_max_tokens: parse_var("LLM_MAX_TOKENS")?,
            llm_frequency_penalty: parse_var("LLM_FREQUENCY_PENALTY")?,
            llm_presence_penalty: parse_var("LLM_PRESENCE_PENALTY")?,
            llm_connect_timeout_secs: parse_var("LLM_CONNECT_TIMEOUT_SECS")?,
            llm_stream_idle_timeout_secs: parse_var("LLM_STREAM_IDLE_TIMEOUT_SECS")?,

            tool_lookup_timeout_ms: parse_var("TOOL_LOOKUP_TIMEOUT_MS")?,
            tool_booking_timeout_ms: parse_var("TOOL_BOOKING_TIMEOUT_MS")?,
            max_tool_rounds: parse_var("MAX_TOOL_ROUNDS")?,

            agent_begin_message: string_var("AGENT_BEGIN_MESSAGE"),
            agent_system_prompt: string_var("AGENT_SYSTEM_PROMPT"),
            agent_reminder_prompt: string_var("AGENT_REMINDER_PROMPT"),
            agent_fallback_reply: string_var("AGENT_FALLBACK_REPLY"),

            ws_idle_timeout_secs: parse_var("WS_IDLE_TIMEOUT_SECS")?,

            cors_allowed_origins: string_var("CORS_ALLOWED_ORIGINS"),
            rate_limit_requests_per_second: parse_var("RATE_LIMIT_REQUESTS_PER_SECOND")?,
            rate_limit_burst_size: parse_var("RATE_LIMIT_BURST_SIZE")?,
            max_websocket_connections: parse_var("MAX_WEBSOCKET_CONNECTIONS")?,
            max_connections_per_ip: parse_var("MAX_CONNECTIONS_PER_IP")?,
        })
    }
}

/// Non-empty value of `name`, if set.
fn string_var(name: &str) -> Option<String> {
    env::var(name)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn parse_var<T>(name: &'static str) -> Result<Option<T>, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match string_var(name) {
        Some(raw) => raw
            .parse::<T>()
            .map(Some)
            .map_err(|e| ConfigError::Invalid {
                name,
                reason: format!("{raw:?}: {e}"),
            }),
        None => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    fn clear(names: &[&str]) {
        for name in names {
            unsafe { env::remove_var(name) };
        }
    }

    #[test]
    #[serial]
    fn test_legacy_aliases_are_read() {
        clear(&[
            "OPENAI_API_KEY",
            "OPENAI_APIKEY",
            "BUSINESS_WEBHOOK_URL",
            "N8N_WEBHOOK_URL",
        ]);
        unsafe {
            env::set_var("OPENAI_APIKEY", "sk-legacy");
            env::set_var("N8N_WEBHOOK_URL", "https://n8n.example.com/hook");
        }

        let config = EnvConfig::load().unwrap();
        assert_eq!(config.openai_api_key.as_deref(), Some("sk-legacy"));
        assert_eq!(
            config.business_webhook_url.as_deref(),
            Some("https://n8n.example.com/hook")
        );

        unsafe { env::set_var("OPENAI_API_KEY", "sk-preferred") };
        let config = EnvConfig::load().unwrap();
        assert_eq!(config.openai_api_key.as_deref(), Some("sk-preferred"));

        clear(&["OPENAI_API_KEY", "OPENAI_APIKEY", "N8N_WEBHOOK_URL"]);
    }

    #[test]
    #[serial]
    fn test_blank_values_are_absent() {
        unsafe { env::set_var("LLM_MODEL", "   ") };
        assert!(EnvConfig::load().unwrap().llm_model.is_none());
        clear(&["LLM_MODEL"]);
    }

    #[test]
    #[serial]
    fn test_unparsable_number_is_rejected() {
        unsafe { env::set_var("PORT", "eighty") };
        let err = EnvConfig::load().unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { name: "PORT", .. }));
        clear(&["PORT"]);
    }
}
