//! Configuration validation logic

use url::Url;

use super::{ConfigError, ServerConfig};

pub fn validate(config: &ServerConfig) -> Result<(), ConfigError> {
    validate_required(config)?;
    validate_http_url("OPENAI_BASE_URL", &config.llm.base_url)?;
    if let Some(url) = &config.business_webhook_url {
        validate_http_url("BUSINESS_WEBHOOK_URL", url)?;
    }
    validate_llm(config)?;
    validate_tools(config)?;
    validate_security(config)?;
    validate_tls(config)?;
    Ok(())
}

fn validate_required(config: &ServerConfig) -> Result<(), ConfigError> {
    if config.retell_api_key.is_empty() {
        return Err(ConfigError::Missing("RETELL_API_KEY"));
    }
    if config.openai_api_key.is_empty() {
        return Err(ConfigError::Missing("OPENAI_API_KEY"));
    }
    if config.business_webhook_url.is_none() {
        return Err(ConfigError::Missing("BUSINESS_WEBHOOK_URL"));
    }
    Ok(())
}

fn validate_http_url(name: &'static str, raw: &str) -> Result<(), ConfigError> {
    let url = Url::parse(raw).map_err(|e| ConfigError::Invalid {
        name,
        reason: format!("{raw:?}: {e}"),
    })?;
    match url.scheme() {
        "http" | "https" => Ok(()),
        other => Err(ConfigError::Invalid {
            name,
            reason: format!("unsupported scheme {other:?}"),
        }),
    }
}

fn validate_llm(config: &ServerConfig) -> Result<(), ConfigError> {
    let llm = &config.llm;
    if llm.model.trim().is_empty() {
        return Err(ConfigError::Invalid {
            name: "LLM_MODEL",
            reason: "must not be empty".to_string(),
        });
    }
    if !(0.0..=2.0).contains(&llm.temperature) {
        return Err(ConfigError::Invalid {
            name: "LLM_TEMPERATURE",
            reason: format!("{} is outside 0.0..=2.0", llm.temperature),
        });
    }
    if llm.max_tokens == 0 {
        return Err(ConfigError::Invalid {
            name: "LLM_MAX_TOKENS",
            reason: "must be greater than 0".to_string(),
        });
    }
    for (name, value) in [
        ("LLM_FREQUENCY_PENALTY", llm.frequency_penalty),
        ("LLM_PRESENCE_PENALTY", llm.presence_penalty),
    ] {
        if !(-2.0..=2.0).contains(&value) {
            return Err(ConfigError::Invalid {
                name,
                reason: format!("{value} is outside -2.0..=2.0"),
            });
        }
    }
    if llm.stream_idle_timeout_secs == 0 {
        return Err(ConfigError::Invalid {
            name: "LLM_STREAM_IDLE_TIMEOUT_SECS",
            reason: "must be greater than 0".to_string(),
        });
    }
    Ok(())
}

fn validate_tools(config: &ServerConfig) -> Result<(), ConfigError> {
    let tools = &config.tools;
    if tools.lookup_timeout_ms == 0 {
        return Err(ConfigError::Invalid {
            name: "TOOL_LOOKUP_TIMEOUT_MS",
            reason: "must be greater than 0".to_string(),
        });
    }
    if tools.booking_timeout_ms == 0 {
        return Err(ConfigError::Invalid {
            name: "TOOL_BOOKING_TIMEOUT_MS",
            reason: "must be greater than 0".to_string(),
        });
    }
    if tools.max_rounds == 0 {
        return Err(ConfigError::Invalid {
            name: "MAX_TOOL_ROUNDS",
            reason: "must be at least 1".to_string(),
        });
    }
    Ok(())
}

fn validate_security(config: &ServerConfig) -> Result<(), ConfigError> {
    let security = &config.security;
    if security.rate_limit_requests_per_second == 0 {
        return Err(ConfigError::Invalid {
            name: "RATE_LIMIT_REQUESTS_PER_SECOND",
            reason: "must be greater than 0".to_string(),
        });
    }
    if security.rate_limit_burst_size == 0 {
        return Err(ConfigError::Invalid {
            name: "RATE_LIMIT_BURST_SIZE",
            reason: "must be greater than 0".to_string(),
        });
    }
    if security.max_connections_per_ip == 0 {
        return Err(ConfigError::Invalid {
            name: "MAX_CONNECTIONS_PER_IP",
            reason: "must be greater than 0".to_string(),
        });
    }
    if config.ws_idle_timeout_secs == 0 {
        return Err(ConfigError::Invalid {
            name: "WS_IDLE_TIMEOUT_SECS",
            reason: "must be greater than 0".to_string(),
        });
    }
    Ok(())
}

fn validate_tls(config: &ServerConfig) -> Result<(), ConfigError> {
    if let Some(tls) = &config.tls {
        if !tls.cert_path.exists() {
            return Err(ConfigError::Invalid {
                name: "TLS_CERT_PATH",
                reason: format!("{} does not exist", tls.cert_path.display()),
            });
        }
        if !tls.key_path.exists() {
            return Err(ConfigError::Invalid {
                name: "TLS_KEY_PATH",
                reason: format!("{} does not exist", tls.key_path.display()),
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TlsConfig;
    use std::path::PathBuf;

    fn valid() -> ServerConfig {
        ServerConfig::new("key_retell", "sk-openai", Some("https://n8n.example.com/hook".into()))
    }

    #[test]
    fn test_valid_config_passes() {
        assert!(validate(&valid()).is_ok());
    }

    #[test]
    fn test_missing_required_values() {
        let mut config = valid();
        config.retell_api_key.clear();
        assert!(matches!(
            validate(&config),
            Err(ConfigError::Missing("RETELL_API_KEY"))
        ));

        let mut config = valid();
        config.openai_api_key.clear();
        assert!(matches!(
            validate(&config),
            Err(ConfigError::Missing("OPENAI_API_KEY"))
        ));

        let mut config = valid();
        config.business_webhook_url = None;
        assert!(matches!(
            validate(&config),
            Err(ConfigError::Missing("BUSINESS_WEBHOOK_URL"))
        ));
    }

    #[test]
    fn test_rejects_non_http_webhook_url() {
        let mut config = valid();
        config.business_webhook_url = Some("ftp://files.example.com".into());
        assert!(matches!(
            validate(&config),
            Err(ConfigError::Invalid {
                name: "BUSINESS_WEBHOOK_URL",
                ..
            })
        ));

        config.business_webhook_url = Some("not a url".into());
        assert!(validate(&config).is_err());
    }

    #[test]
    fn test_rejects_out_of_range_sampling() {
        let mut config = valid();
        config.llm.temperature = 3.5;
        assert!(matches!(
            validate(&config),
            Err(ConfigError::Invalid {
                name: "LLM_TEMPERATURE",
                ..
            })
        ));

        let mut config = valid();
        config.llm.presence_penalty = -2.5;
        assert!(validate(&config).is_err());
    }

    #[test]
    fn test_rejects_zero_round_cap() {
        let mut config = valid();
        config.tools.max_rounds = 0;
        assert!(matches!(
            validate(&config),
            Err(ConfigError::Invalid {
                name: "MAX_TOOL_ROUNDS",
                ..
            })
        ));
    }

    #[test]
    fn test_rejects_missing_tls_files() {
        let mut config = valid();
        config.tls = Some(TlsConfig {
            cert_path: PathBuf::from("/nonexistent/cert.pem"),
            key_path: PathBuf::from("/nonexistent/key.pem"),
        });
        assert!(matches!(
            validate(&config),
            Err(ConfigError::Invalid {
                name: "TLS_CERT_PATH",
                ..
            })
        ));
    }
}
