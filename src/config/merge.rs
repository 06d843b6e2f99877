//! Merging YAML and environment configurations
//!
//! Priority: YAML > environment > defaults.

use super::env::EnvConfig;
use super::yaml::YamlConfig;
use super::{
    AgentConfig, ConfigError, DEFAULT_HOST, DEFAULT_PORT, DEFAULT_WS_IDLE_TIMEOUT_SECS,
    LlmSettings, SecuritySettings, ServerConfig, TlsConfig, ToolSettings,
};

pub fn merge_config(yaml: Option<YamlConfig>) -> Result<ServerConfig, ConfigError> {
    let env = EnvConfig::load()?;
    let yaml = yaml.unwrap_or_default();

    let server = yaml.server.unwrap_or_default();
    let tls_yaml = server.tls.unwrap_or_default();
    let platform = yaml.platform.unwrap_or_default();
    let llm = yaml.llm.unwrap_or_default();
    let tools = yaml.tools.unwrap_or_default();
    let agent = yaml.agent.unwrap_or_default();
    let connection = yaml.connection.unwrap_or_default();
    let security = yaml.security.unwrap_or_default();

    let tls_enabled = tls_yaml.enabled.or(env.tls_enabled);
    let cert_path = tls_yaml.cert_path.or(env.tls_cert_path);
    let key_path = tls_yaml.key_path.or(env.tls_key_path);
    let tls = match (tls_enabled, cert_path, key_path) {
        (Some(false), _, _) => None,
        (_, Some(cert_path), Some(key_path)) => Some(TlsConfig {
            cert_path,
            key_path,
        }),
        (Some(true), _, _) => return Err(ConfigError::Missing("TLS_CERT_PATH and TLS_KEY_PATH")),
        _ => None,
    };

    let llm_defaults = LlmSettings::default();
    let tool_defaults = ToolSettings::default();
    let agent_defaults = AgentConfig::default();
    let security_defaults = SecuritySettings::default();

    Ok(ServerConfig {
        host: server
            .host
            .or(env.host)
            .unwrap_or_else(|| DEFAULT_HOST.to_string()),
        port: server.port.or(env.port).unwrap_or(DEFAULT_PORT),
        tls,

        retell_api_key: platform
            .retell_api_key
            .or(env.retell_api_key)
            .unwrap_or_default(),
        openai_api_key: llm.api_key.or(env.openai_api_key).unwrap_or_default(),
        business_webhook_url: tools.webhook_url.or(env.business_webhook_url),

        llm: LlmSettings {
            base_url: llm
                .base_url
                .or(env.openai_base_url)
                .unwrap_or(llm_defaults.base_url),
            model: llm.model.or(env.llm_model).unwrap_or(llm_defaults.model),
            temperature: llm
                .temperature
                .or(env.llm_temperature)
                .unwrap_or(llm_defaults.temperature),
            max_tokens: llm
                .max_tokens
                .or(env.llm_max_tokens)
                .unwrap_or(llm_defaults.max_tokens),
            frequency_penalty: llm
                .frequency_penalty
                .or(env.llm_frequency_penalty)
                .unwrap_or(llm_defaults.frequency_penalty),
            presence_penalty: llm
                .presence_penalty
                .or(env.llm_presence_penalty)
                .unwrap_or(llm_defaults.presence_penalty),
            connect_timeout_secs: llm
                .connect_timeout_secs
                .or(env.llm_connect_timeout_secs)
                .unwrap_or(llm_defaults.connect_timeout_secs),
            stream_idle_timeout_secs: llm
                .stream_idle_timeout_secs
                .or(env.llm_stream_idle_timeout_secs)
                .unwrap_or(llm_defaults.stream_idle_timeout_secs),
        },

        tools: ToolSettings {
            lookup_timeout_ms: tools
                .lookup_timeout_ms
                .or(env.tool_lookup_timeout_ms)
                .unwrap_or(tool_defaults.lookup_timeout_ms),
            booking_timeout_ms: tools
                .booking_timeout_ms
                .or(env.tool_booking_timeout_ms)
                .unwrap_or(tool_defaults.booking_timeout_ms),
            max_rounds: tools
                .max_rounds
                .or(env.max_tool_rounds)
                .unwrap_or(tool_defaults.max_rounds),
        },

        agent: AgentConfig {
            begin_message: agent
                .begin_message
                .or(env.agent_begin_message)
                .unwrap_or(agent_defaults.begin_message),
            system_prompt: agent
                .system_prompt
                .or(env.agent_system_prompt)
                .unwrap_or(agent_defaults.system_prompt),
            reminder_prompt: agent
                .reminder_prompt
                .or(env.agent_reminder_prompt)
                .unwrap_or(agent_defaults.reminder_prompt),
            fallback_reply: agent
                .fallback_reply
                .or(env.agent_fallback_reply)
                .unwrap_or(agent_defaults.fallback_reply),
        },

        ws_idle_timeout_secs: connection
            .idle_timeout_secs
            .or(env.ws_idle_timeout_secs)
            .unwrap_or(DEFAULT_WS_IDLE_TIMEOUT_SECS),

        security: SecuritySettings {
            cors_allowed_origins: security
                .cors_allowed_origins
                .or(env.cors_allowed_origins),
            rate_limit_requests_per_second: security
                .rate_limit_requests_per_second
                .or(env.rate_limit_requests_per_second)
                .unwrap_or(security_defaults.rate_limit_requests_per_second),
            rate_limit_burst_size: security
                .rate_limit_burst_size
                .or(env.rate_limit_burst_size)
                .unwrap_or(security_defaults.rate_limit_burst_size),
            max_websocket_connections: security
                .max_websocket_connections
                .or(env.max_websocket_connections),
            max_connections_per_ip: security
                .max_connections_per_ip
                .or(env.max_connections_per_ip)
                .unwrap_or(security_defaults.max_connections_per_ip),
        },
    })
}
