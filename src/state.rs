//! Shared application state
//!
//! Holds the configuration, the completion provider, the tool dispatcher,
//! the registry of live calls and the WebSocket connection counters.

use std::net::IpAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use dashmap::DashMap;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::warn;
use uuid::Uuid;

use crate::config::{AgentConfig, ServerConfig};
use crate::core::llm::{CompletionProvider, LlmError, OpenAICompletion};
use crate::core::tools::{ToolDispatcher, ToolError};
use crate::handlers::llm_ws::ResponseDrafter;

/// Reasons a WebSocket upgrade is refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ConnectionLimitError {
    #[error("global WebSocket connection limit reached")]
    GlobalLimitReached,
    #[error("per-IP WebSocket connection limit reached")]
    PerIpLimitReached,
}

#[derive(Debug, Error)]
pub enum StateError {
    #[error("completion provider: {0}")]
    Llm(#[from] LlmError),
    #[error("tool dispatcher: {0}")]
    Tools(#[from] ToolError),
}

/// A live call connection, keyed by call id.
struct ActiveCall {
    connection_id: Uuid,
    cancel: CancellationToken,
}

pub struct AppState {
    pub config: ServerConfig,
    pub completion: Arc<dyn CompletionProvider>,
    pub tools: Arc<ToolDispatcher>,
    agent: Arc<AgentConfig>,
    calls: DashMap<String, ActiveCall>,
    ws_connections: AtomicUsize,
    ip_connections: DashMap<IpAddr, usize>,
}

impl AppState {
    /// Build the state with the OpenAI provider and the configured business webhook.
    pub fn new(config: ServerConfig) -> Result<Arc<Self>, StateError> {
        let completion: Arc<dyn CompletionProvider> = Arc::new(OpenAICompletion::new(
            config.openai_api_key.clone(),
            config.llm.clone(),
        )?);
        let tools = Arc::new(ToolDispatcher::new(
            config.business_webhook_url.clone(),
            config.tools.clone(),
        )?);
        Ok(Self::with_components(config, completion, tools))
    }

    /// Build the state around an existing provider and dispatcher.
    pub fn with_components(
        config: ServerConfig,
        completion: Arc<dyn CompletionProvider>,
        tools: Arc<ToolDispatcher>,
    ) -> Arc<Self> {
        Arc::new(Self {
            agent: Arc::new(config.agent.clone()),
            config,
            completion,
            tools,
            calls: DashMap::new(),
            ws_connections: AtomicUsize::new(0),
            ip_connections: DashMap::new(),
        })
    }

    pub fn agent(&self) -> &AgentConfig {
        &self.agent
    }

    /// A drafter bound to `call_id`.
    pub fn drafter_for(&self, call_id: &str) -> ResponseDrafter {
        ResponseDrafter::new(
            call_id,
            self.completion.clone(),
            self.tools.clone(),
            self.agent.clone(),
            self.config.tools.max_rounds,
        )
    }

    // =========================================================================
    // Call registry
    // =========================================================================

    /// Register a connection for `call_id`.
    ///
    /// If another connection already serves the call, its token is cancelled
    /// and `true` is returned.
    pub fn register_call(&self, call_id: &str, connection_id: Uuid, cancel: CancellationToken) -> bool {
        let previous = self.calls.insert(
            call_id.to_string(),
            ActiveCall {
                connection_id,
                cancel,
            },
        );
        match previous {
            Some(previous) => {
                warn!(
                    call_id,
                    superseded = %previous.connection_id,
                    %connection_id,
                    "Call reconnected, closing previous connection"
                );
                previous.cancel.cancel();
                true
            }
            None => false,
        }
    }

    /// Remove the registry entry, unless a newer connection has replaced it.
    pub fn unregister_call(&self, call_id: &str, connection_id: Uuid) {
        self.calls
            .remove_if(call_id, |_, call| call.connection_id == connection_id);
    }

    pub fn active_call_count(&self) -> usize {
        self.calls.len()
    }

    pub fn is_call_active(&self, call_id: &str) -> bool {
        self.calls.contains_key(call_id)
    }

    // =========================================================================
    // Connection limits
    // =========================================================================

    pub fn try_acquire_connection(&self, ip: IpAddr) -> Result<(), ConnectionLimitError> {
        let max_global = self.config.security.max_websocket_connections;
        let max_per_ip = self.config.security.max_connections_per_ip as usize;

        let mut per_ip = self.ip_connections.entry(ip).or_insert(0);
        if *per_ip >= max_per_ip {
            return Err(ConnectionLimitError::PerIpLimitReached);
        }

        let global = self
            .ws_connections
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |count| match max_global {
                Some(max) if count >= max => None,
                _ => Some(count + 1),
            });

        if global.is_err() {
            let unused = *per_ip == 0;
            drop(per_ip);
            if unused {
                self.ip_connections.remove_if(&ip, |_, count| *count == 0);
            }
            return Err(ConnectionLimitError::GlobalLimitReached);
        }

        *per_ip += 1;
        Ok(())
    }

    pub fn release_connection(&self, ip: IpAddr) {
        let _ = self
            .ws_connections
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |count| {
                count.checked_sub(1)
            });

        let now_empty = match self.ip_connections.get_mut(&ip) {
            Some(mut count) => {
                *count = count.saturating_sub(1);
                *count == 0
            }
            None => false,
        };
        if now_empty {
            self.ip_connections.remove_if(&ip, |_, count| *count == 0);
        }
    }

    pub fn ws_connection_count(&self) -> usize {
        self.ws_connections.load(Ordering::SeqCst)
    }

    pub fn ip_connection_count(&self, ip: &IpAddr) -> usize {
        self.ip_connections.get(ip).map(|count| *count).unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> ServerConfig {
        ServerConfig::new("key_test", "sk-test", Some("http://127.0.0.1:9/hook".into()))
    }

    #[test]
    fn test_new_builds_openai_provider() {
        let state = AppState::new(config()).unwrap();
        assert_eq!(state.completion.name(), "openai");
        assert_eq!(state.agent().begin_message, config().agent.begin_message);
    }

    #[test]
    fn test_new_rejects_missing_openai_key() {
        let config = ServerConfig::new("key_test", "", None);
        assert!(matches!(AppState::new(config), Err(StateError::Llm(_))));
    }

    #[test]
    fn test_register_and_unregister_call() {
        let state = AppState::new(config()).unwrap();
        let connection = Uuid::new_v4();

        assert!(!state.register_call("call_1", connection, CancellationToken::new()));
        assert!(state.is_call_active("call_1"));
        assert_eq!(state.active_call_count(), 1);

        state.unregister_call("call_1", connection);
        assert!(!state.is_call_active("call_1"));
    }

    #[test]
    fn test_reconnect_supersedes_previous_connection() {
        let state = AppState::new(config()).unwrap();
        let first = Uuid::new_v4();
        let first_token = CancellationToken::new();
        let second = Uuid::new_v4();

        state.register_call("call_1", first, first_token.clone());
        assert!(state.register_call("call_1", second, CancellationToken::new()));
        assert!(first_token.is_cancelled());

        // The stale connection's cleanup must not evict the new one.
        state.unregister_call("call_1", first);
        assert!(state.is_call_active("call_1"));

        state.unregister_call("call_1", second);
        assert!(!state.is_call_active("call_1"));
    }
}
