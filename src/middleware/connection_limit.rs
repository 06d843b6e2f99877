//! Connection limit middleware for call WebSockets
//!
//! Every WebSocket upgrade must obtain a slot before it reaches the call
//! handler. Two limits apply:
//! - a global cap on concurrent call connections
//! - a per-IP cap
//!
//! The slot is carried to the handler as a [`ConnectionPermit`] request
//! extension and released when the last clone of the permit is dropped,
//! which happens when the socket task ends or when the upgrade never
//! completes.

use axum::{
    body::Body,
    extract::{ConnectInfo, State},
    http::{Request, StatusCode, header},
    middleware::Next,
    response::{IntoResponse, Response},
};
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use tracing::warn;

use crate::state::{AppState, ConnectionLimitError};

/// A held connection slot.
#[derive(Clone)]
pub struct ConnectionPermit {
    ip: IpAddr,
    _slot: Arc<SlotGuard>,
}

impl ConnectionPermit {
    /// Claim a slot for `ip`.
    pub fn acquire(state: Arc<AppState>, ip: IpAddr) -> Result<Self, ConnectionLimitError> {
        state.try_acquire_connection(ip)?;
        Ok(Self {
            ip,
            _slot: Arc::new(SlotGuard { state, ip }),
        })
    }

    pub fn ip(&self) -> IpAddr {
        self.ip
    }
}

impl std::fmt::Debug for ConnectionPermit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionPermit").field("ip", &self.ip).finish()
    }
}

struct SlotGuard {
    state: Arc<AppState>,
    ip: IpAddr,
}

impl Drop for SlotGuard {
    fn drop(&mut self) {
        self.state.release_connection(self.ip);
    }
}

fn is_websocket_upgrade(request: &Request<Body>) -> bool {
    request
        .headers()
        .get(header::UPGRADE)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.eq_ignore_ascii_case("websocket"))
        .unwrap_or(false)
}

/// Enforce connection limits on WebSocket upgrades.
///
/// Global limit exceeded → 503, per-IP limit exceeded → 429. Requests that
/// are not upgrades pass through untouched.
pub async fn connection_limit_middleware(
    State(state): State<Arc<AppState>>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    mut request: Request<Body>,
    next: Next,
) -> Response {
    if !is_websocket_upgrade(&request) {
        return next.run(request).await;
    }

    let client_ip = addr.ip();
    match ConnectionPermit::acquire(state, client_ip) {
        Ok(permit) => {
            request.extensions_mut().insert(permit);
            next.run(request).await
        }
        Err(ConnectionLimitError::GlobalLimitReached) => {
            warn!(ip = %client_ip, "Rejecting call connection: global limit reached");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                "Server at capacity. Please try again later.",
            )
                .into_response()
        }
        Err(ConnectionLimitError::PerIpLimitReached) => {
            warn!(ip = %client_ip, "Rejecting call connection: per-IP limit reached");
            (
                StatusCode::TOO_MANY_REQUESTS,
                "Too many connections from your IP address.",
            )
                .into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ServerConfig;
    use std::net::Ipv4Addr;

    fn state_with_limits(global: Option<usize>, per_ip: u32) -> Arc<AppState> {
        let mut config = ServerConfig::new("key_test", "sk-test", None);
        config.security.max_websocket_connections = global;
        config.security.max_connections_per_ip = per_ip;
        AppState::new(config).unwrap()
    }

    #[test]
    fn test_per_ip_limit() {
        let state = state_with_limits(Some(10), 3);
        let ip: IpAddr = Ipv4Addr::new(192, 168, 1, 100).into();

        assert_eq!(state.ws_connection_count(), 0);
        for expected in 1..=3 {
            assert!(state.try_acquire_connection(ip).is_ok());
            assert_eq!(state.ip_connection_count(&ip), expected);
        }
        assert_eq!(
            state.try_acquire_connection(ip),
            Err(ConnectionLimitError::PerIpLimitReached)
        );
        assert_eq!(state.ws_connection_count(), 3);

        state.release_connection(ip);
        assert_eq!(state.ip_connection_count(&ip), 2);
        assert!(state.try_acquire_connection(ip).is_ok());
    }

    #[test]
    fn test_global_limit() {
        let state = state_with_limits(Some(5), 10);
        let ips: Vec<IpAddr> = (1..=6).map(|i| Ipv4Addr::new(10, 0, 0, i).into()).collect();

        for ip in &ips[0..5] {
            assert!(state.try_acquire_connection(*ip).is_ok());
        }
        assert_eq!(
            state.try_acquire_connection(ips[5]),
            Err(ConnectionLimitError::GlobalLimitReached)
        );
        // A rejected IP leaves no per-IP entry behind
        assert_eq!(state.ip_connection_count(&ips[5]), 0);

        state.release_connection(ips[0]);
        assert!(state.try_acquire_connection(ips[5]).is_ok());
        assert_eq!(state.ws_connection_count(), 5);
    }

    #[test]
    fn test_permit_releases_on_last_drop() {
        let state = state_with_limits(None, 2);
        let ip: IpAddr = Ipv4Addr::LOCALHOST.into();

        let permit = ConnectionPermit::acquire(state.clone(), ip).unwrap();
        let clone = permit.clone();
        assert_eq!(state.ws_connection_count(), 1);

        drop(permit);
        assert_eq!(state.ws_connection_count(), 1);

        drop(clone);
        assert_eq!(state.ws_connection_count(), 0);
        assert_eq!(state.ip_connection_count(&ip), 0);
    }

    #[test]
    fn test_upgrade_detection() {
        let upgrade = Request::builder()
            .header("upgrade", "WebSocket")
            .body(Body::empty())
            .unwrap();
        let plain = Request::builder().body(Body::empty()).unwrap();

        assert!(is_websocket_upgrade(&upgrade));
        assert!(!is_websocket_upgrade(&plain));
    }
}
