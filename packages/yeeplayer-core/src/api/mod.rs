//! Relay server: a stateless fan-out hub for board envelopes.
//!
//! Every peer connects to `/ws`. Each well-formed envelope a peer sends is
//! forwarded, unchanged, to every other connected peer. The relay keeps no
//! board state, assigns no order across senders and sends nothing back to
//! the sender. Malformed frames are dropped at the relay.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

use axum::extract::ws::Utf8Bytes;
use thiserror::Error;
use tokio::net::TcpListener;
use tokio::sync::broadcast;

use crate::config::RelayConfig;
use crate::protocol_constants::{RELAY_PORT_RANGE_END, RELAY_PORT_RANGE_START};

pub mod http;
pub mod ws;
pub mod ws_connection;

pub use ws_connection::{PeerGuard, PeerId, PeerInfo, RelayConnectionManager};

/// Errors that can occur when starting or running the relay.
#[derive(Debug, Error)]
pub enum ServerError {
    /// Failed to bind to a TCP port.
    #[error("Failed to bind to port: {0}")]
    Bind(#[from] std::io::Error),

    /// No available ports in the specified range.
    #[error("No available ports in range {start}-{end}")]
    NoAvailablePort { start: u16, end: u16 },

    /// The relay configuration is invalid.
    #[error("Invalid relay configuration: {0}")]
    Configuration(String),
}

/// One text frame on its way through the relay.
#[derive(Debug, Clone)]
pub struct RelayFrame {
    /// Peer that sent the frame; it is not echoed back there.
    pub from: PeerId,
    pub text: Utf8Bytes,
}

/// Relay-wide counters reported by `/health`.
#[derive(Debug, Default)]
pub struct RelayStats {
    pub frames_relayed: AtomicU64,
    pub frames_rejected: AtomicU64,
}

/// Shared state handed to every relay handler.
#[derive(Clone)]
pub struct RelayState {
    pub config: Arc<RelayConfig>,
    pub connections: Arc<RelayConnectionManager>,
    pub fanout: broadcast::Sender<RelayFrame>,
    pub stats: Arc<RelayStats>,
    started_at: Instant,
}

impl RelayState {
    /// Creates relay state after validating `config`.
    pub fn new(config: RelayConfig) -> Result<Self, ServerError> {
        config.validate().map_err(ServerError::Configuration)?;
        let (fanout, _) = broadcast::channel(config.channel_capacity);
        Ok(Self {
            config: Arc::new(config),
            connections: Arc::new(RelayConnectionManager::new()),
            fanout,
            stats: Arc::new(RelayStats::default()),
            started_at: Instant::now(),
        })
    }

    pub fn uptime_secs(&self) -> u64 {
        self.started_at.elapsed().as_secs()
    }

    /// Offers a validated frame to every subscribed peer.
    pub(crate) fn relay(&self, frame: RelayFrame) {
        self.stats.frames_relayed.fetch_add(1, Ordering::Relaxed);
        // No receivers just means nobody else is connected.
        let _ = self.fanout.send(frame);
    }

    pub(crate) fn reject(&self) {
        self.stats.frames_rejected.fetch_add(1, Ordering::Relaxed);
    }
}

async fn find_available_port(start: u16, end: u16) -> Result<(u16, TcpListener), ServerError> {
    for port in start..=end {
        let addr = std::net::SocketAddr::from(([0, 0, 0, 0], port));
        if let Ok(listener) = TcpListener::bind(&addr).await {
            return Ok((port, listener));
        }
    }
    Err(ServerError::NoAvailablePort { start, end })
}

/// Binds the configured port, or the first free one in the default range.
pub async fn bind(config: &RelayConfig) -> Result<(u16, TcpListener), ServerError> {
    if config.preferred_port > 0 {
        let addr = std::net::SocketAddr::from(([0, 0, 0, 0], config.preferred_port));
        Ok((config.preferred_port, TcpListener::bind(&addr).await?))
    } else {
        find_available_port(RELAY_PORT_RANGE_START, RELAY_PORT_RANGE_END).await
    }
}

/// Serves the relay on an already bound listener.
pub async fn serve(listener: TcpListener, state: RelayState) -> Result<(), ServerError> {
    if let Ok(addr) = listener.local_addr() {
        log::info!("[Relay] Listening on ws://{}/ws", addr);
    }
    let app = http::create_router(state);
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<std::net::SocketAddr>(),
    )
    .await?;
    Ok(())
}

/// Binds and serves the relay until the task is aborted.
pub async fn start_server(state: RelayState) -> Result<(), ServerError> {
    let (_, listener) = bind(&state.config).await?;
    serve(listener, state).await
}
