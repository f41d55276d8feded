//! Relay connection registry.
//!
//! - `RelayConnectionManager`: tracks every connected peer and can close them all
//! - `PeerGuard`: unregisters its peer when the handler exits, however it exits

use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

use dashmap::DashMap;
use parking_lot::RwLock;
use serde::Serialize;
use tokio_util::sync::CancellationToken;

/// Identifier the relay assigns to each connection.
pub type PeerId = Arc<str>;

struct PeerState {
    addr: Option<SocketAddr>,
    connected_at: Instant,
    frames_sent: AtomicU64,
}

/// Read-only view of one connected peer.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PeerInfo {
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub addr: Option<String>,
    pub connected_secs: u64,
    pub frames_sent: u64,
}

/// Registry of connected relay peers.
///
/// Each peer gets a child of the current global token, so `close_all`
/// reaches every handler at once.
pub struct RelayConnectionManager {
    peers: DashMap<PeerId, PeerState>,
    next_id: AtomicU64,
    global_cancel: RwLock<CancellationToken>,
}

impl RelayConnectionManager {
    pub fn new() -> Self {
        Self {
            peers: DashMap::new(),
            next_id: AtomicU64::new(1),
            global_cancel: RwLock::new(CancellationToken::new()),
        }
    }

    /// Registers a peer; the returned guard unregisters it on drop.
    pub fn register(self: &Arc<Self>, addr: Option<SocketAddr>) -> PeerGuard {
        let n = self.next_id.fetch_add(1, Ordering::Relaxed);
        let id: PeerId = Arc::from(format!("peer-{}", n));
        let cancel_token = self.global_cancel.read().child_token();

        self.peers.insert(
            Arc::clone(&id),
            PeerState {
                addr,
                connected_at: Instant::now(),
                frames_sent: AtomicU64::new(0),
            },
        );
        log::info!(
            "[Relay] Peer joined: {} from {} (total: {})",
            id,
            addr.map_or_else(|| "unknown".to_string(), |a| a.to_string()),
            self.peers.len()
        );

        PeerGuard {
            id,
            manager: Arc::clone(self),
            cancel_token,
        }
    }

    fn unregister(&self, id: &str) {
        if self.peers.remove(id).is_some() {
            log::info!(
                "[Relay] Peer left: {} (remaining: {})",
                id,
                self.peers.len()
            );
        }
    }

    fn record_frame(&self, id: &str) {
        if let Some(peer) = self.peers.get(id) {
            peer.frames_sent.fetch_add(1, Ordering::Relaxed);
        }
    }

    #[must_use]
    pub fn connection_count(&self) -> usize {
        self.peers.len()
    }

    /// Snapshot of connected peers, ordered by id.
    pub fn peers(&self) -> Vec<PeerInfo> {
        let mut peers: Vec<PeerInfo> = self
            .peers
            .iter()
            .map(|entry| PeerInfo {
                id: entry.key().to_string(),
                addr: entry.addr.map(|a| a.to_string()),
                connected_secs: entry.connected_at.elapsed().as_secs(),
                frames_sent: entry.frames_sent.load(Ordering::Relaxed),
            })
            .collect();
        peers.sort_by(|a, b| a.id.cmp(&b.id));
        peers
    }

    /// Signals every connected peer to disconnect.
    ///
    /// New peers can still join afterwards. Returns how many were signalled.
    pub fn close_all(&self) -> usize {
        let count = self.peers.len();
        if count > 0 {
            log::info!("[Relay] Closing {} peer connection(s)", count);
        }
        let mut guard = self.global_cancel.write();
        guard.cancel();
        *guard = CancellationToken::new();
        count
    }
}

impl Default for RelayConnectionManager {
    fn default() -> Self {
        Self::new()
    }
}

/// Registration of one peer, held by its handler.
pub struct PeerGuard {
    id: PeerId,
    manager: Arc<RelayConnectionManager>,
    cancel_token: CancellationToken,
}

impl PeerGuard {
    pub fn id(&self) -> &PeerId {
        &self.id
    }

    /// Cancelled when the relay closes this peer.
    pub fn cancel_token(&self) -> &CancellationToken {
        &self.cancel_token
    }

    /// Counts one frame accepted from this peer.
    pub fn record_frame(&self) {
        self.manager.record_frame(&self.id);
    }
}

impl Drop for PeerGuard {
    fn drop(&mut self) {
        self.manager.unregister(&self.id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn guard_drop_unregisters() {
        let manager = Arc::new(RelayConnectionManager::new());
        let a = manager.register(None);
        let b = manager.register(Some("127.0.0.1:5000".parse().unwrap()));
        assert_eq!(manager.connection_count(), 2);
        assert_ne!(a.id(), b.id());

        drop(a);
        assert_eq!(manager.connection_count(), 1);
        assert_eq!(manager.peers()[0].addr.as_deref(), Some("127.0.0.1:5000"));
    }

    #[test]
    fn close_all_cancels_existing_but_not_new_peers() {
        let manager = Arc::new(RelayConnectionManager::new());
        let old = manager.register(None);

        assert_eq!(manager.close_all(), 1);
        assert!(old.cancel_token().is_cancelled());

        let fresh = manager.register(None);
        assert!(!fresh.cancel_token().is_cancelled());
    }

    #[test]
    fn frames_are_counted_per_peer() {
        let manager = Arc::new(RelayConnectionManager::new());
        let peer = manager.register(None);
        peer.record_frame();
        peer.record_frame();

        assert_eq!(manager.peers()[0].frames_sent, 2);
    }
}
