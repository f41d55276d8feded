//! In-process transport used by tests and single-process demos.
//!
//! A [`MemoryHub`] plays the relay: every envelope a joined peer sends is
//! serialized to text and offered to every other joined peer, exactly like
//! the WebSocket relay does. Peers that left the hub receive nothing.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use dashmap::DashMap;

use super::{EventSink, Transport, TransportEvent};
use crate::envelope::Envelope;

/// Shared fan-out point for [`MemoryTransport`] peers.
#[derive(Clone, Default)]
pub struct MemoryHub {
    peers: Arc<DashMap<u64, EventSink>>,
    next_id: Arc<AtomicU64>,
}

impl MemoryHub {
    pub fn new() -> Self {
        Self::default()
    }

    /// Joins a new peer delivering into `sink`, which first sees `Connected`.
    pub fn join(&self, sink: EventSink) -> MemoryTransport {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let transport = MemoryTransport {
            id,
            hub: self.clone(),
            inbound: sink,
            connected: AtomicBool::new(false),
        };
        transport.reconnect();
        transport
    }

    /// Number of peers currently connected.
    pub fn peer_count(&self) -> usize {
        self.peers.len()
    }

    fn fan_out(&self, from: u64, text: &str) {
        for peer in self.peers.iter() {
            if *peer.key() == from {
                continue;
            }
            if !peer
                .value()
                .try_deliver(TransportEvent::Message(text.to_owned()))
            {
                log::debug!("[Transport] Memory peer {} not keeping up, frame dropped", peer.key());
            }
        }
    }
}

/// One peer attached to a [`MemoryHub`].
pub struct MemoryTransport {
    id: u64,
    hub: MemoryHub,
    inbound: EventSink,
    connected: AtomicBool,
}

impl MemoryTransport {
    /// Leaves the hub. The peer's own sink gets `Disconnected`.
    pub fn disconnect(&self) {
        if self.connected.swap(false, Ordering::SeqCst) {
            self.hub.peers.remove(&self.id);
            self.inbound.try_deliver(TransportEvent::Disconnected);
        }
    }

    /// Rejoins the hub after [`disconnect`](Self::disconnect).
    pub fn reconnect(&self) {
        if !self.connected.swap(true, Ordering::SeqCst) {
            self.hub.peers.insert(self.id, self.inbound.clone());
            self.inbound.try_deliver(TransportEvent::Connected);
        }
    }
}

impl Transport for MemoryTransport {
    fn send(&self, envelope: &Envelope) {
        if !self.connected.load(Ordering::SeqCst) {
            return;
        }
        match envelope.to_text() {
            Ok(text) => self.hub.fan_out(self.id, &text),
            Err(e) => log::warn!("[Transport] Failed to serialize envelope: {}", e),
        }
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }
}

impl Drop for MemoryTransport {
    fn drop(&mut self) {
        self.hub.peers.remove(&self.id);
    }
}
