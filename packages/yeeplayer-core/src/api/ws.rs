//! Relay WebSocket handler.
//!
//! One task per peer multiplexes:
//! - frames from the peer (validated, then fanned out)
//! - frames from other peers (forwarded unless they came from this peer)
//! - a heartbeat that pings the peer and drops it after prolonged silence
//! - force-close from the connection manager

use std::net::SocketAddr;
use std::time::{Duration, Instant};

use axum::body::Bytes;
use axum::extract::connect_info::ConnectInfo;
use axum::extract::ws::{Message, Utf8Bytes, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::IntoResponse;
use futures::{SinkExt, StreamExt};
use tokio::sync::broadcast::error::RecvError;

use crate::api::{PeerGuard, RelayFrame, RelayState};
use crate::envelope::decode_str;
use crate::error::ErrorCode;

/// WebSocket upgrade handler.
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    State(state): State<RelayState>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_peer(socket, addr, state))
}

async fn handle_peer(socket: WebSocket, addr: SocketAddr, state: RelayState) {
    let (mut sender, mut receiver) = socket.split();
    // Subscribe before registering so nothing sent after `register` is missed.
    let mut fanout_rx = state.fanout.subscribe();
    let peer = state.connections.register(Some(addr));
    let cancel_token = peer.cancel_token().clone();

    let timeout = Duration::from_secs(state.config.heartbeat_timeout_secs);
    let mut last_activity = Instant::now();
    let mut heartbeat =
        tokio::time::interval(Duration::from_secs(state.config.heartbeat_interval_secs));
    heartbeat.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = cancel_token.cancelled() => {
                log::info!("[Relay] Closing peer {}", peer.id());
                let _ = sender.send(Message::Close(None)).await;
                break;
            }

            msg = receiver.next() => {
                last_activity = Instant::now();
                match msg {
                    Some(Ok(Message::Text(text))) => accept_frame(&state, &peer, text),
                    Some(Ok(Message::Binary(_))) => {
                        log::debug!("[Relay] Ignoring binary frame from {}", peer.id());
                        state.reject();
                    }
                    Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
                    Some(Ok(_)) => {}
                }
            }

            frame = fanout_rx.recv() => {
                match frame {
                    Ok(frame) if frame.from == *peer.id() => {}
                    Ok(frame) => {
                        if sender.send(Message::Text(frame.text)).await.is_err() {
                            break;
                        }
                    }
                    Err(RecvError::Lagged(skipped)) => {
                        log::warn!("[Relay] Peer {} lagged, skipped {} frame(s)", peer.id(), skipped);
                    }
                    Err(RecvError::Closed) => break,
                }
            }

            _ = heartbeat.tick() => {
                if last_activity.elapsed() > timeout {
                    log::warn!("[Relay] Heartbeat timeout for {}", peer.id());
                    break;
                }
                if sender.send(Message::Ping(Bytes::new())).await.is_err() {
                    break;
                }
            }
        }
    }
}

/// Validates an inbound frame and fans it out unchanged.
fn accept_frame(state: &RelayState, peer: &PeerGuard, text: Utf8Bytes) {
    match decode_str(text.as_str()) {
        Ok(envelope) => {
            log::trace!("[Relay] {} -> '{}'", peer.id(), envelope.key);
            peer.record_frame();
            state.relay(RelayFrame {
                from: peer.id().clone(),
                text,
            });
        }
        Err(e) => {
            log::debug!("[Relay] Dropping frame from {} ({}): {}", peer.id(), e.code(), e);
            state.reject();
        }
    }
}
