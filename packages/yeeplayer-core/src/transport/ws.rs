//! WebSocket client transport talking to a relay.
//!
//! A background driver task owns the socket. Outbound envelopes go through a
//! bounded queue that only accepts traffic while connected; inbound text
//! frames and connectivity changes are delivered to an [`EventSink`].
//! After a lost connection the driver reconnects on a fixed delay unless
//! reconnection is disabled.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use futures::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::http::Uri;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tokio_util::sync::CancellationToken;

use super::{EventSink, Transport, TransportError, TransportEvent, TransportResult};
use crate::envelope::Envelope;
use crate::protocol_constants::{DEFAULT_RECONNECT_DELAY_MS, TRANSPORT_OUTBOUND_CAPACITY};
use crate::runtime::TaskSpawner;

type Socket = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Connection behaviour for [`WsTransport`].
#[derive(Debug, Clone)]
pub struct ConnectOptions {
    /// Reconnect after the relay goes away.
    pub reconnect: bool,
    /// Pause between reconnect attempts.
    pub reconnect_delay: Duration,
    /// Consecutive failed attempts before giving up. `None` retries forever.
    pub max_reconnect_attempts: Option<u32>,
    pub outbound_capacity: usize,
}

impl Default for ConnectOptions {
    fn default() -> Self {
        Self {
            reconnect: true,
            reconnect_delay: Duration::from_millis(DEFAULT_RECONNECT_DELAY_MS),
            max_reconnect_attempts: None,
            outbound_capacity: TRANSPORT_OUTBOUND_CAPACITY,
        }
    }
}

impl ConnectOptions {
    #[must_use]
    pub fn with_reconnect(mut self, reconnect: bool) -> Self {
        self.reconnect = reconnect;
        self
    }

    #[must_use]
    pub fn with_reconnect_delay(mut self, delay: Duration) -> Self {
        self.reconnect_delay = delay;
        self
    }

    #[must_use]
    pub fn with_max_reconnect_attempts(mut self, attempts: u32) -> Self {
        self.max_reconnect_attempts = Some(attempts);
        self
    }
}

/// Handle to a relay connection driven in the background.
///
/// Dropping the handle closes the connection.
pub struct WsTransport {
    outbound: mpsc::Sender<String>,
    connected: Arc<AtomicBool>,
    cancel: CancellationToken,
}

impl WsTransport {
    /// Validates `url` and starts the driver task.
    ///
    /// Returns immediately; the first `Connected` (or `Disconnected`, when
    /// the relay is unreachable) arrives on `sink`. The sink is released once
    /// the driver stops.
    pub fn connect<S: TaskSpawner>(
        url: &str,
        options: ConnectOptions,
        sink: EventSink,
        spawner: &S,
    ) -> TransportResult<Self> {
        validate_url(url)?;

        let (outbound_tx, outbound_rx) = mpsc::channel(options.outbound_capacity.max(1));
        let connected = Arc::new(AtomicBool::new(false));
        let cancel = CancellationToken::new();

        let driver = Driver {
            url: url.to_string(),
            options,
            outbound: outbound_rx,
            inbound: sink,
            connected: Arc::clone(&connected),
            cancel: cancel.clone(),
        };
        spawner.spawn(driver.run());

        Ok(Self {
            outbound: outbound_tx,
            connected,
            cancel,
        })
    }

    /// Closes the connection and stops reconnecting.
    pub fn close(&self) {
        self.cancel.cancel();
    }
}

impl Transport for WsTransport {
    fn send(&self, envelope: &Envelope) {
        if !self.connected.load(Ordering::SeqCst) {
            log::trace!("[Transport] Offline, dropping '{}'", envelope.key);
            return;
        }
        let text = match envelope.to_text() {
            Ok(text) => text,
            Err(e) => {
                log::warn!("[Transport] Failed to serialize envelope: {}", e);
                return;
            }
        };
        if self.outbound.try_send(text).is_err() {
            log::debug!("[Transport] Outbound queue full, dropping '{}'", envelope.key);
        }
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }
}

impl Drop for WsTransport {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

/// Accepts `ws://` and `wss://` URLs with a host.
pub(crate) fn validate_url(url: &str) -> TransportResult<Uri> {
    let uri: Uri = url
        .parse()
        .map_err(|_| TransportError::InvalidUrl(url.to_string()))?;

    match uri.scheme_str() {
        Some("ws") | Some("wss") => {}
        Some(other) => return Err(TransportError::UnsupportedScheme(other.to_string())),
        None => return Err(TransportError::InvalidUrl(url.to_string())),
    }
    if uri.host().map_or(true, str::is_empty) {
        return Err(TransportError::InvalidUrl(url.to_string()));
    }
    Ok(uri)
}

// ─────────────────────────────────────────────────────────────────────────────
// Driver
// ─────────────────────────────────────────────────────────────────────────────

/// Why a single connection ended.
enum ConnectionEnd {
    /// Socket closed or errored; eligible for reconnect.
    Lost,
    /// Cancelled, or nobody is listening anymore.
    Stopped,
}

struct Driver {
    url: String,
    options: ConnectOptions,
    outbound: mpsc::Receiver<String>,
    inbound: EventSink,
    connected: Arc<AtomicBool>,
    cancel: CancellationToken,
}

impl Driver {
    async fn run(mut self) {
        let mut failed_attempts: u32 = 0;

        loop {
            let attempt = tokio::select! {
                _ = self.cancel.cancelled() => break,
                result = connect_async(self.url.as_str()) => result,
            };

            match attempt {
                Ok((socket, _response)) => {
                    failed_attempts = 0;
                    log::info!("[Transport] Connected to {}", self.url);

                    // Anything queued before this connection existed is stale.
                    while self.outbound.try_recv().is_ok() {}
                    self.connected.store(true, Ordering::SeqCst);
                    if !self.inbound.deliver(TransportEvent::Connected).await {
                        break;
                    }

                    let end = self.pump(socket).await;
                    self.connected.store(false, Ordering::SeqCst);
                    self.inbound.deliver(TransportEvent::Disconnected).await;
                    log::info!("[Transport] Disconnected from {}", self.url);

                    if matches!(end, ConnectionEnd::Stopped) {
                        break;
                    }
                }
                Err(e) => {
                    failed_attempts += 1;
                    log::warn!(
                        "[Transport] Connect to {} failed (attempt {}): {}",
                        self.url,
                        failed_attempts,
                        e
                    );
                    if failed_attempts == 1
                        && !self.inbound.deliver(TransportEvent::Disconnected).await
                    {
                        break;
                    }
                }
            }

            if !self.options.reconnect {
                break;
            }
            if let Some(max) = self.options.max_reconnect_attempts {
                if failed_attempts >= max {
                    log::warn!("[Transport] Giving up on {} after {} attempts", self.url, max);
                    break;
                }
            }

            tokio::select! {
                _ = self.cancel.cancelled() => break,
                _ = tokio::time::sleep(self.options.reconnect_delay) => {}
            }
        }

        self.connected.store(false, Ordering::SeqCst);
        log::debug!("[Transport] Driver for {} stopped", self.url);
    }

    /// Moves frames in both directions until the connection ends.
    async fn pump(&mut self, socket: Socket) -> ConnectionEnd {
        let (mut sink, mut stream) = socket.split();

        loop {
            tokio::select! {
                _ = self.cancel.cancelled() => {
                    let _ = sink.send(Message::Close(None)).await;
                    return ConnectionEnd::Stopped;
                }

                outgoing = self.outbound.recv() => {
                    let Some(text) = outgoing else {
                        return ConnectionEnd::Stopped;
                    };
                    if let Err(e) = sink.send(Message::Text(text.into())).await {
                        log::warn!("[Transport] Send failed: {}", e);
                        return ConnectionEnd::Lost;
                    }
                }

                incoming = stream.next() => {
                    match incoming {
                        Some(Ok(Message::Text(text))) => {
                            let event = TransportEvent::Message(text.as_str().to_owned());
                            if !self.inbound.deliver(event).await {
                                return ConnectionEnd::Stopped;
                            }
                        }
                        Some(Ok(Message::Close(_))) | None => return ConnectionEnd::Lost,
                        Some(Ok(_)) => {}
                        Some(Err(e)) => {
                            log::warn!("[Transport] Receive failed: {}", e);
                            return ConnectionEnd::Lost;
                        }
                    }
                }
            }
        }
    }
}
