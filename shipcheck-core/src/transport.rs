//! Channel boundary between the session controller and the analysis service.
//!
//! The controller only needs an emit primitive ([`Transport`]) and a stream of
//! [`ChannelEvent`]s delivered into the application's event loop. The production
//! implementation is [`SocketIoClient`], a background tokio task that holds one
//! Socket.IO connection open and reconnects after it drops.

use std::time::Duration;

use futures::{SinkExt, StreamExt};
use serde_json::Value;
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};
use url::Url;

use crate::error::TransportError;
use crate::socketio::{self, EnginePacket, SocketPacket, ROOT_NAMESPACE};

/// Delay between a dropped connection and the next connect attempt.
pub const RECONNECT_DELAY: Duration = Duration::from_secs(3);

/// Outbound half of the channel.
pub trait Transport {
    /// Queues `event` with `payload` for delivery. Never blocks.
    ///
    /// # Errors
    ///
    /// [`TransportError::Closed`] once the channel has shut down for good.
    fn emit(&self, event: &str, payload: Value) -> Result<(), TransportError>;
}

/// Lifecycle and inbound traffic of the channel, in arrival order.
#[derive(Debug, Clone, PartialEq)]
pub enum ChannelEvent {
    /// Namespace joined; the service will follow up with `connected`.
    Connected,
    /// The connection dropped. A reconnect attempt follows.
    Disconnected { reason: String },
    /// A named event from the service.
    Inbound { name: String, payload: Value },
}

/// Builds the Socket.IO WebSocket URL for an `http(s)://` or `ws(s)://` server
/// address.
///
/// # Errors
///
/// [`TransportError::InvalidEndpoint`] when `server` is not a URL or uses an
/// unsupported scheme.
pub fn socket_url(server: &str) -> Result<Url, TransportError> {
    let mut url = Url::parse(server)
        .map_err(|e| TransportError::InvalidEndpoint(format!("{server}: {e}")))?;
    let scheme = match url.scheme() {
        "http" | "ws" => "ws",
        "https" | "wss" => "wss",
        other => {
            return Err(TransportError::InvalidEndpoint(format!(
                "{server}: unsupported scheme `{other}`"
            )))
        }
    };
    url.set_scheme(scheme)
        .map_err(|()| TransportError::InvalidEndpoint(server.to_owned()))?;
    url.set_path("/socket.io/");
    url.set_query(Some("EIO=4&transport=websocket"));
    Ok(url)
}

/// Handle to the background Socket.IO connection task.
///
/// Cloning is cheap; the task shuts down once every handle is dropped.
#[derive(Debug, Clone)]
pub struct SocketIoClient {
    outbound: mpsc::UnboundedSender<String>,
}

impl SocketIoClient {
    /// Spawns the connection task on the current tokio runtime.
    ///
    /// Every [`ChannelEvent`] is passed through `wrap` and sent on `tx`, so the
    /// client feeds the caller's own event enum directly.
    ///
    /// # Errors
    ///
    /// [`TransportError::InvalidEndpoint`] if `server` cannot be turned into a
    /// Socket.IO URL. Connection failures are not errors; they are retried.
    pub fn spawn<E, F>(
        server: &str,
        tx: mpsc::UnboundedSender<E>,
        wrap: F,
    ) -> Result<Self, TransportError>
    where
        E: Send + 'static,
        F: Fn(ChannelEvent) -> E + Send + Sync + 'static,
    {
        let url = socket_url(server)?;
        let (outbound, rx) = mpsc::unbounded_channel();
        tokio::spawn(run(url, rx, tx, wrap));
        Ok(Self { outbound })
    }
}

impl Transport for SocketIoClient {
    fn emit(&self, event: &str, payload: Value) -> Result<(), TransportError> {
        tracing::debug!(event, "emit");
        self.outbound
            .send(socketio::event_frame(event, payload))
            .map_err(|_| TransportError::Closed)
    }
}

/// How one connection ended.
enum Ended {
    /// Dropped by the peer or the network; reconnect.
    Dropped(String),
    /// Every client handle is gone; stop.
    Shutdown,
}

async fn run<E, F>(
    url: Url,
    mut outbound: mpsc::UnboundedReceiver<String>,
    tx: mpsc::UnboundedSender<E>,
    wrap: F,
) where
    F: Fn(ChannelEvent) -> E,
{
    loop {
        // Frames queued while disconnected belong to a dead server session.
        let mut discarded = 0usize;
        while outbound.try_recv().is_ok() {
            discarded += 1;
        }
        if discarded > 0 {
            tracing::warn!(discarded, "dropping frames queued while disconnected");
        }

        tracing::info!(%url, "connecting");
        let ended = match tokio_tungstenite::connect_async(url.as_str()).await {
            Ok((ws, _response)) => drive(ws, &mut outbound, &tx, &wrap).await,
            Err(err) => {
                tracing::warn!(%err, "connect failed");
                Ended::Dropped(err.to_string())
            }
        };

        match ended {
            Ended::Shutdown => {
                tracing::debug!("all client handles dropped; stopping");
                return;
            }
            Ended::Dropped(reason) => {
                tracing::info!(%reason, delay = ?RECONNECT_DELAY, "reconnecting");
            }
        }

        tokio::time::sleep(RECONNECT_DELAY).await;
        if tx.is_closed() {
            return;
        }
    }
}

type Socket = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Runs one connection until it drops. Emits `Disconnected` only if the
/// namespace was joined.
async fn drive<E, F>(
    ws: Socket,
    outbound: &mut mpsc::UnboundedReceiver<String>,
    tx: &mpsc::UnboundedSender<E>,
    wrap: &F,
) -> Ended
where
    F: Fn(ChannelEvent) -> E,
{
    let (mut sink, mut stream) = ws.split();
    let mut joined = false;

    let ended = loop {
        tokio::select! {
            frame = stream.next() => {
                let text = match frame {
                    Some(Ok(Message::Text(text))) => text,
                    Some(Ok(Message::Close(_))) | None => {
                        break Ended::Dropped("connection closed".to_owned());
                    }
                    Some(Ok(_)) => continue,
                    Some(Err(err)) => break Ended::Dropped(err.to_string()),
                };

                let reply = match socketio::decode(&text) {
                    Ok(EnginePacket::Open(handshake)) => {
                        tracing::debug!(
                            sid = %handshake.sid,
                            ping_interval = handshake.ping_interval,
                            "engine open"
                        );
                        Some(socketio::connect_frame())
                    }
                    Ok(EnginePacket::Ping(data)) => {
                        Some(socketio::encode(&EnginePacket::Pong(data)))
                    }
                    Ok(EnginePacket::Close) => {
                        break Ended::Dropped("server closed the connection".to_owned());
                    }
                    Ok(EnginePacket::Message(packet)) => match packet {
                        SocketPacket::Connect { namespace, .. } if namespace == ROOT_NAMESPACE => {
                            joined = true;
                            if tx.send(wrap(ChannelEvent::Connected)).is_err() {
                                break Ended::Shutdown;
                            }
                            None
                        }
                        SocketPacket::Event { namespace, name, data, .. }
                            if namespace == ROOT_NAMESPACE =>
                        {
                            let inbound = ChannelEvent::Inbound { name, payload: data };
                            if tx.send(wrap(inbound)).is_err() {
                                break Ended::Shutdown;
                            }
                            None
                        }
                        SocketPacket::ConnectError { message, .. } => {
                            break Ended::Dropped(format!("connect refused: {message}"));
                        }
                        SocketPacket::Disconnect { .. } => {
                            break Ended::Dropped("server closed the session".to_owned());
                        }
                        other => {
                            tracing::trace!(?other, "ignoring packet");
                            None
                        }
                    },
                    Ok(other) => {
                        tracing::trace!(?other, "ignoring engine packet");
                        None
                    }
                    Err(err) => {
                        tracing::warn!(%err, frame = %text, "skipping malformed frame");
                        None
                    }
                };

                if let Some(reply) = reply {
                    if let Err(err) = sink.send(Message::Text(reply)).await {
                        break Ended::Dropped(err.to_string());
                    }
                }
            }
            frame = outbound.recv(), if joined => {
                let Some(frame) = frame else {
                    let _ = sink.send(Message::Close(None)).await;
                    break Ended::Shutdown;
                };
                if let Err(err) = sink.send(Message::Text(frame)).await {
                    break Ended::Dropped(err.to_string());
                }
            }
        }
    };

    if joined {
        if let Ended::Dropped(reason) = &ended {
            let _ = tx.send(wrap(ChannelEvent::Disconnected { reason: reason.clone() }));
        }
    }
    ended
}
