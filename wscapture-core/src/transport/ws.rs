//! WebSocket transport.
//!
//! A background task owns the socket. The handle returned to the
//! caller only pushes onto an unbounded queue, so sends never block the
//! render tick; the task drains the queue in order and reports
//! everything it sees as [`TransportEvent`]s.
//!
//! Text messages carry control records, binary messages carry frames.
//! Pings from the consumer are answered by tungstenite itself.

use bytes::Bytes;
use futures::{SinkExt, StreamExt};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::mpsc;
use tokio_tungstenite::WebSocketStream;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, warn};

use crate::error::CaptureError;
use crate::transport::{Payload, Transport, TransportEvent};

/// Receiving end of a transport's event stream.
pub type TransportEvents = mpsc::UnboundedReceiver<TransportEvent>;

#[derive(Debug)]
enum Outbound {
    Text(String),
    Binary(Bytes),
    Close,
}

/// Handle to a WebSocket connection driven by a background task.
///
/// Dropping the handle without calling [`close`](Transport::close)
/// still closes the socket gracefully once the queue is drained.
#[derive(Debug)]
pub struct WsTransport {
    tx: mpsc::UnboundedSender<Outbound>,
}

impl WsTransport {
    /// Start connecting to `url` in the background.
    ///
    /// Returns immediately. The first event is either
    /// [`TransportEvent::Open`] or [`TransportEvent::Error`]. Must be
    /// called from within a Tokio runtime.
    pub fn connect(url: impl Into<String>) -> (Self, TransportEvents) {
        let url = url.into();
        let (tx, rx) = mpsc::unbounded_channel();
        let (event_tx, event_rx) = mpsc::unbounded_channel();

        tokio::spawn(async move {
            match tokio_tungstenite::connect_async(url.as_str()).await {
                Ok((ws, _response)) => {
                    debug!(%url, "websocket connected");
                    pump(ws, rx, event_tx).await;
                }
                Err(e) => {
                    warn!(%url, "websocket connect failed: {e}");
                    let _ = event_tx.send(TransportEvent::Error(e.to_string()));
                    let _ = event_tx.send(TransportEvent::Closed);
                }
            }
        });

        (Self { tx }, event_rx)
    }

    /// Wrap an already-established WebSocket stream.
    ///
    /// [`TransportEvent::Open`] is the first event delivered.
    pub fn from_stream<S>(ws: WebSocketStream<S>) -> (Self, TransportEvents)
    where
        S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
    {
        let (tx, rx) = mpsc::unbounded_channel();
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        tokio::spawn(pump(ws, rx, event_tx));
        (Self { tx }, event_rx)
    }
}

impl Transport for WsTransport {
    fn send_text(&mut self, text: String) -> Result<(), CaptureError> {
        Ok(self.tx.send(Outbound::Text(text))?)
    }

    fn send_binary(&mut self, data: Bytes) -> Result<(), CaptureError> {
        Ok(self.tx.send(Outbound::Binary(data))?)
    }

    fn close(&mut self) {
        let _ = self.tx.send(Outbound::Close);
    }
}

/// Drive one connection until the socket is gone.
async fn pump<S>(
    ws: WebSocketStream<S>,
    mut outbound: mpsc::UnboundedReceiver<Outbound>,
    events: mpsc::UnboundedSender<TransportEvent>,
) where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let _ = events.send(TransportEvent::Open);
    let (mut sink, mut stream) = ws.split();
    let mut closing = false;

    loop {
        tokio::select! {
            out = outbound.recv(), if !closing => {
                let msg = match out {
                    Some(Outbound::Text(text)) => Message::text(text),
                    Some(Outbound::Binary(data)) => Message::binary(data),
                    // Handle dropped or explicit close: start the handshake
                    // and keep reading until the peer answers.
                    Some(Outbound::Close) | None => {
                        closing = true;
                        Message::Close(None)
                    }
                };
                if let Err(e) = sink.send(msg).await {
                    let _ = events.send(TransportEvent::Error(e.to_string()));
                    break;
                }
            }
            inbound = stream.next() => match inbound {
                Some(Ok(Message::Text(text))) => {
                    let _ = events.send(TransportEvent::Message(Payload::Text(
                        text.as_str().to_owned(),
                    )));
                }
                Some(Ok(Message::Binary(data))) => {
                    let _ = events.send(TransportEvent::Message(Payload::Binary(data)));
                }
                Some(Ok(Message::Close(frame))) => {
                    debug!(?frame, "peer closed websocket");
                    // Flushes tungstenite's queued close reply.
                    let _ = sink.close().await;
                    break;
                }
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    let _ = events.send(TransportEvent::Error(e.to_string()));
                    break;
                }
                None => break,
            }
        }
    }

    let _ = events.send(TransportEvent::Closed);
}
