//! Message transport to the consumer.
//!
//! The controller only needs a non-blocking send side; inbound traffic
//! and lifecycle changes arrive as [`TransportEvent`]s that the driver
//! feeds back into the controller on the same task.
//!
//! | Module | Purpose                                  |
//! |--------|------------------------------------------|
//! | `ws`   | WebSocket transport on `tokio-tungstenite` |

pub mod ws;

pub use ws::WsTransport;

use bytes::Bytes;

use crate::error::CaptureError;

/// One message as delivered by the transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Payload {
    Text(String),
    Binary(Bytes),
}

impl Payload {
    pub fn len(&self) -> usize {
        match self {
            Payload::Text(text) => text.len(),
            Payload::Binary(data) => data.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Lifecycle and inbound traffic of a transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    /// The connection is established.
    Open,
    /// A message arrived from the peer.
    Message(Payload),
    /// The connection failed.
    Error(String),
    /// The connection is gone, after a close handshake or otherwise.
    Closed,
}

/// Send side of an ordered, reliable, bidirectional message channel.
///
/// Sends never wait on the network: implementations queue the message
/// and return. An `Err` means the channel is already unusable.
pub trait Transport {
    fn send_text(&mut self, text: String) -> Result<(), CaptureError>;

    fn send_binary(&mut self, data: Bytes) -> Result<(), CaptureError>;

    /// Start a graceful close. Completion is reported as
    /// [`TransportEvent::Closed`].
    fn close(&mut self);
}

impl<T: Transport + ?Sized> Transport for Box<T> {
    fn send_text(&mut self, text: String) -> Result<(), CaptureError> {
        (**self).send_text(text)
    }

    fn send_binary(&mut self, data: Bytes) -> Result<(), CaptureError> {
        (**self).send_binary(data)
    }

    fn close(&mut self) {
        (**self).close()
    }
}
