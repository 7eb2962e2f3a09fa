//! Domain-specific error types for the capture protocol.
//!
//! All fallible operations return `Result<T, CaptureError>`.
//! Nothing a peer sends can panic the controller; every failure is
//! typed and local to one connection.

use thiserror::Error;

/// The canonical error type for wscapture.
#[derive(Debug, Error)]
pub enum CaptureError {
    // ── Protocol Errors ──────────────────────────────────────────
    /// A control message could not be decoded or failed validation.
    #[error("invalid message: {0}")]
    InvalidMessage(String),

    /// A binary payload arrived where a text control message was expected.
    #[error("expected a text message, got {0} binary bytes")]
    NotText(usize),

    /// The peer acknowledged a frame that was never sent.
    #[error("ack for frame {frame} but only {pos} frames sent")]
    AckOutOfRange { frame: u64, pos: u64 },

    /// A message or request arrived in a connection phase that forbids it.
    #[error("protocol violation: {0}")]
    ProtocolViolation(&'static str),

    // ── Frame Errors ─────────────────────────────────────────────
    /// A pixel buffer does not match the negotiated frame size.
    #[error("invalid frame size: expected {expected} bytes, got {actual}")]
    InvalidFrameSize { expected: usize, actual: usize },

    /// The surface reported different dimensions than negotiated.
    #[error("surface is {actual_width}x{actual_height}, expected {width}x{height}")]
    SizeMismatch {
        width: u32,
        height: u32,
        actual_width: u32,
        actual_height: u32,
    },

    /// The frame source could not produce a frame this tick.
    #[error("capture failed: {0}")]
    Capture(String),

    // ── Connection Errors ────────────────────────────────────────
    /// The WebSocket layer reported an error.
    #[error("transport error: {0}")]
    Transport(String),

    /// The I/O layer reported an error.
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    /// The transport's send queue is gone.
    #[error("channel closed")]
    ChannelClosed,

    /// Catch-all for errors that do not fit another variant.
    #[error("{0}")]
    Other(String),
}

// ── Convenient From implementations ──────────────────────────────

impl From<String> for CaptureError {
    fn from(s: String) -> Self {
        CaptureError::Other(s)
    }
}

impl From<&str> for CaptureError {
    fn from(s: &str) -> Self {
        CaptureError::Other(s.to_string())
    }
}

impl From<serde_json::Error> for CaptureError {
    fn from(e: serde_json::Error) -> Self {
        CaptureError::InvalidMessage(e.to_string())
    }
}

impl From<tokio_tungstenite::tungstenite::Error> for CaptureError {
    fn from(e: tokio_tungstenite::tungstenite::Error) -> Self {
        CaptureError::Transport(e.to_string())
    }
}

impl<T> From<tokio::sync::mpsc::error::SendError<T>> for CaptureError {
    fn from(_: tokio::sync::mpsc::error::SendError<T>) -> Self {
        CaptureError::ChannelClosed
    }
}
