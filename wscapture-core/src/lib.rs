//! # wscapture-core
//!
//! Streams rendered frames from a live surface to a remote consumer
//! over a WebSocket, with window-based backpressure.
//!
//! This crate contains:
//! - **Protocol**: `ControlMessage` (`start` / `ack` JSON records) and the
//!   binary frame / end-of-stream payloads
//! - **State**: `ConnectionPhase` state machine and `RecordingSession`
//!   with its flow-control window
//! - **Source**: the `FrameSource` surface contract, the `BottomUp`
//!   row-order adapter and a synthetic `TestPattern`
//! - **Transport**: the `Transport` send contract, `TransportEvent`s and
//!   the `tokio-tungstenite` backed `WsTransport`
//! - **Controller**: `CaptureController`, the per-tick orchestrator
//! - **Error**: `CaptureError`, a typed, `thiserror`-based error hierarchy

pub mod controller;
pub mod error;
pub mod meter;
pub mod protocol;
pub mod source;
pub mod state;
pub mod transport;

// ── Re-exports for ergonomic usage ───────────────────────────────

pub use controller::{CaptureController, ControllerConfig};
pub use error::CaptureError;
pub use meter::ThroughputMeter;
pub use protocol::{BYTES_PER_PIXEL, ControlMessage, DataRecord, MAX_DIMENSION, StartParams};
pub use source::{BottomUp, Frame, FrameSource, TestPattern};
pub use state::{AckOutcome, ConnectionPhase, MAX_OUTSTANDING, RecordingSession};
pub use transport::{Payload, Transport, TransportEvent, WsTransport};
pub use transport::ws::TransportEvents;
