//! Connection state machine for a capture controller.
//!
//! Provides a `ConnectionPhase` enum that models the lifecycle of the
//! single peer connection a controller owns, with validated
//! transitions that return `Result` instead of panicking.

use std::time::Instant;

use crate::error::CaptureError;

// ── ConnectionPhase ──────────────────────────────────────────────

/// The current phase of the connection to the consumer.
///
/// ```text
///  Disconnected ──► Connecting ──► Open ──► Closing
///       ▲                │           │         │
///       │                ▼           ▼         ▼
///       └────────────────┴───────────┴─────────┘
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ConnectionPhase {
    /// No transport. Initial / terminal state.
    #[default]
    Disconnected,

    /// Transport handed over, waiting for its open event.
    Connecting,

    /// Transport is open; control messages are honoured.
    Open {
        /// When the connection entered the `Open` state.
        since: Instant,
    },

    /// Stop payload sent; waiting for the peer to finish the close
    /// handshake. No session may start and no ack is honoured.
    Closing,
}

impl std::fmt::Display for ConnectionPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Disconnected => write!(f, "Disconnected"),
            Self::Connecting => write!(f, "Connecting"),
            Self::Open { .. } => write!(f, "Open"),
            Self::Closing => write!(f, "Closing"),
        }
    }
}

impl ConnectionPhase {
    /// Returns `true` when the connection is open and not shutting down.
    pub fn is_open(&self) -> bool {
        matches!(self, Self::Open { .. })
    }

    /// Returns `true` while a graceful shutdown is in flight.
    pub fn is_closing(&self) -> bool {
        matches!(self, Self::Closing)
    }

    /// Returns `true` when there is no transport at all.
    pub fn is_disconnected(&self) -> bool {
        matches!(self, Self::Disconnected)
    }

    /// Whether inbound control messages should be decoded at all.
    ///
    /// Messages arriving before the open event, or after teardown,
    /// are dropped without inspection.
    pub fn accepts_messages(&self) -> bool {
        matches!(self, Self::Open { .. } | Self::Closing)
    }

    /// How long the connection has been open.
    ///
    /// Returns `None` for any other phase.
    pub fn open_duration(&self) -> Option<std::time::Duration> {
        match self {
            Self::Open { since } => Some(since.elapsed()),
            _ => None,
        }
    }

    // ── Transitions ──────────────────────────────────────────────

    /// Transition to `Connecting`.
    ///
    /// Valid from: `Disconnected`.
    pub fn begin_connect(&mut self) -> Result<(), CaptureError> {
        match self {
            Self::Disconnected => {
                *self = Self::Connecting;
                Ok(())
            }
            _ => Err(CaptureError::ProtocolViolation(
                "cannot connect: not in Disconnected state",
            )),
        }
    }

    /// Transition to `Open`.
    ///
    /// Valid from: `Connecting`.
    pub fn open(&mut self) -> Result<(), CaptureError> {
        match self {
            Self::Connecting => {
                *self = Self::Open {
                    since: Instant::now(),
                };
                Ok(())
            }
            _ => Err(CaptureError::ProtocolViolation(
                "cannot open: not in Connecting state",
            )),
        }
    }

    /// Transition to `Closing`.
    ///
    /// Valid from: `Open`.
    pub fn begin_close(&mut self) -> Result<(), CaptureError> {
        match self {
            Self::Open { .. } => {
                *self = Self::Closing;
                Ok(())
            }
            _ => Err(CaptureError::ProtocolViolation(
                "cannot close: not in Open state",
            )),
        }
    }

    /// Force-reset to `Disconnected` regardless of current state.
    ///
    /// Used for the close event, transport errors and malformed peer
    /// messages alike.
    pub fn force_disconnect(&mut self) {
        *self = Self::Disconnected;
    }
}

// ── Tests ────────────────────────────────────────────────────────
