//! Recording session state and the flow-control window.
//!
//! A session holds the parameters negotiated by the peer's `start`
//! message plus two counters: `pos` (frames sent) and `acked` (highest
//! frame the peer has confirmed). The gap between them is the window
//! of in-flight frames, capped by [`MAX_OUTSTANDING`].

use crate::error::CaptureError;
use crate::protocol::StartParams;

/// Default cap on sent-but-unacknowledged frames.
pub const MAX_OUTSTANDING: u64 = 10;

/// Result of applying a peer acknowledgement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AckOutcome {
    /// `acked` moved forward (or stayed put on a repeat of the same index).
    Advanced,
    /// The ack was older than what the peer already confirmed; ignored.
    Stale,
}

/// One negotiated recording run.
///
/// Invariant: `acked <= pos` at all times. Counters start at zero for
/// every new session.
#[derive(Debug, Clone)]
pub struct RecordingSession {
    params: StartParams,
    /// Frames sent so far.
    pos: u64,
    /// Highest frame index acknowledged by the peer.
    acked: u64,
    /// Set by `begin_frame`, consumed by the `end_frame` of the same tick.
    ready: bool,
}

impl RecordingSession {
    pub fn new(params: StartParams) -> Self {
        Self {
            params,
            pos: 0,
            acked: 0,
            ready: false,
        }
    }

    // ── Negotiated parameters ─────────────────────────────────────

    pub fn params(&self) -> &StartParams {
        &self.params
    }

    pub fn width(&self) -> u32 {
        self.params.width
    }

    pub fn height(&self) -> u32 {
        self.params.height
    }

    pub fn framerate(&self) -> f64 {
        self.params.framerate
    }

    /// Total frames to capture, or `None` for an unbounded session.
    pub fn limit(&self) -> Option<u64> {
        self.params.limit()
    }

    // ── Counters ──────────────────────────────────────────────────

    pub fn pos(&self) -> u64 {
        self.pos
    }

    pub fn acked(&self) -> u64 {
        self.acked
    }

    /// Frames sent but not yet acknowledged.
    pub fn outstanding(&self) -> u64 {
        self.pos - self.acked
    }

    /// Whether another frame may be put in flight.
    pub fn window_open(&self, max_outstanding: u64) -> bool {
        self.outstanding() <= max_outstanding
    }

    /// Count one transmitted frame and return the new `pos`.
    pub fn record_sent(&mut self) -> u64 {
        self.pos += 1;
        self.pos
    }

    /// Whether a bounded session has sent all of its frames.
    pub fn is_complete(&self) -> bool {
        self.limit().is_some_and(|limit| self.pos >= limit)
    }

    /// Apply an `ack` from the peer.
    ///
    /// `acked` is set to `frame`, never incremented. An index beyond
    /// `pos` acknowledges frames that were never sent and is rejected;
    /// an index below the current `acked` is a stale duplicate.
    pub fn acknowledge(&mut self, frame: u64) -> Result<AckOutcome, CaptureError> {
        if frame > self.pos {
            return Err(CaptureError::AckOutOfRange {
                frame,
                pos: self.pos,
            });
        }
        if frame < self.acked {
            return Ok(AckOutcome::Stale);
        }
        self.acked = frame;
        Ok(AckOutcome::Advanced)
    }

    // ── Per-tick flag ─────────────────────────────────────────────

    pub fn is_ready(&self) -> bool {
        self.ready
    }

    pub fn set_ready(&mut self, ready: bool) {
        self.ready = ready;
    }

    /// Consume the ready flag, leaving it cleared.
    pub fn take_ready(&mut self) -> bool {
        std::mem::take(&mut self.ready)
    }

    // ── Virtual clock ─────────────────────────────────────────────

    /// Recording time derived from frames sent, in milliseconds.
    pub fn current_time_ms(&self) -> f64 {
        1000.0 * self.pos as f64 / self.params.framerate
    }
}

// ── Tests ────────────────────────────────────────────────────────
