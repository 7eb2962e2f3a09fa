//! Per-tick capture orchestration.
//!
//! A [`CaptureController`] owns one connection to a consumer, the
//! active [`RecordingSession`] (if any) and the surface it captures
//! from. It is driven from a single task:
//!
//! 1. [`begin_frame`](CaptureController::begin_frame) before rendering
//!    decides whether this tick renders at all.
//! 2. The caller renders, using
//!    [`current_time_ms`](CaptureController::current_time_ms) as its clock.
//! 3. [`end_frame`](CaptureController::end_frame) captures and sends.
//!
//! Transport events are fed in through
//! [`handle_event`](CaptureController::handle_event) between ticks.
//! Nothing here waits on I/O.

use std::time::{Duration, Instant};

use tracing::{debug, error, info, trace, warn};

use crate::error::CaptureError;
use crate::meter::ThroughputMeter;
use crate::protocol::{self, ControlMessage, StartParams, decode_control};
use crate::source::FrameSource;
use crate::state::{AckOutcome, ConnectionPhase, MAX_OUTSTANDING, RecordingSession};
use crate::transport::{Payload, Transport, TransportEvent};

// ── ControllerConfig ─────────────────────────────────────────────

/// Configuration for [`CaptureController`].
#[derive(Debug, Clone)]
pub struct ControllerConfig {
    /// Capture pauses while more than this many frames are unacknowledged.
    pub max_outstanding: u64,
    /// Minimum time between progress log lines.
    pub progress_interval: Duration,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            max_outstanding: MAX_OUTSTANDING,
            progress_interval: Duration::from_secs(1),
        }
    }
}

// ── CaptureController ────────────────────────────────────────────

/// Streams frames from one surface to one consumer.
pub struct CaptureController<S, T> {
    config: ControllerConfig,
    source: Option<S>,
    transport: Option<T>,
    phase: ConnectionPhase,
    session: Option<RecordingSession>,
    meter: ThroughputMeter,
    last_progress: Option<Instant>,
}

impl<S: FrameSource, T: Transport> CaptureController<S, T> {
    pub fn new(config: ControllerConfig) -> Self {
        Self {
            config,
            source: None,
            transport: None,
            phase: ConnectionPhase::default(),
            session: None,
            meter: ThroughputMeter::new(),
            last_progress: None,
        }
    }

    pub fn config(&self) -> &ControllerConfig {
        &self.config
    }

    // ── Surface ──────────────────────────────────────────────────

    /// Install (or remove, with `None`) the surface to capture from.
    ///
    /// Returns the previously installed source.
    pub fn set_source(&mut self, source: Option<S>) -> Option<S> {
        std::mem::replace(&mut self.source, source)
    }

    pub fn source(&self) -> Option<&S> {
        self.source.as_ref()
    }

    pub fn source_mut(&mut self) -> Option<&mut S> {
        self.source.as_mut()
    }

    // ── State ────────────────────────────────────────────────────

    pub fn phase(&self) -> &ConnectionPhase {
        &self.phase
    }

    pub fn session(&self) -> Option<&RecordingSession> {
        self.session.as_ref()
    }

    /// Whether a transport is attached, in any phase.
    pub fn is_connected(&self) -> bool {
        self.transport.is_some()
    }

    pub fn is_recording(&self) -> bool {
        self.session.is_some()
    }

    // ── Local requests ───────────────────────────────────────────

    /// Hand over a transport that is being opened.
    ///
    /// Only valid while disconnected; otherwise the transport is
    /// dropped and an error returned.
    pub fn start_recording(&mut self, transport: T) -> Result<(), CaptureError> {
        self.phase.begin_connect()?;
        info!("connecting to consumer");
        self.transport = Some(transport);
        Ok(())
    }

    /// Stop recording.
    ///
    /// With an active session the end-of-stream marker is sent and the
    /// connection waits in `Closing` for the peer to hang up. Without
    /// one the transport is closed straight away.
    pub fn stop_recording(&mut self) {
        if self.phase.is_disconnected() || self.phase.is_closing() {
            return;
        }
        if self.phase.is_open() && self.session.is_some() {
            self.finish_session();
        } else {
            info!(phase = %self.phase, "closing connection without a session");
            self.reset();
        }
    }

    // ── Transport events ─────────────────────────────────────────

    /// Apply one event from the currently attached transport.
    pub fn handle_event(&mut self, event: TransportEvent) {
        match event {
            TransportEvent::Open => match self.phase.open() {
                Ok(()) => info!("websocket open"),
                Err(e) => debug!(phase = %self.phase, "ignoring open event: {e}"),
            },
            TransportEvent::Message(payload) => self.handle_message(payload),
            TransportEvent::Error(err) => {
                if self.phase.is_disconnected() {
                    debug!("ignoring error for detached transport: {err}");
                    return;
                }
                error!(phase = %self.phase, "websocket error: {err}");
                self.reset();
            }
            TransportEvent::Closed => {
                if self.phase.is_disconnected() {
                    return;
                }
                if let Some(session) = &self.session {
                    warn!(pos = session.pos(), "socket closed mid-recording");
                } else {
                    info!("socket closed");
                }
                self.transport = None;
                self.session = None;
                self.phase.force_disconnect();
            }
        }
    }

    fn handle_message(&mut self, payload: Payload) {
        if !self.phase.accepts_messages() {
            debug!(phase = %self.phase, "ignoring message outside an open connection");
            return;
        }
        let result = decode_control(&payload).and_then(|msg| self.apply(msg));
        if let Err(e) = result {
            error!(len = payload.len(), "bad message from consumer: {e}");
            self.reset();
        }
    }

    fn apply(&mut self, msg: ControlMessage) -> Result<(), CaptureError> {
        match msg {
            ControlMessage::Start(params) => {
                self.handle_start(params);
                Ok(())
            }
            ControlMessage::Ack { frame } => self.handle_ack(frame),
        }
    }

    fn handle_start(&mut self, params: StartParams) {
        if self.phase.is_closing() {
            debug!("ignoring start while closing");
            return;
        }
        if let Some(session) = &self.session {
            warn!(
                pos = session.pos(),
                "ignoring start: a session is already active"
            );
            return;
        }
        info!(
            width = params.width,
            height = params.height,
            framerate = params.framerate,
            length = params.length,
            "recording started"
        );
        self.session = Some(RecordingSession::new(params));
        self.meter.reset();
        self.last_progress = None;
    }

    fn handle_ack(&mut self, frame: u64) -> Result<(), CaptureError> {
        if self.phase.is_closing() {
            debug!(frame, "ignoring ack while closing");
            return Ok(());
        }
        let Some(session) = self.session.as_mut() else {
            debug!(frame, "ignoring ack without a session");
            return Ok(());
        };
        if session.acknowledge(frame)? == AckOutcome::Stale {
            debug!(frame, acked = session.acked(), "ignoring stale ack");
        }
        Ok(())
    }

    // ── Per-tick decisions ───────────────────────────────────────

    /// Recording clock in milliseconds.
    ///
    /// Wall-clock time passes through untouched unless a session is
    /// active, in which case time advances by exactly one frame
    /// interval per frame sent.
    pub fn current_time_ms(&self, wall_clock_ms: f64) -> f64 {
        match &self.session {
            Some(session) => session.current_time_ms(),
            None => wall_clock_ms,
        }
    }

    /// Call before rendering. Returns `true` if this tick should render.
    ///
    /// Without a session, rendering runs freely only when nothing is
    /// connected. With a session, `true` also arms the following
    /// [`end_frame`](Self::end_frame) to capture.
    pub fn begin_frame(&mut self) -> bool {
        let Some(session) = self.session.as_mut() else {
            return self.transport.is_none();
        };
        session.set_ready(false);
        let Some(source) = self.source.as_mut() else {
            warn!("no frame source installed; skipping frame");
            return false;
        };

        let (width, height) = (session.width(), session.height());
        let (actual_width, actual_height) = source.size();
        if (actual_width, actual_height) != (width, height) {
            info!("resizing surface from {actual_width}x{actual_height} to {width}x{height}");
            source.resize(width, height);
            return false;
        }

        if !session.window_open(self.config.max_outstanding) {
            trace!(
                pos = session.pos(),
                acked = session.acked(),
                "window full; waiting for acks"
            );
            return false;
        }

        session.set_ready(true);
        true
    }

    /// Call after rendering. Captures and sends the frame if the
    /// preceding [`begin_frame`](Self::begin_frame) said so.
    pub fn end_frame(&mut self) {
        let Some(session) = self.session.as_mut() else {
            return;
        };
        if !session.take_ready() {
            return;
        }
        let Some(source) = self.source.as_mut() else {
            return;
        };

        let frame = match source.capture() {
            Ok(frame) => frame,
            Err(e) => {
                warn!("capture failed; skipping frame: {e}");
                return;
            }
        };
        let data = match protocol::encode_frame(frame, session.params()) {
            Ok(data) => data,
            Err(e) => {
                warn!("discarding captured frame: {e}");
                return;
            }
        };
        let Some(transport) = self.transport.as_mut() else {
            return;
        };

        let len = data.len() as u64;
        if let Err(e) = transport.send_binary(data) {
            error!("failed to send frame: {e}");
            self.reset();
            return;
        }

        let pos = session.record_sent();
        let limit = session.limit();
        let complete = session.is_complete();
        self.meter.record(len);
        self.report_progress(pos, limit);

        if complete {
            info!(pos, "all frames sent");
            self.finish_session();
        }
    }

    // ── Internal ─────────────────────────────────────────────────

    /// Send the end-of-stream marker and wait in `Closing` for the
    /// peer to complete the close handshake.
    fn finish_session(&mut self) {
        let Some(session) = self.session.take() else {
            return;
        };
        info!(
            frames = session.pos(),
            acked = session.acked(),
            "stopping recording"
        );
        let sent = match self.transport.as_mut() {
            Some(transport) => transport.send_binary(protocol::stop_payload()),
            None => Err(CaptureError::ChannelClosed),
        };
        if let Err(e) = sent.and_then(|()| self.phase.begin_close()) {
            error!("failed to stop cleanly: {e}");
            self.reset();
        }
    }

    /// Drop the connection immediately: close the transport, forget
    /// the session, back to `Disconnected`.
    fn reset(&mut self) {
        if let Some(mut transport) = self.transport.take() {
            transport.close();
        }
        self.session = None;
        self.phase.force_disconnect();
    }

    fn report_progress(&mut self, pos: u64, limit: Option<u64>) {
        let now = Instant::now();
        if self
            .last_progress
            .is_some_and(|last| now.duration_since(last) < self.config.progress_interval)
        {
            return;
        }
        self.last_progress = Some(now);

        let fps = self.meter.frames_per_sec();
        let kib_per_sec = self.meter.bytes_per_sec() / 1024;
        match limit {
            Some(total) if total > 0 => info!(
                "frame {pos}/{total} [{:.1}%] ({fps:.2} FPS, {kib_per_sec} KiB/s)",
                100.0 * pos as f64 / total as f64
            ),
            _ => info!("frame {pos} ({fps:.2} FPS, {kib_per_sec} KiB/s)"),
        }
    }
}

impl<S: FrameSource, T: Transport> Default for CaptureController<S, T> {
    fn default() -> Self {
        Self::new(ControllerConfig::default())
    }
}

// ── Tests ────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use bytes::Bytes;

    use super::*;
    use crate::source::Frame;

    #[derive(Debug, Clone, PartialEq)]
    enum Sent {
        Binary(usize),
        Close,
    }

    #[derive(Clone, Default)]
    struct FakeTransport {
        log: Rc<RefCell<Vec<Sent>>>,
    }

    impl Transport for FakeTransport {
        fn send_text(&mut self, _text: String) -> Result<(), CaptureError> {
            Ok(())
        }

        fn send_binary(&mut self, data: Bytes) -> Result<(), CaptureError> {
            self.log.borrow_mut().push(Sent::Binary(data.len()));
            Ok(())
        }

        fn close(&mut self) {
            self.log.borrow_mut().push(Sent::Close);
        }
    }

    struct FakeSource {
        width: u32,
        height: u32,
    }

    impl FrameSource for FakeSource {
        fn size(&self) -> (u32, u32) {
            (self.width, self.height)
        }

        fn resize(&mut self, width: u32, height: u32) {
            self.width = width;
            self.height = height;
        }

        fn capture(&mut self) -> Result<Frame, CaptureError> {
            Ok(Frame::blank(self.width, self.height))
        }
    }

    fn text(s: &str) -> TransportEvent {
        TransportEvent::Message(Payload::Text(s.to_string()))
    }

    fn open_controller() -> (CaptureController<FakeSource, FakeTransport>, FakeTransport) {
        let mut c = CaptureController::default();
        c.set_source(Some(FakeSource {
            width: 2,
            height: 2,
        }));
        let transport = FakeTransport::default();
        c.start_recording(transport.clone()).unwrap();
        c.handle_event(TransportEvent::Open);
        (c, transport)
    }

    #[test]
    fn free_running_without_connection() {
        let mut c: CaptureController<FakeSource, FakeTransport> = CaptureController::default();
        assert!(c.begin_frame());
        c.end_frame();
        assert_eq!(c.current_time_ms(1234.5), 1234.5);
    }

    #[test]
    fn connected_without_session_suppresses_rendering() {
        let (mut c, _t) = open_controller();
        assert!(!c.begin_frame());
    }

    #[test]
    fn second_start_recording_is_rejected() {
        let (mut c, _t) = open_controller();
        assert!(c.start_recording(FakeTransport::default()).is_err());
        assert!(c.phase().is_open());
    }

    #[test]
    fn start_then_frame_is_sent() {
        let (mut c, t) = open_controller();
        c.handle_event(text(
            r#"{"type":"start","width":2,"height":2,"framerate":30,"length":-1}"#,
        ));
        assert!(c.begin_frame());
        c.end_frame();
        assert_eq!(*t.log.borrow(), vec![Sent::Binary(16)]);
        assert_eq!(c.session().unwrap().pos(), 1);
    }

    #[test]
    fn end_frame_without_begin_is_noop() {
        let (mut c, t) = open_controller();
        c.handle_event(text(
            r#"{"type":"start","width":2,"height":2,"framerate":30,"length":-1}"#,
        ));
        c.end_frame();
        assert!(t.log.borrow().is_empty());

        assert!(c.begin_frame());
        c.end_frame();
        c.end_frame();
        assert_eq!(t.log.borrow().len(), 1);
    }

    #[test]
    fn missing_source_skips_tick() {
        let (mut c, t) = open_controller();
        c.set_source(None);
        c.handle_event(text(
            r#"{"type":"start","width":2,"height":2,"framerate":30,"length":-1}"#,
        ));
        assert!(!c.begin_frame());
        c.end_frame();
        assert!(t.log.borrow().is_empty());
        assert_eq!(c.session().unwrap().pos(), 0);
    }

    #[test]
    fn zero_length_session_sends_one_frame() {
        let (mut c, t) = open_controller();
        c.handle_event(text(
            r#"{"type":"start","width":2,"height":2,"framerate":30,"length":0}"#,
        ));
        assert!(c.begin_frame());
        c.end_frame();
        assert_eq!(*t.log.borrow(), vec![Sent::Binary(16), Sent::Binary(0)]);
        assert!(c.phase().is_closing());
        assert!(!c.begin_frame());
    }

    #[test]
    fn stop_without_session_closes_immediately() {
        let (mut c, t) = open_controller();
        c.stop_recording();
        assert!(c.phase().is_disconnected());
        assert_eq!(*t.log.borrow(), vec![Sent::Close]);
        assert!(c.begin_frame());
    }

    #[test]
    fn stop_with_session_sends_marker_and_waits_for_close() {
        let (mut c, t) = open_controller();
        c.handle_event(text(
            r#"{"type":"start","width":2,"height":2,"framerate":30,"length":-1}"#,
        ));
        c.stop_recording();
        assert!(c.phase().is_closing());
        assert!(!c.is_recording());
        assert_eq!(*t.log.borrow(), vec![Sent::Binary(0)]);

        // A second stop while closing does nothing.
        c.stop_recording();
        assert_eq!(t.log.borrow().len(), 1);

        c.handle_event(TransportEvent::Closed);
        assert!(c.phase().is_disconnected());
        assert!(!c.is_connected());
    }

    #[test]
    fn transport_error_resets() {
        let (mut c, t) = open_controller();
        c.handle_event(text(
            r#"{"type":"start","width":2,"height":2,"framerate":30,"length":-1}"#,
        ));
        c.handle_event(TransportEvent::Error("connection reset".into()));
        assert!(c.phase().is_disconnected());
        assert!(!c.is_recording());
        assert_eq!(*t.log.borrow(), vec![Sent::Close]);
    }

    #[test]
    fn messages_before_open_are_ignored() {
        let mut c: CaptureController<FakeSource, FakeTransport> = CaptureController::default();
        c.start_recording(FakeTransport::default()).unwrap();
        c.handle_event(text("garbage"));
        assert_eq!(*c.phase(), ConnectionPhase::Connecting);
        c.handle_event(text(
            r#"{"type":"start","width":2,"height":2,"framerate":30,"length":-1}"#,
        ));
        assert!(!c.is_recording());
    }
}
