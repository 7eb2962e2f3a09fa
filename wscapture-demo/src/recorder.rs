//! Demo recorder: a render loop feeding one capture controller.
//!
//! A single task owns the controller. Each iteration of the loop
//! handles either one scheduler tick (begin / render / end) or one
//! transport event, so the two never interleave mid-operation.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use tokio::time::MissedTickBehavior;
use tracing::info;
use wscapture_core::{CaptureController, CaptureError, TransportEvent, WsTransport};

use crate::config::DemoConfig;
use crate::source::DemoSource;

// ── Recorder ─────────────────────────────────────────────────────

/// Connects to the consumer and streams the test pattern until the
/// consumer hangs up or the recorder is stopped.
pub struct Recorder {
    config: DemoConfig,
    running: Arc<AtomicBool>,
}

impl Recorder {
    pub fn new(config: DemoConfig) -> Self {
        Self {
            config,
            running: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Obtain a handle that can be used to stop the recorder from
    /// another task (e.g. a Ctrl-C handler).
    pub fn stop_handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.running)
    }

    /// Signal the recorder to stop.
    pub fn stop(&self) {
        self.running.store(false, Ordering::SeqCst);
    }

    /// Whether the recorder is running.
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Run one recording connection to completion.
    ///
    /// Clearing the stop handle requests a graceful stop: the
    /// end-of-stream marker is sent and the loop waits for the
    /// consumer to close.
    pub async fn run(&self) -> Result<(), CaptureError> {
        self.running.store(true, Ordering::SeqCst);

        let mut controller: CaptureController<DemoSource, WsTransport> =
            CaptureController::new(self.config.to_controller_config());
        controller.set_source(Some(DemoSource::from_config(&self.config.capture)));

        let url = self.config.network.url.clone();
        let (transport, mut events) = WsTransport::connect(url.clone());
        controller.start_recording(transport)?;
        info!(%url, "recording requested");

        let mut ticker = tokio::time::interval(Duration::from_secs_f64(1.0 / self.config.tick_hz()));
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let started = Instant::now();
        let mut stop_requested = false;

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    if !stop_requested && !self.is_running() {
                        stop_requested = true;
                        controller.stop_recording();
                    }
                    let wall_ms = started.elapsed().as_secs_f64() * 1000.0;
                    if controller.begin_frame() {
                        let time_ms = controller.current_time_ms(wall_ms);
                        if let Some(source) = controller.source_mut() {
                            source.render(time_ms);
                        }
                        controller.end_frame();
                    }
                }
                event = events.recv() => match event {
                    Some(event) => controller.handle_event(event),
                    // Transport task gone without a close event.
                    None => controller.handle_event(TransportEvent::Closed),
                },
            }
            if controller.phase().is_disconnected() {
                break;
            }
        }

        self.running.store(false, Ordering::SeqCst);
        info!("recorder stopped");
        Ok(())
    }
}

// ── Tests ────────────────────────────────────────────────────────
