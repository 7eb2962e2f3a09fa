//! Throughput meter for progress reporting.
//!
//! Tracks frames and bytes sent over a rolling window and derives the
//! current frame rate and byte rate. The controller logs these with
//! its periodic progress line.

use std::collections::VecDeque;
use std::time::{Duration, Instant};

/// Rolling-window frame/byte rate meter.
///
/// Records `(timestamp, bytes)` samples, one per transmitted frame,
/// and computes averages over the most recent `window` duration.
#[derive(Debug, Clone)]
pub struct ThroughputMeter {
    /// Samples: `(when, bytes)`.
    samples: VecDeque<(Instant, u64)>,
    /// Window duration.
    window: Duration,
    /// Running total of bytes in the window.
    total_bytes: u64,
}

impl ThroughputMeter {
    /// Create a meter with a 1-second rolling window.
    pub fn new() -> Self {
        Self::with_window(Duration::from_secs(1))
    }

    /// Create a meter with a custom window duration.
    pub fn with_window(window: Duration) -> Self {
        Self {
            samples: VecDeque::with_capacity(128),
            window,
            total_bytes: 0,
        }
    }

    /// Record one frame of `bytes` sent at the current instant.
    pub fn record(&mut self, bytes: u64) {
        self.record_at(Instant::now(), bytes);
    }

    /// Record with an explicit timestamp (useful for testing).
    pub fn record_at(&mut self, when: Instant, bytes: u64) {
        self.samples.push_back((when, bytes));
        self.total_bytes += bytes;
        self.evict(when);
    }

    /// Forget all samples.
    pub fn reset(&mut self) {
        self.samples.clear();
        self.total_bytes = 0;
    }

    /// Frames per second over the rolling window.
    pub fn frames_per_sec(&self) -> f64 {
        match self.span() {
            Some(secs) => self.samples.len() as f64 / secs,
            None => 0.0,
        }
    }

    /// Bytes per second over the rolling window.
    pub fn bytes_per_sec(&self) -> u64 {
        match self.span() {
            Some(secs) => (self.total_bytes as f64 / secs) as u64,
            None => 0,
        }
    }

    /// Number of samples currently in the window.
    pub fn sample_count(&self) -> usize {
        self.samples.len()
    }

    // ── Internal ─────────────────────────────────────────────────

    /// Seconds between the oldest and newest sample, at least 1 ms.
    fn span(&self) -> Option<f64> {
        let (first, _) = self.samples.front()?;
        let (last, _) = self.samples.back()?;
        let d = last.duration_since(*first);
        Some(d.max(Duration::from_millis(1)).as_secs_f64())
    }

    fn evict(&mut self, now: Instant) {
        while let Some(&(ts, bytes)) = self.samples.front() {
            if now.duration_since(ts) > self.window {
                self.samples.pop_front();
                self.total_bytes = self.total_bytes.saturating_sub(bytes);
            } else {
                break;
            }
        }
    }
}

impl Default for ThroughputMeter {
    fn default() -> Self {
        Self::new()
    }
}

// ── Tests ────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_meter_returns_zero() {
        let m = ThroughputMeter::new();
        assert_eq!(m.bytes_per_sec(), 0);
        assert_eq!(m.frames_per_sec(), 0.0);
    }

    #[test]
    fn rates_over_one_second() {
        let mut m = ThroughputMeter::with_window(Duration::from_secs(5));
        let t0 = Instant::now();
        for i in 0..=10 {
            m.record_at(t0 + Duration::from_millis(100 * i), 1000);
        }
        // 11 frames over 1 s.
        let fps = m.frames_per_sec();
        assert!((10.9..=11.1).contains(&fps), "fps = {fps}");
        assert_eq!(m.bytes_per_sec(), 11_000);
    }

    #[test]
    fn evicts_old_samples() {
        let mut m = ThroughputMeter::with_window(Duration::from_millis(500));
        let t0 = Instant::now();
        m.record_at(t0, 1000);
        m.record_at(t0 + Duration::from_secs(1), 500);
        assert_eq!(m.sample_count(), 1);
    }

    #[test]
    fn reset_clears_samples() {
        let mut m = ThroughputMeter::new();
        m.record(10);
        m.reset();
        assert_eq!(m.sample_count(), 0);
        assert_eq!(m.bytes_per_sec(), 0);
    }
}
