//! Synthetic animated surface.
//!
//! Draws a colour gradient with a bright vertical bar that sweeps
//! across the surface once per second of recording time. Useful for
//! eyeballing dropped or duplicated frames in the consumer's output.

use crate::error::CaptureError;
use crate::protocol::frame_len;
use crate::source::{Frame, FrameSource};

/// Width of the sweeping bar in pixels.
const BAR_WIDTH: u32 = 8;

#[derive(Debug, Clone)]
pub struct TestPattern {
    width: u32,
    height: u32,
    time_ms: f64,
    bottom_up: bool,
}

impl TestPattern {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            time_ms: 0.0,
            bottom_up: false,
        }
    }

    /// Emit rows bottom-first, like a GL framebuffer readback. Pair with
    /// [`BottomUp`](crate::source::BottomUp) to get top-down output.
    pub fn bottom_up(mut self) -> Self {
        self.bottom_up = true;
        self
    }

    /// Set the animation time for the next capture.
    pub fn render(&mut self, time_ms: f64) {
        self.time_ms = time_ms;
    }

    /// Column the bar starts at for the current time.
    pub fn bar_x(&self) -> u32 {
        let phase = (self.time_ms / 1000.0).fract().abs();
        (phase * self.width as f64) as u32 % self.width.max(1)
    }

    fn shade(&self, x: u32, y: u32, bar_x: u32) -> [u8; 4] {
        if x >= bar_x && x < bar_x + BAR_WIDTH {
            return [255, 255, 255, 255];
        }
        let r = (x * 255 / self.width.max(1)) as u8;
        let g = (y * 255 / self.height.max(1)) as u8;
        let b = ((self.time_ms / 20.0) as u64 % 256) as u8;
        [r, g, b, 255]
    }
}

impl FrameSource for TestPattern {
    fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    fn resize(&mut self, width: u32, height: u32) {
        self.width = width;
        self.height = height;
    }

    fn capture(&mut self) -> Result<Frame, CaptureError> {
        if self.width == 0 || self.height == 0 {
            return Err(CaptureError::Capture("surface has zero area".into()));
        }
        let bar_x = self.bar_x();
        let mut data = Vec::with_capacity(frame_len(self.width, self.height));
        for row in 0..self.height {
            let y = if self.bottom_up {
                self.height - 1 - row
            } else {
                row
            };
            for x in 0..self.width {
                data.extend_from_slice(&self.shade(x, y, bar_x));
            }
        }
        Frame::new(self.width, self.height, data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::BottomUp;

    #[test]
    fn capture_has_expected_size() {
        let mut p = TestPattern::new(16, 9);
        let frame = p.capture().unwrap();
        assert_eq!(frame.data.len(), 16 * 9 * 4);
    }

    #[test]
    fn bar_moves_with_time() {
        let mut p = TestPattern::new(100, 10);
        p.render(0.0);
        assert_eq!(p.bar_x(), 0);
        p.render(500.0);
        assert_eq!(p.bar_x(), 50);
        p.render(1500.0);
        assert_eq!(p.bar_x(), 50);
    }

    #[test]
    fn bottom_up_pattern_matches_after_flip() {
        let mut top_down = TestPattern::new(12, 7);
        let mut flipped = BottomUp::new(TestPattern::new(12, 7).bottom_up());
        top_down.render(250.0);
        flipped.inner_mut().render(250.0);
        assert_eq!(top_down.capture().unwrap(), flipped.capture().unwrap());
    }

    #[test]
    fn zero_area_capture_fails() {
        let mut p = TestPattern::new(0, 10);
        assert!(matches!(p.capture(), Err(CaptureError::Capture(_))));
    }
}
