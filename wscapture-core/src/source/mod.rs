//! Frame sources: the surfaces the controller captures from.
//!
//! These are **local** pixel buffers, distinct from the binary wire
//! payloads built by [`crate::protocol::encode_frame`]. Every source
//! hands the controller top-down RGBA8 rows; surfaces that rasterise
//! bottom-up are wrapped in [`BottomUp`].

mod pattern;

pub use pattern::TestPattern;

use crate::error::CaptureError;
use crate::protocol::{BYTES_PER_PIXEL, frame_len};

// ── Frame ────────────────────────────────────────────────────────

/// A raw RGBA8 frame with tightly packed rows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    /// Frame width in pixels.
    pub width: u32,
    /// Frame height in pixels.
    pub height: u32,
    /// `width * height * 4` bytes, row after row.
    pub data: Vec<u8>,
}

impl Frame {
    /// Wrap a pixel buffer, checking its length against the dimensions.
    pub fn new(width: u32, height: u32, data: Vec<u8>) -> Result<Self, CaptureError> {
        let frame = Self {
            width,
            height,
            data,
        };
        frame.check_len()?;
        Ok(frame)
    }

    /// Check that `data` holds exactly `width * height` pixels.
    pub fn check_len(&self) -> Result<(), CaptureError> {
        let expected = frame_len(self.width, self.height);
        if self.data.len() != expected {
            return Err(CaptureError::InvalidFrameSize {
                expected,
                actual: self.data.len(),
            });
        }
        Ok(())
    }

    /// A fully transparent black frame.
    pub fn blank(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            data: vec![0; frame_len(width, height)],
        }
    }

    /// Bytes in one row.
    pub fn stride(&self) -> usize {
        self.width as usize * BYTES_PER_PIXEL
    }

    /// Returns a row slice.
    pub fn row(&self, y: u32) -> &[u8] {
        let start = y as usize * self.stride();
        &self.data[start..start + self.stride()]
    }

    /// Returns the pixel bytes at `(x, y)`.
    ///
    /// # Panics
    ///
    /// Panics if `(x, y)` is out of bounds.
    pub fn pixel(&self, x: u32, y: u32) -> &[u8] {
        let offset = y as usize * self.stride() + x as usize * BYTES_PER_PIXEL;
        &self.data[offset..offset + BYTES_PER_PIXEL]
    }

    /// Reverse row order in place (bottom-up ⇄ top-down).
    ///
    /// # Panics
    ///
    /// Panics if `data` is shorter than the dimensions imply; see
    /// [`check_len`](Self::check_len).
    pub fn flip_rows(&mut self) {
        let stride = self.stride();
        let rows = self.height as usize;
        for y in 0..rows / 2 {
            let (top, bottom) = self.data.split_at_mut((rows - 1 - y) * stride);
            top[y * stride..(y + 1) * stride].swap_with_slice(&mut bottom[..stride]);
        }
    }
}

// ── FrameSource ──────────────────────────────────────────────────

/// A live surface the controller can resize and read back.
///
/// `capture` must return top-down RGBA8 rows at the surface's current
/// size. A failed capture only skips the current tick.
pub trait FrameSource {
    /// Current surface size as `(width, height)`.
    fn size(&self) -> (u32, u32);

    /// Ask the surface to change size. May take effect on a later tick.
    fn resize(&mut self, width: u32, height: u32);

    /// Read back the surface contents.
    fn capture(&mut self) -> Result<Frame, CaptureError>;
}

impl<S: FrameSource + ?Sized> FrameSource for Box<S> {
    fn size(&self) -> (u32, u32) {
        (**self).size()
    }

    fn resize(&mut self, width: u32, height: u32) {
        (**self).resize(width, height)
    }

    fn capture(&mut self) -> Result<Frame, CaptureError> {
        (**self).capture()
    }
}

// ── BottomUp ─────────────────────────────────────────────────────

/// Adapter for surfaces whose readback starts at the bottom row, as
/// GL-style framebuffers do. Flips every captured frame to top-down.
#[derive(Debug)]
pub struct BottomUp<S> {
    inner: S,
}

impl<S> BottomUp<S> {
    pub fn new(inner: S) -> Self {
        Self { inner }
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }

    pub fn inner_mut(&mut self) -> &mut S {
        &mut self.inner
    }

    pub fn into_inner(self) -> S {
        self.inner
    }
}

impl<S: FrameSource> FrameSource for BottomUp<S> {
    fn size(&self) -> (u32, u32) {
        self.inner.size()
    }

    fn resize(&mut self, width: u32, height: u32) {
        self.inner.resize(width, height)
    }

    fn capture(&mut self) -> Result<Frame, CaptureError> {
        let mut frame = self.inner.capture()?;
        frame.check_len()?;
        frame.flip_rows();
        Ok(frame)
    }
}

// ── Tests ────────────────────────────────────────────────────────
