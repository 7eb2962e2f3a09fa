//! The demo's surface: a test pattern, optionally read back bottom-up.

use wscapture_core::{BottomUp, CaptureError, Frame, FrameSource, TestPattern};

use crate::config::CaptureConfig;

/// Either orientation of the test pattern behind one concrete type.
pub enum DemoSource {
    TopDown(TestPattern),
    BottomUp(BottomUp<TestPattern>),
}

impl DemoSource {
    pub fn from_config(config: &CaptureConfig) -> Self {
        let pattern = TestPattern::new(config.width, config.height);
        if config.bottom_up {
            DemoSource::BottomUp(BottomUp::new(pattern.bottom_up()))
        } else {
            DemoSource::TopDown(pattern)
        }
    }

    /// Draw the scene for `time_ms`.
    pub fn render(&mut self, time_ms: f64) {
        self.pattern_mut().render(time_ms);
    }

    fn pattern_mut(&mut self) -> &mut TestPattern {
        match self {
            DemoSource::TopDown(pattern) => pattern,
            DemoSource::BottomUp(adapter) => adapter.inner_mut(),
        }
    }
}

impl FrameSource for DemoSource {
    fn size(&self) -> (u32, u32) {
        match self {
            DemoSource::TopDown(pattern) => pattern.size(),
            DemoSource::BottomUp(adapter) => adapter.size(),
        }
    }

    fn resize(&mut self, width: u32, height: u32) {
        match self {
            DemoSource::TopDown(pattern) => pattern.resize(width, height),
            DemoSource::BottomUp(adapter) => adapter.resize(width, height),
        }
    }

    fn capture(&mut self) -> Result<Frame, CaptureError> {
        match self {
            DemoSource::TopDown(pattern) => pattern.capture(),
            DemoSource::BottomUp(adapter) => adapter.capture(),
        }
    }
}
