//! Configuration for the demo recorder.

use std::path::Path;

use serde::{Deserialize, Serialize};
use wscapture_core::{ControllerConfig, MAX_OUTSTANDING};

/// Top-level configuration loaded from a TOML file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DemoConfig {
    /// Consumer endpoint.
    pub network: NetworkConfig,
    /// Surface and scheduler settings.
    pub capture: CaptureConfig,
    /// Logging settings.
    pub logging: LoggingConfig,
}

/// Network configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkConfig {
    /// WebSocket URL of the consumer.
    pub url: String,
}

/// Surface and scheduler configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptureConfig {
    /// Initial surface width; the consumer's `start` overrides it.
    pub width: u32,
    /// Initial surface height; the consumer's `start` overrides it.
    pub height: u32,
    /// Render ticks per second.
    pub tick_hz: f64,
    /// Gap between frames sent and acknowledged at which capture
    /// pauses. `0` keeps one frame in flight at a time.
    pub max_outstanding: u64,
    /// Simulate a GL-style surface that reads back bottom row first.
    pub bottom_up: bool,
}

/// Logging settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level: "trace", "debug", "info", "warn", "error".
    pub level: String,
}

// ── Defaults ─────────────────────────────────────────────────────

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            url: "ws://127.0.0.1:8080/__wscapture__/socket".into(),
        }
    }
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            width: 640,
            height: 360,
            tick_hz: 60.0,
            max_outstanding: MAX_OUTSTANDING,
            bottom_up: false,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".into(),
        }
    }
}

// ── Loading ──────────────────────────────────────────────────────

impl DemoConfig {
    /// Load configuration from a TOML file, falling back to defaults.
    pub fn load(path: &Path) -> Self {
        match std::fs::read_to_string(path) {
            Ok(contents) => toml::from_str(&contents).unwrap_or_else(|e| {
                tracing::warn!("invalid config {}: {e}; using defaults", path.display());
                Self::default()
            }),
            Err(_) => {
                tracing::info!("no config at {}; using defaults", path.display());
                Self::default()
            }
        }
    }

    /// Write the default configuration to a file (for bootstrapping).
    pub fn write_default(path: &Path) -> std::io::Result<()> {
        let text = toml::to_string_pretty(&Self::default()).map_err(std::io::Error::other)?;
        std::fs::write(path, text)
    }

    /// Scheduler tick rate, clamped to something a display could do.
    pub fn tick_hz(&self) -> f64 {
        if self.capture.tick_hz.is_finite() {
            self.capture.tick_hz.clamp(1.0, 240.0)
        } else {
            60.0
        }
    }

    /// Convert capture settings into a `ControllerConfig`.
    pub fn to_controller_config(&self) -> ControllerConfig {
        ControllerConfig {
            max_outstanding: self.capture.max_outstanding,
            ..ControllerConfig::default()
        }
    }
}

// ── Tests ────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_serializes() {
        let cfg = DemoConfig::default();
        let text = toml::to_string_pretty(&cfg).unwrap();
        assert!(text.contains("url"));
        assert!(text.contains("max_outstanding"));
    }

    #[test]
    fn partial_config_keeps_defaults() {
        let cfg: DemoConfig = toml::from_str("[capture]\nbottom_up = true\n").unwrap();
        assert!(cfg.capture.bottom_up);
        assert_eq!(cfg.capture.max_outstanding, 10);
        assert_eq!(cfg.logging.level, "info");
    }

    #[test]
    fn tick_rate_is_clamped() {
        let mut cfg = DemoConfig::default();
        cfg.capture.tick_hz = 1000.0;
        assert_eq!(cfg.tick_hz(), 240.0);
        cfg.capture.tick_hz = f64::NAN;
        assert_eq!(cfg.tick_hz(), 60.0);
    }

    #[test]
    fn to_controller_config_honours_zero_window() {
        let mut cfg = DemoConfig::default();
        cfg.capture.max_outstanding = 0;
        assert_eq!(cfg.to_controller_config().max_outstanding, 0);
    }

    #[test]
    fn write_default_then_load() {
        let path = std::env::temp_dir().join(format!("wscapture-demo-{}.toml", std::process::id()));
        DemoConfig::write_default(&path).unwrap();
        let cfg = DemoConfig::load(&path);
        std::fs::remove_file(&path).ok();
        assert_eq!(cfg.network.url, NetworkConfig::default().url);
        assert_eq!(cfg.capture.height, 360);
    }

    #[test]
    fn missing_file_falls_back_to_defaults() {
        let cfg = DemoConfig::load(Path::new("/nonexistent/wscapture-demo.toml"));
        assert_eq!(cfg.capture.width, 640);
    }
}
