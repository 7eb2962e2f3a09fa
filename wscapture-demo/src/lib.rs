//! # wscapture-demo: test-pattern recorder
//!
//! Connects to a wscapture consumer over WebSocket and streams an
//! animated test pattern, paced by a local render tick and throttled
//! by the consumer's acknowledgements.
//!
//! The pattern is animated off the controller's recording clock, so
//! the recorded output advances exactly one frame interval per frame
//! regardless of how fast the consumer drains it.

pub mod config;
pub mod recorder;
pub mod source;
