pub mod connection;
mod session;

pub use connection::ConnectionPhase;
pub use session::{AckOutcome, MAX_OUTSTANDING, RecordingSession};
