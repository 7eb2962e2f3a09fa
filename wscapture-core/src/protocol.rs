//! Wire protocol between the capturing side and the consumer.
//!
//! # Control channel (text, JSON)
//! ```text
//! Consumer ──[{"type":"start","width":W,"height":H,"framerate":F,"length":N}]──► Capturer
//! Consumer ──[{"type":"ack","frame":K}]────────────────────────────────────────► Capturer
//! ```
//!
//! `length` is a frame count; any negative value means unbounded.
//!
//! # Data channel (binary)
//! ```text
//! Capturer ──[W * H * 4 bytes, RGBA8, top-down rows]──► Consumer   (one frame)
//! Capturer ──[0 bytes]────────────────────────────────► Consumer   (end of stream)
//! ```

use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::error::CaptureError;
use crate::source::Frame;
use crate::transport::Payload;

/// Bytes per pixel on the wire (RGBA8).
pub const BYTES_PER_PIXEL: usize = 4;

/// Largest accepted surface edge in pixels. A frame at this size is
/// 1 GiB, which still fits a 32-bit `usize`.
pub const MAX_DIMENSION: u32 = 16384;

// ── Control messages ──────────────────────────────────────────────

/// Session parameters carried by a `start` message.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StartParams {
    pub width: u32,
    pub height: u32,
    pub framerate: f64,
    pub length: i64,
}

impl StartParams {
    /// Total frames to capture, or `None` when `length` is negative.
    pub fn limit(&self) -> Option<u64> {
        u64::try_from(self.length).ok()
    }

    /// Size in bytes of one frame payload at these dimensions.
    pub fn frame_len(&self) -> usize {
        frame_len(self.width, self.height)
    }

    /// Reject values that decode fine but cannot describe a session.
    pub fn validate(&self) -> Result<(), CaptureError> {
        if self.width == 0 || self.height == 0 {
            return Err(CaptureError::InvalidMessage(format!(
                "non-positive dimensions {}x{}",
                self.width, self.height
            )));
        }
        if self.width > MAX_DIMENSION || self.height > MAX_DIMENSION {
            return Err(CaptureError::InvalidMessage(format!(
                "dimensions {}x{} exceed {MAX_DIMENSION}x{MAX_DIMENSION}",
                self.width, self.height
            )));
        }
        if !self.framerate.is_finite() || self.framerate <= 0.0 {
            return Err(CaptureError::InvalidMessage(format!(
                "invalid framerate {}",
                self.framerate
            )));
        }
        Ok(())
    }
}

/// A decoded control message from the consumer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ControlMessage {
    /// Negotiate and begin a session.
    Start(StartParams),
    /// The consumer has processed frames up to `frame`.
    Ack { frame: u64 },
}

impl ControlMessage {
    /// Encode as the JSON text record sent on the control channel.
    pub fn to_text(&self) -> Result<String, CaptureError> {
        Ok(serde_json::to_string(self)?)
    }

    /// Decode and validate a JSON text record.
    pub fn from_text(text: &str) -> Result<Self, CaptureError> {
        let msg: Self = serde_json::from_str(text)?;
        if let Self::Start(params) = &msg {
            params.validate()?;
        }
        Ok(msg)
    }
}

/// Decode an inbound transport payload as a control message.
///
/// Binary payloads are never valid here; the consumer only speaks
/// text on its way in.
pub fn decode_control(payload: &Payload) -> Result<ControlMessage, CaptureError> {
    match payload {
        Payload::Text(text) => ControlMessage::from_text(text),
        Payload::Binary(data) => Err(CaptureError::NotText(data.len())),
    }
}

// ── Data records ──────────────────────────────────────────────────

/// A classified binary record.
#[derive(Debug, PartialEq, Eq)]
pub enum DataRecord<'a> {
    /// One full frame.
    Frame(&'a [u8]),
    /// End-of-stream marker.
    Stop,
}

/// Size in bytes of a `width` x `height` RGBA8 frame, or `None` if it
/// does not fit in `usize`.
pub fn checked_frame_len(width: u32, height: u32) -> Option<usize> {
    (width as usize)
        .checked_mul(height as usize)?
        .checked_mul(BYTES_PER_PIXEL)
}

/// Size in bytes of a `width` x `height` RGBA8 frame.
///
/// Saturates at `usize::MAX`; sizes accepted by
/// [`StartParams::validate`] never get there.
pub fn frame_len(width: u32, height: u32) -> usize {
    checked_frame_len(width, height).unwrap_or(usize::MAX)
}

/// Turn a captured frame into a binary payload for the negotiated size.
pub fn encode_frame(frame: Frame, params: &StartParams) -> Result<Bytes, CaptureError> {
    if (frame.width, frame.height) != (params.width, params.height) {
        return Err(CaptureError::SizeMismatch {
            width: params.width,
            height: params.height,
            actual_width: frame.width,
            actual_height: frame.height,
        });
    }
    let expected = params.frame_len();
    if frame.data.len() != expected {
        return Err(CaptureError::InvalidFrameSize {
            expected,
            actual: frame.data.len(),
        });
    }
    Ok(Bytes::from(frame.data))
}

/// The zero-length end-of-stream payload.
pub fn stop_payload() -> Bytes {
    Bytes::new()
}

/// Classify a binary record received by a consumer expecting frames of
/// `expected_len` bytes.
pub fn classify_binary(data: &[u8], expected_len: usize) -> Result<DataRecord<'_>, CaptureError> {
    if data.is_empty() {
        return Ok(DataRecord::Stop);
    }
    if data.len() != expected_len {
        return Err(CaptureError::InvalidFrameSize {
            expected: expected_len,
            actual: data.len(),
        });
    }
    Ok(DataRecord::Frame(data))
}

// ── Tests ────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn text(s: &str) -> Payload {
        Payload::Text(s.to_string())
    }

    #[test]
    fn decodes_start() {
        let msg = decode_control(&text(
            r#"{"type":"start","width":640,"height":480,"framerate":30,"length":-1}"#,
        ))
        .unwrap();
        let params = match msg {
            ControlMessage::Start(params) => params,
            other => panic!("expected start, got {other:?}"),
        };
        assert_eq!(params.width, 640);
        assert_eq!(params.height, 480);
        assert_eq!(params.framerate, 30.0);
        assert_eq!(params.limit(), None);
        assert_eq!(params.frame_len(), 640 * 480 * 4);
    }

    #[test]
    fn decodes_ack() {
        let msg = decode_control(&text(r#"{"type":"ack","frame":7}"#)).unwrap();
        assert_eq!(msg, ControlMessage::Ack { frame: 7 });
    }

    #[test]
    fn start_missing_height_is_rejected() {
        let err = decode_control(&text(
            r#"{"type":"start","width":640,"framerate":30,"length":10}"#,
        ))
        .unwrap_err();
        assert!(matches!(err, CaptureError::InvalidMessage(_)));
    }

    #[test]
    fn wrong_field_type_is_rejected() {
        assert!(decode_control(&text(r#"{"type":"ack","frame":"7"}"#)).is_err());
        assert!(decode_control(&text(r#"{"type":"ack","frame":-1}"#)).is_err());
        assert!(
            decode_control(&text(
                r#"{"type":"start","width":"640","height":480,"framerate":30,"length":1}"#
            ))
            .is_err()
        );
    }

    #[test]
    fn unknown_type_is_rejected() {
        assert!(decode_control(&text(r#"{"type":"unknown"}"#)).is_err());
        assert!(decode_control(&text(r#"{"frame":3}"#)).is_err());
    }

    #[test]
    fn invalid_json_is_rejected() {
        assert!(decode_control(&text("not json")).is_err());
    }

    #[test]
    fn binary_where_text_expected() {
        let err = decode_control(&Payload::Binary(Bytes::from_static(b"abc"))).unwrap_err();
        assert!(matches!(err, CaptureError::NotText(3)));
    }

    #[test]
    fn start_with_zero_width_or_bad_framerate() {
        assert!(
            decode_control(&text(
                r#"{"type":"start","width":0,"height":480,"framerate":30,"length":1}"#
            ))
            .is_err()
        );
        assert!(
            decode_control(&text(
                r#"{"type":"start","width":10,"height":10,"framerate":0,"length":1}"#
            ))
            .is_err()
        );
    }

    #[test]
    fn start_with_oversized_dimensions_is_rejected() {
        let err = decode_control(&text(
            r#"{"type":"start","width":4294967295,"height":4294967295,"framerate":30,"length":1}"#,
        ))
        .unwrap_err();
        assert!(matches!(err, CaptureError::InvalidMessage(_)));
        assert!(
            decode_control(&text(
                r#"{"type":"start","width":100000,"height":100000,"framerate":30,"length":1}"#
            ))
            .is_err()
        );
        assert!(
            decode_control(&text(
                r#"{"type":"start","width":16384,"height":16384,"framerate":30,"length":1}"#
            ))
            .is_ok()
        );
    }

    #[test]
    fn frame_len_never_overflows() {
        assert_eq!(checked_frame_len(2, 3), Some(24));
        assert_eq!(frame_len(MAX_DIMENSION, MAX_DIMENSION), 1 << 30);
        assert_eq!(frame_len(u32::MAX, u32::MAX), usize::MAX);
    }

    #[test]
    fn encodes_control_with_type_tag() {
        let start = ControlMessage::Start(StartParams {
            width: 2,
            height: 3,
            framerate: 25.0,
            length: 5,
        });
        let json: serde_json::Value = serde_json::from_str(&start.to_text().unwrap()).unwrap();
        assert_eq!(json["type"], "start");
        assert_eq!(json["height"], 3);

        let ack = ControlMessage::Ack { frame: 9 }.to_text().unwrap();
        assert_eq!(ack, r#"{"type":"ack","frame":9}"#);
    }

    #[test]
    fn encode_frame_checks_size() {
        let params = StartParams {
            width: 2,
            height: 2,
            framerate: 30.0,
            length: -1,
        };
        let ok = Frame::blank(2, 2);
        assert_eq!(encode_frame(ok, &params).unwrap().len(), 16);

        let wrong_dims = Frame::blank(1, 2);
        assert!(matches!(
            encode_frame(wrong_dims, &params),
            Err(CaptureError::SizeMismatch { .. })
        ));

        let short = Frame {
            width: 2,
            height: 2,
            data: vec![0; 15],
        };
        assert!(matches!(
            encode_frame(short, &params),
            Err(CaptureError::InvalidFrameSize {
                expected: 16,
                actual: 15
            })
        ));
    }

    #[test]
    fn classify_binary_records() {
        assert_eq!(classify_binary(&stop_payload(), 16).unwrap(), DataRecord::Stop);
        let frame = [1u8; 16];
        assert_eq!(classify_binary(&frame, 16).unwrap(), DataRecord::Frame(&frame));
        assert!(classify_binary(&frame[..8], 16).is_err());
    }
}
