//! Vibration sensor frame decoder.
//!
//! Wire format: frames start with the header bytes `0x55 0x61`, all fields
//! little-endian i16. Two variants share the header and are told apart by
//! length:
//!
//! - extended, 28 bytes: velocity @2..8, displacement @8..14,
//!   frequency @14..20 (0.1 Hz units), temperature @20..22 (0.01 degC),
//!   22..28 reserved
//! - compact, 20 bytes: velocity @2..8, temperature @8..10, 10..20 reserved
//!
//! A notification payload may concatenate several frames back to back; the
//! scanner emits every complete frame and reports how many bytes it
//! consumed so the caller can carry a trailing partial into the next
//! notification.

use contracts::{DecodeError, RawSample};
use tracing::trace;

/// Frame header, first byte.
pub const HEADER_0: u8 = 0x55;
/// Frame header, second byte.
pub const HEADER_1: u8 = 0x61;

/// Extended frame length in bytes.
pub const EXTENDED_FRAME_LEN: usize = 28;
/// Compact frame length in bytes.
pub const COMPACT_FRAME_LEN: usize = 20;

/// Result of scanning one notification payload.
#[derive(Debug, Clone, PartialEq)]
pub struct ScanResult {
    /// Complete frames decoded, in payload order
    pub samples: Vec<RawSample>,

    /// Bytes consumed from the front of the payload
    pub consumed: usize,
}

#[inline]
fn i16_le(buf: &[u8], offset: usize) -> i16 {
    i16::from_le_bytes([buf[offset], buf[offset + 1]])
}

fn has_header(buf: &[u8]) -> bool {
    buf.len() >= 2 && buf[0] == HEADER_0 && buf[1] == HEADER_1
}

/// Decode one extended frame. The caller guarantees the header.
fn decode_extended(frame: &[u8]) -> RawSample {
    RawSample {
        velocity: [i16_le(frame, 2), i16_le(frame, 4), i16_le(frame, 6)],
        displacement: Some([i16_le(frame, 8), i16_le(frame, 10), i16_le(frame, 12)]),
        frequency: Some([i16_le(frame, 14), i16_le(frame, 16), i16_le(frame, 18)]),
        temperature_c: i16_le(frame, 20) as f64 * 0.01,
    }
}

/// Decode one compact frame. The caller guarantees the header.
fn decode_compact(frame: &[u8]) -> RawSample {
    RawSample {
        velocity: [i16_le(frame, 2), i16_le(frame, 4), i16_le(frame, 6)],
        displacement: None,
        frequency: None,
        temperature_c: i16_le(frame, 8) as f64 * 0.01,
    }
}

/// Decode a single frame from the front of `buf`.
///
/// Prefers the extended variant when 28 bytes are available and the frame
/// boundary is consistent (end of buffer or another header right after);
/// otherwise falls back to the compact variant.
pub fn decode_frame(buf: &[u8]) -> Result<(RawSample, usize), DecodeError> {
    if buf.len() < 2 {
        return Err(DecodeError::TooShort {
            needed: COMPACT_FRAME_LEN,
            got: buf.len(),
        });
    }
    if !has_header(buf) {
        return Err(DecodeError::BadHeader {
            found: [buf[0], buf[1]],
        });
    }
    if buf.len() >= EXTENDED_FRAME_LEN && extended_boundary_aligns(buf) {
        return Ok((decode_extended(buf), EXTENDED_FRAME_LEN));
    }
    if buf.len() >= COMPACT_FRAME_LEN {
        return Ok((decode_compact(buf), COMPACT_FRAME_LEN));
    }
    Err(DecodeError::TooShort {
        needed: COMPACT_FRAME_LEN,
        got: buf.len(),
    })
}

/// True when treating the frame as extended leaves a consistent tail:
/// either the payload ends exactly there or another header follows.
fn extended_boundary_aligns(buf: &[u8]) -> bool {
    let rest = &buf[EXTENDED_FRAME_LEN..];
    rest.is_empty() || has_header(rest)
}

/// Scan a payload of concatenated frames.
///
/// Emits every complete frame; a trailing partial frame is left
/// unconsumed and is not an error. Bytes before the first header are
/// skipped and counted as consumed.
pub fn scan(payload: &[u8]) -> ScanResult {
    let mut samples = Vec::new();
    let mut pos = 0;

    while pos < payload.len() {
        let rest = &payload[pos..];

        if !has_header(rest) {
            if rest.len() < 2 {
                // Lone byte, could be the start of a split header
                break;
            }
            // Resync: skip to the next candidate header byte
            trace!(offset = pos, byte = rest[0], "skipping non-header byte");
            pos += 1;
            continue;
        }

        match decode_frame(rest) {
            Ok((sample, used)) => {
                samples.push(sample);
                pos += used;
            }
            Err(DecodeError::TooShort { .. }) => break,
            Err(_) => {
                pos += 1;
            }
        }
    }

    ScanResult {
        samples,
        consumed: pos,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn extended_frame(vx: i16, vy: i16, vz: i16) -> Vec<u8> {
        let mut frame = vec![HEADER_0, HEADER_1];
        for v in [vx, vy, vz] {
            frame.extend_from_slice(&v.to_le_bytes());
        }
        // displacement
        for v in [10i16, 20, 30] {
            frame.extend_from_slice(&v.to_le_bytes());
        }
        // frequency (0.1 Hz)
        for v in [500i16, 510, 520] {
            frame.extend_from_slice(&v.to_le_bytes());
        }
        // temperature: 21.50 degC
        frame.extend_from_slice(&2150i16.to_le_bytes());
        frame.extend_from_slice(&[0u8; 6]);
        assert_eq!(frame.len(), EXTENDED_FRAME_LEN);
        frame
    }

    fn compact_frame(vx: i16, vy: i16, vz: i16) -> Vec<u8> {
        let mut frame = vec![HEADER_0, HEADER_1];
        for v in [vx, vy, vz] {
            frame.extend_from_slice(&v.to_le_bytes());
        }
        frame.extend_from_slice(&2000i16.to_le_bytes());
        frame.extend_from_slice(&[0u8; 10]);
        assert_eq!(frame.len(), COMPACT_FRAME_LEN);
        frame
    }

    #[test]
    fn decodes_extended_frame() {
        let frame = extended_frame(100, -200, 300);
        let (sample, used) = decode_frame(&frame).unwrap();
        assert_eq!(used, EXTENDED_FRAME_LEN);
        assert_eq!(sample.velocity, [100, -200, 300]);
        assert_eq!(sample.displacement, Some([10, 20, 30]));
        assert_eq!(sample.frequency, Some([500, 510, 520]));
        assert!((sample.temperature_c - 21.5).abs() < 1e-9);
    }

    #[test]
    fn decodes_compact_frame() {
        let frame = compact_frame(5, 6, 7);
        let (sample, used) = decode_frame(&frame).unwrap();
        assert_eq!(used, COMPACT_FRAME_LEN);
        assert_eq!(sample.velocity, [5, 6, 7]);
        assert_eq!(sample.displacement, None);
        assert_eq!(sample.frequency, None);
        assert!((sample.temperature_c - 20.0).abs() < 1e-9);
    }

    #[test]
    fn rejects_bad_header() {
        let err = decode_frame(&[0x55, 0x62, 0, 0]).unwrap_err();
        assert_eq!(
            err,
            DecodeError::BadHeader {
                found: [0x55, 0x62]
            }
        );
    }

    #[test]
    fn rejects_short_payload() {
        let frame = extended_frame(1, 2, 3);
        let err = decode_frame(&frame[..10]).unwrap_err();
        assert!(matches!(err, DecodeError::TooShort { .. }));
    }

    #[test]
    fn scans_concatenated_frames() {
        let mut payload = extended_frame(1, 2, 3);
        payload.extend(extended_frame(4, 5, 6));
        payload.extend(extended_frame(7, 8, 9));

        let result = scan(&payload);
        assert_eq!(result.samples.len(), 3);
        assert_eq!(result.consumed, payload.len());
        assert_eq!(result.samples[0].velocity, [1, 2, 3]);
        assert_eq!(result.samples[2].velocity, [7, 8, 9]);
    }

    #[test]
    fn scan_leaves_trailing_partial() {
        let mut payload = extended_frame(1, 2, 3);
        let partial = extended_frame(4, 5, 6);
        payload.extend_from_slice(&partial[..12]);

        let result = scan(&payload);
        assert_eq!(result.samples.len(), 1);
        assert_eq!(result.consumed, EXTENDED_FRAME_LEN);
    }

    #[test]
    fn scan_resyncs_past_garbage() {
        let mut payload = vec![0x00, 0x01, 0x02];
        payload.extend(extended_frame(9, 9, 9));

        let result = scan(&payload);
        assert_eq!(result.samples.len(), 1);
        assert_eq!(result.consumed, 3 + EXTENDED_FRAME_LEN);
    }

    #[test]
    fn scan_mixed_variants() {
        let mut payload = compact_frame(1, 1, 1);
        payload.extend(extended_frame(2, 2, 2));

        let result = scan(&payload);
        assert_eq!(result.samples.len(), 2);
        assert_eq!(result.samples[0].displacement, None);
        assert_eq!(result.samples[1].displacement, Some([10, 20, 30]));
        assert_eq!(result.consumed, payload.len());
    }

    #[test]
    fn scan_empty_payload() {
        let result = scan(&[]);
        assert!(result.samples.is_empty());
        assert_eq!(result.consumed, 0);
    }

    #[test]
    fn hex_fixture_decodes() {
        // 5561 0a00 1400 1e00 followed by zeroed displacement/frequency,
        // temperature 0x0866 = 21.50 degC, reserved tail
        let mut payload = vec![0x55, 0x61, 0x0a, 0x00, 0x14, 0x00, 0x1e, 0x00];
        payload.extend_from_slice(&[0u8; 12]);
        payload.extend_from_slice(&0x0866i16.to_le_bytes());
        payload.extend_from_slice(&[0u8; 6]);

        let result = scan(&payload);
        assert_eq!(result.samples.len(), 1);
        assert_eq!(result.samples[0].velocity, [10, 20, 30]);
        assert!((result.samples[0].temperature_c - 21.5).abs() < 1e-9);
    }
}
