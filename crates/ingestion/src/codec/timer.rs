//! Shot timer frame decoder.
//!
//! Wire format: fixed 12-byte frames. Byte 0 is the protocol magic
//! `0x6C`, byte 1 the event code (START / SHOT / STOP). All u16 fields
//! are big-endian; times are in centiseconds on the wire and scaled to
//! seconds here.
//!
//! Layout: magic @0, event code @1, shot_count @2..4, string_number
//! @4..6, cumulative @6..8, split @8..10, 10..12 reserved.

use contracts::{DecodeError, TimerEventKind, TimerFrame};

/// Timer protocol magic byte.
pub const TIMER_MAGIC: u8 = 0x6C;

/// Timer frame length in bytes.
pub const TIMER_FRAME_LEN: usize = 12;

const CODE_START: u8 = 0x02;
const CODE_SHOT: u8 = 0x03;
const CODE_STOP: u8 = 0x04;

#[inline]
fn u16_be(buf: &[u8], offset: usize) -> u16 {
    u16::from_be_bytes([buf[offset], buf[offset + 1]])
}

/// Decode one timer frame from the front of `buf`.
///
/// Unknown event codes (vendor keep-alives share the magic) come back as
/// `BadDiscriminator`; the caller drops those at debug level.
pub fn decode_frame(buf: &[u8]) -> Result<(TimerFrame, usize), DecodeError> {
    if buf.len() < TIMER_FRAME_LEN {
        return Err(DecodeError::TooShort {
            needed: TIMER_FRAME_LEN,
            got: buf.len(),
        });
    }
    if buf[0] != TIMER_MAGIC {
        return Err(DecodeError::BadHeader {
            found: [buf[0], buf[1]],
        });
    }

    let kind = match buf[1] {
        CODE_START => TimerEventKind::Start,
        CODE_SHOT => TimerEventKind::Shot,
        CODE_STOP => TimerEventKind::Stop,
        code => return Err(DecodeError::BadDiscriminator { code }),
    };

    let frame = TimerFrame {
        kind,
        shot_count: u16_be(buf, 2),
        string_number: u16_be(buf, 4),
        cumulative_s: u16_be(buf, 6) as f64 / 100.0,
        split_s: u16_be(buf, 8) as f64 / 100.0,
    };

    Ok((frame, TIMER_FRAME_LEN))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame(code: u8, shots: u16, string: u16, cumulative_cs: u16, split_cs: u16) -> Vec<u8> {
        let mut buf = vec![TIMER_MAGIC, code];
        buf.extend_from_slice(&shots.to_be_bytes());
        buf.extend_from_slice(&string.to_be_bytes());
        buf.extend_from_slice(&cumulative_cs.to_be_bytes());
        buf.extend_from_slice(&split_cs.to_be_bytes());
        buf.extend_from_slice(&[0u8; 2]);
        assert_eq!(buf.len(), TIMER_FRAME_LEN);
        buf
    }

    #[test]
    fn decodes_shot_frame() {
        let buf = frame(CODE_SHOT, 3, 2, 452, 87);
        let (decoded, used) = decode_frame(&buf).unwrap();
        assert_eq!(used, TIMER_FRAME_LEN);
        assert_eq!(decoded.kind, TimerEventKind::Shot);
        assert_eq!(decoded.shot_count, 3);
        assert_eq!(decoded.string_number, 2);
        assert!((decoded.cumulative_s - 4.52).abs() < 1e-9);
        assert!((decoded.split_s - 0.87).abs() < 1e-9);
    }

    #[test]
    fn decodes_start_and_stop() {
        let (start, _) = decode_frame(&frame(CODE_START, 0, 1, 0, 0)).unwrap();
        assert_eq!(start.kind, TimerEventKind::Start);

        let (stop, _) = decode_frame(&frame(CODE_STOP, 5, 1, 1234, 0)).unwrap();
        assert_eq!(stop.kind, TimerEventKind::Stop);
        assert!((stop.cumulative_s - 12.34).abs() < 1e-9);
    }

    #[test]
    fn rejects_unknown_code() {
        let err = decode_frame(&frame(0x7F, 0, 0, 0, 0)).unwrap_err();
        assert_eq!(err, DecodeError::BadDiscriminator { code: 0x7F });
    }

    #[test]
    fn rejects_bad_magic() {
        let mut buf = frame(CODE_SHOT, 1, 1, 100, 100);
        buf[0] = 0x55;
        let err = decode_frame(&buf).unwrap_err();
        assert!(matches!(err, DecodeError::BadHeader { .. }));
    }

    #[test]
    fn rejects_short_frame() {
        let buf = frame(CODE_SHOT, 1, 1, 100, 100);
        let err = decode_frame(&buf[..6]).unwrap_err();
        assert_eq!(
            err,
            DecodeError::TooShort {
                needed: TIMER_FRAME_LEN,
                got: 6
            }
        );
    }
}
