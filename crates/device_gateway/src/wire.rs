//! Wire frame encoders for simulated and replayed devices
//!
//! Byte layouts mirror what the hardware emits: vibration frames carry a
//! 0x55 0x61 header with i16 little-endian axis values, timer frames are
//! fixed 12-byte records with big-endian u16 fields.

/// Extended vibration frame length (velocity + displacement + frequency)
pub const EXTENDED_FRAME_LEN: usize = 28;
/// Compact vibration frame length (velocity only)
pub const COMPACT_FRAME_LEN: usize = 20;
/// Timer frame length
pub const TIMER_FRAME_LEN: usize = 12;

const VIBRATION_HEADER: [u8; 2] = [0x55, 0x61];
const TIMER_MAGIC: u8 = 0x6C;

/// Timer protocol codes
pub const CODE_START: u8 = 0x02;
pub const CODE_SHOT: u8 = 0x03;
pub const CODE_STOP: u8 = 0x04;

fn put_i16_le(buf: &mut [u8], offset: usize, value: i16) {
    buf[offset..offset + 2].copy_from_slice(&value.to_le_bytes());
}

fn put_u16_be(buf: &mut [u8], offset: usize, value: u16) {
    buf[offset..offset + 2].copy_from_slice(&value.to_be_bytes());
}

/// Encode an extended vibration frame
///
/// Frequency values are in 0.1 Hz units, temperature in 0.01 degC.
pub fn encode_extended_frame(
    velocity: [i16; 3],
    displacement: [i16; 3],
    frequency: [i16; 3],
    temperature_centi: i16,
) -> [u8; EXTENDED_FRAME_LEN] {
    let mut frame = [0u8; EXTENDED_FRAME_LEN];
    frame[0] = VIBRATION_HEADER[0];
    frame[1] = VIBRATION_HEADER[1];
    for axis in 0..3 {
        put_i16_le(&mut frame, 2 + axis * 2, velocity[axis]);
        put_i16_le(&mut frame, 8 + axis * 2, displacement[axis]);
        put_i16_le(&mut frame, 14 + axis * 2, frequency[axis]);
    }
    put_i16_le(&mut frame, 20, temperature_centi);
    frame
}

/// Encode a compact vibration frame (velocity and temperature only)
pub fn encode_compact_frame(velocity: [i16; 3], temperature_centi: i16) -> [u8; COMPACT_FRAME_LEN] {
    let mut frame = [0u8; COMPACT_FRAME_LEN];
    frame[0] = VIBRATION_HEADER[0];
    frame[1] = VIBRATION_HEADER[1];
    for axis in 0..3 {
        put_i16_le(&mut frame, 2 + axis * 2, velocity[axis]);
    }
    put_i16_le(&mut frame, 8, temperature_centi);
    frame
}

/// Encode a timer frame
///
/// Cumulative and split times are in centiseconds.
pub fn encode_timer_frame(
    code: u8,
    shot_count: u16,
    string_number: u16,
    cumulative_cs: u16,
    split_cs: u16,
) -> [u8; TIMER_FRAME_LEN] {
    let mut frame = [0u8; TIMER_FRAME_LEN];
    frame[0] = TIMER_MAGIC;
    frame[1] = code;
    put_u16_be(&mut frame, 2, shot_count);
    put_u16_be(&mut frame, 4, string_number);
    put_u16_be(&mut frame, 6, cumulative_cs);
    put_u16_be(&mut frame, 8, split_cs);
    frame
}

/// Seconds to centiseconds, saturating at u16 range
pub fn to_centiseconds(seconds: f64) -> u16 {
    (seconds * 100.0).round().clamp(0.0, u16::MAX as f64) as u16
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compact_frame_layout() {
        let frame = encode_compact_frame([10, -5, 30], 2215);

        assert_eq!(frame[0], 0x55);
        assert_eq!(frame[1], 0x61);
        assert_eq!(i16::from_le_bytes([frame[2], frame[3]]), 10);
        assert_eq!(i16::from_le_bytes([frame[4], frame[5]]), -5);
        assert_eq!(i16::from_le_bytes([frame[6], frame[7]]), 30);
        assert_eq!(i16::from_le_bytes([frame[8], frame[9]]), 2215);
        assert!(frame[10..].iter().all(|&b| b == 0));
    }

    #[test]
    fn test_extended_frame_layout() {
        let frame = encode_extended_frame([1, 2, 3], [4, 5, 6], [70, 80, 90], 2500);

        assert_eq!(&frame[..2], &[0x55, 0x61]);
        assert_eq!(i16::from_le_bytes([frame[2], frame[3]]), 1);
        assert_eq!(i16::from_le_bytes([frame[8], frame[9]]), 4);
        assert_eq!(i16::from_le_bytes([frame[14], frame[15]]), 70);
        assert_eq!(i16::from_le_bytes([frame[20], frame[21]]), 2500);
        assert!(frame[22..].iter().all(|&b| b == 0));
    }

    #[test]
    fn test_timer_frame_layout() {
        let frame = encode_timer_frame(CODE_SHOT, 3, 1, 512, 87);

        assert_eq!(frame[0], 0x6C);
        assert_eq!(frame[1], 0x03);
        assert_eq!(u16::from_be_bytes([frame[2], frame[3]]), 3);
        assert_eq!(u16::from_be_bytes([frame[4], frame[5]]), 1);
        assert_eq!(u16::from_be_bytes([frame[6], frame[7]]), 512);
        assert_eq!(u16::from_be_bytes([frame[8], frame[9]]), 87);
        assert_eq!(&frame[10..], &[0, 0]);
    }

    #[test]
    fn test_to_centiseconds() {
        assert_eq!(to_centiseconds(5.12), 512);
        assert_eq!(to_centiseconds(0.0), 0);
        assert_eq!(to_centiseconds(1000.0), u16::MAX);
    }
}
