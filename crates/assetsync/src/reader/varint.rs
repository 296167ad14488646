//! Zig-zag variable-length integers with a rearranged first byte
//!
//! Manifest integers are stored as zig-zag coded little-endian base-128
//! groups, like LEB128, except that the first byte on the wire carries its
//! payload shifted: bit 6 holds the lowest payload bit (the zig-zag sign)
//! and bits 0-5 hold payload bits 1-6. Bit 7 stays the continuation flag.
//! Every following byte is a plain `continuation | 7 payload bits` byte.

/// Maximum number of bytes a 64-bit value can occupy.
pub const MAX_VARINT_LEN: usize = 10;

/// Undo the first-byte bit layout so the byte can be read as a plain
/// base-128 group.
///
/// Bit 7 is kept in place, bit 6 moves to bit 0 and bits 0-5 move up by one.
#[inline]
pub fn unscramble_first_byte(byte: u8) -> u8 {
    let seventh = (byte & 0x40) >> 6;
    let msb = (byte & 0x80) >> 7;
    let shifted = (u16::from(byte) << 1) & !0x181;
    (shifted as u8) | (msb << 7) | seventh
}

/// Inverse of [`unscramble_first_byte`]: lay out a plain base-128 group the
/// way the first byte is stored on the wire.
#[inline]
pub fn scramble_first_byte(byte: u8) -> u8 {
    (byte & 0x80) | ((byte & 0x01) << 6) | ((byte >> 1) & 0x3f)
}

/// Map a signed value onto an unsigned one so that small magnitudes stay
/// small. 0 -> 0, -1 -> 1, 1 -> 2, -2 -> 3, ...
#[inline]
pub fn zigzag_encode(value: i64) -> u64 {
    ((value << 1) ^ (value >> 63)) as u64
}

/// Inverse of [`zigzag_encode`].
#[inline]
pub fn zigzag_decode(raw: u64) -> i64 {
    ((raw >> 1) as i64) ^ -((raw & 1) as i64)
}

/// Encode `value` in the manifest varint format.
pub fn encode_var_int(value: i64) -> Vec<u8> {
    let mut raw = zigzag_encode(value);
    let mut out = Vec::with_capacity(MAX_VARINT_LEN);
    loop {
        let mut byte = (raw & 0x7f) as u8;
        raw >>= 7;
        if raw != 0 {
            byte |= 0x80;
        }
        out.push(byte);
        if raw == 0 {
            break;
        }
    }
    out[0] = scramble_first_byte(out[0]);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unscramble_moves_bit_six_to_bit_zero() {
        assert_eq!(unscramble_first_byte(0x40), 0x01);
        assert_eq!(unscramble_first_byte(0x01), 0x02);
        assert_eq!(unscramble_first_byte(0x3f), 0x7e);
        assert_eq!(unscramble_first_byte(0x7f), 0x7f);
    }

    #[test]
    fn test_unscramble_keeps_continuation_bit() {
        assert_eq!(unscramble_first_byte(0x80), 0x80);
        assert_eq!(unscramble_first_byte(0xc0), 0x81);
        assert_eq!(unscramble_first_byte(0xff), 0xff);
        assert_eq!(unscramble_first_byte(0x00), 0x00);
    }

    #[test]
    fn test_scramble_is_inverse_for_every_byte() {
        for byte in 0..=u8::MAX {
            assert_eq!(unscramble_first_byte(scramble_first_byte(byte)), byte);
            assert_eq!(scramble_first_byte(unscramble_first_byte(byte)), byte);
        }
    }

    #[test]
    fn test_zigzag_small_values() {
        assert_eq!(zigzag_encode(0), 0);
        assert_eq!(zigzag_encode(-1), 1);
        assert_eq!(zigzag_encode(1), 2);
        assert_eq!(zigzag_encode(-2), 3);
        assert_eq!(zigzag_decode(3), -2);
        assert_eq!(zigzag_decode(4), 2);
    }

    #[test]
    fn test_zigzag_extremes() {
        for value in [i64::MIN, i64::MAX, i64::MIN + 1, i64::MAX - 1] {
            assert_eq!(zigzag_decode(zigzag_encode(value)), value);
        }
    }

    #[test]
    fn test_encode_known_bytes() {
        assert_eq!(encode_var_int(0), vec![0x00]);
        assert_eq!(encode_var_int(1), vec![0x01]);
        assert_eq!(encode_var_int(-1), vec![0x40]);
        assert_eq!(encode_var_int(2), vec![0x02]);
        assert_eq!(encode_var_int(-2), vec![0x41]);
        // 64 zig-zags to 128, which spills into a second group
        assert_eq!(encode_var_int(64), vec![0x80, 0x01]);
    }

    #[test]
    fn test_encode_length_bounds() {
        assert_eq!(encode_var_int(63).len(), 1);
        assert_eq!(encode_var_int(-64).len(), 1);
        assert_eq!(encode_var_int(i64::MIN).len(), MAX_VARINT_LEN);
        assert_eq!(encode_var_int(i64::MAX).len(), MAX_VARINT_LEN);
    }
}
