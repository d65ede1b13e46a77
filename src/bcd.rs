//! Packed binary-coded-decimal conversion.
//!
//! Every time register of the SD2405 stores its value as two BCD digits:
//! the tens digit in bits 7-4 and the ones digit in bits 3-0.

/// Packs a decimal value into a BCD byte.
///
/// Values above 99 are not rejected: the tens digit simply spills into the
/// high nibble. The hour register relies on this, `decimal_to_bcd(hour + 80)`
/// is the hour with bit 7 set.
pub const fn decimal_to_bcd(value: u8) -> u8 {
    ((value / 10) << 4) | (value % 10)
}

/// Unpacks a BCD byte into its decimal value (0-99 for well formed input).
pub const fn bcd_to_decimal(bcd: u8) -> u8 {
    (bcd >> 4) * 10 + (bcd & 0x0F)
}

/// Returns `true` when both nibbles hold a decimal digit.
pub const fn is_bcd(byte: u8) -> bool {
    (byte >> 4) <= 9 && (byte & 0x0F) <= 9
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_roundtrip_all_decimal_values() {
        for value in 0..=99u8 {
            let bcd = decimal_to_bcd(value);
            assert!(is_bcd(bcd), "{} encoded to non-BCD {:#04x}", value, bcd);
            assert_eq!(bcd_to_decimal(bcd), value);
        }
    }

    #[test]
    fn test_known_encodings() {
        assert_eq!(decimal_to_bcd(0), 0x00);
        assert_eq!(decimal_to_bcd(9), 0x09);
        assert_eq!(decimal_to_bcd(10), 0x10);
        assert_eq!(decimal_to_bcd(45), 0x45);
        assert_eq!(decimal_to_bcd(99), 0x99);
        assert_eq!(bcd_to_decimal(0x59), 59);
        assert_eq!(bcd_to_decimal(0x31), 31);
    }

    #[test]
    fn test_hour_offset_sets_high_bit() {
        for hour in 0..=23u8 {
            let encoded = decimal_to_bcd(hour + 80);
            assert_eq!(encoded & 0x80, 0x80);
            assert_eq!(encoded, decimal_to_bcd(hour) | 0x80);
            assert_eq!(bcd_to_decimal(encoded & 0x7F), hour);
        }
        assert_eq!(decimal_to_bcd(23 + 80), 0xA3);
    }

    #[test]
    fn test_is_bcd() {
        assert!(is_bcd(0x00));
        assert!(is_bcd(0x99));
        assert!(!is_bcd(0x0A));
        assert!(!is_bcd(0xA0));
        assert!(!is_bcd(0xFF));
    }
}
