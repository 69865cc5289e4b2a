//! Field extraction helpers shared by the device decoders

use crate::bitbuffer::BitRow;

/// Unsigned field of up to 32 bits at an arbitrary bit offset (MSB-first)
pub fn extract_bits(row: &BitRow, offset: usize, width: usize) -> u32 {
    debug_assert!(width <= 32);
    (0..width).fold(0u32, |acc, i| (acc << 1) | u32::from(row.bit(offset + i)))
}

/// Two's-complement field of up to 32 bits
pub fn extract_signed(row: &BitRow, offset: usize, width: usize) -> i32 {
    sign_extend(extract_bits(row, offset, width), width)
}

/// Interpret the low `width` bits of `value` as two's complement
pub fn sign_extend(value: u32, width: usize) -> i32 {
    if width == 0 || width >= 32 {
        return value as i32;
    }
    let shift = 32 - width as u32;
    ((value << shift) as i32) >> shift
}

/// Sign-extend a narrow field held in the low bits of a 16-bit container.
///
/// The value is shifted to the top of the container and back down with an
/// arithmetic shift, so a 12-bit 0xFFF becomes -1.
pub fn sign_extend_16(raw: u16, width: u32) -> i16 {
    let shift = 16 - width.min(16);
    ((raw << shift) as i16) >> shift
}

/// Reverse the bit order within a nibble, independently for both nibbles
pub fn reflect4(x: u8) -> u8 {
    let x = ((x & 0xCC) >> 2) | ((x & 0x33) << 2);
    ((x & 0xAA) >> 1) | ((x & 0x55) << 1)
}

pub fn reflect_nibbles(data: &mut [u8]) {
    for b in data {
        *b = reflect4(*b);
    }
}

pub fn swap_nibbles(x: u8) -> u8 {
    x.rotate_left(4)
}

/// Both nibbles are decimal digits
pub fn is_bcd(x: u8) -> bool {
    x >> 4 <= 9 && x & 0x0F <= 9
}

/// Two packed BCD digits as a number
pub fn bcd_value(x: u8) -> u8 {
    (x >> 4) * 10 + (x & 0x0F)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sign_extend_12_bit() {
        assert_eq!(sign_extend_16(0x0FFF, 12), -1);
        assert_eq!(sign_extend_16(0x07FF, 12), 2047);
        assert_eq!(sign_extend_16(0x0800, 12), -2048);
        assert_eq!(sign_extend_16(0x00BA, 12), 186);
        assert_eq!(sign_extend(0xFFF, 12), -1);
        assert_eq!(sign_extend(0x7F, 8), 127);
    }

    #[test]
    fn test_extract_bits() {
        let row = BitRow::from_bytes(&[0x90, 0x8F, 0xFF]);
        assert_eq!(extract_bits(&row, 0, 8), 0x90);
        assert_eq!(extract_bits(&row, 12, 12), 0xFFF);
        assert_eq!(extract_signed(&row, 12, 12), -1);
        assert_eq!(extract_bits(&row, 20, 8), 0xF0);
    }

    #[test]
    fn test_reflect4() {
        assert_eq!(reflect4(0xC8), 0x31);
        assert_eq!(reflect4(0x72), 0xE4);
        assert_eq!(reflect4(reflect4(0x5A)), 0x5A);

        let mut data = [0x1D, 0x20];
        reflect_nibbles(&mut data);
        assert_eq!(data, [0x8B, 0x40]);
    }

    #[test]
    fn test_nibble_and_bcd() {
        assert_eq!(swap_nibbles(0x27), 0x72);
        assert!(is_bcd(0x59));
        assert!(!is_bcd(0x5A));
        assert_eq!(bcd_value(0x76), 76);
    }
}
