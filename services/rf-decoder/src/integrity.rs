//! Checksums and CRCs used by the device protocols
//!
//! All CRCs here are the plain MSB-first shift-register kind with no final
//! XOR and no reflection; the devices that need anything else say so at the
//! call site.

/// XOR of all bytes
pub fn xor_bytes(data: &[u8]) -> u8 {
    data.iter().fold(0, |acc, b| acc ^ b)
}

/// XOR of all nibbles, result in the low nibble
pub fn xor_nibbles(data: &[u8]) -> u8 {
    data.iter().fold(0, |acc, b| acc ^ (b >> 4) ^ (b & 0x0F))
}

/// Sum of all bytes without truncation
pub fn add_bytes(data: &[u8]) -> u32 {
    data.iter().map(|&b| u32::from(b)).sum()
}

/// Sum of all nibbles without truncation
pub fn add_nibbles(data: &[u8]) -> u32 {
    data.iter().map(|&b| u32::from(b >> 4) + u32::from(b & 0x0F)).sum()
}

/// Sum of all bytes modulo 256.
///
/// Messages that carry a two's-complement checksum byte sum to zero.
pub fn byte_sum(data: &[u8]) -> u8 {
    data.iter().fold(0u8, |acc, &b| acc.wrapping_add(b))
}

/// Which part of the check byte an XOR check covers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum XorCheck {
    Full,
    LowNibble,
}

/// XOR the first `len` bytes and compare against the byte that follows
pub fn verify_xor(data: &[u8], len: usize, check: XorCheck) -> bool {
    let (Some(prefix), Some(&expected)) = (data.get(..len), data.get(len)) else {
        return false;
    };
    let diff = xor_bytes(prefix) ^ expected;
    match check {
        XorCheck::Full => diff == 0,
        XorCheck::LowNibble => diff & 0x0F == 0,
    }
}

/// CRC-8, MSB-first, no final XOR
pub fn crc8(data: &[u8], poly: u8, init: u8) -> u8 {
    let mut crc = init;

    for &byte in data {
        crc ^= byte;

        for _ in 0..8 {
            if crc & 0x80 != 0 {
                crc = (crc << 1) ^ poly;
            } else {
                crc <<= 1;
            }
        }
    }

    crc
}

/// CRC-16, MSB-first, no final XOR
pub fn crc16(data: &[u8], poly: u16, init: u16) -> u16 {
    let mut crc = init;

    for &byte in data {
        crc ^= u16::from(byte) << 8;

        for _ in 0..8 {
            if crc & 0x8000 != 0 {
                crc = (crc << 1) ^ poly;
            } else {
                crc <<= 1;
            }
        }
    }

    crc
}
