//! Line-code transforms: Manchester, start/stop framing, inversion
//!
//! Manchester convention used throughout: a `10` pair is a logical 1 and a
//! `01` pair is a logical 0. Protocols documented with the opposite polarity
//! decode the inverted row.

use crate::bitbuffer::{BitRow, Packet};
use crate::error::Rejection;
use crate::fields::extract_bits;

/// Bits per start/stop framed byte: start bit, eight data bits, stop bit
pub const FRAME_BITS: usize = 10;

/// Result of a Manchester pass over part of a row
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Manchester {
    /// Decoded bits, one per input pair
    pub bits: BitRow,
    /// Number of `00`/`11` pairs seen
    pub errors: usize,
    /// Output bit index of the first invalid pair
    pub first_error: Option<usize>,
}

impl Manchester {
    /// Bits decoded before the first invalid pair
    pub fn valid_bits(&self) -> usize {
        self.first_error.unwrap_or(self.bits.len())
    }
}

/// Decode Manchester pairs from bit `start`, producing at most `max_bits`.
///
/// Invalid pairs do not stop decoding: the first half of the pair is kept,
/// the error is counted and the caller decides whether that is fatal.
pub fn manchester_decode(row: &BitRow, start: usize, max_bits: usize) -> Manchester {
    let mut out = Manchester {
        bits: BitRow::default(),
        errors: 0,
        first_error: None,
    };

    let mut pos = start;
    while pos + 2 <= row.len() && out.bits.len() < max_bits {
        let first = row.bit(pos);
        if first == row.bit(pos + 1) {
            out.errors += 1;
            out.first_error.get_or_insert(out.bits.len());
        }
        out.bits.push_bit(first);
        pos += 2;
    }

    out
}

/// Manchester-encode every bit of `bits` (1 -> `10`, 0 -> `01`)
pub fn manchester_encode(bits: &BitRow) -> BitRow {
    let mut out = BitRow::default();
    for i in 0..bits.len() {
        let bit = bits.bit(i);
        out.push_bit(bit);
        out.push_bit(bit ^ 1);
    }
    out
}

/// Strip start/stop framing between bit `start` and bit `end`.
///
/// Each group is a 0 start bit, eight data bits (returned as read, MSB
/// first) and a 1 stop bit. Decoding stops quietly when less than a full
/// group remains; a wrong start or stop bit is a sanity failure.
pub fn strip_start_stop(row: &BitRow, start: usize, end: usize) -> Result<Vec<u8>, Rejection> {
    let end = end.min(row.len());
    let mut bytes = Vec::with_capacity(end.saturating_sub(start) / FRAME_BITS);

    let mut pos = start;
    while pos + FRAME_BITS <= end {
        if row.bit(pos) != 0 || row.bit(pos + FRAME_BITS - 1) != 1 {
            return Err(Rejection::FailSanity);
        }
        bytes.push(extract_bits(row, pos + 1, 8) as u8);
        pos += FRAME_BITS;
    }

    Ok(bytes)
}

/// Copy of the packet with every bit of every row flipped
pub fn invert(packet: &Packet) -> Packet {
    let mut packet = packet.clone();
    packet.invert();
    packet
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_manchester_round_trip_is_clean() {
        let data = BitRow::from_bytes(&[0x14, 0x32, 0x55, 0xC1, 0xFF, 0x00]);
        let decoded = manchester_decode(&manchester_encode(&data), 0, usize::MAX);
        assert_eq!(decoded.bits, data);
        assert_eq!(decoded.errors, 0);
        assert_eq!(decoded.first_error, None);
    }

    #[test]
    fn test_manchester_polarity() {
        // 10 01 10 10 -> 1011
        let row = BitRow::new(vec![0x9A], 8);
        let decoded = manchester_decode(&row, 0, usize::MAX);
        assert_eq!(decoded.bits, BitRow::new(vec![0xB0], 4));
    }

    #[test]
    fn test_manchester_counts_errors_and_continues() {
        // 10 11 01 00 10
        let row = BitRow::new(vec![0xB4, 0x80], 10);
        let decoded = manchester_decode(&row, 0, usize::MAX);
        assert_eq!(decoded.bits.len(), 5);
        assert_eq!(decoded.errors, 2);
        assert_eq!(decoded.first_error, Some(1));
        assert_eq!(decoded.valid_bits(), 1);
    }

    #[test]
    fn test_manchester_limits() {
        let row = manchester_encode(&BitRow::from_bytes(&[0xAB, 0xCD]));
        let decoded = manchester_decode(&row, 16, 4);
        assert_eq!(decoded.bits, BitRow::new(vec![0xC0], 4));

        // trailing half pair is ignored
        let odd = row.slice(0, 5);
        assert_eq!(manchester_decode(&odd, 0, usize::MAX).bits.len(), 2);
    }

    #[test]
    fn test_strip_start_stop() {
        // 0 10101010 1 | 0 11110000 1 | 01
        let mut row = BitRow::default();
        for group in [0xAAu8, 0xF0] {
            row.push_bit(0);
            row.push_byte(group);
            row.push_bit(1);
        }
        row.push_bit(0);
        row.push_bit(1);

        assert_eq!(strip_start_stop(&row, 0, row.len()), Ok(vec![0xAA, 0xF0]));
        assert_eq!(strip_start_stop(&row, 0, 19), Ok(vec![0xAA]));
    }

    #[test]
    fn test_strip_start_stop_rejects_bad_framing() {
        let mut row = BitRow::default();
        row.push_bit(0);
        row.push_byte(0x12);
        row.push_bit(0);
        assert_eq!(
            strip_start_stop(&row, 0, row.len()),
            Err(Rejection::FailSanity)
        );

        let mut row = BitRow::default();
        row.push_bit(1);
        row.push_byte(0x12);
        row.push_bit(1);
        assert_eq!(
            strip_start_stop(&row, 0, row.len()),
            Err(Rejection::FailSanity)
        );
    }

    #[test]
    fn test_invert_packet() {
        let packet: Packet = "{4}a / {12}0f0".parse().unwrap();
        let inverted = invert(&packet);
        assert_eq!(inverted.to_string(), "{4}50 / {12}f0f0");
        assert_eq!(invert(&inverted), packet);
    }
}
