//! Bit rows and packets as handed over by the demodulator
//!
//! A row is one repetition of a transmitted message. A packet is the set of
//! rows captured for a single burst. Bits are addressed MSB-first: bit 0 is
//! the top bit of byte 0.

use crate::error::BitRowParseError;
use std::fmt;
use std::str::FromStr;

/// A bounded sequence of bits packed MSB-first into bytes.
///
/// Bits past `len()` in the last byte are always zero, so two rows compare
/// equal exactly when they carry the same bits.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct BitRow {
    bytes: Vec<u8>,
    bits: usize,
}

impl BitRow {
    /// Build a row from packed bytes, keeping only the first `bits` bits
    pub fn new(mut bytes: Vec<u8>, bits: usize) -> Self {
        bytes.resize(bits.div_ceil(8), 0);
        let mut row = Self { bytes, bits };
        row.mask_tail();
        row
    }

    /// Build a row holding every bit of `bytes`
    pub fn from_bytes(bytes: &[u8]) -> Self {
        Self::new(bytes.to_vec(), bytes.len() * 8)
    }

    pub fn len(&self) -> usize {
        self.bits
    }

    pub fn is_empty(&self) -> bool {
        self.bits == 0
    }

    /// Packed bytes; the last one may be partial
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Single bit at `idx`, zero past the end
    pub fn bit(&self, idx: usize) -> u8 {
        if idx >= self.bits {
            return 0;
        }
        (self.bytes[idx / 8] >> (7 - idx % 8)) & 1
    }

    /// Eight bits starting at an arbitrary bit offset.
    ///
    /// Reads past the end of the row yield zero bits.
    pub fn byte_at(&self, offset: usize) -> u8 {
        let idx = offset / 8;
        let shift = offset % 8;
        let hi = self.bytes.get(idx).copied().unwrap_or(0);
        if shift == 0 {
            return hi;
        }
        let lo = self.bytes.get(idx + 1).copied().unwrap_or(0);
        (hi << shift) | (lo >> (8 - shift))
    }

    /// Fixed-size byte window starting at a bit offset, zero padded
    pub fn array_at<const N: usize>(&self, offset: usize) -> [u8; N] {
        std::array::from_fn(|i| self.byte_at(offset + i * 8))
    }

    /// Copy `num_bits` bits starting at `offset` into fresh bytes
    pub fn extract_bytes(&self, offset: usize, num_bits: usize) -> Vec<u8> {
        let mut out: Vec<u8> = (0..num_bits.div_ceil(8))
            .map(|i| self.byte_at(offset + i * 8))
            .collect();
        if num_bits % 8 != 0 {
            if let Some(last) = out.last_mut() {
                *last &= 0xFF << (8 - num_bits % 8);
            }
        }
        out
    }

    /// Sub-row of `num_bits` bits starting at `offset`
    pub fn slice(&self, offset: usize, num_bits: usize) -> BitRow {
        let num_bits = num_bits.min(self.bits.saturating_sub(offset));
        BitRow::new(self.extract_bytes(offset, num_bits), num_bits)
    }

    pub fn push_bit(&mut self, bit: u8) {
        if self.bits % 8 == 0 {
            self.bytes.push(0);
        }
        if bit & 1 != 0 {
            self.bytes[self.bits / 8] |= 0x80 >> (self.bits % 8);
        }
        self.bits += 1;
    }

    pub fn push_byte(&mut self, byte: u8) {
        for i in (0..8).rev() {
            self.push_bit((byte >> i) & 1);
        }
    }

    /// Append every bit of another row
    pub fn extend_from(&mut self, other: &BitRow) {
        for i in 0..other.len() {
            self.push_bit(other.bit(i));
        }
    }

    /// Flip every bit in place
    pub fn invert(&mut self) {
        for b in &mut self.bytes {
            *b = !*b;
        }
        self.mask_tail();
    }

    pub fn inverted(&self) -> BitRow {
        let mut row = self.clone();
        row.invert();
        row
    }

    /// Search for `pattern` (its first `pattern_bits` bits) from bit `start`.
    ///
    /// Returns the bit offset immediately after the first match.
    pub fn search(&self, start: usize, pattern: &[u8], pattern_bits: usize) -> Option<usize> {
        let pattern = BitRow::new(pattern.to_vec(), pattern_bits);
        let mut pos = start;
        while pos + pattern_bits <= self.bits {
            if (0..pattern_bits).all(|i| self.bit(pos + i) == pattern.bit(i)) {
                return Some(pos + pattern_bits);
            }
            pos += 1;
        }
        None
    }

    /// True if both rows agree on their first `bits` bits and are long enough
    pub fn prefix_eq(&self, other: &BitRow, bits: usize) -> bool {
        self.bits >= bits
            && other.bits >= bits
            && self.extract_bytes(0, bits) == other.extract_bytes(0, bits)
    }

    pub fn to_hex(&self) -> String {
        hex::encode(&self.bytes)
    }

    fn mask_tail(&mut self) {
        if self.bits % 8 != 0 {
            if let Some(last) = self.bytes.last_mut() {
                *last &= 0xFF << (8 - self.bits % 8);
            }
        }
    }
}

impl fmt::Display for BitRow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{{}}}{}", self.bits, self.to_hex())
    }
}

/// Parses `{bits}hex` or bare hex (every digit counts as four bits)
impl FromStr for BitRow {
    type Err = BitRowParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let (declared, digits) = match s.strip_prefix('{') {
            Some(rest) => {
                let (len, digits) = rest
                    .split_once('}')
                    .ok_or(BitRowParseError::UnterminatedLength)?;
                let len = len
                    .trim()
                    .parse::<usize>()
                    .map_err(|_| BitRowParseError::InvalidLength(len.to_string()))?;
                (Some(len), digits)
            }
            None => (None, s),
        };

        let mut digits: String = digits.chars().filter(|c| !c.is_whitespace()).collect();
        let available = digits.len() * 4;
        if digits.len() % 2 != 0 {
            digits.push('0');
        }
        let bytes = hex::decode(&digits)?;

        let bits = match declared {
            Some(bits) if bits > available => {
                return Err(BitRowParseError::TooShort {
                    declared: bits,
                    available,
                })
            }
            Some(bits) => bits,
            None => available,
        };
        Ok(BitRow::new(bytes, bits))
    }
}

/// All rows captured for one burst
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Packet {
    rows: Vec<BitRow>,
}

impl Packet {
    pub fn new(rows: Vec<BitRow>) -> Self {
        Self { rows }
    }

    pub fn from_row(row: BitRow) -> Self {
        Self { rows: vec![row] }
    }

    pub fn rows(&self) -> &[BitRow] {
        &self.rows
    }

    pub fn num_rows(&self) -> usize {
        self.rows.len()
    }

    pub fn row(&self, idx: usize) -> Option<&BitRow> {
        self.rows.get(idx)
    }

    /// Bit length of a row, zero when the row does not exist
    pub fn bits_per_row(&self, idx: usize) -> usize {
        self.rows.get(idx).map_or(0, BitRow::len)
    }

    pub fn invert(&mut self) {
        self.rows.iter_mut().for_each(BitRow::invert);
    }

    /// Index of the first row of at least `min_bits` bits that occurs at
    /// least `min_repeats` times (counting itself) with identical content.
    pub fn find_repeated_row(&self, min_repeats: usize, min_bits: usize) -> Option<usize> {
        self.find_repeated_by(min_repeats, min_bits, |a, b| a == b)
    }

    /// Like [`Packet::find_repeated_row`] but only the first `prefix_bits`
    /// bits have to agree; trailing bits and total length may differ.
    pub fn find_repeated_prefix(&self, min_repeats: usize, prefix_bits: usize) -> Option<usize> {
        self.find_repeated_by(min_repeats, prefix_bits, |a, b| {
            a.prefix_eq(b, prefix_bits)
        })
    }

    fn find_repeated_by<F>(&self, min_repeats: usize, min_bits: usize, same: F) -> Option<usize>
    where
        F: Fn(&BitRow, &BitRow) -> bool,
    {
        self.rows.iter().enumerate().find_map(|(i, row)| {
            if row.len() < min_bits {
                return None;
            }
            let count = 1 + self.rows[i + 1..]
                .iter()
                .filter(|other| same(row, other))
                .count();
            (count >= min_repeats).then_some(i)
        })
    }
}

impl fmt::Display for Packet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, row) in self.rows.iter().enumerate() {
            if i > 0 {
                f.write_str(" / ")?;
            }
            write!(f, "{}", row)?;
        }
        Ok(())
    }
}

/// Rows separated by `/`
impl FromStr for Packet {
    type Err = BitRowParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.trim().is_empty() {
            return Err(BitRowParseError::EmptyPacket);
        }
        let rows = s
            .split('/')
            .map(str::parse)
            .collect::<Result<Vec<BitRow>, _>>()?;
        Ok(Packet::new(rows))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_row_with_length() {
        let row: BitRow = "{21}f372b0".parse().unwrap();
        assert_eq!(row.len(), 21);
        // trailing bits beyond 21 are cleared
        assert_eq!(row.as_bytes(), &[0xf3, 0x72, 0xb0]);

        let row: BitRow = "{12}abc".parse().unwrap();
        assert_eq!(row.as_bytes(), &[0xab, 0xc0]);
    }

    #[test]
    fn test_parse_bare_hex_and_errors() {
        let row: BitRow = "a1 f8".parse().unwrap();
        assert_eq!(row.len(), 16);

        assert_eq!(
            "{40}abcd".parse::<BitRow>(),
            Err(BitRowParseError::TooShort {
                declared: 40,
                available: 16
            })
        );
        assert_eq!(
            "{12abc".parse::<BitRow>(),
            Err(BitRowParseError::UnterminatedLength)
        );
        assert!("{x}ab".parse::<BitRow>().is_err());
        assert!("zz".parse::<BitRow>().is_err());
    }

    #[test]
    fn test_empty_row() {
        let row: BitRow = "{0}".parse().unwrap();
        assert!(row.is_empty());
        assert_eq!(row.to_string(), "{0}");
    }

    #[test]
    fn test_byte_at_unaligned() {
        let row = BitRow::from_bytes(&[0x12, 0x34]);
        assert_eq!(row.byte_at(0), 0x12);
        assert_eq!(row.byte_at(4), 0x23);
        assert_eq!(row.byte_at(12), 0x40);
        assert_eq!(row.byte_at(16), 0x00);
        assert_eq!(row.array_at::<3>(4), [0x23, 0x40, 0x00]);
    }

    #[test]
    fn test_extract_bytes_masks_tail() {
        let row = BitRow::from_bytes(&[0xff, 0xff]);
        assert_eq!(row.extract_bytes(3, 10), vec![0xff, 0xc0]);
        assert_eq!(row.slice(3, 100).len(), 13);
    }

    #[test]
    fn test_push_and_invert() {
        let mut row = BitRow::default();
        row.push_byte(0xa5);
        row.push_bit(1);
        assert_eq!(row.len(), 9);
        assert_eq!(row.as_bytes(), &[0xa5, 0x80]);

        row.invert();
        assert_eq!(row.as_bytes(), &[0x5a, 0x00]);
    }

    #[test]
    fn test_search() {
        let row = BitRow::from_bytes(&[0x00, 0x55, 0x5f, 0xf0, 0x04, 0xaa]);
        assert_eq!(row.search(0, &[0x55, 0x5f, 0xf0, 0x04], 30), Some(38));
        assert_eq!(row.search(0, &[0x0a, 0xaa], 12), Some(17));
        assert_eq!(row.search(39, &[0x55, 0x5f, 0xf0, 0x04], 30), None);
        assert_eq!(row.search(0, &[0xff, 0xff], 16), None);
    }

    #[test]
    fn test_find_repeated_row_threshold() {
        let good: BitRow = "{36}9080baa3a".parse().unwrap();
        let bad: BitRow = "{36}9080baa3b".parse().unwrap();

        let mut rows = vec![good.clone(); 11];
        rows.insert(4, bad);
        let packet = Packet::new(rows);

        assert_eq!(packet.find_repeated_row(11, 36), Some(0));
        assert_eq!(packet.find_repeated_row(12, 36), None);
        assert_eq!(packet.find_repeated_row(2, 37), None);
    }

    #[test]
    fn test_find_repeated_row_skips_short_rows() {
        let packet: Packet = "{4}f / {33}12345cbc8 / {33}12345cbc8 / {33}12345cbc8"
            .parse()
            .unwrap();
        assert_eq!(packet.num_rows(), 4);
        assert_eq!(packet.find_repeated_row(3, 33), Some(1));
    }

    #[test]
    fn test_find_repeated_prefix() {
        let packet: Packet = "{65}a1f88cf6ff3506550 / {66}a1f88cf6ff3506554"
            .parse()
            .unwrap();
        assert_eq!(packet.find_repeated_row(2, 64), None);
        assert_eq!(packet.find_repeated_prefix(2, 64), Some(0));
        assert_eq!(packet.find_repeated_prefix(3, 64), None);
    }

    #[test]
    fn test_packet_display() {
        let packet: Packet = "{0} / {21}f372b0".parse().unwrap();
        assert_eq!(packet.to_string(), "{0} / {21}f372b0");
        assert_eq!(packet.bits_per_row(1), 21);
        assert_eq!(packet.bits_per_row(7), 0);
        assert!("  ".parse::<Packet>().is_err());
    }
}
