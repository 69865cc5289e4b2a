//! X10 RF remotes and switches (310/433 MHz)
//!
//! Row 0 is the sync pulse; row 1 carries 32 bits where byte 1 is the
//! complement of byte 0 and byte 3 the complement of byte 2, much like the
//! NEC IR protocol. A few bits in each byte are constant.

use crate::bitbuffer::Packet;
use crate::decoder::{DecodeContext, DecodeResult, DecoderInfo, Modulation, Timing};
use crate::error::Rejection;
use crate::reading::Reading;

const NAME: &str = "x10_rf";
const MESSAGE_BITS: usize = 32;

const CONST_MASK: [u8; 4] = [0x0B, 0x0B, 0x07, 0x07];
const CONST_VALUE: [u8; 4] = [0x00, 0x0B, 0x00, 0x07];

pub const DECODER: DecoderInfo = DecoderInfo {
    key: NAME,
    name: "X10 RF",
    modulation: Modulation::OokPulsePpm,
    timing: Timing {
        short_us: 562,
        long_us: 1687,
        sync_us: 0,
        gap_us: 2200,
        reset_us: 6000,
        tolerance_us: 0,
    },
    decode_fn: decode,
    fields: &["model", "id", "channel", "state", "data"],
    enabled_by_default: false,
};

pub fn decode(packet: &Packet, ctx: &DecodeContext<'_>) -> DecodeResult {
    let bits = packet.bits_per_row(1);
    if bits != MESSAGE_BITS {
        ctx.report(NAME, format_args!("message length {}", bits));
        return Rejection::AbortLength.into();
    }
    let b: [u8; 4] = packet.rows()[1].array_at(0);

    if b[0] ^ b[1] != 0xFF || b[2] ^ b[3] != 0xFF {
        ctx.report(NAME, format_args!("complement mismatch {}", hex::encode(b)));
        return Rejection::FailSanity.into();
    }
    if (0..4).any(|i| b[i] & CONST_MASK[i] != CONST_VALUE[i]) {
        ctx.report(NAME, format_args!("constant bits wrong {}", hex::encode(b)));
        return Rejection::FailSanity.into();
    }

    let h: [u8; 4] = std::array::from_fn(|i| (b[0] >> (7 - i)) & 1);
    let house = ((!(h[0] ^ h[1]) & 1) << 3) | ((!h[1] & 1) << 2) | (((h[1] ^ h[2]) & 1) << 1) | h[3];
    let house_code = char::from(b'A' + house);

    let mut unit = (((b[0] & 0x04) << 1) | ((b[2] & 0x40) >> 4) | ((b[2] & 0x08) >> 2) | ((b[2] & 0x10) >> 4)) + 1;

    let state = if b[2] & 0x80 != 0 {
        // dim and bright address no single unit
        unit = 0;
        if b[2] & 0x10 != 0 {
            "DIM"
        } else {
            "BRI"
        }
    } else if b[2] & 0x20 == 0 {
        "ON"
    } else {
        "OFF"
    };
    ctx.report(NAME, format_args!("{}{} {}", house_code, unit, state));

    DecodeResult::Emit(
        Reading::new("X10-RF")
            .with("id", "", unit)
            .with("channel", "", house_code.to_string())
            .with("state", "State", state)
            .with_fmt("data", "Data", "%08x", u32::from_be_bytes(b)),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reading::FieldValue;

    fn decode_str(s: &str) -> DecodeResult {
        decode(&s.parse().unwrap(), &DecodeContext::default())
    }

    #[test]
    fn test_on_command() {
        let result = decode_str("{1}0 / {32}609f00ff");
        let reading = result.reading().unwrap();

        assert_eq!(reading.get("id"), Some(&FieldValue::UInt(1)));
        assert_eq!(reading.get("channel"), Some(&FieldValue::from("A")));
        assert_eq!(reading.get("state"), Some(&FieldValue::from("ON")));
        assert_eq!(reading.fields()[4].render(), "609f00ff");
    }

    #[test]
    fn test_dim_command() {
        let result = decode_str("{1}0 / {32}00ff906f");
        let reading = result.reading().unwrap();

        assert_eq!(reading.get("id"), Some(&FieldValue::UInt(0)));
        assert_eq!(reading.get("channel"), Some(&FieldValue::from("M")));
        assert_eq!(reading.get("state"), Some(&FieldValue::from("DIM")));
    }

    #[test]
    fn test_rejections() {
        assert_eq!(
            decode_str("{1}0 / {31}609f00fe"),
            DecodeResult::Rejected(Rejection::AbortLength)
        );
        assert_eq!(
            decode_str("{1}0 / {32}609e00ff"),
            DecodeResult::Rejected(Rejection::FailSanity)
        );
        // complements fine, constant bit 0x01 of byte 0 is allowed but 0x02 is not
        assert_eq!(
            decode_str("{1}0 / {32}629d00ff"),
            DecodeResult::Rejected(Rejection::FailSanity)
        );
    }
}
