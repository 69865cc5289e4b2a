//! Auriol AFW2A1 temperature/humidity sensor
//!
//! Twelve identical 36-bit rows per burst:
//!
//! ```text
//! IIIIIIII CCCC TTTTTTTTTTTT 1010 HHHHHHHH
//! ```
//! I = id, C = battery/button/channel, T = signed temperature in 0.1 C,
//! 1010 fixed, H = humidity.

use crate::bitbuffer::Packet;
use crate::decoder::{DecodeContext, DecodeResult, DecoderInfo, Modulation, Timing};
use crate::error::Rejection;
use crate::fields::sign_extend_16;
use crate::reading::Reading;

const NAME: &str = "auriol_afw2a1";
const ROWS: usize = 12;
const ROW_BITS: usize = 36;

pub const DECODER: DecoderInfo = DecoderInfo {
    key: NAME,
    name: "Auriol AFW2A1 temperature/humidity sensor",
    modulation: Modulation::OokPulsePpm,
    timing: Timing {
        short_us: 576,
        long_us: 1536,
        sync_us: 0,
        gap_us: 2012,
        reset_us: 3954,
        tolerance_us: 0,
    },
    decode_fn: decode,
    fields: &[
        "model",
        "id",
        "channel",
        "battery_ok",
        "button",
        "temperature_C",
        "humidity",
    ],
    enabled_by_default: true,
};

pub fn decode(packet: &Packet, ctx: &DecodeContext<'_>) -> DecodeResult {
    if packet.num_rows() != ROWS {
        return Rejection::AbortEarly.into();
    }
    if packet.rows().iter().any(|r| r.len() != ROW_BITS) {
        return Rejection::AbortLength.into();
    }
    let Some(row) = packet.find_repeated_row(ROWS, ROW_BITS) else {
        return Rejection::AbortEarly.into();
    };
    let b: [u8; 5] = packet.rows()[row].array_at(0);

    if b[3] >> 4 != 0xA {
        ctx.report(NAME, format_args!("fixed nibble is {:x}", b[3] >> 4));
        return Rejection::FailSanity.into();
    }

    let id = b[0];
    let flags = b[1] >> 4;
    let raw = (u16::from(b[1] & 0x0F) << 8) | u16::from(b[2]);
    let temp_c = f64::from(sign_extend_16(raw, 12)) * 0.1;
    let humidity = ((b[3] & 0x0F) << 4) | (b[4] >> 4);

    if flags & 0x3 == 0x3 || humidity > 100 || !(-51.1..=76.7).contains(&temp_c) {
        ctx.report(
            NAME,
            format_args!("out of range: flags {:x} humidity {} temp {:.1}", flags, humidity, temp_c),
        );
        return Rejection::FailSanity.into();
    }

    let channel = (flags & 0x3) + 1;
    let battery_ok = flags & 0x8 != 0;
    let button = flags & 0x4 != 0;

    DecodeResult::Emit(
        Reading::new("Auriol-AFW2A1")
            .with("id", "", id)
            .with("channel", "Channel", channel)
            .with("battery_ok", "Battery", battery_ok)
            .with("button", "Button", button)
            .with_fmt("temperature_C", "Temperature", "%.1f C", temp_c)
            .with_fmt("humidity", "Humidity", "%.0f %%", f64::from(humidity)),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bitbuffer::BitRow;
    use crate::reading::FieldValue;

    fn burst(row: &str) -> Packet {
        let row: BitRow = row.parse().unwrap();
        Packet::new(vec![row; ROWS])
    }

    #[test]
    fn test_decode() {
        let result = decode(&burst("{36}9080baa3a"), &DecodeContext::default());
        let reading = result.reading().unwrap();

        assert_eq!(reading.get("id"), Some(&FieldValue::UInt(144)));
        assert_eq!(reading.get("channel"), Some(&FieldValue::UInt(1)));
        assert_eq!(reading.get("battery_ok"), Some(&FieldValue::Int(1)));
        assert_eq!(reading.get("button"), Some(&FieldValue::Int(0)));
        assert_eq!(reading.fields()[5].render(), "18.6 C");
        assert_eq!(reading.get("humidity"), Some(&FieldValue::Float(58.0)));
    }

    #[test]
    fn test_negative_temperature() {
        let result = decode(&burst("{36}c55fffa28"), &DecodeContext::default());
        let reading = result.reading().unwrap();

        let temp = reading.get("temperature_C").unwrap().as_f64();
        assert!((temp + 0.1).abs() < 1e-9);
        assert_eq!(reading.get("channel"), Some(&FieldValue::UInt(2)));
        assert_eq!(reading.get("battery_ok"), Some(&FieldValue::Int(0)));
        assert_eq!(reading.get("button"), Some(&FieldValue::Int(1)));
    }

    #[test]
    fn test_one_bad_repeat() {
        let good: BitRow = "{36}9080baa3a".parse().unwrap();
        let mut rows = vec![good; ROWS];
        rows[5] = "{36}9080baa3b".parse().unwrap();
        assert_eq!(
            decode(&Packet::new(rows), &DecodeContext::default()),
            DecodeResult::Rejected(Rejection::AbortEarly)
        );
    }

    #[test]
    fn test_sanity_checks() {
        // fixed nibble
        assert_eq!(
            decode(&burst("{36}9080bab3a"), &DecodeContext::default()),
            DecodeResult::Rejected(Rejection::FailSanity)
        );
        // channel bits 11
        assert_eq!(
            decode(&burst("{36}9030baa3a"), &DecodeContext::default()),
            DecodeResult::Rejected(Rejection::FailSanity)
        );
        // humidity 0xff
        assert_eq!(
            decode(&burst("{36}9080baaff"), &DecodeContext::default()),
            DecodeResult::Rejected(Rejection::FailSanity)
        );
    }

    #[test]
    fn test_row_shape() {
        let row: BitRow = "{36}9080baa3a".parse().unwrap();
        assert_eq!(
            decode(&Packet::new(vec![row; 11]), &DecodeContext::default()),
            DecodeResult::Rejected(Rejection::AbortEarly)
        );
        assert_eq!(
            decode(&burst("{37}9080baa3a0"), &DecodeContext::default()),
            DecodeResult::Rejected(Rejection::AbortLength)
        );
    }
}
