//! HT680 remote control (HT680 and compatible encoders)
//!
//! 41-bit rows: five sync bits `10101` followed by 18 tristate symbols of
//! two bits each (`00` = 0, `11` = 1, `10` = floating, `01` invalid).
//! Address pins A4/A5, AD10, AD13 and AD16/AD17 float on the HT680.

use crate::bitbuffer::Packet;
use crate::decoder::{DecodeContext, DecodeResult, DecoderInfo, Modulation, Timing};
use crate::reading::Reading;

const NAME: &str = "ht680";
const ROW_BITS: usize = 41;
const SYNC_BITS: usize = 5;
const SYMBOL_BITS: usize = 36;

pub const DECODER: DecoderInfo = DecoderInfo {
    key: NAME,
    name: "HT680 Remote control",
    modulation: Modulation::OokPulsePwm,
    timing: Timing {
        short_us: 200,
        long_us: 600,
        sync_us: 0,
        gap_us: 1200,
        reset_us: 14000,
        tolerance_us: 0,
    },
    decode_fn: decode,
    fields: &["model", "tristate", "address", "button1", "button2", "button3", "button4"],
    enabled_by_default: true,
};

fn tristate(b: &[u8; 5]) -> String {
    let mut out: String = b
        .iter()
        .flat_map(|byte| (0..4).rev().map(move |pair| (byte >> (pair * 2)) & 0x03))
        .map(|sym| match sym {
            0b00 => '0',
            0b01 => 'X',
            0b10 => 'Z',
            _ => '1',
        })
        .collect();
    // the last byte only carries two symbols
    out.truncate(SYMBOL_BITS / 2);
    out
}

fn pressed(v: u8) -> &'static str {
    if v == 0x03 {
        "PRESSED"
    } else {
        ""
    }
}

pub fn decode(packet: &Packet, ctx: &DecodeContext<'_>) -> DecodeResult {
    for row in packet.rows() {
        if row.len() != ROW_BITS || row.byte_at(0) & 0xF8 != 0xA8 {
            continue;
        }
        let b: [u8; 5] = row.slice(SYNC_BITS, SYMBOL_BITS).array_at(0);

        // a match on any one floating pin group is accepted
        if b[1] & 0xF0 != 0xA0 && b[2] & 0x0C != 0x08 && b[3] & 0x30 != 0x20 && b[4] & 0xF0 != 0xA0 {
            ctx.report(NAME, format_args!("no floating pins in {}", hex::encode(b)));
            continue;
        }

        let address = (u32::from(b[0]) << 12) | (u32::from(b[1]) << 4) | u32::from(b[2] >> 4);

        return DecodeResult::Emit(
            Reading::new("HT680 Remote control")
                .with("tristate", "Tristate code", tristate(&b))
                .with_fmt("address", "Address", "0x%06X", address)
                .with("button1", "Button 1", pressed(b[3] & 0x03))
                .with("button2", "Button 2", pressed((b[3] >> 2) & 0x03))
                .with("button3", "Button 3", pressed((b[3] >> 6) & 0x03))
                .with("button4", "Button 4", pressed(b[2] & 0x03)),
        );
    }
    DecodeResult::NoEvent
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bitbuffer::BitRow;
    use crate::reading::FieldValue;

    fn on_air(symbols: [u8; 5]) -> Packet {
        let mut row = BitRow::new(vec![0xA8], SYNC_BITS);
        row.extend_from(&BitRow::new(symbols.to_vec(), SYMBOL_BITS));
        Packet::from_row(row)
    }

    #[test]
    fn test_decode() {
        let packet = on_air([0x12, 0xA5, 0x5B, 0x23, 0xA0]);
        assert_eq!(packet.bits_per_row(0), ROW_BITS);

        let result = decode(&packet, &DecodeContext::default());
        let reading = result.reading().unwrap();

        assert_eq!(reading.get("tristate"), Some(&FieldValue::from("0X0ZZZXXXXZ10Z01ZZ")));
        assert_eq!(reading.get("address"), Some(&FieldValue::UInt(0x12A55)));
        assert_eq!(reading.fields()[2].render(), "0x012A55");
        assert_eq!(reading.get("button1"), Some(&FieldValue::from("PRESSED")));
        assert_eq!(reading.get("button2"), Some(&FieldValue::from("")));
        assert_eq!(reading.get("button3"), Some(&FieldValue::from("")));
        assert_eq!(reading.get("button4"), Some(&FieldValue::from("PRESSED")));
    }

    #[test]
    fn test_no_event() {
        // no floating pin group present
        let packet = on_air([0x12, 0x05, 0x03, 0x03, 0x00]);
        assert_eq!(decode(&packet, &DecodeContext::default()), DecodeResult::NoEvent);

        // wrong sync
        let mut row = BitRow::new(vec![0xB0], SYNC_BITS);
        row.extend_from(&BitRow::new(vec![0x12, 0xA5, 0x5B, 0x23, 0xA0], SYMBOL_BITS));
        assert_eq!(
            decode(&Packet::from_row(row), &DecodeContext::default()),
            DecodeResult::NoEvent
        );
    }
}
