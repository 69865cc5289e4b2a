//! X10 Security sensors (DS10A, MS10A, KR10A, KR15A, SH624)
//!
//! OOK PPM, 41 bits repeated five times. Byte 1 is byte 0 with the low
//! nibble complemented, byte 3 is the complement of byte 2, byte 4 extends
//! the id. The DS10A door/window code byte reads `CUUUUDUB`: C closed,
//! D delay setting (min when clear), B battery low.

use crate::bitbuffer::Packet;
use crate::decoder::{DecodeContext, DecodeResult, DecoderInfo, Modulation, Timing};
use crate::error::Rejection;
use crate::reading::Reading;

const NAME: &str = "x10_sec";
const MIN_ROW_BITS: usize = 40;

pub const DECODER: DecoderInfo = DecoderInfo {
    key: NAME,
    name: "X10 Security",
    modulation: Modulation::OokPulsePpm,
    timing: Timing {
        short_us: 500,
        long_us: 1680,
        sync_us: 0,
        gap_us: 2200,
        reset_us: 6000,
        tolerance_us: 0,
    },
    decode_fn: decode,
    fields: &["model", "id", "code", "event", "delay", "battery_ok"],
    enabled_by_default: true,
};

fn event_name(code: u8) -> &'static str {
    match code & 0xFE {
        0x00 | 0x04 => "DS10A DOOR/WINDOW OPEN",
        0x80 | 0x84 => "DS10A DOOR/WINDOW CLOSED",
        0x06 => "KR10A KEY-FOB ARM",
        0x0C => "MS10A MOTION TRIPPED",
        0x46 => "KR10A KEY-FOB LIGHTS-ON",
        0x82 => "SH624 SEC-REMOTE DISARM",
        0x86 => "KR10A KEY-FOB DISARM",
        0x88 => "KR15A PANIC",
        0x8C => "MS10A MOTION READY",
        0x98 => "KR15A PANIC-3SECOND",
        0xC6 => "KR10A KEY-FOB LIGHTS-OFF",
        _ => "UNKNOWN",
    }
}

pub fn decode(packet: &Packet, ctx: &DecodeContext<'_>) -> DecodeResult {
    for row in packet.rows() {
        if row.len() < MIN_ROW_BITS {
            continue;
        }
        let b: [u8; 5] = row.array_at(0);
        if b[0] ^ b[1] != 0x0F || b[2] ^ b[3] != 0xFF {
            continue;
        }

        let battery_low = b[2] & 0x01 != 0;
        let delay = matches!(b[2] & 0xFE, 0x00 | 0x04 | 0x80 | 0x84) && b[2] & 0x04 == 0;
        let event = event_name(b[2]);
        ctx.report(
            NAME,
            format_args!("id={:02x}{:02x} code={:02x} event={}", b[0], b[4], b[2], event),
        );

        return DecodeResult::Emit(
            Reading::new("X10-Security")
                .with("id", "Device ID", format!("{:02x}{:02x}", b[0], b[4]))
                .with("code", "Code", format!("{:02x}", b[2]))
                .with("event", "Event", event)
                .with_if(delay, "delay", "Delay", 1)
                .with_if(battery_low, "battery_ok", "Battery OK", 0),
        );
    }
    Rejection::AbortEarly.into()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reading::FieldValue;

    #[test]
    fn test_door_closed() {
        let packet: Packet = "{41}5a55807f1100 / {41}5a55807f1100".parse().unwrap();
        let result = decode(&packet, &DecodeContext::default());
        let reading = result.reading().unwrap();

        assert_eq!(reading.model(), "X10-Security");
        assert_eq!(reading.get("id"), Some(&FieldValue::from("5a11")));
        assert_eq!(reading.get("code"), Some(&FieldValue::from("80")));
        assert_eq!(reading.get("event"), Some(&FieldValue::from("DS10A DOOR/WINDOW CLOSED")));
        assert_eq!(reading.get("delay"), Some(&FieldValue::Int(1)));
        assert!(!reading.contains("battery_ok"));
    }

    #[test]
    fn test_skips_bad_rows() {
        // first row too short, second fails the complement check
        let packet: Packet = "{20}5a558 / {41}5a56807f1100 / {41}3c330df24200".parse().unwrap();
        let result = decode(&packet, &DecodeContext::default());
        let reading = result.reading().unwrap();

        assert_eq!(reading.get("id"), Some(&FieldValue::from("3c42")));
        assert_eq!(reading.get("event"), Some(&FieldValue::from("MS10A MOTION TRIPPED")));
        assert_eq!(reading.get("battery_ok"), Some(&FieldValue::Int(0)));
        assert!(!reading.contains("delay"));
    }

    #[test]
    fn test_no_valid_row() {
        let packet: Packet = "{41}5a56807f1100".parse().unwrap();
        assert_eq!(
            decode(&packet, &DecodeContext::default()),
            DecodeResult::Rejected(Rejection::AbortEarly)
        );
    }
}
