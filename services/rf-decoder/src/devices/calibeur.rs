//! Calibeur RF-104 temperature/humidity sensor
//!
//! Row 0 is empty (the start bit is the middle pulse). Rows 1 and 2 carry
//! the same 21-bit message with odd parity; field bits are scattered over
//! the three bytes and reassembled below.

use crate::bitbuffer::Packet;
use crate::decoder::{DecodeContext, DecodeResult, DecoderInfo, Modulation, Timing};
use crate::error::Rejection;
use crate::integrity::crc8;
use crate::reading::Reading;

const NAME: &str = "calibeur_rf104";
const MESSAGE_BITS: usize = 21;

pub const DECODER: DecoderInfo = DecoderInfo {
    key: NAME,
    name: "Calibeur RF-104 Sensor",
    modulation: Modulation::OokPulsePwmTernary,
    timing: Timing {
        short_us: 1160,
        long_us: 1900,
        sync_us: 0,
        gap_us: 0,
        reset_us: 3200,
        tolerance_us: 0,
    },
    decode_fn: decode,
    fields: &["model", "id", "temperature_C", "humidity"],
    enabled_by_default: true,
};

pub fn decode(packet: &Packet, ctx: &DecodeContext<'_>) -> DecodeResult {
    let (Some(first), Some(second)) = (packet.row(1), packet.row(2)) else {
        return Rejection::AbortEarly.into();
    };
    if first.len() != MESSAGE_BITS {
        return Rejection::AbortLength.into();
    }

    let b: [u8; 3] = first.array_at(0);
    // crc8 with poly 0x80 reduces to the parity bit
    if crc8(&b, 0x80, 0) == 0 {
        ctx.report(NAME, format_args!("even parity in {}", first));
        return Rejection::FailIntegrity.into();
    }
    if second.array_at::<3>(0) != b {
        ctx.report(NAME, format_args!("repeats differ: {} / {}", first, second));
        return Rejection::AbortEarly.into();
    }

    let bits = ((b[0] & 0x80) >> 7)
        | ((b[0] & 0x40) >> 5)
        | ((b[0] & 0x20) >> 3)
        | ((b[0] & 0x10) >> 1)
        | ((b[0] & 0x08) << 1)
        | ((b[0] & 0x04) << 3);
    let id = bits / 10;
    let tenths = f64::from(bits % 10) / 10.0;

    let bits = ((b[0] & 0x02) << 3)
        | ((b[0] & 0x01) << 5)
        | ((b[1] & 0x80) >> 7)
        | ((b[1] & 0x40) >> 5)
        | ((b[1] & 0x20) >> 3)
        | ((b[1] & 0x10) >> 1)
        | ((b[1] & 0x08) << 3);
    let temperature = tenths + f64::from(bits) - 41.0;

    let humidity = ((b[1] & 0x02) << 4)
        | ((b[1] & 0x01) << 6)
        | ((b[2] & 0x80) >> 7)
        | ((b[2] & 0x40) >> 5)
        | ((b[2] & 0x20) >> 3)
        | ((b[2] & 0x10) >> 1)
        | ((b[2] & 0x08) << 1);

    DecodeResult::Emit(
        Reading::new("Calibeur RF-104")
            .with("id", "ID", id)
            .with_fmt("temperature_C", "Temperature", "%.1f C", temperature)
            .with_fmt("humidity", "Humidity", "%2.0f %%", f64::from(humidity)),
    )
}
