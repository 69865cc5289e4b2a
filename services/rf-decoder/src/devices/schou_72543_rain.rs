//! Schou 72543 rain gauge with thermometer
//!
//! 65-bit rows, at least two of which must agree on the first 64 bits:
//!
//! ```text
//! II II Bx rr RR tt TT CC 0
//! ```
//! I = id, B = battery/repeat/counter flags, R:r = rain in 0.1 mm
//! (little endian), T:t = temperature in 0.1 F offset by 900, C = byte sum.

use crate::bitbuffer::Packet;
use crate::decoder::{DecodeContext, DecodeResult, DecoderInfo, Modulation, Timing};
use crate::error::Rejection;
use crate::integrity::add_bytes;
use crate::reading::Reading;

const NAME: &str = "schou_72543_rain";
const PREFIX_BITS: usize = 64;

pub const DECODER: DecoderInfo = DecoderInfo {
    key: NAME,
    name: "Schou_72543_rain",
    modulation: Modulation::OokPulsePwm,
    timing: Timing {
        short_us: 972,
        long_us: 2680,
        sync_us: 7328,
        gap_us: 0,
        reset_us: 2712,
        tolerance_us: 0,
    },
    decode_fn: decode,
    fields: &[
        "model",
        "id",
        "temperature_F",
        "rain_mm",
        "battery_ok",
        "msg_counter",
        "msg_repeat",
        "mic",
    ],
    enabled_by_default: true,
};

pub fn decode(packet: &Packet, ctx: &DecodeContext<'_>) -> DecodeResult {
    if packet.num_rows() < 2 {
        return Rejection::AbortLength.into();
    }
    let Some(row) = packet.find_repeated_prefix(2, PREFIX_BITS) else {
        return Rejection::AbortEarly.into();
    };

    let b: [u8; 8] = packet.rows()[row].array_at(0);
    let expected = (add_bytes(&b[..7]) & 0xFF) as u8;
    if b[7] != expected {
        ctx.report(
            NAME,
            format_args!("checksum error, expected: {:02x} calculated: {:02x}", b[7], expected),
        );
        return Rejection::FailIntegrity.into();
    }

    let id = u16::from_be_bytes([b[0], b[1]]);
    let battery_low = b[2] & 0x80 != 0;
    let repeat = b[2] & 0x40 != 0;
    let counter = (b[2] & 0x0E) >> 1;
    let rain_mm = f64::from(u16::from_le_bytes([b[3], b[4]])) * 0.1;
    let temperature_f = (f64::from(u16::from_le_bytes([b[5], b[6]])) - 900.0) * 0.1;

    DecodeResult::Emit(
        Reading::new("Schou_72543")
            .with("id", "ID", id)
            .with_fmt("temperature_F", "Temperature", "%.1f F", temperature_f)
            .with_fmt("rain_mm", "Rain", "%.1f mm", rain_mm)
            .with("battery_ok", "Battery_ok", !battery_low)
            .with("msg_counter", "Counter", counter)
            .with("msg_repeat", "Msg_repeat", repeat)
            .with("mic", "Integrity", "CRC"),
    )
}
