//! inFactory outdoor temperature and humidity sensor
//!
//! One 40-bit row, six repeats every 60 seconds:
//!
//! ```text
//! IIIIIIII CCCCCCCC TTTTTTTT TTTTHHHH HHHH????
//! ```
//! I = id (changes on battery swap), C = unknown checksum,
//! T = temperature in 0.1 F offset by 90 F, H = humidity as two BCD digits.

use crate::bitbuffer::Packet;
use crate::decoder::{DecodeContext, DecodeResult, DecoderInfo, Modulation, Timing};
use crate::error::Rejection;
use crate::fields::{bcd_value, is_bcd};
use crate::reading::Reading;

const NAME: &str = "infactory";
const ROW_BITS: usize = 40;

pub const DECODER: DecoderInfo = DecoderInfo {
    key: NAME,
    name: "inFactory",
    modulation: Modulation::OokPulsePpm,
    timing: Timing {
        short_us: 2000,
        long_us: 4000,
        sync_us: 0,
        gap_us: 5000,
        reset_us: 6000,
        tolerance_us: 0,
    },
    decode_fn: decode,
    fields: &["model", "id", "temperature_F", "humidity"],
    enabled_by_default: false,
};

pub fn decode(packet: &Packet, ctx: &DecodeContext<'_>) -> DecodeResult {
    if packet.bits_per_row(0) != ROW_BITS {
        return Rejection::AbortLength.into();
    }
    let b: [u8; 5] = packet.rows()[0].array_at(0);

    let humidity_bcd = (b[3] << 4) | (b[4] >> 4);
    if !is_bcd(humidity_bcd) {
        ctx.report(NAME, format_args!("humidity {:02x} is not BCD", humidity_bcd));
        return Rejection::FailSanity.into();
    }
    let raw_temp = (u16::from(b[2]) << 4) | u16::from(b[3] >> 4);
    let temperature_f = f64::from(raw_temp) / 10.0 - 90.0;

    DecodeResult::Emit(
        Reading::new("inFactory sensor")
            .with_fmt("id", "ID", "%u", b[0])
            .with_fmt("temperature_F", "Temperature", "%.2f F", temperature_f)
            .with_fmt("humidity", "Humidity", "%u %%", bcd_value(humidity_bcd)),
    )
}
