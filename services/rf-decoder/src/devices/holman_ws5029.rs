//! AOK weather stations: Holman iWeather WS5029 (PCM and older PWM) and
//! Conrad AOK-5056
//!
//! PCM package, after the `AA AA AA 98 F3 A5` preamble:
//!
//! ```text
//! II II CC CH HR RR WW Dx xx xx xx xx ss ..
//! ```
//! I = station id, C = signed temperature in 0.1 C, H = humidity,
//! R = rain counter, W = wind km/h, D = direction index, s = XOR check.
//! Packages of 200 to 219 bits come from the AOK-5056, which adds UV, lux
//! and a counter in the otherwise unused bytes.
//!
//! The PWM variant sends three inverted 96-bit repeats.

use crate::bitbuffer::Packet;
use crate::decoder::{DecodeContext, DecodeResult, DecoderInfo, Modulation, Timing};
use crate::error::Rejection;
use crate::fields::sign_extend_16;
use crate::integrity::{verify_xor, xor_bytes, XorCheck};
use crate::reading::Reading;

const PCM_NAME: &str = "holman_ws5029pcm";
const PWM_NAME: &str = "holman_ws5029pwm";

const PCM_PREAMBLE: [u8; 6] = [0xAA, 0xAA, 0xAA, 0x98, 0xF3, 0xA5];
const PCM_MIN_BITS: usize = 192;

/// Preamble and device code, as sent (inverted)
const PWM_PREAMBLE: [u8; 3] = [0x55, 0x5A, 0x67];
const PWM_BITS: usize = 96;

/// Rain gauge tip in mm
const RAIN_MM_PER_COUNT: f64 = 0.79;

const WIND_DIR_DEG: [u16; 16] = [
    0, 23, 45, 68, 90, 113, 135, 158, 180, 203, 225, 248, 270, 293, 315, 338,
];

const FIELDS: &[&str] = &[
    "model",
    "id",
    "temperature_C",
    "humidity",
    "battery_ok",
    "rain_mm",
    "wind_avg_km_h",
    "wind_dir_deg",
    "uv",
    "light_lux",
    "counter",
    "mic",
];

pub const PCM_DECODER: DecoderInfo = DecoderInfo {
    key: PCM_NAME,
    name: "AOK Weather Station rebrand Holman Industries iWeather WS5029, Conrad AOK-5056, Optex 99018",
    modulation: Modulation::FskPulsePcm,
    timing: Timing {
        short_us: 100,
        long_us: 100,
        sync_us: 0,
        gap_us: 0,
        reset_us: 19200,
        tolerance_us: 0,
    },
    decode_fn: decode_pcm,
    fields: FIELDS,
    enabled_by_default: true,
};

pub const PWM_DECODER: DecoderInfo = DecoderInfo {
    key: PWM_NAME,
    name: "Holman Industries iWeather WS5029 weather station (older PWM)",
    modulation: Modulation::FskPulsePwm,
    timing: Timing {
        short_us: 488,
        long_us: 976,
        sync_us: 0,
        gap_us: 2000,
        reset_us: 6000,
        tolerance_us: 0,
    },
    decode_fn: decode_pwm,
    fields: FIELDS,
    enabled_by_default: true,
};

pub fn decode_pcm(packet: &Packet, ctx: &DecodeContext<'_>) -> DecodeResult {
    let [row] = packet.rows() else {
        ctx.report(PCM_NAME, format_args!("wrong number of rows ({})", packet.num_rows()));
        return Rejection::AbortEarly.into();
    };
    let bits = row.len();
    if bits < PCM_MIN_BITS {
        return Rejection::AbortLength.into();
    }
    let Some(pos) = row.search(0, &PCM_PREAMBLE, PCM_PREAMBLE.len() * 8) else {
        return Rejection::PatternNotFound.into();
    };
    ctx.report(PCM_NAME, format_args!("payload at bit {}", pos));

    let b: [u8; 18] = row.array_at(pos);
    // only the low nibble of the check byte follows the XOR
    if !verify_xor(&b, 12, XorCheck::LowNibble) {
        ctx.report(PCM_NAME, format_args!("checksum fail"));
        return Rejection::FailIntegrity.into();
    }

    let id = u16::from_be_bytes([b[0], b[1]]);
    let temp_raw = (u16::from(b[2]) << 4) | u16::from(b[3] >> 4);
    let temp_c = f64::from(sign_extend_16(temp_raw, 12)) * 0.1;
    let humidity = ((b[3] & 0x0F) << 4) | (b[4] >> 4);
    let rain_raw = (u16::from(b[4] & 0x0F) << 8) | u16::from(b[5]);
    let speed_kmh = b[6];
    let direction_deg = WIND_DIR_DEG[usize::from(b[7] >> 4)];

    let reading = |model: &str| {
        Reading::new(model)
            .with_fmt("id", "StationID", "%04X", id)
            .with_fmt("temperature_C", "Temperature", "%.01f C", temp_c)
            .with_fmt("humidity", "Humidity", "%u %%", humidity)
    };

    if bits < 200 {
        return DecodeResult::Emit(
            reading("Holman-WS5029")
                .with_fmt(
                    "rain_mm",
                    "Total rainfall",
                    "%.01f mm",
                    f64::from(rain_raw) * RAIN_MM_PER_COUNT,
                )
                .with_fmt("wind_avg_km_h", "Wind avg speed", "%u km/h", speed_kmh)
                .with("wind_dir_deg", "Wind Direction", direction_deg),
        );
    }
    if bits >= 220 {
        return DecodeResult::NoEvent;
    }

    let uv_index = ((b[7] & 0x07) << 1) | (b[8] >> 7);
    let light_lux =
        (u32::from(b[8] & 0x7F) << 10) | (u32::from(b[9]) << 2) | u32::from(b[10] >> 6);
    let battery_low = (b[10] & 0x30) != 0;
    let counter = (u16::from(b[10] & 0x0F) << 8) | u16::from(b[11]);

    DecodeResult::Emit(
        reading("AOK-5056")
            .with_fmt("rain_mm", "Total rainfall", "%.1f mm", f64::from(rain_raw))
            .with_fmt("wind_avg_km_h", "Wind avg speed", "%u km/h", speed_kmh)
            .with("wind_dir_deg", "Wind Direction", direction_deg)
            .with_fmt("uv", "UV Index", "%u", uv_index)
            .with_fmt("light_lux", "Lux", "%u", light_lux)
            .with_fmt("counter", "Counter", "%u", counter)
            .with_fmt("battery_ok", "battery", "%u", !battery_low),
    )
}

pub fn decode_pwm(packet: &Packet, ctx: &DecodeContext<'_>) -> DecodeResult {
    let Some(r) = packet.find_repeated_row(3, PWM_BITS) else {
        return Rejection::AbortLength.into();
    };
    let row = &packet.rows()[r];
    if row.len() != PWM_BITS {
        return Rejection::AbortLength.into();
    }

    // preamble and checksum are checked before inverting
    let raw: [u8; 12] = row.array_at(0);
    if raw[..3] != PWM_PREAMBLE {
        return Rejection::FailSanity.into();
    }
    if (xor_bytes(&raw[..11]) & 0x0F) ^ 0x0F != 0 {
        ctx.report(PWM_NAME, format_args!("checksum fail"));
        return Rejection::FailIntegrity.into();
    }

    let b = raw.map(|x| !x);
    let id = b[3];
    let battery_low = b[4] & 0x80 != 0;
    let temp_raw = (u16::from(b[4] & 0x0F) << 8) | u16::from(b[5]);
    let temp_c = f64::from(sign_extend_16(temp_raw, 12)) * 0.1;
    let humidity = b[6];
    let rain_count = (u16::from(b[7]) << 4) + u16::from(b[8] >> 4);
    let speed_kmh = ((b[8] & 0x0F) << 4) + (b[9] >> 4);
    let wind_dir = b[9] & 0x0F;

    DecodeResult::Emit(
        Reading::new("Holman-WS5029")
            .with("id", "", id)
            .with("battery_ok", "Battery", !battery_low)
            .with_fmt("temperature_C", "Temperature", "%.01f C", temp_c)
            .with_fmt("humidity", "Humidity", "%u %%", humidity)
            .with_fmt(
                "rain_mm",
                "Total rainfall",
                "%.01f mm",
                f64::from(rain_count) * RAIN_MM_PER_COUNT,
            )
            .with_fmt("wind_avg_km_h", "Wind avg speed", "%u km/h", speed_kmh)
            .with("wind_dir_deg", "Wind Direction", (f64::from(wind_dir) * 22.5) as i32)
            .with("mic", "Integrity", "CHECKSUM"),
    )
}
