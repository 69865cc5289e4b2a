//! Protocol v2.1: every data bit is sent twice, inverted then plain.
//!
//! The row starts with a run of `55` (or `aa`) bytes; a `99` sync byte
//! follows, possibly shifted by a few bits from dropped or extra pulses.

use super::{all_bcd, humidity, temperature, uv_index, verify_checksum, Header, NAME};
use crate::bitbuffer::Packet;
use crate::decoder::{DecodeContext, DecodeResult};
use crate::error::Rejection;
use crate::fields::reflect_nibbles;
use crate::linecode::manchester_decode;
use crate::reading::Reading;

const ID_THGR122N: u16 = 0x1D20;
const ID_THGR968: u16 = 0x1D30;
const ID_BTHR918: u16 = 0x5D50;
const ID_BHTR968: u16 = 0x5D60;
const ID_RGR968: u16 = 0x2D10;
const ID_THR228N: u16 = 0xEC40;
// same type as THR228N with a shorter message
const ID_THN132N: u16 = 0xEC40;
const ID_AWR129: u16 = 0xEC41;
const ID_WGR968: u16 = 0x3D00;
// matched on the low 12 bits, the top nibble varies
const ID_RTGN318: u16 = 0x0CC3;
// same type as RTGN318 with a longer message
const ID_RTGN129: u16 = 0x0CC3;
const ID_THN129: u16 = 0xCC43;
const ID_RTHN129: u16 = 0x0CD3;
const ID_BTHGN129: u16 = 0x5D53;
const ID_UVR128: u16 = 0xEC70;
const ID_THGR328N: u16 = 0xCC23;
// temperature and humidity frames
const ID_RTGR328N_1: u16 = 0xDCC3;
const ID_RTGR328N_2: u16 = 0xCCC3;
const ID_RTGR328N_3: u16 = 0xBCC3;
const ID_RTGR328N_4: u16 = 0xACC3;
const ID_RTGR328N_5: u16 = 0x9CC3;
// radio clock frames
const ID_RTGR328N_6: u16 = 0x8CE3;
const ID_RTGR328N_7: u16 = 0x8AE3;

const MAX_BITS: usize = 173;
/// Sync byte search window, in bits after byte 3
const SYNC_SHIFTS: u32 = 8;
/// The payload starts after five bytes of preamble and sync
const PAYLOAD_START: usize = 40;

pub(super) fn decode(packet: &Packet, ctx: &DecodeContext<'_>) -> DecodeResult {
    decode_message(packet, ctx).into()
}

fn decode_message(packet: &Packet, ctx: &DecodeContext<'_>) -> Result<Option<Reading>, Rejection> {
    let row = packet.row(0).ok_or(Rejection::AbortEarly)?;
    let b: [u8; 7] = row.array_at(0);

    // skip byte 0 to get past startup bit errors
    if (b[1] != 0x55 || b[2] != 0x55) && (b[1] != 0xAA || b[2] != 0xAA) {
        return Err(Rejection::AbortEarly);
    }

    let sync_test = u32::from_be_bytes([b[3], b[4], b[5], b[6]]);
    let shift = (0..SYNC_SHIFTS)
        .find(|&i| {
            let mask = 0xFFFF_0000u32 >> i;
            let value = sync_test & mask;
            value == 0x5599_0000 >> i || value == 0xAA99_0000 >> i
        })
        .ok_or_else(|| {
            ctx.report(NAME, format_args!("v2.1 sync nibble not found in {:08x}", sync_test));
            Rejection::PatternNotFound
        })?;

    // the second half of each pair carries the bit, so decode the inverted row
    let decoded = manchester_decode(&row.inverted(), shift as usize + PAYLOAD_START, MAX_BITS);
    let msg_bits = decoded.valid_bits();
    let mut msg: [u8; 22] = decoded.bits.slice(0, msg_bits).array_at(0);
    reflect_nibbles(&mut msg);

    let header = Header::parse(&msg);
    ctx.report(NAME, format_args!("v2.1 sensor type {:04x}, {} bits", header.sensor_id, msg_bits));

    let validate = |expected_bits: usize, checksum_idx: usize| -> Result<(), Rejection> {
        if msg_bits != expected_bits {
            ctx.report(NAME, format_args!("expected {} bits, got {}", expected_bits, msg_bits));
            return Err(Rejection::AbortLength);
        }
        verify_checksum(&msg, checksum_idx, ctx)
    };

    let reading = match header.sensor_id {
        ID_THGR122N | ID_THGR968 => {
            validate(76, 15)?;
            let model = if header.sensor_id == ID_THGR122N {
                "Oregon-THGR122N"
            } else {
                "Oregon-THGR968"
            };
            header
                .reading(model)
                .with_fmt("temperature_C", "Temperature", "%.2f C", temperature(&msg))
                .with_fmt("humidity", "Humidity", "%u %%", humidity(&msg))
        }
        ID_WGR968 => {
            validate(94, 17)?;
            let direction = f64::from(msg[4] & 0x0F) * 10.0 + f64::from(msg[4] >> 4) + f64::from(msg[5] >> 4) * 100.0;
            let average = f64::from(msg[7] >> 4) / 10.0 + f64::from(msg[7] & 0x0F) + f64::from(msg[8] >> 4) / 10.0;
            let gust = f64::from(msg[5] & 0x0F) / 10.0 + f64::from(msg[6] >> 4) + f64::from(msg[6] & 0x0F) / 10.0;
            header
                .reading("Oregon-WGR968")
                .with_fmt("wind_max_m_s", "Gust", "%.1f m/s", gust)
                .with_fmt("wind_avg_m_s", "Average", "%.1f m/s", average)
                .with_fmt("wind_dir_deg", "Direction", "%.1f degrees", direction)
        }
        ID_BHTR968 | ID_BTHR918 => {
            // same layout, the BTHR918 message is shorter with another pressure offset
            let (model, bits, offset) = if header.sensor_id == ID_BHTR968 {
                ("Oregon-BHTR968", 92, 856.0)
            } else {
                ("Oregon-BTHR918", 84, 795.0)
            };
            validate(bits, 19)?;
            let pressure = f64::from((msg[7] & 0x0F) | (msg[8] & 0xF0)) + offset;
            header
                .reading(model)
                .with_fmt("temperature_C", "Celsius", "%.2f C", temperature(&msg))
                .with_fmt("humidity", "Humidity", "%u %%", humidity(&msg))
                .with_fmt("pressure_hPa", "Pressure", "%.0f hPa", pressure)
        }
        ID_RGR968 => {
            validate(80, 16)?;
            let rate = u32::from(msg[4] & 0x0F) * 100 + u32::from(msg[4] >> 4) * 10 + u32::from(msg[5] >> 4);
            let total = u32::from(msg[7] & 0x0F) * 10000
                + u32::from(msg[7] >> 4) * 1000
                + u32::from(msg[6] & 0x0F) * 100
                + u32::from(msg[6] >> 4) * 10
                + u32::from(msg[5] & 0x0F);
            header
                .reading("Oregon-RGR968")
                .with_fmt("rain_rate_mm_h", "Rain Rate", "%.2f mm/h", f64::from(rate) / 10.0)
                .with_fmt("rain_mm", "Total Rain", "%.2f mm", f64::from(total) / 10.0)
        }
        ID_THR228N | ID_AWR129 if msg_bits == 76 => {
            validate(76, 12)?;
            let model = if header.sensor_id == ID_THR228N {
                "Oregon-THR228N"
            } else {
                "Oregon-AWR129"
            };
            header
                .reading(model)
                .with_fmt("temperature_C", "Celsius", "%.2f C", temperature(&msg))
        }
        ID_THN132N if msg_bits == 64 => {
            validate(64, 12)?;
            if !all_bcd([msg[5] >> 4, msg[4] & 0x0F, msg[4] >> 4]) {
                ctx.report(NAME, format_args!("THN132N failed BCD sanity check"));
                return Err(Rejection::FailSanity);
            }
            let temp_c = temperature(&msg);
            if !(-50.0..=70.0).contains(&temp_c) {
                ctx.report(NAME, format_args!("THN132N temperature {:.1} C out of range", temp_c));
                return Err(Rejection::FailSanity);
            }
            header
                .reading("Oregon-THN132N")
                .with_fmt("temperature_C", "Celsius", "%.2f C", temp_c)
        }
        id if id & 0x0FFF == ID_RTGN129 && msg_bits == 80 => {
            validate(80, 15)?;
            header
                .reading("Oregon-RTGN129")
                .with_fmt("temperature_C", "Celsius", "%.2f C", temperature(&msg))
                .with_fmt("humidity", "Humidity", "%u %%", humidity(&msg))
        }
        ID_RTGR328N_1 | ID_RTGR328N_2 | ID_RTGR328N_3 | ID_RTGR328N_4 | ID_RTGR328N_5 if msg_bits == 173 => {
            validate(173, 15)?;
            header
                .reading("Oregon-RTGR328N")
                .with_fmt("temperature_C", "Temperature", "%.2f C", temperature(&msg))
                .with_fmt("humidity", "Humidity", "%u %%", humidity(&msg))
        }
        ID_RTGR328N_6 | ID_RTGR328N_7 => {
            validate(100, 21)?;
            header
                .reading("Oregon-RTGR328N")
                .with("radio_clock", "Radio Clock", radio_clock(&msg))
        }
        id if id & 0x0FFF == ID_RTGN318 => {
            if msg_bits == 100 {
                // radio clock frame without a reading
                validate(100, 21)?;
                return Ok(None);
            }
            validate(76, 15)?;
            header
                .reading("Oregon-RTGN318")
                .with_fmt("temperature_C", "Celsius", "%.2f C", temperature(&msg))
                .with_fmt("humidity", "Humidity", "%u %%", humidity(&msg))
        }
        id if id == ID_THN129 || id & 0x0FFF == ID_RTHN129 => {
            if msg_bits == 104 {
                validate(104, 18)?;
                return Ok(None);
            }
            validate(68, 12)?;
            let model = if id == ID_THN129 {
                "Oregon-THN129"
            } else {
                "Oregon-RTHN129"
            };
            header
                .reading(model)
                .with_fmt("temperature_C", "Celsius", "%.2f C", temperature(&msg))
        }
        ID_BTHGN129 => {
            validate(92, 19)?;
            let pressure = f64::from((msg[7] & 0x0F) | (msg[8] & 0xF0)) * 2.0 + f64::from(msg[8] & 0x01) + 600.0;
            header
                .reading("Oregon-BTHGN129")
                .with_fmt("temperature_C", "Celsius", "%.2f C", temperature(&msg))
                .with_fmt("humidity", "Humidity", "%u %%", humidity(&msg))
                .with_fmt("pressure_hPa", "Pressure", "%.2f hPa", pressure)
        }
        ID_UVR128 if msg_bits == 148 => {
            validate(148, 12)?;
            if !all_bcd([msg[4] >> 4, msg[4] & 0x0F]) {
                ctx.report(NAME, format_args!("UVR128 failed BCD sanity check"));
                return Err(Rejection::FailSanity);
            }
            let uv = uv_index(&msg);
            if uv > 25 {
                ctx.report(NAME, format_args!("UVR128 uv index {} out of range", uv));
                return Err(Rejection::FailSanity);
            }
            // no channel switch on this one
            Reading::new("Oregon-UVR128")
                .with("id", "House Code", header.device_id)
                .with_fmt("uv", "UV Index", "%u", uv)
                .with("battery_ok", "Battery", !header.battery_low)
        }
        ID_THGR328N => {
            validate(173, 15)?;
            header
                .reading("Oregon-THGR328N")
                .with_fmt("temperature_C", "Temperature", "%.2f C", temperature(&msg))
                .with_fmt("humidity", "Humidity", "%u %%", humidity(&msg))
        }
        other => {
            ctx.report(NAME, format_args!("unrecognized v2.1 sensor type {:04x}", other));
            return Ok(None);
        }
    };

    Ok(Some(reading))
}

/// Date and time broadcast by the RTGR328N, BCD digits LSD first
fn radio_clock(msg: &[u8]) -> String {
    let bcd = |b: u8| u32::from(b & 0x0F) * 10 + u32::from(b >> 4);
    format!(
        "{:04}-{:02}-{:02}T{:02}:{:02}:{:02}",
        bcd(msg[9]) + 2000,
        msg[8] >> 4,
        bcd(msg[7]),
        bcd(msg[6]),
        bcd(msg[5]),
        bcd(msg[4])
    )
}
