//! Protocol v3: plain Manchester, already resolved by the demodulator.
//!
//! The preamble is a run of zero nibbles ending in `5` (sometimes seen as
//! `ff f5` through a broken demodulator); the message follows byte-aligned
//! to the end of the row.
//!
//! Owl energy meters share the framing. The CM180 and CM180i have no `5`
//! nibble: their preamble runs straight into the first message byte, `46`
//! or `4a` on air. Their messages do not carry the common header.

use super::{all_bcd, humidity, temperature, uv_index, verify_checksum, Header, NAME};
use crate::bitbuffer::Packet;
use crate::decoder::{DecodeContext, DecodeResult};
use crate::error::Rejection;
use crate::fields::{reflect_nibbles, swap_nibbles};
use crate::reading::Reading;

const ID_THGR810: u16 = 0xF824;
const ID_THGR810A: u16 = 0xF8B4;
const ID_THN802: u16 = 0xC844;
const ID_PCR800: u16 = 0x2914;
const ID_PCR800A: u16 = 0x2D14;
const ID_WGR800: u16 = 0x1984;
const ID_WGR800A: u16 = 0x1994;
const ID_UV800: u16 = 0xD874;

const OS_PATTERN: [u8; 2] = [0x00, 0x05];
// the last byte is already message
const CM180_PATTERN: [u8; 2] = [0x00, 0x46];
const CM180I_PATTERN: [u8; 2] = [0x00, 0x4A];
const ALT_PATTERN: [u8; 2] = [0xFF, 0xF5];
const MIN_MESSAGE_BITS: usize = 7 * 8;
/// CM180 secondary frames carry instant power only
const CM180_MIN_BITS: usize = 52;
const CM180I_MIN_BITS: usize = 84;
/// CM180i frames long enough to carry the energy total
const CM180I_TOTAL_BITS: usize = 140;
/// Assumed mains voltage for the current clamp meters
const MAINS_VOLTS: f64 = 230.0;
const MAX_MESSAGE_BYTES: usize = 44;

pub(super) fn decode(packet: &Packet, ctx: &DecodeContext<'_>) -> DecodeResult {
    decode_message(packet, ctx).into()
}

fn decode_message(packet: &Packet, ctx: &DecodeContext<'_>) -> Result<Reading, Rejection> {
    let row = packet.row(0).ok_or(Rejection::AbortEarly)?;
    let b: [u8; 3] = row.array_at(0);

    let ones = b[0] & 0x0F == 0x0F && b[1] == 0xFF && b[2] & 0xC0 == 0xC0;
    let zeros = b[0] & 0x0F == 0x00 && b[1] == 0x00 && b[2] & 0xC0 == 0x00;
    if !ones && !zeros {
        return Err(Rejection::AbortEarly);
    }

    let fits = |pos: usize, min_bits: usize| (row.len() >= pos + min_bits).then_some(pos);
    let start = row
        .search(0, &OS_PATTERN, 16)
        .and_then(|pos| fits(pos, MIN_MESSAGE_BITS))
        .or_else(|| row.search(0, &CM180_PATTERN, 16).and_then(|pos| fits(pos - 8, CM180_MIN_BITS)))
        .or_else(|| row.search(0, &CM180I_PATTERN, 16).and_then(|pos| fits(pos - 8, CM180I_MIN_BITS)))
        .or_else(|| row.search(0, &ALT_PATTERN, 16).and_then(|pos| fits(pos, MIN_MESSAGE_BITS)))
        .ok_or(Rejection::AbortEarly)?;

    let msg_len = row.len() - start;
    if msg_len > MAX_MESSAGE_BYTES * 8 {
        return Err(Rejection::AbortEarly);
    }
    let mut msg: [u8; MAX_MESSAGE_BYTES] = row.slice(start, msg_len).array_at(0);
    reflect_nibbles(&mut msg);

    let header = Header::parse(&msg);
    ctx.report(NAME, format_args!("v3 sensor type {:04x}, {} bits", header.sensor_id, msg_len));

    let reading = match header.sensor_id {
        ID_THGR810 | ID_THGR810A => {
            verify_checksum(&msg, 15, ctx)?;
            if !all_bcd([msg[5] >> 4, msg[4] & 0x0F, msg[4] >> 4, msg[6] & 0x0F, msg[6] >> 4]) {
                ctx.report(NAME, format_args!("THGR810 failed BCD sanity check"));
                return Err(Rejection::FailSanity);
            }
            let temp_c = temperature(&msg);
            if !(-50.0..=70.0).contains(&temp_c) {
                ctx.report(NAME, format_args!("THGR810 temperature {:.1} C out of range", temp_c));
                return Err(Rejection::FailSanity);
            }
            header
                .reading("Oregon-THGR810")
                .with_fmt("temperature_C", "Celsius", "%.2f C", temp_c)
                .with_fmt("humidity", "Humidity", "%u %%", humidity(&msg))
        }
        ID_THN802 => {
            verify_checksum(&msg, 12, ctx)?;
            header
                .reading("Oregon-THN802")
                .with_fmt("temperature_C", "Celsius", "%.2f C", temperature(&msg))
        }
        ID_UV800 => {
            verify_checksum(&msg, 13, ctx)?;
            header
                .reading("Oregon-UV800")
                .with_fmt("uv", "UV Index", "%u", uv_index(&msg))
        }
        ID_PCR800 | ID_PCR800A => {
            verify_checksum(&msg, 18, ctx)?;
            let (rate, total) = (rain_rate(&msg), total_rain(&msg));
            if header.sensor_id == ID_PCR800 {
                if !all_bcd(msg[4..9].iter().flat_map(|b| [b >> 4, b & 0x0F])) {
                    ctx.report(NAME, format_args!("PCR800 failed BCD sanity check"));
                    return Err(Rejection::FailSanity);
                }
                header
                    .reading("Oregon-PCR800")
                    .with_fmt("rain_rate_in_h", "Rain Rate", "%5.1f in/h", rate)
                    .with_fmt("rain_in", "Total Rain", "%7.3f in", total)
            } else {
                header
                    .reading("Oregon-PCR800a")
                    .with_fmt("rain_rate_in_h", "Rain Rate", "%.1f in/h", rate)
                    .with_fmt("rain_in", "Total Rain", "%.1f in", total)
            }
        }
        ID_WGR800 | ID_WGR800A => {
            verify_checksum(&msg, 17, ctx)?;
            if !all_bcd([msg[5] & 0x0F, msg[6] >> 4, msg[6] & 0x0F, msg[7] >> 4, msg[7] & 0x0F, msg[8] >> 4]) {
                ctx.report(NAME, format_args!("WGR800 failed BCD sanity check"));
                return Err(Rejection::FailSanity);
            }
            let gust = f64::from(msg[5] & 0x0F) / 10.0 + f64::from(msg[6] >> 4) + f64::from(msg[6] & 0x0F) * 10.0;
            let average = f64::from(msg[7] >> 4) / 10.0 + f64::from(msg[7] & 0x0F) + f64::from(msg[8] >> 4) * 10.0;
            let direction = f64::from(msg[4] >> 4) * 22.5;
            if gust > 56.0 || average > 56.0 {
                ctx.report(
                    NAME,
                    format_args!("WGR800 wind out of range: gust {:.1} average {:.1}", gust, average),
                );
                return Err(Rejection::FailSanity);
            }
            header
                .reading("Oregon-WGR800")
                .with_fmt("wind_max_m_s", "Gust", "%.1f m/s", gust)
                .with_fmt("wind_avg_m_s", "Average", "%.1f m/s", average)
                .with_fmt("wind_dir_deg", "Direction", "%.1f degrees", direction)
        }
        other => match msg[0] {
            0x20..=0x24 => cm160(&mut msg, ctx)?,
            0x26 => cm180(&mut msg, ctx)?,
            0x25 => cm180i(&mut msg, msg_len),
            _ => {
                ctx.report(NAME, format_args!("unrecognized v3 sensor type {:04x}", other));
                return Err(Rejection::FailSanity);
            }
        },
    };

    Ok(reading)
}

/// Owl CM160 current clamp: instant current and accumulated amp-seconds
fn cm160(msg: &mut [u8], ctx: &DecodeContext<'_>) -> Result<Reading, Rejection> {
    msg[0] &= 0x0F;
    verify_checksum(msg, 22, ctx)?;

    let current_amps = u32::from(swap_nibbles(msg[3])) | (u32::from(msg[4] >> 4) << 8);
    let power = f64::from(current_amps) * 0.07 * MAINS_VOLTS;

    let total_amps = (u64::from(swap_nibbles(msg[10])) << 36)
        | (u64::from(swap_nibbles(msg[9])) << 28)
        | (u64::from(swap_nibbles(msg[8])) << 20)
        | (u64::from(swap_nibbles(msg[7])) << 12)
        | (u64::from(swap_nibbles(msg[6])) << 4)
        | u64::from(msg[5] & 0x0F);
    // 1.12 matches the meter's own display
    let energy = total_amps as f64 * MAINS_VOLTS / 3600.0 / 1000.0 * 1.12;

    Ok(Reading::new("Oregon-CM160")
        .with("id", "House Code", msg[1] & 0x0F)
        .with_fmt("power_W", "Power", "%7.4f W", power)
        .with_fmt("energy_kWh", "Energy", "%7.4f kWh", energy))
}

/// Owl CM180 whole-house meter
fn cm180(msg: &mut [u8], ctx: &DecodeContext<'_>) -> Result<Reading, Rejection> {
    msg[0] &= 0x0F;
    verify_checksum(msg, 23, ctx)?;
    for b in msg.iter_mut() {
        *b = swap_nibbles(*b);
    }

    let sequence = msg[1] & 0x0F;
    let mut reading = Reading::new("Oregon-CM180")
        .with("id", "House Code", owl_id(msg))
        // bit 0, not the usual bit 2
        .with("battery_ok", "Battery", msg[3] & 0x01 == 0)
        .with_fmt("power_W", "Power", "%d W", owl_power(msg, 0));
    // the total only rides on sequence 0
    let total = if sequence == 0 { owl_total(&msg[5..11]) } else { 0 };
    if total != 0 {
        reading.push_fmt("energy_kWh", "Energy", "%.2f kWh", total as f64 / 3600.0 / 1000.0);
    }
    reading.push("sequence", "sequence number", sequence);
    Ok(reading)
}

/// Owl CM180i three-phase meter; the message has no check byte
fn cm180i(msg: &mut [u8], msg_len: usize) -> Reading {
    msg[0] &= 0x0F;
    for b in msg.iter_mut() {
        *b = swap_nibbles(*b);
    }

    let sequence = msg[1] & 0x0F;
    let mut reading = Reading::new("Oregon-CM180i")
        .with("id", "House Code", owl_id(msg))
        .with("battery_ok", "Battery", msg[3] & 0x40 == 0)
        .with_fmt("power1_W", "Power1", "%d W", owl_power(msg, 0))
        .with_fmt("power2_W", "Power2", "%d W", owl_power(msg, 1))
        .with_fmt("power3_W", "Power3", "%d W", owl_power(msg, 2));
    let total = if sequence == 0 && msg_len >= CM180I_TOTAL_BITS {
        owl_total(&msg[9..15])
    } else {
        0
    };
    if total != 0 {
        reading.push_fmt("energy_kWh", "Energy", "%.2f kWh", total as f64 / 3600.0 / 1000.0);
    }
    reading.push("sequence", "sequence number", sequence);
    reading
}

fn owl_id(msg: &[u8]) -> u16 {
    (u16::from(msg[2]) << 8) | u16::from(msg[1] & 0xF0)
}

/// Instant power of channel `n` in W, scaled by 1 + 1/160 to match the display
fn owl_power(msg: &[u8], n: usize) -> u32 {
    let raw = (u32::from(msg[4 + 2 * n]) << 8) | u32::from(msg[3 + 2 * n] & 0xF0);
    (f64::from(raw) * 1.00625) as u32
}

/// Energy total in Ws, six bytes least significant first
fn owl_total(bytes: &[u8]) -> u64 {
    bytes.iter().rev().fold(0, |acc, &b| (acc << 8) | u64::from(b))
}

/// Nibbles 8..11, LSD first, in 0.01 in/h
fn rain_rate(msg: &[u8]) -> f64 {
    let hundredths = u32::from(msg[5] & 0x0F) * 1000
        + u32::from(msg[5] >> 4) * 100
        + u32::from(msg[4] & 0x0F) * 10
        + u32::from(msg[4] >> 4);
    f64::from(hundredths) / 100.0
}

/// Nibbles 12..17, LSD first, in 0.001 in
fn total_rain(msg: &[u8]) -> f64 {
    let thousandths = u32::from(msg[8] & 0x0F) * 100_000
        + u32::from(msg[8] >> 4) * 10_000
        + u32::from(msg[7] & 0x0F) * 1000
        + u32::from(msg[7] >> 4) * 100
        + u32::from(msg[6] & 0x0F) * 10
        + u32::from(msg[6] >> 4);
    f64::from(thousandths) / 1000.0
}
