//! Oregon Scientific weather sensors, protocol versions 2.1 and 3
//!
//! Both versions Manchester-code their payload and send every nibble LSB
//! first. After alignment and nibble reflection a message starts with a
//! common header:
//!
//! ```text
//! SS SS CI II ..
//! ```
//! S = sensor type, C = channel, I = rolling house code (low nibble of byte 2
//! and high nibble of byte 3), bit 2 of byte 3 = battery low.
//!
//! The check byte is the sum of all preceding nibbles with its own nibbles
//! swapped. The Owl CM160/CM180/CM180i energy meters ride on version 3
//! framing without that header. Version 2.1 is tried first; version 3 gets the packet when 2.1
//! does not produce a reading.

mod v21;
mod v3;

use crate::bitbuffer::Packet;
use crate::decoder::{DecodeContext, DecodeResult, DecoderInfo, Modulation, Timing};
use crate::error::Rejection;
use crate::fields::swap_nibbles;
use crate::integrity::add_nibbles;
use crate::reading::Reading;

const NAME: &str = "oregon_scientific";

pub const DECODER: DecoderInfo = DecoderInfo {
    key: NAME,
    name: "Oregon Scientific Weather Sensor",
    modulation: Modulation::OokPulseManchesterZeroBit,
    timing: Timing {
        // nominal 1024 Hz, pulses run shorter than pauses
        short_us: 440,
        long_us: 0,
        sync_us: 0,
        gap_us: 0,
        reset_us: 2400,
        tolerance_us: 0,
    },
    decode_fn: decode,
    fields: &[
        "model",
        "id",
        "channel",
        "battery_ok",
        "temperature_C",
        "humidity",
        "rain_rate_mm_h",
        "rain_rate_in_h",
        "rain_mm",
        "rain_in",
        "wind_max_m_s",
        "wind_avg_m_s",
        "wind_dir_deg",
        "pressure_hPa",
        "uv",
        "radio_clock",
        // Owl energy meters
        "power_W",
        "power1_W",
        "power2_W",
        "power3_W",
        "energy_kWh",
        "sequence",
    ],
    enabled_by_default: true,
};

pub fn decode(packet: &Packet, ctx: &DecodeContext<'_>) -> DecodeResult {
    let v21 = v21::decode(packet, ctx);
    if v21.reading().is_some() {
        return v21;
    }
    match v3::decode(packet, ctx) {
        // not v3 either: the v2.1 verdict is the more specific one
        DecodeResult::Rejected(Rejection::AbortEarly) => v21,
        v3 => v3,
    }
}

/// Fields shared by every sensor after nibble reflection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Header {
    sensor_id: u16,
    channel: u8,
    device_id: u8,
    battery_low: bool,
}

impl Header {
    fn parse(msg: &[u8]) -> Self {
        Self {
            sensor_id: u16::from_be_bytes([msg[0], msg[1]]),
            channel: msg[2] >> 4,
            device_id: (msg[2] & 0x0F) | (msg[3] & 0xF0),
            battery_low: (msg[3] >> 2) & 0x01 != 0,
        }
    }

    fn reading(&self, model: &str) -> Reading {
        Reading::new(model)
            .with("id", "House Code", self.device_id)
            .with("channel", "Channel", self.channel)
            .with("battery_ok", "Battery", !self.battery_low)
    }
}

/// Verify the sum-of-nibbles check byte located at nibble `checksum_idx`.
fn verify_checksum(msg: &[u8], checksum_idx: usize, ctx: &DecodeContext<'_>) -> Result<(), Rejection> {
    let byte = checksum_idx / 2;
    let mut sum = add_nibbles(&msg[..byte]);
    let expected = if checksum_idx % 2 == 1 {
        sum += u32::from(msg[byte] >> 4);
        (msg[byte] & 0x0F) | (msg[byte + 1] & 0xF0)
    } else {
        swap_nibbles(msg[byte])
    };
    let calculated = (sum & 0xFF) as u8;

    if calculated != expected {
        ctx.report(
            NAME,
            format_args!("checksum error, expected: {:02x} calculated: {:02x}", expected, calculated),
        );
        return Err(Rejection::FailIntegrity);
    }
    Ok(())
}

/// BCD temperature in 0.1 C, nibbles 8..11; 0x08 of byte 5 is the sign.
///
/// The AWR129 BBQ thermometer uses the low three bits of byte 5 as a
/// hundreds digit.
fn temperature(msg: &[u8]) -> f64 {
    let tenths = u32::from(msg[5] >> 4) * 100 + u32::from(msg[4] & 0x0F) * 10 + u32::from(msg[4] >> 4);
    let value = f64::from(tenths) / 10.0 + f64::from(msg[5] & 0x07) * 100.0;
    if msg[5] & 0x08 != 0 {
        -value
    } else {
        value
    }
}

fn humidity(msg: &[u8]) -> u8 {
    (msg[6] & 0x0F) * 10 + (msg[6] >> 4)
}

fn uv_index(msg: &[u8]) -> u8 {
    (msg[4] & 0x0F) * 10 + (msg[4] >> 4)
}

/// True if every nibble given is a decimal digit
fn all_bcd(nibbles: impl IntoIterator<Item = u8>) -> bool {
    nibbles.into_iter().all(|n| n <= 9)
}
