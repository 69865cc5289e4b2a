//! Honeywell CM921 wireless programmable room thermostat (868 MHz, Evohome)
//!
//! On air every byte is wrapped in a start and stop bit and sent LSB first.
//! The byte stream opens with a fixed header, carries the Manchester-coded
//! message and closes with a 0x35 footer followed by 0x55 filler:
//!
//! ```text
//! preamble | 33 55 53 | manchester(message) | 35 | 55 55 ..
//! ```
//!
//! Every stage is a hard gate; the first failure decides the rejection.

mod commands;
mod device_id;
mod message;

pub use commands::{lookup, Command, CommandSpec};
pub use device_id::DeviceId;
pub use message::Message;

use crate::bitbuffer::{BitRow, Packet};
use crate::decoder::{DecodeContext, DecodeResult, DecoderInfo, Modulation, Timing};
use crate::error::Rejection;
use crate::linecode::{manchester_decode, strip_start_stop};
use crate::reading::Reading;

const NAME: &str = "honeywell_cm921";
const MODEL: &str = "Honeywell CM921";

/// 0x55 0xFF 0x00 with start/stop bits: 0101010101 0111111111 0000000001
const PREAMBLE: [u8; 4] = [0x55, 0x5F, 0xF0, 0x04];
const PREAMBLE_BITS: usize = 30;
const MIN_ROW_BITS: usize = 60;

const HEADER: [u8; 3] = [0x33, 0x55, 0x53];
const FOOTER: u8 = 0x35;
const FILLER: u8 = 0x55;

pub const DECODER: DecoderInfo = DecoderInfo {
    key: NAME,
    name: "Honeywell CM921 Wireless Programmable Room Thermostat",
    modulation: Modulation::FskPulsePcm,
    timing: Timing {
        short_us: 26,
        long_us: 26,
        sync_us: 0,
        gap_us: 0,
        reset_us: 2000,
        tolerance_us: 5,
    },
    decode_fn: decode,
    fields: &[
        "model",
        "Packet",
        "Device IDs",
        "unknown",
        "time_request",
        "time",
        "domain_id",
        "state",
        "demand",
        "status",
        "boiler_modulation_level",
        "flame_status",
        "zone",
        "setpoint",
        "cycle_rate",
        "minimum_on_time",
        "minimum_off_time",
        "proportional_band_width",
        "device_number",
        "failsafe_mode",
        "zone_idx",
        "max_flow_temp",
        "pump_run_time",
        "actuator_run_time",
        "min_flow_temp",
        // diagnostic mode only
        "Header",
        "Command",
        "Payload",
        "Unparsed",
        "CRC",
        "# man errors",
    ],
    enabled_by_default: true,
};

pub fn decode(packet: &Packet, ctx: &DecodeContext<'_>) -> DecodeResult {
    decode_packet(packet, ctx).into()
}

fn decode_packet(packet: &Packet, ctx: &DecodeContext<'_>) -> Result<Reading, Rejection> {
    let [row] = packet.rows() else {
        return Err(Rejection::AbortEarly);
    };
    if row.len() < MIN_ROW_BITS {
        return Err(Rejection::AbortLength);
    }
    ctx.report(NAME, format_args!("row {}", row));

    let start = row
        .search(0, &PREAMBLE, PREAMBLE_BITS)
        .ok_or(Rejection::PatternNotFound)?;
    if row.len() - start < 8 {
        return Err(Rejection::AbortLength);
    }
    ctx.report(NAME, format_args!("payload starts at bit {}", start));

    // framed bytes arrive LSB first
    let stream: Vec<u8> = strip_start_stop(row, start, row.len())?
        .into_iter()
        .map(u8::reverse_bits)
        .collect();

    if !stream.starts_with(&HEADER) {
        return Err(Rejection::FailSanity);
    }
    let footer = find_footer(&stream).ok_or(Rejection::FailSanity)?;

    // each bit goes out as (!b, b): the second half of a pair carries it
    let coded = BitRow::from_bytes(&stream[HEADER.len()..footer]).inverted();
    let decoded = manchester_decode(&coded, 0, coded.len() / 2);
    if decoded.errors > 0 {
        ctx.report(
            NAME,
            format_args!("{} manchester errors", decoded.errors),
        );
        if !ctx.is_diagnostic() {
            return Err(Rejection::FailSanity);
        }
    }

    let bytes = &decoded.bits.as_bytes()[..decoded.bits.len() / 8];
    let message = Message::parse(bytes)?;

    let mut reading = Reading::new(MODEL).with("Packet", "", hex::encode(bytes));
    let ids: Vec<String> = message.device_ids.iter().map(ToString::to_string).collect();
    reading.push("Device IDs", "", ids.join(" "));
    commands::interpret(&message, &mut reading, ctx);

    if ctx.is_diagnostic() {
        reading.push("Header", "", hex::encode([message.header]));
        reading.push("Command", "", hex::encode(message.command.to_be_bytes()));
        reading.push("Payload", "", hex::encode(&message.payload));
        reading.push("Unparsed", "", hex::encode(&message.unparsed));
        reading.push("CRC", "", hex::encode([message.checksum]));
        reading.push("# man errors", "", decoded.errors as u64);
    }

    Ok(reading)
}

/// Index of the footer byte, scanning back over trailing filler.
///
/// At least one filler byte must follow the footer, and the footer must
/// come after the header.
fn find_footer(stream: &[u8]) -> Option<usize> {
    let fillers = stream
        .iter()
        .rev()
        .take_while(|&&b| b == FILLER)
        .count();
    if fillers == 0 {
        return None;
    }
    let idx = stream.len().checked_sub(fillers + 1)?;
    (idx >= HEADER.len() && stream[idx] == FOOTER).then_some(idx)
}
