//! Abarth 124 Spider TPMS
//!
//! FSK, Manchester coded after an `..aa a9` preamble (as seen on the
//! inverted row). Decoded layout:
//!
//! ```text
//! II II II II FF PP TT SS CC
//! ```
//! I = id, F = flags, P = pressure (x1.4 kPa), T = temperature + 50 C,
//! S = status, C = check byte. The check byte does not reliably match a
//! CRC-8 of the other bytes, so a mismatch is only reported. A row may hold
//! several repeats; each preamble hit is tried in turn.

use crate::bitbuffer::{BitRow, Packet};
use crate::decoder::{DecodeContext, DecodeResult, DecoderInfo, Modulation, Timing};
use crate::error::Rejection;
use crate::integrity::crc8;
use crate::linecode::manchester_decode;
use crate::reading::Reading;

const NAME: &str = "tpms_abarth";

/// Preamble on the inverted row
const PREAMBLE: [u8; 3] = [0xAA, 0xAA, 0xA9];
const PREAMBLE_BITS: usize = 24;
const MESSAGE_BITS: usize = 72;

pub const DECODER: DecoderInfo = DecoderInfo {
    key: NAME,
    name: "Abarth 124 Spider TPMS",
    modulation: Modulation::FskPulsePcm,
    timing: Timing {
        short_us: 52,
        long_us: 52,
        sync_us: 0,
        gap_us: 0,
        reset_us: 150,
        tolerance_us: 0,
    },
    decode_fn: decode,
    fields: &[
        "model",
        "type",
        "id",
        "flags",
        "pressure_kPa",
        "temperature_C",
        "status",
        "code",
        "check",
    ],
    enabled_by_default: true,
};

pub fn decode(packet: &Packet, ctx: &DecodeContext<'_>) -> DecodeResult {
    let Some(row) = packet.row(0) else {
        return Rejection::AbortEarly.into();
    };
    let inverted = row.inverted();

    // every preamble hit is a candidate repeat; the first clean one wins
    let mut verdict = Rejection::PatternNotFound;
    let mut pos = 0;
    while let Some(start) = inverted.search(pos, &PREAMBLE, PREAMBLE_BITS) {
        pos = start - PREAMBLE_BITS + 2;
        if start + MESSAGE_BITS * 2 > row.len() {
            if verdict == Rejection::PatternNotFound {
                verdict = Rejection::AbortLength;
            }
            break;
        }
        match decode_at(row, start, ctx) {
            Ok(reading) => return DecodeResult::Emit(reading),
            Err(rejection) => verdict = rejection,
        }
    }
    verdict.into()
}

fn decode_at(row: &BitRow, start: usize, ctx: &DecodeContext<'_>) -> Result<Reading, Rejection> {
    // 01 on the inverted row is a 1, which is 10 on the row as received
    let decoded = manchester_decode(row, start, MESSAGE_BITS);
    if decoded.errors > 0 {
        ctx.report(
            NAME,
            format_args!("{} manchester errors after bit {}", decoded.errors, start),
        );
        if !ctx.is_diagnostic() {
            return Err(Rejection::FailSanity);
        }
    }

    let b: [u8; 9] = decoded.bits.array_at(0);
    let crc = crc8(&b[..8], 0x07, 0x00);
    if crc != b[8] {
        ctx.report(
            NAME,
            format_args!("check byte {:02x}, crc8 gives {:02x}", b[8], crc),
        );
    }

    let id = u32::from_be_bytes([b[0], b[1], b[2], b[3]]);

    Ok(Reading::new("Abarth 124 Spider")
        .with("type", "", "TPMS")
        .with("id", "", format!("{:08x}", id))
        .with_fmt("flags", "", "%02x", b[4])
        .with_fmt("pressure_kPa", "Pressure", "%.0f kPa", f64::from(b[5]) * 1.4)
        .with_fmt("temperature_C", "Temperature", "%.0f C", f64::from(b[6]) - 50.0)
        .with("status", "", b[7])
        .with("code", "", hex::encode(b))
        .with("check", "", format!("{:02x}", b[8])))
}
