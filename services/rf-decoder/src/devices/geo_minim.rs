//! GEO minim+ energy monitor (868.29 MHz, FSK PCM, 25 us bits)
//!
//! A clip-on current sensor reports every ~3 s and the paired display unit
//! retransmits a summary using the same framing:
//!
//! ```text
//! 55 55 55 | 7b b9 | TT SS SS LL | data (LL bytes) | CRC16
//! ```
//! T = frame type (`ea` display, `3f` current sensor), S = pairing session,
//! L = data length. The CRC-16 (poly 0x8005, init 0) covers header and data.

use chrono::{Duration, NaiveDate};

use crate::bitbuffer::{BitRow, Packet};
use crate::decoder::{DecodeContext, DecodeResult, DecoderInfo, Modulation, Timing};
use crate::error::Rejection;
use crate::integrity::crc16;
use crate::reading::Reading;

const NAME: &str = "geo_minim";

const PREAMBLE: [u8; 2] = [0x55, 0x55];
const SYNC: [u8; 2] = [0x7B, 0xB9];
const HEADER_LEN: usize = 4;
const MAX_LEN: usize = 128;

const TYPE_DISPLAY: u8 = 0xEA;
const TYPE_CT_SENSOR: u8 = 0x3F;
const CT_SENSOR_LEN: usize = 11;
const DISPLAY_LEN: usize = 48;

const DISPLAY_TRAILER: [u8; 12] = [0xAA, 0xFF, 0xFF, 0, 0, 0, 0, 0xAA, 0xFF, 0xAA, 0xAA, 0];

pub const DECODER: DecoderInfo = DecoderInfo {
    key: NAME,
    name: "GEO minim+ energy monitor",
    modulation: Modulation::FskPulsePcm,
    timing: Timing {
        short_us: 24,
        long_us: 24,
        sync_us: 0,
        gap_us: 0,
        reset_us: 3000,
        tolerance_us: 0,
    },
    decode_fn: decode,
    fields: &[
        "model", "id", "va", "flags4", "uptime", "watts", "kwh", "time", "flags5", "flags15", "mic",
    ],
    enabled_by_default: true,
};

pub fn decode(packet: &Packet, ctx: &DecodeContext<'_>) -> DecodeResult {
    decode_frame(packet, ctx).into()
}

fn decode_frame(packet: &Packet, ctx: &DecodeContext<'_>) -> Result<Reading, Rejection> {
    if packet.num_rows() != 1 {
        return Err(Rejection::AbortLength);
    }
    let row = &packet.rows()[0];
    if row.len() <= PREAMBLE.len() * 8 {
        return Err(Rejection::AbortLength);
    }

    let pos = row
        .search(0, &PREAMBLE, PREAMBLE.len() * 8)
        .ok_or(Rejection::PatternNotFound)?;
    if row.len() <= pos + SYNC.len() * 8 {
        return Err(Rejection::AbortLength);
    }
    let Some(start) = row.search(pos, &SYNC, SYNC.len() * 8) else {
        ctx.report(NAME, format_args!("no sync"));
        return Err(Rejection::PatternNotFound);
    };

    let buf = extract_frame(row, start, ctx)?;
    match buf[0] {
        TYPE_DISPLAY => decode_display(&buf, ctx),
        TYPE_CT_SENSOR => decode_ct_sensor(&buf, ctx),
        _ => Err(Rejection::AbortEarly),
    }
}

/// Pull the byte-aligned frame after the sync word and verify its CRC.
fn extract_frame(row: &BitRow, start: usize, ctx: &DecodeContext<'_>) -> Result<Vec<u8>, Rejection> {
    if start + HEADER_LEN * 8 >= row.len() {
        return Err(Rejection::AbortLength);
    }
    let header: [u8; HEADER_LEN] = row.array_at(start);
    if header[0] != TYPE_DISPLAY && header[0] != TYPE_CT_SENSOR {
        ctx.report(NAME, format_args!("unknown header {}", hex::encode(header)));
        return Err(Rejection::AbortEarly);
    }

    let mut bytes = (row.len() - start) / 8;
    if bytes > MAX_LEN {
        ctx.report(NAME, format_args!("too big: {} > {} max bytes", bytes, MAX_LEN));
        bytes = MAX_LEN;
    }

    let crc_len = HEADER_LEN + usize::from(header[3]);
    if crc_len + 2 > bytes {
        ctx.report(NAME, format_args!("truncated, got {} of {} bytes", bytes, crc_len + 2));
        return Err(Rejection::FailSanity);
    }

    let buf = row.extract_bytes(start, bytes * 8);
    let crc = crc16(&buf[..crc_len], 0x8005, 0x0000);
    let received = u16::from_be_bytes([buf[crc_len], buf[crc_len + 1]]);
    if crc != received {
        ctx.report(NAME, format_args!("bad CRC, expected {:04X} got {:04X}", crc, received));
        return Err(Rejection::FailIntegrity);
    }
    Ok(buf)
}

fn device_id(buf: &[u8]) -> String {
    hex::encode_upper(&buf[..4])
}

/// Current transformer sensor: power in VA and uptime
fn decode_ct_sensor(buf: &[u8], ctx: &DecodeContext<'_>) -> Result<Reading, Rejection> {
    if buf.len() != CT_SENSOR_LEN {
        ctx.report(NAME, format_args!("expected {} bytes, got {}", CT_SENSOR_LEN, buf.len()));
        return Err(Rejection::AbortLength);
    }

    // uptime counts in 8 second steps
    let mut n = 8 * ((u32::from(buf[6]) << 16) | (u32::from(buf[7]) << 8) | u32::from(buf[8]));
    let secs = n % 60;
    n /= 60;
    let mins = n % 60;
    n /= 60;
    let hours = n % 24;
    n /= 24;
    let uptime = format!("{}day {:02}:{:02}:{:02}", n, hours, mins, secs);

    let mut va = 10 * ((u32::from(buf[4] & 0x0F) << 8) | u32::from(buf[5]));
    if buf[4] & 0x40 != 0 {
        va += 5;
    }
    let flags4 = buf[4] & !0x4F;

    let mut reading = Reading::new("GEO-minimCT")
        .with("id", "ID", device_id(buf))
        .with("va", "VA", va);
    if flags4 != 0x30 {
        reading.push_fmt("flags4", "Flags", "%#x", flags4);
    }
    Ok(reading.with("uptime", "Uptime", uptime).with("mic", "Integrity", "CRC"))
}

/// Display unit: instantaneous power, energy in the last 15 minutes, clock
fn decode_display(buf: &[u8], ctx: &DecodeContext<'_>) -> Result<Reading, Rejection> {
    if buf.len() != DISPLAY_LEN {
        ctx.report(NAME, format_args!("expected {} bytes, got {}", DISPLAY_LEN, buf.len()));
        return Err(Rejection::AbortLength);
    }

    // unexpected constant regions are only reported
    if buf[6..14].iter().any(|&b| b != 0) {
        ctx.report(NAME, format_args!("nonzero @6: {}", hex::encode(&buf[6..14])));
    }
    if buf[16..24].iter().any(|&b| b != 0) {
        ctx.report(NAME, format_args!("nonzero @16: {}", hex::encode(&buf[16..24])));
    }
    if buf[24..29].iter().any(|&b| b != 0xAA) {
        ctx.report(NAME, format_args!("not 0xaa @24: {}", hex::encode(&buf[24..29])));
    }
    if buf[29] != 0x00 {
        ctx.report(NAME, format_args!("expected 0x00 @29, got {:#x}", buf[29]));
    }
    if buf[34..46] != DISPLAY_TRAILER {
        ctx.report(NAME, format_args!("bad trailer @34: {}", hex::encode(&buf[34..46])));
    }

    let watts = 5 * ((u32::from(buf[5] & 0x7F) << 8) | u32::from(buf[4]));
    let flags5 = buf[5] & 0x80;
    let wh = (u32::from(buf[15] & 0x07) << 8) | u32::from(buf[14]);
    let flags15 = buf[15] & !0x07;

    // day 0 is 2007-01-01; out of range hours and minutes roll over
    let days = u16::from_le_bytes([buf[30], buf[31]]);
    let Some(epoch) = NaiveDate::from_ymd_opt(2007, 1, 1).and_then(|d| d.and_hms_opt(0, 0, 0)) else {
        return Err(Rejection::FailSanity);
    };
    let time = epoch
        + Duration::days(i64::from(days))
        + Duration::hours(i64::from(buf[32] & 0x1F))
        + Duration::minutes(i64::from(buf[33] & 0x3F));

    let mut reading = Reading::new("GEO-minimDP")
        .with("id", "", device_id(buf))
        .with_fmt("watts", "Watts", "%u", watts)
        .with_fmt("kwh", "kWh", "%.3f", f64::from(wh) * 0.001)
        .with("time", "Time", time.format("%Y-%m-%d %H:%M").to_string());
    if flags5 != 0 {
        reading.push_fmt("flags5", "Flags5", "%#x", flags5);
    }
    if flags15 != 0x40 {
        reading.push_fmt("flags15", "Flags15", "%#x", flags15);
    }
    Ok(reading.with("mic", "Integrity", "CRC"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decoder::testing::Recorder;
    use crate::decoder::DecodeMode;
    use crate::reading::FieldValue;

    fn with_crc(mut body: Vec<u8>) -> Vec<u8> {
        let crc = crc16(&body, 0x8005, 0x0000);
        body.extend_from_slice(&crc.to_be_bytes());
        body
    }

    fn on_air(frame: &[u8]) -> Packet {
        let mut row = BitRow::from_bytes(&[0x55, 0x55, 0x55, 0x7B, 0xB9]);
        row.extend_from(&BitRow::from_bytes(frame));
        Packet::from_row(row)
    }

    fn ct_frame() -> Vec<u8> {
        with_crc(vec![0x3F, 0x06, 0x29, 0x05, 0x31, 0x2C, 0x00, 0x01, 0x2C])
    }

    fn display_frame() -> Vec<u8> {
        let mut body = vec![0u8; 46];
        body[..4].copy_from_slice(&[0xEA, 0x01, 0x35, 0x2A]);
        body[4] = 0x3C;
        body[14] = 0x08;
        body[15] = 0x40;
        body[24..29].fill(0xAA);
        body[30] = 0x88;
        body[31] = 0x13;
        body[32] = 14;
        body[33] = 30;
        body[34..46].copy_from_slice(&DISPLAY_TRAILER);
        with_crc(body)
    }

    #[test]
    fn test_ct_sensor() {
        let result = decode(&on_air(&ct_frame()), &DecodeContext::default());
        let reading = result.reading().unwrap();

        assert_eq!(reading.model(), "GEO-minimCT");
        assert_eq!(reading.get("id"), Some(&FieldValue::from("3F062905")));
        assert_eq!(reading.get("va"), Some(&FieldValue::UInt(3000)));
        assert!(!reading.contains("flags4"));
        assert_eq!(reading.get("uptime"), Some(&FieldValue::from("0day 00:40:00")));
        assert_eq!(reading.get("mic"), Some(&FieldValue::from("CRC")));
    }

    #[test]
    fn test_display() {
        let result = decode(&on_air(&display_frame()), &DecodeContext::default());
        let reading = result.reading().unwrap();

        assert_eq!(reading.model(), "GEO-minimDP");
        assert_eq!(reading.get("id"), Some(&FieldValue::from("EA01352A")));
        assert_eq!(reading.get("watts"), Some(&FieldValue::UInt(300)));
        assert_eq!(reading.fields()[3].render(), "0.008");
        assert_eq!(reading.get("time"), Some(&FieldValue::from("2020-09-09 14:30")));
        assert!(!reading.contains("flags5"));
        assert!(!reading.contains("flags15"));
    }

    #[test]
    fn test_display_unexpected_bytes_reported() {
        let mut body = display_frame();
        body.truncate(46);
        body[7] = 0x01;
        let frame = with_crc(body);
        let recorder = Recorder::default();
        let ctx = DecodeContext::new(&recorder, DecodeMode::Strict);

        assert!(decode(&on_air(&frame), &ctx).reading().is_some());
        assert!(recorder.contains("nonzero @6"));
    }

    #[test]
    fn test_rejections() {
        let mut frame = ct_frame();
        frame[5] ^= 0x01;
        assert_eq!(
            decode(&on_air(&frame), &DecodeContext::default()),
            DecodeResult::Rejected(Rejection::FailIntegrity)
        );

        let mut frame = ct_frame();
        frame[0] = 0x40;
        assert_eq!(
            decode(&on_air(&frame), &DecodeContext::default()),
            DecodeResult::Rejected(Rejection::AbortEarly)
        );

        let frame = ct_frame();
        assert_eq!(
            decode(&on_air(&frame[..9]), &DecodeContext::default()),
            DecodeResult::Rejected(Rejection::FailSanity)
        );

        // declared length 5 but a display frame must be 48 bytes
        let frame = with_crc(vec![0xEA, 0x01, 0x35, 0x05, 0, 0, 0, 0, 0]);
        assert_eq!(
            decode(&on_air(&frame), &DecodeContext::default()),
            DecodeResult::Rejected(Rejection::AbortLength)
        );

        let noise = Packet::from_row(BitRow::from_bytes(&[0x00; 16]));
        assert_eq!(
            decode(&noise, &DecodeContext::default()),
            DecodeResult::Rejected(Rejection::PatternNotFound)
        );
    }
}
