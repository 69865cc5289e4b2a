//! Universal (reversible) 24V fan controller remote
//!
//! 33-bit rows, sent seven times:
//!
//! ```text
//! AAAAAAAAAAAAAAAAAAAA BBBBB RRR CCCC 1
//! ```
//! A = address, B = button code, R = rolling counter, C = check nibble
//! chosen so that the XOR of all eight nibbles is 0xA.

use crate::bitbuffer::Packet;
use crate::decoder::{DecodeContext, DecodeResult, DecoderInfo, Modulation, Timing};
use crate::error::Rejection;
use crate::integrity::xor_nibbles;
use crate::reading::Reading;

const NAME: &str = "universal_fan";
const ROW_BITS: usize = 33;
const MIN_REPEATS: usize = 3;
const CHECK_INIT: u8 = 0x0A;

const BUTTONS: &[(u8, &str)] = &[
    (0x19, "All Off"),
    (0x17, "Light On/Off"),
    (0x1B, "Forward"),
    (0x0A, "Fan"),
    (0x0E, "Reverse"),
    (0x09, "Fan Off"),
    (0x0F, "Speed 1"),
    (0x0D, "Speed 2"),
    (0x03, "Speed 3"),
    (0x15, "Speed 4"),
    (0x10, "Speed 5"),
    (0x13, "Speed 6"),
    (0x1D, "1H"),
    (0x16, "2H"),
    (0x06, "3H"),
];

pub const DECODER: DecoderInfo = DecoderInfo {
    key: NAME,
    name: "Universal (Reverseable) 24V Fan Controller",
    modulation: Modulation::OokPulsePwm,
    timing: Timing {
        short_us: 256,
        long_us: 756,
        sync_us: 3616,
        gap_us: 8000,
        reset_us: 8800,
        tolerance_us: 0,
    },
    decode_fn: decode,
    fields: &["model", "address", "button", "button_code", "counter", "chksum"],
    enabled_by_default: true,
};

pub fn decode(packet: &Packet, ctx: &DecodeContext<'_>) -> DecodeResult {
    let Some(row) = packet.find_repeated_row(MIN_REPEATS, ROW_BITS) else {
        return Rejection::AbortLength.into();
    };
    let b: [u8; 4] = packet.rows()[row].array_at(0);

    let chk_msg = b[3] & 0x0F;
    if xor_nibbles(&b) != CHECK_INIT {
        ctx.report(NAME, format_args!("checksum error, check nibble {:x}", chk_msg));
        return Rejection::FailIntegrity.into();
    }

    let address = (u32::from(b[0]) << 12) | (u32::from(b[1]) << 4) | u32::from(b[2] >> 4);
    let button = ((b[2] & 0x0F) << 1) | (b[3] >> 7);
    let counter = (b[3] & 0x7F) >> 4;
    let button_name = BUTTONS
        .iter()
        .find(|(code, _)| *code == button)
        .map_or("Unknown", |(_, name)| name);

    DecodeResult::Emit(
        Reading::new("Universal-Fan-remote")
            .with("address", "Transmitter ID", address)
            .with("button", "Button", button_name)
            .with("button_code", "Button Code", button)
            .with("counter", "Rolling Counter", counter)
            .with("chksum", "Checksum", chk_msg),
    )
}
