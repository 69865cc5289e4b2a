//! Static table of the device decoders this crate knows

use super::{DecodeContext, DecodeFn, DecodeResult};
use crate::bitbuffer::Packet;
use crate::devices;
use std::fmt;

/// Physical-layer modulation a decoder expects its rows to come from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Modulation {
    OokPulsePpm,
    OokPulsePwm,
    OokPulsePwmTernary,
    OokPulseManchesterZeroBit,
    OokPulsePcm,
    FskPulsePcm,
    FskPulsePwm,
    FskPulseManchesterZeroBit,
}

/// Pulse timing hints for the demodulator, in microseconds
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Timing {
    pub short_us: u32,
    pub long_us: u32,
    pub sync_us: u32,
    pub gap_us: u32,
    pub reset_us: u32,
    pub tolerance_us: u32,
}

/// Static description of one device decoder
#[derive(Clone, Copy)]
pub struct DecoderInfo {
    /// Stable key, used for routing input and in logs
    pub key: &'static str,
    /// Human-readable device name
    pub name: &'static str,
    pub modulation: Modulation,
    pub timing: Timing,
    pub decode_fn: DecodeFn,
    /// Output field keys in emission order
    pub fields: &'static [&'static str],
    /// Disabled decoders only run when asked for by key
    pub enabled_by_default: bool,
}

impl DecoderInfo {
    pub fn decode(&self, packet: &Packet, ctx: &DecodeContext<'_>) -> DecodeResult {
        (self.decode_fn)(packet, ctx)
    }
}

impl fmt::Debug for DecoderInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DecoderInfo")
            .field("key", &self.key)
            .field("name", &self.name)
            .field("modulation", &self.modulation)
            .field("timing", &self.timing)
            .field("enabled_by_default", &self.enabled_by_default)
            .finish()
    }
}

static DECODERS: &[DecoderInfo] = &[
    devices::honeywell_cm921::DECODER,
    devices::calibeur::DECODER,
    devices::auriol_afw2a1::DECODER,
    devices::holman_ws5029::PCM_DECODER,
    devices::holman_ws5029::PWM_DECODER,
    devices::schou_72543_rain::DECODER,
    devices::universal_fan::DECODER,
    devices::tpms_abarth::DECODER,
    devices::x10_rf::DECODER,
    devices::x10_sec::DECODER,
    devices::ht680::DECODER,
    devices::infactory::DECODER,
    devices::geo_minim::DECODER,
    devices::oregon_scientific::DECODER,
];

/// Every registered decoder, in registration order
pub fn decoders() -> &'static [DecoderInfo] {
    DECODERS
}

/// Decoders that run on packets not routed to a specific key
pub fn enabled_decoders() -> impl Iterator<Item = &'static DecoderInfo> {
    DECODERS.iter().filter(|d| d.enabled_by_default)
}

pub fn find(key: &str) -> Option<&'static DecoderInfo> {
    DECODERS.iter().find(|d| d.key == key)
}
