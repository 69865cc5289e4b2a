//! Decoder contract shared by every device protocol
//!
//! A decoder is a pure function from a packet to a [`DecodeResult`]. It
//! never keeps state between packets; anything it wants to say about why a
//! packet was turned down goes through the [`Diagnostics`] sink in its
//! [`DecodeContext`].

mod registry;

pub use registry::{decoders, enabled_decoders, find, DecoderInfo, Modulation, Timing};

use crate::bitbuffer::Packet;
use crate::error::Rejection;
use crate::reading::Reading;
use std::fmt;
use tracing::debug;

/// Outcome of offering one packet to one decoder
#[derive(Debug, Clone, PartialEq)]
pub enum DecodeResult {
    /// The packet was recognised and decoded
    Emit(Reading),
    /// Structurally fine, but the device has nothing to report
    NoEvent,
    /// The packet was turned down
    Rejected(Rejection),
}

impl DecodeResult {
    /// Integer status code: 1 for a reading, 0 for no event, negative for
    /// rejections
    pub fn code(&self) -> i32 {
        match self {
            Self::Emit(_) => 1,
            Self::NoEvent => 0,
            Self::Rejected(r) => r.code(),
        }
    }

    pub fn reading(&self) -> Option<&Reading> {
        match self {
            Self::Emit(reading) => Some(reading),
            _ => None,
        }
    }

    pub fn into_reading(self) -> Option<Reading> {
        match self {
            Self::Emit(reading) => Some(reading),
            _ => None,
        }
    }

    pub fn rejection(&self) -> Option<Rejection> {
        match self {
            Self::Rejected(r) => Some(*r),
            _ => None,
        }
    }
}

impl From<Result<Option<Reading>, Rejection>> for DecodeResult {
    fn from(result: Result<Option<Reading>, Rejection>) -> Self {
        match result {
            Ok(Some(reading)) => Self::Emit(reading),
            Ok(None) => Self::NoEvent,
            Err(rejection) => Self::Rejected(rejection),
        }
    }
}

impl From<Result<Reading, Rejection>> for DecodeResult {
    fn from(result: Result<Reading, Rejection>) -> Self {
        match result {
            Ok(reading) => Self::Emit(reading),
            Err(rejection) => Self::Rejected(rejection),
        }
    }
}

impl From<Rejection> for DecodeResult {
    fn from(rejection: Rejection) -> Self {
        Self::Rejected(rejection)
    }
}

/// Sink for free-form decoder diagnostics
pub trait Diagnostics: Send + Sync {
    fn report(&self, decoder: &str, args: fmt::Arguments<'_>);
}

/// Discards all diagnostics
#[derive(Debug, Default, Clone, Copy)]
pub struct NoDiagnostics;

impl Diagnostics for NoDiagnostics {
    fn report(&self, _decoder: &str, _args: fmt::Arguments<'_>) {}
}

/// Forwards diagnostics to the `tracing` debug level
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingDiagnostics;

impl Diagnostics for TracingDiagnostics {
    fn report(&self, decoder: &str, args: fmt::Arguments<'_>) {
        debug!(decoder, "{}", args);
    }
}

/// How strictly decoders apply their recoverable checks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DecodeMode {
    /// Reject on any framing or line-code error
    #[default]
    Strict,
    /// Keep going past Manchester errors and attach debug fields
    Diagnostic,
}

static NO_DIAGNOSTICS: NoDiagnostics = NoDiagnostics;

/// Per-call context handed to decoders
#[derive(Clone, Copy)]
pub struct DecodeContext<'a> {
    pub diagnostics: &'a dyn Diagnostics,
    pub mode: DecodeMode,
}

impl<'a> DecodeContext<'a> {
    pub fn new(diagnostics: &'a dyn Diagnostics, mode: DecodeMode) -> Self {
        Self { diagnostics, mode }
    }

    pub fn report(&self, decoder: &str, args: fmt::Arguments<'_>) {
        self.diagnostics.report(decoder, args);
    }

    pub fn is_diagnostic(&self) -> bool {
        self.mode == DecodeMode::Diagnostic
    }
}

impl Default for DecodeContext<'static> {
    fn default() -> Self {
        Self::new(&NO_DIAGNOSTICS, DecodeMode::Strict)
    }
}

impl fmt::Debug for DecodeContext<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DecodeContext")
            .field("mode", &self.mode)
            .finish_non_exhaustive()
    }
}

/// Signature every device decoder implements
pub type DecodeFn = fn(&Packet, &DecodeContext<'_>) -> DecodeResult;


#[cfg(test)]
mod tests {
    use super::testing::Recorder;
    use super::*;

    #[test]
    fn test_result_codes() {
        assert_eq!(DecodeResult::Emit(Reading::new("x")).code(), 1);
        assert_eq!(DecodeResult::NoEvent.code(), 0);
        assert_eq!(DecodeResult::from(Rejection::FailIntegrity).code(), -3);
    }

    #[test]
    fn test_from_result() {
        let ok: Result<Option<Reading>, Rejection> = Ok(None);
        assert_eq!(DecodeResult::from(ok), DecodeResult::NoEvent);

        let err: Result<Reading, Rejection> = Err(Rejection::AbortLength);
        assert_eq!(
            DecodeResult::from(err).rejection(),
            Some(Rejection::AbortLength)
        );
    }

    #[test]
    fn test_context_reports() {
        let recorder = Recorder::default();
        let ctx = DecodeContext::new(&recorder, DecodeMode::Diagnostic);
        ctx.report("calibeur", format_args!("parity {}", "odd"));

        assert!(ctx.is_diagnostic());
        assert!(recorder.contains("calibeur: parity odd"));
        assert!(!DecodeContext::default().is_diagnostic());
    }
}
